//! Configuration loading
//!
//! A TOML file overlaid with `TOOLBRIDGE_`-prefixed environment variables
//! (`TOOLBRIDGE_SERVER__PORT=4001` overrides `[server] port`). A missing
//! file yields the defaults.

pub mod types;

pub use types::{ClientConfig, Config, DownstreamConfig, ServerConfig, ServiceConfig};

use crate::utils::errors::{BridgeError, BridgeResult};
use figment::providers::{Env, Format, Toml};
use figment::Figment;
use std::path::Path;

pub fn load(path: impl AsRef<Path>) -> BridgeResult<Config> {
    Figment::new()
        .merge(Toml::file(path.as_ref()))
        .merge(Env::prefixed("TOOLBRIDGE_").split("__"))
        .extract()
        .map_err(|e| BridgeError::ConfigError(e.to_string()))
}
