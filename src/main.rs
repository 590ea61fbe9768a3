use clap::Parser;
use std::sync::Arc;
use toolbridge::downstream::{DownstreamProvider, HttpClient};
use toolbridge::protocol::MessageIdGenerator;
use toolbridge::server::{BindConfig, BridgeServer, CommandDispatcher, ToolRegistry};
use toolbridge::utils::shutdown::ShutdownCoordinator;
use tracing::info;

#[derive(Parser)]
#[command(name = "toolbridge")]
#[command(about = "Bridge exposing issue-tracker and wiki tools over a persistent RPC link")]
#[command(version)]
enum Cli {
    /// Start the bridge server
    Serve(ServeArgs),
}

#[derive(Parser)]
struct ServeArgs {
    /// Configuration file path
    #[arg(short, long, default_value = "~/.config/toolbridge/config.toml")]
    config: String,
    /// Host to bind to
    #[arg(short = 'H', long)]
    host: Option<String>,
    /// Port to bind to
    #[arg(short, long)]
    port: Option<u16>,
    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli {
        Cli::Serve(args) => {
            tracing_subscriber::fmt()
                .with_env_filter(&args.log_level)
                .init();

            let config_path = shellexpand::tilde(&args.config).to_string();
            let mut config = toolbridge::config::load(&config_path)?;
            if let Some(host) = args.host {
                config.server.host = host;
            }
            if let Some(port) = args.port {
                config.server.port = port;
            }

            info!(
                "Starting bridge server on {}:{}",
                config.server.host, config.server.port
            );
            info!("Config file: {}", config_path);

            let issues_http = Arc::new(HttpClient::new(config.downstream.issues.http_config())?);
            let wiki_http = Arc::new(HttpClient::new(config.downstream.wiki.http_config())?);
            let provider = Arc::new(DownstreamProvider::new(issues_http, wiki_http));

            let dispatcher = Arc::new(CommandDispatcher::new(
                Arc::new(ToolRegistry::new()),
                provider,
                MessageIdGenerator::new(),
            ));

            let bind = BindConfig {
                host: config.server.host.clone(),
                port: config.server.port,
            };
            let server = BridgeServer::bind(&bind, dispatcher).await?;

            let shutdown = ShutdownCoordinator::new();
            let signals = shutdown.subscribe();
            tokio::spawn(async move {
                shutdown.wait_for_shutdown_signal().await;
            });

            server.run(signals).await?;
        }
    }

    Ok(())
}
