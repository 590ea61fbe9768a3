pub mod descriptor;
pub mod message;
pub mod message_id;

pub use descriptor::{
    MethodDescriptor, ParameterDescriptor, ReturnDescriptor, RoutingKey, ToolDescriptor,
};
pub use message::{ErrorCode, ErrorPayload, Message};
pub use message_id::MessageIdGenerator;
