pub mod cli_client;
pub mod client;
pub mod error_code;

pub use cli_client::SvnCliClient;
pub use client::{
    EventAction, IgnoreEvents, NodeInfo, OperationRequest, SvnClient, SvnError, UpdateEvent,
    UpdateEventHandler,
};
pub use error_code::{ErrorCode, FailureKind};
