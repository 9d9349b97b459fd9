//! JSON-RPC transport and error classification.

mod batch;
mod error;
mod transport;

pub use batch::{BatchRequest, CallHandle};
pub use error::{classify, RpcErrorObject};
pub use transport::Transport;
