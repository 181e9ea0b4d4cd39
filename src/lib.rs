mod utils;
mod protocol;
mod transport;
mod connection;
mod session;
mod frame;
mod client;
mod api;

// Re-export commonly used types at crate root
pub use utils::*;
pub use protocol::*;
pub use transport::*;
pub use connection::*;
pub use session::*;
pub use frame::*;

// Client exports
pub use client::{ClientConfig, ClientConfigBuilder, ClientEvent, RelayClient};

// Configuration API exports
pub use api::{ApiClient, StreamConfig, StreamConfigInput};
