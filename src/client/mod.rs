mod client;
mod config;
mod event;

pub use client::RelayClient;
pub use config::{ClientConfig, ClientConfigBuilder};
pub use event::ClientEvent;
