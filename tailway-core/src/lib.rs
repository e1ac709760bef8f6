pub mod buffer;
pub mod channel;
pub mod config;
pub mod engine;
pub mod error;
pub mod filter;
pub mod logging;
pub mod record;
pub mod session;
pub mod transport;
