pub mod application;
pub mod channel;
pub mod config;
pub mod dist;
pub mod download;
pub mod error;
pub mod http;
pub mod provider;
pub mod runtime;
pub mod version;

pub use application::{RunSummary, run};
pub use error::ChannelError;
