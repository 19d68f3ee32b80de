pub mod cli;
pub mod config;
pub mod log;
pub mod session;

pub use cli::Cli;
pub use config::{ConfigError, Invocation, SessionConfig};
