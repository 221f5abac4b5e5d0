pub mod cli;
pub mod fetch;
pub mod http;
pub mod load_config;
pub mod monday;
pub mod notion;
pub mod server;

pub use cli::{run, Cli, Commands};
