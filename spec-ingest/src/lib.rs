pub mod cli;
pub mod load_config;
pub mod registry;

pub use cli::{run, Cli};
