mod config;
mod setup;

pub use config::{AppConfig, load_config};
pub use setup::{AppContext, setup};
