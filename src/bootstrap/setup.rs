use super::config::{AppConfig, load_config};
use crate::core::{AppResult, ResultExt};
use crate::infrastructure::logging::{LoggingGuard, init_logging};
use std::path::Path;

pub struct AppContext {
    pub config: AppConfig,
    pub logging: LoggingGuard,
}

pub fn setup(config_path: &Path) -> AppResult<AppContext> {
    let config = load_config(config_path)?;
    std::fs::create_dir_all(&config.data_dir).with_code(
        "data_dir_create_failed",
        "failed to create the data directory",
    )?;
    let logging = init_logging(&config.data_dir)?;
    tracing::info!(
        event = "logging_initialized",
        level = logging.level(),
        log_dir = %logging.log_dir().display()
    );
    Ok(AppContext { config, logging })
}
