// crates/edge/src/error.rs

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EdgeError {
    #[error("settings error: {0}")]
    Settings(#[from] config::ConfigError),

    #[error("core error: {0}")]
    Core(#[from] domain::CoreError),

    #[error("response build error: {0}")]
    Http(#[from] http::Error),

    #[error("not a servable rewritten resource: {0}")]
    NotFound(String),
}
