use crate::config::ConfigError;
use crate::telemetry::TelemetryError;
use crate::workflows::campaigns::{CampaignError, RepositoryError};

/// Failures that abort `serve` or `demo` before or while the process runs.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error("listener error: {0}")]
    Io(#[from] std::io::Error),
    #[error("campaign error: {0}")]
    Campaign(#[from] CampaignError),
}

impl From<RepositoryError> for AppError {
    fn from(value: RepositoryError) -> Self {
        Self::Campaign(CampaignError::from(value))
    }
}
