//! Stage-tagged errors for a discovery run.
use crate::analysis::{BootstrapError, FilterError};
use crate::config::ConfigError;
use super::edges::EdgeError;
use thiserror::Error;

pub type DiscoveryResult<T> = Result<T, DiscoveryError>;

/// Why a run failed. A failed run publishes nothing.
#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("EWMA filtering failed: {0}")]
    Filtering(#[from] FilterError),
    #[error("Bootstrap analysis failed: {0}")]
    Bootstrap(#[from] BootstrapError),
    #[error("Causal discovery failed: {0}")]
    Discovery(String),
    #[error("Causal discovery cancelled")]
    Cancelled,
    #[error("Configuration rejected: {0}")]
    Config(#[from] ConfigError),
}

impl From<EdgeError> for DiscoveryError {
    fn from(e: EdgeError) -> Self {
        match e {
            EdgeError::Cancelled => DiscoveryError::Cancelled,
        }
    }
}
