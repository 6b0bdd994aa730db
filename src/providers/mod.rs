//! Upstream query service integration

mod genie;

use thiserror::Error;

pub use genie::GenieClient;

#[derive(Debug, Error)]
pub enum GenieError {
    #[error("Genie is not configured. Please set {0}.")]
    NotConfigured(&'static str),

    #[error("request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("unexpected response: {0}")]
    InvalidResponse(String),

    #[error("Genie message did not complete within {0} seconds")]
    Timeout(u64),

    #[error("Genie could not answer: {0}")]
    Failed(String),
}
