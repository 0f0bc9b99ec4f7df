pub mod uscis;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StatusSourceError {
    #[error("status request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("non-ok response received: {0}")]
    UnexpectedResponse(reqwest::StatusCode),

    #[error("status section not found for case {0}")]
    StatusNotFound(String),
}

/// Where the current status text of a receipt number comes from.
#[async_trait::async_trait]
pub trait StatusSource: Send + Sync {
    async fn fetch_status(&self, case_id: &str) -> Result<String, StatusSourceError>;
}
