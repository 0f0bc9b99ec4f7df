//! Domain service for tracked cases.

use thiserror::Error;

use crate::db::UntrackOutcome;
use crate::models::case::{Case, SyncReport};

#[derive(Debug, Error)]
pub enum CaseError {
    #[error("{}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("user not found")]
    UserNotFound,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CaseError {
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        match self {
            Self::Validation(errors) => errors.clone(),
            Self::UserNotFound => vec![self.to_string()],
            Self::Database(_) | Self::Internal(_) => vec!["internal error".to_string()],
        }
    }
}

impl From<sea_orm::DbErr> for CaseError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for CaseError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

#[async_trait::async_trait]
pub trait CaseService: Send + Sync {
    /// Starts tracking `case_id` for the user, registering the case if it
    /// is new. Adding a case the user already tracks only renames it.
    ///
    /// # Errors
    ///
    /// Returns [`CaseError::Validation`] for a malformed id or name.
    async fn add_case(&self, username: &str, case_id: &str, name: &str)
    -> Result<Case, CaseError>;

    /// Stops tracking the given cases. Cases nobody tracks anymore are
    /// removed from the registry.
    async fn delete_cases(
        &self,
        username: &str,
        case_ids: &[String],
    ) -> Result<UntrackOutcome, CaseError>;

    async fn list_cases(&self, username: &str) -> Result<Vec<Case>, CaseError>;

    async fn list_all_cases(&self) -> Result<Vec<Case>, CaseError>;

    /// Re-checks every registered case and notifies the users of each case
    /// whose status changed. Failures of single cases are counted in the
    /// report, not returned.
    async fn sync_all(&self) -> Result<SyncReport, CaseError>;
}
