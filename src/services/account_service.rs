//! Domain service for user accounts.
//!
//! Handles sign-up, credential checks and both password change flows
//! (signed-in user and reset token).

use thiserror::Error;

use crate::models::user::{PasswordChangeIdentity, User};

/// Errors specific to account operations.
#[derive(Debug, Error)]
pub enum AccountError {
    /// Every failed field check, in form order.
    #[error("{}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("username is already taken")]
    UsernameTaken,

    #[error("username is not specified")]
    UsernameMissing,

    #[error("user not found")]
    UserNotFound,

    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("password reset link is invalid or has expired")]
    InvalidResetToken,

    #[error("cannot send email: {0}")]
    Notification(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AccountError {
    /// Messages suitable for showing next to the form.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        match self {
            Self::Validation(errors) => errors.clone(),
            Self::Notification(_) => vec!["cannot send email, try again later".to_string()],
            Self::Database(_) | Self::Internal(_) => vec!["internal error".to_string()],
            other => vec![other.to_string()],
        }
    }
}

impl From<sea_orm::DbErr> for AccountError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for AccountError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Domain service trait for accounts.
#[async_trait::async_trait]
pub trait AccountService: Send + Sync {
    /// Creates an account and sends the welcome notification.
    ///
    /// # Errors
    ///
    /// Returns [`AccountError::Validation`] with every failed check, or
    /// [`AccountError::UsernameTaken`].
    async fn sign_up(
        &self,
        username: &str,
        email: &str,
        password: &str,
        confirmation: &str,
    ) -> Result<User, AccountError>;

    /// # Errors
    ///
    /// Returns [`AccountError::InvalidCredentials`] for an unknown user and
    /// for a wrong password alike.
    async fn sign_in(&self, username: &str, password: &str) -> Result<User, AccountError>;

    /// Issues a reset token and mails the link `<base_url>/changepwd?a=r&t=<token>`.
    async fn request_password_reset(
        &self,
        username: &str,
        base_url: &str,
    ) -> Result<(), AccountError>;

    /// Changes the password of the identified user and clears any reset token.
    ///
    /// # Errors
    ///
    /// Returns [`AccountError::InvalidResetToken`] when the token is unknown
    /// or expired.
    async fn change_password(
        &self,
        identity: &PasswordChangeIdentity,
        password: &str,
        confirmation: &str,
    ) -> Result<User, AccountError>;

    async fn user_info(&self, username: &str) -> Result<User, AccountError>;

    async fn list_users(&self) -> Result<Vec<User>, AccountError>;
}
