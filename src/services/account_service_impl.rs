//! `SeaORM` implementation of the `AccountService` trait.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::config::SecurityConfig;
use crate::db::{Store, is_unique_violation};
use crate::models::user::{PasswordChangeIdentity, User};
use crate::models::validation::{
    collect_errors, validate_email, validate_password, validate_username,
};
use crate::services::account_service::{AccountError, AccountService};
use crate::services::notifier::{Notifier, deliver};

pub struct SeaOrmAccountService {
    store: Store,
    notifier: Arc<dyn Notifier>,
    security: SecurityConfig,
}

impl SeaOrmAccountService {
    #[must_use]
    pub fn new(store: Store, notifier: Arc<dyn Notifier>, security: SecurityConfig) -> Self {
        Self {
            store,
            notifier,
            security,
        }
    }

    /// Tokens issued at or before this timestamp are expired.
    fn token_cutoff(&self) -> i64 {
        chrono::Utc::now().timestamp() - self.security.reset_token_ttl_seconds
    }

    async fn resolve_identity(
        &self,
        identity: &PasswordChangeIdentity,
    ) -> Result<User, AccountError> {
        match identity {
            PasswordChangeIdentity::Authenticated(username) => self
                .store
                .get_user_by_username(username)
                .await?
                .ok_or(AccountError::UserNotFound),
            PasswordChangeIdentity::ResetToken(token) => {
                if token.is_empty() {
                    return Err(AccountError::InvalidResetToken);
                }
                self.store
                    .get_user_by_reset_token(token, self.token_cutoff())
                    .await?
                    .ok_or(AccountError::InvalidResetToken)
            }
        }
    }
}

#[async_trait]
impl AccountService for SeaOrmAccountService {
    async fn sign_up(
        &self,
        username: &str,
        email: &str,
        password: &str,
        confirmation: &str,
    ) -> Result<User, AccountError> {
        let username = username.trim();
        let email = email.trim();

        let mut errors = collect_errors([validate_username(username)]);
        if errors.is_empty() && self.store.username_exists(username).await? {
            errors.push(AccountError::UsernameTaken.to_string());
        }
        errors.extend(collect_errors([
            validate_email(email),
            validate_password(password, confirmation),
        ]));

        if !errors.is_empty() {
            return Err(AccountError::Validation(errors));
        }

        let user = match self
            .store
            .create_user(username, email, password, &self.security)
            .await
        {
            Ok(user) => user,
            Err(e) if is_unique_violation(&e) => return Err(AccountError::UsernameTaken),
            Err(e) => return Err(e.into()),
        };

        info!(username = %user.username, "Account created");
        deliver(
            self.notifier.as_ref(),
            &user.email,
            &format!("Your account '{}' has been created.", user.username),
        )
        .await;

        Ok(user)
    }

    async fn sign_in(&self, username: &str, password: &str) -> Result<User, AccountError> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(AccountError::InvalidCredentials);
        }

        if !self
            .store
            .verify_user_password(username, password, &self.security)
            .await?
        {
            return Err(AccountError::InvalidCredentials);
        }

        self.store
            .get_user_by_username(username)
            .await?
            .ok_or(AccountError::InvalidCredentials)
    }

    async fn request_password_reset(
        &self,
        username: &str,
        base_url: &str,
    ) -> Result<(), AccountError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(AccountError::UsernameMissing);
        }

        let user = self
            .store
            .get_user_by_username(username)
            .await?
            .ok_or(AccountError::UserNotFound)?;

        let token = uuid::Uuid::new_v4().to_string();
        self.store
            .set_reset_token(&user.username, &token, chrono::Utc::now().timestamp())
            .await?;

        let link = format!(
            "{}/changepwd?a=r&t={token}",
            base_url.trim_end_matches('/')
        );
        let message = format!("Please follow the link {link} to reset your password.");

        self.notifier
            .send(&user.email, &message)
            .await
            .map_err(|e| {
                metrics::counter!("notifications_failed_total").increment(1);
                AccountError::Notification(e.to_string())
            })?;

        info!(username = %user.username, "Password reset link issued");
        Ok(())
    }

    async fn change_password(
        &self,
        identity: &PasswordChangeIdentity,
        password: &str,
        confirmation: &str,
    ) -> Result<User, AccountError> {
        let user = self.resolve_identity(identity).await?;

        validate_password(password, confirmation)
            .map_err(|e| AccountError::Validation(vec![e]))?;

        match identity {
            PasswordChangeIdentity::Authenticated(_) => {
                self.store
                    .update_user_password(&user.username, password, &self.security)
                    .await?;
            }
            PasswordChangeIdentity::ResetToken(token) => {
                let consumed = self
                    .store
                    .reset_password_with_token(
                        token,
                        self.token_cutoff(),
                        password,
                        &self.security,
                    )
                    .await?;
                if !consumed {
                    return Err(AccountError::InvalidResetToken);
                }
            }
        }

        info!(username = %user.username, "Password changed");
        deliver(
            self.notifier.as_ref(),
            &user.email,
            "Your password has been changed.",
        )
        .await;

        Ok(user)
    }

    async fn user_info(&self, username: &str) -> Result<User, AccountError> {
        self.store
            .get_user_by_username(username)
            .await?
            .ok_or(AccountError::UserNotFound)
    }

    async fn list_users(&self) -> Result<Vec<User>, AccountError> {
        Ok(self.store.list_users().await?)
    }
}
