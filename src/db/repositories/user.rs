use anyhow::{Context, Result};
use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, sea_query::Expr,
};
use std::sync::OnceLock;
use tokio::task;

use crate::config::SecurityConfig;
use crate::entities::{prelude::*, user_cases, users};
use crate::models::user::User;

impl From<users::Model> for User {
    fn from(model: users::Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            email: model.email,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

pub struct UserRepository {
    conn: DatabaseConnection,
}

impl UserRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    async fn find_model(&self, username: &str) -> Result<Option<users::Model>> {
        Users::find()
            .filter(users::Column::Username.eq(username))
            .one(&self.conn)
            .await
            .context("Failed to query user by username")
    }

    /// Hashes the password and inserts the user. Fails with a unique
    /// constraint violation when the username is taken.
    pub async fn create(
        &self,
        username: &str,
        email: &str,
        password: &str,
        config: &SecurityConfig,
    ) -> Result<User> {
        let password = password.to_string();
        let config = config.clone();
        let password_hash = task::spawn_blocking(move || hash_password(&password, &config))
            .await
            .context("Password hashing task panicked")??;

        let now = chrono::Utc::now().to_rfc3339();
        let model = users::ActiveModel {
            username: Set(username.to_string()),
            email: Set(email.to_string()),
            password_hash: Set(password_hash),
            reset_token: Set(None),
            reset_issued_at: Set(None),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&self.conn)
        .await?;

        Ok(User::from(model))
    }

    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        Ok(self.find_model(username).await?.map(User::from))
    }

    pub async fn exists(&self, username: &str) -> Result<bool> {
        let count = Users::find()
            .filter(users::Column::Username.eq(username))
            .count(&self.conn)
            .await
            .context("Failed to check username availability")?;

        Ok(count > 0)
    }

    pub async fn list_all(&self) -> Result<Vec<User>> {
        let rows = Users::find()
            .order_by_asc(users::Column::Username)
            .all(&self.conn)
            .await?;

        Ok(rows.into_iter().map(User::from).collect())
    }

    /// Checks `password` against the stored hash on the blocking pool.
    /// Unknown users are checked against a dummy hash and always fail, so
    /// both cases cost one Argon2 verification.
    pub async fn verify_password(
        &self,
        username: &str,
        password: &str,
        config: &SecurityConfig,
    ) -> Result<bool> {
        let (password_hash, known) = match self.find_model(username).await? {
            Some(user) => (user.password_hash, true),
            None => (dummy_hash(config)?.to_string(), false),
        };
        let password = password.to_string();

        let is_valid = task::spawn_blocking(move || {
            let parsed_hash = PasswordHash::new(&password_hash)
                .map_err(|e| anyhow::anyhow!("Invalid password hash format: {e}"))?;

            Ok::<bool, anyhow::Error>(
                Argon2::default()
                    .verify_password(password.as_bytes(), &parsed_hash)
                    .is_ok(),
            )
        })
        .await
        .context("Password verification task panicked")??;

        Ok(known && is_valid)
    }

    /// Replaces the password hash and discards any outstanding reset token.
    pub async fn update_password(
        &self,
        username: &str,
        new_password: &str,
        config: &SecurityConfig,
    ) -> Result<()> {
        let user = self
            .find_model(username)
            .await?
            .ok_or_else(|| anyhow::anyhow!("User not found: {username}"))?;

        let password = new_password.to_string();
        let config = config.clone();
        let new_hash = task::spawn_blocking(move || hash_password(&password, &config))
            .await
            .context("Password hashing task panicked")??;

        let now = chrono::Utc::now().to_rfc3339();

        let mut active: users::ActiveModel = user.into();
        active.password_hash = Set(new_hash);
        active.reset_token = Set(None);
        active.reset_issued_at = Set(None);
        active.updated_at = Set(now);
        active.update(&self.conn).await?;

        Ok(())
    }

    /// Sets a new password for the holder of `token` and clears the token
    /// in the same statement. Returns false when the token is unknown,
    /// expired or was already used.
    pub async fn consume_reset_token(
        &self,
        token: &str,
        issued_after: i64,
        new_password: &str,
        config: &SecurityConfig,
    ) -> Result<bool> {
        let password = new_password.to_string();
        let config = config.clone();
        let new_hash = task::spawn_blocking(move || hash_password(&password, &config))
            .await
            .context("Password hashing task panicked")??;

        let result = Users::update_many()
            .col_expr(users::Column::PasswordHash, Expr::value(new_hash))
            .col_expr(users::Column::ResetToken, Expr::value(Option::<String>::None))
            .col_expr(users::Column::ResetIssuedAt, Expr::value(Option::<i64>::None))
            .col_expr(
                users::Column::UpdatedAt,
                Expr::value(chrono::Utc::now().to_rfc3339()),
            )
            .filter(users::Column::ResetToken.eq(token))
            .filter(users::Column::ResetIssuedAt.gt(issued_after))
            .exec(&self.conn)
            .await
            .context("Failed to reset password by token")?;

        Ok(result.rows_affected == 1)
    }

    pub async fn set_reset_token(&self, username: &str, token: &str, issued_at: i64) -> Result<()> {
        let result = Users::update_many()
            .col_expr(
                users::Column::ResetToken,
                Expr::value(token),
            )
            .col_expr(
                users::Column::ResetIssuedAt,
                Expr::value(issued_at),
            )
            .filter(users::Column::Username.eq(username))
            .exec(&self.conn)
            .await?;

        if result.rows_affected == 0 {
            anyhow::bail!("User not found: {username}");
        }
        Ok(())
    }

    /// Finds the owner of `token` if it was issued after `issued_after`.
    pub async fn get_by_reset_token(&self, token: &str, issued_after: i64) -> Result<Option<User>> {
        let user = Users::find()
            .filter(users::Column::ResetToken.eq(token))
            .filter(users::Column::ResetIssuedAt.gt(issued_after))
            .one(&self.conn)
            .await
            .context("Failed to query user by reset token")?;

        Ok(user.map(User::from))
    }

    /// Users currently linked to a case.
    pub async fn tracking_case(&self, case_id: &str) -> Result<Vec<User>> {
        let rows = Users::find()
            .inner_join(UserCases)
            .filter(user_cases::Column::CaseId.eq(case_id))
            .order_by_asc(users::Column::Username)
            .all(&self.conn)
            .await
            .context("Failed to query users by case")?;

        Ok(rows.into_iter().map(User::from).collect())
    }
}

/// Hash of a random throwaway password, made once with the configured
/// params.
fn dummy_hash(config: &SecurityConfig) -> Result<&'static str> {
    static DUMMY: OnceLock<Option<String>> = OnceLock::new();
    DUMMY
        .get_or_init(|| {
            let secret = SaltString::generate(&mut OsRng);
            hash_password(secret.as_str(), config).ok()
        })
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("Failed to prepare dummy password hash"))
}

/// Hash a password using Argon2id with the configured params.
pub fn hash_password(password: &str, config: &SecurityConfig) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    let params = Params::new(
        config.argon2_memory_cost_kib,
        config.argon2_time_cost,
        config.argon2_parallelism,
        None,
    )
    .map_err(|e| anyhow::anyhow!("Invalid Argon2 params: {e}"))?;

    let hash = Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))?;

    Ok(hash.to_string())
}
