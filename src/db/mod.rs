use crate::config::SecurityConfig;
use crate::models::case::Case;
use crate::models::user::User;
use anyhow::Result;
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr, SqlErr};
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub mod migrator;
pub mod repositories;

pub use repositories::case::{TrackOutcome, UntrackOutcome};

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        // Every pooled connection to an in-memory database sees its own
        // empty database, so those are pinned to a single connection.
        let in_memory = db_url.contains(":memory:");
        let (max_connections, min_connections) = if in_memory {
            (1, 1)
        } else {
            (max_connections, min_connections)
        };

        if !in_memory {
            let path_str = db_url.trim_start_matches("sqlite:").trim_start_matches("//");
            let path_str = path_str.split('?').next().unwrap_or(path_str);
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    fn case_repo(&self) -> repositories::case::CaseRepository {
        repositories::case::CaseRepository::new(self.conn.clone())
    }

    // ========================================================================
    // Users
    // ========================================================================

    pub async fn create_user(
        &self,
        username: &str,
        email: &str,
        password: &str,
        security: &SecurityConfig,
    ) -> Result<User> {
        self.user_repo()
            .create(username, email, password, security)
            .await
    }

    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.user_repo().get_by_username(username).await
    }

    pub async fn username_exists(&self, username: &str) -> Result<bool> {
        self.user_repo().exists(username).await
    }

    pub async fn list_users(&self) -> Result<Vec<User>> {
        self.user_repo().list_all().await
    }

    pub async fn verify_user_password(
        &self,
        username: &str,
        password: &str,
        security: &SecurityConfig,
    ) -> Result<bool> {
        self.user_repo()
            .verify_password(username, password, security)
            .await
    }

    pub async fn update_user_password(
        &self,
        username: &str,
        new_password: &str,
        security: &SecurityConfig,
    ) -> Result<()> {
        self.user_repo()
            .update_password(username, new_password, security)
            .await
    }

    pub async fn set_reset_token(&self, username: &str, token: &str, issued_at: i64) -> Result<()> {
        self.user_repo()
            .set_reset_token(username, token, issued_at)
            .await
    }

    pub async fn get_user_by_reset_token(
        &self,
        token: &str,
        issued_after: i64,
    ) -> Result<Option<User>> {
        self.user_repo()
            .get_by_reset_token(token, issued_after)
            .await
    }

    pub async fn reset_password_with_token(
        &self,
        token: &str,
        issued_after: i64,
        new_password: &str,
        security: &SecurityConfig,
    ) -> Result<bool> {
        self.user_repo()
            .consume_reset_token(token, issued_after, new_password, security)
            .await
    }

    pub async fn users_tracking_case(&self, case_id: &str) -> Result<Vec<User>> {
        self.user_repo().tracking_case(case_id).await
    }

    // ========================================================================
    // Cases
    // ========================================================================

    pub async fn get_case(&self, id: &str) -> Result<Option<Case>> {
        self.case_repo().get(id).await
    }

    pub async fn list_cases_for_user(&self, user_id: i32) -> Result<Vec<Case>> {
        self.case_repo().list_for_user(user_id).await
    }

    pub async fn list_all_cases(&self) -> Result<Vec<Case>> {
        self.case_repo().list_all().await
    }

    pub async fn case_count_for_user(&self, user_id: i32) -> Result<u64> {
        self.case_repo().count_for_user(user_id).await
    }

    pub async fn track_case(
        &self,
        user_id: i32,
        case_id: &str,
        name: &str,
        initial_status: &str,
    ) -> Result<TrackOutcome> {
        self.case_repo()
            .track(user_id, case_id, name, initial_status)
            .await
    }

    pub async fn untrack_cases(&self, user_id: i32, case_ids: &[String]) -> Result<UntrackOutcome> {
        self.case_repo().untrack(user_id, case_ids).await
    }

    pub async fn record_case_status_change(
        &self,
        case_id: &str,
        expected: &str,
        status: &str,
    ) -> Result<bool> {
        self.case_repo()
            .record_status_change(case_id, expected, status)
            .await
    }

    pub async fn touch_case_checked(&self, case_id: &str) -> Result<()> {
        self.case_repo().touch_checked(case_id).await
    }
}

/// Whether a repository error was caused by a unique index.
#[must_use]
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.downcast_ref::<DbErr>()
        .and_then(DbErr::sql_err)
        .is_some_and(|e| matches!(e, SqlErr::UniqueConstraintViolation(_)))
}
