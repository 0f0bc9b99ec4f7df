#![allow(dead_code)]

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use gctracker::clients::{StatusSource, StatusSourceError};
use gctracker::config::Config;
use gctracker::db::Store;
use gctracker::services::{Notifier, NotifyError};
use gctracker::state::SharedState;
use reqwest::StatusCode;

pub const CASE_A: &str = "EAC2190012345";
pub const CASE_B: &str = "LIN2190054321";

/// Status source answering from a table. Unknown ids fail like a page
/// without a status section; ids marked with [`FakeSource::fail`] fail like
/// an outage.
#[derive(Default)]
pub struct FakeSource {
    statuses: Mutex<HashMap<String, Option<String>>>,
    calls: AtomicUsize,
}

impl FakeSource {
    pub fn set(&self, case_id: &str, status: &str) {
        self.statuses
            .lock()
            .unwrap()
            .insert(case_id.to_string(), Some(status.to_string()));
    }

    pub fn fail(&self, case_id: &str) {
        self.statuses
            .lock()
            .unwrap()
            .insert(case_id.to_string(), None);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl StatusSource for FakeSource {
    async fn fetch_status(&self, case_id: &str) -> Result<String, StatusSourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.statuses.lock().unwrap().get(case_id) {
            Some(Some(status)) => Ok(status.clone()),
            Some(None) => Err(StatusSourceError::UnexpectedResponse(
                StatusCode::SERVICE_UNAVAILABLE,
            )),
            None => Err(StatusSourceError::StatusNotFound(case_id.to_string())),
        }
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn messages_to(&self, to: &str) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter(|(recipient, _)| recipient == to)
            .map(|(_, message)| message)
            .collect()
    }

    /// Token from the last reset link mailed to `to`.
    pub fn reset_token_for(&self, to: &str) -> Option<String> {
        self.messages_to(to).iter().rev().find_map(|message| {
            let start = message.find("t=")? + 2;
            let rest = &message[start..];
            let end = rest.find(' ').unwrap_or(rest.len());
            Some(rest[..end].to_string())
        })
    }
}

#[async_trait::async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, to: &str, message: &str) -> Result<(), NotifyError> {
        if to.is_empty() {
            return Err(NotifyError::EmptyRecipient);
        }
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), message.to_string()));
        Ok(())
    }
}

pub fn test_config() -> Config {
    let mut config = Config::default();
    config.general.database_path = "sqlite::memory:".to_string();
    config.server.secure_cookies = false;
    config.security.argon2_memory_cost_kib = 1024;
    config.security.argon2_time_cost = 1;
    config
}

/// SQLite file in the temp directory, removed on drop.
pub struct TempDb {
    path: PathBuf,
}

impl TempDb {
    fn new() -> Self {
        let path = std::env::temp_dir().join(format!("gctracker-test-{}.db", uuid::Uuid::new_v4()));
        Self { path }
    }

    fn url(&self) -> String {
        format!("sqlite:{}", self.path.display())
    }
}

impl Drop for TempDb {
    fn drop(&mut self) {
        for suffix in ["", "-journal", "-wal", "-shm"] {
            let mut file = self.path.clone().into_os_string();
            file.push(suffix);
            let _ = std::fs::remove_file(file);
        }
    }
}

pub struct TestContext {
    pub state: SharedState,
    pub source: Arc<FakeSource>,
    pub notifier: Arc<RecordingNotifier>,
    _db: Option<TempDb>,
}

pub async fn setup() -> TestContext {
    setup_with(test_config()).await
}

pub async fn setup_with(config: Config) -> TestContext {
    let store = Store::new(&config.general.database_path)
        .await
        .expect("Failed to open test database");
    with_store(config, store, None)
}

/// Context on a database file with a connection pool, so transactions
/// really run side by side.
pub async fn setup_file_db() -> TestContext {
    let db = TempDb::new();
    let mut config = test_config();
    config.general.database_path = db.url();

    let store = Store::with_pool_options(&config.general.database_path, 5, 1)
        .await
        .expect("Failed to open test database file");
    with_store(config, store, Some(db))
}

fn with_store(config: Config, store: Store, db: Option<TempDb>) -> TestContext {
    let source = Arc::new(FakeSource::default());
    let notifier = Arc::new(RecordingNotifier::default());

    let state = SharedState::with_components(config, store, source.clone(), notifier.clone());

    TestContext {
        state,
        source,
        notifier,
        _db: db,
    }
}

/// Creates a user with password `password123`.
pub async fn create_user(ctx: &TestContext, username: &str) {
    ctx.state
        .account_service
        .sign_up(
            username,
            &format!("{username}@example.com"),
            "password123",
            "password123",
        )
        .await
        .expect("Failed to create user");
}
