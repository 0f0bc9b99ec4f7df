use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

use crate::clients::StatusSource;
use crate::clients::uscis::UscisClient;
use crate::config::Config;
use crate::db::Store;
use crate::services::{
    AccountService, CaseService, LogNotifier, Notifier, SeaOrmAccountService, SeaOrmCaseService,
    SmtpNotifier,
};

/// Build the HTTP client used for status checks.
fn build_shared_http_client(timeout_seconds: u64) -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_seconds))
        .user_agent("GC-Tracker/1.0")
        .pool_max_idle_per_host(10)
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build shared HTTP client: {e}"))
}

#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<RwLock<Config>>,

    pub store: Store,

    pub notifier: Arc<dyn Notifier>,

    pub account_service: Arc<dyn AccountService>,

    pub case_service: Arc<dyn CaseService>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        let http_client =
            build_shared_http_client(config.tracker.request_timeout_seconds.into())?;
        let source = Arc::new(UscisClient::with_shared_client(
            http_client,
            &config.tracker.status_url,
        )) as Arc<dyn StatusSource>;

        let notifier = if config.smtp.enabled {
            info!(host = %config.smtp.host, port = config.smtp.port, "SMTP notifications enabled");
            Arc::new(SmtpNotifier::new(&config.smtp)?) as Arc<dyn Notifier>
        } else {
            info!("SMTP disabled, notifications will only be logged");
            Arc::new(LogNotifier) as Arc<dyn Notifier>
        };

        Ok(Self::with_components(config, store, source, notifier))
    }

    /// Wires the services around an existing store, status source and
    /// notifier.
    #[must_use]
    pub fn with_components(
        config: Config,
        store: Store,
        source: Arc<dyn StatusSource>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let account_service = Arc::new(SeaOrmAccountService::new(
            store.clone(),
            notifier.clone(),
            config.security.clone(),
        )) as Arc<dyn AccountService + Send + Sync + 'static>;

        let case_service = Arc::new(SeaOrmCaseService::new(
            store.clone(),
            source,
            notifier.clone(),
            &config.tracker,
        )) as Arc<dyn CaseService + Send + Sync + 'static>;

        Self {
            config: Arc::new(RwLock::new(config)),
            store,
            notifier,
            account_service,
            case_service,
        }
    }

    pub async fn config(&self) -> Config {
        self.config.read().await.clone()
    }
}
