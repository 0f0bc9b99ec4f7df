use axum::{
    Router, middleware,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tower_sessions::{Expiry, SessionManagerLayer, cookie::SameSite};
use tower_sessions_sqlx_store::SqliteStore;

use crate::config::Config;
use crate::services::{AccountService, CaseService};
use crate::state::SharedState;

mod assets;
mod auth;
mod cases;
mod error;
pub mod form;
mod observability;
pub mod session;
pub mod templates;

pub use error::WebError;

use metrics_exporter_prometheus::PrometheusHandle;
use tokio::sync::RwLock;

#[derive(Clone)]
pub struct AppState {
    pub shared: Arc<SharedState>,

    /// Session rows live in the application database.
    pub session_store: SqliteStore,

    pub prometheus_handle: Option<PrometheusHandle>,
}

impl AppState {
    #[must_use]
    pub fn config(&self) -> &Arc<RwLock<Config>> {
        &self.shared.config
    }

    #[must_use]
    pub fn accounts(&self) -> &Arc<dyn AccountService> {
        &self.shared.account_service
    }

    #[must_use]
    pub fn cases(&self) -> &Arc<dyn CaseService> {
        &self.shared.case_service
    }
}

pub async fn create_app_state(
    shared: Arc<SharedState>,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<Arc<AppState>> {
    let pool = shared.store.conn.get_sqlite_connection_pool().clone();
    let session_store = SqliteStore::new(pool);
    session_store
        .migrate()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to prepare session table: {e}"))?;

    Ok(Arc::new(AppState {
        shared,
        session_store,
        prometheus_handle,
    }))
}

pub async fn router(state: Arc<AppState>) -> Router {
    let (cookie_name, secure_cookies, inactivity_minutes) = {
        let config = state.config().read().await;
        (
            config.server.cookie_name.clone(),
            config.server.secure_cookies,
            config.server.session_inactivity_minutes,
        )
    };

    let session_layer = SessionManagerLayer::new(state.session_store.clone())
        .with_name(cookie_name)
        .with_secure(secure_cookies)
        .with_http_only(true)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::minutes(
            inactivity_minutes,
        )));

    let protected_routes = Router::new()
        .route("/", get(cases::index))
        .route_layer(middleware::from_fn(session::require_user));

    Router::new()
        .merge(protected_routes)
        .route("/case", post(cases::update_cases))
        .route("/signin", get(auth::signin_form).post(auth::signin))
        .route("/signout", get(auth::signout))
        .route("/signup", get(auth::signup_form).post(auth::signup))
        .route("/resetpwd", get(auth::resetpwd_form).post(auth::resetpwd))
        .route("/changepwd", get(auth::changepwd_form).post(auth::changepwd))
        .route("/update", get(cases::sync))
        .route("/style.css", get(assets::serve_asset))
        .route("/metrics", get(observability::get_metrics))
        .layer(session_layer)
        .layer(middleware::from_fn(
            observability::security_headers_middleware,
        ))
        .layer(middleware::from_fn(observability::logging_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
