use axum::{
    Extension,
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use std::sync::Arc;
use tower_sessions::Session;

use super::form::FormData;
use super::session::{self, CurrentUser};
use super::{AppState, WebError, templates};
use crate::services::CaseError;

/// GET /
pub async fn index(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(username)): Extension<CurrentUser>,
    session: Session,
) -> Result<Html<String>, WebError> {
    let cases = state.cases().list_cases(&username).await?;
    let flash = session::take_flash(&session).await?;
    Ok(Html(templates::cases_page(&username, &cases, &flash)))
}

/// POST /case
///
/// The pressed submit button (`add` or `delete`) selects the action.
/// Problems are shown on the case list after the redirect. Anonymous
/// requests are ignored.
pub async fn update_cases(
    State(state): State<Arc<AppState>>,
    session: Session,
    form: FormData,
) -> Result<Redirect, WebError> {
    let Some(username) = session::current_user(&session).await? else {
        return Ok(Redirect::to("/"));
    };

    let result = if form.has("add") {
        state
            .cases()
            .add_case(&username, form.get("case"), form.get("name"))
            .await
            .map(|case| tracing::info!(case_id = %case.id, username = %username, "Case added"))
    } else if form.has("delete") {
        state
            .cases()
            .delete_cases(&username, &form.all("cases"))
            .await
            .map(|outcome| {
                tracing::info!(
                    username = %username,
                    unlinked = outcome.unlinked,
                    removed = outcome.removed.len(),
                    "Cases deleted"
                );
            })
    } else {
        Ok(())
    };

    if let Err(e) = result {
        if !matches!(e, CaseError::Validation(_) | CaseError::UserNotFound) {
            tracing::error!(username = %username, error = %e, "Case update failed");
        }
        session::push_flash(&session, e.messages()).await?;
    }

    Ok(Redirect::to("/"))
}

/// GET /update
///
/// Runs a synchronization pass; answers `OK`, or `FAIL` when any case
/// could not be checked.
pub async fn sync(State(state): State<Arc<AppState>>) -> Response {
    match state.cases().sync_all().await {
        Ok(report) if report.is_success() => "OK".into_response(),
        Ok(report) => {
            tracing::warn!(failed = report.failed, "Case sync finished with failures");
            (StatusCode::BAD_REQUEST, "FAIL").into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "Case sync failed");
            (StatusCode::BAD_REQUEST, "FAIL").into_response()
        }
    }
}
