use axum::{
    extract::{Query, State},
    response::{Html, IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use std::sync::Arc;
use tower_sessions::Session;

use super::form::FormData;
use super::{AppState, WebError, session, templates};
use crate::models::user::PasswordChangeIdentity;
use crate::services::AccountError;

#[derive(Debug, Deserialize)]
pub struct ChangePasswordQuery {
    #[serde(default)]
    pub t: Option<String>,
}

// ============================================================================
// Sign in / out
// ============================================================================

/// GET /signin
pub async fn signin_form(session: Session) -> Result<Response, WebError> {
    if session::current_user(&session).await?.is_some() {
        return Ok(Redirect::to("/").into_response());
    }
    Ok(Html(templates::signin_page("", &[])).into_response())
}

/// POST /signin
pub async fn signin(
    State(state): State<Arc<AppState>>,
    session: Session,
    form: FormData,
) -> Result<Response, WebError> {
    if session::current_user(&session).await?.is_some() {
        return Ok(Redirect::to("/").into_response());
    }

    let username = form.get("username");
    match state
        .accounts()
        .sign_in(username, form.get("password"))
        .await
    {
        Ok(user) => {
            session::sign_in(&session, &user.username).await?;
            tracing::info!(username = %user.username, "User signed in");
            Ok(Redirect::to("/").into_response())
        }
        Err(e @ AccountError::InvalidCredentials) => {
            tracing::debug!(username, "Sign in rejected");
            Ok(Html(templates::signin_page(username, &e.messages())).into_response())
        }
        Err(e) => Err(e.into()),
    }
}

/// GET /signout
pub async fn signout(session: Session) -> Result<Redirect, WebError> {
    session::sign_out(&session).await?;
    Ok(Redirect::to("/signin"))
}

// ============================================================================
// Sign up
// ============================================================================

/// GET /signup
pub async fn signup_form(session: Session) -> Result<Response, WebError> {
    if session::current_user(&session).await?.is_some() {
        return Ok(Redirect::to("/").into_response());
    }
    Ok(Html(templates::signup_page("", "", &[])).into_response())
}

/// POST /signup
pub async fn signup(
    State(state): State<Arc<AppState>>,
    session: Session,
    form: FormData,
) -> Result<Response, WebError> {
    if session::current_user(&session).await?.is_some() {
        return Ok(Redirect::to("/").into_response());
    }

    let (username, email) = (form.get("username"), form.get("email"));
    match state
        .accounts()
        .sign_up(username, email, form.get("password"), form.get("password2"))
        .await
    {
        Ok(_) => Ok(Html(templates::message_page(
            "Account created",
            Some(("/signin", "Sign In")),
        ))
        .into_response()),
        Err(e @ (AccountError::Validation(_) | AccountError::UsernameTaken)) => {
            Ok(Html(templates::signup_page(username, email, &e.messages())).into_response())
        }
        Err(e) => Err(e.into()),
    }
}

// ============================================================================
// Password reset & change
// ============================================================================

/// GET /resetpwd
pub async fn resetpwd_form(session: Session) -> Result<Response, WebError> {
    if session::current_user(&session).await?.is_some() {
        return Ok(Redirect::to("/").into_response());
    }
    Ok(Html(templates::resetpwd_page(&[])).into_response())
}

/// POST /resetpwd
pub async fn resetpwd(
    State(state): State<Arc<AppState>>,
    session: Session,
    form: FormData,
) -> Result<Response, WebError> {
    if session::current_user(&session).await?.is_some() {
        return Ok(Redirect::to("/").into_response());
    }

    let base = state.config().read().await.server.public_base_url();

    match state
        .accounts()
        .request_password_reset(form.get("username"), &base)
        .await
    {
        Ok(()) => Ok(Html(templates::message_page(
            "Check your mailbox for the reset link.",
            None,
        ))
        .into_response()),
        Err(
            e @ (AccountError::UsernameMissing
            | AccountError::UserNotFound
            | AccountError::Notification(_)),
        ) => Ok(Html(templates::resetpwd_page(&e.messages())).into_response()),
        Err(e) => Err(e.into()),
    }
}

/// GET /changepwd
///
/// Signed-in users get the form directly. Anonymous callers arriving from a
/// reset link have the token kept in the session for the following POST.
pub async fn changepwd_form(
    session: Session,
    Query(query): Query<ChangePasswordQuery>,
) -> Result<Response, WebError> {
    if session::current_user(&session).await?.is_some() {
        return Ok(Html(templates::changepwd_page(&[])).into_response());
    }

    match query.t.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        Some(token) => {
            session::set_reset_token(&session, token).await?;
            Ok(Html(templates::changepwd_page(&[])).into_response())
        }
        None => Ok(Redirect::to("/resetpwd").into_response()),
    }
}

/// POST /changepwd
pub async fn changepwd(
    State(state): State<Arc<AppState>>,
    session: Session,
    form: FormData,
) -> Result<Response, WebError> {
    let identity = if let Some(username) = session::current_user(&session).await? {
        PasswordChangeIdentity::Authenticated(username)
    } else if let Some(token) = session::reset_token(&session).await? {
        PasswordChangeIdentity::ResetToken(token)
    } else {
        return Ok(Redirect::to("/resetpwd").into_response());
    };

    match state
        .accounts()
        .change_password(&identity, form.get("password"), form.get("password2"))
        .await
    {
        Ok(user) => {
            if matches!(identity, PasswordChangeIdentity::ResetToken(_)) {
                session::clear_reset_token(&session).await?;
                return Ok(Html(templates::message_page(
                    "Password changed",
                    Some(("/signin", "Sign In")),
                ))
                .into_response());
            }
            tracing::debug!(username = %user.username, "Password changed from session");
            Ok(Html(templates::message_page("Password changed", Some(("/", "Back"))))
                .into_response())
        }
        Err(e @ AccountError::InvalidResetToken) => {
            session::clear_reset_token(&session).await?;
            Ok(Html(templates::resetpwd_page(&e.messages())).into_response())
        }
        Err(e @ (AccountError::Validation(_) | AccountError::UserNotFound)) => {
            Ok(Html(templates::changepwd_page(&e.messages())).into_response())
        }
        Err(e) => Err(e.into()),
    }
}
