//! Session-backed identity.
//!
//! A request is signed in when the session carries `authenticated = true`
//! together with a username. An anonymous session may instead hold a
//! password reset token taken from an e-mailed link.

use axum::{
    extract::Request,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use super::WebError;

pub const AUTHENTICATED_KEY: &str = "authenticated";
pub const USERNAME_KEY: &str = "username";
pub const RESET_TOKEN_KEY: &str = "reset_token";
pub const FLASH_KEY: &str = "flash";

/// Username of the signed-in caller, set by [`require_user`].
#[derive(Debug, Clone)]
pub struct CurrentUser(pub String);

pub async fn current_user(session: &Session) -> Result<Option<String>, WebError> {
    let authenticated = session
        .get::<bool>(AUTHENTICATED_KEY)
        .await?
        .unwrap_or(false);
    if !authenticated {
        return Ok(None);
    }

    Ok(session
        .get::<String>(USERNAME_KEY)
        .await?
        .filter(|username| !username.is_empty()))
}

/// Marks the session as signed in under a fresh session id.
pub async fn sign_in(session: &Session, username: &str) -> Result<(), WebError> {
    session.cycle_id().await?;
    session.remove::<String>(RESET_TOKEN_KEY).await?;
    session.insert(AUTHENTICATED_KEY, true).await?;
    session.insert(USERNAME_KEY, username).await?;
    Ok(())
}

pub async fn sign_out(session: &Session) -> Result<(), WebError> {
    session.flush().await?;
    Ok(())
}

pub async fn reset_token(session: &Session) -> Result<Option<String>, WebError> {
    Ok(session
        .get::<String>(RESET_TOKEN_KEY)
        .await?
        .filter(|token| !token.is_empty()))
}

pub async fn set_reset_token(session: &Session, token: &str) -> Result<(), WebError> {
    session.insert(RESET_TOKEN_KEY, token).await?;
    Ok(())
}

pub async fn clear_reset_token(session: &Session) -> Result<(), WebError> {
    session.remove::<String>(RESET_TOKEN_KEY).await?;
    Ok(())
}

/// Queues messages for the next page view.
pub async fn push_flash(session: &Session, messages: Vec<String>) -> Result<(), WebError> {
    if messages.is_empty() {
        return Ok(());
    }
    let mut queued = session
        .get::<Vec<String>>(FLASH_KEY)
        .await?
        .unwrap_or_default();
    queued.extend(messages);
    session.insert(FLASH_KEY, queued).await?;
    Ok(())
}

pub async fn take_flash(session: &Session) -> Result<Vec<String>, WebError> {
    Ok(session
        .remove::<Vec<String>>(FLASH_KEY)
        .await?
        .unwrap_or_default())
}

/// Lets signed-in requests through with a [`CurrentUser`] extension and
/// sends everybody else to the sign-in page.
pub async fn require_user(session: Session, mut request: Request, next: Next) -> Response {
    match current_user(&session).await {
        Ok(Some(username)) => {
            tracing::Span::current().record("user_id", username.as_str());
            request.extensions_mut().insert(CurrentUser(username));
            next.run(request).await
        }
        Ok(None) => Redirect::to("/signin").into_response(),
        Err(e) => e.into_response(),
    }
}
