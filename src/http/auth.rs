use crate::errors::{AppError, AppResult};
use crate::http::pages;
use crate::http::{
    ensure_session, log_failure, session_cookie_header, status_for, viewer, with_cookie, AppState,
};
use crate::session::SessionUser;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub struct ConnectParams {
    #[serde(default)]
    pub state: Option<String>,
}

/// Renders the sign-in page and stores a fresh anti-forgery state token in the session.
pub async fn login_page(State(state): State<AppState>, headers: HeaderMap) -> AppResult<Response> {
    let viewer = viewer(&state, &headers).await;
    let (token, cookie) = ensure_session(&state, &viewer).await;
    let state_token = state
        .sessions
        .issue_state_token(&token)
        .await
        .ok_or_else(|| AppError::Internal("session vanished while issuing a state token".to_string()))?;
    let html = pages::login_page(state.identity.client_id(), &state_token, viewer.user.as_ref());
    Ok(with_cookie(Html(html).into_response(), cookie))
}

/// Completes the OAuth handshake: the body carries the one-time authorization code.
pub async fn gconnect(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<ConnectParams>,
    code: String,
) -> Response {
    let viewer = viewer(&state, &headers).await;
    let Some(token) = viewer.token.as_deref() else {
        return plain(StatusCode::UNAUTHORIZED, "Invalid state parameter.");
    };

    let presented = params.state.unwrap_or_default();
    let state_ok = state
        .sessions
        .update(token, |session| {
            let expected = session.state_token.take();
            !presented.is_empty() && expected.as_deref() == Some(presented.as_str())
        })
        .await
        .unwrap_or(false);
    if !state_ok {
        tracing::warn!("rejected gconnect with a mismatched state token");
        return plain(StatusCode::UNAUTHORIZED, "Invalid state parameter.");
    }

    if viewer.user.is_some() {
        return plain(StatusCode::OK, "Current user is already connected.");
    }

    let code = code.trim();
    if code.is_empty() {
        return plain(StatusCode::BAD_REQUEST, "Missing authorization code.");
    }

    match connect(&state, token, code).await {
        Ok((user, fresh_token)) => {
            tracing::info!(
                user_id = user.user_id,
                provider = state.identity.provider_tag(),
                "user signed in"
            );
            state
                .sessions
                .push_flash(&fresh_token, format!("You are now logged in as {}.", user.name))
                .await;
            let cookie = session_cookie_header(&state, &fresh_token);
            with_cookie(plain(StatusCode::OK, &format!("Welcome, {}!", user.name)), cookie)
        }
        Err(error) => {
            log_failure(&error);
            plain(status_for(&error), error.user_message())
        }
    }
}

/// Stores the signed-in user and moves the session to a new token, so a token
/// handed out before sign-in never becomes authenticated.
async fn connect(state: &AppState, token: &str, code: &str) -> AppResult<(SessionUser, String)> {
    let grant = state.identity.exchange_code(code).await?;
    let profile = state.identity.fetch_profile(&grant.access_token).await?;
    let user = state.catalog.sign_in(&profile)?;
    let session_user = SessionUser::from(&user);
    let expired = || AppError::Unauthenticated("Session expired during sign-in.".to_string());

    let fresh_token = state.sessions.rotate(token).await.ok_or_else(expired)?;
    let stored = session_user.clone();
    state
        .sessions
        .update(&fresh_token, move |session| {
            session.user = Some(stored);
            session.access_token = Some(grant.access_token);
        })
        .await
        .ok_or_else(expired)?;
    Ok((session_user, fresh_token))
}

/// Revokes the provider token and closes the session. A failed revocation still
/// signs the user out locally.
pub async fn gdisconnect(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let viewer = viewer(&state, &headers).await;
    let Some(token) = viewer.token.as_deref() else {
        return plain(StatusCode::UNAUTHORIZED, "Current user not connected.");
    };
    let access_token = state
        .sessions
        .update(token, |session| session.access_token.clone())
        .await
        .flatten();
    let Some(access_token) = access_token else {
        return plain(StatusCode::UNAUTHORIZED, "Current user not connected.");
    };

    let revoked = state.identity.revoke(&access_token).await;
    state.sessions.close_session(token).await;

    match revoked {
        Ok(()) => {
            tracing::info!(user_id = ?viewer.user_id(), "user signed out");
            let fresh_token = state.sessions.open_session().await;
            state.sessions.push_flash(&fresh_token, "Successfully disconnected.").await;
            let cookie = session_cookie_header(&state, &fresh_token);
            with_cookie(Redirect::to("/catalog/").into_response(), cookie)
        }
        Err(error) => {
            log_failure(&error);
            plain(
                StatusCode::BAD_REQUEST,
                "Failed to revoke token for given user; you have been signed out locally.",
            )
        }
    }
}

fn plain(status: StatusCode, message: &str) -> Response {
    (status, message.to_string()).into_response()
}
