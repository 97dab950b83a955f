pub mod auth;
pub mod handlers;
pub mod json;
pub mod pages;

use crate::catalog::CatalogCore;
use crate::errors::AppError;
use crate::identity::IdentityProvider;
use crate::session::{SessionManager, SessionUser};
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<CatalogCore>,
    pub sessions: SessionManager,
    pub identity: Arc<dyn IdentityProvider>,
    pub cookie_name: Arc<str>,
}

impl AppState {
    pub fn new(
        catalog: Arc<CatalogCore>,
        sessions: SessionManager,
        identity: Arc<dyn IdentityProvider>,
        cookie_name: &str,
    ) -> Self {
        Self {
            catalog,
            sessions,
            identity,
            cookie_name: Arc::from(cookie_name),
        }
    }
}

/// Parameter names at a shared path position must match across routes, so the
/// edit/delete routes reuse `:category`/`:item` for the item name and id.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::catalog_page))
        .route("/catalog/", get(handlers::catalog_page))
        .route("/catalog/JSON/", get(json::catalog_json))
        .route(
            "/catalog/create/",
            get(handlers::create_form).post(handlers::create_submit),
        )
        .route("/catalog/:category/", get(handlers::category_page))
        .route("/catalog/:category/JSON/", get(json::category_json))
        .route("/catalog/:category/:item/:id/", get(handlers::item_page))
        .route("/catalog/:category/:item/:id/JSON/", get(json::item_json))
        .route(
            "/catalog/:category/:item/edit/",
            get(handlers::edit_form).post(handlers::edit_submit),
        )
        .route(
            "/catalog/:category/:item/delete/",
            get(handlers::delete_form).post(handlers::delete_submit),
        )
        .route("/login/", get(auth::login_page))
        .route("/gconnect", post(auth::gconnect))
        .route("/gdisconnect", get(auth::gdisconnect))
        .with_state(state)
}

/// Who is making the request, resolved from the session cookie.
#[derive(Debug, Clone, Default)]
pub struct Viewer {
    pub token: Option<String>,
    pub user: Option<SessionUser>,
}

impl Viewer {
    pub fn user_id(&self) -> Option<i64> {
        self.user.as_ref().map(|user| user.user_id)
    }
}

pub(crate) async fn viewer(state: &AppState, headers: &HeaderMap) -> Viewer {
    let Some(token) = session_cookie(headers, &state.cookie_name) else {
        return Viewer::default();
    };
    match state.sessions.get(&token).await {
        Some(session) => Viewer {
            token: Some(token),
            user: session.user,
        },
        None => Viewer::default(),
    }
}

/// Returns the viewer's session token, opening a new session when there is none.
/// The second value is the `Set-Cookie` header to send when a session was opened.
pub(crate) async fn ensure_session(state: &AppState, viewer: &Viewer) -> (String, Option<HeaderValue>) {
    if let Some(token) = &viewer.token {
        return (token.clone(), None);
    }
    let token = state.sessions.open_session().await;
    let cookie = session_cookie_header(state, &token);
    (token, cookie)
}

pub(crate) fn session_cookie_header(state: &AppState, token: &str) -> Option<HeaderValue> {
    let cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax",
        state.cookie_name, token
    );
    HeaderValue::from_str(&cookie).ok()
}

pub(crate) async fn take_flashes(state: &AppState, viewer: &Viewer) -> Vec<String> {
    match &viewer.token {
        Some(token) => state.sessions.take_flashes(token).await,
        None => Vec::new(),
    }
}

pub(crate) fn with_cookie(mut response: Response, cookie: Option<HeaderValue>) -> Response {
    if let Some(cookie) = cookie {
        response.headers_mut().append(SET_COOKIE, cookie);
    }
    response
}

fn session_cookie(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == cookie_name)
        .map(|(_, value)| value.to_string())
}

pub(crate) fn status_for(error: &AppError) -> StatusCode {
    match error {
        AppError::NotFound(_) => StatusCode::NOT_FOUND,
        AppError::Unauthorized(_) => StatusCode::FORBIDDEN,
        AppError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
        AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        AppError::Identity(_) => StatusCode::BAD_GATEWAY,
        AppError::Conflict(_) | AppError::Io(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub(crate) fn log_failure(error: &AppError) {
    match error {
        AppError::Conflict(_) | AppError::Io(_) | AppError::Internal(_) => {
            tracing::error!(error = %error, "request failed");
        }
        AppError::Identity(_) => tracing::warn!(error = %error, "identity provider failure"),
        _ => tracing::debug!(error = %error, "request rejected"),
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        log_failure(&self);
        let status = status_for(&self);
        let title = status.canonical_reason().unwrap_or("Error");
        (status, Html(pages::message_page(title, self.user_message(), None))).into_response()
    }
}
