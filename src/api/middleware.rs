use crate::api::AppState;
use crate::config::SessionConfig;
use crate::domain::session::{Session, SessionId};
use crate::error::{AppError, Result};
use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, HeaderValue, header, request::Parts},
};

/// The caller's session, loaded from the store by the id in the session cookie.
///
/// `id` is `None` when the request carries no (parseable) session cookie;
/// an id the store no longer knows yields an empty session.
#[derive(Debug)]
pub struct CurrentSession {
    pub id: Option<SessionId>,
    pub session: Session,
}

impl FromRequestParts<AppState> for CurrentSession {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let Some(id) = session_id_from_headers(&parts.headers, &state.config.session.cookie_name) else {
            return Ok(Self { id: None, session: Session::default() });
        };

        let session = state.sessions.load(id).await.map_err(AppError::SessionStore)?.unwrap_or_default();
        Ok(Self { id: Some(id), session })
    }
}

pub(crate) fn session_id_from_headers(headers: &HeaderMap, cookie_name: &str) -> Option<SessionId> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == cookie_name)
        .and_then(|(_, value)| value.trim().parse().ok())
}

/// `Set-Cookie` value binding the browser to `id`.
///
/// # Errors
/// Returns `AppError::Internal` if the configured cookie name is not a valid header value.
pub(crate) fn session_cookie(id: SessionId, config: &SessionConfig) -> Result<HeaderValue> {
    let secure = if config.cookie_secure { "; Secure" } else { "" };
    let cookie =
        format!("{}={id}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}{secure}", config.cookie_name, config.ttl_secs);
    HeaderValue::from_str(&cookie).map_err(|_| AppError::Internal)
}

/// `Set-Cookie` value that makes the browser drop the session cookie.
///
/// # Errors
/// Returns `AppError::Internal` if the configured cookie name is not a valid header value.
pub(crate) fn expired_session_cookie(config: &SessionConfig) -> Result<HeaderValue> {
    let cookie = format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", config.cookie_name);
    HeaderValue::from_str(&cookie).map_err(|_| AppError::Internal)
}
