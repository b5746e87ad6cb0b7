use crate::api::AppState;
use crate::api::middleware::{CurrentSession, expired_session_cookie, session_cookie};
use crate::domain::session::{AccessToken, Session, SessionId};
use crate::error::{AppError, Result};
use axum::{
    Json,
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
}

/// Authorization URL the front end sends the user to.
pub async fn authorize_url(State(state): State<AppState>) -> Result<String> {
    state.tokens.clients().authorize_url()
}

pub async fn client_id(State(state): State<AppState>) -> String {
    state.tokens.clients().client_id().to_string()
}

/// Redeems the authorization code into a fresh session and returns to the app.
#[tracing::instrument(err(level = "warn"), skip_all)]
pub async fn callback(
    State(state): State<AppState>,
    current: CurrentSession,
    Query(params): Query<CallbackParams>,
) -> Result<Response> {
    let code =
        params.code.filter(|c| !c.is_empty()).ok_or_else(|| AppError::BadRequest("Missing authorization code".into()))?;

    let mut broker = state.tokens.broker(Session::default());
    broker.exchange_code(&code).await?;

    let id = SessionId::generate();
    state.sessions.save(id, broker.session()).await.map_err(AppError::SessionStore)?;
    if let Some(previous) = current.id
        && let Err(e) = state.sessions.delete(previous).await
    {
        tracing::warn!(error = %e, "Failed to delete the replaced session");
    }

    let cookie = session_cookie(id, &state.config.session)?;
    Ok(([(header::SET_COOKIE, cookie)], Redirect::to("/")).into_response())
}

/// Viewer token for the browser; 401 until the user has signed in.
pub async fn public_token(State(state): State<AppState>, current: CurrentSession) -> Result<Json<AccessToken>> {
    let mut broker = state.tokens.broker(current.session);
    if !broker.is_authorized() {
        return Err(AppError::Unauthorized);
    }

    let expires_at = broker.session().expires_at;
    let token = broker.public_token().await?;

    if broker.session().expires_at != expires_at
        && let Some(id) = current.id
    {
        state.sessions.save(id, broker.session()).await.map_err(AppError::SessionStore)?;
    }

    Ok(Json(token))
}

pub async fn signout(State(state): State<AppState>, current: CurrentSession) -> Result<Response> {
    if let Some(id) = current.id {
        state.sessions.delete(id).await.map_err(AppError::SessionStore)?;
        tracing::info!("Session signed out");
    }

    let cookie = expired_session_cookie(&state.config.session)?;
    Ok(([(header::SET_COOKIE, cookie)], Redirect::to("/")).into_response())
}
