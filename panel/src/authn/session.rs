//! GitHub session cookie authentication

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::header::COOKIE;
use axum::http::request::Parts;
use secrecy::SecretString;
use tracing::debug;

use crate::errors::PanelError;
use crate::models::user::User;
use crate::server::state::ServerState;

/// Name of the cookie holding the GitHub access token
pub const TOKEN_COOKIE: &str = "token";

/// Value of the `token` cookie in a `Cookie` header
pub fn get_token_cookie(cookies: &str) -> Option<&str> {
    cookies
        .split(';')
        .map(str::trim)
        .find_map(|cookie| match cookie.split_once('=') {
            Some((name, value)) if name == TOKEN_COOKIE => Some(value),
            _ => None,
        })
        .filter(|value| !value.is_empty())
}

fn token_from_parts(parts: &Parts) -> Option<SecretString> {
    parts
        .headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(get_token_cookie)
        .map(|token| SecretString::from(token.to_string()))
}

/// A request made by a member of the organization
pub struct AuthUser(pub User);

impl FromRequestParts<Arc<ServerState>> for AuthUser {
    type Rejection = PanelError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<ServerState>,
    ) -> Result<Self, Self::Rejection> {
        let token = token_from_parts(parts).ok_or(PanelError::Unauthenticated)?;

        let user = state
            .github
            .get_user_info(&token)
            .await
            .map_err(|e| match e {
                PanelError::AuthError(message) => PanelError::AuthError(message),
                other => PanelError::AuthError(other.to_string()),
            })?;
        debug!("Authenticated {}", user.login);

        Ok(AuthUser(user))
    }
}
