//! Bearer token extraction.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use keyward_auth::Identity;

use crate::error::ApiError;
use crate::state::AppState;

/// The authenticated caller of a request.
///
/// Extracting it resolves `Authorization: Bearer <token>` through the
/// configured [`keyward_auth::Authenticator`]; failure rejects with 401.
#[derive(Debug, Clone)]
pub struct Caller(pub Identity);

/// Returns the token from an `Authorization: Bearer` header value.
fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

impl FromRequestParts<AppState> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = match parts.headers.get(AUTHORIZATION) {
            None => None,
            Some(value) => {
                let value = value
                    .to_str()
                    .map_err(|_| ApiError::unauthorized("malformed authorization header"))?;
                Some(
                    bearer_token(value)
                        .ok_or_else(|| ApiError::unauthorized("expected a bearer token"))?,
                )
            },
        };

        let identity = state.authenticator.authenticate(header).await?;
        Ok(Caller(identity))
    }
}
