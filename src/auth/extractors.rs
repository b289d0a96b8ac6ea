use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::warn;

use super::{claims::Identity, jwt::JwtKeys};
use crate::error::AppError;

const BEARER_PREFIX: &str = "Bearer ";

/// Extracts and validates the bearer JWT, yielding the caller's identity.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub Identity);

/// Like [`AuthUser`], but an absent header means an anonymous caller.
/// A header that is present must still carry a valid token.
#[derive(Debug, Clone, Copy)]
pub struct MaybeAuthUser(pub Option<Identity>);

fn identity_from_header(header: &str, keys: &JwtKeys) -> Result<Identity, AppError> {
    let token = header
        .strip_prefix(BEARER_PREFIX)
        .ok_or_else(|| AppError::Unauthorized("Missing token".into()))?;

    match keys.verify(token) {
        Ok(claims) => Ok(claims.into()),
        Err(e) => {
            warn!(error = %e, "invalid or expired token");
            Err(AppError::Unauthorized("Invalid or expired token".into()))
        }
    }
}

fn authorization_header(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let header = authorization_header(parts)
            .ok_or_else(|| AppError::Unauthorized("Authorization header is required".into()))?;
        let keys = JwtKeys::from_ref(state);
        identity_from_header(header, &keys).map(AuthUser)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for MaybeAuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match authorization_header(parts) {
            None => Ok(MaybeAuthUser(None)),
            Some(header) => {
                let keys = JwtKeys::from_ref(state);
                identity_from_header(header, &keys).map(|id| MaybeAuthUser(Some(id)))
            }
        }
    }
}
