//! Authentication Middleware
//!
//! Verifies the caller's token and stores the resulting identity in the
//! request extensions. Browsers cannot set headers on a WebSocket upgrade,
//! so the gateway route also accepts a `?token=` query parameter. REST routes
//! take the `Authorization` header only.

use axum::{
    extract::{Query, Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};

use crate::application::dto::request::TokenQuery;
use crate::domain::{Identity, IdentityError};
use crate::shared::error::AppError;
use crate::startup::AppState;

/// Authenticated user extension
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub identity: Identity,
}

/// Authentication middleware that validates bearer tokens
pub async fn auth_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = header_token(&request);
    authenticate(&state, token, request, next).await
}

/// Authentication for the gateway upgrade: bearer header or `?token=`.
pub async fn gateway_auth_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = header_token(&request).or_else(|| query_token(&request));
    authenticate(&state, token, request, next).await
}

async fn authenticate(
    state: &AppState,
    token: Option<String>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = token.ok_or_else(|| AppError::Unauthorized("Missing authorization token".into()))?;

    let identity = state.identity.verify(&token).map_err(|e| match e {
        IdentityError::Expired => AppError::Unauthorized("Token expired".into()),
        IdentityError::Invalid => AppError::Unauthorized("Invalid token".into()),
        IdentityError::InvalidClaims(_) => AppError::Unauthorized("Invalid token claims".into()),
    })?;

    request.extensions_mut().insert(AuthUser { identity });

    Ok(next.run(request).await)
}

fn header_token(request: &Request) -> Option<String> {
    request
        .headers()
        .typed_get::<Authorization<Bearer>>()
        .map(|Authorization(bearer)| bearer.token().to_string())
}

fn query_token(request: &Request) -> Option<String> {
    Query::<TokenQuery>::try_from_uri(request.uri())
        .ok()
        .and_then(|Query(query)| query.token)
        .filter(|token| !token.is_empty())
}
