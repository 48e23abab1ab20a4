//! Custom Extractors
//!
//! Axum extractors for request metadata.

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, FromRequest, FromRequestParts, Request},
    http::request::Parts,
    Json,
};
use axum_extra::headers::{HeaderMapExt, UserAgent};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::domain::ClientMetadata;
use crate::shared::error::AppError;
use crate::shared::validation::validation_error;

/// JSON body that has passed its `validator` rules. Malformed bodies and
/// rule violations are both reported as 400.
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::validation(rejection.body_text()))?;
        value.validate().map_err(validation_error)?;
        Ok(ValidatedJson(value))
    }
}

/// Caller IP and user agent, for activity records.
///
/// The IP is the first `X-Forwarded-For` hop when present, otherwise the
/// peer address.
#[derive(Debug, Clone, Default)]
pub struct ClientInfo(pub ClientMetadata);

impl<S> FromRequestParts<S> for ClientInfo
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let forwarded = parts
            .headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(|ip| ip.trim().to_string())
            .filter(|ip| !ip.is_empty());

        let ip_address = forwarded.or_else(|| {
            parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        });

        let user_agent = parts
            .headers
            .typed_get::<UserAgent>()
            .map(|ua| ua.as_str().to_string());

        Ok(ClientInfo(ClientMetadata {
            ip_address,
            user_agent,
        }))
    }
}
