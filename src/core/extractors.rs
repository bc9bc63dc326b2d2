//! Axum extractors for the acting principal and the public request URL

use axum::extract::{FromRef, FromRequestParts, OriginalUri};
use axum::http::header::HOST;
use axum::http::request::Parts;
use std::convert::Infallible;
use url::Url;

use crate::core::auth::{AdminRoles, Claims, Principal};
use crate::core::error::ServiceError;

/// The principal of the current request, `None` for anonymous callers
///
/// An upstream authentication layer verifies the token and stores the decoded
/// [`Claims`] in the request extensions; this extractor translates them with
/// the configured administrative roles.
#[derive(Debug, Clone)]
pub struct CurrentPrincipal(pub Option<Principal>);

impl CurrentPrincipal {
    pub fn principal(&self) -> Option<&Principal> {
        self.0.as_ref()
    }
}

impl<S> FromRequestParts<S> for CurrentPrincipal
where
    AdminRoles: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let admin_roles = AdminRoles::from_ref(state);
        let principal = parts
            .extensions
            .get::<Claims>()
            .map(|claims| Principal::from_claims(claims, &admin_roles));
        Ok(CurrentPrincipal(principal))
    }
}

/// Absolute URL of the current request, as the client addressed it
///
/// Used to build pagination links. The scheme honours `X-Forwarded-Proto`;
/// the path is the original one, before any router nesting stripped it.
#[derive(Debug, Clone)]
pub struct RequestUrl(pub Url);

impl<S> FromRequestParts<S> for RequestUrl
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let uri = parts
            .extensions
            .get::<OriginalUri>()
            .map(|original| original.0.clone())
            .unwrap_or_else(|| parts.uri.clone());

        let scheme = parts
            .headers
            .get("x-forwarded-proto")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("http");

        let host = parts
            .headers
            .get(HOST)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .or_else(|| uri.authority().map(|a| a.to_string()))
            .unwrap_or_else(|| "localhost".to_string());

        let path_and_query = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");

        Url::parse(&format!("{}://{}{}", scheme, host, path_and_query))
            .map(RequestUrl)
            .map_err(|e| ServiceError::BadRequest(format!("Invalid request URL: {}", e)))
    }
}
