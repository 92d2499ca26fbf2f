//! Cross-origin access control middleware.
//!
//! Every response carries the allow headers of the configured policy.
//! `OPTIONS` requests are answered here as pre-flights and never reach the
//! application handler.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{
        header::{self, HeaderMap, HeaderName, HeaderValue},
        Method, Request, StatusCode,
    },
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::config::CorsConfig;

const WILDCARD: &str = "*";

#[derive(Debug, thiserror::Error)]
pub enum CorsError {
    #[error("invalid method '{0}'")]
    Method(String),
    #[error("invalid header name '{0}'")]
    Header(String),
    #[error("invalid header value: {0}")]
    Value(#[from] header::InvalidHeaderValue),
}

/// Compiled cross-origin policy.
#[derive(Debug, Clone)]
pub struct CorsPolicy {
    any_origin: bool,
    origins: Vec<String>,
    methods: Vec<Method>,
    any_header: bool,
    headers: Vec<HeaderName>,
    allow_methods: HeaderValue,
    allow_headers: HeaderValue,
    max_age: Option<HeaderValue>,
}

impl CorsPolicy {
    pub fn from_config(config: &CorsConfig) -> Result<Self, CorsError> {
        let any_origin = config.allowed_origins.iter().any(|o| o == WILDCARD);
        let origins = config
            .allowed_origins
            .iter()
            .filter(|o| o.as_str() != WILDCARD)
            .map(|o| o.trim_end_matches('/').to_ascii_lowercase())
            .collect();

        let methods = config
            .allowed_methods
            .iter()
            .map(|m| {
                Method::from_bytes(m.to_ascii_uppercase().as_bytes())
                    .map_err(|_| CorsError::Method(m.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let any_header = config.allowed_headers.iter().any(|h| h == WILDCARD);
        let mut headers = config
            .allowed_headers
            .iter()
            .filter(|h| h.as_str() != WILDCARD)
            .map(|h| HeaderName::from_bytes(h.as_bytes()).map_err(|_| CorsError::Header(h.clone())))
            .collect::<Result<Vec<_>, _>>()?;
        // Browsers may list Origin in a pre-flight; it is always acceptable.
        if !headers.contains(&header::ORIGIN) {
            headers.push(header::ORIGIN);
        }

        let allow_methods = HeaderValue::from_str(
            &methods.iter().map(Method::as_str).collect::<Vec<_>>().join(", "),
        )?;
        let allow_headers = HeaderValue::from_str(&config.allowed_headers.join(", "))?;
        let max_age = config
            .max_age_secs
            .map(|secs| HeaderValue::from_str(&secs.to_string()))
            .transpose()?;

        Ok(Self {
            any_origin,
            origins,
            methods,
            any_header,
            headers,
            allow_methods,
            allow_headers,
            max_age,
        })
    }

    /// Value for `Access-Control-Allow-Origin`, or `None` if the caller's
    /// origin is not permitted.
    pub fn allow_origin(&self, origin: Option<&HeaderValue>) -> Option<HeaderValue> {
        if self.any_origin {
            return Some(HeaderValue::from_static(WILDCARD));
        }
        let origin = origin?;
        let normalized = origin.to_str().ok()?.trim_end_matches('/').to_ascii_lowercase();
        self.origins
            .iter()
            .any(|o| *o == normalized)
            .then(|| origin.clone())
    }

    pub fn method_allowed(&self, method: &str) -> bool {
        self.methods
            .iter()
            .any(|m| m.as_str().eq_ignore_ascii_case(method.trim()))
    }

    /// Check a comma-separated `Access-Control-Request-Headers` list.
    pub fn headers_allowed(&self, requested: &str) -> bool {
        if self.any_header {
            return true;
        }
        requested
            .split(',')
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .all(|h| self.headers.iter().any(|a| a.as_str().eq_ignore_ascii_case(h)))
    }

    /// Add the allow headers for a permitted caller.
    fn apply(&self, headers: &mut HeaderMap, allow_origin: HeaderValue) {
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, allow_origin);
        headers.insert(header::ACCESS_CONTROL_ALLOW_METHODS, self.allow_methods.clone());
        headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, self.allow_headers.clone());
        if !self.any_origin {
            headers.append(header::VARY, HeaderValue::from_static("Origin"));
        }
    }

    /// Decide whether a pre-flight is granted; returns the origin to allow.
    fn grant_preflight(&self, request: &HeaderMap) -> Option<HeaderValue> {
        let Some(allow_origin) = self.allow_origin(request.get(header::ORIGIN)) else {
            tracing::debug!("Pre-flight rejected: origin not allowed");
            return None;
        };

        let requested_method = request
            .get(header::ACCESS_CONTROL_REQUEST_METHOD)
            .and_then(|v| v.to_str().ok());
        if let Some(method) = requested_method {
            if !self.method_allowed(method) {
                tracing::debug!(method = %method, "Pre-flight rejected: method not allowed");
                return None;
            }
        }

        let requested_headers = request
            .get(header::ACCESS_CONTROL_REQUEST_HEADERS)
            .and_then(|v| v.to_str().ok());
        if let Some(list) = requested_headers {
            if !self.headers_allowed(list) {
                tracing::debug!(headers = %list, "Pre-flight rejected: headers not allowed");
                return None;
            }
        }

        Some(allow_origin)
    }

    /// Build the pre-flight answer: 204, empty body. A refused pre-flight
    /// still succeeds but carries no allow headers.
    pub fn preflight(&self, request: &HeaderMap) -> Response {
        let mut response = StatusCode::NO_CONTENT.into_response();
        let headers = response.headers_mut();
        headers.insert(
            header::VARY,
            HeaderValue::from_static(
                "Origin, Access-Control-Request-Method, Access-Control-Request-Headers",
            ),
        );

        if let Some(allow_origin) = self.grant_preflight(request) {
            headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, allow_origin);
            headers.insert(header::ACCESS_CONTROL_ALLOW_METHODS, self.allow_methods.clone());
            headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, self.allow_headers.clone());
            if let Some(max_age) = &self.max_age {
                headers.insert(header::ACCESS_CONTROL_MAX_AGE, max_age.clone());
            }
        }
        response
    }
}

pub async fn cors_middleware(
    State(policy): State<Arc<CorsPolicy>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if req.method() == Method::OPTIONS {
        return policy.preflight(req.headers());
    }

    let allow_origin = policy.allow_origin(req.headers().get(header::ORIGIN));
    let mut response = next.run(req).await;
    if let Some(allow_origin) = allow_origin {
        policy.apply(response.headers_mut(), allow_origin);
    }
    response
}
