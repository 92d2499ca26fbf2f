//! The backend responder's handler.
//!
//! Every method on every path gets the same answer; nothing in the request is
//! read.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
};

/// Handler state: the fixed payload.
#[derive(Debug, Clone)]
pub struct Greeting(pub Arc<str>);

impl Greeting {
    pub fn new(text: &str) -> Self {
        Self(Arc::from(text))
    }
}

pub async fn greet(State(greeting): State<Greeting>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        greeting.0.to_string(),
    )
}
