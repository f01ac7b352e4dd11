//! Request extractors
//!
//! `RequestContext` carries the per-request identifiers the services need:
//! the client IP (honoring forwarding headers set by the edge) and the
//! payment header when one was presented.

use std::net::IpAddr;

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
};
use serde::Deserialize;
use uuid::Uuid;

/// Context extracted from every request
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: Uuid,
    pub client_ip: Option<IpAddr>,
    pub payment: Option<String>,
}

fn forwarded_client_ip(parts: &Parts) -> Option<IpAddr> {
    // first hop of X-Forwarded-For wins, then X-Real-IP
    if let Some(forwarded) = parts.headers.get("x-forwarded-for") {
        if let Ok(value) = forwarded.to_str() {
            if let Some(first) = value.split(',').next() {
                if let Ok(ip) = first.trim().parse() {
                    return Some(ip);
                }
            }
        }
    }
    parts
        .headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let payment = parts
            .headers
            .get("x-payment")
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string());

        Ok(Self {
            request_id: Uuid::new_v4(),
            client_ip: forwarded_client_ip(parts),
            payment,
        })
    }
}

/// Cursor-based listing parameters shared by the clip and DVR listings
#[derive(Debug, Clone, Deserialize)]
pub struct ListQuery {
    pub internal_name: String,
    pub cursor: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: u64,
    #[serde(default)]
    pub backward: bool,
}

fn default_limit() -> u64 {
    50
}
