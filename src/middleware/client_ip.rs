// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Client IP resolution for rate limiting and request context.

use axum::extract::{ConnectInfo, Request};
use std::net::SocketAddr;

const FORWARDED_FOR: &str = "x-forwarded-for";

/// Resolve the originating client address.
///
/// Behind a proxy (`trust_forwarded_for`) the first `X-Forwarded-For` hop
/// wins. Otherwise the socket peer is used, and `"unknown"` when neither is
/// available (e.g. a router driven without a listener).
pub fn client_ip(request: &Request, trust_forwarded_for: bool) -> String {
    if trust_forwarded_for {
        let forwarded = request
            .headers()
            .get(FORWARDED_FOR)
            .and_then(|h| h.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|hop| !hop.is_empty());

        if let Some(hop) = forwarded {
            return hop.to_string();
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
