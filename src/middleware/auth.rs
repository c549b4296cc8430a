// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Device token authentication middleware.

use crate::db::token_digest;
use crate::error::AppError;
use crate::middleware::client_ip;
use crate::services::RequestContext;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Middleware that resolves the calling account from its device token and
/// attaches a [`RequestContext`].
pub async fn require_account(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let digest = bearer_token(request.headers())
        .map(token_digest)
        .ok_or(AppError::Forbidden)?;

    let Some(account) = state.storage.accounts.get_account_by_token(&digest).await? else {
        tracing::warn!("Rejected request with unknown device token");
        return Err(AppError::Forbidden);
    };

    let client_ip = client_ip(&request, state.config.trust_forwarded_for);
    request
        .extensions_mut()
        .insert(RequestContext { account, client_ip });

    Ok(next.run(request).await)
}
