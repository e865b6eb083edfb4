//! Fail-closed secret-header auth, applied as tower layers rather than
//! per-handler checks (spec.md §6).

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::Response;
use subtle::ConstantTimeEq;
use tracing::warn;

use crate::state::AppState;

const OS_SECRET_HEADER: &str = "x-os-secret";
const WRITE_SECRET_HEADER: &str = "x-write-secret";

fn constant_time_eq(configured: &str, provided: &str) -> bool {
    configured.as_bytes().ct_eq(provided.as_bytes()).into()
}

/// Require `X-OS-SECRET` to match the configured read secret. Fails
/// closed: an unset `http_secret` rejects every request, same as a
/// mismatched header.
pub async fn require_os_secret(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(configured) = state.ops_config.http_secret.as_deref() else {
        warn!("ops http_secret unset, rejecting all reads");
        return Err(StatusCode::UNAUTHORIZED);
    };

    let provided = request
        .headers()
        .get(OS_SECRET_HEADER)
        .and_then(|v| v.to_str().ok());

    match provided {
        Some(value) if constant_time_eq(configured, value) => Ok(next.run(request).await),
        _ => Err(StatusCode::UNAUTHORIZED),
    }
}

/// Require `X-WRITE-SECRET` to match either the current or previous
/// configured write secret (supports rotation without a flag day). Fails
/// closed: if neither secret is configured, every write is rejected.
pub async fn require_write_secret(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let current = state.ops_config.write_secret_current.as_deref();
    let previous = state.ops_config.write_secret_previous.as_deref();

    if current.is_none() && previous.is_none() {
        warn!("ops write secrets unset, rejecting all writes");
        return Err(StatusCode::FORBIDDEN);
    }

    let provided = request
        .headers()
        .get(WRITE_SECRET_HEADER)
        .and_then(|v| v.to_str().ok());

    let Some(provided) = provided else {
        return Err(StatusCode::FORBIDDEN);
    };

    let matches_current = current.is_some_and(|c| constant_time_eq(c, provided));
    let matches_previous = previous.is_some_and(|p| constant_time_eq(p, provided));

    if matches_current || matches_previous {
        Ok(next.run(request).await)
    } else {
        Err(StatusCode::FORBIDDEN)
    }
}
