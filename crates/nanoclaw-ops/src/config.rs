//! Ops HTTP API tunables and secrets (spec.md §6).

/// Secrets and bind address the ops HTTP API is configured with.
#[derive(Debug, Clone)]
pub struct OpsConfig {
    /// Read-access secret, required via `X-OS-SECRET` on every route.
    /// `None` means the API is unreachable (fail-closed).
    pub http_secret: Option<String>,
    /// Current write-access secret, required via `X-WRITE-SECRET` on
    /// write routes.
    pub write_secret_current: Option<String>,
    /// Previous write-access secret, also accepted to support rotation
    /// without a flag day.
    pub write_secret_previous: Option<String>,
    /// Address the ops HTTP server binds to.
    pub bind_addr: String,
}
