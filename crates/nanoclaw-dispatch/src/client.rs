//! HTTP transport to a worker over its loopback SSH tunnel (spec.md §4.E,
//! §6). Tunnels themselves are managed externally (`ssh -NL`); this client
//! only ever talks to `127.0.0.1:<worker.local_port>`.

use std::time::Duration;

use nanoclaw_auth::sign;
use nanoclaw_core::{DispatchPayload, HealthReply, Worker};
use reqwest::Client;

use crate::error::{DispatchError, DispatchResult};

/// Thin wrapper over a shared `reqwest::Client`, scoped to one worker's
/// loopback endpoint.
#[derive(Clone)]
pub struct WorkerHttpClient {
    http: Client,
}

impl WorkerHttpClient {
    /// Build a client with the given per-request timeout.
    #[must_use]
    pub fn new(request_timeout: Duration) -> Self {
        let http = Client::builder()
            .timeout(request_timeout)
            .build()
            .expect("reqwest client configuration is valid");
        Self { http }
    }

    fn base_url(worker: &Worker) -> String {
        format!("http://127.0.0.1:{}", worker.local_port)
    }

    /// `GET /worker/health`, unauthenticated.
    pub async fn health(&self, worker: &Worker) -> DispatchResult<HealthReply> {
        let url = format!("{}/worker/health", Self::base_url(worker));
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|err| tunnel_down(worker, &err))?;

        if !response.status().is_success() {
            return Err(DispatchError::HttpError {
                worker_id: worker.id.to_string(),
                status: response.status().as_u16(),
            });
        }
        response
            .json::<HealthReply>()
            .await
            .map_err(|err| tunnel_down(worker, &err))
    }

    /// `POST /worker/dispatch`, HMAC-signed over the request body.
    /// Returns once the worker has accepted the dispatch (HTTP 200); the
    /// actual task execution runs async on the worker side.
    pub async fn dispatch(
        &self,
        worker: &Worker,
        request_id: &str,
        timestamp_ms: i64,
        payload: &DispatchPayload,
    ) -> DispatchResult<()> {
        let body = serde_json::to_vec(payload).map_err(DispatchError::Serialization)?;

        let headers = sign(worker.shared_secret.as_bytes(), request_id, timestamp_ms, &body);
        let url = format!("{}/worker/dispatch", Self::base_url(worker));

        let response = self
            .http
            .post(&url)
            .header("X-Worker-HMAC", headers.hmac)
            .header("X-Worker-Timestamp", headers.timestamp)
            .header("X-Worker-RequestId", headers.request_id)
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await
            .map_err(|err| tunnel_down(worker, &err))?;

        if !response.status().is_success() {
            return Err(DispatchError::HttpError {
                worker_id: worker.id.to_string(),
                status: response.status().as_u16(),
            });
        }
        Ok(())
    }
}

fn tunnel_down(worker: &Worker, err: &reqwest::Error) -> DispatchError {
    DispatchError::TunnelDown {
        worker_id: worker.id.to_string(),
        detail: err.to_string(),
    }
}
