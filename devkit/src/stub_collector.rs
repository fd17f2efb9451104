/*!
Stub collector - a throwaway `/gpu-info` endpoint for aggregator tests

Binds on 127.0.0.1 with an ephemeral port and answers every request with a
fixed reply, optionally after a delay. Lets the kernel tests exercise real
HTTP round-trips (timeouts, refused connections, bad status, bad JSON)
without any GPU on the machine.
*/

use anyhow::Result;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use gpuwatch_core::HostTelemetry;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// What the stub answers on `/gpu-info`
#[derive(Debug, Clone)]
pub enum StubReply {
    /// 200 with the telemetry as JSON
    Telemetry(HostTelemetry),
    /// Arbitrary status with a plain-text body
    Status(u16, String),
    /// 200 with a raw body, e.g. something that is not telemetry JSON
    RawBody(String),
}

struct StubState {
    reply: StubReply,
    delay: Duration,
    hits: AtomicUsize,
}

pub struct StubCollector {
    addr: SocketAddr,
    state: Arc<StubState>,
    server: JoinHandle<()>,
}

impl StubCollector {
    pub async fn spawn(reply: StubReply) -> Result<Self> {
        Self::spawn_with_delay(reply, Duration::ZERO).await
    }

    pub async fn spawn_with_delay(reply: StubReply, delay: Duration) -> Result<Self> {
        let state = Arc::new(StubState {
            reply,
            delay,
            hits: AtomicUsize::new(0),
        });

        let app = Router::new()
            .route("/gpu-info", get(gpu_info))
            .route("/health", get(|| async { "OK" }))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let server = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::warn!("stub collector on {} stopped: {}", addr, e);
            }
        });

        Ok(Self { addr, state, server })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn host(&self) -> String {
        self.addr.ip().to_string()
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Number of `/gpu-info` requests received so far
    pub fn hits(&self) -> usize {
        self.state.hits.load(Ordering::SeqCst)
    }
}

impl Drop for StubCollector {
    fn drop(&mut self) {
        self.server.abort();
    }
}

async fn gpu_info(State(state): State<Arc<StubState>>) -> Response {
    state.hits.fetch_add(1, Ordering::SeqCst);
    if !state.delay.is_zero() {
        tokio::time::sleep(state.delay).await;
    }

    match &state.reply {
        StubReply::Telemetry(t) => Json(t.clone()).into_response(),
        StubReply::Status(code, body) => {
            let code = StatusCode::from_u16(*code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (code, body.clone()).into_response()
        }
        StubReply::RawBody(body) => {
            ([(header::CONTENT_TYPE, "application/json")], body.clone()).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::sample_host_telemetry;

    #[tokio::test]
    async fn test_stub_serves_telemetry_and_counts_hits() {
        let stub = StubCollector::spawn(StubReply::Telemetry(sample_host_telemetry("node-a")))
            .await
            .unwrap();

        let url = format!("http://{}/gpu-info", stub.addr());
        let text = reqwest::get(&url).await.unwrap().text().await.unwrap();
        let body: HostTelemetry = serde_json::from_str(&text).unwrap();
        assert_eq!(body.node_name, "node-a");
        assert_eq!(stub.hits(), 1);
    }

    #[tokio::test]
    async fn test_stub_status_reply() {
        let stub = StubCollector::spawn(StubReply::Status(503, "busy".into()))
            .await
            .unwrap();

        let resp = reqwest::get(format!("http://{}/gpu-info", stub.addr()))
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 503);
        assert_eq!(resp.text().await.unwrap(), "busy");
    }
}
