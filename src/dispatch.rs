//! Action dispatch: translate logical steps into remote input-injection
//! calls.
//!
//! The action-execution service exposes a small REST surface:
//!
//! ```text
//! GET  /health                   → 200 when available
//! GET  /automation/status        → { "is_running": bool, ... }
//! POST /automation/paste         → { "delay": f64 } body
//! POST /automation/send            (same shape for all three)
//! POST /automation/close
//! ```
//!
//! [`HttpDispatcher`] caches connectivity after a successful probe and
//! lazily re-probes when an execute is attempted while disconnected. A
//! non-2xx status, a failure payload, or a transport error surfaces as
//! [`ActionError`]; no retries happen here — retry policy belongs to the
//! caller.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::config::SequencerConfig;
use crate::error::ActionError;
use crate::steps::StepKind;

/// Seam between the controller and the action-execution service.
#[async_trait]
pub trait Dispatch: Send + Sync + 'static {
    /// Verifies connectivity with the service's health probe.
    async fn probe(&self) -> Result<(), ActionError>;

    /// Executes one remote action. `delay_hint` is forwarded to the
    /// service, which applies it before injecting input; the sequencer's
    /// own countdown has already elapsed, so cycle callbacks pass zero.
    async fn execute(&self, action: StepKind, delay_hint: Duration) -> Result<(), ActionError>;
}

/// Response payload of an action call.
///
/// The service reports failure either through a non-2xx status with an
/// `error` field or through an explicit `success: false`.
#[derive(Debug, Default, Deserialize)]
struct ActionResponse {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl ActionResponse {
    fn failure_reason(&self) -> Option<String> {
        if let Some(err) = &self.error {
            return Some(err.clone());
        }
        if self.success == Some(false) {
            return Some(
                self.message
                    .clone()
                    .unwrap_or_else(|| "service reported failure".to_string()),
            );
        }
        None
    }
}

/// Live snapshot reported by `GET /automation/status`.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceStatus {
    /// Whether the service is currently executing an injection sequence.
    pub is_running: bool,
}

/// HTTP client for the action-execution service.
pub struct HttpDispatcher {
    http: Client,
    base: String,
    timeout: Duration,
    connected: AtomicBool,
}

impl HttpDispatcher {
    /// Creates a dispatcher against `cfg.service_url`.
    pub fn new(cfg: &SequencerConfig) -> Self {
        Self {
            http: Client::new(),
            base: cfg.service_url.trim_end_matches('/').to_string(),
            timeout: cfg.request_timeout,
            connected: AtomicBool::new(false),
        }
    }

    /// Base URL this dispatcher talks to.
    pub fn base_url(&self) -> &str {
        &self.base
    }

    /// Cached connectivity state from the last probe or call.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    /// Queries the service's live status endpoint.
    pub async fn status(&self) -> Result<ServiceStatus, ActionError> {
        let url = format!("{}/automation/status", self.base);
        let resp = self
            .http
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.transport_error("status", e))?;
        let resp = resp.error_for_status().map_err(|e| ActionError::Rejected {
            action: "status",
            reason: e.to_string(),
        })?;
        resp.json::<ServiceStatus>()
            .await
            .map_err(|e| ActionError::Rejected {
                action: "status",
                reason: format!("malformed status payload: {e}"),
            })
    }

    /// Remote operation for a step, or `None` for `advance`.
    fn endpoint(action: StepKind) -> Option<&'static str> {
        match action {
            StepKind::Paste => Some("/automation/paste"),
            StepKind::Send => Some("/automation/send"),
            StepKind::Close => Some("/automation/close"),
            StepKind::Advance => None,
        }
    }

    fn transport_error(&self, action: &'static str, err: reqwest::Error) -> ActionError {
        self.connected.store(false, Ordering::Relaxed);
        ActionError::Unreachable {
            action,
            reason: err.to_string(),
        }
    }
}

#[async_trait]
impl Dispatch for HttpDispatcher {
    async fn probe(&self) -> Result<(), ActionError> {
        let url = format!("{}/health", self.base);
        let resp = self
            .http
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.transport_error("health", e))?;

        if resp.status().is_success() {
            self.connected.store(true, Ordering::Relaxed);
            Ok(())
        } else {
            self.connected.store(false, Ordering::Relaxed);
            Err(ActionError::Rejected {
                action: "health",
                reason: format!("health probe returned status {}", resp.status()),
            })
        }
    }

    async fn execute(&self, action: StepKind, delay_hint: Duration) -> Result<(), ActionError> {
        let name = action.as_str();
        let Some(endpoint) = Self::endpoint(action) else {
            return Err(ActionError::NotDispatchable { action: name });
        };

        // Lazy re-probe after a lost connection.
        if !self.is_connected() {
            self.probe().await.map_err(|e| ActionError::Unreachable {
                action: name,
                reason: e.as_message(),
            })?;
        }

        let url = format!("{}{}", self.base, endpoint);
        let resp = self
            .http
            .post(&url)
            .timeout(self.timeout)
            .json(&json!({ "delay": delay_hint.as_secs_f64() }))
            .send()
            .await
            .map_err(|e| self.transport_error(name, e))?;

        let status = resp.status();
        let body = resp.json::<ActionResponse>().await.unwrap_or_default();

        if !status.is_success() {
            return Err(ActionError::Rejected {
                action: name,
                reason: body
                    .failure_reason()
                    .unwrap_or_else(|| format!("status {status}")),
            });
        }
        if let Some(reason) = body.failure_reason() {
            return Err(ActionError::Rejected {
                action: name,
                reason,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dispatcher_for(url: &str) -> HttpDispatcher {
        let cfg = SequencerConfig {
            service_url: url.to_string(),
            ..SequencerConfig::default()
        };
        HttpDispatcher::new(&cfg)
    }

    #[test]
    fn test_endpoint_mapping() {
        assert_eq!(
            HttpDispatcher::endpoint(StepKind::Paste),
            Some("/automation/paste")
        );
        assert_eq!(
            HttpDispatcher::endpoint(StepKind::Send),
            Some("/automation/send")
        );
        assert_eq!(
            HttpDispatcher::endpoint(StepKind::Close),
            Some("/automation/close")
        );
        assert_eq!(HttpDispatcher::endpoint(StepKind::Advance), None);
    }

    #[tokio::test]
    async fn test_probe_caches_connectivity() {
        let mut server = mockito::Server::new_async().await;
        let health = server
            .mock("GET", "/health")
            .with_status(200)
            .with_body(r#"{"status":"healthy"}"#)
            .create_async()
            .await;

        let d = dispatcher_for(&server.url());
        assert!(!d.is_connected());
        d.probe().await.unwrap();
        assert!(d.is_connected());
        health.assert_async().await;
    }

    #[tokio::test]
    async fn test_execute_posts_delay_body() {
        let mut server = mockito::Server::new_async().await;
        let health = server
            .mock("GET", "/health")
            .with_status(200)
            .create_async()
            .await;
        let send = server
            .mock("POST", "/automation/send")
            .match_body(mockito::Matcher::PartialJson(
                serde_json::json!({ "delay": 0.0 }),
            ))
            .with_status(200)
            .with_body(r#"{"message":"Send action executed"}"#)
            .create_async()
            .await;

        let d = dispatcher_for(&server.url());
        d.execute(StepKind::Send, Duration::ZERO).await.unwrap();

        health.assert_async().await;
        send.assert_async().await;
    }

    #[tokio::test]
    async fn test_execute_classifies_failure_payload() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/health")
            .with_status(200)
            .create_async()
            .await;
        server
            .mock("POST", "/automation/paste")
            .with_status(500)
            .with_body(r#"{"error":"injection blocked"}"#)
            .create_async()
            .await;

        let d = dispatcher_for(&server.url());
        let err = d.execute(StepKind::Paste, Duration::ZERO).await.unwrap_err();
        assert_eq!(err.as_label(), "action_rejected");
        assert_eq!(err.action(), "paste");
        assert!(err.as_message().contains("injection blocked"));
    }

    #[tokio::test]
    async fn test_execute_rejects_explicit_success_false() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/health")
            .with_status(200)
            .create_async()
            .await;
        server
            .mock("POST", "/automation/close")
            .with_status(200)
            .with_body(r#"{"success":false,"message":"no focused window"}"#)
            .create_async()
            .await;

        let d = dispatcher_for(&server.url());
        let err = d
            .execute(StepKind::Close, Duration::ZERO)
            .await
            .unwrap_err();
        assert_eq!(err.action(), "close");
        assert!(err.as_message().contains("no focused window"));
    }

    #[tokio::test]
    async fn test_execute_refuses_advance() {
        let d = dispatcher_for("http://localhost:1");
        let err = d
            .execute(StepKind::Advance, Duration::ZERO)
            .await
            .unwrap_err();
        assert_eq!(err.as_label(), "action_not_dispatchable");
    }

    #[tokio::test]
    async fn test_status_reports_running_flag() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/automation/status")
            .with_status(200)
            .with_body(r#"{"is_running":true,"current_task":null}"#)
            .create_async()
            .await;

        let d = dispatcher_for(&server.url());
        let status = d.status().await.unwrap();
        assert!(status.is_running);
    }
}
