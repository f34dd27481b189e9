//! JSON-RPC over HTTP client
//!
//! POSTs `{"method", "params", "id", "version"}` to the camera service
//! endpoint and unwraps the `result` / `error` envelope.

use super::{RpcChannel, RpcSlots};
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Protocol version sent with every request
const API_VERSION: &str = "1.0";

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    method: &'a str,
    params: Vec<Value>,
    id: u64,
    version: &'a str,
}

#[derive(Debug, Deserialize)]
struct RpcEnvelope {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<Value>,
}

/// JSON-RPC camera client
pub struct JsonRpcClient {
    /// Service endpoint (e.g. http://192.168.122.1:8080/sony/camera)
    endpoint: String,
    client: Client,
    next_id: AtomicU64,
}

impl JsonRpcClient {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        if endpoint.trim().is_empty() {
            return Err(Error::Config("camera endpoint is empty".to_string()));
        }

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            endpoint: endpoint.to_string(),
            client,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl RpcChannel for JsonRpcClient {
    async fn invoke(&self, method: &str, params: Vec<Value>) -> Result<RpcSlots> {
        let request = RpcRequest {
            method,
            params,
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            version: API_VERSION,
        };

        tracing::debug!(
            endpoint = %self.endpoint,
            method = %method,
            id = request.id,
            "Sending JSON-RPC request"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Network(format!("{} request failed: {}", method, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Network(format!(
                "{} failed with status {}: {}",
                method, status, body
            )));
        }

        let envelope: RpcEnvelope = response.json().await?;
        parse_envelope(envelope)
    }
}

fn parse_envelope(envelope: RpcEnvelope) -> Result<RpcSlots> {
    if let Some(error) = envelope.error {
        return Err(parse_error(&error));
    }

    Ok(RpcSlots::from_result(envelope.result.unwrap_or(Value::Null)))
}

/// Device errors arrive as `[code, message]`
fn parse_error(error: &Value) -> Error {
    let code = error.get(0).and_then(Value::as_i64);
    let message = error.get(1).and_then(Value::as_str);

    match (code, message) {
        (Some(code), message) => Error::Rpc {
            code,
            message: message.unwrap_or_default().to_string(),
        },
        _ => Error::Protocol(format!("malformed error member: {}", error)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn envelope(value: Value) -> RpcEnvelope {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_request_serialization() {
        let request = RpcRequest {
            method: "getEvent",
            params: vec![json!(true)],
            id: 7,
            version: API_VERSION,
        };
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(
            body,
            json!({"method": "getEvent", "params": [true], "id": 7, "version": "1.0"})
        );
    }

    #[test]
    fn test_parse_success() {
        let slots = parse_envelope(envelope(json!({
            "result": [null, {"cameraStatus": "IDLE"}],
            "id": 1
        })))
        .unwrap();
        assert_eq!(slots.len(), 2);
        assert!(slots.slot(0).is_none());
    }

    #[test]
    fn test_parse_device_error() {
        let err = parse_envelope(envelope(json!({"error": [40401, "Camera Not Ready"], "id": 1})))
            .unwrap_err();
        match err {
            Error::Rpc { code, message } => {
                assert_eq!(code, 40401);
                assert_eq!(message, "Camera Not Ready");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_empty_endpoint_rejected() {
        let err = JsonRpcClient::new("  ", Duration::from_secs(1)).err().unwrap();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_parse_malformed_error() {
        let err = parse_envelope(envelope(json!({"error": "boom"}))).unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }
}
