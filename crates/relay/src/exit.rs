//! Exit-side request execution
//!
//! The terminal hop parses the inner payload back into an HTTP request
//! and replays it against the real target. The response is compacted into
//! an internal HTTP response body for the trip back through the chain.

use std::time::Duration;

use serde_json::{json, Value};
use tracing::debug;
use veilnet_core::{Result, VeilNetError};

const EXIT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// The inner request revealed at the exit hop.
///
/// Wire form: `<METHOD> <url>\r\n<headers>\r\n<body>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitRequest {
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

/// Parse an exit payload back into its request form.
pub fn parse_exit_payload(payload: &str) -> Result<ExitRequest> {
    let (head, body) = payload
        .split_once("\r\n\r\n")
        .ok_or_else(|| VeilNetError::Validation("exit payload has no header block".to_string()))?;

    let mut lines = head.split("\r\n");
    let request_line = lines
        .next()
        .ok_or_else(|| VeilNetError::Validation("exit payload is empty".to_string()))?;
    let (method, url) = request_line
        .split_once(' ')
        .ok_or_else(|| VeilNetError::Validation("malformed request line".to_string()))?;
    if method.is_empty() || url.is_empty() {
        return Err(VeilNetError::Validation(
            "malformed request line".to_string(),
        ));
    }

    let mut headers = Vec::new();
    for line in lines {
        if line.is_empty() {
            continue;
        }
        let (key, value) = line.split_once(':').ok_or_else(|| {
            VeilNetError::Validation(format!("malformed header line: {line}"))
        })?;
        headers.push((key.trim().to_string(), value.trim().to_string()));
    }

    Ok(ExitRequest {
        method: method.to_string(),
        url: url.to_string(),
        headers,
        body: if body.is_empty() {
            None
        } else {
            Some(body.to_string())
        },
    })
}

/// HTTP client the exit hop uses to reach real targets.
pub struct ExitClient {
    http: reqwest::Client,
}

impl ExitClient {
    pub fn new() -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(EXIT_REQUEST_TIMEOUT)
            .build()
            .map_err(|e| VeilNetError::Transport(format!("exit client: {e}")))?;
        Ok(Self { http })
    }

    /// Replay a request against its target.
    ///
    /// Returns the status code and a JSON rendering of the response body.
    pub async fn execute(&self, request: &ExitRequest) -> Result<(u16, Value)> {
        let method = reqwest::Method::from_bytes(request.method.as_bytes())
            .map_err(|_| VeilNetError::Validation(format!("bad method: {}", request.method)))?;

        let mut builder = self.http.request(method, &request.url);
        for (key, value) in &request.headers {
            builder = builder.header(key, value);
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| VeilNetError::Transport(format!("exit request failed: {e}")))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| VeilNetError::Transport(format!("exit response read failed: {e}")))?;

        debug!(status, bytes = text.len(), "exit request completed");

        let payload = match serde_json::from_str::<Value>(&text) {
            Ok(value) => value,
            Err(_) => json!({ "body": text }),
        };
        Ok((status, payload))
    }
}
