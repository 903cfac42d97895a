//! Http tool — outbound requests behind the egress filter.

use crate::error::ToolError;
use crate::net_guard::validate_url;
use crate::traits::{Tool, ToolContext};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{HeaderName, HeaderValue};
use reqwest::redirect::Policy;
use reqwest::Method;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

const MAX_RESPONSE_BYTES: usize = 5 * 1024 * 1024;
const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Deserialize)]
struct HttpInput {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    headers: Option<HashMap<String, String>>,
    #[serde(default)]
    body: Option<String>,
}

pub struct HttpTool;

#[async_trait]
impl Tool for HttpTool {
    fn name(&self) -> &str {
        "http"
    }
    fn description(&self) -> &str {
        "Make an HTTP request to a public address"
    }
    fn usage(&self) -> Option<&str> {
        Some(r#"input is JSON with {"url":"...","method":"GET|POST","headers":{},"body":"..."}."#)
    }

    async fn run(&self, input: &str, _ctx: &ToolContext) -> Result<String, ToolError> {
        let payload: HttpInput = serde_json::from_str(input)
            .map_err(|_| ToolError::InvalidInput("Invalid JSON for http tool".to_string()))?;

        let raw_url = payload
            .url
            .as_deref()
            .filter(|u| !u.is_empty())
            .ok_or_else(|| ToolError::InvalidInput("Missing url for http tool".to_string()))?;

        let url = validate_url(raw_url)?;

        let method = match payload.method.as_deref() {
            None => Method::GET,
            Some(m) => Method::from_bytes(m.to_uppercase().as_bytes())
                .map_err(|_| ToolError::InvalidInput(format!("Invalid HTTP method: {m}")))?,
        };

        // Redirects are never followed: a malicious server could otherwise
        // bounce the request to an internal address after the egress check.
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .redirect(Policy::none())
            .user_agent("wicket/0.1")
            .build()
            .map_err(|e| ToolError::Execution(format!("Failed to create HTTP client: {e}")))?;

        let mut request = client.request(method, url);
        if let Some(headers) = payload.headers {
            for (key, value) in headers {
                let name = HeaderName::from_bytes(key.as_bytes())
                    .map_err(|_| ToolError::InvalidInput(format!("Invalid header name: {key}")))?;
                let value = HeaderValue::from_str(&value)
                    .map_err(|_| ToolError::InvalidInput(format!("Invalid header value for: {key}")))?;
                request = request.header(name, value);
            }
        }
        if let Some(body) = payload.body {
            request = request.body(body);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ToolError::Timeout(REQUEST_TIMEOUT_SECS)
            } else {
                ToolError::Execution(format!("HTTP request failed: {e}"))
            }
        })?;

        let status = response.status();
        if status.is_redirection() {
            let location = response
                .headers()
                .get("location")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("unknown");
            return Err(ToolError::Execution(format!(
                "Redirects are blocked for security. Attempted redirect to: {location}"
            )));
        }

        let mut body = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk
                .map_err(|e| ToolError::Execution(format!("Failed to read response: {e}")))?;
            if body.len() + chunk.len() > MAX_RESPONSE_BYTES {
                return Err(ToolError::Execution(format!(
                    "Response size exceeds limit of {MAX_RESPONSE_BYTES} bytes"
                )));
            }
            body.extend_from_slice(&chunk);
        }

        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}
