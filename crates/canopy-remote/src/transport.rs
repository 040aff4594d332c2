//! HTTP transport seam.

use crate::{RemoteError, Result};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// A raw HTTP response: status code and body text.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body.
    pub body: String,
}

impl HttpResponse {
    /// Create a response.
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Create a 200 response with a JSON body.
    pub fn ok_json(body: &serde_json::Value) -> Self {
        Self::new(200, body.to_string())
    }

    /// Whether the status is 2xx.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(&self.body).map_err(|e| {
            RemoteError::InvalidResponse(format!("HTTP {} body is not the expected JSON: {}", self.status, e))
        })
    }

    /// Best-effort upstream error message from a JSON error body.
    ///
    /// Understands `{"error": {"message": ...}}` and
    /// `{"error": "...", "error_description": "..."}`; otherwise returns the raw body.
    pub fn error_message(&self) -> String {
        let Ok(value) = serde_json::from_str::<serde_json::Value>(&self.body) else {
            return self.body.trim().to_string();
        };
        match value.get("error") {
            Some(serde_json::Value::Object(err)) => err
                .get("message")
                .and_then(|m| m.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| self.body.trim().to_string()),
            Some(serde_json::Value::String(code)) => match value.get("error_description").and_then(|d| d.as_str()) {
                Some(description) => format!("{code}: {description}"),
                None => code.clone(),
            },
            _ => self.body.trim().to_string(),
        }
    }
}

/// The HTTP operations needed by the token exchanger and job poller.
///
/// Connection failures and timeouts must be reported as
/// [`RemoteError::Transient`]; any HTTP status is returned as a response.
pub trait HttpTransport: Send + Sync {
    /// POST a URL-encoded form.
    fn post_form(&self, url: &str, form: &[(&str, &str)]) -> Result<HttpResponse>;

    /// POST a JSON body, optionally with a bearer token.
    fn post_json(&self, url: &str, bearer: Option<&str>, body: &serde_json::Value) -> Result<HttpResponse>;

    /// GET a URL, optionally with a bearer token.
    fn get(&self, url: &str, bearer: Option<&str>) -> Result<HttpResponse>;
}

/// [`HttpTransport`] over a blocking `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::blocking::Client,
}

impl ReqwestTransport {
    /// Create a transport with a per-request timeout.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RemoteError::Configuration(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    fn finish(response: reqwest::blocking::Response) -> Result<HttpResponse> {
        let status = response.status().as_u16();
        let body = response.text()?;
        Ok(HttpResponse { status, body })
    }
}

impl HttpTransport for ReqwestTransport {
    fn post_form(&self, url: &str, form: &[(&str, &str)]) -> Result<HttpResponse> {
        let response = self.client.post(url).form(form).send()?;
        Self::finish(response)
    }

    fn post_json(&self, url: &str, bearer: Option<&str>, body: &serde_json::Value) -> Result<HttpResponse> {
        let mut request = self.client.post(url).json(body);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }
        Self::finish(request.send()?)
    }

    fn get(&self, url: &str, bearer: Option<&str>) -> Result<HttpResponse> {
        let mut request = self.client.get(url);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }
        Self::finish(request.send()?)
    }
}
