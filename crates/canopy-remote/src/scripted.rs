//! Scripted transport for tests and offline runs.
//!
//! Responses are served in FIFO order regardless of URL; every request is
//! recorded so callers can assert on what was sent.

use crate::{HttpResponse, HttpTransport, RemoteError, Result};
use std::collections::VecDeque;
use std::sync::Mutex;

/// A request captured by [`ScriptedTransport`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    /// `POST` or `GET`.
    pub method: &'static str,
    /// Requested URL.
    pub url: String,
    /// Bearer token, if any.
    pub bearer: Option<String>,
    /// Form fields for form posts.
    pub form: Vec<(String, String)>,
    /// JSON body for JSON posts.
    pub json: Option<serde_json::Value>,
}

/// An [`HttpTransport`] that replays a fixed script of responses.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<Result<HttpResponse>>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedTransport {
    /// Create an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response.
    pub fn push(&self, response: HttpResponse) -> &Self {
        self.push_result(Ok(response))
    }

    /// Queue a 200 JSON response.
    pub fn push_json(&self, body: serde_json::Value) -> &Self {
        self.push(HttpResponse::ok_json(&body))
    }

    /// Queue a transport failure or a response.
    pub fn push_result(&self, result: Result<HttpResponse>) -> &Self {
        if let Ok(mut responses) = self.responses.lock() {
            responses.push_back(result);
        }
        self
    }

    /// All requests seen so far.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// Number of responses not yet consumed.
    pub fn remaining(&self) -> usize {
        self.responses.lock().map(|r| r.len()).unwrap_or(0)
    }

    fn serve(&self, request: RecordedRequest) -> Result<HttpResponse> {
        let url = request.url.clone();
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }
        self.responses
            .lock()
            .map_err(|_| RemoteError::Transient("scripted transport lock poisoned".to_string()))?
            .pop_front()
            .unwrap_or_else(|| Err(RemoteError::Transient(format!("no scripted response left for {url}"))))
    }
}

impl HttpTransport for ScriptedTransport {
    fn post_form(&self, url: &str, form: &[(&str, &str)]) -> Result<HttpResponse> {
        self.serve(RecordedRequest {
            method: "POST",
            url: url.to_string(),
            bearer: None,
            form: form.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
            json: None,
        })
    }

    fn post_json(&self, url: &str, bearer: Option<&str>, body: &serde_json::Value) -> Result<HttpResponse> {
        self.serve(RecordedRequest {
            method: "POST",
            url: url.to_string(),
            bearer: bearer.map(str::to_string),
            form: Vec::new(),
            json: Some(body.clone()),
        })
    }

    fn get(&self, url: &str, bearer: Option<&str>) -> Result<HttpResponse> {
        self.serve(RecordedRequest {
            method: "GET",
            url: url.to_string(),
            bearer: bearer.map(str::to_string),
            form: Vec::new(),
            json: None,
        })
    }
}
