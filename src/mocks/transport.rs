//! Mock HTTP transport for testing.

use crate::errors::TransportError;
use crate::transport::{HttpRequest, HttpResponse, HttpTransport};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::StatusCode;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

/// Mock HTTP response.
#[derive(Debug, Clone)]
pub struct MockResponse {
    /// HTTP status code.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HashMap<String, String>,
    /// Response body.
    pub body: Bytes,
}

impl MockResponse {
    /// Create a 200 response with a JSON body.
    pub fn json(body: impl Into<Bytes>) -> Self {
        Self::status(StatusCode::OK, body)
    }

    /// Create a response with the given status and body.
    pub fn status(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: body.into(),
        }
    }

    /// Add a header to the response.
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    fn into_http(self) -> HttpResponse {
        let mut headers = HeaderMap::new();
        for (key, value) in self.headers {
            if let (Ok(name), Ok(value)) = (
                HeaderName::from_bytes(key.as_bytes()),
                HeaderValue::from_str(&value),
            ) {
                headers.insert(name, value);
            }
        }
        HttpResponse::new(self.status, headers, self.body)
    }
}

/// Mock HTTP transport for testing.
///
/// Requests whose path has a registered route get that route's response every
/// time. Everything else consumes the queue in order; an empty queue yields a
/// network error.
#[derive(Default)]
pub struct MockTransport {
    queue: Mutex<VecDeque<Result<MockResponse, TransportError>>>,
    routes: Mutex<HashMap<String, MockResponse>>,
    requests: Mutex<Vec<HttpRequest>>,
}

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockTransport {
    /// Create a new mock transport with no responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response.
    pub fn push_response(&self, response: MockResponse) {
        locked(&self.queue).push_back(Ok(response));
    }

    /// Queue a JSON response with the given status.
    pub fn push_json(&self, status: StatusCode, body: &str) {
        self.push_response(MockResponse::status(status, body.to_string()));
    }

    /// Queue a transport failure.
    pub fn push_error(&self, error: TransportError) {
        locked(&self.queue).push_back(Err(error));
    }

    /// Answer every request for `path` with `response`.
    pub fn route(&self, path: impl Into<String>, response: MockResponse) {
        locked(&self.routes).insert(path.into(), response);
    }

    /// Get all recorded requests.
    pub fn requests(&self) -> Vec<HttpRequest> {
        locked(&self.requests).clone()
    }

    /// Get the number of requests made.
    pub fn request_count(&self) -> usize {
        locked(&self.requests).len()
    }

    /// Number of requests made for `path`.
    pub fn requests_to(&self, path: &str) -> usize {
        locked(&self.requests)
            .iter()
            .filter(|r| r.url.path() == path)
            .count()
    }

    /// Get the last request made.
    pub fn last_request(&self) -> Option<HttpRequest> {
        locked(&self.requests).last().cloned()
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let path = request.url.path().to_string();
        locked(&self.requests).push(request);

        if let Some(response) = locked(&self.routes).get(&path).cloned() {
            return Ok(response.into_http());
        }

        match locked(&self.queue).pop_front() {
            Some(Ok(response)) => Ok(response.into_http()),
            Some(Err(error)) => Err(error),
            None => Err(TransportError::Network(format!(
                "No mock response available for {}",
                path
            ))),
        }
    }
}

impl std::fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTransport")
            .field("queued_responses", &locked(&self.queue).len())
            .field("routes", &locked(&self.routes).len())
            .field("recorded_requests", &locked(&self.requests).len())
            .finish()
    }
}
