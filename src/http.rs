//! Thin JSON-over-HTTP helper shared by the provider and pipeline clients.
//!
//! Wraps a `reqwest::Client` with a base URL and default headers. Non-2xx
//! responses are turned into [`HttpFailure::Status`] with the response body
//! preserved so provider messages reach the operator verbatim.

use reqwest::header::{ACCEPT, HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::constants::USER_AGENT;

/// Transport-level and status-level request failures.
#[derive(Error, Debug)]
pub enum HttpFailure {
    #[error("invalid client setup: {0}")]
    Client(String),

    #[error("request failed: {0}")]
    Transport(String),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected response body: {0}")]
    Decode(String),
}

impl HttpFailure {
    /// HTTP status code, when the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            HttpFailure::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Response body, when the server answered.
    pub fn body(&self) -> Option<&str> {
        match self {
            HttpFailure::Status { body, .. } => Some(body),
            _ => None,
        }
    }
}

/// JSON API client bound to one base URL.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Build a client sending `headers` (plus `User-Agent` and a JSON
    /// `Accept` unless overridden) on every request.
    pub fn new(base_url: &str, headers: &[(&'static str, &str)]) -> Result<Self, HttpFailure> {
        let mut defaults = HeaderMap::new();
        defaults.insert(ACCEPT, HeaderValue::from_static("application/json"));
        for (name, value) in headers {
            let mut value = HeaderValue::from_str(value)
                .map_err(|_| HttpFailure::Client(format!("invalid value for header {name}")))?;
            if is_credential(name) {
                value.set_sensitive(true);
            }
            defaults.insert(HeaderName::from_static(name), value);
        }

        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(defaults)
            .build()
            .map_err(|e| HttpFailure::Client(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Absolute URL for an API path (which must start with `/`).
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// The base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `GET` a path and decode the JSON response.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, HttpFailure> {
        self.send(self.http.get(self.url(path))).await
    }

    /// `POST` a JSON body to a path and decode the JSON response.
    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, HttpFailure>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(self.http.post(self.url(path)).json(body)).await
    }

    /// `POST` a JSON body with an extra bearer token, discarding the response body.
    pub async fn post_unit<B>(&self, path: &str, body: &B, bearer: Option<&str>) -> Result<(), HttpFailure>
    where
        B: Serialize + ?Sized,
    {
        let mut request = self.http.post(self.url(path)).json(body);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }
        let response = request
            .send()
            .await
            .map_err(|e| HttpFailure::Transport(e.to_string()))?;
        check_status(response).await.map(|_| ())
    }

    async fn send<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> Result<T, HttpFailure> {
        let response = request
            .send()
            .await
            .map_err(|e| HttpFailure::Transport(e.to_string()))?;
        let response = check_status(response).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| HttpFailure::Decode(e.to_string()))
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, HttpFailure> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<no body>".to_string());
    Err(HttpFailure::Status {
        status: status.as_u16(),
        body,
    })
}

fn is_credential(name: &str) -> bool {
    name.eq_ignore_ascii_case("authorization") || name.eq_ignore_ascii_case("private-token")
}
