//! HTTP transport seam: request/response values and the reqwest implementation

use crate::api_client::ClientConfig;
use crate::error::{ClientError, Result};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::{Client, Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

/// A fully-built request, ready to be dispatched (or re-dispatched)
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Token carried in the `Authorization: Bearer` header, if any
    pub fn bearer_token(&self) -> Option<&str> {
        self.headers
            .get(AUTHORIZATION)?
            .to_str()
            .ok()?
            .strip_prefix("Bearer ")
    }

    pub fn set_bearer_token(&mut self, token: &str) -> Result<()> {
        let value = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| ClientError::InvalidToken)?;
        self.headers.insert(AUTHORIZATION, value);
        Ok(())
    }

    pub fn clear_bearer_token(&mut self) {
        self.headers.remove(AUTHORIZATION);
    }
}

/// Status and raw body of a completed exchange
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn new(status: StatusCode, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn json(status: StatusCode, body: &Value) -> Self {
        Self::new(status, body.to_string())
    }

    /// Decode the body; an empty body (e.g. 204 No Content) decodes as JSON `null`
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        if self.body.iter().all(u8::is_ascii_whitespace) {
            return Ok(serde_json::from_value(Value::Null)?);
        }
        Ok(serde_json::from_slice(&self.body)?)
    }
}

/// Sends a request and returns whatever the server answered
///
/// Non-2xx statuses are NOT errors at this layer; only failures where no
/// response arrived are.
pub trait Transport: Send + Sync + 'static {
    fn execute(&self, request: ApiRequest) -> impl Future<Output = Result<ApiResponse>> + Send;
}

impl<T: Transport> Transport for Arc<T> {
    fn execute(&self, request: ApiRequest) -> impl Future<Output = Result<ApiResponse>> + Send {
        (**self).execute(request)
    }
}

/// Transport backed by a shared `reqwest::Client`
#[derive(Clone)]
pub struct ReqwestTransport {
    http_client: Client,
}

impl ReqwestTransport {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(user_agent) = &config.user_agent {
            let value = HeaderValue::from_str(user_agent).map_err(|_| {
                ClientError::Configuration(format!("invalid user agent: {user_agent:?}"))
            })?;
            headers.insert(USER_AGENT, value);
        }

        let mut builder = Client::builder().default_headers(headers);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            http_client: builder.build()?,
        })
    }

    pub fn from_client(http_client: Client) -> Self {
        Self { http_client }
    }
}

impl Transport for ReqwestTransport {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse> {
        let mut builder = self
            .http_client
            .request(request.method, request.url)
            .headers(request.headers);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        Ok(ApiResponse::new(status, body.to_vec()))
    }
}
