//! Transport Module
//!
//! The wire seam. `SessionClient` talks to a `Transport`; production uses
//! `HttpTransport` (reqwest with a cookie jar), tests use a scripted one.
//! Credentials travel as cookies only, never as an Authorization header.

use async_trait::async_trait;
use reqwest::cookie::Jar;
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, warn};
use url::Url;
use wblog_config::ClientConfig;
use wblog_core::{Credentials, Error, Result};

/// HTTP method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Post => write!(f, "POST"),
            Self::Put => write!(f, "PUT"),
            Self::Delete => write!(f, "DELETE"),
        }
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// Multipart field
#[derive(Debug, Clone)]
pub enum Part {
    Text {
        name: String,
        value: String,
    },
    File {
        name: String,
        file_name: String,
        mime: String,
        bytes: Vec<u8>,
    },
}

/// Request body
#[derive(Debug, Clone, Default)]
pub enum Body {
    #[default]
    Empty,
    Json(serde_json::Value),
    Multipart(Vec<Part>),
}

/// A replayable API request
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the API base URL
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Body,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: Body::Empty,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::Put, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    pub fn json(mut self, value: serde_json::Value) -> Self {
        self.body = Body::Json(value);
        self
    }

    pub fn multipart(mut self, parts: Vec<Part>) -> Self {
        self.body = Body::Multipart(parts);
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }
}

/// Raw API response
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decode the body as `T`
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(|e| Error::Decode(e.to_string()))
    }

    /// Body as a JSON value; an empty body is `null`
    pub fn value(&self) -> Result<serde_json::Value> {
        if self.body.iter().all(u8::is_ascii_whitespace) {
            return Ok(serde_json::Value::Null);
        }
        self.json()
    }
}

/// Wire transport
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one request. HTTP error statuses are responses, not errors;
    /// `Err` means the request never got an answer.
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse>;

    /// Seed the cookie store with persisted tokens
    fn install_credentials(&self, credentials: &Credentials);

    /// Drop every stored cookie
    fn clear_credentials(&self);
}

struct HttpInner {
    http: reqwest::Client,
    jar: Arc<Jar>,
}

impl HttpInner {
    fn fresh() -> Result<Self> {
        let jar = Arc::new(Jar::default());
        let http = reqwest::Client::builder()
            .cookie_provider(jar.clone())
            .build()
            .map_err(|e| Error::Network(e.to_string()))?;
        Ok(Self { http, jar })
    }
}

/// reqwest-backed transport with a cookie jar
pub struct HttpTransport {
    base: Url,
    access_cookie: String,
    refresh_cookie: String,
    inner: RwLock<HttpInner>,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        Ok(Self {
            base: config.base_url()?,
            access_cookie: config.access_cookie.clone(),
            refresh_cookie: config.refresh_cookie.clone(),
            inner: RwLock::new(HttpInner::fresh()?),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.base
            .join(path.trim_start_matches('/'))
            .map_err(|e| Error::InvalidInput(format!("bad path '{}': {}", path, e)))
    }

    fn form(parts: &[Part]) -> Result<reqwest::multipart::Form> {
        let mut form = reqwest::multipart::Form::new();
        for part in parts {
            form = match part {
                Part::Text { name, value } => form.text(name.clone(), value.clone()),
                Part::File {
                    name,
                    file_name,
                    mime,
                    bytes,
                } => {
                    let file = reqwest::multipart::Part::bytes(bytes.clone())
                        .file_name(file_name.clone())
                        .mime_str(mime)
                        .map_err(|e| Error::InvalidInput(format!("bad mime '{}': {}", mime, e)))?;
                    form.part(name.clone(), file)
                }
            };
        }
        Ok(form)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse> {
        let url = self.url(&request.path)?;
        let http = self
            .inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .http
            .clone();

        let mut builder = http.request(request.method.into(), url).query(&request.query);
        builder = match &request.body {
            Body::Empty => builder,
            Body::Json(value) => builder.json(value),
            Body::Multipart(parts) => builder.multipart(Self::form(parts)?),
        };

        let response = builder
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        debug!(method = %request.method, path = %request.path, status, "response");
        Ok(ApiResponse::new(status, body.to_vec()))
    }

    fn install_credentials(&self, credentials: &Credentials) {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.jar.add_cookie_str(
            &format!("{}={}; Path=/", self.access_cookie, credentials.access_token),
            &self.base,
        );
        inner.jar.add_cookie_str(
            &format!("{}={}; Path=/", self.refresh_cookie, credentials.refresh_token),
            &self.base,
        );
    }

    fn clear_credentials(&self) {
        match HttpInner::fresh() {
            Ok(fresh) => *self.inner.write().unwrap_or_else(PoisonError::into_inner) = fresh,
            Err(e) => warn!(error = %e, "could not rebuild http client, cookies kept"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builders() {
        let req = ApiRequest::get("feed").query("category_id", "3");
        assert_eq!(req.method, Method::Get);
        assert_eq!(req.query, vec![("category_id".to_string(), "3".to_string())]);
        assert!(matches!(req.body, Body::Empty));
    }

    #[test]
    fn test_empty_body_is_null() {
        let resp = ApiResponse::new(204, Vec::new());
        assert!(resp.is_success());
        assert_eq!(resp.value().unwrap(), serde_json::Value::Null);
    }

    #[test]
    fn test_decode_error() {
        let resp = ApiResponse::new(200, b"not json".to_vec());
        assert!(matches!(resp.value(), Err(Error::Decode(_))));
    }

    #[test]
    fn test_url_join_under_base() {
        let mut config = ClientConfig {
            api_url: "http://localhost:8000/api".to_string(),
            ..Default::default()
        };
        config.validate().unwrap();

        let transport = HttpTransport::new(&config).unwrap();
        let url = transport.url("/posts/7/likes").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8000/api/posts/7/likes");
    }
}
