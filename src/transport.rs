// HTTP transport seam for idox
// The dispatch engine talks to a Transport; ReqwestTransport is the default one

use crate::error::IdoxError;
use crate::injection::InjectionSite;
use crate::models::{render_cookies, Body, Headers, Protocol, Request};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Headers the client must compute itself once a token changed the body.
const LENGTH_HEADERS: &[&str] = &["Content-Length", "Transfer-Encoding"];

/// A fully resolved request, ready for the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRequest {
    pub method: String,
    pub url: String,
    pub headers: Headers,
    pub body: Body,
}

impl PreparedRequest {
    /// Resolve a substituted request: add the scheme, strip length headers
    /// when the body was rewritten and fold the cookie pairs into a `Cookie`
    /// header when needed. Outside the body site the template headers go out
    /// unchanged.
    pub fn new(request: &Request, protocol: Protocol, site: InjectionSite) -> Self {
        let mut headers = request.headers.clone();
        if site == InjectionSite::Body {
            for name in LENGTH_HEADERS {
                headers.remove(name);
            }
        }
        let rebuild_cookie = site == InjectionSite::Cookies || !headers.contains_key("Cookie");
        if rebuild_cookie && !request.cookies.is_empty() {
            headers.insert("Cookie", render_cookies(&request.cookies));
        }

        Self {
            method: request.method.clone(),
            url: protocol.apply(&request.url),
            headers,
            body: request.body.clone(),
        }
    }
}

/// What came back from the server, whatever the status code.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportResponse {
    pub status: u16,
    pub headers: Headers,
    pub body: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportErrorKind {
    Timeout,
    Connect,
    Redirect,
    Request,
    Body,
    Decode,
    Builder,
    Other,
}

impl TransportErrorKind {
    /// Stable name used as the error histogram key.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportErrorKind::Timeout => "Timeout",
            TransportErrorKind::Connect => "ConnectError",
            TransportErrorKind::Redirect => "RedirectError",
            TransportErrorKind::Request => "RequestError",
            TransportErrorKind::Body => "BodyError",
            TransportErrorKind::Decode => "DecodeError",
            TransportErrorKind::Builder => "BuilderError",
            TransportErrorKind::Other => "TransportError",
        }
    }
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A per-request failure. Never fatal to a run.
#[derive(Debug, Clone, Error)]
#[error("{kind}: {message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        let kind = if e.is_timeout() {
            TransportErrorKind::Timeout
        } else if e.is_connect() {
            TransportErrorKind::Connect
        } else if e.is_redirect() {
            TransportErrorKind::Redirect
        } else if e.is_builder() {
            TransportErrorKind::Builder
        } else if e.is_body() {
            TransportErrorKind::Body
        } else if e.is_decode() {
            TransportErrorKind::Decode
        } else if e.is_request() {
            TransportErrorKind::Request
        } else {
            TransportErrorKind::Other
        };
        TransportError::new(kind, e.to_string())
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: &PreparedRequest) -> Result<TransportResponse, TransportError>;
}

pub struct ReqwestTransport {
    pub client: Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Option<Duration>) -> Result<Self, IdoxError> {
        let mut builder = Client::builder().pool_max_idle_per_host(10);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(IdoxError::HttpClientBuild)?;
        Ok(Self { client })
    }

    fn header_map(headers: &Headers) -> Result<HeaderMap, TransportError> {
        let mut map = HeaderMap::with_capacity(headers.len());
        for (name, value) in headers.iter() {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                TransportError::new(TransportErrorKind::Builder, format!("invalid header name {:?}: {}", name, e))
            })?;
            let value = HeaderValue::from_str(value).map_err(|e| {
                TransportError::new(TransportErrorKind::Builder, format!("invalid header value for {}: {}", name, e))
            })?;
            map.insert(name, value);
        }
        Ok(map)
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: &PreparedRequest) -> Result<TransportResponse, TransportError> {
        let method = Method::from_bytes(request.method.as_bytes()).map_err(|e| {
            TransportError::new(TransportErrorKind::Builder, format!("invalid method {:?}: {}", request.method, e))
        })?;

        let mut req = self
            .client
            .request(method, &request.url)
            .headers(Self::header_map(&request.headers)?);
        req = match &request.body {
            Body::Json(value) => req.json(value),
            Body::Text(text) if !text.is_empty() => req.body(text.clone()),
            Body::Text(_) => req,
        };

        let resp = req.send().await?;
        let status = resp.status().as_u16();
        let headers = resp
            .headers()
            .iter()
            .map(|(k, v)| (k.as_str().to_string(), String::from_utf8_lossy(v.as_bytes()).into_owned()))
            .collect();
        let body = resp.bytes().await?.to_vec();

        Ok(TransportResponse { status, headers, body })
    }
}
