//! Transport-level HTTP types and the `Transport` seam.
//!
//! # Design
//! A request reaches the transport as plain data: `HttpRequest` carries an
//! absolute URL, a validated `HeaderMap` and an already-encoded body, so a
//! transport only has to put bytes on the wire. The response comes back as a
//! `TransportResponse` whose body is still an unread stream; the fetcher
//! picks a decode accessor based on the caller's response type.
//!
//! Cancellation is not part of the trait. The fetcher races `send` against
//! the request's abort signal and drops the transport future when the signal
//! wins, which is how in-flight requests are aborted.

use std::fmt;
use std::pin::Pin;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::stream::{self, Stream, StreamExt};
use http::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use http::StatusCode;

use crate::body::{Blob, FormData};
use crate::error::{FetchError, TransportError};

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
        }
    }

    /// HEAD and OPTIONS responses are never decoded.
    pub fn decodes_body(&self) -> bool {
        !matches!(self, HttpMethod::Head | HttpMethod::Options)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<HttpMethod> for http::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => http::Method::GET,
            HttpMethod::Post => http::Method::POST,
            HttpMethod::Put => http::Method::PUT,
            HttpMethod::Patch => http::Method::PATCH,
            HttpMethod::Delete => http::Method::DELETE,
            HttpMethod::Head => http::Method::HEAD,
            HttpMethod::Options => http::Method::OPTIONS,
        }
    }
}

/// How the transport treats 3xx responses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RedirectMode {
    #[default]
    Follow,
    /// Fail with a `RedirectError` when a redirect is received.
    Error,
    /// Hand the 3xx response back unfollowed.
    Manual,
}

/// An encoded request body.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum HttpBody {
    #[default]
    Empty,
    Text(String),
    /// The transport is responsible for the multipart encoding and boundary.
    Multipart(FormData),
}

/// An HTTP request described as plain data.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: HeaderMap,
    pub body: HttpBody,
    pub redirect: RedirectMode,
}

/// Response tainting, as reported by the transport.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResponseKind {
    #[default]
    Basic,
    Cors,
    Default,
    Error,
    Opaque,
    OpaqueRedirect,
}

impl ResponseKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseKind::Basic => "basic",
            ResponseKind::Cors => "cors",
            ResponseKind::Default => "default",
            ResponseKind::Error => "error",
            ResponseKind::Opaque => "opaque",
            ResponseKind::OpaqueRedirect => "opaqueredirect",
        }
    }
}

impl fmt::Display for ResponseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A response body that has not been read yet.
pub type BodyStream = Pin<Box<dyn Stream<Item = Result<Bytes, TransportError>> + Send>>;

/// A response as returned by a `Transport`, with its body unread.
pub struct TransportResponse {
    pub status: u16,
    pub status_text: String,
    pub headers: HeaderMap,
    pub url: String,
    pub redirected: bool,
    pub kind: ResponseKind,
    body: BodyStream,
}

impl fmt::Debug for TransportResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportResponse")
            .field("status", &self.status)
            .field("status_text", &self.status_text)
            .field("headers", &self.headers)
            .field("url", &self.url)
            .field("redirected", &self.redirected)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl TransportResponse {
    /// Builds a response around a body stream. The status text defaults to
    /// the canonical reason phrase.
    pub fn from_stream(status: u16, body: BodyStream) -> Self {
        Self {
            status,
            status_text: canonical_reason(status).to_string(),
            headers: HeaderMap::new(),
            url: String::new(),
            redirected: false,
            kind: ResponseKind::Basic,
            body,
        }
    }

    pub fn from_bytes(status: u16, body: impl Into<Bytes>) -> Self {
        let body: Bytes = body.into();
        let stream = if body.is_empty() {
            stream::empty().boxed()
        } else {
            stream::once(async move { Ok(body) }).boxed()
        };
        Self::from_stream(status, stream)
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_status_text(mut self, status_text: impl Into<String>) -> Self {
        self.status_text = status_text.into();
        self
    }

    /// True for 2xx statuses.
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }

    pub fn is_json(&self) -> bool {
        self.content_type()
            .is_some_and(|ct| ct.contains("application/json"))
    }

    pub fn into_stream(self) -> BodyStream {
        self.body
    }

    pub async fn bytes(self) -> Result<Bytes, FetchError> {
        let mut body = self.body;
        let mut buf = BytesMut::new();
        while let Some(chunk) = body.next().await {
            buf.extend_from_slice(&chunk.map_err(FetchError::from)?);
        }
        Ok(buf.freeze())
    }

    /// Invalid UTF-8 sequences are replaced, not rejected.
    pub async fn text(self) -> Result<String, FetchError> {
        let bytes = self.bytes().await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    pub async fn json(self) -> Result<serde_json::Value, FetchError> {
        let bytes = self.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| FetchError::decode(format!("invalid JSON body: {e}")))
    }

    pub async fn blob(self) -> Result<Blob, FetchError> {
        let content_type = self.content_type().unwrap_or_default().to_ascii_lowercase();
        let bytes = self.bytes().await?;
        Ok(Blob {
            content_type,
            bytes,
        })
    }

    pub async fn form_data(self) -> Result<FormData, FetchError> {
        let content_type = self.content_type().unwrap_or_default().to_string();
        let bytes = self.bytes().await?;
        FormData::parse(&content_type, bytes)
            .await
            .map_err(FetchError::decode)
    }
}

fn canonical_reason(status: u16) -> &'static str {
    StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("")
}

/// Executes HTTP requests on behalf of a `Fetcher`.
#[async_trait]
pub trait Transport: Send + Sync + fmt::Debug {
    /// Sends `request` and resolves once response headers are available.
    /// Non-2xx statuses are responses, not errors.
    async fn send(&self, request: HttpRequest) -> Result<TransportResponse, TransportError>;
}
