//! reqwest-based `Transport` implementation

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::multipart::{Form, Part};
use reqwest::redirect::Policy;

use crate::body::{FormData, FormValue};
use crate::error::{BuildError, TransportError, NETWORK_ERROR, TIMEOUT_ERROR};
use crate::http::{HttpBody, HttpRequest, RedirectMode, Transport, TransportResponse};

/// Transport over `reqwest`.
///
/// reqwest fixes the redirect policy per client, so two clients are kept:
/// one that follows redirects and one that hands them back.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    follow: reqwest::Client,
    manual: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, BuildError> {
        let follow = reqwest::Client::builder()
            .build()
            .map_err(|e| BuildError::Transport(e.to_string()))?;
        let manual = reqwest::Client::builder()
            .redirect(Policy::none())
            .build()
            .map_err(|e| BuildError::Transport(e.to_string()))?;
        Ok(Self { follow, manual })
    }

    /// Wraps caller-configured clients. `manual` should not follow redirects.
    pub fn from_clients(follow: reqwest::Client, manual: reqwest::Client) -> Self {
        Self { follow, manual }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<TransportResponse, TransportError> {
        let client = match request.redirect {
            RedirectMode::Follow => &self.follow,
            RedirectMode::Error | RedirectMode::Manual => &self.manual,
        };

        let mut builder = client
            .request(request.method.into(), &request.url)
            .headers(request.headers);
        builder = match request.body {
            HttpBody::Empty => builder,
            HttpBody::Text(text) => builder.body(text),
            HttpBody::Multipart(form) => builder.multipart(to_multipart(form)?),
        };

        let response = builder.send().await.map_err(map_error)?;
        let status = response.status();

        if request.redirect == RedirectMode::Error && status.is_redirection() {
            let location = response
                .headers()
                .get(reqwest::header::LOCATION)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default();
            return Err(TransportError::new(
                "RedirectError",
                format!("unexpected redirect to {location:?}"),
            ));
        }

        let redirected = reqwest::Url::parse(&request.url)
            .map(|requested| requested != *response.url())
            .unwrap_or(false);
        let url = response.url().to_string();
        let headers = response.headers().clone();
        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(map_error))
            .boxed();

        let mut out = TransportResponse::from_stream(status.as_u16(), body).with_url(url);
        out.headers = headers;
        out.redirected = redirected;
        Ok(out)
    }
}

fn to_multipart(form: FormData) -> Result<Form, TransportError> {
    let mut out = Form::new();
    for (name, value) in form {
        out = match value {
            FormValue::Text(text) => out.text(name, text),
            FormValue::File(file) => {
                let mut part = Part::bytes(file.bytes.to_vec());
                if let Some(file_name) = file.file_name {
                    part = part.file_name(file_name);
                }
                if let Some(content_type) = file.content_type {
                    part = part.mime_str(&content_type).map_err(map_error)?;
                }
                out.part(name, part)
            }
        };
    }
    Ok(out)
}

fn map_error(err: reqwest::Error) -> TransportError {
    let name = if err.is_timeout() {
        TIMEOUT_ERROR
    } else if err.is_connect() {
        "ConnectError"
    } else if err.is_builder() {
        "RequestError"
    } else if err.is_redirect() {
        "RedirectError"
    } else if err.is_body() {
        "BodyError"
    } else if err.is_decode() {
        "DecodeError"
    } else {
        NETWORK_ERROR
    };
    TransportError::new(name, err.to_string())
}
