//! The `Fetcher` client.
//!
//! # Design
//! `Fetcher` holds a base URL, a default timeout and a transport, all fixed at
//! construction, plus three replaceable pieces: the default request options,
//! the configuration extractor that derives per-call base options from them,
//! and the final-error hook. Setters take `&mut self`, so none of these can
//! change while a call is in flight; calls only take `&self` and are
//! independent of each other.
//!
//! Every verb funnels into `Fetcher::fetch`, which runs a fixed pipeline:
//! timeout resolution, query serialization, signal wiring, option merging,
//! body encoding, URL resolution, dispatch, status check and decoding. Every
//! error the pipeline produces passes through the final-error hook exactly
//! once before it is returned.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::{self, BoxFuture, FutureExt};
use futures::stream::{self, StreamExt};
use http::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use tracing::{debug, instrument, warn, Span};

use crate::body::{RequestBody, ResponseData};
use crate::error::{BuildError, FetchError, TransportError};
use crate::headers::{get_headers, pairs_to_header_map, HeadersInit};
use crate::http::{BodyStream, HttpBody, HttpMethod, HttpRequest, Transport};
use crate::options::{FetcherOptions, MethodOptions, RequestInit, ResponseType, Target};
use crate::params::convert_params;
use crate::response::FetchResponse;
use crate::signal::{AbortReason, AbortSignal};

/// Derives the base request options for a call from the stored defaults and
/// the call's target.
pub type ConfigExtractor = Arc<dyn Fn(&RequestInit, &Target) -> RequestInit + Send + Sync>;

/// Gets the last word on every error before it is returned.
pub type FinalErrorHook = Arc<dyn Fn(FetchError, Target) -> BoxFuture<'static, FetchError> + Send + Sync>;

/// Configurable HTTP client over a `Transport`.
#[derive(Clone)]
pub struct Fetcher {
    base_url: String,
    timeout: Duration,
    transport: Arc<dyn Transport>,
    configs: RequestInit,
    config_extractor: ConfigExtractor,
    final_error: FinalErrorHook,
}

impl fmt::Debug for Fetcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fetcher")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("transport", &self.transport)
            .field("configs", &self.configs)
            .finish_non_exhaustive()
    }
}

impl Fetcher {
    /// Creates a fetcher backed by the default transport.
    ///
    /// Fails with `BuildError::NoTransport` when the crate was built without
    /// a transport backend.
    pub fn new(options: FetcherOptions) -> Result<Self, BuildError> {
        Ok(Self::with_transport(options, default_transport()?))
    }

    pub fn with_transport(options: FetcherOptions, transport: Arc<dyn Transport>) -> Self {
        Self {
            base_url: options.base_url,
            timeout: options.timeout,
            transport,
            configs: RequestInit::default(),
            config_extractor: Arc::new(|configs: &RequestInit, _: &Target| configs.clone()),
            final_error: Arc::new(|err: FetchError, _: Target| future::ready(err).boxed()),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn set_config_extractor<F>(&mut self, extractor: F)
    where
        F: Fn(&RequestInit, &Target) -> RequestInit + Send + Sync + 'static,
    {
        self.config_extractor = Arc::new(extractor);
    }

    pub fn set_final_error<F>(&mut self, hook: F)
    where
        F: Fn(FetchError, &Target) -> FetchError + Send + Sync + 'static,
    {
        self.final_error = Arc::new(move |err, target| future::ready(hook(err, &target)).boxed());
    }

    /// Like `set_final_error`, for hooks that need to await something.
    pub fn set_final_error_async<F, Fut>(&mut self, hook: F)
    where
        F: Fn(FetchError, Target) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = FetchError> + Send + 'static,
    {
        self.final_error = Arc::new(move |err, target| hook(err, target).boxed());
    }

    pub fn set_default_configs(&mut self, configs: RequestInit) {
        self.configs = configs;
    }

    pub async fn get(
        &self,
        target: impl Into<Target>,
        options: MethodOptions,
    ) -> Result<FetchResponse, FetchError> {
        self.fetch(target.into(), HttpMethod::Get, options, None).await
    }

    pub async fn post(
        &self,
        target: impl Into<Target>,
        body: impl Into<RequestBody>,
        options: MethodOptions,
    ) -> Result<FetchResponse, FetchError> {
        self.fetch(target.into(), HttpMethod::Post, options, Some(body.into()))
            .await
    }

    pub async fn put(
        &self,
        target: impl Into<Target>,
        body: impl Into<RequestBody>,
        options: MethodOptions,
    ) -> Result<FetchResponse, FetchError> {
        self.fetch(target.into(), HttpMethod::Put, options, Some(body.into()))
            .await
    }

    pub async fn patch(
        &self,
        target: impl Into<Target>,
        body: impl Into<RequestBody>,
        options: MethodOptions,
    ) -> Result<FetchResponse, FetchError> {
        self.fetch(target.into(), HttpMethod::Patch, options, Some(body.into()))
            .await
    }

    pub async fn delete(
        &self,
        target: impl Into<Target>,
        options: MethodOptions,
    ) -> Result<FetchResponse, FetchError> {
        self.fetch(target.into(), HttpMethod::Delete, options, None)
            .await
    }

    /// The envelope's `data` is always `None`.
    pub async fn head(
        &self,
        target: impl Into<Target>,
        options: MethodOptions,
    ) -> Result<FetchResponse, FetchError> {
        self.fetch(target.into(), HttpMethod::Head, options, None).await
    }

    /// The envelope's `data` is always `None`.
    pub async fn options(
        &self,
        target: impl Into<Target>,
        options: MethodOptions,
    ) -> Result<FetchResponse, FetchError> {
        self.fetch(target.into(), HttpMethod::Options, options, None)
            .await
    }

    #[instrument(
        name = "fetch",
        skip_all,
        fields(
            http.method = %method,
            http.url = tracing::field::Empty,
            http.status_code = tracing::field::Empty,
        )
    )]
    async fn fetch(
        &self,
        mut target: Target,
        method: HttpMethod,
        options: MethodOptions,
        body: Option<RequestBody>,
    ) -> Result<FetchResponse, FetchError> {
        let MethodOptions {
            params,
            timeout,
            response_type,
            init,
        } = options;
        let timeout = timeout.unwrap_or(self.timeout);

        if let Some(params) = params {
            target.append_query(&convert_params(&params));
        }

        let mut init = init;
        if !timeout.is_zero() {
            let timeout_signal = AbortSignal::timeout(timeout);
            init.signal = Some(match init.signal.take() {
                Some(signal) => AbortSignal::any([signal, timeout_signal]),
                None => timeout_signal,
            });
        }

        let mut init = (self.config_extractor)(&self.configs, &target).merge(init);

        let request = match self.encode_request(&target, method, &mut init, body) {
            Ok(request) => request,
            Err(err) => return Err(self.reject(err.into(), target).await),
        };
        Span::current().record("http.url", request.url.as_str());
        debug!(timeout_ms = timeout.as_millis() as u64, "dispatching request");

        // The signal stays armed until the body has been read.
        let signal = init.signal.as_ref();
        let sent = until_aborted(signal, self.transport.send(request))
            .await
            .unwrap_or_else(|reason| Err(reason.into()));
        let response = match sent {
            Ok(response) => response,
            Err(err) => return Err(self.reject(err.into(), target).await),
        };
        Span::current().record("http.status_code", response.status);

        if !response.ok() {
            let status = response.status;
            let status_text = response.status_text.clone();
            let data = if response.is_json() {
                match until_aborted(signal, response.json()).await {
                    Ok(data) => data.ok(),
                    Err(reason) => {
                        let err = TransportError::from(reason).into();
                        return Err(self.reject(err, target).await);
                    }
                }
            } else {
                None
            };
            let err = FetchError::http_status(status, status_text, data);
            return Err(self.reject(err, target).await);
        }

        let mut envelope = FetchResponse {
            ok: true,
            status: response.status,
            status_text: response.status_text.clone(),
            response_type: response.kind,
            headers: response.headers.clone(),
            redirected: response.redirected,
            body_used: false,
            url: response.url.clone(),
            data: None,
        };

        let decode = method.decodes_body()
            && (response_type != ResponseType::Json || response.is_json());
        if decode {
            let decoding = async move {
                match response_type {
                    ResponseType::Stream => {
                        let body = match signal {
                            Some(signal) => abortable(response.into_stream(), signal.clone()),
                            None => response.into_stream(),
                        };
                        Ok(ResponseData::Stream(body))
                    }
                    ResponseType::Json => response.json().await.map(ResponseData::Json),
                    ResponseType::Text => response.text().await.map(ResponseData::Text),
                    ResponseType::Blob => response.blob().await.map(ResponseData::Blob),
                    ResponseType::ArrayBuffer => {
                        response.bytes().await.map(ResponseData::ArrayBuffer)
                    }
                    ResponseType::FormData => {
                        response.form_data().await.map(ResponseData::FormData)
                    }
                }
            };
            let decoded = until_aborted(signal, decoding)
                .await
                .unwrap_or_else(|reason| Err(TransportError::from(reason).into()));
            match decoded {
                Ok(data) => {
                    envelope.body_used = !matches!(data, ResponseData::Stream(_));
                    envelope.data = Some(data);
                }
                Err(err) => return Err(self.reject(err, target).await),
            }
        }

        Ok(envelope)
    }

    /// Encodes the body into `init` and assembles the transport request.
    fn encode_request(
        &self,
        target: &Target,
        method: HttpMethod,
        init: &mut RequestInit,
        body: Option<RequestBody>,
    ) -> Result<HttpRequest, TransportError> {
        let body = match body {
            Some(RequestBody::Multipart(form)) => {
                if init.headers.is_some() {
                    get_headers(init)?.remove(CONTENT_TYPE);
                }
                HttpBody::Multipart(form)
            }
            Some(RequestBody::Json(value)) => {
                get_headers(init)?.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                HttpBody::Text(value.to_string())
            }
            None => HttpBody::Empty,
        };

        let headers = match init.headers.take() {
            Some(HeadersInit::Headers(map)) => map,
            Some(HeadersInit::Pairs(pairs)) => pairs_to_header_map(&pairs)?,
            None => HeaderMap::new(),
        };

        Ok(HttpRequest {
            method,
            url: target.resolve(&self.base_url),
            headers,
            body,
            redirect: init.redirect.unwrap_or_default(),
        })
    }

    async fn reject(&self, err: FetchError, target: Target) -> FetchError {
        warn!(
            status = err.status,
            name = %err.name,
            url = %target,
            "request failed: {}",
            err.message
        );
        (self.final_error)(err, target).await
    }
}

/// Runs `work` unless `signal` fires first.
async fn until_aborted<F: Future>(
    signal: Option<&AbortSignal>,
    work: F,
) -> Result<F::Output, AbortReason> {
    match signal {
        Some(signal) => tokio::select! {
            biased;
            reason = signal.cancelled() => Err(reason),
            output = work => Ok(output),
        },
        None => Ok(work.await),
    }
}

/// Ends `body` with the abort reason as its last item once `signal` fires.
fn abortable(body: BodyStream, signal: AbortSignal) -> BodyStream {
    let aborted: BoxFuture<'static, AbortReason> =
        async move { signal.cancelled().await }.boxed();
    stream::unfold(Some((body, aborted)), |state| async move {
        let (mut body, mut aborted) = state?;
        tokio::select! {
            biased;
            reason = &mut aborted => Some((Err(TransportError::from(reason)), None)),
            chunk = body.next() => chunk.map(|chunk| (chunk, Some((body, aborted)))),
        }
    })
    .boxed()
}

#[cfg(feature = "reqwest")]
fn default_transport() -> Result<Arc<dyn Transport>, BuildError> {
    Ok(Arc::new(crate::backends::ReqwestTransport::new()?))
}

#[cfg(not(feature = "reqwest"))]
fn default_transport() -> Result<Arc<dyn Transport>, BuildError> {
    Err(BuildError::NoTransport)
}

/// Creates a `Fetcher` backed by the default transport.
pub fn create_fetcher(options: FetcherOptions) -> Result<Fetcher, BuildError> {
    Fetcher::new(options)
}
