//! Configurable HTTP client over a pluggable transport.
//!
//! # Overview
//! `Fetcher` wraps a `Transport` (reqwest by default) and adds base-URL
//! resolution, layered request options, query-string serialization, timeout
//! to cancellation translation, JSON and multipart body encoding, response
//! decoding by declared type, and one error shape for every failure.
//!
//! # Design
//! - Each call is a single request/response round trip; nothing is retried
//!   or cached and calls share no state beyond the client's configuration.
//! - The transport only sees plain data (`HttpRequest`) and returns an unread
//!   body (`TransportResponse`), so alternative backends and test doubles
//!   only implement one method.
//! - Timeouts and caller cancellation are both `AbortSignal`s, combined so
//!   that whichever fires first aborts the call.
//! - Every `FetchError` passes through the final-error hook before it is
//!   returned, giving one place to log, translate or enrich failures.
//!
//! ```no_run
//! use fetcher_core::{create_fetcher, FetcherOptions, MethodOptions};
//! use std::time::Duration;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let fetcher = create_fetcher(
//!     FetcherOptions::new()
//!         .base_url("https://api.example.com")
//!         .timeout(Duration::from_secs(5)),
//! )?;
//! let response = fetcher
//!     .get("/users", MethodOptions::new().param("page", 2))
//!     .await?;
//! println!("{} {:?}", response.status, response.data);
//! # Ok(())
//! # }
//! ```

pub mod backends;
pub mod body;
pub mod client;
pub mod error;
pub mod headers;
pub mod http;
pub mod options;
pub mod params;
pub mod response;
pub mod signal;

#[cfg(feature = "reqwest")]
pub use crate::backends::ReqwestTransport;
pub use crate::body::{Blob, FilePart, FormData, FormValue, RequestBody, ResponseData};
pub use crate::client::{create_fetcher, ConfigExtractor, Fetcher, FinalErrorHook};
pub use crate::error::{BuildError, ErrorKind, FetchError, InvalidHeader, TransportError};
pub use crate::headers::{get_headers, HeadersInit};
pub use crate::http::{
    BodyStream, HttpBody, HttpMethod, HttpRequest, RedirectMode, ResponseKind, Transport,
    TransportResponse,
};
pub use crate::options::{FetcherOptions, MethodOptions, RequestInit, ResponseType, Target};
pub use crate::params::{convert_params, ParamValue, Params};
pub use crate::response::FetchResponse;
pub use crate::signal::{AbortController, AbortReason, AbortSignal};
