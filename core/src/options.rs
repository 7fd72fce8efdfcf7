//! Client configuration and per-call request options.
//!
//! # Design
//! Options are split the way they are consumed. `FetcherOptions` is read once
//! at construction. `RequestInit` holds the fields that reach the transport
//! and is what defaults, the configuration extractor and per-call options
//! produce; layering is an explicit field-wise merge. `MethodOptions` wraps a
//! `RequestInit` with the fields the fetcher itself consumes (`params`,
//! `timeout`, `response_type`), which are stripped before dispatch.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Deserializer};
use url::Url;

use crate::headers::HeadersInit;
use crate::http::RedirectMode;
use crate::params::{ParamValue, Params};
use crate::signal::AbortSignal;

/// Construction-time options for a `Fetcher`.
///
/// Deserializes from `{ "baseUrl": "...", "timeout": <milliseconds> }` with
/// both fields optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FetcherOptions {
    pub base_url: String,
    /// Zero disables the default timeout.
    #[serde(deserialize_with = "duration_from_millis")]
    pub timeout: Duration,
}

impl FetcherOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

fn duration_from_millis<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    u64::deserialize(deserializer).map(Duration::from_millis)
}

/// Transport-facing request options.
#[derive(Debug, Clone, Default)]
pub struct RequestInit {
    pub headers: Option<HeadersInit>,
    pub signal: Option<AbortSignal>,
    pub redirect: Option<RedirectMode>,
}

impl RequestInit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shallow merge: every field set on `overlay` replaces the field on
    /// `self`. Header sets are replaced whole, not merged entry by entry.
    pub fn merge(self, overlay: RequestInit) -> RequestInit {
        RequestInit {
            headers: overlay.headers.or(self.headers),
            signal: overlay.signal.or(self.signal),
            redirect: overlay.redirect.or(self.redirect),
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .get_or_insert_with(|| HeadersInit::Pairs(Vec::new()))
            .push(name, value);
        self
    }

    pub fn headers(mut self, headers: impl Into<HeadersInit>) -> Self {
        self.headers = Some(headers.into());
        self
    }

    pub fn signal(mut self, signal: AbortSignal) -> Self {
        self.signal = Some(signal);
        self
    }

    pub fn redirect(mut self, redirect: RedirectMode) -> Self {
        self.redirect = Some(redirect);
        self
    }
}

/// The shape in which a response body is decoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResponseType {
    #[default]
    Json,
    Text,
    Blob,
    ArrayBuffer,
    FormData,
    Stream,
}

impl ResponseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseType::Json => "json",
            ResponseType::Text => "text",
            ResponseType::Blob => "blob",
            ResponseType::ArrayBuffer => "arrayBuffer",
            ResponseType::FormData => "formData",
            ResponseType::Stream => "stream",
        }
    }
}

impl fmt::Display for ResponseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResponseType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(ResponseType::Json),
            "text" => Ok(ResponseType::Text),
            "blob" => Ok(ResponseType::Blob),
            "arrayBuffer" => Ok(ResponseType::ArrayBuffer),
            "formData" => Ok(ResponseType::FormData),
            "stream" => Ok(ResponseType::Stream),
            other => Err(format!("unknown response type: {other}")),
        }
    }
}

/// Per-call options accepted by every verb method.
#[derive(Debug, Clone, Default)]
pub struct MethodOptions {
    pub params: Option<Params>,
    /// Overrides the client default; `Some(Duration::ZERO)` disables it.
    pub timeout: Option<Duration>,
    /// Ignored by `head` and `options`.
    pub response_type: ResponseType,
    pub init: RequestInit,
}

impl MethodOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.params.get_or_insert_with(Params::new).insert(key, value);
        self
    }

    pub fn params(mut self, params: Params) -> Self {
        self.params = Some(params);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn response_type(mut self, response_type: ResponseType) -> Self {
        self.response_type = response_type;
        self
    }

    pub fn signal(mut self, signal: AbortSignal) -> Self {
        self.init = self.init.signal(signal);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.init = self.init.header(name, value);
        self
    }

    pub fn headers(mut self, headers: impl Into<HeadersInit>) -> Self {
        self.init = self.init.headers(headers);
        self
    }

    pub fn redirect(mut self, redirect: RedirectMode) -> Self {
        self.init = self.init.redirect(redirect);
        self
    }
}

/// A request target: a path or absolute URL string, or a parsed URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Path(String),
    Url(Url),
}

impl Target {
    /// Appends an already-encoded query string, joining with `&` when a query
    /// is already present.
    pub(crate) fn append_query(&mut self, search: &str) {
        if search.is_empty() {
            return;
        }
        match self {
            Target::Path(path) => {
                path.push(if path.contains('?') { '&' } else { '?' });
                path.push_str(search);
            }
            Target::Url(url) => {
                let query = match url.query() {
                    Some(existing) if !existing.is_empty() => format!("{existing}&{search}"),
                    _ => search.to_string(),
                };
                url.set_query(Some(&query));
            }
        }
    }

    /// Parsed URLs and strings starting with `http` are used as-is; anything
    /// else is prefixed with `base_url`.
    pub(crate) fn resolve(&self, base_url: &str) -> String {
        match self {
            Target::Url(url) => url.to_string(),
            Target::Path(path) if path.starts_with("http") => path.clone(),
            Target::Path(path) => format!("{base_url}{path}"),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Path(path) => f.write_str(path),
            Target::Url(url) => f.write_str(url.as_str()),
        }
    }
}

impl From<&str> for Target {
    fn from(path: &str) -> Self {
        Target::Path(path.to_string())
    }
}

impl From<String> for Target {
    fn from(path: String) -> Self {
        Target::Path(path)
    }
}

impl From<&String> for Target {
    fn from(path: &String) -> Self {
        Target::Path(path.clone())
    }
}

impl From<Url> for Target {
    fn from(url: Url) -> Self {
        Target::Url(url)
    }
}

impl From<&Url> for Target {
    fn from(url: &Url) -> Self {
        Target::Url(url.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetcher_options_deserialize_camel_case_millis() {
        let options: FetcherOptions =
            serde_json::from_str(r#"{"baseUrl":"http://api.local","timeout":1500}"#).unwrap();
        assert_eq!(options.base_url, "http://api.local");
        assert_eq!(options.timeout, Duration::from_millis(1500));
    }

    #[test]
    fn fetcher_options_default_when_fields_missing() {
        let options: FetcherOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(options, FetcherOptions::default());
        assert!(options.timeout.is_zero());
    }

    #[test]
    fn merge_prefers_overlay_fields() {
        let base = RequestInit::new()
            .header("x-base", "1")
            .redirect(RedirectMode::Manual);
        let overlay = RequestInit::new().header("x-call", "2");
        let merged = base.merge(overlay);

        let Some(HeadersInit::Pairs(pairs)) = merged.headers else {
            panic!("expected pairs");
        };
        assert_eq!(pairs, vec![("x-call".to_string(), "2".to_string())]);
        assert_eq!(merged.redirect, Some(RedirectMode::Manual));
    }

    #[test]
    fn response_type_round_trips_names() {
        for name in ["json", "text", "blob", "arrayBuffer", "formData", "stream"] {
            let parsed: ResponseType = name.parse().unwrap();
            assert_eq!(parsed.to_string(), name);
        }
        assert!("xml".parse::<ResponseType>().is_err());
    }

    #[test]
    fn append_query_to_path() {
        let mut target = Target::from("/x");
        target.append_query("a=1");
        assert_eq!(target.to_string(), "/x?a=1");

        let mut target = Target::from("/x?z=0");
        target.append_query("a=1");
        assert_eq!(target.to_string(), "/x?z=0&a=1");
    }

    #[test]
    fn append_query_to_url() {
        let mut target = Target::from(Url::parse("http://h.local/x?z=0").unwrap());
        target.append_query("a=1");
        assert_eq!(target.to_string(), "http://h.local/x?z=0&a=1");

        let mut target = Target::from(Url::parse("http://h.local/x").unwrap());
        target.append_query("a=1");
        assert_eq!(target.to_string(), "http://h.local/x?a=1");
    }

    #[test]
    fn empty_query_is_not_appended() {
        let mut target = Target::from("/x");
        target.append_query("");
        assert_eq!(target.to_string(), "/x");
    }

    #[test]
    fn resolve_prefixes_relative_paths_only() {
        let base = "http://api.local";
        assert_eq!(Target::from("/users").resolve(base), "http://api.local/users");
        assert_eq!(Target::from("https://other.local/a").resolve(base), "https://other.local/a");
        let url = Url::parse("http://u.local/p").unwrap();
        assert_eq!(Target::from(url).resolve(base), "http://u.local/p");
    }
}
