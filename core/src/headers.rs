//! Header containers and normalization.

use http::header::{HeaderMap, HeaderName, HeaderValue};

use crate::error::InvalidHeader;
use crate::options::RequestInit;

/// Headers as supplied by a caller: either raw name/value pairs or an
/// already-built `HeaderMap`.
#[derive(Debug, Clone)]
pub enum HeadersInit {
    Pairs(Vec<(String, String)>),
    Headers(HeaderMap),
}

impl HeadersInit {
    /// Adds one header. Onto a `HeaderMap` it is appended directly when it
    /// is valid; anything else is validated when the headers are normalized.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let (name, value) = (name.into(), value.into());
        match self {
            HeadersInit::Pairs(pairs) => pairs.push((name, value)),
            HeadersInit::Headers(map) => match parse_pair(&name, &value) {
                Ok((name, value)) => {
                    map.append(name, value);
                }
                Err(_) => {
                    let mut pairs = header_map_to_pairs(map);
                    pairs.push((name, value));
                    *self = HeadersInit::Pairs(pairs);
                }
            },
        }
    }

    /// Converts raw pairs in place and returns the resulting map.
    fn normalize(&mut self) -> Result<&mut HeaderMap, InvalidHeader> {
        match self {
            HeadersInit::Headers(map) => Ok(map),
            HeadersInit::Pairs(pairs) => {
                let map = pairs_to_header_map(pairs)?;
                *self = HeadersInit::Headers(map);
                self.normalize()
            }
        }
    }
}

impl From<HeaderMap> for HeadersInit {
    fn from(map: HeaderMap) -> Self {
        HeadersInit::Headers(map)
    }
}

impl<K: Into<String>, V: Into<String>> From<Vec<(K, V)>> for HeadersInit {
    fn from(pairs: Vec<(K, V)>) -> Self {
        HeadersInit::Pairs(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl<K: Into<String>, V: Into<String>, const N: usize> From<[(K, V); N]> for HeadersInit {
    fn from(pairs: [(K, V); N]) -> Self {
        HeadersInit::Pairs(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Returns the header container of `init`, converting raw pairs into a
/// `HeaderMap` and storing it back first. Absent headers become an empty map.
pub fn get_headers(init: &mut RequestInit) -> Result<&mut HeaderMap, InvalidHeader> {
    init.headers
        .get_or_insert_with(|| HeadersInit::Headers(HeaderMap::new()))
        .normalize()
}

/// Repeated names are appended, not overwritten.
pub(crate) fn pairs_to_header_map(pairs: &[(String, String)]) -> Result<HeaderMap, InvalidHeader> {
    let mut map = HeaderMap::with_capacity(pairs.len());
    for (name, value) in pairs {
        let (name, value) = parse_pair(name, value)?;
        map.append(name, value);
    }
    Ok(map)
}

fn parse_pair(name: &str, value: &str) -> Result<(HeaderName, HeaderValue), InvalidHeader> {
    let invalid = |reason: String| InvalidHeader {
        name: name.to_string(),
        reason,
    };
    let header_name = HeaderName::try_from(name).map_err(|e| invalid(e.to_string()))?;
    let header_value = HeaderValue::try_from(value).map_err(|e| invalid(e.to_string()))?;
    Ok((header_name, header_value))
}

/// Only used once the headers already hold an invalid pair, so the lossy
/// conversion never reaches the wire.
fn header_map_to_pairs(map: &HeaderMap) -> Vec<(String, String)> {
    map.iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect()
}
