//! Request and response body types.

use std::convert::Infallible;
use std::fmt;

use bytes::Bytes;
use futures::{future, stream};
use serde::Serialize;
use url::form_urlencoded;

use crate::http::BodyStream;

/// A request body accepted by `post`, `put` and `patch`.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// Serialized to JSON text and sent as `application/json`.
    Json(serde_json::Value),
    /// Sent as `multipart/form-data`; the transport picks the boundary.
    Multipart(FormData),
}

impl RequestBody {
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self, serde_json::Error> {
        serde_json::to_value(value).map(RequestBody::Json)
    }
}

impl From<serde_json::Value> for RequestBody {
    fn from(value: serde_json::Value) -> Self {
        RequestBody::Json(value)
    }
}

impl From<FormData> for RequestBody {
    fn from(form: FormData) -> Self {
        RequestBody::Multipart(form)
    }
}

/// A file entry in a `FormData`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormValue {
    Text(String),
    File(FilePart),
}

impl FormValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FormValue::Text(s) => Some(s),
            FormValue::File(_) => None,
        }
    }
}

impl From<&str> for FormValue {
    fn from(value: &str) -> Self {
        FormValue::Text(value.to_string())
    }
}

impl From<String> for FormValue {
    fn from(value: String) -> Self {
        FormValue::Text(value)
    }
}

impl From<FilePart> for FormValue {
    fn from(value: FilePart) -> Self {
        FormValue::File(value)
    }
}

/// Ordered multipart form entries. Names may repeat.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormData {
    entries: Vec<(String, FormValue)>,
}

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, name: impl Into<String>, value: impl Into<FormValue>) {
        self.entries.push((name.into(), value.into()));
    }

    /// Builder-style `append`.
    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.append(name, FormValue::Text(value.into()));
        self
    }

    /// Builder-style file `append`.
    pub fn file(
        mut self,
        name: impl Into<String>,
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        self.append(
            name,
            FilePart {
                file_name: Some(file_name.into()),
                content_type: Some(content_type.into()),
                bytes: bytes.into(),
            },
        );
        self
    }

    /// The first value stored under `name`.
    pub fn get(&self, name: &str) -> Option<&FormValue> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a FormValue> + 'a {
        self.entries
            .iter()
            .filter(move |(n, _)| n == name)
            .map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FormValue)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parses an `application/x-www-form-urlencoded` or
    /// `multipart/form-data` body according to `content_type`.
    pub async fn parse(content_type: &str, body: Bytes) -> Result<FormData, String> {
        let mime = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match mime.as_str() {
            "application/x-www-form-urlencoded" => Ok(form_urlencoded::parse(&body)
                .map(|(k, v)| (k.into_owned(), FormValue::Text(v.into_owned())))
                .collect::<Vec<_>>()
                .into()),
            "multipart/form-data" => parse_multipart(content_type, body).await,
            other => Err(format!("cannot decode form data from content type {other:?}")),
        }
    }
}

impl IntoIterator for FormData {
    type Item = (String, FormValue);
    type IntoIter = std::vec::IntoIter<(String, FormValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl From<Vec<(String, FormValue)>> for FormData {
    fn from(entries: Vec<(String, FormValue)>) -> Self {
        Self { entries }
    }
}

/// A binary body with its declared media type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    /// Lowercased `Content-Type` of the response, empty when absent.
    pub content_type: String,
    pub bytes: Bytes,
}

/// A decoded response body.
pub enum ResponseData {
    Json(serde_json::Value),
    Text(String),
    Blob(Blob),
    ArrayBuffer(Bytes),
    FormData(FormData),
    Stream(BodyStream),
}

impl ResponseData {
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            ResponseData::Json(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ResponseData::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn into_stream(self) -> Option<BodyStream> {
        match self {
            ResponseData::Stream(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Debug for ResponseData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseData::Json(v) => f.debug_tuple("Json").field(v).finish(),
            ResponseData::Text(s) => f.debug_tuple("Text").field(s).finish(),
            ResponseData::Blob(b) => f.debug_tuple("Blob").field(b).finish(),
            ResponseData::ArrayBuffer(b) => f.debug_tuple("ArrayBuffer").field(b).finish(),
            ResponseData::FormData(d) => f.debug_tuple("FormData").field(d).finish(),
            ResponseData::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

async fn parse_multipart(content_type: &str, body: Bytes) -> Result<FormData, String> {
    let boundary = multer::parse_boundary(content_type).map_err(|e| e.to_string())?;
    let stream = stream::once(future::ready(Ok::<_, Infallible>(body)));
    let mut multipart = multer::Multipart::new(stream, boundary);

    let mut form = FormData::new();
    while let Some(field) = multipart.next_field().await.map_err(|e| e.to_string())? {
        let name = field.name().ok_or("multipart part has no name")?.to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(|mime| mime.to_string());
        let bytes = field.bytes().await.map_err(|e| e.to_string())?;
        let value = if file_name.is_some() {
            FormValue::File(FilePart {
                file_name,
                content_type,
                bytes,
            })
        } else {
            FormValue::Text(String::from_utf8_lossy(&bytes).into_owned())
        };
        form.append(name, value);
    }
    Ok(form)
}
