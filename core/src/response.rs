//! The response envelope returned by successful calls.

use http::header::HeaderMap;
use serde::de::DeserializeOwned;

use crate::body::ResponseData;
use crate::http::ResponseKind;

/// Metadata of a successful response plus its decoded body.
#[derive(Debug)]
pub struct FetchResponse {
    pub ok: bool,
    pub status: u16,
    pub status_text: String,
    pub response_type: ResponseKind,
    pub headers: HeaderMap,
    pub redirected: bool,
    /// True when a decode accessor consumed the body. A handed-over stream
    /// leaves it unused.
    pub body_used: bool,
    pub url: String,
    /// `None` when decoding was skipped for this method or response type.
    pub data: Option<ResponseData>,
}

impl FetchResponse {
    /// Deserializes JSON data into `T`. Returns `Ok(None)` when the body was
    /// not decoded as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<Option<T>, serde_json::Error> {
        match self.data.as_ref().and_then(ResponseData::as_json) {
            Some(value) => T::deserialize(value).map(Some),
            None => Ok(None),
        }
    }

    pub fn text(&self) -> Option<&str> {
        self.data.as_ref().and_then(ResponseData::as_text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    fn envelope(data: Option<ResponseData>) -> FetchResponse {
        FetchResponse {
            ok: true,
            status: 200,
            status_text: "OK".to_string(),
            response_type: ResponseKind::Basic,
            headers: HeaderMap::new(),
            redirected: false,
            body_used: data.is_some(),
            url: "http://h.local/".to_string(),
            data,
        }
    }

    #[test]
    fn json_deserializes_into_caller_type() {
        #[derive(Deserialize)]
        struct User {
            id: u32,
        }
        let response = envelope(Some(ResponseData::Json(serde_json::json!({"id": 7}))));
        let user: User = response.json().unwrap().unwrap();
        assert_eq!(user.id, 7);
    }

    #[test]
    fn json_is_none_for_other_data() {
        let response = envelope(Some(ResponseData::Text("hi".to_string())));
        assert!(response.json::<serde_json::Value>().unwrap().is_none());
        assert_eq!(response.text(), Some("hi"));
        assert!(envelope(None).text().is_none());
    }
}
