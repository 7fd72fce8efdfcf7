use std::collections::BTreeMap;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{Multipart, Path, RawQuery},
    http::{header, HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Redirect, Response},
    routing::{any, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;

/// Boundary used by the `/multipart` route.
pub const MULTIPART_BOUNDARY: &str = "mock-server-boundary";

/// What `/echo` saw of the request.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Echo {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

/// What `/upload` saw of a multipart request.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Upload {
    pub content_type: String,
    /// `(field name, text value or file name)` in arrival order.
    pub fields: Vec<(String, String)>,
}

pub fn app() -> Router {
    Router::new()
        .route("/echo", any(echo))
        .route("/status/{code}", any(status))
        .route("/text", get(text))
        .route("/form", get(form))
        .route("/multipart", get(multipart))
        .route("/bytes", get(bytes))
        .route("/slow/{ms}", get(slow))
        .route("/redirect", get(redirect))
        .route("/upload", post(upload))
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn echo(
    method: Method,
    uri: Uri,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> Json<Echo> {
    let headers = headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect();
    Json(Echo {
        method: method.to_string(),
        path: uri.path().to_string(),
        query,
        headers,
        body: String::from_utf8_lossy(&body).into_owned(),
    })
}

/// Responds with the requested status and a JSON `reason` body.
async fn status(Path(code): Path<u16>) -> Response {
    let Ok(status) = StatusCode::from_u16(code) else {
        return StatusCode::BAD_REQUEST.into_response();
    };
    let reason = status.canonical_reason().unwrap_or("unknown").to_lowercase();
    (status, Json(serde_json::json!({ "reason": reason }))).into_response()
}

async fn text() -> &'static str {
    "hello from mock-server"
}

async fn form() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/x-www-form-urlencoded")],
        "name=mock+server&tag=a&tag=b",
    )
}

async fn multipart() -> impl IntoResponse {
    let body = format!(
        "--{b}\r\n\
Content-Disposition: form-data; name=\"title\"\r\n\r\n\
report\r\n\
--{b}\r\n\
Content-Disposition: form-data; name=\"file\"; filename=\"r.csv\"\r\n\
Content-Type: text/csv\r\n\r\n\
a,b\n1,2\r\n\
--{b}--\r\n",
        b = MULTIPART_BOUNDARY
    );
    (
        [(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={MULTIPART_BOUNDARY}"),
        )],
        body,
    )
}

async fn bytes() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/octet-stream")],
        vec![0u8, 1, 2, 3, 255],
    )
}

async fn slow(Path(ms): Path<u64>) -> Json<serde_json::Value> {
    tokio::time::sleep(Duration::from_millis(ms)).await;
    Json(serde_json::json!({ "slept": ms }))
}

async fn redirect() -> Redirect {
    Redirect::to("/echo")
}

async fn upload(headers: HeaderMap, mut multipart: Multipart) -> Result<Json<Upload>, StatusCode> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let mut fields = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| StatusCode::BAD_REQUEST)?
    {
        let name = field.name().unwrap_or_default().to_string();
        let value = match field.file_name() {
            Some(file_name) => file_name.to_string(),
            None => field.text().await.map_err(|_| StatusCode::BAD_REQUEST)?,
        };
        fields.push((name, value));
    }
    Ok(Json(Upload {
        content_type,
        fields,
    }))
}
