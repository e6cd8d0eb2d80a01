use axum::{
    body::Bytes,
    extract::Path,
    http::{header, HeaderMap, StatusCode},
    response::Redirect,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;

/// Request headers echoed back by `/headers`, `null` for anything the
/// client did not send.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReflectedHeaders {
    pub user_agent: Option<String>,
    pub cookie: Option<String>,
    pub referer: Option<String>,
}

pub fn app() -> Router {
    Router::new()
        .route("/text", get(plain_text))
        .route("/echo", post(echo))
        .route("/status/{code}", get(status_code))
        .route("/redirect", get(redirect))
        .route("/headers", get(reflect_headers))
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn plain_text() -> &'static str {
    "Hello, World!"
}

/// Echo the raw request body, reporting the received byte count in
/// `x-body-length` so clients can verify nothing was truncated.
async fn echo(body: Bytes) -> ([(&'static str, String); 1], Bytes) {
    ([("x-body-length", body.len().to_string())], body)
}

async fn status_code(Path(code): Path<u16>) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::BAD_REQUEST)
}

async fn redirect() -> Redirect {
    Redirect::temporary("/text")
}

async fn reflect_headers(headers: HeaderMap) -> Json<ReflectedHeaders> {
    let text = |name: header::HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(String::from)
    };
    Json(ReflectedHeaders {
        user_agent: text(header::USER_AGENT),
        cookie: text(header::COOKIE),
        referer: text(header::REFERER),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reflected_headers_serialize_absent_as_null() {
        let reflected = ReflectedHeaders {
            user_agent: Some("agent/1.0".to_string()),
            cookie: None,
            referer: None,
        };
        let json = serde_json::to_value(&reflected).unwrap();
        assert_eq!(json["user_agent"], "agent/1.0");
        assert!(json["cookie"].is_null());
        assert!(json["referer"].is_null());
    }

    #[test]
    fn reflected_headers_roundtrip_through_json() {
        let reflected = ReflectedHeaders {
            user_agent: Some("agent/1.0".to_string()),
            cookie: Some("session=abc;".to_string()),
            referer: Some("http://example.test/from".to_string()),
        };
        let json = serde_json::to_string(&reflected).unwrap();
        let back: ReflectedHeaders = serde_json::from_str(&json).unwrap();
        assert_eq!(back.user_agent, reflected.user_agent);
        assert_eq!(back.cookie, reflected.cookie);
        assert_eq!(back.referer, reflected.referer);
    }
}
