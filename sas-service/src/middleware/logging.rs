use axum::body::Body;
use axum::http::{header, HeaderValue};
use axum::{extract::Request, middleware::Next, response::Response};
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Response bodies larger than this are passed through without logging.
const BODY_BUFFER_LIMIT: usize = 64 * 1024;

/// How much of the response body lands in the log line.
const BODY_LOG_PREFIX: usize = 500;

pub async fn request_id_middleware(mut req: Request, next: Next) -> Response {
    let request_id = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    if let Ok(header_value) = HeaderValue::from_str(&request_id) {
        req.headers_mut().insert(REQUEST_ID_HEADER, header_value);
    }

    let mut response = next.run(req).await;

    if let Ok(header_value) = HeaderValue::from_str(&request_id) {
        response
            .headers_mut()
            .insert(REQUEST_ID_HEADER, header_value);
    }

    response
}

/// Logs every request line and a prefix of every response body. Bodies
/// here are small JSON envelopes, so buffering them whole is fine.
pub async fn response_log_middleware(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let uri = req.uri().clone();
    tracing::info!("REQ {} {}", method, uri);

    let response = next.run(req).await;
    let status = response.status();
    let (mut parts, body) = response.into_parts();

    match axum::body::to_bytes(body, BODY_BUFFER_LIMIT).await {
        Ok(bytes) => {
            let preview_len = bytes.len().min(BODY_LOG_PREFIX);
            let preview = String::from_utf8_lossy(&bytes[..preview_len]);
            tracing::info!("RESP {} {} {} {}", method, uri, status.as_u16(), preview);
            Response::from_parts(parts, Body::from(bytes))
        }
        Err(e) => {
            tracing::warn!(
                "RESP {} {} {} body not logged: {}",
                method,
                uri,
                status.as_u16(),
                e
            );
            // The original body is consumed at this point.
            parts.headers.remove(header::CONTENT_LENGTH);
            Response::from_parts(parts, Body::empty())
        }
    }
}
