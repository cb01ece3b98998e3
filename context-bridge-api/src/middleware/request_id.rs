use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

pub static X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Reuse the caller's `x-request-id` or mint one, and echo it on the response
pub async fn add_request_id(mut req: Request, next: Next) -> Response {
    let request_id = req
        .headers()
        .get(&X_REQUEST_ID)
        .filter(|v| v.to_str().is_ok())
        .cloned()
        .or_else(|| HeaderValue::from_str(&Uuid::new_v4().to_string()).ok());

    if let Some(id) = &request_id {
        req.headers_mut().insert(X_REQUEST_ID.clone(), id.clone());
    }

    let mut response = next.run(req).await;

    if let Some(id) = request_id {
        response.headers_mut().insert(X_REQUEST_ID.clone(), id);
    }

    response
}
