use axum::http::{HeaderMap, HeaderValue, Request, Response};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tower::{Layer, Service};
use tracing::Instrument;
use uuid::Uuid;

/// HTTP header name for correlation ID
pub const X_CORRELATION_ID: &str = "x-correlation-id";

/// HTTP header name for request ID (accepted as a fallback)
pub const X_REQUEST_ID: &str = "x-request-id";

pub fn generate_correlation_id() -> String {
    Uuid::new_v4().to_string()
}

/// Extract correlation ID from HTTP headers or generate a new one
pub fn extract_or_generate_correlation_id(headers: &HeaderMap) -> String {
    headers
        .get(X_CORRELATION_ID)
        .or_else(|| headers.get(X_REQUEST_ID))
        .and_then(|h| h.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .unwrap_or_else(generate_correlation_id)
}

/// Tower layer that tags every request with a correlation ID, runs the
/// handler inside a span carrying it, and echoes it on the response
#[derive(Clone, Default)]
pub struct CorrelationIdLayer;

impl CorrelationIdLayer {
    pub fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for CorrelationIdLayer {
    type Service = CorrelationIdService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        CorrelationIdService { inner }
    }
}

#[derive(Clone)]
pub struct CorrelationIdService<S> {
    inner: S,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for CorrelationIdService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<ReqBody>) -> Self::Future {
        let correlation_id = extract_or_generate_correlation_id(req.headers());
        req.extensions_mut()
            .insert(CorrelationId(correlation_id.clone()));

        let span = tracing::info_span!(
            "http_request",
            correlation_id = %correlation_id,
            method = %req.method(),
            path = %req.uri().path(),
        );
        let future = self.inner.call(req);

        Box::pin(
            async move {
                let mut response = future.await?;
                if let Ok(value) = HeaderValue::from_str(&correlation_id) {
                    response.headers_mut().insert(X_CORRELATION_ID, value);
                }
                Ok(response)
            }
            .instrument(span),
        )
    }
}

/// Correlation ID stored in request extensions
#[derive(Clone, Debug)]
pub struct CorrelationId(pub String);

impl CorrelationId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_prefers_correlation_header() {
        let mut headers = HeaderMap::new();
        headers.insert(X_CORRELATION_ID, HeaderValue::from_static("correlation-123"));
        headers.insert(X_REQUEST_ID, HeaderValue::from_static("request-456"));

        assert_eq!(extract_or_generate_correlation_id(&headers), "correlation-123");
    }

    #[test]
    fn test_extract_falls_back_to_request_id() {
        let mut headers = HeaderMap::new();
        headers.insert(X_REQUEST_ID, HeaderValue::from_static("request-456"));

        assert_eq!(extract_or_generate_correlation_id(&headers), "request-456");
    }

    #[test]
    fn test_extract_generates_if_missing_or_empty() {
        let id = extract_or_generate_correlation_id(&HeaderMap::new());
        assert!(Uuid::parse_str(&id).is_ok());

        let mut headers = HeaderMap::new();
        headers.insert(X_CORRELATION_ID, HeaderValue::from_static(""));
        let id = extract_or_generate_correlation_id(&headers);
        assert!(Uuid::parse_str(&id).is_ok());
    }
}
