// Middleware system for request/response processing

use crate::logging::{debug, info, trace, warn};
use crate::{Error, HttpRequest, HttpResponse};
use async_trait::async_trait;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Boxed future produced by handlers and the chain.
pub type BoxFuture = Pin<Box<dyn Future<Output = Result<HttpResponse, Error>> + Send>>;

/// Type alias for the next handler in the middleware chain
pub type Next = Box<dyn FnOnce(HttpRequest) -> BoxFuture + Send>;

/// Type alias for endpoint handler functions
pub type HandlerFn = Arc<dyn Fn(HttpRequest) -> BoxFuture + Send + Sync>;

/// Middleware trait for processing requests before they reach the handler
#[async_trait]
pub trait Middleware: Send + Sync {
    /// Process the request and optionally pass to next middleware
    async fn handle(&self, req: HttpRequest, next: Next) -> Result<HttpResponse, Error>;
}

/// Wrap an async closure as an endpoint handler.
///
/// ```
/// use trellis_core::{handler_fn, HttpResponse};
///
/// let handler = handler_fn(|_req| async { Ok(HttpResponse::text("hello")) });
/// ```
pub fn handler_fn<F, Fut>(f: F) -> HandlerFn
where
    F: Fn(HttpRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<HttpResponse, Error>> + Send + 'static,
{
    Arc::new(move |req| Box::pin(f(req)))
}

/// Middleware backed by an async closure taking the request and `next`.
pub struct FnMiddleware<F> {
    f: F,
}

#[async_trait]
impl<F, Fut> Middleware for FnMiddleware<F>
where
    F: Fn(HttpRequest, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<HttpResponse, Error>> + Send + 'static,
{
    async fn handle(&self, req: HttpRequest, next: Next) -> Result<HttpResponse, Error> {
        (self.f)(req, next).await
    }
}

/// Wrap an async closure as a shareable middleware.
pub fn middleware_fn<F, Fut>(f: F) -> Arc<dyn Middleware>
where
    F: Fn(HttpRequest, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<HttpResponse, Error>> + Send + 'static,
{
    Arc::new(FnMiddleware { f })
}

/// Ordered middleware stack terminated by an endpoint handler
#[derive(Clone, Default)]
pub struct MiddlewareChain {
    middlewares: Arc<Vec<Arc<dyn Middleware>>>,
}

impl MiddlewareChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_vec(middlewares: Vec<Arc<dyn Middleware>>) -> Self {
        Self {
            middlewares: Arc::new(middlewares),
        }
    }

    /// Append a middleware to the end of the chain
    pub fn use_middleware<M: Middleware + 'static>(&mut self, middleware: M) {
        self.push(Arc::new(middleware));
    }

    pub fn push(&mut self, middleware: Arc<dyn Middleware>) {
        let mut mws = (*self.middlewares).clone();
        mws.push(middleware);
        self.middlewares = Arc::new(mws);
    }

    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }

    /// Run the chain, calling `handler` once every middleware has passed the
    /// request on.
    pub async fn apply(&self, req: HttpRequest, handler: HandlerFn) -> Result<HttpResponse, Error> {
        debug!(
            middleware_count = self.middlewares.len(),
            path = %req.path,
            method = %req.method,
            "Executing middleware chain"
        );
        self.execute_from(0, req, handler).await
    }

    fn execute_from(&self, index: usize, req: HttpRequest, handler: HandlerFn) -> BoxFuture {
        if index >= self.middlewares.len() {
            trace!("Middleware chain complete, calling handler");
            handler(req)
        } else {
            let middleware = self.middlewares[index].clone();
            let chain = self.clone();

            trace!(middleware_index = index, "Executing middleware");
            Box::pin(async move {
                middleware
                    .handle(
                        req,
                        Box::new(move |req| chain.execute_from(index + 1, req, handler)),
                    )
                    .await
            })
        }
    }
}

// ========== Built-in Middleware ==========

/// Propagates or generates an `x-request-id` header
pub struct RequestIdMiddleware;

#[async_trait]
impl Middleware for RequestIdMiddleware {
    async fn handle(&self, mut req: HttpRequest, next: Next) -> Result<HttpResponse, Error> {
        let request_id = req
            .header("x-request-id")
            .cloned()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        req.headers
            .insert("x-request-id".to_string(), request_id.clone());

        let mut response = next(req).await?;
        response
            .headers
            .insert("x-request-id".to_string(), request_id);

        Ok(response)
    }
}

/// Logs method, path, status and latency of each request
#[derive(Default)]
pub struct LoggingMiddleware;

impl LoggingMiddleware {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Middleware for LoggingMiddleware {
    async fn handle(&self, req: HttpRequest, next: Next) -> Result<HttpResponse, Error> {
        let start = tokio::time::Instant::now();
        let method = req.method.clone();
        let path = req.path.clone();

        let result = next(req).await;
        let duration = start.elapsed();

        match &result {
            Ok(response) => info!(
                method = %method,
                path = %path,
                status = response.status,
                duration_ms = duration.as_millis() as u64,
                "HTTP response sent"
            ),
            Err(err) => warn!(
                method = %method,
                path = %path,
                duration_ms = duration.as_millis() as u64,
                error = %err,
                "HTTP request failed"
            ),
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    fn ok_handler() -> HandlerFn {
        handler_fn(|_req| async { Ok(HttpResponse::ok()) })
    }

    fn recorder(label: &'static str, log: Arc<Mutex<Vec<&'static str>>>) -> Arc<dyn Middleware> {
        middleware_fn(move |req, next| {
            log.lock().push(label);
            next(req)
        })
    }

    #[tokio::test]
    async fn test_chain_runs_in_insertion_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let chain = MiddlewareChain::from_vec(vec![
            recorder("first", log.clone()),
            recorder("second", log.clone()),
        ]);

        let endpoint_log = log.clone();
        let handler = handler_fn(move |_req| {
            endpoint_log.lock().push("handler");
            async { Ok(HttpResponse::ok()) }
        });

        let response = chain
            .apply(HttpRequest::new("GET", "/"), handler)
            .await
            .unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(*log.lock(), vec!["first", "second", "handler"]);
    }

    #[tokio::test]
    async fn test_middleware_can_short_circuit() {
        let chain = MiddlewareChain::from_vec(vec![middleware_fn(|_req, _next| async {
            Err(Error::Unauthorized("missing token".into()))
        })]);

        let result = chain.apply(HttpRequest::new("GET", "/"), ok_handler()).await;
        assert!(matches!(result, Err(Error::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_empty_chain_calls_handler() {
        let chain = MiddlewareChain::new();
        assert!(chain.is_empty());
        let response = chain
            .apply(HttpRequest::new("GET", "/"), ok_handler())
            .await
            .unwrap();
        assert_eq!(response.status, 200);
    }

    #[tokio::test]
    async fn test_request_id_generated() {
        let mut chain = MiddlewareChain::new();
        chain.use_middleware(RequestIdMiddleware);
        assert_eq!(chain.len(), 1);

        let response = chain
            .apply(HttpRequest::new("GET", "/"), ok_handler())
            .await
            .unwrap();
        assert!(response.headers.contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_request_id_preserved() {
        let req = HttpRequest::new("GET", "/").with_header("X-Request-Id", "fixed-id");
        let response = RequestIdMiddleware
            .handle(req, Box::new(|_req| Box::pin(async { Ok(HttpResponse::ok()) })))
            .await
            .unwrap();
        assert_eq!(
            response.headers.get("x-request-id"),
            Some(&"fixed-id".to_string())
        );
    }

    #[tokio::test]
    async fn test_logging_middleware_passes_errors_through() {
        let result = LoggingMiddleware::new()
            .handle(
                HttpRequest::new("GET", "/broken"),
                Box::new(|_req| Box::pin(async { Err(Error::Internal("boom".into())) })),
            )
            .await;
        assert!(matches!(result, Err(Error::Internal(_))));
    }
}
