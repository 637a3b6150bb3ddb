//! Error handlers
//!
//! An [`ErrorHandler`] turns an error raised by a route chain into a response.
//! Handlers are attached to mounts, and may be registered by name in an
//! [`ErrorHandlerRegistry`] so route trees can refer to them with a string.
//!
//! ```
//! use std::sync::Arc;
//! use trellis_core::{error_handler_fn, ErrorHandlerRegistry, HttpResponse};
//!
//! let mut registry = ErrorHandlerRegistry::with_defaults();
//! registry.register(
//!     "teapot",
//!     error_handler_fn(|_err, _ctx| Some(HttpResponse::new(418))),
//! );
//!
//! assert!(registry.contains("json"));
//! assert!(registry.get("teapot").is_some());
//! ```

use crate::logging::debug;
use crate::{Error, HttpRequest, HttpResponse};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Request details available to an error handler.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorContext {
    pub method: String,
    pub path: String,
    pub request_id: Option<String>,
}

impl ErrorContext {
    pub fn from_request(request: &HttpRequest) -> Self {
        Self {
            method: request.method.clone(),
            path: request.path.clone(),
            request_id: request.header("x-request-id").cloned(),
        }
    }
}

/// Converts errors into responses.
///
/// Return `None` to let the next handler outward try.
#[async_trait]
pub trait ErrorHandler: Send + Sync + 'static {
    async fn catch(&self, error: &Error, ctx: &ErrorContext) -> Option<HttpResponse>;

    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Renders `{"error": {"code", "message", "errors": []}}` with the error's status.
///
/// Messages of 5xx errors are replaced by a generic one unless
/// [`expose_internal`](Self::expose_internal) is enabled.
#[derive(Debug, Clone, Default)]
pub struct JsonErrorHandler {
    expose_internal: bool,
}

impl JsonErrorHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expose_internal(mut self, expose: bool) -> Self {
        self.expose_internal = expose;
        self
    }

    fn message_for(&self, error: &Error) -> String {
        if error.is_server_error() && !self.expose_internal {
            "Internal Server Error".to_string()
        } else {
            error.message()
        }
    }
}

#[async_trait]
impl ErrorHandler for JsonErrorHandler {
    async fn catch(&self, error: &Error, ctx: &ErrorContext) -> Option<HttpResponse> {
        let status = error.status_code();
        debug!(
            status = status,
            method = %ctx.method,
            path = %ctx.path,
            "Rendering JSON error response"
        );

        let body = serde_json::json!({
            "error": {
                "code": status,
                "message": self.message_for(error),
                "errors": [],
            }
        });

        HttpResponse::new(status).with_json(&body).ok()
    }

    fn name(&self) -> &str {
        "json"
    }
}

/// Renders the error message as plain text with the error's status.
#[derive(Debug, Clone, Default)]
pub struct PlainErrorHandler;

#[async_trait]
impl ErrorHandler for PlainErrorHandler {
    async fn catch(&self, error: &Error, _ctx: &ErrorContext) -> Option<HttpResponse> {
        Some(HttpResponse::text(error.message()).with_status(error.status_code()))
    }

    fn name(&self) -> &str {
        "plain"
    }
}

/// Error handler backed by a closure.
pub struct FnErrorHandler<F> {
    f: F,
}

#[async_trait]
impl<F> ErrorHandler for FnErrorHandler<F>
where
    F: Fn(&Error, &ErrorContext) -> Option<HttpResponse> + Send + Sync + 'static,
{
    async fn catch(&self, error: &Error, ctx: &ErrorContext) -> Option<HttpResponse> {
        (self.f)(error, ctx)
    }
}

pub fn error_handler_fn<F>(f: F) -> Arc<dyn ErrorHandler>
where
    F: Fn(&Error, &ErrorContext) -> Option<HttpResponse> + Send + Sync + 'static,
{
    Arc::new(FnErrorHandler { f })
}

/// Named error handlers.
#[derive(Clone, Default)]
pub struct ErrorHandlerRegistry {
    handlers: BTreeMap<String, Arc<dyn ErrorHandler>>,
}

impl ErrorHandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the `json` and `plain` handlers
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("json", Arc::new(JsonErrorHandler::new()));
        registry.register("plain", Arc::new(PlainErrorHandler));
        registry
    }

    /// Register `handler` under `name`, replacing any previous entry.
    pub fn register(&mut self, name: impl Into<String>, handler: Arc<dyn ErrorHandler>) {
        self.handlers.insert(name.into(), handler);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ErrorHandler>> {
        self.handlers.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.handlers.keys().map(String::as_str).collect()
    }
}
