// Declaration-time errors

use thiserror::Error;

/// Failure raised while building a route tree.
///
/// Every variant aborts the whole declaration pass; nothing is rolled back.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouterError {
    #[error("Cannot redeclare route {method} '{path}'")]
    DuplicateRoute { method: String, path: String },

    #[error("Controller not found: {key}")]
    ControllerLoad { key: String },

    #[error("Controller {controller} is malformed: {reason}")]
    ControllerShape { controller: String, reason: String },

    #[error("Middleware not found: {key}")]
    MiddlewareLoad { key: String },

    #[error("{name} is not a middleware: {reason}")]
    MiddlewareShape { name: String, reason: String },

    #[error("Error handler cannot be assigned on empty route")]
    EmptyRouteErrorHandler,

    #[error("Error handler not found: {0}")]
    ErrorHandlerNotFound(String),

    #[error("Route scope '{prefix}' already has an error handler")]
    Finalized { prefix: String },
}

impl RouterError {
    pub(crate) fn controller_shape(controller: &str, reason: impl Into<String>) -> Self {
        RouterError::ControllerShape {
            controller: controller.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn middleware_shape(name: &str, reason: impl Into<String>) -> Self {
        RouterError::MiddlewareShape {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RouterError>;
