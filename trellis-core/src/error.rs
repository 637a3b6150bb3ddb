// Request-time error type

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Route not found: {0}")]
    RouteNotFound(String),

    #[error("Method not allowed: {0}")]
    MethodNotAllowed(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // 4xx Client Errors
    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Payload Too Large: {0}")]
    PayloadTooLarge(String),

    #[error("Unprocessable Entity: {0}")]
    UnprocessableEntity(String),

    #[error("Too Many Requests: {0}")]
    TooManyRequests(String),

    // 5xx Server Errors
    #[error("Not Implemented: {0}")]
    NotImplemented(String),

    #[error("Service Unavailable: {0}")]
    ServiceUnavailable(String),
}

impl Error {
    /// HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Error::RouteNotFound(_) | Error::NotFound(_) => 404,
            Error::MethodNotAllowed(_) => 405,
            Error::Validation(_) | Error::Deserialization(_) | Error::BadRequest(_) => 400,
            Error::Unauthorized(_) => 401,
            Error::Forbidden(_) => 403,
            Error::Conflict(_) => 409,
            Error::PayloadTooLarge(_) => 413,
            Error::UnprocessableEntity(_) => 422,
            Error::TooManyRequests(_) => 429,
            Error::NotImplemented(_) => 501,
            Error::ServiceUnavailable(_) => 503,
            Error::Http(_) | Error::Serialization(_) | Error::Internal(_) | Error::Io(_) => 500,
        }
    }

    /// Client-facing message without the variant prefix
    pub fn message(&self) -> String {
        match self {
            Error::Io(e) => e.to_string(),
            Error::Http(m)
            | Error::RouteNotFound(m)
            | Error::MethodNotAllowed(m)
            | Error::Serialization(m)
            | Error::Deserialization(m)
            | Error::Validation(m)
            | Error::Internal(m)
            | Error::BadRequest(m)
            | Error::Unauthorized(m)
            | Error::Forbidden(m)
            | Error::NotFound(m)
            | Error::Conflict(m)
            | Error::PayloadTooLarge(m)
            | Error::UnprocessableEntity(m)
            | Error::TooManyRequests(m)
            | Error::NotImplemented(m)
            | Error::ServiceUnavailable(m) => m.clone(),
        }
    }

    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }

    pub fn is_server_error(&self) -> bool {
        self.status_code() >= 500
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(Error::RouteNotFound("GET /x".into()).status_code(), 404);
        assert_eq!(Error::Unauthorized("no token".into()).status_code(), 401);
        assert_eq!(Error::Validation("bad".into()).status_code(), 400);
        assert_eq!(Error::Internal("boom".into()).status_code(), 500);
    }

    #[test]
    fn test_error_classes() {
        assert!(Error::Forbidden("x".into()).is_client_error());
        assert!(!Error::Forbidden("x".into()).is_server_error());
        assert!(Error::ServiceUnavailable("x".into()).is_server_error());
    }

    #[test]
    fn test_message_strips_prefix() {
        let err = Error::NotFound("user 7".into());
        assert_eq!(err.message(), "user 7");
        assert_eq!(err.to_string(), "Not Found: user 7");
    }
}
