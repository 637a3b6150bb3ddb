// Core primitives for the Trellis route builder
// Requests, responses, middleware chains, the dispatch mount that route trees
// are attached to, and the named error-handler registry.

pub mod error;
pub mod error_handler;
pub mod http;
pub mod logging;
pub mod middleware;
pub mod mount;

pub use error::*;
pub use error_handler::*;
pub use http::*;
pub use middleware::*;
pub use mount::{Mount, MountedRoute};
