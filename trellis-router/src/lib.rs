//! Fluent route-tree construction for Trellis
//!
//! Routes are declared through a [`RouterNode`] handed to nested builder
//! closures. Each group gets its own [`Mount`](trellis_core::Mount), so group
//! middleware and error handlers apply only to the routes inside it, while a
//! single [`RouteRegistry`] rejects any `(verb, path)` declared twice anywhere
//! in the tree.
//!
//! ```
//! use std::sync::Arc;
//! use trellis_core::{HandlerFn, HttpMethod, HttpResponse, Mount, handler_fn};
//! use trellis_router::{
//!     Action, ComponentRegistry, Controller, ControllerDescriptor, Resource, RouteRegistry,
//!     RouterNode,
//! };
//!
//! struct UserController;
//!
//! impl Controller for UserController {
//!     fn descriptor(&self) -> ControllerDescriptor {
//!         ControllerDescriptor::new().implements([Action::Index, Action::Store])
//!     }
//!
//!     fn action(&self, name: &str) -> Option<HandlerFn> {
//!         match name {
//!             "index" | "store" => Some(handler_fn(|_req| async { Ok(HttpResponse::ok()) })),
//!             _ => None,
//!         }
//!     }
//! }
//!
//! # fn main() -> trellis_router::Result<()> {
//! let mut components = ComponentRegistry::new();
//! components.register_controller("", "UserController", || UserController);
//!
//! let mut registry = RouteRegistry::new(false);
//! let mut root = RouterNode::new(&mut registry, Mount::new()).with_components(components);
//!
//! root.group("/users", |users| {
//!     users.resource("/", "UserController")?;
//!     Ok(())
//! })?;
//!
//! assert!(registry.contains(HttpMethod::GET, "/users"));
//! assert!(registry.contains(HttpMethod::POST, "/users"));
//! # Ok(())
//! # }
//! ```

pub mod components;
pub mod config;
pub mod controller;
pub mod error;
pub mod middleware_resolver;
pub mod node;
pub mod options;
pub mod resource;
pub mod route_registry;

pub use components::{Component, ComponentFactory, ComponentRegistry, controller_key, middleware_key};
pub use config::{RouteConfig, RouteDescriptor, RouteSpec, join_path, normalize};
pub use controller::{Action, Controller, ControllerBinding, ControllerDescriptor, ControllerLoader};
pub use error::{Result, RouterError};
pub use middleware_resolver::{MiddlewareResolver, MiddlewareSpec};
pub use node::{Endpoint, ErrorHandlerSpec, Group, Resource, RouterNode};
pub use options::RouterOptions;
pub use resource::{RESOURCE_RULES, ResourceMapper, ResourceRule};
pub use route_registry::{RouteKey, RouteRegistry, RouteSink};
