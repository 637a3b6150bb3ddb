//! The fluent route-tree builder
//!
//! A [`RouterNode`] owns a namespace, an accumulated URL prefix and the
//! [`Mount`] its routes are attached to. Groups and nested resources create
//! child nodes that borrow the same [`RouteRegistry`], run the caller's
//! builder to completion, and hand back a [`Group`] so an error handler can
//! still be attached to the child afterwards.
//!
//! ```
//! use trellis_core::{handler_fn, HttpResponse, Mount};
//! use trellis_router::{RouteRegistry, RouterNode};
//!
//! # fn main() -> Result<(), trellis_router::RouterError> {
//! let mut registry = RouteRegistry::new(false);
//! let mount = Mount::new();
//! let mut root = RouterNode::new(&mut registry, mount.clone());
//!
//! root.group("/api", |api| {
//!     api.get("/health", handler_fn(|_req| async { Ok(HttpResponse::text("ok")) }))?;
//!     Ok(())
//! })?
//! .error("json")?;
//!
//! assert!(registry.contains(trellis_core::HttpMethod::GET, "/api/health"));
//! # Ok(())
//! # }
//! ```

use crate::components::ComponentRegistry;
use crate::config::{RouteConfig, RouteSpec, join_path, normalize};
use crate::controller::ControllerLoader;
use crate::middleware_resolver::{MiddlewareResolver, MiddlewareSpec};
use crate::options::RouterOptions;
use crate::resource::ResourceMapper;
use crate::route_registry::RouteRegistry;
use crate::{Result, RouterError};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use trellis_core::{ErrorHandler, ErrorHandlerRegistry, HandlerFn, HttpMethod, Middleware, Mount};

/// Final handler of a single route
#[derive(Clone)]
pub enum Endpoint {
    /// Inline handler; no controller lookup happens
    Handler(HandlerFn),
    /// `Name.method` resolved through the component registry
    Action(String),
}

impl From<HandlerFn> for Endpoint {
    fn from(handler: HandlerFn) -> Self {
        Endpoint::Handler(handler)
    }
}

impl From<&str> for Endpoint {
    fn from(action: &str) -> Self {
        Endpoint::Action(action.to_string())
    }
}

impl From<String> for Endpoint {
    fn from(action: String) -> Self {
        Endpoint::Action(action)
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Handler(_) => f.write_str("Endpoint::Handler(..)"),
            Endpoint::Action(name) => write!(f, "Endpoint::Action({:?})", name),
        }
    }
}

/// Error handler given inline or by registry name
#[derive(Clone)]
pub enum ErrorHandlerSpec {
    Handler(Arc<dyn ErrorHandler>),
    Named(String),
}

impl From<Arc<dyn ErrorHandler>> for ErrorHandlerSpec {
    fn from(handler: Arc<dyn ErrorHandler>) -> Self {
        ErrorHandlerSpec::Handler(handler)
    }
}

impl From<&str> for ErrorHandlerSpec {
    fn from(name: &str) -> Self {
        ErrorHandlerSpec::Named(name.to_string())
    }
}

impl From<String> for ErrorHandlerSpec {
    fn from(name: String) -> Self {
        ErrorHandlerSpec::Named(name)
    }
}

type NestedBuilder<'r> = Box<dyn FnOnce(&mut RouterNode<'_>) -> Result<()> + 'r>;

/// A resource declaration: controller, call-site middleware and an optional
/// builder for routes nested under the resource prefix.
pub struct Resource<'r> {
    controller: String,
    middleware: Vec<MiddlewareSpec>,
    nested: Option<NestedBuilder<'r>>,
}

impl<'r> Resource<'r> {
    pub fn new(controller: impl Into<String>) -> Self {
        Self {
            controller: controller.into(),
            middleware: Vec::new(),
            nested: None,
        }
    }

    /// Middleware that runs first on every generated route
    pub fn middleware<I>(mut self, specs: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<MiddlewareSpec>,
    {
        self.middleware.extend(specs.into_iter().map(Into::into));
        self
    }

    /// Declare further routes in a group at the resource prefix
    pub fn nested<F>(mut self, builder: F) -> Self
    where
        F: FnOnce(&mut RouterNode<'_>) -> Result<()> + 'r,
    {
        self.nested = Some(Box::new(builder));
        self
    }
}

impl<'r> From<&str> for Resource<'r> {
    fn from(controller: &str) -> Self {
        Resource::new(controller)
    }
}

impl<'r> From<String> for Resource<'r> {
    fn from(controller: String) -> Self {
        Resource::new(controller)
    }
}

#[derive(Clone)]
struct Shared {
    components: ComponentRegistry,
    error_handlers: ErrorHandlerRegistry,
    mapper: ResourceMapper,
}

impl Shared {
    fn resolve_error_handler(&self, spec: ErrorHandlerSpec) -> Result<Arc<dyn ErrorHandler>> {
        match spec {
            ErrorHandlerSpec::Handler(handler) => Ok(handler),
            ErrorHandlerSpec::Named(name) => self
                .error_handlers
                .get(&name)
                .ok_or(RouterError::ErrorHandlerNotFound(name)),
        }
    }
}

/// Error-attachment state of one scope
struct Scope {
    prefix: String,
    mount: Mount,
    has_route: bool,
    finalized: bool,
    last_group: Option<Group>,
}

impl Scope {
    fn new(prefix: String, mount: Mount) -> Self {
        Self {
            prefix,
            mount,
            has_route: false,
            finalized: false,
            last_group: None,
        }
    }

    fn ensure_active(&self) -> Result<()> {
        if self.finalized {
            return Err(RouterError::Finalized {
                prefix: join_path(&self.prefix, ""),
            });
        }
        Ok(())
    }

    fn attach_error(&mut self, handler: Arc<dyn ErrorHandler>) -> Result<()> {
        self.ensure_active()?;

        if !self.has_route {
            return match self.last_group.take() {
                Some(group) => group.attach(handler),
                None => Err(RouterError::EmptyRouteErrorHandler),
            };
        }

        tracing::debug!(prefix = %join_path(&self.prefix, ""), "Error handler attached");
        self.mount.use_error_handler(handler);
        self.last_group = None;
        self.finalized = true;
        Ok(())
    }
}

/// Handle to a group after its builder has run
#[derive(Clone)]
pub struct Group {
    scope: Arc<Mutex<Scope>>,
    shared: Arc<Shared>,
}

impl Group {
    /// Attach an error handler to this group's mount.
    ///
    /// A group that declared no routes of its own passes the handler on to the
    /// last group opened inside it.
    pub fn error(&self, handler: impl Into<ErrorHandlerSpec>) -> Result<()> {
        let handler = self.shared.resolve_error_handler(handler.into())?;
        self.attach(handler)
    }

    fn attach(&self, handler: Arc<dyn ErrorHandler>) -> Result<()> {
        self.scope.lock().attach_error(handler)
    }

    pub fn prefix(&self) -> String {
        join_path(&self.scope.lock().prefix, "")
    }

    pub fn mount(&self) -> Mount {
        self.scope.lock().mount.clone()
    }

    pub fn has_route(&self) -> bool {
        self.scope.lock().has_route
    }

    pub fn is_finalized(&self) -> bool {
        self.scope.lock().finalized
    }
}

impl fmt::Debug for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scope = self.scope.lock();
        f.debug_struct("Group")
            .field("prefix", &scope.prefix)
            .field("has_route", &scope.has_route)
            .field("finalized", &scope.finalized)
            .finish()
    }
}

impl fmt::Debug for RouterNode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouterNode")
            .field("namespace", &self.namespace)
            .field("prefix", &self.scope.prefix)
            .field("has_route", &self.scope.has_route)
            .field("finalized", &self.scope.finalized)
            .finish()
    }
}

/// Scoped route builder.
pub struct RouterNode<'a> {
    namespace: String,
    scope: Scope,
    registry: &'a mut RouteRegistry,
    shared: Arc<Shared>,
}

impl<'a> RouterNode<'a> {
    /// Root node with no components, the default `json`/`plain` error
    /// handlers and `id` as the resource parameter.
    pub fn new(registry: &'a mut RouteRegistry, mount: Mount) -> Self {
        Self {
            namespace: String::new(),
            scope: Scope::new(String::new(), mount),
            registry,
            shared: Arc::new(Shared {
                components: ComponentRegistry::new(),
                error_handlers: ErrorHandlerRegistry::with_defaults(),
                mapper: ResourceMapper::default(),
            }),
        }
    }

    pub fn with_components(mut self, components: ComponentRegistry) -> Self {
        self.update_shared(|shared| shared.components = components);
        self
    }

    pub fn with_error_handlers(mut self, error_handlers: ErrorHandlerRegistry) -> Self {
        self.update_shared(|shared| shared.error_handlers = error_handlers);
        self
    }

    pub fn with_options(mut self, options: &RouterOptions) -> Self {
        let mapper = ResourceMapper::new(options.resource_param.clone());
        self.update_shared(|shared| shared.mapper = mapper);
        self
    }

    fn update_shared(&mut self, f: impl FnOnce(&mut Shared)) {
        f(Arc::make_mut(&mut self.shared));
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Accumulated URL prefix, `/` at the root
    pub fn prefix(&self) -> String {
        join_path(&self.scope.prefix, "")
    }

    pub fn mount(&self) -> &Mount {
        &self.scope.mount
    }

    pub fn registry(&self) -> &RouteRegistry {
        &*self.registry
    }

    pub fn has_route(&self) -> bool {
        self.scope.has_route
    }

    pub fn is_finalized(&self) -> bool {
        self.scope.finalized
    }

    pub fn get(&mut self, config: impl Into<RouteSpec>, endpoint: impl Into<Endpoint>) -> Result<&mut Self> {
        self.route(HttpMethod::GET, config, NO_MIDDLEWARE, endpoint)
    }

    pub fn post(&mut self, config: impl Into<RouteSpec>, endpoint: impl Into<Endpoint>) -> Result<&mut Self> {
        self.route(HttpMethod::POST, config, NO_MIDDLEWARE, endpoint)
    }

    pub fn put(&mut self, config: impl Into<RouteSpec>, endpoint: impl Into<Endpoint>) -> Result<&mut Self> {
        self.route(HttpMethod::PUT, config, NO_MIDDLEWARE, endpoint)
    }

    pub fn patch(&mut self, config: impl Into<RouteSpec>, endpoint: impl Into<Endpoint>) -> Result<&mut Self> {
        self.route(HttpMethod::PATCH, config, NO_MIDDLEWARE, endpoint)
    }

    pub fn delete(&mut self, config: impl Into<RouteSpec>, endpoint: impl Into<Endpoint>) -> Result<&mut Self> {
        self.route(HttpMethod::DELETE, config, NO_MIDDLEWARE, endpoint)
    }

    /// Route answering every HTTP method
    pub fn all(&mut self, config: impl Into<RouteSpec>, endpoint: impl Into<Endpoint>) -> Result<&mut Self> {
        self.route(HttpMethod::ALL, config, NO_MIDDLEWARE, endpoint)
    }

    pub fn get_with<M>(&mut self, config: impl Into<RouteSpec>, middleware: M, endpoint: impl Into<Endpoint>) -> Result<&mut Self>
    where
        M: IntoIterator,
        M::Item: Into<MiddlewareSpec>,
    {
        self.route(HttpMethod::GET, config, middleware, endpoint)
    }

    pub fn post_with<M>(&mut self, config: impl Into<RouteSpec>, middleware: M, endpoint: impl Into<Endpoint>) -> Result<&mut Self>
    where
        M: IntoIterator,
        M::Item: Into<MiddlewareSpec>,
    {
        self.route(HttpMethod::POST, config, middleware, endpoint)
    }

    pub fn put_with<M>(&mut self, config: impl Into<RouteSpec>, middleware: M, endpoint: impl Into<Endpoint>) -> Result<&mut Self>
    where
        M: IntoIterator,
        M::Item: Into<MiddlewareSpec>,
    {
        self.route(HttpMethod::PUT, config, middleware, endpoint)
    }

    pub fn patch_with<M>(&mut self, config: impl Into<RouteSpec>, middleware: M, endpoint: impl Into<Endpoint>) -> Result<&mut Self>
    where
        M: IntoIterator,
        M::Item: Into<MiddlewareSpec>,
    {
        self.route(HttpMethod::PATCH, config, middleware, endpoint)
    }

    pub fn delete_with<M>(&mut self, config: impl Into<RouteSpec>, middleware: M, endpoint: impl Into<Endpoint>) -> Result<&mut Self>
    where
        M: IntoIterator,
        M::Item: Into<MiddlewareSpec>,
    {
        self.route(HttpMethod::DELETE, config, middleware, endpoint)
    }

    pub fn all_with<M>(&mut self, config: impl Into<RouteSpec>, middleware: M, endpoint: impl Into<Endpoint>) -> Result<&mut Self>
    where
        M: IntoIterator,
        M::Item: Into<MiddlewareSpec>,
    {
        self.route(HttpMethod::ALL, config, middleware, endpoint)
    }

    /// Declare one route.
    ///
    /// The chain is the given middleware, then (for `Name.method` endpoints)
    /// the controller's middleware for that method and its global middleware,
    /// then the endpoint.
    pub fn route<M>(
        &mut self,
        method: HttpMethod,
        config: impl Into<RouteSpec>,
        middleware: M,
        endpoint: impl Into<Endpoint>,
    ) -> Result<&mut Self>
    where
        M: IntoIterator,
        M::Item: Into<MiddlewareSpec>,
    {
        self.scope.ensure_active()?;
        let config = normalize(&self.namespace, &config.into());
        let full = join_path(&self.scope.prefix, &config.prefix);
        self.registry.register(method, &full)?;
        self.scope.has_route = true;

        let mut chain = MiddlewareResolver::new(&self.shared.components).resolve(middleware)?;
        let handler = match endpoint.into() {
            Endpoint::Handler(handler) => handler,
            Endpoint::Action(specifier) => {
                let (binding, action) = ControllerLoader::new(&self.shared.components)
                    .resolve_action(&config.namespace, &specifier)?;
                chain.extend(binding.middleware_for(&action).iter().cloned());
                chain.extend(binding.global_middleware.iter().cloned());
                binding.handler(&action)?
            }
        };

        self.scope.mount.route(method, &config.prefix, chain, handler);
        Ok(self)
    }

    /// Open a nested group and declare its routes with `builder`.
    pub fn group<F>(&mut self, config: impl Into<RouteSpec>, builder: F) -> Result<Group>
    where
        F: FnOnce(&mut RouterNode<'_>) -> Result<()>,
    {
        self.group_with(config, NO_MIDDLEWARE, builder)
    }

    /// Like [`group`](Self::group), with middleware that wraps every route in
    /// the group ahead of route-level handlers.
    pub fn group_with<M, F>(&mut self, config: impl Into<RouteSpec>, middleware: M, builder: F) -> Result<Group>
    where
        M: IntoIterator,
        M::Item: Into<MiddlewareSpec>,
        F: FnOnce(&mut RouterNode<'_>) -> Result<()>,
    {
        self.scope.ensure_active()?;
        let config = normalize(&self.namespace, &config.into());
        let handlers = MiddlewareResolver::new(&self.shared.components).resolve(middleware)?;
        self.open_group(config, handlers, builder)
    }

    fn open_group<F>(&mut self, config: RouteConfig, handlers: Vec<Arc<dyn Middleware>>, builder: F) -> Result<Group>
    where
        F: FnOnce(&mut RouterNode<'_>) -> Result<()>,
    {
        let mount = Mount::new();
        self.scope.mount.mount(&config.prefix, &mount);
        for handler in handlers {
            mount.use_middleware(handler);
        }

        let prefix = join_path(&self.scope.prefix, &config.prefix);
        tracing::debug!(prefix = %prefix, namespace = %config.namespace, "Opening route group");

        let mut child = RouterNode {
            namespace: config.namespace,
            scope: Scope::new(prefix, mount),
            registry: &mut *self.registry,
            shared: self.shared.clone(),
        };
        builder(&mut child)?;

        let group = Group {
            scope: Arc::new(Mutex::new(child.scope)),
            shared: self.shared.clone(),
        };
        self.scope.last_group = Some(group.clone());
        Ok(group)
    }

    /// Expand a controller into its resource routes.
    ///
    /// ```no_run
    /// use trellis_router::{Resource, RouteDescriptor};
    /// # use trellis_router::{RouteRegistry, RouterNode};
    /// # fn main() -> trellis_router::Result<()> {
    /// # let mut registry = RouteRegistry::new(false);
    /// # let mut root = RouterNode::new(&mut registry, trellis_core::Mount::new());
    /// root.resource(
    ///     RouteDescriptor::at("/posts").param("slug"),
    ///     Resource::new("PostController")
    ///         .middleware(["Auth"])
    ///         .nested(|posts| {
    ///             posts.resource("/:slug/comments", "CommentController")?;
    ///             Ok(())
    ///         }),
    /// )?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn resource<'r>(&mut self, config: impl Into<RouteSpec>, resource: impl Into<Resource<'r>>) -> Result<&mut Self> {
        self.scope.ensure_active()?;
        let Resource {
            controller,
            middleware,
            nested,
        } = resource.into();
        let config = normalize(&self.namespace, &config.into());

        let call_site = MiddlewareResolver::new(&self.shared.components).resolve(&middleware)?;
        let binding = ControllerLoader::new(&self.shared.components).resolve(&config.namespace, &controller)?;

        let declared = self.shared.mapper.expand(
            &mut *self.registry,
            &self.scope.mount,
            &self.scope.prefix,
            &config,
            &binding,
            &call_site,
        )?;
        if !declared.is_empty() {
            self.scope.has_route = true;
        }

        if let Some(nested) = nested {
            let group_config = RouteConfig {
                namespace: self.namespace.clone(),
                prefix: config.prefix.clone(),
                options: Default::default(),
                param: None,
            };
            self.open_group(group_config, call_site, nested)?;
        }

        Ok(self)
    }

    /// Attach an error handler.
    ///
    /// On a node with routes the handler goes on this node's mount and the
    /// node is finalized. On a node without routes it goes to the most recent
    /// group instead, and fails with
    /// [`RouterError::EmptyRouteErrorHandler`] when there is none.
    pub fn error(&mut self, handler: impl Into<ErrorHandlerSpec>) -> Result<()> {
        let handler = self.shared.resolve_error_handler(handler.into())?;
        self.scope.attach_error(handler)
    }
}

const NO_MIDDLEWARE: [MiddlewareSpec; 0] = [];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RouteDescriptor;
    use trellis_core::{HttpResponse, error_handler_fn, handler_fn};

    fn ok() -> HandlerFn {
        handler_fn(|_req| async { Ok(HttpResponse::ok()) })
    }

    #[test]
    fn test_root_state() {
        let mut registry = RouteRegistry::new(false);
        let root = RouterNode::new(&mut registry, Mount::new());
        assert_eq!(root.namespace(), "");
        assert_eq!(root.prefix(), "/");
        assert!(!root.has_route());
        assert!(!root.is_finalized());
    }

    #[test]
    fn test_single_routes_register_full_paths() {
        let mut registry = RouteRegistry::new(false);
        let mount = Mount::new();
        {
            let mut root = RouterNode::new(&mut registry, mount.clone());
            root.get("/a", ok())
                .unwrap()
                .post("/a", ok())
                .unwrap()
                .all("/any", ok())
                .unwrap();
            assert!(root.has_route());
        }

        assert!(registry.contains(HttpMethod::GET, "/a"));
        assert!(registry.contains(HttpMethod::POST, "/a"));
        assert!(registry.contains(HttpMethod::ALL, "/any"));
        assert_eq!(mount.route_count(), 3);
    }

    #[test]
    fn test_group_prefix_and_namespace() {
        let mut registry = RouteRegistry::new(false);
        let mut root = RouterNode::new(&mut registry, Mount::new());

        let group = root
            .group(RouteDescriptor::at("/admin").namespace("admin"), |admin| {
                assert_eq!(admin.namespace(), "/admin");
                assert_eq!(admin.prefix(), "/admin");
                admin.get("/stats", ok())?;
                Ok(())
            })
            .unwrap();

        assert_eq!(group.prefix(), "/admin");
        assert!(group.has_route());
        assert_eq!(root.mount().child_count(), 1);
        assert!(root.registry().contains(HttpMethod::GET, "/admin/stats"));
    }

    #[test]
    fn test_builder_error_propagates() {
        let mut registry = RouteRegistry::new(false);
        let mut root = RouterNode::new(&mut registry, Mount::new());

        let result = root.group("/x", |x| {
            x.get("/", ok())?;
            x.get("/", ok())?;
            Ok(())
        });
        assert!(matches!(result, Err(RouterError::DuplicateRoute { .. })));
    }

    #[test]
    fn test_error_on_empty_node() {
        let mut registry = RouteRegistry::new(false);
        let mut root = RouterNode::new(&mut registry, Mount::new());
        assert_eq!(root.error("json"), Err(RouterError::EmptyRouteErrorHandler));
    }

    #[test]
    fn test_unknown_error_handler_name() {
        let mut registry = RouteRegistry::new(false);
        let mut root = RouterNode::new(&mut registry, Mount::new());
        root.get("/", ok()).unwrap();
        assert_eq!(
            root.error("xml"),
            Err(RouterError::ErrorHandlerNotFound("xml".into()))
        );
        assert!(!root.is_finalized());
    }

    #[test]
    fn test_error_finalizes_node() {
        let mut registry = RouteRegistry::new(false);
        let mount = Mount::new();
        let mut root = RouterNode::new(&mut registry, mount.clone());
        root.get("/", ok()).unwrap();
        root.error(error_handler_fn(|_e, _c| None)).unwrap();

        assert!(root.is_finalized());
        assert_eq!(mount.error_handler_count(), 1);
        assert!(matches!(root.error("json"), Err(RouterError::Finalized { .. })));
        assert!(matches!(root.get("/late", ok()), Err(RouterError::Finalized { .. })));
    }

    #[test]
    fn test_error_after_group_targets_child_mount() {
        let mut registry = RouteRegistry::new(false);
        let mount = Mount::new();
        let mut root = RouterNode::new(&mut registry, mount.clone());

        let group = root
            .group("/users", |users| {
                users.get("/", ok())?;
                Ok(())
            })
            .unwrap();
        root.error("json").unwrap();

        assert_eq!(mount.error_handler_count(), 0);
        assert_eq!(group.mount().error_handler_count(), 1);
        assert!(group.is_finalized());
        assert!(!root.is_finalized());

        // The pending group was consumed.
        assert_eq!(root.error("json"), Err(RouterError::EmptyRouteErrorHandler));
    }

    #[test]
    fn test_group_handle_error() {
        let mut registry = RouteRegistry::new(false);
        let mut root = RouterNode::new(&mut registry, Mount::new());

        let group = root
            .group("/users", |users| {
                users.get("/", ok())?;
                Ok(())
            })
            .unwrap();
        group.error("plain").unwrap();
        assert!(matches!(group.error("plain"), Err(RouterError::Finalized { .. })));
        assert!(matches!(root.error("plain"), Err(RouterError::Finalized { .. })));
    }

    #[test]
    fn test_error_on_empty_group_delegates_inward() {
        let mut registry = RouteRegistry::new(false);
        let mut root = RouterNode::new(&mut registry, Mount::new());

        let mut inner_mount = None;
        let outer = root
            .group("/v1", |v1| {
                let inner = v1.group("/users", |users| {
                    users.get("/", ok())?;
                    Ok(())
                })?;
                inner_mount = Some(inner.mount());
                Ok(())
            })
            .unwrap();

        outer.error("json").unwrap();
        assert_eq!(outer.mount().error_handler_count(), 0);
        assert_eq!(inner_mount.unwrap().error_handler_count(), 1);
    }

    #[test]
    fn test_named_endpoint_without_controller() {
        let mut registry = RouteRegistry::new(false);
        let mut root = RouterNode::new(&mut registry, Mount::new());
        assert_eq!(
            root.get("/", "HomeController.index").err(),
            Some(RouterError::ControllerLoad {
                key: "controllers/HomeController".into()
            })
        );
    }
}
