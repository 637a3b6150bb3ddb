// Trellis - declarative route construction for Rust HTTP services
//
// Route trees are declared through nested builder closures. Groups scope
// middleware and error handlers, resources expand controllers into CRUD
// routes, and duplicate routes fail the whole declaration pass.

// Re-export core functionality
pub use trellis_core::*;

// Re-export the route builder
pub use trellis_router::{
    Action, Component, ComponentRegistry, Controller, ControllerBinding, ControllerDescriptor,
    ControllerLoader, Endpoint, ErrorHandlerSpec, Group, MiddlewareResolver, MiddlewareSpec,
    Resource, ResourceMapper, RouteConfig, RouteDescriptor, RouteKey, RouteRegistry, RouteSpec,
    RouterError, RouterNode, RouterOptions,
};

pub use trellis_log;
pub use trellis_router;

#[cfg(feature = "config")]
pub use trellis_config;

/// Build a route tree onto `mount`.
///
/// Creates the registry from `options`, runs `builder` against the root node
/// and returns the registry so callers can inspect what was declared. The first
/// declaration error aborts the pass.
///
/// ```
/// use trellis::prelude::*;
///
/// let mount = Mount::new();
/// let registry = trellis::build_routes(&mount, RouterOptions::quiet(), ComponentRegistry::new(), |root| {
///     root.get("/health", handler_fn(|_req| async { Ok(HttpResponse::text("ok")) }))?;
///     Ok(())
/// })
/// .unwrap();
///
/// assert_eq!(registry.len(), 1);
/// ```
pub fn build_routes<F>(
    mount: &Mount,
    options: RouterOptions,
    components: ComponentRegistry,
    builder: F,
) -> trellis_router::Result<RouteRegistry>
where
    F: FnOnce(&mut RouterNode<'_>) -> trellis_router::Result<()>,
{
    let mut registry = options.registry();
    {
        let mut root = RouterNode::new(&mut registry, mount.clone())
            .with_options(&options)
            .with_components(components);
        builder(&mut root)?;
    }
    trellis_log::info!("Route tree built with {} routes", registry.len());
    Ok(registry)
}

// Prelude for common imports
pub mod prelude {
    pub use crate::{
        Action,
        ComponentRegistry,
        Controller,
        ControllerDescriptor,
        Error,
        ErrorHandler,
        ErrorHandlerRegistry,
        Group,
        HandlerFn,
        HttpMethod,
        HttpRequest,
        HttpResponse,
        Middleware,
        Mount,
        Next,
        Resource,
        RouteDescriptor,
        RouteRegistry,
        RouterError,
        RouterNode,
        RouterOptions,
        error_handler_fn,
        handler_fn,
        middleware_fn,
    };

    #[cfg(feature = "config")]
    pub use trellis_config::{ConfigManager, RouterSettings};
}
