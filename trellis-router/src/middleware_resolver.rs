// Middleware specifier resolution

use crate::components::{Component, ComponentRegistry, middleware_key};
use crate::{Result, RouterError};
use std::fmt;
use std::sync::Arc;
use trellis_core::Middleware;

/// Inline middleware or a name looked up under `middleware/<Name>`
#[derive(Clone)]
pub enum MiddlewareSpec {
    Handler(Arc<dyn Middleware>),
    Named(String),
}

impl fmt::Debug for MiddlewareSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MiddlewareSpec::Handler(_) => f.write_str("MiddlewareSpec::Handler(..)"),
            MiddlewareSpec::Named(name) => write!(f, "MiddlewareSpec::Named({:?})", name),
        }
    }
}

impl From<&str> for MiddlewareSpec {
    fn from(name: &str) -> Self {
        MiddlewareSpec::Named(name.to_string())
    }
}

impl From<String> for MiddlewareSpec {
    fn from(name: String) -> Self {
        MiddlewareSpec::Named(name)
    }
}

impl From<Arc<dyn Middleware>> for MiddlewareSpec {
    fn from(handler: Arc<dyn Middleware>) -> Self {
        MiddlewareSpec::Handler(handler)
    }
}

impl From<&MiddlewareSpec> for MiddlewareSpec {
    fn from(spec: &MiddlewareSpec) -> Self {
        spec.clone()
    }
}

/// Turns specifiers into handlers, preserving order
pub struct MiddlewareResolver<'a> {
    components: &'a ComponentRegistry,
}

impl<'a> MiddlewareResolver<'a> {
    pub fn new(components: &'a ComponentRegistry) -> Self {
        Self { components }
    }

    pub fn resolve_one(&self, spec: &MiddlewareSpec) -> Result<Arc<dyn Middleware>> {
        match spec {
            MiddlewareSpec::Handler(handler) => Ok(handler.clone()),
            MiddlewareSpec::Named(name) => {
                let key = middleware_key(name);
                match self.components.instantiate(&key) {
                    Some(Component::Middleware(handler)) => Ok(handler),
                    Some(other) => Err(RouterError::middleware_shape(
                        name,
                        format!("`{}` is registered as a {}", key, other.kind()),
                    )),
                    None => Err(RouterError::MiddlewareLoad { key }),
                }
            }
        }
    }

    pub fn resolve<I>(&self, specs: I) -> Result<Vec<Arc<dyn Middleware>>>
    where
        I: IntoIterator,
        I::Item: Into<MiddlewareSpec>,
    {
        specs
            .into_iter()
            .map(|spec| self.resolve_one(&spec.into()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_core::{RequestIdMiddleware, middleware_fn};

    fn components() -> ComponentRegistry {
        let mut components = ComponentRegistry::new();
        components.register_middleware("RequestId", || RequestIdMiddleware);
        components
    }

    #[test]
    fn test_inline_handler_passes_through() {
        let components = ComponentRegistry::new();
        let inline = middleware_fn(|req, next| next(req));

        let resolved = MiddlewareResolver::new(&components)
            .resolve([MiddlewareSpec::from(inline.clone())])
            .unwrap();
        assert_eq!(resolved.len(), 1);
        assert!(Arc::ptr_eq(&resolved[0], &inline));
    }

    #[test]
    fn test_named_and_mixed_order() {
        let components = components();
        let inline = middleware_fn(|req, next| next(req));
        let specs = vec![
            MiddlewareSpec::from("RequestId"),
            MiddlewareSpec::from(inline.clone()),
        ];

        let resolved = MiddlewareResolver::new(&components).resolve(&specs).unwrap();
        assert_eq!(resolved.len(), 2);
        assert!(Arc::ptr_eq(&resolved[1], &inline));
    }

    #[test]
    fn test_missing_name() {
        let components = components();
        let err = MiddlewareResolver::new(&components)
            .resolve(["Throttle"])
            .err()
            .expect("expected an error");
        assert_eq!(
            err,
            RouterError::MiddlewareLoad {
                key: "middleware/Throttle".into()
            }
        );
    }

    #[test]
    fn test_wrong_kind_is_shape_error() {
        let mut components = ComponentRegistry::new();
        components.register("middleware/Broken", || {
            Component::Controller(Arc::new(crate::controller::tests::EmptyController))
        });

        let err = MiddlewareResolver::new(&components)
            .resolve(["Broken"])
            .err()
            .expect("expected an error");
        assert!(matches!(err, RouterError::MiddlewareShape { .. }));
    }
}
