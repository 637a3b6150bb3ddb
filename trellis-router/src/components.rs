//! Name-to-factory registry for controllers and middleware
//!
//! Controllers live under `controllers<namespace>/<Name>` and middleware under
//! `middleware/<Name>`. Factories run on every lookup, so each declaration gets
//! a fresh instance.

use crate::controller::Controller;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use trellis_core::Middleware;

/// An instantiated component
#[derive(Clone)]
pub enum Component {
    Controller(Arc<dyn Controller>),
    Middleware(Arc<dyn Middleware>),
}

impl Component {
    pub fn kind(&self) -> &'static str {
        match self {
            Component::Controller(_) => "controller",
            Component::Middleware(_) => "middleware",
        }
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Component::{}", self.kind())
    }
}

pub type ComponentFactory = Arc<dyn Fn() -> Component + Send + Sync>;

/// Lookup key for a controller, e.g. `controllers/admin/UserController`.
pub fn controller_key(namespace: &str, name: &str) -> String {
    format!("controllers{}/{}", namespace, name)
}

/// Lookup key for a middleware, e.g. `middleware/Auth`.
pub fn middleware_key(name: &str) -> String {
    format!("middleware/{}", name)
}

#[derive(Clone, Default)]
pub struct ComponentRegistry {
    factories: HashMap<String, ComponentFactory>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a raw factory under an explicit key.
    pub fn register<F>(&mut self, key: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn() -> Component + Send + Sync + 'static,
    {
        self.factories.insert(key.into(), Arc::new(factory));
        self
    }

    pub fn register_controller<C, F>(&mut self, namespace: &str, name: &str, factory: F) -> &mut Self
    where
        C: Controller,
        F: Fn() -> C + Send + Sync + 'static,
    {
        self.register(controller_key(namespace, name), move || {
            Component::Controller(Arc::new(factory()))
        })
    }

    pub fn register_middleware<M, F>(&mut self, name: &str, factory: F) -> &mut Self
    where
        M: Middleware + 'static,
        F: Fn() -> M + Send + Sync + 'static,
    {
        self.register(middleware_key(name), move || {
            Component::Middleware(Arc::new(factory()))
        })
    }

    /// Instantiate the component registered under `key`.
    pub fn instantiate(&self, key: &str) -> Option<Component> {
        self.factories.get(key).map(|factory| factory())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.factories.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}
