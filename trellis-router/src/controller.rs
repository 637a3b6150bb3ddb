//! Controllers and their capability descriptors
//!
//! A controller states what it can do through a [`ControllerDescriptor`]
//! rather than having its methods discovered. [`ControllerLoader`] looks one
//! up by name, instantiates it and produces a [`ControllerBinding`] with the
//! effective resource actions and resolved middleware.

use crate::components::{Component, ComponentRegistry, controller_key};
use crate::middleware_resolver::{MiddlewareResolver, MiddlewareSpec};
use crate::{Result, RouterError};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use trellis_core::{HandlerFn, Middleware};

/// The five resource actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Action {
    Index,
    Show,
    Store,
    Update,
    Destroy,
}

impl Action {
    /// Rule-table order
    pub const ALL: [Action; 5] = [
        Action::Index,
        Action::Show,
        Action::Store,
        Action::Update,
        Action::Destroy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Index => "index",
            Action::Show => "show",
            Action::Store => "store",
            Action::Update => "update",
            Action::Destroy => "destroy",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Action::ALL.into_iter().find(|a| a.as_str() == name)
    }
}

impl AsRef<str> for Action {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a controller implements and which middleware it wants.
///
/// ```
/// use trellis_router::{Action, ControllerDescriptor};
///
/// let descriptor = ControllerDescriptor::new()
///     .implements([Action::Index, Action::Show, Action::Store])
///     .only([Action::Index, Action::Store])
///     .middleware("Auth", [Action::Store])
///     .global_middleware("RequestId");
///
/// assert_eq!(descriptor.effective_actions(), vec![Action::Index, Action::Store]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ControllerDescriptor {
    implements: Vec<Action>,
    allow: Option<Vec<Action>>,
    middleware: Vec<(MiddlewareSpec, Vec<String>)>,
    global: Vec<MiddlewareSpec>,
}

impl ControllerDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resource actions this controller has handlers for
    pub fn implements<I: IntoIterator<Item = Action>>(mut self, actions: I) -> Self {
        for action in actions {
            if !self.implements.contains(&action) {
                self.implements.push(action);
            }
        }
        self
    }

    /// Restrict resource expansion to these actions
    pub fn only<I: IntoIterator<Item = Action>>(mut self, actions: I) -> Self {
        self.allow = Some(actions.into_iter().collect());
        self
    }

    /// Run `spec` ahead of each named action. Names may be resource actions or
    /// any other method exposed through [`Controller::action`].
    pub fn middleware<S, I>(mut self, spec: S, actions: I) -> Self
    where
        S: Into<MiddlewareSpec>,
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let actions = actions
            .into_iter()
            .map(|a| a.as_ref().to_string())
            .collect();
        self.middleware.push((spec.into(), actions));
        self
    }

    /// Run `spec` for every action, after per-action middleware
    pub fn global_middleware(mut self, spec: impl Into<MiddlewareSpec>) -> Self {
        self.global.push(spec.into());
        self
    }

    pub fn implemented(&self) -> &[Action] {
        &self.implements
    }

    pub fn allow_list(&self) -> Option<&[Action]> {
        self.allow.as_deref()
    }

    /// Rule-table actions that are both implemented and allowed
    pub fn effective_actions(&self) -> Vec<Action> {
        Action::ALL
            .into_iter()
            .filter(|a| self.implements.contains(a))
            .filter(|a| self.allow.as_ref().is_none_or(|allow| allow.contains(a)))
            .collect()
    }
}

/// A named unit of endpoints.
pub trait Controller: Send + Sync + 'static {
    fn descriptor(&self) -> ControllerDescriptor;

    /// Handler for a resource action or named method, if the controller has one.
    fn action(&self, name: &str) -> Option<HandlerFn>;
}

/// A loaded controller with its middleware resolved
pub struct ControllerBinding {
    pub name: String,
    pub instance: Arc<dyn Controller>,
    /// Effective resource actions, in rule-table order
    pub implemented: Vec<Action>,
    pub allow_list: Option<Vec<Action>>,
    pub global_middleware: Vec<Arc<dyn Middleware>>,
    pub per_action_middleware: HashMap<String, Vec<Arc<dyn Middleware>>>,
}

impl fmt::Debug for ControllerBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerBinding")
            .field("name", &self.name)
            .field("implemented", &self.implemented)
            .field("allow_list", &self.allow_list)
            .field("global_middleware", &self.global_middleware.len())
            .field(
                "per_action_middleware",
                &self
                    .per_action_middleware
                    .iter()
                    .map(|(k, v)| (k.as_str(), v.len()))
                    .collect::<HashMap<_, _>>(),
            )
            .finish()
    }
}

impl ControllerBinding {
    pub fn implements(&self, action: Action) -> bool {
        self.implemented.contains(&action)
    }

    pub fn handler(&self, name: &str) -> Result<HandlerFn> {
        self.instance.action(name).ok_or_else(|| {
            RouterError::controller_shape(&self.name, format!("method `{}` not found", name))
        })
    }

    /// Per-action middleware for `name`, in declaration order
    pub fn middleware_for(&self, name: &str) -> &[Arc<dyn Middleware>] {
        self.per_action_middleware
            .get(name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

pub struct ControllerLoader<'a> {
    components: &'a ComponentRegistry,
}

impl<'a> ControllerLoader<'a> {
    pub fn new(components: &'a ComponentRegistry) -> Self {
        Self { components }
    }

    /// Load the controller named by `specifier` (`Name` or `Name.method`).
    pub fn resolve(&self, namespace: &str, specifier: &str) -> Result<ControllerBinding> {
        let name = specifier.split('.').next().unwrap_or(specifier);
        let key = controller_key(namespace, name);

        let instance = match self.components.instantiate(&key) {
            Some(Component::Controller(instance)) => instance,
            Some(other) => {
                return Err(RouterError::controller_shape(
                    name,
                    format!("`{}` is registered as {}", key, other.kind()),
                ));
            }
            None => return Err(RouterError::ControllerLoad { key }),
        };

        let descriptor = instance.descriptor();
        let implemented = descriptor.effective_actions();

        for action in &implemented {
            if instance.action(action.as_str()).is_none() {
                return Err(RouterError::controller_shape(
                    name,
                    format!("declares `{}` but provides no handler", action),
                ));
            }
        }

        let resolver = MiddlewareResolver::new(self.components);
        let as_controller_shape = |err: RouterError| match err {
            RouterError::MiddlewareShape { name: mw, reason } => RouterError::controller_shape(
                name,
                format!("middleware `{}` has no handle: {}", mw, reason),
            ),
            other => other,
        };

        let mut per_action_middleware: HashMap<String, Vec<Arc<dyn Middleware>>> = HashMap::new();
        for (spec, actions) in &descriptor.middleware {
            let handler = resolver.resolve_one(spec).map_err(as_controller_shape)?;
            for action in actions {
                per_action_middleware
                    .entry(action.clone())
                    .or_default()
                    .push(handler.clone());
            }
        }

        let global_middleware = resolver
            .resolve(&descriptor.global)
            .map_err(as_controller_shape)?;

        tracing::trace!(
            controller = %key,
            actions = ?implemented,
            "Controller loaded"
        );

        Ok(ControllerBinding {
            name: name.to_string(),
            instance,
            implemented,
            allow_list: descriptor.allow.clone(),
            global_middleware,
            per_action_middleware,
        })
    }

    /// Load `Name.method` and return the binding with the method's name.
    pub fn resolve_action(&self, namespace: &str, specifier: &str) -> Result<(ControllerBinding, String)> {
        let Some((name, method)) = specifier.split_once('.').filter(|(_, m)| !m.is_empty()) else {
            return Err(RouterError::controller_shape(
                specifier,
                "expected a `Name.method` specifier",
            ));
        };

        let binding = self.resolve(namespace, name)?;
        binding.handler(method)?;
        Ok((binding, method.to_string()))
    }
}
