//! Duplicate detection over the whole route space
//!
//! The registry is owned by the bootstrap routine and lent to the root
//! [`RouterNode`](crate::RouterNode); every node in the tree registers through
//! the same borrow, so a route declared in one branch collides with the same
//! `(verb, path)` declared anywhere else.

use crate::{Result, RouterError};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use trellis_core::HttpMethod;

/// A declared `(verb, full path)` pair
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RouteKey {
    pub method: HttpMethod,
    pub path: String,
}

impl RouteKey {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
        }
    }
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\t{}", self.method, self.path)
    }
}

/// Receives each `Route : VERB\tpath` announcement line
pub type RouteSink = Arc<dyn Fn(&str) + Send + Sync>;

/// Insert-only set of declared routes
#[derive(Default)]
pub struct RouteRegistry {
    seen: HashSet<RouteKey>,
    order: Vec<RouteKey>,
    debug: bool,
    sink: Option<RouteSink>,
}

impl fmt::Debug for RouteRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteRegistry")
            .field("routes", &self.order)
            .field("debug", &self.debug)
            .field("sink", &self.sink.as_ref().map(|_| ".."))
            .finish()
    }
}

impl RouteRegistry {
    /// `debug` enables the `Route : VERB\tpath` line per registration.
    pub fn new(debug: bool) -> Self {
        Self {
            debug,
            ..Self::default()
        }
    }

    /// Send announcements to `sink` instead of stdout. Only used when debug is on.
    pub fn with_sink<F>(mut self, sink: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.sink = Some(Arc::new(sink));
        self
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    fn announce(&self, key: &RouteKey) {
        match &self.sink {
            Some(sink) => sink(&trellis_log::route_line(key.method.as_str(), &key.path)),
            None => trellis_log::announce_route(key.method.as_str(), &key.path),
        }
    }

    /// Record a route. Paths are case-sensitive; the verb is already canonical.
    pub fn register(&mut self, method: HttpMethod, path: &str) -> Result<()> {
        let key = RouteKey::new(method, path);
        if self.seen.contains(&key) {
            tracing::debug!(method = %method, path = %path, "Duplicate route rejected");
            return Err(RouterError::DuplicateRoute {
                method: method.to_string(),
                path: path.to_string(),
            });
        }

        if self.debug {
            self.announce(&key);
        }

        self.seen.insert(key.clone());
        self.order.push(key);
        Ok(())
    }

    pub fn contains(&self, method: HttpMethod, path: &str) -> bool {
        self.seen.contains(&RouteKey::new(method, path))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Keys in registration order
    pub fn keys(&self) -> &[RouteKey] {
        &self.order
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_reject_duplicate() {
        let mut registry = RouteRegistry::new(false);
        registry.register(HttpMethod::GET, "/users").unwrap();

        let err = registry.register(HttpMethod::GET, "/users").unwrap_err();
        assert_eq!(
            err,
            RouterError::DuplicateRoute {
                method: "GET".into(),
                path: "/users".into()
            }
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_verb_and_case_distinguish_keys() {
        let mut registry = RouteRegistry::new(false);
        registry.register(HttpMethod::GET, "/users").unwrap();
        registry.register(HttpMethod::POST, "/users").unwrap();
        registry.register(HttpMethod::GET, "/Users").unwrap();
        registry.register(HttpMethod::ALL, "/users").unwrap();

        assert_eq!(registry.len(), 4);
        assert!(registry.contains(HttpMethod::POST, "/users"));
        assert!(!registry.contains(HttpMethod::PUT, "/users"));
    }

    #[test]
    fn test_keys_keep_order_and_display() {
        let mut registry = RouteRegistry::new(false);
        assert!(registry.is_empty());
        registry.register(HttpMethod::DELETE, "/b").unwrap();
        registry.register(HttpMethod::GET, "/a").unwrap();

        let rendered: Vec<String> = registry.keys().iter().map(|k| k.to_string()).collect();
        assert_eq!(rendered, vec!["DELETE\t/b", "GET\t/a"]);
    }

    #[test]
    fn test_debug_flag() {
        assert!(RouteRegistry::new(true).debug());
        assert!(!RouteRegistry::default().debug());
    }

    fn capturing(debug: bool) -> (RouteRegistry, Arc<parking_lot::Mutex<Vec<String>>>) {
        let lines: Arc<parking_lot::Mutex<Vec<String>>> = Arc::default();
        let sink = lines.clone();
        let registry = RouteRegistry::new(debug).with_sink(move |line| sink.lock().push(line.to_string()));
        (registry, lines)
    }

    #[test]
    fn test_debug_announces_each_registration_once() {
        let (mut registry, lines) = capturing(true);
        registry.register(HttpMethod::GET, "/users").unwrap();
        registry.register(HttpMethod::POST, "/users").unwrap();
        registry.register(HttpMethod::GET, "/users/:id").unwrap();
        registry.register(HttpMethod::GET, "/users").unwrap_err();

        assert_eq!(
            *lines.lock(),
            vec![
                "Route : GET\t/users",
                "Route : POST\t/users",
                "Route : GET\t/users/:id",
            ]
        );
    }

    #[test]
    fn test_quiet_registry_announces_nothing() {
        let (mut registry, lines) = capturing(false);
        registry.register(HttpMethod::GET, "/users").unwrap();
        registry.register(HttpMethod::DELETE, "/users/:id").unwrap();

        assert!(lines.lock().is_empty());
        assert_eq!(registry.len(), 2);
    }
}
