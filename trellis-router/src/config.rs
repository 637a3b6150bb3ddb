//! Route declaration shorthand
//!
//! Every declaration takes a [`RouteSpec`]: either a bare path or a structured
//! [`RouteDescriptor`]. [`normalize`] turns it into the canonical
//! [`RouteConfig`] for the enclosing namespace.

use serde::Deserialize;
use serde_json::{Map, Value};

/// Structured route declaration
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RouteDescriptor {
    /// Appended to the enclosing namespace
    pub namespace: Option<String>,
    /// Defaults to `/` when absent or empty
    pub prefix: Option<String>,
    pub options: Map<String, Value>,
    /// Member segment name for resources, `id` unless configured otherwise
    pub param: Option<String>,
}

impl RouteDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Descriptor with the given prefix
    pub fn at(prefix: impl Into<String>) -> Self {
        Self::new().prefix(prefix)
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn param(mut self, param: impl Into<String>) -> Self {
        self.param = Some(param.into());
        self
    }

    pub fn option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }
}

/// A bare path or a structured descriptor
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RouteSpec {
    Path(String),
    Descriptor(RouteDescriptor),
}

impl From<&str> for RouteSpec {
    fn from(path: &str) -> Self {
        RouteSpec::Path(path.to_string())
    }
}

impl From<String> for RouteSpec {
    fn from(path: String) -> Self {
        RouteSpec::Path(path)
    }
}

impl From<RouteDescriptor> for RouteSpec {
    fn from(descriptor: RouteDescriptor) -> Self {
        RouteSpec::Descriptor(descriptor)
    }
}

/// Canonical form of a declaration, produced per call
#[derive(Debug, Clone, PartialEq)]
pub struct RouteConfig {
    pub namespace: String,
    pub prefix: String,
    pub options: Map<String, Value>,
    pub param: Option<String>,
}

/// Resolve `raw` against the enclosing namespace.
///
/// A bare path keeps the namespace and is used verbatim as the prefix. A
/// descriptor appends its namespace (if any) as `enclosing/namespace` and
/// falls back to `/` for a missing or empty prefix.
///
/// Leading and trailing `/` are stripped from the descriptor namespace before
/// joining, so `admin`, `/admin` and `admin/` all give `<enclosing>/admin`
/// and component keys never contain `//`.
pub fn normalize(enclosing: &str, raw: &RouteSpec) -> RouteConfig {
    match raw {
        RouteSpec::Path(path) => RouteConfig {
            namespace: enclosing.to_string(),
            prefix: path.clone(),
            options: Map::new(),
            param: None,
        },
        RouteSpec::Descriptor(descriptor) => {
            let namespace = match descriptor
                .namespace
                .as_deref()
                .map(|ns| ns.trim_matches('/'))
            {
                Some(ns) if !ns.is_empty() => format!("{}/{}", enclosing, ns),
                _ => enclosing.to_string(),
            };

            let prefix = match descriptor.prefix.as_deref() {
                Some(p) if !p.is_empty() => p.to_string(),
                _ => "/".to_string(),
            };

            RouteConfig {
                namespace,
                prefix,
                options: descriptor.options.clone(),
                param: descriptor.param.clone().filter(|p| !p.is_empty()),
            }
        }
    }
}

/// Concatenate URL paths on segment boundaries.
///
/// The result always starts with `/`, never ends with one (except the root)
/// and has no empty segments, so `/users` + `/` is `/users`.
pub fn join_path(base: &str, path: &str) -> String {
    let segments: Vec<&str> = base
        .split('/')
        .chain(path.split('/'))
        .filter(|s| !s.is_empty())
        .collect();
    format!("/{}", segments.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_path_keeps_namespace() {
        let config = normalize("/admin", &"/users".into());
        assert_eq!(config.namespace, "/admin");
        assert_eq!(config.prefix, "/users");
        assert!(config.options.is_empty());
        assert_eq!(config.param, None);
    }

    #[test]
    fn test_descriptor_defaults_prefix_to_root() {
        let config = normalize("", &RouteDescriptor::new().into());
        assert_eq!(config.prefix, "/");
        assert_eq!(config.namespace, "");

        let config = normalize("", &RouteDescriptor::at("").into());
        assert_eq!(config.prefix, "/");
    }

    #[test]
    fn test_descriptor_appends_namespace() {
        let spec: RouteSpec = RouteDescriptor::at("/panel").namespace("admin").into();
        let config = normalize("", &spec);
        assert_eq!(config.namespace, "/admin");
        assert_eq!(config.prefix, "/panel");

        let nested = normalize("/admin", &RouteDescriptor::new().namespace("/reports/").into());
        assert_eq!(nested.namespace, "/admin/reports");
    }

    #[test]
    fn test_descriptor_options_and_param() {
        let spec: RouteSpec = RouteDescriptor::at("/posts")
            .param("slug")
            .option("cache", true)
            .into();
        let config = normalize("", &spec);
        assert_eq!(config.param.as_deref(), Some("slug"));
        assert_eq!(config.options.get("cache"), Some(&Value::Bool(true)));
    }

    #[test]
    fn test_spec_deserializes_from_json() {
        let bare: RouteSpec = serde_json::from_str(r#""/health""#).unwrap();
        assert_eq!(bare, RouteSpec::Path("/health".into()));

        let structured: RouteSpec =
            serde_json::from_str(r#"{"prefix": "/users", "namespace": "api"}"#).unwrap();
        let config = normalize("", &structured);
        assert_eq!(config.namespace, "/api");
        assert_eq!(config.prefix, "/users");
    }

    #[test]
    fn test_join_path() {
        assert_eq!(join_path("", "/"), "/");
        assert_eq!(join_path("/users", "/"), "/users");
        assert_eq!(join_path("/users", "/:id"), "/users/:id");
        assert_eq!(join_path("/a/b", "c"), "/a/b/c");
        assert_eq!(join_path("", ""), "/");
    }
}
