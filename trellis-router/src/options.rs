// Builder options

use crate::route_registry::RouteRegistry;

/// Settings a route tree is built with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterOptions {
    /// Announce every registered route as `Route : VERB\tpath`
    pub debug: bool,
    /// Member segment name for resources without an explicit `param`
    pub resource_param: String,
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self {
            debug: true,
            resource_param: "id".to_string(),
        }
    }
}

impl RouterOptions {
    pub fn quiet() -> Self {
        Self {
            debug: false,
            ..Self::default()
        }
    }

    /// Fresh registry honoring `debug`
    pub fn registry(&self) -> RouteRegistry {
        RouteRegistry::new(self.debug)
    }
}

#[cfg(feature = "config")]
impl From<trellis_config::RouterSettings> for RouterOptions {
    fn from(settings: trellis_config::RouterSettings) -> Self {
        Self {
            debug: settings.debug,
            resource_param: settings.resource_param,
        }
    }
}
