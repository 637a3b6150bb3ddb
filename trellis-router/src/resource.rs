// Resource expansion into CRUD routes

use crate::config::{RouteConfig, join_path};
use crate::controller::{Action, ControllerBinding};
use crate::route_registry::{RouteKey, RouteRegistry};
use crate::Result;
use std::sync::Arc;
use trellis_core::{HttpMethod, Middleware, Mount};

/// Verb and member-segment requirement for a resource action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceRule {
    pub action: Action,
    pub method: HttpMethod,
    pub requires_id: bool,
}

pub const RESOURCE_RULES: [ResourceRule; 5] = [
    ResourceRule {
        action: Action::Index,
        method: HttpMethod::GET,
        requires_id: false,
    },
    ResourceRule {
        action: Action::Show,
        method: HttpMethod::GET,
        requires_id: true,
    },
    ResourceRule {
        action: Action::Store,
        method: HttpMethod::POST,
        requires_id: false,
    },
    ResourceRule {
        action: Action::Update,
        method: HttpMethod::PUT,
        requires_id: true,
    },
    ResourceRule {
        action: Action::Destroy,
        method: HttpMethod::DELETE,
        requires_id: true,
    },
];

/// Expands a controller binding into one route per effective action.
#[derive(Debug, Clone)]
pub struct ResourceMapper {
    default_param: String,
}

impl ResourceMapper {
    /// `default_param` names the member segment when the declaration has none.
    pub fn new(default_param: impl Into<String>) -> Self {
        Self {
            default_param: default_param.into(),
        }
    }

    /// Mount-relative path for `rule` under `config`
    pub fn local_path(&self, config: &RouteConfig, rule: &ResourceRule) -> String {
        if rule.requires_id {
            let param = config.param.as_deref().unwrap_or(&self.default_param);
            join_path(&config.prefix, &format!("/:{}", param))
        } else {
            join_path(&config.prefix, "")
        }
    }

    /// Register and mount every implemented action.
    ///
    /// Each chain runs `call_site`, then the controller's middleware for that
    /// action, then its global middleware, then the action. `base` is the
    /// enclosing node's accumulated prefix.
    pub fn expand(
        &self,
        registry: &mut RouteRegistry,
        mount: &Mount,
        base: &str,
        config: &RouteConfig,
        binding: &ControllerBinding,
        call_site: &[Arc<dyn Middleware>],
    ) -> Result<Vec<RouteKey>> {
        let mut declared = Vec::new();

        for rule in RESOURCE_RULES.iter().filter(|r| binding.implements(r.action)) {
            let local = self.local_path(config, rule);
            let full = join_path(base, &local);
            registry.register(rule.method, &full)?;

            let action = rule.action.as_str();
            let handler = binding.handler(action)?;
            let chain: Vec<Arc<dyn Middleware>> = call_site
                .iter()
                .chain(binding.middleware_for(action))
                .chain(&binding.global_middleware)
                .cloned()
                .collect();

            tracing::trace!(
                controller = %binding.name,
                action = action,
                method = %rule.method,
                path = %full,
                handlers = chain.len(),
                "Resource route mounted"
            );
            mount.route(rule.method, &local, chain, handler);
            declared.push(RouteKey::new(rule.method, full));
        }

        Ok(declared)
    }
}

impl Default for ResourceMapper {
    fn default() -> Self {
        Self::new("id")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RouteDescriptor, normalize};

    #[test]
    fn test_rule_table() {
        let table: Vec<(&str, HttpMethod, bool)> = RESOURCE_RULES
            .iter()
            .map(|r| (r.action.as_str(), r.method, r.requires_id))
            .collect();
        assert_eq!(
            table,
            vec![
                ("index", HttpMethod::GET, false),
                ("show", HttpMethod::GET, true),
                ("store", HttpMethod::POST, false),
                ("update", HttpMethod::PUT, true),
                ("destroy", HttpMethod::DELETE, true),
            ]
        );
    }

    #[test]
    fn test_local_paths() {
        let mapper = ResourceMapper::default();
        let show = &RESOURCE_RULES[1];
        let index = &RESOURCE_RULES[0];

        let root = normalize("", &RouteDescriptor::new().into());
        assert_eq!(mapper.local_path(&root, index), "/");
        assert_eq!(mapper.local_path(&root, show), "/:id");

        let posts = normalize("", &RouteDescriptor::at("/posts").param("slug").into());
        assert_eq!(mapper.local_path(&posts, index), "/posts");
        assert_eq!(mapper.local_path(&posts, show), "/posts/:slug");

        let custom = ResourceMapper::new("uuid");
        assert_eq!(custom.local_path(&normalize("", &"/items".into()), show), "/items/:uuid");
    }
}
