//! Bootstrap a small route tree from configuration and serve a few requests.
//!
//! Reads `TRELLIS_DEBUG` and `TRELLIS_RESOURCE_PARAM` (or a `.env` file), builds
//! the tree and dispatches requests through the resulting mount.
//!
//! Run with: `cargo run --example bootstrap`

use trellis::prelude::*;
use trellis::logging::{LogConfig, LogFormat, LogLevel};

struct PostController {
    /// Member segment name the resource routes were declared with
    param: String,
}

impl Controller for PostController {
    fn descriptor(&self) -> ControllerDescriptor {
        ControllerDescriptor::new()
            .implements([Action::Index, Action::Show, Action::Store])
            .middleware("RequestId", [Action::Store])
            .global_middleware("Logging")
    }

    fn action(&self, name: &str) -> Option<HandlerFn> {
        match name {
            "index" => Some(handler_fn(|_req| async {
                HttpResponse::ok().with_json(&serde_json::json!(["hello", "world"]))
            })),
            "show" => {
                let param = self.param.clone();
                Some(handler_fn(move |req| {
                    let id = req.param(&param).cloned().unwrap_or_default();
                    async move { HttpResponse::ok().with_json(&serde_json::json!({ "id": id })) }
                }))
            }
            "store" => Some(handler_fn(|_req| async { Ok(HttpResponse::created()) })),
            _ => None,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _guard = LogConfig::new()
        .level(LogLevel::Debug)
        .format(LogFormat::Compact)
        .init()?;

    let settings = RouterSettings::from_env()?;
    let options = RouterOptions::from(settings);

    let param = options.resource_param.clone();
    let mut components = ComponentRegistry::new();
    components
        .register_controller("", "PostController", move || PostController {
            param: param.clone(),
        })
        .register_middleware("RequestId", || trellis::RequestIdMiddleware)
        .register_middleware("Logging", trellis::LoggingMiddleware::new);

    let mount = Mount::new();
    let registry = trellis::build_routes(&mount, options, components, |root| {
        root.get(
            "/",
            handler_fn(|_req| async { Ok(HttpResponse::text("Trellis is running")) }),
        )?;

        root.group("/blog", |blog| {
            blog.resource("/posts", "PostController")?;
            Ok(())
        })?
        .error("json")?;

        Ok(())
    })?;

    println!("Declared {} routes:", registry.len());
    for route in mount.routes() {
        println!("  {:7} {}", route.method, route.path);
    }

    for (method, path) in [
        ("GET", "/"),
        ("GET", "/blog/posts"),
        ("GET", "/blog/posts/7"),
        ("POST", "/blog/posts"),
        ("GET", "/missing"),
    ] {
        match mount.dispatch(HttpRequest::new(method, path)).await {
            Ok(response) => println!("{} {} -> {} {}", method, path, response.status, response.body_text()),
            Err(error) => println!("{} {} -> {}", method, path, error),
        }
    }

    Ok(())
}
