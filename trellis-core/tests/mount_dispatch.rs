//! Dispatch behavior across nested mounts

use parking_lot::Mutex;
use std::sync::Arc;
use trellis_core::*;

type Trace = Arc<Mutex<Vec<String>>>;

fn tag(label: &str, trace: &Trace) -> Arc<dyn Middleware> {
    let label = label.to_string();
    let trace = trace.clone();
    middleware_fn(move |req, next| {
        trace.lock().push(label.clone());
        next(req)
    })
}

fn endpoint(trace: &Trace) -> HandlerFn {
    let trace = trace.clone();
    handler_fn(move |_req| {
        trace.lock().push("endpoint".to_string());
        async { Ok(HttpResponse::ok()) }
    })
}

fn failing(error: fn() -> Error) -> HandlerFn {
    handler_fn(move |_req| async move { Err(error()) })
}

#[tokio::test]
async fn test_mount_middleware_wraps_route_chain_outermost_first() {
    let trace: Trace = Arc::default();

    let outer = Mount::new();
    outer.use_middleware(tag("outer", &trace));
    let inner = Mount::new();
    inner.use_middleware(tag("inner", &trace));
    inner.route(
        HttpMethod::GET,
        "/leaf",
        vec![tag("route-1", &trace), tag("route-2", &trace)],
        endpoint(&trace),
    );
    outer.mount("/branch", &inner);

    let response = outer
        .dispatch(HttpRequest::new("GET", "/branch/leaf"))
        .await
        .unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(
        *trace.lock(),
        vec!["outer", "inner", "route-1", "route-2", "endpoint"]
    );
}

#[tokio::test]
async fn test_outer_middleware_skipped_when_no_route_matches() {
    let trace: Trace = Arc::default();
    let root = Mount::new();
    root.use_middleware(tag("root", &trace));
    root.route(HttpMethod::GET, "/known", Vec::new(), endpoint(&trace));

    let result = root.dispatch(HttpRequest::new("GET", "/unknown")).await;
    assert!(matches!(result, Err(Error::RouteNotFound(_))));
    assert!(trace.lock().is_empty());
}

#[tokio::test]
async fn test_nearest_error_handler_wins() {
    let root = Mount::new();
    root.use_error_handler(error_handler_fn(|_err, _ctx| {
        Some(HttpResponse::text("outer"))
    }));

    let child = Mount::new();
    child.use_error_handler(error_handler_fn(|_err, _ctx| {
        Some(HttpResponse::text("inner"))
    }));
    child.route(
        HttpMethod::GET,
        "/boom",
        Vec::new(),
        failing(|| Error::Internal("boom".into())),
    );
    root.mount("/api", &child);
    root.route(
        HttpMethod::GET,
        "/boom",
        Vec::new(),
        failing(|| Error::Internal("boom".into())),
    );

    let nested = root
        .dispatch(HttpRequest::new("GET", "/api/boom"))
        .await
        .unwrap();
    assert_eq!(nested.body_text(), "inner");

    let top = root.dispatch(HttpRequest::new("GET", "/boom")).await.unwrap();
    assert_eq!(top.body_text(), "outer");
}

#[tokio::test]
async fn test_declining_handler_falls_through_to_outer() {
    let root = Mount::new();
    root.use_error_handler(Arc::new(JsonErrorHandler::new()));

    let child = Mount::new();
    child.use_error_handler(error_handler_fn(|err, _ctx| match err {
        Error::Unauthorized(_) => Some(HttpResponse::new(401)),
        _ => None,
    }));
    child.route(
        HttpMethod::GET,
        "/",
        Vec::new(),
        failing(|| Error::NotFound("gone".into())),
    );
    root.mount("/items", &child);

    let response = root
        .dispatch(HttpRequest::new("GET", "/items"))
        .await
        .unwrap();
    assert_eq!(response.status, 404);
    assert!(response.body_text().contains("gone"));
}

#[tokio::test]
async fn test_unclaimed_error_is_returned() {
    let root = Mount::new();
    root.route(
        HttpMethod::DELETE,
        "/x",
        Vec::new(),
        failing(|| Error::Conflict("locked".into())),
    );

    let result = root.dispatch(HttpRequest::new("DELETE", "/x")).await;
    assert!(matches!(result, Err(Error::Conflict(_))));
}

#[tokio::test]
async fn test_later_mount_reached_when_earlier_prefix_has_no_route() {
    let root = Mount::new();
    let first = Mount::new();
    first.route(HttpMethod::GET, "/a", Vec::new(), handler_fn(|_req| async {
        Ok(HttpResponse::text("first"))
    }));
    let second = Mount::new();
    second.route(HttpMethod::GET, "/b", Vec::new(), handler_fn(|_req| async {
        Ok(HttpResponse::text("second"))
    }));
    root.mount("/shared", &first);
    root.mount("/shared", &second);

    let response = root
        .dispatch(HttpRequest::new("GET", "/shared/b"))
        .await
        .unwrap();
    assert_eq!(response.body_text(), "second");
}

#[tokio::test]
async fn test_request_id_flows_into_error_context() {
    let seen = Arc::new(Mutex::new(None));
    let seen_in_handler = seen.clone();

    let root = Mount::new();
    root.use_middleware(Arc::new(RequestIdMiddleware));
    root.use_error_handler(error_handler_fn(move |_err, ctx| {
        *seen_in_handler.lock() = ctx.request_id.clone();
        Some(HttpResponse::new(500))
    }));
    root.route(
        HttpMethod::GET,
        "/",
        Vec::new(),
        failing(|| Error::Internal("x".into())),
    );

    root.dispatch(HttpRequest::new("GET", "/").with_header("x-request-id", "abc"))
        .await
        .unwrap();
    assert_eq!(seen.lock().as_deref(), Some("abc"));
}
