use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use pretty_assertions::assert_eq;
use waymark::{Error, Method, Request, Response, Router, StatusCode};

fn request(method: Method, uri: &str) -> Request {
    http::Request::builder().method(method).uri(uri).body(()).unwrap().into()
}

fn request_with_body(method: Method, uri: &str, body: impl Into<waymark::Body>) -> Request {
    http::Request::builder().method(method).uri(uri).body(body).unwrap().into()
}

async fn send(router: &Router, req: Request) -> (StatusCode, String) {
    let res = router.serve(req).await.unwrap();
    (res.code(), String::from_utf8(res.body().to_vec()).unwrap())
}

async fn echo_id(req: Request) -> String {
    req.param("id").unwrap_or_default().to_owned()
}

// Holds a borrow of the request across an await point.
async fn greet_after_yield(req: Request) -> String {
    let name = req.param("name").unwrap_or_default();
    tokio::task::yield_now().await;
    format!("hello {name}")
}

#[tokio::test]
async fn users_route_table() {
    let mut router = Router::new();
    router.get("/users/:id", echo_id).unwrap();

    let cases = [
        (Method::GET, "/", StatusCode::NOT_FOUND, "404 page not found"),
        (Method::GET, "/users", StatusCode::NOT_FOUND, "404 page not found"),
        (Method::GET, "/users/123", StatusCode::OK, "123"),
        (Method::GET, "/users/123.js", StatusCode::OK, "123.js"),
        (Method::GET, "/users/123-js", StatusCode::OK, "123-js"),
        (Method::GET, "/users/123_js", StatusCode::OK, "123_js"),
        (Method::GET, "/users/abc", StatusCode::OK, "abc"),
        (Method::POST, "/users/123", StatusCode::METHOD_NOT_ALLOWED, "Method not allowed"),
    ];

    for (method, path, status, body) in cases {
        let got = send(&router, request(method.clone(), path)).await;
        assert_eq!(got, (status, body.to_owned()), "{method} {path}");
    }
}

#[tokio::test]
async fn handler_runs_exactly_once_per_match() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);

    let mut router = Router::new();
    router
        .get("/orders/:order/items/:item", move |req: Request| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                format!("{}:{}", req.param("order").unwrap(), req.param("item").unwrap())
            }
        })
        .unwrap();

    let (status, body) = send(&router, request(Method::GET, "/orders/o-9/items/sku.1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "o-9:sku.1");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn first_registered_match_wins() {
    let mut router = Router::new();
    router
        .get("/files/:name", |_req: Request| async { "generic" })
        .unwrap()
        .get("/files/readme", |_req: Request| async { "specific" })
        .unwrap();

    let (_, body) = send(&router, request(Method::GET, "/files/readme")).await;
    assert_eq!(body, "generic");
}

#[tokio::test]
async fn method_mismatch_anywhere_yields_405() {
    let mut router = Router::new();
    router.post("/login", |_req: Request| async { "welcome" }).unwrap();

    // No route's path matches, yet the POST route raises the mismatch flag.
    let (status, body) = send(&router, request(Method::GET, "/missing")).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body, "Method not allowed");
}

#[tokio::test]
async fn no_overlap_yields_default_404() {
    let mut router = Router::new();
    router.get("/users/:id", echo_id).unwrap();

    let (status, body) = send(&router, request(Method::GET, "/missing")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, "404 page not found");
}

#[tokio::test]
async fn custom_not_found_handler() {
    let mut router = Router::new();
    router
        .not_found(|req: Request| async move {
            (StatusCode::NOT_FOUND, format!("nothing at {}", req.path()))
        })
        .get("/users/:id", echo_id)
        .unwrap();

    let (status, body) = send(&router, request(Method::GET, "/nope")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, "nothing at /nope");
}

#[tokio::test]
async fn on_many_registers_every_method() {
    let mut router = Router::new();
    router
        .on_many([Method::GET, Method::PUT, Method::DELETE], "/items/:id", echo_id)
        .unwrap();

    for method in [Method::GET, Method::PUT, Method::DELETE] {
        let (status, body) = send(&router, request(method, "/items/5")).await;
        assert_eq!((status, body.as_str()), (StatusCode::OK, "5"));
    }
    let (status, _) = send(&router, request(Method::POST, "/items/5")).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn wildcard_routes() {
    let mut router = Router::new();
    router
        .get("/validate/*", |req: Request| async move {
            req.param("path").unwrap_or_default().to_owned()
        })
        .unwrap();

    let cases = [
        (Method::GET, "/validate/foo", StatusCode::OK, "foo"),
        (Method::GET, "/validate/foo/bar", StatusCode::OK, "foo/bar"),
        (Method::GET, "/validate/foo?key=value", StatusCode::OK, "foo"),
        (Method::GET, "/foo/bar", StatusCode::NOT_FOUND, "404 page not found"),
        (Method::POST, "/validate/foo", StatusCode::METHOD_NOT_ALLOWED, "Method not allowed"),
    ];
    for (method, path, status, body) in cases {
        let got = send(&router, request(method.clone(), path)).await;
        assert_eq!(got, (status, body.to_owned()), "{method} {path}");
    }
}

#[tokio::test]
async fn invalid_template_is_rejected_at_registration() {
    let mut router = Router::new();
    let err = router.get("/users/(:id", echo_id).unwrap_err();
    assert!(matches!(err, Error::InvalidTemplate { .. }));
    assert_eq!(router.routes().count(), 0);
}

// ── Request-scoped propagation ────────────────────────────────────────────────

#[tokio::test]
async fn handler_may_borrow_the_request_across_await() {
    let mut router = Router::new();
    router.get("/greet/:name", greet_after_yield).unwrap();

    let (status, body) = send(&router, request(Method::GET, "/greet/ada")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "hello ada");
}

#[tokio::test]
async fn params_and_route_are_visible_to_the_handler() {
    let seen = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&seen);

    let mut router = Router::new();
    router
        .get("/foo/:id/bar/:desc", move |req: Request| {
            let sink = Arc::clone(&sink);
            async move {
                let route = req.route().map(|r| (r.method().clone(), r.template().to_owned()));
                let mut params: Vec<_> = req
                    .params()
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect();
                params.sort();
                *sink.lock().unwrap() = Some((route, params));
                StatusCode::NO_CONTENT
            }
        })
        .unwrap();

    let (status, _) = send(&router, request(Method::GET, "/foo/123/bar/test-1")).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (route, params) = seen.lock().unwrap().take().unwrap();
    assert_eq!(route, Some((Method::GET, "/foo/:id/bar/:desc".to_owned())));
    assert_eq!(
        params,
        vec![("desc".to_owned(), "test-1".to_owned()), ("id".to_owned(), "123".to_owned())]
    );
}

#[tokio::test]
async fn not_found_handler_sees_no_params() {
    let mut router = Router::new();
    router.not_found(|req: Request| async move {
        format!("{}:{}", req.params().len(), req.route().is_none())
    });

    let (_, body) = send(&router, request(Method::GET, "/anything")).await;
    assert_eq!(body, "0:true");
}

// ── Subrouters ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn prefix_subrouter_strips_the_prefix() {
    let mut router = Router::new();
    router
        .subrouter("/api")
        .get("/users/:id", |req: Request| async move {
            format!("{} {}", req.path(), req.param("id").unwrap_or_default())
        })
        .unwrap();

    let (status, body) = send(&router, request(Method::GET, "/api/users/123")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "/users/123 123");
}

#[tokio::test]
async fn host_subrouter_claims_any_path() {
    let mut router = Router::new();
    router
        .subrouter("www.example.com")
        .get("/example", |_req: Request| async { "Example" })
        .unwrap();
    router.get("/example", |_req: Request| async { "root" }).unwrap();

    let (_, body) = send(&router, request(Method::GET, "http://www.example.com/example")).await;
    assert_eq!(body, "Example");

    let by_header: Request = http::Request::get("/example")
        .header("host", "www.example.com")
        .body(())
        .unwrap()
        .into();
    let (_, body) = send(&router, by_header).await;
    assert_eq!(body, "Example");

    let (_, body) = send(&router, request(Method::GET, "http://other.example.com/example")).await;
    assert_eq!(body, "root");

    // Claimed by host, so the child's own 404 answers, not the parent's route.
    let (status, _) = send(&router, request(Method::GET, "http://www.example.com/missing")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn subrouters_are_probed_in_creation_order() {
    let mut router = Router::new();
    router.subrouter("/api").get("/v2/ping", |_req: Request| async { "api" }).unwrap();
    router.subrouter("/api/v2").get("/ping", |_req: Request| async { "api-v2" }).unwrap();

    for _ in 0..10 {
        let (_, body) = send(&router, request(Method::GET, "/api/v2/ping")).await;
        assert_eq!(body, "api");
    }
}

#[tokio::test]
async fn nested_subrouters_strip_each_prefix() {
    let mut router = Router::new();
    router
        .subrouter("/api")
        .subrouter("/v1")
        .get("/users/:id", |req: Request| async move { req.path().to_owned() })
        .unwrap();

    let (_, body) = send(&router, request(Method::GET, "/api/v1/users/9")).await;
    assert_eq!(body, "/users/9");
}

#[tokio::test]
async fn subrouter_inherits_custom_not_found() {
    let mut router = Router::new();
    router.not_found(|_req: Request| async { (StatusCode::NOT_FOUND, "custom") });
    router.subrouter("/api");

    let (status, body) = send(&router, request(Method::GET, "/api/missing")).await;
    assert_eq!((status, body.as_str()), (StatusCode::NOT_FOUND, "custom"));
}

// ── Body-size admission ───────────────────────────────────────────────────────

async fn echo_body(mut req: Request) -> Result<Vec<u8>, Error> {
    Ok(req.bytes().await?.to_vec())
}

fn limited_router() -> Router {
    let mut router = Router::new();
    router
        .max_body_size(1024)
        .post("/users/:id", |req: Request| async move {
            echo_body(req).await.map(Response::json)
        })
        .unwrap();
    router
}

#[tokio::test]
async fn declared_oversize_body_is_rejected_before_routing() {
    let router = limited_router();
    let body = "a".repeat(1025);
    let req = request_with_body(Method::POST, "/users/123", body);

    let (status, body) = send(&router, req).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body, "Request body too large");

    // Rejected before matching: even an unrouted path gets 413, not 404.
    let req = request_with_body(Method::GET, "/nowhere", "a".repeat(2048));
    let (status, _) = send(&router, req).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn body_at_the_limit_is_readable_in_full() {
    let router = limited_router();
    let body = "a".repeat(1024);
    let req = request_with_body(Method::POST, "/users/123", body.clone());

    let (status, echoed) = send(&router, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(echoed, body);
}

#[tokio::test]
async fn understated_length_is_cut_off_while_reading() {
    let router = limited_router();
    let req: Request = http::Request::post("/users/123")
        .header("content-length", "10")
        .body("a".repeat(2000))
        .unwrap()
        .into();

    let (status, _) = send(&router, req).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn unlimited_router_accepts_large_bodies() {
    let mut router = Router::new();
    router.post("/upload", echo_body).unwrap();

    let req = request_with_body(Method::POST, "/upload", vec![7u8; 1 << 16]);
    let res = router.serve(req).await.unwrap();
    assert_eq!(res.code(), StatusCode::OK);
    assert_eq!(res.body().len(), 1 << 16);
}

#[tokio::test]
async fn streaming_body_without_length_is_limited() {
    let router = limited_router();
    // Refused up front if the size hint survives the mapping layer, cut off
    // while reading otherwise.
    let stream = Full::new(Bytes::from(vec![b'x'; 4096])).map_frame(|frame| frame);
    let req = request_with_body(Method::POST, "/users/1", waymark::Body::new(stream));

    let (status, _) = send(&router, req).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
}

// ── Faults ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn handler_error_propagates_without_recovery() {
    let mut router = Router::new();
    router
        .get("/fail", |_req: Request| async {
            Err::<Response, _>(Error::handler("database unavailable"))
        })
        .unwrap();

    let err = router.serve(request(Method::GET, "/fail")).await.unwrap_err();
    assert_eq!(err.to_string(), "handler failed: database unavailable");
}

#[tokio::test]
async fn concurrent_dispatch_shares_one_router() {
    let mut router = Router::new();
    router.get("/users/:id", echo_id).unwrap();
    let router = Arc::new(router);

    let mut tasks = tokio::task::JoinSet::new();
    for i in 0..32 {
        let router = Arc::clone(&router);
        tasks.spawn(async move {
            let res = router.serve(request(Method::GET, &format!("/users/{i}"))).await.unwrap();
            (i, String::from_utf8(res.body().to_vec()).unwrap())
        });
    }
    while let Some(joined) = tasks.join_next().await {
        let (i, body) = joined.unwrap();
        assert_eq!(body, i.to_string());
    }
}
