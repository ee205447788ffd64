//! End-to-end tests against a live listener and through the Axum router.

use std::time::Duration;

use axum::body::Body;
use axum::http::Request;
use tower::ServiceExt;

use waymark::{middleware, Handler, HttpServer, RouteError, Router, ServerConfig, StatusCode};

mod common;
use common::{body_text, client, echo_params, reply, spawn_server};

fn app() -> Result<waymark::App, RouteError> {
    let mut router = Router::new();
    router
        .layer(middleware::recovery())?
        .get("/hello", reply("hello", "world"))?
        .get("/users/:id", echo_params("user"))?
        .get("/whoami", Handler::named("whoami", |ctx| {
            let ip = ctx.client_ip().unwrap_or_default();
            ctx.text(StatusCode::OK, ip);
        }))?
        .post("/echo", Handler::named("echo", |ctx| {
            let body = ctx.body().clone();
            ctx.status(StatusCode::OK);
            ctx.write(body);
        }))?
        .get("/panic", Handler::named("panic", |_ctx| panic!("boom")))?;
    Ok(router.build())
}

#[tokio::test]
async fn test_live_server_round_trip() -> Result<(), RouteError> {
    let (addr, shutdown) = spawn_server(app()?, ServerConfig::default()).await;
    let client = client();

    let res = client.get(format!("http://{addr}/hello")).send().await.unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "world");

    let res = client.get(format!("http://{addr}/users/12")).send().await.unwrap();
    assert_eq!(res.text().await.unwrap(), "id=12");

    let res = client.get(format!("http://{addr}/whoami")).send().await.unwrap();
    assert_eq!(res.text().await.unwrap(), "127.0.0.1");

    let res = client.get(format!("http://{addr}/missing")).send().await.unwrap();
    assert_eq!(res.status(), 404);

    let res = client.delete(format!("http://{addr}/hello")).send().await.unwrap();
    assert_eq!(res.status(), 405);
    assert_eq!(res.headers().get("allow").unwrap(), "GET, HEAD");

    shutdown.trigger();
    Ok(())
}

#[tokio::test]
async fn test_panic_does_not_take_down_server() -> Result<(), RouteError> {
    let (addr, shutdown) = spawn_server(app()?, ServerConfig::default()).await;
    let client = client();

    let res = client.get(format!("http://{addr}/panic")).send().await.unwrap();
    assert_eq!(res.status(), 500);

    let res = client.get(format!("http://{addr}/hello")).send().await.unwrap();
    assert_eq!(res.status(), 200);

    shutdown.trigger();
    Ok(())
}

#[tokio::test]
async fn test_body_limit() -> Result<(), RouteError> {
    let mut config = ServerConfig::default();
    config.listener.max_body_bytes = 8;
    let router = HttpServer::new(app()?, &config).into_router();

    let small = Request::post("/echo").body(Body::from("tiny")).unwrap();
    let res = router.clone().oneshot(small).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_text(res).await, "tiny");

    let large = Request::post("/echo").body(Body::from("far too large")).unwrap();
    let res = router.oneshot(large).await.unwrap();
    assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);
    Ok(())
}

#[tokio::test]
async fn test_unrecovered_panic_becomes_500() {
    let mut router = Router::new();
    router
        .get("/raw-panic", Handler::named("raw_panic", |_ctx| panic!("no recovery here")))
        .unwrap();
    let router = HttpServer::new(router.build(), &ServerConfig::default()).into_router();

    let req = Request::get("/raw-panic").body(Body::empty()).unwrap();
    let res = router.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_graceful_shutdown_stops_accepting() -> Result<(), RouteError> {
    let (addr, shutdown) = spawn_server(app()?, ServerConfig::default()).await;
    let client = client();

    let res = client.get(format!("http://{addr}/hello")).send().await.unwrap();
    assert_eq!(res.status(), 200);

    shutdown.trigger();
    tokio::time::sleep(Duration::from_millis(200)).await;

    let result = client
        .get(format!("http://{addr}/hello"))
        .timeout(Duration::from_secs(1))
        .send()
        .await;
    assert!(result.is_err());
    Ok(())
}
