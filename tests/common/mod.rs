//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::body::{Body, Bytes};
use axum::http::{Method, Request, Response};
use tokio::net::TcpListener;

use waymark::{App, Handler, HttpServer, ServerConfig, Shutdown, StatusCode};

/// Build a bodiless request.
pub fn request(method: Method, uri: &str) -> Request<Bytes> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Bytes::new())
        .unwrap()
}

/// Collect a response body as UTF-8 text.
pub async fn body_text(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Terminal handler answering 200 with `body`.
pub fn reply(name: &'static str, body: &'static str) -> Handler {
    Handler::named(name, move |ctx| ctx.text(StatusCode::OK, body))
}

/// Terminal handler echoing every captured param as `k=v` pairs.
pub fn echo_params(name: &'static str) -> Handler {
    Handler::named(name, |ctx| {
        let pairs: Vec<String> = ctx.params().iter().map(|(k, v)| format!("{k}={v}")).collect();
        ctx.text(StatusCode::OK, pairs.join("&"));
    })
}

/// Middleware recording `label:before` / `label:after` around the rest of the chain.
pub fn tracer(label: &'static str, log: &Arc<Mutex<Vec<String>>>) -> Handler {
    let log = Arc::clone(log);
    Handler::named(label, move |ctx| {
        log.lock().unwrap().push(format!("{label}:before"));
        ctx.next();
        log.lock().unwrap().push(format!("{label}:after"));
    })
}

/// Serve `app` on an ephemeral port. Returns the bound address and the
/// shutdown handle that stops it.
pub async fn spawn_server(app: App, config: ServerConfig) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();
    let server = HttpServer::new(app, &config);
    tokio::spawn(async move {
        let _ = server.run(listener, rx).await;
    });

    (addr, shutdown)
}

/// HTTP client without pooling or proxies, so each test sees fresh connections.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
