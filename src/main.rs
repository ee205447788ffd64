//! Demo server for the waymark router.
//!
//! # Startup Order
//! ```text
//! CLI args → config file (optional) → logging → metrics exporter
//!     → route table (fails fast on a bad rule) → listener → serve
//!     → SIGINT/SIGTERM → drain → exit
//! ```

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use serde::Serialize;
use tokio::net::TcpListener;

use waymark::config::{load_config, ServerConfig};
use waymark::lifecycle::signals::spawn_signal_listener;
use waymark::middleware;
use waymark::observability::{logging, metrics};
use waymark::{App, Handler, HttpServer, RouteError, Router, Shutdown, StatusCode};

#[derive(Parser, Debug)]
#[command(name = "waymark", version, about = "Demo HTTP server built on the waymark router")]
struct Cli {
    /// Path to a TOML config file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,

    /// Print the route table and exit.
    #[arg(long)]
    print_routes: bool,
}

#[derive(Serialize)]
struct User<'a> {
    id: u64,
    name: &'a str,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }

    logging::init(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "waymark starting");

    let app = build_app(&config)?;

    if cli.print_routes {
        print!("{}", app);
        return Ok(());
    }

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to install metrics exporter");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(
        address = %listener.local_addr()?,
        request_timeout_secs = config.timeouts.request_secs,
        max_body_bytes = config.listener.max_body_bytes,
        "Listening for connections"
    );

    let shutdown = Shutdown::new();
    spawn_signal_listener(shutdown.clone());

    let server = HttpServer::new(app, &config);
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

fn build_app(config: &ServerConfig) -> Result<App, RouteError> {
    let mut router = Router::new();
    router.pool_capacity(config.pool.capacity);
    if config.timeouts.handler_ms > 0 {
        router.deadline(Some(Duration::from_millis(config.timeouts.handler_ms)));
    }

    router.layer(middleware::recovery())?;
    if config.rate_limit.enabled {
        router.layer(middleware::rate_limit(&config.rate_limit))?;
    }
    if config.cors.enabled {
        router.layer(middleware::cors(&config.cors))?;
    }

    router.error_handler(
        StatusCode::NOT_FOUND,
        Handler::named("json_not_found", |ctx| {
            let path = ctx.path().to_string();
            ctx.canonical_json(StatusCode::NOT_FOUND, "no such route", &path);
        }),
    );

    router
        .get("/", Handler::named("index", |ctx| ctx.text(StatusCode::OK, "waymark")))?
        .get("/health", Handler::named("health", |ctx| {
            ctx.json(StatusCode::OK, &serde_json::json!({ "status": "ok" }));
        }))?
        .get("/static/:*", Handler::named("static_file", |ctx| {
            let file = ctx.param("*").unwrap_or_default().to_string();
            ctx.text(StatusCode::OK, file);
        }))?;

    let mut api = router.group("/api/v1");
    api.layer(middleware::timeout(Duration::from_secs(2)))?
        .get("/users/:id", Handler::named("show_user", |ctx| {
            let id = ctx.param("id").and_then(|id| id.parse::<u64>().ok());
            match id {
                Some(id) => ctx.canonical_json(StatusCode::OK, "ok", &User { id, name: "demo" }),
                None => ctx.error(StatusCode::BAD_REQUEST),
            }
        }))?
        .post("/users", Handler::named("create_user", |ctx| {
            match ctx.json_body::<serde_json::Value>() {
                Ok(body) => ctx.canonical_json(StatusCode::CREATED, "created", &body),
                Err(e) => {
                    let msg = e.to_string();
                    ctx.canonical_json(StatusCode::BAD_REQUEST, &msg, &serde_json::Value::Null);
                }
            }
        }))?
        .get("/search", Handler::named("search", |ctx| {
            let q = ctx.query("q").unwrap_or_default();
            ctx.canonical_json(StatusCode::OK, "ok", &q);
        }))?;

    Ok(router.build())
}
