use std::sync::Arc;

use keystone::config::Config;
use keystone::router::Router;
use keystone::server::listener;
use keystone::validation::ValidationChain;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    let cfg = Config::load()?;
    let router = Arc::new(build_router());
    let chain = Arc::new(ValidationChain::with_defaults(&cfg.security));

    tokio::select! {
        res = listener::run(&cfg, router, chain) => {
            res?;
        }

        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}

fn build_router() -> Router {
    let mut router = Router::new();

    router.get("/", |_, resp, _| {
        resp.headers.set("Content-Type", "text/plain");
        resp.body = b"keystone is running\n".to_vec();
        true
    });

    router.post("/echo", |req, resp, _| {
        if let Some(content_type) = req.headers.get("Content-Type") {
            resp.headers.set("Content-Type", content_type);
        }
        resp.body = req.body.clone();
        true
    });

    router.get("/greet/:name", |_, resp, params| {
        let name = params.param("name").unwrap_or("stranger");
        resp.headers.set("Content-Type", "text/plain");
        resp.body = format!("Hello, {name}!\n").into_bytes();
        true
    });

    router.get("/files/*", |_, resp, params| {
        resp.headers.set("Content-Type", "text/plain");
        resp.body = format!("requested: {}\n", params.wildcard_parts().join("/")).into_bytes();
        true
    });

    router
}
