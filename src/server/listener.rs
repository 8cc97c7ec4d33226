use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;

use crate::config::Config;
use crate::http::connection::Connection;
use crate::pipeline::{LoggingObserver, Pipeline};
use crate::router::Router;
use crate::validation::ValidationChain;

pub async fn run(
    cfg: &Config,
    router: Arc<Router>,
    chain: Arc<ValidationChain>,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind(&cfg.server.listen_addr).await?;
    info!("Listening on {}", cfg.server.listen_addr);

    loop {
        let (socket, peer) = listener.accept().await?;
        tracing::debug!("Accepted connection from {}", peer);

        let router = router.clone();
        let chain = chain.clone();
        let limits = cfg.parser.clone();
        tokio::spawn(async move {
            let mut pipeline = Pipeline::new(router, chain, limits);
            pipeline.add_observer(Arc::new(LoggingObserver));

            let mut conn = Connection::new(socket, pipeline);
            if let Err(e) = conn.run().await {
                tracing::error!("Connection error from {}: {}", peer, e);
            }
        });
    }
}
