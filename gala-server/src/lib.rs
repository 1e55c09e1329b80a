use std::{
    io,
    net::{Ipv6Addr, SocketAddr},
    sync::Arc,
};

use axum::routing::get;
use gala_collab::Gala;
use log::{error, info};
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

mod auth;
mod config;
mod context;
mod docs;
mod errors;
mod guests;
mod items;
mod journal;
mod live;
mod parties;
mod purchases;
mod schemas;
mod tables;

pub use config::*;

use context::ServerContext;

pub type Router = axum::Router<ServerContext>;

/// Starts the gala server and serves until Ctrl-C is pressed
pub async fn run_server(gala: Arc<Gala>, config: &ServerConfig) -> io::Result<()> {
    let addr: SocketAddr = (Ipv6Addr::UNSPECIFIED, config.port).into();

    let origin = match &config.allowed_origin {
        Some(origin) => AllowOrigin::exact(origin.clone()),
        None => AllowOrigin::any(),
    };

    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(Any)
        .allow_headers(Any);

    let context = ServerContext { gala: gala.clone() };

    let root_router = Router::new()
        .merge(journal::router())
        .merge(live::router())
        .merge(tables::router())
        .merge(parties::router())
        .merge(guests::router())
        .merge(items::router())
        .merge(purchases::router())
        .route("/api.json", get(docs::docs))
        .layer(cors)
        .with_state(context);

    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, root_router)
        .with_graceful_shutdown(shutdown_signal(gala))
        .await
}

/// Resolves on Ctrl-C, after closing every live connection so the server can drain
async fn shutdown_signal(gala: Arc<Gala>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Cannot listen for Ctrl-C, shut down by other means: {e}");
        std::future::pending::<()>().await;
    }

    info!("Shutting down");
    gala.shutdown();
}
