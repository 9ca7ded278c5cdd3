use std::{
    env,
    net::{Ipv6Addr, SocketAddr},
    sync::Arc,
};

use axum::routing::get;
use karatu_collab::{Karatu, PgDatabase};
use log::info;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

mod auth;
mod context;
mod contributions;
mod curriculum;
mod docs;
mod errors;
mod lessons;
mod progress;
mod schemas;
mod serialized;
mod tracks;

pub use context::ServerContext;
pub use errors::{ServerError, ServerResult};

/// The default port the server will listen on.
pub const DEFAULT_PORT: u16 = 9050;

pub type Router = axum::Router<ServerContext>;

/// Starts the karatu server
pub async fn run_server(karatu: Arc<Karatu<PgDatabase>>) {
    let port = env::var("KARATU_SERVER_PORT")
        .map(|x| x.parse::<u16>().expect("Port must be a number"))
        .unwrap_or(DEFAULT_PORT);

    let addr: SocketAddr = (Ipv6Addr::UNSPECIFIED, port).into();

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let context = ServerContext { karatu };

    let version_one_router = Router::new()
        .nest("/auth", auth::router())
        .nest("/tracks", tracks::router())
        .nest("/lessons", lessons::router())
        .nest("/contributions", contributions::router())
        .nest("/curriculum", curriculum::router())
        .merge(progress::router());

    let root_router = Router::new()
        .nest("/v1", version_one_router)
        .route("/api.json", get(docs::docs))
        .layer(cors)
        .with_state(context);

    let listener = TcpListener::bind(&addr).await.expect("listens on address");

    info!("Listening on port {}", port);

    axum::serve(listener, root_router.into_make_service())
        .await
        .expect("serves requests");
}
