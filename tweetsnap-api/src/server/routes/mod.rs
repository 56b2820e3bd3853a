use crate::server::ServerRouter;
use axum::{Router, routing::get};

mod tweet;

pub fn routes() -> ServerRouter {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .merge(tweet::routes())
}
