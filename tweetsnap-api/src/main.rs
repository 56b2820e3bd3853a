use crate::server::{JsonMode, ServerState};
use serde::Deserialize;
use std::{
    net::{IpAddr, SocketAddr},
    path::PathBuf,
    sync::Arc,
    time::Duration,
};
use thiserror::Error;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tweetsnap_render::{
    ChromiumLauncher, EmbeddedTweet, RenderOptions, RenderPipeline, Viewport,
};
use tweetsnap_syndication::{SyndicationClient, SyndicationError};
use url::Url;

mod server;

#[derive(Debug, Error)]
enum InitError {
    #[error("Error parsing .env file: {0}")]
    Dotenv(#[from] dotenvy::Error),
    #[error("Error parsing environment: {0}")]
    Envy(#[from] envy::Error),
    #[error("Error setting up syndication client: {0}")]
    Syndication(#[from] SyndicationError),
    #[error("Error binding tcp listener: {0}")]
    TcpBind(std::io::Error),
    #[error("Error serving server: {0}")]
    TcpServe(std::io::Error),
}

#[derive(Clone, Eq, PartialEq, Debug, Deserialize)]
struct Env {
    server_address: IpAddr,
    server_port: u16,
    #[serde(default)]
    json_mode: JsonMode,
    syndication_url: Option<Url>,
    #[serde(default = "default_upstream_timeout_ms")]
    upstream_timeout_ms: u64,
    #[serde(default = "default_render_timeout_ms")]
    render_timeout_ms: u64,
    #[serde(default = "default_settle_ms")]
    settle_ms: u64,
    chrome_executable: Option<PathBuf>,
    #[serde(default = "default_chrome_args")]
    chrome_args: Vec<String>,
}

fn default_upstream_timeout_ms() -> u64 {
    5000
}

fn default_render_timeout_ms() -> u64 {
    8000
}

fn default_settle_ms() -> u64 {
    1000
}

fn default_chrome_args() -> Vec<String> {
    [
        "--no-sandbox",
        "--disable-gpu",
        "--disable-dev-shm-usage",
        "--hide-scrollbars",
    ]
    .map(str::to_owned)
    .to_vec()
}

fn install_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "tweetsnap_api=debug,\
                tweetsnap_syndication=debug,\
                tweetsnap_render=debug,\
                tower_http=debug,axum::rejection=trace"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn get_env() -> Result<Env, InitError> {
    if let Err(e) = dotenvy::dotenv() {
        if e.not_found() {
            debug!("No .dotenv file found");
        } else {
            return Err(e.into());
        }
    }

    envy::from_env().map_err(InitError::from)
}

fn server_state(env: Env) -> Result<ServerState, InitError> {
    let upstream_timeout = Duration::from_millis(env.upstream_timeout_ms);
    let syndication = match &env.syndication_url {
        Some(url) => SyndicationClient::new(url, upstream_timeout)?,
        None => SyndicationClient::default_endpoint(upstream_timeout)?,
    };

    let launcher = ChromiumLauncher::new(env.chrome_executable, env.chrome_args);
    let options = RenderOptions {
        viewport: Viewport::EMBED,
        settle: Duration::from_millis(env.settle_ms),
        timeout: Duration::from_millis(env.render_timeout_ms),
    };
    let renderer = RenderPipeline::new(Arc::new(launcher), Arc::new(EmbeddedTweet), options);

    Ok(ServerState {
        syndication: Arc::new(syndication),
        renderer: Arc::new(renderer),
        json_mode: env.json_mode,
    })
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "Could not listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "Could not listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutting down");
}

#[tokio::main]
async fn main() -> Result<(), InitError> {
    install_tracing();
    let env = get_env()?;
    let server_address = SocketAddr::new(env.server_address, env.server_port);
    let json_mode = env.json_mode;

    let state = server_state(env)?;
    let app = server::routes()
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(server_address)
        .await
        .map_err(InitError::TcpBind)?;
    info!(%server_address, ?json_mode, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(InitError::TcpServe)?;

    Ok(())
}
