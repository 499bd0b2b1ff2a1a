mod server;

use crate::server::{ServerState, moderation::ModerationClient};
use infohero_common::snowflake::{ProcessId, SnowflakePartOutOfRangeError, WorkerId};
use infohero_db::client::{DbClient, DbError};
use serde::Deserialize;
use std::{
    net::{IpAddr, SocketAddr},
    sync::Arc,
};
use thiserror::Error;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Error)]
enum InitError {
    #[error("Error parsing .env file: {0}")]
    Dotenv(#[from] dotenvy::Error),
    #[error("Error parsing environment: {0}")]
    Envy(#[from] envy::Error),
    #[error("Snowflake worker/process id out of range: {0}")]
    SnowflakePart(#[from] SnowflakePartOutOfRangeError<u8>),
    #[error("Error setting up the database: {0}")]
    Database(#[from] DbError),
    #[error("Error building the moderation client: {0}")]
    ModerationClient(#[from] reqwest::Error),
    #[error("Error binding tcp listener: {0}")]
    TcpBind(std::io::Error),
    #[error("Error serving server: {0}")]
    TcpServe(std::io::Error),
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
struct Env {
    server_address: IpAddr,
    server_port: u16,
    database_url: String,
    moderation_url: String,
    snowflake_worker_id: u8,
    snowflake_process_id: u8,
}

fn install_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "infohero_api=debug,infohero_common=debug,infohero_db=debug,\
                tower_http=debug,axum::rejection=trace,sqlx=debug"
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

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "Failed to listen for the shutdown signal");
    }
}

#[tokio::main]
async fn main() -> Result<(), InitError> {
    install_tracing();
    let env = get_env()?;

    let worker_id = WorkerId::try_from(env.snowflake_worker_id)?;
    let process_id = ProcessId::try_from(env.snowflake_process_id)?;

    let db_client = DbClient::connect(&env.database_url, worker_id, process_id).await?;
    let moderation = ModerationClient::new(&env.moderation_url)?;

    let state = ServerState {
        db_client: Arc::new(db_client),
        moderation: Arc::new(moderation),
    };

    let app = server::routes()
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let server_address = SocketAddr::new(env.server_address, env.server_port);
    let listener = tokio::net::TcpListener::bind(server_address)
        .await
        .map_err(InitError::TcpBind)?;
    info!(%server_address, "Listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(InitError::TcpServe)?;

    Ok(())
}
