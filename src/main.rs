//! Genie Chat entry point
//!
//! `genie-chat serve` runs the backend relay; `genie-chat chat` starts the
//! interactive terminal client against a running relay.

use std::net::SocketAddr;

use axum::Router;
use clap::{Parser, Subcommand};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use genie_chat::chat;
use genie_chat::config::Config;
use genie_chat::routes;

#[derive(Parser)]
#[command(name = "genie-chat", version, about = "Chat with your data through Databricks Genie")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the backend relay server
    Serve {
        /// Bind host
        #[arg(long, env = "HOST")]
        host: Option<String>,
        /// Bind port
        #[arg(long, env = "PORT")]
        port: Option<u16>,
    },
    /// Start the interactive chat client
    Chat {
        /// Relay base URL
        #[arg(long, env = "GENIE_RELAY_URL")]
        relay_url: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "genie_chat=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env()?;

    match cli.command {
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }
            serve(config).await
        }
        Commands::Chat { relay_url } => {
            if let Some(url) = relay_url {
                config.relay_url = url;
            }
            chat::run_chat(config).await
        }
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    let app = Router::new()
        .merge(routes::router())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(config);

    tracing::info!("🧞 Genie relay running at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
