//! Farah Halal-Travel Assistant Server
//!
//! A thin wrapper around farah-core that serves the chat API over HTTP and
//! offers a one-shot `ask` mode for the command line.

mod routes;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use farah_core::{ChatRequest, Credentials, Dispatcher, FarahConfig};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "farah")]
#[command(about = "Muslim-friendly travel assistant")]
struct Args {
    /// Path to a farah.toml configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Command {
    /// Run the HTTP server (default)
    Serve {
        /// Listen host, overrides [server] host
        #[arg(long)]
        host: Option<String>,

        /// Listen port, overrides [server] port
        #[arg(long)]
        port: Option<u16>,
    },

    /// Run one chat turn and print the reply
    Ask {
        /// User message
        message: String,

        /// Conversation thread id
        #[arg(long, default_value = "cli")]
        thread: String,

        /// Latitude for "near me" queries
        #[arg(long, requires = "lng", allow_hyphen_values = true)]
        lat: Option<f64>,

        /// Longitude for "near me" queries
        #[arg(long, requires = "lat", allow_hyphen_values = true)]
        lng: Option<f64>,

        /// Try the reference documents first, like /chat_with_file
        #[arg(long = "with-file")]
        with_file: bool,
    },
}

// ============================================================================
// Main
// ============================================================================

fn init_tracing() {
    // Logs go to stderr so `ask` output stays clean on stdout
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "farah_core=info,farah_server=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if missing)
    dotenvy::dotenv().ok();
    init_tracing();

    let args = Args::parse();
    let config = FarahConfig::load(args.config.as_deref())?;
    let credentials = Credentials::from_env()?;
    let dispatcher = Arc::new(
        Dispatcher::from_config(&config, &credentials).context("Failed to start dispatcher")?,
    );

    let command = args.command.unwrap_or(Command::Serve {
        host: None,
        port: None,
    });

    match command {
        Command::Serve { host, port } => serve(&config, dispatcher, host, port).await,
        Command::Ask {
            message,
            thread,
            lat,
            lng,
            with_file,
        } => {
            let mut request = ChatRequest::new(thread, message);
            if let (Some(lat), Some(lng)) = (lat, lng) {
                request = request.at(lat, lng);
            }
            let reply = if with_file {
                dispatcher.handle_with_documents(&request).await
            } else {
                dispatcher.handle(&request).await
            };
            println!("{}", reply);
            Ok(())
        }
    }
}

async fn serve(
    config: &FarahConfig,
    dispatcher: Arc<Dispatcher>,
    host: Option<String>,
    port: Option<u16>,
) -> Result<()> {
    let host = host.unwrap_or_else(|| config.server.host.clone());
    let port = port.unwrap_or(config.server.port);

    let state = routes::AppState {
        dispatcher,
        static_dir: config.server.static_dir.clone(),
    };
    let app = routes::build_router(state);

    let listener = tokio::net::TcpListener::bind((host.as_str(), port))
        .await
        .with_context(|| format!("Failed to bind to {}:{}", host, port))?;

    tracing::info!("Farah server running on http://{}:{}", host, port);
    tracing::info!("Static files from: {}", config.server.static_dir.display());

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
