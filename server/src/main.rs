//! Ringline Server binary

use std::sync::Arc;

use clap::{Parser, Subcommand};
use ringline_core::PushDispatchRequest;
use ringline_server::{config::Config, router, AppState};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Ringline Server CLI
#[derive(Parser)]
#[command(name = "ringline-server")]
#[command(about = "Call signaling server: wake-up pushes and relay credentials")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the server
    Run,

    /// Report which provider credentials are configured
    CheckConfig,

    /// Send one wake-up push through the dispatch path
    SendTestPush {
        /// User whose registered device should ring
        #[arg(long)]
        callee_id: String,

        #[arg(long, default_value = "ringline-test")]
        caller_id: String,

        #[arg(long, default_value = "Test Call")]
        caller_name: String,

        #[arg(long)]
        video: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "ringline_server=info,tower_http=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let config = Arc::new(Config::load(&cli.config).await?);

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_server(config).await?,
        Commands::CheckConfig => check_config(&config),
        Commands::SendTestPush {
            callee_id,
            caller_id,
            caller_name,
            video,
        } => send_test_push(config, &callee_id, &caller_id, &caller_name, video).await?,
    }

    Ok(())
}

fn check_config(config: &Config) {
    println!("=== Ringline Configuration ===");
    println!("Listen: {}:{}", config.server.host, config.server.port);
    println!("Database: {}", config.storage.database_path);

    match config.apns.credentials() {
        Ok(creds) => println!(
            "APNs: configured (team {}, key {}, {:?}, topic {}.voip)",
            creds.team_id, creds.key_id, creds.environment, creds.bundle_id
        ),
        Err(missing) => println!("APNs: NOT configured ({})", missing),
    }

    match config.relay.api_key() {
        Some(_) => println!("Relay: configured ({})", config.relay.provider_url),
        None => println!("Relay: NOT configured (api_key missing)"),
    }

    println!("Identity provider: {}", config.auth.url);
}

async fn send_test_push(
    config: Arc<Config>,
    callee_id: &str,
    caller_id: &str,
    caller_name: &str,
    video: bool,
) -> anyhow::Result<()> {
    let state = AppState::from_config(config).await?;

    let call_id = uuid::Uuid::new_v4().to_string();
    let request = PushDispatchRequest::new(callee_id, caller_id, &call_id)
        .with_caller_name(caller_name)
        .video(video);

    let response = state
        .dispatcher
        .dispatch(request)
        .await?
        .into_response();

    println!("Call {}: sent={}", call_id, response.sent);
    if let Some(error) = response.error {
        println!("Reason: {}", error);
    }

    Ok(())
}

async fn run_server(config: Arc<Config>) -> anyhow::Result<()> {
    tracing::info!("Starting Ringline Server v{}", env!("CARGO_PKG_VERSION"));

    if let Err(missing) = config.apns.credentials() {
        tracing::warn!("Wake-up pushes will fail: {}", missing);
    }
    if config.relay.api_key().is_none() {
        tracing::warn!("Relay credentials will fail: relay api_key is not configured");
    }

    let state = AppState::from_config(config.clone()).await?;
    let app = router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!("Listening on {}", addr);

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
