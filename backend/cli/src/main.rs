use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::{info, warn};

use logging::init_logger;
use nestforge_channels::{
    ChannelAdapter, SeaTalkAdapter, SeaTalkClient, SeaTalkConfig, SeaTalkWebhookConfig,
};
use nestforge_config::{load_config, NestForgeConfig};
use nestforge_core::{AnnounceTarget, NestError};
use nestforge_gateway::HttpGateway;
use nestforge_routing::resolve_main_session_alias;
use nestforge_tools::{RequesterContext, SessionsSpawnTool, SpawnRequest, StaticAnnounceTargets};

const DEFAULT_PORT: u16 = 8787;

#[derive(Parser)]
#[command(name = "nestforge")]
#[command(about = "NestForge agent spawn-and-announce runtime")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the NestForge runtime server
    Serve {
        /// Port to bind the HTTP server to
        #[arg(short, long)]
        port: Option<u16>,
        /// Path to the config file (YAML or JSON)
        #[arg(short, long, default_value = "nestforge.yaml")]
        config: PathBuf,
    },
    /// Show current runtime status
    Status {
        #[arg(short, long, default_value_t = DEFAULT_PORT)]
        port: u16,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { port, config } => {
            run_server(port.unwrap_or(DEFAULT_PORT), &config).await?;
        }
        Commands::Status { port } => {
            let client = reqwest::Client::new();
            match client
                .get(format!("http://localhost:{port}/api/health"))
                .send()
                .await
            {
                Ok(resp) => {
                    let body: serde_json::Value = resp.json().await?;
                    println!("{}", serde_json::to_string_pretty(&body)?);
                }
                Err(_) => {
                    println!("NestForge is not running on port {port}");
                }
            }
        }
    }

    Ok(())
}

#[derive(Clone)]
struct AppState {
    spawn_tool: Arc<SessionsSpawnTool>,
}

async fn run_server(port: u16, config_path: &Path) -> Result<()> {
    let config = load_config(config_path).await?;

    let logging = config.logging.clone().unwrap_or_default();
    let log_level = if logging.level.is_empty() {
        "info".to_string()
    } else {
        logging.level.clone()
    };
    init_logger(logging.dir.as_deref().map(Path::new), &log_level);

    info!(port, config = %config_path.display(), "starting NestForge runtime");

    let gateway_cfg = config.gateway.clone().unwrap_or_default();
    let gateway = Arc::new(HttpGateway::new(
        gateway_cfg.url.clone(),
        gateway_cfg.token.clone(),
    ));

    let session_cfg = config.session.clone().unwrap_or_default();
    let main = resolve_main_session_alias(session_cfg.agent_id.as_deref());
    let announce_targets = Arc::new(StaticAnnounceTargets::new(announce_bindings(&config)));

    // The operator surface spawns on behalf of the main session.
    let spawn_tool = Arc::new(SessionsSpawnTool::new(
        gateway.clone(),
        announce_targets,
        main.clone(),
        RequesterContext {
            agent_session_key: Some(main.main_key.clone()),
            agent_provider: None,
            sandboxed: session_cfg.sandboxed,
        },
    ));

    let mut router = Router::new()
        .route("/api/health", get(handle_health))
        .route("/api/spawn", post(handle_spawn))
        .with_state(AppState { spawn_tool });

    if let Some(seatalk_cfg) = config.channels.as_ref().and_then(|c| c.seatalk.as_ref()) {
        let client = Arc::new(SeaTalkClient::new(SeaTalkConfig {
            app_id: seatalk_cfg.app_id.clone(),
            app_secret: seatalk_cfg.app_secret.clone(),
            signing_secret: seatalk_cfg.signing_secret.clone(),
        }));
        let adapter = SeaTalkAdapter::new(
            SeaTalkWebhookConfig {
                webhook_path: seatalk_cfg.webhook_path.clone(),
            },
            client,
            gateway.clone(),
        );
        adapter.start().await?;
        router = router.merge(adapter.build_router());
    } else {
        warn!("no SeaTalk channel configured; webhook endpoint not mounted");
    }

    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    info!(port, "NestForge listening");
    axum::serve(listener, router).await?;
    Ok(())
}

fn announce_bindings(config: &NestForgeConfig) -> HashMap<String, AnnounceTarget> {
    config
        .session
        .as_ref()
        .map(|session| {
            session
                .announce_targets
                .iter()
                .map(|(key, target)| {
                    (
                        key.clone(),
                        AnnounceTarget {
                            provider: target.provider.clone(),
                            to: target.to.clone(),
                            account_id: target.account_id.clone(),
                        },
                    )
                })
                .collect()
        })
        .unwrap_or_default()
}

async fn handle_health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn handle_spawn(
    State(state): State<AppState>,
    Json(request): Json<SpawnRequest>,
) -> impl IntoResponse {
    match state.spawn_tool.spawn(request).await {
        Ok(result) => (StatusCode::OK, Json(serde_json::to_value(&result).unwrap_or_default()))
            .into_response(),
        Err(NestError::InvalidArgument(message)) => (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": message })),
        )
            .into_response(),
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": err.to_string() })),
        )
            .into_response(),
    }
}
