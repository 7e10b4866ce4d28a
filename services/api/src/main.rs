mod config;
mod error;
mod routes;
mod state;

use anyhow::{Context, Result};
use axum::Router;
use axum::routing::{get, post};
use clap::Parser;
use interview_core::interviewer::{self, InterviewerClient};
use interview_core::store::SessionStore;
use interview_speech::{SynthClient, TranscribeConfig};
use state::AppState;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::fmt::time::ChronoLocal;

#[derive(Parser)]
#[command(about = "Conversational interview backend")]
struct Cli {
    /// Address to bind, overriding BIND_ADDRESS.
    #[arg(long)]
    bind: Option<std::net::SocketAddr>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // --- 1. Load Configuration ---
    let config = config::Config::from_env().context("Failed to load application configuration")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(ChronoLocal::rfc_3339())
        .init();

    tracing::info!("Configuration loaded successfully. Starting interview service...");

    // --- 3. Parse Command-Line Arguments ---
    let args = Cli::parse();
    let bind_address = args.bind.unwrap_or(config.bind_address);

    // --- 4. Pick a Working Chat Model ---
    let model = interviewer::find_working_model(
        &config.llm_api_key,
        &config.llm_base_url,
        &config.chat_models,
    )
    .await
    .context("no working chat model found, check the API key and model list")?;
    tracing::info!(%model, "using chat model");

    // --- 5. Build Application State ---
    let interviewer_client = InterviewerClient::with_base_url(
        config.llm_api_key.clone(),
        model.clone(),
        config.llm_base_url.clone(),
    );
    let synthesizer = SynthClient::with_base_url(
        config.llm_api_key.clone(),
        config.tts_model.clone(),
        config.llm_base_url.clone(),
    );
    let transcribe = TranscribeConfig::new(
        config.transcribe_host.clone(),
        config.transcribe_api_key.clone(),
    );

    let state = Arc::new(AppState {
        store: Mutex::new(SessionStore::new(
            config::SESSION_CAPACITY,
            chrono::Duration::minutes(config::SESSION_TTL_MINUTES),
        )),
        interviewer: Arc::new(interviewer_client),
        synthesizer: Arc::new(synthesizer),
        capture: Mutex::new(None),
        transcribe,
        chat_model: model,
        default_speaker: config.default_speaker.clone(),
    });

    // --- 6. Build the Router ---
    // Permissive CORS so a separate frontend can reach the API.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/", get(routes::interview::index))
        .route("/tts", post(routes::speech::tts))
        .route("/stt", get(routes::speech::stt))
        .route("/stt/stop", post(routes::speech::stt_stop))
        .route(
            "/api/start-interview",
            post(routes::interview::start_interview),
        )
        .route("/api/respond", post(routes::interview::respond))
        .route(
            "/api/end-interview/{session_id}",
            post(routes::interview::end_interview),
        )
        .route(
            "/api/interview-status/{session_id}",
            get(routes::interview::interview_status),
        )
        .route("/api/health", get(routes::interview::health))
        .route("/api/models", get(routes::interview::models))
        .layer(cors)
        .with_state(state);

    // --- 7. Serve ---
    tracing::info!("Starting interview server, listening on {}", bind_address);
    let listener = tokio::net::TcpListener::bind(bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
