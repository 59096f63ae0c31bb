use axum::{Extension, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

mod config;
mod flux_client;
mod gmail_client;
mod handlers;
mod middleware;
mod openai_client;
mod runway_client;
mod sheets_client;
mod tasks;
mod workflow;

use config::Credentials;
use tasks::{SharedTaskStore, TaskStore};
use workflow::{ActivityLog, ImageGenerator, Notifier, PovWorkflow, PromptGenerator, VideoGenerator};

// AppState holds the task registry, the workflow orchestrator, and the
// credential presence report served by /api/credentials
pub struct AppState {
    pub task_store: SharedTaskStore,
    pub workflow: Arc<PovWorkflow>,
    pub credentials: Credentials,
}

#[tokio::main]
async fn main() {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    init_logging().expect("Failed to initialize logging");

    let credentials = Credentials::from_env();

    // Mandatory stages: prompt expansion and video rendering. A missing key
    // leaves the client unset; the orchestrator fails such tasks up front.
    let prompts: Option<Arc<dyn PromptGenerator>> = match credentials.openai_api_key.clone() {
        Some(api_key) => {
            tracing::info!("Initializing OpenAI client (gpt-4)...");
            Some(Arc::new(openai_client::OpenAiClient::new(api_key)))
        }
        None => {
            tracing::warn!("OPENAI_API_KEY not found. Prompt expansion will be unavailable.");
            None
        }
    };

    let videos: Option<Arc<dyn VideoGenerator>> = match credentials.runwayml_api_key.clone() {
        Some(api_key) => {
            tracing::info!("Initializing RunwayML client...");
            Some(Arc::new(runway_client::RunwayClient::new(api_key)))
        }
        None => {
            tracing::warn!("RUNWAYML_API_KEY not found. Video rendering will be unavailable.");
            None
        }
    };

    // The image stage runs with or without a HuggingFace key.
    let images: Arc<dyn ImageGenerator> =
        Arc::new(flux_client::FluxClient::new(credentials.huggingface_api_key.clone()));

    // Optional stages: missing configuration silently disables them.
    let sheet: Option<Arc<dyn ActivityLog>> = match (
        credentials.google_api_token.clone(),
        credentials.google_spreadsheet_id.clone(),
    ) {
        (Some(token), Some(spreadsheet_id)) => {
            tracing::info!("Initializing Google Sheets activity log...");
            Some(Arc::new(sheets_client::SheetsClient::new(token, spreadsheet_id)))
        }
        _ => {
            tracing::warn!(
                "GOOGLE_API_BEARER_TOKEN or GOOGLE_SPREADSHEET_ID not set. Spreadsheet logging disabled."
            );
            None
        }
    };

    let mail: Option<Arc<dyn Notifier>> = match (
        credentials.google_api_token.clone(),
        credentials.gmail_recipient.clone(),
    ) {
        (Some(token), Some(recipient)) => {
            tracing::info!("Initializing Gmail notifications for {}...", recipient);
            Some(Arc::new(gmail_client::GmailClient::new(token, recipient)))
        }
        _ => {
            tracing::warn!(
                "GOOGLE_API_BEARER_TOKEN or GMAIL_RECIPIENT not set. Email notifications disabled."
            );
            None
        }
    };

    let task_store: SharedTaskStore = Arc::new(TaskStore::new());
    let pov_workflow = Arc::new(PovWorkflow {
        store: task_store.clone(),
        prompts,
        images,
        videos,
        sheet,
        mail,
    });

    let shared_state = Arc::new(AppState {
        task_store,
        workflow: pov_workflow,
        credentials,
    });

    let app = Router::new()
        .merge(handlers::generate::generate_routes())
        .merge(handlers::tasks::task_routes())
        .merge(handlers::system::system_routes())
        .layer(axum::middleware::from_fn(middleware::logging::request_logging_middleware))
        .layer(CorsLayer::permissive())
        .layer(Extension(shared_state));

    let port = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(5001);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .expect("Failed to bind server port");
    tracing::info!("🚀 POV video backend listening on 0.0.0.0:{}", port);
    axum::serve(listener, app).await.expect("Server error");
}

fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, fmt, Layer};

    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cfg!(debug_assertions) {
            "debug,pov_video_generator=trace,reqwest=info,hyper=info,tower=info".to_string()
        } else {
            "info,pov_video_generator=info,reqwest=warn,hyper=warn,tower=warn".to_string()
        }
    });

    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&log_level))?;

    let fmt_layer = if std::env::var("LOG_FORMAT").as_deref() == Ok("json") {
        // JSON logging for production log aggregation
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_target(true)
            .boxed()
    } else {
        // Human-readable logging for development
        fmt::layer()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("🎬 POV video generator starting up...");
    tracing::info!("Version: {}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Log level: {}", log_level);

    Ok(())
}
