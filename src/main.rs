//! DU Desk - CUET (UG) counselling chat assistant
//!
//! Serves the guided chat sessions and the streaming chat endpoint that
//! answers free-text questions from the reference datasets.

mod accumulator;
mod api;
mod chat;
mod config;
mod llm;
mod protocol;
mod render;
mod runtime;
mod sanitize;
mod state_machine;
mod system_prompt;
mod transcript;

use api::{create_router, AppState};
use chat::ChatService;
use config::AppConfig;
use llm::{GeminiService, LlmService, LoggingService};
use runtime::{
    ChatEndpoint, DisabledChatEndpoint, HttpChatEndpoint, LocalChatEndpoint, RuntimeManager,
    SessionDefaults,
};
use std::net::SocketAddr;
use std::sync::Arc;
use system_prompt::ReferenceData;
use tower_http::{
    compression::{
        predicate::{DefaultPredicate, NotForContentType, Predicate},
        CompressionLayer,
    },
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dudesk=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    let config = AppConfig::from_env()?;

    // The built-in chat endpoint needs a model key and the datasets
    let chat = match &config.gemini_api_key {
        Some(key) => {
            tracing::info!(path = %config.data_dir.display(), "Loading reference data");
            let data = ReferenceData::load(&config.data_dir)?;
            let gemini: Arc<dyn LlmService> = Arc::new(GeminiService::new(
                key,
                &config.gemini_model,
                Some(config.gemini_base_url.as_str()),
            )?);
            let llm = Arc::new(LoggingService::new(gemini));
            tracing::info!(
                model = %llm.model_id(),
                updates = data.has_updates(),
                "Chat endpoint enabled"
            );
            Some(Arc::new(ChatService::new(llm, data)))
        }
        None => None,
    };

    // Where session replies come from
    let endpoint: Arc<dyn ChatEndpoint> = match (&config.chat_endpoint, &chat) {
        (Some(url), _) => {
            tracing::info!(url = %url, "Using remote chat endpoint");
            Arc::new(HttpChatEndpoint::new(url.as_str())?)
        }
        (None, Some(service)) => Arc::new(LocalChatEndpoint::new(Arc::clone(service))),
        (None, None) => {
            tracing::warn!(
                "No GEMINI_API_KEY or DUDESK_CHAT_ENDPOINT configured; free-text questions will get the fallback reply"
            );
            Arc::new(DisabledChatEndpoint)
        }
    };

    let runtime = RuntimeManager::new(
        endpoint,
        SessionDefaults {
            sanitize: config.sanitize.clone(),
            theme: config.theme.clone(),
            username: config.username.clone(),
            idle_timeout: config.session_idle_timeout,
        },
    );
    let state = AppState::new(runtime, chat);

    // Create router
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let compression = CompressionLayer::new()
        .gzip(true)
        .br(true)
        .deflate(true)
        .zstd(true)
        // Data stream replies must reach the client as they are produced
        .compress_when(DefaultPredicate::new().and(NotForContentType::const_new("text/plain")));

    let app = create_router(state)
        .layer(cors)
        .layer(compression)
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("DU Desk server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
