//! HTTP server implementation for the API

use anyhow::Result;
use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

use super::{handlers, models::*};
use crate::audio::AudioExtractor;
use crate::config::Config;
use crate::llm::{create_llm, quiz::QuizGenerator, summary::Summarizer, LLM};
use crate::text::TextCleaner;
use crate::transcription::VoskTranscriber;

/// Shared application state
///
/// All collaborators are built once at startup and injected into handlers;
/// nothing is lazily constructed per request.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub llm: Arc<Box<dyn LLM>>,
    pub summarizer: Arc<Summarizer>,
    pub cleaner: Arc<TextCleaner>,
    pub transcriber: Arc<VoskTranscriber>,
    pub audio: Arc<AudioExtractor>,
}

impl AppState {
    pub fn new(config: Arc<Config>) -> Result<Self> {
        let llm = Arc::new(create_llm(&config.llm)?);
        let summarizer = Arc::new(Summarizer::new(config.summary.clone()));
        let cleaner = Arc::new(TextCleaner::new()?);
        let transcriber = Arc::new(VoskTranscriber::with_executable(
            config.transcription.model_path.clone(),
            config.transcription.executable.clone(),
        ));
        let audio = Arc::new(AudioExtractor::new(config.audio.sample_rate));

        Ok(Self {
            config,
            llm,
            summarizer,
            cleaner,
            transcriber,
            audio,
        })
    }

    pub fn quiz_generator(&self, num_questions: Option<usize>) -> QuizGenerator {
        QuizGenerator::new(num_questions.unwrap_or(self.config.quiz.num_questions))
    }
}

/// Configure and start the HTTP server
pub async fn start_http_server(config: Arc<Config>, port: u16) -> Result<()> {
    let host = config.server.host.clone();
    let max_upload = config.server.max_upload_bytes;
    let app_state = AppState::new(config)?;

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    let app = Router::new()
        .route("/health", get(health_handler))
        .route("/transcribe", post(transcribe_handler))
        .route("/extract", post(extract_handler))
        .route("/quiz", post(quiz_handler))
        .route("/summarize", post(summarize_handler))
        .with_state(app_state)
        .layer(DefaultBodyLimit::max(max_upload))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        );

    let listener = tokio::net::TcpListener::bind(format!("{}:{}", host, port)).await?;
    info!("🌐 API server listening on http://{}:{}", host, port);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Health check handler
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let data = handlers::health_check(&state).await;
    (StatusCode::OK, Json(data)).into_response()
}

/// POST /transcribe — multipart video upload
async fn transcribe_handler(
    State(state): State<AppState>,
    multipart: Multipart,
) -> impl IntoResponse {
    match handlers::transcribe_upload(&state, multipart).await {
        Ok(data) => (StatusCode::OK, Json(ApiResponse::success(data))).into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /extract — multipart video upload, slide detection
async fn extract_handler(
    State(state): State<AppState>,
    multipart: Multipart,
) -> impl IntoResponse {
    match handlers::extract_upload(&state, multipart).await {
        Ok(data) => (StatusCode::OK, Json(ApiResponse::success(data))).into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /quiz — JSON body
async fn quiz_handler(
    State(state): State<AppState>,
    Json(request): Json<QuizRequest>,
) -> impl IntoResponse {
    match handlers::generate_quiz(&state, request).await {
        Ok(data) => (StatusCode::OK, Json(ApiResponse::success(data))).into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /summarize — JSON body
async fn summarize_handler(
    State(state): State<AppState>,
    Json(request): Json<SummarizeRequest>,
) -> impl IntoResponse {
    match handlers::summarize_text(&state, request).await {
        Ok(data) => (StatusCode::OK, Json(ApiResponse::success(data))).into_response(),
        Err(e) => error_response(e),
    }
}

fn error_response(e: handlers::ApiError) -> axum::response::Response {
    let status = match e {
        handlers::ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
        handlers::ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(ApiResponse::<()>::error(e.to_string())),
    )
        .into_response()
}
