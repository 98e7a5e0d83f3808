mod config;
mod gateways;

use std::sync::Arc;

use axum::{
    Router,
    extract::{Multipart, Path, State},
    http::{HeaderValue, Request, StatusCode},
    middleware::{Next, from_fn},
    response::Json,
    routing::{get, post},
};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{Instrument, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use chat_core::{
    Assistant, DocumentIndex, InMemorySessionStorage, Session, SessionStorage, UserProfile,
};
use config::ServiceConfig;
use gateways::{FastembedEmbedder, OpenRouterGenerator, QdrantVectorIndex};

#[derive(Clone)]
struct AppState {
    assistant: Arc<Assistant>,
    sessions: Arc<dyn SessionStorage>,
}

#[derive(Debug, Serialize)]
struct GenerateResponse {
    session_id: String,
    response: String,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    response: String,
}

const GENERIC_ERROR: &str = "An error occurred while processing your request.";

type ErrorReply = (StatusCode, Json<ErrorBody>);

fn error_reply(status: StatusCode, message: &str) -> ErrorReply {
    (
        status,
        Json(ErrorBody {
            response: message.to_string(),
        }),
    )
}

/// Initialize structured JSON tracing based on environment variables
fn init_tracing() {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "insurance_chat_service=debug,chat_core=debug,tower_http=debug".into()
    });

    match log_format.as_str() {
        "pretty" => {
            // Human-readable logging for development
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        _ => {
            // Structured JSON logging for production
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_target(true)
                        .with_level(true),
                )
                .init();
        }
    }
}

/// Middleware to add correlation ID to all requests
async fn correlation_id_middleware(
    mut request: Request<axum::body::Body>,
    next: Next,
) -> axum::response::Response {
    let correlation_id = Uuid::new_v4().to_string();

    request.headers_mut().insert(
        "x-correlation-id",
        HeaderValue::from_str(&correlation_id).unwrap(),
    );

    let span = tracing::info_span!("http_request", correlation_id = %correlation_id);
    next.run(request).instrument(span).await
}

#[tokio::main]
async fn main() {
    init_tracing();

    let config = match ServiceConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("invalid configuration: {e}");
            std::process::exit(1);
        }
    };

    let generator = Arc::new(OpenRouterGenerator::new(
        config.openrouter_api_key.clone(),
        config.model.clone(),
    ));
    let embedder = Arc::new(FastembedEmbedder);
    let backend = Arc::new(QdrantVectorIndex::new(
        config.qdrant_url.clone(),
        config.qdrant_api_key.clone(),
    ));
    let index = DocumentIndex::new(backend, embedder, config.collection.clone());

    // The service still answers (without document grounding) when the index
    // is unreachable, so a failure here is not fatal.
    if let Err(e) = index.ensure_collection().await {
        warn!(error = %e, "could not ensure document collection at startup");
    }

    let app_state = AppState {
        assistant: Arc::new(Assistant::new(generator, index)),
        sessions: Arc::new(InMemorySessionStorage::new()),
    };

    let app = Router::new()
        .route("/health", get(health_check))
        .route("/generate-response", post(generate_response))
        .route("/session/{id}", get(get_session))
        .layer(from_fn(correlation_id_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("failed to bind {addr}: {e}");
            std::process::exit(1);
        }
    };

    info!("Server running on http://{addr}");

    if let Err(e) = axum::serve(listener, app).await {
        error!("server error: {e}");
    }
}

async fn health_check() -> &'static str {
    "OK"
}

async fn generate_response(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<GenerateResponse>, ErrorReply> {
    let mut text = String::new();
    let mut image: Option<Vec<u8>> = None;
    let mut session_id: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        error!(error = %e, "failed to read multipart field");
        error_reply(StatusCode::BAD_REQUEST, GENERIC_ERROR)
    })? {
        match field.name() {
            Some("text") => {
                text = field.text().await.map_err(|e| {
                    error!(error = %e, "failed to read text field");
                    error_reply(StatusCode::BAD_REQUEST, GENERIC_ERROR)
                })?;
            }
            Some("image") => {
                let bytes = field.bytes().await.map_err(|e| {
                    error!(error = %e, "failed to read image field");
                    error_reply(StatusCode::BAD_REQUEST, GENERIC_ERROR)
                })?;
                if !bytes.is_empty() {
                    image = Some(bytes.to_vec());
                }
            }
            Some("session_id") => {
                session_id = field.text().await.ok().filter(|s| !s.is_empty());
            }
            _ => {}
        }
    }

    let session_id_provided = session_id.is_some();
    let session_id = session_id.unwrap_or_else(|| Uuid::new_v4().to_string());

    info!(
        session_id = %session_id,
        text_length = text.len(),
        has_image = image.is_some(),
        "processing generate-response request"
    );

    let mut session = match state.sessions.get(&session_id).await {
        Ok(Some(session)) => session,
        Ok(None) => {
            // A supplied but unknown session id is the caller's mistake; only
            // mint a new session when none was given.
            if session_id_provided {
                warn!(session_id = %session_id, "session not found");
                return Err(error_reply(StatusCode::NOT_FOUND, "Session not found."));
            }
            info!(session_id = %session_id, "creating new session");
            Session::new(session_id.clone(), UserProfile::sample())
        }
        Err(e) => {
            error!(session_id = %session_id, error = %e, "failed to load session");
            return Err(error_reply(StatusCode::INTERNAL_SERVER_ERROR, GENERIC_ERROR));
        }
    };

    let response = match state
        .assistant
        .respond(&mut session.state, &text, image.as_deref())
        .await
    {
        Ok(response) => response,
        Err(e) => {
            error!(session_id = %session_id, error = %e, "failed to generate response");
            return Err(error_reply(StatusCode::INTERNAL_SERVER_ERROR, GENERIC_ERROR));
        }
    };

    if let Err(e) = state.sessions.save(session).await {
        error!(session_id = %session_id, error = %e, "failed to save session");
        return Err(error_reply(StatusCode::INTERNAL_SERVER_ERROR, GENERIC_ERROR));
    }

    info!(session_id = %session_id, "request completed successfully");

    Ok(Json(GenerateResponse {
        session_id,
        response,
    }))
}

async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<Session>, ErrorReply> {
    match state.sessions.get(&session_id).await {
        Ok(Some(session)) => Ok(Json(session)),
        Ok(None) => Err(error_reply(StatusCode::NOT_FOUND, "Session not found.")),
        Err(e) => {
            error!(session_id = %session_id, error = %e, "failed to load session");
            Err(error_reply(StatusCode::INTERNAL_SERVER_ERROR, GENERIC_ERROR))
        }
    }
}
