use axum::{
    Router,
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, Request, StatusCode},
    middleware::{Next, from_fn},
    response::Json,
    routing::{get, post},
};
use intake_flow::{
    Affordance, ConversationSnapshot, Event, FlowError, FlowStatus, Message, SessionRunner, Stage,
};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tracing::{Instrument, error, info};
use uuid::Uuid;

const CORRELATION_HEADER: &str = "x-correlation-id";

#[derive(Clone)]
pub struct AppState {
    pub runner: SessionRunner,
}

#[derive(Debug, Deserialize)]
pub struct ExecuteRequest {
    session_id: Option<String>,
    event: Event,
}

#[derive(Debug, Serialize)]
pub struct ExecuteResponse {
    session_id: String,
    stage: Stage,
    affordance: Affordance,
    appended: Vec<Message>,
    status: FlowStatus,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    session_id: String,
    #[serde(flatten)]
    conversation: ConversationSnapshot,
}

#[derive(Debug, Serialize)]
pub struct TypingResponse {
    typing: bool,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/execute", post(execute_event))
        .route("/session/{id}", get(get_session).delete(delete_session))
        .route("/session/{id}/typing", get(get_typing))
        .layer(TraceLayer::new_for_http())
        .layer(from_fn(correlation_id_middleware))
        .with_state(state)
}

/// Middleware to add correlation ID to all requests
async fn correlation_id_middleware(
    mut request: Request<axum::body::Body>,
    next: Next,
) -> axum::response::Response {
    let correlation_id = Uuid::new_v4().to_string();

    if let Ok(value) = HeaderValue::from_str(&correlation_id) {
        request.headers_mut().insert(CORRELATION_HEADER, value);
    }

    let span = tracing::info_span!("http_request", correlation_id = %correlation_id);

    next.run(request).instrument(span).await
}

fn correlation_id(headers: &HeaderMap) -> String {
    headers
        .get(CORRELATION_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string()
}

/// Session ids are v4 uuids; anything else is a client error.
fn validate_session_id(session_id: &str, correlation_id: &str) -> Result<(), StatusCode> {
    if Uuid::parse_str(session_id).is_err() {
        error!(
            correlation_id = %correlation_id,
            session_id = %session_id,
            "Invalid session ID format"
        );
        return Err(StatusCode::BAD_REQUEST);
    }
    Ok(())
}

async fn health_check() -> &'static str {
    "OK"
}

async fn execute_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ExecuteRequest>,
) -> Result<Json<ExecuteResponse>, StatusCode> {
    let correlation_id = correlation_id(&headers);

    info!(
        correlation_id = %correlation_id,
        session_id = ?request.session_id,
        event = request.event.name(),
        "Processing execute request"
    );

    let session_id = match request.session_id {
        Some(session_id) => {
            validate_session_id(&session_id, &correlation_id)?;
            session_id
        }
        None => match state.runner.start().await {
            Ok(session) => session.id,
            Err(e) => {
                error!(correlation_id = %correlation_id, error = %e, "Failed to create session");
                return Err(StatusCode::INTERNAL_SERVER_ERROR);
            }
        },
    };

    let result = match state.runner.run(&session_id, request.event).await {
        Ok(result) => result,
        Err(FlowError::SessionNotFound(_)) => {
            error!(
                correlation_id = %correlation_id,
                session_id = %session_id,
                "Session not found"
            );
            return Err(StatusCode::NOT_FOUND);
        }
        Err(e) => {
            error!(
                correlation_id = %correlation_id,
                session_id = %session_id,
                error = %e,
                "Failed to dispatch event"
            );
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    info!(
        correlation_id = %correlation_id,
        session_id = %session_id,
        stage = ?result.stage,
        status = ?result.status,
        "Request completed successfully"
    );

    Ok(Json(ExecuteResponse {
        session_id,
        stage: result.stage,
        affordance: result.stage.affordance(),
        appended: result.appended,
        status: result.status,
    }))
}

async fn load_session(
    state: &AppState,
    session_id: &str,
    correlation_id: &str,
) -> Result<intake_flow::Session, StatusCode> {
    validate_session_id(session_id, correlation_id)?;

    match state.runner.storage().get(session_id).await {
        Ok(Some(session)) => Ok(session),
        Ok(None) => {
            info!(
                correlation_id = %correlation_id,
                session_id = %session_id,
                "Session not found"
            );
            Err(StatusCode::NOT_FOUND)
        }
        Err(e) => {
            error!(
                correlation_id = %correlation_id,
                session_id = %session_id,
                error = %e,
                "Failed to get session"
            );
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

async fn get_session(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(session_id): Path<String>,
) -> Result<Json<SessionResponse>, StatusCode> {
    let correlation_id = correlation_id(&headers);
    let session = load_session(&state, &session_id, &correlation_id).await?;

    Ok(Json(SessionResponse {
        conversation: session.snapshot().await,
        session_id,
    }))
}

async fn get_typing(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(session_id): Path<String>,
) -> Result<Json<TypingResponse>, StatusCode> {
    let correlation_id = correlation_id(&headers);
    let session = load_session(&state, &session_id, &correlation_id).await?;

    Ok(Json(TypingResponse {
        typing: session.is_typing(),
    }))
}

async fn delete_session(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(session_id): Path<String>,
) -> StatusCode {
    let correlation_id = correlation_id(&headers);
    if let Err(status) = validate_session_id(&session_id, &correlation_id) {
        return status;
    }

    match state.runner.storage().delete(&session_id).await {
        Ok(()) => {
            info!(
                correlation_id = %correlation_id,
                session_id = %session_id,
                "Session deleted"
            );
            StatusCode::NO_CONTENT
        }
        Err(e) => {
            error!(
                correlation_id = %correlation_id,
                session_id = %session_id,
                error = %e,
                "Failed to delete session"
            );
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
