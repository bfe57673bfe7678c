//! Transport-facing routes for the voice dialogue.
//!
//! - `POST /api/v1/voice/session`       start or resume the active draft
//! - `POST /api/v1/voice/turns`         ingest one `{role, message}` turn
//! - `POST /api/v1/voice/tools/{name}`  run a named tool, body is the tool input
//! - `POST /api/v1/voice/finish`        explicit end of conversation
//! - `POST /api/v1/voice/disconnect`    transport dropped
//! - `GET  /api/v1/voice/context`       resume prompt for the active draft
//! - `POST /api/v1/voice/promote`       hand the active draft to the estimate store
//!
//! All handlers share one session behind a mutex, so turns and tool calls are
//! processed one at a time.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use paintvox_agent::{SessionClose, SessionStart, TurnOutcome, VoiceSession};
use paintvox_core::completion::CompletionReport;
use paintvox_core::domain::business::BusinessDefaults;
use paintvox_core::domain::draft::SpeakerRole;
use paintvox_core::errors::{ApplicationError, InterfaceError};
use paintvox_db::EstimateRepository;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

pub const TRANSPORT_SECRET_HEADER: &str = "x-paintvox-transport-secret";
pub const CORRELATION_HEADER: &str = "x-correlation-id";

#[derive(Clone)]
pub struct VoiceState {
    session: Arc<Mutex<VoiceSession>>,
    estimates: Arc<dyn EstimateRepository>,
    defaults: BusinessDefaults,
    shared_secret: Option<SecretString>,
}

impl VoiceState {
    pub fn new(
        session: VoiceSession,
        estimates: Arc<dyn EstimateRepository>,
        defaults: BusinessDefaults,
        shared_secret: Option<SecretString>,
    ) -> Self {
        Self { session: Arc::new(Mutex::new(session)), estimates, defaults, shared_secret }
    }
}

#[derive(Debug, Deserialize)]
pub struct TurnRequest {
    pub role: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ContextResponse {
    pub draft_id: String,
    pub context: String,
    pub progress: CompletionReport,
}

#[derive(Debug, Serialize)]
pub struct PromoteResponse {
    pub draft_id: String,
    pub estimate_id: String,
}

#[derive(Debug, Serialize)]
pub struct VoiceError {
    pub error: String,
    pub detail: Option<String>,
    pub correlation_id: String,
}

type Rejection = (StatusCode, Json<VoiceError>);

pub fn router(state: VoiceState) -> Router {
    Router::new()
        .route("/api/v1/voice/session", post(start_session))
        .route("/api/v1/voice/turns", post(ingest_turn))
        .route("/api/v1/voice/tools/{name}", post(call_tool))
        .route("/api/v1/voice/finish", post(finish))
        .route("/api/v1/voice/disconnect", post(disconnect))
        .route("/api/v1/voice/context", get(resume_context))
        .route("/api/v1/voice/promote", post(promote))
        .with_state(state)
}

async fn start_session(
    State(state): State<VoiceState>,
    headers: HeaderMap,
) -> Result<Json<SessionStart>, Rejection> {
    let correlation_id = authorize(&headers, &state)?;
    let mut session = state.session.lock().await;
    let start =
        session.start_or_resume().await.map_err(|error| reject(error, &correlation_id))?;
    Ok(Json(start))
}

async fn ingest_turn(
    State(state): State<VoiceState>,
    headers: HeaderMap,
    Json(request): Json<TurnRequest>,
) -> Result<Json<TurnOutcome>, Rejection> {
    let correlation_id = authorize(&headers, &state)?;
    let role = request
        .role
        .parse::<SpeakerRole>()
        .map_err(|message| bad_request(message, &correlation_id))?;
    if request.message.trim().is_empty() {
        return Err(bad_request("turn message must not be empty".to_string(), &correlation_id));
    }

    let mut session = state.session.lock().await;
    let outcome = session
        .ingest_turn(role, &request.message)
        .await
        .map_err(|error| reject(error, &correlation_id))?;
    Ok(Json(outcome))
}

async fn call_tool(
    State(state): State<VoiceState>,
    Path(name): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, Rejection> {
    let correlation_id = authorize(&headers, &state)?;
    let input = if body.iter().all(u8::is_ascii_whitespace) {
        Value::Object(Default::default())
    } else {
        serde_json::from_slice::<Value>(&body).map_err(|error| {
            bad_request(format!("tool input must be JSON: {error}"), &correlation_id)
        })?
    };

    let mut session = state.session.lock().await;
    let payload =
        session.call_tool(&name, input).await.map_err(|error| reject(error, &correlation_id))?;
    Ok(([(header::CONTENT_TYPE, "application/json")], payload))
}

async fn finish(
    State(state): State<VoiceState>,
    headers: HeaderMap,
) -> Result<Json<SessionClose>, Rejection> {
    let correlation_id = authorize(&headers, &state)?;
    let mut session = state.session.lock().await;
    let closed = session.finish().await.map_err(|error| reject(error, &correlation_id))?;
    Ok(Json(closed))
}

async fn disconnect(
    State(state): State<VoiceState>,
    headers: HeaderMap,
) -> Result<Json<SessionClose>, Rejection> {
    let correlation_id = authorize(&headers, &state)?;
    let mut session = state.session.lock().await;
    let closed = session.disconnect().await.map_err(|error| reject(error, &correlation_id))?;
    Ok(Json(closed))
}

async fn resume_context(
    State(state): State<VoiceState>,
    headers: HeaderMap,
) -> Result<Json<ContextResponse>, Rejection> {
    let correlation_id = authorize(&headers, &state)?;
    let session = state.session.lock().await;
    let context = session.resume_context().await.map_err(|error| reject(error, &correlation_id))?;
    let progress = session.progress().await.map_err(|error| reject(error, &correlation_id))?;
    let draft_id =
        session.active_draft_id().map(|id| id.as_str().to_string()).unwrap_or_default();
    Ok(Json(ContextResponse { draft_id, context, progress }))
}

async fn promote(
    State(state): State<VoiceState>,
    headers: HeaderMap,
) -> Result<Json<PromoteResponse>, Rejection> {
    let correlation_id = authorize(&headers, &state)?;
    let mut session = state.session.lock().await;
    let linked = session
        .promote(state.estimates.as_ref(), &state.defaults)
        .await
        .map_err(|error| reject(error, &correlation_id))?;
    Ok(Json(PromoteResponse {
        draft_id: linked.id.as_str().to_string(),
        estimate_id: linked.final_estimate_id.unwrap_or_default(),
    }))
}

/// Checks the transport secret and returns the request's correlation id.
fn authorize(headers: &HeaderMap, state: &VoiceState) -> Result<String, Rejection> {
    let correlation_id = headers
        .get(CORRELATION_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.trim().is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("voice-{}", Utc::now().timestamp_millis()));

    let Some(secret) = &state.shared_secret else {
        return Ok(correlation_id);
    };

    let provided = headers.get(TRANSPORT_SECRET_HEADER).and_then(|value| value.to_str().ok());
    let error = match provided {
        Some(value) if value == secret.expose_secret() => return Ok(correlation_id),
        Some(_) => "invalid transport secret",
        None => "missing transport secret",
    };

    warn!(
        event_name = "voice.transport.unauthorized",
        correlation_id = %correlation_id,
        reason = error,
        "rejected voice request"
    );
    Err((
        StatusCode::UNAUTHORIZED,
        Json(VoiceError { error: error.to_string(), detail: None, correlation_id }),
    ))
}

fn bad_request(message: String, correlation_id: &str) -> Rejection {
    (
        StatusCode::BAD_REQUEST,
        Json(VoiceError {
            error: "The request could not be processed. Check inputs and try again.".to_string(),
            detail: Some(message),
            correlation_id: correlation_id.to_string(),
        }),
    )
}

fn reject(error: ApplicationError, correlation_id: &str) -> Rejection {
    let interface = error.into_interface(correlation_id);
    let status = match &interface {
        InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
        InterfaceError::Conflict { .. } => StatusCode::CONFLICT,
        InterfaceError::NotFound { .. } => StatusCode::NOT_FOUND,
        InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let detail = match &interface {
        InterfaceError::Internal { .. } | InterfaceError::ServiceUnavailable { .. } => {
            error!(
                event_name = "voice.request.failed",
                correlation_id = %correlation_id,
                error = %interface,
                "voice request failed"
            );
            None
        }
        _ => {
            info!(
                event_name = "voice.request.rejected",
                correlation_id = %correlation_id,
                error = %interface,
                "voice request rejected"
            );
            Some(interface.to_string())
        }
    };

    (
        status,
        Json(VoiceError {
            error: interface.user_message().to_string(),
            detail,
            correlation_id: interface.correlation_id().to_string(),
        }),
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
        Router,
    };
    use paintvox_agent::{SessionSettings, StaticBusinessConfig, VoiceSession};
    use paintvox_core::domain::business::BusinessDefaults;
    use paintvox_core::domain::customer::{Customer, CustomerId};
    use paintvox_db::repositories::{
        InMemoryCustomerDirectory, InMemoryDraftRepository, InMemoryEstimateRepository,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::{router, VoiceState, CORRELATION_HEADER, TRANSPORT_SECRET_HEADER};

    fn app(secret: Option<&str>) -> Router {
        let customers = InMemoryCustomerDirectory::with_customers(vec![Customer {
            id: CustomerId::generate(),
            name: "John Smith".to_string(),
            address: Some("42 Oak Street".to_string()),
            phone: None,
            email: None,
        }]);
        let session = VoiceSession::with_standard_tools(
            Arc::new(InMemoryDraftRepository::default()),
            Arc::new(customers),
            Arc::new(StaticBusinessConfig::default()),
            SessionSettings::default(),
        );
        router(VoiceState::new(
            session,
            Arc::new(InMemoryEstimateRepository::default()),
            BusinessDefaults::default(),
            secret.map(|value| value.to_string().into()),
        ))
    }

    fn post(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("request")
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    #[tokio::test]
    async fn turns_before_a_session_are_a_conflict() {
        let app = app(None);
        let mut request = post("/api/v1/voice/turns", json!({"role": "user", "message": "hi"}));
        request.headers_mut().insert(CORRELATION_HEADER, "req-77".parse().expect("header"));

        let (status, body) = send(&app, request).await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["correlation_id"], json!("req-77"));
    }

    #[tokio::test]
    async fn session_turn_and_context_flow() {
        let app = app(None);
        let (status, start) = send(&app, post("/api/v1/voice/session", json!({}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(start["resumed"], json!(false));
        assert_eq!(start["progress"]["percent"], json!(0));

        let (status, turn) = send(
            &app,
            post(
                "/api/v1/voice/turns",
                json!({"role": "user", "message": "for John Smith, exterior, 2 guys, 3 days, $65 an hour"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(turn["progress"]["percent"], json!(100));
        assert_eq!(turn["draft"]["customer_name"], json!("John Smith"));

        let request = Request::builder()
            .uri("/api/v1/voice/context")
            .body(Body::empty())
            .expect("request");
        let (status, context) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert!(context["context"].as_str().unwrap_or_default().contains("Customer: John Smith"));
    }

    #[tokio::test]
    async fn tool_calls_return_the_tool_payload() {
        let app = app(None);
        send(&app, post("/api/v1/voice/session", json!({}))).await;

        let (status, body) =
            send(&app, post("/api/v1/voice/tools/lookup_customer", json!({"name": "Smith"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["found"], json!(true));
        assert_eq!(body["customer"]["address"], json!("42 Oak Street"));

        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/voice/tools/get_business_config")
            .body(Body::empty())
            .expect("request");
        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["found"], json!(true));
    }

    #[tokio::test]
    async fn invalid_roles_are_bad_requests() {
        let app = app(None);
        send(&app, post("/api/v1/voice/session", json!({}))).await;

        let (status, body) =
            send(&app, post("/api/v1/voice/turns", json!({"role": "narrator", "message": "x"})))
                .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["detail"].as_str().unwrap_or_default().contains("narrator"));
    }

    #[tokio::test]
    async fn shared_secret_is_enforced_when_configured() {
        let app = app(Some("s3cret"));

        let (status, body) = send(&app, post("/api/v1/voice/session", json!({}))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], json!("missing transport secret"));

        let mut request = post("/api/v1/voice/session", json!({}));
        request.headers_mut().insert(TRANSPORT_SECRET_HEADER, "wrong".parse().expect("header"));
        let (status, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let mut request = post("/api/v1/voice/session", json!({}));
        request.headers_mut().insert(TRANSPORT_SECRET_HEADER, "s3cret".parse().expect("header"));
        let (status, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn promotion_without_a_customer_is_rejected_then_succeeds() {
        let app = app(None);
        send(&app, post("/api/v1/voice/session", json!({}))).await;

        let (status, _) = send(&app, post("/api/v1/voice/promote", json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        send(
            &app,
            post("/api/v1/voice/turns", json!({"role": "user", "message": "for John Smith, interior"})),
        )
        .await;
        let (status, body) = send(&app, post("/api/v1/voice/promote", json!({}))).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["estimate_id"].as_str().unwrap_or_default().starts_with("est-"));

        let (status, _) = send(&app, post("/api/v1/voice/finish", json!({}))).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }
}
