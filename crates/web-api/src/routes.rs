use axum::{
    extract::{Query, State},
    http::{header::CONTENT_TYPE, HeaderName, HeaderValue, Method, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use application::RegisteredParticipant;
use domain::{parse_limit, Message, Participant, RegisterParticipant, SendMessage};

use crate::{
    error::ApiError,
    extract::{JsonBody, RequestUser, USER_HEADER},
    state::AppState,
};

#[derive(Debug, Default, Deserialize)]
struct MessagesQuery {
    /// 原样接收，非正整数视为不分页
    limit: Option<String>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/participants", post(register_participant).get(list_participants))
        .route("/messages", post(send_message).get(list_messages))
        .route("/status", post(heartbeat))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// `*` 允许任意来源，否则只允许列出的来源
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, HeaderName::from_static(USER_HEADER)]);

    if origins.is_empty() || origins.iter().any(|origin| origin == "*") {
        return layer.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::warn!(origin = %origin, error = %err, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(allowed))
}

async fn health() -> StatusCode {
    StatusCode::OK
}

async fn register_participant(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<RegisterParticipant>,
) -> Result<(StatusCode, Json<RegisteredParticipant>), ApiError> {
    let registered = state.chat_service.register(payload).await?;
    Ok((StatusCode::CREATED, Json(registered)))
}

async fn list_participants(
    State(state): State<AppState>,
) -> Result<Json<Vec<Participant>>, ApiError> {
    let participants = state.chat_service.list_participants().await?;
    Ok(Json(participants))
}

async fn list_messages(
    State(state): State<AppState>,
    RequestUser(user): RequestUser,
    Query(query): Query<MessagesQuery>,
) -> Result<Json<Vec<Message>>, ApiError> {
    let limit = parse_limit(query.limit.as_deref());
    let messages = state.chat_service.list_messages(&user, limit).await?;
    Ok(Json(messages))
}

async fn send_message(
    State(state): State<AppState>,
    RequestUser(user): RequestUser,
    JsonBody(payload): JsonBody<SendMessage>,
) -> Result<StatusCode, ApiError> {
    state.chat_service.send_message(&user, payload).await?;
    Ok(StatusCode::CREATED)
}

async fn heartbeat(
    State(state): State<AppState>,
    RequestUser(user): RequestUser,
) -> Result<StatusCode, ApiError> {
    state.chat_service.heartbeat(&user).await?;
    Ok(StatusCode::OK)
}
