//! HTTP 路由
//!
//! - POST {prefix}/analyze：处理一条骗子消息（需要 x-api-key）
//! - DELETE {prefix}/sessions/:session_id：让会话的智能体租约立即过期（需要 x-api-key）
//! - POST {prefix}/update-result：模拟收集端，记录并确认上报结果
//! - GET /health

use std::sync::Arc;

use axum::{
    extract::{Path, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tracing::Instrument;
use uuid::Uuid;

use super::{AnalysisRequest, AnalysisResponse};
use crate::agent::{process_turn, HoneypotComponents};
use crate::callback::FinalResultPayload;

pub const API_KEY_HEADER: &str = "x-api-key";

#[derive(Clone)]
pub struct ApiState {
    pub components: Arc<HoneypotComponents>,
}

impl ApiState {
    pub fn new(components: Arc<HoneypotComponents>) -> Self {
        Self { components }
    }
}

/// 创建路由；api_prefix 取自配置
pub fn router(state: ApiState) -> Router {
    let protected = Router::new()
        .route("/analyze", post(analyze))
        .route("/sessions/:session_id", delete(expire_session))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_api_key));

    let api = Router::new()
        .merge(protected)
        .route("/update-result", post(update_result));

    let prefix = state.components.config.server.api_prefix.trim_end_matches('/');
    let app = if prefix.is_empty() {
        Router::new().merge(api)
    } else {
        Router::new().nest(prefix, api)
    };

    app.route("/health", get(health)).with_state(state)
}

async fn require_api_key(State(state): State<ApiState>, request: Request, next: Next) -> Response {
    let expected = state.components.config.server.api_key.as_str();
    let rejection = match request.headers().get(API_KEY_HEADER) {
        None => Some("Not authenticated"),
        Some(value) if value.to_str().ok() == Some(expected) => None,
        Some(_) => Some("Could not validate credentials"),
    };

    match rejection {
        None => next.run(request).await,
        Some(detail) => {
            tracing::warn!(uri = %request.uri(), detail, "Rejected request");
            (StatusCode::FORBIDDEN, Json(json!({ "detail": detail }))).into_response()
        }
    }
}

/// POST {prefix}/analyze
async fn analyze(State(state): State<ApiState>, Json(request): Json<AnalysisRequest>) -> Json<AnalysisResponse> {
    let span = tracing::info_span!(
        "turn",
        request_id = %Uuid::new_v4(),
        session_id = %request.session_id
    );
    async move {
        tracing::info!(history = request.conversation_history.len(), "Analyze request");
        Json(process_turn(&state.components, request).await)
    }
    .instrument(span)
    .await
}

/// DELETE {prefix}/sessions/:session_id
async fn expire_session(State(state): State<ApiState>, Path(session_id): Path<String>) -> Json<Value> {
    let expired = state.components.leases.expire(&session_id).await;
    Json(json!({ "sessionId": session_id, "expired": expired }))
}

/// POST {prefix}/update-result
async fn update_result(Json(payload): Json<FinalResultPayload>) -> Json<Value> {
    tracing::info!(
        session_id = %payload.session_id,
        payload = %serde_json::to_string(&payload).unwrap_or_default(),
        "Received final result update"
    );
    Json(json!({ "status": "success", "message": "Result updated successfully" }))
}

/// GET /health
async fn health(State(state): State<ApiState>) -> Json<Value> {
    let components = &state.components;
    Json(json!({
        "status": "ok",
        "sessions": components.intel.len().await,
        "leases": components.leases.len().await,
        "pendingCleanups": components.cleanup.outstanding(),
    }))
}
