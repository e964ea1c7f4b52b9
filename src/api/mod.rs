//! REST API
//!
//! `POST /api/chat`, `GET /api/schema?role=`, `GET /api/health`.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::agentic::ConversationTurn;
use crate::pipeline::{AssistantAnswer, AssistantPipeline};
use crate::schema::{RoleContext, RoleDirectory};

// Application state
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<AssistantPipeline>,
    pub roles: Arc<RoleDirectory>,
}

#[derive(Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// A role name from the directory, or an explicit context from upstream auth
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RoleSelector {
    Name(String),
    Explicit(RoleContext),
}

impl RoleSelector {
    fn resolve(self, roles: &RoleDirectory) -> RoleContext {
        match self {
            RoleSelector::Name(name) => roles.resolve(&name),
            RoleSelector::Explicit(context) => context,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub history: Vec<ConversationTurn>,
    #[serde(default)]
    pub role: Option<RoleSelector>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub role: &'static str,
    #[serde(flatten)]
    pub answer: AssistantAnswer,
}

#[derive(Debug, Deserialize)]
pub struct SchemaQuery {
    pub role: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SchemaView {
    pub role: String,
    pub permitted_entities: Vec<String>,
    pub schema: String,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/chat", post(chat))
        .route("/api/schema", get(scoped_schema))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                ),
        )
        .with_state(state)
}

// Health check endpoint
async fn health_check() -> Json<ApiResponse<String>> {
    Json(ApiResponse::ok("OK".to_string()))
}

async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, (StatusCode, Json<ApiResponse<()>>)> {
    if request.message.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::err("message must not be empty")),
        ));
    }

    let role = match request.role {
        Some(requested) => requested.resolve(&state.roles),
        None => RoleContext::default(),
    };
    let answer = state
        .pipeline
        .answer(&request.message, &request.history, &role)
        .await;

    Ok(Json(ChatResponse {
        role: "bot",
        answer,
    }))
}

async fn scoped_schema(
    State(state): State<AppState>,
    Query(query): Query<SchemaQuery>,
) -> Json<ApiResponse<SchemaView>> {
    let role = state.roles.resolve(&query.role);
    let scoped = state.pipeline.gate().scoped_schema(&role);
    Json(ApiResponse::ok(SchemaView {
        role: role.role.clone(),
        permitted_entities: scoped.entities().iter().map(|e| e.name.clone()).collect(),
        schema: scoped.describe(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agentic::LlmClient;
    use crate::config::PipelineConfig;
    use crate::error::{BackendResult, ServiceResult};
    use crate::executor::{Record, RecordStore, SearchRequest};
    use crate::predicate::NativePredicate;
    use crate::schema::SchemaCatalog;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    struct FixedLlm(&'static str);

    #[async_trait]
    impl LlmClient for FixedLlm {
        async fn complete(&self, _: &str, _: &[ConversationTurn], _: &str) -> ServiceResult<String> {
            Ok(self.0.to_string())
        }

        fn model_name(&self) -> &str {
            "fixed"
        }

        fn provider_name(&self) -> &str {
            "test"
        }
    }

    struct SevenStore;

    #[async_trait]
    impl RecordStore for SevenStore {
        async fn count(&self, _: &str, _: &[NativePredicate]) -> BackendResult<u64> {
            Ok(7)
        }

        async fn search(&self, _: &SearchRequest) -> BackendResult<Vec<Record>> {
            Ok(Vec::new())
        }

        fn store_name(&self) -> &str {
            "seven"
        }
    }

    fn app(reply: &'static str) -> Router {
        let pipeline = AssistantPipeline::new(
            Arc::new(FixedLlm(reply)),
            Arc::new(SevenStore),
            Arc::new(SchemaCatalog::builtin().unwrap()),
            &PipelineConfig::default(),
        );
        create_router(AppState {
            pipeline: Arc::new(pipeline),
            roles: Arc::new(RoleDirectory::builtin().unwrap()),
        })
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn chat_request(body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/chat")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = app("")
            .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["data"], "OK");
    }

    #[tokio::test]
    async fn test_chat_with_role_name() {
        let response = app(r#"{"type":"count","table":"sale.order"}"#)
            .oneshot(chat_request(serde_json::json!({
                "message": "Kaç sipariş var?",
                "history": [{"role": "user", "content": "Merhaba"}, {"role": "bot", "content": "Merhaba!"}],
                "role": "Yönetici"
            })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["role"], "bot");
        assert!(json["content"].as_str().unwrap().contains('7'));
        assert_eq!(json["data"]["count"], 7);
        assert_eq!(json["display_hint"], "stat");
    }

    #[tokio::test]
    async fn test_chat_with_explicit_role() {
        let response = app(r#"{"type":"count","table":"sale.order"}"#)
            .oneshot(chat_request(serde_json::json!({
                "message": "Kaç sipariş var?",
                "role": {"role": "Depo", "permitted_entities": ["product.product"]}
            })))
            .await
            .unwrap();
        let json = body_json(response).await;
        assert!(json["data"].is_null());
        assert!(json["content"].as_str().unwrap().contains("sale.order"));
    }

    #[tokio::test]
    async fn test_chat_rejects_empty_message() {
        let response = app("")
            .oneshot(chat_request(serde_json::json!({"message": "  "})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_schema_endpoint() {
        let response = app("")
            .oneshot(
                Request::get("/api/schema?role=Personel")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let json = body_json(response).await;
        assert_eq!(json["data"]["permitted_entities"], serde_json::json!(["product.product"]));
        assert!(json["data"]["schema"]
            .as_str()
            .unwrap()
            .contains("TABLE: product.product"));
    }
}
