//! Public JSON API.
//!
//! - `POST /ask?customer_id=&question=[&conversation_id=]` answers a question
//! - `GET  /tickets` lists every stored ticket ordered by id

use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use supportdesk_agent::{AskRequest, AskResponse, SupportService};
use supportdesk_core::{ApplicationError, ConversationId, CustomerId, InterfaceError, Ticket};
use supportdesk_db::TicketRepository;
use tracing::{info, warn};
use uuid::Uuid;

pub const CORRELATION_HEADER: &str = "x-correlation-id";

#[derive(Clone)]
pub struct ApiState {
    service: Arc<SupportService>,
    tickets: Arc<dyn TicketRepository>,
}

impl ApiState {
    pub fn new(service: Arc<SupportService>, tickets: Arc<dyn TicketRepository>) -> Self {
        Self { service, tickets }
    }
}

#[derive(Debug, Deserialize)]
pub struct AskQuery {
    pub customer_id: i64,
    pub question: String,
    pub conversation_id: Option<i64>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
    pub correlation_id: String,
}

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ApiError>)>;

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/ask", post(ask))
        .route("/tickets", get(list_tickets))
        .with_state(state)
}

pub async fn ask(
    State(state): State<ApiState>,
    headers: HeaderMap,
    query: Result<Query<AskQuery>, QueryRejection>,
) -> ApiResult<AskResponse> {
    let correlation_id = correlation_id(&headers);
    let Query(query) = query.map_err(|rejection| {
        failure(InterfaceError::BadRequest {
            message: rejection.body_text(),
            correlation_id: correlation_id.clone(),
        })
    })?;

    info!(
        event_name = "api.ask.received",
        correlation_id = %correlation_id,
        customer_id = query.customer_id,
        "ask request received"
    );

    let request = AskRequest {
        customer_id: CustomerId(query.customer_id),
        question: query.question,
        conversation_id: query.conversation_id.map(ConversationId),
        correlation_id: correlation_id.clone(),
    };

    state
        .service
        .ask(request)
        .await
        .map(Json)
        .map_err(|error| application_failure(error, &correlation_id))
}

pub async fn list_tickets(State(state): State<ApiState>, headers: HeaderMap) -> ApiResult<Vec<Ticket>> {
    let correlation_id = correlation_id(&headers);

    state
        .tickets
        .list()
        .await
        .map(Json)
        .map_err(|error| application_failure(ApplicationError::from(error), &correlation_id))
}

fn correlation_id(headers: &HeaderMap) -> String {
    headers
        .get(CORRELATION_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

fn application_failure(error: ApplicationError, correlation_id: &str) -> (StatusCode, Json<ApiError>) {
    warn!(
        event_name = "api.request.failed",
        correlation_id = %correlation_id,
        error = %error,
        "request failed"
    );
    failure(error.into_interface(correlation_id))
}

fn failure(error: InterfaceError) -> (StatusCode, Json<ApiError>) {
    let status = status_code(&error);
    let body = ApiError {
        error: response_message(&error),
        correlation_id: error.correlation_id().to_string(),
    };
    (status, Json(body))
}

// Caller mistakes are echoed back; store and upstream details stay in the logs.
fn response_message(error: &InterfaceError) -> String {
    match error {
        InterfaceError::BadRequest { message, .. } | InterfaceError::NotFound { message, .. } => {
            message.clone()
        }
        other => other.user_message().to_string(),
    }
}

pub fn status_code(error: &InterfaceError) -> StatusCode {
    match error {
        InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
        InterfaceError::NotFound { .. } => StatusCode::NOT_FOUND,
        InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        InterfaceError::UpstreamFailure { .. } => StatusCode::BAD_GATEWAY,
        InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
        Router,
    };
    use serde_json::{json, Value};
    use supportdesk_agent::llm::{Completion, LlmError, ScriptedLlmClient, ToolCall};
    use supportdesk_agent::prompt::DEFAULT_INSTRUCTIONS;
    use supportdesk_agent::{support_registry, AgentRuntime, SupportService};
    use supportdesk_core::{CustomerIdPolicy, DummyDataset};
    use supportdesk_db::{
        connect_with_settings, migrations, DbPool, SqlConversationRepository, SqlTicketRepository,
        TicketRepository,
    };
    use tower::ServiceExt;

    use super::{router, ApiState, CORRELATION_HEADER};

    async fn test_pool() -> DbPool {
        let pool = connect_with_settings("sqlite::memory:", 1, 5).await.expect("pool");
        migrations::run_pending(&pool).await.expect("migrations");
        pool
    }

    fn app(pool: &DbPool, script: Vec<Result<Completion, LlmError>>) -> Router {
        let tickets: Arc<dyn TicketRepository> = Arc::new(SqlTicketRepository::new(pool.clone()));
        let conversations = Arc::new(SqlConversationRepository::new(pool.clone()));
        let tools = support_registry(tickets.clone(), DummyDataset::fixture(), CustomerIdPolicy::Exact);
        let llm = Arc::new(ScriptedLlmClient::new(script));
        let runtime = Arc::new(AgentRuntime::new(llm, tools, DEFAULT_INSTRUCTIONS));
        let service = Arc::new(SupportService::new(runtime, conversations));
        router(ApiState::new(service, tickets))
    }

    async fn send(app: Router, method: &str, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri).body(Body::empty()).expect("request");
        let response = app.oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    async fn history_rows(pool: &DbPool) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM chat_history").fetch_one(pool).await.expect("count")
    }

    #[tokio::test]
    async fn ask_returns_answer_and_logs_both_turns() {
        let pool = test_pool().await;
        let app = app(&pool, vec![Ok(Completion::text("Refunds are available within 30 days."))]);

        let (status, body) =
            send(app, "POST", "/ask?customer_id=102&question=What%20is%20your%20refund%20policy%3F").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["customer_id"], 102);
        assert_eq!(body["question"], "What is your refund policy?");
        assert_eq!(body["answer"], "Refunds are available within 30 days.");
        assert!(body["conversation_id"].as_i64().is_some());
        assert_eq!(history_rows(&pool).await, 2);
    }

    #[tokio::test]
    async fn saved_ticket_shows_up_in_ticket_listing() {
        let pool = test_pool().await;
        let app = app(
            &pool,
            vec![
                Ok(Completion::tool_calls(vec![ToolCall {
                    id: "c1".to_string(),
                    name: "save_ticket".to_string(),
                    arguments: json!({
                        "customer_id": 7,
                        "question": "Where is my invoice?",
                        "answer": "Invoices are under Billing.",
                        "category": "billing"
                    }),
                }])),
                Ok(Completion::text("Saved your ticket.")),
            ],
        );

        let (status, _) = send(app.clone(), "POST", "/ask?customer_id=7&question=save%20it").await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(app, "GET", "/tickets").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!([{
                "id": 1,
                "customer_id": 7,
                "question": "Where is my invoice?",
                "answer": "Invoices are under Billing.",
                "category": "billing"
            }])
        );
    }

    #[tokio::test]
    async fn missing_or_empty_question_is_bad_request() {
        let pool = test_pool().await;

        let (status, body) = send(app(&pool, Vec::new()), "POST", "/ask?customer_id=1").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["correlation_id"].as_str().is_some_and(|id| !id.is_empty()));

        let (status, body) = send(app(&pool, Vec::new()), "POST", "/ask?customer_id=1&question=%20").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap_or_default().contains("question"));
        assert_eq!(history_rows(&pool).await, 0);
    }

    #[tokio::test]
    async fn unknown_conversation_is_not_found() {
        let pool = test_pool().await;
        let (status, _) =
            send(app(&pool, Vec::new()), "POST", "/ask?customer_id=1&question=hi&conversation_id=99").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn conversation_of_another_customer_is_not_found() {
        let pool = test_pool().await;
        let app = app(&pool, vec![Ok(Completion::text("Noted.")), Ok(Completion::text("unused"))]);

        let (status, body) = send(app.clone(), "POST", "/ask?customer_id=101&question=remember%20this").await;
        assert_eq!(status, StatusCode::OK);
        let conversation_id = body["conversation_id"].as_i64().expect("conversation id");

        let uri = format!("/ask?customer_id=202&question=what%20did%20I%20say&conversation_id={conversation_id}");
        let (status, _) = send(app, "POST", &uri).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        let foreign: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chat_history WHERE customer_id = 202")
            .fetch_one(&pool)
            .await
            .expect("count");
        assert_eq!(foreign, 0);
        assert_eq!(history_rows(&pool).await, 2);
    }

    #[tokio::test]
    async fn llm_failure_is_bad_gateway_and_logs_nothing() {
        let pool = test_pool().await;
        let app = app(&pool, vec![Err(LlmError::Status { status: 500, body: "boom".to_string() })]);

        let request = Request::builder()
            .method("POST")
            .uri("/ask?customer_id=1&question=hello")
            .header(CORRELATION_HEADER, "req-42")
            .body(Body::empty())
            .expect("request");
        let response = app.oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let body: Value = serde_json::from_slice(&bytes).expect("json");
        assert_eq!(body["correlation_id"], "req-42");
        assert!(!body["error"].as_str().unwrap_or_default().contains("boom"));
        assert_eq!(history_rows(&pool).await, 0);
    }

    #[tokio::test]
    async fn unavailable_store_is_service_unavailable() {
        let pool = test_pool().await;
        let app = app(&pool, Vec::new());
        pool.close().await;

        let (status, body) = send(app, "GET", "/tickets").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(body["error"].is_string());
    }
}
