//! HTTP surface: one route per specialist agent plus health, status, and
//! integration-metrics endpoints, grounded on the teacher's
//! `agents/edge_function.rs` (`ApiError`/`ErrorResponse`/`create_router`
//! pattern), generalized from one edge function to three agent routes.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use axum::extract::{Query, State};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::agents::{Agent, AgentError};
use crate::context::SessionState;
use crate::domain::{
    AgentKind, AgentPayload, CompliancePayload, ForecastPayload, NegotiationPayload, Priority, RequestEnvelope,
    ValidationError, WorkflowResult,
};
use crate::integration::{AgentCounters, ComplianceReport, HistoryEntry, IntegrationManager};
use crate::observability::RequestId;
use crate::orchestrator::WorkflowOrchestrator;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    pub request_id: uuid::Uuid,
}

pub enum ApiError {
    BadRequest(String),
    UnprocessableEntity(String),
    InternalServerError(String),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn unprocessable_entity(msg: impl Into<String>) -> Self {
        Self::UnprocessableEntity(msg.into())
    }

    pub fn internal_server_error(msg: impl Into<String>) -> Self {
        Self::InternalServerError(msg.into())
    }

    /// Render with a request id the caller already generated, so an error
    /// response carries the same `X-Request-ID` a success response would.
    fn into_response_with_id(self, request_id: uuid::Uuid) -> Response {
        let (status, error, message) = match self {
            Self::BadRequest(m) => (StatusCode::BAD_REQUEST, "bad_request", m),
            Self::UnprocessableEntity(m) => (StatusCode::UNPROCESSABLE_ENTITY, "unprocessable_entity", m),
            Self::InternalServerError(m) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_server_error", m),
        };
        let body = ErrorResponse { error: error.to_string(), message, details: None, request_id };
        let mut response = (status, Json(body)).into_response();
        response
            .headers_mut()
            .insert("x-request-id", HeaderValue::from_str(&request_id.to_string()).unwrap());
        response
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.into_response_with_id(uuid::Uuid::new_v4())
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        Self::UnprocessableEntity(e.to_string())
    }
}

impl From<AgentError> for ApiError {
    fn from(e: AgentError) -> Self {
        match e {
            AgentError::InvalidPayload(m) => Self::UnprocessableEntity(m),
            AgentError::ModelClient(err) => Self::InternalServerError(err.to_string()),
        }
    }
}

/// Application state shared across every handler. Holds only `Arc`/`Mutex`
/// wrapped shared state so cloning `AppState` for axum is a handful of
/// pointer copies.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<WorkflowOrchestrator>,
    pub integration: Arc<IntegrationManager>,
    pub agents: Arc<[Arc<dyn Agent>; 3]>,
    sessions: Arc<Mutex<HashMap<String, SessionState>>>,
}

impl AppState {
    pub fn new(
        orchestrator: Arc<WorkflowOrchestrator>,
        integration: Arc<IntegrationManager>,
        agents: [Arc<dyn Agent>; 3],
    ) -> Self {
        Self { orchestrator, integration, agents: Arc::new(agents), sessions: Arc::new(Mutex::new(HashMap::new())) }
    }

    fn take_session(&self, session_id: &str) -> SessionState {
        self.sessions.lock().expect("session map lock poisoned").get(session_id).cloned().unwrap_or_default()
    }

    fn update_session(&self, session_id: &str, result: &WorkflowResult) {
        let mut sessions = self.sessions.lock().expect("session map lock poisoned");
        let session = sessions.entry(session_id.to_string()).or_default();
        session.conversation_turns.push(format!("{}: {}", result.agent_kind, result.final_text));
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/status/agents", get(agents_status_handler))
        .route("/agent/negotiation", post(negotiation_handler))
        .route("/agent/compliance", post(compliance_handler))
        .route("/agent/forecast", post(forecast_handler))
        .route("/integration/metrics", get(metrics_handler))
        .route("/integration/recent", get(recent_handler))
        .route("/integration/compliance-report", get(compliance_report_handler))
        .route("/integration/reset-metrics", post(reset_metrics_handler))
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}

async fn agents_status_handler(State(state): State<AppState>) -> impl IntoResponse {
    let capabilities: Vec<_> = state.agents.iter().map(|a| a.report_capabilities()).collect();
    let metrics: Vec<_> = state.agents.iter().map(|a| a.report_metrics()).collect();
    Json(serde_json::json!({ "capabilities": capabilities, "metrics": metrics }))
}

#[derive(Debug, Deserialize)]
struct AgentRequest<P> {
    session_id: String,
    #[serde(default)]
    priority: Priority,
    #[serde(default)]
    user_context: Option<String>,
    #[serde(flatten)]
    payload: P,
}

impl<P> AgentRequest<P> {
    fn into_envelope(self, wrap: impl FnOnce(P) -> AgentPayload) -> RequestEnvelope {
        RequestEnvelope {
            session_id: self.session_id,
            priority: self.priority,
            payload: wrap(self.payload),
            user_context: self.user_context,
        }
    }
}

async fn negotiation_handler(
    State(state): State<AppState>,
    Json(req): Json<AgentRequest<NegotiationPayload>>,
) -> Result<Response, ApiError> {
    run_agent(state, req.into_envelope(AgentPayload::Negotiation)).await
}

async fn compliance_handler(
    State(state): State<AppState>,
    Json(req): Json<AgentRequest<CompliancePayload>>,
) -> Result<Response, ApiError> {
    run_agent(state, req.into_envelope(AgentPayload::Compliance)).await
}

async fn forecast_handler(
    State(state): State<AppState>,
    Json(req): Json<AgentRequest<ForecastPayload>>,
) -> Result<Response, ApiError> {
    run_agent(state, req.into_envelope(AgentPayload::Forecast)).await
}

/// What `/agent/*` routes hand back, per the HTTP contract every agent
/// endpoint shares: the (possibly revised) text, a compliance verdict, the
/// violations and recommendations that produced it, the agent's own
/// confidence, per-layer context usage, and timing/identity metadata.
#[derive(Debug, Serialize)]
struct AgentResponse {
    agent_response: String,
    compliance_status: &'static str,
    policy_violations: Vec<crate::domain::PolicyViolation>,
    recommendations: Vec<String>,
    confidence_score: f64,
    context_usage: crate::domain::ContextUsage,
    processing_time_ms: u64,
    request_id: uuid::Uuid,
}

impl AgentResponse {
    fn from_result(result: &WorkflowResult) -> Self {
        let compliance_status = match result.final_status {
            crate::domain::FinalStatus::Compliant => "compliant",
            crate::domain::FinalStatus::Revised => "revised",
            crate::domain::FinalStatus::Flagged | crate::domain::FinalStatus::NonCompliant => "flagged",
            crate::domain::FinalStatus::Error => "flagged",
        };
        let (violations, recommendations) = match &result.critic {
            Some(critic) => (
                critic.violations.clone(),
                critic.violations.iter().filter_map(|v| v.suggested_fix.clone()).collect(),
            ),
            None => (Vec::new(), Vec::new()),
        };
        Self {
            agent_response: result.final_text.clone(),
            compliance_status,
            policy_violations: violations,
            recommendations,
            confidence_score: result.agent_confidence,
            context_usage: result.metrics.context_usage,
            processing_time_ms: result.metrics.total_ms,
            request_id: result.request_id,
        }
    }
}

async fn run_agent(state: AppState, envelope: RequestEnvelope) -> Result<Response, ApiError> {
    let request_id = RequestId::new();
    if let Err(e) = envelope.validate() {
        return Ok(ApiError::from(e).into_response_with_id(request_id.as_uuid()));
    }

    let started = Instant::now();
    let session = state.take_session(&envelope.session_id);

    let result = state.orchestrator.run(&envelope, &session).await;
    state.update_session(&envelope.session_id, &result);
    state.integration.record(&result);

    let elapsed_ms = started.elapsed().as_millis();
    let status = if result.success { StatusCode::OK } else { StatusCode::INTERNAL_SERVER_ERROR };
    let mut response = (status, Json(AgentResponse::from_result(&result))).into_response();
    response
        .headers_mut()
        .insert("x-request-id", HeaderValue::from_str(&request_id.as_str()).unwrap());
    response
        .headers_mut()
        .insert("x-process-time", HeaderValue::from_str(&(elapsed_ms as f64 / 1000.0).to_string()).unwrap());
    Ok(response)
}

#[derive(Debug, Serialize)]
struct MetricsResponse {
    per_agent: HashMap<AgentKind, AgentCounters>,
}

async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(MetricsResponse { per_agent: state.integration.all_counters() })
}

#[derive(Debug, Deserialize)]
struct RecentQuery {
    #[serde(default = "default_recent_limit")]
    limit: usize,
}

fn default_recent_limit() -> usize {
    20
}

async fn recent_handler(State(state): State<AppState>, Query(q): Query<RecentQuery>) -> impl IntoResponse {
    let entries: Vec<HistoryEntry> = state.integration.recent(q.limit);
    Json(entries)
}

#[derive(Debug, Deserialize)]
struct ComplianceReportQuery {
    #[serde(default = "default_report_window")]
    hours: i64,
}

fn default_report_window() -> i64 {
    24
}

async fn compliance_report_handler(
    State(state): State<AppState>,
    Query(q): Query<ComplianceReportQuery>,
) -> impl IntoResponse {
    let report: ComplianceReport = state.integration.compliance_report(q.hours);
    Json(report)
}

async fn reset_metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    state.integration.reset();
    StatusCode::NO_CONTENT
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::model_client::MockModelClient;
    use crate::agents::{ComplianceAgent, ForecastAgent, NegotiationAgent};
    use crate::context::ContextAssembler;
    use crate::critic::GlobalPolicyCritic;
    use crate::domain::BudgetConfig;
    use crate::policy::PolicyStore;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn test_state() -> AppState {
        let model: Arc<dyn crate::agents::ModelClient> = Arc::new(MockModelClient);
        let policy = Arc::new(PolicyStore::from_defaults());
        let context_assembler = Arc::new(ContextAssembler::new(policy.clone(), BudgetConfig::default()));
        let critic = Arc::new(GlobalPolicyCritic::new(policy.clone()));
        let negotiation: Arc<dyn Agent> = Arc::new(NegotiationAgent::new(model.clone()));
        let compliance: Arc<dyn Agent> = Arc::new(ComplianceAgent::new(model.clone(), policy.clone()));
        let forecast: Arc<dyn Agent> = Arc::new(ForecastAgent::new(model.clone(), policy));
        let orchestrator = Arc::new(WorkflowOrchestrator::new(
            negotiation.clone(),
            compliance.clone(),
            forecast.clone(),
            context_assembler,
            critic,
            BudgetConfig::default(),
        ));
        AppState::new(orchestrator, Arc::new(IntegrationManager::new()), [negotiation, compliance, forecast])
    }

    #[tokio::test]
    async fn health_returns_ok() {
        let app = create_router(test_state());
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn negotiation_endpoint_returns_workflow_result() {
        let app = create_router(test_state());
        let body = serde_json::json!({
            "session_id": "sess-1",
            "vendor": "Acme",
            "target_discount": 10.0,
            "category": "software"
        });
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/agent/negotiation")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn missing_session_id_is_unprocessable() {
        let app = create_router(test_state());
        let body = serde_json::json!({
            "session_id": "",
            "vendor": "Acme",
            "target_discount": 10.0,
            "category": "software"
        });
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/agent/negotiation")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
