use std::sync::Arc;
use std::time::Duration;

use procuresense_orchestrator::agents::{
    Agent, ComplianceAgent, ForecastAgent, MockModelClient, ModelClient, NegotiationAgent,
};
use procuresense_orchestrator::agents::model_client::HttpModelClient;
use procuresense_orchestrator::api::{create_router, AppState};
use procuresense_orchestrator::config::ServiceConfig;
use procuresense_orchestrator::context::ContextAssembler;
use procuresense_orchestrator::critic::GlobalPolicyCritic;
use procuresense_orchestrator::integration::IntegrationManager;
use procuresense_orchestrator::orchestrator::WorkflowOrchestrator;
use procuresense_orchestrator::policy::{PolicySnapshot, PolicyStore};
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    procuresense_orchestrator::init()?;

    let config = ServiceConfig::load()?;
    let budget = config.budget_config()?;

    let mut snapshot = PolicySnapshot::from_defaults();
    snapshot.budget_thresholds = config.parse_budget_thresholds()?;
    snapshot.auto_revision_enabled = config.auto_revision_enabled;
    let policy = Arc::new(PolicyStore::new(snapshot));

    let model: Arc<dyn ModelClient> = match config.model_provider.llm_provider.as_str() {
        "mock" => Arc::new(MockModelClient),
        _ => {
            let api_base = config
                .model_provider
                .llm_api_base
                .clone()
                .unwrap_or_else(|| "https://api.openai.com/v1".to_string());
            let api_key = config.model_provider.llm_api_key.clone().unwrap_or_default();
            Arc::new(HttpModelClient::new(api_base, api_key, config.model_provider.llm_model.clone()))
        }
    };

    let negotiation: Arc<dyn Agent> = Arc::new(NegotiationAgent::new(model.clone()));
    let compliance: Arc<dyn Agent> = Arc::new(ComplianceAgent::new(model.clone(), policy.clone()));
    let forecast: Arc<dyn Agent> = Arc::new(ForecastAgent::new(model, policy.clone()));

    let context_assembler = Arc::new(ContextAssembler::new(policy.clone(), budget.clone()));
    let critic = Arc::new(GlobalPolicyCritic::new(policy));
    let orchestrator = Arc::new(WorkflowOrchestrator::new(
        negotiation.clone(),
        compliance.clone(),
        forecast.clone(),
        context_assembler,
        critic,
        budget,
    ));
    let integration = Arc::new(IntegrationManager::new());

    let state = AppState::new(orchestrator, integration, [negotiation, compliance, forecast]);
    let app = create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(TimeoutLayer::new(Duration::from_secs(30)));

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "procuresense orchestrator listening");
    axum::serve(listener, app).await?;
    Ok(())
}
