use crate::{ApiError, ApiResult, AppState, StoreCredentials};
use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use shopinsight_core::{AnalysisResponse, QueryValidator};
use tracing::info;

pub const SERVICE_NAME: &str = "Shopify AI Analytics Agent";

#[derive(Serialize)]
pub struct ServiceInfo {
    pub service: String,
    pub status: String,
    pub version: String,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub cache: String,
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub store_id: String,
    pub question: String,
    #[serde(default)]
    pub context: RequestContext,
}

#[derive(Debug, Default, Deserialize)]
pub struct RequestContext {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub api_version: Option<String>,
}

#[derive(Deserialize)]
pub struct ValidateParams {
    pub query: String,
}

#[derive(Serialize)]
pub struct ValidateResponse {
    pub valid: bool,
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

pub async fn root() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        service: SERVICE_NAME.to_string(),
        status: "running".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let cache = if state.cache.is_available() {
        "available"
    } else {
        "degraded"
    };

    Json(HealthResponse {
        status: "healthy".to_string(),
        cache: cache.to_string(),
    })
}

pub async fn analyze(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> ApiResult<Json<AnalysisResponse>> {
    if request.store_id.trim().is_empty() {
        return Err(ApiError::BadRequest("store_id must not be empty".to_string()));
    }
    if request.question.trim().is_empty() {
        return Err(ApiError::BadRequest("question must not be empty".to_string()));
    }

    let access_token = request
        .context
        .access_token
        .filter(|token| !token.is_empty())
        .ok_or_else(|| ApiError::BadRequest("context.access_token is required".to_string()))?;

    info!(store_id = %request.store_id, "Processing question");

    let credentials = StoreCredentials {
        store_id: request.store_id,
        access_token,
        api_version: request.context.api_version,
    };
    let agent = state.agent_for(&credentials)?;
    let response = agent.process_question(&request.question).await?;

    Ok(Json(response))
}

pub async fn validate_query(Query(params): Query<ValidateParams>) -> Json<ValidateResponse> {
    let outcome = QueryValidator::check(&params.query);

    Json(ValidateResponse {
        valid: outcome.is_ok(),
        reason: outcome.err().map(|rejection| rejection.to_string()),
        query: params.query,
    })
}
