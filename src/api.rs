//! HTTP surface for the presentation collaborator: one `/process` call per
//! user submission, plus diagnostic endpoints for classification and
//! engagement previews.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;

use crate::category::{Category, ClassificationResult, ProcessedComment};
use crate::classify::ClassifierAdapter;
use crate::crm::{ContactInfo, CrmClient, CrmSyncReport};
use crate::engagement::engagement_score;
use crate::lexical::LexicalScorer;
use crate::model::{DynClassifier, DynGenerator};
use crate::processor::{CommentProcessor, ProcessError};
use crate::profiles::Profiles;

#[derive(Clone)]
pub struct AppState {
    processor: Arc<CommentProcessor>,
    classifier: Arc<ClassifierAdapter>,
    lexical: Arc<LexicalScorer>,
    profiles: Arc<Profiles>,
    crm: Option<Arc<CrmClient>>,
}

impl AppState {
    pub fn new(
        profiles: Arc<Profiles>,
        classify_backend: DynClassifier,
        generate_backend: DynGenerator,
        crm: Option<Arc<CrmClient>>,
    ) -> Self {
        Self {
            processor: Arc::new(CommentProcessor::new(
                profiles.clone(),
                classify_backend.clone(),
                generate_backend,
            )),
            classifier: Arc::new(ClassifierAdapter::new(profiles.clone(), classify_backend)),
            lexical: Arc::new(LexicalScorer::new(profiles.clone())),
            profiles,
            crm,
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/process", post(process))
        .route("/classify", post(classify))
        .route("/engage", post(engage))
        .route("/crm/sync", post(crm_sync))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(serde::Deserialize)]
struct CommentReq {
    comment: String,
}

#[derive(serde::Serialize)]
struct ErrorBody {
    error: String,
}

async fn process(
    State(state): State<AppState>,
    Json(body): Json<CommentReq>,
) -> Result<Json<ProcessedComment>, (StatusCode, Json<ErrorBody>)> {
    match state.processor.process(&body.comment).await {
        Ok(result) => Ok(Json(result)),
        Err(e @ ProcessError::InvalidInput) => Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ErrorBody {
                error: e.to_string(),
            }),
        )),
    }
}

async fn classify(
    State(state): State<AppState>,
    Json(body): Json<CommentReq>,
) -> Json<ClassificationResult> {
    Json(state.classifier.classify(&body.comment).await)
}

#[derive(serde::Deserialize)]
struct EngageReq {
    comment: String,
    /// When absent, the deterministic keyword classification is used (the
    /// preview never calls the model).
    #[serde(default)]
    category: Option<Category>,
}

#[derive(serde::Serialize)]
struct EngageResp {
    category: Category,
    families: Vec<String>,
    score: i32,
}

async fn engage(State(state): State<AppState>, Json(body): Json<EngageReq>) -> Json<EngageResp> {
    let category = body
        .category
        .unwrap_or_else(|| state.lexical.classify(&body.comment));
    let families = state.lexical.families(&body.comment);
    let score = engagement_score(&state.profiles, category, &families);
    Json(EngageResp {
        category,
        families: families.into_iter().collect(),
        score,
    })
}

#[derive(serde::Deserialize)]
struct CrmSyncReq {
    comment: String,
    category: Category,
    contact: ContactInfo,
}

/// Hand a processed comment to the CRM collaborator. Sync failures come back
/// inside the report's `error` field, never as an HTTP error; only a missing
/// integration is a request-level failure.
async fn crm_sync(
    State(state): State<AppState>,
    Json(body): Json<CrmSyncReq>,
) -> Result<Json<CrmSyncReport>, (StatusCode, Json<ErrorBody>)> {
    match &state.crm {
        Some(crm) => Ok(Json(
            crm.sync_comment(&body.comment, body.category, &body.contact)
                .await,
        )),
        None => Err((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorBody {
                error: "CRM integration is not configured".to_string(),
            }),
        )),
    }
}
