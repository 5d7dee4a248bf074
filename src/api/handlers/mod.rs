use std::path::PathBuf;
use std::time::Duration;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::DocError;
use crate::models::*;
use crate::workflow::{
    GenerateDocument, GeneratedDocument, Health, ReviewSubmission, ReviewTarget, Workflow,
};

// ============================================================
// Error Handling
// ============================================================

impl DocError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::InvalidTransition { .. } | Self::EmptySelection => StatusCode::CONFLICT,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::ReviewFile { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::StorageUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::ExternalService(_) => StatusCode::BAD_GATEWAY,
            Self::GenerationTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

impl IntoResponse for DocError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("{} ({}): {}", status, self.kind(), self);
        } else {
            tracing::debug!("{} ({}): {}", status, self.kind(), self);
        }

        let body = serde_json::json!({
            "error": {
                "kind": self.kind(),
                "message": self.to_string(),
                "retryable": self.is_retryable(),
            }
        });
        (status, Json(body)).into_response()
    }
}

/// Unwrap a JSON body, reporting malformed input and unknown fields as validation errors.
fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, DocError> {
    payload
        .map(|Json(value)| value)
        .map_err(|e| DocError::validation(e.body_text()))
}

fn query<T>(params: Result<Query<T>, QueryRejection>) -> Result<T, DocError> {
    params
        .map(|Query(value)| value)
        .map_err(|e| DocError::validation(e.body_text()))
}

fn path<T>(param: Result<Path<T>, PathRejection>) -> Result<T, DocError> {
    param
        .map(|Path(value)| value)
        .map_err(|e| DocError::validation(e.body_text()))
}

// ============================================================
// Request Types
// ============================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GenerateRequest {
    pub context: String,
    #[serde(default = "default_doc_type")]
    pub doc_type: DocType,
    #[serde(default)]
    pub licensing_focus: bool,
    #[serde(default = "default_source")]
    pub source: String,
    #[serde(default)]
    pub features: Option<String>,
    /// Per-attempt timeout in seconds.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_doc_type() -> DocType {
    DocType::TechnicalSpec
}

fn default_source() -> String {
    "api".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubmitReviewRequest {
    #[serde(default)]
    pub document_id: Option<i64>,
    #[serde(default)]
    pub filepath: Option<String>,
    #[serde(default)]
    pub reviewed_content: Option<String>,
    pub changes_summary: String,
    pub reviewer_name: String,
    #[serde(default)]
    pub quality_score: Option<f64>,
    #[serde(default)]
    pub prepare_for_licensing: bool,
}

impl SubmitReviewRequest {
    fn into_parts(self) -> Result<(ReviewTarget, ReviewSubmission), DocError> {
        let target = match (self.document_id, self.filepath) {
            (Some(id), None) => ReviewTarget::Document(id),
            (None, Some(path)) if !path.trim().is_empty() => {
                ReviewTarget::File(PathBuf::from(path.trim()))
            }
            (Some(_), Some(_)) => {
                return Err(DocError::validation(
                    "give either document_id or filepath, not both",
                ))
            }
            _ => return Err(DocError::validation("document_id or filepath is required")),
        };
        let submission = ReviewSubmission {
            reviewed_content: self.reviewed_content,
            changes_summary: self.changes_summary,
            reviewer_name: self.reviewer_name,
            quality_score: self.quality_score,
            prepare_for_licensing: self.prepare_for_licensing,
        };
        Ok((target, submission))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreatePackageRequest {
    pub product_name: String,
    pub version: String,
    #[serde(default)]
    pub manifest: Option<Vec<i64>>,
}

#[derive(Debug, Deserialize)]
pub struct CostsQuery {
    #[serde(default = "default_days")]
    pub days: u32,
}

fn default_days() -> u32 {
    30
}

#[derive(Debug, Deserialize)]
pub struct InsightsQuery {
    #[serde(default = "default_insight_days")]
    pub days: u32,
}

fn default_insight_days() -> u32 {
    7
}

#[derive(Debug, Deserialize)]
pub struct DocumentsQuery {
    pub status: Option<String>,
}

// ============================================================
// Health
// ============================================================

pub async fn health(State(workflow): State<Workflow>) -> Result<Json<Health>, DocError> {
    workflow.health().map(Json)
}

// ============================================================
// Generation
// ============================================================

pub async fn generate(
    State(workflow): State<Workflow>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<GeneratedDocument>), DocError> {
    let request = body(payload)?;
    let params = GenerateDocument {
        doc_type: request.doc_type,
        context: request.context,
        features: request.features,
        licensing_focus: request.licensing_focus,
        source: request.source,
        timeout: request.timeout_secs.map(Duration::from_secs),
    };
    let generated = workflow.generate(params).await?;
    Ok((StatusCode::CREATED, Json(generated)))
}

// ============================================================
// Documents
// ============================================================

pub async fn review_queue(
    State(workflow): State<Workflow>,
) -> Result<Json<Vec<Document>>, DocError> {
    workflow.review_queue().map(Json)
}

pub async fn list_documents(
    State(workflow): State<Workflow>,
    params: Result<Query<DocumentsQuery>, QueryRejection>,
) -> Result<Json<Vec<Document>>, DocError> {
    let params = query(params)?;
    let status = match params.status.as_deref() {
        None | Some("") => None,
        Some(s) => Some(DocumentStatus::from_str(s).ok_or_else(|| {
            DocError::validation(format!(
                "unknown status {:?}, expected review, completed, or licensed",
                s
            ))
        })?),
    };
    workflow.list_documents(status).map(Json)
}

pub async fn get_document(
    State(workflow): State<Workflow>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Document>, DocError> {
    workflow.document(path(id)?).map(Json)
}

pub async fn submit_review(
    State(workflow): State<Workflow>,
    payload: Result<Json<SubmitReviewRequest>, JsonRejection>,
) -> Result<Json<Document>, DocError> {
    let (target, submission) = body(payload)?.into_parts()?;
    workflow.submit_review(target, submission).map(Json)
}

// ============================================================
// Licensing Packages
// ============================================================

pub async fn create_package(
    State(workflow): State<Workflow>,
    payload: Result<Json<CreatePackageRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<LicensingPackage>), DocError> {
    let request = body(payload)?;
    let package = workflow.create_package(CreatePackageInput {
        product_name: request.product_name,
        version: request.version,
        manifest: request.manifest,
    })?;
    Ok((StatusCode::CREATED, Json(package)))
}

pub async fn list_packages(
    State(workflow): State<Workflow>,
) -> Result<Json<Vec<LicensingPackage>>, DocError> {
    workflow.list_packages().map(Json)
}

pub async fn get_package(
    State(workflow): State<Workflow>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<LicensingPackage>, DocError> {
    workflow.package(path(id)?).map(Json)
}

// ============================================================
// Costs
// ============================================================

pub async fn costs(
    State(workflow): State<Workflow>,
    params: Result<Query<CostsQuery>, QueryRejection>,
) -> Result<Json<CostSummary>, DocError> {
    workflow.cost_summary(query(params)?.days).map(Json)
}

pub async fn budget(State(workflow): State<Workflow>) -> Result<Json<BudgetStatus>, DocError> {
    workflow.budget_status().map(Json)
}

// ============================================================
// Review Insights
// ============================================================

pub async fn review_insights(
    State(workflow): State<Workflow>,
    params: Result<Query<InsightsQuery>, QueryRejection>,
) -> Result<Json<ReviewInsights>, DocError> {
    workflow.review_insights(query(params)?.days).map(Json)
}
