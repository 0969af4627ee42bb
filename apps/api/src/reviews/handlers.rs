//! Axum route handlers for the review storage API.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::review::{ReviewHistoryRow, ReviewRow, ReviewStatus};
use crate::reviews::store::{self, FinalEdits, GeneratedReview};
use crate::state::AppState;
use crate::synthesis::models::{InputsUsed, ItpScores, ReviewSections};

// ────────────────────────────────────────────────────────────────────────────
// Request types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateReviewRequest {
    pub employee_id: Uuid,
    pub cycle_id: Uuid,
    pub created_by: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct SaveGeneratedRequest {
    #[serde(flatten)]
    pub sections: ReviewSections,
    #[serde(default)]
    pub inputs_used: InputsUsed,
    pub employee_itp: Option<ItpScores>,
    pub manager_itp: Option<ItpScores>,
    pub changed_by: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct SaveFinalRequest {
    pub strengths: Option<String>,
    pub development_feedback: Option<String>,
    pub goals: Option<String>,
    pub overall_assessment: Option<String>,
    pub changed_by: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct ChangeStatusRequest {
    pub status: ReviewStatus,
    pub changed_by: Option<Uuid>,
}

fn checked_scores(field: &str, scores: Option<ItpScores>) -> Result<Option<ItpScores>, AppError> {
    match scores {
        Some(s) if !s.is_valid() => Err(AppError::Validation(format!(
            "{field} values must each be between 1 and 10"
        ))),
        other => Ok(other),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/reviews
///
/// Opens a `draft` review. A second review for the same employee and cycle is a 409.
pub async fn handle_create_review(
    State(state): State<AppState>,
    Json(request): Json<CreateReviewRequest>,
) -> Result<(StatusCode, Json<ReviewRow>), AppError> {
    let review = store::create_review(
        state.db()?,
        request.employee_id,
        request.cycle_id,
        request.created_by,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(review)))
}

/// GET /api/v1/reviews/:id
pub async fn handle_get_review(
    State(state): State<AppState>,
    Path(review_id): Path<Uuid>,
) -> Result<Json<ReviewRow>, AppError> {
    let review = store::get_review(state.db()?, review_id).await?;
    Ok(Json(review))
}

/// GET /api/v1/reviews/:id/history
pub async fn handle_get_history(
    State(state): State<AppState>,
    Path(review_id): Path<Uuid>,
) -> Result<Json<Vec<ReviewHistoryRow>>, AppError> {
    let history = store::get_history(state.db()?, review_id).await?;
    Ok(Json(history))
}

/// PUT /api/v1/reviews/:id/generated
///
/// Stores a synthesis result on the review and moves it to `generated`.
pub async fn handle_save_generated(
    State(state): State<AppState>,
    Path(review_id): Path<Uuid>,
    Json(request): Json<SaveGeneratedRequest>,
) -> Result<Json<ReviewRow>, AppError> {
    let pool = state.db()?;
    let employee_itp = checked_scores("employee_itp", request.employee_itp)?;
    let manager_itp = checked_scores("manager_itp", request.manager_itp)?;

    let review = store::save_generated(
        pool,
        review_id,
        GeneratedReview {
            sections: &request.sections,
            inputs_used: request.inputs_used,
            employee_itp,
            manager_itp,
        },
        request.changed_by,
    )
    .await?;
    Ok(Json(review))
}

/// PATCH /api/v1/reviews/:id/final
///
/// Stores manager-edited text (any subset of sections) and moves the review to `reviewed`.
pub async fn handle_save_final(
    State(state): State<AppState>,
    Path(review_id): Path<Uuid>,
    Json(request): Json<SaveFinalRequest>,
) -> Result<Json<ReviewRow>, AppError> {
    let pool = state.db()?;
    let edits = FinalEdits {
        strengths: request.strengths.as_deref(),
        development_feedback: request.development_feedback.as_deref(),
        goals: request.goals.as_deref(),
        overall_assessment: request.overall_assessment.as_deref(),
    };
    if edits.is_empty() {
        return Err(AppError::Validation(
            "At least one section must be provided".to_string(),
        ));
    }

    let review = store::save_final(pool, review_id, edits, request.changed_by).await?;
    Ok(Json(review))
}

/// POST /api/v1/reviews/:id/status
pub async fn handle_change_status(
    State(state): State<AppState>,
    Path(review_id): Path<Uuid>,
    Json(request): Json<ChangeStatusRequest>,
) -> Result<Json<ReviewRow>, AppError> {
    let review =
        store::change_status(state.db()?, review_id, request.status, request.changed_by).await?;
    Ok(Json(review))
}
