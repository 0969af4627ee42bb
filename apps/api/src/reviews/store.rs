//! Review persistence. Every status change runs in a transaction that locks the
//! row, checks the transition, updates it and appends a `review_history` row.

use sqlx::{PgPool, Postgres, Transaction};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::review::{ReviewHistoryRow, ReviewRow, ReviewStatus};
use crate::reviews::lifecycle::check_transition;
use crate::synthesis::models::{InputsUsed, ItpScores, ReviewSections};

/// AI output plus the inputs it was built from.
pub struct GeneratedReview<'a> {
    pub sections: &'a ReviewSections,
    pub inputs_used: InputsUsed,
    pub employee_itp: Option<ItpScores>,
    pub manager_itp: Option<ItpScores>,
}

/// Manager edits. `None` leaves the stored final text unchanged.
#[derive(Debug, Default)]
pub struct FinalEdits<'a> {
    pub strengths: Option<&'a str>,
    pub development_feedback: Option<&'a str>,
    pub goals: Option<&'a str>,
    pub overall_assessment: Option<&'a str>,
}

impl FinalEdits<'_> {
    pub fn is_empty(&self) -> bool {
        self.strengths.is_none()
            && self.development_feedback.is_none()
            && self.goals.is_none()
            && self.overall_assessment.is_none()
    }
}

/// Postgres SQLSTATE codes the create path turns into client errors.
const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";

/// Maps an insert failure on `reviews` to the error the client should see.
fn map_create_error(err: sqlx::Error, employee_id: Uuid, cycle_id: Uuid) -> AppError {
    let code = match &err {
        sqlx::Error::Database(db) => db.code().map(|c| c.into_owned()),
        _ => None,
    };
    match code.as_deref() {
        Some(UNIQUE_VIOLATION) => AppError::Conflict(format!(
            "A review already exists for employee {employee_id} in cycle {cycle_id}"
        )),
        Some(FOREIGN_KEY_VIOLATION) => AppError::NotFound(format!(
            "Employee {employee_id} or review cycle {cycle_id} not found"
        )),
        _ => AppError::Database(err),
    }
}

fn parse_status(row: &ReviewRow) -> Result<ReviewStatus, AppError> {
    row.status
        .parse::<ReviewStatus>()
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Review {}: {e}", row.id)))
}

pub async fn get_review(pool: &PgPool, review_id: Uuid) -> Result<ReviewRow, AppError> {
    sqlx::query_as::<_, ReviewRow>("SELECT * FROM reviews WHERE id = $1")
        .bind(review_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Review {review_id} not found")))
}

pub async fn get_history(
    pool: &PgPool,
    review_id: Uuid,
) -> Result<Vec<ReviewHistoryRow>, AppError> {
    // 404 rather than an empty list for unknown reviews
    get_review(pool, review_id).await?;

    let rows = sqlx::query_as::<_, ReviewHistoryRow>(
        "SELECT * FROM review_history WHERE review_id = $1 ORDER BY created_at, id",
    )
    .bind(review_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Locks the review row and validates the move to `to`. Returns the current status.
async fn lock_for_transition(
    tx: &mut Transaction<'_, Postgres>,
    review_id: Uuid,
    to: ReviewStatus,
) -> Result<ReviewStatus, AppError> {
    let row = sqlx::query_as::<_, ReviewRow>("SELECT * FROM reviews WHERE id = $1 FOR UPDATE")
        .bind(review_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Review {review_id} not found")))?;

    let from = parse_status(&row)?;
    check_transition(from, to)?;
    Ok(from)
}

async fn record_history(
    tx: &mut Transaction<'_, Postgres>,
    review_id: Uuid,
    from: Option<ReviewStatus>,
    to: ReviewStatus,
    changed_by: Option<Uuid>,
) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO review_history (review_id, from_status, to_status, changed_by)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(review_id)
    .bind(from.map(ReviewStatus::as_str))
    .bind(to.as_str())
    .bind(changed_by)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Opens a `draft` review for an employee in a cycle. At most one per pair.
pub async fn create_review(
    pool: &PgPool,
    employee_id: Uuid,
    cycle_id: Uuid,
    created_by: Option<Uuid>,
) -> Result<ReviewRow, AppError> {
    let to = ReviewStatus::Draft;
    let mut tx = pool.begin().await?;

    let row = sqlx::query_as::<_, ReviewRow>(
        r#"
        INSERT INTO reviews (employee_id, cycle_id, status)
        VALUES ($1, $2, $3)
        RETURNING *
        "#,
    )
    .bind(employee_id)
    .bind(cycle_id)
    .bind(to.as_str())
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| map_create_error(e, employee_id, cycle_id))?;

    record_history(&mut tx, row.id, None, to, created_by).await?;
    tx.commit().await?;

    info!("Review {} created for employee {employee_id} (cycle {cycle_id})", row.id);
    Ok(row)
}

/// Stores AI-generated text and moves the review to `generated`.
pub async fn save_generated(
    pool: &PgPool,
    review_id: Uuid,
    generated: GeneratedReview<'_>,
    changed_by: Option<Uuid>,
) -> Result<ReviewRow, AppError> {
    let to = ReviewStatus::Generated;
    let inputs_used = serde_json::to_value(generated.inputs_used)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize inputs_used: {e}")))?;
    let score = |s: Option<ItpScores>, f: fn(&ItpScores) -> u8| s.map(|s| f(&s) as i16);

    let mut tx = pool.begin().await?;
    let from = lock_for_transition(&mut tx, review_id, to).await?;

    let row = sqlx::query_as::<_, ReviewRow>(
        r#"
        UPDATE reviews SET
            ai_strengths = $2,
            ai_development_feedback = $3,
            ai_goals = $4,
            ai_overall_assessment = $5,
            inputs_used = $6,
            employee_humble = COALESCE($7, employee_humble),
            employee_hungry = COALESCE($8, employee_hungry),
            employee_smart = COALESCE($9, employee_smart),
            manager_humble = COALESCE($10, manager_humble),
            manager_hungry = COALESCE($11, manager_hungry),
            manager_smart = COALESCE($12, manager_smart),
            status = $13,
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(review_id)
    .bind(&generated.sections.strengths)
    .bind(&generated.sections.development_feedback)
    .bind(&generated.sections.goals)
    .bind(&generated.sections.overall_assessment)
    .bind(&inputs_used)
    .bind(score(generated.employee_itp, |s| s.humble))
    .bind(score(generated.employee_itp, |s| s.hungry))
    .bind(score(generated.employee_itp, |s| s.smart))
    .bind(score(generated.manager_itp, |s| s.humble))
    .bind(score(generated.manager_itp, |s| s.hungry))
    .bind(score(generated.manager_itp, |s| s.smart))
    .bind(to.as_str())
    .fetch_one(&mut *tx)
    .await?;

    record_history(&mut tx, review_id, Some(from), to, changed_by).await?;
    tx.commit().await?;

    info!("Review {review_id}: {from} → {to} (AI sections stored)");
    Ok(row)
}

/// Stores manager-edited final text and moves the review to `reviewed`.
pub async fn save_final(
    pool: &PgPool,
    review_id: Uuid,
    edits: FinalEdits<'_>,
    changed_by: Option<Uuid>,
) -> Result<ReviewRow, AppError> {
    let to = ReviewStatus::Reviewed;

    let mut tx = pool.begin().await?;
    let from = lock_for_transition(&mut tx, review_id, to).await?;

    let row = sqlx::query_as::<_, ReviewRow>(
        r#"
        UPDATE reviews SET
            final_strengths = COALESCE($2, final_strengths),
            final_development_feedback = COALESCE($3, final_development_feedback),
            final_goals = COALESCE($4, final_goals),
            final_overall_assessment = COALESCE($5, final_overall_assessment),
            status = $6,
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(review_id)
    .bind(edits.strengths)
    .bind(edits.development_feedback)
    .bind(edits.goals)
    .bind(edits.overall_assessment)
    .bind(to.as_str())
    .fetch_one(&mut *tx)
    .await?;

    record_history(&mut tx, review_id, Some(from), to, changed_by).await?;
    tx.commit().await?;

    info!("Review {review_id}: {from} → {to} (manager edits stored)");
    Ok(row)
}

/// Moves the review to `to` without touching its text.
pub async fn change_status(
    pool: &PgPool,
    review_id: Uuid,
    to: ReviewStatus,
    changed_by: Option<Uuid>,
) -> Result<ReviewRow, AppError> {
    let mut tx = pool.begin().await?;
    let from = lock_for_transition(&mut tx, review_id, to).await?;

    let row = sqlx::query_as::<_, ReviewRow>(
        "UPDATE reviews SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
    )
    .bind(review_id)
    .bind(to.as_str())
    .fetch_one(&mut *tx)
    .await?;

    record_history(&mut tx, review_id, Some(from), to, changed_by).await?;
    tx.commit().await?;

    info!("Review {review_id}: {from} → {to}");
    Ok(row)
}
