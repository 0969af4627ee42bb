//! Review workflow: draft → inputs_complete → generated → reviewed → finalized.
//!
//! Regeneration is allowed from `generated` and `reviewed`; manager edits may be
//! saved repeatedly while `reviewed`. `finalized` is terminal.

use crate::errors::AppError;
use crate::models::review::ReviewStatus;

pub fn can_transition(from: ReviewStatus, to: ReviewStatus) -> bool {
    use crate::models::review::ReviewStatus::*;
    matches!(
        (from, to),
        (Draft, InputsComplete)
            | (InputsComplete, Generated)
            | (Generated, Generated)
            | (Generated, Reviewed)
            | (Reviewed, Generated)
            | (Reviewed, Reviewed)
            | (Reviewed, Finalized)
    )
}

pub fn check_transition(from: ReviewStatus, to: ReviewStatus) -> Result<(), AppError> {
    if from == ReviewStatus::Finalized {
        return Err(AppError::Conflict(
            "Review is finalized and can no longer be changed".to_string(),
        ));
    }
    if !can_transition(from, to) {
        return Err(AppError::Conflict(format!(
            "Cannot move review from '{from}' to '{to}'"
        )));
    }
    Ok(())
}
