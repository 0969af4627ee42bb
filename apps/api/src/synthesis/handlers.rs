//! Axum route handler for the synthesis API.

use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    Json,
};
use tracing::info;

use crate::errors::AppError;
use crate::state::AppState;
use crate::synthesis::extraction::extract_inputs;
use crate::synthesis::generator::{synthesize, SynthesisOptions};
use crate::synthesis::models::SynthesisResponse;
use crate::synthesis::upload::read_upload;

/// POST /api/v1/reviews/synthesize
///
/// Accepts any subset of the review inputs as multipart form data and returns a
/// four-section review. Completion-service failures never surface here: the
/// response is a 200 with fallback text. Only a malformed request is an error.
pub async fn handle_synthesize(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<SynthesisResponse>, AppError> {
    let multipart = multipart.map_err(|e| AppError::Validation(e.body_text()))?;

    let upload = read_upload(multipart).await?;
    let inputs = extract_inputs(state.llm.as_ref(), upload).await;

    let options = SynthesisOptions {
        skip_when_empty: state.config.skip_synthesis_when_empty,
    };
    let response = synthesize(state.llm.as_ref(), inputs, options).await;

    info!(
        "Synthesis complete: source={:?}, inputs={:?}",
        response.source, response.inputs_used
    );
    Ok(Json(response))
}
