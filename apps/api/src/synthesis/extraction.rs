//! Extraction — turns uploaded files into structured review inputs.
//!
//! Each category is independent. A failed or unparsable extraction makes that
//! category unavailable for this request; it never fails the request. No retries.

use tracing::{info, warn};

use crate::llm_client::prompts::{JSON_ONLY_SYSTEM, TRANSCRIPTION_SYSTEM};
use crate::llm_client::{complete_json, CompletionRequest, CompletionService};
use crate::synthesis::models::{ItpScores, ReviewInputs};
use crate::synthesis::prompts::{ITP_EXTRACTION_PROMPT, TRANSCRIPTION_PROMPT};
use crate::synthesis::upload::{DocumentKind, ReviewUpload, UploadedFile};

/// Document text beyond this many characters is cut before it reaches the prompt.
pub const MAX_DOCUMENT_CHARS: usize = 20_000;

/// Reads ITP scores from rating-form images. `rater` names whose form it is.
pub async fn extract_itp_scores(
    service: &dyn CompletionService,
    images: &[UploadedFile],
    rater: &str,
) -> Option<ItpScores> {
    if images.is_empty() {
        return None;
    }

    let request = CompletionRequest::with_images(
        JSON_ONLY_SYSTEM,
        ITP_EXTRACTION_PROMPT.replace("{rater}", rater),
        images.iter().map(UploadedFile::to_inline_image).collect(),
    );

    match complete_json::<ItpScores>(service, &request).await {
        Ok(scores) => match scores.validated() {
            Some(scores) => {
                info!("Extracted {rater} ITP scores from {} image(s)", images.len());
                Some(scores)
            }
            None => {
                warn!("Extracted {rater} ITP scores out of range, dropping: {scores:?}");
                None
            }
        },
        Err(e) => {
            warn!("{rater} ITP score extraction failed, category unavailable: {e}");
            None
        }
    }
}

/// Transcribes text from page images. `label` describes the pages in the prompt.
pub async fn extract_text(
    service: &dyn CompletionService,
    images: &[UploadedFile],
    label: &str,
) -> Option<String> {
    if images.is_empty() {
        return None;
    }

    let request = CompletionRequest::with_images(
        TRANSCRIPTION_SYSTEM,
        TRANSCRIPTION_PROMPT.replace("{label}", label),
        images.iter().map(UploadedFile::to_inline_image).collect(),
    );

    match service.complete(&request).await {
        Ok(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
        Ok(_) => {
            warn!("{label} transcription returned no text");
            None
        }
        Err(e) => {
            warn!("{label} transcription failed, category unavailable: {e}");
            None
        }
    }
}

/// Extracts the text of a 360 feedback document. PDFs and plain text are read
/// locally; images go through transcription.
pub async fn extract_document_text(
    service: &dyn CompletionService,
    document: &UploadedFile,
) -> Option<String> {
    let text = match document.document_kind() {
        DocumentKind::Pdf => {
            let data = document.data.clone();
            match tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&data))
                .await
            {
                Ok(Ok(text)) => Some(text),
                Ok(Err(e)) => {
                    warn!("360 feedback PDF could not be read: {e}");
                    None
                }
                Err(e) => {
                    warn!("360 feedback PDF extraction task failed: {e}");
                    None
                }
            }
        }
        DocumentKind::Text => Some(String::from_utf8_lossy(&document.data).into_owned()),
        DocumentKind::Image => {
            extract_text(service, std::slice::from_ref(document), "360 feedback").await
        }
        DocumentKind::Unknown => match std::str::from_utf8(&document.data) {
            Ok(text) => Some(text.to_string()),
            Err(_) => {
                warn!(
                    "Unsupported 360 feedback document type: {:?}",
                    document.content_type
                );
                None
            }
        },
    }?;

    let text = text.trim();
    if text.is_empty() {
        warn!("360 feedback document contained no text");
        return None;
    }
    Some(truncate_chars(text, MAX_DOCUMENT_CHARS))
}

pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

fn join_texts(typed: Option<String>, transcribed: Option<String>) -> Option<String> {
    match (typed, transcribed) {
        (Some(a), Some(b)) => Some(format!("{a}\n\n{b}")),
        (a, b) => a.or(b),
    }
}

/// Runs every extraction the upload calls for, concurrently, and assembles the inputs.
/// Manually entered scores skip image extraction for that rater.
pub async fn extract_inputs(
    service: &dyn CompletionService,
    upload: ReviewUpload,
) -> ReviewInputs {
    let employee_itp = async {
        match upload.employee_itp_scores {
            Some(scores) => Some(scores),
            None => {
                extract_itp_scores(
                    service,
                    &upload.employee_itp_images,
                    "employee self-assessment",
                )
                .await
            }
        }
    };
    let manager_itp = async {
        match upload.manager_itp_scores {
            Some(scores) => Some(scores),
            None => {
                extract_itp_scores(service, &upload.manager_itp_images, "manager assessment").await
            }
        }
    };
    let feedback_360 = async {
        match &upload.feedback_360 {
            Some(document) => extract_document_text(service, document).await,
            None => None,
        }
    };
    let self_review = extract_text(service, &upload.self_review_images, "self-review");

    let (employee_itp, manager_itp, feedback_360, transcribed_self_review) =
        tokio::join!(employee_itp, manager_itp, feedback_360, self_review);

    ReviewInputs {
        employee_itp,
        manager_itp,
        feedback_360,
        self_review: join_texts(upload.self_review_text.clone(), transcribed_self_review),
        manager_comments: upload.manager_comments.clone(),
    }
}
