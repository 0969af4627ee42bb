//! Multipart intake for the synthesis endpoint.
//!
//! Collects form fields into a `ReviewUpload`. Only presence is checked here:
//! empty files and blank text fields are treated as absent.

use axum::extract::multipart::{Multipart, MultipartError};
use axum::http::StatusCode;
use bytes::Bytes;
use mime_guess::mime;
use tracing::{debug, warn};

use crate::errors::AppError;
use crate::llm_client::InlineImage;
use crate::synthesis::models::ItpScores;

pub const FIELD_EMPLOYEE_ITP_IMAGES: &str = "employee_itp_images";
pub const FIELD_MANAGER_ITP_IMAGES: &str = "manager_itp_images";
pub const FIELD_EMPLOYEE_ITP_SCORES: &str = "employee_itp_scores";
pub const FIELD_MANAGER_ITP_SCORES: &str = "manager_itp_scores";
pub const FIELD_FEEDBACK_360: &str = "feedback_360";
pub const FIELD_SELF_REVIEW_IMAGES: &str = "self_review_images";
pub const FIELD_SELF_REVIEW_TEXT: &str = "self_review_text";
pub const FIELD_MANAGER_COMMENTS: &str = "manager_comments";

const DEFAULT_IMAGE_TYPE: &str = "image/png";

/// A file part from the multipart body.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Bytes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Text,
    Image,
    Unknown,
}

impl UploadedFile {
    /// Declared content type unless it is the generic octet-stream, else a guess from the name.
    fn effective_mime(&self) -> Option<mime::Mime> {
        let declared = self
            .content_type
            .as_deref()
            .and_then(|ct| ct.parse::<mime::Mime>().ok())
            .filter(|m| *m != mime::APPLICATION_OCTET_STREAM);
        declared.or_else(|| {
            self.file_name
                .as_deref()
                .and_then(|name| mime_guess::from_path(name).first())
        })
    }

    /// Media type for an inline image block. Falls back to PNG when nothing better is known.
    pub fn image_media_type(&self) -> String {
        self.effective_mime()
            .filter(|m| m.type_() == mime::IMAGE)
            .map(|m| m.essence_str().to_string())
            .unwrap_or_else(|| DEFAULT_IMAGE_TYPE.to_string())
    }

    pub fn document_kind(&self) -> DocumentKind {
        if self.data.starts_with(b"%PDF-") {
            return DocumentKind::Pdf;
        }
        match self.effective_mime() {
            Some(m) if m.essence_str() == "application/pdf" => DocumentKind::Pdf,
            Some(m) if m.type_() == mime::TEXT => DocumentKind::Text,
            Some(m) if m.type_() == mime::IMAGE => DocumentKind::Image,
            _ => DocumentKind::Unknown,
        }
    }

    pub fn to_inline_image(&self) -> InlineImage {
        InlineImage::from_bytes(&self.data, self.image_media_type())
    }
}

/// Raw form contents of one synthesis request.
#[derive(Debug, Clone, Default)]
pub struct ReviewUpload {
    pub employee_itp_images: Vec<UploadedFile>,
    pub manager_itp_images: Vec<UploadedFile>,
    /// Manually entered scores; take precedence over images.
    pub employee_itp_scores: Option<ItpScores>,
    pub manager_itp_scores: Option<ItpScores>,
    pub feedback_360: Option<UploadedFile>,
    pub self_review_images: Vec<UploadedFile>,
    pub self_review_text: Option<String>,
    pub manager_comments: Option<String>,
}

fn non_blank(text: String) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn parse_manual_scores(field: &str, raw: &str) -> Result<ItpScores, AppError> {
    let scores: ItpScores = serde_json::from_str(raw).map_err(|e| {
        AppError::Validation(format!(
            "{field} must be a JSON object with humble, hungry and smart: {e}"
        ))
    })?;
    scores.validated().ok_or_else(|| {
        AppError::Validation(format!("{field} values must each be between 1 and 10"))
    })
}

/// Maps a body read failure, keeping the body limit distinct from malformed input.
fn multipart_error(context: &str, e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge("Upload exceeds the maximum request size".to_string())
    } else {
        AppError::Validation(format!("{context}: {}", e.body_text()))
    }
}

/// Drains the multipart stream into a `ReviewUpload`.
pub async fn read_upload(mut multipart: Multipart) -> Result<ReviewUpload, AppError> {
    let mut upload = ReviewUpload::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error("Invalid multipart body", e))?
    {
        let name = field
            .name()
            .unwrap_or_default()
            .trim_end_matches("[]")
            .to_string();

        match name.as_str() {
            FIELD_EMPLOYEE_ITP_IMAGES
            | FIELD_MANAGER_ITP_IMAGES
            | FIELD_SELF_REVIEW_IMAGES
            | FIELD_FEEDBACK_360 => {
                let file_name = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(str::to_string);
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| multipart_error(&format!("Failed to read field '{name}'"), e))?;
                if data.is_empty() {
                    debug!("Skipping empty file in field '{name}'");
                    continue;
                }
                let file = UploadedFile {
                    file_name,
                    content_type,
                    data,
                };
                match name.as_str() {
                    FIELD_EMPLOYEE_ITP_IMAGES => upload.employee_itp_images.push(file),
                    FIELD_MANAGER_ITP_IMAGES => upload.manager_itp_images.push(file),
                    FIELD_SELF_REVIEW_IMAGES => upload.self_review_images.push(file),
                    _ => {
                        if upload.feedback_360.is_some() {
                            warn!("Ignoring additional feedback_360 document");
                        } else {
                            upload.feedback_360 = Some(file);
                        }
                    }
                }
            }
            FIELD_EMPLOYEE_ITP_SCORES
            | FIELD_MANAGER_ITP_SCORES
            | FIELD_SELF_REVIEW_TEXT
            | FIELD_MANAGER_COMMENTS => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| multipart_error(&format!("Failed to read field '{name}'"), e))?;
                let Some(text) = non_blank(text) else {
                    continue;
                };
                match name.as_str() {
                    FIELD_EMPLOYEE_ITP_SCORES => {
                        upload.employee_itp_scores = Some(parse_manual_scores(&name, &text)?)
                    }
                    FIELD_MANAGER_ITP_SCORES => {
                        upload.manager_itp_scores = Some(parse_manual_scores(&name, &text)?)
                    }
                    FIELD_SELF_REVIEW_TEXT => upload.self_review_text = Some(text),
                    _ => upload.manager_comments = Some(text),
                }
            }
            other => debug!("Ignoring unknown multipart field '{other}'"),
        }
    }

    debug!(
        employee_itp_images = upload.employee_itp_images.len(),
        manager_itp_images = upload.manager_itp_images.len(),
        self_review_images = upload.self_review_images.len(),
        feedback_360 = upload.feedback_360.is_some(),
        "Multipart upload read"
    );

    Ok(upload)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: Option<&str>, content_type: Option<&str>, data: &'static [u8]) -> UploadedFile {
        UploadedFile {
            file_name: name.map(str::to_string),
            content_type: content_type.map(str::to_string),
            data: Bytes::from_static(data),
        }
    }

    #[test]
    fn test_image_media_type_prefers_declared_image_type() {
        let f = file(Some("scan.png"), Some("image/jpeg"), b"x");
        assert_eq!(f.image_media_type(), "image/jpeg");
    }

    #[test]
    fn test_image_media_type_guesses_from_name_for_octet_stream() {
        let f = file(Some("scan.webp"), Some("application/octet-stream"), b"x");
        assert_eq!(f.image_media_type(), "image/webp");
    }

    #[test]
    fn test_image_media_type_defaults_to_png() {
        let f = file(None, None, b"x");
        assert_eq!(f.image_media_type(), "image/png");
    }

    #[test]
    fn test_document_kind_detection() {
        assert_eq!(
            file(Some("f.pdf"), Some("application/pdf"), b"data").document_kind(),
            DocumentKind::Pdf
        );
        assert_eq!(
            file(None, Some("application/octet-stream"), b"%PDF-1.7 ...").document_kind(),
            DocumentKind::Pdf
        );
        assert_eq!(
            file(Some("feedback.txt"), None, b"hello").document_kind(),
            DocumentKind::Text
        );
        assert_eq!(
            file(Some("page.jpg"), None, b"jpg").document_kind(),
            DocumentKind::Image
        );
        assert_eq!(
            file(Some("blob.bin"), None, b"??").document_kind(),
            DocumentKind::Unknown
        );
    }

    #[test]
    fn test_manual_scores_are_parsed_and_range_checked() {
        let scores = parse_manual_scores("f", r#"{"humble":4,"hungry":9,"smart":7}"#).unwrap();
        assert_eq!(scores, ItpScores { humble: 4, hungry: 9, smart: 7 });

        assert!(matches!(
            parse_manual_scores("f", r#"{"humble":0,"hungry":9,"smart":7}"#),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            parse_manual_scores("f", "not json"),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_non_blank_trims_and_drops_whitespace() {
        assert_eq!(non_blank("  hi \n".to_string()), Some("hi".to_string()));
        assert_eq!(non_blank(" \n\t".to_string()), None);
    }
}
