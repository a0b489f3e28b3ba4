//! Résumé uploads: the raw file and the text we feed the model.

use bytes::Bytes;
use tracing::{debug, warn};

use crate::errors::AppError;

/// Max résumé characters embedded in the question-generation prompt.
pub const MAX_RESUME_CHARS: usize = 4000;

/// A résumé file as received from the intake form.
#[derive(Debug, Clone)]
pub struct ResumeFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

impl ResumeFile {
    pub fn is_pdf(&self) -> bool {
        self.content_type.as_deref() == Some("application/pdf")
            || self.file_name.to_ascii_lowercase().ends_with(".pdf")
    }
}

/// Keeps at most `max_chars` characters, never splitting a character.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Extracts prompt context from a résumé.
///
/// Non-PDF files contribute no text. PDF parsing runs on a blocking thread.
pub async fn extract_resume_text(file: &ResumeFile) -> Result<Option<String>, AppError> {
    if !file.is_pdf() {
        debug!("Résumé '{}' is not a PDF; skipping text extraction", file.file_name);
        return Ok(None);
    }

    let bytes = file.bytes.clone();
    // The parser can panic on malformed files; a panicked task counts as unreadable.
    let text = match tokio::task::spawn_blocking(move || {
        pdf_extract::extract_text_from_mem(&bytes).map_err(|e| e.to_string())
    })
    .await
    {
        Ok(Ok(text)) => text,
        Ok(Err(reason)) => return Err(unreadable(&file.file_name, &reason)),
        Err(join_err) => return Err(unreadable(&file.file_name, &join_err.to_string())),
    };

    let text = truncate_chars(text.trim(), MAX_RESUME_CHARS).to_string();
    debug!(
        "Extracted {} characters from résumé '{}'",
        text.chars().count(),
        file.file_name
    );
    Ok(Some(text))
}

fn unreadable(file_name: &str, reason: &str) -> AppError {
    warn!("Could not read text from '{file_name}': {reason}");
    AppError::UnprocessableEntity("Could not read text from the uploaded résumé".to_string())
}
