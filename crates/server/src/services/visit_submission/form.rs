//! Multipart body reader.

use axum::extract::Multipart;

use cafe_passport_core::FieldErrors;

use super::SubmissionError;
use super::payload::{PAYLOAD_PART, RawSubmission, UploadedFile};

/// Read every part of a submission.
///
/// The `payload` part is read as text; every other named part is kept as a
/// file. Parts without a name are skipped. A file larger than `max_file_bytes`
/// is reported against its part name.
///
/// # Errors
///
/// Returns `SubmissionError::Malformed` if the body cannot be parsed and
/// `SubmissionError::Invalid` for oversized or duplicate parts.
pub async fn read_submission(
    mut multipart: Multipart,
    max_file_bytes: usize,
) -> Result<RawSubmission, SubmissionError> {
    let mut raw = RawSubmission::default();
    let mut errors = FieldErrors::new();

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| SubmissionError::Malformed(e.body_text()))?
    {
        let Some(name) = field.name().map(str::to_owned) else {
            tracing::debug!("skipping unnamed multipart part");
            continue;
        };

        if name == PAYLOAD_PART {
            let text = field
                .text()
                .await
                .map_err(|e| SubmissionError::Malformed(e.body_text()))?;
            raw.payload = Some(text);
            continue;
        }

        let file_name = field.file_name().map(str::to_owned);
        let mut bytes = Vec::new();
        let mut too_large = false;
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| SubmissionError::Malformed(e.body_text()))?
        {
            if too_large {
                continue;
            }
            if bytes.len() + chunk.len() > max_file_bytes {
                too_large = true;
                bytes = Vec::new();
                continue;
            }
            bytes.extend_from_slice(&chunk);
        }

        if too_large {
            errors.add(
                name,
                format!("The file is larger than the {max_file_bytes} byte limit."),
            );
            continue;
        }
        if raw.files.contains_key(&name) {
            errors.add(name, "Each file part must have a unique name.");
            continue;
        }
        raw.files.insert(name, UploadedFile { file_name, bytes });
    }

    errors.into_result(raw).map_err(SubmissionError::Invalid)
}
