// ============================
// crates/backend-lib/src/handlers/work.rs
// ============================
//! Submitting, uploading and removing work for a task.
use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Extension,
};
use tracing::info;

use crate::error::AppError;
use crate::middleware::CurrentSession;
use crate::platform::WorkFile;
use crate::AppState;

pub async fn submit(
    State(state): State<AppState>,
    Extension(session): Extension<CurrentSession>,
    Path((platform, id)): Path<(String, String)>,
) -> Result<StatusCode, AppError> {
    state.orchestrator.submit(&session.user, &platform, &id).await?;
    info!(%platform, task = %id, "task submitted");
    Ok(StatusCode::NO_CONTENT)
}

/// Upload every file field of a multipart form
pub async fn upload(
    State(state): State<AppState>,
    Extension(session): Extension<CurrentSession>,
    Path((platform, id)): Path<(String, String)>,
    mut multipart: Multipart,
) -> Result<StatusCode, AppError> {
    let mut files = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidInput(e.body_text()))?
    {
        let Some(filename) = field.file_name().filter(|f| !f.is_empty()).map(str::to_string) else {
            continue;
        };
        let content_type = field.content_type().map(str::to_string);
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::InvalidInput(e.body_text()))?;
        files.push(WorkFile {
            filename,
            content_type,
            data: data.to_vec(),
        });
    }

    let count = files.len();
    state
        .orchestrator
        .upload_work(&session.user, &platform, &id, files)
        .await?;
    info!(%platform, task = %id, files = count, "work uploaded");
    Ok(StatusCode::NO_CONTENT)
}

/// Filenames from an urlencoded form body.
///
/// Accepts the `filename` key repeated, comma-separated values, or both.
pub fn parse_filenames(body: &str) -> Result<Vec<String>, AppError> {
    let pairs: Vec<(String, String)> =
        serde_urlencoded::from_str(body).map_err(|e| AppError::InvalidInput(e.to_string()))?;
    Ok(pairs
        .iter()
        .filter(|(key, _)| key == "filename")
        .flat_map(|(_, value)| value.split(','))
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect())
}

pub async fn remove(
    State(state): State<AppState>,
    Extension(session): Extension<CurrentSession>,
    Path((platform, id)): Path<(String, String)>,
    body: String,
) -> Result<StatusCode, AppError> {
    let filenames = parse_filenames(&body)?;
    state
        .orchestrator
        .remove_work(&session.user, &platform, &id, &filenames)
        .await?;
    info!(%platform, task = %id, files = filenames.len(), "work removed");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_repeated_and_comma_filenames() {
        let names = parse_filenames("filename=essay.docx&other=1&filename=a.pdf%2C+b%20c.png").unwrap();
        assert_eq!(names, ["essay.docx", "a.pdf", "b c.png"]);
    }

    #[test]
    fn test_parse_decodes_reserved_characters() {
        let names = parse_filenames("filename=report%26notes.pdf&filename=a%3Db.txt").unwrap();
        assert_eq!(names, ["report&notes.pdf", "a=b.txt"]);
    }

    #[test]
    fn test_parse_empty_body() {
        assert!(parse_filenames("").unwrap().is_empty());
        assert!(parse_filenames("filename=").unwrap().is_empty());
    }
}
