use serde::de::IgnoredAny;
use std::path::{Path, PathBuf};

/// Largest attachment accepted for validation.
pub const MAX_VALIDATE_BYTES: u64 = 0x100000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationFailure {
    pub file_name: String,
    pub reason: String,
}

/// Remove Markdown ```` ```json ```` fences and stray backticks from pasted text.
pub fn strip_code_fence(content: &str) -> String {
    content.replace("```json", "").replace('`', "")
}

pub fn validate_json_text(content: &str) -> Result<(), String> {
    serde_json::from_str::<IgnoredAny>(content)
        .map(|_| ())
        .map_err(|e| e.to_string())
}

/// Validate one file, returning the failure reason if any.
pub async fn validate_json_file(path: &Path, strip_fences: bool) -> Result<(), String> {
    let meta = tokio::fs::metadata(path).await.map_err(|e| e.to_string())?;
    if meta.len() > MAX_VALIDATE_BYTES {
        return Err("File too big".to_string());
    }

    let raw = tokio::fs::read(path).await.map_err(|e| e.to_string())?;
    let text = String::from_utf8(raw).map_err(|e| e.to_string())?;
    if strip_fences {
        validate_json_text(&strip_code_fence(&text))
    } else {
        validate_json_text(&text)
    }
}

pub async fn validate_json_files(paths: &[PathBuf], strip_fences: bool) -> Vec<ValidationFailure> {
    let mut failures = Vec::new();
    for path in paths {
        if let Err(reason) = validate_json_file(path, strip_fences).await {
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            failures.push(ValidationFailure { file_name, reason });
        }
    }
    failures
}

pub fn render_failures(failures: &[ValidationFailure]) -> String {
    let sections: Vec<String> = failures
        .iter()
        .map(|f| format!("**{}**\n{}", f.file_name, f.reason))
        .collect();
    format!("JSON Validation failed!\n\n{}", sections.join("\n\n"))
}
