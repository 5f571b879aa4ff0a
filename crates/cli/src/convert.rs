use anyhow::{Context as AnyhowContext, Result};
use cssmap_search::{MappingView, TextRewriter};
use std::path::{Path, PathBuf};

/// Largest stylesheet accepted for conversion.
pub const MAX_CONVERT_BYTES: u64 = 0x100000;

#[derive(Debug, Clone)]
pub struct ConvertedFile {
    pub file_name: String,
    pub content: String,
}

pub async fn convert_file(view: &MappingView, path: &Path) -> Result<ConvertedFile> {
    let meta = tokio::fs::metadata(path)
        .await
        .with_context(|| format!("Failed to stat {}", path.display()))?;
    if meta.len() > MAX_CONVERT_BYTES {
        anyhow::bail!(
            "{} is too big to convert ({} bytes > {MAX_CONVERT_BYTES})",
            path.display(),
            meta.len()
        );
    }

    let raw = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let css = String::from_utf8(raw)
        .with_context(|| format!("{} is not valid UTF-8", path.display()))?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .with_context(|| format!("{} has no file name", path.display()))?;

    Ok(ConvertedFile {
        file_name,
        content: TextRewriter::new(view).rewrite(&css),
    })
}

/// Write `converted` into `out_dir`, keeping the original file name.
pub async fn write_converted(converted: &ConvertedFile, out_dir: &Path) -> Result<PathBuf> {
    tokio::fs::create_dir_all(out_dir)
        .await
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;
    let target = out_dir.join(&converted.file_name);
    tokio::fs::write(&target, &converted.content)
        .await
        .with_context(|| format!("Failed to write {}", target.display()))?;
    Ok(target)
}
