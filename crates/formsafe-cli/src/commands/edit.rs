use super::{Target, mount};
use anyhow::{Context, Result};
use formsafe_core::file::FileUpload;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

pub async fn set(target: &Target, field: &str, raw: &str) -> Result<()> {
    let mounted = mount(target).await?;
    let value = parse_value(raw);

    mounted.form.set_field(field, value).await?;
    if !mounted.form.config().auto_save {
        mounted.form.save_text_data().await?;
    }

    println!("Saved {}", field);
    Ok(())
}

pub async fn attach(target: &Target, field: &str, paths: &[PathBuf], mime: &str) -> Result<()> {
    let mounted = mount(target).await?;

    let mut uploads = Vec::with_capacity(paths.len());
    for path in paths {
        uploads.push(read_upload(path, mime).await?);
    }
    let count = uploads.len();

    mounted.form.save_files(field, uploads).await?;
    // Keeps the text snapshot in step with the files, so a later crash
    // recovery has something to restore them with.
    mounted.form.save_text_data().await?;

    println!("Stored {} file(s) for {}", count, field);
    Ok(())
}

/// JSON when it parses, a plain string otherwise.
fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

async fn read_upload(path: &Path, mime: &str) -> Result<FileUpload> {
    let payload = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .context("File path has no usable name")?
        .to_string();

    let mut upload = FileUpload::new(file_name, mime, payload);
    let modified = tokio::fs::metadata(path)
        .await
        .ok()
        .and_then(|meta| meta.modified().ok())
        .and_then(|time| time.duration_since(UNIX_EPOCH).ok());
    if let Some(modified) = modified {
        upload = upload.with_last_modified(modified.as_millis() as i64);
    }
    Ok(upload)
}
