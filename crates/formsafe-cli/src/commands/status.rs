use super::{Target, mount};
use anyhow::Result;
use serde_json::{Value, json};

pub async fn run(target: &Target) -> Result<()> {
    let mounted = mount(target).await?;
    let form = &mounted.form;

    let fields: Value = serde_json::from_str(&form.get_form_data_json().await)?;
    let files: Value = serde_json::from_str(&form.get_file_data_json().await)?;
    let error = form.error().await;
    let report = json!({
        "formId": form.form_id(),
        "restore": mounted.outcome,
        "hasUnsavedChanges": form.has_unsaved_changes(),
        "fields": fields,
        "files": files,
        "error": error,
    });

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
