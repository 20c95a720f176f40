pub mod edit;
pub mod lifecycle;
pub mod status;

use anyhow::{Context, Result};
use formsafe_application::{PersistenceOrchestrator, RestoreOutcome, StorageBackends};
use formsafe_core::config::PersistenceConfig;
use formsafe_core::snapshot::FormFields;
use formsafe_infrastructure::StoragePaths;
use std::path::{Path, PathBuf};

const DEFAULT_FORM_ID: &str = "default";

/// Where the form lives and how it is persisted.
pub struct Target {
    pub paths: StoragePaths,
    pub config: PersistenceConfig,
}

impl Target {
    pub fn resolve(
        data_dir: Option<PathBuf>,
        config_path: Option<&Path>,
        form: Option<String>,
        file_fields: Vec<String>,
    ) -> Result<Self> {
        let paths = match data_dir {
            Some(dir) => StoragePaths::new(dir),
            None => StoragePaths::default_location()?,
        };

        let mut config = match config_path {
            Some(path) => PersistenceConfig::load(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => PersistenceConfig::new(DEFAULT_FORM_ID),
        };
        if let Some(form) = form {
            config.form_id = form;
        }
        for field in file_fields {
            if !config.is_file_field(&field) {
                config.file_fields.push(field);
            }
        }
        config.validate()?;

        Ok(Self { paths, config })
    }
}

/// A mounted form. Every CLI invocation is a new process, so the session
/// tier always starts empty.
pub struct MountedForm {
    pub form: PersistenceOrchestrator,
    pub outcome: RestoreOutcome,
}

pub async fn mount(target: &Target) -> Result<MountedForm> {
    let backends = StorageBackends::on_disk(&target.paths)
        .await
        .context("Failed to open storage")?;
    let form = PersistenceOrchestrator::new(target.config.clone(), FormFields::new(), backends)?;
    let outcome = form.mount().await;
    tracing::debug!(startup = outcome.startup.as_str(), "Mounted {}", form.form_id());
    Ok(MountedForm { form, outcome })
}
