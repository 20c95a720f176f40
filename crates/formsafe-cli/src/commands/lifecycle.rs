use super::{Target, mount};
use anyhow::{Result, bail};
use formsafe_core::lifecycle::LifecycleSignal;

pub async fn close(target: &Target) -> Result<()> {
    let mounted = mount(target).await?;
    mounted
        .form
        .handle_lifecycle_signal(LifecycleSignal::Unload)
        .await;

    if let Some(error) = mounted.form.error().await {
        bail!(error);
    }
    println!(
        "Closed {} (startup was {})",
        mounted.form.form_id(),
        mounted.outcome.startup.as_str()
    );
    Ok(())
}

pub async fn clear(target: &Target, reset: bool) -> Result<()> {
    let mounted = mount(target).await?;
    let cleared = if reset {
        mounted.form.reset_form().await
    } else {
        mounted.form.clear_storage().await
    };

    if !cleared {
        let error = mounted.form.error().await.unwrap_or_default();
        bail!("Clear failed: {}", error);
    }
    println!("Cleared {}", mounted.form.form_id());
    Ok(())
}
