//! Error surface for recovered failures.
//!
//! Every failure the orchestrator recovers from lands here: a single
//! human-readable error string for the presentation layer, the structured
//! error for programmatic callers, and an optional callback. Verbosity only
//! changes what is logged.

use formsafe_core::config::ErrorReporting;
use formsafe_core::error::FormsafeError;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Callback invoked with every reported error and its context string.
pub type ErrorCallback = Arc<dyn Fn(&FormsafeError, &str) + Send + Sync>;

pub struct ErrorChannel {
    reporting: ErrorReporting,
    message: RwLock<Option<String>>,
    last: RwLock<Option<FormsafeError>>,
    callback: RwLock<Option<ErrorCallback>>,
}

impl ErrorChannel {
    pub fn new(reporting: ErrorReporting) -> Self {
        Self {
            reporting,
            message: RwLock::new(None),
            last: RwLock::new(None),
            callback: RwLock::new(None),
        }
    }

    pub async fn set_callback(&self, callback: ErrorCallback) {
        *self.callback.write().await = Some(callback);
    }

    /// Records `error` as the current error state.
    pub async fn report(&self, error: &FormsafeError, context: &str) {
        match self.reporting {
            ErrorReporting::Silent => {}
            ErrorReporting::Warn => {
                tracing::warn!(context, "{}", error);
            }
            ErrorReporting::Detailed => {
                tracing::error!(context, kind = error.kind(), error = ?error, "{}", error);
            }
        }

        *self.message.write().await = Some(format!("{} failed: {}", context, error));
        *self.last.write().await = Some(error.clone());

        let callback = self.callback.read().await.clone();
        if let Some(callback) = callback {
            callback(error, context);
        }
    }

    pub async fn message(&self) -> Option<String> {
        self.message.read().await.clone()
    }

    pub async fn last(&self) -> Option<FormsafeError> {
        self.last.read().await.clone()
    }

    pub async fn clear(&self) {
        *self.message.write().await = None;
        *self.last.write().await = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[tokio::test]
    async fn test_report_sets_state_and_calls_back() {
        let channel = ErrorChannel::new(ErrorReporting::Silent);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        channel
            .set_callback(Arc::new(move |err: &FormsafeError, ctx: &str| {
                sink.lock().unwrap().push((err.kind(), ctx.to_string()));
            }))
            .await;

        channel
            .report(&FormsafeError::validation("no files"), "save_files")
            .await;

        assert_eq!(
            channel.message().await.as_deref(),
            Some("save_files failed: Validation error: no files")
        );
        assert!(channel.last().await.unwrap().is_validation());
        assert_eq!(
            seen.lock().unwrap().as_slice(),
            &[("ValidationError", "save_files".to_string())]
        );

        channel.clear().await;
        assert!(channel.message().await.is_none());
        assert!(channel.last().await.is_none());
    }
}
