//! Startup classification and close-marker bookkeeping.
//!
//! The monitor decides, once per mount, whether the previous run ended with
//! a refresh, a crash, or a clean close. Its only inputs are the presence of
//! a session snapshot, a durable snapshot, and the durable close marker.

use crate::config::PersistenceConfig;
use crate::error::Result;
use crate::tier::TextTier;
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

const MARKER_VALUE: &str = "true";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StartupKind {
    /// No recoverable state
    Fresh,
    /// Same process resumed; the session tier is authoritative
    Refresh,
    /// The previous run ended without a close signal; use the durable tier
    CrashRecovery,
    /// The previous run closed cleanly
    NormalRestart,
}

impl StartupKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StartupKind::Fresh => "fresh",
            StartupKind::Refresh => "refresh",
            StartupKind::CrashRecovery => "crash_recovery",
            StartupKind::NormalRestart => "normal_restart",
        }
    }
}

/// Page lifecycle events forwarded by the presentation layer.
///
/// A visibility change and an explicit close are separate events: hiding a
/// tab is not a termination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleSignal {
    VisibilityChange { hidden: bool },
    /// `persisted` is true when the page goes into a back/forward cache.
    PageHide { persisted: bool },
    Unload,
}

/// The three facts classification is based on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StartupProbe {
    pub session_present: bool,
    pub close_marker_set: bool,
    pub durable_present: bool,
}

impl StartupProbe {
    pub fn classify(&self) -> StartupKind {
        if self.session_present {
            StartupKind::Refresh
        } else if self.durable_present && !self.close_marker_set {
            StartupKind::CrashRecovery
        } else if self.close_marker_set {
            StartupKind::NormalRestart
        } else {
            StartupKind::Fresh
        }
    }
}

pub struct LifecycleMonitor {
    session: Arc<dyn TextTier>,
    durable: Arc<dyn TextTier>,
    session_key: String,
    durable_key: String,
    marker_key: String,
    hidden_counts_as_close: bool,
    /// Set when the marker was written because of a visibility change only.
    marked_by_visibility: AtomicBool,
}

impl LifecycleMonitor {
    pub fn new(
        config: &PersistenceConfig,
        session: Arc<dyn TextTier>,
        durable: Arc<dyn TextTier>,
    ) -> Self {
        Self {
            session,
            durable,
            session_key: config.session_key(),
            durable_key: config.durable_key(),
            marker_key: config.close_marker_key(),
            hidden_counts_as_close: config.hidden_counts_as_close,
            marked_by_visibility: AtomicBool::new(false),
        }
    }

    /// Reads the classification inputs. An unreadable tier counts as absent.
    pub async fn probe(&self) -> StartupProbe {
        StartupProbe {
            session_present: self.present(self.session.as_ref(), &self.session_key).await,
            close_marker_set: self.marker_set().await,
            durable_present: self.present(self.durable.as_ref(), &self.durable_key).await,
        }
    }

    pub async fn classify(&self) -> StartupKind {
        let probe = self.probe().await;
        let kind = probe.classify();
        tracing::info!(
            session_present = probe.session_present,
            close_marker_set = probe.close_marker_set,
            durable_present = probe.durable_present,
            startup = kind.as_str(),
            "Classified startup"
        );
        kind
    }

    /// Records a clean close: session tier first, then the durable mirror.
    ///
    /// If the process dies between the two writes, the durable tier has no
    /// marker and the next start is classified as a crash.
    pub async fn mark_closing(&self) -> Result<()> {
        self.session.set(&self.marker_key, MARKER_VALUE).await?;
        self.durable.set(&self.marker_key, MARKER_VALUE).await?;
        tracing::debug!(key = %self.marker_key, "Close marker written");
        Ok(())
    }

    /// Clears the close marker from both tiers after classification.
    pub async fn acknowledge_restart(&self) -> Result<()> {
        self.session.remove(&self.marker_key).await?;
        self.durable.remove(&self.marker_key).await?;
        self.marked_by_visibility.store(false, Ordering::SeqCst);
        Ok(())
    }

    /// Reacts to a lifecycle signal. Returns true when the marker was written.
    pub async fn handle_signal(&self, signal: LifecycleSignal) -> Result<bool> {
        match signal {
            LifecycleSignal::Unload | LifecycleSignal::PageHide { persisted: false } => {
                self.mark_closing().await?;
                self.marked_by_visibility.store(false, Ordering::SeqCst);
                Ok(true)
            }
            LifecycleSignal::PageHide { persisted: true } => Ok(false),
            LifecycleSignal::VisibilityChange { hidden: true } if self.hidden_counts_as_close => {
                self.mark_closing().await?;
                self.marked_by_visibility.store(true, Ordering::SeqCst);
                Ok(true)
            }
            LifecycleSignal::VisibilityChange { hidden: false } => {
                // The page came back, so a visibility-only mark was premature.
                if self.marked_by_visibility.swap(false, Ordering::SeqCst) {
                    self.session.remove(&self.marker_key).await?;
                    self.durable.remove(&self.marker_key).await?;
                    tracing::debug!(key = %self.marker_key, "Close marker withdrawn");
                }
                Ok(false)
            }
            LifecycleSignal::VisibilityChange { hidden: true } => Ok(false),
        }
    }

    async fn present(&self, tier: &dyn TextTier, key: &str) -> bool {
        match tier.get(key).await {
            Ok(value) => value.is_some_and(|v| !v.is_empty()),
            Err(e) => {
                tracing::warn!(tier = tier.kind().as_str(), key, "Tier read failed: {}", e);
                false
            }
        }
    }

    async fn marker_set(&self) -> bool {
        match self.durable.get(&self.marker_key).await {
            Ok(value) => value.as_deref() == Some(MARKER_VALUE),
            Err(e) => {
                tracing::warn!(key = %self.marker_key, "Close marker read failed: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tier::TierKind;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct MockTier {
        kind: TierKind,
        values: Mutex<HashMap<String, String>>,
    }

    impl MockTier {
        fn new(kind: TierKind) -> Arc<Self> {
            Arc::new(Self {
                kind,
                values: Mutex::new(HashMap::new()),
            })
        }

        fn has(&self, key: &str) -> bool {
            self.values.lock().unwrap().contains_key(key)
        }
    }

    #[async_trait]
    impl TextTier for MockTier {
        fn kind(&self) -> TierKind {
            self.kind
        }

        async fn get(&self, key: &str) -> Result<Option<String>> {
            Ok(self.values.lock().unwrap().get(key).cloned())
        }

        async fn set(&self, key: &str, value: &str) -> Result<()> {
            self.values
                .lock()
                .unwrap()
                .insert(key.to_string(), value.to_string());
            Ok(())
        }

        async fn remove(&self, key: &str) -> Result<()> {
            self.values.lock().unwrap().remove(key);
            Ok(())
        }
    }

    fn setup(config: &PersistenceConfig) -> (Arc<MockTier>, Arc<MockTier>, LifecycleMonitor) {
        let session = MockTier::new(TierKind::Session);
        let durable = MockTier::new(TierKind::Durable);
        let monitor = LifecycleMonitor::new(config, session.clone(), durable.clone());
        (session, durable, monitor)
    }

    #[test]
    fn test_probe_classification_table() {
        let kind = |s, m, d| {
            StartupProbe {
                session_present: s,
                close_marker_set: m,
                durable_present: d,
            }
            .classify()
        };
        assert_eq!(kind(true, true, true), StartupKind::Refresh);
        assert_eq!(kind(true, false, false), StartupKind::Refresh);
        assert_eq!(kind(false, false, true), StartupKind::CrashRecovery);
        assert_eq!(kind(false, true, true), StartupKind::NormalRestart);
        assert_eq!(kind(false, true, false), StartupKind::NormalRestart);
        assert_eq!(kind(false, false, false), StartupKind::Fresh);
    }

    #[tokio::test]
    async fn test_crash_vs_normal_restart() {
        let config = PersistenceConfig::new("f1");
        let (_session, durable, monitor) = setup(&config);
        durable
            .set(&config.durable_key(), r#"{"savedAt":"2026-01-01T00:00:00Z"}"#)
            .await
            .unwrap();

        assert_eq!(monitor.classify().await, StartupKind::CrashRecovery);

        durable.set(&config.close_marker_key(), "true").await.unwrap();
        assert_eq!(monitor.classify().await, StartupKind::NormalRestart);
    }

    #[tokio::test]
    async fn test_mark_and_acknowledge() {
        let config = PersistenceConfig::new("f1");
        let (session, durable, monitor) = setup(&config);

        monitor.mark_closing().await.unwrap();
        assert!(session.has(&config.close_marker_key()));
        assert!(durable.has(&config.close_marker_key()));

        monitor.acknowledge_restart().await.unwrap();
        assert!(!session.has(&config.close_marker_key()));
        assert!(!durable.has(&config.close_marker_key()));
    }

    #[tokio::test]
    async fn test_visibility_change_is_not_a_close() {
        let config = PersistenceConfig::new("f1");
        let (_session, durable, monitor) = setup(&config);

        let marked = monitor
            .handle_signal(LifecycleSignal::VisibilityChange { hidden: true })
            .await
            .unwrap();
        assert!(!marked);
        assert!(!durable.has(&config.close_marker_key()));

        let marked = monitor
            .handle_signal(LifecycleSignal::PageHide { persisted: true })
            .await
            .unwrap();
        assert!(!marked);

        let marked = monitor.handle_signal(LifecycleSignal::Unload).await.unwrap();
        assert!(marked);
        assert!(durable.has(&config.close_marker_key()));
    }

    #[tokio::test]
    async fn test_visibility_heuristic_is_withdrawn_when_visible_again() {
        let mut config = PersistenceConfig::new("f1");
        config.hidden_counts_as_close = true;
        let (_session, durable, monitor) = setup(&config);

        monitor
            .handle_signal(LifecycleSignal::VisibilityChange { hidden: true })
            .await
            .unwrap();
        assert!(durable.has(&config.close_marker_key()));

        monitor
            .handle_signal(LifecycleSignal::VisibilityChange { hidden: false })
            .await
            .unwrap();
        assert!(!durable.has(&config.close_marker_key()));
    }
}
