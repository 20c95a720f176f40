//! Upload progress publication.

use formsafe_core::file::UploadProgress;
use tokio::sync::watch;

/// Latest upload progress, `None` when no `save_files` call is in flight.
pub struct ProgressChannel {
    sender: watch::Sender<Option<UploadProgress>>,
}

impl ProgressChannel {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(None);
        Self { sender }
    }

    pub fn publish(&self, progress: UploadProgress) {
        tracing::trace!(
            field = %progress.field_name,
            loaded = progress.loaded,
            total = progress.total,
            "Upload progress"
        );
        self.sender.send_replace(Some(progress));
    }

    pub fn clear(&self) {
        self.sender.send_replace(None);
    }

    pub fn current(&self) -> Option<UploadProgress> {
        self.sender.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<UploadProgress>> {
        self.sender.subscribe()
    }
}

impl Default for ProgressChannel {
    fn default() -> Self {
        Self::new()
    }
}
