use std::sync::Arc;

/// One progress event, emitted for every chunk of bytes moved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    /// Bytes added by this event.
    pub delta:       u64,
    /// Bytes moved so far across the whole batch.
    pub bytes_seen:  u64,
    pub total_bytes: u64,
    /// Name of the batch the event belongs to.
    pub label:       Arc<str>,
}

impl Progress {
    /// Percentage of completion. An empty batch counts as complete.
    #[must_use]
    pub fn percentage(&self) -> f64 {
        if self.total_bytes == 0 {
            100.0
        } else {
            (self.bytes_seen as f64 / self.total_bytes as f64) * 100.0
        }
    }

    #[must_use]
    pub fn is_complete(&self) -> bool { self.bytes_seen >= self.total_bytes }
}

/// Receives progress events from transfer workers.
///
/// Called from worker tasks with no lock held; implementations must not
/// block.
pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, progress: &Progress);
}

impl<F> ProgressObserver for F
where
    F: Fn(&Progress) + Send + Sync,
{
    fn on_progress(&self, progress: &Progress) { self(progress) }
}
