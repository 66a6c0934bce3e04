use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc;

use super::store::ProgressHook;
use crate::data::{Progress, ProgressObserver};

/// Hands out one [`ProgressTracker`] per batch, all reporting to the same
/// observer.
#[derive(Clone, Default)]
pub struct ProgressAggregator {
    observer: Option<Arc<dyn ProgressObserver>>,
}

impl std::fmt::Debug for ProgressAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressAggregator")
            .field("observed", &self.observer.is_some())
            .finish()
    }
}

impl ProgressAggregator {
    pub fn new() -> Self { Self::default() }

    pub fn with_observer(observer: Arc<dyn ProgressObserver>) -> Self {
        Self {
            observer: Some(observer),
        }
    }

    pub fn new_tracker(&self, total_bytes: u64, label: &str) -> ProgressTracker {
        ProgressTracker {
            state: Arc::new(TrackerState {
                seen: AtomicU64::new(0),
                total: total_bytes,
                label: Arc::from(label),
                observer: self.observer.clone(),
            }),
        }
    }
}

struct TrackerState {
    seen:     AtomicU64,
    total:    u64,
    label:    Arc<str>,
    observer: Option<Arc<dyn ProgressObserver>>,
}

/// Shared byte counter for one batch.
///
/// `bytes_seen` never decreases and never exceeds `total_bytes`; bytes
/// beyond the total (a file that grew after enumeration) are dropped.
/// Observers may see events from different workers out of order, but the
/// deltas always sum to the final `bytes_seen`.
#[derive(Clone)]
pub struct ProgressTracker {
    state: Arc<TrackerState>,
}

impl ProgressTracker {
    /// Count `n` more bytes and notify the observer. Returns the new total
    /// seen.
    pub fn add(&self, n: u64) -> u64 {
        let state = &*self.state;
        let prev = match state.seen.fetch_update(Ordering::AcqRel, Ordering::Acquire, |seen| {
            let next = seen.saturating_add(n).min(state.total);
            (next != seen).then_some(next)
        }) {
            Ok(prev) => prev,
            Err(unchanged) => return unchanged,
        };

        let now = prev.saturating_add(n).min(state.total);
        if let Some(observer) = &state.observer {
            observer.on_progress(&Progress {
                delta:       now - prev,
                bytes_seen:  now,
                total_bytes: state.total,
                label:       Arc::clone(&state.label),
            });
        }
        now
    }

    pub fn bytes_seen(&self) -> u64 { self.state.seen.load(Ordering::Acquire) }

    pub fn total_bytes(&self) -> u64 { self.state.total }

    pub fn label(&self) -> &str { &self.state.label }

    /// A hook for [`ObjectStore`](crate::ObjectStore) calls that feeds this
    /// tracker.
    pub fn hook(&self) -> ProgressHook {
        let tracker = self.clone();
        Arc::new(move |n| {
            tracker.add(n);
        })
    }
}

/// Forwards progress events into a channel for a separate reporting task.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<Progress>,
}

impl ProgressObserver for ChannelObserver {
    fn on_progress(&self, progress: &Progress) {
        // A dropped receiver only means nobody is watching any more.
        let _ = self.tx.send(progress.clone());
    }
}

/// An observer paired with the receiving end of its events.
pub fn progress_channel() -> (ChannelObserver, mpsc::UnboundedReceiver<Progress>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ChannelObserver { tx }, rx)
}
