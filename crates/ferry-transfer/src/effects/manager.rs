use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use super::download::download_file;
use super::progress::ProgressAggregator;
use super::store::{ObjectStore, ProgressHook};
use super::upload::upload_file;
use crate::data::{
    BatchReport, Direction, ProgressObserver, TransferBatch, TransferFailure, TransferItem, TransferOptions,
    TransferOutcome, TransferResult,
};
use crate::error::{Error, Result};

type Finished = (usize, TransferItem, TransferResult);

/// Runs batches of single-object transfers on a bounded pool of workers.
///
/// A fixed number of workers pull items from a shared queue, so at most
/// `concurrency` items are in flight whatever the batch length. A failing
/// item only fails itself; the batch always runs to completion.
pub struct TransferManager<S> {
    store:      Arc<S>,
    options:    TransferOptions,
    aggregator: ProgressAggregator,
}

impl<S: ObjectStore> TransferManager<S> {
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `options` do not validate, or if the
    /// part size is below the store's [`MIN_PART_SIZE`](ObjectStore::MIN_PART_SIZE).
    pub fn new(store: Arc<S>, options: TransferOptions) -> Result<Self> {
        options.validate()?;
        if options.part_size < S::MIN_PART_SIZE {
            return Err(Error::Config(format!(
                "part size {} is below the store minimum of {} bytes",
                options.part_size,
                S::MIN_PART_SIZE
            )));
        }
        Ok(Self {
            store,
            options,
            aggregator: ProgressAggregator::new(),
        })
    }

    /// Report byte progress of every batch to `observer`.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.aggregator = ProgressAggregator::with_observer(observer);
        self
    }

    pub fn store(&self) -> &Arc<S> { &self.store }

    pub fn options(&self) -> &TransferOptions { &self.options }

    pub(crate) fn aggregator(&self) -> &ProgressAggregator { &self.aggregator }

    /// Transfer every item of `batch` and wait for all of them.
    ///
    /// Results come back in input order, one per item. A batch concurrency
    /// of 0 falls back to the manager's configured concurrency.
    pub async fn run(&self, batch: TransferBatch, direction: Direction) -> BatchReport {
        if batch.is_empty() {
            info!(%direction, label = batch.label().unwrap_or_default(), "nothing to transfer");
            return BatchReport::empty(direction);
        }

        let started = Instant::now();
        let label = batch.label().map_or_else(|| direction.to_string(), str::to_string);
        let tracker = self.aggregator.new_tracker(batch.total_bytes(), &label);
        let concurrency = match batch.concurrency() {
            0 => self.options.concurrency,
            n => n,
        };
        let total_bytes = batch.total_bytes();
        let items = batch.into_items();
        let workers = concurrency.clamp(1, items.len());

        info!(%direction, %label, items = items.len(), total_bytes, workers, "batch started");

        let (work_tx, work_rx) = mpsc::unbounded_channel();
        for entry in items.iter().cloned().enumerate() {
            // The receiver is alive until the workers below are spawned.
            let _ = work_tx.send(entry);
        }
        drop(work_tx);

        let queue = Arc::new(Mutex::new(work_rx));
        let (done_tx, mut done_rx) = mpsc::unbounded_channel::<Finished>();

        let mut pool = JoinSet::new();
        for _ in 0..workers {
            let queue = Arc::clone(&queue);
            let done = done_tx.clone();
            let store = Arc::clone(&self.store);
            let options = self.options.clone();
            let hook = tracker.hook();

            pool.spawn(async move {
                loop {
                    let next = queue.lock().await.recv().await;
                    let Some((index, mut item)) = next else { break };
                    let result = transfer_one(&*store, &mut item, direction, &options, &hook).await;
                    if done.send((index, item, result)).is_err() {
                        break;
                    }
                }
            });
        }
        drop(done_tx);

        while let Some(joined) = pool.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "transfer worker stopped unexpectedly");
            }
        }

        let mut slots: Vec<Option<(TransferItem, TransferResult)>> = items.iter().map(|_| None).collect();
        while let Some((index, item, result)) = done_rx.recv().await {
            slots[index] = Some((item, result));
        }

        let (items, results): (Vec<_>, Vec<_>) = slots
            .into_iter()
            .zip(items)
            .map(|(slot, original)| slot.unwrap_or_else(|| abandoned(original, direction)))
            .unzip();

        let report = BatchReport {
            direction,
            items,
            results,
            bytes_seen: tracker.bytes_seen(),
            total_bytes,
        };

        info!(
            %direction,
            %label,
            succeeded = report.succeeded(),
            failed = report.failed(),
            bytes = report.bytes_seen,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "batch finished"
        );
        report
    }
}

/// Move one item and record its outcome on it.
///
/// Items are checked against the cancellation token before they start;
/// once started an item runs to completion.
pub(crate) async fn transfer_one<S: ObjectStore>(
    store: &S,
    item: &mut TransferItem,
    direction: Direction,
    options: &TransferOptions,
    progress: &ProgressHook,
) -> TransferResult {
    let target = item.target(direction);

    if let Some(failure) = item.error().cloned() {
        warn!(%direction, %target, error = %failure, "transfer rejected");
        let outcome = TransferOutcome::Failure(failure);
        item.finish(&outcome);
        return TransferResult { target, outcome };
    }

    if options.is_cancelled() {
        let outcome = TransferOutcome::Failure(TransferFailure::from(&Error::Cancelled));
        item.finish(&outcome);
        return TransferResult { target, outcome };
    }

    item.start();
    debug!(%direction, key = %item.remote_key, path = %item.local_path.display(), size = item.size_bytes, "transfer started");

    let result = match direction {
        Direction::Upload => upload_file(store, &item.local_path, &item.remote_key, options, progress).await,
        Direction::Download => {
            download_file(store, &item.remote_key, item.size_bytes, &item.local_path, options, progress)
                .await
                .map(|path| path.display().to_string())
        }
    };

    let outcome = match result {
        Ok(location) => {
            debug!(%direction, %target, "transfer done");
            TransferOutcome::Success(location)
        }
        Err(e) => {
            warn!(%direction, %target, error = %e, "transfer failed");
            TransferOutcome::Failure(TransferFailure::from(&e))
        }
    };

    item.finish(&outcome);
    TransferResult { target, outcome }
}

/// Result for an item whose worker died before reporting it.
fn abandoned(mut item: TransferItem, direction: Direction) -> (TransferItem, TransferResult) {
    let failure = TransferFailure::from(&Error::backend("transfer", "worker stopped before finishing this item"));
    let outcome = TransferOutcome::Failure(failure);
    item.finish(&outcome);
    let result = TransferResult {
        target: item.target(direction),
        outcome,
    };
    (item, result)
}
