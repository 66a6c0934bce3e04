use super::item::{Direction, TransferItem, TransferResult};

/// Everything a finished batch produced, in batch input order.
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub direction:   Direction,
    /// Items in their final `Done` or `Failed` state.
    pub items:       Vec<TransferItem>,
    /// One result per input item.
    pub results:     Vec<TransferResult>,
    pub bytes_seen:  u64,
    pub total_bytes: u64,
}

impl BatchReport {
    pub fn empty(direction: Direction) -> Self {
        Self {
            direction,
            items: Vec::new(),
            results: Vec::new(),
            bytes_seen: 0,
            total_bytes: 0,
        }
    }

    /// True when the batch had nothing to transfer.
    pub fn is_noop(&self) -> bool { self.results.is_empty() }

    pub fn succeeded(&self) -> usize { self.results.iter().filter(|r| r.is_success()).count() }

    pub fn failed(&self) -> usize { self.results.len() - self.succeeded() }

    pub fn is_success(&self) -> bool { self.results.iter().all(TransferResult::is_success) }

    pub fn failures(&self) -> impl Iterator<Item = &TransferResult> { self.results.iter().filter(|r| !r.is_success()) }
}
