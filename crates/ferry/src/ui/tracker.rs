use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use ferry_transfer::{Progress, ProgressObserver};
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use once_cell::sync::Lazy;

const PB_STYLE: &str =
    "{spinner:.green} {prefix:>16.cyan.bold} [{elapsed_precise}] {wide_bar:.green/white} {bytes}/{total_bytes} ({bytes_per_sec}, {eta})";

const TICK: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ";

const PB_CHARS: &str = "=>-";

static PB_TEMPLATE: Lazy<Option<ProgressStyle>> = Lazy::new(|| {
    ProgressStyle::with_template(PB_STYLE)
        .ok()
        .map(|style| style.tick_chars(TICK).progress_chars(PB_CHARS))
});

/// One byte bar per progress label, drawn together on stderr.
pub struct ProgressBars {
    multi: MultiProgress,
    bars:  Mutex<HashMap<Arc<str>, ProgressBar>>,
}

impl ProgressBars {
    pub fn new() -> Self { Self::with_target(ProgressDrawTarget::stderr()) }

    /// Bars that track progress without drawing anything.
    pub fn hidden() -> Self { Self::with_target(ProgressDrawTarget::hidden()) }

    fn with_target(target: ProgressDrawTarget) -> Self {
        Self {
            multi: MultiProgress::with_draw_target(target),
            bars:  Mutex::new(HashMap::new()),
        }
    }

    fn bar(&self, label: &Arc<str>, total: u64) -> ProgressBar {
        let mut bars = self.bars.lock().unwrap_or_else(PoisonError::into_inner);
        bars.entry(Arc::clone(label))
            .or_insert_with(|| {
                let pb = ProgressBar::new(total);
                let pb = match PB_TEMPLATE.as_ref() {
                    Some(style) => pb.with_style(style.clone()),
                    None => pb,
                };
                pb.set_prefix(label.to_string());
                self.multi.add(pb)
            })
            .clone()
    }

    /// Bytes shown on the bar for `label`, if one was drawn.
    pub fn position(&self, label: &str) -> Option<u64> {
        let bars = self.bars.lock().unwrap_or_else(PoisonError::into_inner);
        bars.get(label).map(ProgressBar::position)
    }

    /// Stop every bar. Bars of batches with failures stay where they are.
    pub fn finish(&self) {
        let bars = self.bars.lock().unwrap_or_else(PoisonError::into_inner);
        for pb in bars.values() {
            if pb.position() >= pb.length().unwrap_or(0) {
                pb.finish();
            } else {
                pb.abandon();
            }
        }
    }
}

impl Default for ProgressBars {
    fn default() -> Self { Self::new() }
}

impl ProgressObserver for ProgressBars {
    fn on_progress(&self, progress: &Progress) {
        let pb = self.bar(&progress.label, progress.total_bytes);
        pb.inc(progress.delta);
        if progress.is_complete() {
            pb.finish();
        }
    }
}
