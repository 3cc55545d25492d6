//! Batch orchestration: run a directive over a queue of work items.
//!
//! Items are processed sequentially and failures are isolated: one bad
//! input marks its own item failed and the run moves on. The merged PDF
//! mode is the exception — it consumes the whole batch at once and either
//! produces one combined document or fails every item.

use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::Stream;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{info, warn};

use crate::directive::{ConversionDirective, ConversionKind};
use crate::engine::{self, compose, preview, render};
use crate::error::EngineError;
use crate::files;
use crate::item::{ItemStatus, WorkItem};
use crate::progress::ProgressCallback;

/// Progress mark given to an item while its conversion is in flight.
const ITEM_IN_FLIGHT_PERCENT: u8 = 50;

/// Error message applied to every item when a merged run fails.
const MERGE_FAILED: &str = "Failed to combine PDF";

/// Snapshot of a run's overall position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BatchState {
    pub running: bool,
    /// Index of the item being processed, while running.
    pub current_index: Option<usize>,
    pub total_items: usize,
    /// Share of items finished, `0..=100`. Monotonic over a run.
    pub overall_progress_percent: u8,
}

impl BatchState {
    fn idle() -> Self {
        BatchState {
            running: false,
            current_index: None,
            total_items: 0,
            overall_progress_percent: 0,
        }
    }

    /// Snapshot taken as item `current` (zero-based) starts.
    fn in_flight(current: usize, total: usize) -> Self {
        BatchState {
            running: true,
            current_index: Some(current),
            total_items: total,
            overall_progress_percent: if total == 0 {
                0
            } else {
                (current * 100 / total) as u8
            },
        }
    }

    fn finished(total: usize) -> Self {
        BatchState {
            running: false,
            current_index: None,
            total_items: total,
            overall_progress_percent: if total == 0 { 0 } else { 100 },
        }
    }
}

/// Cooperative cancellation handle, checked between items.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Everything a finished run produced.
#[derive(Debug, Serialize)]
pub struct BatchOutcome {
    pub items: Vec<WorkItem>,
    pub state: BatchState,
}

impl BatchOutcome {
    pub fn succeeded(&self) -> usize {
        self.items
            .iter()
            .filter(|it| it.status == ItemStatus::Completed)
            .count()
    }

    pub fn failed(&self) -> usize {
        self.items
            .iter()
            .filter(|it| it.status == ItemStatus::Failed)
            .count()
    }
}

/// Events emitted by [`BatchOrchestrator::run_stream`].
#[derive(Debug)]
pub enum BatchEvent {
    /// The run has started with this many items.
    Started { total: usize },
    /// An item is about to be converted; `state` is the mid-run snapshot.
    ItemStarted {
        index: usize,
        total: usize,
        state: BatchState,
    },
    /// An item reached a terminal state.
    ItemFinished {
        index: usize,
        total: usize,
        status: ItemStatus,
        output_size: Option<u64>,
        error: Option<String>,
        /// Share of items finished so far, `0..=100`.
        overall_progress_percent: u8,
    },
    /// The whole run is done.
    Finished(Box<BatchOutcome>),
}

/// Boxed event stream returned by [`BatchOrchestrator::run_stream`].
pub type BatchEventStream = Pin<Box<dyn Stream<Item = BatchEvent> + Send>>;

/// Runs one batch at a time.
///
/// A second `run` while one is in flight returns [`EngineError::BatchBusy`]
/// instead of queueing.
#[derive(Debug, Default)]
pub struct BatchOrchestrator {
    running: AtomicBool,
}

/// Overall progress after item `index` (zero-based) finished.
fn overall_percent(index: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    ((index + 1) * 100 / total) as u8
}

struct RunGuard<'a>(&'a AtomicBool);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl BatchOrchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run a directive over the items with no cancellation or reporting.
    pub async fn run(
        &self,
        items: Vec<WorkItem>,
        directive: ConversionDirective,
    ) -> Result<BatchOutcome, EngineError> {
        self.run_with(items, directive, CancelToken::new(), None).await
    }

    /// Run a directive over the items with a cancel token and an optional
    /// progress callback.
    pub async fn run_with(
        &self,
        items: Vec<WorkItem>,
        directive: ConversionDirective,
        cancel: CancelToken,
        callback: Option<ProgressCallback>,
    ) -> Result<BatchOutcome, EngineError> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(EngineError::BatchBusy);
        }
        let _guard = RunGuard(&self.running);

        if items.is_empty() {
            return Ok(BatchOutcome {
                items,
                state: BatchState::idle(),
            });
        }

        let total = items.len();
        info!(total, kind = ?directive.kind, "batch run started");
        if let Some(cb) = &callback {
            cb.on_batch_start(total);
        }

        let outcome = match directive.kind {
            ConversionKind::RasterToPdfMerged { layout } => {
                run_merged(items, &layout, cancel, callback.as_ref()).await
            }
            _ => run_sequential(items, &directive, cancel, callback.as_ref()).await,
        };

        info!(
            succeeded = outcome.succeeded(),
            failed = outcome.failed(),
            "batch run finished"
        );
        if let Some(cb) = &callback {
            cb.on_batch_complete(total, outcome.succeeded());
        }
        Ok(outcome)
    }

    /// Run a batch and observe it as a stream of [`BatchEvent`]s.
    ///
    /// The orchestrator handle must be shared (`Arc`) so the busy guard
    /// covers the spawned run. The channel is unbounded: a consumer that
    /// polls late still sees every event, ending with the full outcome.
    pub fn run_stream(
        self: Arc<Self>,
        items: Vec<WorkItem>,
        directive: ConversionDirective,
        cancel: CancelToken,
    ) -> BatchEventStream {
        let (tx, rx) = mpsc::unbounded_channel();

        struct ChannelCallback {
            tx: mpsc::UnboundedSender<BatchEvent>,
        }

        impl crate::progress::BatchProgressCallback for ChannelCallback {
            fn on_batch_start(&self, total: usize) {
                let _ = self.tx.send(BatchEvent::Started { total });
            }
            fn on_item_start(&self, index: usize, total: usize) {
                let _ = self.tx.send(BatchEvent::ItemStarted {
                    index,
                    total,
                    state: BatchState::in_flight(index, total),
                });
            }
            fn on_item_complete(&self, index: usize, total: usize, output_size: u64) {
                let _ = self.tx.send(BatchEvent::ItemFinished {
                    index,
                    total,
                    status: ItemStatus::Completed,
                    output_size: Some(output_size),
                    error: None,
                    overall_progress_percent: overall_percent(index, total),
                });
            }
            fn on_item_error(&self, index: usize, total: usize, error: String) {
                let _ = self.tx.send(BatchEvent::ItemFinished {
                    index,
                    total,
                    status: ItemStatus::Failed,
                    output_size: None,
                    error: Some(error),
                    overall_progress_percent: overall_percent(index, total),
                });
            }
        }

        let callback: ProgressCallback = Arc::new(ChannelCallback { tx: tx.clone() });
        tokio::spawn(async move {
            match self.run_with(items, directive, cancel, Some(callback)).await {
                Ok(outcome) => {
                    let _ = tx.send(BatchEvent::Finished(Box::new(outcome)));
                }
                Err(err) => {
                    warn!(error = %err, "batch stream run rejected");
                }
            }
        });

        Box::pin(UnboundedReceiverStream::new(rx))
    }
}

async fn run_sequential(
    mut items: Vec<WorkItem>,
    directive: &ConversionDirective,
    cancel: CancelToken,
    callback: Option<&ProgressCallback>,
) -> BatchOutcome {
    let total = items.len();

    // Bind the renderer once up front so PDF batches fail fast with a
    // clear message instead of once per item.
    if directive.kind.uses_pdf_renderer() {
        if let Err(err) = render::initialize().await {
            let msg = err.to_string();
            for item in &mut items {
                item.fail(msg.clone());
            }
            return BatchOutcome {
                items,
                state: BatchState::finished(total),
            };
        }
    }

    for index in 0..total {
        if cancel.is_cancelled() {
            for item in &mut items[index..] {
                item.cancel();
            }
            break;
        }

        if let Some(cb) = callback {
            cb.on_item_start(index, total);
        }
        let item = &mut items[index];
        item.start(ITEM_IN_FLIGHT_PERCENT);
        if item.preview.is_none() {
            item.preview = preview::thumbnail(&item.input, &item.input_type).await;
        }

        let result = engine::convert(
            item.input.clone(),
            &item.input_name,
            &item.input_type,
            directive,
        )
        .await;

        match result {
            Ok(converted) => {
                let multi_page = converted.mime == "application/zip";
                let name = files::output_name(&item.input_name, &directive.kind, multi_page);
                let size = converted.data.len() as u64;
                item.complete(converted.data, name);
                if let Some(cb) = callback {
                    cb.on_item_complete(index, total, size);
                }
            }
            Err(err) => {
                let msg = err.to_string();
                warn!(item = %item.input_name, error = %msg, "item conversion failed");
                item.fail(msg.clone());
                if let Some(cb) = callback {
                    cb.on_item_error(index, total, msg);
                }
            }
        }
    }

    BatchOutcome {
        items,
        state: BatchState::finished(total),
    }
}

async fn run_merged(
    mut items: Vec<WorkItem>,
    layout: &crate::directive::PdfLayout,
    cancel: CancelToken,
    callback: Option<&ProgressCallback>,
) -> BatchOutcome {
    let total = items.len();

    if cancel.is_cancelled() {
        for item in &mut items {
            item.cancel();
        }
        return BatchOutcome {
            items,
            state: BatchState::finished(total),
        };
    }

    for item in &mut items {
        item.start(ITEM_IN_FLIGHT_PERCENT);
    }

    let sources: Vec<compose::SourceImage> = items
        .iter()
        .map(|item| compose::SourceImage {
            name: item.input_name.clone(),
            data: item.input.clone(),
            mime: item.input_type.clone(),
        })
        .collect();
    let layout = *layout;
    let result = tokio::task::spawn_blocking(move || compose::merged_document(sources, &layout))
        .await
        .map_err(|e| EngineError::Internal(format!("merge task panicked: {e}")))
        .and_then(|r| r);

    match result {
        Ok(pdf) => {
            let size = pdf.len() as u64;
            let mut combined = WorkItem {
                id: "combined".to_string(),
                input: Vec::new(),
                input_name: items
                    .iter()
                    .map(|it| it.input_name.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
                input_type: "image/*".to_string(),
                input_size: items.iter().map(|it| it.input_size).sum(),
                status: ItemStatus::Pending,
                progress_percent: 0,
                output: None,
                output_name: None,
                output_size: None,
                preview: None,
                error: None,
            };
            combined.complete(pdf, "combined.pdf".to_string());
            if let Some(cb) = callback {
                cb.on_item_complete(0, total, size);
            }
            BatchOutcome {
                items: vec![combined],
                state: BatchState::finished(total),
            }
        }
        Err(err) => {
            warn!(error = %err, "merged pdf composition failed");
            for (index, item) in items.iter_mut().enumerate() {
                item.fail(MERGE_FAILED);
                if let Some(cb) = callback {
                    cb.on_item_error(index, total, MERGE_FAILED.to_string());
                }
            }
            BatchOutcome {
                items,
                state: BatchState::finished(total),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_token_flips_once() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        let clone = token.clone();
        clone.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn overall_percent_is_monotonic_and_ends_at_100() {
        let marks: Vec<u8> = (0..7).map(|i| overall_percent(i, 7)).collect();
        assert!(marks.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(*marks.last().unwrap(), 100);
        assert_eq!(overall_percent(0, 0), 0);
    }

    #[test]
    fn in_flight_state_tracks_the_current_item() {
        let state = BatchState::in_flight(2, 4);
        assert!(state.running);
        assert_eq!(state.current_index, Some(2));
        assert_eq!(state.overall_progress_percent, 50);
    }

    #[test]
    fn finished_state_pins_progress() {
        assert_eq!(BatchState::finished(3).overall_progress_percent, 100);
        assert_eq!(BatchState::finished(0).overall_progress_percent, 0);
        assert!(!BatchState::finished(3).running);
    }

    #[tokio::test]
    async fn empty_batch_is_a_no_op() {
        let orchestrator = BatchOrchestrator::new();
        let outcome = orchestrator
            .run(
                Vec::new(),
                ConversionDirective::new(ConversionKind::OptimizeRaster),
            )
            .await
            .unwrap();
        assert!(outcome.items.is_empty());
        assert_eq!(outcome.state, BatchState::idle());
    }
}
