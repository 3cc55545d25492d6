//! Work items: one input file moving through the batch pipeline.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::error::EngineError;
use crate::files;

static NEXT_ITEM_SEQ: AtomicU64 = AtomicU64::new(1);

/// Lifecycle state of a [`WorkItem`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    /// Accepted, waiting its turn.
    Pending,
    /// Currently being converted.
    Processing,
    /// Conversion finished; output is populated.
    Completed,
    /// Conversion failed; error is populated, no output.
    Failed,
    /// Skipped because the batch was cancelled before its turn.
    Cancelled,
}

/// A single input file and, eventually, its conversion result.
///
/// The raw buffers are deliberately not serialized; the serialized form is
/// a status record (id, names, sizes, progress, error) suitable for JSON
/// reporting.
#[derive(Debug, Clone, Serialize)]
pub struct WorkItem {
    pub id: String,
    #[serde(skip)]
    pub input: Vec<u8>,
    pub input_name: String,
    pub input_type: String,
    pub input_size: u64,
    pub status: ItemStatus,
    /// Per-item progress, `0..=100`.
    pub progress_percent: u8,
    #[serde(skip)]
    pub output: Option<Vec<u8>>,
    pub output_name: Option<String>,
    pub output_size: Option<u64>,
    /// Data-URI thumbnail of the input, when one could be produced.
    pub preview: Option<String>,
    pub error: Option<String>,
}

impl WorkItem {
    /// Validate and accept an input buffer as a pending item.
    pub fn new(input: Vec<u8>, name: impl Into<String>, mime: impl Into<String>) -> Result<Self, EngineError> {
        let name = name.into();
        let mime = mime.into();
        let size = input.len() as u64;
        files::validate(&name, &mime, size)?;
        let seq = NEXT_ITEM_SEQ.fetch_add(1, Ordering::Relaxed);
        Ok(WorkItem {
            id: format!("{seq}-{name}"),
            input,
            input_name: name,
            input_type: mime,
            input_size: size,
            status: ItemStatus::Pending,
            progress_percent: 0,
            output: None,
            output_name: None,
            output_size: None,
            preview: None,
            error: None,
        })
    }

    /// Mark the item as being worked on, with an intermediate progress mark.
    pub fn start(&mut self, progress: u8) {
        self.status = ItemStatus::Processing;
        self.progress_percent = progress.min(100);
        self.error = None;
    }

    /// Record a successful conversion. Pins progress at 100.
    pub fn complete(&mut self, output: Vec<u8>, output_name: String) {
        self.output_size = Some(output.len() as u64);
        self.output = Some(output);
        self.output_name = Some(output_name);
        self.status = ItemStatus::Completed;
        self.progress_percent = 100;
        self.error = None;
    }

    /// Record a failed conversion. Clears any partial output.
    pub fn fail(&mut self, error: impl Into<String>) {
        self.status = ItemStatus::Failed;
        self.error = Some(error.into());
        self.output = None;
        self.output_name = None;
        self.output_size = None;
    }

    /// Mark the item as skipped by cancellation. Only meaningful while
    /// the item is still pending.
    pub fn cancel(&mut self) {
        if self.status == ItemStatus::Pending {
            self.status = ItemStatus::Cancelled;
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self.status,
            ItemStatus::Completed | ItemStatus::Failed | ItemStatus::Cancelled
        )
    }
}
