//! # fileease
//!
//! Batch file conversion between images and PDFs: JPEG ⇄ PNG, image → PDF
//! (one page per image, or one captioned document for the whole batch),
//! PDF → images (zipped when multi-page), PDF → Word-compatible text
//! document, plus image re-encoding ("optimize") and input thumbnails.
//!
//! ```text
//!   WorkItem queue ──► BatchOrchestrator ──► engine::convert per item
//!                             │                     │
//!                       progress callbacks     raster / compose /
//!                       or BatchEvent stream   extract / textdoc
//! ```
//!
//! ## Quick start
//!
//! ```no_run
//! use fileease::{
//!     BatchOrchestrator, ConversionDirective, ConversionKind, RasterFormat, WorkItem,
//! };
//!
//! # async fn demo() -> Result<(), fileease::EngineError> {
//! let items = vec![WorkItem::new(
//!     std::fs::read("photo.png").map_err(|e| fileease::EngineError::Internal(e.to_string()))?,
//!     "photo.png",
//!     "image/png",
//! )?];
//!
//! let directive = ConversionDirective::new(ConversionKind::RasterToRaster {
//!     target: RasterFormat::Jpeg,
//! });
//!
//! let orchestrator = BatchOrchestrator::new();
//! let outcome = orchestrator.run(items, directive).await?;
//! for item in &outcome.items {
//!     println!("{}: {:?}", item.input_name, item.status);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! PDF-consuming conversions need the pdfium shared library; see
//! [`EngineError::ResourceUnavailable`] for how it is located.

pub mod batch;
pub mod directive;
pub mod engine;
pub mod error;
pub mod files;
pub mod item;
pub mod progress;

pub use batch::{
    BatchEvent, BatchEventStream, BatchOrchestrator, BatchOutcome, BatchState, CancelToken,
};
pub use directive::{
    ConversionDirective, ConversionKind, Orientation, PageSize, PdfLayout, RasterFormat,
};
pub use engine::Converted;
pub use error::EngineError;
pub use files::{compression_ratio, format_file_size, output_name, MAX_INPUT_BYTES};
pub use item::{ItemStatus, WorkItem};
pub use progress::{BatchProgressCallback, NoopProgressCallback, ProgressCallback};
