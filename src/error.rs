//! Error types for the fileease library.
//!
//! The batch orchestrator deliberately distinguishes two failure scopes:
//!
//! * Per-item failures — a single [`crate::item::WorkItem`] could not be
//!   converted (undecodable image, malformed PDF). These are captured as the
//!   item's error message and never abort the batch; the loop moves on to
//!   the next item.
//!
//! * Batch-level failures — the run itself cannot proceed (another run is
//!   already in progress). Returned as `Err(EngineError)` from
//!   [`crate::batch::BatchOrchestrator::run`].
//!
//! The one exception is the merged-PDF mode, where any single decode failure
//! aborts the whole merge and is reported against every item — an
//! all-or-nothing policy, since a partial combined document would be worse
//! than none.

use thiserror::Error;

/// All errors produced by the conversion engine.
#[derive(Debug, Error)]
pub enum EngineError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The declared MIME type is outside the supported set.
    #[error("Unsupported input type '{mime}'\nSupported: image/jpeg, image/png, application/pdf")]
    UnsupportedInput { mime: String },

    /// The input buffer exceeds the per-file size ceiling.
    #[error("Input '{name}' is {size} bytes, exceeding the {limit}-byte limit")]
    InputTooLarge { name: String, size: u64, limit: u64 },

    // ── Data errors ───────────────────────────────────────────────────────
    /// Input bytes could not be interpreted as a raster image.
    #[error("Failed to decode image: {detail}")]
    Decode { detail: String },

    /// The buffer is not a well-formed PDF.
    #[error("Failed to parse PDF: {detail}")]
    Parse { detail: String },

    /// Text extraction from a PDF failed.
    #[error("Failed to extract text from PDF: {detail}")]
    Extract { detail: String },

    // ── Environment errors ────────────────────────────────────────────────
    /// The target encoder or archive writer could not produce output.
    /// This is an environment/resource failure, not a data failure.
    #[error("Encoding failed: {detail}")]
    Encode { detail: String },

    /// The PDF rendering engine is unavailable.
    #[error(
        "PDF rendering engine unavailable: {detail}\n\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium to use an existing copy,\n\
or place the pdfium shared library next to the executable."
    )]
    ResourceUnavailable { detail: String },

    // ── Batch errors ──────────────────────────────────────────────────────
    /// A run was requested while another run is still in progress.
    #[error("A batch run is already in progress; wait for it to finish before starting another")]
    BatchBusy,

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl EngineError {
    /// Shorthand for a decode failure from any displayable source.
    pub(crate) fn decode(err: impl std::fmt::Display) -> Self {
        EngineError::Decode {
            detail: err.to_string(),
        }
    }

    /// Shorthand for an encode failure from any displayable source.
    pub(crate) fn encode(err: impl std::fmt::Display) -> Self {
        EngineError::Encode {
            detail: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_input_names_the_mime() {
        let e = EngineError::UnsupportedInput {
            mime: "image/webp".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("image/webp"), "got: {msg}");
        assert!(msg.contains("image/png"));
    }

    #[test]
    fn too_large_reports_both_sizes() {
        let e = EngineError::InputTooLarge {
            name: "big.png".into(),
            size: 60_000_000,
            limit: 52_428_800,
        };
        let msg = e.to_string();
        assert!(msg.contains("60000000"));
        assert!(msg.contains("52428800"));
    }

    #[test]
    fn resource_unavailable_mentions_lib_path_hint() {
        let e = EngineError::ResourceUnavailable {
            detail: "no pdfium".into(),
        };
        assert!(e.to_string().contains("PDFIUM_LIB_PATH"));
    }

    #[test]
    fn decode_helper_wraps_display() {
        let e = EngineError::decode("bad magic bytes");
        assert!(matches!(e, EngineError::Decode { .. }));
        assert!(e.to_string().contains("bad magic bytes"));
    }
}
