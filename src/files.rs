//! Input validation, output naming, and size formatting helpers.

use crate::directive::ConversionKind;
use crate::error::EngineError;

/// Per-file input ceiling: 50 MB.
pub const MAX_INPUT_BYTES: u64 = 50 * 1024 * 1024;

/// MIME types the engine accepts as input.
pub const SUPPORTED_INPUT_TYPES: [&str; 3] = ["image/jpeg", "image/png", "application/pdf"];

/// Check a prospective input against the type allow-list and size ceiling.
pub fn validate(name: &str, mime: &str, size: u64) -> Result<(), EngineError> {
    if !SUPPORTED_INPUT_TYPES.contains(&mime) {
        return Err(EngineError::UnsupportedInput { mime: mime.into() });
    }
    if size > MAX_INPUT_BYTES {
        return Err(EngineError::InputTooLarge {
            name: name.into(),
            size,
            limit: MAX_INPUT_BYTES,
        });
    }
    Ok(())
}

/// Human-readable file size, binary units.
///
/// `0` formats as `"0 Bytes"`; fractional values keep up to two decimals
/// with trailing zeros trimmed (`1536` → `"1.5 KB"`).
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let mut s = format!("{value:.2}");
    while s.ends_with('0') {
        s.pop();
    }
    if s.ends_with('.') {
        s.pop();
    }
    format!("{s} {}", UNITS[unit])
}

/// Space saved by a conversion, as a rounded percentage.
///
/// Negative when the output grew; `0` when the original size is zero.
pub fn compression_ratio(original: u64, converted: u64) -> i64 {
    if original == 0 {
        return 0;
    }
    let saved = original as f64 - converted as f64;
    (saved / original as f64 * 100.0).round() as i64
}

fn stem(name: &str) -> &str {
    match name.rfind('.') {
        Some(0) | None => name,
        Some(idx) => &name[..idx],
    }
}

/// Output file name for a converted item.
///
/// Page-extraction runs name a single rendered page `<stem>.<ext>` and a
/// multi-page archive `<stem>-pages.zip`; `multi_page` selects between the
/// two. The merged mode always produces `combined.pdf` regardless of input.
pub fn output_name(input_name: &str, kind: &ConversionKind, multi_page: bool) -> String {
    match kind {
        ConversionKind::RasterToRaster { target } => {
            format!("{}.{}", stem(input_name), target.extension())
        }
        ConversionKind::RasterToPdf => format!("{}.pdf", stem(input_name)),
        ConversionKind::RasterToPdfMerged { .. } => "combined.pdf".to_string(),
        ConversionKind::OptimizeRaster => input_name.to_string(),
        ConversionKind::PdfToRaster { target } => {
            if multi_page {
                format!("{}-pages.zip", stem(input_name))
            } else {
                format!("{}.{}", stem(input_name), target.extension())
            }
        }
        ConversionKind::PdfToTextDocument => format!("{}.doc", stem(input_name)),
    }
}

/// Best-effort MIME type from a file extension.
pub fn mime_for_extension(ext: &str) -> Option<&'static str> {
    match ext.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "pdf" => Some("application/pdf"),
        _ => None,
    }
}
