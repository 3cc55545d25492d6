//! Input thumbnails as data URIs.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::codecs::jpeg::JpegEncoder;
use tracing::warn;

use crate::engine::{raster, render};

/// Render scale for PDF previews: the nominal page size is plenty.
const PREVIEW_SCALE: f32 = 1.0;

/// JPEG quality for PDF preview thumbnails.
const PREVIEW_JPEG_QUALITY: u8 = 70;

/// Build a data-URI thumbnail for an input buffer.
///
/// Raster inputs are embedded as-is; PDFs get their first page rendered to
/// a JPEG. Preview generation is best-effort: any failure logs a warning
/// and yields `None` rather than failing the item.
pub async fn thumbnail(data: &[u8], mime: &str) -> Option<String> {
    match mime {
        "image/jpeg" | "image/png" => {
            Some(format!("data:{mime};base64,{}", STANDARD.encode(data)))
        }
        "application/pdf" => match pdf_thumbnail(data.to_vec()).await {
            Ok(uri) => Some(uri),
            Err(err) => {
                warn!(error = %err, "pdf preview failed");
                None
            }
        },
        _ => None,
    }
}

async fn pdf_thumbnail(data: Vec<u8>) -> Result<String, crate::error::EngineError> {
    let page = render::render_first_page(data, PREVIEW_SCALE).await?;
    let rgb = raster::flatten_onto_white(&page);
    let mut jpeg = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut jpeg, PREVIEW_JPEG_QUALITY);
    rgb.write_with_encoder(encoder)
        .map_err(crate::error::EngineError::encode)?;
    Ok(format!("data:image/jpeg;base64,{}", STANDARD.encode(&jpeg)))
}
