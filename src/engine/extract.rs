//! PDF page extraction: render pages to images, bundling multi-page
//! results into a zip archive.

use std::io::{Cursor, Write};

use zip::write::FileOptions;
use zip::ZipWriter;

use crate::directive::{ConversionDirective, RasterFormat};
use crate::engine::{raster, render, Converted};
use crate::error::EngineError;

/// Render scale for page extraction. Doubling the nominal page size keeps
/// text legible in the rendered images.
const EXTRACT_SCALE: f32 = 2.0;

/// Convert a PDF into raster images, one per page.
///
/// A one-page document produces a bare image; anything longer produces a
/// zip archive with entries `page-1.<ext>`, `page-2.<ext>`, …
pub async fn pages_to_images(
    data: Vec<u8>,
    target: RasterFormat,
    directive: &ConversionDirective,
) -> Result<Converted, EngineError> {
    let pages = render::render_pages(data, EXTRACT_SCALE).await?;
    if pages.is_empty() {
        return Err(EngineError::Parse {
            detail: "document has no pages".into(),
        });
    }

    let mut encoded = Vec::with_capacity(pages.len());
    for page in &pages {
        encoded.push(raster::encode(page, target, directive)?);
    }

    if encoded.len() == 1 {
        return Ok(Converted {
            data: encoded.remove(0),
            mime: target.mime(),
        });
    }

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (idx, bytes) in encoded.iter().enumerate() {
        let entry = format!("page-{}.{}", idx + 1, target.extension());
        writer
            .start_file(entry, FileOptions::default())
            .map_err(EngineError::encode)?;
        writer.write_all(bytes).map_err(EngineError::encode)?;
    }
    let archive = writer
        .finish()
        .map_err(EngineError::encode)?
        .into_inner();

    Ok(Converted {
        data: archive,
        mime: "application/zip",
    })
}
