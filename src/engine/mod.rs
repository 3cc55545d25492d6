//! The conversion engine.
//!
//! Every supported conversion flows through [`convert`]:
//!
//! ```text
//!   input bytes ──► validate ──► dispatch on ConversionKind
//!                                    │
//!           ┌────────────┬───────────┼─────────────┬─────────────┐
//!           ▼            ▼           ▼             ▼             ▼
//!        raster       compose     extract       textdoc       preview
//!      (JPEG⇄PNG)   (image→PDF) (PDF→images)  (PDF→.doc)   (thumbnails)
//!                                    │
//!                                 render
//!                            (pdfium surface)
//! ```
//!
//! The merged image→PDF mode operates on the whole batch at once and is
//! handled by the orchestrator, not here.

pub mod compose;
pub mod extract;
pub mod preview;
pub mod raster;
pub mod render;
pub mod textdoc;

use crate::directive::{ConversionDirective, ConversionKind};
use crate::error::EngineError;
use crate::files;

/// The result of converting one input: output bytes plus their MIME type.
#[derive(Debug, Clone)]
pub struct Converted {
    pub data: Vec<u8>,
    pub mime: &'static str,
}

/// Run CPU-bound conversion work off the async worker threads.
pub(crate) async fn run_blocking<T, F>(f: F) -> Result<T, EngineError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, EngineError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| EngineError::Internal(format!("conversion task panicked: {e}")))?
}

/// Convert one input buffer according to the directive.
///
/// The input is validated first; the per-kind pipelines do the rest.
/// Returns [`EngineError::Internal`] for the merged mode, which only makes
/// sense across a whole batch.
pub async fn convert(
    data: Vec<u8>,
    name: &str,
    mime: &str,
    directive: &ConversionDirective,
) -> Result<Converted, EngineError> {
    files::validate(name, mime, data.len() as u64)?;

    match directive.kind {
        ConversionKind::RasterToRaster { target } => {
            let directive = *directive;
            let out = run_blocking(move || {
                let img = raster::decode(&data)?;
                raster::encode(&img, target, &directive)
            })
            .await?;
            Ok(Converted {
                data: out,
                mime: target.mime(),
            })
        }
        ConversionKind::RasterToPdf => {
            let out = run_blocking(move || compose::single_page(&data)).await?;
            Ok(Converted {
                data: out,
                mime: "application/pdf",
            })
        }
        ConversionKind::RasterToPdfMerged { .. } => Err(EngineError::Internal(
            "merged conversion applies to a whole batch".into(),
        )),
        ConversionKind::OptimizeRaster => {
            let directive = *directive;
            let mime = mime.to_string();
            let (out, format) =
                run_blocking(move || raster::optimize(&data, &mime, &directive)).await?;
            Ok(Converted {
                data: out,
                mime: format.mime(),
            })
        }
        ConversionKind::PdfToRaster { target } => {
            extract::pages_to_images(data, target, directive).await
        }
        ConversionKind::PdfToTextDocument => Ok(Converted {
            data: textdoc::to_text_document(data, name).await?,
            mime: textdoc::DOC_MIME,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directive::RasterFormat;

    fn png_input() -> Vec<u8> {
        let img = image::DynamicImage::ImageRgba8(image::RgbaImage::from_pixel(
            4,
            4,
            image::Rgba([10, 20, 30, 255]),
        ));
        raster::encode(
            &img,
            RasterFormat::Png,
            &ConversionDirective::new(ConversionKind::OptimizeRaster),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn png_to_jpeg_produces_jpeg_bytes() {
        let directive = ConversionDirective::new(ConversionKind::RasterToRaster {
            target: RasterFormat::Jpeg,
        });
        let out = convert(png_input(), "a.png", "image/png", &directive)
            .await
            .unwrap();
        assert_eq!(out.mime, "image/jpeg");
        assert_eq!(&out.data[..2], &[0xFF, 0xD8]);
    }

    #[tokio::test]
    async fn single_page_pdf_conversion_runs_off_the_worker_thread() {
        let directive = ConversionDirective::new(ConversionKind::RasterToPdf);
        let handle = tokio::spawn(async move {
            convert(png_input(), "a.png", "image/png", &directive).await
        });
        let out = handle.await.unwrap().unwrap();
        assert_eq!(out.mime, "application/pdf");
        assert!(out.data.starts_with(b"%PDF-"));
    }

    #[tokio::test]
    async fn merged_kind_is_rejected_per_item() {
        let directive = ConversionDirective::new(ConversionKind::RasterToPdfMerged {
            layout: Default::default(),
        });
        let err = convert(png_input(), "a.png", "image/png", &directive)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Internal(_)));
    }

    #[tokio::test]
    async fn validation_runs_before_dispatch() {
        let directive = ConversionDirective::new(ConversionKind::OptimizeRaster);
        let err = convert(vec![0], "a.bmp", "image/bmp", &directive)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::UnsupportedInput { .. }));
    }
}
