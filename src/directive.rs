//! Conversion directives.
//!
//! A [`ConversionDirective`] describes what a batch run should do with its
//! inputs: the conversion kind plus the knobs that apply to it (encode
//! quality, and for merged PDFs the page layout).

use serde::{Deserialize, Serialize};

/// Raster output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RasterFormat {
    Jpeg,
    Png,
}

impl RasterFormat {
    pub fn mime(self) -> &'static str {
        match self {
            RasterFormat::Jpeg => "image/jpeg",
            RasterFormat::Png => "image/png",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            RasterFormat::Jpeg => "jpg",
            RasterFormat::Png => "png",
        }
    }
}

/// Target page size for generated PDF documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageSize {
    /// 210 × 297 mm.
    #[default]
    A4,
    /// 8.5 × 11 in.
    Letter,
}

impl PageSize {
    /// Page dimensions in PDF points (portrait).
    pub fn points(self) -> (f32, f32) {
        match self {
            PageSize::A4 => (595.276, 841.89),
            PageSize::Letter => (612.0, 792.0),
        }
    }
}

/// Page orientation for generated PDF documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

/// Layout for merged PDF documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PdfLayout {
    pub page_size: PageSize,
    pub orientation: Orientation,
    /// Page margin in millimetres, clamped to `0..=50`.
    pub margin_mm: u32,
}

impl Default for PdfLayout {
    fn default() -> Self {
        PdfLayout {
            page_size: PageSize::A4,
            orientation: Orientation::Portrait,
            margin_mm: 10,
        }
    }
}

impl PdfLayout {
    pub const MAX_MARGIN_MM: u32 = 50;

    pub fn new(page_size: PageSize, orientation: Orientation, margin_mm: u32) -> Self {
        PdfLayout {
            page_size,
            orientation,
            margin_mm: margin_mm.min(Self::MAX_MARGIN_MM),
        }
    }

    /// Page dimensions in points after applying the orientation.
    pub fn page_points(&self) -> (f32, f32) {
        let (w, h) = self.page_size.points();
        match self.orientation {
            Orientation::Portrait => (w, h),
            Orientation::Landscape => (h, w),
        }
    }
}

/// What a batch run does with each input.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConversionKind {
    /// Re-encode a raster image into `target` (JPEG ↔ PNG).
    RasterToRaster { target: RasterFormat },
    /// Place each image on its own single-page PDF.
    RasterToPdf,
    /// Combine every image in the batch into one captioned PDF.
    RasterToPdfMerged { layout: PdfLayout },
    /// Re-encode an image in its own format at the directive's quality.
    OptimizeRaster,
    /// Render PDF pages to raster images (one file or a zip archive).
    PdfToRaster { target: RasterFormat },
    /// Extract PDF text into a Word-compatible document.
    PdfToTextDocument,
}

impl ConversionKind {
    /// Whether this kind needs the PDF rendering engine.
    pub fn uses_pdf_renderer(&self) -> bool {
        matches!(
            self,
            ConversionKind::PdfToRaster { .. } | ConversionKind::PdfToTextDocument
        )
    }
}

/// Full description of a conversion, ready to hand to the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConversionDirective {
    #[serde(flatten)]
    pub kind: ConversionKind,
    /// Encode quality in `0.1..=1.0`. Only meaningful for JPEG output;
    /// PNG encoding is lossless and ignores it.
    pub quality: f32,
}

impl ConversionDirective {
    pub const MIN_QUALITY: f32 = 0.1;
    pub const MAX_QUALITY: f32 = 1.0;
    pub const DEFAULT_QUALITY: f32 = 0.9;

    pub fn new(kind: ConversionKind) -> Self {
        ConversionDirective {
            kind,
            quality: Self::DEFAULT_QUALITY,
        }
    }

    pub fn with_quality(kind: ConversionKind, quality: f32) -> Self {
        ConversionDirective {
            kind,
            quality: quality.clamp(Self::MIN_QUALITY, Self::MAX_QUALITY),
        }
    }

    /// Quality mapped to the 1–100 scale JPEG encoders expect.
    pub fn jpeg_quality(&self) -> u8 {
        (self.quality * 100.0).round() as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_is_clamped_into_range() {
        let low = ConversionDirective::with_quality(ConversionKind::OptimizeRaster, 0.0);
        assert_eq!(low.quality, 0.1);
        let high = ConversionDirective::with_quality(ConversionKind::OptimizeRaster, 1.5);
        assert_eq!(high.quality, 1.0);
    }

    #[test]
    fn default_quality_maps_to_jpeg_90() {
        let d = ConversionDirective::new(ConversionKind::OptimizeRaster);
        assert_eq!(d.jpeg_quality(), 90);
    }

    #[test]
    fn margin_is_clamped_to_50mm() {
        let layout = PdfLayout::new(PageSize::A4, Orientation::Portrait, 120);
        assert_eq!(layout.margin_mm, 50);
    }

    #[test]
    fn landscape_swaps_page_points() {
        let layout = PdfLayout::new(PageSize::Letter, Orientation::Landscape, 10);
        let (w, h) = layout.page_points();
        assert_eq!((w, h), (792.0, 612.0));
    }
}
