//! Raster decode/encode: JPEG ↔ PNG conversion and re-encoding.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, RgbImage};

use crate::directive::{ConversionDirective, RasterFormat};
use crate::error::EngineError;

/// Decode an input buffer into an image.
pub fn decode(data: &[u8]) -> Result<DynamicImage, EngineError> {
    image::load_from_memory(data).map_err(EngineError::decode)
}

/// Composite an image onto a white background, dropping its alpha channel.
///
/// JPEG has no transparency; transparent PNG regions become white rather
/// than the encoder default of black.
pub fn flatten_onto_white(img: &DynamicImage) -> RgbImage {
    let rgba = img.to_rgba8();
    let mut out = RgbImage::new(rgba.width(), rgba.height());
    for (src, dst) in rgba.pixels().zip(out.pixels_mut()) {
        let [r, g, b, a] = src.0;
        let a = a as u16;
        dst.0 = [
            ((r as u16 * a + 255 * (255 - a)) / 255) as u8,
            ((g as u16 * a + 255 * (255 - a)) / 255) as u8,
            ((b as u16 * a + 255 * (255 - a)) / 255) as u8,
        ];
    }
    out
}

/// Encode an image into the requested format.
///
/// JPEG output honours the directive's quality and is flattened onto white
/// first. PNG encoding is lossless, so the quality setting is ignored.
pub fn encode(
    img: &DynamicImage,
    format: RasterFormat,
    directive: &ConversionDirective,
) -> Result<Vec<u8>, EngineError> {
    let mut buf = Vec::new();
    match format {
        RasterFormat::Jpeg => {
            let rgb = flatten_onto_white(img);
            let encoder = JpegEncoder::new_with_quality(&mut buf, directive.jpeg_quality());
            rgb.write_with_encoder(encoder).map_err(EngineError::encode)?;
        }
        RasterFormat::Png => {
            img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
                .map_err(EngineError::encode)?;
        }
    }
    Ok(buf)
}

/// Re-encode an image in its own format, typically to shrink it.
pub fn optimize(
    data: &[u8],
    mime: &str,
    directive: &ConversionDirective,
) -> Result<(Vec<u8>, RasterFormat), EngineError> {
    let format = match mime {
        "image/jpeg" => RasterFormat::Jpeg,
        "image/png" => RasterFormat::Png,
        other => {
            return Err(EngineError::UnsupportedInput { mime: other.into() });
        }
    };
    let img = decode(data)?;
    let out = encode(&img, format, directive)?;
    Ok((out, format))
}
