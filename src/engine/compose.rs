//! PDF generation: single-image pages and merged captioned documents.
//!
//! Documents are written object-by-object with `pdf-writer`. JPEG inputs
//! embed as DCTDecode streams; PNG inputs keep their alpha channel through
//! a FlateDecode RGB stream plus a grayscale soft mask.

use std::io::Write;

use flate2::write::ZlibEncoder;
use flate2::Compression;
use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use pdf_writer::{Content, Filter, Finish, Name, Pdf, Rect, Ref, Str};
use tracing::debug;

use crate::directive::PdfLayout;
use crate::engine::raster;
use crate::error::EngineError;

/// Points per millimetre.
pub const MM_TO_PT: f32 = 72.0 / 25.4;

/// Height in millimetres of the caption band above each merged image.
const CAPTION_BAND_MM: f32 = 10.0;

/// Caption font size in points.
const CAPTION_PT: f32 = 12.0;

/// JPEG quality used when embedding images into PDF pages.
const EMBED_JPEG_QUALITY: u8 = 95;

/// One input image destined for a merged document page.
pub struct SourceImage {
    pub name: String,
    pub data: Vec<u8>,
    pub mime: String,
}

/// Scale `(w, h)` to fit inside `(box_w, box_h)`, never upscaling past the
/// box and preserving aspect ratio.
pub fn fit_within(w: f32, h: f32, box_w: f32, box_h: f32) -> (f32, f32) {
    let scale = (box_w / w).min(box_h / h);
    (w * scale, h * scale)
}

/// An image prepared for embedding: stream bytes, pixel size, and an
/// optional soft mask carrying the alpha channel.
struct EmbeddedImage {
    data: Vec<u8>,
    width: u32,
    height: u32,
    filter: Filter,
    alpha: Option<Vec<u8>>,
}

fn deflate(data: &[u8]) -> Result<Vec<u8>, EngineError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).map_err(EngineError::encode)?;
    encoder.finish().map_err(EngineError::encode)
}

fn prepare(img: &DynamicImage, keep_alpha: bool) -> Result<EmbeddedImage, EngineError> {
    let (width, height) = (img.width(), img.height());
    if keep_alpha && img.color().has_alpha() {
        let rgba = img.to_rgba8();
        let mut rgb = Vec::with_capacity((width * height * 3) as usize);
        let mut alpha = Vec::with_capacity((width * height) as usize);
        for px in rgba.pixels() {
            rgb.extend_from_slice(&px.0[..3]);
            alpha.push(px.0[3]);
        }
        Ok(EmbeddedImage {
            data: deflate(&rgb)?,
            width,
            height,
            filter: Filter::FlateDecode,
            alpha: Some(deflate(&alpha)?),
        })
    } else {
        let rgb = raster::flatten_onto_white(img);
        let mut jpeg = Vec::new();
        let encoder = JpegEncoder::new_with_quality(&mut jpeg, EMBED_JPEG_QUALITY);
        rgb.write_with_encoder(encoder).map_err(EngineError::encode)?;
        Ok(EmbeddedImage {
            data: jpeg,
            width,
            height,
            filter: Filter::DctDecode,
            alpha: None,
        })
    }
}

fn write_image_objects(pdf: &mut Pdf, alloc: &mut Ref, embedded: &EmbeddedImage) -> Ref {
    let image_id = alloc.bump();
    let mask_id = embedded.alpha.as_ref().map(|_| alloc.bump());

    let mut image = pdf.image_xobject(image_id, &embedded.data);
    image.filter(embedded.filter);
    image.width(embedded.width as i32);
    image.height(embedded.height as i32);
    image.color_space().device_rgb();
    image.bits_per_component(8);
    if let Some(mask_id) = mask_id {
        image.s_mask(mask_id);
    }
    image.finish();

    if let (Some(alpha), Some(mask_id)) = (&embedded.alpha, mask_id) {
        let mut mask = pdf.image_xobject(mask_id, alpha);
        mask.filter(Filter::FlateDecode);
        mask.width(embedded.width as i32);
        mask.height(embedded.height as i32);
        mask.color_space().device_gray();
        mask.bits_per_component(8);
        mask.finish();
    }

    image_id
}

/// Place a single image on one PDF page.
///
/// The page is A4 portrait; the image is scaled to the largest size that
/// fits the page and anchored at the top-left page corner, edge to edge.
pub fn single_page(data: &[u8]) -> Result<Vec<u8>, EngineError> {
    let layout = PdfLayout::default();
    let img = raster::decode(data)?;
    let embedded = prepare(&img, false)?;

    let (page_w, page_h) = layout.page_points();
    let (draw_w, draw_h) =
        fit_within(embedded.width as f32, embedded.height as f32, page_w, page_h);

    let mut pdf = Pdf::new();
    let mut alloc = Ref::new(1);
    let catalog_id = alloc.bump();
    let tree_id = alloc.bump();
    let page_id = alloc.bump();
    let content_id = alloc.bump();
    let image_id = write_image_objects(&mut pdf, &mut alloc, &embedded);

    pdf.catalog(catalog_id).pages(tree_id);
    pdf.pages(tree_id).kids([page_id]).count(1);

    let mut page = pdf.page(page_id);
    page.media_box(Rect::new(0.0, 0.0, page_w, page_h));
    page.parent(tree_id);
    page.contents(content_id);
    page.resources().x_objects().pair(Name(b"Im0"), image_id);
    page.finish();

    let mut content = Content::new();
    content.save_state();
    content.transform([draw_w, 0.0, 0.0, draw_h, 0.0, page_h - draw_h]);
    content.x_object(Name(b"Im0"));
    content.restore_state();
    pdf.stream(content_id, &content.finish());

    Ok(pdf.finish())
}

/// Combine every source image into one captioned PDF document.
///
/// Pages are ordered by file name. Each page carries a caption band under
/// the top margin showing the source file name, with the image centered
/// horizontally in the remaining content box. Any undecodable source
/// aborts the whole merge.
pub fn merged_document(
    mut sources: Vec<SourceImage>,
    layout: &PdfLayout,
) -> Result<Vec<u8>, EngineError> {
    sources.sort_by(|a, b| a.name.cmp(&b.name));

    let (page_w, page_h) = layout.page_points();
    let margin = layout.margin_mm as f32 * MM_TO_PT;
    let band = CAPTION_BAND_MM * MM_TO_PT;
    let box_w = page_w - 2.0 * margin;
    let box_h = page_h - 2.0 * margin - band;

    let mut pdf = Pdf::new();
    let mut alloc = Ref::new(1);
    let catalog_id = alloc.bump();
    let tree_id = alloc.bump();
    let font_id = alloc.bump();

    let mut page_ids = Vec::with_capacity(sources.len());
    let mut pending = Vec::with_capacity(sources.len());
    for source in &sources {
        let keep_alpha = source.mime == "image/png";
        let img = raster::decode(&source.data)?;
        let embedded = prepare(&img, keep_alpha)?;
        let page_id = alloc.bump();
        let content_id = alloc.bump();
        let image_id = write_image_objects(&mut pdf, &mut alloc, &embedded);
        page_ids.push(page_id);
        pending.push((page_id, content_id, image_id, embedded, source.name.clone()));
    }

    pdf.catalog(catalog_id).pages(tree_id);
    pdf.pages(tree_id)
        .kids(page_ids.iter().copied())
        .count(page_ids.len() as i32);
    pdf.type1_font(font_id).base_font(Name(b"Helvetica"));

    for (page_id, content_id, image_id, embedded, name) in pending {
        let mut page = pdf.page(page_id);
        page.media_box(Rect::new(0.0, 0.0, page_w, page_h));
        page.parent(tree_id);
        page.contents(content_id);
        let mut resources = page.resources();
        resources.x_objects().pair(Name(b"Im0"), image_id);
        resources.fonts().pair(Name(b"F1"), font_id);
        resources.finish();
        page.finish();

        let (draw_w, draw_h) =
            fit_within(embedded.width as f32, embedded.height as f32, box_w, box_h);
        let x = margin + (box_w - draw_w) / 2.0;
        let y = page_h - margin - band - draw_h;
        let caption_y = page_h - margin - 7.0 * MM_TO_PT;

        let mut content = Content::new();
        content.begin_text();
        content.set_font(Name(b"F1"), CAPTION_PT);
        content.set_fill_rgb(0.157, 0.157, 0.157);
        content.next_line(margin, caption_y);
        content.show(Str(name.as_bytes()));
        content.end_text();
        content.save_state();
        content.transform([draw_w, 0.0, 0.0, draw_h, x, y]);
        content.x_object(Name(b"Im0"));
        content.restore_state();
        pdf.stream(content_id, &content.finish());
    }

    debug!(pages = page_ids.len(), "composed merged pdf");
    Ok(pdf.finish())
}
