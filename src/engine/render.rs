//! PDF rasterisation and text access via pdfium.
//!
//! Pdfium is a C library with global state, so all calls funnel through a
//! single render surface: an async mutex acquired before each
//! `spawn_blocking` hop. Callers never touch pdfium types directly; they
//! get `DynamicImage`s and `String`s back.

use image::DynamicImage;
use once_cell::sync::OnceCell;
use pdfium_render::prelude::*;
use tokio::sync::Mutex;
use tracing::debug;

use crate::engine::run_blocking;
use crate::error::EngineError;

/// Serialises all pdfium work. One render at a time, by construction.
static SURFACE: Mutex<()> = Mutex::const_new(());

/// Set once the library has been located and bound successfully.
static BOUND: OnceCell<()> = OnceCell::new();

fn bind_pdfium() -> Result<Pdfium, EngineError> {
    let bindings = if let Ok(path) = std::env::var("PDFIUM_LIB_PATH") {
        Pdfium::bind_to_library(&path)
    } else {
        Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library())
    };
    let bindings = bindings.map_err(|e| EngineError::ResourceUnavailable {
        detail: e.to_string(),
    })?;
    Ok(Pdfium::new(bindings))
}

/// Verify the pdfium library can be bound. Idempotent; later calls are
/// free once a binding has succeeded.
pub async fn initialize() -> Result<(), EngineError> {
    if BOUND.get().is_some() {
        return Ok(());
    }
    let _guard = SURFACE.lock().await;
    run_blocking(|| {
        bind_pdfium()?;
        Ok(())
    })
    .await?;
    let _ = BOUND.set(());
    debug!("pdfium bound");
    Ok(())
}

fn load<'a>(pdfium: &'a Pdfium, data: &'a [u8]) -> Result<PdfDocument<'a>, EngineError> {
    pdfium
        .load_pdf_from_byte_slice(data, None)
        .map_err(|e| EngineError::Parse {
            detail: e.to_string(),
        })
}

/// Number of pages in a PDF buffer.
pub async fn page_count(data: Vec<u8>) -> Result<usize, EngineError> {
    let _guard = SURFACE.lock().await;
    run_blocking(move || {
        let pdfium = bind_pdfium()?;
        let document = load(&pdfium, &data)?;
        Ok(document.pages().len() as usize)
    })
    .await
}

/// Render every page of a PDF at the given scale factor.
pub async fn render_pages(data: Vec<u8>, scale: f32) -> Result<Vec<DynamicImage>, EngineError> {
    let _guard = SURFACE.lock().await;
    run_blocking(move || {
        let pdfium = bind_pdfium()?;
        let document = load(&pdfium, &data)?;
        let config = PdfRenderConfig::new().scale_page_by_factor(scale);
        let mut images = Vec::with_capacity(document.pages().len() as usize);
        for page in document.pages().iter() {
            let bitmap = page
                .render_with_config(&config)
                .map_err(EngineError::decode)?;
            images.push(bitmap.as_image());
        }
        debug!(pages = images.len(), scale, "rendered pdf pages");
        Ok(images)
    })
    .await
}

/// Render only the first page, for previews.
pub async fn render_first_page(data: Vec<u8>, scale: f32) -> Result<DynamicImage, EngineError> {
    let _guard = SURFACE.lock().await;
    run_blocking(move || {
        let pdfium = bind_pdfium()?;
        let document = load(&pdfium, &data)?;
        let page = document
            .pages()
            .get(0)
            .map_err(|e| EngineError::Parse {
                detail: e.to_string(),
            })?;
        let bitmap = page
            .render_with_config(&PdfRenderConfig::new().scale_page_by_factor(scale))
            .map_err(EngineError::decode)?;
        Ok(bitmap.as_image())
    })
    .await
}

/// Extract the text of every page, one string per page.
pub async fn page_texts(data: Vec<u8>) -> Result<Vec<String>, EngineError> {
    let _guard = SURFACE.lock().await;
    run_blocking(move || {
        let pdfium = bind_pdfium()?;
        let document = load(&pdfium, &data)?;
        let mut texts = Vec::with_capacity(document.pages().len() as usize);
        for page in document.pages().iter() {
            let text = page.text().map_err(|e| EngineError::Extract {
                detail: e.to_string(),
            })?;
            texts.push(text.all());
        }
        Ok(texts)
    })
    .await
}
