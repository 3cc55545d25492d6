//! End-to-end batch runs that need no external PDF renderer.

use std::io::Cursor;
use std::sync::Arc;

use image::{DynamicImage, Rgba, RgbaImage};
use tokio_stream::StreamExt;

use fileease::{
    BatchEvent, BatchOrchestrator, BatchProgressCallback, CancelToken, ConversionDirective,
    ConversionKind, EngineError, ItemStatus, Orientation, PageSize, PdfLayout, RasterFormat,
    WorkItem,
};

fn png_bytes(color: [u8; 4]) -> Vec<u8> {
    let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(16, 8, Rgba(color)));
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

fn png_item(name: &str) -> WorkItem {
    WorkItem::new(png_bytes([120, 60, 200, 255]), name, "image/png").unwrap()
}

fn directive(kind: ConversionKind) -> ConversionDirective {
    ConversionDirective::new(kind)
}

#[tokio::test]
async fn png_batch_converts_to_jpeg() {
    let orchestrator = BatchOrchestrator::new();
    let items = vec![png_item("a.png"), png_item("b.png")];
    let outcome = orchestrator
        .run(
            items,
            directive(ConversionKind::RasterToRaster {
                target: RasterFormat::Jpeg,
            }),
        )
        .await
        .unwrap();

    assert_eq!(outcome.items.len(), 2);
    for (item, expected) in outcome.items.iter().zip(["a.jpg", "b.jpg"]) {
        assert_eq!(item.status, ItemStatus::Completed);
        assert_eq!(item.progress_percent, 100);
        assert_eq!(item.output_name.as_deref(), Some(expected));
        let out = item.output.as_ref().unwrap();
        assert_eq!(&out[..2], &[0xFF, 0xD8]);
    }
    assert_eq!(outcome.state.overall_progress_percent, 100);
    assert!(!outcome.state.running);
}

#[tokio::test]
async fn transparent_png_flattens_to_white_in_jpeg() {
    let transparent = {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 8, Rgba([0, 0, 0, 0])));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    };
    let orchestrator = BatchOrchestrator::new();
    let items = vec![WorkItem::new(transparent, "see-through.png", "image/png").unwrap()];
    let outcome = orchestrator
        .run(
            items,
            directive(ConversionKind::RasterToRaster {
                target: RasterFormat::Jpeg,
            }),
        )
        .await
        .unwrap();

    let jpeg = outcome.items[0].output.as_ref().unwrap();
    let decoded = image::load_from_memory(jpeg).unwrap().to_rgb8();
    for px in decoded.pixels() {
        // JPEG is lossy; allow a little ringing around pure white.
        assert!(px.0.iter().all(|&c| c > 250), "pixel {:?} is not white", px.0);
    }
}

#[tokio::test]
async fn one_bad_item_does_not_sink_the_batch() {
    let orchestrator = BatchOrchestrator::new();
    let items = vec![
        png_item("first.png"),
        WorkItem::new(b"this is not a png".to_vec(), "broken.png", "image/png").unwrap(),
        png_item("third.png"),
    ];
    let outcome = orchestrator
        .run(
            items,
            directive(ConversionKind::RasterToRaster {
                target: RasterFormat::Png,
            }),
        )
        .await
        .unwrap();

    let statuses: Vec<ItemStatus> = outcome.items.iter().map(|it| it.status).collect();
    assert_eq!(
        statuses,
        [ItemStatus::Completed, ItemStatus::Failed, ItemStatus::Completed]
    );
    assert!(outcome.items[1].error.is_some());
    assert!(outcome.items[1].output.is_none());
    assert_eq!(outcome.state.overall_progress_percent, 100);
}

#[tokio::test]
async fn image_to_pdf_emits_one_document_per_item() {
    let orchestrator = BatchOrchestrator::new();
    let items = vec![png_item("scan.png")];
    let outcome = orchestrator
        .run(items, directive(ConversionKind::RasterToPdf))
        .await
        .unwrap();

    let item = &outcome.items[0];
    assert_eq!(item.output_name.as_deref(), Some("scan.pdf"));
    assert!(item.output.as_ref().unwrap().starts_with(b"%PDF-"));
}

fn count_occurrences(haystack: &[u8], needle: &[u8]) -> usize {
    haystack.windows(needle.len()).filter(|w| w == &needle).count()
}

#[tokio::test]
async fn merged_batch_yields_one_combined_document_in_name_order() {
    let orchestrator = BatchOrchestrator::new();
    let items = vec![png_item("b.png"), png_item("a.png"), png_item("c.png")];
    let layout = PdfLayout::new(PageSize::A4, Orientation::Portrait, 10);
    let outcome = orchestrator
        .run(
            items,
            directive(ConversionKind::RasterToPdfMerged { layout }),
        )
        .await
        .unwrap();

    assert_eq!(outcome.items.len(), 1);
    let combined = &outcome.items[0];
    assert_eq!(combined.status, ItemStatus::Completed);
    assert_eq!(combined.output_name.as_deref(), Some("combined.pdf"));

    let pdf = combined.output.as_ref().unwrap();
    let pages = count_occurrences(pdf, b"/Type /Page") - count_occurrences(pdf, b"/Type /Pages");
    assert_eq!(pages, 3);

    let pos = |needle: &[u8]| {
        pdf.windows(needle.len())
            .position(|w| w == needle)
            .expect("caption missing")
    };
    assert!(pos(b"(a.png)") < pos(b"(b.png)"));
    assert!(pos(b"(b.png)") < pos(b"(c.png)"));
}

#[tokio::test]
async fn merge_failure_marks_every_item_failed() {
    let orchestrator = BatchOrchestrator::new();
    let items = vec![
        png_item("good.png"),
        WorkItem::new(b"junk".to_vec(), "junk.png", "image/png").unwrap(),
    ];
    let outcome = orchestrator
        .run(
            items,
            directive(ConversionKind::RasterToPdfMerged {
                layout: PdfLayout::default(),
            }),
        )
        .await
        .unwrap();

    assert_eq!(outcome.items.len(), 2);
    for item in &outcome.items {
        assert_eq!(item.status, ItemStatus::Failed);
        assert_eq!(item.error.as_deref(), Some("Failed to combine PDF"));
        assert!(item.output.is_none());
    }
}

#[tokio::test]
async fn pre_cancelled_token_skips_every_item() {
    let orchestrator = BatchOrchestrator::new();
    let cancel = CancelToken::new();
    cancel.cancel();
    let items = vec![png_item("a.png"), png_item("b.png")];
    let outcome = orchestrator
        .run_with(
            items,
            directive(ConversionKind::OptimizeRaster),
            cancel,
            None,
        )
        .await
        .unwrap();

    for item in &outcome.items {
        assert_eq!(item.status, ItemStatus::Cancelled);
        assert!(item.output.is_none());
    }
}

#[tokio::test]
async fn mid_run_cancellation_keeps_finished_items_intact() {
    struct CancelAfterFirst {
        token: CancelToken,
    }

    impl BatchProgressCallback for CancelAfterFirst {
        fn on_item_complete(&self, _index: usize, _total: usize, _output_size: u64) {
            self.token.cancel();
        }
    }

    let orchestrator = BatchOrchestrator::new();
    let cancel = CancelToken::new();
    let callback = Arc::new(CancelAfterFirst {
        token: cancel.clone(),
    });
    let items = vec![png_item("a.png"), png_item("b.png"), png_item("c.png")];
    let outcome = orchestrator
        .run_with(
            items,
            directive(ConversionKind::RasterToRaster {
                target: RasterFormat::Jpeg,
            }),
            cancel,
            Some(callback),
        )
        .await
        .unwrap();

    let statuses: Vec<ItemStatus> = outcome.items.iter().map(|it| it.status).collect();
    assert_eq!(
        statuses,
        [ItemStatus::Completed, ItemStatus::Cancelled, ItemStatus::Cancelled]
    );
    let first = &outcome.items[0];
    assert_eq!(first.output_name.as_deref(), Some("a.jpg"));
    assert!(first.output.is_some());
    for skipped in &outcome.items[1..] {
        assert!(skipped.output.is_none());
        assert!(skipped.error.is_none());
    }
}

#[tokio::test]
async fn concurrent_run_is_rejected_as_busy() {
    let orchestrator = Arc::new(BatchOrchestrator::new());

    // Enough items to keep the first run in flight while we poke it again.
    let items: Vec<WorkItem> = (0..32).map(|i| png_item(&format!("img{i}.png"))).collect();
    let first = {
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move {
            orchestrator
                .run(
                    items,
                    directive(ConversionKind::RasterToRaster {
                        target: RasterFormat::Jpeg,
                    }),
                )
                .await
        })
    };

    // Retry until the first run is observed in flight or has finished.
    let mut saw_busy = false;
    for _ in 0..1000 {
        match orchestrator
            .run(vec![png_item("late.png")], directive(ConversionKind::OptimizeRaster))
            .await
        {
            Err(EngineError::BatchBusy) => {
                saw_busy = true;
                break;
            }
            Ok(_) => {
                if first.is_finished() {
                    break;
                }
            }
            Err(other) => panic!("unexpected error: {other}"),
        }
        tokio::task::yield_now().await;
    }

    let outcome = first.await.unwrap().unwrap();
    assert_eq!(outcome.items.len(), 32);
    // Either we caught the busy window or the first run was already done.
    assert!(saw_busy || outcome.state.overall_progress_percent == 100);
}

#[tokio::test]
async fn event_stream_reports_each_item_and_the_outcome() {
    let orchestrator = Arc::new(BatchOrchestrator::new());
    let items = vec![
        png_item("ok.png"),
        WorkItem::new(b"junk".to_vec(), "bad.png", "image/png").unwrap(),
    ];
    let mut stream = orchestrator.run_stream(
        items,
        directive(ConversionKind::RasterToRaster {
            target: RasterFormat::Png,
        }),
        CancelToken::new(),
    );

    let mut started = 0;
    let mut finished_items = Vec::new();
    let mut percents = Vec::new();
    let mut outcome = None;
    while let Some(event) = stream.next().await {
        match event {
            BatchEvent::Started { total } => assert_eq!(total, 2),
            BatchEvent::ItemStarted { index, state, .. } => {
                assert!(state.running);
                assert_eq!(state.current_index, Some(index));
                assert_eq!(state.total_items, 2);
                started += 1;
            }
            BatchEvent::ItemFinished {
                index,
                status,
                overall_progress_percent,
                ..
            } => {
                finished_items.push((index, status));
                percents.push(overall_progress_percent);
            }
            BatchEvent::Finished(out) => outcome = Some(out),
        }
    }

    assert_eq!(started, 2);
    assert_eq!(percents, [50, 100]);
    assert_eq!(
        finished_items,
        [(0, ItemStatus::Completed), (1, ItemStatus::Failed)]
    );
    let outcome = outcome.expect("final event carries the outcome");
    assert_eq!(outcome.succeeded(), 1);
    assert_eq!(outcome.failed(), 1);
}

#[tokio::test]
async fn late_stream_consumer_still_sees_every_event() {
    let orchestrator = Arc::new(BatchOrchestrator::new());
    let total = 40;
    let items: Vec<WorkItem> = (0..total).map(|i| png_item(&format!("i{i}.png"))).collect();
    let mut stream = orchestrator.run_stream(
        items,
        directive(ConversionKind::RasterToRaster {
            target: RasterFormat::Jpeg,
        }),
        CancelToken::new(),
    );

    // Let the whole run finish before the first poll.
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;

    let mut finished = 0;
    let mut saw_outcome = false;
    while let Some(event) = stream.next().await {
        match event {
            BatchEvent::ItemFinished { .. } => finished += 1,
            BatchEvent::Finished(outcome) => {
                saw_outcome = true;
                assert_eq!(outcome.items.len(), total);
            }
            _ => {}
        }
    }
    assert_eq!(finished, total);
    assert!(saw_outcome);
}

#[tokio::test]
async fn optimize_keeps_input_names() {
    let orchestrator = BatchOrchestrator::new();
    let items = vec![png_item("keepme.png")];
    let outcome = orchestrator
        .run(items, directive(ConversionKind::OptimizeRaster))
        .await
        .unwrap();
    assert_eq!(outcome.items[0].output_name.as_deref(), Some("keepme.png"));
}

#[tokio::test]
async fn raster_items_carry_data_uri_previews() {
    let orchestrator = BatchOrchestrator::new();
    let items = vec![png_item("a.png")];
    let outcome = orchestrator
        .run(items, directive(ConversionKind::OptimizeRaster))
        .await
        .unwrap();
    let preview = outcome.items[0].preview.as_deref().unwrap();
    assert!(preview.starts_with("data:image/png;base64,"));
}

#[test]
fn size_and_ratio_helpers_match_documented_values() {
    assert_eq!(fileease::format_file_size(0), "0 Bytes");
    assert_eq!(fileease::format_file_size(1536), "1.5 KB");
    assert_eq!(fileease::compression_ratio(1000, 500), 50);
    assert_eq!(fileease::compression_ratio(1000, 1000), 0);
}
