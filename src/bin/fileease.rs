//! Command-line front end for the fileease conversion engine.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use fileease::{
    files, BatchOrchestrator, BatchProgressCallback, CancelToken, ConversionDirective,
    ConversionKind, ItemStatus, Orientation, PageSize, PdfLayout, ProgressCallback, RasterFormat,
    WorkItem,
};

const AFTER_HELP: &str = "\
EXAMPLES:
    # Convert PNGs to JPEG at 80% quality
    fileease --convert png-to-jpeg --quality 0.8 photos/*.png

    # Combine images into one captioned PDF
    fileease --convert merge-pdf --page-size a4 --margin 15 scans/*.jpg

    # Extract PDF pages as PNGs (multi-page PDFs produce a zip)
    fileease --convert pdf-to-png report.pdf

    # Extract PDF text into a Word document
    fileease --convert pdf-to-word report.pdf

PDF input requires the pdfium shared library; set PDFIUM_LIB_PATH or place
it next to the executable.";

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ConvertArg {
    /// JPEG to PNG
    JpegToPng,
    /// PNG to JPEG
    PngToJpeg,
    /// Each image onto its own single-page PDF
    ImageToPdf,
    /// All images combined into one captioned PDF
    MergePdf,
    /// Re-encode images in place to shrink them
    Optimize,
    /// PDF pages to JPEG images
    PdfToJpeg,
    /// PDF pages to PNG images
    PdfToPng,
    /// PDF text to a Word-compatible document
    PdfToWord,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PageSizeArg {
    A4,
    Letter,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OrientationArg {
    Portrait,
    Landscape,
}

#[derive(Parser, Debug)]
#[command(
    name = "fileease",
    version,
    about = "Batch convert images and PDFs",
    after_help = AFTER_HELP
)]
struct Cli {
    /// Input files (JPEG, PNG, or PDF)
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Conversion to apply to every input
    #[arg(short, long, value_enum)]
    convert: ConvertArg,

    /// Encode quality for JPEG output, 0.1 to 1.0
    #[arg(short, long, default_value_t = 0.9)]
    quality: f32,

    /// Page size for merged PDF output
    #[arg(long, value_enum, default_value_t = PageSizeArg::A4)]
    page_size: PageSizeArg,

    /// Page orientation for merged PDF output
    #[arg(long, value_enum, default_value_t = OrientationArg::Portrait)]
    orientation: OrientationArg,

    /// Page margin in millimetres for merged PDF output, 0 to 50
    #[arg(long, default_value_t = 10)]
    margin: u32,

    /// Directory for output files (defaults to the current directory)
    #[arg(short, long, env = "FILEEASE_OUT_DIR", default_value = ".")]
    out_dir: PathBuf,

    /// Print the outcome as JSON instead of a summary
    #[arg(long)]
    json: bool,

    /// Disable the progress bar
    #[arg(long)]
    no_progress: bool,

    /// Suppress everything except errors
    #[arg(long, conflicts_with = "verbose")]
    quiet: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn directive(&self) -> ConversionDirective {
        let kind = match self.convert {
            ConvertArg::JpegToPng => ConversionKind::RasterToRaster {
                target: RasterFormat::Png,
            },
            ConvertArg::PngToJpeg => ConversionKind::RasterToRaster {
                target: RasterFormat::Jpeg,
            },
            ConvertArg::ImageToPdf => ConversionKind::RasterToPdf,
            ConvertArg::MergePdf => ConversionKind::RasterToPdfMerged {
                layout: PdfLayout::new(
                    match self.page_size {
                        PageSizeArg::A4 => PageSize::A4,
                        PageSizeArg::Letter => PageSize::Letter,
                    },
                    match self.orientation {
                        OrientationArg::Portrait => Orientation::Portrait,
                        OrientationArg::Landscape => Orientation::Landscape,
                    },
                    self.margin,
                ),
            },
            ConvertArg::Optimize => ConversionKind::OptimizeRaster,
            ConvertArg::PdfToJpeg => ConversionKind::PdfToRaster {
                target: RasterFormat::Jpeg,
            },
            ConvertArg::PdfToPng => ConversionKind::PdfToRaster {
                target: RasterFormat::Png,
            },
            ConvertArg::PdfToWord => ConversionKind::PdfToTextDocument,
        };
        ConversionDirective::with_quality(kind, self.quality)
    }
}

struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    fn new(total: usize) -> Self {
        let bar = ProgressBar::new(total as u64);
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        CliProgress { bar }
    }
}

impl BatchProgressCallback for CliProgress {
    fn on_item_start(&self, index: usize, _total: usize) {
        self.bar.set_message(format!("item {}", index + 1));
    }

    fn on_item_complete(&self, _index: usize, _total: usize, output_size: u64) {
        self.bar
            .set_message(files::format_file_size(output_size));
        self.bar.inc(1);
    }

    fn on_item_error(&self, _index: usize, _total: usize, error: String) {
        self.bar.set_message(format!("failed: {error}"));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, _total: usize, _succeeded: usize) {
        self.bar.finish_and_clear();
    }
}

fn load_items(paths: &[PathBuf]) -> Result<Vec<WorkItem>> {
    let mut items = Vec::with_capacity(paths.len());
    for path in paths {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .with_context(|| format!("invalid file name: {}", path.display()))?
            .to_string();
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        let mime = files::mime_for_extension(ext)
            .with_context(|| format!("unsupported file extension: {}", path.display()))?;
        let data =
            std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        items.push(WorkItem::new(data, name, mime)?);
    }
    Ok(items)
}

fn write_outputs(items: &[WorkItem], out_dir: &Path, quiet: bool) -> Result<usize> {
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("creating {}", out_dir.display()))?;
    let mut written = 0;
    for item in items {
        let (Some(output), Some(name)) = (&item.output, &item.output_name) else {
            continue;
        };
        let path = out_dir.join(name);
        std::fs::write(&path, output).with_context(|| format!("writing {}", path.display()))?;
        written += 1;
        if !quiet {
            println!(
                "  \x1b[32m✓\x1b[0m {} ({})",
                path.display(),
                files::format_file_size(output.len() as u64)
            );
        }
    }
    Ok(written)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("fileease=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("fileease=warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let items = load_items(&cli.inputs)?;
    let total = items.len();
    let directive = cli.directive();

    let callback: Option<ProgressCallback> = if cli.no_progress || cli.quiet || cli.json {
        None
    } else {
        Some(Arc::new(CliProgress::new(total)))
    };

    let orchestrator = BatchOrchestrator::new();
    let outcome = orchestrator
        .run_with(items, directive, CancelToken::new(), callback)
        .await?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    }

    let written = write_outputs(&outcome.items, &cli.out_dir, cli.quiet || cli.json)?;

    let failed: Vec<&WorkItem> = outcome
        .items
        .iter()
        .filter(|it| it.status == ItemStatus::Failed)
        .collect();
    if !cli.quiet && !cli.json {
        println!(
            "\n{written} of {total} converted, {} failed",
            failed.len()
        );
    }
    for item in &failed {
        eprintln!(
            "  \x1b[31m✗\x1b[0m {}: {}",
            item.input_name,
            item.error.as_deref().unwrap_or("unknown error")
        );
    }

    if !failed.is_empty() && written == 0 {
        bail!("all conversions failed");
    }
    Ok(())
}
