use clap::{Parser, ValueEnum};
use image::{ImageReader, Rgba32FImage};
use log::{info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use cellscan::detection::steps::*;
use cellscan::logging::setup_logging;
use cellscan::models::{Label, Region};
use cellscan::orchestrator::{StageOutput, SuppressionOrchestrator};
use cellscan::{overlay, raster};
use cellscan::{Adjustments, Filter, Pipeline, SliderSettings, ThresholdConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Union-find detection of white and red cells
    Union,
    /// Marker classification, then delayed adjacency suppression
    Tricolour,
    Grayscale,
    Bw,
    Sepia,
}

#[derive(Parser)]
#[command(name = "cellscan")]
#[command(about = "Locate white and red blood cells in stained microscopy images")]
struct Cli {
    /// Path to input image file
    #[arg(value_name = "IMAGE")]
    image_path: PathBuf,

    /// Processing mode
    #[arg(long, value_enum, default_value_t = Mode::Union)]
    mode: Mode,

    /// JSON file with slider settings
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// White-cell sensitivity, 0..100
    #[arg(long, value_name = "N")]
    white_threshold: Option<f64>,

    /// Red-cell sensitivity, 0..100
    #[arg(long, value_name = "N")]
    red_threshold: Option<f64>,

    /// Minimum cell size slider, 0..100
    #[arg(long, value_name = "N")]
    min_size: Option<f64>,

    /// Maximum cell size slider, 0..100
    #[arg(long, value_name = "N")]
    max_size: Option<f64>,

    /// Brightness, -100..100
    #[arg(long, value_name = "N", allow_hyphen_values = true)]
    brightness: Option<f64>,

    /// Red channel gain, -100..100
    #[arg(long, value_name = "N", allow_hyphen_values = true)]
    red: Option<f64>,

    /// Green channel gain, -100..100
    #[arg(long, value_name = "N", allow_hyphen_values = true)]
    green: Option<f64>,

    /// Blue channel gain, -100..100
    #[arg(long, value_name = "N", allow_hyphen_values = true)]
    blue: Option<f64>,

    /// Save the processed image here
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Save debug outputs to directory (must be empty)
    #[arg(long, value_name = "DIR")]
    debug_out: Option<PathBuf>,

    /// Delay before the suppression stage in tricolour mode
    #[arg(long, value_name = "MS", default_value_t = 2000)]
    stage_delay_ms: u64,

    /// Directory for log files
    #[arg(long, value_name = "DIR", default_value = "logs")]
    log_dir: PathBuf,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn settings(&self) -> anyhow::Result<SliderSettings> {
        let mut settings = match &self.config {
            Some(path) => SliderSettings::from_json_file(path)?,
            None => SliderSettings::default(),
        };
        if let Some(v) = self.white_threshold {
            settings.white_cell_threshold = v;
        }
        if let Some(v) = self.red_threshold {
            settings.red_cell_threshold = v;
        }
        if let Some(v) = self.min_size {
            settings.min_cell_size = v;
        }
        if let Some(v) = self.max_size {
            settings.max_cell_size = v;
        }
        if let Some(v) = self.brightness {
            settings.brightness = v;
        }
        if let Some(v) = self.red {
            settings.red = v;
        }
        if let Some(v) = self.green {
            settings.green = v;
        }
        if let Some(v) = self.blue {
            settings.blue = v;
        }
        Ok(settings)
    }
}

fn print_regions(regions: &[Region], verbose: bool) {
    for label in Label::CELLS {
        let count = regions.iter().filter(|r| r.label == label).count();
        println!("{}: {}", label, count);
    }
    if verbose {
        for r in regions {
            println!(
                "  {} #{} at ({}, {}) {}x{} - {} px",
                r.label, r.sequence, r.rect.min_x, r.rect.min_y, r.rect.width, r.rect.height,
                r.pixel_count
            );
        }
    }
}

fn save_image(image: &Rgba32FImage, regions: &[Region], path: &Path) -> anyhow::Result<()> {
    let mut img = raster::to_rgba8(image);
    overlay::draw_regions(&mut img, regions);
    img.save(path)
        .map_err(|e| anyhow::anyhow!("Failed to save {}: {}", path.display(), e))?;
    info!("Saved {}", path.display());
    Ok(())
}

/// `out.png` -> `out_stage1.png`
fn stage_path(path: &Path, suffix: &str) -> PathBuf {
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("output");
    let name = match path.extension().and_then(|s| s.to_str()) {
        Some(ext) => format!("{}_{}.{}", stem, suffix, ext),
        None => format!("{}_{}", stem, suffix),
    };
    path.with_file_name(name)
}

fn run_pipeline(
    args: &Cli,
    working: Rgba32FImage,
    thresholds: ThresholdConfig,
    adjustments: Adjustments,
) -> anyhow::Result<()> {
    let mut pipeline = Pipeline::new(thresholds, adjustments);
    let detection = Arc::new(CellDetectionStep::new());
    pipeline = match args.mode {
        Mode::Union => pipeline.add_step(detection.clone()),
        Mode::Grayscale => pipeline.add_step_boxed(Box::new(FilterStep { filter: Filter::Grayscale })),
        Mode::Bw => pipeline.add_step_boxed(Box::new(FilterStep { filter: Filter::BlackAndWhite })),
        Mode::Sepia => pipeline.add_step_boxed(Box::new(FilterStep { filter: Filter::Sepia })),
        Mode::Tricolour => pipeline
            .add_step_boxed(Box::new(MarkerClassificationStep))
            .add_step_boxed(Box::new(SuppressionStep)),
    };

    // Enable debug mode if requested
    if let Some(debug_dir) = &args.debug_out {
        pipeline = pipeline.with_debug(debug_dir.clone())?;
    }

    let data = pipeline.run(working)?;

    match args.mode {
        Mode::Union => {
            println!("\n=== Cell Detection Results ===");
            print_regions(&data.regions, args.verbose);
            if let Ok(metrics) = detection.metrics.lock() {
                metrics.log_averages();
            }
        }
        Mode::Tricolour => {
            println!("\n=== Adjacency Suppression Results ===");
            if let Some(removed) = data.get_int("red_removed") {
                println!("Red pixels removed: {}", removed);
            }
            print_regions(&data.regions, args.verbose);
        }
        _ => {}
    }

    if let Some(path) = &args.output {
        save_image(&data.image, &data.regions, path)?;
    }
    Ok(())
}

async fn run_tricolour(
    args: &Cli,
    working: Rgba32FImage,
    thresholds: ThresholdConfig,
    adjustments: Adjustments,
) -> anyhow::Result<()> {
    let mut orchestrator = SuppressionOrchestrator::new(thresholds, adjustments)
        .with_delay(Duration::from_millis(args.stage_delay_ms));
    let mut request = orchestrator.submit(&working)?;
    info!("Submitted request {}", request.id());

    while let Some(delivery) = request.next().await {
        match delivery? {
            StageOutput::Classified(markers) => {
                println!("\n=== Stage 1: marker classification ===");
                println!("Suppression scheduled in {} ms", args.stage_delay_ms);
                if let Some(path) = &args.output {
                    save_image(&markers, &[], &stage_path(path, "stage1"))?;
                }
            }
            StageOutput::Suppressed(out) => {
                println!("\n=== Stage 2: adjacency suppression ===");
                println!("Red pixels removed: {}", out.stats.red_removed());
                print_regions(&out.regions, args.verbose);
                if let Some(path) = &args.output {
                    save_image(&out.raster, &out.regions, path)?;
                }
            }
        }
    }

    info!("Request {} finished: {:?}", request.id(), request.state());
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();
    let level = if args.verbose { "debug" } else { "info" };
    let _logger = setup_logging(level, &args.log_dir)?;

    let (thresholds, adjustments) = args.settings()?.validate()?;

    info!("Loading image: {:?}", args.image_path);
    let img = ImageReader::open(&args.image_path)?
        .decode()
        .map_err(|e| anyhow::anyhow!("Failed to decode image: {}", e))?;
    info!("Image loaded: {}x{}", img.width(), img.height());

    let working = raster::to_working_raster(&img);

    match (args.mode, &args.debug_out) {
        // Step-by-step dump of the same two stages, without the delay
        (Mode::Tricolour, Some(_)) => {
            warn!("--debug-out runs tricolour stages back to back");
            run_pipeline(&args, working, thresholds, adjustments)
        }
        (Mode::Tricolour, None) => run_tricolour(&args, working, thresholds, adjustments).await,
        _ => run_pipeline(&args, working, thresholds, adjustments),
    }
}
