use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use cfucount::annotate::mask::DEFAULT_MASK_OPACITY;
use cfucount::inference::{self, DEFAULT_ENDPOINT};
use cfucount::samples::DEFAULT_SAMPLE_BASE;
use cfucount::{
    CountVerdict, DetectionSet, Detector, FixedDetector, HttpDetector, LabelFont, Pipeline,
    SampleCounts, SampleLibrary, Session, SplitRatio, View,
};

#[derive(Parser)]
#[command(name = "cfucount")]
#[command(about = "Count colony-forming units on Petri dish pictures and render the predictions")]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Base URL of the inference endpoint
    #[arg(long, env = "CFUCOUNT_ENDPOINT", default_value = DEFAULT_ENDPOINT, global = true)]
    endpoint: String,

    /// HTTP timeout in seconds
    #[arg(long, value_name = "SECS", default_value_t = 30, global = true)]
    timeout: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Analyze one picture and write the rendered result
    Analyze(AnalyzeArgs),
    /// Check that the inference endpoint answers
    Health,
    /// List the pictures of the sample library
    Samples {
        #[arg(long, env = "CFUCOUNT_SAMPLE_BASE", default_value = DEFAULT_SAMPLE_BASE)]
        sample_base: String,
    },
}

#[derive(Args)]
struct AnalyzeArgs {
    /// Path to input image file
    #[arg(value_name = "IMAGE", required_unless_present = "sample", conflicts_with = "sample")]
    image_path: Option<PathBuf>,

    /// Analyze a picture from the sample library instead of a local file
    #[arg(long, value_name = "NAME")]
    sample: Option<String>,

    /// Base URL of the sample library
    #[arg(long, env = "CFUCOUNT_SAMPLE_BASE", default_value = DEFAULT_SAMPLE_BASE)]
    sample_base: String,

    /// Read detections from a JSON file instead of calling the endpoint
    #[arg(long, value_name = "FILE")]
    detections: Option<PathBuf>,

    /// Draw confidence labels next to each box
    #[arg(long)]
    show_confidence: bool,

    /// Render the shutter view split at this percentage (0-100)
    #[arg(long, value_name = "PERCENT", allow_hyphen_values = true)]
    shutter: Option<i32>,

    /// Opacity of the white mask on the shutter's left pane
    #[arg(long, value_name = "OPACITY", default_value_t = DEFAULT_MASK_OPACITY)]
    mask_opacity: f32,

    /// TrueType/OpenType font for labels
    #[arg(long, env = "CFUCOUNT_FONT", value_name = "FILE")]
    font: Option<PathBuf>,

    /// Ground-truth counts (`image_name;result` CSV) for known samples
    #[arg(long, env = "CFUCOUNT_SAMPLES", value_name = "FILE")]
    samples: Option<PathBuf>,

    /// Output image path (defaults to <name>_annotated.png)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Save every stage image to directory (must be empty)
    #[arg(long, value_name = "DIR")]
    debug_out: Option<PathBuf>,

    /// Print the detections as JSON
    #[arg(long)]
    json: bool,
}

fn init_tracing(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("cfucount={}", level)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let timeout = Duration::from_secs(cli.timeout);

    match cli.command {
        Command::Health => {
            let detector = HttpDetector::new(&cli.endpoint, timeout)?;
            let message = detector
                .health()
                .await
                .with_context(|| format!("Inference endpoint {} is not reachable", cli.endpoint))?;
            println!("{}", message);
        }
        Command::Samples { sample_base } => {
            let library = SampleLibrary::new(sample_base, timeout)?;
            for name in library.names() {
                println!("{}  {}", name, library.url_for(name));
            }
        }
        Command::Analyze(args) => match &args.detections {
            Some(path) => {
                let detector = FixedDetector(read_detections(path)?);
                analyze(&args, &detector, timeout).await?;
            }
            None => {
                let detector = HttpDetector::new(&cli.endpoint, timeout)?;
                analyze(&args, &detector, timeout).await?;
            }
        },
    }

    Ok(())
}

/// Accepts either the endpoint's response envelope or a bare record array
fn read_detections(path: &Path) -> anyhow::Result<DetectionSet> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read detections from {}", path.display()))?;
    let detections = if json.trim_start().starts_with('[') {
        inference::parse_detections(&json)?
    } else {
        inference::parse_predictions(&json)?
    };
    Ok(detections)
}

async fn analyze<D: Detector>(args: &AnalyzeArgs, detector: &D, timeout: Duration) -> anyhow::Result<()> {
    // Validate before doing any work
    let view = match args.shutter {
        Some(percent) => View::Shutter(SplitRatio::new(percent)?),
        None => View::Annotated,
    };

    let (image_name, raw) = match (&args.image_path, &args.sample) {
        (Some(path), _) => {
            let raw = std::fs::read(path)
                .with_context(|| format!("Failed to read image {}", path.display()))?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "image".to_string());
            (name, raw)
        }
        (None, Some(name)) => {
            let library = SampleLibrary::new(&args.sample_base, timeout)?;
            let raw = library
                .fetch(name)
                .await
                .context("Failed to load the image from the sample library")?;
            (name.clone(), raw)
        }
        (None, None) => anyhow::bail!("Either an image path or --sample is required"),
    };

    let font = LabelFont::load(args.font.as_deref())?;
    let mut pipeline = Pipeline::new(font)
        .with_mask_opacity(args.mask_opacity)
        .with_show_confidence(args.show_confidence);
    if let Some(debug_dir) = &args.debug_out {
        pipeline = pipeline.with_debug(debug_dir.clone())?;
    }

    let mut session = Session::new();
    let analysis = session.analyze(&image_name, &raw, detector, &pipeline).await?;
    let predicted = analysis.detections.len();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&analysis.detections)?);
    }

    let rendered = session.render(&pipeline, view)?;
    let output = args.output.clone().unwrap_or_else(|| default_output(&image_name));
    let rendered = if is_jpeg_path(&output) {
        // JPEG carries no alpha channel
        image::DynamicImage::ImageRgb8(rendered.to_rgb8())
    } else {
        rendered
    };
    rendered
        .save(&output)
        .with_context(|| format!("Failed to save {}", output.display()))?;

    println!("\n=== CFU Count ===");
    println!("Predicted number of CFU: {}", predicted);

    if let Some(samples_path) = &args.samples {
        let counts = SampleCounts::from_path(samples_path)
            .with_context(|| format!("Failed to read sample counts {}", samples_path.display()))?;
        if let Some(real) = counts.lookup(&image_name) {
            println!("Real number of CFU: {}", real);
            println!("{}", CountVerdict::compare(predicted, real).message());
        }
    }

    println!("Saved {}", output.display());
    Ok(())
}

fn default_output(image_name: &str) -> PathBuf {
    let stem = Path::new(image_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("image");
    PathBuf::from(format!("{}_annotated.png", stem))
}

fn is_jpeg_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("jpg") || e.eq_ignore_ascii_case("jpeg"))
}
