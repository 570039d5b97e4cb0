//! panostitch CLI — stitch panoramas from a JSON project description.

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

use panostitch::{
    BlendMode, CanvasOptions, ImageListSource, Interpolation, NeverCancel, ProgressSink,
    RemapConfig, SeamConfig, SourceImageGeometry, Stitcher,
};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "panostitch")]
#[command(about = "Remap, photometrically correct and blend source images into a panorama")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Stitch the images of a project into the output canvas.
    Stitch(CliStitchArgs),

    /// Print a summary of a project file without stitching.
    ProjectInfo {
        /// Path to the project description (JSON).
        #[arg(long)]
        project: PathBuf,
    },
}

#[derive(Debug, Clone, Args)]
struct CliStitchArgs {
    /// Path to the project description (JSON).
    #[arg(long)]
    project: PathBuf,

    /// Path to write the stitched panorama (format from extension).
    #[arg(long)]
    out: PathBuf,

    /// Stitch only these image indices (default: all).
    #[arg(long, value_delimiter = ',')]
    images: Option<Vec<usize>>,

    /// Width of the weight feathering ramp in source pixels.
    #[arg(long, default_value = "16.0")]
    feather_px: f64,

    /// Source sampling kernel.
    #[arg(long, value_enum, default_value_t = InterpolationArg::Bilinear)]
    interpolation: InterpolationArg,

    /// Override the project's blend mode.
    #[arg(long, value_enum)]
    blend: Option<BlendModeArg>,

    /// Seam blending pyramid depth (only with --blend seam).
    #[arg(long)]
    seam_levels: Option<u32>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum InterpolationArg {
    Nearest,
    Bilinear,
}

impl InterpolationArg {
    fn to_core(self) -> Interpolation {
        match self {
            Self::Nearest => Interpolation::Nearest,
            Self::Bilinear => Interpolation::Bilinear,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum BlendModeArg {
    Stacking,
    Seam,
    Difference,
}

impl BlendModeArg {
    fn to_core(self, seam_levels: Option<u32>) -> BlendMode {
        match self {
            Self::Stacking => BlendMode::Stacking,
            Self::Seam => BlendMode::Seam(SeamConfig {
                levels: seam_levels.unwrap_or(SeamConfig::default().levels),
            }),
            Self::Difference => BlendMode::Difference,
        }
    }
}

/// One project image: where to load pixels from plus its geometry and
/// photometric description.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ProjectImage {
    /// Image file path, relative to the project file.
    file: PathBuf,
    #[serde(flatten)]
    geometry: SourceImageGeometry,
}

/// On-disk project description.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Project {
    canvas: CanvasOptions,
    images: Vec<ProjectImage>,
}

fn load_project(path: &Path) -> CliResult<Project> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| -> CliError { format!("failed to read {}: {}", path.display(), e).into() })?;
    let project: Project = serde_json::from_str(&text)
        .map_err(|e| -> CliError { format!("invalid project {}: {}", path.display(), e).into() })?;
    Ok(project)
}

fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Stitch(args) => run_stitch(&args),
        Commands::ProjectInfo { project } => run_project_info(&project),
    }
}

// ── project-info ───────────────────────────────────────────────────────

fn run_project_info(path: &Path) -> CliResult<()> {
    let project = load_project(path)?;

    println!("panostitch project: {}", path.display());
    println!(
        "  canvas:      {}x{} {:?}, hfov {} deg",
        project.canvas.width, project.canvas.height, project.canvas.projection,
        project.canvas.hfov_deg
    );
    println!("  blend:       {:?}", project.canvas.blend);
    println!("  images:      {}", project.images.len());

    for (i, img) in project.images.iter().enumerate() {
        let g = &img.geometry;
        println!(
            "  [{i}] {}: {}x{} {:?}, hfov {} deg, yaw {} pitch {} roll {}",
            img.file.display(),
            g.width,
            g.height,
            g.projection,
            g.hfov_deg,
            g.orientation.yaw_deg,
            g.orientation.pitch_deg,
            g.orientation.roll_deg,
        );
    }

    Ok(())
}

// ── stitch ─────────────────────────────────────────────────────────────

struct LogProgress;

impl ProgressSink for LogProgress {
    fn on_progress(&self, fraction: f64, image_index: usize) {
        tracing::info!(
            "progress {:>3.0}% (image {})",
            fraction * 100.0,
            image_index
        );
    }
}

fn run_stitch(args: &CliStitchArgs) -> CliResult<()> {
    let mut project = load_project(&args.project)?;
    let base = args.project.parent().unwrap_or_else(|| Path::new("."));

    if let Some(mode) = args.blend {
        project.canvas.blend = mode.to_core(args.seam_levels);
    } else if let (Some(levels), BlendMode::Seam(config)) =
        (args.seam_levels, &mut project.canvas.blend)
    {
        config.levels = levels;
    }

    let used: Vec<usize> = match &args.images {
        Some(list) => list.clone(),
        None => (0..project.images.len()).collect(),
    };

    let mut frames = Vec::with_capacity(project.images.len());
    for img in &project.images {
        let path = base.join(&img.file);
        tracing::info!("loading {}", path.display());
        let frame = image::open(&path).map_err(|e| -> CliError {
            format!("failed to open image {}: {}", path.display(), e).into()
        })?;
        frames.push(frame);
    }

    let geometries: Vec<SourceImageGeometry> =
        project.images.iter().map(|i| i.geometry.clone()).collect();
    let source = ImageListSource::with_geometries(frames, &geometries)?;

    let remap = RemapConfig {
        feather_px: args.feather_px,
        interpolation: args.interpolation.to_core(),
    };
    let stitcher = Stitcher::new(project.canvas, remap)?;
    let canvas = stitcher.stitch(&geometries, &used, &source, &LogProgress, &NeverCancel)?;

    canvas.to_dynamic().save(&args.out).map_err(|e| -> CliError {
        format!("failed to write {}: {}", args.out.display(), e).into()
    })?;
    tracing::info!("panorama written to {}", args.out.display());

    Ok(())
}
