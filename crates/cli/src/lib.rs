use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pdf_annotator_core::{AnnotationSnapshot, EngineConfig, StampCatalog};
use pdf_annotator_render::PageCompositor;
use serde::Serialize;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Parser)]
#[command(name = "pdf-annotator")]
#[command(about = "PDF annotation compositor")]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Flatten a page's annotations over its rendered image.
    Compose {
        /// Rendered page image (PNG)
        #[arg(long, value_name = "FILE")]
        base: PathBuf,
        /// Saved annotation snapshot (JSON)
        #[arg(long, value_name = "FILE")]
        annotations: PathBuf,
        #[arg(long, default_value_t = 1)]
        page: u32,
        /// Stamp catalog (JSON array of stamp definitions)
        #[arg(long, value_name = "FILE")]
        stamps: Option<PathBuf>,
        /// Engine configuration (JSON)
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Print per-page annotation counts as JSON.
    Inspect {
        #[arg(long, value_name = "FILE")]
        annotations: PathBuf,
    },
    /// Print CLI version.
    Version,
}

#[derive(Debug, Serialize)]
struct InspectOutput {
    path: String,
    pages: Vec<PageSummary>,
    total_paths: usize,
    total_shapes: usize,
}

#[derive(Debug, Serialize)]
struct PageSummary {
    page: u32,
    paths: usize,
    shapes: usize,
}

pub fn run<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);

    match cli.command {
        Commands::Compose { base, annotations, page, stamps, config, output } => run_compose(
            &base,
            &annotations,
            page,
            stamps.as_deref(),
            config.as_deref(),
            output.as_deref(),
        ),
        Commands::Inspect { annotations } => run_inspect(&annotations),
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn run_compose(
    base: &Path,
    annotations: &Path,
    page: u32,
    stamps: Option<&Path>,
    config: Option<&Path>,
    output: Option<&Path>,
) -> Result<()> {
    ensure_file_exists(base)?;
    if page == 0 {
        anyhow::bail!("--page is 1-based and must be >= 1");
    }

    let config = match config {
        Some(path) => {
            ensure_file_exists(path)?;
            EngineConfig::load(path).with_context(|| format!("invalid config {}", path.display()))?
        }
        None => EngineConfig::default(),
    };
    let catalog = match stamps {
        Some(path) => {
            ensure_file_exists(path)?;
            StampCatalog::load(path)
                .with_context(|| format!("failed to load stamps from {}", path.display()))?
        }
        None => StampCatalog::default(),
    };
    let snapshot = load_annotations(annotations)?;

    let base_image = image::open(base)
        .with_context(|| format!("failed to read base image {}", base.display()))?
        .to_rgba8();

    let paths = snapshot.paths.get(&page).map(Vec::as_slice).unwrap_or_default();
    let shapes = snapshot.shapes.get(&page).map(Vec::as_slice).unwrap_or_default();
    log::info!("page {page}: {} path(s), {} shape(s)", paths.len(), shapes.len());

    let composed = PageCompositor::new(&config)
        .compose_page(&base_image, paths, shapes, &catalog)
        .context("failed to compose page")?;

    let output = output.map(ToOwned::to_owned).unwrap_or_else(|| default_compose_output(base, page));
    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)?;
    }
    composed
        .save(&output)
        .with_context(|| format!("failed to write image to {}", output.display()))?;

    println!("{}", output.display());
    Ok(())
}

fn run_inspect(annotations: &Path) -> Result<()> {
    let snapshot = load_annotations(annotations)?;

    let mut pages: Vec<u32> = snapshot.paths.keys().chain(snapshot.shapes.keys()).copied().collect();
    pages.sort_unstable();
    pages.dedup();

    let pages: Vec<PageSummary> = pages
        .into_iter()
        .map(|page| PageSummary {
            page,
            paths: snapshot.paths.get(&page).map_or(0, Vec::len),
            shapes: snapshot.shapes.get(&page).map_or(0, Vec::len),
        })
        .collect();

    let payload = InspectOutput {
        path: annotations.display().to_string(),
        pages,
        total_paths: snapshot.path_count(),
        total_shapes: snapshot.shape_count(),
    };

    let json = serde_json::to_string_pretty(&payload)?;
    println!("{json}");
    Ok(())
}

fn load_annotations(path: &Path) -> Result<AnnotationSnapshot> {
    ensure_file_exists(path)?;
    let json = fs::read_to_string(path)?;
    AnnotationSnapshot::from_json_lenient(&json)
        .with_context(|| format!("failed to parse annotations {}", path.display()))
}

fn ensure_file_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        anyhow::bail!("file does not exist: {}", path.display());
    }

    if !path.is_file() {
        anyhow::bail!("path is not a file: {}", path.display());
    }

    Ok(())
}

fn default_compose_output(base: &Path, page: u32) -> PathBuf {
    let stem = base.file_stem().and_then(|name| name.to_str()).unwrap_or("page");

    base.with_file_name(format!("{stem}-annotated-{page}.png"))
}
