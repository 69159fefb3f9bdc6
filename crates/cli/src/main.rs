//! polygonizer CLI - raster to polygon conversion through gdal_polygonize

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use polygonizer::{normalize_output_path, polygonize, PolygonizeOptions, ToolCommand, ToolLayout};
use polygonizer_core::formats::{raster_sidecars, RASTER_SIDECARS, SHAPEFILE_EXTENSIONS, SHAPEFILE_MANDATORY};
use polygonizer_core::io::probe_raster;

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "polygonizer")]
#[command(author, version, about = "Raster to polygon conversion with gdal_polygonize", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a classified raster into polygons
    Polygonize {
        /// Input raster file
        input: PathBuf,
        /// Output shapefile; a temporary file is used when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Pixel connectivity: 4 or 8
        #[arg(short, long, default_value = "4")]
        connectivity: u32,
        /// Only write the shapefile, do not load it back
        #[arg(long)]
        no_read: bool,
        /// Directory for temporary files
        #[arg(long)]
        temp_dir: Option<PathBuf>,
        #[command(flatten)]
        tool: ToolArgs,
    },
    /// Show information about a raster file
    Info {
        /// Input raster file
        input: PathBuf,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Find gdal_polygonize and print the command prefix
    Locate {
        #[command(flatten)]
        tool: ToolArgs,
    },
    /// List sidecar extensions of multi-file formats
    Extensions {
        /// Raster format key (GTiff, RRASTER, ...); shapefile when omitted
        #[arg(short, long)]
        format: Option<String>,
    },
}

#[derive(Args)]
struct ToolArgs {
    /// GDAL installation root
    #[arg(long, env = "POLYGONIZER_GDAL_ROOT")]
    gdal_root: Option<PathBuf>,
    /// Installation layout: osgeo4w or system
    #[arg(long)]
    layout: Option<String>,
}

impl ToolArgs {
    fn layout(&self) -> Result<ToolLayout> {
        match &self.layout {
            Some(name) => ToolLayout::by_name(name)
                .with_context(|| format!("Unknown layout: {}. Use osgeo4w or system.", name)),
            None => Ok(ToolLayout::default()),
        }
    }

    fn root(&self, layout: &ToolLayout) -> PathBuf {
        self.gdal_root
            .clone()
            .unwrap_or_else(|| layout.default_root.clone())
    }
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("setting default subscriber failed")
}

fn spinner(msg: &str) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    Ok(pb)
}

fn print_extensions(label: &str, exts: &[&str]) {
    let list: Vec<String> = exts.iter().map(|e| format!(".{}", e)).collect();
    println!("{:<10} {}", label, list.join(" "));
}

fn describe_bounds(bounds: (f64, f64, f64, f64)) -> String {
    format!(
        "({:.6}, {:.6}) - ({:.6}, {:.6})",
        bounds.0, bounds.1, bounds.2, bounds.3
    )
}

fn info_command(input: &Path, json: bool) -> Result<()> {
    let meta = probe_raster(input).context("Failed to read raster")?;
    if json {
        println!("{}", serde_json::to_string_pretty(&meta)?);
        return Ok(());
    }

    println!("File: {}", meta.path.display());
    if let Some(format) = &meta.format {
        println!("Format: {}", format);
    }
    if let Some((rows, cols)) = meta.shape {
        println!("Dimensions: {} x {} ({} cells)", cols, rows, rows * cols);
    }
    if let Some(transform) = &meta.transform {
        println!("Cell size: {}", transform.cell_size());
    }
    if let Some(bounds) = meta.bounds() {
        println!("Bounds: {}", describe_bounds(bounds));
    }
    println!("CRS: {}", meta.crs);
    Ok(())
}

fn locate_command(tool: &ToolArgs) -> Result<()> {
    let layout = tool.layout()?;
    let root = tool.root(&layout);
    let install = layout
        .locate(&root)
        .with_context(|| format!("No usable {} installation", layout.name))?;

    println!("Layout: {}", layout.name);
    println!("Root: {}", install.root.display());
    println!("Entry point: {}", install.entry_point.display());
    for script in &install.env_scripts {
        let note = if script.is_file() { "" } else { " (missing)" };
        println!("Env script: {}{}", script.display(), note);
    }
    let example = ToolCommand::new(
        &install,
        Default::default(),
        Path::new("<input>"),
        Path::new("<output>.shp"),
    );
    println!("Command: {}", example.command_line());
    Ok(())
}

fn extensions_command(format: Option<&str>) -> Result<()> {
    match format {
        None => {
            print_extensions("Shapefile", SHAPEFILE_EXTENSIONS);
            print_extensions("Mandatory", SHAPEFILE_MANDATORY);
        }
        Some("all") => {
            print_extensions("Shapefile", SHAPEFILE_EXTENSIONS);
            for (key, exts) in RASTER_SIDECARS {
                print_extensions(key, exts);
            }
        }
        Some(key) => {
            let exts = raster_sidecars(key).with_context(|| {
                let known: Vec<&str> = RASTER_SIDECARS.iter().map(|(k, _)| *k).collect();
                format!("Unknown format: {}. Known: {}", key, known.join(", "))
            })?;
            print_extensions(key, exts);
        }
    }
    Ok(())
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        Commands::Polygonize {
            input,
            output,
            connectivity,
            no_read,
            temp_dir,
            tool,
        } => {
            if no_read && output.is_none() {
                anyhow::bail!("--no-read needs --output, the temporary result would be discarded");
            }
            let layout = tool.layout()?;
            let options = PolygonizeOptions {
                read_to_memory: !no_read,
                output: output.clone(),
                install_root: tool.root(&layout),
                layout,
                connectivity,
                temp_dir,
            };

            let pb = spinner("Running gdal_polygonize...")?;
            let start = Instant::now();
            let result = polygonize(input.as_path(), &options);
            pb.finish_and_clear();
            let polygons = result.context("Polygonize failed")?;
            let elapsed = start.elapsed();

            if let Some(polygons) = polygons {
                println!("Polygons: {}", polygons.len());
                println!("Fields: {}", polygons.field_names().join(", "));
                match polygons.crs() {
                    Some(crs) => println!("CRS: {}", crs),
                    None => println!("CRS: none"),
                }
            }
            if let Some(path) = &output {
                let saved = normalize_output_path(path);
                println!("Polygons saved to: {}", saved.display());
            }
            println!("  Processing time: {:.2?}", elapsed);
            info!("Done");
        }

        Commands::Info { input, json } => info_command(&input, json)?,

        Commands::Locate { tool } => locate_command(&tool)?,

        Commands::Extensions { format } => extensions_command(format.as_deref())?,
    }

    Ok(())
}
