//! # polygonizer
//!
//! Turn a classified raster into polygons by driving GDAL's
//! `gdal_polygonize` script as an external process.
//!
//! A call validates its arguments, finds the tool inside an installation,
//! makes sure the raster exists as a file the tool can read, runs the tool
//! into a shapefile, and optionally loads the result back with the input
//! raster's CRS. Scratch files are removed on every exit path.
//!
//! ```no_run
//! use polygonizer::{polygonize, PolygonizeOptions};
//!
//! let options = PolygonizeOptions {
//!     connectivity: 8,
//!     ..Default::default()
//! };
//! let polygons = polygonize("landcover.tif", &options)?;
//! # Ok::<(), polygonizer::PolygonizeError>(())
//! ```

pub mod command;
pub mod connectivity;
pub mod error;
pub mod loader;
pub mod locator;
pub mod materialize;
pub mod output;
pub mod scratch;

pub use command::{CommandRunner, ShellRunner, ToolCommand, ToolOutput};
pub use connectivity::Connectivity;
pub use error::{PolygonizeError, Result};
pub use locator::{ToolInstall, ToolLayout};
pub use materialize::{RasterHandle, RasterInput};
pub use output::normalize_output_path;

use loader::load_polygons;
use materialize::materialize;
use output::resolve_output;
use polygonizer_core::FeatureCollection;
use scratch::Scratch;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Options for a polygonize call.
#[derive(Debug, Clone)]
pub struct PolygonizeOptions {
    /// Load the result into memory. When false the call returns `None` and
    /// only the file is produced.
    pub read_to_memory: bool,
    /// Shapefile to write. `None` writes to scratch space, which is removed
    /// once the result has been loaded.
    pub output: Option<PathBuf>,
    /// GDAL installation to search
    pub install_root: PathBuf,
    /// Where the tool lives under `install_root`
    pub layout: ToolLayout,
    /// Pixel connectivity, 4 or 8
    pub connectivity: u32,
    /// Scratch directory, defaults to the system temp directory
    pub temp_dir: Option<PathBuf>,
}

impl Default for PolygonizeOptions {
    fn default() -> Self {
        let layout = ToolLayout::default();
        Self {
            read_to_memory: true,
            output: None,
            install_root: layout.default_root.clone(),
            layout,
            connectivity: 4,
            temp_dir: None,
        }
    }
}

/// Runs polygonize calls with fixed options and a pluggable process runner.
#[derive(Debug, Clone)]
pub struct Polygonizer<R = ShellRunner> {
    options: PolygonizeOptions,
    runner: R,
}

impl Polygonizer<ShellRunner> {
    pub fn new(options: PolygonizeOptions) -> Self {
        Self {
            options,
            runner: ShellRunner,
        }
    }
}

impl<R: CommandRunner> Polygonizer<R> {
    /// Replace the process runner
    pub fn with_runner<S: CommandRunner>(self, runner: S) -> Polygonizer<S> {
        Polygonizer {
            options: self.options,
            runner,
        }
    }

    pub fn options(&self) -> &PolygonizeOptions {
        &self.options
    }

    /// Polygonize `input`.
    ///
    /// Returns the polygons when `read_to_memory` is set, `None` otherwise.
    /// Steps run in a fixed order and the first failure aborts the call:
    /// connectivity, tool location, output path, raster file, tool run,
    /// output check, load.
    pub fn run<'a>(&self, input: impl Into<RasterInput<'a>>) -> Result<Option<FeatureCollection>> {
        let input = input.into();
        let options = &self.options;

        let connectivity = Connectivity::try_from(options.connectivity)?;
        let install = options.layout.locate(&options.install_root)?;

        let mut scratch = Scratch::new(options.temp_dir.as_deref());
        let output = resolve_output(options.output.as_deref(), &mut scratch)?;
        let raster = materialize(input, &mut scratch)?;

        let command = ToolCommand::new(&install, connectivity, &raster.path, &output.path);
        info!(
            "Polygonizing {} ({}) into {}",
            raster.path.display(),
            connectivity,
            output.path.display()
        );
        let result = self.runner.run(&command).map_err(PolygonizeError::Spawn)?;
        verify_output(&output.path, result)?;

        if !options.read_to_memory {
            return Ok(None);
        }
        let polygons = load_polygons(&output.path, raster.crs)?;
        info!("Loaded {} polygons", polygons.len());
        Ok(Some(polygons))
    }
}

/// The tool can exit cleanly without writing anything, and can fail after
/// writing a partial file; both are errors.
fn verify_output(path: &Path, result: ToolOutput) -> Result<()> {
    if !path.is_file() {
        return Err(PolygonizeError::output_not_created(path, result));
    }
    if !result.success() {
        return Err(PolygonizeError::ToolFailed { output: result });
    }
    debug!("gdal_polygonize wrote {}", path.display());
    Ok(())
}

/// Polygonize `input` with `options` through the platform shell.
pub fn polygonize<'a>(
    input: impl Into<RasterInput<'a>>,
    options: &PolygonizeOptions,
) -> Result<Option<FeatureCollection>> {
    Polygonizer::new(options.clone()).run(input)
}
