//! Error types for the polygonize wrapper.

use crate::command::ToolOutput;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors produced while driving the external polygonize tool.
///
/// Every variant aborts the call; scratch files are removed regardless.
#[derive(Error, Debug)]
pub enum PolygonizeError {
    #[error("connectivity must be 4 or 8, got {0}")]
    InvalidConnectivity(u32),

    #[error("GDAL installation root not found: {}", .0.display())]
    InstallRootNotFound(PathBuf),

    #[error("cannot locate gdal_polygonize under {}; tried {}", .root.display(), join_paths(.tried))]
    ToolNotFound { root: PathBuf, tried: Vec<PathBuf> },

    #[error("output directory does not exist: {}", .0.display())]
    OutputDirNotFound(PathBuf),

    #[error("output already exists: {}", join_paths(.0))]
    OutputExists(Vec<PathBuf>),

    #[error("input raster not found: {}", .0.display())]
    RasterNotFound(PathBuf),

    #[error("gdal_polygonize failed to create output {} ({}){}", .path.display(), .output.status_text(), .output.diagnostics())]
    OutputNotCreated { path: PathBuf, output: ToolOutput },

    #[error("gdal_polygonize {}{}", .output.status_text(), .output.diagnostics())]
    ToolFailed { output: ToolOutput },

    #[error("failed to launch gdal_polygonize: {0}")]
    Spawn(#[source] std::io::Error),

    #[error(transparent)]
    Core(#[from] polygonizer_core::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn join_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl PolygonizeError {
    /// Output captured from the tool, for the variants that ran it
    pub fn tool_output(&self) -> Option<&ToolOutput> {
        match self {
            PolygonizeError::OutputNotCreated { output, .. } | PolygonizeError::ToolFailed { output } => {
                Some(output)
            }
            _ => None,
        }
    }

    pub(crate) fn output_not_created(path: &Path, output: ToolOutput) -> Self {
        PolygonizeError::OutputNotCreated {
            path: path.to_path_buf(),
            output,
        }
    }
}

/// Result alias for polygonize operations.
pub type Result<T> = std::result::Result<T, PolygonizeError>;
