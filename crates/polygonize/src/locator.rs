//! Finding the gdal_polygonize entry point inside an installation.

use crate::error::{PolygonizeError, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Where the tool and its environment scripts live relative to an
/// installation root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolLayout {
    /// Short name used on the command line and in logs
    pub name: String,
    /// Root used when the caller does not pick one
    pub default_root: PathBuf,
    /// Entry point tried first
    pub entry_point: PathBuf,
    /// Entry point tried when the first is missing
    pub alternate_entry_point: PathBuf,
    /// Scripts that prepare the tool's environment, run in order before it.
    /// Their variables only carry over under `cmd`; see
    /// [`ShellRunner`](crate::ShellRunner).
    pub env_scripts: Vec<PathBuf>,
}

impl ToolLayout {
    /// OSGeo4W bundle on Windows: a batch wrapper with a Python fallback,
    /// plus the two scripts that put GDAL and Python on the path.
    pub fn osgeo4w() -> Self {
        Self {
            name: "osgeo4w".into(),
            default_root: PathBuf::from("C:/OSGeo4W64"),
            entry_point: PathBuf::from("bin/gdal_polygonize.bat"),
            alternate_entry_point: PathBuf::from("apps/Python37/Scripts/gdal_polygonize.py"),
            env_scripts: vec![
                PathBuf::from("bin/o4w_env.bat"),
                PathBuf::from("bin/py3_env.bat"),
            ],
        }
    }

    /// Distribution packages on Unix, where the tool is already on a
    /// working interpreter and needs no environment setup.
    pub fn system() -> Self {
        Self {
            name: "system".into(),
            default_root: PathBuf::from("/usr"),
            entry_point: PathBuf::from("bin/gdal_polygonize.py"),
            alternate_entry_point: PathBuf::from("bin/gdal_polygonize"),
            env_scripts: Vec::new(),
        }
    }

    /// Layout by its short name
    pub fn by_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "osgeo4w" => Some(Self::osgeo4w()),
            "system" => Some(Self::system()),
            _ => None,
        }
    }

    /// Resolve the entry point and environment scripts under `root`.
    ///
    /// The root must be an existing directory. The primary entry point wins
    /// when present; otherwise the alternate is used, and it is an error if
    /// neither exists.
    pub fn locate(&self, root: &Path) -> Result<ToolInstall> {
        if !root.is_dir() {
            return Err(PolygonizeError::InstallRootNotFound(root.to_path_buf()));
        }

        let primary = root.join(&self.entry_point);
        let alternate = root.join(&self.alternate_entry_point);
        let entry_point = if primary.is_file() {
            primary
        } else if alternate.is_file() {
            debug!("{} missing, using {}", primary.display(), alternate.display());
            alternate
        } else {
            return Err(PolygonizeError::ToolNotFound {
                root: root.to_path_buf(),
                tried: vec![primary, alternate],
            });
        };

        let install = ToolInstall {
            root: root.to_path_buf(),
            entry_point,
            env_scripts: self.env_scripts.iter().map(|s| root.join(s)).collect(),
        };
        debug!("Located gdal_polygonize at {}", install.entry_point.display());
        Ok(install)
    }
}

impl Default for ToolLayout {
    fn default() -> Self {
        if cfg!(windows) {
            Self::osgeo4w()
        } else {
            Self::system()
        }
    }
}

/// A located installation, ready to build commands against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInstall {
    pub root: PathBuf,
    pub entry_point: PathBuf,
    /// Environment scripts, absolute. Their existence is not checked.
    pub env_scripts: Vec<PathBuf>,
}
