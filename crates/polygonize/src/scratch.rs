//! Scratch files owned by a single polygonize call.
//!
//! Every temporary name is reserved through [`Scratch`] and removed when the
//! guard drops, whichever way the call exits.

use crate::error::Result;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Name reserved in the scratch directory. Cleanup removes the file called
/// `stem` and every file named `stem.<anything>`, which covers the sidecars
/// written next to a shapefile or raster.
#[derive(Debug, Clone)]
struct Artifact {
    dir: PathBuf,
    stem: OsString,
}

impl Artifact {
    fn owns(&self, name: &str) -> bool {
        let stem = self.stem.to_string_lossy();
        name == stem || name.strip_prefix(stem.as_ref()).is_some_and(|rest| rest.starts_with('.'))
    }

    fn remove(&self) {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Cannot list {} for cleanup: {}", self.dir.display(), e);
                return;
            }
        };
        for entry in entries.flatten() {
            let name = entry.file_name();
            if !self.owns(&name.to_string_lossy()) {
                continue;
            }
            let path = entry.path();
            match fs::remove_file(&path) {
                Ok(()) => debug!("Removed {}", path.display()),
                Err(e) => warn!("Failed to remove {}: {}", path.display(), e),
            }
        }
    }
}

/// Drop guard for temporary files.
#[derive(Debug)]
pub struct Scratch {
    dir: PathBuf,
    artifacts: Vec<Artifact>,
}

impl Scratch {
    /// Guard placing its files in `dir`, or the system temp directory.
    /// Nothing touches the filesystem until a name is reserved.
    pub fn new(dir: Option<&Path>) -> Self {
        Self {
            dir: dir.map_or_else(std::env::temp_dir, Path::to_path_buf),
            artifacts: Vec::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Number of names currently owned
    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    /// Reserve a fresh `<prefix><random><suffix>` name.
    ///
    /// An empty placeholder file holds the name so that concurrent calls
    /// cannot collide; callers may overwrite it.
    pub fn reserve(&mut self, prefix: &str, suffix: &str) -> Result<PathBuf> {
        let placeholder = tempfile::Builder::new()
            .prefix(prefix)
            .suffix(suffix)
            .rand_bytes(10)
            .tempfile_in(&self.dir)?;
        let path = placeholder.into_temp_path().keep().map_err(|e| e.error)?;
        self.register(&path);
        Ok(path)
    }

    /// Take ownership of `path` and everything sharing its name as a prefix.
    pub fn register(&mut self, path: &Path) {
        let Some(stem) = path.file_name() else {
            return;
        };
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        debug!("Scratch owns {}", path.display());
        self.artifacts.push(Artifact {
            dir: dir.to_path_buf(),
            stem: stem.to_os_string(),
        });
    }
}

impl Drop for Scratch {
    fn drop(&mut self) {
        for artifact in self.artifacts.drain(..).rev() {
            artifact.remove();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_nothing_created_until_reserved() {
        let dir = tempfile::tempdir().unwrap();
        {
            let scratch = Scratch::new(Some(dir.path()));
            assert!(scratch.is_empty());
            assert_eq!(scratch.dir(), dir.path());
        }
        assert!(names(dir.path()).is_empty());
    }

    #[test]
    fn test_reserve_is_unique() {
        let dir = tempfile::tempdir().unwrap();
        let mut scratch = Scratch::new(Some(dir.path()));
        let a = scratch.reserve("polygonize_", "").unwrap();
        let b = scratch.reserve("polygonize_", "").unwrap();
        assert_ne!(a, b);
        assert!(a.exists() && b.exists());
        assert_eq!(scratch.len(), 2);
    }

    #[test]
    fn test_drop_removes_sidecars() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("keep.shp"), b"").unwrap();
        {
            let mut scratch = Scratch::new(Some(dir.path()));
            let stem = scratch.reserve("out_", "").unwrap();
            for ext in ["shp", "shx", "dbf", "prj", "shp.xml"] {
                fs::write(stem.with_extension(ext), b"").unwrap();
            }
            let raster = scratch.reserve("raster_", ".tif").unwrap();
            fs::write(dir.path().join(format!(
                "{}.aux.xml",
                raster.file_name().unwrap().to_string_lossy()
            )), b"")
            .unwrap();
            assert_eq!(names(dir.path()).len(), 9);
        }
        assert_eq!(names(dir.path()), vec!["keep.shp".to_string()]);
    }

    #[test]
    fn test_prefix_match_needs_dot() {
        let artifact = Artifact {
            dir: PathBuf::from("."),
            stem: OsString::from("polygonize_ab"),
        };
        assert!(artifact.owns("polygonize_ab"));
        assert!(artifact.owns("polygonize_ab.shp"));
        assert!(!artifact.owns("polygonize_abc.shp"));
        assert!(!artifact.owns("other.shp"));
    }

    #[test]
    fn test_missing_files_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let mut scratch = Scratch::new(Some(dir.path()));
        let path = scratch.reserve("gone_", ".tif").unwrap();
        fs::remove_file(&path).unwrap();
        drop(scratch);
        assert!(names(dir.path()).is_empty());
    }
}
