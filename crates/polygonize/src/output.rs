//! Choosing where the tool writes its shapefile.

use crate::error::{PolygonizeError, Result};
use crate::scratch::Scratch;
use polygonizer_core::formats::existing_mandatory_parts;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Prefix of shapefiles written to scratch space
pub const TEMP_OUTPUT_PREFIX: &str = "polygonize_";

/// Destination shapefile for one call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOutput {
    /// Absolute path of the `.shp` file
    pub path: PathBuf,
    /// Whether the file lives in scratch space and is removed afterwards
    pub temporary: bool,
}

/// The `.shp` path the tool is asked to write for a requested output.
///
/// Anything other than a `.shp` extension (in any case) is treated as part of
/// the name, so `zones.v2` becomes `zones.v2.shp`.
pub fn normalize_output_path(path: &Path) -> PathBuf {
    let is_shp = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("shp"));
    if is_shp {
        return path.to_path_buf();
    }
    let mut name = path.as_os_str().to_os_string();
    name.push(".shp");
    PathBuf::from(name)
}

/// Resolve the output shapefile.
///
/// Without an explicit path a unique name is reserved in scratch space and
/// the whole `<name>.*` bundle is scheduled for removal. An explicit path is
/// normalized with [`normalize_output_path`], its directory must exist, and
/// no mandatory member of the bundle may already be there.
pub fn resolve_output(explicit: Option<&Path>, scratch: &mut Scratch) -> Result<ResolvedOutput> {
    let Some(path) = explicit else {
        let stem = scratch.reserve(TEMP_OUTPUT_PREFIX, "")?;
        let path = stem.with_extension("shp");
        debug!("Temporary output {}", path.display());
        return Ok(ResolvedOutput {
            path,
            temporary: true,
        });
    };

    let path = normalize_output_path(path);

    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    if !parent.is_dir() {
        return Err(PolygonizeError::OutputDirNotFound(parent.to_path_buf()));
    }

    let existing = existing_mandatory_parts(&path);
    if !existing.is_empty() {
        return Err(PolygonizeError::OutputExists(existing));
    }

    Ok(ResolvedOutput {
        path: std::path::absolute(&path)?,
        temporary: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_temporary_output() {
        let dir = tempfile::tempdir().unwrap();
        let mut scratch = Scratch::new(Some(dir.path()));
        let out = resolve_output(None, &mut scratch).unwrap();

        assert!(out.temporary);
        assert_eq!(out.path.parent(), Some(dir.path()));
        assert_eq!(out.path.extension().unwrap(), "shp");
        assert!(out
            .path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with(TEMP_OUTPUT_PREFIX));
        assert!(!out.path.exists());
        assert_eq!(scratch.len(), 1);

        fs::write(&out.path, b"").unwrap();
        fs::write(out.path.with_extension("dbf"), b"").unwrap();
        drop(scratch);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_explicit_gets_extension() {
        let dir = tempfile::tempdir().unwrap();
        let mut scratch = Scratch::new(Some(dir.path()));
        let out = resolve_output(Some(&dir.path().join("zones")), &mut scratch).unwrap();
        assert!(!out.temporary);
        assert_eq!(out.path, dir.path().join("zones.shp"));
        assert!(scratch.is_empty());
    }

    #[test]
    fn test_explicit_keeps_shp_extension() {
        let dir = tempfile::tempdir().unwrap();
        let mut scratch = Scratch::new(None);
        let out = resolve_output(Some(&dir.path().join("zones.SHP")), &mut scratch).unwrap();
        assert_eq!(out.path, dir.path().join("zones.SHP"));
    }

    #[test]
    fn test_dotted_stem_gets_extension() {
        let dir = tempfile::tempdir().unwrap();
        let mut scratch = Scratch::new(None);
        let out = resolve_output(Some(&dir.path().join("zones.v2")), &mut scratch).unwrap();
        assert_eq!(out.path, dir.path().join("zones.v2.shp"));

        fs::write(dir.path().join("zones.v2.dbf"), b"").unwrap();
        let err = resolve_output(Some(&dir.path().join("zones.v2")), &mut scratch).unwrap_err();
        assert!(matches!(err, PolygonizeError::OutputExists(_)));
    }

    #[test]
    fn test_normalize_output_path() {
        assert_eq!(normalize_output_path(Path::new("zones")), Path::new("zones.shp"));
        assert_eq!(normalize_output_path(Path::new("out/zones.shp")), Path::new("out/zones.shp"));
        assert_eq!(normalize_output_path(Path::new("zones.gpkg")), Path::new("zones.gpkg.shp"));
        assert_eq!(normalize_output_path(Path::new("a.b/zones")), Path::new("a.b/zones.shp"));
    }

    #[test]
    fn test_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut scratch = Scratch::new(None);
        let missing = dir.path().join("nope");
        let err = resolve_output(Some(&missing.join("zones.shp")), &mut scratch).unwrap_err();
        assert!(matches!(err, PolygonizeError::OutputDirNotFound(p) if p == missing));
    }

    #[test]
    fn test_existing_output_refused() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("zones.dbf"), b"").unwrap();
        let mut scratch = Scratch::new(None);
        let err = resolve_output(Some(&dir.path().join("zones.shp")), &mut scratch).unwrap_err();
        match err {
            PolygonizeError::OutputExists(parts) => {
                assert_eq!(parts, vec![dir.path().join("zones.dbf")])
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_relative_path_uses_current_dir() {
        let mut scratch = Scratch::new(None);
        let out = resolve_output(Some(Path::new("polygonizer-test-output-does-not-exist")), &mut scratch)
            .unwrap();
        assert!(out.path.is_absolute());
        assert_eq!(out.path.extension().unwrap(), "shp");
    }
}
