//! Making sure the tool has a raster file it can open.

use crate::error::{PolygonizeError, Result};
use crate::scratch::Scratch;
use polygonizer_core::formats::is_legacy_grid;
use polygonizer_core::io::{probe_raster, write_geotiff, CrsStatus, IoElement};
use polygonizer_core::{Raster, CRS};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Prefix of rasters written to scratch space
pub const TEMP_RASTER_PREFIX: &str = "polygonize_raster_";

/// Interchange format handed to the tool
pub const TEMP_RASTER_SUFFIX: &str = ".tif";

/// An in-memory raster, seen only through what materialization needs.
pub trait RasterHandle {
    /// File the raster was read from, if it is still in sync with it
    fn source_path(&self) -> Option<&Path>;

    fn reference_system(&self) -> Option<&CRS>;

    /// Write the raster as GeoTIFF
    fn write_to(&self, path: &Path) -> polygonizer_core::Result<()>;
}

impl<T: IoElement> RasterHandle for Raster<T> {
    fn source_path(&self) -> Option<&Path> {
        self.source()
    }

    fn reference_system(&self) -> Option<&CRS> {
        self.crs()
    }

    fn write_to(&self, path: &Path) -> polygonizer_core::Result<()> {
        write_geotiff(self, path)
    }
}

/// Raster given to a polygonize call: a file on disk or an in-memory grid.
pub enum RasterInput<'a> {
    Path(PathBuf),
    Raster(&'a dyn RasterHandle),
}

impl<'a, T: IoElement> From<&'a Raster<T>> for RasterInput<'a> {
    fn from(raster: &'a Raster<T>) -> Self {
        RasterInput::Raster(raster)
    }
}

impl From<PathBuf> for RasterInput<'_> {
    fn from(path: PathBuf) -> Self {
        RasterInput::Path(path)
    }
}

impl From<&Path> for RasterInput<'_> {
    fn from(path: &Path) -> Self {
        RasterInput::Path(path.to_path_buf())
    }
}

impl From<&str> for RasterInput<'_> {
    fn from(path: &str) -> Self {
        RasterInput::Path(PathBuf::from(path))
    }
}

impl std::fmt::Debug for RasterInput<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RasterInput::Path(path) => f.debug_tuple("Path").field(path).finish(),
            RasterInput::Raster(raster) => f
                .debug_struct("Raster")
                .field("source", &raster.source_path())
                .field("crs", &raster.reference_system())
                .finish(),
        }
    }
}

/// Raster file the tool will read.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterializedRaster {
    /// Absolute path passed on the command line
    pub path: PathBuf,
    /// CRS to stamp on the result
    pub crs: CrsStatus,
    /// Whether the file was written for this call
    pub temporary: bool,
}

/// Resolve `input` to a file on disk.
///
/// Paths are used as given once they are known to exist. In-memory rasters
/// reuse their source file unless it is gone or in the legacy grid format;
/// otherwise they are written to a scratch GeoTIFF.
///
/// A reused source without a CRS in memory reports it as unknown: the tool
/// reads that same file and may well find one.
pub fn materialize(input: RasterInput<'_>, scratch: &mut Scratch) -> Result<MaterializedRaster> {
    match input {
        RasterInput::Path(path) => {
            if !path.is_file() {
                return Err(PolygonizeError::RasterNotFound(path));
            }
            let path = std::path::absolute(&path)?;
            let meta = probe_raster(&path)?;
            debug!("Input raster {} ({:?})", path.display(), meta.format);
            Ok(MaterializedRaster {
                path,
                crs: meta.crs,
                temporary: false,
            })
        }
        RasterInput::Raster(raster) => {
            let crs = raster.reference_system().cloned();
            match raster.source_path() {
                Some(source) if source.is_file() && !is_legacy_grid(source) => {
                    debug!("Reusing raster source {}", source.display());
                    Ok(MaterializedRaster {
                        path: std::path::absolute(source)?,
                        crs: crs.map_or(CrsStatus::Unknown, CrsStatus::Defined),
                        temporary: false,
                    })
                }
                source => {
                    let path = scratch.reserve(TEMP_RASTER_PREFIX, TEMP_RASTER_SUFFIX)?;
                    match source {
                        Some(s) => info!("Converting {} to {}", s.display(), path.display()),
                        None => info!("Writing in-memory raster to {}", path.display()),
                    }
                    raster.write_to(&path)?;
                    Ok(MaterializedRaster {
                        path,
                        crs: CrsStatus::from(crs),
                        temporary: true,
                    })
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polygonizer_core::GeoTransform;
    use std::fs;

    fn classes() -> Raster<u8> {
        let mut raster = Raster::from_vec(vec![1, 1, 2, 1, 2, 2], 2, 3).unwrap();
        raster.set_transform(GeoTransform::new(500_000.0, 4_500_000.0, 30.0, -30.0));
        raster.set_crs(Some(CRS::from_epsg(32633)));
        raster
    }

    #[test]
    fn test_missing_path() {
        let dir = tempfile::tempdir().unwrap();
        let mut scratch = Scratch::new(Some(dir.path()));
        let missing = dir.path().join("dem.tif");
        let err = materialize(missing.clone().into(), &mut scratch).unwrap_err();
        assert!(matches!(err, PolygonizeError::RasterNotFound(p) if p == missing));
        assert!(scratch.is_empty());
    }

    #[test]
    fn test_path_is_probed() {
        let dir = tempfile::tempdir().unwrap();
        let tif = dir.path().join("classes.tif");
        write_geotiff(&classes(), &tif).unwrap();

        let mut scratch = Scratch::new(Some(dir.path()));
        let m = materialize(tif.as_path().into(), &mut scratch).unwrap();
        assert_eq!(m.path, tif);
        assert!(!m.temporary);
        assert_eq!(m.crs, CrsStatus::Defined(CRS::from_epsg(32633)));
    }

    #[test]
    fn test_in_memory_raster_is_written() {
        let dir = tempfile::tempdir().unwrap();
        let raster = classes();
        let mut scratch = Scratch::new(Some(dir.path()));
        let m = materialize((&raster).into(), &mut scratch).unwrap();

        assert!(m.temporary);
        assert!(m.path.starts_with(dir.path()));
        assert_eq!(m.path.extension().unwrap(), "tif");
        assert!(fs::metadata(&m.path).unwrap().len() > 0);
        assert_eq!(m.crs, CrsStatus::Defined(CRS::from_epsg(32633)));

        let path = m.path.clone();
        drop(scratch);
        assert!(!path.exists());
    }

    #[test]
    fn test_disk_backed_raster_is_reused() {
        let dir = tempfile::tempdir().unwrap();
        let tif = dir.path().join("classes.tif");
        fs::write(&tif, b"").unwrap();
        let mut raster = classes();
        raster.set_source(Some(tif.clone()));

        let mut scratch = Scratch::new(Some(dir.path()));
        let m = materialize((&raster).into(), &mut scratch).unwrap();
        assert_eq!(m.path, tif);
        assert!(!m.temporary);
        assert!(scratch.is_empty());
        assert_eq!(m.crs, CrsStatus::Defined(CRS::from_epsg(32633)));

        raster.set_crs(None);
        let m = materialize((&raster).into(), &mut scratch).unwrap();
        assert_eq!(m.crs, CrsStatus::Unknown);
    }

    #[test]
    fn test_written_raster_without_crs_is_undefined() {
        let dir = tempfile::tempdir().unwrap();
        let mut raster = classes();
        raster.set_crs(None);
        let mut scratch = Scratch::new(Some(dir.path()));
        let m = materialize((&raster).into(), &mut scratch).unwrap();
        assert!(m.temporary);
        assert_eq!(m.crs, CrsStatus::Undefined);
    }

    #[test]
    fn test_legacy_grid_is_converted() {
        let dir = tempfile::tempdir().unwrap();
        let grd = dir.path().join("classes.grd");
        fs::write(&grd, b"[general]").unwrap();
        let mut raster = classes();
        raster.set_source(Some(grd.clone()));

        let mut scratch = Scratch::new(Some(dir.path()));
        let m = materialize((&raster).into(), &mut scratch).unwrap();
        assert!(m.temporary);
        assert_ne!(m.path, grd);
        assert_eq!(scratch.len(), 1);
    }

    #[test]
    fn test_vanished_source_is_rewritten() {
        let dir = tempfile::tempdir().unwrap();
        let mut raster = classes();
        raster.set_source(Some(dir.path().join("deleted.tif")));

        let mut scratch = Scratch::new(Some(dir.path()));
        let m = materialize((&raster).into(), &mut scratch).unwrap();
        assert!(m.temporary);
    }
}
