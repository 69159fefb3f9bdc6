//! Raster metadata shared by the native and GDAL backends

use crate::crs::CRS;
use crate::error::Result;
use crate::formats::raster_format_for;
use crate::raster::{GeoTransform, RasterElement};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Cell types the active raster backend can read and write.
#[cfg(feature = "gdal")]
pub trait IoElement: RasterElement + gdal::raster::GdalType {}
#[cfg(feature = "gdal")]
impl<T: RasterElement + gdal::raster::GdalType> IoElement for T {}

/// Cell types the active raster backend can read and write.
#[cfg(not(feature = "gdal"))]
pub trait IoElement: RasterElement {}
#[cfg(not(feature = "gdal"))]
impl<T: RasterElement> IoElement for T {}

/// What a backend could establish about a raster's reference system.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CrsStatus {
    /// The file declares this system
    Defined(CRS),
    /// The file declares no reference system at all
    Undefined,
    /// The file may carry one, but this backend cannot decode it
    Unknown,
}

impl CrsStatus {
    pub fn crs(&self) -> Option<&CRS> {
        match self {
            CrsStatus::Defined(crs) => Some(crs),
            CrsStatus::Undefined | CrsStatus::Unknown => None,
        }
    }

    pub fn into_crs(self) -> Option<CRS> {
        match self {
            CrsStatus::Defined(crs) => Some(crs),
            CrsStatus::Undefined | CrsStatus::Unknown => None,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, CrsStatus::Unknown)
    }

    /// Fill an undecided status from the `.prj` next to `path`.
    pub fn or_prj_sidecar(self, path: &Path) -> Result<Self> {
        if let CrsStatus::Defined(_) = self {
            return Ok(self);
        }
        Ok(match read_prj_sidecar(path)? {
            Some(crs) => CrsStatus::Defined(crs),
            None => self,
        })
    }
}

impl From<Option<CRS>> for CrsStatus {
    fn from(crs: Option<CRS>) -> Self {
        crs.map_or(CrsStatus::Undefined, CrsStatus::Defined)
    }
}

impl fmt::Display for CrsStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CrsStatus::Defined(crs) => write!(f, "{}", crs),
            CrsStatus::Undefined => write!(f, "none"),
            CrsStatus::Unknown => write!(f, "unknown"),
        }
    }
}

/// What is known about a raster file without reading its pixels.
///
/// Fields the backend cannot determine for a given format stay `None`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RasterMeta {
    /// File the metadata was read from
    pub path: PathBuf,
    /// Format key from the sidecar table, when the extension is known
    pub format: Option<String>,
    /// (rows, cols)
    pub shape: Option<(usize, usize)>,
    pub transform: Option<GeoTransform>,
    pub crs: CrsStatus,
}

impl RasterMeta {
    /// Metadata with only the path and its format key filled in; the CRS
    /// starts out unknown
    pub fn bare(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            format: raster_format_for(path).map(str::to_string),
            shape: None,
            transform: None,
            crs: CrsStatus::Unknown,
        }
    }

    /// Geographic bounds (min_x, min_y, max_x, max_y), when georeferenced
    pub fn bounds(&self) -> Option<(f64, f64, f64, f64)> {
        let (rows, cols) = self.shape?;
        Some(self.transform?.bounds(cols, rows))
    }
}

/// CRS from the `.prj` file next to `path`, if there is one.
pub fn read_prj_sidecar(path: &Path) -> Result<Option<CRS>> {
    let prj = path.with_extension("prj");
    if !prj.is_file() {
        return Ok(None);
    }
    let contents = std::fs::read_to_string(&prj)?;
    Ok(CRS::from_prj(&contents))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_meta() {
        let meta = RasterMeta::bare(Path::new("/data/dem.asc"));
        assert_eq!(meta.format.as_deref(), Some("AAIGrid"));
        assert!(meta.bounds().is_none());
        assert!(meta.crs.is_unknown());
    }

    #[test]
    fn test_prj_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let raster = dir.path().join("dem.asc");
        assert!(read_prj_sidecar(&raster).unwrap().is_none());

        std::fs::write(
            dir.path().join("dem.prj"),
            r#"GEOGCS["WGS 84",DATUM["WGS_1984"],AUTHORITY["EPSG","4326"]]"#,
        )
        .unwrap();
        let crs = read_prj_sidecar(&raster).unwrap().unwrap();
        assert_eq!(crs.epsg(), Some(4326));
    }

    #[test]
    fn test_status_from_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let raster = dir.path().join("dem.img");
        assert_eq!(
            CrsStatus::Unknown.or_prj_sidecar(&raster).unwrap(),
            CrsStatus::Unknown
        );

        std::fs::write(dir.path().join("dem.prj"), "LOCAL_CS[\"site\"]").unwrap();
        let site = CrsStatus::Defined(CRS::from_wkt("LOCAL_CS[\"site\"]"));
        assert_eq!(CrsStatus::Undefined.or_prj_sidecar(&raster).unwrap(), site);

        // A declared system wins over the sidecar
        let declared = CrsStatus::Defined(CRS::from_epsg(3035));
        assert_eq!(declared.clone().or_prj_sidecar(&raster).unwrap(), declared);
    }

    #[test]
    fn test_status_conversions() {
        assert_eq!(CrsStatus::from(None), CrsStatus::Undefined);
        assert_eq!(CrsStatus::from(Some(CRS::wgs84())).into_crs(), Some(CRS::wgs84()));
        assert_eq!(CrsStatus::Unknown.crs(), None);
        assert_eq!(CrsStatus::Undefined.to_string(), "none");
    }
}
