//! Sidecar extension tables for multi-file geospatial formats
//!
//! A shapefile or a raster in many legacy formats is a bundle of files that
//! share a base name. These tables name the members so that existence checks
//! and cleanup can treat the bundle as one dataset.

use std::path::{Path, PathBuf};

/// Every extension a shapefile bundle may use, without the leading dot.
///
/// The first three (`shp`, `shx`, `dbf`) are mandatory; the rest are
/// projection, encoding, spatial-index and metadata sidecars.
pub const SHAPEFILE_EXTENSIONS: &[&str] = &[
    "shp", "shx", "dbf", "prj", "sbn", "sbx", "fbn", "fbx", "ain", "aih", "ixs", "mxs", "atx",
    "shp.xml", "cpg", "qix",
];

/// Members a shapefile cannot be read without
pub const SHAPEFILE_MANDATORY: &[&str] = &["shp", "shx", "dbf"];

/// Raster format keys (GDAL driver short names) mapped to their extensions.
///
/// The first extension of each entry is the primary data file.
pub const RASTER_SIDECARS: &[(&str, &[&str])] = &[
    ("GTiff", &["tif", "tiff", "tfw", "tif.aux.xml", "tif.ovr", "tif.msk"]),
    ("RRASTER", &["grd", "gri"]),
    ("EHdr", &["bil", "hdr", "prj", "stx", "blw", "bil.aux.xml"]),
    ("AAIGrid", &["asc", "prj", "asc.aux.xml"]),
    ("HFA", &["img", "rrd", "rde", "img.aux.xml"]),
    ("ENVI", &["envi", "hdr", "sta", "envi.aux.xml"]),
    ("SAGA", &["sdat", "sgrd", "prj", "mgrd", "sdat.aux.xml"]),
    ("netCDF", &["nc", "nc.aux.xml"]),
];

/// Format key of the raster package's native grid, which is never handed to
/// external tools directly.
pub const LEGACY_GRID_FORMAT: &str = "RRASTER";

/// Extensions belonging to a raster format key, if the key is known.
pub fn raster_sidecars(format: &str) -> Option<&'static [&'static str]> {
    RASTER_SIDECARS
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(format))
        .map(|(_, exts)| *exts)
}

/// Format key whose primary extension matches `path`.
pub fn raster_format_for(path: &Path) -> Option<&'static str> {
    let mut ext = path.extension()?.to_string_lossy().to_ascii_lowercase();
    if ext == "tiff" {
        ext.truncate(3);
    }
    RASTER_SIDECARS
        .iter()
        .find(|(_, exts)| exts.first() == Some(&ext.as_str()))
        .map(|(key, _)| *key)
}

/// Whether `path` is stored in the legacy grid format.
pub fn is_legacy_grid(path: &Path) -> bool {
    raster_format_for(path) == Some(LEGACY_GRID_FORMAT)
}

/// Base path of a shapefile with its `.shp` extension removed.
fn shapefile_stem(path: &Path) -> PathBuf {
    match path.extension() {
        Some(ext) if ext.eq_ignore_ascii_case("shp") => path.with_extension(""),
        _ => path.to_path_buf(),
    }
}

/// Every possible member path of the shapefile at `path`.
///
/// `path` may name the `.shp` file or the bare base name.
pub fn shapefile_parts(path: &Path) -> Vec<PathBuf> {
    let stem = shapefile_stem(path);
    SHAPEFILE_EXTENSIONS
        .iter()
        .map(|ext| append_extension(&stem, ext))
        .collect()
}

/// Mandatory members of the shapefile at `path` that exist on disk.
pub fn existing_mandatory_parts(path: &Path) -> Vec<PathBuf> {
    let stem = shapefile_stem(path);
    SHAPEFILE_MANDATORY
        .iter()
        .map(|ext| append_extension(&stem, ext))
        .filter(|p| p.exists())
        .collect()
}

/// Members of the shapefile at `path` that exist on disk.
pub fn existing_shapefile_parts(path: &Path) -> Vec<PathBuf> {
    shapefile_parts(path).into_iter().filter(|p| p.exists()).collect()
}

/// `stem` + "." + `ext`, keeping any dots already in the stem.
fn append_extension(stem: &Path, ext: &str) -> PathBuf {
    let mut name = stem.as_os_str().to_os_string();
    name.push(".");
    name.push(ext);
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shapefile_table() {
        assert_eq!(SHAPEFILE_EXTENSIONS.len(), 16);
        for ext in SHAPEFILE_MANDATORY {
            assert!(SHAPEFILE_EXTENSIONS.contains(ext));
        }
    }

    #[test]
    fn test_raster_lookup() {
        assert_eq!(raster_sidecars("gtiff").unwrap()[0], "tif");
        assert_eq!(raster_sidecars("RRASTER"), Some(&["grd", "gri"][..]));
        assert!(raster_sidecars("COG").is_none());
    }

    #[test]
    fn test_format_for_path() {
        assert_eq!(raster_format_for(Path::new("a/b.tif")), Some("GTiff"));
        assert_eq!(raster_format_for(Path::new("a/b.TIFF")), Some("GTiff"));
        assert_eq!(raster_format_for(Path::new("dem.grd")), Some("RRASTER"));
        assert_eq!(raster_format_for(Path::new("dem.asc")), Some("AAIGrid"));
        assert_eq!(raster_format_for(Path::new("dem")), None);
        assert!(is_legacy_grid(Path::new("x.grd")));
        assert!(!is_legacy_grid(Path::new("x.tif")));
    }

    #[test]
    fn test_shapefile_parts() {
        let parts = shapefile_parts(Path::new("/out/zones.v2.shp"));
        assert_eq!(parts.len(), SHAPEFILE_EXTENSIONS.len());
        assert_eq!(parts[0], PathBuf::from("/out/zones.v2.shp"));
        assert!(parts.contains(&PathBuf::from("/out/zones.v2.shp.xml")));

        let bare = shapefile_parts(Path::new("/out/zones"));
        assert_eq!(bare[2], PathBuf::from("/out/zones.dbf"));
    }

    #[test]
    fn test_existing_parts() {
        let dir = tempfile::tempdir().unwrap();
        let shp = dir.path().join("zones.shp");
        std::fs::write(&shp, b"").unwrap();
        std::fs::write(dir.path().join("zones.cpg"), b"UTF-8").unwrap();

        assert_eq!(existing_mandatory_parts(&shp), vec![shp.clone()]);
        assert_eq!(existing_shapefile_parts(&shp).len(), 2);
    }
}
