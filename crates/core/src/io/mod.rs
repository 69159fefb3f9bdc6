//! I/O operations for reading and writing geospatial data
//!
//! Rasters go through GeoTIFF: natively with the `tiff` crate, or through
//! GDAL when the `gdal` feature is enabled. Vector layers are ESRI
//! shapefiles.

#[cfg(feature = "gdal")]
mod gdal_io;
mod meta;
#[cfg(not(feature = "gdal"))]
mod native;
mod vector_io;

#[cfg(feature = "gdal")]
pub use gdal_io::{probe_raster, read_geotiff, write_geotiff};

#[cfg(not(feature = "gdal"))]
pub use native::{probe_raster, read_geotiff, write_geotiff};

pub use meta::{read_prj_sidecar, CrsStatus, IoElement, RasterMeta};
pub use vector_io::{read_shapefile, write_shapefile};
