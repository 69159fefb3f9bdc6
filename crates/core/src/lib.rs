//! # polygonizer core
//!
//! Types and I/O shared by the polygonizer crates.
//!
//! This crate provides:
//! - `Raster<T>`: generic raster grid that remembers the file it was read from
//! - `GeoTransform`: affine transformation for georeferencing
//! - `CRS`: coordinate reference system handling
//! - `FeatureCollection`: polygons with an attribute table and a CRS
//! - I/O for GeoTIFF rasters and ESRI shapefiles
//! - Static extension tables for multi-file formats

pub mod crs;
pub mod error;
pub mod formats;
pub mod io;
pub mod raster;
pub mod vector;

pub use crs::CRS;
pub use error::{Error, Result};
pub use raster::{GeoTransform, Raster, RasterElement};
pub use vector::{AttributeValue, Feature, FeatureCollection};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::crs::CRS;
    pub use crate::error::{Error, Result};
    pub use crate::raster::{GeoTransform, Raster, RasterElement};
    pub use crate::vector::{AttributeValue, Feature, FeatureCollection};
}
