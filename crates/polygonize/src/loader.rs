//! Reading the tool's result back into memory.

use crate::error::Result;
use polygonizer_core::io::{read_shapefile, CrsStatus};
use polygonizer_core::{FeatureCollection, CRS};
use std::path::Path;
use tracing::debug;

/// Load the polygon layer at `path` and stamp it with the input's CRS.
///
/// The tool writes its own `.prj`, which may spell the same reference
/// system differently or be missing. A known input CRS replaces it, and an
/// input without one clears it; coordinates are not transformed. When the
/// input CRS could not be decoded the tool's `.prj` is kept, since the tool
/// read the raster itself.
pub fn load_polygons(path: &Path, crs: CrsStatus) -> Result<FeatureCollection> {
    let mut polygons = read_shapefile(path)?;
    if crs.is_unknown() {
        debug!(
            "Input CRS unknown, keeping {} from the tool",
            describe(polygons.crs())
        );
        return Ok(polygons);
    }

    let crs = crs.into_crs();
    if polygons.crs() != crs.as_ref() {
        debug!(
            "Replacing CRS {} with {}",
            describe(polygons.crs()),
            describe(crs.as_ref())
        );
    }
    polygons.set_crs(crs);
    Ok(polygons)
}

fn describe(crs: Option<&CRS>) -> String {
    crs.map_or_else(|| "none".to_string(), CRS::identifier)
}
