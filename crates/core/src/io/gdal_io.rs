//! Raster reading and writing using GDAL

use crate::crs::CRS;
use crate::error::Result;
use crate::io::meta::{CrsStatus, IoElement, RasterMeta};
use crate::raster::{GeoTransform, Raster};
use gdal::raster::Buffer;
use gdal::spatial_ref::SpatialRef;
use gdal::{Dataset, DriverManager};
use std::path::Path;

/// CRS of a dataset, with the EPSG code when GDAL can identify one
fn dataset_crs(dataset: &Dataset) -> Option<CRS> {
    let srs = dataset.spatial_ref().ok()?;
    if let Ok(code) = srs.auth_code() {
        return Some(CRS::from_epsg(code as u32));
    }
    srs.to_wkt().ok().map(CRS::from_wkt)
}

/// Read a raster file into a Raster
///
/// # Arguments
/// * `path` - Path to any GDAL-readable raster
/// * `band` - Band number (1-indexed), defaults to 1
pub fn read_geotiff<T, P>(path: P, band: Option<usize>) -> Result<Raster<T>>
where
    T: IoElement,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let dataset = Dataset::open(path)?;
    let rasterband = dataset.rasterband(band.unwrap_or(1))?;

    let (cols, rows) = dataset.raster_size();
    let buffer = rasterband.read_as::<T>((0, 0), (cols, rows), (cols, rows), None)?;

    let mut raster = Raster::from_vec(buffer.data().to_vec(), rows, cols)?;

    if let Ok(gt) = dataset.geo_transform() {
        raster.set_transform(GeoTransform::from_gdal(gt));
    }

    let crs = CrsStatus::from(dataset_crs(&dataset)).or_prj_sidecar(path)?;
    raster.set_crs(crs.into_crs());

    if let Some(nodata) = rasterband.no_data_value() {
        raster.set_nodata(num_traits::cast(nodata));
    }

    raster.set_source(Some(path.to_path_buf()));
    Ok(raster)
}

/// Read size, georeferencing and CRS without touching pixel data.
pub fn probe_raster<P: AsRef<Path>>(path: P) -> Result<RasterMeta> {
    let path = path.as_ref();
    let dataset = Dataset::open(path)?;
    let (cols, rows) = dataset.raster_size();

    let mut meta = RasterMeta::bare(path);
    meta.shape = Some((rows, cols));
    meta.transform = dataset.geo_transform().ok().map(GeoTransform::from_gdal);
    // GDAL reads every embedded definition, so what it cannot find is absent
    meta.crs = CrsStatus::from(dataset_crs(&dataset)).or_prj_sidecar(path)?;
    Ok(meta)
}

/// Write a Raster to a GeoTIFF file
pub fn write_geotiff<T, P>(raster: &Raster<T>, path: P) -> Result<()>
where
    T: IoElement,
    P: AsRef<Path>,
{
    let driver = DriverManager::get_driver_by_name("GTiff")?;

    let (rows, cols) = raster.shape();

    let mut dataset = driver.create_with_band_type::<T, _>(path.as_ref(), cols, rows, 1)?;

    dataset.set_geo_transform(&raster.transform().to_gdal())?;

    if let Some(crs) = raster.crs() {
        if let Some(epsg) = crs.epsg() {
            let srs = SpatialRef::from_epsg(epsg)?;
            dataset.set_spatial_ref(&srs)?;
        } else if let Some(wkt) = crs.wkt() {
            let srs = SpatialRef::from_wkt(wkt)?;
            dataset.set_spatial_ref(&srs)?;
        }
    }

    let mut band = dataset.rasterband(1)?;

    if let Some(nodata) = raster.nodata().and_then(num_traits::cast::<T, f64>) {
        band.set_no_data_value(Some(nodata))?;
    }

    let data: Vec<T> = raster.data().iter().copied().collect();
    let mut buffer = Buffer::new((cols, rows), data);
    band.write((0, 0), (cols, rows), &mut buffer)?;

    Ok(())
}
