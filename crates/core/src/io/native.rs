//! Native GeoTIFF reading/writing (without GDAL dependency)
//!
//! Uses the `tiff` crate. Georeferencing is limited to the pixel scale and
//! tiepoint tags, an EPSG code in the GeoKey directory and the GDAL nodata
//! tag. For anything richer, enable the `gdal` feature.

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::formats::raster_format_for;
use crate::io::meta::{CrsStatus, IoElement, RasterMeta};
use crate::raster::{GeoTransform, Raster};
use std::fs::File;
use std::io::{BufReader, Read, Seek, Write};
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::colortype::Gray64Float;
use tiff::encoder::TiffEncoder;
use tiff::tags::Tag;

const MODEL_PIXEL_SCALE: u16 = 33550;
const MODEL_TIEPOINT: u16 = 33922;
const GEO_KEY_DIRECTORY: u16 = 34735;
const GDAL_NODATA: u16 = 42113;

const GT_MODEL_TYPE_KEY: u16 = 1024;
const GT_RASTER_TYPE_KEY: u16 = 1025;
const GEOGRAPHIC_TYPE_KEY: u16 = 2048;
const PROJECTED_CS_TYPE_KEY: u16 = 3072;
const USER_DEFINED: u16 = 32767;

const MODEL_PROJECTED: u16 = 1;
const MODEL_GEOGRAPHIC: u16 = 2;

/// Tag lookup by code, resolving to the named variant when the `tiff`
/// crate knows it so directory lookups match.
fn geotiff_tag(code: u16) -> Tag {
    Tag::from_u16_exhaustive(code)
}

/// Read a GeoTIFF file into a Raster
///
/// The returned raster records `path` as its source, so it can be handed to
/// external tools without being written again.
pub fn read_geotiff<T, P>(path: P, _band: Option<usize>) -> Result<Raster<T>>
where
    T: IoElement,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let file = BufReader::new(File::open(path)?);
    let (mut raster, crs) = decode_geotiff(file)?;
    raster.set_crs(crs.or_prj_sidecar(path)?.into_crs());
    raster.set_source(Some(path.to_path_buf()));
    Ok(raster)
}

/// Read what can be learnt about a raster without decoding its pixels.
///
/// TIFF files are opened for their georeferencing tags; any other format is
/// described by its extension and a `.prj` sidecar only, and without a
/// sidecar its CRS stays [`CrsStatus::Unknown`].
pub fn probe_raster<P: AsRef<Path>>(path: P) -> Result<RasterMeta> {
    let path = path.as_ref();
    let mut meta = RasterMeta::bare(path);

    if raster_format_for(path) == Some("GTiff") {
        let mut decoder = Decoder::new(BufReader::new(File::open(path)?))?;
        let (width, height) = decoder.dimensions()?;
        meta.shape = Some((height as usize, width as usize));
        meta.transform = read_geotransform(&mut decoder);
        meta.crs = read_geokey_crs(&mut decoder);
    }

    meta.crs = meta.crs.or_prj_sidecar(path)?;
    Ok(meta)
}

/// Internal: decode a GeoTIFF from any `Read + Seek` source
fn decode_geotiff<T, R>(reader: R) -> Result<(Raster<T>, CrsStatus)>
where
    T: IoElement,
    R: Read + Seek,
{
    let mut decoder = Decoder::new(reader)?;

    let (width, height) = decoder.dimensions()?;
    let rows = height as usize;
    let cols = width as usize;

    let data: Vec<T> = match decoder.read_image()? {
        DecodingResult::F32(buf) => cast_all(&buf),
        DecodingResult::F64(buf) => cast_all(&buf),
        DecodingResult::U8(buf) => cast_all(&buf),
        DecodingResult::U16(buf) => cast_all(&buf),
        DecodingResult::U32(buf) => cast_all(&buf),
        DecodingResult::I8(buf) => cast_all(&buf),
        DecodingResult::I16(buf) => cast_all(&buf),
        DecodingResult::I32(buf) => cast_all(&buf),
        _ => return Err(Error::UnsupportedDataType("Unsupported TIFF pixel format".to_string())),
    };

    if data.len() != rows * cols {
        return Err(Error::InvalidDimensions {
            width: cols,
            height: rows,
        });
    }

    let mut raster = Raster::from_vec(data, rows, cols)?;

    if let Some(transform) = read_geotransform(&mut decoder) {
        raster.set_transform(transform);
    }
    let crs = read_geokey_crs(&mut decoder);

    if let Ok(text) = decoder.get_tag_ascii_string(geotiff_tag(GDAL_NODATA)) {
        let parsed = text.trim_end_matches('\0').trim().parse::<f64>().ok();
        raster.set_nodata(parsed.and_then(num_traits::cast));
    }

    Ok((raster, crs))
}

fn cast_all<S: num_traits::NumCast + Copy, T: IoElement>(buf: &[S]) -> Vec<T> {
    buf.iter()
        .map(|&v| num_traits::cast(v).unwrap_or(T::default_nodata()))
        .collect()
}

/// GeoTransform from ModelPixelScaleTag + ModelTiepointTag
fn read_geotransform<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<GeoTransform> {
    let scale = decoder.get_tag_f64_vec(geotiff_tag(MODEL_PIXEL_SCALE)).ok()?;
    let tiepoint = decoder.get_tag_f64_vec(geotiff_tag(MODEL_TIEPOINT)).ok()?;
    GeoTransform::from_tiff_tags(&scale, &tiepoint)
}

/// CRS from the GeoKey directory.
///
/// The model type key picks which code key applies. A projected model reads
/// only `ProjectedCSTypeGeoKey`: its geographic key names the base datum, not
/// the raster's system. A user-defined or missing code leaves the CRS
/// unknown, since its parameters live in keys this reader does not decode.
/// No directory at all means the file declares no CRS.
fn read_geokey_crs<R: Read + Seek>(decoder: &mut Decoder<R>) -> CrsStatus {
    let Ok(keys) = decoder.get_tag_u16_vec(geotiff_tag(GEO_KEY_DIRECTORY)) else {
        return CrsStatus::Undefined;
    };
    let lookup = |wanted: u16| {
        keys.get(4..)?
            .chunks_exact(4)
            .find(|entry| entry[0] == wanted && entry[1] == 0)
            .map(|entry| entry[3])
    };
    let code = match lookup(GT_MODEL_TYPE_KEY) {
        Some(MODEL_GEOGRAPHIC) => lookup(GEOGRAPHIC_TYPE_KEY),
        Some(MODEL_PROJECTED) | None => lookup(PROJECTED_CS_TYPE_KEY),
        Some(_) => None,
    };
    match code {
        Some(code) if code != 0 && code != USER_DEFINED => {
            CrsStatus::Defined(CRS::from_epsg(code as u32))
        }
        _ => CrsStatus::Unknown,
    }
}

/// GeoKey directory for a raster with a CRS: model type, raster type and
/// the EPSG code, or the user-defined marker when there is no code that fits
/// the 16-bit key slot. A raster without a CRS gets no directory.
fn geokey_directory(crs: Option<&CRS>) -> Option<Vec<u16>> {
    let crs = crs?;
    let code = crs
        .epsg()
        .and_then(|c| u16::try_from(c).ok())
        .unwrap_or(USER_DEFINED);
    let geographic = crs.is_geographic();

    let model = if geographic { MODEL_GEOGRAPHIC } else { MODEL_PROJECTED };
    let key = if geographic { GEOGRAPHIC_TYPE_KEY } else { PROJECTED_CS_TYPE_KEY };
    let entries = [
        [GT_MODEL_TYPE_KEY, 0, 1, model],
        [GT_RASTER_TYPE_KEY, 0, 1, 1], // RasterPixelIsArea
        [key, 0, 1, code],
    ];

    let mut directory = vec![1, 1, 0, entries.len() as u16];
    directory.extend(entries.iter().flatten());
    Some(directory)
}

/// Write a Raster to a GeoTIFF file
///
/// Cells are stored as 64-bit floats, which holds every integer class value
/// up to 2^53 exactly.
pub fn write_geotiff<T, P>(raster: &Raster<T>, path: P) -> Result<()>
where
    T: IoElement,
    P: AsRef<Path>,
{
    let file = File::create(path.as_ref())?;
    encode_geotiff(raster, file)
}

/// Internal: encode a Raster as GeoTIFF into any `Write + Seek` sink
fn encode_geotiff<T, W>(raster: &Raster<T>, writer: W) -> Result<()>
where
    T: IoElement,
    W: Write + Seek,
{
    let mut encoder = TiffEncoder::new(writer)?;

    let (rows, cols) = raster.shape();

    let data: Vec<f64> = raster
        .data()
        .iter()
        .map(|&v| num_traits::cast(v).unwrap_or(f64::NAN))
        .collect();

    let mut image = encoder.new_image::<Gray64Float>(cols as u32, rows as u32)?;

    let gt = raster.transform();

    let scale = [gt.pixel_width, gt.pixel_height.abs(), 0.0];
    image
        .encoder()
        .write_tag(geotiff_tag(MODEL_PIXEL_SCALE), &scale[..])?;

    let tiepoint = [0.0, 0.0, 0.0, gt.origin_x, gt.origin_y, 0.0];
    image
        .encoder()
        .write_tag(geotiff_tag(MODEL_TIEPOINT), &tiepoint[..])?;

    if let Some(geokeys) = geokey_directory(raster.crs()) {
        image
            .encoder()
            .write_tag(geotiff_tag(GEO_KEY_DIRECTORY), geokeys.as_slice())?;
    }

    if let Some(nodata) = raster.nodata().and_then(num_traits::cast::<T, f64>) {
        let text = format!("{}", nodata);
        image
            .encoder()
            .write_tag(geotiff_tag(GDAL_NODATA), text.as_str())?;
    }

    image.write_data(&data)?;

    Ok(())
}
