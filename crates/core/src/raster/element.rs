//! Raster element trait for generic cell values

use num_traits::{NumCast, Zero};
use std::fmt::Debug;

/// Trait for types that can be stored in a raster cell.
///
/// Polygonization groups cells by value, so integer class rasters are the
/// common case; floating point rasters are accepted and written as-is.
pub trait RasterElement:
    Copy + Clone + Debug + PartialOrd + PartialEq + NumCast + Zero + Send + Sync + 'static
{
    /// Value substituted when a source sample cannot be cast into this type
    fn default_nodata() -> Self;
}

macro_rules! impl_raster_element {
    ($t:ty, $nodata:expr) => {
        impl RasterElement for $t {
            fn default_nodata() -> Self {
                $nodata
            }
        }
    };
}

impl_raster_element!(i8, i8::MIN);
impl_raster_element!(i16, i16::MIN);
impl_raster_element!(i32, i32::MIN);
impl_raster_element!(i64, i64::MIN);
impl_raster_element!(u8, u8::MIN);
impl_raster_element!(u16, u16::MIN);
impl_raster_element!(u32, u32::MIN);
impl_raster_element!(u64, u64::MIN);
impl_raster_element!(f32, f32::NAN);
impl_raster_element!(f64, f64::NAN);
