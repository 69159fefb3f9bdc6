//! Coordinate Reference System handling

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coordinate Reference System representation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CRS {
    /// WKT representation, as found in `.prj` sidecars
    wkt: Option<String>,
    /// EPSG code if known
    epsg: Option<u32>,
}

impl CRS {
    /// Create a CRS from an EPSG code
    pub fn from_epsg(code: u32) -> Self {
        Self {
            wkt: None,
            epsg: Some(code),
        }
    }

    /// Create a CRS from a WKT string
    pub fn from_wkt(wkt: impl Into<String>) -> Self {
        Self {
            wkt: Some(wkt.into()),
            epsg: None,
        }
    }

    /// Create a CRS from the contents of a `.prj` file.
    ///
    /// The WKT is kept verbatim. When the outermost definition ends with an
    /// `AUTHORITY["EPSG","<code>"]` clause the code is recorded as well.
    pub fn from_prj(contents: &str) -> Option<Self> {
        let wkt = contents.trim();
        if wkt.is_empty() {
            return None;
        }
        Some(Self {
            wkt: Some(wkt.to_string()),
            epsg: trailing_epsg_authority(wkt),
        })
    }

    /// WGS84 geographic CRS (EPSG:4326)
    pub fn wgs84() -> Self {
        Self::from_epsg(4326)
    }

    /// Get EPSG code if known
    pub fn epsg(&self) -> Option<u32> {
        self.epsg
    }

    /// Get WKT representation
    pub fn wkt(&self) -> Option<&str> {
        self.wkt.as_deref()
    }

    /// Whether this is a geographic (lat/lon) system.
    ///
    /// EPSG codes in the 4000-4999 block count as geographic; without a code
    /// the outermost WKT node decides. Anything else is treated as projected.
    pub fn is_geographic(&self) -> bool {
        match (self.epsg, self.wkt.as_deref()) {
            (Some(code), _) => (4000..=4999).contains(&code),
            (None, Some(wkt)) => {
                let wkt = wkt.trim_start();
                wkt.starts_with("GEOGCS[") || wkt.starts_with("GEOGCRS[")
            }
            (None, None) => false,
        }
    }

    /// Get a string identifier for this CRS
    pub fn identifier(&self) -> String {
        if let Some(code) = self.epsg {
            return format!("EPSG:{}", code);
        }
        if let Some(wkt) = &self.wkt {
            let end = wkt
                .char_indices()
                .nth(50)
                .map(|(i, _)| i)
                .unwrap_or(wkt.len());
            return format!("WKT:{}", &wkt[..end]);
        }
        "Unknown".to_string()
    }
}

/// Extract the code of a final `AUTHORITY["EPSG","1234"]]` clause.
fn trailing_epsg_authority(wkt: &str) -> Option<u32> {
    let idx = wkt.rfind("AUTHORITY[")?;
    let tail = &wkt[idx + "AUTHORITY[".len()..];
    // The authority must belong to the outermost node: only closing
    // brackets may follow it.
    let close = tail.find(']')?;
    if !tail[close..].chars().all(|c| c == ']' || c.is_whitespace()) {
        return None;
    }
    let mut parts = tail[..close].split(',').map(|p| p.trim().trim_matches('"'));
    match (parts.next(), parts.next()) {
        (Some(auth), Some(code)) if auth.eq_ignore_ascii_case("EPSG") => code.parse().ok(),
        _ => None,
    }
}

impl fmt::Display for CRS {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.identifier())
    }
}

impl Default for CRS {
    fn default() -> Self {
        Self::wgs84()
    }
}
