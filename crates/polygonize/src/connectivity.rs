//! Pixel adjacency rule passed to the tool.

use crate::error::PolygonizeError;
use std::fmt;

/// Which neighbours count as connected when growing a polygon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Connectivity {
    /// Rook adjacency: cells must share an edge
    #[default]
    Four,
    /// Queen adjacency: sharing a corner is enough
    Eight,
}

impl Connectivity {
    /// Number of neighbours considered
    pub fn neighbours(self) -> u32 {
        match self {
            Connectivity::Four => 4,
            Connectivity::Eight => 8,
        }
    }

    /// Command-line token, including its trailing separator.
    /// Four-connectivity is the tool's default and has no flag.
    pub fn flag(self) -> &'static str {
        match self {
            Connectivity::Four => "",
            Connectivity::Eight => "-8 ",
        }
    }
}

impl TryFrom<u32> for Connectivity {
    type Error = PolygonizeError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            4 => Ok(Connectivity::Four),
            8 => Ok(Connectivity::Eight),
            other => Err(PolygonizeError::InvalidConnectivity(other)),
        }
    }
}

impl fmt::Display for Connectivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-connected", self.neighbours())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_four_and_eight() {
        assert_eq!(Connectivity::try_from(4).unwrap(), Connectivity::Four);
        assert_eq!(Connectivity::try_from(8).unwrap(), Connectivity::Eight);
        assert_eq!(Connectivity::default(), Connectivity::Four);
    }

    #[test]
    fn test_rejects_everything_else() {
        for value in [0, 1, 2, 3, 5, 6, 7, 9, 16, u32::MAX] {
            let err = Connectivity::try_from(value).unwrap_err();
            assert!(matches!(err, PolygonizeError::InvalidConnectivity(v) if v == value));
        }
    }

    #[test]
    fn test_flag() {
        assert_eq!(Connectivity::Four.flag(), "");
        assert_eq!(Connectivity::Eight.flag(), "-8 ");
        assert_eq!(Connectivity::Eight.to_string(), "8-connected");
    }
}
