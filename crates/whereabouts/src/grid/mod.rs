//! Ordnance Survey National Grid references.
//!
//! A reference is two letters naming a 100 km cell followed by an even number of digits,
//! half for the easting and half for the northing within that cell. `SU 387 148` is the
//! 100 m square whose south-west corner is at easting 438700, northing 114800.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::trace;

pub use error::GridError;
use error::Result;

const CELL_SIZE: f64 = 100_000.0;
const GRID_SIZE: usize = 7;
const MAINLAND_ROWS: usize = 5;
const MAX_DIGITS: usize = 10;

/// Cell letters indexed by `[northing / 100 km][easting / 100 km]`.
///
/// The two northern rows repeat pairs; lookups take the first occurrence.
const GRID_LETTERS: [[&str; GRID_SIZE]; GRID_SIZE] = [
    ["SV", "SW", "SX", "SY", "SZ", "TV", "TW"],
    ["SQ", "SR", "SS", "ST", "SU", "TQ", "TR"],
    ["SL", "SM", "SN", "SO", "SP", "TL", "TM"],
    ["SF", "SG", "SH", "SJ", "SK", "TF", "TG"],
    ["SA", "SB", "SC", "SD", "SE", "TA", "TB"],
    ["OV", "OW", "OX", "OY", "OZ", "OV", "OW"],
    ["OQ", "OR", "OS", "OT", "OU", "OQ", "OR"],
];

static REFERENCE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Z]{2})([0-9]*)$").expect("grid reference pattern is valid"));

/// Resolution of an encoded reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GridPrecision {
    OneMetre,
    TenMetres,
    #[default]
    HundredMetres,
    Kilometre,
    TenKilometres,
}

impl GridPrecision {
    pub const fn digits_per_axis(self) -> usize {
        match self {
            Self::OneMetre => 5,
            Self::TenMetres => 4,
            Self::HundredMetres => 3,
            Self::Kilometre => 2,
            Self::TenKilometres => 1,
        }
    }

    /// Side of the square a reference at this precision identifies, in metres.
    pub const fn metres(self) -> u32 {
        10u32.pow(5 - self.digits_per_axis() as u32)
    }
}

/// One 100 km square of the grid-letter table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridCell {
    column: usize,
    row: usize,
}

impl GridCell {
    fn from_letters(letters: &str) -> Option<Self> {
        GRID_LETTERS.iter().enumerate().find_map(|(row, cells)| {
            cells
                .iter()
                .position(|cell| *cell == letters)
                .map(|column| Self { column, row })
        })
    }

    fn containing(easting: f64, northing: f64) -> Option<Self> {
        if !(easting.is_finite() && northing.is_finite()) || easting < 0.0 || northing < 0.0 {
            return None;
        }
        let column = (easting / CELL_SIZE).floor() as usize;
        let row = (northing / CELL_SIZE).floor() as usize;
        (column < GRID_SIZE && row < GRID_SIZE).then_some(Self { column, row })
    }

    pub fn letters(self) -> &'static str {
        GRID_LETTERS[self.row][self.column]
    }

    /// South-west corner of the cell.
    pub fn origin(self) -> (f64, f64) {
        (self.column as f64 * CELL_SIZE, self.row as f64 * CELL_SIZE)
    }

    /// Whether the cell is one of the five southern rows covering Great Britain.
    pub const fn is_mainland(self) -> bool {
        self.row < MAINLAND_ROWS
    }
}

/// A parsed grid reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GridReference {
    cell: GridCell,
    easting: u32,
    northing: u32,
    digits_per_axis: usize,
}

impl GridReference {
    /// Parse a reference such as `"SU387148"`, `"su 3870 1480"` or `"TQ"`.
    pub fn parse(reference: &str) -> Result<Self> {
        let compact: String = reference
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_uppercase();
        let invalid = |reason| GridError::InvalidGridReference {
            reference: reference.to_owned(),
            reason,
        };

        let captures = REFERENCE_PATTERN
            .captures(&compact)
            .ok_or_else(|| invalid("expected two letters followed by digits"))?;
        let letters = &captures[1];
        let digits = &captures[2];

        if digits.len() % 2 != 0 {
            return Err(invalid("odd number of digits"));
        }
        if digits.len() > MAX_DIGITS {
            return Err(invalid("more than ten digits"));
        }
        let cell = GridCell::from_letters(letters).ok_or_else(|| invalid("unknown grid letters"))?;

        let half = digits.len() / 2;
        let parse_half = |part: &str| {
            if part.is_empty() {
                Ok(0)
            } else {
                part.parse::<u32>().map_err(|_| invalid("malformed digits"))
            }
        };
        let parsed = Self {
            cell,
            easting: parse_half(&digits[..half])?,
            northing: parse_half(&digits[half..])?,
            digits_per_axis: half,
        };
        trace!(reference, letters, digits, "Parsed grid reference");
        Ok(parsed)
    }

    /// Reference for the square containing `(easting, northing)`.
    ///
    /// Digits are truncated, never rounded, so the result names the square the point
    /// lies in.
    pub fn from_easting_northing(
        easting: f64,
        northing: f64,
        precision: GridPrecision,
    ) -> Result<Self> {
        let cell = GridCell::containing(easting, northing)
            .ok_or(GridError::OutOfGridRange { easting, northing })?;
        let (origin_e, origin_n) = cell.origin();
        let scale = precision.metres();
        Ok(Self {
            cell,
            easting: (easting - origin_e).floor() as u32 / scale,
            northing: (northing - origin_n).floor() as u32 / scale,
            digits_per_axis: precision.digits_per_axis(),
        })
    }

    pub const fn cell(&self) -> GridCell {
        self.cell
    }

    pub const fn is_mainland(&self) -> bool {
        self.cell.is_mainland()
    }

    /// South-west corner of the referenced square in EPSG:27700 metres.
    pub fn to_easting_northing(&self) -> (f64, f64) {
        let scale = f64::from(10u32.pow(5 - self.digits_per_axis as u32));
        let (origin_e, origin_n) = self.cell.origin();
        (
            origin_e + f64::from(self.easting) * scale,
            origin_n + f64::from(self.northing) * scale,
        )
    }
}

impl fmt::Display for GridReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self.digits_per_axis;
        write!(f, "{}", self.cell.letters())?;
        if width > 0 {
            write!(f, "{:0width$}{:0width$}", self.easting, self.northing)?;
        }
        Ok(())
    }
}

/// Decode a grid reference to the easting/northing of its south-west corner.
pub fn decode_grid_ref(reference: &str) -> Result<(f64, f64)> {
    GridReference::parse(reference).map(|parsed| parsed.to_easting_northing())
}

/// Encode an easting/northing as an 8 character, 100 m reference.
pub fn encode_grid_ref(easting: f64, northing: f64) -> Result<String> {
    encode_grid_ref_with_precision(easting, northing, GridPrecision::default())
}

pub fn encode_grid_ref_with_precision(
    easting: f64,
    northing: f64,
    precision: GridPrecision,
) -> Result<String> {
    GridReference::from_easting_northing(easting, northing, precision).map(|r| r.to_string())
}

mod error {
    use thiserror::Error;

    #[derive(Error, Debug, Clone, PartialEq)]
    pub enum GridError {
        #[error("Invalid grid reference {reference:?}: {reason}")]
        InvalidGridReference {
            reference: String,
            reason: &'static str,
        },
        #[error("Easting/northing ({easting}, {northing}) is outside the national grid")]
        OutOfGridRange { easting: f64, northing: f64 },
    }

    pub type Result<T> = std::result::Result<T, GridError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_known_reference() {
        assert_eq!(decode_grid_ref("SU387148").unwrap(), (438_700.0, 114_800.0));
        assert_eq!(decode_grid_ref("su 387 148").unwrap(), (438_700.0, 114_800.0));
        assert_eq!(decode_grid_ref("TQ3003580437").unwrap(), (530_035.0, 180_437.0));
        assert_eq!(decode_grid_ref("SU3814").unwrap(), (438_000.0, 114_000.0));
        assert_eq!(decode_grid_ref("SU").unwrap(), (400_000.0, 100_000.0));
    }

    #[test]
    fn test_decode_rejects_malformed_references() {
        for reference in ["SU38714", "SU123456789012", "S387148", "XX387148", "SU38A148", "", "387148"] {
            assert!(
                matches!(
                    decode_grid_ref(reference),
                    Err(GridError::InvalidGridReference { .. })
                ),
                "{reference:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_encode_default_precision() {
        assert_eq!(encode_grid_ref(438_700.0, 114_800.0).unwrap(), "SU387148");
        assert_eq!(encode_grid_ref(438_799.9, 114_850.0).unwrap(), "SU387148");
        assert_eq!(encode_grid_ref(100.0, 0.0).unwrap(), "SV001000");
    }

    #[test]
    fn test_encode_with_precision() {
        let (e, n) = (438_765.0, 114_832.0);
        let encode = |p| encode_grid_ref_with_precision(e, n, p).unwrap();
        assert_eq!(encode(GridPrecision::OneMetre), "SU3876514832");
        assert_eq!(encode(GridPrecision::TenMetres), "SU38761483");
        assert_eq!(encode(GridPrecision::HundredMetres), "SU387148");
        assert_eq!(encode(GridPrecision::Kilometre), "SU3814");
        assert_eq!(encode(GridPrecision::TenKilometres), "SU31");
    }

    #[test]
    fn test_encode_out_of_range() {
        for (e, n) in [(-1.0, 100.0), (100.0, -1.0), (700_000.0, 100.0), (100.0, 700_000.0)] {
            assert!(matches!(
                encode_grid_ref(e, n),
                Err(GridError::OutOfGridRange { .. })
            ));
        }
        assert!(encode_grid_ref(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn test_mainland_round_trip() {
        for (row, cells) in GRID_LETTERS.iter().take(MAINLAND_ROWS).enumerate() {
            for (column, letters) in cells.iter().enumerate() {
                for digits in ["000000", "387148", "999999", "050901"] {
                    let reference = format!("{letters}{digits}");
                    let (e, n) = decode_grid_ref(&reference).unwrap();
                    assert_eq!(e.floor() as usize / 100_000, column);
                    assert_eq!(n.floor() as usize / 100_000, row);
                    assert_eq!(encode_grid_ref(e, n).unwrap(), reference);
                }
            }
        }
    }

    #[test]
    fn test_duplicated_cells_decode_to_first_occurrence() {
        let parsed = GridReference::parse("OV000000").unwrap();
        assert!(!parsed.is_mainland());
        assert_eq!(parsed.to_easting_northing(), (0.0, 500_000.0));

        // The eastern duplicate encodes with the same letters but does not decode back.
        let encoded = encode_grid_ref(500_000.0, 500_000.0).unwrap();
        assert_eq!(encoded, "OV000000");
        assert_ne!(decode_grid_ref(&encoded).unwrap(), (500_000.0, 500_000.0));
    }

    #[test]
    fn test_precision_sizes() {
        assert_eq!(GridPrecision::OneMetre.metres(), 1);
        assert_eq!(GridPrecision::default().metres(), 100);
        assert_eq!(GridPrecision::TenKilometres.metres(), 10_000);
    }
}
