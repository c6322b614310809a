//! Coordinate reference system handling.
//!
//! Wraps `proj4rs` behind a small adapter: CRS identifiers are resolved to EPSG codes,
//! projection pairs are built once and reused, and every transform works in the
//! "always xy" convention (longitude first, degrees for geographic systems).

use std::{
    fmt,
    str::FromStr,
    sync::{Arc, PoisonError, RwLock},
};

use ahash::AHashMap as HashMap;
use proj4rs::proj::Proj;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, trace};

pub use error::CrsError;
use error::Result;

struct CrsDefinition {
    code: u32,
    name: &'static str,
    proj: &'static str,
    geographic: bool,
}

const WEB_MERCATOR: &str =
    "+proj=merc +a=6378137 +b=6378137 +lat_ts=0 +lon_0=0 +x_0=0 +y_0=0 +k=1 +units=m +no_defs";

// OSGB36 datum shift uses the published seven-parameter Helmert transformation.
const DEFINITIONS: &[CrsDefinition] = &[
    CrsDefinition {
        code: 4326,
        name: "WGS 84",
        proj: "+proj=longlat +datum=WGS84 +no_defs",
        geographic: true,
    },
    CrsDefinition {
        code: 4258,
        name: "ETRS89",
        proj: "+proj=longlat +ellps=GRS80 +towgs84=0,0,0,0,0,0,0 +no_defs",
        geographic: true,
    },
    CrsDefinition {
        code: 4277,
        name: "OSGB36",
        proj: "+proj=longlat +ellps=airy \
               +towgs84=446.448,-125.157,542.06,0.15,0.247,0.842,-20.489 +no_defs",
        geographic: true,
    },
    CrsDefinition {
        code: 3857,
        name: "WGS 84 / Pseudo-Mercator",
        proj: WEB_MERCATOR,
        geographic: false,
    },
    CrsDefinition {
        code: 900_913,
        name: "Google Maps Global Mercator",
        proj: WEB_MERCATOR,
        geographic: false,
    },
    CrsDefinition {
        code: 27700,
        name: "OSGB36 / British National Grid",
        proj: "+proj=tmerc +lat_0=49 +lon_0=-2 +k=0.9996012717 +x_0=400000 +y_0=-100000 \
               +ellps=airy +towgs84=446.448,-125.157,542.06,0.15,0.247,0.842,-20.489 \
               +units=m +no_defs",
        geographic: false,
    },
];

fn definition(code: u32) -> Option<&'static CrsDefinition> {
    DEFINITIONS.iter().find(|def| def.code == code)
}

/// The set of coordinate reference systems this crate can build transforms for.
pub struct CrsRegistry;

impl CrsRegistry {
    pub fn contains(code: u32) -> bool {
        definition(code).is_some()
    }

    pub fn supported() -> impl Iterator<Item = CrsCode> {
        DEFINITIONS.iter().map(|def| CrsCode(def.code))
    }
}

/// A resolved, supported EPSG code.
///
/// Construction goes through [`CrsCode::new`] or parsing, both of which reject codes
/// without a known definition, so holding a `CrsCode` means a transform can be built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CrsCode(u32);

impl CrsCode {
    pub const WGS84: Self = Self(4326);
    pub const WEB_MERCATOR: Self = Self(3857);
    pub const BRITISH_NATIONAL_GRID: Self = Self(27700);

    pub fn new(code: u32) -> Result<Self> {
        definition(code)
            .map(|_| Self(code))
            .ok_or_else(|| CrsError::InvalidCrs(code.to_string()))
    }

    /// Resolve an identifier such as `"EPSG:4326"`, `"epsg:27700"` or `"3857"`.
    pub fn parse(identifier: &str) -> Result<Self> {
        let trimmed = identifier.trim();
        let code = match trimmed.split_once(':') {
            Some((authority, code)) if authority.trim().eq_ignore_ascii_case("EPSG") => code.trim(),
            Some(_) => return Err(CrsError::InvalidCrs(identifier.to_owned())),
            None => trimmed,
        };
        let code = code
            .parse::<u32>()
            .map_err(|_| CrsError::InvalidCrs(identifier.to_owned()))?;
        Self::new(code).map_err(|_| CrsError::InvalidCrs(identifier.to_owned()))
    }

    pub const fn code(self) -> u32 {
        self.0
    }

    pub fn is_geographic(self) -> bool {
        definition(self.0).is_some_and(|def| def.geographic)
    }

    pub fn name(self) -> &'static str {
        definition(self.0).map_or("unknown", |def| def.name)
    }

    fn proj(self) -> Result<Proj> {
        let def = definition(self.0).ok_or_else(|| CrsError::InvalidCrs(self.to_string()))?;
        Proj::from_proj_string(def.proj).map_err(|e| {
            CrsError::InvalidCrs(format!("{self}: {e}"))
        })
    }
}

/// Resolve a CRS identifier string to its numeric EPSG code.
pub fn resolve_numeric_code(identifier: &str) -> Result<u32> {
    CrsCode::parse(identifier).map(CrsCode::code)
}

impl fmt::Display for CrsCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.0)
    }
}

impl FromStr for CrsCode {
    type Err = CrsError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for CrsCode {
    type Error = CrsError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl TryFrom<u32> for CrsCode {
    type Error = CrsError;

    fn try_from(value: u32) -> Result<Self> {
        Self::new(value)
    }
}

impl From<CrsCode> for String {
    fn from(value: CrsCode) -> Self {
        value.to_string()
    }
}

/// Something that moves coordinates from one CRS to another.
///
/// [`CrsTransformer`] is the real implementation; the trait is the seam geocoders and
/// search depend on.
pub trait TransformPoint: Send + Sync {
    fn source(&self) -> CrsCode;

    fn target(&self) -> CrsCode;

    fn transform(&self, x: f64, y: f64) -> Result<(f64, f64)>;
}

/// A prepared projection pair.
///
/// Building the pair parses both definitions, so construct once per CRS pair and share.
pub struct CrsTransformer {
    from: CrsCode,
    to: CrsCode,
    src: Proj,
    dst: Proj,
}

impl fmt::Debug for CrsTransformer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrsTransformer")
            .field("from", &self.from)
            .field("to", &self.to)
            .finish_non_exhaustive()
    }
}

impl CrsTransformer {
    #[instrument(name = "Build CRS transformer", level = "debug")]
    pub fn new(from: CrsCode, to: CrsCode) -> Result<Self> {
        Ok(Self {
            from,
            to,
            src: from.proj()?,
            dst: to.proj()?,
        })
    }

    pub fn from_identifiers(from: &str, to: &str) -> Result<Self> {
        Self::new(CrsCode::parse(from)?, CrsCode::parse(to)?)
    }

    pub fn inverse(&self) -> Result<Self> {
        Self::new(self.to, self.from)
    }

    fn transform_error(&self, x: f64, y: f64, reason: impl Into<String>) -> CrsError {
        CrsError::Transform {
            x,
            y,
            from: self.from,
            to: self.to,
            reason: reason.into(),
        }
    }

    fn project(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        if !x.is_finite() || !y.is_finite() {
            return Err(self.transform_error(x, y, "coordinates are not finite"));
        }
        if self.from.is_geographic() && (x.abs() > 180.0 || y.abs() > 90.0) {
            return Err(self.transform_error(x, y, "outside the geographic domain"));
        }
        if self.from == self.to {
            return Ok((x, y));
        }

        let mut point = if self.from.is_geographic() {
            (x.to_radians(), y.to_radians(), 0.0)
        } else {
            (x, y, 0.0)
        };
        proj4rs::transform::transform(&self.src, &self.dst, &mut point)
            .map_err(|e| self.transform_error(x, y, e.to_string()))?;

        let (out_x, out_y) = if self.to.is_geographic() {
            (point.0.to_degrees(), point.1.to_degrees())
        } else {
            (point.0, point.1)
        };
        if !out_x.is_finite() || !out_y.is_finite() {
            return Err(self.transform_error(x, y, "projection produced a non-finite result"));
        }
        trace!(x, y, out_x, out_y, from = %self.from, to = %self.to, "Transformed point");
        Ok((out_x, out_y))
    }
}

impl TransformPoint for CrsTransformer {
    fn source(&self) -> CrsCode {
        self.from
    }

    fn target(&self) -> CrsCode {
        self.to
    }

    fn transform(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        self.project(x, y)
    }
}

/// One-off transform. Prefer a shared [`CrsTransformer`] in hot paths.
pub fn transform_point(x: f64, y: f64, from: &str, to: &str) -> Result<(f64, f64)> {
    CrsTransformer::from_identifiers(from, to)?.transform(x, y)
}

/// Lazily built transformers, one per distinct `(from, to)` pair.
#[derive(Debug, Default)]
pub struct TransformerCache {
    transformers: RwLock<HashMap<(CrsCode, CrsCode), Arc<CrsTransformer>>>,
}

impl TransformerCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, from: CrsCode, to: CrsCode) -> Result<Arc<CrsTransformer>> {
        if let Some(existing) = self
            .transformers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(from, to))
        {
            return Ok(Arc::clone(existing));
        }

        let built = Arc::new(CrsTransformer::new(from, to)?);
        let mut transformers = self
            .transformers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let transformer = Arc::clone(transformers.entry((from, to)).or_insert(built));
        debug!(%from, %to, cached = transformers.len(), "Cached CRS transformer");
        Ok(transformer)
    }

    pub fn len(&self) -> usize {
        self.transformers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

mod error {
    use thiserror::Error;

    use super::CrsCode;

    #[derive(Error, Debug, Clone, PartialEq)]
    pub enum CrsError {
        #[error("Invalid CRS: {0}")]
        InvalidCrs(String),
        #[error("Cannot transform ({x}, {y}) from {from} to {to}: {reason}")]
        Transform {
            x: f64,
            y: f64,
            from: CrsCode,
            to: CrsCode,
            reason: String,
        },
        #[error("Point is in {found} but the transformer expects {expected}")]
        Mismatch { expected: CrsCode, found: CrsCode },
    }

    pub type Result<T> = std::result::Result<T, CrsError>;
}
