//! Points and bounding boxes tagged with their coordinate reference system.

use std::f64::consts::TAU;

use geo::{Area, Coord, LineString, Polygon, Rect};
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::crs::{CrsCode, CrsError, TransformPoint};

/// A single position in a known CRS. Geographic systems store longitude in `x`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub crs: CrsCode,
}

impl Point {
    pub const fn new(x: f64, y: f64, crs: CrsCode) -> Self {
        Self { x, y, crs }
    }

    pub const fn coordinates(&self) -> [f64; 2] {
        [self.x, self.y]
    }

    /// Reproject through `transformer`, which must start from this point's CRS.
    pub fn transform(&self, transformer: &dyn TransformPoint) -> Result<Self, CrsError> {
        check_source(self.crs, transformer)?;
        let (x, y) = transformer.transform(self.x, self.y)?;
        Ok(Self::new(x, y, transformer.target()))
    }

    /// Planar distance to `(x, y)`, in this point's CRS units.
    pub fn distance_to(&self, x: f64, y: f64) -> f64 {
        (self.x - x).hypot(self.y - y)
    }
}

fn check_source(crs: CrsCode, transformer: &dyn TransformPoint) -> Result<(), CrsError> {
    if crs == transformer.source() {
        Ok(())
    } else {
        Err(CrsError::Mismatch {
            expected: transformer.source(),
            found: crs,
        })
    }
}

/// An axis-aligned box given by two opposite corners.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    pub crs: CrsCode,
}

impl BoundingBox {
    pub const fn new(x1: f64, y1: f64, x2: f64, y2: f64, crs: CrsCode) -> Self {
        Self { x1, y1, x2, y2, crs }
    }

    /// Box from a `[x1, y1, x2, y2]` array as sent by map clients.
    pub const fn from_array(bbox: [f64; 4], crs: CrsCode) -> Self {
        Self::new(bbox[0], bbox[1], bbox[2], bbox[3], crs)
    }

    fn corners(&self) -> [(f64, f64); 4] {
        let rect = self.to_rect();
        let (min, max) = (rect.min(), rect.max());
        [(min.x, min.y), (min.x, max.y), (max.x, max.y), (max.x, min.y)]
    }

    /// Reproject the two defining corners.
    pub fn transform(&self, transformer: &dyn TransformPoint) -> Result<Self, CrsError> {
        check_source(self.crs, transformer)?;
        let (x1, y1) = transformer.transform(self.x1, self.y1)?;
        let (x2, y2) = transformer.transform(self.x2, self.y2)?;
        Ok(Self::new(x1, y1, x2, y2, transformer.target()))
    }

    pub fn to_rect(&self) -> Rect<f64> {
        Rect::new(
            Coord {
                x: self.x1,
                y: self.y1,
            },
            Coord {
                x: self.x2,
                y: self.y2,
            },
        )
    }

    /// Area after projecting all four corners into the transformer's target CRS.
    pub fn area_in(&self, transformer: &dyn TransformPoint) -> Result<f64, CrsError> {
        check_source(self.crs, transformer)?;
        let ring = self
            .corners()
            .into_iter()
            .map(|(x, y)| transformer.transform(x, y))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Polygon::new(LineString::from(ring), vec![]).unsigned_area())
    }

    /// Extended WKT, e.g. `SRID=4326;POLYGON ((0 0, 0 1, 1 1, 1 0, 0 0))`.
    pub fn to_ewkt(&self) -> String {
        let corners = self.corners();
        let ring = corners
            .iter()
            .chain(corners.first())
            .map(|(x, y)| format!("{x} {y}"))
            .join(", ");
        format!("SRID={};POLYGON (({ring}))", self.crs.code())
    }
}

/// Closed ring approximating a circle of `radius` around `center`, in `center`'s units.
pub fn buffer_ring(center: &Point, radius: f64, segments: usize) -> Vec<[f64; 2]> {
    let segments = segments.max(3);
    (0..=segments)
        .map(|step| {
            let angle = TAU * (step % segments) as f64 / segments as f64;
            [
                center.x + radius * angle.cos(),
                center.y + radius * angle.sin(),
            ]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crs::CrsTransformer;

    #[test]
    fn test_point_transform_checks_source() {
        let to_mercator = CrsTransformer::new(CrsCode::WGS84, CrsCode::WEB_MERCATOR).unwrap();
        let point = Point::new(0.0, 0.0, CrsCode::WGS84);
        let projected = point.transform(&to_mercator).unwrap();
        assert_eq!(projected.crs, CrsCode::WEB_MERCATOR);

        let wrong = Point::new(0.0, 0.0, CrsCode::BRITISH_NATIONAL_GRID);
        assert!(matches!(
            wrong.transform(&to_mercator),
            Err(CrsError::Mismatch { .. })
        ));
    }

    #[test]
    fn test_area_in_projected_crs() {
        let identity = CrsTransformer::new(CrsCode::WEB_MERCATOR, CrsCode::WEB_MERCATOR).unwrap();
        let bbox = BoundingBox::new(10_000.0, 0.0, 0.0, 5_000.0, CrsCode::WEB_MERCATOR);
        assert!((bbox.area_in(&identity).unwrap() - 5.0e7).abs() < 1e-6);
    }

    #[test]
    fn test_geographic_area_is_metric() {
        let to_mercator = CrsTransformer::new(CrsCode::WGS84, CrsCode::WEB_MERCATOR).unwrap();
        let bbox = BoundingBox::new(0.0, 0.0, 0.1, 0.1, CrsCode::WGS84);
        let area = bbox.area_in(&to_mercator).unwrap();
        // Roughly 11.1 km on each side at the equator.
        assert!((area - 1.239e8).abs() < 1e6, "area = {area}");
    }

    #[test]
    fn test_ewkt_rendering() {
        let bbox = BoundingBox::new(1.0, 2.0, 0.0, 0.5, CrsCode::WGS84);
        assert_eq!(
            bbox.to_ewkt(),
            "SRID=4326;POLYGON ((0 0.5, 0 2, 1 2, 1 0.5, 0 0.5))"
        );
    }

    #[test]
    fn test_buffer_ring_is_closed() {
        let center = Point::new(100.0, 200.0, CrsCode::WEB_MERCATOR);
        let ring = buffer_ring(&center, 50.0, 32);
        assert_eq!(ring.len(), 33);
        assert_eq!(ring.first(), ring.last());
        for [x, y] in &ring {
            assert!((center.distance_to(*x, *y) - 50.0).abs() < 1e-9);
        }
    }
}
