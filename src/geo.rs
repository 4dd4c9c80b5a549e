//! Pure geometric primitives for geofence evaluation
//!
//! Everything here is side-effect free. Distances use the haversine formula
//! with the mean Earth radius; polygon tests treat coordinates as planar,
//! which holds up well for the small safe zones this engine deals with
//! (rings spanning < ~50 km). Polygons are not meant for continental
//! regions.

use serde::{Deserialize, Serialize};

use crate::types::{GuardianError, Result};

/// Mean Earth radius in meters
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A WGS84 coordinate pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Longitude in degrees, [-180, 180]
    pub lon: f64,
    /// Latitude in degrees, [-90, 90]
    pub lat: f64,
}

impl Point {
    /// Create a point without range checking
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Check coordinate ranges
    pub fn validate(&self) -> Result<()> {
        if !self.lat.is_finite() || !(-90.0..=90.0).contains(&self.lat) {
            return Err(GuardianError::InvalidInput(format!(
                "latitude out of range: {}",
                self.lat
            )));
        }
        if !self.lon.is_finite() || !(-180.0..=180.0).contains(&self.lon) {
            return Err(GuardianError::InvalidInput(format!(
                "longitude out of range: {}",
                self.lon
            )));
        }
        Ok(())
    }
}

/// Great-circle distance between two points in meters.
///
/// Symmetric, zero for identical points, never negative.
pub fn haversine_distance(a: Point, b: Point) -> f64 {
    let lat_a = a.lat.to_radians();
    let lat_b = b.lat.to_radians();
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lon = (b.lon - a.lon).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lon / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_M * h.sqrt().asin()
}

/// Whether a point lies within (or exactly on) a circle of `radius_m` meters.
pub fn point_in_circle(p: Point, center: Point, radius_m: f64) -> bool {
    haversine_distance(p, center) <= radius_m
}

/// Whether a point lies inside a polygon ring via ray casting.
///
/// The ring is implicitly closed (last point joined back to the first);
/// passing an explicitly closed ring is also accepted, the degenerate edge
/// contributes nothing. Rings with fewer than 3 points are rejected.
pub fn point_in_polygon(p: Point, ring: &[Point]) -> Result<bool> {
    if ring.len() < 3 {
        return Err(GuardianError::InvalidGeometry(format!(
            "polygon ring needs at least 3 points, got {}",
            ring.len()
        )));
    }

    let mut inside = false;
    let mut j = ring.len() - 1;
    for i in 0..ring.len() {
        let (xi, yi) = (ring[i].lon, ring[i].lat);
        let (xj, yj) = (ring[j].lon, ring[j].lat);

        let crosses = (yi > p.lat) != (yj > p.lat)
            && p.lon < (xj - xi) * (p.lat - yi) / (yj - yi) + xi;
        if crosses {
            inside = !inside;
        }
        j = i;
    }

    Ok(inside)
}

/// Whether a ring is simple (no two non-adjacent edges intersect).
///
/// O(n^2) over the edges; rings are small so this is only run when a
/// geofence is constructed, never per sample.
pub fn ring_is_simple(ring: &[Point]) -> Result<bool> {
    if ring.len() < 3 {
        return Err(GuardianError::InvalidGeometry(format!(
            "polygon ring needs at least 3 points, got {}",
            ring.len()
        )));
    }

    let n = ring.len();
    for i in 0..n {
        let a = ring[i];
        let b = ring[(i + 1) % n];
        for k in (i + 1)..n {
            // Skip edges sharing an endpoint with edge i
            if k == i || (k + 1) % n == i || k == (i + 1) % n {
                continue;
            }
            let c = ring[k];
            let d = ring[(k + 1) % n];
            if segments_intersect(a, b, c, d) {
                return Ok(false);
            }
        }
    }

    Ok(true)
}

/// Proper intersection test between segments ab and cd via orientation signs.
fn segments_intersect(a: Point, b: Point, c: Point, d: Point) -> bool {
    let o1 = orientation(a, b, c);
    let o2 = orientation(a, b, d);
    let o3 = orientation(c, d, a);
    let o4 = orientation(c, d, b);

    o1 != o2 && o3 != o4 && o1 != 0 && o2 != 0 && o3 != 0 && o4 != 0
}

fn orientation(a: Point, b: Point, c: Point) -> i8 {
    let cross = (b.lon - a.lon) * (c.lat - a.lat) - (b.lat - a.lat) * (c.lon - a.lon);
    if cross.abs() < f64::EPSILON {
        0
    } else if cross > 0.0 {
        1
    } else {
        -1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_zero_for_identical_points() {
        let p = Point::new(-74.0060, 40.7128);
        assert_eq!(haversine_distance(p, p), 0.0);
    }

    #[test]
    fn test_distance_symmetric() {
        let a = Point::new(-74.0060, 40.7128);
        let b = Point::new(-74.0100, 40.7200);
        assert_eq!(haversine_distance(a, b), haversine_distance(b, a));
    }

    #[test]
    fn test_known_distance_nyc_to_la() {
        // NYC to LA is roughly 3936 km
        let nyc = Point::new(-74.0060, 40.7128);
        let la = Point::new(-118.2437, 34.0522);
        let d = haversine_distance(nyc, la);
        assert!((d - 3_936_000.0).abs() < 10_000.0, "got {d}");
    }

    #[test]
    fn test_circle_boundary_is_inclusive() {
        let center = Point::new(-74.0060, 40.7128);
        let p = Point::new(-74.0100, 40.7200);
        let d = haversine_distance(p, center);
        assert!(point_in_circle(p, center, d));
        assert!(!point_in_circle(p, center, d - 0.001));
    }

    #[test]
    fn test_point_in_square() {
        let square = vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(0.0, 1.0),
        ];
        assert!(point_in_polygon(Point::new(0.5, 0.5), &square).unwrap());
        assert!(!point_in_polygon(Point::new(1.5, 0.5), &square).unwrap());
        assert!(!point_in_polygon(Point::new(-0.5, 0.5), &square).unwrap());
    }

    #[test]
    fn test_explicitly_closed_ring_accepted() {
        let square = vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(0.0, 1.0),
            Point::new(0.0, 0.0),
        ];
        assert!(point_in_polygon(Point::new(0.5, 0.5), &square).unwrap());
        assert!(!point_in_polygon(Point::new(2.0, 2.0), &square).unwrap());
    }

    #[test]
    fn test_degenerate_ring_rejected() {
        let two = vec![Point::new(0.0, 0.0), Point::new(1.0, 1.0)];
        assert!(matches!(
            point_in_polygon(Point::new(0.5, 0.5), &two),
            Err(GuardianError::InvalidGeometry(_))
        ));
    }

    #[test]
    fn test_simple_ring_detected() {
        let square = vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(0.0, 1.0),
        ];
        assert!(ring_is_simple(&square).unwrap());
    }

    #[test]
    fn test_bowtie_ring_rejected() {
        // Hourglass: edges (0,0)-(1,1) and (1,0)-(0,1) cross
        let bowtie = vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(1.0, 0.0),
            Point::new(0.0, 1.0),
        ];
        assert!(!ring_is_simple(&bowtie).unwrap());
    }

    #[test]
    fn test_coordinate_validation() {
        assert!(Point::new(-74.0, 40.7).validate().is_ok());
        assert!(Point::new(-181.0, 0.0).validate().is_err());
        assert!(Point::new(0.0, 91.0).validate().is_err());
        assert!(Point::new(f64::NAN, 0.0).validate().is_err());
    }
}
