//! Point generalization primitives
//!
//! Both functions are pure and deterministic: the same input point (and
//! seed) always yields the same generalized point. Displacement is keyed:
//! without the secret namespace the offset cannot be recomputed from the
//! published occurrence id.

use crate::resolve::geometry::{meters_per_degree_lon, METERS_PER_DEGREE};
use crate::resolve::Point;
use uuid::Uuid;

/// Secret UUID v5 namespace for displacement offsets, derived from the
/// configured key
pub fn displacement_namespace(key: &str) -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, key.as_bytes())
}

/// Snap a point to the centre of its grid cell. Cells are `2 * radius`
/// metres on each side; rows are fixed in latitude, and column width
/// is computed at the row's centre latitude.
pub fn snap_to_grid(point: Point, radius_m: u32) -> Point {
    let side = 2.0 * f64::from(radius_m.max(1));

    let dlat = side / METERS_PER_DEGREE;
    let row = ((point.lat + 90.0) / dlat).floor();
    let lat = (-90.0 + (row + 0.5) * dlat).clamp(-90.0, 90.0);

    let dlon = side / meters_per_degree_lon(lat);
    let col = ((point.lon + 180.0) / dlon).floor();
    let lon = (-180.0 + (col + 0.5) * dlon).clamp(-180.0, 180.0);

    Point::new(lon, lat)
}

/// Worst-case distance between a point and its cell centre
pub fn grid_uncertainty(radius_m: u32) -> u32 {
    (f64::from(radius_m) * std::f64::consts::SQRT_2).ceil() as u32
}

/// Move a point by a pseudo-random offset of between half and the full
/// radius. The direction and distance derive from `seed` under `namespace`.
pub fn displace(point: Point, radius_m: u32, namespace: &Uuid, seed: &str) -> Point {
    let (dx, dy) = displacement_offset(radius_m, namespace, seed);
    point.offset_meters(dx, dy)
}

/// East and north offset in metres
fn displacement_offset(radius_m: u32, namespace: &Uuid, seed: &str) -> (f64, f64) {
    let bytes = Uuid::new_v5(namespace, seed.as_bytes()).into_bytes();
    let (head, tail) = bytes.split_at(8);
    let a = u64::from_le_bytes(head.try_into().unwrap_or([0; 8]));
    let b = u64::from_le_bytes(tail.try_into().unwrap_or([0; 8]));

    let unit_a = a as f64 / u64::MAX as f64;
    let unit_b = b as f64 / u64::MAX as f64;
    let angle = unit_a * std::f64::consts::TAU;
    let distance = f64::from(radius_m) * (0.5 + 0.5 * unit_b);

    (distance * angle.cos(), distance * angle.sin())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapped_point_is_within_the_cell() {
        let p = Point::new(18.0686, 59.3293);
        let snapped = snap_to_grid(p, 1_000);
        assert!(p.distance_meters(&snapped) <= f64::from(grid_uncertainty(1_000)) + 1.0);
        assert_ne!(p, snapped);
    }

    #[test]
    fn points_in_one_cell_share_a_centre() {
        let a = snap_to_grid(Point::new(18.0686, 59.3293), 5_000);
        let b = snap_to_grid(Point::new(18.0690, 59.3295), 5_000);
        assert_eq!(a, b);
    }

    #[test]
    fn snapping_a_centre_is_stable() {
        let once = snap_to_grid(Point::new(14.2, 57.8), 2_500);
        assert_eq!(snap_to_grid(once, 2_500), once);
    }

    // Undo an offset exactly: latitude first, then longitude at the
    // original latitude
    fn reverse(published: Point, (dx, dy): (f64, f64)) -> Point {
        let lat = published.lat - dy / METERS_PER_DEGREE;
        Point::new(published.lon - dx / meters_per_degree_lon(lat), lat)
    }

    #[test]
    fn displacement_is_seeded_and_bounded() {
        let ns = displacement_namespace("county-board-secret-0001");
        let p = Point::new(16.5, 62.1);
        let a = displace(p, 1_000, &ns, "urn:lsid:artportalen.se:sighting:1");
        let b = displace(p, 1_000, &ns, "urn:lsid:artportalen.se:sighting:1");
        let c = displace(p, 1_000, &ns, "urn:lsid:artportalen.se:sighting:2");
        assert_eq!(a, b);
        assert_ne!(a, c);

        let d = p.distance_meters(&a);
        assert!(d >= 499.0 && d <= 1_001.0, "displaced {} m", d);
    }

    #[test]
    fn displacement_depends_on_the_key() {
        let id = "urn:lsid:artportalen.se:Sighting:42";
        let p = Point::new(18.0686, 59.3293);
        let a = displace(p, 5_000, &displacement_namespace("first-secret-key-abcd"), id);
        let b = displace(p, 5_000, &displacement_namespace("second-secret-key-efgh"), id);
        assert_ne!(a, b);
    }

    #[test]
    fn published_point_cannot_be_reversed_without_the_key() {
        let id = "urn:lsid:artportalen.se:Sighting:42";
        let exact = Point::new(18.0686, 59.3293);
        let secret = displacement_namespace("county-board-secret-0001");
        let published = displace(exact, 5_000, &secret, id);

        let with_key = reverse(published, displacement_offset(5_000, &secret, id));
        assert!(with_key.distance_meters(&exact) < 1.0);

        for guess in ["", "sightings", "county-board-secret-0002"] {
            let offset = displacement_offset(5_000, &displacement_namespace(guess), id);
            let recovered = reverse(published, offset);
            assert!(
                recovered.distance_meters(&exact) > 50.0,
                "key {:?} recovered the exact point",
                guess
            );
        }
    }
}
