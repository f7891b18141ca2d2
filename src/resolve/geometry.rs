//! Planar geometry on WGS84 longitude/latitude
//!
//! Containment uses even-odd ray casting directly on degrees, which is
//! exact enough for administrative polygons. Metric helpers use an
//! equirectangular approximation around the point of interest.

use serde::{Deserialize, Serialize};

/// Metres per degree of latitude (mean)
pub const METERS_PER_DEGREE: f64 = 111_320.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub lon: f64,
    pub lat: f64,
}

impl Point {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Finite and within WGS84 ranges
    pub fn is_valid(&self) -> bool {
        self.lon.is_finite()
            && self.lat.is_finite()
            && (-180.0..=180.0).contains(&self.lon)
            && (-90.0..=90.0).contains(&self.lat)
    }

    /// Move the point by `dx` metres east and `dy` metres north.
    pub fn offset_meters(&self, dx: f64, dy: f64) -> Point {
        let lat = self.lat + dy / METERS_PER_DEGREE;
        let lon = self.lon + dx / meters_per_degree_lon(self.lat);
        Point::new(lon.clamp(-180.0, 180.0), lat.clamp(-90.0, 90.0))
    }

    /// Approximate distance in metres
    pub fn distance_meters(&self, other: &Point) -> f64 {
        let mid_lat = (self.lat + other.lat) / 2.0;
        let dx = (other.lon - self.lon) * meters_per_degree_lon(mid_lat);
        let dy = (other.lat - self.lat) * METERS_PER_DEGREE;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Metres per degree of longitude at a latitude, floored near the poles
pub fn meters_per_degree_lon(lat: f64) -> f64 {
    (METERS_PER_DEGREE * lat.to_radians().cos()).max(1.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Self {
        Self {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        }
    }

    pub fn contains(&self, p: &Point) -> bool {
        p.lon >= self.min_lon && p.lon <= self.max_lon && p.lat >= self.min_lat && p.lat <= self.max_lat
    }

    fn of_ring(ring: &[Point]) -> Option<Self> {
        let first = ring.first()?;
        let mut bbox = BoundingBox::new(first.lon, first.lat, first.lon, first.lat);
        for p in &ring[1..] {
            bbox.min_lon = bbox.min_lon.min(p.lon);
            bbox.min_lat = bbox.min_lat.min(p.lat);
            bbox.max_lon = bbox.max_lon.max(p.lon);
            bbox.max_lat = bbox.max_lat.max(p.lat);
        }
        Some(bbox)
    }

    fn union(self, other: BoundingBox) -> BoundingBox {
        BoundingBox::new(
            self.min_lon.min(other.min_lon),
            self.min_lat.min(other.min_lat),
            self.max_lon.max(other.max_lon),
            self.max_lat.max(other.max_lat),
        )
    }
}

/// A polygon with an exterior ring and optional holes.
///
/// Rings may be open or closed; the closing edge is implied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    pub exterior: Vec<Point>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub holes: Vec<Vec<Point>>,
}

impl Polygon {
    pub fn new(exterior: Vec<Point>) -> Self {
        Self {
            exterior,
            holes: Vec::new(),
        }
    }

    /// Axis-aligned rectangle, handy for fixtures and grid cells
    pub fn rectangle(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Self {
        Self::new(vec![
            Point::new(min_lon, min_lat),
            Point::new(max_lon, min_lat),
            Point::new(max_lon, max_lat),
            Point::new(min_lon, max_lat),
        ])
    }

    pub fn with_hole(mut self, hole: Vec<Point>) -> Self {
        self.holes.push(hole);
        self
    }

    pub fn contains(&self, p: &Point) -> bool {
        ring_contains(&self.exterior, p) && !self.holes.iter().any(|h| ring_contains(h, p))
    }

    /// Planar area in square degrees, used only to rank overlapping features
    pub fn area(&self) -> f64 {
        let holes: f64 = self.holes.iter().map(|h| ring_area(h)).sum();
        (ring_area(&self.exterior) - holes).max(0.0)
    }

    pub fn bounding_box(&self) -> Option<BoundingBox> {
        BoundingBox::of_ring(&self.exterior)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MultiPolygon(pub Vec<Polygon>);

impl MultiPolygon {
    pub fn single(polygon: Polygon) -> Self {
        Self(vec![polygon])
    }

    pub fn contains(&self, p: &Point) -> bool {
        self.0.iter().any(|poly| poly.contains(p))
    }

    pub fn area(&self) -> f64 {
        self.0.iter().map(Polygon::area).sum()
    }

    pub fn bounding_box(&self) -> Option<BoundingBox> {
        self.0
            .iter()
            .filter_map(Polygon::bounding_box)
            .reduce(BoundingBox::union)
    }
}

/// Even-odd rule. Points exactly on an edge may fall either way.
fn ring_contains(ring: &[Point], p: &Point) -> bool {
    if ring.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = ring.len() - 1;
    for i in 0..ring.len() {
        let a = ring[i];
        let b = ring[j];
        if (a.lat > p.lat) != (b.lat > p.lat) {
            let x = (b.lon - a.lon) * (p.lat - a.lat) / (b.lat - a.lat) + a.lon;
            if p.lon < x {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Shoelace formula, absolute value
fn ring_area(ring: &[Point]) -> f64 {
    if ring.len() < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    let mut j = ring.len() - 1;
    for i in 0..ring.len() {
        sum += (ring[j].lon + ring[i].lon) * (ring[j].lat - ring[i].lat);
        j = i;
    }
    (sum / 2.0).abs()
}
