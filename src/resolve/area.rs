//! Area enricher: point-in-polygon lookup of administrative areas
//!
//! Feature envelopes are bulk-loaded into an R-tree; a lookup first
//! narrows candidates by envelope and then tests exact containment.

use super::geometry::{MultiPolygon, Point};
use crate::model::{Area, AreaType, Location};
use rstar::{RTree, RTreeObject, AABB};
use std::collections::HashMap;

struct AreaFeature {
    area: Area,
    geometry: MultiPolygon,
    /// Planar area, used to prefer the most specific feature on overlap
    extent: f64,
}

/// R-tree entry pointing back into the feature list
struct IndexedFeature {
    slot: usize,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for IndexedFeature {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Read-only spatial index of administrative areas.
///
/// Safe to share between workers; nothing is mutated after `new()`.
pub struct AreaEnricher {
    features: Vec<AreaFeature>,
    by_key: HashMap<(AreaType, String), usize>,
    tree: RTree<IndexedFeature>,
}

impl std::fmt::Debug for AreaEnricher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AreaEnricher")
            .field("features", &self.features.len())
            .finish_non_exhaustive()
    }
}

impl AreaEnricher {
    /// Build the index. Features with empty geometry are kept for
    /// `get_geometry` but can never match a point.
    pub fn new(features: Vec<(Area, MultiPolygon)>) -> Self {
        let mut stored = Vec::with_capacity(features.len());
        let mut by_key = HashMap::with_capacity(features.len());
        let mut entries = Vec::with_capacity(features.len());

        for (area, geometry) in features {
            let slot = stored.len();
            if let Some(bbox) = geometry.bounding_box() {
                entries.push(IndexedFeature {
                    slot,
                    envelope: AABB::from_corners(
                        [bbox.min_lon, bbox.min_lat],
                        [bbox.max_lon, bbox.max_lat],
                    ),
                });
            }
            by_key.insert((area.area_type, area.feature_id.clone()), slot);
            stored.push(AreaFeature {
                extent: geometry.area(),
                area,
                geometry,
            });
        }

        Self {
            features: stored,
            by_key,
            tree: RTree::bulk_load(entries),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    fn containing(&self, point: &Point) -> impl Iterator<Item = &AreaFeature> + '_ {
        let probe = AABB::from_point([point.lon, point.lat]);
        let point = *point;
        self.tree
            .locate_in_envelope_intersecting(&probe)
            .map(move |entry| &self.features[entry.slot])
            .filter(move |feature| feature.geometry.contains(&point))
    }

    /// Every feature whose polygon contains the point, ordered by area type
    /// and feature id. Points outside all polygons yield an empty list.
    pub fn get_point_features(&self, point: Point) -> Vec<&Area> {
        if !point.is_valid() {
            return Vec::new();
        }
        let mut areas: Vec<&Area> = self.containing(&point).map(|f| &f.area).collect();
        areas.sort_by(|a, b| {
            a.area_type
                .cmp(&b.area_type)
                .then_with(|| a.feature_id.cmp(&b.feature_id))
        });
        areas
    }

    pub fn get_geometry(&self, area_type: AreaType, feature_id: &str) -> Option<&MultiPolygon> {
        self.by_key
            .get(&(area_type, feature_id.to_string()))
            .map(|&slot| &self.features[slot].geometry)
    }

    /// Best feature of one type: the smallest containing polygon, ties
    /// broken by feature id.
    pub fn best_match(&self, point: Point, area_type: AreaType) -> Option<&Area> {
        if !point.is_valid() {
            return None;
        }
        self.containing(&point)
            .filter(|f| f.area.area_type == area_type)
            .min_by(|a, b| {
                a.extent
                    .total_cmp(&b.extent)
                    .then_with(|| a.area.feature_id.cmp(&b.area.feature_id))
            })
            .map(|f| &f.area)
    }

    /// Replace the location's area references with the best match per
    /// area type for its current coordinates. Locations without usable
    /// coordinates end up with no areas.
    pub fn enrich(&self, location: &mut Location) {
        location.clear_areas();
        let Some(point) = location.point() else {
            return;
        };
        for area_type in AreaType::ALL {
            if let Some(area) = self.best_match(point, area_type) {
                location.set_area(area.clone());
            }
        }
    }
}
