//! Diffusion of sensitive observation locations
//!
//! The diffusion manager replaces the exact point of a sensitive
//! observation with a generalized one. It only ever touches the location
//! and the diffusion status; the caller keeps the exact copy for the
//! protected partition.

mod generalize;

pub use generalize::{displace, displacement_namespace, grid_uncertainty, snap_to_grid};

use crate::config::{DiffusionConfig, DiffusionMode};
use crate::model::{DiffusionStatus, Observation, NOT_SENSITIVE};

#[derive(Debug, Clone)]
pub struct DiffusionManager {
    config: DiffusionConfig,
    displacement_ns: Option<uuid::Uuid>,
}

impl DiffusionManager {
    pub fn new(config: DiffusionConfig) -> Self {
        let displacement_ns = config
            .displacement_key
            .as_ref()
            .map(|key| displacement_namespace(key.expose()));
        if config.mode == DiffusionMode::Displace && displacement_ns.is_none() {
            tracing::warn!("displace mode without a displacement key, snapping to grid instead");
        }
        Self {
            config,
            displacement_ns,
        }
    }

    /// The mode actually applied; displacement needs a key
    pub fn mode(&self) -> DiffusionMode {
        match (self.config.mode, self.displacement_ns) {
            (DiffusionMode::Displace, None) => DiffusionMode::Grid,
            (mode, _) => mode,
        }
    }

    /// Configured minimum radius for a category.
    ///
    /// A category without its own entry uses the closest lower configured
    /// category, or the lowest configured one when nothing lower exists.
    pub fn category_min_radius(&self, category: u8) -> u32 {
        let radii = &self.config.category_min_radius_m;
        radii
            .range(..=category)
            .next_back()
            .or_else(|| radii.iter().next())
            .map(|(_, &radius)| radius)
            .unwrap_or(0)
    }

    /// `max(taxon disturbance radius, category minimum)`
    pub fn required_radius(&self, category: u8, disturbance_radius_m: Option<u32>) -> u32 {
        disturbance_radius_m
            .unwrap_or(0)
            .max(self.category_min_radius(category))
    }

    /// Generalize the observation's location in place.
    ///
    /// Not-sensitive observations are left alone. An observation that is
    /// already diffused with at least the required radius is left alone too,
    /// so applying twice is the same as applying once.
    pub fn apply(&self, observation: &mut Observation) {
        let category = observation.sensitivity_category();
        if category <= NOT_SENSITIVE {
            return;
        }

        let disturbance = observation.taxon.as_ref().and_then(|t| t.disturbance_radius_m);
        let radius = self.required_radius(category, disturbance);

        if observation.diffusion_status == DiffusionStatus::Diffused
            && observation
                .location
                .generalization_radius_in_meters
                .is_some_and(|applied| applied >= radius)
        {
            return;
        }

        let location = &mut observation.location;
        if let Some(point) = location.point() {
            let existing = location.coordinate_uncertainty_in_meters.unwrap_or(0);
            let (generalized, uncertainty) = match self.displacement_ns {
                Some(ns) if self.config.mode == DiffusionMode::Displace => (
                    displace(point, radius, &ns, &observation.occurrence.occurrence_id),
                    existing.saturating_add(radius),
                ),
                _ => (
                    snap_to_grid(point, radius),
                    existing.max(grid_uncertainty(radius)),
                ),
            };
            location.decimal_latitude = Some(generalized.lat);
            location.decimal_longitude = Some(generalized.lon);
            location.coordinate_uncertainty_in_meters = Some(uncertainty);
        }

        // Diffused copies never carry the site name
        location.locality = None;
        location.generalization_radius_in_meters = Some(radius);
        observation.diffusion_status = DiffusionStatus::Diffused;

        tracing::trace!(
            occurrence_id = %observation.occurrence.occurrence_id,
            category,
            radius,
            "location diffused"
        );
    }

    /// Diffused copy of `observation`; the argument is untouched.
    pub fn apply_to(&self, observation: &Observation) -> Observation {
        let mut copy = observation.clone();
        self.apply(&mut copy);
        copy
    }
}

impl Default for DiffusionManager {
    fn default() -> Self {
        Self::new(DiffusionConfig::default())
    }
}
