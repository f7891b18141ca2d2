//! Per-provider observation factories
//!
//! Each provider variant maps its own verbatim shape onto the canonical
//! observation. The processor picks one with [`create_factory`] and only
//! ever talks to `dyn ObservationFactory`.

mod artportalen;
mod clam_portal;
pub mod common;
mod dwca;
mod kul;
mod mvm;
mod nors;
mod sers;
mod shark;
mod traits;
mod virtual_herbarium;

pub use artportalen::ArtportalenObservationFactory;
pub use clam_portal::ClamPortalObservationFactory;
pub use dwca::DwcaObservationFactory;
pub use kul::KulObservationFactory;
pub use mvm::MvmObservationFactory;
pub use nors::NorsObservationFactory;
pub use sers::SersObservationFactory;
pub use shark::SharkObservationFactory;
pub use traits::{FactoryContext, FactoryError, ObservationFactory};
pub use virtual_herbarium::VirtualHerbariumObservationFactory;

use crate::model::{DataProvider, ProviderKind};
use std::sync::Arc;

/// Build the factory variant for a provider's kind.
pub fn create_factory(provider: DataProvider, context: FactoryContext) -> Arc<dyn ObservationFactory> {
    match provider.kind {
        ProviderKind::Artportalen => Arc::new(ArtportalenObservationFactory::new(provider, context)),
        ProviderKind::ClamPortal => Arc::new(ClamPortalObservationFactory::new(provider, context)),
        ProviderKind::Kul => Arc::new(KulObservationFactory::new(provider, context)),
        ProviderKind::Mvm => Arc::new(MvmObservationFactory::new(provider, context)),
        ProviderKind::Nors => Arc::new(NorsObservationFactory::new(provider, context)),
        ProviderKind::Sers => Arc::new(SersObservationFactory::new(provider, context)),
        ProviderKind::Shark => Arc::new(SharkObservationFactory::new(provider, context)),
        ProviderKind::VirtualHerbarium => Arc::new(VirtualHerbariumObservationFactory::new(provider, context)),
        ProviderKind::Dwca => Arc::new(DwcaObservationFactory::new(provider, context)),
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::{context, provider, COMMON, SENSITIVE_BIRD};
    use super::*;
    use crate::model::{DiffusionStatus, ProviderId, VerbatimRecord};
    use serde_json::json;

    fn sighting(id: i64, taxon: i32) -> VerbatimRecord {
        VerbatimRecord::new(
            ProviderId(1),
            id.to_string(),
            json!({
                "sightingId": id,
                "taxonId": taxon,
                "startDate": "2023-05-14",
                "site": { "latitude": 59.33, "longitude": 18.07, "accuracy": 10 }
            }),
        )
    }

    #[test]
    fn create_factory_dispatches_on_kind() {
        for kind in [
            ProviderKind::Artportalen,
            ProviderKind::ClamPortal,
            ProviderKind::Kul,
            ProviderKind::Mvm,
            ProviderKind::Nors,
            ProviderKind::Sers,
            ProviderKind::Shark,
            ProviderKind::VirtualHerbarium,
            ProviderKind::Dwca,
        ] {
            let factory = create_factory(provider(1, kind), context());
            assert_eq!(factory.provider().kind, kind);
        }
    }

    #[test]
    fn factories_are_deterministic() {
        let factory = create_factory(provider(1, ProviderKind::Artportalen), context());
        let a = factory.create_processed_observation(&sighting(5, SENSITIVE_BIRD), true).unwrap();
        let b = factory.create_processed_observation(&sighting(5, SENSITIVE_BIRD), true).unwrap();
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }

    #[test]
    fn processed_observation_is_diffused_only_when_asked() {
        let factory = create_factory(provider(1, ProviderKind::Artportalen), context());
        let exact = factory.create_processed_observation(&sighting(6, SENSITIVE_BIRD), false).unwrap();
        let public = factory.create_processed_observation(&sighting(6, SENSITIVE_BIRD), true).unwrap();

        assert_eq!(exact.diffusion_status, DiffusionStatus::NotDiffused);
        assert_eq!(public.diffusion_status, DiffusionStatus::Diffused);
        assert!(public.location.generalization_radius_in_meters.unwrap() >= 200);
    }

    #[test]
    fn public_copy_follows_sensitivity_and_provider() {
        let factory = create_factory(provider(1, ProviderKind::Artportalen), context());
        let common = factory.create_observation(&sighting(7, COMMON)).unwrap();
        assert_eq!(factory.public_copy(&common, true), Some(common.clone()));

        let sensitive = factory.create_observation(&sighting(8, SENSITIVE_BIRD)).unwrap();
        assert!(factory.public_copy(&sensitive, false).is_none());

        let no_diffusion = create_factory(provider(1, ProviderKind::Artportalen).with_diffusion(false), context());
        assert!(no_diffusion.public_copy(&sensitive, true).is_none());
    }
}
