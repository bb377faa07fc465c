// THEORY:
// The `Registry` is the read-only catalog of vision profiles. It is populated
// once, validated once, and then only ever read: `lookup` by identifier and
// `list_profiles` in a stable presentation order.
//
// Validation happens here and nowhere else. Every profile's coefficient tuple is
// checked when the registry is built, so the render loop can treat transforms as
// total functions and never has to handle a bad profile mid-frame.
//
// A process-wide registry holding the built-in species is available through
// `Registry::global()`. Independent registries (tests, embedders with their own
// species) are built with `Registry::with_profiles` and shared behind an `Arc`.

use crate::core_modules::vision_model::{Species, VisionProfile};
use crate::error::{Result, VisionError};
use std::sync::{Arc, OnceLock};

static GLOBAL_REGISTRY: OnceLock<Arc<Registry>> = OnceLock::new();

#[derive(Debug)]
pub struct Registry {
    profiles: Vec<VisionProfile>,
}

impl Registry {
    /// Builds a registry, rejecting invalid tuples and duplicate identifiers.
    pub fn with_profiles(profiles: impl IntoIterator<Item = VisionProfile>) -> Result<Self> {
        let mut accepted: Vec<VisionProfile> = Vec::new();
        for profile in profiles {
            profile.validate()?;
            if accepted.iter().any(|p| p.id == profile.id) {
                return Err(VisionError::InvalidProfile {
                    id: profile.id.to_string(),
                    reason: "identifier registered twice".to_string(),
                });
            }
            accepted.push(profile);
        }
        Ok(Self { profiles: accepted })
    }

    /// The built-in species catalog.
    pub fn builtin() -> Result<Self> {
        Self::with_profiles(Species::ALL.into_iter().map(Species::profile))
    }

    /// The process-wide built-in registry.
    ///
    /// Panics on first use if a built-in profile fails validation.
    pub fn global() -> Arc<Registry> {
        GLOBAL_REGISTRY
            .get_or_init(|| match Self::builtin() {
                Ok(registry) => Arc::new(registry),
                Err(e) => panic!("built-in vision profiles are broken: {e}"),
            })
            .clone()
    }

    pub fn lookup(&self, id: &str) -> Result<VisionProfile> {
        self.profiles
            .iter()
            .find(|p| p.id == id)
            .copied()
            .ok_or_else(|| VisionError::UnknownProfile(id.to_string()))
    }

    pub fn list_profiles(&self) -> &[VisionProfile] {
        &self.profiles
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::vision_model::{Reprojection, VisionModel};

    fn gray() -> VisionProfile {
        VisionProfile::new(
            "gray",
            "Gray",
            "◻",
            VisionModel {
                reprojection: Reprojection::IDENTITY,
                saturation: 0.0,
                brightness: 1.0,
            },
        )
    }

    #[test]
    fn builtin_order_is_stable() {
        let registry = Registry::global();
        let ids: Vec<_> = registry.list_profiles().iter().map(|p| p.id).collect();
        assert_eq!(ids, ["dog", "cat"]);
        assert!(Arc::ptr_eq(&registry, &Registry::global()));
    }

    #[test]
    fn every_listed_profile_can_be_looked_up() {
        let registry = Registry::global();
        for profile in registry.list_profiles() {
            assert_eq!(registry.lookup(profile.id).unwrap(), *profile);
        }
    }

    #[test]
    fn unlisted_identifiers_are_unknown() {
        let registry = Registry::global();
        for id in ["", "Dog", "bird", "dog "] {
            match registry.lookup(id) {
                Err(VisionError::UnknownProfile(missing)) => assert_eq!(missing, id),
                other => panic!("expected UnknownProfile for {id:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn custom_registry_accepts_new_tuples() {
        let registry = Registry::with_profiles([Species::Dog.profile(), gray()]).unwrap();
        assert_eq!(registry.lookup("gray").unwrap().name, "Gray");
        assert_eq!(registry.list_profiles().len(), 2);
    }

    #[test]
    fn duplicate_identifiers_fail_registration() {
        let err = Registry::with_profiles([gray(), gray()]).unwrap_err();
        assert!(matches!(err, VisionError::InvalidProfile { ref id, .. } if id == "gray"));
    }

    #[test]
    fn invalid_tuples_fail_registration() {
        let mut broken = gray();
        broken.model.saturation = -0.1;
        assert!(matches!(
            Registry::with_profiles([broken]),
            Err(VisionError::InvalidProfile { .. })
        ));

        let mut nameless = gray();
        nameless.id = "";
        assert!(Registry::with_profiles([nameless]).is_err());
    }

    #[test]
    fn overflowing_tuples_fail_registration() {
        let mut huge = gray();
        huge.model.reprojection.red_from_red = 3.0e38;
        match Registry::with_profiles([huge]) {
            Err(VisionError::InvalidProfile { id, reason }) => {
                assert_eq!(id, "gray");
                assert!(reason.contains("reprojection"), "{reason}");
            }
            other => panic!("expected InvalidProfile, got {other:?}"),
        }
    }
}
