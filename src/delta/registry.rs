//! Classname to factory lookup used when restoring persisted overlays.

use super::{
    Delta, DeviceDrifterDelta, DeviceLabelDelta, DeviceLocationDelta, StreamLabelDelta,
    StreamMDODelta, StreamUnitsDelta, UnitDirection,
};
use crate::error::Result;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;

/// Rebuilds a delta from `(guid, slug, args)`.
pub type DeltaFactory = fn(String, String, &Map<String, Value>) -> Result<Delta>;

/// Maps every known classname to its [`DeltaFactory`].
///
/// [`DeltaRegistry::new`] registers the seven built-in kinds. A new delta kind
/// must be registered here, or overlays persisted with it are skipped on load.
///
/// # Examples
///
/// ```
/// use iotile_cloud::delta::{DeltaRegistry, DeviceLabelDelta, ModelDelta};
///
/// let registry = DeltaRegistry::new();
/// assert!(registry.contains("StreamInputUnitsDelta"));
///
/// let stored = DeviceLabelDelta::new("a", "b", "d--0001").serialize();
/// let delta = registry
///     .build(&stored.classname, stored.guid.clone(), stored.slug, &stored.args)
///     .unwrap()
///     .unwrap();
/// assert_eq!(delta.id(), stored.guid);
/// ```
#[derive(Clone)]
pub struct DeltaRegistry {
    factories: HashMap<String, DeltaFactory>,
}

impl DeltaRegistry {
    /// Registry holding the built-in delta kinds.
    pub fn new() -> Self {
        let mut registry = DeltaRegistry::empty();
        registry.register(DeviceLabelDelta::CLASSNAME, |guid, slug, args| {
            Ok(DeviceLabelDelta::deserialize(guid, slug, args)?.into())
        });
        registry.register(DeviceLocationDelta::CLASSNAME, |guid, slug, args| {
            Ok(DeviceLocationDelta::deserialize(guid, slug, args)?.into())
        });
        registry.register(DeviceDrifterDelta::CLASSNAME, |guid, slug, args| {
            Ok(DeviceDrifterDelta::deserialize(guid, slug, args)?.into())
        });
        registry.register(StreamLabelDelta::CLASSNAME, |guid, slug, args| {
            Ok(StreamLabelDelta::deserialize(guid, slug, args)?.into())
        });
        registry.register(StreamMDODelta::CLASSNAME, |guid, slug, args| {
            Ok(StreamMDODelta::deserialize(guid, slug, args)?.into())
        });
        registry.register(StreamUnitsDelta::INPUT_CLASSNAME, |guid, slug, args| {
            Ok(StreamUnitsDelta::deserialize(UnitDirection::Input, guid, slug, args)?.into())
        });
        registry.register(StreamUnitsDelta::OUTPUT_CLASSNAME, |guid, slug, args| {
            Ok(StreamUnitsDelta::deserialize(UnitDirection::Output, guid, slug, args)?.into())
        });
        registry
    }

    /// Registry with nothing registered.
    pub fn empty() -> Self {
        DeltaRegistry {
            factories: HashMap::new(),
        }
    }

    /// Register or replace the factory for `classname`.
    pub fn register(&mut self, classname: impl Into<String>, factory: DeltaFactory) {
        self.factories.insert(classname.into(), factory);
    }

    /// Whether `classname` has a factory.
    pub fn contains(&self, classname: &str) -> bool {
        self.factories.contains_key(classname)
    }

    /// Registered classnames, unordered.
    pub fn classnames(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Rebuild a delta.
    ///
    /// Returns `Ok(None)` when `classname` is not registered, and an error
    /// when the factory rejects the arguments.
    pub fn build(
        &self,
        classname: &str,
        guid: String,
        slug: String,
        args: &Map<String, Value>,
    ) -> Result<Option<Delta>> {
        match self.factories.get(classname) {
            Some(factory) => factory(guid, slug, args).map(Some),
            None => Ok(None),
        }
    }
}

impl fmt::Debug for DeltaRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.factories.keys()).finish()
    }
}

impl Default for DeltaRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delta::ModelDelta;
    use crate::types::{Mdo, Unit};

    #[test]
    fn test_builtin_kinds_registered() {
        let registry = DeltaRegistry::new();
        let mut names: Vec<&str> = registry.classnames().collect();
        names.sort_unstable();
        assert_eq!(
            names,
            vec![
                "DeviceDrifterDelta",
                "DeviceLabelDelta",
                "DeviceLocationDelta",
                "StreamInputUnitsDelta",
                "StreamLabelDelta",
                "StreamMDODelta",
                "StreamOutputUnitsDelta",
            ]
        );
    }

    #[test]
    fn test_round_trip_every_kind() {
        let slug = "s--0000-0001--0000-0002--5001";
        let unit = Unit::new("in--water-meter-volume--gallons", "Gallons", "G");
        let deltas: Vec<Delta> = vec![
            DeviceLabelDelta::new("a", "b", "d--0002").into(),
            DeviceLocationDelta::new(f64::NAN, f64::NAN, 1.5, -2.5, "d--0002").into(),
            DeviceDrifterDelta::new(false, true, "d--0002").into(),
            StreamLabelDelta::new(None, "Flow", slug).into(),
            StreamMDODelta::new(
                Mdo::default(),
                None,
                Mdo::new(2.0, 1.0, 0.0),
                Some("S".into()),
                slug,
            )
            .into(),
            StreamUnitsDelta::input(None, unit.clone(), slug).into(),
            StreamUnitsDelta::output(Some(unit.clone()), unit, slug).into(),
        ];

        let registry = DeltaRegistry::new();
        for delta in deltas {
            let stored = delta.serialize();
            let restored = registry
                .build(&stored.classname, stored.guid.clone(), stored.slug.clone(), &stored.args)
                .unwrap()
                .unwrap();
            assert_eq!(restored.serialize(), stored);
        }
    }

    #[test]
    fn test_unknown_classname_is_none() {
        let registry = DeltaRegistry::new();
        let built = registry
            .build("FancyNewDelta", "id".into(), "d--0001".into(), &Map::new())
            .unwrap();
        assert!(built.is_none());
    }

    #[test]
    fn test_custom_registration() {
        let mut registry = DeltaRegistry::empty();
        assert!(!registry.contains(DeviceLabelDelta::CLASSNAME));

        registry.register("RenamedLabelDelta", |guid, slug, args| {
            Ok(DeviceLabelDelta::deserialize(guid, slug, args)?.into())
        });
        let stored = DeviceLabelDelta::new("a", "b", "d--0001").serialize();
        let delta = registry
            .build("RenamedLabelDelta", stored.guid, stored.slug, &stored.args)
            .unwrap()
            .unwrap();
        assert_eq!(delta.classname(), DeviceLabelDelta::CLASSNAME);
    }

    #[test]
    fn test_factory_errors_propagate() {
        let registry = DeltaRegistry::new();
        let result = registry.build(
            DeviceLabelDelta::CLASSNAME,
            "id".into(),
            "d--0001".into(),
            &Map::new(),
        );
        assert!(result.is_err());
    }
}
