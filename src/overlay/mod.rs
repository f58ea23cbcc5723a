//! Per-project collection of pending deltas.
//!
//! A [`ProjectOverlay`] holds every edit the user made to a project that the
//! cloud has not confirmed yet. Deltas are filed by target slug and then by
//! classname, so each target carries at most one pending edit of each kind:
//!
//! ```text
//! devices: d--0000-0002 -> { DeviceLabelDelta, DeviceLocationDelta }
//! streams: s--0000-0001--0000-0002--5001 -> { StreamMDODelta }
//! ```
//!
//! # Lifecycle
//!
//! | Step | Operation | Fails? |
//! |------|-----------|--------|
//! | Record an edit | [`ProjectOverlay::add_delta`] | never |
//! | Show pending edits | [`ProjectOverlay::apply_device`], [`ProjectOverlay::apply_stream`] | never |
//! | Build the cloud payload | [`ProjectOverlay::patch_for_device`], [`ProjectOverlay::patch_for_stream`] | on conflict |
//! | Clean up after a sync | [`ProjectOverlay::prune`] | never |
//! | Persist / restore | [`ProjectOverlay::serialize`], [`ProjectOverlay::deserialize`] | never |
//!
//! # Examples
//!
//! ```
//! use iotile_cloud::delta::DeviceLabelDelta;
//! use iotile_cloud::overlay::ProjectOverlay;
//! use iotile_cloud::types::Device;
//! use serde_json::json;
//!
//! let mut overlay = ProjectOverlay::new();
//! overlay.add_delta(DeviceLabelDelta::new("Old Name", "New Name", "d--0001"));
//!
//! let mut device = Device::new("d--0001", "Old Name");
//! let patch = overlay.patch_for_device(&device).unwrap();
//! assert_eq!(json!(patch), json!({"label": "New Name"}));
//!
//! overlay.apply_device(&mut device, true);
//! assert_eq!(device.label, "New Name");
//! assert!(device.is_modified);
//! ```

mod shared;

pub use shared::SharedOverlay;

use crate::delta::{Delta, DeltaRegistry, DeltaStatus, ModelDelta, SerializedDelta};
use crate::error::{CloudError, Result};
use crate::merge::merge_maps;
use crate::protocol::stream_in_device;
use crate::types::{Device, Project, Stream};
use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, warn};

/// Persisted overlay: `{target_slug: {classname: SerializedDelta}}`.
///
/// Device and stream targets share one keyspace; their slug prefixes never
/// collide.
pub type SerializedOverlay = IndexMap<String, IndexMap<String, SerializedDelta>>;

type DeltaMap<T> = IndexMap<String, IndexMap<&'static str, Arc<dyn ModelDelta<T>>>>;

/// Pending deltas of one project, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct ProjectOverlay {
    devices: DeltaMap<Device>,
    streams: DeltaMap<Stream>,
}

impl ProjectOverlay {
    /// Empty overlay.
    pub fn new() -> Self {
        Self::default()
    }

    /// File `delta` under its target, replacing any pending delta of the
    /// same classname for that target.
    pub fn add_delta(&mut self, delta: impl Into<Delta>) {
        match delta.into() {
            Delta::Device(delta) => insert(&mut self.devices, delta),
            Delta::Stream(delta) => insert(&mut self.streams, delta),
        }
    }

    /// Add each delta in order; later deltas win.
    pub fn add_deltas<I>(&mut self, deltas: I)
    where
        I: IntoIterator,
        I::Item: Into<Delta>,
    {
        for delta in deltas {
            self.add_delta(delta);
        }
    }

    /// Import every delta of `other`, which wins on collisions.
    pub fn merge(&mut self, other: &ProjectOverlay) {
        self.add_deltas(other.to_list());
    }

    /// Whether no target has a pending delta.
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty() && self.streams.is_empty()
    }

    /// Total number of pending deltas.
    pub fn len(&self) -> usize {
        self.devices.values().map(IndexMap::len).sum::<usize>()
            + self.streams.values().map(IndexMap::len).sum::<usize>()
    }

    /// All deltas, device deltas first.
    pub fn to_list(&self) -> Vec<Delta> {
        let devices = self
            .devices
            .values()
            .flat_map(IndexMap::values)
            .map(|delta| Delta::Device(Arc::clone(delta)));
        let streams = self
            .streams
            .values()
            .flat_map(IndexMap::values)
            .map(|delta| Delta::Stream(Arc::clone(delta)));
        devices.chain(streams).collect()
    }

    /// Combined cloud patch for `device`.
    ///
    /// # Errors
    ///
    /// Returns [`CloudError::DataConflict`] naming the first conflicted delta.
    /// No partial patch is produced in that case.
    pub fn patch_for_device(&self, device: &Device) -> Result<Map<String, Value>> {
        patch_for(self.devices.get(&device.slug), device)
    }

    /// Combined cloud patch for `stream`. See [`ProjectOverlay::patch_for_device`].
    pub fn patch_for_stream(&self, stream: &Stream) -> Result<Map<String, Value>> {
        patch_for(self.streams.get(&stream.slug), stream)
    }

    /// Apply the deltas that still apply to `device`.
    ///
    /// Sets `is_modified` when `mark_modified` is true and at least one delta
    /// was applied. Outdated and conflicted deltas are skipped, not removed.
    pub fn apply_device(&self, device: &mut Device, mark_modified: bool) {
        if apply_to(self.devices.get(&device.slug), device) && mark_modified {
            device.is_modified = true;
        }
    }

    /// Apply the deltas that still apply to `stream`. See [`ProjectOverlay::apply_device`].
    pub fn apply_stream(&self, stream: &mut Stream, mark_modified: bool) {
        if apply_to(self.streams.get(&stream.slug), stream) && mark_modified {
            stream.is_modified = true;
        }
    }

    /// Whether the device, or any of its streams, has a pending delta.
    pub fn device_modified(&self, device_slug: &str) -> bool {
        self.devices.contains_key(device_slug)
            || self
                .streams
                .keys()
                .any(|stream_slug| stream_in_device(stream_slug, device_slug))
    }

    /// Whether `device_slug` has a pending delta of kind `classname`.
    pub fn device_has_delta(&self, device_slug: &str, classname: &str) -> bool {
        self.devices
            .get(device_slug)
            .is_some_and(|deltas| deltas.contains_key(classname))
    }

    /// Whether `stream_slug` has a pending delta of kind `classname`.
    pub fn stream_has_delta(&self, stream_slug: &str, classname: &str) -> bool {
        self.streams
            .get(stream_slug)
            .is_some_and(|deltas| deltas.contains_key(classname))
    }

    /// Whether any stream delta targets a slug ending in `lid`.
    pub fn variable_modified(&self, lid: &str) -> bool {
        self.streams.keys().any(|slug| slug.ends_with(lid))
    }

    /// Stream slugs with pending deltas.
    pub fn affected_stream_models(&self) -> Vec<&str> {
        self.streams.keys().map(String::as_str).collect()
    }

    /// Device slugs with pending deltas.
    pub fn affected_device_models(&self) -> Vec<&str> {
        self.devices.keys().map(String::as_str).collect()
    }

    /// Drop every delta that no longer applies to the stored, unmodified
    /// models of `project`.
    ///
    /// Deltas of targets missing from `project` are dropped wholesale, and
    /// targets left without deltas disappear.
    pub fn prune(&mut self, project: &Project) {
        prune_targets(&mut self.devices, |slug| project.device(slug));
        prune_targets(&mut self.streams, |slug| project.stream(slug));
    }

    /// Storage form of every pending delta.
    pub fn serialize(&self) -> SerializedOverlay {
        let mut out = SerializedOverlay::new();
        serialize_into(&mut out, &self.devices);
        serialize_into(&mut out, &self.streams);
        out
    }

    /// Restore an overlay using the built-in delta kinds.
    ///
    /// Entries with an unknown classname or malformed arguments are skipped
    /// with a warning, so data written by other client versions still loads.
    pub fn deserialize(data: &SerializedOverlay) -> Self {
        Self::deserialize_with(data, &DeltaRegistry::new())
    }

    /// Restore an overlay using the factories in `registry`.
    pub fn deserialize_with(data: &SerializedOverlay, registry: &DeltaRegistry) -> Self {
        let mut overlay = ProjectOverlay::new();

        for (target, entries) in data {
            for (classname, stored) in entries {
                let built = registry.build(
                    classname,
                    stored.guid.clone(),
                    target.clone(),
                    &stored.args,
                );
                match built {
                    Ok(Some(delta)) => overlay.add_delta(delta),
                    Ok(None) => {
                        warn!("Skipping unknown delta type {} for {}", classname, target);
                    }
                    Err(e) => {
                        warn!("Skipping malformed {} for {}: {}", classname, target, e);
                    }
                }
            }
        }

        overlay
    }

    /// Serialize to a JSON value.
    pub fn to_json(&self) -> Result<Value> {
        Ok(serde_json::to_value(self.serialize())?)
    }

    /// Restore from a JSON value.
    ///
    /// # Errors
    ///
    /// Fails only when `value` does not have the persisted overlay shape.
    pub fn from_json(value: Value) -> Result<Self> {
        let data: SerializedOverlay = serde_json::from_value(value)?;
        Ok(Self::deserialize(&data))
    }
}

fn insert<T>(map: &mut DeltaMap<T>, delta: Arc<dyn ModelDelta<T>>) {
    map.entry(delta.slug().to_string())
        .or_default()
        .insert(delta.classname(), delta);
}

fn patch_for<T>(
    deltas: Option<&IndexMap<&'static str, Arc<dyn ModelDelta<T>>>>,
    model: &T,
) -> Result<Map<String, Value>> {
    let mut patch = Map::new();
    let Some(deltas) = deltas else {
        return Ok(patch);
    };

    for delta in deltas.values() {
        if delta.check(model) == DeltaStatus::Conflicted {
            warn!(
                "Conflict in {} for slug {} (guid {})",
                delta.classname(),
                delta.slug(),
                delta.id()
            );
            return Err(CloudError::conflict(
                delta.classname(),
                delta.slug(),
                delta.id(),
            ));
        }
    }

    for delta in deltas.values() {
        merge_maps(&mut patch, &delta.patch(model));
    }

    Ok(patch)
}

/// Returns whether any delta was applied.
fn apply_to<T>(
    deltas: Option<&IndexMap<&'static str, Arc<dyn ModelDelta<T>>>>,
    model: &mut T,
) -> bool {
    let mut applied = false;
    for delta in deltas.into_iter().flat_map(IndexMap::values) {
        if delta.check(model) == DeltaStatus::Applies {
            delta.apply(model);
            applied = true;
        }
    }
    applied
}

fn prune_targets<'p, T: 'p>(map: &mut DeltaMap<T>, lookup: impl Fn(&str) -> Option<&'p T>) {
    map.retain(|slug, deltas| {
        let Some(model) = lookup(slug.as_str()) else {
            debug!("Dropping {} delta(s) for missing {}", deltas.len(), slug);
            return false;
        };

        deltas.retain(|classname, delta| {
            let status = delta.check(model);
            if status != DeltaStatus::Applies {
                debug!("Dropping {:?} {} for {}", status, classname, slug);
            }
            status == DeltaStatus::Applies
        });
        !deltas.is_empty()
    });
}

fn serialize_into<T>(out: &mut SerializedOverlay, map: &DeltaMap<T>) {
    for (slug, deltas) in map {
        let entry = out.entry(slug.clone()).or_default();
        for (classname, delta) in deltas {
            entry.insert(classname.to_string(), delta.serialize());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delta::{
        DeviceDrifterDelta, DeviceLabelDelta, DeviceLocationDelta, StreamLabelDelta,
        StreamMDODelta, StreamUnitsDelta,
    };
    use crate::types::{Mdo, Unit};
    use serde_json::json;
    use tracing_test::traced_test;

    const DEVICE: &str = "d--0000-0002";
    const STREAM: &str = "s--0000-0001--0000-0002--5001";
    const OTHER_STREAM: &str = "s--0000-0001--0000-0003--5002";

    fn project() -> Project {
        let mut project = Project::new("p--0000-0001", "Test Project");
        project.add_devices(vec![Device::new(DEVICE, "Old Name")]);
        project.add_stream(Stream::new(STREAM).with_label("IO 1"));
        project
    }

    #[test]
    fn test_replace_same_kind_same_target() {
        let mut overlay = ProjectOverlay::new();
        overlay.add_delta(DeviceLabelDelta::new("Old Name", "First", DEVICE));
        let second = DeviceLabelDelta::new("Old Name", "Second", DEVICE);
        overlay.add_delta(second.clone());

        assert_eq!(overlay.len(), 1);
        let list = overlay.to_list();
        assert_eq!(list[0].id(), second.id());

        let patch = overlay
            .patch_for_device(&Device::new(DEVICE, "Old Name"))
            .unwrap();
        assert_eq!(json!(patch), json!({"label": "Second"}));
    }

    #[test]
    fn test_routing_and_order() {
        let mut overlay = ProjectOverlay::new();
        overlay.add_deltas(vec![
            Delta::from(StreamLabelDelta::new(None, "Flow", STREAM)),
            Delta::from(DeviceLabelDelta::new("a", "b", DEVICE)),
            Delta::from(DeviceDrifterDelta::new(false, true, DEVICE)),
        ]);

        let classnames: Vec<&str> = overlay.to_list().iter().map(Delta::classname).collect();
        assert_eq!(
            classnames,
            vec!["DeviceLabelDelta", "DeviceDrifterDelta", "StreamLabelDelta"]
        );
        assert_eq!(overlay.affected_device_models(), vec![DEVICE]);
        assert_eq!(overlay.affected_stream_models(), vec![STREAM]);
        assert!(overlay.device_has_delta(DEVICE, "DeviceDrifterDelta"));
        assert!(!overlay.device_has_delta(DEVICE, "DeviceLocationDelta"));
        assert!(overlay.stream_has_delta(STREAM, "StreamLabelDelta"));
    }

    #[test]
    fn test_merge_last_writer_wins() {
        let mut ours = ProjectOverlay::new();
        ours.add_delta(DeviceLabelDelta::new("a", "ours", DEVICE));
        ours.add_delta(StreamLabelDelta::new(None, "Flow", STREAM));

        let mut theirs = ProjectOverlay::new();
        let label = DeviceLabelDelta::new("a", "theirs", DEVICE);
        theirs.add_delta(label.clone());

        ours.merge(&theirs);
        assert_eq!(ours.len(), 2);
        assert!(ours.to_list().iter().any(|d| d.id() == label.id()));
    }

    #[test]
    fn test_conflict_blocks_patch() {
        let mut overlay = ProjectOverlay::new();
        overlay.add_delta(DeviceLocationDelta::new(f64::NAN, f64::NAN, 1.0, 2.0, DEVICE));
        overlay.add_delta(DeviceLabelDelta::new("Old Name", "New Name", DEVICE));

        let device = Device::new(DEVICE, "Someone Else's Name");
        let err = overlay.patch_for_device(&device).unwrap_err();
        match err {
            CloudError::DataConflict {
                technical_message, ..
            } => {
                assert!(technical_message.contains("DeviceLabelDelta"));
                assert!(technical_message.contains(DEVICE));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_patch_merges_kinds() {
        let mut overlay = ProjectOverlay::new();
        overlay.add_delta(DeviceLabelDelta::new("Old Name", "New Name", DEVICE));
        overlay.add_delta(DeviceLocationDelta::new(f64::NAN, f64::NAN, 1.0, 2.0, DEVICE));
        overlay.add_delta(DeviceDrifterDelta::new(false, true, DEVICE));

        let patch = overlay
            .patch_for_device(&Device::new(DEVICE, "Old Name"))
            .unwrap();
        assert_eq!(json!(patch), json!({"label": "New Name", "lat": 1.0, "lon": 2.0}));

        let untouched = overlay.patch_for_device(&Device::new("d--9999", "x")).unwrap();
        assert!(untouched.is_empty());
    }

    #[test]
    fn test_apply_skips_without_removing() {
        let mut overlay = ProjectOverlay::new();
        overlay.add_delta(DeviceLabelDelta::new("Old Name", "New Name", DEVICE));

        let mut conflicted = Device::new(DEVICE, "Other");
        overlay.apply_device(&mut conflicted, true);
        assert_eq!(conflicted.label, "Other");
        assert!(!conflicted.is_modified);
        assert_eq!(overlay.len(), 1);

        let mut fresh = Device::new(DEVICE, "Old Name");
        overlay.apply_device(&mut fresh, false);
        assert_eq!(fresh.label, "New Name");
        assert!(!fresh.is_modified);
    }

    #[test]
    fn test_apply_stream_units_and_mdo() {
        let unit = Unit::new("in--water-meter-volume--gallons", "Gallons", "G");
        let mut overlay = ProjectOverlay::new();
        overlay.add_delta(StreamUnitsDelta::input(None, unit.clone(), STREAM));
        overlay.add_delta(StreamMDODelta::new(
            Mdo::default(),
            None,
            Mdo::new(2.0, 1.0, 0.0),
            Some("S".into()),
            STREAM,
        ));

        let mut stream = Stream::new(STREAM);
        overlay.apply_stream(&mut stream, true);
        assert!(stream.is_modified);
        assert_eq!(stream.input_unit, Some(unit));
        assert_eq!(stream.mdo.m, 2.0);
        assert_eq!(stream.mdo_type.as_deref(), Some("S"));
    }

    #[test]
    fn test_device_modified_through_streams() {
        let mut overlay = ProjectOverlay::new();
        assert!(!overlay.device_modified(DEVICE));

        overlay.add_delta(StreamLabelDelta::new(None, "Flow", STREAM));
        assert!(overlay.device_modified(DEVICE));
        assert!(!overlay.device_modified("d--0000-0003"));

        overlay.add_delta(StreamLabelDelta::new(None, "Flow", OTHER_STREAM));
        assert!(overlay.device_modified("d--0000-0003"));
    }

    #[test]
    fn test_variable_modified() {
        let mut overlay = ProjectOverlay::new();
        overlay.add_delta(StreamLabelDelta::new(None, "Flow", STREAM));
        assert!(overlay.variable_modified("5001"));
        assert!(!overlay.variable_modified("9999"));
    }

    #[test]
    fn test_prune_outdated_conflicted_and_missing() {
        let mut overlay = ProjectOverlay::new();
        // outdated
        overlay.add_delta(DeviceLabelDelta::new("Before", "Old Name", DEVICE));
        // conflicted
        overlay.add_delta(StreamLabelDelta::new(Some("Other".into()), "Flow", STREAM));
        // missing target
        overlay.add_delta(DeviceLabelDelta::new("a", "b", "d--0000-0099"));
        overlay.add_delta(DeviceDrifterDelta::new(false, true, "d--0000-0099"));

        overlay.prune(&project());
        assert!(overlay.is_empty());
        assert!(overlay.serialize().is_empty());
    }

    #[test]
    fn test_prune_keeps_pending() {
        let mut overlay = ProjectOverlay::new();
        overlay.add_delta(DeviceLabelDelta::new("Old Name", "New Name", DEVICE));
        overlay.add_delta(DeviceDrifterDelta::new(true, false, DEVICE));
        overlay.add_delta(StreamLabelDelta::new(Some("IO 1".into()), "Flow", STREAM));

        overlay.prune(&project());
        assert_eq!(overlay.len(), 2);
        assert!(overlay.device_has_delta(DEVICE, "DeviceLabelDelta"));
        assert!(!overlay.device_has_delta(DEVICE, "DeviceDrifterDelta"));
        assert!(overlay.stream_has_delta(STREAM, "StreamLabelDelta"));
    }

    #[test]
    fn test_serialize_round_trip() {
        let mut overlay = ProjectOverlay::new();
        overlay.add_delta(DeviceLabelDelta::new("Old Name", "New Name", DEVICE));
        overlay.add_delta(StreamUnitsDelta::output(
            None,
            Unit::new("out--water-meter-volume--liters", "Liters", "L"),
            STREAM,
        ));

        let stored = overlay.serialize();
        assert_eq!(
            stored.keys().map(String::as_str).collect::<Vec<_>>(),
            vec![DEVICE, STREAM]
        );
        assert!(stored[STREAM].contains_key("StreamOutputUnitsDelta"));

        let restored = ProjectOverlay::from_json(overlay.to_json().unwrap()).unwrap();
        assert_eq!(restored.serialize(), stored);
    }

    #[traced_test]
    #[test]
    fn test_deserialize_skips_unknown_classname() {
        let data = json!({
            DEVICE: {
                "DeviceLabelDelta": {
                    "guid": "1f0c6b0e-0000-4000-8000-000000000001",
                    "classname": "DeviceLabelDelta",
                    "slug": DEVICE,
                    "args": {"oldLabel": "a", "newLabel": "b"}
                },
                "DeviceColorDelta": {
                    "guid": "1f0c6b0e-0000-4000-8000-000000000002",
                    "classname": "DeviceColorDelta",
                    "slug": DEVICE,
                    "args": {"color": "red"}
                }
            }
        });

        let overlay = ProjectOverlay::from_json(data).unwrap();
        assert_eq!(overlay.len(), 1);
        assert!(overlay.device_has_delta(DEVICE, "DeviceLabelDelta"));
        assert_eq!(overlay.to_list()[0].id(), "1f0c6b0e-0000-4000-8000-000000000001");
        assert!(logs_contain("Skipping unknown delta type DeviceColorDelta"));
    }

    #[traced_test]
    #[test]
    fn test_deserialize_skips_malformed_args() {
        let data = json!({
            STREAM: {
                "StreamInputUnitsDelta": {
                    "guid": "g",
                    "classname": "StreamInputUnitsDelta",
                    "slug": STREAM,
                    "args": {"oldUnit": null, "newUnit": null, "type": 0}
                }
            }
        });

        let overlay = ProjectOverlay::from_json(data).unwrap();
        assert!(overlay.is_empty());
        assert!(logs_contain("Skipping malformed StreamInputUnitsDelta"));
    }
}
