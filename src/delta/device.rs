//! Deltas targeting devices.

use super::{object, parse_args, DeltaMeta, DeltaStatus, ModelDelta};
use crate::error::Result;
use crate::types::{coordinate, coordinate_json, same_coordinate, unset_coordinate, Device};
use serde::Deserialize;
use serde_json::{json, Map, Value};

/// Change of a device's label.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceLabelDelta {
    meta: DeltaMeta,
    old_label: String,
    new_label: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LabelArgs {
    old_label: String,
    new_label: String,
}

impl DeviceLabelDelta {
    /// Storage tag
    pub const CLASSNAME: &'static str = "DeviceLabelDelta";

    /// Record a label change on the device `slug`.
    pub fn new(
        old_label: impl Into<String>,
        new_label: impl Into<String>,
        slug: impl Into<String>,
    ) -> Self {
        DeviceLabelDelta {
            meta: DeltaMeta::new(slug),
            old_label: old_label.into(),
            new_label: new_label.into(),
        }
    }

    /// Rebuild from stored arguments.
    pub fn deserialize(guid: String, slug: String, args: &Map<String, Value>) -> Result<Self> {
        let args: LabelArgs = parse_args(Self::CLASSNAME, args)?;
        Ok(DeviceLabelDelta {
            meta: DeltaMeta::restore(guid, slug),
            old_label: args.old_label,
            new_label: args.new_label,
        })
    }

    /// Label before the edit
    pub fn old_label(&self) -> &str {
        &self.old_label
    }

    /// Label after the edit
    pub fn new_label(&self) -> &str {
        &self.new_label
    }
}

impl ModelDelta<Device> for DeviceLabelDelta {
    fn classname(&self) -> &'static str {
        Self::CLASSNAME
    }

    fn meta(&self) -> &DeltaMeta {
        &self.meta
    }

    fn check(&self, device: &Device) -> DeltaStatus {
        if device.label == self.new_label {
            DeltaStatus::Outdated
        } else if device.label != self.old_label {
            DeltaStatus::Conflicted
        } else {
            DeltaStatus::Applies
        }
    }

    fn patch(&self, _device: &Device) -> Map<String, Value> {
        object(json!({ "label": self.new_label }))
    }

    fn apply(&self, device: &mut Device) {
        device.label.clone_from(&self.new_label);
    }

    fn serialize_arguments(&self) -> Map<String, Value> {
        object(json!({
            "oldLabel": self.old_label,
            "newLabel": self.new_label,
        }))
    }
}

/// Change of a device's coordinates.
///
/// Unset coordinates are NaN; two NaN coordinates compare equal here.
#[derive(Debug, Clone)]
pub struct DeviceLocationDelta {
    meta: DeltaMeta,
    old_lat: f64,
    old_lng: f64,
    new_lat: f64,
    new_lng: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LocationArgs {
    #[serde(default = "unset_coordinate", deserialize_with = "coordinate")]
    old_lat: f64,
    #[serde(default = "unset_coordinate", deserialize_with = "coordinate")]
    old_lng: f64,
    #[serde(default = "unset_coordinate", deserialize_with = "coordinate")]
    new_lat: f64,
    #[serde(default = "unset_coordinate", deserialize_with = "coordinate")]
    new_lng: f64,
}

impl DeviceLocationDelta {
    /// Storage tag
    pub const CLASSNAME: &'static str = "DeviceLocationDelta";

    /// Record a move from `(old_lat, old_lng)` to `(new_lat, new_lng)`.
    pub fn new(
        old_lat: f64,
        old_lng: f64,
        new_lat: f64,
        new_lng: f64,
        slug: impl Into<String>,
    ) -> Self {
        DeviceLocationDelta {
            meta: DeltaMeta::new(slug),
            old_lat,
            old_lng,
            new_lat,
            new_lng,
        }
    }

    /// Rebuild from stored arguments.
    pub fn deserialize(guid: String, slug: String, args: &Map<String, Value>) -> Result<Self> {
        let args: LocationArgs = parse_args(Self::CLASSNAME, args)?;
        Ok(DeviceLocationDelta {
            meta: DeltaMeta::restore(guid, slug),
            old_lat: args.old_lat,
            old_lng: args.old_lng,
            new_lat: args.new_lat,
            new_lng: args.new_lng,
        })
    }

    /// Coordinates before the edit
    pub fn old_location(&self) -> (f64, f64) {
        (self.old_lat, self.old_lng)
    }

    /// Coordinates after the edit
    pub fn new_location(&self) -> (f64, f64) {
        (self.new_lat, self.new_lng)
    }
}

impl PartialEq for DeviceLocationDelta {
    fn eq(&self, other: &Self) -> bool {
        self.meta == other.meta
            && same_coordinate(self.old_lat, other.old_lat)
            && same_coordinate(self.old_lng, other.old_lng)
            && same_coordinate(self.new_lat, other.new_lat)
            && same_coordinate(self.new_lng, other.new_lng)
    }
}

impl ModelDelta<Device> for DeviceLocationDelta {
    fn classname(&self) -> &'static str {
        Self::CLASSNAME
    }

    fn meta(&self) -> &DeltaMeta {
        &self.meta
    }

    fn check(&self, device: &Device) -> DeltaStatus {
        if same_coordinate(device.lat, self.new_lat) && same_coordinate(device.lng, self.new_lng) {
            DeltaStatus::Outdated
        } else if same_coordinate(device.lat, self.old_lat)
            && same_coordinate(device.lng, self.old_lng)
        {
            DeltaStatus::Applies
        } else {
            DeltaStatus::Conflicted
        }
    }

    fn patch(&self, _device: &Device) -> Map<String, Value> {
        object(json!({
            "lat": coordinate_json(self.new_lat),
            "lon": coordinate_json(self.new_lng),
        }))
    }

    fn apply(&self, device: &mut Device) {
        device.lat = self.new_lat;
        device.lng = self.new_lng;
    }

    fn serialize_arguments(&self) -> Map<String, Value> {
        object(json!({
            "oldLat": coordinate_json(self.old_lat),
            "oldLng": coordinate_json(self.old_lng),
            "newLat": coordinate_json(self.new_lat),
            "newLng": coordinate_json(self.new_lng),
        }))
    }
}

/// Toggle of a device's drifter mode.
///
/// Drifter mode is a local-only setting, so the cloud patch is empty. A
/// boolean has no third state, so this delta never reports a conflict.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceDrifterDelta {
    meta: DeltaMeta,
    old_drifter: bool,
    new_drifter: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DrifterArgs {
    old_drifter: bool,
    new_drifter: bool,
}

impl DeviceDrifterDelta {
    /// Storage tag
    pub const CLASSNAME: &'static str = "DeviceDrifterDelta";

    /// Record a drifter mode change.
    pub fn new(old_drifter: bool, new_drifter: bool, slug: impl Into<String>) -> Self {
        DeviceDrifterDelta {
            meta: DeltaMeta::new(slug),
            old_drifter,
            new_drifter,
        }
    }

    /// Rebuild from stored arguments.
    pub fn deserialize(guid: String, slug: String, args: &Map<String, Value>) -> Result<Self> {
        let args: DrifterArgs = parse_args(Self::CLASSNAME, args)?;
        Ok(DeviceDrifterDelta {
            meta: DeltaMeta::restore(guid, slug),
            old_drifter: args.old_drifter,
            new_drifter: args.new_drifter,
        })
    }

    /// Mode after the edit
    pub fn new_drifter(&self) -> bool {
        self.new_drifter
    }
}

impl ModelDelta<Device> for DeviceDrifterDelta {
    fn classname(&self) -> &'static str {
        Self::CLASSNAME
    }

    fn meta(&self) -> &DeltaMeta {
        &self.meta
    }

    fn check(&self, device: &Device) -> DeltaStatus {
        if device.drifter_mode == self.new_drifter {
            DeltaStatus::Outdated
        } else {
            DeltaStatus::Applies
        }
    }

    fn patch(&self, _device: &Device) -> Map<String, Value> {
        Map::new()
    }

    fn apply(&self, device: &mut Device) {
        device.drifter_mode = self.new_drifter;
    }

    fn serialize_arguments(&self) -> Map<String, Value> {
        object(json!({
            "oldDrifter": self.old_drifter,
            "newDrifter": self.new_drifter,
        }))
    }
}
