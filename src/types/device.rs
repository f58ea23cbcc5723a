//! Devices.

use super::{
    coordinate, enabled_by_default, lossy_string, null_as_default, same_coordinate,
    serialize_coordinate, unset_coordinate,
};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A device registered in a project.
///
/// Fields the SDK does not model are kept in `extra` so that
/// [`Device::to_json`] returns the record the cloud sent, with local edits
/// applied.
///
/// Equality treats two unset (NaN) coordinates as equal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    /// Numeric database id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Device slug, `d--<gid>`
    pub slug: String,
    /// Global id, e.g. `0000-0000-0000-0081`
    #[serde(default, deserialize_with = "null_as_default")]
    pub gid: String,
    /// User visible label; defaults to the slug
    #[serde(default, deserialize_with = "null_as_default")]
    pub label: String,
    /// Latitude, NaN when unset
    #[serde(
        default = "unset_coordinate",
        deserialize_with = "coordinate",
        serialize_with = "serialize_coordinate"
    )]
    pub lat: f64,
    /// Longitude, NaN when unset
    #[serde(
        rename = "lon",
        default = "unset_coordinate",
        deserialize_with = "coordinate",
        serialize_with = "serialize_coordinate"
    )]
    pub lng: f64,
    /// Device template slug
    #[serde(default, deserialize_with = "null_as_default")]
    pub template: String,
    /// Sensor graph slug
    #[serde(default, deserialize_with = "lossy_string")]
    pub sg: Option<String>,
    /// Owning project id
    #[serde(default, deserialize_with = "lossy_string")]
    pub project: Option<String>,
    /// Disables permanent data reports
    #[serde(default, deserialize_with = "null_as_default")]
    pub drifter_mode: bool,
    /// Whether the device is active
    #[serde(default = "enabled_by_default")]
    pub active: bool,
    /// Set when local pending edits were applied to this copy
    #[serde(skip)]
    pub is_modified: bool,
    /// Unmodeled fields from the cloud record
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PartialEq for Device {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.slug == other.slug
            && self.gid == other.gid
            && self.label == other.label
            && same_coordinate(self.lat, other.lat)
            && same_coordinate(self.lng, other.lng)
            && self.template == other.template
            && self.sg == other.sg
            && self.project == other.project
            && self.drifter_mode == other.drifter_mode
            && self.active == other.active
            && self.is_modified == other.is_modified
            && self.extra == other.extra
    }
}

impl Device {
    /// Create a device with only a slug and label set.
    pub fn new(slug: impl Into<String>, label: impl Into<String>) -> Self {
        let slug = slug.into();
        let gid = slug.get(3..).unwrap_or_default().to_string();
        Device {
            id: None,
            slug,
            gid,
            label: label.into(),
            lat: f64::NAN,
            lng: f64::NAN,
            template: String::new(),
            sg: None,
            project: None,
            drifter_mode: false,
            active: true,
            is_modified: false,
            extra: Map::new(),
        }
    }

    /// Parse a device record, falling back to the slug for a missing label.
    pub fn from_json(value: Value) -> Result<Self> {
        let mut device: Device = serde_json::from_value(value)?;
        if device.label.is_empty() {
            device.label.clone_from(&device.slug);
        }
        Ok(device)
    }

    /// Serialize back to the cloud record format.
    pub fn to_json(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Set both coordinates.
    pub fn with_location(mut self, lat: f64, lng: f64) -> Self {
        self.lat = lat;
        self.lng = lng;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_device() {
        let device = Device::from_json(json!({
            "id": 129,
            "slug": "d--0000-0000-0000-0081",
            "gid": "0000-0000-0000-0081",
            "label": "1037 / 40D",
            "active": true,
            "project": "b83c6bd6-0f3f-4890-a390-d9d29d142966",
            "org": "netafim",
            "template": "1d1p2bt101-v0-1-0",
            "lat": null,
            "lon": null,
            "created_on": "2016-12-05T21:20:53.500516Z"
        }))
        .unwrap();

        assert_eq!(device.id, Some(129));
        assert_eq!(device.slug, "d--0000-0000-0000-0081");
        assert!(device.lat.is_nan());
        assert!(device.lng.is_nan());
        assert!(!device.drifter_mode);
        assert_eq!(device.extra["org"], json!("netafim"));
    }

    #[test]
    fn test_label_defaults_to_slug() {
        let device = Device::from_json(json!({"slug": "d--0001", "label": null})).unwrap();
        assert_eq!(device.label, "d--0001");
    }

    #[test]
    fn test_string_coordinates() {
        let device = Device::from_json(json!({
            "slug": "d--0001",
            "lat": "35.389587",
            "lon": "-119.460091"
        }))
        .unwrap();
        assert_eq!(device.lat, 35.389587);
        assert_eq!(device.lng, -119.460091);
    }

    #[test]
    fn test_unset_location_equality() {
        let device = Device::new("d--0001", "Pump");
        assert_eq!(device, device.clone());
        assert_ne!(device, device.clone().with_location(35.5, f64::NAN));
        assert_eq!(
            device.clone().with_location(35.5, -120.25),
            Device::new("d--0001", "Pump").with_location(35.5, -120.25)
        );
    }

    #[test]
    fn test_to_json_keeps_unmodeled_fields() {
        let mut device = Device::from_json(json!({
            "slug": "d--0001",
            "label": "Pump",
            "created_on": "2016-12-05T21:20:53Z"
        }))
        .unwrap();
        device.label = "Pump 2".to_string();

        let value = device.to_json().unwrap();
        assert_eq!(value["label"], json!("Pump 2"));
        assert_eq!(value["lat"], Value::Null);
        assert_eq!(value["created_on"], json!("2016-12-05T21:20:53Z"));
        assert!(value.get("is_modified").is_none());
    }
}
