//! Data streams.

use super::{enabled_by_default, lossy_string, Mdo, Unit};
use crate::error::Result;
use serde::Deserialize;
use serde_json::{json, Map, Value};

fn default_raw_value_format() -> String {
    "<L".to_string()
}

/// A stream of data points produced by one variable of one device.
///
/// Stream slugs follow `s--<project-gid>--<device-gid>--<lid>`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Stream {
    /// Database id
    #[serde(default, deserialize_with = "lossy_string")]
    pub id: Option<String>,
    /// Stream slug
    pub slug: String,
    /// Owning project id
    #[serde(default, deserialize_with = "lossy_string")]
    pub project_id: Option<String>,
    /// Owning project slug
    #[serde(default, deserialize_with = "lossy_string")]
    pub project: Option<String>,
    /// Producing device slug
    #[serde(default, deserialize_with = "lossy_string")]
    pub device: Option<String>,
    /// Variable slug, `v--<project-gid>--<lid>`
    #[serde(default, deserialize_with = "lossy_string")]
    pub variable: Option<String>,
    /// User visible label
    #[serde(default)]
    pub data_label: Option<String>,
    /// Raw value scaling
    #[serde(flatten)]
    pub mdo: Mdo,
    /// Scaling type tag, e.g. `S`
    #[serde(default)]
    pub mdo_type: Option<String>,
    /// Units values are stored in
    #[serde(default)]
    pub input_unit: Option<Unit>,
    /// Units values are displayed in
    #[serde(default)]
    pub output_unit: Option<Unit>,
    /// Binary format of raw values
    #[serde(default = "default_raw_value_format")]
    pub raw_value_format: String,
    /// Data type tag
    #[serde(default)]
    pub data_type: Option<String>,
    /// Whether the stream is enabled
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    /// Variable local id
    #[serde(default)]
    pub var_lid: Option<i64>,
    /// Creation timestamp
    #[serde(default)]
    pub created_on: Option<String>,
    /// Set when local pending edits were applied to this copy
    #[serde(skip)]
    pub is_modified: bool,
}

impl Stream {
    /// Create a stream with only a slug set.
    pub fn new(slug: impl Into<String>) -> Self {
        Stream {
            id: None,
            slug: slug.into(),
            project_id: None,
            project: None,
            device: None,
            variable: None,
            data_label: None,
            mdo: Mdo::default(),
            mdo_type: None,
            input_unit: None,
            output_unit: None,
            raw_value_format: default_raw_value_format(),
            data_type: None,
            enabled: true,
            var_lid: None,
            created_on: None,
            is_modified: false,
        }
    }

    /// Parse a stream record.
    pub fn from_json(value: Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    /// Set the data label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.data_label = Some(label.into());
        self
    }

    /// Serialize to the cloud record format, scaling under its long names.
    pub fn to_json(&self) -> Result<Value> {
        let mut obj = Map::new();
        obj.insert("id".into(), json!(self.id));
        obj.insert("project_id".into(), json!(self.project_id));
        obj.insert("project".into(), json!(self.project));
        obj.insert("device".into(), json!(self.device));
        obj.insert("variable".into(), json!(self.variable));
        obj.insert("data_label".into(), json!(self.data_label));
        obj.insert("raw_value_format".into(), json!(self.raw_value_format));
        obj.insert("mdo_type".into(), json!(self.mdo_type));
        obj.insert("slug".into(), json!(self.slug));
        obj.insert("data_type".into(), json!(self.data_type));
        obj.insert("created_on".into(), json!(self.created_on));
        obj.insert("enabled".into(), json!(self.enabled));
        obj.insert("var_lid".into(), json!(self.var_lid));
        obj.insert("input_unit".into(), serde_json::to_value(&self.input_unit)?);
        obj.insert("output_unit".into(), serde_json::to_value(&self.output_unit)?);
        self.mdo.add_to_object(&mut obj);
        Ok(Value::Object(obj))
    }

    /// Fields sent to the cloud when patching the whole stream.
    ///
    /// Units are sent by slug. An unset label is left out.
    pub fn patch_payload(&self) -> Map<String, Value> {
        let mut payload = Map::new();
        payload.insert("mdo_type".into(), json!(self.mdo_type));
        payload.insert("enabled".into(), json!(self.enabled));
        payload.extend(self.mdo.patch_payload());
        if let Some(unit) = &self.input_unit {
            payload.insert("input_unit".into(), json!(unit.slug));
        }
        if let Some(unit) = &self.output_unit {
            payload.insert("output_unit".into(), json!(unit.slug));
        }
        if let Some(label) = &self.data_label {
            payload.insert("data_label".into(), json!(label));
        }
        payload
    }

    /// The variable local id taken from the variable slug, e.g. `5001`.
    pub fn local_var_id(&self) -> Option<&str> {
        let variable = self.variable.as_deref()?;
        let parts: Vec<&str> = variable.split("--").collect();
        if parts.len() == 3 {
            Some(parts[2])
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Value {
        json!({
            "project": "p--0000-0010",
            "device": "d--0000-0000-0000-00ae",
            "variable": "v--0000-0010--5001",
            "raw_value_format": "<L",
            "mdo_type": "S",
            "input_unit": {
                "slug": "in--water-meter-volume--gallons",
                "unit_full": "Gallons",
                "unit_short": "g",
                "m": 378541,
                "d": 100,
                "o": 0.0
            },
            "output_unit": null,
            "multiplication_factor": 1,
            "division_factor": 10,
            "offset": 5.0,
            "data_label": "foo",
            "org": "arch-internal",
            "created_on": "2016-11-16T16:42:54.312425Z",
            "slug": "s--0000-0010--0000-0000-0000-00ae--5001"
        })
    }

    #[test]
    fn test_parse_stream() {
        let stream = Stream::from_json(sample()).unwrap();
        assert_eq!(stream.variable.as_deref(), Some("v--0000-0010--5001"));
        assert_eq!(stream.data_label.as_deref(), Some("foo"));
        assert_eq!(stream.mdo_type.as_deref(), Some("S"));
        assert_eq!(stream.mdo.d, 10.0);
        assert_eq!(stream.mdo.compute_value(200.0), 25.0);
        assert!(stream.output_unit.is_none());
        assert_eq!(
            stream.input_unit.as_ref().map(|u| u.slug.as_str()),
            Some("in--water-meter-volume--gallons")
        );
    }

    #[test]
    fn test_local_var_id() {
        let stream = Stream::from_json(sample()).unwrap();
        assert_eq!(stream.local_var_id(), Some("5001"));
        assert_eq!(Stream::new("s--1").local_var_id(), None);
    }

    #[test]
    fn test_patch_payload() {
        let stream = Stream::from_json(sample()).unwrap();
        assert_eq!(
            Value::Object(stream.patch_payload()),
            json!({
                "mdo_type": "S",
                "enabled": true,
                "multiplication_factor": 1.0,
                "division_factor": 10.0,
                "offset": 5.0,
                "input_unit": "in--water-meter-volume--gallons",
                "data_label": "foo"
            })
        );

        let bare = Stream::new("s--1").patch_payload();
        assert_eq!(bare["mdo_type"], Value::Null);
        assert!(!bare.contains_key("data_label"));
        assert!(!bare.contains_key("output_unit"));
    }

    #[test]
    fn test_to_json_round_trip() {
        let mut stream = Stream::from_json(sample()).unwrap();
        stream.mdo_type = Some("X".to_string());

        let blob = stream.to_json().unwrap();
        assert_eq!(blob["mdo_type"], json!("X"));
        assert_eq!(blob["division_factor"], json!(10.0));

        let reparsed = Stream::from_json(blob).unwrap();
        assert_eq!(reparsed, stream);
    }
}
