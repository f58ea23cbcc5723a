//! Multiply/divide/offset scaling factors.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Scaling applied to raw stream values: `value * m / d + o`.
///
/// The cloud uses two spellings for the same data. Stream records carry the
/// long names (`multiplication_factor`, `division_factor`, `offset`,
/// `mdo_label`) while units and persisted deltas use the short ones
/// (`m`, `d`, `o`). Both are accepted when deserializing; serialization
/// always writes the short form.
///
/// Equality compares all four fields, label included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawMdo")]
pub struct Mdo {
    /// Multiplication factor
    pub m: f64,
    /// Division factor
    pub d: f64,
    /// Offset added after scaling
    pub o: f64,
    /// Optional display label
    #[serde(rename = "mdo_label", skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

#[derive(Deserialize)]
struct RawMdo {
    #[serde(default)]
    multiplication_factor: Option<f64>,
    #[serde(default)]
    division_factor: Option<f64>,
    #[serde(default)]
    offset: Option<f64>,
    #[serde(default)]
    m: Option<f64>,
    #[serde(default)]
    d: Option<f64>,
    #[serde(default)]
    o: Option<f64>,
    #[serde(default)]
    mdo_label: Option<String>,
}

impl From<RawMdo> for Mdo {
    fn from(raw: RawMdo) -> Self {
        // zero factors are treated as unset
        let factor = |long: Option<f64>, short: Option<f64>| {
            long.filter(|v| *v != 0.0)
                .or(short.filter(|v| *v != 0.0))
                .unwrap_or(1.0)
        };
        Mdo {
            m: factor(raw.multiplication_factor, raw.m),
            d: factor(raw.division_factor, raw.d),
            o: raw.offset.or(raw.o).unwrap_or(0.0),
            label: raw.mdo_label,
        }
    }
}

impl Default for Mdo {
    fn default() -> Self {
        Mdo {
            m: 1.0,
            d: 1.0,
            o: 0.0,
            label: None,
        }
    }
}

impl Mdo {
    /// Create an unlabeled MDO.
    pub fn new(m: f64, d: f64, o: f64) -> Self {
        Mdo {
            m,
            d,
            o,
            label: None,
        }
    }

    /// Attach a label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Copy every field from `src`.
    pub fn set_from_mdo(&mut self, src: &Mdo) {
        self.m = src.m;
        self.d = src.d;
        self.o = src.o;
        self.label = src.label.clone();
    }

    /// Scale a raw value.
    pub fn compute_value(&self, value: f64) -> f64 {
        let mut result = value * self.m;
        if self.d != 0.0 {
            result /= self.d;
        }
        result + self.o
    }

    /// Write this MDO into a stream record under the long names.
    pub fn add_to_object(&self, obj: &mut Map<String, Value>) {
        obj.insert("multiplication_factor".into(), json!(self.m));
        obj.insert("division_factor".into(), json!(self.d));
        obj.insert("offset".into(), json!(self.o));
        obj.insert("mdo_label".into(), json!(self.label));
    }

    /// Fields sent to the cloud when patching a stream's scaling.
    pub fn patch_payload(&self) -> Map<String, Value> {
        let mut payload = Map::new();
        payload.insert("multiplication_factor".into(), json!(self.m));
        payload.insert("division_factor".into(), json!(self.d));
        payload.insert("offset".into(), json!(self.o));
        if let Some(label) = &self.label {
            payload.insert("mdo_label".into(), json!(label));
        }
        payload
    }
}
