//! Measurement units attached to streams.

use super::Mdo;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A unit of measure, e.g. gallons or liters.
///
/// Units are identified by `slug`; two units with the same slug are the same
/// unit regardless of their other fields. The embedded [`Mdo`] converts to or
/// from the internal storage units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    /// Unique unit identifier, e.g. `in--water-meter-volume--gallons`
    pub slug: String,
    /// Full name, e.g. `Gallons`
    #[serde(rename = "unit_full", default)]
    pub full_name: Option<String>,
    /// Short name, e.g. `G`
    #[serde(rename = "unit_short", default)]
    pub short_name: Option<String>,
    /// Conversion factors
    #[serde(flatten)]
    pub mdo: Mdo,
    /// Display precision
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decimal_places: Option<u32>,
    /// Derived units grouped by type, e.g. `{"rate": {"GPM": {...}}}`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub derived_units: Option<IndexMap<String, IndexMap<String, Mdo>>>,
}

impl Unit {
    /// Create a unit with identity conversion factors.
    pub fn new(slug: impl Into<String>, full_name: &str, short_name: &str) -> Self {
        Unit {
            slug: slug.into(),
            full_name: Some(full_name.to_string()),
            short_name: Some(short_name.to_string()),
            mdo: Mdo::default(),
            decimal_places: None,
            derived_units: None,
        }
    }

    /// Set the conversion factors.
    pub fn with_mdo(mut self, mdo: Mdo) -> Self {
        self.mdo = mdo;
        self
    }

    /// Overwrite this unit in place with the data of `src`.
    ///
    /// Used instead of replacing the value so that a unit shared by
    /// reference picks up the change.
    pub fn set_from_unit(&mut self, src: &Unit) {
        self.slug.clone_from(&src.slug);
        self.full_name.clone_from(&src.full_name);
        self.short_name.clone_from(&src.short_name);
        self.mdo.set_from_mdo(&src.mdo);
        self.decimal_places = src.decimal_places;
        self.derived_units.clone_from(&src.derived_units);
    }

    /// Names of the derived unit types, e.g. `["rate"]`.
    pub fn derived_unit_types(&self) -> Vec<&str> {
        self.derived_units
            .as_ref()
            .map(|types| types.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Names of the derived units of one type.
    pub fn derived_units_by_type(&self, unit_type: &str) -> Vec<&str> {
        self.derived_units
            .as_ref()
            .and_then(|types| types.get(unit_type))
            .map(|units| units.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }
}
