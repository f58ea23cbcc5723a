//! Project variables.

use super::{lossy_string, null_as_default, Mdo, Unit};
use crate::error::Result;
use serde::Deserialize;
use serde_json::Value;

/// A variable declared by a project, shared by the streams of every device
/// that reports it.
///
/// Variable slugs follow `v--<project-gid>--<lid>`. A stream
/// `s--<project-gid>--<device-gid>--<lid>` belongs to the variable with the
/// same project gid and local id.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Variable {
    /// Database id
    #[serde(default, deserialize_with = "lossy_string")]
    pub id: Option<String>,
    /// Variable slug
    pub slug: String,
    /// Local id as a number
    #[serde(default)]
    pub lid: Option<i64>,
    /// Display name; defaults to the slug
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    /// Free-form units description
    #[serde(default)]
    pub units: Option<String>,
    /// Only shown in the mobile app
    #[serde(default, deserialize_with = "null_as_default")]
    pub app_only: bool,
    /// Only shown on the web
    #[serde(default, deserialize_with = "null_as_default")]
    pub web_only: bool,
    /// Description
    #[serde(default, deserialize_with = "null_as_default")]
    pub about: String,
    /// Raw value scaling
    #[serde(flatten)]
    pub mdo: Mdo,
    /// Variable type slug
    #[serde(rename = "var_type", default)]
    pub kind: Option<String>,
    /// Owning project id; `None` for system variables
    #[serde(default, deserialize_with = "lossy_string")]
    pub project: Option<String>,
    /// Display precision
    #[serde(default, deserialize_with = "null_as_default")]
    pub decimal_places: u32,
    /// Units values are stored in
    #[serde(default)]
    pub input_unit: Option<Unit>,
    /// Units values are displayed in
    #[serde(default)]
    pub output_unit: Option<Unit>,
}

impl Variable {
    /// Parse a variable record, falling back to the slug for a missing name.
    pub fn from_json(value: Value) -> Result<Self> {
        let mut variable: Variable = serde_json::from_value(value)?;
        if variable.name.is_empty() {
            variable.name.clone_from(&variable.slug);
        }
        Ok(variable)
    }

    /// Whether this is a system variable not owned by any project.
    pub fn is_system(&self) -> bool {
        self.project.is_none()
    }

    /// The local id segment of the slug, e.g. `5001`.
    pub fn hex_lid(&self) -> Option<&str> {
        let parts: Vec<&str> = self.slug.split("--").collect();
        if parts.len() == 3 {
            Some(parts[2])
        } else {
            None
        }
    }
}
