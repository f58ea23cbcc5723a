//! Cloud data model: projects, devices, streams, variables, units and scaling
//! factors.
//!
//! These types mirror the JSON records served by the cloud. They carry no
//! synchronization logic of their own; pending edits live in a
//! [`ProjectOverlay`](crate::overlay::ProjectOverlay) and are replayed onto
//! copies of these models on demand.
//!
//! # Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Project`] | Devices and streams of one project plus its overlay |
//! | [`Device`] | A physical device (`d--<gid>`) |
//! | [`Stream`] | A data stream (`s--<project>--<device>--<lid>`) |
//! | [`Variable`] | A project variable (`v--<project>--<lid>`) |
//! | [`Unit`] | A unit of measure |
//! | [`Mdo`] | Multiply/divide/offset scaling |

mod device;
mod mdo;
mod project;
mod stream;
mod unit;
mod variable;

pub use device::Device;
pub use mdo::Mdo;
pub use project::Project;
pub use stream::Stream;
pub use unit::Unit;
pub use variable::Variable;

use serde::{Deserialize, Deserializer, Serializer};
use serde_json::Value;

/// Treat an explicit `null` like a missing field.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accept identifiers sent either as strings or as numbers.
pub(crate) fn lossy_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Null) | None => None,
        Some(other) => Some(other.to_string()),
    })
}

/// Coordinates arrive as numbers, decimal strings or `null`; unset is NaN.
pub(crate) fn coordinate<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(f64::NAN),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(f64::NAN),
        _ => f64::NAN,
    })
}

pub(crate) fn serialize_coordinate<S>(value: &f64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    if value.is_nan() {
        serializer.serialize_none()
    } else {
        serializer.serialize_f64(*value)
    }
}

pub(crate) fn unset_coordinate() -> f64 {
    f64::NAN
}

pub(crate) fn enabled_by_default() -> bool {
    true
}

/// Coordinate equality where two unset (NaN) values are equal.
pub fn same_coordinate(a: f64, b: f64) -> bool {
    a == b || (a.is_nan() && b.is_nan())
}

/// JSON representation of a coordinate: a number, or `null` when unset.
pub fn coordinate_json(value: f64) -> Value {
    if value.is_nan() {
        Value::Null
    } else {
        Value::from(value)
    }
}
