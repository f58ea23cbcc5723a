//! Pending local edits ("deltas") to devices and streams.
//!
//! A delta captures one edit to one field of one model: the value the user
//! saw before editing and the value they chose. Keeping both lets a delta
//! decide, against any later copy of the model, whether it still makes sense:
//!
//! | Status | Model field holds | Meaning |
//! |--------|-------------------|---------|
//! | [`DeltaStatus::Outdated`] | the new value | The edit already landed; drop it |
//! | [`DeltaStatus::Applies`] | the old value | The edit is still pending |
//! | [`DeltaStatus::Conflicted`] | something else | Someone else changed the field |
//!
//! Every delta can also produce the patch that performs the edit in the
//! cloud, apply itself to a local copy, and serialize itself for storage.
//!
//! # Delta Kinds
//!
//! | Kind | Target | Cloud patch |
//! |------|--------|-------------|
//! | [`DeviceLabelDelta`] | [`Device`] | `{label}` |
//! | [`DeviceLocationDelta`] | [`Device`] | `{lat, lon}` |
//! | [`DeviceDrifterDelta`] | [`Device`] | `{}` (local setting) |
//! | [`StreamLabelDelta`] | [`Stream`] | `{data_label}` |
//! | [`StreamMDODelta`] | [`Stream`] | `{mdo_type, mdo_label, multiplication_factor, division_factor, offset}` |
//! | [`StreamUnitsDelta`] (input) | [`Stream`] | `{input_unit}` |
//! | [`StreamUnitsDelta`] (output) | [`Stream`] | `{output_unit}` |
//!
//! # Examples
//!
//! ```
//! use iotile_cloud::delta::{DeltaStatus, DeviceLabelDelta, ModelDelta};
//! use iotile_cloud::types::Device;
//!
//! let delta = DeviceLabelDelta::new("Old Name", "New Name", "d--0001");
//!
//! let mut device = Device::new("d--0001", "Old Name");
//! assert_eq!(delta.check(&device), DeltaStatus::Applies);
//!
//! delta.apply(&mut device);
//! assert_eq!(device.label, "New Name");
//! assert_eq!(delta.check(&device), DeltaStatus::Outdated);
//! ```

mod device;
mod registry;
mod stream;

pub use device::{DeviceDrifterDelta, DeviceLabelDelta, DeviceLocationDelta};
pub use registry::{DeltaFactory, DeltaRegistry};
pub use stream::{StreamLabelDelta, StreamMDODelta, StreamUnitsDelta, UnitDirection};

use crate::error::{CloudError, Result};
use crate::types::{Device, Stream};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

/// Outcome of comparing a delta against the current state of its model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeltaStatus {
    /// The model still holds the old value; the edit is pending
    Applies,
    /// The model already holds the new value
    Outdated,
    /// The model holds neither value
    Conflicted,
}

/// Storage form of a single delta.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedDelta {
    /// Delta id
    pub guid: String,
    /// Concrete delta kind
    pub classname: String,
    /// Target model slug
    pub slug: String,
    /// Constructor arguments
    pub args: Map<String, Value>,
}

/// Identity shared by every delta: a unique id and the target slug.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeltaMeta {
    id: String,
    slug: String,
}

impl DeltaMeta {
    /// Fresh identity with a random v4 id.
    pub fn new(slug: impl Into<String>) -> Self {
        DeltaMeta {
            id: uuid::Uuid::new_v4().to_string(),
            slug: slug.into(),
        }
    }

    /// Identity restored from storage.
    pub fn restore(id: impl Into<String>, slug: impl Into<String>) -> Self {
        DeltaMeta {
            id: id.into(),
            slug: slug.into(),
        }
    }

    /// Delta id
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Target slug
    pub fn slug(&self) -> &str {
        &self.slug
    }
}

/// A single, identified edit to a model of type `T`.
///
/// Implementations are immutable once built; replacing an edit means adding
/// a new delta of the same kind for the same target.
pub trait ModelDelta<T>: fmt::Debug + Send + Sync {
    /// Tag naming the concrete kind, used as the storage discriminator.
    fn classname(&self) -> &'static str;

    /// Identity of this delta.
    fn meta(&self) -> &DeltaMeta;

    /// Compare the recorded old/new values against `model`. Must not mutate.
    fn check(&self, model: &T) -> DeltaStatus;

    /// Minimal cloud patch that performs this edit.
    fn patch(&self, model: &T) -> Map<String, Value>;

    /// Write the new value(s) into `model`. Applying twice equals applying once.
    fn apply(&self, model: &mut T);

    /// Exactly the arguments needed to rebuild this delta.
    fn serialize_arguments(&self) -> Map<String, Value>;

    /// Delta id
    fn id(&self) -> &str {
        self.meta().id()
    }

    /// Target slug
    fn slug(&self) -> &str {
        self.meta().slug()
    }

    /// Storage form including identity.
    fn serialize(&self) -> SerializedDelta {
        SerializedDelta {
            guid: self.id().to_string(),
            classname: self.classname().to_string(),
            slug: self.slug().to_string(),
            args: self.serialize_arguments(),
        }
    }
}

/// A delta of either target type.
///
/// The variant, not a stored flag, decides whether an overlay files the delta
/// under devices or streams. Deltas are shared behind [`Arc`] since they never
/// change after construction.
#[derive(Debug, Clone)]
pub enum Delta {
    /// Edit to a device
    Device(Arc<dyn ModelDelta<Device>>),
    /// Edit to a stream
    Stream(Arc<dyn ModelDelta<Stream>>),
}

impl Delta {
    /// Concrete kind tag
    pub fn classname(&self) -> &'static str {
        match self {
            Delta::Device(delta) => delta.classname(),
            Delta::Stream(delta) => delta.classname(),
        }
    }

    /// Delta id
    pub fn id(&self) -> &str {
        match self {
            Delta::Device(delta) => delta.id(),
            Delta::Stream(delta) => delta.id(),
        }
    }

    /// Target slug
    pub fn slug(&self) -> &str {
        match self {
            Delta::Device(delta) => delta.slug(),
            Delta::Stream(delta) => delta.slug(),
        }
    }

    /// Storage form
    pub fn serialize(&self) -> SerializedDelta {
        match self {
            Delta::Device(delta) => delta.serialize(),
            Delta::Stream(delta) => delta.serialize(),
        }
    }
}

macro_rules! impl_into_delta {
    ($variant:ident: $($kind:ty),+) => {
        $(
            impl From<$kind> for Delta {
                fn from(delta: $kind) -> Self {
                    Delta::$variant(Arc::new(delta))
                }
            }
        )+
    };
}

impl_into_delta!(Device: DeviceLabelDelta, DeviceLocationDelta, DeviceDrifterDelta);
impl_into_delta!(Stream: StreamLabelDelta, StreamMDODelta, StreamUnitsDelta);

/// Unwrap a `json!` object literal into its map.
pub(crate) fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Decode stored constructor arguments for `classname`.
pub(crate) fn parse_args<A: DeserializeOwned>(
    classname: &str,
    args: &Map<String, Value>,
) -> Result<A> {
    serde_json::from_value(Value::Object(args.clone())).map_err(|e| {
        CloudError::InvalidArgument(format!("Malformed {} arguments: {}", classname, e))
    })
}
