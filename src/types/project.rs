//! Projects: the devices, streams and variables a user works with, plus their
//! pending edits.

use super::{lossy_string, null_as_default, Device, Stream, Variable};
use crate::error::Result;
use crate::overlay::ProjectOverlay;
use crate::protocol::{stream_in_device, variable_slug_for_stream};
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;

/// A cloud project.
///
/// Devices and streams are stored exactly as last fetched from the cloud.
/// Pending local edits live in [`Project::overlay`] and are applied to the
/// copies handed out by [`Project::get_device`] and [`Project::get_stream`].
///
/// # Examples
///
/// ```
/// use iotile_cloud::delta::DeviceLabelDelta;
/// use iotile_cloud::types::{Device, Project};
///
/// let mut project = Project::new("p--0000-0001", "Field Test");
/// project.add_devices(vec![Device::new("d--0000-0002", "Pump")]);
/// project
///     .overlay
///     .add_delta(DeviceLabelDelta::new("Pump", "Main Pump", "d--0000-0002"));
///
/// let shown = project.get_device("d--0000-0002", false).unwrap();
/// assert_eq!(shown.label, "Main Pump");
/// assert!(shown.is_modified);
///
/// let stored = project.get_device("d--0000-0002", true).unwrap();
/// assert_eq!(stored.label, "Pump");
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Project {
    /// Project id
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    /// Global id, e.g. `0000-0001`
    #[serde(default, deserialize_with = "null_as_default")]
    pub gid: String,
    /// Display name
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    /// Project slug, `p--<gid>`
    #[serde(default, deserialize_with = "null_as_default")]
    pub slug: String,
    /// Owning organization slug
    #[serde(default, deserialize_with = "lossy_string")]
    pub org: Option<String>,
    /// Project template slug
    #[serde(rename = "project_template", default)]
    pub template: Option<String>,
    /// Creator username
    #[serde(default)]
    pub created_by: Option<String>,
    /// Creation timestamp
    #[serde(default)]
    pub created_on: Option<String>,
    /// Pending local edits
    #[serde(skip)]
    pub overlay: ProjectOverlay,
    #[serde(skip)]
    devices: IndexMap<String, Device>,
    #[serde(skip)]
    streams: IndexMap<String, Stream>,
    #[serde(skip)]
    variables: IndexMap<String, Variable>,
}

impl Project {
    /// Create an empty project.
    pub fn new(slug: impl Into<String>, name: impl Into<String>) -> Self {
        let slug = slug.into();
        Project {
            gid: slug.get(3..).unwrap_or_default().to_string(),
            slug,
            name: name.into(),
            ..Default::default()
        }
    }

    /// Parse a project record. Devices, streams and variables are added
    /// separately.
    pub fn from_json(value: Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    /// Replace all devices.
    pub fn add_devices(&mut self, devices: impl IntoIterator<Item = Device>) {
        self.devices = devices
            .into_iter()
            .map(|device| (device.slug.clone(), device))
            .collect();
    }

    /// Add or replace one device.
    pub fn add_device(&mut self, device: Device) {
        self.devices.insert(device.slug.clone(), device);
    }

    /// Replace all streams.
    pub fn add_streams(&mut self, streams: impl IntoIterator<Item = Stream>) {
        self.streams = streams
            .into_iter()
            .map(|stream| (stream.slug.clone(), stream))
            .collect();
    }

    /// Add or replace one stream.
    pub fn add_stream(&mut self, stream: Stream) {
        self.streams.insert(stream.slug.clone(), stream);
    }

    /// Replace all variables.
    pub fn add_variables(&mut self, variables: impl IntoIterator<Item = Variable>) {
        self.variables = variables
            .into_iter()
            .map(|variable| (variable.slug.clone(), variable))
            .collect();
    }

    /// Add or replace one variable.
    pub fn add_variable(&mut self, variable: Variable) {
        self.variables.insert(variable.slug.clone(), variable);
    }

    /// All variables.
    pub fn variables(&self) -> impl Iterator<Item = &Variable> {
        self.variables.values()
    }

    /// Variable by slug.
    pub fn get_variable(&self, slug: &str) -> Option<&Variable> {
        self.variables.get(slug)
    }

    /// The variable a stream reports, matched by project gid and local id.
    pub fn get_variable_for_stream(&self, stream_slug: &str) -> Option<&Variable> {
        self.get_variable(&variable_slug_for_stream(stream_slug)?)
    }

    /// Stored devices, without pending edits.
    pub fn devices(&self) -> impl Iterator<Item = &Device> {
        self.devices.values()
    }

    /// Stored streams, without pending edits.
    pub fn streams(&self) -> impl Iterator<Item = &Stream> {
        self.streams.values()
    }

    /// Stored device, without pending edits.
    pub fn device(&self, slug: &str) -> Option<&Device> {
        self.devices.get(slug)
    }

    /// Stored stream, without pending edits.
    pub fn stream(&self, slug: &str) -> Option<&Stream> {
        self.streams.get(slug)
    }

    /// Whether the project contains the device.
    pub fn has_device(&self, slug: &str) -> bool {
        self.devices.contains_key(slug)
    }

    /// Copy of a device.
    ///
    /// Unless `unmodified` is set, pending edits that still apply are replayed
    /// onto the copy and it is flagged `is_modified`.
    pub fn get_device(&self, slug: &str, unmodified: bool) -> Option<Device> {
        let mut device = self.devices.get(slug)?.clone();
        if !unmodified {
            self.overlay.apply_device(&mut device, true);
        }
        Some(device)
    }

    /// Copy of a stream. See [`Project::get_device`].
    pub fn get_stream(&self, slug: &str, unmodified: bool) -> Option<Stream> {
        let mut stream = self.streams.get(slug)?.clone();
        if !unmodified {
            self.overlay.apply_stream(&mut stream, true);
        }
        Some(stream)
    }

    /// Whether the device or any of its streams has pending edits.
    pub fn device_modified(&self, slug: &str) -> bool {
        self.overlay.device_modified(slug)
    }

    /// Streams of one device, with pending edits applied, keyed by slug.
    pub fn streams_for_device(&self, device_slug: &str) -> IndexMap<String, Stream> {
        self.streams
            .values()
            .filter(|stream| {
                stream.device.as_deref() == Some(device_slug)
                    || stream_in_device(&stream.slug, device_slug)
            })
            .filter_map(|stream| self.get_stream(&stream.slug, false))
            .map(|stream| (stream.slug.clone(), stream))
            .collect()
    }

    /// Bake `overlay` into the stored models as if the cloud had accepted it.
    ///
    /// Models are not flagged modified since they now match the cloud. The
    /// project's own overlay is pruned afterwards, dropping edits that landed.
    pub fn apply_overlay(&mut self, overlay: &ProjectOverlay) {
        for device in self.devices.values_mut() {
            overlay.apply_device(device, false);
        }
        for stream in self.streams.values_mut() {
            overlay.apply_stream(stream, false);
        }

        let mut own = std::mem::take(&mut self.overlay);
        own.prune(self);
        self.overlay = own;
    }
}
