#![warn(missing_docs)]

//! # iotile_cloud: cloud client with optimistic local edits
//!
//! This crate talks to the IOTile cloud REST API and keeps a per-project
//! **overlay** of edits the user made locally but the cloud has not confirmed.
//!
//! ## Overview
//!
//! Every edit is a **delta**: one change to one field of one device or stream,
//! recording both the value the user saw and the value they chose. With both
//! values a delta can, against any later copy of its model:
//!
//! 1. **Check** whether it still applies, already landed, or conflicts with
//!    someone else's change
//! 2. **Patch**: produce the JSON the cloud needs to perform the edit
//! 3. **Apply** itself to a local copy, so views show pending edits at once
//!
//! Overlays persist as plain JSON and survive version skew: kinds a client
//! does not know are skipped with a warning.
//!
//! ## Key Features
//!
//! - **Last-writer-wins** per target and delta kind
//! - **Conflict detection** before anything is sent to the cloud
//! - **Pruning** of landed, conflicted and orphaned edits after a sync
//! - **Thread-safe handle** via [`overlay::SharedOverlay`]
//! - **REST client** with pagination and structured API errors
//!
//! ## Overlay Usage
//!
//! ```
//! use iotile_cloud::delta::{DeltaStatus, DeviceLabelDelta, ModelDelta};
//! use iotile_cloud::overlay::ProjectOverlay;
//! use iotile_cloud::types::Device;
//!
//! let delta = DeviceLabelDelta::new("Old Name", "New Name", "d--0001");
//! assert_eq!(delta.check(&Device::new("d--0001", "Old Name")), DeltaStatus::Applies);
//!
//! let mut overlay = ProjectOverlay::new();
//! overlay.add_delta(delta);
//!
//! // Someone renamed the device in the meantime
//! let err = overlay
//!     .patch_for_device(&Device::new("d--0001", "Someone Else's Name"))
//!     .unwrap_err();
//! assert!(err.is_conflict());
//!
//! // Persist and restore
//! let restored = ProjectOverlay::from_json(overlay.to_json().unwrap()).unwrap();
//! assert!(restored.device_has_delta("d--0001", "DeviceLabelDelta"));
//! ```
//!
//! ## Client Usage
//!
//! ```ignore
//! use iotile_cloud::{CloudClient, ClientConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = CloudClient::with_config(ClientConfig::default())?;
//!     let mut project = client.load_project("1c07fdd2-3c16-4f13-8a6e-c7b0e5b9e1e2").await?;
//!
//!     // ... record deltas in project.overlay ...
//!
//!     let report = client.push_overlay(&mut project).await?;
//!     println!("patched {} models", report.patched.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Module Structure
//!
//! - **[types]** - Cloud models (Project, Device, Stream, Variable, Unit, Mdo)
//! - **[delta]** - The delta contract, concrete deltas and the deserializer registry
//! - **[overlay]** - Per-project delta collection and its shared handle
//! - **[error]** - Error types and result handling
//! - **[client]** - HTTP client for the cloud REST API
//! - **[merge]** - Deep merging of JSON patches
//! - **[protocol]** - Slug conventions

pub mod client;
pub mod delta;
pub mod error;
pub mod merge;
pub mod overlay;
pub mod protocol;
pub mod types;

pub use client::{ClientConfig, CloudClient, SyncReport};
pub use delta::{Delta, DeltaRegistry, DeltaStatus, ModelDelta, SerializedDelta};
pub use error::{CloudError, HttpError, Result};
pub use overlay::{ProjectOverlay, SerializedOverlay, SharedOverlay};
pub use types::{Device, Mdo, Project, Stream, Unit, Variable};
