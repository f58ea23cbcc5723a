//! Record edits offline, persist them, restore them and show the patches
//! that would be pushed.
//!
//! ```text
//! cargo run --example overlay_sync
//! RUST_LOG=debug cargo run --example overlay_sync
//! ```

use anyhow::{Context, Result};
use iotile_cloud::delta::{
    DeviceLabelDelta, DeviceLocationDelta, StreamMDODelta, StreamUnitsDelta,
};
use iotile_cloud::{Device, Mdo, Project, ProjectOverlay, Stream, Unit};
use serde_json::json;
use tracing::info;

const DEVICE: &str = "d--0000-0000-0000-00ae";
const STREAM: &str = "s--0000-0010--0000-0000-0000-00ae--5001";

fn project() -> Result<Project> {
    let mut project = Project::new("p--0000-0010", "Water Meter");
    project.add_devices(vec![Device::from_json(json!({
        "slug": DEVICE,
        "label": "Meter",
        "lat": null,
        "lon": null
    }))?]);
    project.add_stream(Stream::from_json(json!({
        "slug": STREAM,
        "device": DEVICE,
        "data_label": "Flow",
        "mdo_type": "S"
    }))?);
    Ok(project)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_max_level(tracing::Level::DEBUG).init();

    let mut project = project()?;
    project.overlay.add_deltas(vec![
        iotile_cloud::Delta::from(DeviceLabelDelta::new("Meter", "Main Meter", DEVICE)),
        iotile_cloud::Delta::from(DeviceLocationDelta::new(
            f64::NAN,
            f64::NAN,
            35.5,
            -120.25,
            DEVICE,
        )),
        iotile_cloud::Delta::from(StreamMDODelta::new(
            Mdo::default(),
            Some("S".to_string()),
            Mdo::new(1.0, 10.0, 0.0).with_label("Gallons"),
            Some("S".to_string()),
            STREAM,
        )),
        iotile_cloud::Delta::from(StreamUnitsDelta::output(
            None,
            Unit::new("out--water-meter-volume--gallons", "Gallons", "G"),
            STREAM,
        )),
    ]);

    let saved = serde_json::to_string_pretty(&project.overlay.to_json()?)?;
    info!("Persisted overlay:\n{}", saved);

    let mut reopened = self::project()?;
    reopened.overlay = ProjectOverlay::from_json(serde_json::from_str(&saved)?)?;
    info!("Restored {} pending edits", reopened.overlay.len());

    for slug in reopened.overlay.affected_device_models() {
        let device = reopened.device(slug).context("device vanished")?;
        let patch = reopened.overlay.patch_for_device(device)?;
        info!("PATCH /device/{}/ {}", slug, serde_json::Value::Object(patch));
    }
    for slug in reopened.overlay.affected_stream_models() {
        let stream = reopened.stream(slug).context("stream vanished")?;
        let patch = reopened.overlay.patch_for_stream(stream)?;
        info!("PATCH /stream/{}/ {}", slug, serde_json::Value::Object(patch));
    }

    // pretend the cloud accepted everything
    let pending = reopened.overlay.clone();
    reopened.apply_overlay(&pending);
    info!(
        "After sync: label={:?}, {} edits pending",
        reopened.device(DEVICE).map(|d| d.label.as_str()),
        reopened.overlay.len()
    );

    Ok(())
}
