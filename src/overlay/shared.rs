//! Thread-safe overlay handle.

use super::{ProjectOverlay, SerializedOverlay};
use crate::delta::Delta;
use crate::types::Project;
use parking_lot::RwLock;
use std::sync::Arc;

/// A [`ProjectOverlay`] shared between tasks or threads.
///
/// Clones point at the same overlay. Mutations (`add_delta`, `prune`) take the
/// write lock, so they are serialized; queries run under the read lock and do
/// not block each other.
///
/// # Examples
///
/// ```
/// use iotile_cloud::delta::DeviceLabelDelta;
/// use iotile_cloud::overlay::SharedOverlay;
///
/// let shared = SharedOverlay::new();
/// let handle = shared.clone();
///
/// std::thread::spawn(move || {
///     handle.add_delta(DeviceLabelDelta::new("a", "b", "d--0001"));
/// })
/// .join()
/// .unwrap();
///
/// assert!(shared.with(|overlay| overlay.device_modified("d--0001")));
/// ```
#[derive(Debug, Clone, Default)]
pub struct SharedOverlay {
    inner: Arc<RwLock<ProjectOverlay>>,
}

impl SharedOverlay {
    /// Handle to a new, empty overlay.
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of an existing overlay.
    pub fn from_overlay(overlay: ProjectOverlay) -> Self {
        SharedOverlay {
            inner: Arc::new(RwLock::new(overlay)),
        }
    }

    /// See [`ProjectOverlay::add_delta`].
    pub fn add_delta(&self, delta: impl Into<Delta>) {
        self.inner.write().add_delta(delta);
    }

    /// See [`ProjectOverlay::add_deltas`].
    pub fn add_deltas<I>(&self, deltas: I)
    where
        I: IntoIterator,
        I::Item: Into<Delta>,
    {
        self.inner.write().add_deltas(deltas);
    }

    /// See [`ProjectOverlay::prune`].
    pub fn prune(&self, project: &Project) {
        self.inner.write().prune(project);
    }

    /// See [`ProjectOverlay::serialize`].
    pub fn serialize(&self) -> SerializedOverlay {
        self.inner.read().serialize()
    }

    /// Copy of the current overlay.
    pub fn snapshot(&self) -> ProjectOverlay {
        self.inner.read().clone()
    }

    /// Run `f` with shared access.
    pub fn with<R>(&self, f: impl FnOnce(&ProjectOverlay) -> R) -> R {
        f(&*self.inner.read())
    }

    /// Run `f` with exclusive access.
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut ProjectOverlay) -> R) -> R {
        f(&mut *self.inner.write())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delta::{DeviceLabelDelta, StreamLabelDelta};
    use crate::types::{Device, Stream};

    #[tokio::test]
    async fn test_concurrent_adds_are_serialized() {
        let shared = SharedOverlay::new();

        let tasks: Vec<_> = (0..16)
            .map(|i| {
                let shared = shared.clone();
                tokio::spawn(async move {
                    let slug = format!("d--0000-{:04}", i);
                    shared.add_delta(DeviceLabelDelta::new("a", "b", slug));
                })
            })
            .collect();

        for task in futures::future::join_all(tasks).await {
            task.unwrap();
        }

        assert_eq!(shared.with(ProjectOverlay::len), 16);
    }

    #[test]
    fn test_prune_through_handle() {
        let shared = SharedOverlay::from_overlay(ProjectOverlay::new());
        shared.add_deltas(vec![
            crate::delta::Delta::from(DeviceLabelDelta::new("Old Name", "New Name", "d--0001")),
            crate::delta::Delta::from(StreamLabelDelta::new(None, "Flow", "s--0001--0001--5001")),
        ]);

        let mut project = Project::new("p--0001", "Test");
        project.add_devices(vec![Device::new("d--0001", "New Name")]);
        project.add_stream(Stream::new("s--0001--0001--5001"));

        shared.prune(&project);
        let stored = shared.serialize();
        assert_eq!(stored.len(), 1);
        assert!(stored.contains_key("s--0001--0001--5001"));

        shared.with_mut(|overlay| overlay.prune(&Project::new("p--0001", "Empty")));
        assert!(shared.snapshot().is_empty());
    }
}
