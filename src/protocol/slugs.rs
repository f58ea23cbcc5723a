//! Slug parsing helpers.

use crate::error::{CloudError, Result};

/// Length of the kind prefix (`d--`, `s--`, `v--`).
const PREFIX_LEN: usize = 3;

/// The kind of model a slug refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelKind {
    /// `d--` slugs
    Device,
    /// `s--` slugs
    Stream,
}

impl ModelKind {
    /// Classify a slug by its prefix.
    ///
    /// # Errors
    ///
    /// Returns [`CloudError::UnknownSlugType`] for any other prefix.
    pub fn from_slug(slug: &str) -> Result<Self> {
        if slug.starts_with("s--") {
            Ok(ModelKind::Stream)
        } else if slug.starts_with("d--") {
            Ok(ModelKind::Device)
        } else {
            Err(CloudError::UnknownSlugType(slug.to_string()))
        }
    }

    /// REST collection path for this kind, e.g. `/device/`.
    pub fn resource_path(&self) -> &'static str {
        match self {
            ModelKind::Device => "/device/",
            ModelKind::Stream => "/stream/",
        }
    }
}

/// Whether `stream_slug` belongs to the device `device_slug`.
///
/// The stream's device segment (third segment) must equal the device slug
/// with its prefix removed. Malformed slugs never match.
pub fn stream_in_device(stream_slug: &str, device_slug: &str) -> bool {
    let Some(device_gid) = device_slug.get(PREFIX_LEN..) else {
        return false;
    };

    let parts: Vec<&str> = stream_slug.split("--").collect();
    if parts.len() != 4 {
        return false;
    }

    parts[2] == device_gid
}

/// Variable slug for a stream, `v--<project-gid>--<lid>`.
pub fn variable_slug_for_stream(stream_slug: &str) -> Option<String> {
    let parts: Vec<&str> = stream_slug.split("--").collect();
    if parts.len() != 4 {
        return None;
    }
    Some(format!("v--{}--{}", parts[1], parts[3]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_in_device() {
        assert!(stream_in_device(
            "s--0000-0001--0000-0002--5001",
            "d--0000-0002"
        ));
        assert!(!stream_in_device(
            "s--0000-0001--0000-0003--5001",
            "d--0000-0002"
        ));
    }

    #[test]
    fn test_stream_in_device_malformed() {
        assert!(!stream_in_device("s--0000-0002", "d--0000-0002"));
        assert!(!stream_in_device("s--0000-0001--0000-0002--5001", "d-"));
    }

    #[test]
    fn test_model_kind() {
        assert_eq!(ModelKind::from_slug("s--1--2--3").unwrap(), ModelKind::Stream);
        assert_eq!(ModelKind::Device.resource_path(), "/device/");
        assert!(matches!(
            ModelKind::from_slug("p--0001"),
            Err(CloudError::UnknownSlugType(_))
        ));
    }

    #[test]
    fn test_variable_slug_for_stream() {
        assert_eq!(
            variable_slug_for_stream("s--0000-0010--0000-0000-0000-00ae--5001").as_deref(),
            Some("v--0000-0010--5001")
        );
        assert_eq!(variable_slug_for_stream("d--0001"), None);
    }
}
