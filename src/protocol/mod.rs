//! Cloud naming conventions.
//!
//! The cloud identifies every model by a slug whose prefix encodes its kind
//! and whose `--` separated segments encode ownership:
//!
//! | Model | Slug format | Example |
//! |-------|-------------|---------|
//! | Device | `d--<device-gid>` | `d--0000-0000-0000-00ae` |
//! | Stream | `s--<project-gid>--<device-gid>--<lid>` | `s--0000-0010--0000-0000-0000-00ae--5001` |
//! | Variable | `v--<project-gid>--<lid>` | `v--0000-0010--5001` |
//!
//! # Examples
//!
//! ```
//! use iotile_cloud::protocol::{stream_in_device, ModelKind};
//!
//! assert!(stream_in_device("s--0000-0010--0000-0000-0000-00ae--5001", "d--0000-0000-0000-00ae"));
//! assert_eq!(ModelKind::from_slug("d--0001").unwrap(), ModelKind::Device);
//! ```

mod slugs;

pub use slugs::{stream_in_device, variable_slug_for_stream, ModelKind};
