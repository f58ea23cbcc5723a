//! HTTP client for the cloud REST API.
//!
//! This module lets a host:
//!
//! - **Fetch** projects, devices and streams, following list pagination
//! - **Patch** single devices and streams
//! - **Push** a project's pending overlay edits, aborting on conflicts
//!
//! Requests are never retried here; [`CloudError::is_retryable`](crate::error::CloudError::is_retryable)
//! tells a caller whether retrying makes sense.
//!
//! # Module Organization
//!
//! ```text
//! client/
//! ├── config - ClientConfig and server selection
//! ├── fetch  - CloudClient and HTTP operations
//! └── utils  - Status classification and page unwrapping
//! ```
//!
//! # Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`CloudClient`] | REST client |
//! | [`ClientConfig`] | Client configuration options |
//! | [`ServerInfo`] | One selectable server |
//! | [`SyncReport`] | Outcome of an overlay push |
//!
//! # Examples
//!
//! ## Creating a Client
//!
//! ```
//! use iotile_cloud::client::{ClientConfig, CloudClient};
//!
//! // Default configuration
//! let client = CloudClient::new().unwrap();
//!
//! // Custom configuration
//! let config = ClientConfig {
//!     request_timeout_ms: 5_000,
//!     enable_logging: false,
//!     ..Default::default()
//! };
//! let client = CloudClient::with_config(config).unwrap();
//! assert_eq!(client.config().request_timeout_ms, 5_000);
//! ```
//!
//! ## Utility Functions
//!
//! ```
//! use iotile_cloud::client::{is_access_denied_status, is_retryable_status};
//!
//! assert!(is_retryable_status(503));
//! assert!(!is_retryable_status(404));
//! assert!(is_access_denied_status(401));
//! ```

mod config;
mod fetch;
mod utils;

pub use config::{ClientConfig, ServerInfo, DEFAULT_SERVER_URL};
pub use fetch::{CloudClient, SyncReport};
pub use utils::*;
