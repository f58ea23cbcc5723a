//! Cloud REST client.
//!
//! [`CloudClient`] fetches projects, devices, streams and variables and pushes the
//! pending edits of a project's overlay back to the cloud.
//!
//! # Examples
//!
//! ## Loading a project
//!
//! ```ignore
//! use iotile_cloud::client::{ClientConfig, CloudClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = CloudClient::with_config(ClientConfig {
//!         token: Some(std::env::var("IOTILE_TOKEN")?),
//!         ..Default::default()
//!     })?;
//!
//!     let project = client.load_project("1c07fdd2-3c16-4f13-8a6e-c7b0e5b9e1e2").await?;
//!     for device in project.devices() {
//!         println!("{}: {}", device.slug, device.label);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Pushing pending edits
//!
//! ```ignore
//! use iotile_cloud::delta::DeviceLabelDelta;
//!
//! project
//!     .overlay
//!     .add_delta(DeviceLabelDelta::new("Pump", "Main Pump", "d--0000-0002"));
//!
//! match client.push_overlay(&mut project).await {
//!     Ok(report) => println!("patched {:?}", report.patched),
//!     Err(e) if e.is_conflict() => println!("resync needed: {}", e),
//!     Err(e) => return Err(e.into()),
//! }
//! ```

use super::config::ClientConfig;
use super::utils::unwrap_page;
use crate::error::{CloudError, HttpError, Result};
use crate::protocol::ModelKind;
use crate::types::{Device, Project, Stream, Variable};
use futures::future::try_join_all;
use reqwest::Method;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Outcome of [`CloudClient::push_overlay`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncReport {
    /// Slugs that were patched in the cloud
    pub patched: Vec<String>,
    /// Slugs whose deltas needed no cloud patch or whose model is gone
    pub skipped: Vec<String>,
    /// Deltas still pending after the push
    pub remaining: usize,
}

/// HTTP client for the cloud REST API.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct CloudClient {
    client: reqwest::Client,
    config: Arc<ClientConfig>,
}

impl CloudClient {
    /// Client for the default server.
    pub fn new() -> Result<Self> {
        Self::with_config(ClientConfig::default())
    }

    /// Client with custom configuration.
    ///
    /// # Errors
    ///
    /// Fails when `server_url` is not a valid URL or the HTTP client cannot
    /// be built. An unparsable `proxy_url` is ignored.
    pub fn with_config(config: ClientConfig) -> Result<Self> {
        Url::parse(&config.server_url)?;

        let mut builder = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(config.max_total_connections as usize);

        if !config.proxy_url.is_empty() {
            if let Ok(proxy) = reqwest::Proxy::all(&config.proxy_url) {
                builder = builder.proxy(proxy);
            }
        }

        Ok(CloudClient {
            client: builder.build()?,
            config: Arc::new(config),
        })
    }

    /// Get the client configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Project record, without devices or streams.
    pub async fn fetch_project(&self, project_id: &str) -> Result<Project> {
        let body = self.get(&format!("/project/{}/", project_id)).await?;
        Project::from_json(body)
    }

    /// All devices of a project, following pagination.
    pub async fn fetch_project_devices(&self, project_id: &str) -> Result<Vec<Device>> {
        self.fetch_list(&format!("/device/?project={}", project_id))
            .await?
            .into_iter()
            .map(Device::from_json)
            .collect()
    }

    /// All streams of a project, following pagination.
    pub async fn fetch_project_streams(&self, project_id: &str) -> Result<Vec<Stream>> {
        self.fetch_list(&format!("/stream/?project={}", project_id))
            .await?
            .into_iter()
            .map(Stream::from_json)
            .collect()
    }

    /// All variables of a project, following pagination.
    pub async fn fetch_project_variables(&self, project_id: &str) -> Result<Vec<Variable>> {
        self.fetch_list(&format!("/variable/?project={}", project_id))
            .await?
            .into_iter()
            .map(Variable::from_json)
            .collect()
    }

    /// One device by slug.
    pub async fn fetch_device(&self, slug: &str) -> Result<Device> {
        Device::from_json(self.get(&format!("/device/{}/", slug)).await?)
    }

    /// One stream by slug.
    pub async fn fetch_stream(&self, slug: &str) -> Result<Stream> {
        Stream::from_json(self.get(&format!("/stream/{}/", slug)).await?)
    }

    /// One variable by slug.
    pub async fn fetch_variable(&self, slug: &str) -> Result<Variable> {
        Variable::from_json(self.get(&format!("/variable/{}/", slug)).await?)
    }

    /// Project with its devices, streams and variables, and an empty overlay.
    pub async fn load_project(&self, project_id: &str) -> Result<Project> {
        let (mut project, devices, streams, variables) = futures::try_join!(
            self.fetch_project(project_id),
            self.fetch_project_devices(project_id),
            self.fetch_project_streams(project_id),
            self.fetch_project_variables(project_id),
        )?;

        project.add_devices(devices);
        project.add_streams(streams);
        project.add_variables(variables);
        Ok(project)
    }

    /// Send `PATCH /device/<slug>/` or `PATCH /stream/<slug>/`.
    ///
    /// # Errors
    ///
    /// Returns [`CloudError::UnknownSlugType`] before any request is made
    /// when `slug` is neither a device nor a stream slug.
    pub async fn patch_model(&self, slug: &str, payload: &Map<String, Value>) -> Result<Value> {
        let kind = ModelKind::from_slug(slug)?;
        let url = self.url(&format!("{}{}/", kind.resource_path(), slug))?;
        self.send(Method::PATCH, url, Some(payload)).await
    }

    /// Push every pending edit of `project` to the cloud.
    ///
    /// All patches are computed against the stored models before anything is
    /// sent, so a conflict aborts the push with no request made. The patches
    /// are then sent concurrently. Once all succeed, the pushed edits are
    /// baked into the stored models and pruned from the project's overlay.
    ///
    /// # Errors
    ///
    /// [`CloudError::DataConflict`] for a conflicted delta, or the first
    /// request error. The project is left untouched in both cases.
    pub async fn push_overlay(&self, project: &mut Project) -> Result<SyncReport> {
        let pending = project.overlay.clone();
        let mut report = SyncReport::default();
        let mut patches = Vec::new();

        for slug in pending.affected_device_models() {
            let patch = match project.device(slug) {
                Some(device) => pending.patch_for_device(device)?,
                None => Map::new(),
            };
            queue(&mut patches, &mut report, slug, patch);
        }
        for slug in pending.affected_stream_models() {
            let patch = match project.stream(slug) {
                Some(stream) => pending.patch_for_stream(stream)?,
                None => Map::new(),
            };
            queue(&mut patches, &mut report, slug, patch);
        }

        try_join_all(
            patches
                .iter()
                .map(|(slug, patch)| self.patch_model(slug, patch)),
        )
        .await?;

        report.patched = patches.into_iter().map(|(slug, _)| slug).collect();
        project.apply_overlay(&pending);
        report.remaining = project.overlay.len();

        if self.config.enable_logging {
            debug!(
                "Pushed overlay: {} patched, {} skipped, {} remaining",
                report.patched.len(),
                report.skipped.len(),
                report.remaining
            );
        }

        Ok(report)
    }

    fn url(&self, path: &str) -> Result<Url> {
        let base = self.config.server_url.trim_end_matches('/');
        Ok(Url::parse(&format!("{}{}", base, path))?)
    }

    async fn get(&self, path: &str) -> Result<Value> {
        let url = self.url(path)?;
        self.send(Method::GET, url, None).await
    }

    async fn fetch_list(&self, path: &str) -> Result<Vec<Value>> {
        let mut records = Vec::new();
        let mut next = Some(self.url(path)?);

        while let Some(url) = next.take() {
            let page = unwrap_page(self.send(Method::GET, url, None).await?);
            records.extend(page.results);
            next = page.next.as_deref().map(Url::parse).transpose()?;
        }

        Ok(records)
    }

    async fn send(
        &self,
        method: Method,
        url: Url,
        body: Option<&Map<String, Value>>,
    ) -> Result<Value> {
        if self.config.enable_logging {
            debug!("{} {}", method, url);
        }

        let mut req_builder = self.client.request(method.clone(), url.clone());
        if let Some(token) = &self.config.token {
            req_builder =
                req_builder.header(reqwest::header::AUTHORIZATION, format!("JWT {}", token));
        }
        if let Some(body) = body {
            req_builder = req_builder.json(body);
        }

        let response = req_builder.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if self.config.enable_logging {
            debug!("{} {} -> {}", method, url, status.as_u16());
        }

        if !status.is_success() {
            let err = HttpError::from_response(
                status.as_u16(),
                status.canonical_reason().unwrap_or_default(),
                &text,
            )
            .with_request(method.as_str(), url.as_str());
            return Err(CloudError::Api(err));
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }
}

fn queue(
    patches: &mut Vec<(String, Map<String, Value>)>,
    report: &mut SyncReport,
    slug: &str,
    patch: Map<String, Value>,
) {
    if patch.is_empty() {
        report.skipped.push(slug.to_string());
    } else {
        patches.push((slug.to_string(), patch));
    }
}
