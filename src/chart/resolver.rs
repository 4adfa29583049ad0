//! Chart resolution: turning a release's chart reference into a
//! concrete local artifact.
//!
//! The resolver is constructed once per build and shared across the
//! concurrent per-release resolution tasks. The cache is the only
//! shared mutable state; the per-release chart reference sits behind
//! its handle's own lock so the name-rewrite step cannot interleave a
//! partial write.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, warn};

use crate::config::{ChartReference, ReleaseConfig, RepositoryConfig};
use crate::error::{ChartError, ChartwaveError, Result};

use super::cache::ChartCache;
use super::locator::ChartLocator;
use super::metadata::ChartManifest;

/// A release under resolution. Wraps the release's chart reference in
/// a mutex so the chart-name rewrite is a single-field critical
/// section; the identity fields never change and stay lock-free.
#[derive(Debug)]
pub struct ReleaseHandle {
    name: String,
    namespace: String,
    tags: Vec<String>,
    values: Vec<String>,
    options: HashMap<String, serde_yaml::Value>,
    chart: Mutex<ChartReference>,
}

impl From<ReleaseConfig> for ReleaseHandle {
    fn from(release: ReleaseConfig) -> Self {
        Self {
            name: release.name,
            namespace: release.namespace,
            tags: release.tags,
            values: release.values,
            options: release.options,
            chart: Mutex::new(release.chart),
        }
    }
}

impl ReleaseHandle {
    /// Returns the unique name `name@namespace`.
    #[must_use]
    pub fn uniq(&self) -> String {
        format!("{}@{}", self.name, self.namespace)
    }

    /// Returns a snapshot of the chart reference.
    #[must_use]
    pub fn chart(&self) -> ChartReference {
        self.chart
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Rewrites the chart name under the handle's exclusive lock.
    /// Does not touch the resolution cache.
    pub fn set_chart_name(&self, name: impl Into<String>) {
        let mut chart = self.chart.lock().unwrap_or_else(PoisonError::into_inner);
        chart.name = name.into();
    }

    /// Unwraps the handle back into a release config once resolution
    /// is done.
    #[must_use]
    pub fn into_config(self) -> ReleaseConfig {
        ReleaseConfig {
            name: self.name,
            namespace: self.namespace,
            tags: self.tags,
            values: self.values,
            options: self.options,
            chart: self
                .chart
                .into_inner()
                .unwrap_or_else(PoisonError::into_inner),
        }
    }
}

/// Resolves chart references against a base path, a per-build cache,
/// and the registered repository sources.
#[derive(Clone)]
pub struct ChartResolver {
    base_dir: PathBuf,
    cache: Arc<ChartCache>,
    locator: Arc<dyn ChartLocator>,
    sources: Arc<Vec<RepositoryConfig>>,
}

impl ChartResolver {
    /// Creates a resolver for one build run.
    #[must_use]
    pub fn new(
        base_dir: impl Into<PathBuf>,
        cache: Arc<ChartCache>,
        locator: Arc<dyn ChartLocator>,
        sources: Vec<RepositoryConfig>,
    ) -> Self {
        Self {
            base_dir: base_dir.into(),
            cache,
            locator,
            sources: Arc::new(sources),
        }
    }

    /// Returns the repository source for a remote chart: an explicit
    /// `repo_url` on the reference wins, otherwise the `repo/` prefix
    /// of the chart name is looked up in the registered sources.
    fn source_for(&self, chart: &ChartReference) -> Result<RepositoryConfig> {
        if let Some(url) = &chart.repo_url {
            let mut source = RepositoryConfig::new("", url.clone());
            source.username = chart.username.clone();
            source.password = chart.password.clone();
            source.ca_file = chart.ca_file.clone();
            source.cert_file = chart.cert_file.clone();
            source.key_file = chart.key_file.clone();
            source.insecure = chart.insecure;
            return Ok(source);
        }

        let repo = chart.repository_name().ok_or_else(|| {
            ChartwaveError::Chart(ChartError::locate(
                &chart.name,
                "no repository prefix and no repo_url",
            ))
        })?;

        let mut source = self
            .sources
            .iter()
            .find(|s| s.name == repo)
            .cloned()
            .ok_or_else(|| {
                ChartwaveError::Chart(ChartError::locate(
                    &chart.name,
                    format!("repository {repo} is not registered"),
                ))
            })?;

        // Connection options on the reference take precedence over
        // the registered source's.
        if chart.username.is_some() {
            source.username = chart.username.clone();
        }
        if chart.password.is_some() {
            source.password = chart.password.clone();
        }
        if chart.ca_file.is_some() {
            source.ca_file = chart.ca_file.clone();
        }
        if chart.cert_file.is_some() {
            source.cert_file = chart.cert_file.clone();
        }
        if chart.key_file.is_some() {
            source.key_file = chart.key_file.clone();
        }
        source.insecure = source.insecure || chart.insecure;

        Ok(source)
    }

    /// Locates the release's chart, consulting the cache first.
    ///
    /// A cache hit returns immediately with an informational log and
    /// no I/O. A miss resolves through the location protocol (path
    /// join for local references, repository fetch for remote ones)
    /// and stores the result. The cache lock is never held across the
    /// blocking resolution call.
    ///
    /// # Errors
    ///
    /// Returns a locate error carrying the chart name if resolution
    /// fails for any reason.
    pub async fn locate_with_cache(&self, handle: &ReleaseHandle) -> Result<PathBuf> {
        let chart = handle.chart();

        if let Some(path) = self.cache.get(&chart.name, chart.version_key()) {
            info!("Using cached chart {chart}: {}", path.display());
            return Ok(path);
        }

        let path = if chart.is_remote(&self.base_dir) {
            let source = self.source_for(&chart)?;
            self.locator.fetch(&chart, &source).await?
        } else {
            self.base_dir.join(&chart.name)
        };

        self.cache.insert(&chart.name, chart.version_key(), &path);
        Ok(path)
    }

    /// Locates and loads the chart's metadata, then checks it:
    /// missing declared dependencies are fatal; a non-application
    /// chart type and a deprecation flag are warnings only.
    ///
    /// # Errors
    ///
    /// Returns a load error on malformed chart data and a dependency
    /// error naming the chart when declared dependencies are absent.
    pub async fn load(&self, handle: &ReleaseHandle) -> Result<ChartManifest> {
        let path = self.locate_with_cache(handle).await?;
        let chart = handle.chart();

        let manifest = if path.is_dir() {
            let manifest = ChartManifest::from_dir(&path, &chart.name)?;
            let missing = manifest.missing_dependencies(&path);
            if !missing.is_empty() {
                return Err(ChartwaveError::Chart(ChartError::MissingDependencies {
                    name: chart.name,
                    missing,
                }));
            }
            manifest
        } else {
            ChartManifest::from_archive_path(&path, &chart.name)
        };

        if !manifest.is_application() {
            warn!(
                "{} charts are not installable",
                manifest.chart_type.as_deref().unwrap_or_default()
            );
        }
        if manifest.deprecated {
            warn!("Chart {} is deprecated. Please update your chart.", manifest.name);
        }

        Ok(manifest)
    }

    /// Downloads the chart's declared dependencies.
    ///
    /// No-op with an informational log for remote charts, for local
    /// archives, and when the reference requests skipping.
    ///
    /// # Errors
    ///
    /// Returns a dependency error naming the chart when the download
    /// manager reports failure.
    pub async fn update_dependencies(&self, handle: &ReleaseHandle) -> Result<()> {
        let chart = handle.chart();

        if chart.is_remote(&self.base_dir) {
            info!("Skipping updating dependencies for remote chart {chart}");
            return Ok(());
        }
        if chart.is_local_archive(&self.base_dir) {
            debug!("Skipping updating dependencies for downloaded chart {chart}");
            return Ok(());
        }
        if chart.skip_dependency_update {
            info!("Forced skipping updating dependencies for local chart {chart}");
            return Ok(());
        }

        let chart_dir = self.base_dir.join(&chart.name);
        self.locator
            .download_dependencies(&chart_dir, &chart.name, &self.sources, chart.verify)
            .await
    }

    /// Exports the resolved chart artifact into `dest_dir`, returning
    /// the exported path. No-op returning `None` for local charts.
    ///
    /// # Errors
    ///
    /// Returns an export error when directory creation or the copy
    /// fails.
    pub async fn export(&self, handle: &ReleaseHandle, dest_dir: &Path) -> Result<Option<PathBuf>> {
        let chart = handle.chart();

        if !chart.is_remote(&self.base_dir) {
            info!("Chart {chart} is local, skipping exporting");
            return Ok(None);
        }

        tokio::fs::create_dir_all(dest_dir).await.map_err(|e| {
            ChartwaveError::Chart(ChartError::Export {
                name: chart.name.clone(),
                reason: format!("cannot create {}: {e}", dest_dir.display()),
            })
        })?;
        restrict_permissions(dest_dir).await;

        let src = self.locate_with_cache(handle).await?;
        let file = src
            .file_name()
            .map_or_else(|| PathBuf::from(chart.base_name()), PathBuf::from);
        let dest = dest_dir.join(file);

        tokio::fs::copy(&src, &dest).await.map_err(|e| {
            ChartwaveError::Chart(ChartError::Export {
                name: chart.name.clone(),
                reason: format!("cannot copy to {}: {e}", dest.display()),
            })
        })?;

        Ok(Some(dest))
    }
}

/// Restricts a directory to owner/group access. Best-effort on
/// platforms without Unix permission bits.
async fn restrict_permissions(dir: &Path) {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o750);
        if let Err(e) = tokio::fs::set_permissions(dir, perms).await {
            debug!("Cannot restrict permissions on {}: {e}", dir.display());
        }
    }
    #[cfg(not(unix))]
    {
        let _ = dir;
    }
}
