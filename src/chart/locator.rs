//! Chart location protocol: fetching remote chart artifacts and
//! their dependencies from repository sources.

use async_trait::async_trait;
use reqwest::{Certificate, Client, Identity};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::config::{ChartReference, RepositoryConfig};
use crate::error::{ChartError, ChartwaveError, Result};

use super::metadata::{CHARTS_SUBDIR, ChartManifest};

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Protocol for turning a remote chart reference into an on-disk
/// artifact. Implemented over HTTP by [`RepositoryLocator`]; tests
/// substitute counting fakes.
#[async_trait]
pub trait ChartLocator: Send + Sync {
    /// Downloads the chart artifact from the source repository and
    /// returns its local path.
    async fn fetch(&self, chart: &ChartReference, source: &RepositoryConfig) -> Result<PathBuf>;

    /// Downloads any dependencies declared by the chart at `chart_dir`
    /// that are not already vendored, resolving `@name` repository
    /// references against `sources`.
    async fn download_dependencies(
        &self,
        chart_dir: &Path,
        chart_name: &str,
        sources: &[RepositoryConfig],
        verify: bool,
    ) -> Result<()>;
}

/// HTTP chart locator downloading `<url>/<name>-<version>.tgz` style
/// artifacts into a working directory.
#[derive(Debug)]
pub struct RepositoryLocator {
    client: Client,
    download_dir: PathBuf,
}

impl RepositoryLocator {
    /// Creates a locator downloading into the given directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(download_dir: impl Into<PathBuf>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| ChartwaveError::internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            download_dir: download_dir.into(),
        })
    }

    /// Archive file name for a chart at an optional version.
    fn archive_name(base_name: &str, version: Option<&str>) -> String {
        match version {
            Some(v) => format!("{base_name}-{v}.tgz"),
            None => format!("{base_name}.tgz"),
        }
    }

    /// Returns the client to use for a source. Sources carrying TLS
    /// options get a dedicated client; everything else shares the
    /// default one.
    fn client_for(&self, source: &RepositoryConfig, chart_name: &str) -> Result<Client> {
        if !source.insecure && source.ca_file.is_none() && source.cert_file.is_none() {
            return Ok(self.client.clone());
        }

        let mut builder = Client::builder().timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS));

        if source.insecure {
            debug!("Skipping server certificate verification for {}", source.url);
            builder = builder.danger_accept_invalid_certs(true);
        }

        if let Some(ca_file) = &source.ca_file {
            let pem = std::fs::read(ca_file).map_err(|e| {
                ChartwaveError::Chart(ChartError::locate(
                    chart_name,
                    format!("cannot read CA bundle {ca_file}: {e}"),
                ))
            })?;
            let cert = Certificate::from_pem(&pem).map_err(|e| {
                ChartwaveError::Chart(ChartError::locate(
                    chart_name,
                    format!("invalid CA bundle {ca_file}: {e}"),
                ))
            })?;
            builder = builder.add_root_certificate(cert);
        }

        if let (Some(cert_file), Some(key_file)) = (&source.cert_file, &source.key_file) {
            let mut pem = std::fs::read(cert_file).map_err(|e| {
                ChartwaveError::Chart(ChartError::locate(
                    chart_name,
                    format!("cannot read client certificate {cert_file}: {e}"),
                ))
            })?;
            let key = std::fs::read(key_file).map_err(|e| {
                ChartwaveError::Chart(ChartError::locate(
                    chart_name,
                    format!("cannot read client key {key_file}: {e}"),
                ))
            })?;
            pem.extend(key);
            let identity = Identity::from_pem(&pem).map_err(|e| {
                ChartwaveError::Chart(ChartError::locate(
                    chart_name,
                    format!("invalid client identity {cert_file}: {e}"),
                ))
            })?;
            builder = builder.identity(identity);
        }

        builder.build().map_err(|e| {
            ChartwaveError::Chart(ChartError::locate(
                chart_name,
                format!("cannot create HTTP client: {e}"),
            ))
        })
    }

    /// Downloads one artifact URL into the destination file.
    async fn download(
        &self,
        url: &str,
        dest: &Path,
        source: &RepositoryConfig,
        chart_name: &str,
    ) -> Result<()> {
        debug!("Fetching {url}");

        let client = self.client_for(source, chart_name)?;
        let mut request = client.get(url);
        if let Some(username) = &source.username {
            request = request.basic_auth(username, source.password.as_deref());
        }

        let response = request
            .send()
            .await
            .map_err(|e| ChartwaveError::Chart(ChartError::locate(chart_name, e.to_string())))?;

        if !response.status().is_success() {
            return Err(ChartwaveError::Chart(ChartError::locate(
                chart_name,
                format!("{url} returned {}", response.status()),
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ChartwaveError::Chart(ChartError::locate(chart_name, e.to_string())))?;

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(dest, &bytes).await?;

        Ok(())
    }

    /// Resolves a dependency's repository field to a base URL, looking
    /// up `@name` references in the registered sources.
    fn dependency_url<'a>(
        repository: &'a str,
        sources: &'a [RepositoryConfig],
    ) -> Option<&'a str> {
        if let Some(name) = repository.strip_prefix('@') {
            return sources.iter().find(|s| s.name == name).map(|s| s.url.as_str());
        }
        Some(repository)
    }
}

#[async_trait]
impl ChartLocator for RepositoryLocator {
    async fn fetch(&self, chart: &ChartReference, source: &RepositoryConfig) -> Result<PathBuf> {
        let file = Self::archive_name(chart.base_name(), chart.version.as_deref());
        let url = format!("{}/{file}", source.url.trim_end_matches('/'));
        let dest = self.download_dir.join(&file);

        self.download(&url, &dest, source, &chart.name).await?;

        if chart.verify {
            // Provenance rides next to the artifact; a missing file
            // fails the fetch when verification was requested.
            let prov_url = format!("{url}.prov");
            let prov_dest = self.download_dir.join(format!("{file}.prov"));
            self.download(&prov_url, &prov_dest, source, &chart.name)
                .await?;
        }

        info!("Fetched chart {} to {}", chart.name, dest.display());
        Ok(dest)
    }

    async fn download_dependencies(
        &self,
        chart_dir: &Path,
        chart_name: &str,
        sources: &[RepositoryConfig],
        verify: bool,
    ) -> Result<()> {
        let manifest = ChartManifest::from_dir(chart_dir, chart_name)?;
        let missing = manifest.missing_dependencies(chart_dir);
        if missing.is_empty() {
            debug!("All dependencies of {chart_name} already vendored");
            return Ok(());
        }

        for dep in manifest.dependencies.iter().filter(|d| missing.contains(&d.name)) {
            let repository = dep.repository.as_deref().ok_or_else(|| {
                ChartwaveError::Chart(ChartError::DependencyUpdate {
                    name: chart_name.to_string(),
                    reason: format!("dependency {} declares no repository", dep.name),
                })
            })?;

            let base = Self::dependency_url(repository, sources).ok_or_else(|| {
                ChartwaveError::Chart(ChartError::DependencyUpdate {
                    name: chart_name.to_string(),
                    reason: format!("unknown repository {repository} for dependency {}", dep.name),
                })
            })?;

            let file = Self::archive_name(&dep.name, dep.version.as_deref());
            let url = format!("{}/{file}", base.trim_end_matches('/'));
            let dest = chart_dir.join(CHARTS_SUBDIR).join(&file);

            let source = sources
                .iter()
                .find(|s| s.url == base)
                .cloned()
                .unwrap_or_else(|| RepositoryConfig::new("", base));

            self.download(&url, &dest, &source, chart_name)
                .await
                .map_err(|e| {
                    ChartwaveError::Chart(ChartError::DependencyUpdate {
                        name: chart_name.to_string(),
                        reason: e.to_string(),
                    })
                })?;

            if verify {
                let prov_url = format!("{url}.prov");
                let prov_dest = chart_dir.join(CHARTS_SUBDIR).join(format!("{file}.prov"));
                self.download(&prov_url, &prov_dest, &source, chart_name)
                    .await
                    .map_err(|e| {
                        ChartwaveError::Chart(ChartError::DependencyUpdate {
                            name: chart_name.to_string(),
                            reason: e.to_string(),
                        })
                    })?;
            }

            info!("Downloaded dependency {} for {chart_name}", dep.name);
        }

        Ok(())
    }
}
