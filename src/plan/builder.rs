//! Plan building: from a parsed declaration to a persisted plan.
//!
//! The pipeline runs in a fixed order: tag normalization, release
//! filtering, repository registration, concurrent chart resolution,
//! the unique-name check, manifest rendering, and finally persistence.
//! Resolution failures surface per release with the release named.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::chart::{ChartCache, ChartLocator, ChartResolver, ReleaseHandle, RepositoryLocator};
use crate::config::{DeclarationBody, ReleaseConfig};
use crate::error::{ChartwaveError, Result};
use crate::registry::RepositoryRegistry;

use super::plan::{Plan, PlanBody, validate_unique_releases};

/// Subdirectory of the plan directory receiving exported chart
/// archives, making a persisted plan self-contained.
pub const CHARTS_EXPORT_DIR: &str = "charts";

/// Staging directory for chart exports while a build is in flight.
/// Promoted to [`CHARTS_EXPORT_DIR`] only when the build succeeds.
const CHARTS_STAGING_DIR: &str = ".charts.tmp";

/// Renders the manifest bundle for one resolved release.
#[async_trait]
pub trait ManifestRenderer: Send + Sync {
    /// Produces the manifest text stored alongside the planfile.
    async fn render(&self, release: &ReleaseConfig) -> Result<String>;
}

/// Default renderer: the release's own configuration, serialized. The
/// execution layer re-renders against the chart at apply time; the
/// plan only needs a stable text to diff.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConfigRenderer;

#[async_trait]
impl ManifestRenderer for ConfigRenderer {
    async fn render(&self, release: &ReleaseConfig) -> Result<String> {
        serde_yaml::to_string(release)
            .map_err(|e| ChartwaveError::internal(format!("cannot render {}: {e}", release.uniq())))
    }
}

/// Builds plans from declarations.
pub struct PlanBuilder {
    plan_dir: PathBuf,
    base_dir: PathBuf,
    locator: Option<Arc<dyn ChartLocator>>,
    renderer: Arc<dyn ManifestRenderer>,
    tags: Vec<String>,
    match_all_tags: bool,
}

impl PlanBuilder {
    /// Creates a builder targeting the given plan directory. Local
    /// chart references resolve against the current directory unless
    /// [`Self::with_base_dir`] overrides it.
    #[must_use]
    pub fn new(plan_dir: impl Into<PathBuf>) -> Self {
        Self {
            plan_dir: plan_dir.into(),
            base_dir: PathBuf::from("."),
            locator: None,
            renderer: Arc::new(ConfigRenderer),
            tags: Vec::new(),
            match_all_tags: false,
        }
    }

    /// Sets the base directory for local chart references.
    #[must_use]
    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = base_dir.into();
        self
    }

    /// Sets the tag filter. Empty means every release survives.
    #[must_use]
    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    /// Requires releases to carry every filter tag instead of any.
    #[must_use]
    pub const fn match_all_tags(mut self, yes: bool) -> Self {
        self.match_all_tags = yes;
        self
    }

    /// Substitutes the chart location protocol. Defaults to the HTTP
    /// repository locator downloading into the plan directory.
    #[must_use]
    pub fn with_locator(mut self, locator: Arc<dyn ChartLocator>) -> Self {
        self.locator = Some(locator);
        self
    }

    /// Substitutes the manifest renderer.
    #[must_use]
    pub fn with_renderer(mut self, renderer: Arc<dyn ManifestRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    /// Runs the build pipeline and persists the resulting plan.
    ///
    /// # Errors
    ///
    /// Fails on invalid or duplicate repositories, on any release
    /// whose chart cannot be resolved, on duplicate unique names, and
    /// on persistence failures. Nothing is persisted on failure:
    /// exported archives are staged and removed when the build fails.
    pub async fn build(&self, declaration: DeclarationBody) -> Result<Plan> {
        let staging = self.plan_dir.join(CHARTS_STAGING_DIR);

        let result = self.build_inner(declaration, &staging).await;
        if result.is_err() {
            let _ = std::fs::remove_dir_all(&staging);
        }
        result
    }

    async fn build_inner(&self, declaration: DeclarationBody, staging: &Path) -> Result<Plan> {
        let mut filter = self.tags.clone();
        normalize_tags(&mut filter);

        // Only the requested filter is normalized; declared tag lists
        // are persisted exactly as written.
        let releases = filter_releases(declaration.releases, &filter, self.match_all_tags);
        if releases.is_empty() {
            warn!("Plan contains 0 releases");
        }

        let mut registry = RepositoryRegistry::new();
        for repo in declaration.repositories {
            registry.add(repo)?;
        }

        let resolver = self.resolver(registry.configs().to_vec(), staging)?;
        let handles: Vec<Arc<ReleaseHandle>> = releases
            .into_iter()
            .map(|r| Arc::new(ReleaseHandle::from(r)))
            .collect();

        // One task per release; awaited in declaration order so the
        // plan body and the first error are deterministic.
        let mut tasks = Vec::with_capacity(handles.len());
        for handle in &handles {
            let resolver = resolver.clone();
            let handle = Arc::clone(handle);
            let export_dir = staging.to_path_buf();
            tasks.push(tokio::spawn(async move {
                resolve_release(&resolver, &handle, &export_dir).await
            }));
        }

        // Once one release fails, the outstanding tasks are aborted
        // and drained rather than left resolving detached.
        let mut first_error: Option<ChartwaveError> = None;
        for task in tasks {
            if first_error.is_some() {
                task.abort();
                let _ = task.await;
                continue;
            }
            match task.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => first_error = Some(e),
                Err(e) => {
                    first_error =
                        Some(ChartwaveError::internal(format!("resolution task failed: {e}")));
                }
            }
        }
        if let Some(e) = first_error {
            return Err(e);
        }

        let mut releases = Vec::with_capacity(handles.len());
        for handle in handles {
            let handle = Arc::try_unwrap(handle).map_err(|_| {
                ChartwaveError::internal("release handle still shared after resolution")
            })?;
            releases.push(handle.into_config());
        }

        validate_unique_releases(&releases)?;

        let mut manifests = BTreeMap::new();
        for release in &releases {
            manifests.insert(release.uniq(), self.renderer.render(release).await?);
        }

        self.promote_staged_charts(staging)?;

        let body = PlanBody {
            project: declaration.project,
            version: String::from(env!("CARGO_PKG_VERSION")),
            created_at: Some(Utc::now()),
            repositories: registry.into_configs(),
            releases,
        };

        let plan = Plan::from_parts(&self.plan_dir, body, manifests);
        plan.export()?;
        info!("Plan built with {} releases", plan.releases().len());
        Ok(plan)
    }

    /// Moves staged chart exports into their final `charts/` home.
    /// No-op when nothing was exported.
    fn promote_staged_charts(&self, staging: &Path) -> Result<()> {
        if !staging.exists() {
            return Ok(());
        }

        let charts_dir = self.plan_dir.join(CHARTS_EXPORT_DIR);
        if charts_dir.exists() {
            std::fs::remove_dir_all(&charts_dir)?;
        }
        std::fs::rename(staging, &charts_dir)?;
        Ok(())
    }

    fn resolver(
        &self,
        sources: Vec<crate::config::RepositoryConfig>,
        download_dir: &Path,
    ) -> Result<ChartResolver> {
        let locator = match &self.locator {
            Some(locator) => Arc::clone(locator),
            None => Arc::new(RepositoryLocator::new(download_dir)?),
        };
        Ok(ChartResolver::new(
            &self.base_dir,
            Arc::new(ChartCache::new()),
            locator,
            sources,
        ))
    }
}

/// Resolves one release: dependencies first so the dependency check
/// sees vendored copies, then metadata checks, then export into the
/// plan directory with the chart name rewritten to the exported copy.
async fn resolve_release(
    resolver: &ChartResolver,
    handle: &ReleaseHandle,
    export_dir: &Path,
) -> Result<()> {
    debug!("Resolving chart for {}", handle.uniq());

    resolver.update_dependencies(handle).await?;
    resolver.load(handle).await?;

    if let Some(exported) = resolver.export(handle, export_dir).await? {
        if let Some(file) = exported.file_name().and_then(|f| f.to_str()) {
            handle.set_chart_name(format!("{CHARTS_EXPORT_DIR}/{file}"));
        }
    }

    Ok(())
}

/// Trims surrounding whitespace from each tag and sorts the list, so
/// equal tag sets compare equal regardless of declaration order.
pub fn normalize_tags(tags: &mut Vec<String>) {
    for tag in tags.iter_mut() {
        let trimmed = tag.trim();
        if trimmed.len() != tag.len() {
            *tag = trimmed.to_string();
        }
    }
    tags.sort_unstable();
}

/// Keeps releases matching the tag filter, preserving declaration
/// order. An empty filter keeps everything.
#[must_use]
pub fn filter_releases(
    releases: Vec<ReleaseConfig>,
    tags: &[String],
    match_all: bool,
) -> Vec<ReleaseConfig> {
    releases
        .into_iter()
        .filter(|release| {
            let keep = if match_all {
                release.has_all_tags(tags)
            } else {
                release.has_any_tag(tags)
            };
            if !keep {
                debug!("Skipping release {} by tags", release.uniq());
            }
            keep
        })
        .collect()
}
