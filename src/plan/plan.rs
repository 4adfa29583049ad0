//! The plan artifact: a persisted declaration of the desired set of
//! releases and repositories for one deployment cycle.
//!
//! A plan moves through three states: *building* (in memory, mutable),
//! *persisted* (written once to the plan directory), and *imported*
//! (read back for comparison, immutable, no resolver access needed).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::{ReleaseConfig, RepositoryConfig};
use crate::error::{ChartwaveError, PlanError, Result};

/// Fixed planfile name inside the plan directory.
pub const PLANFILE: &str = "planfile";

/// Subdirectory holding rendered manifests, one `<uniq>.yml` each.
pub const MANIFESTS_DIR: &str = "manifests";

/// The serialized body of a plan.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PlanBody {
    /// Project name from the declaration.
    pub project: String,
    /// Engine version that produced the plan.
    pub version: String,
    /// When the plan was built.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Declared chart sources.
    #[serde(default)]
    pub repositories: Vec<RepositoryConfig>,
    /// Surviving releases, in declaration order.
    #[serde(default)]
    pub releases: Vec<ReleaseConfig>,
}

/// A plan plus its engine-private location and manifest bundle.
#[derive(Debug)]
pub struct Plan {
    dir: PathBuf,
    full_path: PathBuf,
    body: PlanBody,
    manifests: BTreeMap<String, String>,
}

impl Plan {
    /// Creates an empty plan rooted at the given directory.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let full_path = dir.join(PLANFILE);
        Self {
            dir,
            full_path,
            body: PlanBody::default(),
            manifests: BTreeMap::new(),
        }
    }

    /// Assembles a plan from a built body and its rendered manifests.
    #[must_use]
    pub fn from_parts(
        dir: impl Into<PathBuf>,
        body: PlanBody,
        manifests: BTreeMap<String, String>,
    ) -> Self {
        let mut plan = Self::new(dir);
        plan.body = body;
        plan.manifests = manifests;
        plan
    }

    /// Returns true if a planfile already exists at the directory.
    #[must_use]
    pub fn exists(dir: &Path) -> bool {
        dir.join(PLANFILE).exists()
    }

    /// Returns the plan directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the full planfile path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.full_path
    }

    /// Returns the plan body.
    #[must_use]
    pub const fn body(&self) -> &PlanBody {
        &self.body
    }

    /// Returns the releases in declaration order.
    #[must_use]
    pub fn releases(&self) -> &[ReleaseConfig] {
        &self.body.releases
    }

    /// Returns the rendered manifest for a unique name, if present.
    #[must_use]
    pub fn manifest(&self, uniq: &str) -> Option<&str> {
        self.manifests.get(uniq).map(String::as_str)
    }

    /// Persists the plan body and manifest bundle.
    ///
    /// The planfile is written to a temporary file and renamed, so a
    /// reader never observes a partial plan. The unique-name invariant
    /// is re-checked so a duplicate can never reach storage.
    ///
    /// # Errors
    ///
    /// Returns a duplicate error when two releases share a unique
    /// name, an encode error when serialization fails, and IO errors
    /// from the filesystem.
    pub fn export(&self) -> Result<()> {
        validate_unique_releases(&self.body.releases)?;

        std::fs::create_dir_all(&self.dir)?;

        let manifests_dir = self.dir.join(MANIFESTS_DIR);
        std::fs::create_dir_all(&manifests_dir)?;
        for (uniq, manifest) in &self.manifests {
            std::fs::write(manifests_dir.join(format!("{uniq}.yml")), manifest)?;
        }

        let content = serde_yaml::to_string(&self.body).map_err(|e| {
            ChartwaveError::Plan(PlanError::Encode {
                message: e.to_string(),
            })
        })?;

        let temp_path = self.full_path.with_extension("tmp");
        std::fs::write(&temp_path, &content)?;
        std::fs::rename(&temp_path, &self.full_path)?;

        info!("Planfile written to {}", self.full_path.display());
        Ok(())
    }

    /// Imports a previously persisted plan.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when no planfile exists at the directory and
    /// a decode error when the planfile is malformed.
    pub fn import(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        let full_path = dir.join(PLANFILE);

        if !full_path.exists() {
            return Err(ChartwaveError::Plan(PlanError::NotFound { path: full_path }));
        }

        let content = std::fs::read_to_string(&full_path)?;
        let body: PlanBody = serde_yaml::from_str(&content).map_err(|e| {
            ChartwaveError::Plan(PlanError::Decode {
                message: e.to_string(),
            })
        })?;

        let manifests_dir = dir.join(MANIFESTS_DIR);
        let mut manifests = BTreeMap::new();
        for release in &body.releases {
            let uniq = release.uniq();
            let path = manifests_dir.join(format!("{uniq}.yml"));
            if path.exists() {
                manifests.insert(uniq, std::fs::read_to_string(&path)?);
            } else {
                debug!("No manifest bundle for {uniq} at {}", path.display());
            }
        }

        debug!(
            "Imported plan for project {} ({} releases)",
            body.project,
            body.releases.len()
        );
        Ok(Self {
            dir,
            full_path,
            body,
            manifests,
        })
    }

    /// Renders a human-readable summary of the plan.
    #[must_use]
    pub fn pretty(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Project: {}", self.body.project);
        let _ = writeln!(out, "Version: {}", self.body.version);

        let _ = writeln!(out, "Repositories ({}):", self.body.repositories.len());
        for repo in &self.body.repositories {
            let _ = writeln!(out, "  - {} ({})", repo.name, repo.url);
        }

        let _ = writeln!(out, "Releases ({}):", self.body.releases.len());
        for release in &self.body.releases {
            let _ = writeln!(out, "  - {} [chart: {}]", release.uniq(), release.chart);
        }

        out
    }
}

/// Fails on the first pair of releases sharing a unique name.
///
/// # Errors
///
/// Returns a duplicate error naming the `name@namespace` pair.
pub fn validate_unique_releases(releases: &[ReleaseConfig]) -> Result<()> {
    let mut seen = std::collections::HashSet::new();
    for release in releases {
        let uniq = release.uniq();
        if !seen.insert(uniq.clone()) {
            return Err(ChartwaveError::Plan(PlanError::DuplicateRelease { uniq }));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_body() -> PlanBody {
        PlanBody {
            project: String::from("web-stack"),
            version: String::from("0.1.0"),
            created_at: Some(Utc::now()),
            repositories: vec![RepositoryConfig::new(
                "bitnami",
                "https://charts.bitnami.com/bitnami",
            )],
            releases: vec![
                ReleaseConfig::new("nginx", "bitnami/nginx"),
                ReleaseConfig::new("redis", "bitnami/redis"),
            ],
        }
    }

    #[test]
    fn export_then_import_round_trips_fields() {
        let tmp = TempDir::new().expect("tempdir failed");
        let mut manifests = BTreeMap::new();
        manifests.insert(
            String::from("nginx@default"),
            String::from("kind: Deployment\nreplicas: 2\n"),
        );

        let plan = Plan::from_parts(tmp.path(), sample_body(), manifests);
        plan.export().expect("export failed");
        assert!(Plan::exists(tmp.path()));

        let imported = Plan::import(tmp.path()).expect("import failed");
        assert_eq!(imported.body(), plan.body());
        assert_eq!(
            imported.manifest("nginx@default"),
            Some("kind: Deployment\nreplicas: 2\n")
        );
    }

    #[test]
    fn import_missing_planfile_is_not_found() {
        let tmp = TempDir::new().expect("tempdir failed");
        let err = Plan::import(tmp.path()).expect_err("import should fail");
        assert!(err.is_not_found());
    }

    #[test]
    fn duplicate_unique_name_never_reaches_storage() {
        let tmp = TempDir::new().expect("tempdir failed");
        let mut body = sample_body();
        body.releases.push(ReleaseConfig::new("nginx", "other/nginx"));

        let plan = Plan::from_parts(tmp.path(), body, BTreeMap::new());
        let err = plan.export().expect_err("export should fail");

        assert!(err.is_duplicate());
        assert!(!Plan::exists(tmp.path()));
    }

    #[test]
    fn same_name_in_different_namespaces_is_allowed() {
        let mut a = ReleaseConfig::new("nginx", "bitnami/nginx");
        a.namespace = String::from("web");
        let b = ReleaseConfig::new("nginx", "bitnami/nginx");

        validate_unique_releases(&[a, b]).expect("distinct namespaces should pass");
    }

    #[test]
    fn pretty_lists_releases_and_repositories() {
        let plan = Plan::from_parts("/tmp/plan", sample_body(), BTreeMap::new());
        let pretty = plan.pretty();
        assert!(pretty.contains("web-stack"));
        assert!(pretty.contains("nginx@default"));
        assert!(pretty.contains("bitnami"));
    }
}
