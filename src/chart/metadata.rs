//! Chart metadata: the `Chart.yaml` contents of a resolved chart.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{ChartError, ChartwaveError, Result};

/// File holding a chart's metadata inside a chart directory.
const CHART_MANIFEST_FILE: &str = "Chart.yaml";

/// Subdirectory holding vendored chart dependencies.
pub const CHARTS_SUBDIR: &str = "charts";

/// Decoded chart metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChartManifest {
    /// Chart name.
    pub name: String,
    /// Chart version.
    #[serde(default)]
    pub version: String,
    /// Chart type; empty or "application" means installable.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub chart_type: Option<String>,
    /// Whether the chart is marked deprecated.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub deprecated: bool,
    /// Declared sub-chart dependencies.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<ChartDependency>,
}

/// One declared chart dependency.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChartDependency {
    /// Dependency chart name.
    pub name: String,
    /// Required version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Source repository: an `https://` URL or an `@name` reference
    /// into the repository registry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
}

impl ChartManifest {
    /// Reads metadata from a chart directory's `Chart.yaml`.
    ///
    /// # Errors
    ///
    /// Returns a load error when the file is missing or malformed.
    pub fn from_dir(dir: &Path, chart_name: &str) -> Result<Self> {
        let path = dir.join(CHART_MANIFEST_FILE);
        let content = std::fs::read_to_string(&path).map_err(|e| {
            ChartwaveError::Chart(ChartError::load(
                chart_name,
                format!("cannot read {}: {e}", path.display()),
            ))
        })?;

        serde_yaml::from_str(&content).map_err(|e| {
            ChartwaveError::Chart(ChartError::load(
                chart_name,
                format!("malformed {}: {e}", path.display()),
            ))
        })
    }

    /// Derives minimal metadata from an archive file name such as
    /// `nginx-1.2.3.tgz`. Archives are not unpacked, so dependency
    /// information is unavailable for them.
    #[must_use]
    pub fn from_archive_path(path: &Path, fallback_name: &str) -> Self {
        let stem = path
            .file_name()
            .and_then(|n| n.to_str())
            .map_or(fallback_name, |n| {
                n.trim_end_matches(".tgz").trim_end_matches(".tar.gz")
            });

        match stem.rsplit_once('-') {
            Some((name, version)) if version.starts_with(|c: char| c.is_ascii_digit()) => Self {
                name: name.to_string(),
                version: version.to_string(),
                ..Self::default()
            },
            _ => Self {
                name: stem.to_string(),
                ..Self::default()
            },
        }
    }

    /// Returns true if the chart type makes it installable.
    #[must_use]
    pub fn is_application(&self) -> bool {
        matches!(self.chart_type.as_deref(), None | Some("") | Some("application"))
    }

    /// Returns declared dependencies with no vendored copy under
    /// `charts/` in the given chart directory.
    #[must_use]
    pub fn missing_dependencies(&self, chart_dir: &Path) -> Vec<String> {
        let charts_dir = chart_dir.join(CHARTS_SUBDIR);
        self.dependencies
            .iter()
            .filter(|dep| !dependency_present(&charts_dir, dep))
            .map(|dep| dep.name.clone())
            .collect()
    }
}

/// A dependency is present when `charts/` contains either an unpacked
/// directory or an archive starting with the dependency name.
fn dependency_present(charts_dir: &Path, dep: &ChartDependency) -> bool {
    if charts_dir.join(&dep.name).is_dir() {
        return true;
    }

    let Ok(entries) = std::fs::read_dir(charts_dir) else {
        return false;
    };
    entries.filter_map(std::result::Result::ok).any(|entry| {
        entry
            .file_name()
            .to_str()
            .is_some_and(|n| n.starts_with(&format!("{}-", dep.name)) && n.ends_with(".tgz"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_chart(dir: &Path, manifest: &str) {
        std::fs::create_dir_all(dir).expect("mkdir failed");
        std::fs::write(dir.join(CHART_MANIFEST_FILE), manifest).expect("write failed");
    }

    #[test]
    fn reads_manifest_from_directory() {
        let tmp = TempDir::new().expect("tempdir failed");
        write_chart(
            tmp.path(),
            "name: nginx\nversion: 1.2.3\ndependencies:\n  - name: common\n    version: 2.x\n",
        );

        let manifest = ChartManifest::from_dir(tmp.path(), "nginx").expect("load failed");
        assert_eq!(manifest.name, "nginx");
        assert_eq!(manifest.version, "1.2.3");
        assert_eq!(manifest.dependencies.len(), 1);
        assert!(manifest.is_application());
    }

    #[test]
    fn missing_manifest_is_a_load_error() {
        let tmp = TempDir::new().expect("tempdir failed");
        let err = ChartManifest::from_dir(tmp.path(), "nginx").expect_err("load should fail");
        assert_eq!(err.kind(), crate::error::ErrorKind::Load);
        assert!(err.to_string().contains("nginx"));
    }

    #[test]
    fn derives_metadata_from_archive_name() {
        let manifest =
            ChartManifest::from_archive_path(Path::new("/tmp/nginx-1.2.3.tgz"), "nginx");
        assert_eq!(manifest.name, "nginx");
        assert_eq!(manifest.version, "1.2.3");
        assert!(manifest.dependencies.is_empty());
    }

    #[test]
    fn detects_missing_and_vendored_dependencies() {
        let tmp = TempDir::new().expect("tempdir failed");
        write_chart(
            tmp.path(),
            "name: app\nversion: 0.1.0\ndependencies:\n  - name: common\n  - name: redis\n",
        );
        std::fs::create_dir_all(tmp.path().join(CHARTS_SUBDIR).join("common"))
            .expect("mkdir failed");

        let manifest = ChartManifest::from_dir(tmp.path(), "app").expect("load failed");
        assert_eq!(manifest.missing_dependencies(tmp.path()), vec!["redis"]);

        std::fs::write(
            tmp.path().join(CHARTS_SUBDIR).join("redis-18.0.0.tgz"),
            b"archive",
        )
        .expect("write failed");
        assert!(manifest.missing_dependencies(tmp.path()).is_empty());
    }

    #[test]
    fn non_application_type_is_flagged() {
        let manifest = ChartManifest {
            name: String::from("lib"),
            chart_type: Some(String::from("library")),
            ..ChartManifest::default()
        };
        assert!(!manifest.is_application());
    }
}
