//! Declaration loading: the raw description of desired releases and
//! repositories consumed by the plan builder.
//!
//! The text itself comes from a templating collaborator; the default
//! [`FileTemplater`] simply reads the file verbatim.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

use crate::error::{ChartwaveError, ConfigError, Result};

use super::release::ReleaseConfig;
use super::repository::RepositoryConfig;

/// Default declaration file name.
pub const DEFAULT_DECLARATION_FILE: &str = "chartwave.yml";

/// The decoded body of a declaration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DeclarationBody {
    /// Project name, copied into the plan.
    pub project: String,
    /// Declared chart sources.
    #[serde(default)]
    pub repositories: Vec<RepositoryConfig>,
    /// Declared releases, in declaration order.
    #[serde(default)]
    pub releases: Vec<ReleaseConfig>,
}

/// Collaborator producing the raw declaration text consumed by the
/// plan builder.
pub trait Templater: Send + Sync {
    /// Renders the declaration source into YAML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be read or rendered.
    fn render(&self, source: &Path) -> Result<String>;
}

/// Templater that reads the declaration file as-is, with no template
/// expansion.
#[derive(Debug, Default)]
pub struct FileTemplater;

impl Templater for FileTemplater {
    fn render(&self, source: &Path) -> Result<String> {
        if !source.exists() {
            return Err(ChartwaveError::Config(ConfigError::FileNotFound {
                path: source.to_path_buf(),
            }));
        }

        info!("Loading declaration from: {}", source.display());
        std::fs::read_to_string(source).map_err(|e| {
            ChartwaveError::Config(ConfigError::ParseError {
                message: format!("Failed to read file: {e}"),
                location: Some(source.display().to_string()),
            })
        })
    }
}

impl DeclarationBody {
    /// Parses a declaration from YAML text.
    ///
    /// # Errors
    ///
    /// Returns a parse error carrying the source location when the
    /// YAML is invalid or a chart reference has an unknown shape.
    pub fn parse(content: &str, source: Option<&Path>) -> Result<Self> {
        debug!("Parsing declaration");

        let body: Self = serde_yaml::from_str(content).map_err(|e| {
            ChartwaveError::Config(ConfigError::ParseError {
                message: format!("YAML parse error: {e}"),
                location: source.map(|p| p.display().to_string()),
            })
        })?;

        debug!(
            "Parsed declaration for project {} ({} repositories, {} releases)",
            body.project,
            body.repositories.len(),
            body.releases.len()
        );
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_declaration() {
        let yaml = r"
project: test-project
releases: []
";
        let body = DeclarationBody::parse(yaml, None).expect("parse failed");
        assert_eq!(body.project, "test-project");
        assert!(body.repositories.is_empty());
        assert!(body.releases.is_empty());
    }

    #[test]
    fn parses_full_declaration() {
        let yaml = r#"
project: web-stack

repositories:
  - name: bitnami
    url: https://charts.bitnami.com/bitnami

releases:
  - name: nginx
    namespace: web
    chart: bitnami/nginx
    tags: [frontend]
  - name: redis
    chart:
      name: bitnami/redis
      version: 18.0.0
"#;
        let body = DeclarationBody::parse(yaml, None).expect("parse failed");
        assert_eq!(body.project, "web-stack");
        assert_eq!(body.repositories.len(), 1);
        assert_eq!(body.releases.len(), 2);
        assert_eq!(body.releases[1].chart.version.as_deref(), Some("18.0.0"));
    }

    #[test]
    fn parse_error_carries_location() {
        let err = DeclarationBody::parse(": not yaml", Some(Path::new("chartwave.yml")))
            .expect_err("parse should fail");
        assert!(err.to_string().contains("parse"));
    }

    #[test]
    fn file_templater_reports_missing_file() {
        let err = FileTemplater
            .render(Path::new("/nonexistent/chartwave.yml"))
            .expect_err("render should fail");
        assert!(err.is_not_found());
    }
}
