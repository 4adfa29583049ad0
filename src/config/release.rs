//! Release configuration: one deployable chart instance.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::chart::ChartReference;

/// Configuration for a single release, identified by the unique pair
/// of name and namespace. Owned exclusively by the plan that contains
/// it; never shared across plans.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReleaseConfig {
    /// Logical release name.
    pub name: String,
    /// Target namespace.
    #[serde(default = "default_namespace")]
    pub namespace: String,
    /// Chart reference, resolved during plan building. The name may be
    /// rewritten by the resolver after the chart is relocated into the
    /// plan directory.
    pub chart: ChartReference,
    /// Free-form labels used for selective build filtering.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Values files applied when rendering manifests.
    #[serde(default)]
    pub values: Vec<String>,
    /// Inline value overrides applied after values files.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub options: HashMap<String, serde_yaml::Value>,
}

fn default_namespace() -> String {
    String::from("default")
}

impl ReleaseConfig {
    /// Creates a release with a bare chart reference, defaults
    /// elsewhere.
    #[must_use]
    pub fn new(name: impl Into<String>, chart: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: default_namespace(),
            chart: ChartReference::named(chart),
            tags: Vec::new(),
            values: Vec::new(),
            options: HashMap::new(),
        }
    }

    /// Returns the unique name `name@namespace` identifying this
    /// release within a plan.
    #[must_use]
    pub fn uniq(&self) -> String {
        format!("{}@{}", self.name, self.namespace)
    }

    /// Returns true if the release carries at least one of the given
    /// tags. An empty filter matches everything.
    #[must_use]
    pub fn has_any_tag(&self, tags: &[String]) -> bool {
        tags.is_empty() || tags.iter().any(|t| self.carries_tag(t))
    }

    /// Returns true if the release carries every one of the given
    /// tags.
    #[must_use]
    pub fn has_all_tags(&self, tags: &[String]) -> bool {
        tags.iter().all(|t| self.carries_tag(t))
    }

    /// Declared tags match with surrounding whitespace ignored; the
    /// declared list itself is never rewritten.
    fn carries_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|own| own.trim() == tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tagged(name: &str, tags: &[&str]) -> ReleaseConfig {
        let mut release = ReleaseConfig::new(name, "nginx");
        release.tags = tags.iter().map(|t| (*t).to_string()).collect();
        release
    }

    #[test]
    fn uniq_combines_name_and_namespace() {
        let mut release = ReleaseConfig::new("nginx", "bitnami/nginx");
        assert_eq!(release.uniq(), "nginx@default");

        release.namespace = String::from("web");
        assert_eq!(release.uniq(), "nginx@web");
    }

    #[test]
    fn any_tag_matching() {
        let release = tagged("r", &["a"]);
        assert!(release.has_any_tag(&[String::from("a"), String::from("b")]));
        assert!(!release.has_any_tag(&[String::from("b")]));
        assert!(release.has_any_tag(&[]));
    }

    #[test]
    fn all_tags_matching() {
        let release = tagged("r", &["a", "b"]);
        assert!(release.has_all_tags(&[String::from("a"), String::from("b")]));
        assert!(!release.has_all_tags(&[String::from("a"), String::from("c")]));
        assert!(release.has_all_tags(&[]));
    }

    #[test]
    fn padded_declared_tags_match_without_being_rewritten() {
        let release = tagged("r", &[" web "]);
        assert!(release.has_any_tag(&[String::from("web")]));
        assert!(release.has_all_tags(&[String::from("web")]));
        assert_eq!(release.tags, vec![String::from(" web ")]);
    }

    #[test]
    fn decodes_scalar_chart_inside_release() {
        let yaml = r"
name: nginx
namespace: web
chart: bitnami/nginx
tags: [frontend]
";
        let release: ReleaseConfig = serde_yaml::from_str(yaml).expect("decode failed");
        assert_eq!(release.chart.name, "bitnami/nginx");
        assert_eq!(release.namespace, "web");
        assert_eq!(release.tags, vec![String::from("frontend")]);
    }
}
