//! Diffing: structured comparison of manifest bundles between two
//! plans, or between a plan and the live system.
//!
//! Manifests are compared as parsed YAML documents, never as text, so
//! formatting-only differences produce no changes. A content digest is
//! checked first so identical bundles skip parsing entirely.

use async_trait::async_trait;
use serde::Serialize;
use serde_yaml::Value;
use sha2::{Digest, Sha256};
use std::fmt::Write as _;
use tracing::{debug, warn};

use crate::config::ReleaseConfig;
use crate::error::{ChartwaveError, DiffError, Result};

use super::plan::Plan;

/// One field-level difference inside a release's manifests.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FieldChange {
    /// Dotted path to the changed field, with `[i]` sequence indices.
    pub path: String,
    /// Previous value, absent when the field was added.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old: Option<Value>,
    /// New value, absent when the field was removed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new: Option<Value>,
}

/// All differences observed for one release.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChangeRecord {
    /// The release's unique name.
    pub uniq: String,
    /// The release exists only on the new side.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub added: bool,
    /// The release exists only on the old side.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub removed: bool,
    /// Field-level changes when the release exists on both sides.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub changes: Vec<FieldChange>,
}

/// The outcome of a diff run.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct DiffReport {
    /// Per-release change records, new-plan order first, removals
    /// last.
    pub records: Vec<ChangeRecord>,
}

impl DiffReport {
    /// Returns true if any release differs.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        !self.records.is_empty()
    }

    /// Renders a human-readable summary.
    #[must_use]
    pub fn pretty(&self) -> String {
        if self.records.is_empty() {
            return String::from("No changes\n");
        }

        let mut out = String::new();
        for record in &self.records {
            if record.added {
                let _ = writeln!(out, "+ {}", record.uniq);
            } else if record.removed {
                let _ = writeln!(out, "- {}", record.uniq);
            } else {
                let _ = writeln!(out, "~ {}", record.uniq);
                for change in &record.changes {
                    let _ = writeln!(
                        out,
                        "    {}: {} -> {}",
                        change.path,
                        render_value(change.old.as_ref()),
                        render_value(change.new.as_ref()),
                    );
                }
            }
        }
        out
    }
}

fn render_value(value: Option<&Value>) -> String {
    match value {
        None => String::from("<absent>"),
        Some(v) => serde_yaml::to_string(v)
            .map_or_else(|_| String::from("<opaque>"), |s| s.trim_end().to_string()),
    }
}

/// Supplies the currently applied manifest bundle for a release, or
/// `None` when the release is not installed.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LiveManifestProvider: Send + Sync {
    /// Fetches the live manifest bundle for the release.
    async fn manifest(&self, release: &ReleaseConfig) -> Result<Option<String>>;
}

/// Compares manifest bundles release by release.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiffEngine;

impl DiffEngine {
    /// Creates a diff engine.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Compares a freshly built plan against a previously persisted
    /// one. Releases present only in the old plan are reported as
    /// removed and logged, since nothing in the new plan will touch
    /// them.
    ///
    /// # Errors
    ///
    /// Returns a parse error naming the release when either side's
    /// manifest bundle is not valid YAML.
    pub fn diff_plans(self, old: &Plan, new: &Plan) -> Result<DiffReport> {
        let mut records = Vec::new();

        for release in new.releases() {
            let uniq = release.uniq();
            let new_manifest = new.manifest(&uniq).unwrap_or_default();

            match find_manifest(old, &uniq) {
                None => records.push(ChangeRecord {
                    uniq,
                    added: true,
                    removed: false,
                    changes: Vec::new(),
                }),
                Some(old_manifest) => {
                    if let Some(record) = diff_release(&uniq, old_manifest, new_manifest)? {
                        records.push(record);
                    }
                }
            }
        }

        for release in old.releases() {
            let uniq = release.uniq();
            if new.releases().iter().any(|r| r.uniq() == uniq) {
                continue;
            }
            warn!("Release {uniq} was found in previous planfile but is not affected by the new plan");
            records.push(ChangeRecord {
                uniq,
                added: false,
                removed: true,
                changes: Vec::new(),
            });
        }

        Ok(DiffReport { records })
    }

    /// Compares a plan against the live system through the given
    /// provider. A release the provider does not know is reported as
    /// added.
    ///
    /// # Errors
    ///
    /// Propagates provider failures and manifest parse errors, both
    /// naming the release.
    pub async fn diff_live(
        self,
        plan: &Plan,
        provider: &dyn LiveManifestProvider,
    ) -> Result<DiffReport> {
        let mut records = Vec::new();

        for release in plan.releases() {
            let uniq = release.uniq();
            let planned = plan.manifest(&uniq).unwrap_or_default();

            let live = provider.manifest(release).await.map_err(|e| {
                ChartwaveError::Diff(DiffError::Provider {
                    uniq: uniq.clone(),
                    reason: e.to_string(),
                })
            })?;

            match live {
                None => records.push(ChangeRecord {
                    uniq,
                    added: true,
                    removed: false,
                    changes: Vec::new(),
                }),
                Some(live) => {
                    if let Some(record) = diff_release(&uniq, &live, planned)? {
                        records.push(record);
                    }
                }
            }
        }

        Ok(DiffReport { records })
    }
}

fn find_manifest<'a>(plan: &'a Plan, uniq: &str) -> Option<&'a str> {
    plan.releases()
        .iter()
        .any(|r| r.uniq() == uniq)
        .then(|| plan.manifest(uniq).unwrap_or_default())
}

/// Diffs one release's bundles, digest fast path first.
fn diff_release(uniq: &str, old: &str, new: &str) -> Result<Option<ChangeRecord>> {
    if manifest_digest(old) == manifest_digest(new) {
        debug!("Manifests for {uniq} share a digest, skipping parse");
        return Ok(None);
    }

    let old_docs = parse_documents(uniq, old)?;
    let new_docs = parse_documents(uniq, new)?;

    let mut changes = Vec::new();
    diff_values("", &old_docs, &new_docs, &mut changes);

    if changes.is_empty() {
        // Textual difference only, e.g. formatting or comments.
        return Ok(None);
    }

    Ok(Some(ChangeRecord {
        uniq: uniq.to_string(),
        added: false,
        removed: false,
        changes,
    }))
}

/// Content digest of a manifest bundle.
#[must_use]
pub fn manifest_digest(manifest: &str) -> String {
    hex::encode(Sha256::digest(manifest.as_bytes()))
}

/// Parses a multi-document YAML bundle into a sequence value.
fn parse_documents(uniq: &str, bundle: &str) -> Result<Value> {
    use serde::Deserialize as _;

    let mut docs = Vec::new();
    for document in serde_yaml::Deserializer::from_str(bundle) {
        let value = Value::deserialize(document).map_err(|e| {
            ChartwaveError::Diff(DiffError::ManifestParse {
                uniq: uniq.to_string(),
                reason: e.to_string(),
            })
        })?;
        docs.push(value);
    }

    if docs.len() == 1 {
        Ok(docs.into_iter().next().unwrap_or(Value::Null))
    } else {
        Ok(Value::Sequence(docs))
    }
}

/// Recursively records leaf-level differences between two values.
fn diff_values(path: &str, old: &Value, new: &Value, out: &mut Vec<FieldChange>) {
    match (old, new) {
        (Value::Mapping(old_map), Value::Mapping(new_map)) => {
            for (key, old_value) in old_map {
                let child = child_path(path, key);
                match new_map.get(key) {
                    Some(new_value) => diff_values(&child, old_value, new_value, out),
                    None => out.push(FieldChange {
                        path: child,
                        old: Some(old_value.clone()),
                        new: None,
                    }),
                }
            }
            for (key, new_value) in new_map {
                if !old_map.contains_key(key) {
                    out.push(FieldChange {
                        path: child_path(path, key),
                        old: None,
                        new: Some(new_value.clone()),
                    });
                }
            }
        }
        (Value::Sequence(old_seq), Value::Sequence(new_seq)) => {
            let len = old_seq.len().max(new_seq.len());
            for i in 0..len {
                let child = format!("{path}[{i}]");
                match (old_seq.get(i), new_seq.get(i)) {
                    (Some(o), Some(n)) => diff_values(&child, o, n, out),
                    (Some(o), None) => out.push(FieldChange {
                        path: child,
                        old: Some(o.clone()),
                        new: None,
                    }),
                    (None, Some(n)) => out.push(FieldChange {
                        path: child,
                        old: None,
                        new: Some(n.clone()),
                    }),
                    (None, None) => {}
                }
            }
        }
        _ if old == new => {}
        _ => out.push(FieldChange {
            path: path.to_string(),
            old: Some(old.clone()),
            new: Some(new.clone()),
        }),
    }
}

fn child_path(path: &str, key: &Value) -> String {
    let key = match key {
        Value::String(s) => s.clone(),
        other => serde_yaml::to_string(other)
            .map_or_else(|_| String::from("?"), |s| s.trim_end().to_string()),
    };
    if path.is_empty() {
        key
    } else {
        format!("{path}.{key}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::PlanBody;
    use std::collections::BTreeMap;

    fn plan_with(releases: &[(&str, &str)]) -> Plan {
        let mut manifests = BTreeMap::new();
        let mut body = PlanBody {
            project: String::from("test"),
            version: String::from("0.1.0"),
            ..PlanBody::default()
        };
        for (name, manifest) in releases {
            body.releases.push(ReleaseConfig::new(*name, "local"));
            manifests.insert(format!("{name}@default"), (*manifest).to_string());
        }
        Plan::from_parts("/tmp/unused", body, manifests)
    }

    #[test]
    fn identical_plans_produce_no_changes() {
        let old = plan_with(&[("a", "replicas: 2\n"), ("b", "replicas: 1\n")]);
        let new = plan_with(&[("a", "replicas: 2\n"), ("b", "replicas: 1\n")]);

        let report = DiffEngine::new().diff_plans(&old, &new).expect("diff failed");
        assert!(!report.has_changes());
    }

    #[test]
    fn formatting_only_difference_is_not_a_change() {
        let old = plan_with(&[("a", "replicas: 2\nimage: nginx\n")]);
        let new = plan_with(&[("a", "image: nginx\nreplicas: 2\n")]);

        let report = DiffEngine::new().diff_plans(&old, &new).expect("diff failed");
        assert!(!report.has_changes());
    }

    #[test]
    fn field_change_reports_path_and_both_values() {
        let old = plan_with(&[("a", "spec:\n  replicas: 2\n")]);
        let new = plan_with(&[("a", "spec:\n  replicas: 3\n")]);

        let report = DiffEngine::new().diff_plans(&old, &new).expect("diff failed");
        assert_eq!(report.records.len(), 1);
        let change = &report.records[0].changes[0];
        assert_eq!(change.path, "spec.replicas");
        assert_eq!(change.old, Some(Value::from(2)));
        assert_eq!(change.new, Some(Value::from(3)));
    }

    #[test]
    fn added_and_removed_releases_are_recorded() {
        let old = plan_with(&[("a", "x: 1\n"), ("b", "x: 1\n")]);
        let new = plan_with(&[("a", "x: 1\n"), ("c", "x: 1\n")]);

        let report = DiffEngine::new().diff_plans(&old, &new).expect("diff failed");
        assert_eq!(report.records.len(), 2);

        let added = report.records.iter().find(|r| r.added).expect("no added");
        assert_eq!(added.uniq, "c@default");
        let removed = report.records.iter().find(|r| r.removed).expect("no removed");
        assert_eq!(removed.uniq, "b@default");
    }

    #[test]
    fn multi_document_bundles_diff_per_document() {
        let old = plan_with(&[("a", "kind: Deployment\n---\nkind: Service\nport: 80\n")]);
        let new = plan_with(&[("a", "kind: Deployment\n---\nkind: Service\nport: 8080\n")]);

        let report = DiffEngine::new().diff_plans(&old, &new).expect("diff failed");
        let change = &report.records[0].changes[0];
        assert_eq!(change.path, "[1].port");
    }

    #[test]
    fn malformed_manifest_is_a_parse_error_naming_the_release() {
        let old = plan_with(&[("a", "x: 1\n")]);
        let new = plan_with(&[("a", "x: [unclosed\n")]);

        let err = DiffEngine::new()
            .diff_plans(&old, &new)
            .expect_err("diff should fail");
        assert!(err.to_string().contains("a@default"));
    }

    #[tokio::test]
    async fn live_diff_uses_the_provider() {
        let plan = plan_with(&[("a", "replicas: 3\n"), ("b", "x: 1\n")]);

        let mut provider = MockLiveManifestProvider::new();
        provider
            .expect_manifest()
            .returning(|release| match release.name.as_str() {
                "a" => Ok(Some(String::from("replicas: 2\n"))),
                _ => Ok(None),
            });

        let report = DiffEngine::new()
            .diff_live(&plan, &provider)
            .await
            .expect("diff failed");

        assert_eq!(report.records.len(), 2);
        assert_eq!(report.records[0].uniq, "a@default");
        assert_eq!(report.records[0].changes[0].path, "replicas");
        assert!(report.records[1].added);
    }

    #[test]
    fn pretty_marks_added_removed_and_changed() {
        let report = DiffReport {
            records: vec![
                ChangeRecord {
                    uniq: String::from("a@default"),
                    added: true,
                    removed: false,
                    changes: vec![],
                },
                ChangeRecord {
                    uniq: String::from("b@default"),
                    added: false,
                    removed: true,
                    changes: vec![],
                },
            ],
        };

        let pretty = report.pretty();
        assert!(pretty.contains("+ a@default"));
        assert!(pretty.contains("- b@default"));
    }
}
