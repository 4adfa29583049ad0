//! Plan engine: building, persisting, importing, and diffing plans.

mod builder;
mod diff;
#[allow(clippy::module_inception)]
mod plan;

pub use builder::{
    CHARTS_EXPORT_DIR, ConfigRenderer, ManifestRenderer, PlanBuilder, filter_releases,
    normalize_tags,
};
pub use diff::{
    ChangeRecord, DiffEngine, DiffReport, FieldChange, LiveManifestProvider, manifest_digest,
};
pub use plan::{MANIFESTS_DIR, PLANFILE, Plan, PlanBody, validate_unique_releases};
