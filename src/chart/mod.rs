//! Chart resolution subsystem.
//!
//! Turns a release's chart reference into a concrete on-disk artifact:
//! - A per-build cache keyed by `(name, version)`
//! - The chart location protocol and its HTTP implementation
//! - Chart metadata loading and dependency checking
//! - The resolver driving it all per release

mod cache;
mod locator;
mod metadata;
mod resolver;

pub use cache::ChartCache;
pub use locator::{ChartLocator, RepositoryLocator};
pub use metadata::{CHARTS_SUBDIR, ChartDependency, ChartManifest};
pub use resolver::{ChartResolver, ReleaseHandle};
