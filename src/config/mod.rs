//! Declaration types for the chartwave plan engine.
//!
//! This module defines the data model of a declaration file:
//! - Chart references (scalar or structured, decoded by node shape)
//! - Release configurations with tags and values
//! - Repository connection details
//! - The declaration body and its templating collaborator

mod chart;
mod declaration;
mod release;
mod repository;

pub use chart::ChartReference;
pub use declaration::{DEFAULT_DECLARATION_FILE, DeclarationBody, FileTemplater, Templater};
pub use release::ReleaseConfig;
pub use repository::RepositoryConfig;
