// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(warnings)]                    // All warnings are treated as errors
#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![deny(missing_docs)]                // All public items must be documented
#![deny(dead_code)]                   // Unused code is forbidden
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness - Leave nothing unchecked
#![deny(unused_imports)]              // Unused imports are forbidden
#![deny(unused_variables)]            // Unused variables are forbidden
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden
#![forbid(unsafe_op_in_unsafe_fn)]    // Unsafe ops in unsafe fns are forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::missing_const_for_fn)] // Force const when possible
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::module_inception)]    // Module with same name as crate warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::shadow_unrelated)]    // Shadowing unrelated variables warning
#![warn(clippy::too_many_arguments)]  // Limit function arguments
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity

// Safety and robustness lints
#![deny(overflowing_literals)]        // Overflowing literals are forbidden
#![deny(arithmetic_overflow)]         // Arithmetic overflow is forbidden

// ============================================================================
// Crate Documentation
// ============================================================================

//! # Chartwave
//!
//! A declarative plan engine for chart-based deployments.
//!
//! ## Overview
//!
//! Chartwave turns a YAML declaration of chart releases into a persisted,
//! self-contained plan, allowing you to:
//!
//! - Declare repositories and releases as code in a YAML file
//! - Build reproducible plans with charts resolved and vendored locally
//! - Filter releases by tags for partial builds
//! - Diff plans against each other or against the live system
//!
//! ## Architecture
//!
//! The engine is built around the **plan** as the unit of work:
//!
//! 1. **Declaration**: Desired releases, defined in `chartwave.yml`
//! 2. **Build**: Filtering, chart resolution, and manifest rendering
//! 3. **Diff**: Structured comparison against a previous plan
//!
//! ## Modules
//!
//! - [`config`]: Declaration parsing and the release/chart data model
//! - [`registry`]: Named chart repository sources
//! - [`chart`]: Chart resolution, caching, and metadata
//! - [`plan`]: Plan building, persistence, and diffing
//! - [`cli`]: Command-line interface
//!
//! ## Example
//!
//! ```yaml
//! project: my-web-stack
//!
//! repositories:
//!   - name: bitnami
//!     url: https://charts.bitnami.com/bitnami
//!
//! releases:
//!   - name: nginx
//!     namespace: web
//!     chart: bitnami/nginx
//!     tags: [frontend]
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod chart;
pub mod cli;
pub mod config;
pub mod error;
pub mod plan;
pub mod registry;

// ============================================================================
// Re-exports
// ============================================================================

pub use chart::{ChartCache, ChartLocator, ChartResolver, ReleaseHandle, RepositoryLocator};
pub use cli::{Cli, Commands, OutputFormatter};
pub use config::{ChartReference, DeclarationBody, ReleaseConfig, RepositoryConfig};
pub use error::{ChartwaveError, Result};
pub use plan::{DiffEngine, DiffReport, Plan, PlanBuilder};
pub use registry::RepositoryRegistry;
