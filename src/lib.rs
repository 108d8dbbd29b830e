//! Third-party license attribution for built artifacts.
//!
//! Given files known to come from installed dependency packages, the engine
//! resolves each distinct package to a license identifier and license text,
//! applies inclusion and unacceptable-license policy, and keeps a deduplicated,
//! deterministic record list per output group.
//!
//! # Flow
//! 1. [`package::PackageNameResolver`] maps a file path to its package.
//! 2. [`cache::AttributionCache`] short-circuits packages already seen or resolved.
//! 3. [`license::type_resolver`] picks the license type from `package.json`.
//! 4. [`license::policy`] decides whether the license is rendered or unacceptable.
//! 5. [`license::text_resolver`] finds the license text.
//! 6. [`engine::AttributionEngine`] ties the steps together and exposes the records.
//!
//! Renderers in [`report`] turn the records into notice files or terminal output.

pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod fs;
pub mod groups;
pub mod license;
pub mod models;
pub mod package;
pub mod report;

pub use engine::{AttributionEngine, ReferenceOutcome};
pub use error::AttributionError;
pub use models::{Diagnostic, LicenseRecord, ModuleReference, PackageManifest, ResolvedModule};
