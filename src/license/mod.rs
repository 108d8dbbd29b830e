//! License resolution and policy.
//!
//! - [`type_resolver`] — picks a license identifier from a package manifest.
//! - [`text_resolver`] — finds the license body through overrides, package files
//!   and templates.
//! - [`policy`] — inclusion and unacceptable-license tests.
//! - [`expression`] — SPDX expression evaluation used by list-based tests.
//! - [`handlers`] — caller hooks for ambiguous, missing and unacceptable cases.

pub mod expression;
pub mod handlers;
pub mod policy;
pub mod text_resolver;
pub mod type_resolver;
