//! Renderers for resolved attribution records.
//!
//! - [`text`] — plain third-party notice file, one block per package.
//! - [`terminal`] — colored table of records and end-of-run diagnostics.

pub mod terminal;
pub mod text;

use crate::models::ResolvedModule;

/// Turns a group's (or the whole run's) records into a document.
pub trait Renderer {
    fn render(&self, modules: &[&ResolvedModule]) -> String;
}
