//! Run-scoped memo of resolved packages.
//!
//! Two levels: every resolved module is stored once by name (write-once), and
//! each group keeps its own insertion-ordered list of those modules plus a
//! `seen` set that short-circuits repeat references within the group.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::models::ResolvedModule;

#[derive(Debug, Default)]
pub struct AttributionCache {
    modules: Vec<ResolvedModule>,
    by_name: HashMap<String, usize>,
    groups: BTreeMap<String, Vec<usize>>,
    seen: HashMap<String, HashSet<String>>,
}

impl AttributionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_resolved(&self, name: &str) -> Option<&ResolvedModule> {
        self.by_name.get(name).map(|&index| &self.modules[index])
    }

    /// Store `module` and attach it to `group`.
    ///
    /// If the name is already resolved the stored record is kept and `module`
    /// is dropped; the group then references the original.
    pub fn register(&mut self, group: &str, module: ResolvedModule) -> &ResolvedModule {
        let index = match self.by_name.get(module.name()) {
            Some(&index) => index,
            None => {
                let index = self.modules.len();
                self.by_name.insert(module.name().to_string(), index);
                self.modules.push(module);
                index
            }
        };
        self.attach_index(group, index);
        &self.modules[index]
    }

    /// Attach an already resolved module to `group`. Returns `false` if the
    /// name has never been resolved.
    pub fn attach(&mut self, group: &str, name: &str) -> bool {
        match self.by_name.get(name) {
            Some(&index) => {
                self.attach_index(group, index);
                true
            }
            None => false,
        }
    }

    fn attach_index(&mut self, group: &str, index: usize) {
        let members = self.groups.entry(group.to_string()).or_default();
        if !members.contains(&index) {
            members.push(index);
        }
    }

    pub fn mark_seen(&mut self, group: &str, name: &str) {
        self.seen
            .entry(group.to_string())
            .or_default()
            .insert(name.to_string());
    }

    pub fn already_seen(&self, group: &str, name: &str) -> bool {
        self.seen
            .get(group)
            .is_some_and(|names| names.contains(name))
    }

    /// Modules of `group` in first-discovery order.
    pub fn all_for_group(&self, group: &str) -> Vec<&ResolvedModule> {
        self.groups
            .get(group)
            .map(|members| members.iter().map(|&i| &self.modules[i]).collect())
            .unwrap_or_default()
    }

    /// Every module resolved in the run, once each, in resolution order.
    pub fn all_resolved(&self) -> Vec<&ResolvedModule> {
        self.modules.iter().collect()
    }

    /// Group identifiers that received at least one module, sorted.
    pub fn groups(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        LicenseRecord, ModuleReference, PackageManifest, TextSource, TypeSource,
    };

    fn module(name: &str, license: &str) -> ResolvedModule {
        ResolvedModule {
            reference: ModuleReference::new(name, format!("/m/{}", name)),
            manifest: PackageManifest {
                name: name.to_string(),
                ..Default::default()
            },
            license: LicenseRecord {
                license_type: Some(license.to_string()),
                text: None,
            },
            type_source: TypeSource::Manifest,
            text_source: Some(TextSource::Handler),
            included: true,
        }
    }

    fn names(modules: Vec<&ResolvedModule>) -> Vec<&str> {
        modules.into_iter().map(ResolvedModule::name).collect()
    }

    #[test]
    fn test_register_and_lookup() {
        let mut cache = AttributionCache::new();
        assert!(cache.get_resolved("a").is_none());
        cache.register("main", module("a", "MIT"));
        assert_eq!(
            cache.get_resolved("a").unwrap().license.license_type.as_deref(),
            Some("MIT")
        );
    }

    #[test]
    fn test_global_entry_is_write_once() {
        let mut cache = AttributionCache::new();
        cache.register("main", module("a", "MIT"));
        let kept = cache.register("vendor", module("a", "GPL-3.0"));
        assert_eq!(kept.license.license_type.as_deref(), Some("MIT"));
        assert_eq!(cache.all_resolved().len(), 1);
        assert_eq!(names(cache.all_for_group("vendor")), vec!["a"]);
    }

    #[test]
    fn test_group_order_and_dedup() {
        let mut cache = AttributionCache::new();
        cache.register("main", module("b", "MIT"));
        cache.register("main", module("a", "MIT"));
        cache.register("other", module("c", "MIT"));
        assert!(cache.attach("main", "c"));
        assert!(cache.attach("main", "b"));
        assert!(!cache.attach("main", "missing"));

        assert_eq!(names(cache.all_for_group("main")), vec!["b", "a", "c"]);
        assert_eq!(names(cache.all_for_group("other")), vec!["c"]);
        assert!(cache.all_for_group("nothing").is_empty());
        assert_eq!(names(cache.all_resolved()), vec!["b", "a", "c"]);
        assert_eq!(cache.groups().collect::<Vec<_>>(), vec!["main", "other"]);
    }

    #[test]
    fn test_seen_is_per_group() {
        let mut cache = AttributionCache::new();
        cache.mark_seen("main", "a");
        assert!(cache.already_seen("main", "a"));
        assert!(!cache.already_seen("other", "a"));
        assert!(!cache.already_seen("main", "b"));
    }
}
