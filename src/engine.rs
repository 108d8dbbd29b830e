//! Resolution orchestration.
//!
//! Each discovered file reference moves through
//! `Unseen → NotAPackage | AlreadySeen | Reused | Resolved`, driven only by
//! cache lookups. A package name is read from disk and resolved at most once per
//! run; later groups attach the cached record unchanged.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::cache::AttributionCache;
use crate::error::{AttributionError, Result};
use crate::fs::{FileSystem, RealFileSystem};
use crate::groups::GroupFilter;
use crate::license::handlers::{DefaultHandlers, LicenseHandlers};
use crate::license::policy::LicensePolicy;
use crate::license::text_resolver::LicenseTextResolver;
use crate::license::type_resolver::LicenseTypeResolver;
use crate::models::{
    Diagnostic, LicenseRecord, ModuleReference, PackageManifest, ResolvedModule, TypeSource,
};
use crate::package::PackageNameResolver;

pub const MANIFEST_FILE: &str = "package.json";

/// What happened to a single file or package reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceOutcome {
    /// The path is outside every module root or directly inside one.
    NotAPackage,
    /// The group is filtered out by the [`GroupFilter`].
    GroupSkipped,
    /// The package is listed in the excluded packages.
    Excluded,
    /// Already processed for this group.
    AlreadySeen,
    /// Resolved earlier for another group; the cached record was attached.
    Reused,
    /// Read and resolved now.
    Resolved,
}

pub struct AttributionEngine {
    fs: Box<dyn FileSystem>,
    names: PackageNameResolver,
    types: LicenseTypeResolver,
    texts: LicenseTextResolver,
    policy: LicensePolicy,
    handlers: Box<dyn LicenseHandlers>,
    group_filter: GroupFilter,
    excluded_packages: HashSet<String>,
    additional_modules: Vec<String>,
    additional_group_modules: HashMap<String, Vec<String>>,
    cache: AttributionCache,
    diagnostics: Vec<Diagnostic>,
}

impl AttributionEngine {
    /// Engine over the real filesystem with default resolvers, policy and handlers.
    pub fn new(names: PackageNameResolver) -> Self {
        Self {
            fs: Box::new(RealFileSystem),
            names,
            types: LicenseTypeResolver::default(),
            texts: LicenseTextResolver::default(),
            policy: LicensePolicy::default(),
            handlers: Box::new(DefaultHandlers::default()),
            group_filter: GroupFilter::default(),
            excluded_packages: HashSet::new(),
            additional_modules: Vec::new(),
            additional_group_modules: HashMap::new(),
            cache: AttributionCache::new(),
            diagnostics: Vec::new(),
        }
    }

    pub fn with_file_system(mut self, fs: Box<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }

    pub fn with_type_resolver(mut self, types: LicenseTypeResolver) -> Self {
        self.types = types;
        self
    }

    pub fn with_text_resolver(mut self, texts: LicenseTextResolver) -> Self {
        self.texts = texts;
        self
    }

    pub fn with_policy(mut self, policy: LicensePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_handlers(mut self, handlers: Box<dyn LicenseHandlers>) -> Self {
        self.handlers = handlers;
        self
    }

    pub fn with_group_filter(mut self, filter: GroupFilter) -> Self {
        self.group_filter = filter;
        self
    }

    pub fn with_excluded_packages<I, S>(mut self, packages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded_packages = packages.into_iter().map(Into::into).collect();
        self
    }

    /// Packages attached to every group by [`process_additional`](Self::process_additional).
    pub fn with_additional_modules(mut self, packages: Vec<String>) -> Self {
        self.additional_modules = packages;
        self
    }

    /// Packages attached to one group by [`process_additional`](Self::process_additional).
    pub fn with_additional_group_modules(mut self, packages: HashMap<String, Vec<String>>) -> Self {
        self.additional_group_modules = packages;
        self
    }

    /// Handle one file path discovered while traversing `group`.
    pub fn process_file(&mut self, group: &str, path: &Path) -> Result<ReferenceOutcome> {
        if !self.group_filter.is_included(group) {
            return Ok(ReferenceOutcome::GroupSkipped);
        }
        match self.names.resolve(path) {
            Some(reference) => self.process_module(group, reference),
            None => {
                debug!(path = %path.display(), "not part of a package");
                Ok(ReferenceOutcome::NotAPackage)
            }
        }
    }

    /// Handle a package whose identity is already known.
    pub fn process_module(
        &mut self,
        group: &str,
        reference: ModuleReference,
    ) -> Result<ReferenceOutcome> {
        if !self.group_filter.is_included(group) {
            return Ok(ReferenceOutcome::GroupSkipped);
        }
        let name = reference.name.clone();
        if self.excluded_packages.contains(&name) {
            return Ok(ReferenceOutcome::Excluded);
        }
        if self.cache.already_seen(group, &name) {
            return Ok(ReferenceOutcome::AlreadySeen);
        }

        let outcome = if self.cache.attach(group, &name) {
            debug!(package = %name, group, "reusing resolved package");
            ReferenceOutcome::Reused
        } else {
            let module = self.resolve(reference)?;
            self.cache.register(group, module);
            ReferenceOutcome::Resolved
        };
        self.cache.mark_seen(group, &name);
        Ok(outcome)
    }

    /// Attach the configured additional packages (global and per group) to `group`.
    /// Their directory is `<first module root>/<name>`.
    pub fn process_additional(&mut self, group: &str) -> Result<()> {
        let Some(root) = self.names.roots().first().cloned() else {
            return Ok(());
        };
        let mut packages = self.additional_modules.clone();
        if let Some(extra) = self.additional_group_modules.get(group) {
            packages.extend(extra.iter().cloned());
        }
        for name in packages {
            let directory = root.join(&name);
            self.process_module(group, ModuleReference { name, directory })?;
        }
        Ok(())
    }

    fn resolve(&mut self, reference: ModuleReference) -> Result<ResolvedModule> {
        let name = reference.name.clone();
        let manifest = self.read_manifest(&reference)?;

        let resolved_type = self
            .types
            .resolve(&name, &manifest, self.handlers.as_ref());
        match resolved_type.source {
            TypeSource::Ambiguous => {
                warn!(package = %name, chosen = ?resolved_type.license, "multiple licenses declared");
                self.diagnostics.push(Diagnostic::AmbiguousLicense {
                    package: name.clone(),
                    chosen: resolved_type.license.clone(),
                });
            }
            TypeSource::Handler if resolved_type.license.is_none() => {
                warn!(package = %name, "no license type found");
                self.diagnostics.push(Diagnostic::MissingLicenseType {
                    package: name.clone(),
                });
            }
            _ => {}
        }
        let license_type = resolved_type.license;

        let included = self.policy.evaluate(
            &name,
            license_type.as_deref(),
            self.handlers.as_ref(),
            &mut self.diagnostics,
        )?;

        let (text, text_source) = if included {
            let resolved_text = self.texts.resolve(
                self.fs.as_ref(),
                &reference,
                license_type.as_deref(),
                self.handlers.as_ref(),
                &mut self.diagnostics,
            );
            if resolved_text.text.is_none() {
                warn!(package = %name, "no license text found");
                self.diagnostics.push(Diagnostic::MissingLicenseText {
                    package: name.clone(),
                    license: license_type.clone(),
                });
            }
            (resolved_text.text, Some(resolved_text.source))
        } else {
            debug!(package = %name, license = ?license_type, "license not included in output");
            (None, None)
        };

        debug!(package = %name, license = ?license_type, "resolved package");
        Ok(ResolvedModule {
            reference,
            manifest,
            license: LicenseRecord { license_type, text },
            type_source: resolved_type.source,
            text_source,
            included,
        })
    }

    fn read_manifest(&self, reference: &ModuleReference) -> Result<PackageManifest> {
        let path: PathBuf = reference.directory.join(MANIFEST_FILE);
        let content =
            self.fs
                .read_to_string(&path)
                .map_err(|source| AttributionError::ManifestRead {
                    package: reference.name.clone(),
                    path: path.clone(),
                    source,
                })?;
        let manifest: PackageManifest =
            serde_json::from_str(&content).map_err(|source| AttributionError::ManifestParse {
                package: reference.name.clone(),
                path: path.clone(),
                source,
            })?;
        if manifest.name.trim().is_empty() {
            return Err(AttributionError::MissingManifestName {
                package: reference.name.clone(),
                path,
            });
        }
        Ok(manifest)
    }

    /// Included modules of `group` in first-discovery order.
    pub fn modules_for_group(&self, group: &str) -> Vec<&ResolvedModule> {
        self.cache
            .all_for_group(group)
            .into_iter()
            .filter(|module| module.included)
            .collect()
    }

    /// Included modules across all groups, each once, in resolution order.
    pub fn all_modules(&self) -> Vec<&ResolvedModule> {
        self.cache
            .all_resolved()
            .into_iter()
            .filter(|module| module.included)
            .collect()
    }

    pub fn groups(&self) -> Vec<String> {
        self.cache.groups().map(str::to_string).collect()
    }

    pub fn cache(&self) -> &AttributionCache {
        &self.cache
    }

    /// Recoverable problems in the order they were found.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFileSystem;
    use crate::license::policy::{Always, LicenseListTest};

    const ROOT: &str = "/app/node_modules";

    fn fixture() -> MemoryFileSystem {
        MemoryFileSystem::new()
            .with_file(
                "/app/node_modules/lib1/package.json",
                r#"{ "name": "lib1", "version": "0.0.1", "license": "MIT" }"#,
            )
            .with_file("/app/node_modules/lib1/LICENSE", "MIT License")
            .with_file("/app/node_modules/lib1/dist/index.js", "")
            .with_file(
                "/app/node_modules/gpl/package.json",
                r#"{ "name": "gpl", "version": "2.0.0", "license": "GPL-3.0" }"#,
            )
            .with_file("/app/node_modules/gpl/COPYING", "GPL")
            .with_file(
                "/app/node_modules/multi/package.json",
                r#"{ "name": "multi", "licenses": [{ "type": "MIT" }, { "type": "ISC" }] }"#,
            )
            .with_file("/app/node_modules/multi/LICENSE", "multi")
    }

    fn engine_over(fs: &MemoryFileSystem) -> AttributionEngine {
        AttributionEngine::new(PackageNameResolver::new([ROOT]))
            .with_file_system(Box::new(fs.clone()))
    }

    fn path(rel: &str) -> PathBuf {
        Path::new(ROOT).join(rel)
    }

    #[test]
    fn test_resolves_package_record() {
        let fs = fixture();
        let mut engine = engine_over(&fs);
        let outcome = engine.process_file("main", &path("lib1/dist/index.js")).unwrap();
        assert_eq!(outcome, ReferenceOutcome::Resolved);

        let modules = engine.modules_for_group("main");
        assert_eq!(modules.len(), 1);
        assert_eq!(modules[0].name(), "lib1");
        assert_eq!(modules[0].version(), Some("0.0.1"));
        assert_eq!(modules[0].license.license_type.as_deref(), Some("MIT"));
        assert_eq!(modules[0].license.text.as_deref(), Some("MIT License"));
        assert!(engine.diagnostics().is_empty());
    }

    #[test]
    fn test_reads_each_package_once_per_run() {
        let fs = fixture();
        let mut engine = engine_over(&fs);

        let outcomes: Vec<_> = [
            ("main", "lib1/dist/index.js"),
            ("main", "lib1/dist/other.js"),
            ("vendor", "lib1/index.js"),
            ("vendor", "lib1/dist/index.js"),
        ]
        .iter()
        .map(|(group, rel)| engine.process_file(group, &path(rel)).unwrap())
        .collect();

        assert_eq!(
            outcomes,
            vec![
                ReferenceOutcome::Resolved,
                ReferenceOutcome::AlreadySeen,
                ReferenceOutcome::Reused,
                ReferenceOutcome::AlreadySeen,
            ]
        );
        assert_eq!(fs.reads_of("/app/node_modules/lib1/package.json"), 1);
        assert_eq!(fs.reads_of("/app/node_modules/lib1/LICENSE"), 1);
        assert_eq!(fs.total_reads(), 2);
        assert_eq!(engine.all_modules().len(), 1);
        assert_eq!(engine.groups(), vec!["main".to_string(), "vendor".to_string()]);
    }

    #[test]
    fn test_not_a_package() {
        let fs = fixture();
        let mut engine = engine_over(&fs);
        assert_eq!(
            engine.process_file("main", Path::new("/app/src/index.js")).unwrap(),
            ReferenceOutcome::NotAPackage
        );
        assert_eq!(
            engine.process_file("main", &path("stray.js")).unwrap(),
            ReferenceOutcome::NotAPackage
        );
        assert_eq!(fs.total_reads(), 0);
    }

    #[test]
    fn test_missing_manifest_is_an_error() {
        let fs = fixture().with_file("/app/node_modules/nomanifest/index.js", "");
        let mut engine = engine_over(&fs);
        let err = engine
            .process_file("main", &path("nomanifest/index.js"))
            .unwrap_err();
        assert!(matches!(err, AttributionError::ManifestRead { ref package, .. } if package == "nomanifest"));
    }

    #[test]
    fn test_manifest_without_name_is_an_error() {
        let fs = fixture().with_file("/app/node_modules/anon/package.json", r#"{ "license": "MIT" }"#);
        let mut engine = engine_over(&fs);
        let err = engine.process_file("main", &path("anon/index.js")).unwrap_err();
        assert!(matches!(err, AttributionError::MissingManifestName { .. }));

        let fs = fixture().with_file("/app/node_modules/broken/package.json", "{ nope");
        let mut engine = engine_over(&fs);
        let err = engine.process_file("main", &path("broken/index.js")).unwrap_err();
        assert!(matches!(err, AttributionError::ManifestParse { .. }));
    }

    #[test]
    fn test_ambiguous_license_is_diagnosed() {
        let fs = fixture();
        let mut engine = engine_over(&fs);
        engine.process_file("main", &path("multi/index.js")).unwrap();
        let module = engine.cache().get_resolved("multi").unwrap();
        assert_eq!(module.license.license_type.as_deref(), Some("MIT"));
        assert_eq!(module.type_source, TypeSource::Ambiguous);
        assert_eq!(
            engine.diagnostics(),
            &[Diagnostic::AmbiguousLicense {
                package: "multi".to_string(),
                chosen: Some("MIT".to_string()),
            }]
        );
    }

    #[test]
    fn test_excluded_license_is_cached_but_not_rendered() {
        let fs = fixture();
        let mut engine = engine_over(&fs).with_policy(LicensePolicy::new(
            Box::new(LicenseListTest::new(["MIT"])),
            Box::new(Always(false)),
        ));
        engine.process_file("main", &path("gpl/index.js")).unwrap();
        engine.process_file("main", &path("lib1/index.js")).unwrap();
        assert_eq!(
            engine.process_file("vendor", &path("gpl/index.js")).unwrap(),
            ReferenceOutcome::Reused
        );

        let names: Vec<_> = engine.modules_for_group("main").iter().map(|m| m.name()).collect();
        assert_eq!(names, vec!["lib1"]);
        assert!(engine.modules_for_group("vendor").is_empty());
        assert_eq!(engine.cache().all_resolved().len(), 2);
        assert_eq!(fs.reads_of("/app/node_modules/gpl/package.json"), 1);
        assert_eq!(fs.reads_of("/app/node_modules/gpl/COPYING"), 0);
    }

    #[test]
    fn test_unacceptable_license_soft_and_hard() {
        let unacceptable = || {
            LicensePolicy::new(
                Box::new(Always(true)),
                Box::new(LicenseListTest::new(["GPL-3.0"])),
            )
        };

        let fs = fixture();
        let mut engine = engine_over(&fs).with_policy(unacceptable());
        engine.process_file("main", &path("gpl/index.js")).unwrap();
        assert_eq!(engine.modules_for_group("main").len(), 1);
        assert!(engine.diagnostics().iter().any(Diagnostic::is_error));

        let mut engine = engine_over(&fs)
            .with_policy(unacceptable())
            .with_handlers(Box::new(DefaultHandlers::aborting()));
        let err = engine.process_file("main", &path("gpl/index.js")).unwrap_err();
        assert_eq!(err.to_string(), "unacceptable license found for gpl: GPL-3.0");
        assert!(engine.all_modules().is_empty());
    }

    #[test]
    fn test_excluded_packages_and_group_filter() {
        let fs = fixture();
        let mut engine = engine_over(&fs)
            .with_excluded_packages(["gpl"])
            .with_group_filter(GroupFilter {
                include: None,
                exclude: Some(vec!["polyfills".to_string()]),
            });
        assert_eq!(
            engine.process_file("main", &path("gpl/index.js")).unwrap(),
            ReferenceOutcome::Excluded
        );
        assert_eq!(
            engine.process_file("polyfills", &path("lib1/index.js")).unwrap(),
            ReferenceOutcome::GroupSkipped
        );
        assert_eq!(fs.total_reads(), 0);
    }

    #[test]
    fn test_additional_modules() {
        let fs = fixture();
        let mut engine = engine_over(&fs)
            .with_additional_modules(vec!["lib1".to_string()])
            .with_additional_group_modules(HashMap::from([(
                "vendor".to_string(),
                vec!["multi".to_string()],
            )]));
        engine.process_additional("main").unwrap();
        engine.process_additional("vendor").unwrap();

        let names = |group| {
            engine
                .modules_for_group(group)
                .iter()
                .map(|m| m.name().to_string())
                .collect::<Vec<_>>()
        };
        assert_eq!(names("main"), vec!["lib1"]);
        assert_eq!(names("vendor"), vec!["lib1", "multi"]);
    }

    #[test]
    fn test_full_set_is_idempotent() {
        let fs = fixture();
        let mut engine = engine_over(&fs);
        engine.process_file("main", &path("multi/index.js")).unwrap();
        engine.process_file("vendor", &path("lib1/index.js")).unwrap();

        let first = serde_json::to_string(&engine.all_modules()).unwrap();
        let second = serde_json::to_string(&engine.all_modules()).unwrap();
        assert_eq!(first, second);
    }
}
