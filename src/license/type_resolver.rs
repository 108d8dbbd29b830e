use std::collections::HashMap;

use crate::license::handlers::LicenseHandlers;
use crate::models::{LicenseField, PackageManifest, TypeSource};

/// Outcome of [`LicenseTypeResolver::resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeResolution {
    pub license: Option<String>,
    pub source: TypeSource,
}

impl TypeResolution {
    fn new(license: Option<String>, source: TypeSource) -> Self {
        Self { license, source }
    }
}

/// Picks a license identifier for a package.
///
/// Order: per-package override, `license` string, `license.type`, the legacy
/// `licenses` array (single entry, then preferred types, then the ambiguity
/// handler), and finally the missing-type handler.
#[derive(Debug, Clone, Default)]
pub struct LicenseTypeResolver {
    overrides: HashMap<String, String>,
    preferred: Vec<String>,
}

impl LicenseTypeResolver {
    pub fn new(overrides: HashMap<String, String>, preferred: Vec<String>) -> Self {
        Self {
            overrides,
            preferred,
        }
    }

    pub fn resolve(
        &self,
        package: &str,
        manifest: &PackageManifest,
        handlers: &dyn LicenseHandlers,
    ) -> TypeResolution {
        if let Some(license) = self.overrides.get(package) {
            return TypeResolution::new(Some(license.clone()), TypeSource::Override);
        }

        let direct = match &manifest.license {
            Some(LicenseField::Id(id)) => Some(id.as_str()),
            Some(LicenseField::Object(entry)) => entry.license_type.as_deref(),
            _ => None,
        };
        if let Some(license) = direct.filter(|l| !l.trim().is_empty()) {
            return TypeResolution::new(Some(license.to_string()), TypeSource::Manifest);
        }

        match manifest.licenses.as_slice() {
            [] => {}
            [single] => {
                if let Some(license) = &single.license_type {
                    return TypeResolution::new(Some(license.clone()), TypeSource::LegacyList);
                }
            }
            entries => {
                let types: Vec<&str> = entries
                    .iter()
                    .filter_map(|entry| entry.license_type.as_deref())
                    .collect();
                if let Some(preferred) = self
                    .preferred
                    .iter()
                    .find(|preferred| types.contains(&preferred.as_str()))
                {
                    return TypeResolution::new(Some(preferred.clone()), TypeSource::Preferred);
                }
                return TypeResolution::new(
                    handlers.ambiguous_license(package, entries),
                    TypeSource::Ambiguous,
                );
            }
        }

        TypeResolution::new(handlers.missing_license_type(package), TypeSource::Handler)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::license::handlers::DefaultHandlers;
    use crate::models::{LicenseEntry, LicenseField};
    use std::cell::RefCell;

    fn manifest(license: Option<LicenseField>, licenses: Vec<LicenseEntry>) -> PackageManifest {
        PackageManifest {
            name: "foo".to_string(),
            version: Some("1.0.0".to_string()),
            license,
            licenses,
            repository: None,
        }
    }

    #[derive(Default)]
    struct Recording {
        ambiguous: RefCell<Vec<(String, Vec<LicenseEntry>)>>,
    }

    impl LicenseHandlers for Recording {
        fn ambiguous_license(&self, package: &str, licenses: &[LicenseEntry]) -> Option<String> {
            self.ambiguous
                .borrow_mut()
                .push((package.to_string(), licenses.to_vec()));
            Some("Chosen".to_string())
        }

        fn missing_license_type(&self, _package: &str) -> Option<String> {
            Some("UNLICENSED".to_string())
        }
    }

    #[test]
    fn test_override_wins() {
        let resolver = LicenseTypeResolver::new(
            HashMap::from([("foo".to_string(), "ISC".to_string())]),
            vec![],
        );
        let m = manifest(Some(LicenseField::Id("MIT".to_string())), vec![]);
        let resolved = resolver.resolve("foo", &m, &DefaultHandlers::default());
        assert_eq!(resolved.license.as_deref(), Some("ISC"));
        assert_eq!(resolved.source, TypeSource::Override);
    }

    #[test]
    fn test_string_and_object_license() {
        let resolver = LicenseTypeResolver::default();
        let handlers = DefaultHandlers::default();

        let m = manifest(Some(LicenseField::Id("ISC".to_string())), vec![]);
        assert_eq!(
            resolver.resolve("foo", &m, &handlers).license.as_deref(),
            Some("ISC")
        );

        let m = manifest(Some(LicenseField::Object(LicenseEntry::new("BSD-2-Clause"))), vec![]);
        let resolved = resolver.resolve("foo", &m, &handlers);
        assert_eq!(resolved.license.as_deref(), Some("BSD-2-Clause"));
        assert_eq!(resolved.source, TypeSource::Manifest);
    }

    #[test]
    fn test_single_legacy_entry() {
        let resolver = LicenseTypeResolver::default();
        let m = manifest(None, vec![LicenseEntry::new("Apache-2.0")]);
        let resolved = resolver.resolve("foo", &m, &DefaultHandlers::default());
        assert_eq!(resolved.license.as_deref(), Some("Apache-2.0"));
        assert_eq!(resolved.source, TypeSource::LegacyList);
    }

    #[test]
    fn test_preferred_type_independent_of_order() {
        let resolver = LicenseTypeResolver::new(HashMap::new(), vec!["BSD-3-Clause".to_string()]);
        let handlers = DefaultHandlers::default();

        for entries in [
            vec![LicenseEntry::new("MIT"), LicenseEntry::new("BSD-3-Clause")],
            vec![LicenseEntry::new("BSD-3-Clause"), LicenseEntry::new("MIT")],
        ] {
            let resolved = resolver.resolve("foo", &manifest(None, entries), &handlers);
            assert_eq!(resolved.license.as_deref(), Some("BSD-3-Clause"));
            assert_eq!(resolved.source, TypeSource::Preferred);
        }
    }

    #[test]
    fn test_preferred_list_order_decides() {
        let resolver = LicenseTypeResolver::new(
            HashMap::new(),
            vec!["GPL-2.0".to_string(), "ISC".to_string(), "MIT".to_string()],
        );
        let m = manifest(None, vec![LicenseEntry::new("MIT"), LicenseEntry::new("ISC")]);
        let resolved = resolver.resolve("foo", &m, &DefaultHandlers::default());
        assert_eq!(resolved.license.as_deref(), Some("ISC"));
    }

    #[test]
    fn test_ambiguity_handler_gets_all_entries_in_order() {
        let resolver = LicenseTypeResolver::new(HashMap::new(), vec!["GPL-3.0".to_string()]);
        let handlers = Recording::default();
        let entries = vec![LicenseEntry::new("MIT"), LicenseEntry::new("ISC")];
        let resolved = resolver.resolve("foo", &manifest(None, entries.clone()), &handlers);

        assert_eq!(resolved.license.as_deref(), Some("Chosen"));
        assert_eq!(resolved.source, TypeSource::Ambiguous);
        assert_eq!(
            handlers.ambiguous.borrow().as_slice(),
            &[("foo".to_string(), entries)]
        );
    }

    #[test]
    fn test_default_ambiguity_takes_first_entry() {
        let resolver = LicenseTypeResolver::default();
        let m = manifest(None, vec![LicenseEntry::new("MIT"), LicenseEntry::new("ISC")]);
        let resolved = resolver.resolve("foo", &m, &DefaultHandlers::default());
        assert_eq!(resolved.license.as_deref(), Some("MIT"));
    }

    #[test]
    fn test_missing_type_uses_handler() {
        let resolver = LicenseTypeResolver::default();
        let m = manifest(Some(LicenseField::Id(String::new())), vec![]);

        let resolved = resolver.resolve("foo", &m, &DefaultHandlers::default());
        assert_eq!(resolved.license, None);
        assert_eq!(resolved.source, TypeSource::Handler);

        let resolved = resolver.resolve("foo", &m, &Recording::default());
        assert_eq!(resolved.license.as_deref(), Some("UNLICENSED"));
    }
}
