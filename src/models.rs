use std::path::PathBuf;

use serde::{Deserialize, Deserializer, Serialize};

/// Identity of an installed package discovered from a file path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleReference {
    /// Package name, possibly scoped (`@scope/name`).
    pub name: String,
    /// Package root directory (module root joined with the name).
    pub directory: PathBuf,
}

impl ModuleReference {
    pub fn new(name: impl Into<String>, directory: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            directory: directory.into(),
        }
    }
}

/// One entry of a `{ "type": ..., "url": ... }` license declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseEntry {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub license_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl LicenseEntry {
    pub fn new(license_type: &str) -> Self {
        Self {
            license_type: Some(license_type.to_string()),
            url: None,
        }
    }
}

/// The `license` field of a manifest: an SPDX-ish string or the older object form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LicenseField {
    Id(String),
    Object(LicenseEntry),
    Other(serde_json::Value),
}

/// `repository` may be a bare URL string or `{ "type": ..., "url": ... }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Repository {
    Url(String),
    Object {
        #[serde(default)]
        url: Option<String>,
    },
    Other(serde_json::Value),
}

/// Parsed `package.json` of an installed package.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PackageManifest {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<LicenseField>,
    /// Deprecated `licenses` array. Anything that is not an array of entries is ignored.
    #[serde(
        default,
        deserialize_with = "lenient_license_entries",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub licenses: Vec<LicenseEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<Repository>,
}

impl PackageManifest {
    pub fn repository_url(&self) -> Option<&str> {
        match self.repository.as_ref()? {
            Repository::Url(url) => Some(url.as_str()),
            Repository::Object { url } => url.as_deref(),
            Repository::Other(_) => None,
        }
    }
}

fn lenient_license_entries<'de, D>(deserializer: D) -> Result<Vec<LicenseEntry>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

/// Resolved license identity and body text for a package.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseRecord {
    #[serde(rename = "type")]
    pub license_type: Option<String>,
    pub text: Option<String>,
}

/// Where a license type came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeSource {
    Override,
    Manifest,
    LegacyList,
    Preferred,
    Ambiguous,
    Handler,
}

impl std::fmt::Display for TypeSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TypeSource::Override => write!(f, "override"),
            TypeSource::Manifest => write!(f, "manifest"),
            TypeSource::LegacyList => write!(f, "licenses"),
            TypeSource::Preferred => write!(f, "preferred"),
            TypeSource::Ambiguous => write!(f, "ambiguous"),
            TypeSource::Handler => write!(f, "handler"),
        }
    }
}

/// Where a license text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextSource {
    Override,
    FileOverride,
    Directive,
    LicenseFile,
    Template,
    Handler,
}

impl std::fmt::Display for TextSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TextSource::Override => write!(f, "override"),
            TextSource::FileOverride => write!(f, "file override"),
            TextSource::Directive => write!(f, "SEE LICENSE IN"),
            TextSource::LicenseFile => write!(f, "license file"),
            TextSource::Template => write!(f, "template"),
            TextSource::Handler => write!(f, "handler"),
        }
    }
}

/// Terminal unit of work: one per distinct package name per run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedModule {
    #[serde(flatten)]
    pub reference: ModuleReference,
    pub manifest: PackageManifest,
    pub license: LicenseRecord,
    pub type_source: TypeSource,
    pub text_source: Option<TextSource>,
    /// False when the inclusion test rejected the license; the module stays
    /// cached but never appears in rendered output.
    pub included: bool,
}

impl ResolvedModule {
    pub fn name(&self) -> &str {
        &self.reference.name
    }

    pub fn version(&self) -> Option<&str> {
        self.manifest.version.as_deref()
    }
}

/// A recoverable problem recorded during a run and surfaced once at the end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    AmbiguousLicense { package: String, chosen: Option<String> },
    MissingLicenseType { package: String },
    MissingLicenseText { package: String, license: Option<String> },
    MissingLicenseFileOverride { package: String, path: PathBuf },
    UnreadableLicenseFileOverride { package: String, path: PathBuf, error: String },
    UnacceptableLicense { package: String, license: String },
}

impl Diagnostic {
    pub fn package(&self) -> &str {
        match self {
            Diagnostic::AmbiguousLicense { package, .. }
            | Diagnostic::MissingLicenseType { package }
            | Diagnostic::MissingLicenseText { package, .. }
            | Diagnostic::MissingLicenseFileOverride { package, .. }
            | Diagnostic::UnreadableLicenseFileOverride { package, .. }
            | Diagnostic::UnacceptableLicense { package, .. } => package,
        }
    }

    /// Unacceptable licenses fail the run's exit status; everything else is a warning.
    pub fn is_error(&self) -> bool {
        matches!(self, Diagnostic::UnacceptableLicense { .. })
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Diagnostic::AmbiguousLicense { package, chosen } => write!(
                f,
                "{} specifies multiple licenses, using {}",
                package,
                chosen.as_deref().unwrap_or("none")
            ),
            Diagnostic::MissingLicenseType { package } => {
                write!(f, "could not find license type for {}", package)
            }
            Diagnostic::MissingLicenseText { package, license } => write!(
                f,
                "could not find license text for {} ({})",
                package,
                license.as_deref().unwrap_or("unknown license")
            ),
            Diagnostic::MissingLicenseFileOverride { package, path } => write!(
                f,
                "license file override for {} not found: {}",
                package,
                path.display()
            ),
            Diagnostic::UnreadableLicenseFileOverride {
                package,
                path,
                error,
            } => write!(
                f,
                "could not read license file override for {} ({}): {}",
                package,
                path.display(),
                error
            ),
            Diagnostic::UnacceptableLicense { package, license } => {
                write!(f, "unacceptable license found for {}: {}", package, license)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_manifest_with_object_license() {
        let json = r#"{
  "name": "foo",
  "version": "1.2.3",
  "license": { "type": "MIT", "url": "https://example.com" },
  "repository": { "type": "git", "url": "git+https://example.com/foo.git" }
}"#;
        let manifest: PackageManifest = serde_json::from_str(json).unwrap();
        assert_eq!(manifest.name, "foo");
        assert_eq!(
            manifest.license,
            Some(LicenseField::Object(LicenseEntry {
                license_type: Some("MIT".to_string()),
                url: Some("https://example.com".to_string()),
            }))
        );
        assert_eq!(
            manifest.repository_url(),
            Some("git+https://example.com/foo.git")
        );
    }

    #[test]
    fn test_parse_manifest_with_legacy_licenses() {
        let json = r#"{
  "name": "bar",
  "licenses": [{ "type": "MIT", "url": "a" }, { "type": "ISC", "url": "b" }]
}"#;
        let manifest: PackageManifest = serde_json::from_str(json).unwrap();
        assert_eq!(manifest.licenses.len(), 2);
        assert_eq!(manifest.licenses[1].license_type.as_deref(), Some("ISC"));
        assert!(manifest.version.is_none());
    }

    #[test]
    fn test_malformed_licenses_field_is_ignored() {
        let json = r#"{ "name": "baz", "licenses": "MIT" }"#;
        let manifest: PackageManifest = serde_json::from_str(json).unwrap();
        assert!(manifest.licenses.is_empty());
    }

    #[test]
    fn test_repository_as_string() {
        let json = r#"{ "name": "qux", "repository": "github:user/qux" }"#;
        let manifest: PackageManifest = serde_json::from_str(json).unwrap();
        assert_eq!(manifest.repository_url(), Some("github:user/qux"));
    }
}
