use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, warn};

use crate::fs::FileSystem;
use crate::license::handlers::LicenseHandlers;
use crate::models::{Diagnostic, ModuleReference, TextSource};

const SEE_LICENSE_IN: &str = "SEE LICENSE IN ";

/// Outcome of [`LicenseTextResolver::resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextResolution {
    pub text: Option<String>,
    pub source: TextSource,
}

/// Finds the license body for a package.
///
/// Tried in order, first hit wins:
/// 1. literal text override
/// 2. license file override (path used as given)
/// 3. `SEE LICENSE IN <file>` inside the package directory
/// 4. first file in the package directory named `license*` / `licence*`
/// 5. `<template_dir>/<license type>.txt`
/// 6. the missing-text handler
///
/// Text read from disk has CRLF line endings converted to LF. Paths that do not
/// exist or cannot be read fall through to the next step. Directive and template
/// paths must stay inside their directory after symlinks are followed.
#[derive(Debug, Clone, Default)]
pub struct LicenseTextResolver {
    text_overrides: HashMap<String, String>,
    file_overrides: HashMap<String, PathBuf>,
    template_dir: Option<PathBuf>,
}

impl LicenseTextResolver {
    pub fn new(
        text_overrides: HashMap<String, String>,
        file_overrides: HashMap<String, PathBuf>,
        template_dir: Option<PathBuf>,
    ) -> Self {
        Self {
            text_overrides,
            file_overrides,
            template_dir,
        }
    }

    pub fn resolve(
        &self,
        fs: &dyn FileSystem,
        module: &ModuleReference,
        license: Option<&str>,
        handlers: &dyn LicenseHandlers,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> TextResolution {
        let name = module.name.as_str();

        if let Some(text) = self.text_overrides.get(name) {
            return found(text.clone(), TextSource::Override);
        }

        if let Some(path) = self.file_overrides.get(name) {
            if fs.is_file(path) {
                match fs.read_to_string(path) {
                    Ok(text) => {
                        return found(normalize_newlines(&text), TextSource::FileOverride);
                    }
                    Err(err) => {
                        warn!(
                            package = name,
                            path = %path.display(),
                            error = %err,
                            "could not read license file override"
                        );
                        diagnostics.push(Diagnostic::UnreadableLicenseFileOverride {
                            package: name.to_string(),
                            path: path.clone(),
                            error: err.to_string(),
                        });
                    }
                }
            } else {
                warn!(package = name, path = %path.display(), "license file override not found");
                diagnostics.push(Diagnostic::MissingLicenseFileOverride {
                    package: name.to_string(),
                    path: path.clone(),
                });
            }
        }

        if let Some(target) = license.and_then(see_license_in_target) {
            match contained_path(&module.directory, target) {
                None => {
                    warn!(package = name, reference = target, "refusing license reference outside the package");
                    return self.missing(name, license, handlers);
                }
                Some(path) => {
                    if fs.is_file(&path) {
                        if !resolves_inside(fs, &module.directory, &path) {
                            warn!(
                                package = name,
                                path = %path.display(),
                                "refusing license reference resolving outside the package"
                            );
                            return self.missing(name, license, handlers);
                        }
                        if let Some(text) = read_text(fs, &path) {
                            return found(text, TextSource::Directive);
                        }
                    }
                    debug!(package = name, path = %path.display(), "referenced license file not found");
                }
            }
        }

        if let Some(text) = self.scan_package_dir(fs, &module.directory) {
            return found(text, TextSource::LicenseFile);
        }

        if let (Some(dir), Some(license)) = (&self.template_dir, license) {
            if let Some(path) = contained_path(dir, &format!("{}.txt", license)) {
                if fs.is_file(&path) && resolves_inside(fs, dir, &path) {
                    if let Some(text) = read_text(fs, &path) {
                        return found(text, TextSource::Template);
                    }
                }
            }
        }

        self.missing(name, license, handlers)
    }

    fn scan_package_dir(&self, fs: &dyn FileSystem, dir: &Path) -> Option<String> {
        let names = fs.list_files(dir).ok()?;
        let file = names.iter().find(|n| is_license_file_name(n))?;
        let path = dir.join(file);
        if !resolves_inside(fs, dir, &path) {
            warn!(path = %path.display(), "skipping license file resolving outside the package");
            return None;
        }
        read_text(fs, &path)
    }

    fn missing(
        &self,
        package: &str,
        license: Option<&str>,
        handlers: &dyn LicenseHandlers,
    ) -> TextResolution {
        TextResolution {
            text: handlers.missing_license_text(package, license),
            source: TextSource::Handler,
        }
    }
}

fn found(text: String, source: TextSource) -> TextResolution {
    TextResolution {
        text: Some(text),
        source,
    }
}

fn read_text(fs: &dyn FileSystem, path: &Path) -> Option<String> {
    match fs.read_to_string(path) {
        Ok(text) => Some(normalize_newlines(&text)),
        Err(err) => {
            debug!(path = %path.display(), error = %err, "could not read license text");
            None
        }
    }
}

fn normalize_newlines(text: &str) -> String {
    text.replace("\r\n", "\n")
}

/// The file named by a `SEE LICENSE IN <file>` license value: the fourth
/// space-separated token. Extra words after the directive are not supported.
pub fn see_license_in_target(license: &str) -> Option<&str> {
    if !license.starts_with(SEE_LICENSE_IN) {
        return None;
    }
    Some(license.split(' ').nth(3).unwrap_or(""))
}

/// `license`, `LICENSE.md`, `licence-mit.txt`, ...
pub fn is_license_file_name(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.starts_with("license") || lower.starts_with("licence")
}

/// Join `relative` onto `base` only if the result stays inside `base`.
///
/// URL-looking names, absolute paths and any `..` component are rejected.
fn contained_path(base: &Path, relative: &str) -> Option<PathBuf> {
    if relative.is_empty() || looks_like_url(relative) {
        return None;
    }
    let relative = Path::new(relative);
    let only_normal = relative
        .components()
        .all(|c| matches!(c, Component::Normal(_)));
    if !only_normal {
        return None;
    }
    Some(base.join(relative))
}

/// Whether `path` still lies inside `base` once symlinks are followed.
/// Anything that cannot be canonicalized counts as outside.
fn resolves_inside(fs: &dyn FileSystem, base: &Path, path: &Path) -> bool {
    match (fs.canonicalize(base), fs.canonicalize(path)) {
        (Ok(base), Ok(path)) => path.starts_with(base),
        _ => false,
    }
}

fn looks_like_url(value: &str) -> bool {
    let lower = value.to_ascii_lowercase();
    lower.contains("://")
        || lower.starts_with("http:")
        || lower.starts_with("https:")
        || lower.starts_with("www.")
}
