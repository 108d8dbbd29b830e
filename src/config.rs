use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::engine::AttributionEngine;
use crate::fs::FileSystem;
use crate::groups::GroupFilter;
use crate::license::handlers::DefaultHandlers;
use crate::license::policy::{Always, LicenseListTest, LicensePolicy, LicenseTest, PatternTest};
use crate::license::text_resolver::LicenseTextResolver;
use crate::license::type_resolver::LicenseTypeResolver;
use crate::package::{find_build_root, PackageNameResolver, MODULES_DIR};

/// Root configuration structure, deserialized from `.license-attribution/config.toml`.
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Directories holding installed packages, tried in order. Relative entries
    /// are resolved against the project path. Empty means the build root's
    /// `node_modules`.
    pub module_roots: Vec<PathBuf>,
    /// Tie-breakers for packages declaring several licenses, most preferred first.
    pub preferred_license_types: Vec<String>,
    /// Directory of `<license type>.txt` fallback texts.
    pub template_dir: Option<PathBuf>,
    /// Render packages whose license type could not be determined.
    pub include_packages_without_license: bool,
    /// Stop the run at the first unacceptable license instead of reporting it.
    pub abort_on_unacceptable: bool,
    /// Package names that are never attributed.
    pub excluded_packages: Vec<String>,
    /// Packages attributed in every group regardless of discovered files.
    pub additional_modules: Vec<String>,
    /// Packages attributed in a single group, keyed by group name.
    pub additional_group_modules: HashMap<String, Vec<String>>,
    pub overrides: Overrides,
    pub policy: PolicyConfig,
    pub groups: GroupFilter,
}

/// Per-package corrections, keyed by package name.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Overrides {
    pub license_types: HashMap<String, String>,
    pub license_texts: HashMap<String, String>,
    /// Relative paths are resolved against the project path.
    pub license_files: HashMap<String, PathBuf>,
}

/// Inclusion and unacceptable-license tests.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PolicyConfig {
    /// Licenses written to the output. Defaults to everything.
    pub include: Option<LicenseTestConfig>,
    /// Licenses reported as unacceptable. Defaults to none.
    pub unacceptable: Option<LicenseTestConfig>,
}

/// Either a regular expression or a list of SPDX identifiers.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LicenseTestConfig {
    pub pattern: Option<String>,
    pub licenses: Option<Vec<String>>,
}

impl LicenseTestConfig {
    /// Test for `[policy.include]`: matches when some license choice is listed.
    pub fn build(&self) -> Result<Box<dyn LicenseTest>> {
        self.build_with(LicenseListTest::new)
    }

    /// Test for `[policy.unacceptable]`: a listed license only counts when the
    /// expression leaves no other choice.
    pub fn build_unacceptable(&self) -> Result<Box<dyn LicenseTest>> {
        self.build_with(LicenseListTest::unavoidable)
    }

    fn build_with(
        &self,
        list: fn(Vec<String>) -> LicenseListTest,
    ) -> Result<Box<dyn LicenseTest>> {
        match (&self.pattern, &self.licenses) {
            (Some(_), Some(_)) => {
                bail!("a license test takes either `pattern` or `licenses`, not both")
            }
            (Some(pattern), None) => {
                let test = PatternTest::new(pattern)
                    .with_context(|| format!("invalid license pattern `{}`", pattern))?;
                Ok(Box::new(test))
            }
            (None, Some(licenses)) => Ok(Box::new(list(licenses.clone()))),
            (None, None) => bail!("a license test needs `pattern` or `licenses`"),
        }
    }
}

impl Default for Config {
    /// Built-in configuration used when no config file is found.
    ///
    /// Every license is included, none is unacceptable, and packages without a
    /// license are still listed.
    fn default() -> Self {
        Config {
            module_roots: Vec::new(),
            preferred_license_types: Vec::new(),
            template_dir: None,
            include_packages_without_license: true,
            abort_on_unacceptable: false,
            excluded_packages: Vec::new(),
            additional_modules: Vec::new(),
            additional_group_modules: HashMap::new(),
            overrides: Overrides::default(),
            policy: PolicyConfig::default(),
            groups: GroupFilter::default(),
        }
    }
}

/// Load the configuration, searching in order:
///
/// 1. `config_override` — path passed via `--config`
/// 2. `<project_path>/.license-attribution/config.toml`
/// 3. `~/.config/license-attribution/config.toml`
/// 4. Built-in [`Config::default`]
pub fn load_config(project_path: &Path, config_override: Option<&Path>) -> Result<Config> {
    if let Some(path) = config_override {
        return read_config(path);
    }

    let project_config = project_path
        .join(".license-attribution")
        .join("config.toml");
    if project_config.exists() {
        return read_config(&project_config);
    }

    if let Some(home) = dirs::home_dir() {
        let home_config = home
            .join(".config")
            .join("license-attribution")
            .join("config.toml");
        if home_config.exists() {
            return read_config(&home_config);
        }
    }

    Ok(Config::default())
}

fn read_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("failed to parse config {}", path.display()))
}

impl Config {
    /// Module roots as absolute paths, discovering the build root when none are configured.
    pub fn module_roots(&self, fs: &dyn FileSystem, project_path: &Path) -> Result<Vec<PathBuf>> {
        if self.module_roots.is_empty() {
            let Some(build_root) = find_build_root(fs, project_path) else {
                bail!(
                    "unable to determine the build root from {}; set `module_roots` in the config",
                    project_path.display()
                );
            };
            return Ok(vec![build_root.join(MODULES_DIR)]);
        }
        Ok(self
            .module_roots
            .iter()
            .map(|root| project_path.join(root))
            .collect())
    }

    pub fn policy(&self) -> Result<LicensePolicy> {
        let inclusion: Box<dyn LicenseTest> = match &self.policy.include {
            Some(test) => test.build().context("in [policy.include]")?,
            None => Box::new(Always(true)),
        };
        let unacceptable: Box<dyn LicenseTest> = match &self.policy.unacceptable {
            Some(test) => test
                .build_unacceptable()
                .context("in [policy.unacceptable]")?,
            None => Box::new(Always(false)),
        };
        Ok(LicensePolicy::new(inclusion, unacceptable)
            .with_unknown_included(self.include_packages_without_license))
    }

    /// Assemble an engine for `project_path` reading through `fs`.
    pub fn build_engine(
        &self,
        project_path: &Path,
        fs: Box<dyn FileSystem>,
    ) -> Result<AttributionEngine> {
        let roots = self.module_roots(fs.as_ref(), project_path)?;

        let file_overrides = self
            .overrides
            .license_files
            .iter()
            .map(|(name, path)| (name.clone(), project_path.join(path)))
            .collect();
        let texts = LicenseTextResolver::new(
            self.overrides.license_texts.clone(),
            file_overrides,
            self.template_dir.as_ref().map(|dir| project_path.join(dir)),
        );
        let types = LicenseTypeResolver::new(
            self.overrides.license_types.clone(),
            self.preferred_license_types.clone(),
        );
        let handlers = DefaultHandlers {
            abort_on_unacceptable: self.abort_on_unacceptable,
        };

        Ok(AttributionEngine::new(PackageNameResolver::new(&roots))
            .with_file_system(fs)
            .with_type_resolver(types)
            .with_text_resolver(texts)
            .with_policy(self.policy()?)
            .with_handlers(Box::new(handlers))
            .with_group_filter(self.groups.clone())
            .with_excluded_packages(self.excluded_packages.iter().cloned())
            .with_additional_modules(self.additional_modules.clone())
            .with_additional_group_modules(self.additional_group_modules.clone()))
    }
}
