use std::collections::HashSet;

use regex::Regex;
use tracing::error;

use crate::error::Result;
use crate::license::expression;
use crate::license::handlers::LicenseHandlers;
use crate::models::Diagnostic;

/// A yes/no question asked about a license identifier.
pub trait LicenseTest {
    fn matches(&self, license: &str) -> bool;
}

impl<F> LicenseTest for F
where
    F: Fn(&str) -> bool,
{
    fn matches(&self, license: &str) -> bool {
        self(license)
    }
}

/// Constant answer.
#[derive(Debug, Clone, Copy)]
pub struct Always(pub bool);

impl LicenseTest for Always {
    fn matches(&self, _license: &str) -> bool {
        self.0
    }
}

/// Unanchored regular expression search over the license identifier.
#[derive(Debug, Clone)]
pub struct PatternTest(Regex);

impl PatternTest {
    pub fn new(pattern: &str) -> std::result::Result<Self, regex::Error> {
        Ok(Self(Regex::new(pattern)?))
    }
}

impl LicenseTest for PatternTest {
    fn matches(&self, license: &str) -> bool {
        self.0.is_match(license)
    }
}

/// Matches licenses from a fixed list of SPDX identifiers.
///
/// Compound expressions are evaluated with [`expression::matches`] for lists built
/// with [`new`](Self::new), and with [`expression::unavoidable`] for lists built
/// with [`unavoidable`](Self::unavoidable), so that `MIT OR GPL-3.0` is not
/// flagged by a list naming only `GPL-3.0`.
#[derive(Debug, Clone, Default)]
pub struct LicenseListTest {
    licenses: HashSet<String>,
    every_choice: bool,
}

impl LicenseListTest {
    pub fn new<I, S>(licenses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            licenses: licenses.into_iter().map(Into::into).collect(),
            every_choice: false,
        }
    }

    /// Match only when every choice the expression offers hits the list.
    pub fn unavoidable<I, S>(licenses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            every_choice: true,
            ..Self::new(licenses)
        }
    }
}

impl LicenseTest for LicenseListTest {
    fn matches(&self, license: &str) -> bool {
        // Exact match first covers identifiers that are not valid expressions.
        if self.licenses.contains(license) {
            return true;
        }
        let listed = |id: &str| self.licenses.contains(id);
        if self.every_choice {
            expression::unavoidable(license, listed)
        } else {
            expression::matches(license, listed)
        }
    }
}

/// Inclusion and unacceptable-license tests.
///
/// The two tests are independent: an unacceptable license is reported through
/// [`LicenseHandlers::unacceptable_license`] but still rendered if it is included.
pub struct LicensePolicy {
    inclusion: Box<dyn LicenseTest>,
    unacceptable: Box<dyn LicenseTest>,
    include_unknown: bool,
}

impl Default for LicensePolicy {
    /// Include everything, reject nothing.
    fn default() -> Self {
        Self {
            inclusion: Box::new(Always(true)),
            unacceptable: Box::new(Always(false)),
            include_unknown: true,
        }
    }
}

impl std::fmt::Debug for LicensePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LicensePolicy")
            .field("include_unknown", &self.include_unknown)
            .finish_non_exhaustive()
    }
}

impl LicensePolicy {
    pub fn new(inclusion: Box<dyn LicenseTest>, unacceptable: Box<dyn LicenseTest>) -> Self {
        Self {
            inclusion,
            unacceptable,
            include_unknown: true,
        }
    }

    /// Whether packages without a determinable license are rendered.
    pub fn with_unknown_included(mut self, include_unknown: bool) -> Self {
        self.include_unknown = include_unknown;
        self
    }

    pub fn is_included(&self, license: Option<&str>) -> bool {
        match license {
            Some(license) => self.inclusion.matches(license),
            None => self.include_unknown,
        }
    }

    /// An unknown license is never unacceptable.
    pub fn is_unacceptable(&self, license: Option<&str>) -> bool {
        license.is_some_and(|license| self.unacceptable.matches(license))
    }

    /// Apply both tests to a freshly resolved package and return whether it is
    /// rendered. Handler errors abort the run and are passed through.
    pub fn evaluate(
        &self,
        package: &str,
        license: Option<&str>,
        handlers: &dyn LicenseHandlers,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<bool> {
        if let Some(license) = license.filter(|l| self.unacceptable.matches(l)) {
            error!(package, license, "unacceptable license");
            handlers.unacceptable_license(package, license)?;
            diagnostics.push(Diagnostic::UnacceptableLicense {
                package: package.to_string(),
                license: license.to_string(),
            });
        }
        Ok(self.is_included(license))
    }
}
