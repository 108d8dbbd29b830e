use crate::error::{AttributionError, Result};
use crate::models::LicenseEntry;

/// Caller hooks for the cases the resolvers cannot decide on their own.
///
/// Every method has a default; implementors override only what they need.
pub trait LicenseHandlers {
    /// A legacy `licenses` array lists several types and none is preferred.
    /// The returned value becomes the license type. Default: the first entry's type.
    fn ambiguous_license(&self, _package: &str, licenses: &[LicenseEntry]) -> Option<String> {
        licenses.iter().find_map(|entry| entry.license_type.clone())
    }

    /// The manifest declares no license at all. Default: unknown (`None`).
    fn missing_license_type(&self, _package: &str) -> Option<String> {
        None
    }

    /// No license text could be found. Default: no text.
    fn missing_license_text(&self, _package: &str, _license: Option<&str>) -> Option<String> {
        None
    }

    /// The license matched the unacceptable test. Returning an error aborts the run;
    /// returning `Ok` records a diagnostic and continues. Default: continue.
    fn unacceptable_license(&self, _package: &str, _license: &str) -> Result<()> {
        Ok(())
    }
}

/// Built-in handlers; only the unacceptable-license behavior is configurable.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultHandlers {
    pub abort_on_unacceptable: bool,
}

impl DefaultHandlers {
    pub fn aborting() -> Self {
        Self {
            abort_on_unacceptable: true,
        }
    }
}

impl LicenseHandlers for DefaultHandlers {
    fn unacceptable_license(&self, package: &str, license: &str) -> Result<()> {
        if self.abort_on_unacceptable {
            return Err(AttributionError::UnacceptableLicense {
                package: package.to_string(),
                license: license.to_string(),
            });
        }
        Ok(())
    }
}
