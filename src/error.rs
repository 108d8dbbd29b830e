use std::path::PathBuf;

use thiserror::Error;

/// Failures that stop an attribution run.
///
/// Everything recoverable is reported as a [`Diagnostic`](crate::models::Diagnostic)
/// instead; only these variants propagate out of the engine.
#[derive(Debug, Error)]
pub enum AttributionError {
    #[error("could not read manifest for {package} at {path}: {source}")]
    ManifestRead {
        package: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid manifest for {package} at {path}: {source}")]
    ManifestParse {
        package: String,
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("manifest for {package} at {path} has no name")]
    MissingManifestName { package: String, path: PathBuf },

    #[error("unacceptable license found for {package}: {license}")]
    UnacceptableLicense { package: String, license: String },
}

pub type Result<T> = std::result::Result<T, AttributionError>;
