//! Error types for packrat.
//!
//! This module defines all error types used throughout the packrat crate,
//! providing detailed context for debugging and user-friendly error messages.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for packrat operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Manifest Errors ===
    /// The manifest path contains a shell-style environment reference.
    #[error(
        "environment variables (e.g. $HOME or $USER) are not allowed in the manifest path: {path}"
    )]
    EnvReference {
        /// The offending path, as given.
        path: String,
    },

    /// The manifest path does not end with `.yml` or `.yaml`.
    #[error("the manifest path must end with .yml or .yaml: {path}")]
    ManifestExtension {
        /// The offending path.
        path: PathBuf,
    },

    /// The manifest file does not exist.
    #[error("the manifest '{path}' does not exist")]
    ManifestMissing {
        /// Path to the manifest.
        path: PathBuf,
    },

    /// Failed to read the manifest file.
    #[error("failed to read manifest {path}: {source}")]
    ManifestRead {
        /// Path to the manifest.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The manifest is not valid YAML.
    #[error("YAML syntax error in manifest '{path}': {source}")]
    ManifestParse {
        /// Path to the manifest.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: serde_yaml::Error,
    },

    /// The manifest holds no document.
    #[error("the manifest '{path}' is empty")]
    ManifestEmpty {
        /// Path to the manifest.
        path: PathBuf,
    },

    /// The manifest's top level is not a mapping.
    #[error("the manifest '{path}' must be a mapping of source to destination, found {found}")]
    ManifestShape {
        /// Path to the manifest.
        path: PathBuf,
        /// What was found instead.
        found: &'static str,
    },

    /// A manifest entry is not a string-to-string pair.
    #[error("invalid manifest entry: {message}")]
    ManifestEntry {
        /// Description of the bad entry.
        message: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Archive Errors ===
    /// Building an archive failed.
    #[error("failed to compress '{source_path}' to '{destination}': {source}")]
    Archive {
        /// The source being archived.
        source_path: PathBuf,
        /// The archive being written.
        destination: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// An exclude pattern failed to compile.
    #[error("invalid exclude pattern '{pattern}': {source}")]
    ExcludePattern {
        /// The pattern as configured.
        pattern: String,
        /// The underlying error.
        #[source]
        source: regex::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for packrat operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create an archive error for the given source and destination.
    #[must_use]
    pub fn archive(
        source_path: impl Into<PathBuf>,
        destination: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Self::Archive {
            source_path: source_path.into(),
            destination: destination.into(),
            source,
        }
    }

    /// Create a manifest entry error.
    #[must_use]
    pub fn manifest_entry(message: impl Into<String>) -> Self {
        Self::ManifestEntry {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_reference_display() {
        let err = Error::EnvReference {
            path: "$HOME/backup.yml".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("$HOME/backup.yml"));
        assert!(msg.contains("not allowed"));
    }

    #[test]
    fn test_manifest_extension_display() {
        let err = Error::ManifestExtension {
            path: PathBuf::from("backup.json"),
        };
        assert!(err.to_string().contains(".yml or .yaml"));
    }

    #[test]
    fn test_manifest_missing_display() {
        let err = Error::ManifestMissing {
            path: PathBuf::from("/nowhere/backup.yml"),
        };
        assert_eq!(
            err.to_string(),
            "the manifest '/nowhere/backup.yml' does not exist"
        );
    }

    #[test]
    fn test_manifest_parse_display() {
        let yaml_err = serde_yaml::from_str::<serde_yaml::Value>("a: [b").unwrap_err();
        let err = Error::ManifestParse {
            path: PathBuf::from("bad.yml"),
            source: yaml_err,
        };
        assert!(err.to_string().starts_with("YAML syntax error in manifest 'bad.yml'"));
    }

    #[test]
    fn test_manifest_shape_display() {
        let err = Error::ManifestShape {
            path: PathBuf::from("list.yml"),
            found: "a sequence",
        };
        assert!(err.to_string().contains("found a sequence"));
    }

    #[test]
    fn test_archive_error_display() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err = Error::archive("/data/photos", "/backups/photos.tar.gz", io_err);
        let msg = err.to_string();
        assert!(msg.contains("/data/photos"));
        assert!(msg.contains("/backups/photos.tar.gz"));
        assert!(msg.contains("access denied"));
    }

    #[test]
    fn test_exclude_pattern_display() {
        let regex_err = regex::Regex::new("[oops").unwrap_err();
        let err = Error::ExcludePattern {
            pattern: "[oops".to_string(),
            source: regex_err,
        };
        assert!(err.to_string().contains("[oops"));
    }

    #[test]
    fn test_config_validation_error_display() {
        let err = Error::ConfigValidation {
            message: "compression_level out of range".to_string(),
        };
        assert!(err.to_string().contains("compression_level"));
    }

    #[test]
    fn test_from_json_error() {
        let json_result: std::result::Result<i32, serde_json::Error> =
            serde_json::from_str("not valid json");
        if let Err(json_err) = json_result {
            let err: Error = json_err.into();
            assert!(matches!(err, Error::Json(_)));
        }
    }
}
