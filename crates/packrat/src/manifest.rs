//! Manifest loading.
//!
//! A manifest is a YAML mapping from source paths to destination archive
//! paths:
//!
//! ```yaml
//! /home/me/photos: /mnt/backup/photos.tar.gz
//! /etc/nginx: /mnt/backup/nginx.tar.gz
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde_yaml::Value;
use tracing::debug;

use crate::error::{Error, Result};

/// Accepted manifest file extensions.
const MANIFEST_EXTENSIONS: [&str; 2] = [".yml", ".yaml"];

/// Characters that indicate an unexpanded shell reference.
const ENV_REFERENCE_CHARS: [char; 2] = ['$', '~'];

/// A manifest path that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestPath(PathBuf);

impl ManifestPath {
    /// Validate a manifest path given on the command line.
    ///
    /// The path must not contain `$` or `~`, must end in `.yml` or `.yaml`,
    /// and must exist.
    ///
    /// # Errors
    ///
    /// Returns the first check that fails.
    pub fn validate(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let display = path.to_string_lossy();

        if display.contains(ENV_REFERENCE_CHARS) {
            return Err(Error::EnvReference {
                path: display.into_owned(),
            });
        }

        if !MANIFEST_EXTENSIONS.iter().any(|ext| display.ends_with(ext)) {
            return Err(Error::ManifestExtension {
                path: path.to_path_buf(),
            });
        }

        if !path.exists() {
            return Err(Error::ManifestMissing {
                path: path.to_path_buf(),
            });
        }

        Ok(Self(path.to_path_buf()))
    }

    /// The validated path.
    #[must_use]
    pub fn as_path(&self) -> &Path {
        &self.0
    }
}

/// One source → destination pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// File or directory to archive.
    pub source: PathBuf,
    /// Archive to create.
    pub destination: PathBuf,
}

impl Entry {
    /// Create a new entry.
    #[must_use]
    pub fn new(source: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
        }
    }
}

/// A parsed manifest, entries in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    entries: Vec<Entry>,
}

impl Manifest {
    /// Read and parse the manifest at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid YAML, is
    /// empty, or is not a mapping of strings to strings.
    pub fn load(path: &ManifestPath) -> Result<Self> {
        let path = path.as_path();
        let text = fs::read_to_string(path).map_err(|source| Error::ManifestRead {
            path: path.to_path_buf(),
            source,
        })?;
        let manifest = Self::parse(&text, path)?;
        debug!(
            "loaded {} entries from {}",
            manifest.len(),
            path.display()
        );
        Ok(manifest)
    }

    /// Parse manifest text; `path` is only used in error messages.
    ///
    /// # Errors
    ///
    /// See [`Manifest::load`].
    pub fn parse(text: &str, path: &Path) -> Result<Self> {
        let value: Value = serde_yaml::from_str(text).map_err(|source| Error::ManifestParse {
            path: path.to_path_buf(),
            source,
        })?;

        let mapping = match value {
            Value::Mapping(mapping) => mapping,
            Value::Null => {
                return Err(Error::ManifestEmpty {
                    path: path.to_path_buf(),
                })
            }
            other => {
                return Err(Error::ManifestShape {
                    path: path.to_path_buf(),
                    found: kind(&other),
                })
            }
        };

        let entries = mapping
            .into_iter()
            .map(|(key, value)| {
                let source = as_path_string(&key, "source")?;
                let destination =
                    as_path_string(&value, &format!("destination for '{source}'"))?;
                Ok(Entry::new(source, destination))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { entries })
    }

    /// Entries in manifest order.
    #[must_use]
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the manifest has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<Entry> for Manifest {
    fn from_iter<I: IntoIterator<Item = Entry>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

fn as_path_string(value: &Value, role: &str) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        other => Err(Error::manifest_entry(format!(
            "{role} must be a string, found {}",
            kind(other)
        ))),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}
