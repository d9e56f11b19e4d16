//! Gzip-compressed tar archive creation.
//!
//! Archives are written to a temporary file next to the destination and
//! renamed into place once complete.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use flate2::{write::GzEncoder, Compression};
use regex::Regex;
use serde::Serialize;
use tracing::{debug, trace, warn};

use crate::config::ArchiveConfig;
use crate::error::{Error, Result};

/// Compiled exclude patterns.
#[derive(Debug, Clone, Default)]
pub struct ExcludeSet {
    patterns: Vec<Regex>,
}

impl ExcludeSet {
    /// Compile a list of regex patterns.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ExcludePattern`] for the first pattern that fails to
    /// compile.
    pub fn compile<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let patterns = patterns
            .iter()
            .map(|p| {
                Regex::new(p.as_ref()).map_err(|source| Error::ExcludePattern {
                    pattern: p.as_ref().to_string(),
                    source,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    /// Whether an archive-relative path should be left out.
    #[must_use]
    pub fn is_excluded(&self, name: &Path) -> bool {
        if self.patterns.is_empty() {
            return false;
        }
        let name = name.to_string_lossy();
        self.patterns.iter().any(|re| re.is_match(&name))
    }

    /// Whether no patterns are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

/// Options controlling how archives are built.
#[derive(Debug, Clone)]
pub struct ArchiveOptions {
    /// Gzip level, 0-9.
    pub compression_level: u32,
    /// Archive symlink targets instead of the links.
    pub follow_symlinks: bool,
    /// Paths to leave out.
    pub excludes: ExcludeSet,
}

impl Default for ArchiveOptions {
    fn default() -> Self {
        Self {
            compression_level: 6,
            follow_symlinks: false,
            excludes: ExcludeSet::default(),
        }
    }
}

impl ArchiveOptions {
    /// Build options from the archive section of the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if an exclude pattern does not compile.
    pub fn from_config(config: &ArchiveConfig) -> Result<Self> {
        Ok(Self {
            compression_level: config.compression_level,
            follow_symlinks: config.follow_symlinks,
            excludes: ExcludeSet::compile(config.exclude_patterns.as_slice())?,
        })
    }
}

/// What went into a finished archive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ArchiveStats {
    /// Number of tar entries written (directories included).
    pub entries: u64,
    /// Total size of regular files archived, before compression.
    pub input_bytes: u64,
    /// Size of the finished archive.
    pub archive_bytes: u64,
    /// BLAKE3 digest of the finished archive, hex encoded.
    pub digest: String,
}

/// Directory that holds `path`; a bare file name lives in `.`.
#[must_use]
pub fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// Archive `source` into a gzip-compressed tar at `destination`.
///
/// The source is stored under its base name. An existing destination is
/// replaced only after the new archive has been fully written.
///
/// # Errors
///
/// Returns [`Error::Archive`] if reading the source or writing the archive
/// fails. The destination is left untouched in that case.
pub fn create_archive(
    source: &Path,
    destination: &Path,
    options: &ArchiveOptions,
) -> Result<ArchiveStats> {
    write_archive(source, destination, options)
        .map_err(|err| Error::archive(source, destination, err))
}

fn write_archive(
    source: &Path,
    destination: &Path,
    options: &ArchiveOptions,
) -> io::Result<ArchiveStats> {
    let (root, name) = resolve_source(source)?;
    let dest_dir = fs::canonicalize(parent_dir(destination))?;

    let mut tmp = tempfile::Builder::new()
        .prefix(".packrat-")
        .suffix(".tmp")
        .tempfile_in(&dest_dir)?;

    let mut walker = Walker {
        options,
        skip: vec![
            tmp.path().to_path_buf(),
            dest_dir.join(destination.file_name().unwrap_or_default()),
        ],
        ancestors: Vec::new(),
        stats: ArchiveStats::default(),
    };

    {
        let encoder = GzEncoder::new(
            BufWriter::new(&mut tmp),
            Compression::new(options.compression_level),
        );
        let mut builder = tar::Builder::new(encoder);
        builder.follow_symlinks(options.follow_symlinks);

        walker.append(&mut builder, &root, &name)?;

        let encoder = builder.into_inner()?;
        let mut writer = encoder.finish()?;
        writer.flush()?;
    }

    tmp.as_file().sync_all()?;
    set_archive_permissions(tmp.path())?;
    let file = tmp.persist(destination).map_err(|err| err.error)?;

    let mut stats = walker.stats;
    stats.archive_bytes = file.metadata()?.len();
    drop(file);
    stats.digest = digest_file(destination)?;

    debug!(
        "wrote {} entries ({} bytes in, {} bytes out) to {}",
        stats.entries,
        stats.input_bytes,
        stats.archive_bytes,
        destination.display()
    );
    Ok(stats)
}

/// Compute the hex BLAKE3 digest of a file.
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub fn digest_file(path: &Path) -> io::Result<String> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut hasher = blake3::Hasher::new();
    io::copy(&mut reader, &mut hasher)?;
    Ok(hasher.finalize().to_hex().to_string())
}

/// Absolute path to walk from, and the name it takes inside the archive.
///
/// The parent is canonicalized but the final component is kept, so a
/// symlinked source is still archived as a link.
fn resolve_source(source: &Path) -> io::Result<(PathBuf, PathBuf)> {
    match source.file_name() {
        Some(name) => {
            let parent = fs::canonicalize(parent_dir(source))?;
            Ok((parent.join(name), PathBuf::from(name)))
        }
        None => {
            let root = fs::canonicalize(source)?;
            let name = root.file_name().map(PathBuf::from).ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("cannot name an archive root for '{}'", source.display()),
                )
            })?;
            Ok((root, name))
        }
    }
}

struct Walker<'a> {
    options: &'a ArchiveOptions,
    skip: Vec<PathBuf>,
    ancestors: Vec<PathBuf>,
    stats: ArchiveStats,
}

impl Walker<'_> {
    fn append<W: Write>(
        &mut self,
        builder: &mut tar::Builder<W>,
        path: &Path,
        name: &Path,
    ) -> io::Result<()> {
        let meta = if self.options.follow_symlinks {
            fs::metadata(path)?
        } else {
            fs::symlink_metadata(path)?
        };

        #[cfg(unix)]
        {
            use std::os::unix::fs::FileTypeExt;
            if meta.file_type().is_socket() {
                warn!("skipping socket {}", path.display());
                return Ok(());
            }
        }

        if !meta.is_dir() {
            trace!("adding {}", name.display());
            builder.append_path_with_name(path, name)?;
            self.stats.entries += 1;
            if meta.is_file() {
                self.stats.input_bytes += meta.len();
            }
            return Ok(());
        }

        if self.options.follow_symlinks {
            let real = fs::canonicalize(path)?;
            if self.ancestors.contains(&real) {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("symlink loop at '{}'", path.display()),
                ));
            }
            self.ancestors.push(real);
        }

        trace!("adding {}/", name.display());
        builder.append_dir(name, path)?;
        self.stats.entries += 1;

        let mut children = fs::read_dir(path)?
            .map(|entry| entry.map(|e| e.file_name()))
            .collect::<io::Result<Vec<OsString>>>()?;
        children.sort();

        for child in children {
            let child_path = path.join(&child);
            let child_name = name.join(&child);
            if self.is_skipped(&child_path) {
                continue;
            }
            if self.options.excludes.is_excluded(&child_name) {
                debug!("excluding {}", child_name.display());
                continue;
            }
            self.append(builder, &child_path, &child_name)?;
        }

        if self.options.follow_symlinks {
            self.ancestors.pop();
        }
        Ok(())
    }

    /// Whether `path` is the archive being written (or the one it replaces).
    ///
    /// When following symlinks the walk may reach the destination directory
    /// through a link, so the real path is compared as well.
    fn is_skipped(&self, path: &Path) -> bool {
        self.skip.iter().any(|p| p == path)
            || (self.options.follow_symlinks
                && fs::canonicalize(path).is_ok_and(|real| self.skip.contains(&real)))
    }
}

#[cfg(unix)]
fn set_archive_permissions(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
#[allow(clippy::unnecessary_wraps)]
fn set_archive_permissions(_path: &Path) -> io::Result<()> {
    Ok(())
}
