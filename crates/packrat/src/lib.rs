//! `packrat` - Manifest-driven tar.gz archiver
//!
//! This library reads a YAML manifest mapping source paths to destination
//! archives and packs each source into a gzip-compressed tar.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod archive;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod manifest;
pub mod packer;
pub mod report;

pub use archive::{create_archive, ArchiveOptions, ArchiveStats, ExcludeSet};
pub use config::Config;
pub use error::{Error, Result};
pub use logging::init_logging;
pub use manifest::{Entry, Manifest, ManifestPath};
pub use packer::{Decision, Packer};
pub use report::{Outcome, Report, SkipReason};
