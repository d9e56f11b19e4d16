//! Run reports.
//!
//! A [`Report`] records what happened to every manifest entry and renders
//! either as plain text lines or as JSON.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::archive::ArchiveStats;

/// Why an entry was not archived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    /// The source path does not exist.
    SourceMissing,
    /// The directory that should hold the archive does not exist.
    DestinationDirMissing {
        /// The missing directory.
        directory: PathBuf,
    },
    /// The archive exists and overriding is off.
    DestinationExists,
}

/// What happened to an entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    /// A new archive was written.
    Created {
        /// Archive details.
        stats: ArchiveStats,
    },
    /// An existing archive was replaced.
    Overwritten {
        /// Archive details.
        stats: ArchiveStats,
    },
    /// The entry was skipped.
    Skipped {
        /// Why.
        #[serde(flatten)]
        reason: SkipReason,
    },
    /// Archiving was attempted and failed.
    Failed {
        /// The error message.
        error: String,
    },
    /// Dry run: this would have been done.
    Planned {
        /// Whether an existing archive would be replaced.
        overwrite: bool,
    },
}

/// The outcome for one manifest entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryReport {
    /// Source path from the manifest.
    pub source: PathBuf,
    /// Destination path from the manifest.
    pub destination: PathBuf,
    /// What happened.
    pub outcome: Outcome,
}

impl fmt::Display for EntryReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let src = self.source.display();
        let dest = self.destination.display();
        match &self.outcome {
            Outcome::Created { .. } | Outcome::Overwritten { .. } => {
                write!(f, "Compressed '{src}' to '{dest}' successfully.")
            }
            Outcome::Skipped {
                reason: SkipReason::SourceMissing,
            } => write!(f, "Source path '{src}' does not exist. Skipping."),
            Outcome::Skipped {
                reason: SkipReason::DestinationDirMissing { directory },
            } => write!(
                f,
                "Destination directory '{}' does not exist. Skipping.",
                directory.display()
            ),
            Outcome::Skipped {
                reason: SkipReason::DestinationExists,
            } => write!(f, "File '{dest}' already exists. Skipping."),
            Outcome::Failed { error } => {
                write!(f, "Error: Failed to compress '{src}' to '{dest}'. {error}")
            }
            Outcome::Planned { overwrite: false } => {
                write!(f, "Would compress '{src}' to '{dest}'.")
            }
            Outcome::Planned { overwrite: true } => {
                write!(f, "Would compress '{src}' to '{dest}', overriding the existing file.")
            }
        }
    }
}

/// Counts per outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    /// New archives written.
    pub created: usize,
    /// Existing archives replaced.
    pub overwritten: usize,
    /// Entries skipped.
    pub skipped: usize,
    /// Entries that failed.
    pub failed: usize,
    /// Entries planned in a dry run.
    pub planned: usize,
}

impl Summary {
    /// Total entries counted.
    #[must_use]
    pub fn total(&self) -> usize {
        self.created + self.overwritten + self.skipped + self.failed + self.planned
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} entries: {} created, {} overwritten, {} skipped, {} failed",
            self.total(),
            self.created,
            self.overwritten,
            self.skipped,
            self.failed
        )?;
        if self.planned > 0 {
            write!(f, ", {} planned", self.planned)?;
        }
        Ok(())
    }
}

/// Everything that happened during one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    /// When processing started.
    pub started_at: DateTime<Utc>,
    /// When processing finished.
    pub finished_at: DateTime<Utc>,
    /// Whether this was a dry run.
    pub dry_run: bool,
    /// Per-entry outcomes in manifest order.
    pub entries: Vec<EntryReport>,
    /// Outcome counts.
    pub summary: Summary,
}

impl Report {
    /// Start an empty report.
    #[must_use]
    pub fn new(dry_run: bool) -> Self {
        let now = Utc::now();
        Self {
            started_at: now,
            finished_at: now,
            dry_run,
            entries: Vec::new(),
            summary: Summary::default(),
        }
    }

    /// Record one entry's outcome.
    pub fn push(&mut self, entry: EntryReport) {
        match entry.outcome {
            Outcome::Created { .. } => self.summary.created += 1,
            Outcome::Overwritten { .. } => self.summary.overwritten += 1,
            Outcome::Skipped { .. } => self.summary.skipped += 1,
            Outcome::Failed { .. } => self.summary.failed += 1,
            Outcome::Planned { .. } => self.summary.planned += 1,
        }
        self.entries.push(entry);
    }

    /// Stamp the finish time.
    pub fn finish(&mut self) {
        self.finished_at = Utc::now();
    }

    /// Whether any entry failed.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.summary.failed > 0
    }

    /// Render as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entries {
            writeln!(f, "{entry}")?;
        }
        write!(f, "{}", self.summary)
    }
}
