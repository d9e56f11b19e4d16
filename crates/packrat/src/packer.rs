//! The manifest processing loop.
//!
//! Entries are handled one at a time in manifest order. A skipped or failed
//! entry never stops the run.

use std::path::PathBuf;

use tracing::{debug, error, info, warn};

use crate::archive::{create_archive, parent_dir, ArchiveOptions};
use crate::config::Config;
use crate::error::Result;
use crate::manifest::{Entry, Manifest};
use crate::report::{EntryReport, Outcome, Report, SkipReason};

/// What will be done with an entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Leave the entry alone.
    Skip(SkipReason),
    /// Write a new archive.
    Create,
    /// Replace an existing archive.
    Overwrite,
}

/// Processes manifests into archives.
#[derive(Debug, Clone, Default)]
pub struct Packer {
    options: ArchiveOptions,
    override_existing: bool,
    dry_run: bool,
}

impl Packer {
    /// Create a packer with the given archive options.
    #[must_use]
    pub fn new(options: ArchiveOptions) -> Self {
        Self {
            options,
            override_existing: false,
            dry_run: false,
        }
    }

    /// Build a packer from loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if an exclude pattern does not compile.
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(ArchiveOptions::from_config(&config.archive)?)
            .override_existing(config.archive.override_existing))
    }

    /// Allow existing destinations to be replaced.
    #[must_use]
    pub fn override_existing(mut self, enabled: bool) -> Self {
        self.override_existing = enabled;
        self
    }

    /// Decide entries without writing anything.
    #[must_use]
    pub fn dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }

    /// Decide what to do with an entry.
    ///
    /// Checks run in order: source exists, destination directory exists,
    /// destination is free (or may be overridden).
    #[must_use]
    pub fn decide(&self, entry: &Entry) -> Decision {
        if !entry.source.exists() {
            return Decision::Skip(SkipReason::SourceMissing);
        }

        if entry.destination.as_os_str().is_empty() {
            return Decision::Skip(SkipReason::DestinationDirMissing {
                directory: PathBuf::new(),
            });
        }

        let directory = parent_dir(&entry.destination);
        if !directory.is_dir() {
            return Decision::Skip(SkipReason::DestinationDirMissing {
                directory: directory.to_path_buf(),
            });
        }

        if entry.destination.exists() {
            if self.override_existing {
                Decision::Overwrite
            } else {
                Decision::Skip(SkipReason::DestinationExists)
            }
        } else {
            Decision::Create
        }
    }

    /// Decide and, unless this is a dry run, archive one entry.
    #[must_use]
    pub fn process(&self, entry: &Entry) -> Outcome {
        let src = entry.source.display();
        let dest = entry.destination.display();

        let overwrite = match self.decide(entry) {
            Decision::Skip(reason) => {
                warn!("skipping '{src}': {reason:?}");
                return Outcome::Skipped { reason };
            }
            Decision::Create => false,
            Decision::Overwrite => true,
        };

        if self.dry_run {
            debug!("would compress '{src}' to '{dest}'");
            return Outcome::Planned { overwrite };
        }

        if overwrite {
            info!("overriding existing file: {dest}");
        }

        match create_archive(&entry.source, &entry.destination, &self.options) {
            Ok(stats) => {
                info!("compressed '{src}' to '{dest}'");
                if overwrite {
                    Outcome::Overwritten { stats }
                } else {
                    Outcome::Created { stats }
                }
            }
            Err(err) => {
                error!("{err}");
                Outcome::Failed {
                    error: err.to_string(),
                }
            }
        }
    }

    /// Process every manifest entry in order.
    #[must_use]
    pub fn run(&self, manifest: &Manifest) -> Report {
        let mut report = Report::new(self.dry_run);
        for entry in manifest.entries() {
            let outcome = self.process(entry);
            report.push(EntryReport {
                source: entry.source.clone(),
                destination: entry.destination.clone(),
                outcome,
            });
        }
        report.finish();
        debug!("{}", report.summary);
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    use crate::logging::init_test_logging;

    struct Fixture {
        dir: tempfile::TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            init_test_logging();
            let dir = tempfile::tempdir().unwrap();
            fs::create_dir(dir.path().join("src")).unwrap();
            fs::write(dir.path().join("src").join("file.txt"), "contents").unwrap();
            fs::create_dir(dir.path().join("out")).unwrap();
            Self { dir }
        }

        fn entry(&self, source: &str, destination: &str) -> Entry {
            Entry::new(self.dir.path().join(source), self.dir.path().join(destination))
        }
    }

    #[test]
    fn test_decide_source_missing() {
        let fx = Fixture::new();
        let decision = Packer::default().decide(&fx.entry("nope", "out/a.tar.gz"));
        assert_eq!(decision, Decision::Skip(SkipReason::SourceMissing));
    }

    #[test]
    fn test_decide_destination_dir_missing() {
        let fx = Fixture::new();
        let decision = Packer::default().decide(&fx.entry("src", "missing/a.tar.gz"));
        assert_eq!(
            decision,
            Decision::Skip(SkipReason::DestinationDirMissing {
                directory: fx.dir.path().join("missing")
            })
        );
    }

    #[test]
    fn test_decide_source_checked_before_destination_dir() {
        let fx = Fixture::new();
        let decision = Packer::default().decide(&fx.entry("nope", "missing/a.tar.gz"));
        assert_eq!(decision, Decision::Skip(SkipReason::SourceMissing));
    }

    #[test]
    fn test_decide_empty_source_is_missing() {
        let fx = Fixture::new();
        let entry = Entry::new("", fx.dir.path().join("out/a.tar.gz"));
        assert_eq!(
            Packer::default().decide(&entry),
            Decision::Skip(SkipReason::SourceMissing)
        );
    }

    #[test]
    fn test_decide_empty_destination_has_no_directory() {
        let fx = Fixture::new();
        let entry = Entry::new(fx.dir.path().join("src"), "");
        assert_eq!(
            Packer::default().decide(&entry),
            Decision::Skip(SkipReason::DestinationDirMissing {
                directory: PathBuf::new()
            })
        );
    }

    #[test]
    fn test_run_skips_empty_paths_and_continues() {
        let fx = Fixture::new();
        let manifest: Manifest = vec![
            Entry::new("", fx.dir.path().join("out/empty.tar.gz")),
            Entry::new(fx.dir.path().join("src"), ""),
            fx.entry("src", "out/src.tar.gz"),
        ]
        .into_iter()
        .collect();

        let report = Packer::default().run(&manifest);

        assert_eq!(report.summary.skipped, 2);
        assert_eq!(report.summary.created, 1);
        assert!(!report.has_failures());
    }

    #[test]
    fn test_decide_destination_exists() {
        let fx = Fixture::new();
        fs::write(fx.dir.path().join("out/a.tar.gz"), "old").unwrap();
        let entry = fx.entry("src", "out/a.tar.gz");

        assert_eq!(
            Packer::default().decide(&entry),
            Decision::Skip(SkipReason::DestinationExists)
        );
        assert_eq!(
            Packer::default().override_existing(true).decide(&entry),
            Decision::Overwrite
        );
    }

    #[test]
    fn test_decide_create() {
        let fx = Fixture::new();
        let decision = Packer::default().decide(&fx.entry("src/file.txt", "out/file.tar.gz"));
        assert_eq!(decision, Decision::Create);
    }

    #[test]
    fn test_decide_bare_destination_uses_current_dir() {
        let fx = Fixture::new();
        let entry = Entry::new(fx.dir.path().join("src"), "packrat-test-nonexistent.tar.gz");
        assert_eq!(Packer::default().decide(&entry), Decision::Create);
    }

    #[test]
    fn test_process_creates_archive() {
        let fx = Fixture::new();
        let entry = fx.entry("src", "out/src.tar.gz");

        let outcome = Packer::default().process(&entry);

        assert!(matches!(outcome, Outcome::Created { .. }));
        assert!(entry.destination.is_file());
    }

    #[test]
    fn test_process_overwrites_when_enabled() {
        let fx = Fixture::new();
        let entry = fx.entry("src", "out/src.tar.gz");
        fs::write(&entry.destination, "old").unwrap();

        let outcome = Packer::default().override_existing(true).process(&entry);

        match outcome {
            Outcome::Overwritten { stats } => assert!(stats.archive_bytes > 0),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_ne!(fs::read(&entry.destination).unwrap(), b"old");
    }

    #[test]
    fn test_process_dry_run_writes_nothing() {
        let fx = Fixture::new();
        let entry = fx.entry("src", "out/src.tar.gz");

        let outcome = Packer::default().dry_run(true).process(&entry);

        assert_eq!(outcome, Outcome::Planned { overwrite: false });
        assert!(!entry.destination.exists());
    }

    #[test]
    fn test_run_continues_past_skips() {
        let fx = Fixture::new();
        let manifest: Manifest = vec![
            fx.entry("nope", "out/nope.tar.gz"),
            fx.entry("src", "missing/src.tar.gz"),
            fx.entry("src", "out/src.tar.gz"),
        ]
        .into_iter()
        .collect();

        let report = Packer::default().run(&manifest);

        assert_eq!(report.entries.len(), 3);
        assert_eq!(report.summary.skipped, 2);
        assert_eq!(report.summary.created, 1);
        assert!(!report.has_failures());
        assert!(!report.dry_run);
    }

    #[cfg(unix)]
    #[test]
    fn test_run_continues_past_failures() {
        let fx = Fixture::new();
        let looped = fx.dir.path().join("looped");
        fs::create_dir(&looped).unwrap();
        std::os::unix::fs::symlink(&looped, looped.join("again")).unwrap();
        let manifest: Manifest = vec![
            fx.entry("looped", "out/looped.tar.gz"),
            fx.entry("src", "out/src.tar.gz"),
        ]
        .into_iter()
        .collect();

        let options = ArchiveOptions {
            follow_symlinks: true,
            ..ArchiveOptions::default()
        };
        let report = Packer::new(options).run(&manifest);

        assert!(matches!(report.entries[0].outcome, Outcome::Failed { .. }));
        assert!(matches!(report.entries[1].outcome, Outcome::Created { .. }));
        assert!(report.has_failures());
        assert!(!fx.dir.path().join("out/looped.tar.gz").exists());
    }

    #[test]
    fn test_from_config_applies_override() {
        let mut config = Config::default();
        config.archive.override_existing = true;

        let fx = Fixture::new();
        fs::write(fx.dir.path().join("out/a.tar.gz"), "old").unwrap();
        let packer = Packer::from_config(&config).unwrap();

        assert_eq!(
            packer.decide(&fx.entry("src", "out/a.tar.gz")),
            Decision::Overwrite
        );
    }
}
