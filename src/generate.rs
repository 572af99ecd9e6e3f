//! Plan execution.
//!
//! Applies a [`Plan`] to the destination trees in three passes:
//!
//! 1. **Prune**: every removed destination, in reverse plan order, so a
//!    directory is emptied before it is deleted. Failures do not stop the
//!    pass; they are reported together once every removal was attempted.
//! 2. **Directories**: every added directory, in plan order, so parents
//!    exist before their children.
//! 3. **Files**: markup pages are rendered through the [`Site`], everything
//!    else is copied. Files are independent of each other and run on the
//!    rayon pool; a failing file is recorded and the others proceed.
//!
//! Copies get a fresh modification time, which keeps them up to date for
//! the next plan.

use crate::naming;
use crate::plan::{DestinationKind, Plan, Status};
use crate::site::{Site, SiteError};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("Failed to remove {} destination(s): {}", .0.len(), cleanup_list(.0))]
    Cleanup(Vec<(PathBuf, std::io::Error)>),
    #[error("Cannot create directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
}

fn cleanup_list(failures: &[(PathBuf, std::io::Error)]) -> String {
    failures
        .iter()
        .map(|(path, e)| format!("{} ({e})", path.display()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Why one file could not be produced.
#[derive(Error, Debug)]
pub enum FileError {
    #[error(transparent)]
    Page(#[from] SiteError),
    #[error("Copy failed: {0}")]
    Copy(#[from] std::io::Error),
}

#[derive(Debug)]
pub struct Failure {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub kind: DestinationKind,
    pub error: FileError,
}

/// What one build did.
#[derive(Debug, Default)]
pub struct Report {
    pub removed: usize,
    pub directories: usize,
    pub copied: usize,
    pub pages: usize,
    pub failures: Vec<Failure>,
}

impl Report {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

enum Produced {
    Copied,
    Page,
}

/// Execute `plan` against the destinations it names.
pub fn execute(plan: &Plan, site: &Site) -> Result<Report, GenerateError> {
    let mut report = Report {
        removed: prune(plan)?,
        ..Report::default()
    };

    let mut files: Vec<(&Path, &Status)> = Vec::new();
    for (source, status) in plan.changes() {
        if source.is_dir() {
            fs::create_dir_all(&status.destination).map_err(|e| GenerateError::CreateDir {
                path: status.destination.clone(),
                source: e,
            })?;
            report.directories += 1;
        } else {
            files.push((source, status));
        }
    }

    let outcomes: Vec<Result<Produced, Failure>> = files
        .par_iter()
        .map(|&(source, status)| {
            produce(source, status, site).map_err(|error| Failure {
                source: source.to_path_buf(),
                destination: status.destination.clone(),
                kind: status.kind,
                error,
            })
        })
        .collect();

    for outcome in outcomes {
        match outcome {
            Ok(Produced::Copied) => report.copied += 1,
            Ok(Produced::Page) => report.pages += 1,
            Err(failure) => {
                tracing::warn!(
                    source = %failure.source.display(),
                    error = %failure.error,
                    "File failed"
                );
                report.failures.push(failure);
            }
        }
    }
    tracing::info!(
        removed = report.removed,
        directories = report.directories,
        copied = report.copied,
        pages = report.pages,
        failed = report.failures.len(),
        "Build finished"
    );
    Ok(report)
}

fn prune(plan: &Plan) -> Result<usize, GenerateError> {
    let mut removed = 0;
    let mut failures = Vec::new();
    for (_, status) in plan.removals() {
        let path = &status.destination;
        let result = match fs::symlink_metadata(path) {
            Ok(meta) if meta.is_dir() => fs::remove_dir_all(path),
            Ok(_) => fs::remove_file(path),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        };
        match result {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "Removed");
                removed += 1;
            }
            Err(e) => failures.push((path.clone(), e)),
        }
    }
    if failures.is_empty() {
        Ok(removed)
    } else {
        Err(GenerateError::Cleanup(failures))
    }
}

fn produce(source: &Path, status: &Status, site: &Site) -> Result<Produced, FileError> {
    let name = source
        .file_name()
        .map(|n| n.to_string_lossy())
        .unwrap_or_default();
    if naming::is_markup(&name, site.markup()) {
        site.generate(source, &status.destination, status.kind)?;
        Ok(Produced::Page)
    } else {
        fs::copy(source, &status.destination)?;
        tracing::debug!(
            source = %source.display(),
            destination = %status.destination.display(),
            "Copied"
        );
        Ok(Produced::Copied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MarkupConfig;
    use crate::metadata::MetadataError;
    use crate::plan::{Destinations, Planner};
    use crate::test_helpers::*;
    use tempfile::TempDir;

    struct Fixture {
        tmp: TempDir,
        site: Site,
    }

    impl Fixture {
        fn new() -> Self {
            let tmp = setup_site();
            let site = Site::load(
                &tmp.path().join("template.xumlv"),
                &tmp.path().join("src"),
                MarkupConfig::default(),
            )
            .unwrap();
            Self { tmp, site }
        }

        fn path(&self, relative: &str) -> PathBuf {
            self.tmp.path().join(relative)
        }

        fn plan(&self) -> Plan {
            let markup = MarkupConfig::default();
            Planner::new(|name: &str| naming::map_name(name, &markup), "PRIVATE")
                .diff(
                    &self.path("src"),
                    &Destinations {
                        public: Some(self.path("public")),
                        private: Some(self.path("private")),
                    },
                )
                .unwrap()
        }
    }

    #[test]
    fn build_writes_both_destinations() {
        let fixture = Fixture::new();
        let report = execute(&fixture.plan(), &fixture.site).unwrap();

        assert!(report.is_success(), "{:?}", report.failures);
        assert_eq!(report.pages, 6);
        assert_eq!(report.copied, 3);
        assert_eq!(
            list_tree(&fixture.path("public")),
            vec!["index.html", "style.css", "unix", "unix/index.html", "unix/td01.html"]
        );
        assert_eq!(
            list_tree(&fixture.path("private")),
            vec![
                "index.html",
                "style.css",
                "unix",
                "unix/PRIVATE",
                "unix/PRIVATE/td01-ls.c",
                "unix/index.html",
                "unix/td01.html",
            ]
        );
        let private = fs::read_to_string(fixture.path("private/unix/td01.html")).unwrap();
        assert!(private.contains("ls -l"));
        let public = fs::read_to_string(fixture.path("public/unix/td01.html")).unwrap();
        assert!(!public.contains("ls -l"));
    }

    #[test]
    fn second_build_has_nothing_to_do() {
        let fixture = Fixture::new();
        execute(&fixture.plan(), &fixture.site).unwrap();
        assert!(fixture.plan().is_empty(), "{}", fixture.plan());
    }

    #[test]
    fn removed_sources_are_pruned() {
        let fixture = Fixture::new();
        execute(&fixture.plan(), &fixture.site).unwrap();
        fs::remove_dir_all(fixture.path("src/unix")).unwrap();

        let report = execute(&fixture.plan(), &fixture.site).unwrap();
        assert_eq!(list_tree(&fixture.path("public")), vec!["index.html", "style.css"]);
        assert_eq!(list_tree(&fixture.path("private")), vec!["index.html", "style.css"]);
        // unix, two pages, PRIVATE and the C file in private; unix and two pages in public
        assert_eq!(report.removed, 8);
    }

    #[test]
    fn failing_page_does_not_stop_others() {
        let fixture = Fixture::new();
        write_file(&fixture.path("src"), "broken.xumlv", "<td><title>B</title><blink/></td>");
        let report = execute(&fixture.plan(), &fixture.site).unwrap();

        assert_eq!(report.failures.len(), 2);
        assert!(
            report
                .failures
                .iter()
                .all(|f| f.source.ends_with("broken.xumlv") && matches!(f.error, FileError::Page(_)))
        );
        assert_eq!(report.pages, 6);
        assert!(!fixture.path("public/broken.html").exists());
    }

    #[test]
    fn malformed_page_fails_alone() {
        let fixture = Fixture::new();
        write_file(&fixture.path("src"), "broken.xumlv", "<td><title>x</td>");
        let report = execute(&fixture.plan(), &fixture.site).unwrap();

        assert_eq!(report.failures.len(), 2);
        for failure in &report.failures {
            assert!(failure.source.ends_with("broken.xumlv"));
            assert!(
                matches!(
                    &failure.error,
                    FileError::Page(SiteError::Metadata(MetadataError::Markup { path, .. }))
                        if path.ends_with("broken.xumlv")
                ),
                "{:?}",
                failure.error
            );
        }
        assert_eq!(report.pages, 6);
        assert_eq!(report.copied, 3);
        assert!(fixture.path("public/unix/td01.html").is_file());
        assert!(!fixture.path("public/broken.html").exists());
        assert!(!fixture.path("private/broken.html").exists());
    }

    #[test]
    fn prune_attempts_every_removal() {
        let fixture = Fixture::new();
        let public = fixture.path("public");
        write_file(&public, "good.html", "");
        write_file(&public, "blocker/child", "");
        let plan = fixture.plan();

        // blocker becomes a file, so its planned child can no longer be stat'ed
        fs::remove_dir_all(public.join("blocker")).unwrap();
        write_file(&public, "blocker", "");

        let error = execute(&plan, &fixture.site).unwrap_err();
        let GenerateError::Cleanup(failures) = error else {
            panic!("expected a cleanup error, got {error:?}");
        };
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, public.join("blocker/child"));
        assert!(!public.join("good.html").exists());
        assert!(!public.join("blocker").exists());
        // nothing is generated after a failed prune
        assert!(!public.join("index.html").exists());
    }

    #[test]
    fn cleanup_error_lists_paths() {
        let error = GenerateError::Cleanup(vec![(
            PathBuf::from("/out/locked"),
            std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        )]);
        let message = error.to_string();
        assert!(message.starts_with("Failed to remove 1 destination(s): /out/locked ("));
    }
}
