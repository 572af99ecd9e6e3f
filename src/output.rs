//! CLI output formatting.
//!
//! # Output Format
//!
//! ## Plan
//!
//! Paths are shown relative to the root they live under: sources relative
//! to the source root, orphans relative to their destination root.
//!
//! ```text
//! unix/td01.xumlv
//!     public: added → unix/td01.html
//!     private: added → unix/td01.html
//! old.html
//!     public: removed
//!
//! 2 added, 0 updated, 1 removed
//! ```
//!
//! ## Build
//!
//! ```text
//! Removed 1, created 2 directories, copied 3 files, generated 6 pages
//! FAILED broken.xumlv → public: Cannot render /site/src/broken.xumlv: Element <blink> is not allowed in HTML output
//! ```
//!
//! # Architecture
//!
//! Each stage has a `format_*` function (returns `Vec<String>`) for testability
//! and a `print_*` wrapper that writes to stdout. Format functions are pure:
//! no I/O, no side effects.

use crate::generate::Report;
use crate::plan::{DestinationKind, Plan, State};
use std::path::Path;

/// Roots used to shorten paths for display.
#[derive(Debug, Clone, Copy)]
pub struct Roots<'a> {
    pub source: &'a Path,
    pub public: Option<&'a Path>,
    pub private: Option<&'a Path>,
}

impl Roots<'_> {
    fn relative(&self, path: &Path) -> String {
        [Some(self.source), self.public, self.private]
            .into_iter()
            .flatten()
            .find_map(|root| path.strip_prefix(root).ok())
            .unwrap_or(path)
            .display()
            .to_string()
    }

    fn destination(&self, kind: DestinationKind, path: &Path) -> String {
        let root = match kind {
            DestinationKind::Public => self.public,
            DestinationKind::Private => self.private,
        };
        root.and_then(|r| path.strip_prefix(r).ok())
            .unwrap_or(path)
            .display()
            .to_string()
    }
}

// ============================================================================
// Plan output
// ============================================================================

/// Format a plan as one block per path.
pub fn format_plan(plan: &Plan, roots: Roots<'_>) -> Vec<String> {
    let mut lines = Vec::new();
    if plan.is_empty() {
        lines.push("Up to date".to_string());
        return lines;
    }
    for entry in plan.entries() {
        lines.push(roots.relative(&entry.path));
        for status in &entry.statuses {
            match status.state {
                State::Removed => lines.push(format!("    {}: removed", status.kind)),
                state => lines.push(format!(
                    "    {}: {} → {}",
                    status.kind,
                    state,
                    roots.destination(status.kind, &status.destination)
                )),
            }
        }
    }
    lines.push(String::new());
    lines.push(format!(
        "{} added, {} updated, {} removed",
        plan.count(State::Added),
        plan.count(State::Updated),
        plan.count(State::Removed)
    ));
    lines
}

/// Print plan output to stdout.
pub fn print_plan(plan: &Plan, roots: Roots<'_>) {
    for line in format_plan(plan, roots) {
        println!("{}", line);
    }
}

// ============================================================================
// Build output
// ============================================================================

fn plural(count: usize, one: &str, many: &str) -> String {
    format!("{count} {}", if count == 1 { one } else { many })
}

/// Format a build report: one summary line, then one line per failure.
pub fn format_report(report: &Report, roots: Roots<'_>) -> Vec<String> {
    let mut lines = vec![format!(
        "Removed {}, created {}, copied {}, generated {}",
        report.removed,
        plural(report.directories, "directory", "directories"),
        plural(report.copied, "file", "files"),
        plural(report.pages, "page", "pages"),
    )];
    for failure in &report.failures {
        lines.push(format!(
            "FAILED {} → {}: {}",
            roots.relative(&failure.source),
            failure.kind,
            failure.error
        ));
    }
    lines
}

/// Print build output to stdout.
pub fn print_report(report: &Report, roots: Roots<'_>) {
    for line in format_report(report, roots) {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate::{Failure, FileError};
    use crate::plan::{Destinations, Planner};
    use crate::test_helpers::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn planned(tmp: &TempDir) -> Plan {
        Planner::new(|n: &str| n.replace(".xumlv", ".html"), "PRIVATE")
            .diff(
                &tmp.path().join("src"),
                &Destinations {
                    public: Some(tmp.path().join("public")),
                    private: None,
                },
            )
            .unwrap()
    }

    #[test]
    fn plan_lines_are_relative() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src");
        let public = tmp.path().join("public");
        write_file(&src, "unix/td01.xumlv", "<td/>");
        write_file(&public, "old.html", "");
        let plan = planned(&tmp);
        let roots = Roots {
            source: &src,
            public: Some(&public),
            private: None,
        };
        assert_eq!(
            format_plan(&plan, roots),
            vec![
                "unix",
                "    public: added → unix",
                "old.html",
                "    public: removed",
                "unix/td01.xumlv",
                "    public: added → unix/td01.html",
                "",
                "2 added, 0 updated, 1 removed",
            ]
        );
    }

    #[test]
    fn empty_plan_is_up_to_date() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src");
        write_file(&tmp.path().join("public"), ".keep", "");
        std::fs::create_dir_all(&src).unwrap();
        let plan = planned(&tmp);
        let roots = Roots {
            source: &src,
            public: None,
            private: None,
        };
        assert_eq!(format_plan(&plan, roots), vec!["Up to date"]);
    }

    #[test]
    fn report_lists_counts_and_failures() {
        let report = Report {
            removed: 1,
            directories: 1,
            copied: 3,
            pages: 6,
            failures: vec![Failure {
                source: PathBuf::from("/site/src/broken.xumlv"),
                destination: PathBuf::from("/site/public/broken.html"),
                kind: DestinationKind::Public,
                error: FileError::Copy(std::io::Error::other("disk full")),
            }],
        };
        let roots = Roots {
            source: Path::new("/site/src"),
            public: None,
            private: None,
        };
        assert_eq!(
            format_report(&report, roots),
            vec![
                "Removed 1, created 1 directory, copied 3 files, generated 6 pages",
                "FAILED broken.xumlv → public: Copy failed: disk full",
            ]
        );
    }
}
