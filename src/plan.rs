//! Incremental build planning.
//!
//! Diffs a source tree against one or two destination trees and records,
//! per path, what each destination needs:
//!
//! ```text
//! source/                    public/                 plan
//! ├── index.xumlv            ├── index.html (newer)  (up to date, no entry)
//! ├── td01.xumlv             │                       td01.xumlv: added public → public/td01.html
//! ├── notes.txt (newer)      ├── notes.txt           notes.txt: updated public → public/notes.txt
//! │                          ├── old.html            public/old.html: removed public
//! └── PRIVATE/               └──                     PRIVATE: added private → private/PRIVATE
//!     └── sol.c                                      PRIVATE/sol.c: added private → private/PRIVATE/sol.c
//! ```
//!
//! ## Ordering
//!
//! Entries appear in traversal order: a directory's own entry precedes
//! anything inside it, and a removed directory is followed by its whole
//! removed subtree. Executing removals in reverse order therefore empties a
//! directory before deleting it ([`Plan::removals`]); executing the other
//! entries in forward order creates a directory before writing into it
//! ([`Plan::changes`]).
//!
//! ## Rules
//!
//! - Dotfiles are never planned, on either side.
//! - Files are compared by name after mapping (`td01.xumlv` → `td01.html`);
//!   directories keep their name.
//! - A present file is stale when the source is strictly newer, or always
//!   when forced. A present directory has no entry of its own.
//! - Directories named like the private marker are skipped for the public
//!   destination and planned for the private one.
//!
//! The planner only lists and stats; it never modifies either tree.

use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum PlanError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("{0} is not a directory")]
    NotADirectory(PathBuf),
}

/// Which destination root a status is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DestinationKind {
    Public,
    Private,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum State {
    Added,
    Updated,
    Removed,
}

impl fmt::Display for DestinationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DestinationKind::Public => write!(f, "public"),
            DestinationKind::Private => write!(f, "private"),
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            State::Added => write!(f, "added"),
            State::Updated => write!(f, "updated"),
            State::Removed => write!(f, "removed"),
        }
    }
}

/// What one destination needs for one path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Status {
    pub state: State,
    pub kind: DestinationKind,
    pub destination: PathBuf,
}

/// All statuses for one path.
///
/// `path` is the source path for added and updated entries, and the
/// orphaned destination path itself for removals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanEntry {
    pub path: PathBuf,
    pub statuses: Vec<Status>,
}

impl PlanEntry {
    pub fn status(&self, kind: DestinationKind) -> Option<&Status> {
        self.statuses.iter().find(|s| s.kind == kind)
    }
}

/// Ordered per-path actions produced by [`Planner::diff`].
#[derive(Debug, Clone, Default)]
pub struct Plan {
    entries: Vec<PlanEntry>,
    index: HashMap<PathBuf, usize>,
}

impl Plan {
    fn push(&mut self, path: &Path, status: Status) {
        match self.index.get(path) {
            Some(&i) => self.entries[i].statuses.push(status),
            None => {
                self.index.insert(path.to_path_buf(), self.entries.len());
                self.entries.push(PlanEntry {
                    path: path.to_path_buf(),
                    statuses: vec![status],
                });
            }
        }
    }

    pub fn get(&self, path: &Path) -> Option<&PlanEntry> {
        self.index.get(path).map(|&i| &self.entries[i])
    }

    /// Drop every status for `path`, keeping the order of the rest.
    pub fn remove(&mut self, path: &Path) -> Option<PlanEntry> {
        let i = self.index.remove(path)?;
        let entry = self.entries.remove(i);
        for position in self.index.values_mut() {
            if *position > i {
                *position -= 1;
            }
        }
        Some(entry)
    }

    pub fn entries(&self) -> &[PlanEntry] {
        &self.entries
    }

    /// Number of planned paths.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removed destinations, deepest first.
    pub fn removals(&self) -> impl Iterator<Item = (&Path, &Status)> {
        self.entries
            .iter()
            .rev()
            .flat_map(|e| e.statuses.iter().rev().map(move |s| (e.path.as_path(), s)))
            .filter(|(_, s)| s.state == State::Removed)
    }

    /// Added and updated destinations, parents first.
    pub fn changes(&self) -> impl Iterator<Item = (&Path, &Status)> {
        self.entries
            .iter()
            .flat_map(|e| e.statuses.iter().map(move |s| (e.path.as_path(), s)))
            .filter(|(_, s)| s.state != State::Removed)
    }

    /// Count of statuses in `state`.
    pub fn count(&self, state: State) -> usize {
        self.entries
            .iter()
            .flat_map(|e| &e.statuses)
            .filter(|s| s.state == state)
            .count()
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entries {
            for status in &entry.statuses {
                writeln!(
                    f,
                    "{}: {} {} {}",
                    entry.path.display(),
                    status.state,
                    status.kind,
                    status.destination.display()
                )?;
            }
        }
        Ok(())
    }
}

/// Destination roots to plan for. A root that does not exist yet is
/// planned as empty.
#[derive(Debug, Clone, Default)]
pub struct Destinations {
    pub public: Option<PathBuf>,
    pub private: Option<PathBuf>,
}

#[derive(Debug)]
struct Listed {
    name: String,
    path: PathBuf,
    is_dir: bool,
    modified: SystemTime,
}

/// Computes plans. `mapping` turns a source file name into its destination
/// file name.
pub struct Planner<M> {
    mapping: M,
    private_dir: String,
    force: bool,
}

impl<M: Fn(&str) -> String> Planner<M> {
    pub fn new(mapping: M, private_dir: impl Into<String>) -> Self {
        Self {
            mapping,
            private_dir: private_dir.into(),
            force: false,
        }
    }

    /// Treat every present file as stale.
    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn diff(&self, source: &Path, destinations: &Destinations) -> Result<Plan, PlanError> {
        let source = checked_root(source, true)?;
        let mut targets = Vec::new();
        if let Some(public) = &destinations.public {
            targets.push((DestinationKind::Public, checked_root(public, false)?));
        }
        if let Some(private) = &destinations.private {
            targets.push((DestinationKind::Private, checked_root(private, false)?));
        }
        let roots: Vec<PathBuf> = std::iter::once(source.clone())
            .chain(targets.iter().map(|(_, root)| root.clone()))
            .collect();

        let mut plan = Plan::default();
        self.scan(&source, &targets, &roots, &mut plan)?;
        tracing::debug!(
            source = %source.display(),
            entries = plan.len(),
            force = self.force,
            "planned build"
        );
        Ok(plan)
    }

    fn scan(
        &self,
        dir: &Path,
        targets: &[(DestinationKind, PathBuf)],
        roots: &[PathBuf],
        plan: &mut Plan,
    ) -> Result<(), PlanError> {
        let sources = list(dir, roots)?;
        for (kind, dest) in targets {
            let candidates: Vec<&Listed> = sources
                .iter()
                .filter(|e| self.planned_for(*kind, e))
                .collect();
            let existing = if dest.is_dir() {
                list(dest, roots)?
            } else {
                Vec::new()
            };
            self.diff_level(*kind, &candidates, dest, &existing, plan)?;
        }

        for sub in sources.iter().filter(|e| e.is_dir) {
            let sub_targets: Vec<(DestinationKind, PathBuf)> = targets
                .iter()
                .filter(|(kind, _)| self.planned_for(*kind, sub))
                .map(|(kind, dest)| (*kind, dest.join(&sub.name)))
                .collect();
            if !sub_targets.is_empty() {
                self.scan(&sub.path, &sub_targets, roots, plan)?;
            }
        }
        Ok(())
    }

    fn planned_for(&self, kind: DestinationKind, entry: &Listed) -> bool {
        kind == DestinationKind::Private || !(entry.is_dir && entry.name == self.private_dir)
    }

    fn destination_name(&self, entry: &Listed) -> String {
        if entry.is_dir {
            entry.name.clone()
        } else {
            (self.mapping)(&entry.name)
        }
    }

    fn diff_level(
        &self,
        kind: DestinationKind,
        sources: &[&Listed],
        dest: &Path,
        existing: &[Listed],
        plan: &mut Plan,
    ) -> Result<(), PlanError> {
        let by_name: HashMap<&str, &Listed> =
            existing.iter().map(|e| (e.name.as_str(), e)).collect();
        let mut claimed: HashSet<String> = HashSet::new();

        for entry in sources {
            let name = self.destination_name(entry);
            let destination = dest.join(&name);
            let status = |state| Status {
                state,
                kind,
                destination: destination.clone(),
            };
            match by_name.get(name.as_str()) {
                None => plan.push(&entry.path, status(State::Added)),
                Some(found) if found.is_dir != entry.is_dir => {
                    remove_tree(kind, found, plan)?;
                    plan.push(&entry.path, status(State::Added));
                }
                Some(_) if entry.is_dir => {}
                Some(found) => {
                    if self.force || entry.modified > found.modified {
                        plan.push(&entry.path, status(State::Updated));
                    }
                }
            }
            claimed.insert(name);
        }

        for orphan in existing.iter().filter(|e| !claimed.contains(&e.name)) {
            remove_tree(kind, orphan, plan)?;
        }
        Ok(())
    }
}

/// `Removed` for `found` and, for a directory, everything below it in
/// pre-order, dotfiles included.
fn remove_tree(kind: DestinationKind, found: &Listed, plan: &mut Plan) -> Result<(), PlanError> {
    let removed = |path: &Path| Status {
        state: State::Removed,
        kind,
        destination: path.to_path_buf(),
    };
    plan.push(&found.path, removed(&found.path));
    if found.is_dir {
        for entry in WalkDir::new(&found.path).min_depth(1).sort_by_file_name() {
            let entry = entry?;
            plan.push(entry.path(), removed(entry.path()));
        }
    }
    Ok(())
}

/// Absolute form of a root. A missing destination root is planned as empty.
fn checked_root(path: &Path, must_exist: bool) -> Result<PathBuf, PlanError> {
    let absolute = std::path::absolute(path)?;
    if absolute.is_dir() || (!must_exist && !absolute.exists()) {
        return Ok(absolute);
    }
    Err(PlanError::NotADirectory(absolute))
}

/// Non-hidden entries of `dir` sorted by name, without any of `roots`.
fn list(dir: &Path, roots: &[PathBuf]) -> Result<Vec<Listed>, PlanError> {
    let mut listed = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = match entry.file_name().into_string() {
            Ok(name) => name,
            Err(raw) => {
                tracing::warn!(dir = %dir.display(), name = ?raw, "Skipping non UTF-8 file name");
                continue;
            }
        };
        if name.starts_with('.') {
            continue;
        }
        let path = entry.path();
        if roots.contains(&path) {
            continue;
        }
        let metadata = fs::metadata(&path)?;
        listed.push(Listed {
            name,
            path,
            is_dir: metadata.is_dir(),
            modified: metadata.modified()?,
        });
    }
    listed.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(listed)
}
