//! Per-build document cache.
//!
//! Every markup source is parsed once per build. The [`DocumentManager`]
//! memoizes, per path, the parsed document together with what the page
//! template needs from it:
//!
//! - the **summary**: the page title and the titles of its exercises, as
//!   listed by `tdref` elements on other pages;
//! - the **infos** block, rendered separately from the content;
//! - the **content**: the document with `title` and `infos` detached.
//!
//! Directories are named in breadcrumbs by the title of their index page.
//!
//! The cache is shared by the generation workers. Entries are computed
//! outside the lock; when two workers race for the same path, the first
//! insert wins and both observe the same entry.

use crate::component::{Attributes, ComponentError, Document, NodeId, NodeRef, Style, component, xml};
use crate::config::MarkupConfig;
use crate::naming;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("Cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid markup in {}: {source}", path.display())]
    Markup {
        path: PathBuf,
        source: ComponentError,
    },
}

/// Title and exercise titles of a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub title: String,
    pub exercises: Vec<String>,
}

impl Summary {
    /// Summary of a page without a title: its file stem.
    pub fn untitled(path: &Path) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            title: naming::file_stem(&name).to_string(),
            exercises: Vec::new(),
        }
    }
}

/// Only the elements a summary is made of survive; exercises keep their
/// title as an attribute.
fn summary_style() -> Style {
    Style::union([
        Style::rename(&[("td", "td"), ("project", "project"), ("title", "title")]),
        Style::exact(
            "exercise",
            component(|_, attrs, b| {
                b.emit(
                    "exercise",
                    Attributes::from([("title", attrs.get_or("title", ""))]),
                )
            }),
        ),
    ])
    .or_discard()
}

fn exercise_titles(node: NodeRef<'_>, titles: &mut Vec<String>) {
    for child in node.elements() {
        if child.name() == Some("exercise") {
            titles.push(child.attribute("title").unwrap_or_default().to_string());
        }
        exercise_titles(child, titles);
    }
}

/// Summary of a parsed page, or `None` when it has no `title` element.
pub fn extract_summary(document: &Document) -> Result<Option<Summary>, ComponentError> {
    let skeleton = xml::transform(document.node(), &summary_style())?;
    let Some(title) = skeleton.node().find("title") else {
        return Ok(None);
    };
    let mut exercises = Vec::new();
    exercise_titles(skeleton.node(), &mut exercises);
    Ok(Some(Summary {
        title: title.text(),
        exercises,
    }))
}

/// What the template needs from one source page.
#[derive(Debug)]
pub struct Metadata {
    document: Document,
    summary: Summary,
    titled: bool,
    infos: Option<NodeId>,
}

impl Metadata {
    /// Parse a page. `path` names the page for the fallback title.
    pub fn from_markup(markup: &str, path: &Path) -> Result<Self, ComponentError> {
        let mut document = xml::parse(markup)?;
        let extracted = extract_summary(&document)?;
        let titled = extracted.is_some();
        let summary = extracted.unwrap_or_else(|| Summary::untitled(path));

        if let Some(title) = document.node().find("title").map(|n| n.id()) {
            document.detach(title)?;
        }
        let infos = document.node().find("infos").map(|n| n.id());
        if let Some(infos) = infos {
            document.detach(infos)?;
        }
        Ok(Self {
            document,
            summary,
            titled,
            infos,
        })
    }

    pub fn load(path: &Path) -> Result<Self, MetadataError> {
        let markup = fs::read_to_string(path).map_err(|source| MetadataError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_markup(&markup, path).map_err(|source| MetadataError::Markup {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn summary(&self) -> &Summary {
        &self.summary
    }

    /// Whether the page declares its own title.
    pub fn has_title(&self) -> bool {
        self.titled
    }

    /// Root element of the page, without `title` and `infos`.
    pub fn content(&self) -> Option<NodeRef<'_>> {
        self.document.first_element()
    }

    pub fn infos(&self) -> Option<NodeRef<'_>> {
        self.infos.map(|id| self.document.get(id))
    }
}

/// One breadcrumb link. `href` is relative to the page's directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Crumb {
    pub title: String,
    pub href: String,
}

pub struct DocumentManager {
    root: PathBuf,
    markup: MarkupConfig,
    pages: Mutex<HashMap<PathBuf, Arc<Metadata>>>,
    directories: Mutex<HashMap<PathBuf, String>>,
}

impl DocumentManager {
    pub fn new(root: impl Into<PathBuf>, markup: MarkupConfig) -> Self {
        Self {
            root: root.into(),
            markup,
            pages: Mutex::new(HashMap::new()),
            directories: Mutex::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn markup(&self) -> &MarkupConfig {
        &self.markup
    }

    /// Metadata of the page at `path`, parsed on first use.
    pub fn metadata(&self, path: &Path) -> Result<Arc<Metadata>, MetadataError> {
        if let Some(cached) = self
            .pages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
        {
            return Ok(Arc::clone(cached));
        }

        tracing::debug!(path = %path.display(), "Loading metadata");
        let loaded = Arc::new(Metadata::load(path)?);
        let mut pages = self.pages.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(Arc::clone(pages.entry(path.to_path_buf()).or_insert(loaded)))
    }

    /// Summary of the page at `path`; an unreadable page is summarized by its
    /// file name.
    pub fn summary_or_default(&self, path: &Path) -> Summary {
        match self.metadata(path) {
            Ok(metadata) => metadata.summary().clone(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Using default summary");
                Summary::untitled(path)
            }
        }
    }

    fn directory_title(&self, dir: &Path) -> String {
        if let Some(title) = self
            .directories
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(dir)
        {
            return title.clone();
        }

        let index = dir.join(&self.markup.index);
        let from_index = if index.is_file() {
            match self.metadata(&index) {
                Ok(metadata) if metadata.has_title() => Some(metadata.summary().title.clone()),
                Ok(_) => None,
                Err(e) => {
                    tracing::warn!(path = %index.display(), error = %e, "Untitled directory");
                    None
                }
            }
        } else {
            None
        };
        let title = from_index.unwrap_or_else(|| {
            dir.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        });

        let mut directories = self
            .directories
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        directories.entry(dir.to_path_buf()).or_insert(title).clone()
    }

    /// Links from the source root down to the directory holding `page`, root
    /// first.
    ///
    /// An index page links up to its parent directory, so the root index has
    /// no breadcrumb. Pages outside the root have none either.
    pub fn breadcrumb(&self, page: &Path) -> Vec<Crumb> {
        let Ok(relative) = page.strip_prefix(&self.root) else {
            return Vec::new();
        };
        let dirs: Vec<&std::ffi::OsStr> = relative
            .parent()
            .map(|p| p.iter().collect())
            .unwrap_or_default();
        let depth = dirs.len();
        let is_index = relative.file_name().is_some_and(|n| n == self.markup.index.as_str());
        let last = match (is_index, depth) {
            (true, 0) => return Vec::new(),
            (true, d) => d - 1,
            (false, d) => d,
        };

        let index_page = naming::map_name(&self.markup.index, &self.markup);
        let mut dir = self.root.clone();
        let mut crumbs = Vec::with_capacity(last + 1);
        for level in 0..=last {
            if level > 0 {
                dir.push(dirs[level - 1]);
            }
            let up = "../".repeat(depth - level);
            let href = if dir.join(&self.markup.index).is_file() {
                format!("{up}{index_page}")
            } else if up.is_empty() {
                "./".to_string()
            } else {
                up
            };
            crumbs.push(Crumb {
                title: self.directory_title(&dir),
                href,
            });
        }
        crumbs
    }
}
