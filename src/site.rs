//! Site components and page generation.
//!
//! Every markup page is rendered by expanding the shared template with a
//! style built for that page. Rules are tried in order, first match wins:
//!
//! | Group | Elements |
//! |-------|----------|
//! | answers | `answer`: hidden in public pages, `div.answer` in private ones |
//! | page | `insert-content`, `insert-title-text`, `insert-infos`, `insert-breadcrumb`, `tdref` |
//! | body | `exercise`, `section`, `paragraph`, `list`, `image`, `code`, `infos`, `team`, `leader`, `member` |
//! | decoration | `css-link`, `item`, `link`, `bold`, `italic`, `underline`, `tt` |
//!
//! Page elements splice the page into the template; the page content is
//! itself expanded by the same style, so body and decoration rules apply to
//! it.

use crate::component::{Attributes, ComponentError, Document, NodeRef, Style, component, discard, xml};
use crate::config::MarkupConfig;
use crate::metadata::{DocumentManager, MetadataError};
use crate::naming;
use crate::plan::DestinationKind;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SiteError {
    #[error("Cannot read template {}: {source}", path.display())]
    TemplateRead {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid template {}: {source}", path.display())]
    Template {
        path: PathBuf,
        source: ComponentError,
    },
    #[error(transparent)]
    Metadata(#[from] MetadataError),
    #[error("Cannot render {}: {source}", path.display())]
    Render {
        path: PathBuf,
        source: ComponentError,
    },
    #[error("Cannot write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

// ============================================================================
// Page-independent rules
// ============================================================================

fn answers(kind: DestinationKind) -> Style {
    match kind {
        DestinationKind::Public => Style::exact("answer", discard()),
        DestinationKind::Private => Style::exact(
            "answer",
            component(|_, _, b| b.emit("div", Attributes::from([("class", "answer")]))),
        ),
    }
}

/// `div.<class>` headed by `<heading>` holding the `title` attribute.
fn titled_block(class: &'static str, heading: &'static str) -> Style {
    Style::exact(
        class,
        component(move |_, attrs, b| {
            let title = attrs.get_or("title", "").to_string();
            b.emit_with("div", Attributes::from([("class", class)]), |c| {
                c.emit_with(heading, Attributes::new(), |c| c.text(&title))
            })
        }),
    )
}

fn team_cell(
    b: &mut crate::component::Builder<'_>,
    align: &str,
    heading: &str,
    people: &[NodeRef<'_>],
) -> Result<(), ComponentError> {
    b.emit_with(
        "td",
        Attributes::from([("align", align), ("valign", "top")]),
        |c| {
            c.emit_with("h3", Attributes::from([("style", "font-size:90%")]), |c| {
                c.text(heading)
            })?;
            people.iter().try_for_each(|person| c.include(*person))
        },
    )
}

fn body() -> Style {
    Style::union([
        titled_block("exercise", "h3"),
        titled_block("section", "h2"),
        Style::exact(
            "paragraph",
            component(|_, _, b| b.emit("div", Attributes::from([("class", "paragraph")]))),
        ),
        Style::exact(
            "list",
            component(|_, attrs, b| {
                let name = if attrs.contains_key("ordered") { "ol" } else { "ul" };
                b.emit(name, Attributes::new())
            }),
        ),
        Style::exact(
            "image",
            component(|_, attrs, b| {
                let width = attrs.get_or("width", "");
                let height = attrs.get_or("height", "");
                let align = attrs.get_or("align", "left");
                let style = format!("height:{height};width:{width};align:{align};");
                b.emit(
                    "img",
                    Attributes::from([
                        ("src", attrs.get_or("src", "")),
                        ("width", width),
                        ("height", height),
                        ("style", style.as_str()),
                    ]),
                )
            }),
        ),
        Style::exact(
            "code",
            component(|_, _, b| {
                b.emit("pre", Attributes::from([("class", "code"), ("width", "100%")]))
            }),
        ),
        Style::exact(
            "infos",
            component(|_, _, b| {
                b.emit(
                    "table",
                    Attributes::from([("style", "font-size:100%"), ("width", "100%")]),
                )
            }),
        ),
        Style::exact(
            "team",
            component(|_, _, b| {
                b.collect(|team, b| {
                    let leaders: Vec<NodeRef<'_>> =
                        team.elements().filter(|n| n.name() == Some("leader")).collect();
                    let members: Vec<NodeRef<'_>> =
                        team.elements().filter(|n| n.name() == Some("member")).collect();
                    b.emit_with("tr", Attributes::new(), |c| {
                        team_cell(c, "left", "Responsables", &leaders)?;
                        team_cell(c, "right", "Chargés de TD", &members)
                    })
                })
            }),
        ),
        Style::names(
            &["leader", "member"],
            component(|name, attrs, b| {
                let person = format!("{} -- ", attrs.get_or("name", "???"));
                let www = attrs.get("www").map(str::to_string);
                let mail = attrs.get("mail").map(str::to_string);
                b.emit_with("div", Attributes::from([("class", name)]), |c| {
                    c.text(&person)?;
                    if let Some(www) = &www {
                        c.emit_with("a", Attributes::from([("href", www.as_str())]), |c| {
                            c.text("www")
                        })?;
                    }
                    c.text(" -- ")?;
                    if let Some(mail) = &mail {
                        c.emit_with("a", Attributes::from([("href", mail.as_str())]), |c| {
                            c.text("@")
                        })?;
                    }
                    Ok(())
                })
            }),
        ),
    ])
}

fn decoration() -> Style {
    Style::rename(&[
        ("css-link", "link"),
        ("item", "li"),
        ("link", "a"),
        ("bold", "b"),
        ("italic", "i"),
        ("underline", "u"),
        ("tt", "tt"),
    ])
}

// ============================================================================
// Site
// ============================================================================

/// Renders markup pages through one template.
///
/// Shared by all generation workers; the page cache inside is the only
/// state that changes during a build.
pub struct Site {
    template: Document,
    manager: Arc<DocumentManager>,
}

impl Site {
    pub fn new(template: Document, manager: DocumentManager) -> Self {
        Self {
            template,
            manager: Arc::new(manager),
        }
    }

    /// Parse the template at `template` for pages under `source_root`.
    pub fn load(
        template: &Path,
        source_root: &Path,
        markup: MarkupConfig,
    ) -> Result<Self, SiteError> {
        let text = fs::read_to_string(template).map_err(|source| SiteError::TemplateRead {
            path: template.to_path_buf(),
            source,
        })?;
        let document = xml::parse(&text).map_err(|source| SiteError::Template {
            path: template.to_path_buf(),
            source,
        })?;
        tracing::debug!(template = %template.display(), "Loaded template");
        Ok(Self::new(document, DocumentManager::new(source_root, markup)))
    }

    pub fn manager(&self) -> &DocumentManager {
        &self.manager
    }

    pub fn markup(&self) -> &MarkupConfig {
        self.manager.markup()
    }

    fn page(&self, source: &Path) -> Result<Style, SiteError> {
        let metadata = self.manager.metadata(source)?;
        let title = metadata.summary().title.clone();
        let crumbs = self.manager.breadcrumb(source);
        let dir = source.parent().map(Path::to_path_buf).unwrap_or_default();
        let manager = Arc::clone(&self.manager);

        let content = {
            let metadata = Arc::clone(&metadata);
            component(move |_, _, b| {
                let Some(root) = metadata.content() else {
                    return b.hide();
                };
                b.fragment(|b| root.children().try_for_each(|child| b.include(child)))
            })
        };
        let infos = component(move |_, _, b| match metadata.infos() {
            Some(infos) => b.fragment(|b| b.include(infos)),
            None => b.hide(),
        });
        let breadcrumb = component(move |_, _, b| {
            b.emit_with("span", Attributes::from([("class", "bread-crumb")]), |c| {
                for (i, crumb) in crumbs.iter().enumerate() {
                    if i != 0 {
                        c.text(" :: ")?;
                    }
                    c.emit_with("a", Attributes::from([("href", crumb.href.as_str())]), |c| {
                        c.text(&crumb.title)
                    })?;
                }
                Ok(())
            })
        });
        let tdref = component(move |_, attrs, b| {
            let name = attrs.get_or("name", "");
            let summary = manager.summary_or_default(&dir.join(name));
            let href = naming::map_name(name, manager.markup());
            let exercises = summary
                .exercises
                .iter()
                .map(|e| format!("[{e}]"))
                .collect::<Vec<_>>()
                .join(" ");
            b.emit_with("li", Attributes::new(), |c| {
                c.emit_with("a", Attributes::from([("href", href.as_str())]), |c| {
                    c.text(&summary.title)
                })?;
                c.emit("br", Attributes::new())?;
                c.text(&exercises)
            })
        });

        Ok(Style::from_table([
            ("insert-content", content),
            (
                "insert-title-text",
                component(move |_, _, b| b.fragment(|b| b.text(&title))),
            ),
            ("insert-infos", infos),
            ("insert-breadcrumb", breadcrumb),
            ("tdref", tdref),
        ]))
    }

    /// The full style for one page and destination.
    pub fn style(&self, source: &Path, kind: DestinationKind) -> Result<Style, SiteError> {
        Ok(Style::union([
            answers(kind),
            self.page(source)?,
            body(),
            decoration(),
        ]))
    }

    /// Render the page at `source` to `writer`.
    pub fn render_page<W: Write>(
        &self,
        source: &Path,
        writer: W,
        kind: DestinationKind,
    ) -> Result<(), SiteError> {
        let style = self.style(source, kind)?;
        xml::render(self.template.node(), writer, self.markup().output, &style).map_err(
            |source_error| SiteError::Render {
                path: source.to_path_buf(),
                source: source_error,
            },
        )
    }

    /// Render the page at `source` into the file `destination`. Nothing is
    /// written when rendering fails.
    pub fn generate(
        &self,
        source: &Path,
        destination: &Path,
        kind: DestinationKind,
    ) -> Result<(), SiteError> {
        let mut page = Vec::new();
        self.render_page(source, &mut page, kind)?;
        fs::write(destination, page).map_err(|source| SiteError::Write {
            path: destination.to_path_buf(),
            source,
        })?;
        tracing::debug!(
            source = %source.display(),
            destination = %destination.display(),
            %kind,
            "Generated page"
        );
        Ok(())
    }
}
