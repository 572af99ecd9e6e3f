//! # Jenius
//!
//! A static generator for course sites. Pages are written in a small markup
//! dialect of author-defined tags (`exercise`, `team`, `tdref`, ...) that are
//! expanded into HTML through a shared page template. Each build is
//! incremental: only what changed since the last build is regenerated.
//!
//! # Architecture: Plan, Then Execute
//!
//! ```text
//! 1. Plan      source/ vs public/ [+ private/]  →  Plan      (stat and list only)
//! 2. Execute   Plan                              →  prune, mkdir, copy, render
//! ```
//!
//! Planning never touches the filesystem beyond reading directories and
//! modification times, so `jenius plan` shows exactly what `jenius build`
//! would do.
//!
//! Rendering a page runs the template through the rewrite engine:
//!
//! ```text
//! template ─ Rewriter(style for this page) ─ HtmlValidator ─ Serializer → page.html
//!                │
//!                └── insert-content ─ page document ─┐
//!                                                    └─ expanded by the same style
//! ```
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`component`] | Tree model, builder protocol, style registry, rewrite engine, markup I/O |
//! | [`plan`] | Incremental build planner: diffs the source tree against the destinations |
//! | [`generate`] | Executes a plan: prune, create directories, copy and render files in parallel |
//! | [`site`] | The site's components and page rendering through the template |
//! | [`metadata`] | Per-build cache of parsed pages, summaries, and breadcrumbs |
//! | [`naming`] | Destination names (`td01.xumlv` → `td01.html`) |
//! | [`config`] | Optional `.jenius.toml` loading and validation |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Components Drive a Builder
//!
//! A component never returns markup. It is handed a [`component::Builder`]
//! and makes one decision for the matched element: emit a replacement tag,
//! write text, include markup, capture the subtree, fan out, hide, or wrap.
//! Everything it writes goes back through the engine, so a component may
//! emit other component tags and they are expanded in turn.
//!
//! ## Public and Private Destinations
//!
//! The same source tree builds two sites. The private one additionally
//! receives directories named `PRIVATE` and renders `answer` elements; the
//! public one never sees either. A leaked private directory in the public
//! destination is planned for removal like any other orphan.
//!
//! ## Dotfiles Are Invisible
//!
//! Names starting with a dot are never planned, on either side. This keeps
//! `.jenius.toml`, version control metadata, and editor files out of both
//! destinations without any ignore list.

pub mod component;
pub mod config;
pub mod generate;
pub mod metadata;
pub mod naming;
pub mod output;
pub mod plan;
pub mod site;

#[cfg(test)]
pub(crate) mod test_helpers;
