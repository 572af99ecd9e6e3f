//! Destination naming.
//!
//! Markup sources change extension on the way out; everything else keeps
//! its name:
//! - `td01.xumlv` → `td01.html`
//! - `index.xumlv` → `index.html`
//! - `slides.pdf` → `slides.pdf`
//! - `archive.tar.xumlv` → `archive.tar.html` (only the last extension counts)

use crate::config::MarkupConfig;

/// The extension of `name` after its last dot, if any. Leading dots do not
/// start an extension.
fn extension(name: &str) -> Option<(&str, &str)> {
    let dot = name.rfind('.')?;
    if dot == 0 {
        return None;
    }
    Some((&name[..dot], &name[dot + 1..]))
}

/// Whether `name` is a markup source that gets rendered.
pub fn is_markup(name: &str, markup: &MarkupConfig) -> bool {
    matches!(extension(name), Some((_, ext)) if ext == markup.extension)
}

/// Destination file name for a source file name.
pub fn map_name(name: &str, markup: &MarkupConfig) -> String {
    match extension(name) {
        Some((stem, ext)) if ext == markup.extension => {
            format!("{stem}.{}", markup.output_extension)
        }
        _ => name.to_string(),
    }
}

/// File name without its last extension, used as a fallback title.
pub fn file_stem(name: &str) -> &str {
    match extension(name) {
        Some((stem, _)) => stem,
        None => name,
    }
}
