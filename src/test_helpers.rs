//! Shared test utilities for the jenius test suite.
//!
//! Builds directory fixtures in temp directories and controls modification
//! times, which is all the planner looks at.
//!
//! # Usage
//!
//! ```rust,ignore
//! use crate::test_helpers::*;
//!
//! let tmp = setup_site();
//! let page = tmp.path().join("src/unix/td01.xumlv");
//! set_mtime(&page, hours_ago(3));
//! assert!(list_tree(&tmp.path().join("src")).contains(&"unix/td01.xumlv".to_string()));
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tempfile::TempDir;
use walkdir::WalkDir;

// =========================================================================
// Files and times
// =========================================================================

/// Write `content` to `root/relative`, creating parent directories.
pub fn write_file(root: &Path, relative: &str, content: &str) -> PathBuf {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}

pub fn set_mtime(path: &Path, time: SystemTime) {
    fs::File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(time)
        .unwrap();
}

pub fn hours_ago(hours: u64) -> SystemTime {
    SystemTime::now() - Duration::from_secs(hours * 3600)
}

pub fn in_future(seconds: u64) -> SystemTime {
    SystemTime::now() + Duration::from_secs(seconds)
}

/// Every path below `root`, relative and sorted, directories included.
pub fn list_tree(root: &Path) -> Vec<String> {
    let mut paths: Vec<String> = WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .map(|e| {
            let entry = e.unwrap();
            entry
                .path()
                .strip_prefix(root)
                .unwrap()
                .to_string_lossy()
                .replace('\\', "/")
        })
        .collect();
    paths.sort();
    paths
}

// =========================================================================
// Site fixture
// =========================================================================

pub const TEMPLATE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<html>
  <head><title><insert-title-text/></title><css-link rel="stylesheet" href="style.css"/></head>
  <body>
    <insert-breadcrumb/>
    <h1><insert-title-text/></h1>
    <insert-infos/>
    <insert-content/>
  </body>
</html>
"#;

/// A small course site under `src/`, with the template beside it at
/// `template.xumlv` and empty `public/` and `private/` destinations.
///
/// ```text
/// src/
/// ├── index.xumlv          IR1, lists td01
/// ├── style.css
/// ├── .jenius.toml
/// └── unix/
///     ├── index.xumlv      Unix
///     ├── td01.xumlv       exercises, an answer, team infos
///     └── PRIVATE/
///         └── td01-ls.c
/// ```
pub fn setup_site() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    write_file(root, "template.xumlv", TEMPLATE);
    write_file(
        root,
        "src/index.xumlv",
        r#"<index><title>IR1</title><list><tdref name="unix/td01.xumlv"/></list></index>"#,
    );
    write_file(root, "src/style.css", "body { margin: 0 }");
    write_file(root, "src/.jenius.toml", "[processing]\nmax_processes = 2\n");
    write_file(
        root,
        "src/unix/index.xumlv",
        "<index><title>Unix</title></index>",
    );
    write_file(
        root,
        "src/unix/td01.xumlv",
        r#"<?xml version="1.0" encoding="UTF-8"?>
<td>
  <title>Shell</title>
  <infos>
    <team>
      <member name="Bob" mail="mailto:bob@example.org"/>
      <leader name="Ada" www="https://ada.example.org"/>
    </team>
  </infos>
  <exercise title="Listing">
    <paragraph>Use <tt>ls</tt>.</paragraph>
    <answer><code>ls -l</code></answer>
  </exercise>
</td>
"#,
    );
    write_file(root, "src/unix/PRIVATE/td01-ls.c", "int main(void) { return 0; }");
    fs::create_dir_all(root.join("public")).unwrap();
    fs::create_dir_all(root.join("private")).unwrap();
    tmp
}
