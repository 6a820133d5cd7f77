//! Document discovery by filesystem walking.
//!
//! Finds `*.ditaa` documents under the source directory and loads them as
//! [`FsDocument`]s, ready to be wrapped in a `DocumentDiagram`.

use std::fs;
use std::path::{Path, PathBuf};

use ditaa_diagrams::{RawOptions, SourceDocument};

use crate::error::CliError;
use crate::front_matter;

/// Extension of diagram documents (matched case-insensitively).
const EXTENSION: &str = "ditaa";

/// Discovers diagram documents by walking the filesystem.
///
/// Hidden entries (`.git`) and underscore-prefixed entries (`_site`, `_drafts`)
/// are skipped, as is the output directory when it lies inside the source tree.
pub(crate) struct Scanner {
    source_dir: PathBuf,
    exclude: Option<PathBuf>,
}

impl Scanner {
    /// Create a new Scanner rooted at `source_dir`.
    pub fn new(source_dir: PathBuf) -> Self {
        Self {
            source_dir,
            exclude: None,
        }
    }

    /// Never descend into `dir`.
    #[must_use]
    pub fn excluding(mut self, dir: PathBuf) -> Self {
        self.exclude = Some(dir);
        self
    }

    /// Scan the filesystem and return document paths in sorted order.
    ///
    /// Returns an empty Vec if the source directory doesn't exist.
    pub fn scan(&self) -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if self.source_dir.exists() {
            self.scan_directory(&self.source_dir, &mut paths);
        }
        paths.sort();
        paths
    }

    fn scan_directory(&self, dir_path: &Path, paths: &mut Vec<PathBuf>) {
        let Ok(entries) = fs::read_dir(dir_path) else {
            tracing::warn!(dir = %dir_path.display(), "cannot read directory");
            return;
        };

        for entry in entries.filter_map(Result::ok) {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with('.') || name.starts_with('_') {
                continue;
            }

            let path = entry.path();
            let is_dir = entry.file_type().is_ok_and(|t| t.is_dir());

            if is_dir {
                if self.exclude.as_deref() == Some(path.as_path()) {
                    continue;
                }
                self.scan_directory(&path, paths);
            } else if is_diagram(&path) {
                paths.push(path);
            }
        }
    }
}

/// Whether `path` has the diagram extension, ignoring case.
fn is_diagram(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(EXTENSION))
}

/// A `*.ditaa` document loaded from disk.
#[derive(Debug)]
pub(crate) struct FsDocument {
    path: PathBuf,
    content: String,
    dir: String,
    basename: String,
    permalink: Option<String>,
    options: Option<RawOptions>,
}

impl FsDocument {
    /// Read the document at `path`, addressed relative to `source_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::Io`] if the file cannot be read and
    /// [`CliError::FrontMatter`] if its front matter is malformed.
    pub fn load(path: &Path, source_dir: &Path) -> Result<Self, CliError> {
        let raw = fs::read_to_string(path)?;
        let (block, body) = front_matter::split(&raw);
        let front_matter = block
            .map(front_matter::parse)
            .transpose()
            .map_err(|e| CliError::FrontMatter {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?
            .unwrap_or_default();

        let relative = path.strip_prefix(source_dir).unwrap_or(path);

        Ok(Self {
            path: path.to_path_buf(),
            content: body.to_owned(),
            dir: url_dir(relative),
            basename: relative
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_default(),
            permalink: front_matter.permalink,
            options: front_matter.ditaa,
        })
    }
}

impl SourceDocument for FsDocument {
    fn content(&self) -> &str {
        &self.content
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn dir(&self) -> &str {
        &self.dir
    }

    fn basename(&self) -> &str {
        &self.basename
    }

    fn permalink(&self) -> Option<&str> {
        self.permalink.as_deref()
    }

    fn options(&self) -> Option<&RawOptions> {
        self.options.as_ref()
    }
}

/// URL directory of a source-relative file path.
///
/// Examples:
/// - `flow.ditaa` -> `"/"`
/// - `guides/flow.ditaa` -> `"/guides/"`
/// - `a/b/flow.ditaa` -> `"/a/b/"`
fn url_dir(relative: &Path) -> String {
    let mut dir = String::from("/");
    if let Some(parent) = relative.parent() {
        for component in parent.components() {
            dir.push_str(&component.as_os_str().to_string_lossy());
            dir.push('/');
        }
    }
    dir
}
