//! Diagrams embedded in other documents.
//!
//! An [`EmbeddedDiagram`] owns its content and is named by its cache key:
//! with the default templates the image lands at
//! `/images/ditaa/ditaa-{hash}.png`, so identical diagrams share one file across
//! pages and builds.

use std::borrow::Cow;
use std::cell::OnceCell;
use std::sync::LazyLock;

use regex::Regex;

use crate::consts::{DEFAULT_DIRNAME, DEFAULT_NAME, HASH_PLACEHOLDER};
use crate::diagram::{Diagram, join_url};
use crate::error::DiagramError;
use crate::key::fingerprint;
use crate::options::{OptionSet, RawOptions, SiteSettings, Variant};
use crate::renderer::{Renderer, ditaa_arguments};
use crate::staleness::StalenessPolicy;

static EMPTY_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\n").unwrap());
static OPENER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?m)^\["\n"#).unwrap());
static CLOSER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?m)"\]$"#).unwrap());

/// Normalize embedded content into ditaa source.
///
/// Expands literal `\n` escapes, drops empty lines, strips a `["` opener line
/// and a `"]` closer, and collapses doubled backslashes.
pub(crate) fn normalize_source(content: &str) -> String {
    let source = content.replace("\\n", "\n");
    let source = EMPTY_LINE_RE.replace_all(&source, "");
    let source = OPENER_RE.replace_all(&source, "");
    let source = CLOSER_RE.replace_all(&source, "");
    source.replace("\\\\", "\\")
}

/// A content-addressed diagram embedded in another document.
#[derive(Debug)]
pub struct EmbeddedDiagram<'r> {
    renderer: &'r Renderer,
    content: String,
    options: OptionSet,
    hash: OnceCell<String>,
}

impl<'r> EmbeddedDiagram<'r> {
    /// Resolve an embedded diagram from raw content and per-diagram options.
    ///
    /// # Errors
    ///
    /// Returns [`DiagramError::Configuration`] if an option value is invalid.
    pub fn new(
        renderer: &'r Renderer,
        site: &SiteSettings,
        content: impl Into<String>,
        overrides: &RawOptions,
    ) -> Result<Self, DiagramError> {
        Ok(Self {
            renderer,
            content: content.into(),
            options: OptionSet::resolve(site, overrides, Variant::Embedded)?,
            hash: OnceCell::new(),
        })
    }

    /// Cache key of this diagram (hex SHA-1), computed once.
    pub fn hash(&self) -> &str {
        self.hash
            .get_or_init(|| fingerprint(&self.content, &ditaa_arguments(&self.options)))
    }

    /// Output directory with the hash substituted.
    pub fn dir(&self) -> String {
        self.expand(self.dirname_template())
    }

    /// Output filename with the hash substituted.
    pub fn name(&self) -> String {
        self.expand(self.name_template())
    }

    fn dirname_template(&self) -> &str {
        self.options.dirname().unwrap_or(DEFAULT_DIRNAME)
    }

    fn name_template(&self) -> &str {
        self.options.name().unwrap_or(DEFAULT_NAME)
    }

    fn expand(&self, template: &str) -> String {
        template.replace(HASH_PLACEHOLDER, self.hash())
    }

    /// Whether the output path is derived from the cache key.
    fn is_content_addressed(&self) -> bool {
        self.dirname_template().contains(HASH_PLACEHOLDER)
            || self.name_template().contains(HASH_PLACEHOLDER)
    }
}

impl Diagram for EmbeddedDiagram<'_> {
    fn content(&self) -> &str {
        &self.content
    }

    fn source(&self) -> Cow<'_, str> {
        Cow::Owned(normalize_source(&self.content))
    }

    fn options(&self) -> &OptionSet {
        &self.options
    }

    fn renderer(&self) -> &Renderer {
        self.renderer
    }

    fn relative_destination(&self) -> String {
        join_url(&self.dir(), &self.name())
    }

    fn staleness(&self) -> StalenessPolicy<'_> {
        StalenessPolicy::ContentAddressed {
            addressed: self.is_content_addressed(),
        }
    }
}
