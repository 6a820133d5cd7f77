//! The [`Diagram`] interface shared by document and embedded diagrams.

use std::borrow::Cow;
use std::convert::Infallible;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Serialize;

use crate::options::{OptionSet, RawOptions};
use crate::renderer::Renderer;
use crate::staleness::StalenessPolicy;

/// Result of a single [`Diagram::render`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    /// Existing output was fresh; ditaa did not run.
    Skipped,
    /// Ditaa ran and the output file exists.
    Written,
    /// Ditaa ran (or could not be started) and no output file exists.
    Failed,
}

/// What a collaborator wants back in place of a diagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReturnForm {
    /// The public URL of the image.
    Url,
    /// An `<img>` tag referencing the URL.
    #[default]
    ImageTag,
}

impl FromStr for ReturnForm {
    type Err = Infallible;

    /// `url`, `uri` and `href` (any case) select [`ReturnForm::Url`];
    /// anything else selects the image tag.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "url" | "uri" | "href" => Self::Url,
            _ => Self::ImageTag,
        })
    }
}

/// Serializable summary of a diagram for template payloads.
#[derive(Debug, Clone, Serialize)]
pub struct DiagramInfo {
    /// Public URL of the image.
    pub url: String,
    /// Raw diagram content.
    pub content: String,
    /// Image tag referencing `url`.
    pub output: String,
    /// Resolved options.
    pub ditaa: RawOptions,
}

/// A diagram whose image can be (re)generated under an output root.
pub trait Diagram {
    /// Raw content as supplied at construction.
    fn content(&self) -> &str;

    /// Text handed to ditaa. Defaults to the raw content.
    fn source(&self) -> Cow<'_, str> {
        Cow::Borrowed(self.content())
    }

    /// Resolved options.
    fn options(&self) -> &OptionSet;

    /// Renderer used to produce the image.
    fn renderer(&self) -> &Renderer;

    /// Output path relative to the output root, in URL form (`/images/a.png`).
    fn relative_destination(&self) -> String;

    /// Staleness rule for existing output.
    fn staleness(&self) -> StalenessPolicy<'_>;

    /// Public URL of the image.
    fn url(&self) -> String {
        self.relative_destination()
    }

    /// Absolute output path under `root`.
    fn destination(&self, root: &Path) -> PathBuf {
        join_root(root, &self.relative_destination())
    }

    /// Render the image under `root` unless the existing output is fresh.
    fn render(&self, root: &Path) -> RenderOutcome {
        let destination = self.destination(root);
        if !self.staleness().needs_write(&destination) {
            tracing::debug!(destination = %destination.display(), "diagram is up to date");
            return RenderOutcome::Skipped;
        }

        if self
            .renderer()
            .invoke(self.options(), &self.source(), &destination)
        {
            RenderOutcome::Written
        } else {
            RenderOutcome::Failed
        }
    }

    /// Render the image under `root`; `true` iff a new file was produced.
    fn write(&self, root: &Path) -> bool {
        self.render(root) == RenderOutcome::Written
    }

    /// Minimal markup embedding the image.
    fn image_tag(&self) -> String {
        format!(r#"<img src="{}" />"#, self.url())
    }

    /// Replacement text for the diagram in the requested form.
    fn output(&self, form: ReturnForm) -> String {
        match form {
            ReturnForm::Url => self.url(),
            ReturnForm::ImageTag => self.image_tag(),
        }
    }

    /// Summary for template payloads.
    fn info(&self) -> DiagramInfo {
        DiagramInfo {
            url: self.url(),
            content: self.content().to_owned(),
            output: self.image_tag(),
            ditaa: self.options().raw().clone(),
        }
    }
}

/// Join URL path segments, collapsing the slash between them.
pub(crate) fn join_url(dir: &str, name: &str) -> String {
    format!(
        "{}/{}",
        dir.trim_end_matches('/'),
        name.trim_start_matches('/')
    )
}

/// Resolve a URL-form relative destination under an output root.
pub(crate) fn join_root(root: &Path, relative: &str) -> PathBuf {
    root.join(relative.trim_start_matches('/'))
}
