//! Diagrams backed by a whole source document (`*.ditaa` pages).

use std::path::Path;

use crate::consts::OUTPUT_EXT;
use crate::diagram::{Diagram, join_url};
use crate::error::DiagramError;
use crate::options::{OptionSet, RawOptions, SiteSettings, Variant};
use crate::renderer::Renderer;
use crate::staleness::StalenessPolicy;

/// A document owned by the host pipeline.
///
/// Only the pieces a diagram needs to find its content, options and output
/// location are exposed.
pub trait SourceDocument {
    /// Diagram source (front matter already stripped).
    fn content(&self) -> &str;

    /// Filesystem path of the document, used for modification times.
    fn path(&self) -> &Path;

    /// URL directory of the document (e.g., "/guides/").
    fn dir(&self) -> &str;

    /// File name without extension.
    fn basename(&self) -> &str;

    /// Explicit output URL, if the document declares one.
    fn permalink(&self) -> Option<&str> {
        None
    }

    /// Per-document ditaa options (front matter `ditaa` section).
    fn options(&self) -> Option<&RawOptions> {
        None
    }
}

/// A diagram whose content and location come from a [`SourceDocument`].
///
/// The output mirrors the document: `guides/flow.ditaa` renders to
/// `/guides/flow.png`, or to the document's permalink when it declares one.
pub struct DocumentDiagram<'a, D: ?Sized> {
    renderer: &'a Renderer,
    document: &'a D,
    options: OptionSet,
}

impl<'a, D: SourceDocument + ?Sized> DocumentDiagram<'a, D> {
    /// Resolve a diagram for `document`.
    ///
    /// # Errors
    ///
    /// Returns [`DiagramError::Configuration`] if an option value is invalid.
    pub fn new(
        renderer: &'a Renderer,
        site: &SiteSettings,
        document: &'a D,
    ) -> Result<Self, DiagramError> {
        let empty = RawOptions::new();
        let overrides = document.options().unwrap_or(&empty);

        Ok(Self {
            renderer,
            document,
            options: OptionSet::resolve(site, overrides, Variant::Document)?,
        })
    }

    /// The backing document.
    pub fn document(&self) -> &D {
        self.document
    }
}

impl<D: SourceDocument + ?Sized> Diagram for DocumentDiagram<'_, D> {
    fn content(&self) -> &str {
        self.document.content()
    }

    fn options(&self) -> &OptionSet {
        &self.options
    }

    fn renderer(&self) -> &Renderer {
        self.renderer
    }

    fn relative_destination(&self) -> String {
        match self.document.permalink() {
            Some(permalink) if permalink.ends_with('/') => format!("{permalink}index{OUTPUT_EXT}"),
            Some(permalink) => permalink.to_owned(),
            None => join_url(
                self.document.dir(),
                &format!("{}{OUTPUT_EXT}", self.document.basename()),
            ),
        }
    }

    fn staleness(&self) -> StalenessPolicy<'_> {
        StalenessPolicy::SourceMtime {
            source: self.document.path(),
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::diagram::RenderOutcome;
    use crate::options::OptionValue;
    use crate::testing::FakeDitaa;
    use pretty_assertions::assert_eq;
    use std::fs::{self, File};
    use std::path::PathBuf;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    struct Page {
        content: String,
        path: PathBuf,
        dir: String,
        basename: String,
        permalink: Option<String>,
        options: Option<RawOptions>,
    }

    impl Page {
        fn create(root: &Path, dir: &str, basename: &str, content: &str) -> Self {
            let path = root.join(format!("{basename}.ditaa"));
            fs::write(&path, content).unwrap();
            Self {
                content: content.to_owned(),
                path,
                dir: dir.to_owned(),
                basename: basename.to_owned(),
                permalink: None,
                options: None,
            }
        }

        fn set_mtime(&self, time: SystemTime) {
            set_mtime(&self.path, time);
        }
    }

    impl SourceDocument for Page {
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

    fn set_mtime(path: &Path, time: SystemTime) {
        File::options()
            .append(true)
            .open(path)
            .unwrap()
            .set_modified(time)
            .unwrap();
    }

    fn base_time() -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000)
    }

    #[test]
    fn test_destination_mirrors_document() {
        let tmp = TempDir::new().unwrap();
        let ditaa = FakeDitaa::copying(tmp.path());
        let page = Page::create(tmp.path(), "/guides/", "flow", "A->B");
        let diagram =
            DocumentDiagram::new(ditaa.renderer(), &SiteSettings::default(), &page).unwrap();

        assert_eq!(diagram.url(), "/guides/flow.png");
        assert_eq!(
            diagram.destination(Path::new("/site")),
            PathBuf::from("/site/guides/flow.png")
        );
        assert_eq!(diagram.image_tag(), r#"<img src="/guides/flow.png" />"#);
    }

    #[test]
    fn test_permalink_destination() {
        let tmp = TempDir::new().unwrap();
        let ditaa = FakeDitaa::copying(tmp.path());
        let site = SiteSettings::default();
        let mut page = Page::create(tmp.path(), "/guides/", "flow", "A->B");

        page.permalink = Some("/diagrams/flow-chart.png".to_owned());
        let diagram = DocumentDiagram::new(ditaa.renderer(), &site, &page).unwrap();
        assert_eq!(diagram.url(), "/diagrams/flow-chart.png");

        page.permalink = Some("/diagrams/flow/".to_owned());
        let diagram = DocumentDiagram::new(ditaa.renderer(), &site, &page).unwrap();
        assert_eq!(diagram.url(), "/diagrams/flow/index.png");
    }

    #[test]
    fn test_document_options_override_site() {
        let tmp = TempDir::new().unwrap();
        let ditaa = FakeDitaa::copying(tmp.path());
        let site = SiteSettings {
            ditaa: [("scale".to_owned(), OptionValue::Float(2.0))].into(),
            ..SiteSettings::default()
        };
        let mut page = Page::create(tmp.path(), "/", "flow", "A->B");
        page.options = Some(
            [
                ("scale".to_owned(), OptionValue::Float(3.0)),
                ("name".to_owned(), OptionValue::from("ignored.png")),
            ]
            .into(),
        );

        let diagram = DocumentDiagram::new(ditaa.renderer(), &site, &page).unwrap();
        assert!((diagram.options().scale() - 3.0).abs() < f64::EPSILON);
        assert_eq!(diagram.options().name(), None);
        assert_eq!(diagram.url(), "/flow.png");
    }

    #[test]
    fn test_write_then_skip_while_output_is_newer() {
        let tmp = TempDir::new().unwrap();
        let ditaa = FakeDitaa::copying(tmp.path());
        let root = tmp.path().join("site");
        let page = Page::create(tmp.path(), "/", "flow", "A->B");
        page.set_mtime(base_time());
        let diagram =
            DocumentDiagram::new(ditaa.renderer(), &SiteSettings::default(), &page).unwrap();

        assert!(diagram.write(&root));
        let output = root.join("flow.png");
        assert_eq!(fs::read_to_string(&output).unwrap(), "A->B");

        set_mtime(&output, base_time() + Duration::from_mins(1));
        assert_eq!(diagram.render(&root), RenderOutcome::Skipped);
        assert!(!diagram.write(&root));
        assert_eq!(ditaa.calls(), 1);
    }

    #[test]
    fn test_touched_document_is_rerendered() {
        let tmp = TempDir::new().unwrap();
        let ditaa = FakeDitaa::copying(tmp.path());
        let root = tmp.path().join("site");
        let page = Page::create(tmp.path(), "/", "flow", "A->B");
        let diagram =
            DocumentDiagram::new(ditaa.renderer(), &SiteSettings::default(), &page).unwrap();

        page.set_mtime(base_time());
        assert!(diagram.write(&root));
        let output = root.join("flow.png");
        set_mtime(&output, base_time() + Duration::from_mins(1));

        page.set_mtime(base_time() + Duration::from_mins(2));
        assert!(diagram.write(&root));
        assert_eq!(ditaa.calls(), 2);
    }

    #[test]
    fn test_failed_render_reports_false() {
        let tmp = TempDir::new().unwrap();
        let ditaa = FakeDitaa::failing(tmp.path());
        let page = Page::create(tmp.path(), "/", "broken", "???");
        let diagram =
            DocumentDiagram::new(ditaa.renderer(), &SiteSettings::default(), &page).unwrap();

        assert_eq!(
            diagram.render(&tmp.path().join("site")),
            RenderOutcome::Failed
        );
    }

    #[test]
    fn test_invalid_document_option() {
        let tmp = TempDir::new().unwrap();
        let ditaa = FakeDitaa::copying(tmp.path());
        let mut page = Page::create(tmp.path(), "/", "flow", "A->B");
        page.options = Some([("scale".to_owned(), OptionValue::Bool(true))].into());

        let result = DocumentDiagram::new(ditaa.renderer(), &SiteSettings::default(), &page);
        assert!(matches!(result, Err(DiagramError::Configuration { .. })));
    }
}
