//! Ditaa diagram rendering for documentation builds.
//!
//! This crate turns ditaa source into PNG images by running the external
//! `ditaa` tool, and decides when an existing image can be reused:
//! - [`DocumentDiagram`] renders a whole `*.ditaa` document next to its URL and
//!   re-renders whenever the document is newer than the image
//! - [`EmbeddedDiagram`] renders a diagram embedded in another page to a
//!   content-addressed path (`/images/ditaa/ditaa-{hash}.png`) and never
//!   re-renders an existing file under the same key
//!
//! # Architecture
//!
//! - [`options`]: layered option resolution ([`OptionSet`], [`SiteSettings`])
//! - [`key`]: SHA-1 cache key over content and ditaa arguments
//! - [`renderer`]: locating and invoking ditaa ([`Renderer`])
//! - [`staleness`]: fresh/stale decisions for existing output
//! - [`Diagram`]: the interface both variants implement
//!
//! # Example
//!
//! ```ignore
//! use std::path::Path;
//! use ditaa_diagrams::{Diagram, EmbeddedDiagram, RawOptions, Renderer, SiteSettings};
//!
//! let renderer = Renderer::locate()?;
//! let site = SiteSettings::default();
//! let diagram = EmbeddedDiagram::new(&renderer, &site, "+---+\n| A |\n+---+", &RawOptions::new())?;
//!
//! let written = diagram.write(Path::new("_site"));
//! let html = diagram.image_tag();
//! ```

mod consts;
mod diagram;
mod document;
mod embedded;
mod error;
pub mod key;
pub mod options;
pub mod renderer;
pub mod staleness;
#[cfg(test)]
mod testing;

pub use diagram::{Diagram, DiagramInfo, RenderOutcome, ReturnForm};
pub use document::{DocumentDiagram, SourceDocument};
pub use embedded::EmbeddedDiagram;
pub use error::DiagramError;
pub use key::{CacheKey, fingerprint};
pub use options::{OptionSet, OptionValue, RawOptions, SiteSettings, Variant, is_flag};
pub use renderer::{ECHO_TARGET, Renderer, ditaa_arguments};
pub use staleness::StalenessPolicy;
