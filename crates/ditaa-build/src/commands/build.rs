//! `ditaa-build build` command implementation.

use std::path::{Path, PathBuf};

use clap::Args;
use ditaa_config::{CliSettings, Config};
use ditaa_diagrams::{Diagram, DocumentDiagram, RenderOutcome, Renderer, SiteSettings};

use crate::error::CliError;
use crate::output::Output;
use crate::scanner::{FsDocument, Scanner};
use crate::settings;

/// Arguments for the build command.
#[derive(Args)]
pub(crate) struct BuildArgs {
    /// Path to configuration file (default: auto-discover ditaa.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Diagram source directory (overrides config).
    #[arg(short, long)]
    source_dir: Option<PathBuf>,

    /// Output root for rendered images (overrides config).
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Ditaa program (overrides config).
    #[arg(long, env = "DITAA")]
    program: Option<String>,
}

/// Per-outcome counts of a build.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct BuildSummary {
    pub written: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl BuildSummary {
    fn total(&self) -> usize {
        self.written + self.skipped + self.failed
    }
}

impl BuildArgs {
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            source_dir: self.source_dir,
            output_dir: self.output_dir,
            program: self.program,
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;
        let build = &config.build_resolved;

        output.info(&format!("Source: {}", build.source_dir.display()));
        output.info(&format!("Output: {}", build.output_dir.display()));

        let site = settings::site_settings(&config)?;
        let renderer = settings::renderer(&config)?;

        let documents = Scanner::new(build.source_dir.clone())
            .excluding(build.output_dir.clone())
            .scan();
        if documents.is_empty() {
            output.warning("No .ditaa documents found");
            return Ok(());
        }

        let summary = build_documents(
            &renderer,
            &site,
            &documents,
            &build.source_dir,
            &build.output_dir,
            &output,
        );

        let line = format!(
            "{} written, {} up to date, {} failed",
            summary.written, summary.skipped, summary.failed
        );
        if summary.failed > 0 {
            output.warning(&line);
            return Err(CliError::RenderFailed {
                failed: summary.failed,
                total: summary.total(),
            });
        }
        output.success(&line);
        Ok(())
    }
}

/// Render every document, continuing past failures.
fn build_documents(
    renderer: &Renderer,
    site: &SiteSettings,
    documents: &[PathBuf],
    source_dir: &Path,
    output_dir: &Path,
    output: &Output,
) -> BuildSummary {
    let mut summary = BuildSummary::default();

    for path in documents {
        let label = path.strip_prefix(source_dir).unwrap_or(path).display();

        let document = match FsDocument::load(path, source_dir) {
            Ok(document) => document,
            Err(err) => {
                output.error(&err.to_string());
                summary.failed += 1;
                continue;
            }
        };
        let diagram = match DocumentDiagram::new(renderer, site, &document) {
            Ok(diagram) => diagram,
            Err(err) => {
                output.error(&format!("{label}: {err}"));
                summary.failed += 1;
                continue;
            }
        };

        match diagram.render(output_dir) {
            RenderOutcome::Written => {
                output.detail(&format!("  {label} -> {}", diagram.url()));
                summary.written += 1;
            }
            RenderOutcome::Skipped => summary.skipped += 1,
            RenderOutcome::Failed => {
                output.error(&format!("{label}: ditaa produced no image"));
                summary.failed += 1;
            }
        }
    }

    summary
}
