//! Output staleness decisions.

use std::fs;
use std::io;
use std::path::Path;
use std::time::SystemTime;

/// How a diagram decides whether its existing output is still valid.
#[derive(Debug, Clone, Copy)]
pub enum StalenessPolicy<'a> {
    /// Output is fresh while it is strictly newer than the source document.
    SourceMtime {
        /// Filesystem path of the source document.
        source: &'a Path,
    },
    /// Output is fresh whenever it exists under a name derived from the
    /// current cache key. Content-addressed files are never rewritten.
    ContentAddressed {
        /// Whether the destination path was derived from the cache key.
        addressed: bool,
    },
}

impl StalenessPolicy<'_> {
    /// Whether the output at `destination` must be (re)generated.
    #[must_use]
    pub fn needs_write(&self, destination: &Path) -> bool {
        if !destination.exists() {
            return true;
        }
        match *self {
            Self::SourceMtime { source } => match (mtime(source), mtime(destination)) {
                (Ok(source), Ok(output)) => output <= source,
                (Err(e), _) | (_, Err(e)) => {
                    tracing::debug!("cannot compare modification times: {e}");
                    true
                }
            },
            Self::ContentAddressed { addressed } => !addressed,
        }
    }
}

fn mtime(path: &Path) -> io::Result<SystemTime> {
    fs::metadata(path)?.modified()
}
