//! Internal constants for ditaa rendering.

/// Executable looked up on `PATH` when no explicit program is configured.
pub const DEFAULT_PROGRAM: &str = "ditaa";

/// Output directory template for embedded diagrams.
pub const DEFAULT_DIRNAME: &str = "/images/ditaa";

/// Filename template for embedded diagrams.
pub const DEFAULT_NAME: &str = "ditaa-%{hash}.png";

/// Placeholder substituted with the cache key in output templates.
pub const HASH_PLACEHOLDER: &str = "%{hash}";

/// Extension used for document diagrams without a permalink.
pub const OUTPUT_EXT: &str = ".png";

/// Tab width ditaa assumes when `-t` is not passed.
pub const DEFAULT_TABS: i64 = 8;

/// Scale ditaa assumes when `-s` is not passed.
pub const DEFAULT_SCALE: f64 = 1.0;
