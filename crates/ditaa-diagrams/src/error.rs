//! Error types for diagram resolution.
//!
//! Render failures have no variant here: a render that does not produce
//! its output file is reported as `false` from [`Diagram::write`](crate::Diagram::write).

/// Error raised while setting up rendering or resolving a diagram.
#[derive(Debug, thiserror::Error)]
pub enum DiagramError {
    /// The ditaa executable could not be located. Fatal for the whole build.
    #[error(
        "Missing dependency: {program} (install it with `apt-get install ditaa`)"
    )]
    MissingDependency {
        /// Program name or path that was looked up.
        program: String,
        /// Lookup failure reported by `which`.
        #[source]
        source: which::Error,
    },
    /// An option value could not be coerced to its declared type.
    #[error("Invalid value for option `{key}`: expected {expected}, got `{value}`")]
    Configuration {
        /// Option key (e.g., "scale").
        key: String,
        /// Declared type of the option.
        expected: &'static str,
        /// Offending value as written.
        value: String,
    },
}
