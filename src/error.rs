//! Error handling for yaldevtools.
//! Defines the error taxonomy shared by the template engine, the operations
//! reader and executor, and the source formatter.

use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Why substituting a template failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateFormatErrorKind {
    /// The template references a placeholder that has no mapping entry.
    MissingPlaceholder(String),
    /// The mapping entry exists but cannot be converted to text.
    InvalidValue(String),
    /// A `$` that does not start a valid placeholder.
    InvalidPlaceholder { line: usize, column: usize },
}

impl fmt::Display for TemplateFormatErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingPlaceholder(name) => write!(f, "missing placeholder: {name}"),
            Self::InvalidValue(name) => write!(f, "invalid value for placeholder: {name}"),
            Self::InvalidPlaceholder { line, column } => {
                write!(f, "invalid placeholder in line {line}, col {column}")
            }
        }
    }
}

/// Custom error types for yaldevtools operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Represents errors that occur during file system operations
    #[error("IO error: {0}.")]
    IoError(#[from] io::Error),

    /// Malformed operations file or project configuration
    #[error("Configuration error: {0}.")]
    ConfigurationError(String),

    /// Placeholder substitution failed for a template file
    #[error("Unable to format template: {} with error: {kind}.", .path.display())]
    TemplateFormatError { path: PathBuf, kind: TemplateFormatErrorKind },

    /// A condition expression could not be evaluated
    #[error("Condition error: {0}.")]
    ConditionError(String),

    /// An input file expected by a generation step does not exist
    #[error("Missing file: {}.", .0.display())]
    MissingCollaboratorFile(PathBuf),

    #[error("YAML error: {0}.")]
    YamlError(#[from] serde_yaml::Error),

    #[error("JSON error: {0}.")]
    JsonError(#[from] serde_json::Error),

    /// Invalid file selection pattern
    #[error("Pattern error: {0}.")]
    GlobError(String),
}

/// Convenience type alias for Results with [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Default error handler that prints the error and exits the program.
///
/// # Behavior
/// Prints the error message to stderr and exits with status code 1
pub fn default_error_handler(err: impl fmt::Display) -> ! {
    eprintln!("{err}");
    std::process::exit(1);
}
