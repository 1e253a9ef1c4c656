//! yaldevtools generates C sources and build files for libyal style
//! libraries by substituting values into template files, driven by
//! declarative operations files, and keeps C sources consistently
//! formatted.

/// Command-line interface module
pub mod cli;

/// Condition expressions of operations
pub mod condition;

/// Constants shared across modules
pub mod constants;

/// Error types and handling
pub mod error;

/// Execution of operations against a mapping context
pub mod executor;

/// C source formatting: indentation, declaration sorting and alignment
pub mod formatter;

/// Generation of output files from an operations file
pub mod generator;

/// Logger setup
pub mod logger;

/// Scoped mapping context for template substitution
pub mod mappings;

/// Operation model and operation graph validation
pub mod operations;

/// Output sinks and atomic file writes
pub mod output;

/// Batch reformatting of source trees
pub mod processor;

/// Project configuration
pub mod project;

/// Operations file reader
/// Each YAML document of the file describes one operation
pub mod reader;

/// `$name` / `${name}` template substitution
pub mod template;
