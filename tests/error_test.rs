use std::io;
use std::path::PathBuf;

use yaldevtools::error::{Error, TemplateFormatErrorKind};

#[test]
fn test_error_conversion() {
    let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
    let err: Error = io_err.into();

    match err {
        Error::IoError(_) => (),
        _ => panic!("Expected IoError variant"),
    }
}

#[test]
fn test_error_display() {
    let err = Error::ConfigurationError("missing identifier".to_string());
    assert_eq!(err.to_string(), "Configuration error: missing identifier.");

    let err = Error::TemplateFormatError {
        path: PathBuf::from("templates/header.h"),
        kind: TemplateFormatErrorKind::MissingPlaceholder("library_name".to_string()),
    };
    assert_eq!(
        err.to_string(),
        "Unable to format template: templates/header.h with error: missing placeholder: library_name."
    );

    let err = Error::MissingCollaboratorFile(PathBuf::from("Makefile.am"));
    assert_eq!(err.to_string(), "Missing file: Makefile.am.");
}

#[test]
fn test_invalid_placeholder_display() {
    let kind = TemplateFormatErrorKind::InvalidPlaceholder { line: 3, column: 14 };
    assert_eq!(kind.to_string(), "invalid placeholder in line 3, col 14");
}
