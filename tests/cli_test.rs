use std::ffi::OsString;
use std::path::PathBuf;

use clap::Parser;
use yaldevtools::cli::{Args, Commands};

fn make_args(args: &[&str]) -> Vec<OsString> {
    let mut res = vec![OsString::from("yaldevtools")];
    res.extend(args.iter().map(OsString::from));
    res
}

#[test]
fn test_generate_defaults() {
    let args = make_args(&["generate", "operations.yaml", "-o", "out", "--templates-path", "data/templates"]);
    let parsed = Args::try_parse_from(args).unwrap();

    assert!(!parsed.verbose);
    match parsed.command {
        Commands::Generate(generate) => {
            assert_eq!(generate.operations_file, PathBuf::from("operations.yaml"));
            assert_eq!(generate.output, PathBuf::from("out"));
            assert_eq!(generate.templates_path, PathBuf::from("data/templates"));
            assert_eq!(generate.mains, vec!["main".to_string()]);
            assert!(generate.project.is_none());
            assert!(generate.definitions.is_empty());
            assert!(!generate.format);
        }
        other => panic!("Expected generate, got {other:?}"),
    }
}

#[test]
fn test_generate_all_options() {
    let args = make_args(&[
        "-v",
        "generate",
        "operations.yaml",
        "--output",
        "out",
        "--templates-path",
        "templates",
        "--main",
        "libfoo.h",
        "--main",
        "libfoo.c",
        "--project",
        "libfoo.yaml",
        "--context",
        "context.yaml",
        "--define",
        "library_name=libfoo",
        "-D",
        "year=2024",
        "--format",
    ]);
    let parsed = Args::try_parse_from(args).unwrap();

    assert!(parsed.verbose);
    match parsed.command {
        Commands::Generate(generate) => {
            assert_eq!(generate.mains, vec!["libfoo.h".to_string(), "libfoo.c".to_string()]);
            assert_eq!(generate.project, Some(PathBuf::from("libfoo.yaml")));
            assert_eq!(generate.context, Some(PathBuf::from("context.yaml")));
            assert_eq!(generate.definitions, vec!["library_name=libfoo", "year=2024"]);
            assert!(generate.format);
        }
        other => panic!("Expected generate, got {other:?}"),
    }
}

#[test]
fn test_format_args() {
    let args = make_args(&["format", "libfoo", "--pattern", "*.c", "--check", "--verbose"]);
    let parsed = Args::try_parse_from(args).unwrap();

    assert!(parsed.verbose);
    match parsed.command {
        Commands::Format(format) => {
            assert_eq!(format.path, PathBuf::from("libfoo"));
            assert_eq!(format.patterns, vec!["*.c"]);
            assert!(format.check);
        }
        other => panic!("Expected format, got {other:?}"),
    }
}

#[test]
fn test_missing_args() {
    assert!(Args::try_parse_from(make_args(&["generate", "operations.yaml"])).is_err());
    assert!(Args::try_parse_from(make_args(&[])).is_err());
}
