use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde_json::{json, Value};
use tempfile::TempDir;
use yaldevtools::generator::{load_context, SourceGenerator};
use yaldevtools::project::ProjectConfiguration;
use yaldevtools::reader::read_from_file;

fn data_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests").join("data").join(name)
}

fn fsntfs_generator() -> SourceGenerator {
    let project = ProjectConfiguration::from_file(data_path("project.yaml")).unwrap();
    let context = load_context(data_path("context.yaml")).unwrap();
    SourceGenerator::from_file(data_path("operations.yaml"), data_path("templates"), project)
        .unwrap()
        .with_mappings(context)
}

#[test]
fn test_read_operations_file() {
    let operations = read_from_file(data_path("operations.yaml")).unwrap();
    assert_eq!(operations.len(), 5);
    assert_eq!(operations[0].identifier(), "mount_fuse.h");
    assert_eq!(operations[4].identifier(), "listxattr");
}

#[test]
fn test_generate_matches_expected_output() {
    let output_dir = TempDir::new().unwrap();
    let report = fsntfs_generator().generate(&["mount_fuse.h"], output_dir.path());

    assert!(report.failed.is_empty(), "{:?}", report.failed);
    assert_eq!(report.generated, vec![output_dir.path().join("mount_fuse.h")]);
    assert!(!dir_diff::is_different(output_dir.path(), data_path("expected")).unwrap());
}

#[test]
fn test_generate_replaces_existing_output() {
    let output_dir = TempDir::new().unwrap();
    fs::write(output_dir.path().join("mount_fuse.h"), "stale content\n").unwrap();

    fsntfs_generator().generate(&["mount_fuse.h"], output_dir.path());
    assert!(!dir_diff::is_different(output_dir.path(), data_path("expected")).unwrap());
}

#[test]
fn test_run_operations_returns_text() {
    let generator = fsntfs_generator();
    let mut extra = IndexMap::new();
    extra.insert("xattr_functions".to_string(), json!(["removexattr"]));

    let text = generator.run_operations("functions", extra).unwrap();
    assert_eq!(text, "int mount_fuse_removexattr(\n     const char *path,\n     char *list,\n     size_t size );\n\n");
}

#[test]
fn test_failing_file_does_not_stop_generation() {
    let temp_dir = TempDir::new().unwrap();
    let templates = temp_dir.path().join("templates");
    fs::create_dir_all(&templates).unwrap();
    fs::write(templates.join("good.h"), "#define ${library_name_upper_case}_GOOD\n").unwrap();
    fs::write(templates.join("bad.h"), "#define $undefined_placeholder\n").unwrap();

    let operations = temp_dir.path().join("operations.yaml");
    fs::write(
        &operations,
        "identifier: bad.h\ntype: template\nfile: bad.h\n---\nidentifier: good.h\ntype: template\nfile: good.h\n",
    )
    .unwrap();

    let project = ProjectConfiguration::parse("library:\n  name: libfoo\n").unwrap();
    let generator = SourceGenerator::from_file(&operations, &templates, project).unwrap();
    let output_dir = temp_dir.path().join("output");
    let report = generator.generate(&["bad.h", "missing.h", "good.h"], &output_dir);

    assert_eq!(report.generated, vec![output_dir.join("good.h")]);
    let failed: Vec<&str> = report.failed.iter().map(|(main, _)| main.as_str()).collect();
    assert_eq!(failed, vec!["bad.h", "missing.h"]);
    assert!(!output_dir.join("bad.h").exists());
    assert_eq!(fs::read_to_string(output_dir.join("good.h")).unwrap(), "#define LIBFOO_GOOD\n");
}

#[test]
fn test_generate_with_formatting() {
    let temp_dir = TempDir::new().unwrap();
    let templates = temp_dir.path().join("templates");
    fs::create_dir_all(&templates).unwrap();
    fs::write(
        templates.join("function.c"),
        "int ${library_name}_init(\n     void )\n{\n\tint result = 0;\n\tstatic char *function = \"${library_name}_init\";\n\n\treturn( result );\n}\n",
    )
    .unwrap();
    let operations = temp_dir.path().join("operations.yaml");
    fs::write(&operations, "identifier: libfoo_init.c\ntype: template\nfile: function.c\n").unwrap();

    let mut values: IndexMap<String, Value> = IndexMap::new();
    values.insert("library_name".to_string(), json!("libfoo"));
    let generator = SourceGenerator::from_file(&operations, &templates, ProjectConfiguration::default())
        .unwrap()
        .with_mappings(values)
        .with_formatting(true);

    let output_dir = temp_dir.path().join("output");
    generator.generate(&["libfoo_init.c"], &output_dir);

    assert_eq!(
        fs::read_to_string(output_dir.join("libfoo_init.c")).unwrap(),
        format!(
            "int libfoo_init(\n     void )\n{{\n\tstatic char *function = \"libfoo_init\";\n\tint result{}= 0;\n\n\treturn( result );\n}}\n",
            " ".repeat(12)
        )
    );
}

#[test]
fn test_malformed_operations_file() {
    let temp_dir = TempDir::new().unwrap();
    let operations = temp_dir.path().join("operations.yaml");
    fs::write(&operations, "identifier: a\ntype: bogus\n").unwrap();

    let result = SourceGenerator::from_file(&operations, temp_dir.path(), ProjectConfiguration::default());
    assert!(result.is_err());
}
