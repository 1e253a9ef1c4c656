//! Generation of output files from an operations file.
//!
//! Every main operation becomes one output file. Each file is rendered
//! into memory first and only written when its whole run succeeded, so a
//! failing template never leaves a partial file behind and never stops
//! generation of the remaining files.

use crate::error::{Error, Result};
use crate::executor::OperationExecutor;
use crate::formatter::format_text;
use crate::mappings::TemplateMappings;
use crate::operations::OperationSet;
use crate::output::BufferedOutput;
use crate::project::ProjectConfiguration;
use crate::reader::YamlOperationsFile;
use crate::template::{StringTemplateRenderer, TemplateRenderer};
use indexmap::IndexMap;
use log::{debug, error, info, warn};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// Outcome of [`SourceGenerator::generate`].
#[derive(Debug, Default)]
pub struct GenerationReport {
    /// Files that were written.
    pub generated: Vec<PathBuf>,
    /// Main operations that produced no file, with the reason.
    pub failed: Vec<(String, String)>,
}

/// Runs operations of one operations file against a project.
pub struct SourceGenerator {
    operations: OperationSet,
    templates_path: PathBuf,
    project: ProjectConfiguration,
    renderer: Box<dyn TemplateRenderer>,
    mappings: IndexMap<String, Value>,
    format_sources: bool,
}

impl SourceGenerator {
    pub fn new<P: AsRef<Path>>(
        operations: OperationSet,
        templates_path: P,
        project: ProjectConfiguration,
    ) -> Self {
        let mappings = project.template_mappings();
        Self {
            operations,
            templates_path: templates_path.as_ref().to_path_buf(),
            project,
            renderer: Box::new(StringTemplateRenderer::new()),
            mappings,
            format_sources: false,
        }
    }

    /// Loads the operations file at `path`.
    ///
    /// # Errors
    /// * `Error::IoError` if the file cannot be read
    /// * `Error::ConfigurationError` if the file is malformed
    pub fn from_file<P: AsRef<Path>, T: AsRef<Path>>(
        path: P,
        templates_path: T,
        project: ProjectConfiguration,
    ) -> Result<Self> {
        let operations = YamlOperationsFile::open(path)?.operation_set()?;
        debug!("Loaded {} operations", operations.len());
        Ok(Self::new(operations, templates_path, project))
    }

    pub fn with_renderer(mut self, renderer: Box<dyn TemplateRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    /// Adds `values` to the mappings of every run, replacing values of the
    /// same name.
    pub fn with_mappings(mut self, values: IndexMap<String, Value>) -> Self {
        self.mappings.extend(values);
        self
    }

    /// Reformats generated `.c` and `.h` files before they are written.
    pub fn with_formatting(mut self, format_sources: bool) -> Self {
        self.format_sources = format_sources;
        self
    }

    pub fn operations(&self) -> &OperationSet {
        &self.operations
    }

    fn executor(&self) -> OperationExecutor<'_> {
        OperationExecutor::new(&self.operations, &self.templates_path, &*self.renderer, &self.project)
    }

    /// Runs `main` and returns the produced text.
    ///
    /// `extra` values are visible to this run only.
    pub fn run_operations(&self, main: &str, extra: IndexMap<String, Value>) -> Result<String> {
        let mut mappings = TemplateMappings::from_values(self.mappings.clone());
        let output_path = PathBuf::from(main);
        let mut output = BufferedOutput::new();

        mappings.with_scope(|scope| {
            for (key, value) in extra {
                scope.set(key, value);
            }
            self.executor().run(main, scope, &mut output, &output_path)
        })?;

        Ok(output.get(&output_path).unwrap_or_default().to_string())
    }

    fn generate_file(&self, main: &str, output_dir: &Path) -> Result<Option<PathBuf>> {
        let output_path = output_dir.join(main);
        let mut mappings = TemplateMappings::from_values(self.mappings.clone());
        let mut output = BufferedOutput::new();

        self.executor().run(main, &mut mappings, &mut output, &output_path)?;

        if output.is_empty() {
            debug!("Operation: {} produced no output", main);
            return Ok(None);
        }
        if self.format_sources {
            output.map_files(|path, text| {
                if is_source_file(path) {
                    format_text(text)
                } else {
                    text.to_string()
                }
            });
        }
        output.persist()?;
        Ok(Some(output_path))
    }

    /// Generates one file per operation in `mains` under `output_dir`.
    ///
    /// A failure is logged and only affects the file of that operation.
    pub fn generate<S: AsRef<str>>(&self, mains: &[S], output_dir: &Path) -> GenerationReport {
        let mut report = GenerationReport::default();

        for main in mains.iter().map(AsRef::as_ref) {
            match self.generate_file(main, output_dir) {
                Ok(Some(path)) => {
                    info!("Generated: {}", path.display());
                    report.generated.push(path);
                }
                Ok(None) => {}
                Err(e) => {
                    match &e {
                        Error::MissingCollaboratorFile(_) => warn!("Skipping: {} ({})", main, e),
                        _ => error!("Unable to generate: {} with error: {}", main, e),
                    }
                    report.failed.push((main.to_string(), e.to_string()));
                }
            }
        }
        report
    }
}

fn is_source_file(path: &Path) -> bool {
    matches!(path.extension().and_then(|extension| extension.to_str()), Some("c" | "h"))
}

/// Reads extra mapping values from a JSON or YAML mapping file.
///
/// # Errors
/// * `Error::MissingCollaboratorFile` if the file does not exist
/// * `Error::ConfigurationError` if the content is not a mapping
pub fn load_context<P: AsRef<Path>>(path: P) -> Result<IndexMap<String, Value>> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(Error::MissingCollaboratorFile(path.to_path_buf()));
    }
    let content = fs::read_to_string(path)?;
    if content.trim().is_empty() {
        return Ok(IndexMap::new());
    }
    match serde_json::from_str(&content) {
        Ok(values) => Ok(values),
        Err(_) => serde_yaml::from_str(&content).map_err(|e| {
            Error::ConfigurationError(format!("Invalid context file {}: {e}", path.display()))
        }),
    }
}

/// Parses a `KEY=VALUE` definition.
pub fn parse_definition(definition: &str) -> Result<(String, Value)> {
    match definition.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), Value::from(value)))
        }
        _ => Err(Error::ConfigurationError(format!(
            "invalid definition: {definition} (expected KEY=VALUE)"
        ))),
    }
}
