//! Execution of operations.
//!
//! Starting from a main operation, groups run their children in order,
//! selections branch on a mapping value, sequences repeat their children
//! for every element of a mapping value and templates render a template
//! file into the output. The first write to the output replaces it, every
//! later write of the same run appends to it.

use crate::condition::ConditionNamespace;
use crate::error::{Error, Result};
use crate::mappings::TemplateMappings;
use crate::operations::{GeneratorOperation, OperationKind, OperationSet};
use crate::output::{AccessMode, OutputWriter};
use crate::project::ProjectConfiguration;
use crate::template::TemplateRenderer;
use indexmap::IndexMap;
use log::{debug, warn};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Names visible to conditions: mapping values shadow project attributes.
struct ConditionScope<'a> {
    project: &'a ProjectConfiguration,
    mappings: &'a TemplateMappings,
}

impl ConditionNamespace for ConditionScope<'_> {
    fn lookup(&self, name: &str) -> Option<Value> {
        self.mappings.get(name).cloned().or_else(|| self.project.attribute(name))
    }
}

/// Output target of one run.
struct RunState<'w> {
    output_path: PathBuf,
    access_mode: AccessMode,
    writer: &'w mut dyn OutputWriter,
}

impl RunState<'_> {
    fn write(&mut self, text: &str) -> Result<()> {
        self.writer.write(&self.output_path, text, self.access_mode)?;
        self.access_mode = AccessMode::Append;
        Ok(())
    }
}

/// Runs operations of one [`OperationSet`].
pub struct OperationExecutor<'a> {
    operations: &'a OperationSet,
    templates_path: &'a Path,
    renderer: &'a dyn TemplateRenderer,
    project: &'a ProjectConfiguration,
}

impl<'a> OperationExecutor<'a> {
    pub fn new(
        operations: &'a OperationSet,
        templates_path: &'a Path,
        renderer: &'a dyn TemplateRenderer,
        project: &'a ProjectConfiguration,
    ) -> Self {
        Self { operations, templates_path, renderer, project }
    }

    /// Runs the operation `main` and writes its output to `output_path`.
    ///
    /// # Errors
    /// * `Error::ConfigurationError` if `main` is not defined
    /// * `Error::TemplateFormatError` if a template cannot be substituted
    /// * `Error::MissingCollaboratorFile` if a template file without fallback is absent
    pub fn run(
        &self,
        main: &str,
        mappings: &mut TemplateMappings,
        writer: &mut dyn OutputWriter,
        output_path: &Path,
    ) -> Result<()> {
        let operation = self
            .operations
            .get(main)
            .ok_or_else(|| Error::ConfigurationError(format!("undefined operation: {main}")))?;

        let mut state = RunState {
            output_path: output_path.to_path_buf(),
            access_mode: AccessMode::Write,
            writer,
        };
        self.run_operation(operation, mappings, &mut state)
    }

    fn condition_applies(&self, operation: &GeneratorOperation, mappings: &TemplateMappings) -> bool {
        let Some(condition) = operation.condition() else {
            return true;
        };
        let scope = ConditionScope { project: self.project, mappings };
        match condition.evaluate(&scope) {
            Ok(applies) => applies,
            Err(e) => {
                warn!(
                    "Unable to evaluate condition: {} of operation: {} with error: {}",
                    condition,
                    operation.identifier(),
                    e
                );
                false
            }
        }
    }

    fn run_operation(
        &self,
        operation: &GeneratorOperation,
        mappings: &mut TemplateMappings,
        state: &mut RunState<'_>,
    ) -> Result<()> {
        if !self.condition_applies(operation, mappings) {
            debug!("Skipping operation: {} (condition not met)", operation.identifier());
            return Ok(());
        }
        debug!("Running {} operation: {}", operation.operation_type(), operation.identifier());

        match operation.kind() {
            OperationKind::Group { operations } => self.run_group(operation, operations, mappings, state),
            OperationKind::Selection { input, options, default } => {
                self.run_selection(operation, input, options, default.as_deref(), mappings, state)
            }
            OperationKind::Sequence { input, operations, placeholder, fallback } => self.run_sequence(
                operation,
                input,
                operations,
                placeholder,
                fallback.as_deref(),
                mappings,
                state,
            ),
            OperationKind::Template { file, placeholders, fallback } => {
                self.run_template(operation, file, placeholders, fallback.as_deref(), mappings, state)
            }
        }
    }

    /// Runs the operation named `identifier`; returns `false` if it is not defined.
    fn run_reference(
        &self,
        parent: &GeneratorOperation,
        identifier: &str,
        mappings: &mut TemplateMappings,
        state: &mut RunState<'_>,
    ) -> Result<bool> {
        match self.operations.get(identifier) {
            Some(operation) => {
                self.run_operation(operation, mappings, state)?;
                Ok(true)
            }
            None => {
                warn!("Missing operation: {} referenced by: {}", identifier, parent.identifier());
                Ok(false)
            }
        }
    }

    fn run_group(
        &self,
        operation: &GeneratorOperation,
        children: &[String],
        mappings: &mut TemplateMappings,
        state: &mut RunState<'_>,
    ) -> Result<()> {
        for child in children {
            // A missing child ends the whole group.
            if !self.run_reference(operation, child, mappings, state)? {
                break;
            }
        }
        Ok(())
    }

    fn run_selection(
        &self,
        operation: &GeneratorOperation,
        input: &str,
        options: &IndexMap<String, String>,
        default: Option<&str>,
        mappings: &mut TemplateMappings,
        state: &mut RunState<'_>,
    ) -> Result<()> {
        let value = mappings.get(input).and_then(|value| match value {
            Value::String(text) => Some(text.clone()),
            Value::Number(number) => Some(number.to_string()),
            Value::Bool(flag) => Some(flag.to_string()),
            _ => None,
        });

        let selected = value
            .as_deref()
            .and_then(|value| options.get(value))
            .map(String::as_str)
            .or(default);

        match selected {
            Some(identifier) => {
                self.run_reference(operation, identifier, mappings, state)?;
            }
            None => debug!(
                "No option of selection: {} matches value: {:?}",
                operation.identifier(),
                value
            ),
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn run_sequence(
        &self,
        operation: &GeneratorOperation,
        input: &str,
        children: &[String],
        placeholder: &str,
        fallback: Option<&str>,
        mappings: &mut TemplateMappings,
        state: &mut RunState<'_>,
    ) -> Result<()> {
        let elements = match mappings.get(input) {
            Some(Value::Array(elements)) => elements.clone(),
            None | Some(Value::Null) => Vec::new(),
            Some(other) => {
                warn!(
                    "Input: {} of sequence: {} is not a collection: {}",
                    input,
                    operation.identifier(),
                    other
                );
                return Ok(());
            }
        };

        if elements.is_empty() {
            if let Some(fallback) = fallback {
                self.run_reference(operation, fallback, mappings, state)?;
            }
            return Ok(());
        }

        for element in elements {
            mappings.with_scope(|scope| {
                scope.set(placeholder, element);
                for child in children {
                    self.run_reference(operation, child, scope, state)?;
                }
                Ok::<(), Error>(())
            })?;
        }
        Ok(())
    }

    fn run_template(
        &self,
        operation: &GeneratorOperation,
        file: &Path,
        placeholders: &[String],
        fallback: Option<&str>,
        mappings: &mut TemplateMappings,
        state: &mut RunState<'_>,
    ) -> Result<()> {
        let template_path = self.templates_path.join(file);
        if !template_path.exists() {
            return match fallback {
                Some(fallback) => {
                    debug!("Template: {} missing, using fallback: {}", template_path.display(), fallback);
                    self.run_reference(operation, fallback, mappings, state).map(|_| ())
                }
                None => Err(Error::MissingCollaboratorFile(template_path)),
            };
        }

        let mut text = mappings.with_scope(|scope| {
            for name in placeholders {
                if !scope.contains_key(name) {
                    scope.set(name.as_str(), Value::Null);
                }
            }
            self.renderer.generate(&template_path, scope)
        })?;

        for modifier in operation.modifiers() {
            text = modifier.apply(&text);
        }

        state.write(&text)
    }
}
