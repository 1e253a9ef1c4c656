//! Template string substitution.
//! Template files contain `$name` or `${name}` placeholders that are replaced
//! by the matching mapping values; `$$` produces a literal `$`.

use crate::error::{Error, Result, TemplateFormatErrorKind};
use crate::mappings::TemplateMappings;
use log::debug;
use regex::{Captures, Regex};
use serde_json::Value;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

static PLACEHOLDER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\$(?:(?P<escaped>\$)|(?P<named>[_A-Za-z][_A-Za-z0-9]*)|\{(?P<braced>[_A-Za-z][_A-Za-z0-9]*)\}|(?P<invalid>))",
    )
    .expect("placeholder pattern is valid")
});

/// Trait for template rendering engines.
pub trait TemplateRenderer {
    /// Renders a template string with the given mappings.
    ///
    /// # Arguments
    /// * `template` - Template string to render
    /// * `mappings` - Placeholder values
    ///
    /// # Returns
    /// * `Result<String, TemplateFormatErrorKind>` - Rendered template string
    fn render(
        &self,
        template: &str,
        mappings: &TemplateMappings,
    ) -> std::result::Result<String, TemplateFormatErrorKind>;

    /// Loads the template file at `template_path` verbatim and renders it.
    ///
    /// # Errors
    /// * `Error::IoError` if the file cannot be read
    /// * `Error::TemplateFormatError` naming the template path if substitution fails
    fn generate(&self, template_path: &Path, mappings: &TemplateMappings) -> Result<String> {
        debug!("Rendering template: {}", template_path.display());
        let template = fs::read_to_string(template_path)?;
        self.render(&template, mappings).map_err(|kind| Error::TemplateFormatError {
            path: template_path.to_path_buf(),
            kind,
        })
    }
}

/// Renderer implementing `$name` / `${name}` substitution.
#[derive(Debug, Default, Clone, Copy)]
pub struct StringTemplateRenderer;

impl StringTemplateRenderer {
    pub fn new() -> Self {
        Self
    }
}

/// Converts a mapping value to the text substituted into a template.
pub fn value_to_text(name: &str, value: &Value) -> std::result::Result<String, TemplateFormatErrorKind> {
    match value {
        Value::String(text) => Ok(text.clone()),
        Value::Number(number) => Ok(number.to_string()),
        Value::Bool(flag) => Ok(flag.to_string()),
        // Pre-seeded optional placeholders render as nothing.
        Value::Null => Ok(String::new()),
        Value::Array(_) | Value::Object(_) => {
            Err(TemplateFormatErrorKind::InvalidValue(name.to_string()))
        }
    }
}

fn invalid_placeholder_position(template: &str, offset: usize) -> TemplateFormatErrorKind {
    let preceding = &template[..offset];
    let line = preceding.matches('\n').count() + 1;
    let line_start = preceding.rfind('\n').map(|index| index + 1).unwrap_or(0);
    let column = preceding[line_start..].chars().count() + 1;
    TemplateFormatErrorKind::InvalidPlaceholder { line, column }
}

impl TemplateRenderer for StringTemplateRenderer {
    fn render(
        &self,
        template: &str,
        mappings: &TemplateMappings,
    ) -> std::result::Result<String, TemplateFormatErrorKind> {
        let mut output = String::with_capacity(template.len());
        let mut last_end = 0;

        for captures in PLACEHOLDER_PATTERN.captures_iter(template) {
            let Some(whole) = captures.get(0) else {
                continue;
            };
            output.push_str(&template[last_end..whole.start()]);
            last_end = whole.end();

            output.push_str(&substitute(template, &captures, whole.start(), mappings)?);
        }
        output.push_str(&template[last_end..]);

        Ok(output)
    }
}

fn substitute(
    template: &str,
    captures: &Captures<'_>,
    offset: usize,
    mappings: &TemplateMappings,
) -> std::result::Result<String, TemplateFormatErrorKind> {
    if captures.name("escaped").is_some() {
        return Ok("$".to_string());
    }
    let name = match captures.name("named").or_else(|| captures.name("braced")) {
        Some(name) => name.as_str(),
        None => return Err(invalid_placeholder_position(template, offset)),
    };
    match mappings.get(name) {
        Some(value) => value_to_text(name, value),
        None => Err(TemplateFormatErrorKind::MissingPlaceholder(name.to_string())),
    }
}
