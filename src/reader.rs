//! Reader for YAML operations files.
//!
//! An operations file is a stream of `---` separated YAML documents, each
//! describing one [`GeneratorOperation`]. Documents are validated one by one
//! as they are decoded.

use crate::condition::Condition;
use crate::constants::{GROUP_KEYS, SELECTION_KEYS, SEQUENCE_KEYS, SUPPORTED_KEYS, TEMPLATE_KEYS};
use crate::error::{Error, Result};
use crate::operations::{GeneratorOperation, Modifier, OperationKind, OperationSet, OperationType};
use indexmap::IndexMap;
use log::debug;
use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use std::fs;
use std::path::{Path, PathBuf};

/// Operations file loaded into memory, decoded lazily.
#[derive(Debug, Clone)]
pub struct YamlOperationsFile {
    path: Option<PathBuf>,
    content: String,
}

impl YamlOperationsFile {
    /// Loads an operations file.
    ///
    /// # Errors
    /// * `Error::IoError` (kind `NotFound`) if the file does not exist
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!("Reading operations file: {}", path.display());
        let content = fs::read_to_string(path)?;
        Ok(Self { path: Some(path.to_path_buf()), content })
    }

    pub fn from_string<S: Into<String>>(content: S) -> Self {
        Self { path: None, content: content.into() }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Decodes the documents one at a time.
    pub fn operations(&self) -> impl Iterator<Item = Result<GeneratorOperation>> + '_ {
        let documents = if self.content.trim().is_empty() {
            None
        } else {
            Some(serde_yaml::Deserializer::from_str(&self.content))
        };
        documents.into_iter().flatten().map(|document| {
            let value = Value::deserialize(document)?;
            read_operation(value)
        })
    }

    /// Decodes all documents into an [`OperationSet`].
    pub fn operation_set(&self) -> Result<OperationSet> {
        OperationSet::new(self.operations().collect::<Result<Vec<_>>>()?)
    }
}

/// Reads all operations of the file at `path`.
pub fn read_from_file<P: AsRef<Path>>(path: P) -> Result<Vec<GeneratorOperation>> {
    YamlOperationsFile::open(path)?.operations().collect()
}

fn configuration_error(message: impl Into<String>) -> Error {
    Error::ConfigurationError(message.into())
}

fn in_operation(error: Error, identifier: &str) -> Error {
    match error {
        Error::ConfigurationError(message) => {
            configuration_error(format!("{message} in {identifier}"))
        }
        other => other,
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

/// Fields of one document, with lookups that report the operation identifier.
struct Document<'a> {
    identifier: String,
    values: &'a Mapping,
}

impl Document<'_> {
    fn invalid(&self, field: &str) -> Error {
        configuration_error(format!("invalid {field} in {}", self.identifier))
    }

    fn missing(&self, field: &str) -> Error {
        configuration_error(format!("missing {field} in {}", self.identifier))
    }

    fn string(&self, field: &str) -> Result<Option<String>> {
        match self.values.get(field) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => scalar_to_string(value).map(Some).ok_or_else(|| self.invalid(field)),
        }
    }

    fn string_list(&self, field: &str) -> Result<Vec<String>> {
        match self.values.get(field) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Sequence(items)) => items
                .iter()
                .map(|item| scalar_to_string(item).ok_or_else(|| self.invalid(field)))
                .collect(),
            Some(_) => Err(self.invalid(field)),
        }
    }

    fn string_map(&self, field: &str) -> Result<IndexMap<String, String>> {
        match self.values.get(field) {
            None | Some(Value::Null) => Ok(IndexMap::new()),
            Some(Value::Mapping(options)) => options
                .iter()
                .map(|(key, value)| match (scalar_to_string(key), scalar_to_string(value)) {
                    (Some(key), Some(value)) => Ok((key, value)),
                    _ => Err(self.invalid(field)),
                })
                .collect(),
            Some(_) => Err(self.invalid(field)),
        }
    }

    fn required_string(&self, field: &str) -> Result<String> {
        match self.string(field)? {
            Some(value) if !value.is_empty() => Ok(value),
            _ => Err(self.missing(field)),
        }
    }

    fn required_list(&self, field: &str) -> Result<Vec<String>> {
        let values = self.string_list(field)?;
        if values.is_empty() {
            return Err(self.missing(field));
        }
        Ok(values)
    }

    fn optional_identifier(&self, field: &str) -> Result<Option<String>> {
        Ok(self.string(field)?.filter(|value| !value.is_empty()))
    }
}

fn sorted_join(mut keys: Vec<&str>) -> String {
    keys.sort_unstable();
    keys.join(", ")
}

/// Validates one decoded YAML document and converts it into an operation.
///
/// # Errors
/// * `Error::ConfigurationError` describing the first violated rule
pub fn read_operation(value: Value) -> Result<GeneratorOperation> {
    let values = match &value {
        Value::Null => return Err(configuration_error("missing operation values")),
        Value::Mapping(values) if values.is_empty() => {
            return Err(configuration_error("missing operation values"))
        }
        Value::Mapping(values) => values,
        _ => return Err(configuration_error("invalid operation values")),
    };

    let keys = values
        .keys()
        .map(|key| key.as_str().ok_or_else(|| configuration_error("invalid operation key")))
        .collect::<Result<Vec<&str>>>()?;

    let undefined_keys: Vec<&str> =
        keys.iter().copied().filter(|key| !SUPPORTED_KEYS.contains(key)).collect();
    if !undefined_keys.is_empty() {
        return Err(configuration_error(format!("undefined keys: {}", sorted_join(undefined_keys))));
    }

    let identifier = match values.get("identifier").and_then(scalar_to_string) {
        Some(identifier) if !identifier.is_empty() => identifier,
        _ => return Err(configuration_error("missing identifier")),
    };
    let document = Document { identifier, values };

    let operation_type: OperationType = match document.string("type")? {
        Some(type_name) if !type_name.is_empty() => type_name.parse()?,
        _ => return Err(configuration_error("missing type")),
    };

    let supported_keys: &[&str] = match operation_type {
        OperationType::Group => &GROUP_KEYS,
        OperationType::Selection => &SELECTION_KEYS,
        OperationType::Sequence => &SEQUENCE_KEYS,
        OperationType::Template => &TEMPLATE_KEYS,
    };
    let unsupported_keys: Vec<&str> =
        keys.iter().copied().filter(|key| !supported_keys.contains(key)).collect();
    if !unsupported_keys.is_empty() {
        return Err(configuration_error(format!(
            "unsupported keys for {}: {}",
            document.identifier,
            sorted_join(unsupported_keys)
        )));
    }

    let kind = match operation_type {
        OperationType::Group => {
            OperationKind::Group { operations: document.required_list("operations")? }
        }
        OperationType::Selection => {
            let input = document.required_string("input")?;
            let options = document.string_map("options")?;
            if options.is_empty() {
                return Err(document.missing("options"));
            }
            OperationKind::Selection {
                input,
                options,
                default: document.optional_identifier("default")?,
            }
        }
        OperationType::Sequence => OperationKind::Sequence {
            input: document.required_string("input")?,
            operations: document.required_list("operations")?,
            placeholder: document.required_string("placeholder")?,
            fallback: document.optional_identifier("fallback")?,
        },
        OperationType::Template => OperationKind::Template {
            file: PathBuf::from(document.required_string("file")?),
            placeholders: document.string_list("placeholders")?,
            fallback: document.optional_identifier("fallback")?,
        },
    };

    let mut operation = GeneratorOperation::new(document.identifier.clone(), kind);

    if let Some(source) = document.string("condition")? {
        let condition =
            Condition::parse(&source).map_err(|e| in_operation(e, &document.identifier))?;
        operation = operation.with_condition(condition);
    }

    let modifiers = document
        .string_list("modifiers")?
        .iter()
        .map(|name| name.parse::<Modifier>())
        .collect::<Result<Vec<_>>>()
        .map_err(|e| in_operation(e, &document.identifier))?;

    Ok(operation.with_modifiers(modifiers))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> Result<GeneratorOperation> {
        read_operation(serde_yaml::from_str(yaml).unwrap())
    }

    fn assert_configuration_error(yaml: &str, expected: &str) {
        match parse(yaml) {
            Err(Error::ConfigurationError(message)) => {
                assert!(message.contains(expected), "'{message}' does not contain '{expected}'")
            }
            other => panic!("expected configuration error, got {other:?}"),
        }
    }

    #[test]
    fn test_template_document() {
        let operation = parse("identifier: header\ntype: template\nfile: x/header.h\n").unwrap();
        assert_eq!(operation.identifier(), "header");
        assert_eq!(operation.operation_type(), OperationType::Template);
        assert_eq!(
            operation.kind(),
            &OperationKind::Template {
                file: PathBuf::from("x/header.h"),
                placeholders: vec![],
                fallback: None
            }
        );
    }

    #[test]
    fn test_validation_order() {
        assert_configuration_error("{}", "missing operation values");
        assert_configuration_error("identifier: a\nbogus: 1\n", "undefined keys: bogus");
        assert_configuration_error("type: template\nfile: a\n", "missing identifier");
        assert_configuration_error("identifier: a\nfile: a\n", "missing type");
        assert_configuration_error("identifier: a\ntype: bogus\n", "unsupported type");
        assert_configuration_error(
            "identifier: a\ntype: group\nfile: x\noperations: [b]\n",
            "unsupported keys for a: file",
        );
        assert_configuration_error("identifier: a\ntype: group\n", "missing operations in a");
        assert_configuration_error("identifier: a\ntype: group\noperations: []\n", "missing operations in a");
    }

    #[test]
    fn test_required_fields_per_type() {
        assert_configuration_error("identifier: s\ntype: selection\ninput: x\n", "missing options in s");
        assert_configuration_error(
            "identifier: s\ntype: sequence\ninput: x\noperations: [a]\n",
            "missing placeholder in s",
        );
        assert_configuration_error("identifier: t\ntype: template\n", "missing file in t");
    }

    #[test]
    fn test_selection_option_keys_are_scalars() {
        let operation = parse(
            "identifier: s\ntype: selection\ninput: flag\noptions:\n  true: yes_op\n  2: two\ndefault: other\n",
        )
        .unwrap();
        match operation.kind() {
            OperationKind::Selection { options, default, .. } => {
                assert_eq!(options.get("true").map(String::as_str), Some("yes_op"));
                assert_eq!(options.get("2").map(String::as_str), Some("two"));
                assert_eq!(default.as_deref(), Some("other"));
            }
            other => panic!("unexpected kind {other:?}"),
        }
    }

    #[test]
    fn test_condition_and_modifiers() {
        let operation = parse(
            "identifier: t\ntype: template\nfile: t.c\ncondition: \"'x' in features\"\nmodifiers: [sort_lines]\n",
        )
        .unwrap();
        assert_eq!(operation.condition().map(|c| c.source()), Some("'x' in features"));
        assert_eq!(operation.modifiers(), &[Modifier::SortLines]);

        assert_configuration_error(
            "identifier: t\ntype: template\nfile: t.c\nmodifiers: [shuffle]\n",
            "unsupported modifier: shuffle",
        );
        assert_configuration_error(
            "identifier: t\ntype: template\nfile: t.c\ncondition: 'a ='\n",
            "invalid condition",
        );
    }

    #[test]
    fn test_lazy_documents() {
        let file = YamlOperationsFile::from_string(
            "---\nidentifier: a\ntype: template\nfile: a.c\n---\nidentifier: b\ntype: bogus\n",
        );
        let mut operations = file.operations();
        assert_eq!(operations.next().unwrap().unwrap().identifier(), "a");
        assert!(operations.next().unwrap().is_err());
        assert!(operations.next().is_none());
    }

    #[test]
    fn test_empty_file() {
        let file = YamlOperationsFile::from_string("");
        assert_eq!(file.operations().count(), 0);
    }
}
