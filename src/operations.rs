//! Generator operations: the nodes of the declarative generation graph.

use crate::condition::Condition;
use crate::error::{Error, Result};
use indexmap::IndexMap;
use log::debug;
use std::collections::VecDeque;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// The closed set of operation types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationType {
    Group,
    Selection,
    Sequence,
    Template,
}

impl OperationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Group => "group",
            Self::Selection => "selection",
            Self::Sequence => "sequence",
            Self::Template => "template",
        }
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "group" => Ok(Self::Group),
            "selection" => Ok(Self::Selection),
            "sequence" => Ok(Self::Sequence),
            "template" => Ok(Self::Template),
            _ => Err(Error::ConfigurationError(format!("unsupported type: {s}"))),
        }
    }
}

/// Post-processing transforms applied to rendered template text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modifier {
    SortLines,
}

impl Modifier {
    /// Applies the modifier to rendered text.
    pub fn apply(&self, text: &str) -> String {
        match self {
            Self::SortLines => sort_lines(text),
        }
    }
}

impl FromStr for Modifier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "sort_lines" => Ok(Self::SortLines),
            _ => Err(Error::ConfigurationError(format!("unsupported modifier: {s}"))),
        }
    }
}

/// Stable sort of all lines; a trailing empty line stays last.
fn sort_lines(text: &str) -> String {
    let mut lines: Vec<&str> = text.split('\n').collect();
    let trailing_empty = lines.last() == Some(&"");
    if trailing_empty {
        lines.pop();
    }
    lines.sort();
    if trailing_empty {
        lines.push("");
    }
    lines.join("\n")
}

/// Type specific part of an operation.
#[derive(Debug, Clone, PartialEq)]
pub enum OperationKind {
    /// Runs the referenced operations in order.
    Group { operations: Vec<String> },
    /// Runs the operation selected by the runtime value named `input`.
    Selection { input: String, options: IndexMap<String, String>, default: Option<String> },
    /// Runs `operations` once per element of the runtime collection named
    /// `input`, with the element bound to `placeholder`.
    Sequence {
        input: String,
        operations: Vec<String>,
        placeholder: String,
        fallback: Option<String>,
    },
    /// Renders a template file.
    Template { file: PathBuf, placeholders: Vec<String>, fallback: Option<String> },
}

impl OperationKind {
    pub fn operation_type(&self) -> OperationType {
        match self {
            Self::Group { .. } => OperationType::Group,
            Self::Selection { .. } => OperationType::Selection,
            Self::Sequence { .. } => OperationType::Sequence,
            Self::Template { .. } => OperationType::Template,
        }
    }

    /// Identifiers of all operations this one may run.
    pub fn references(&self) -> Vec<&str> {
        let mut references: Vec<&str> = Vec::new();
        match self {
            Self::Group { operations } => references.extend(operations.iter().map(String::as_str)),
            Self::Selection { options, default, .. } => {
                references.extend(options.values().map(String::as_str));
                references.extend(default.as_deref());
            }
            Self::Sequence { operations, fallback, .. } => {
                references.extend(operations.iter().map(String::as_str));
                references.extend(fallback.as_deref());
            }
            Self::Template { fallback, .. } => references.extend(fallback.as_deref()),
        }
        references
    }
}

/// One decoded operation. Immutable after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorOperation {
    identifier: String,
    condition: Option<Condition>,
    modifiers: Vec<Modifier>,
    kind: OperationKind,
}

impl GeneratorOperation {
    pub fn new(identifier: impl Into<String>, kind: OperationKind) -> Self {
        Self { identifier: identifier.into(), condition: None, modifiers: Vec::new(), kind }
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn with_modifiers(mut self, modifiers: Vec<Modifier>) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn operation_type(&self) -> OperationType {
        self.kind.operation_type()
    }

    pub fn condition(&self) -> Option<&Condition> {
        self.condition.as_ref()
    }

    pub fn modifiers(&self) -> &[Modifier] {
        &self.modifiers
    }

    pub fn kind(&self) -> &OperationKind {
        &self.kind
    }
}

/// Identifier keyed operations of one operations file.
#[derive(Debug, Clone, Default)]
pub struct OperationSet {
    operations: IndexMap<String, GeneratorOperation>,
}

impl OperationSet {
    /// Builds the set, rejecting duplicate identifiers and reference cycles.
    ///
    /// References to identifiers that are not part of the set are allowed
    /// here; they are reported when the referencing operation runs.
    pub fn new(operations: impl IntoIterator<Item = GeneratorOperation>) -> Result<Self> {
        let mut map = IndexMap::new();
        for operation in operations {
            if map.contains_key(operation.identifier()) {
                return Err(Error::ConfigurationError(format!(
                    "duplicate identifier: {}",
                    operation.identifier()
                )));
            }
            map.insert(operation.identifier().to_string(), operation);
        }
        let set = Self { operations: map };
        set.check_cycles()?;
        Ok(set)
    }

    pub fn get(&self, identifier: &str) -> Option<&GeneratorOperation> {
        self.operations.get(identifier)
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        self.operations.keys().map(String::as_str)
    }

    /// Kahn's algorithm over reference edges; whatever cannot be ordered
    /// lies on or behind a cycle.
    fn check_cycles(&self) -> Result<()> {
        let mut in_degree: IndexMap<&str, usize> =
            self.operations.keys().map(|id| (id.as_str(), 0)).collect();

        for operation in self.operations.values() {
            for reference in operation.kind().references() {
                if let Some(count) = in_degree.get_mut(reference) {
                    *count += 1;
                }
            }
        }

        let mut queue: VecDeque<&str> =
            in_degree.iter().filter(|(_, &count)| count == 0).map(|(id, _)| *id).collect();
        let mut ordered = 0;

        while let Some(identifier) = queue.pop_front() {
            ordered += 1;
            let Some(operation) = self.operations.get(identifier) else {
                continue;
            };
            for reference in operation.kind().references() {
                if let Some(degree) = in_degree.get_mut(reference) {
                    *degree -= 1;
                    if *degree == 0 {
                        queue.push_back(reference);
                    }
                }
            }
        }

        if ordered != self.operations.len() {
            let cycle_nodes: Vec<&str> =
                in_degree.iter().filter(|(_, &count)| count > 0).map(|(id, _)| *id).collect();
            return Err(Error::ConfigurationError(format!(
                "cycle detected involving operations: {}",
                cycle_nodes.join(", ")
            )));
        }
        debug!("Operation graph of {} operations is acyclic", ordered);
        Ok(())
    }
}
