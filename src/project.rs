//! Project configuration of a libyal style library.
//! The configuration is a closed set of named fields; condition expressions
//! can only refer to these fields and a small set of derived values.

use crate::error::{Error, Result};
use indexmap::IndexMap;
use log::debug;
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;

/// Project attributes visible to condition expressions.
pub const ATTRIBUTE_NAMES: [&str; 19] = [
    "project_name",
    "project_status",
    "project_year_of_creation",
    "project_authors",
    "library_name",
    "library_description",
    "library_public_types",
    "library_build_dependencies",
    "library_features",
    "python_module_features",
    "tools_names",
    "tools_build_dependencies",
    "tests_features",
    "tests_profiles",
    "library_name_suffix",
    "python_module_name",
    "has_python_module",
    "has_tools",
    "has_tests",
];

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectSection {
    pub name: String,
    pub status: String,
    pub year_of_creation: Option<u32>,
    pub authors: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct LibrarySection {
    pub name: String,
    pub description: String,
    pub public_types: Vec<String>,
    pub build_dependencies: Vec<String>,
    pub features: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct PythonModuleSection {
    pub name: Option<String>,
    pub features: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ToolsSection {
    pub names: Vec<String>,
    pub build_dependencies: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct TestsSection {
    pub features: Vec<String>,
    pub profiles: Vec<String>,
}

/// Immutable description of one target project.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectConfiguration {
    pub project: ProjectSection,
    pub library: LibrarySection,
    pub python_module: Option<PythonModuleSection>,
    pub tools: Option<ToolsSection>,
    pub tests: Option<TestsSection>,
}

impl ProjectConfiguration {
    /// Parses a configuration in JSON or YAML format.
    ///
    /// # Errors
    /// * `Error::ConfigurationError` if neither format applies
    pub fn parse(content: &str) -> Result<Self> {
        match serde_json::from_str(content) {
            Ok(configuration) => Ok(configuration),
            Err(_) => serde_yaml::from_str(content).map_err(|e| {
                Error::ConfigurationError(format!("Invalid project configuration: {e}"))
            }),
        }
    }

    /// Loads the configuration file at `path`.
    ///
    /// # Errors
    /// * `Error::MissingCollaboratorFile` if the file does not exist
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(Error::MissingCollaboratorFile(path.to_path_buf()));
        }
        debug!("Loading project configuration from {}", path.display());
        Self::parse(&std::fs::read_to_string(path)?)
    }

    /// Library name without its `lib` prefix, e.g. `fsntfs` for `libfsntfs`.
    pub fn library_name_suffix(&self) -> String {
        let name = &self.library.name;
        name.strip_prefix("lib").unwrap_or(name).to_string()
    }

    pub fn python_module_name(&self) -> String {
        self.python_module
            .as_ref()
            .and_then(|module| module.name.clone())
            .unwrap_or_else(|| format!("py{}", self.library_name_suffix()))
    }

    pub fn has_python_module(&self) -> bool {
        self.python_module.is_some()
    }

    pub fn has_tools(&self) -> bool {
        self.tools.as_ref().is_some_and(|tools| !tools.names.is_empty())
    }

    pub fn has_tests(&self) -> bool {
        self.tests.is_some()
    }

    /// Names usable in condition expressions with their current values.
    pub fn attributes(&self) -> IndexMap<&'static str, Value> {
        ATTRIBUTE_NAMES
            .iter()
            .filter_map(|name| self.attribute(name).map(|value| (*name, value)))
            .collect()
    }

    /// Value of one condition attribute; `None` for names outside
    /// `ATTRIBUTE_NAMES`.
    pub fn attribute(&self, name: &str) -> Option<Value> {
        let strings = |values: &[String]| Value::from(values.to_vec());
        let python = self.python_module.as_ref();
        let tools = self.tools.as_ref();
        let tests = self.tests.as_ref();
        let value = match name {
            "project_name" => Value::from(self.project.name.as_str()),
            "project_status" => Value::from(self.project.status.as_str()),
            "project_year_of_creation" => self.project.year_of_creation.map(Value::from).unwrap_or(Value::Null),
            "project_authors" => strings(&self.project.authors),
            "library_name" => Value::from(self.library.name.as_str()),
            "library_description" => Value::from(self.library.description.as_str()),
            "library_public_types" => strings(&self.library.public_types),
            "library_build_dependencies" => strings(&self.library.build_dependencies),
            "library_features" => strings(&self.library.features),
            "python_module_features" => strings(python.map(|python| python.features.as_slice()).unwrap_or_default()),
            "tools_names" => strings(tools.map(|tools| tools.names.as_slice()).unwrap_or_default()),
            "tools_build_dependencies" => {
                strings(tools.map(|tools| tools.build_dependencies.as_slice()).unwrap_or_default())
            }
            "tests_features" => strings(tests.map(|tests| tests.features.as_slice()).unwrap_or_default()),
            "tests_profiles" => strings(tests.map(|tests| tests.profiles.as_slice()).unwrap_or_default()),
            "library_name_suffix" => Value::from(self.library_name_suffix()),
            "python_module_name" => Value::from(self.python_module_name()),
            "has_python_module" => Value::from(self.has_python_module()),
            "has_tools" => Value::from(self.has_tools()),
            "has_tests" => Value::from(self.has_tests()),
            _ => return None,
        };
        Some(value)
    }

    /// Mapping values shared by every template of the project.
    pub fn template_mappings(&self) -> IndexMap<String, Value> {
        let suffix = self.library_name_suffix();
        let mut mappings = IndexMap::new();
        mappings.insert("project_name".to_string(), Value::from(self.project.name.clone()));
        mappings.insert("project_status".to_string(), Value::from(self.project.status.clone()));
        mappings.insert(
            "project_year_of_creation".to_string(),
            self.project.year_of_creation.map(Value::from).unwrap_or(Value::Null),
        );
        mappings.insert("authors".to_string(), Value::from(self.project.authors.join(", ")));
        mappings.insert("library_name".to_string(), Value::from(self.library.name.clone()));
        mappings.insert(
            "library_name_upper_case".to_string(),
            Value::from(self.library.name.to_uppercase()),
        );
        mappings.insert("library_name_suffix".to_string(), Value::from(suffix.clone()));
        mappings.insert(
            "library_name_suffix_upper_case".to_string(),
            Value::from(suffix.to_uppercase()),
        );
        mappings.insert(
            "library_description".to_string(),
            Value::from(self.library.description.clone()),
        );
        mappings.insert("python_module_name".to_string(), Value::from(self.python_module_name()));
        mappings
    }
}
