//! Common constants used throughout yaldevtools.

/// Keys accepted in any operations file document.
pub const SUPPORTED_KEYS: [&str; 12] = [
    "condition",
    "default",
    "fallback",
    "file",
    "identifier",
    "input",
    "modifiers",
    "operations",
    "options",
    "placeholder",
    "placeholders",
    "type",
];

pub const GROUP_KEYS: [&str; 4] = ["condition", "identifier", "operations", "type"];

pub const SELECTION_KEYS: [&str; 6] =
    ["condition", "default", "identifier", "input", "options", "type"];

pub const SEQUENCE_KEYS: [&str; 7] = [
    "condition",
    "fallback",
    "identifier",
    "input",
    "operations",
    "placeholder",
    "type",
];

pub const TEMPLATE_KEYS: [&str; 7] = [
    "condition",
    "fallback",
    "file",
    "identifier",
    "modifiers",
    "placeholders",
    "type",
];

/// Entry operation used when none is given on the command line.
pub const DEFAULT_MAIN_OPERATION: &str = "main";

/// Files selected by the batch formatter when no pattern is given.
pub const DEFAULT_SOURCE_PATTERNS: [&str; 2] = ["*.c", "*.h"];

/// Known C type names in declaration sort order, highest priority first.
pub const VARIABLE_TYPE_PRIORITY: [&str; 22] = [
    "FILE", "size64_t", "size32_t", "size_t", "ssize_t", "off64_t", "off_t", "uint64_t",
    "int64_t", "uint32_t", "int32_t", "uint16_t", "int16_t", "uint8_t", "int8_t", "double",
    "float", "intptr_t", "int", "wchar_t", "char", "void",
];

/// Header that is kept at the head of its `#include` block.
pub const LEADING_INCLUDE: &str = "<common.h>";

/// Columns a tab character advances to.
pub const TAB_WIDTH: usize = 8;
