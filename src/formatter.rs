//! Line oriented C source formatter.
//!
//! This is not a C parser. It recognizes the constrained shape of generated
//! libyal sources: column 0 braces open and close functions, variable
//! declarations directly follow the opening brace of a function, and
//! `switch` bodies consist of `case` labels terminated by `break;`.

use crate::constants::{LEADING_INCLUDE, TAB_WIDTH, VARIABLE_TYPE_PRIORITY};
use regex::Regex;
use std::cmp::Ordering;
use std::sync::LazyLock;

static DECLARATION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<modifiers>(?:(?:static|const|volatile|register|unsigned|signed|struct|enum|union)\s+)*)(?P<type>(?:(?:long|short)\s+)*[A-Za-z_][A-Za-z0-9_]*)(?:\s*(?P<pointer>\*+)\s*|\s+)(?P<name>[A-Za-z_][A-Za-z0-9_]*(?:\[[^\]]*\])*)\s*(?P<initializer>=.*)?;$",
    )
    .expect("declaration pattern is valid")
});

static SPACES_BEFORE_TAB: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r" {1,7}\t").expect("tab pattern is valid"));

/// Width of `text` in columns, with tabs advancing to the next tab stop.
pub fn expanded_width(text: &str) -> usize {
    text.chars().fold(0, |column, c| {
        if c == '\t' {
            (column / TAB_WIDTH + 1) * TAB_WIDTH
        } else {
            column + 1
        }
    })
}

/// Rewrites the indentation of `line`.
///
/// The leading whitespace becomes tabs for every full tab stop it covers,
/// but at least `indent_level` tabs, followed by spaces for the remainder.
/// Interior runs of spaces followed by a tab become a single tab and every
/// interior tab is expanded to spaces. Trailing whitespace is removed.
pub fn normalize_indentation(line: &str, indent_level: usize) -> String {
    let content = line.trim_start_matches([' ', '\t']).trim_end();
    if content.is_empty() {
        return String::new();
    }
    let leading = &line[..line.len() - line.trim_start_matches([' ', '\t']).len()];
    let columns = expanded_width(leading);

    let (tabs, spaces) = if columns >= indent_level * TAB_WIDTH {
        (columns / TAB_WIDTH, columns % TAB_WIDTH)
    } else {
        (indent_level, 0)
    };

    let interior = SPACES_BEFORE_TAB.replace_all(content, "\t");
    let interior = interior.replace('\t', &" ".repeat(TAB_WIDTH));

    let mut normalized = String::with_capacity(tabs + spaces + interior.len());
    normalized.extend(std::iter::repeat('\t').take(tabs));
    normalized.extend(std::iter::repeat(' ').take(spaces));
    normalized.push_str(&interior);
    normalized
}

/// A variable declaration of the form `[modifiers] type [*]name [= init];`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    modifiers: String,
    type_name: String,
    pointer: bool,
    name: String,
}

impl Variable {
    /// Parses a declaration line; returns `None` for anything else.
    pub fn parse(line: &str) -> Option<Self> {
        let captures = DECLARATION_PATTERN.captures(line.trim())?;
        Some(Self {
            modifiers: captures["modifiers"].trim_end().to_string(),
            type_name: captures["type"].to_string(),
            pointer: captures.name("pointer").is_some(),
            name: captures["name"].to_string(),
        })
    }

    pub fn modifiers(&self) -> &str {
        &self.modifiers
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_pointer(&self) -> bool {
        self.pointer
    }

    /// Rank in the type priority table; types missing from the table rank 0
    /// and therefore sort first.
    fn type_rank(&self) -> usize {
        VARIABLE_TYPE_PRIORITY
            .iter()
            .position(|type_name| *type_name == self.type_name)
            .map(|index| index + 1)
            .unwrap_or(0)
    }

    fn sort_key(&self) -> (bool, usize, &str, &str) {
        let stripped = self.type_name.strip_suffix("_t").unwrap_or(&self.type_name);
        (!self.pointer, self.type_rank(), stripped, &self.name)
    }

    /// Declaration order: pointers first, then type priority, then type name
    /// without `_t`, then variable name.
    pub fn compare(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

/// Stable sort of declaration lines. Lines that are not declarations follow
/// the declarations in their original order.
pub fn sort_variable_declarations(lines: &[String]) -> Vec<String> {
    let mut declarations: Vec<(Option<Variable>, &String)> =
        lines.iter().map(|line| (Variable::parse(line), line)).collect();
    declarations.sort_by(|(a, _), (b, _)| match (a, b) {
        (Some(a), Some(b)) => a.compare(b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    declarations.into_iter().map(|(_, line)| line.clone()).collect()
}

/// Splits a line at its first `=` if it is an alignable assignment.
fn split_assignment(line: &str) -> Option<(&str, &str)> {
    let index = line.find('=')?;
    let (prefix, suffix) = line.split_at(index);
    if suffix.starts_with("==") || suffix[1..].trim_start().starts_with('{') {
        return None;
    }
    let prefix = prefix.trim_end();
    if prefix.trim().is_empty() {
        return None;
    }
    Some((prefix, suffix))
}

/// Column at which the `=` signs of `lines` have to be placed so that all
/// assignments align, or `None` if no line has an alignable assignment.
pub fn vertical_align_equal_signs_determine_offset(lines: &[String]) -> Option<usize> {
    lines
        .iter()
        .filter_map(|line| split_assignment(line))
        .map(|(prefix, _)| expanded_width(prefix) + 1)
        .max()
}

/// Pads every alignable assignment so its `=` starts at column `offset`.
/// Other lines pass through unchanged.
pub fn vertical_align_equal_signs(lines: &[String], offset: usize) -> Vec<String> {
    lines
        .iter()
        .map(|line| match split_assignment(line) {
            Some((prefix, suffix)) => {
                let padding = offset.saturating_sub(expanded_width(prefix)).max(1);
                format!("{prefix}{}{suffix}", " ".repeat(padding))
            }
            None => line.clone(),
        })
        .collect()
}

/// Sorts contiguous runs of `#include` lines: `<common.h>` stays first,
/// then system headers before local ones, then by header name.
pub fn sort_include_blocks(lines: &[String]) -> Vec<String> {
    fn include_key(line: &str) -> (bool, bool, String) {
        let header = line.trim_start_matches('#').trim_start().trim_start_matches("include").trim();
        // common.h includes config.h and has to precede every other header.
        (header != LEADING_INCLUDE, header.starts_with('"'), header.to_string())
    }

    let mut sorted = Vec::with_capacity(lines.len());
    let mut block: Vec<String> = Vec::new();
    for line in lines {
        if line.starts_with("#include") {
            block.push(line.clone());
            continue;
        }
        block.sort_by_cached_key(|line| include_key(line));
        sorted.append(&mut block);
        sorted.push(line.clone());
    }
    block.sort_by_cached_key(|line| include_key(line));
    sorted.append(&mut block);
    sorted
}

/// Formatter states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    InDeclarationBlock,
    InSwitchCase { level: usize },
}

/// Classification of one source line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineKind {
    Blank,
    Comment,
    Preprocessor,
    OpenBrace,
    CloseBrace,
    CaseLabel,
    Break,
    Code { has_parenthesis: bool },
}

struct SourceFormatter {
    state: State,
    depth: usize,
    in_comment: bool,
    previous_code: Option<String>,
    declarations: Vec<(String, LineKind)>,
    output: Vec<String>,
}

impl SourceFormatter {
    fn new() -> Self {
        Self {
            state: State::Idle,
            depth: 0,
            in_comment: false,
            previous_code: None,
            declarations: Vec::new(),
            output: Vec::new(),
        }
    }

    fn classify(&mut self, line: &str) -> LineKind {
        let trimmed = line.trim();
        if self.in_comment {
            if trimmed.contains("*/") {
                self.in_comment = false;
            }
            return LineKind::Comment;
        }
        if trimmed.is_empty() {
            return LineKind::Blank;
        }
        if trimmed.starts_with("/*") {
            self.in_comment = !trimmed.contains("*/");
            return LineKind::Comment;
        }
        if trimmed.starts_with("//") {
            return LineKind::Comment;
        }
        if trimmed.starts_with('#') {
            return LineKind::Preprocessor;
        }
        if line.trim_end() == "{" {
            return LineKind::OpenBrace;
        }
        if line.starts_with('}') {
            return LineKind::CloseBrace;
        }
        if trimmed.starts_with("case ") || trimmed.starts_with("default:") {
            return LineKind::CaseLabel;
        }
        if trimmed == "break;" {
            return LineKind::Break;
        }
        LineKind::Code { has_parenthesis: trimmed.contains('(') }
    }

    fn indent_level(&self) -> usize {
        match self.state {
            State::InSwitchCase { level } => level.max(self.depth),
            _ => self.depth,
        }
    }

    fn emit(&mut self, line: &str, kind: LineKind) {
        let formatted = match kind {
            // Preprocessor directives stay in column 0.
            LineKind::Preprocessor => normalize_indentation(line, 0),
            _ => normalize_indentation(line, self.indent_level()),
        };
        self.output.push(formatted);
    }

    /// Comment and preprocessor lines split the block into runs that are
    /// sorted and aligned independently.
    fn flush_declarations(&mut self) {
        let mut run: Vec<String> = Vec::new();
        for (line, kind) in std::mem::take(&mut self.declarations) {
            match kind {
                LineKind::Preprocessor => {
                    self.flush_run(&mut run);
                    self.output.push(normalize_indentation(&line, 0));
                }
                LineKind::Comment => {
                    self.flush_run(&mut run);
                    self.output.push(normalize_indentation(&line, self.depth));
                }
                _ => run.push(normalize_indentation(&line, self.depth)),
            }
        }
        self.flush_run(&mut run);
    }

    fn flush_run(&mut self, run: &mut Vec<String>) {
        if run.is_empty() {
            return;
        }
        let sorted = sort_variable_declarations(run);
        let aligned = match vertical_align_equal_signs_determine_offset(&sorted) {
            Some(offset) => vertical_align_equal_signs(&sorted, offset),
            None => sorted,
        };
        self.output.extend(aligned);
        run.clear();
    }

    /// Applies the state transition for `line` and writes it out.
    fn process(&mut self, line: &str) {
        let kind = self.classify(line);

        if self.state == State::InDeclarationBlock {
            match kind {
                LineKind::Code { has_parenthesis: true }
                | LineKind::CloseBrace
                | LineKind::OpenBrace
                | LineKind::CaseLabel
                | LineKind::Break => {
                    self.flush_declarations();
                    self.state = State::Idle;
                }
                _ => {
                    self.declarations.push((line.to_string(), kind));
                    return;
                }
            }
        }

        match kind {
            LineKind::OpenBrace => {
                let opens_function = self.depth == 0
                    && self.previous_code.as_deref().is_some_and(|code| code.ends_with(')'));
                self.emit(line, kind);
                self.depth += 1;
                if opens_function {
                    self.state = State::InDeclarationBlock;
                }
            }
            LineKind::CloseBrace => {
                self.depth = self.depth.saturating_sub(1);
                self.state = State::Idle;
                self.emit(line, kind);
            }
            LineKind::CaseLabel => {
                let label_level = expanded_width(&line[..line.len() - line.trim_start().len()]) / TAB_WIDTH;
                self.state = State::Idle;
                self.emit(line, kind);
                self.state = State::InSwitchCase { level: label_level.max(self.depth) + 1 };
            }
            LineKind::Break => {
                self.emit(line, kind);
                if matches!(self.state, State::InSwitchCase { .. }) {
                    self.state = State::Idle;
                }
            }
            LineKind::Code { .. } => {
                // The closing brace of a switch ends its last case.
                if line.trim_start().starts_with('}') && matches!(self.state, State::InSwitchCase { .. }) {
                    self.state = State::Idle;
                }
                self.emit(line, kind);
            }
            LineKind::Blank | LineKind::Comment | LineKind::Preprocessor => self.emit(line, kind),
        }

        if matches!(kind, LineKind::Code { .. } | LineKind::OpenBrace | LineKind::CloseBrace) {
            self.previous_code = Some(line.trim_end().to_string());
        }
    }

    fn finish(mut self) -> Vec<String> {
        if self.state == State::InDeclarationBlock {
            self.flush_declarations();
        }
        self.output
    }
}

/// Formats C source lines: normalizes indentation, sorts and aligns the
/// variable declarations at the start of function bodies and sorts
/// contiguous `#include` blocks.
pub fn format_source(lines: &[String]) -> Vec<String> {
    let mut formatter = SourceFormatter::new();
    for line in lines {
        formatter.process(line);
    }
    sort_include_blocks(&formatter.finish())
}

/// Formats C source text, keeping its line ending style (CRLF if the
/// first line ends in CRLF) and a trailing newline if present.
pub fn format_text(text: &str) -> String {
    let line_ending = match text.find('\n') {
        Some(index) if text[..index].ends_with('\r') => "\r\n",
        _ => "\n",
    };
    let lines: Vec<String> = text.lines().map(str::to_string).collect();
    let mut formatted = format_source(&lines).join(line_ending);
    if text.ends_with('\n') {
        formatted.push_str(line_ending);
    }
    formatted
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(text: &str) -> Vec<String> {
        text.lines().map(str::to_string).collect()
    }

    #[test]
    fn test_normalize_indentation() {
        assert_eq!(normalize_indentation("    int a;", 1), "\tint a;");
        assert_eq!(normalize_indentation("  \tint a;", 1), "\tint a;");
        assert_eq!(normalize_indentation("\t\tint a;", 1), "\t\tint a;");
        assert_eq!(normalize_indentation("\t          arg,", 1), "\t\t  arg,");
        assert_eq!(normalize_indentation("int\t a;   ", 0), format!("int{} a;", " ".repeat(8)));
        assert_eq!(normalize_indentation("a   \tb", 0), format!("a{}b", " ".repeat(8)));
        assert_eq!(normalize_indentation(" \t ", 2), "");
    }

    #[test]
    fn test_variable_parse() {
        let variable = Variable::parse("\tstatic char *function = \"main\";").unwrap();
        assert_eq!(variable.type_name(), "char");
        assert_eq!(variable.name(), "function");
        assert!(variable.is_pointer());

        let variable = Variable::parse("\tuint8_t buffer[ 16 ];").unwrap();
        assert_eq!(variable.name(), "buffer[ 16 ]");
        assert!(!variable.is_pointer());

        assert!(Variable::parse("\tresult = 0;").is_none());
        assert!(Variable::parse("\treturn( 1 );").is_none());
        assert!(Variable::parse("\tuint8_t data[] = {").is_none());
    }

    #[test]
    fn test_variable_ordering() {
        let sorted = sort_variable_declarations(&lines(
            "\tint result = 0;\n\tstatic char *function = \"x\";\n\tsize_t length = 0;\n\tlibcerror_error_t *error = NULL;\n\tlibfoo_file_t *file = NULL;\n\tuint8_t *data = NULL;",
        ));
        assert_eq!(
            sorted,
            lines(
                "\tlibcerror_error_t *error = NULL;\n\tlibfoo_file_t *file = NULL;\n\tuint8_t *data = NULL;\n\tstatic char *function = \"x\";\n\tsize_t length = 0;\n\tint result = 0;"
            )
        );
    }

    #[test]
    fn test_vertical_alignment() {
        let block = lines("\tint a = 0;\n\tsize_t length = 0;\n\tuint8_t data[] = { 0 };\n\tchar c;");
        let offset = vertical_align_equal_signs_determine_offset(&block).unwrap();
        assert_eq!(offset, 22);
        let aligned = vertical_align_equal_signs(&block, offset);
        assert_eq!(aligned[0], format!("\tint a{}= 0;", " ".repeat(9)));
        assert_eq!(aligned[1], "\tsize_t length = 0;");
        assert_eq!(aligned[2], block[2]);
        assert_eq!(aligned[3], block[3]);
        assert_eq!(vertical_align_equal_signs_determine_offset(&lines("\tchar c;")), None);
    }

    #[test]
    fn test_sort_include_blocks() {
        let sorted = sort_include_blocks(&lines(
            "#include \"libfoo_b.h\"\n#include <types.h>\n#include \"libfoo_a.h\"\n#include <common.h>\n\n#include <z.h>\n#include <a.h>",
        ));
        assert_eq!(
            sorted,
            lines("#include <common.h>\n#include <types.h>\n#include \"libfoo_a.h\"\n#include \"libfoo_b.h\"\n\n#include <a.h>\n#include <z.h>")
        );
    }

    #[test]
    fn test_format_function() {
        let source = lines(
            "int libfoo_get(\n     libfoo_t *foo,\n     libcerror_error_t **error )\n{\n    int result = 0;\n\tstatic char *function = \"libfoo_get\";\n\n\tif( foo == NULL )\n\t{\n\t\treturn( -1 );\n\t}\n\treturn( result );\n}",
        );
        let formatted = format_source(&source);
        assert_eq!(
            formatted,
            lines(&format!(
                "int libfoo_get(\n     libfoo_t *foo,\n     libcerror_error_t **error )\n{{\n\tstatic char *function = \"libfoo_get\";\n\tint result{}= 0;\n\n\tif( foo == NULL )\n\t{{\n\t\treturn( -1 );\n\t}}\n\treturn( result );\n}}",
                " ".repeat(12)
            ))
        );
    }

    #[test]
    fn test_struct_members_are_not_sorted() {
        let source = lines("struct libfoo_x\n{\n\tint b;\n\tchar *a;\n};");
        assert_eq!(format_source(&source), source);
    }

    #[test]
    fn test_declaration_sub_blocks() {
        let source = lines(
            "void f( void )\n{\n\tint b = 0;\n\tchar *a = NULL;\n\n#if defined( HAVE_DEBUG_OUTPUT )\n\tint z = 0;\n\tint y = 1;\n#endif\n\n\tf( a );\n}",
        );
        let formatted = format_source(&source);
        assert_eq!(
            formatted,
            lines(
                "void f( void )\n{\n\tchar *a = NULL;\n\tint b   = 0;\n\n#if defined( HAVE_DEBUG_OUTPUT )\n\tint y = 1;\n\tint z = 0;\n#endif\n\n\tf( a );\n}"
            )
        );
    }

    #[test]
    fn test_switch_case_indentation() {
        let source = lines(
            "void f( int x )\n{\n\tswitch( x )\n\t{\n\t\tcase 1:\n\t\tg();\n\t\tbreak;\n\n\t\tdefault:\n\t\tbreak;\n\t}\n}",
        );
        let formatted = format_source(&source);
        assert_eq!(
            formatted,
            lines(
                "void f( int x )\n{\n\tswitch( x )\n\t{\n\t\tcase 1:\n\t\t\tg();\n\t\t\tbreak;\n\n\t\tdefault:\n\t\t\tbreak;\n\t}\n}"
            )
        );
    }

    #[test]
    fn test_format_text_keeps_trailing_newline() {
        assert_eq!(format_text("int a;\n"), "int a;\n");
        assert_eq!(format_text("int a;"), "int a;");
    }

    #[test]
    fn test_common_header_stays_first() {
        let text = "#include <common.h>\n#include <byte_stream.h>\n#include <memory.h>\n#include <types.h>\n\n#include \"libfoo_io_handle.h\"\n#include \"libfoo_definitions.h\"\n";
        assert_eq!(
            format_text(text),
            "#include <common.h>\n#include <byte_stream.h>\n#include <memory.h>\n#include <types.h>\n\n#include \"libfoo_definitions.h\"\n#include \"libfoo_io_handle.h\"\n"
        );
    }

    #[test]
    fn test_variable_parse_pointer_and_multi_word_types() {
        let variable = Variable::parse("\tchar* name = NULL;").unwrap();
        assert_eq!(variable.type_name(), "char");
        assert_eq!(variable.name(), "name");
        assert!(variable.is_pointer());

        let variable = Variable::parse("\tunsigned long long value = 0;").unwrap();
        assert_eq!(variable.modifiers(), "unsigned");
        assert_eq!(variable.type_name(), "long long");
        assert_eq!(variable.name(), "value");
        assert!(!variable.is_pointer());
    }

    #[test]
    fn test_declaration_block_with_mixed_declarations() {
        let source = lines(
            "void f( void )\n{\n\tconst uint8_t *data = NULL;\n\tunsigned long long value = 0;\n\tchar* name = NULL;\n\tlibcerror_error_t *error = NULL;\n\tint result = 0;\n\n\tg( data );\n}",
        );
        let formatted = format_source(&source);
        assert_eq!(
            formatted,
            lines(&format!(
                "void f( void )\n{{\n\tlibcerror_error_t *error = NULL;\n\tconst uint8_t *data{}= NULL;\n\tchar* name{}= NULL;\n\tunsigned long long value = 0;\n\tint result{}= 0;\n\n\tg( data );\n}}",
                " ".repeat(6),
                " ".repeat(15),
                " ".repeat(15)
            ))
        );
    }

    #[test]
    fn test_comment_splits_declaration_block() {
        let source = lines(
            "void f( void )\n{\n\tint b = 0;\n\tchar *a = NULL;\n\t/* Debug values */\n\tint zz = 0;\n\tsize_t y = 1;\n\n\tf( a );\n}",
        );
        let formatted = format_source(&source);
        assert_eq!(
            formatted,
            lines(
                "void f( void )\n{\n\tchar *a = NULL;\n\tint b   = 0;\n\t/* Debug values */\n\tsize_t y = 1;\n\tint zz   = 0;\n\n\tf( a );\n}"
            )
        );
    }

    #[test]
    fn test_format_text_keeps_crlf() {
        assert_eq!(format_text("int a;   \r\nint b;\r\n"), "int a;\r\nint b;\r\n");
        assert_eq!(format_text("int a;\r\nint b;"), "int a;\r\nint b;");
    }
}
