//! Script section parsing.
//!
//! The script text of a component is translated into a parser dialect and parsed
//! with oxc. Every span of the resulting tree is moved into the coordinates of the
//! full component file, so diagnostics raised by later stages point at the text
//! the author wrote.

use oxc_allocator::Allocator;
use oxc_ast::ast::Program;
use oxc_ast_visit::VisitMut;
use oxc_parser::Parser;
use oxc_span::Span;

use crate::error::{CompileError, SourceLocation};
use crate::options::CompileOptions;
use crate::position_map::PositionMap;
use crate::snippet::module_source_type;
use crate::translate::{Dialect, TranslateOptions, TranslatorRegistry};

// ═══════════════════════════════════════════════════════════════════════════════
// SCRIPT SECTION
// ═══════════════════════════════════════════════════════════════════════════════

/// The script block of a component: its text and where it starts in the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptSection<'s> {
    pub text: &'s str,
    /// Offset of `text` in the component file
    pub start: u32,
    pub end: u32,
    pub dialect: Dialect,
    pub attributes: Vec<(String, String)>,
}

impl<'s> ScriptSection<'s> {
    pub fn new(text: &'s str, start: u32) -> Self {
        Self {
            text,
            start,
            end: start + text.len() as u32,
            dialect: Dialect::JavaScript,
            attributes: Vec::new(),
        }
    }

    /// Build a section from the attributes of its `<script>` tag. The dialect is
    /// taken from the `type` attribute, then from `lang`.
    pub fn with_attributes(text: &'s str, start: u32, attributes: Vec<(String, String)>) -> Self {
        let mut section = Self::new(text, start);
        section.attributes = attributes;
        section.dialect = Dialect::from_attribute(
            section
                .attribute("type")
                .or_else(|| section.attribute("lang")),
        );
        section
    }

    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SYNTAX TREE
// ═══════════════════════════════════════════════════════════════════════════════

/// Parsed script whose spans are offsets into the component file.
pub struct SyntaxTree<'a> {
    pub program: Program<'a>,
    pub dialect: Dialect,
}

impl std::fmt::Debug for SyntaxTree<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyntaxTree")
            .field("dialect", &self.dialect)
            .field("statements", &self.program.body.len())
            .finish()
    }
}

/// Moves spans of translated code into component file coordinates.
struct SpanRemapper {
    map: Option<PositionMap>,
    base: u32,
}

impl SpanRemapper {
    fn new(map: Option<PositionMap>, base: u32) -> Self {
        Self {
            map: map.map(|m| m.with_base_offset(base)),
            base,
        }
    }

    fn original(&self, offset: u32) -> u32 {
        match &self.map {
            Some(map) => map.original_offset(offset),
            None => offset + self.base,
        }
    }
}

impl<'a> VisitMut<'a> for SpanRemapper {
    fn visit_span(&mut self, span: &mut Span) {
        let start = self.original(span.start);
        let end = self.original(span.end).max(start);
        *span = Span::new(start, end);
    }
}

/// Translate and parse a script section.
///
/// Parse failures are reported against the original component source, including
/// when a translator reshaped the code.
pub fn parse_script_section<'a>(
    allocator: &'a Allocator,
    section: &ScriptSection<'_>,
    source: &str,
    options: &CompileOptions,
    registry: &TranslatorRegistry,
) -> Result<SyntaxTree<'a>, CompileError> {
    let translation = registry.translate(
        section.text,
        &TranslateOptions {
            file: &options.file,
            dialect: &section.dialect,
            options: &options.translator_options,
        },
    )?;

    let mut remapper = SpanRemapper::new(translation.position_map, section.start);

    let code: &'a str = allocator.alloc_str(&translation.code);
    let source_type = module_source_type(section.dialect.is_typescript());
    let ret = Parser::new(allocator, code, source_type).parse();

    if ret.panicked || !ret.errors.is_empty() {
        let first = ret.errors.first();
        let message = first
            .map(|e| e.message.to_string())
            .unwrap_or_else(|| "unrecoverable syntax error".to_string());
        let offset = first
            .and_then(|e| e.labels.as_ref())
            .and_then(|labels| labels.first())
            .map(|label| remapper.original(label.offset() as u32));

        return Err(CompileError::Parse {
            dialect: section.dialect.name().to_string(),
            file: options.file.clone(),
            message,
            location: offset.map(|offset| SourceLocation::from_offset(source, offset)),
        });
    }

    let mut program = ret.program;
    remapper.visit_program(&mut program);

    tracing::debug!(
        file = %options.file,
        dialect = %section.dialect,
        statements = program.body.len(),
        "parsed component script"
    );

    Ok(SyntaxTree {
        program,
        dialect: section.dialect.clone(),
    })
}
