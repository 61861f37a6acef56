//! Errors and warnings raised while compiling a component.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

// ═══════════════════════════════════════════════════════════════════════════════
// SOURCE LOCATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Position in the original component file. Line and column are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SourceLocation {
    pub offset: u32,
    pub line: u32,
    pub column: u32,
}

impl SourceLocation {
    /// Resolve a byte offset of `source` into a line/column pair.
    /// Offsets past the end are clamped to the end of the source.
    pub fn from_offset(source: &str, offset: u32) -> Self {
        let clamped = (offset as usize).min(source.len());
        let mut line = 1;
        let mut column = 1;

        for (idx, ch) in source.char_indices() {
            if idx >= clamped {
                break;
            }
            if ch == '\n' {
                line += 1;
                column = 1;
            } else {
                column += 1;
            }
        }

        Self {
            offset: clamped as u32,
            line,
            column,
        }
    }
}

impl std::fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ERRORS
// ═══════════════════════════════════════════════════════════════════════════════

/// Failure of the dialect translation step.
#[derive(Debug, Error)]
pub enum TranslateError {
    /// No translator is registered for the dialect
    #[error("unsupported script dialect \"{0}\": no translator registered")]
    Unsupported(String),

    /// The translator ran and failed
    #[error("the \"{dialect}\" translator failed: {source}")]
    Failed {
        dialect: String,
        #[source]
        source: BoxError,
    },
}

/// Failure of the component source parser.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ComponentParseError {
    #[error("no root element found in the component source")]
    MissingRoot,

    #[error("unterminated <{tag}> tag starting at offset {offset}")]
    UnterminatedTag { tag: String, offset: usize },

    #[error("<{tag}> element starting at offset {offset} is never closed")]
    UnclosedElement { tag: String, offset: usize },
}

/// Fatal compile error. Aborts the compilation of a single component.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("cannot mix an explicit default export with implicit top-level context statements in the same component script")]
    DialectConflict { location: Option<SourceLocation> },

    #[error(transparent)]
    Translation(#[from] TranslateError),

    #[error("{file}: failed to parse the {dialect} script: {message}")]
    Parse {
        dialect: String,
        file: String,
        message: String,
        location: Option<SourceLocation>,
    },

    #[error("a component script can contain only one default export")]
    DuplicateDefaultExport { location: Option<SourceLocation> },

    #[error("a component script cannot re-export a default export from another module, import it and export the binding instead")]
    DefaultReexport { location: Option<SourceLocation> },

    #[error("the output tree contains {count} \"{key}\" placeholder properties, exactly one is expected")]
    MultiplePlaceholders { key: String, count: usize },

    #[error("compile stage run out of order: {0}")]
    StageOrder(&'static str),

    #[error(transparent)]
    Component(#[from] ComponentParseError),

    #[error("multiple HTML root nodes are not supported: markup found outside of <{root}>")]
    MarkupOutsideRoot { root: String },

    #[error("invalid compile options: {0}")]
    InvalidOptions(String),
}

impl CompileError {
    /// Stable identifier of the error kind, for hosts matching on errors.
    pub fn code(&self) -> &'static str {
        match self {
            CompileError::DialectConflict { .. } => "DIALECT_CONFLICT",
            CompileError::Translation(TranslateError::Unsupported(_)) => "UNSUPPORTED_DIALECT",
            CompileError::Translation(TranslateError::Failed { .. }) => "TRANSLATION_FAILED",
            CompileError::Parse { .. } => "PARSE_ERROR",
            CompileError::DuplicateDefaultExport { .. } => "DUPLICATE_DEFAULT_EXPORT",
            CompileError::DefaultReexport { .. } => "DEFAULT_REEXPORT",
            CompileError::MultiplePlaceholders { .. } => "MULTIPLE_PLACEHOLDERS",
            CompileError::StageOrder(_) => "STAGE_ORDER",
            CompileError::Component(_) => "COMPONENT_PARSE_ERROR",
            CompileError::MarkupOutsideRoot { .. } => "MARKUP_OUTSIDE_ROOT",
            CompileError::InvalidOptions(_) => "INVALID_OPTIONS",
        }
    }

    /// Original-source location, where one is known.
    pub fn location(&self) -> Option<SourceLocation> {
        match self {
            CompileError::DialectConflict { location }
            | CompileError::Parse { location, .. }
            | CompileError::DuplicateDefaultExport { location }
            | CompileError::DefaultReexport { location } => *location,
            _ => None,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// WARNINGS
// ═══════════════════════════════════════════════════════════════════════════════

/// Non-fatal contract violations reported back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum CompileWarning {
    /// The output tree has no placeholder property; the component logic was not spliced
    MissingPlaceholder { key: String },
    /// The output tree has no default-exported value to attach the component interface to
    MissingDefaultExport { interface: String },
}

impl std::fmt::Display for CompileWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompileWarning::MissingPlaceholder { key } => write!(
                f,
                "the output tree has no \"{}\" placeholder property, the component logic was dropped",
                key
            ),
            CompileWarning::MissingDefaultExport { interface } => write!(
                f,
                "the output tree has no default exported value, the \"{}\" interface was not applied",
                interface
            ),
        }
    }
}
