//! Script dialect translation.
//!
//! A component script can be authored in any dialect a translator is registered
//! for. JavaScript and TypeScript are understood by the parser directly and fall
//! back to the identity transform.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{BoxError, TranslateError};
use crate::position_map::PositionMap;

// ═══════════════════════════════════════════════════════════════════════════════
// DIALECT
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Dialect {
    JavaScript,
    TypeScript,
    Other(String),
}

impl Dialect {
    /// Resolve the dialect from the value of a script `type` or `lang` attribute.
    pub fn from_attribute(value: Option<&str>) -> Self {
        let Some(value) = value else {
            return Dialect::JavaScript;
        };

        let value = value.trim().to_ascii_lowercase();
        let value = value
            .strip_prefix("text/")
            .or_else(|| value.strip_prefix("application/"))
            .unwrap_or(&value);

        match value {
            "" | "javascript" | "js" | "module" | "ecmascript" => Dialect::JavaScript,
            "ts" | "typescript" => Dialect::TypeScript,
            other => Dialect::Other(other.to_string()),
        }
    }

    /// Registry key of the dialect.
    pub fn name(&self) -> &str {
        match self {
            Dialect::JavaScript => "javascript",
            Dialect::TypeScript => "typescript",
            Dialect::Other(name) => name,
        }
    }

    pub fn is_typescript(&self) -> bool {
        matches!(self, Dialect::TypeScript)
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TRANSLATOR
// ═══════════════════════════════════════════════════════════════════════════════

/// Input handed to a translator alongside the script text.
#[derive(Debug, Clone, Copy)]
pub struct TranslateOptions<'o> {
    pub file: &'o str,
    pub dialect: &'o Dialect,
    pub options: &'o serde_json::Value,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranslationResult {
    /// Script code in a dialect the parser understands
    pub code: String,
    /// Map from `code` offsets back to the script text offsets
    pub position_map: Option<PositionMap>,
}

impl TranslationResult {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            position_map: None,
        }
    }

    pub fn with_position_map(mut self, map: PositionMap) -> Self {
        self.position_map = Some(map);
        self
    }

    /// Drop a degenerate map so that it is treated as absent.
    pub fn normalized(mut self) -> Self {
        if self.position_map.as_ref().is_some_and(PositionMap::is_empty) {
            self.position_map = None;
        }
        self
    }
}

pub trait Translator: Send + Sync {
    fn translate(&self, source: &str, options: &TranslateOptions<'_>) -> Result<TranslationResult, BoxError>;
}

impl<F> Translator for F
where
    F: Fn(&str, &TranslateOptions<'_>) -> Result<TranslationResult, BoxError> + Send + Sync,
{
    fn translate(&self, source: &str, options: &TranslateOptions<'_>) -> Result<TranslationResult, BoxError> {
        self(source, options)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// REGISTRY
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Default)]
pub struct TranslatorRegistry {
    translators: HashMap<String, Arc<dyn Translator>>,
}

impl std::fmt::Debug for TranslatorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&String> = self.translators.keys().collect();
        names.sort();
        f.debug_struct("TranslatorRegistry")
            .field("translators", &names)
            .finish()
    }
}

impl TranslatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a translator for a dialect name. Registering twice replaces the
    /// previous translator.
    pub fn register(&mut self, dialect: impl Into<String>, translator: impl Translator + 'static) -> &mut Self {
        self.translators
            .insert(dialect.into().to_ascii_lowercase(), Arc::new(translator));
        self
    }

    pub fn contains(&self, dialect: &Dialect) -> bool {
        self.lookup(dialect).is_some()
    }

    fn lookup(&self, dialect: &Dialect) -> Option<&Arc<dyn Translator>> {
        match dialect {
            Dialect::TypeScript => self
                .translators
                .get("typescript")
                .or_else(|| self.translators.get("ts")),
            Dialect::JavaScript => self
                .translators
                .get("javascript")
                .or_else(|| self.translators.get("js")),
            Dialect::Other(name) => self.translators.get(name),
        }
    }

    /// Translate `source` into a dialect the parser understands.
    pub fn translate(&self, source: &str, options: &TranslateOptions<'_>) -> Result<TranslationResult, TranslateError> {
        let dialect = options.dialect;

        match self.lookup(dialect) {
            Some(translator) => {
                tracing::debug!(file = options.file, %dialect, "running script translator");
                translator
                    .translate(source, options)
                    .map(TranslationResult::normalized)
                    .map_err(|source| TranslateError::Failed {
                        dialect: dialect.name().to_string(),
                        source,
                    })
            }
            None => match dialect {
                Dialect::JavaScript | Dialect::TypeScript => Ok(TranslationResult::new(source)),
                Dialect::Other(name) => Err(TranslateError::Unsupported(name.clone())),
            },
        }
    }
}
