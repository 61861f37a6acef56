//! Compile options for the Riot component compiler.
//!
//! Options arrive either as a Rust struct or as camelCase JSON from the host
//! (bundler plugin / napi binding). Every field has a default matching the
//! Riot runtime conventions.

use serde::{Deserialize, Serialize};

use crate::error::CompileError;

// ═══════════════════════════════════════════════════════════════════════════════
// RESERVED NAMES
// ═══════════════════════════════════════════════════════════════════════════════

/// Property of the output object that receives the component logic.
pub const TAG_LOGIC_PROPERTY: &str = "exports";
/// Property of the output object holding the compiled css.
pub const TAG_CSS_PROPERTY: &str = "css";
/// Property of the output object holding the template factory.
pub const TAG_TEMPLATE_PROPERTY: &str = "template";
/// Property of the output object holding the component name.
pub const TAG_NAME_PROPERTY: &str = "name";

pub const RIOT_MODULE_ID: &str = "riot";
pub const RIOT_TAG_INTERFACE_NAME: &str = "RiotComponent";
pub const RIOT_INTERFACE_WRAPPER_NAME: &str = "RiotComponentWrapper";

/// Explicit parameter standing in for `this` in legacy component scripts.
pub const LEGACY_CONTEXT_PARAM: &str = "__component__";

/// Plain ASCII identifier check for names spliced into generated code.
pub(crate) fn is_identifier_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMPILE OPTIONS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompileOptions {
    /// Source file name, used in diagnostics
    pub file: String,
    /// Reserved key of the placeholder property in the output tree
    pub placeholder_key: String,
    /// Module the component wrapper type is imported from
    pub framework_module: String,
    /// Type name marking a type alias or interface as the component contract
    pub component_contract: String,
    /// Wrapper type used for the type assertion of the default export
    pub component_wrapper: String,
    /// Parameter name of the function synthesized from legacy scripts
    pub context_param: String,
    /// Reject components with markup outside of their root node
    pub check_markup_outside_root: bool,
    /// Opaque options forwarded to dialect translators
    pub translator_options: serde_json::Value,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            file: String::new(),
            placeholder_key: TAG_LOGIC_PROPERTY.to_string(),
            framework_module: RIOT_MODULE_ID.to_string(),
            component_contract: RIOT_TAG_INTERFACE_NAME.to_string(),
            component_wrapper: RIOT_INTERFACE_WRAPPER_NAME.to_string(),
            context_param: LEGACY_CONTEXT_PARAM.to_string(),
            check_markup_outside_root: true,
            translator_options: serde_json::Value::Null,
        }
    }
}

impl CompileOptions {
    pub fn new(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            ..Default::default()
        }
    }

    /// Parse options handed over by the host as JSON. Missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, CompileError> {
        let options: CompileOptions =
            serde_json::from_str(json).map_err(|e| CompileError::InvalidOptions(e.to_string()))?;
        options.validate()?;
        Ok(options)
    }

    /// Reject options that would produce invalid code.
    pub fn validate(&self) -> Result<(), CompileError> {
        let required = [
            ("placeholderKey", &self.placeholder_key),
            ("frameworkModule", &self.framework_module),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(CompileError::InvalidOptions(format!(
                    "`{}` must not be empty",
                    field
                )));
            }
        }

        let identifiers = [
            ("componentContract", &self.component_contract),
            ("componentWrapper", &self.component_wrapper),
            ("contextParam", &self.context_param),
        ];
        for (field, value) in identifiers {
            if !is_identifier_name(value) {
                return Err(CompileError::InvalidOptions(format!(
                    "`{}` must be a plain identifier, got \"{}\"",
                    field, value
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = CompileOptions::default();
        assert_eq!(options.placeholder_key, "exports");
        assert_eq!(options.framework_module, "riot");
        assert_eq!(options.component_contract, "RiotComponent");
        assert_eq!(options.component_wrapper, "RiotComponentWrapper");
        assert!(options.check_markup_outside_root);
    }

    #[test]
    fn test_from_json_partial() {
        let options =
            CompileOptions::from_json(r#"{"file": "my-tag.riot", "checkMarkupOutsideRoot": false}"#)
                .unwrap();
        assert_eq!(options.file, "my-tag.riot");
        assert!(!options.check_markup_outside_root);
        assert_eq!(options.placeholder_key, "exports");
    }

    #[test]
    fn test_from_json_rejects_empty_names() {
        let err = CompileOptions::from_json(r#"{"placeholderKey": "  "}"#).unwrap_err();
        assert!(matches!(err, CompileError::InvalidOptions(_)));
    }

    #[test]
    fn test_from_json_rejects_invalid_identifiers() {
        let err = CompileOptions::from_json(r#"{"contextParam": "my ctx"}"#).unwrap_err();
        assert!(err.to_string().contains("contextParam"));
    }

    #[test]
    fn test_identifier_names() {
        assert!(is_identifier_name("exports"));
        assert!(is_identifier_name("$_a1"));
        assert!(!is_identifier_name("1a"));
        assert!(!is_identifier_name("my-key"));
        assert!(!is_identifier_name(""));
    }

    #[test]
    fn test_from_json_rejects_malformed() {
        assert!(CompileOptions::from_json("{ nope").is_err());
    }
}
