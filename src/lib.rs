//! # Riot Component Compiler: script merge
//!
//! Native implementation of the stage that turns the script block of a Riot
//! component into the component logic of the compiled output module.
//!
//! ## Stages
//!
//! 1. **Translate and parse**: the script is translated from its dialect
//!    (identity for JavaScript and TypeScript) and parsed with oxc. Every span is
//!    moved back into component file coordinates.
//! 2. **Normalize**: top-level statements are classified. A script either default
//!    exports its logic (modern) or mutates `this` at top level (legacy). Legacy
//!    scripts are wrapped into `function exports(__component__ = this) {...}`.
//!    Mixing both is a compile error.
//! 3. **Splice**: the normalized export replaces the `exports: null` placeholder of
//!    the output tree and the remaining statements move to module scope.
//! 4. **Bind the interface**: TypeScript components exporting a type that references
//!    `RiotComponent` get their default export asserted as
//!    `RiotComponentWrapper<Type>`.
//!
//! Each stage runs once per compile. The output tree records how far it went and
//! rejects stages run out of order.

#[cfg(feature = "napi")]
use napi_derive::napi;

pub mod classify;
pub mod component;
pub mod error;
pub mod interface;
pub mod options;
pub mod output;
pub mod pipeline;
pub mod position_map;
pub mod root_validator;
pub mod script;
pub mod translate;

mod snippet;

#[cfg(test)]
mod pipeline_tests;

pub use classify::{classify_statement, normalize_script, AuthoringStyle, NormalizedScript, StatementKind};
pub use component::{parse_component, ComponentDescriptor, ComponentSections, ElementNode};
pub use error::{BoxError, CompileError, CompileWarning, ComponentParseError, SourceLocation, TranslateError};
pub use interface::{
    bind_component_interface, find_component_interface, prepare_interface_binding, ComponentInterface, InterfaceBinding,
    InterfaceKind,
};
pub use options::CompileOptions;
pub use output::{OutputStage, OutputTree};
pub use pipeline::{compile_component, compile_components, merge_script, CompileOutput, ComponentSource, ScriptMergeOutcome};
pub use position_map::{OffsetMapping, PositionMap};
pub use root_validator::{has_markup_outside_root, has_markup_outside_root_with};
pub use script::{parse_script_section, ScriptSection, SyntaxTree};
pub use translate::{Dialect, TranslateOptions, TranslationResult, Translator, TranslatorRegistry};

// ═══════════════════════════════════════════════════════════════════════════════
// NAPI EXPORTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Compile a component for the JavaScript host. Only JavaScript and TypeScript
/// scripts are supported through this entry point.
#[cfg(feature = "napi")]
#[napi]
pub fn compile_component_native(source: String, options_json: Option<String>) -> napi::Result<serde_json::Value> {
    let options = match options_json.as_deref() {
        Some(json) => CompileOptions::from_json(json),
        None => Ok(CompileOptions::default()),
    }
    .map_err(|e| napi::Error::from_reason(e.to_string()))?;

    let output = compile_component(&source, &options, &TranslatorRegistry::new())
        .map_err(|e| napi::Error::from_reason(format!("[{}] {}", e.code(), e)))?;
    serde_json::to_value(output).map_err(|e| napi::Error::from_reason(e.to_string()))
}

#[cfg(feature = "napi")]
#[napi]
pub fn has_markup_outside_root_native(source: String) -> bool {
    let root = parse_component(&source)
        .ok()
        .and_then(|descriptor| descriptor.root().map(|root| root.range()));
    has_markup_outside_root(root, &source)
}
