//! Component compile pipeline.
//!
//! The script merge runs translation, classification, splice and interface
//! binding strictly in order on one output tree. `compile_component` wraps it with
//! the component parser and the single-root check.

use oxc_allocator::Allocator;
use rayon::prelude::*;
use serde::Serialize;

use crate::classify::{normalize_script, AuthoringStyle};
use crate::component::{parse_component, ComponentSections};
use crate::error::{CompileError, CompileWarning, ComponentParseError};
use crate::interface::{find_component_interface, prepare_interface_binding, ComponentInterface};
use crate::options::CompileOptions;
use crate::output::{OutputStage, OutputTree};
use crate::root_validator::has_markup_outside_root;
use crate::script::{parse_script_section, ScriptSection};
use crate::translate::TranslatorRegistry;

// ═══════════════════════════════════════════════════════════════════════════════
// SCRIPT MERGE
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptMergeOutcome {
    pub style: AuthoringStyle,
    pub dialect: String,
    pub component_interface: Option<ComponentInterface>,
    pub warnings: Vec<CompileWarning>,
}

/// Merge a component script section into the output tree.
///
/// `source` is the full component file the section was cut from; every reported
/// location refers to it. Errors leave `output` as it was.
pub fn merge_script<'a>(
    allocator: &'a Allocator,
    output: &mut OutputTree<'a>,
    section: &ScriptSection<'_>,
    source: &str,
    options: &CompileOptions,
    registry: &TranslatorRegistry,
) -> Result<ScriptMergeOutcome, CompileError> {
    if output.stage() != OutputStage::Pristine {
        return Err(CompileError::StageOrder(
            "the component script was already merged into this output tree",
        ));
    }

    let tree = parse_script_section(allocator, section, source, options, registry)?;
    let dialect = tree.dialect.name().to_string();

    let component_interface = if tree.dialect.is_typescript() {
        find_component_interface(&tree.program, &options.component_contract)
    } else {
        None
    };

    let binding = component_interface
        .as_ref()
        .map(|interface| prepare_interface_binding(allocator, interface, options))
        .transpose()?;

    let normalized = normalize_script(allocator, tree, source, options)?;
    let style = normalized.style;
    let mut warnings = output.splice(normalized, options)?;

    if let Some(binding) = binding {
        warnings.extend(binding.apply(allocator, output, options)?);
    }

    Ok(ScriptMergeOutcome {
        style,
        dialect,
        component_interface,
        warnings,
    })
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMPONENT COMPILE
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileOutput {
    pub code: String,
    /// Component name, taken from the root node
    pub name: String,
    /// Authoring style of the script; `None` without a script section
    pub style: Option<AuthoringStyle>,
    pub dialect: Option<String>,
    pub component_interface: Option<ComponentInterface>,
    pub sections: ComponentSections,
    pub warnings: Vec<CompileWarning>,
}

/// Compile a component file into its output module.
pub fn compile_component(
    source: &str,
    options: &CompileOptions,
    registry: &TranslatorRegistry,
) -> Result<CompileOutput, CompileError> {
    let _span = tracing::debug_span!("compile_component", file = %options.file).entered();

    options.validate()?;

    let descriptor = parse_component(source)?;
    let root = descriptor.root().ok_or(ComponentParseError::MissingRoot)?;

    if options.check_markup_outside_root && has_markup_outside_root(Some(root.range()), source) {
        return Err(CompileError::MarkupOutsideRoot {
            root: root.name.clone(),
        });
    }

    let allocator = Allocator::default();
    let mut output = OutputTree::skeleton(&allocator, &root.name, options)?;

    let outcome = match descriptor.script_section(source) {
        Some(section) => Some(merge_script(&allocator, &mut output, &section, source, options, registry)?),
        None => None,
    };

    let code = output.to_code();
    tracing::debug!(name = %root.name, bytes = code.len(), "compiled component");

    let (style, dialect, component_interface, warnings) = match outcome {
        Some(outcome) => (
            Some(outcome.style),
            Some(outcome.dialect),
            outcome.component_interface,
            outcome.warnings,
        ),
        None => (None, None, None, Vec::new()),
    };

    Ok(CompileOutput {
        code,
        name: root.name.clone(),
        style,
        dialect,
        component_interface,
        sections: descriptor.sections(),
        warnings,
    })
}

/// A component file and the options to compile it with.
#[derive(Debug, Clone)]
pub struct ComponentSource {
    pub source: String,
    pub options: CompileOptions,
}

impl ComponentSource {
    pub fn new(source: impl Into<String>, options: CompileOptions) -> Self {
        Self {
            source: source.into(),
            options,
        }
    }
}

/// Compile independent components in parallel. Results keep the input order.
pub fn compile_components(
    inputs: &[ComponentSource],
    registry: &TranslatorRegistry,
) -> Vec<Result<CompileOutput, CompileError>> {
    inputs
        .par_iter()
        .map(|input| compile_component(&input.source, &input.options, registry))
        .collect()
}
