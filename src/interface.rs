//! Typed component interface detection and binding.
//!
//! A TypeScript component can describe its public shape with an exported type
//! alias or interface referencing the framework component contract:
//!
//! ```ts
//! export type MyComponent = RiotComponent<Props, State>
//! export interface MyComponent extends RiotComponent<Props, State> {}
//! ```
//!
//! When one is found the default export of the output module is asserted as
//! `RiotComponentWrapper<MyComponent>` and the wrapper type is imported from the
//! framework module.

use oxc_allocator::Allocator;
use oxc_ast::ast::*;
use oxc_ast::AstBuilder;
use oxc_ast_visit::Visit;
use oxc_span::{GetSpan, SPAN};
use serde::{Deserialize, Serialize};

use crate::error::{CompileError, CompileWarning};
use crate::options::{is_identifier_name, CompileOptions};
use crate::output::{OutputStage, OutputTree};
use crate::snippet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InterfaceKind {
    TypeAlias,
    Interface,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentInterface {
    pub name: String,
    pub kind: InterfaceKind,
    /// Range of the declaration in the component file
    pub start: u32,
    pub end: u32,
}

// ═══════════════════════════════════════════════════════════════════════════════
// DETECTION
// ═══════════════════════════════════════════════════════════════════════════════

/// Find the exported declaration describing the component. Type aliases win over
/// interfaces; within each group the first one in source order wins.
pub fn find_component_interface(program: &Program<'_>, contract: &str) -> Option<ComponentInterface> {
    let declarations: Vec<&Declaration<'_>> = program
        .body
        .iter()
        .filter_map(|stmt| match stmt {
            Statement::ExportNamedDeclaration(decl) => decl.declaration.as_ref(),
            _ => None,
        })
        .collect();

    let alias = declarations.iter().find_map(|decl| match decl {
        Declaration::TSTypeAliasDeclaration(alias) if references_contract(&alias.type_annotation, contract) => {
            Some(ComponentInterface {
                name: alias.id.name.to_string(),
                kind: InterfaceKind::TypeAlias,
                start: alias.span.start,
                end: alias.span.end,
            })
        }
        _ => None,
    });

    alias.or_else(|| {
        declarations.iter().find_map(|decl| match decl {
            Declaration::TSInterfaceDeclaration(iface) if extends_contract(iface, contract) => {
                Some(ComponentInterface {
                    name: iface.id.name.to_string(),
                    kind: InterfaceKind::Interface,
                    start: iface.span.start,
                    end: iface.span.end,
                })
            }
            _ => None,
        })
    })
}

/// The whole annotation, or one member of a union, is a reference to the contract.
fn references_contract(ty: &TSType<'_>, contract: &str) -> bool {
    match ty {
        TSType::TSUnionType(union) => union.types.iter().any(|member| is_contract_reference(member, contract)),
        other => is_contract_reference(other, contract),
    }
}

fn is_contract_reference(ty: &TSType<'_>, contract: &str) -> bool {
    match ty {
        TSType::TSTypeReference(reference) => {
            matches!(&reference.type_name, TSTypeName::IdentifierReference(id) if id.name == contract)
        }
        TSType::TSParenthesizedType(paren) => is_contract_reference(&paren.type_annotation, contract),
        _ => false,
    }
}

fn extends_contract(iface: &TSInterfaceDeclaration<'_>, contract: &str) -> bool {
    let mut finder = HeritageFinder { contract, found: false };
    finder.visit_ts_interface_declaration(iface);
    finder.found
}

/// Looks for `extends <contract>` clauses of an interface declaration.
struct HeritageFinder<'c> {
    contract: &'c str,
    found: bool,
}

impl<'a> Visit<'a> for HeritageFinder<'_> {
    fn visit_ts_interface_heritage(&mut self, heritage: &TSInterfaceHeritage<'a>) {
        if let Expression::Identifier(id) = &heritage.expression {
            if id.name == self.contract {
                self.found = true;
            }
        }
    }

    fn visit_ts_interface_body(&mut self, _body: &TSInterfaceBody<'a>) {}
}

// ═══════════════════════════════════════════════════════════════════════════════
// BINDING
// ═══════════════════════════════════════════════════════════════════════════════

enum ImportPlan {
    /// The wrapper is already imported from the framework module
    Present,
    /// Append the wrapper specifier to the import at this index
    Append(usize),
    /// Prepend a new import statement
    Prepend,
}

fn plan_import(body: &[Statement<'_>], module: &str, wrapper: &str) -> ImportPlan {
    let mut append_to = None;

    for (idx, stmt) in body.iter().enumerate() {
        let Statement::ImportDeclaration(decl) = stmt else {
            continue;
        };
        if decl.source.value != module {
            continue;
        }

        let Some(specifiers) = &decl.specifiers else {
            append_to.get_or_insert(idx);
            continue;
        };

        let mut namespace = false;
        for specifier in specifiers {
            match specifier {
                ImportDeclarationSpecifier::ImportSpecifier(s) if s.local.name == wrapper => {
                    return ImportPlan::Present;
                }
                ImportDeclarationSpecifier::ImportNamespaceSpecifier(_) => namespace = true,
                _ => {}
            }
        }

        if !namespace {
            append_to.get_or_insert(idx);
        }
    }

    append_to.map_or(ImportPlan::Prepend, ImportPlan::Append)
}

/// Nodes synthesized for one interface binding, built before the output tree is
/// touched.
pub struct InterfaceBinding<'a> {
    interface: ComponentInterface,
    import: oxc_allocator::Box<'a, ImportDeclaration<'a>>,
    assertion: oxc_allocator::Box<'a, TSAsExpression<'a>>,
}

impl std::fmt::Debug for InterfaceBinding<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterfaceBinding")
            .field("interface", &self.interface)
            .finish()
    }
}

/// Build the wrapper import and the type assertion for `interface`.
///
/// Every fallible step of the binding happens here, so a caller can prepare the
/// binding before mutating the output tree.
pub fn prepare_interface_binding<'a>(
    allocator: &'a Allocator,
    interface: &ComponentInterface,
    options: &CompileOptions,
) -> Result<InterfaceBinding<'a>, CompileError> {
    let wrapper = options.component_wrapper.as_str();
    if !is_identifier_name(wrapper) {
        return Err(CompileError::InvalidOptions(format!(
            "componentWrapper \"{}\" is not a valid identifier",
            wrapper
        )));
    }

    let module = serde_json::to_string(&options.framework_module)
        .map_err(|e| CompileError::InvalidOptions(e.to_string()))?;
    let import = snippet::statement(allocator, &format!("import {{ {} }} from {}", wrapper, module), true)
        .map_err(CompileError::InvalidOptions)?;

    let invalid_name = || {
        CompileError::InvalidOptions(format!(
            "interface name \"{}\" is not a type name",
            interface.name
        ))
    };
    let assertion = snippet::expression(
        allocator,
        &format!("undefined as {}<{}>", wrapper, interface.name),
        true,
    )
    .map_err(|_| invalid_name())?;

    let (Statement::ImportDeclaration(import), Expression::TSAsExpression(assertion)) = (import, assertion) else {
        return Err(invalid_name());
    };

    // the name is spliced as text; it must come back as exactly one type reference
    let mut names = TypeNameCollector::default();
    names.visit_ts_type(&assertion.type_annotation);
    if names.names != [wrapper, interface.name.as_str()] {
        return Err(invalid_name());
    }

    Ok(InterfaceBinding {
        interface: interface.clone(),
        import,
        assertion,
    })
}

#[derive(Default)]
struct TypeNameCollector {
    names: Vec<String>,
}

impl<'a> Visit<'a> for TypeNameCollector {
    fn visit_identifier_reference(&mut self, id: &IdentifierReference<'a>) {
        self.names.push(id.name.to_string());
    }
}

impl<'a> InterfaceBinding<'a> {
    pub fn interface(&self) -> &ComponentInterface {
        &self.interface
    }

    /// Assert the default export of the output tree as the component wrapper type
    /// and import the wrapper type from the framework module.
    ///
    /// Runs once, after the script merge. The tree is left untouched on error.
    pub fn apply(
        self,
        allocator: &'a Allocator,
        output: &mut OutputTree<'a>,
        options: &CompileOptions,
    ) -> Result<Vec<CompileWarning>, CompileError> {
        match output.stage() {
            OutputStage::Pristine => {
                return Err(CompileError::StageOrder(
                    "the component interface can only be bound after the script merge",
                ))
            }
            OutputStage::InterfaceBound => {
                return Err(CompileError::StageOrder(
                    "the component interface was already bound to this output tree",
                ))
            }
            OutputStage::ScriptMerged => {}
        }

        let InterfaceBinding {
            interface,
            mut import,
            mut assertion,
        } = self;

        let has_export = output.program.body.iter().any(|stmt| {
            matches!(stmt, Statement::ExportDefaultDeclaration(decl) if decl.declaration.is_expression())
        });
        if !has_export {
            let warning = CompileWarning::MissingDefaultExport {
                interface: interface.name,
            };
            tracing::warn!(file = %options.file, "{}", warning);
            return Ok(vec![warning]);
        }

        let ast = AstBuilder::new(allocator);
        let program = &mut output.program;

        for stmt in program.body.iter_mut() {
            let Statement::ExportDefaultDeclaration(decl) = stmt else {
                continue;
            };
            if !decl.declaration.is_expression() {
                continue;
            }

            let placeholder =
                ExportDefaultDeclarationKind::Identifier(ast.alloc_identifier_reference(SPAN, "undefined"));
            let value = std::mem::replace(&mut decl.declaration, placeholder).into_expression();
            assertion.span = value.span();
            assertion.expression = value;
            decl.declaration = ExportDefaultDeclarationKind::TSAsExpression(assertion);
            break;
        }

        match plan_import(&program.body, &options.framework_module, &options.component_wrapper) {
            ImportPlan::Present => {}
            ImportPlan::Append(idx) => {
                if let (Statement::ImportDeclaration(existing), Some(new_specifiers)) =
                    (&mut program.body[idx], import.specifiers.take())
                {
                    match &mut existing.specifiers {
                        Some(specifiers) => specifiers.extend(new_specifiers),
                        None => existing.specifiers = Some(new_specifiers),
                    }
                }
            }
            ImportPlan::Prepend => {
                program.body.insert(0, Statement::ImportDeclaration(import));
            }
        }

        output.advance(OutputStage::InterfaceBound);
        tracing::debug!(file = %options.file, interface = %interface.name, "bound component interface");

        Ok(Vec::new())
    }
}

/// Prepare and apply an interface binding in one step.
pub fn bind_component_interface<'a>(
    allocator: &'a Allocator,
    output: &mut OutputTree<'a>,
    interface: &ComponentInterface,
    options: &CompileOptions,
) -> Result<Vec<CompileWarning>, CompileError> {
    prepare_interface_binding(allocator, interface, options)?.apply(allocator, output, options)
}
