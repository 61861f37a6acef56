//! Authoring style classification and export normalization.
//!
//! Component scripts come in two flavours. The modern one default-exports the
//! component logic; the legacy one decorates the implicit component context
//! (`this.x = ...`) from top-level statements. Both are reduced to one value that
//! replaces the placeholder of the output tree, plus the statements that must be
//! hoisted to the module scope of the output.

use oxc_allocator::Allocator;
use oxc_ast::ast::*;
use oxc_ast::AstBuilder;
use oxc_ast_visit::{walk_mut, VisitMut};
use oxc_span::{GetSpan, Span, SPAN};
use oxc_syntax::scope::ScopeFlags;
use serde::{Deserialize, Serialize};

use crate::error::{CompileError, SourceLocation};
use crate::options::{is_identifier_name, CompileOptions};
use crate::script::SyntaxTree;
use crate::snippet;

// ═══════════════════════════════════════════════════════════════════════════════
// STATEMENT KINDS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StatementKind {
    Import,
    NamedExport,
    DefaultExport,
    TypeAliasExport,
    InterfaceExport,
    /// Top-level statement acting on the implicit component context
    ImplicitContext,
    Other,
}

impl StatementKind {
    pub fn is_named_export(self) -> bool {
        matches!(
            self,
            StatementKind::NamedExport | StatementKind::TypeAliasExport | StatementKind::InterfaceExport
        )
    }
}

pub fn classify_statement(stmt: &Statement<'_>) -> StatementKind {
    match stmt {
        Statement::ImportDeclaration(_) => StatementKind::Import,
        Statement::ExportDefaultDeclaration(decl) => match &decl.declaration {
            ExportDefaultDeclarationKind::TSInterfaceDeclaration(_) => StatementKind::InterfaceExport,
            _ => StatementKind::DefaultExport,
        },
        Statement::ExportNamedDeclaration(decl) => match &decl.declaration {
            Some(Declaration::TSTypeAliasDeclaration(_)) => StatementKind::TypeAliasExport,
            Some(Declaration::TSInterfaceDeclaration(_)) => StatementKind::InterfaceExport,
            None if decl.export_kind.is_value() && default_specifier(&decl.specifiers).is_some() => {
                StatementKind::DefaultExport
            }
            _ => StatementKind::NamedExport,
        },
        Statement::ExportAllDeclaration(decl) => match &decl.exported {
            Some(name) if module_export_name(name) == "default" => StatementKind::DefaultExport,
            _ => StatementKind::NamedExport,
        },
        Statement::ExpressionStatement(stmt) if acts_on_context(&stmt.expression) => {
            StatementKind::ImplicitContext
        }
        _ => StatementKind::Other,
    }
}

fn module_export_name<'n>(name: &'n ModuleExportName<'_>) -> &'n str {
    match name {
        ModuleExportName::IdentifierName(id) => id.name.as_str(),
        ModuleExportName::IdentifierReference(id) => id.name.as_str(),
        ModuleExportName::StringLiteral(lit) => lit.value.as_str(),
    }
}

/// Index of the `x as default` specifier of an export list.
fn default_specifier(specifiers: &[ExportSpecifier<'_>]) -> Option<usize> {
    specifiers
        .iter()
        .position(|spec| spec.export_kind.is_value() && module_export_name(&spec.exported) == "default")
}

/// `this.x = ...`, `this.x++`, `this.x.y(...)` and friends.
fn acts_on_context(expr: &Expression<'_>) -> bool {
    match expr {
        Expression::AssignmentExpression(assign) => match &assign.left {
            AssignmentTarget::StaticMemberExpression(member) => is_context_rooted(&member.object),
            AssignmentTarget::ComputedMemberExpression(member) => is_context_rooted(&member.object),
            _ => false,
        },
        Expression::UpdateExpression(update) => match &update.argument {
            SimpleAssignmentTarget::StaticMemberExpression(member) => is_context_rooted(&member.object),
            SimpleAssignmentTarget::ComputedMemberExpression(member) => is_context_rooted(&member.object),
            _ => false,
        },
        Expression::CallExpression(call) => match &call.callee {
            Expression::StaticMemberExpression(member) => is_context_rooted(&member.object),
            Expression::ComputedMemberExpression(member) => is_context_rooted(&member.object),
            _ => false,
        },
        Expression::ParenthesizedExpression(paren) => acts_on_context(&paren.expression),
        _ => false,
    }
}

fn is_context_rooted(expr: &Expression<'_>) -> bool {
    match expr {
        Expression::ThisExpression(_) => true,
        Expression::StaticMemberExpression(member) => is_context_rooted(&member.object),
        Expression::ComputedMemberExpression(member) => is_context_rooted(&member.object),
        Expression::ParenthesizedExpression(paren) => is_context_rooted(&paren.expression),
        _ => false,
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// AUTHORING STYLE
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AuthoringStyle {
    /// Neither a default export nor implicit context statements
    Unclassified,
    Modern,
    Legacy,
}

impl std::fmt::Display for AuthoringStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            AuthoringStyle::Unclassified => "unclassified",
            AuthoringStyle::Modern => "modern",
            AuthoringStyle::Legacy => "legacy",
        })
    }
}

/// Detect the authoring style of a script in a single pass over its top-level
/// statements.
pub fn detect_style(
    body: &[Statement<'_>],
    kinds: &[StatementKind],
    source: &str,
) -> Result<AuthoringStyle, CompileError> {
    let location = |stmt: &Statement<'_>| Some(SourceLocation::from_offset(source, stmt.span().start));

    let mut style = AuthoringStyle::Unclassified;
    let mut first_context: Option<&Statement<'_>> = None;

    for (stmt, kind) in body.iter().zip(kinds) {
        if *kind == StatementKind::ImplicitContext && first_context.is_none() {
            first_context = Some(stmt);
        }

        style = match (style, kind) {
            (AuthoringStyle::Unclassified, StatementKind::DefaultExport) => AuthoringStyle::Modern,
            (AuthoringStyle::Unclassified, StatementKind::ImplicitContext) => AuthoringStyle::Legacy,
            (AuthoringStyle::Modern, StatementKind::DefaultExport) => {
                return Err(CompileError::DuplicateDefaultExport {
                    location: location(stmt),
                });
            }
            (AuthoringStyle::Modern, StatementKind::ImplicitContext)
            | (AuthoringStyle::Legacy, StatementKind::DefaultExport) => {
                return Err(CompileError::DialectConflict {
                    location: first_context.and_then(location),
                });
            }
            (style, _) => style,
        };
    }

    Ok(style)
}

// ═══════════════════════════════════════════════════════════════════════════════
// NORMALIZATION
// ═══════════════════════════════════════════════════════════════════════════════

/// The canonical component logic and the statements moving to module scope.
pub struct NormalizedScript<'a> {
    pub style: AuthoringStyle,
    /// Value replacing the placeholder property; `None` for unclassified scripts
    pub export: Option<Expression<'a>>,
    /// Statements prepended to the output module body, in order
    pub hoisted: oxc_allocator::Vec<'a, Statement<'a>>,
}

impl std::fmt::Debug for NormalizedScript<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NormalizedScript")
            .field("style", &self.style)
            .field("has_export", &self.export.is_some())
            .field("hoisted", &self.hoisted.len())
            .finish()
    }
}

/// Reduce a parsed script to its normalized export.
///
/// Fails without side effects when the script mixes both authoring styles or
/// default-exports more than once.
pub fn normalize_script<'a>(
    allocator: &'a Allocator,
    tree: SyntaxTree<'a>,
    source: &str,
    options: &CompileOptions,
) -> Result<NormalizedScript<'a>, CompileError> {
    let kinds: Vec<StatementKind> = tree.program.body.iter().map(classify_statement).collect();
    let style = detect_style(&tree.program.body, &kinds, source)?;

    tracing::debug!(file = %options.file, %style, statements = kinds.len(), "classified component script");

    let ast = AstBuilder::new(allocator);
    let body = tree.program.body;

    match style {
        AuthoringStyle::Modern => {
            let mut hoisted = ast.vec();
            let mut export = None;

            for (stmt, kind) in body.into_iter().zip(kinds) {
                match kind {
                    StatementKind::DefaultExport => {
                        let (value, rest) = default_export_value(&ast, stmt, source)?;
                        export = value;
                        hoisted.extend(rest);
                    }
                    StatementKind::ImplicitContext => {}
                    _ => hoisted.push(stmt),
                }
            }

            Ok(NormalizedScript { style, export, hoisted })
        }
        AuthoringStyle::Legacy => {
            let mut imports = ast.vec();
            let mut named_exports = Vec::new();
            let mut absorbed = Vec::new();

            for (stmt, kind) in body.into_iter().zip(kinds) {
                match kind {
                    StatementKind::Import => imports.push(stmt),
                    kind if kind.is_named_export() => named_exports.push(stmt),
                    _ => absorbed.push(stmt),
                }
            }

            let export = legacy_export_function(allocator, absorbed, options, tree.dialect.is_typescript())?;
            imports.extend(named_exports);

            Ok(NormalizedScript {
                style,
                export: Some(export),
                hoisted: imports,
            })
        }
        AuthoringStyle::Unclassified => Ok(NormalizedScript {
            style,
            export: None,
            hoisted: body,
        }),
    }
}

/// Value of a default export, with declarations turned into expressions.
///
/// An export list keeps its other specifiers, returned as a statement to hoist.
fn default_export_value<'a>(
    ast: &AstBuilder<'a>,
    stmt: Statement<'a>,
    source: &str,
) -> Result<(Option<Expression<'a>>, Option<Statement<'a>>), CompileError> {
    let reexport = |span: Span| CompileError::DefaultReexport {
        location: Some(SourceLocation::from_offset(source, span.start)),
    };

    let decl = match stmt {
        Statement::ExportDefaultDeclaration(decl) => decl,
        Statement::ExportNamedDeclaration(mut decl) => {
            if decl.source.is_some() {
                return Err(reexport(decl.span));
            }
            let Some(idx) = default_specifier(&decl.specifiers) else {
                return Ok((None, Some(Statement::ExportNamedDeclaration(decl))));
            };

            let specifier = decl.specifiers.remove(idx);
            let value = match &specifier.local {
                ModuleExportName::IdentifierReference(id) => {
                    Some(ast.expression_identifier(id.span, ast.atom(&id.name)))
                }
                ModuleExportName::IdentifierName(id) => {
                    Some(ast.expression_identifier(id.span, ast.atom(&id.name)))
                }
                ModuleExportName::StringLiteral(_) => None,
            };
            let rest = (!decl.specifiers.is_empty()).then_some(Statement::ExportNamedDeclaration(decl));
            return Ok((value, rest));
        }
        Statement::ExportAllDeclaration(decl) => return Err(reexport(decl.span)),
        other => return Ok((None, Some(other))),
    };

    let value = match decl.unbox().declaration {
        ExportDefaultDeclarationKind::FunctionDeclaration(mut func) => {
            func.r#type = FunctionType::FunctionExpression;
            Some(Expression::FunctionExpression(func))
        }
        ExportDefaultDeclarationKind::ClassDeclaration(mut class) => {
            class.r#type = ClassType::ClassExpression;
            Some(Expression::ClassExpression(class))
        }
        kind if kind.is_expression() => Some(kind.into_expression()),
        _ => None,
    };
    Ok((value, None))
}

/// Build `function exports(<ctx> = this) { ...absorbed; return <ctx> }`.
fn legacy_export_function<'a>(
    allocator: &'a Allocator,
    absorbed: Vec<Statement<'a>>,
    options: &CompileOptions,
    typescript: bool,
) -> Result<Expression<'a>, CompileError> {
    if !is_identifier_name(&options.context_param) {
        return Err(CompileError::InvalidOptions(format!(
            "`contextParam` \"{}\" is not a valid identifier",
            options.context_param
        )));
    }

    let name = if is_identifier_name(&options.placeholder_key) {
        options.placeholder_key.as_str()
    } else {
        ""
    };
    let code = format!("function {}({} = this) {{}}", name, options.context_param);
    let mut export = snippet::expression(allocator, &code, typescript).map_err(CompileError::InvalidOptions)?;

    let ast = AstBuilder::new(allocator);
    let context: &'a str = allocator.alloc_str(&options.context_param);
    let mut rewriter = ContextRewriter { ast, context };

    if let Expression::FunctionExpression(func) = &mut export {
        if let Some(body) = &mut func.body {
            for mut stmt in absorbed {
                rewriter.visit_statement(&mut stmt);
                body.statements.push(stmt);
            }
            body.statements
                .push(ast.statement_return(SPAN, Some(ast.expression_identifier(SPAN, context))));
        }
    }

    Ok(export)
}

/// Replaces `this` with the explicit context parameter. Non-arrow functions and
/// class bodies bind their own `this` and are left alone; a class heritage clause
/// and computed member keys are evaluated in the enclosing scope.
struct ContextRewriter<'a> {
    ast: AstBuilder<'a>,
    context: &'a str,
}

impl<'a> VisitMut<'a> for ContextRewriter<'a> {
    fn visit_expression(&mut self, expr: &mut Expression<'a>) {
        if let Expression::ThisExpression(this) = expr {
            *expr = self.ast.expression_identifier(this.span, self.context);
            return;
        }
        walk_mut::walk_expression(self, expr);
    }

    fn visit_function(&mut self, _func: &mut Function<'a>, _flags: ScopeFlags) {}

    fn visit_class(&mut self, class: &mut Class<'a>) {
        if let Some(super_class) = &mut class.super_class {
            self.visit_expression(super_class);
        }
        for element in class.body.body.iter_mut() {
            match element {
                ClassElement::MethodDefinition(method) if method.computed => self.visit_property_key(&mut method.key),
                ClassElement::PropertyDefinition(prop) if prop.computed => self.visit_property_key(&mut prop.key),
                ClassElement::AccessorProperty(prop) if prop.computed => self.visit_property_key(&mut prop.key),
                _ => {}
            }
        }
    }
}
