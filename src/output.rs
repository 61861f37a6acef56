//! The output module under construction.
//!
//! The output tree is produced by the template stage. It holds exactly one
//! placeholder property (`exports: null` by default) marking where the component
//! logic goes. The script merge is the only writer of that property and runs once.

use oxc_allocator::Allocator;
use oxc_ast::ast::*;
use oxc_ast_visit::{walk, walk_mut, Visit, VisitMut};
use oxc_codegen::Codegen;
use oxc_parser::Parser;

use crate::classify::NormalizedScript;
use crate::error::{CompileError, CompileWarning, SourceLocation};
use crate::options::{
    is_identifier_name, CompileOptions, TAG_CSS_PROPERTY, TAG_NAME_PROPERTY, TAG_TEMPLATE_PROPERTY,
};
use crate::snippet::module_source_type;

/// Compile stages the output tree has gone through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum OutputStage {
    Pristine,
    ScriptMerged,
    InterfaceBound,
}

pub struct OutputTree<'a> {
    pub program: Program<'a>,
    stage: OutputStage,
}

impl std::fmt::Debug for OutputTree<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputTree")
            .field("stage", &self.stage)
            .field("statements", &self.program.body.len())
            .finish()
    }
}

impl<'a> OutputTree<'a> {
    pub fn from_program(program: Program<'a>) -> Self {
        Self {
            program,
            stage: OutputStage::Pristine,
        }
    }

    /// Parse an output module produced by an earlier stage.
    pub fn parse(allocator: &'a Allocator, code: &str, typescript: bool) -> Result<Self, CompileError> {
        let code: &'a str = allocator.alloc_str(code);
        let ret = Parser::new(allocator, code, module_source_type(typescript)).parse();

        if ret.panicked || !ret.errors.is_empty() {
            let first = ret.errors.first();
            let offset = first
                .and_then(|e| e.labels.as_ref())
                .and_then(|labels| labels.first())
                .map(|label| label.offset() as u32);

            return Err(CompileError::Parse {
                dialect: "output".to_string(),
                file: String::new(),
                message: first
                    .map(|e| e.message.to_string())
                    .unwrap_or_else(|| "unrecoverable syntax error".to_string()),
                location: offset.map(|offset| SourceLocation::from_offset(code, offset)),
            });
        }

        Ok(Self::from_program(ret.program))
    }

    /// Minimal output module of a component named `name`:
    /// `export default { css: null, exports: null, template: null, name: '<name>' }`.
    pub fn skeleton(allocator: &'a Allocator, name: &str, options: &CompileOptions) -> Result<Self, CompileError> {
        let quote = |text: &str| serde_json::to_string(text).unwrap_or_else(|_| format!("\"{}\"", text));
        let placeholder = if is_identifier_name(&options.placeholder_key) {
            options.placeholder_key.clone()
        } else {
            quote(&options.placeholder_key)
        };

        let code = format!(
            "export default {{\n  {}: null,\n  {}: null,\n  {}: null,\n  {}: {}\n}}\n",
            TAG_CSS_PROPERTY,
            placeholder,
            TAG_TEMPLATE_PROPERTY,
            TAG_NAME_PROPERTY,
            quote(name),
        );

        Self::parse(allocator, &code, false)
    }

    pub fn stage(&self) -> OutputStage {
        self.stage
    }

    pub(crate) fn advance(&mut self, stage: OutputStage) {
        self.stage = self.stage.max(stage);
    }

    /// Number of placeholder properties anywhere in the tree.
    pub fn count_placeholders(&self, key: &str) -> usize {
        let mut counter = PlaceholderCounter { key, count: 0 };
        counter.visit_program(&self.program);
        counter.count
    }

    /// Splice the normalized script into the tree: replace the placeholder value
    /// with the export and prepend the hoisted statements to the module body.
    ///
    /// The tree is left untouched when an error is returned.
    pub fn splice(
        &mut self,
        normalized: NormalizedScript<'a>,
        options: &CompileOptions,
    ) -> Result<Vec<CompileWarning>, CompileError> {
        if self.stage != OutputStage::Pristine {
            return Err(CompileError::StageOrder(
                "the component script was already merged into this output tree",
            ));
        }

        let key = options.placeholder_key.as_str();
        let count = self.count_placeholders(key);
        if count > 1 {
            return Err(CompileError::MultiplePlaceholders {
                key: key.to_string(),
                count,
            });
        }

        let mut warnings = Vec::new();

        if let Some(export) = normalized.export {
            if count == 0 {
                let warning = CompileWarning::MissingPlaceholder { key: key.to_string() };
                tracing::warn!(file = %options.file, "{}", warning);
                warnings.push(warning);
            } else {
                let mut splicer = PlaceholderSplicer {
                    key,
                    replacement: Some(export),
                };
                splicer.visit_program(&mut self.program);
            }
        }

        let hoisted = normalized.hoisted.len();
        let previous = std::mem::replace(&mut self.program.body, normalized.hoisted);
        self.program.body.extend(previous);
        self.stage = OutputStage::ScriptMerged;

        tracing::debug!(file = %options.file, hoisted, style = %normalized.style, "spliced component script");

        Ok(warnings)
    }

    pub fn to_code(&self) -> String {
        Codegen::new().build(&self.program).code
    }
}

pub(crate) fn is_placeholder(prop: &ObjectProperty<'_>, key: &str) -> bool {
    if prop.computed || prop.method || prop.kind != PropertyKind::Init {
        return false;
    }
    match &prop.key {
        PropertyKey::StaticIdentifier(id) => id.name == key,
        PropertyKey::StringLiteral(lit) => lit.value == key,
        _ => false,
    }
}

struct PlaceholderCounter<'k> {
    key: &'k str,
    count: usize,
}

impl<'a> Visit<'a> for PlaceholderCounter<'_> {
    fn visit_object_property(&mut self, prop: &ObjectProperty<'a>) {
        if is_placeholder(prop, self.key) {
            self.count += 1;
        }
        walk::walk_object_property(self, prop);
    }
}

/// Depth-first replacement of the first placeholder value. Traversal stops once
/// the replacement is consumed.
struct PlaceholderSplicer<'a, 'k> {
    key: &'k str,
    replacement: Option<Expression<'a>>,
}

impl<'a> VisitMut<'a> for PlaceholderSplicer<'a, '_> {
    fn visit_statement(&mut self, stmt: &mut Statement<'a>) {
        if self.replacement.is_some() {
            walk_mut::walk_statement(self, stmt);
        }
    }

    fn visit_expression(&mut self, expr: &mut Expression<'a>) {
        if self.replacement.is_some() {
            walk_mut::walk_expression(self, expr);
        }
    }

    fn visit_object_property(&mut self, prop: &mut ObjectProperty<'a>) {
        if is_placeholder(prop, self.key) {
            if let Some(value) = self.replacement.take() {
                prop.value = value;
                prop.shorthand = false;
            }
            return;
        }
        walk_mut::walk_object_property(self, prop);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::AuthoringStyle;
    use crate::snippet;
    use oxc_ast::AstBuilder;

    fn normalized<'a>(allocator: &'a Allocator, export: Option<&str>, hoisted: &str) -> NormalizedScript<'a> {
        NormalizedScript {
            style: if export.is_some() {
                AuthoringStyle::Modern
            } else {
                AuthoringStyle::Unclassified
            },
            export: export.map(|code| snippet::expression(allocator, code, false).unwrap()),
            hoisted: if hoisted.is_empty() {
                AstBuilder::new(allocator).vec()
            } else {
                snippet::statements(allocator, hoisted, false).unwrap()
            },
        }
    }

    fn normalize_code(code: &str) -> String {
        let allocator = Allocator::default();
        OutputTree::parse(&allocator, code, true).unwrap().to_code()
    }

    #[test]
    fn test_skeleton() {
        let allocator = Allocator::default();
        let tree = OutputTree::skeleton(&allocator, "my-tag", &CompileOptions::default()).unwrap();
        assert_eq!(tree.count_placeholders("exports"), 1);
        assert_eq!(tree.stage(), OutputStage::Pristine);
        assert!(tree.to_code().contains("\"my-tag\""));
    }

    #[test]
    fn test_splice_replaces_placeholder_and_hoists() {
        let allocator = Allocator::default();
        let mut tree = OutputTree::parse(&allocator, "export default { exports: null, name: 'x' }", false).unwrap();
        let warnings = tree
            .splice(
                normalized(&allocator, Some("{ state: {} }"), "import a from 'a'\nconst b = 1"),
                &CompileOptions::default(),
            )
            .unwrap();

        assert!(warnings.is_empty());
        assert_eq!(tree.stage(), OutputStage::ScriptMerged);
        assert_eq!(
            tree.to_code(),
            normalize_code("import a from 'a'\nconst b = 1\nexport default { exports: { state: {} }, name: 'x' }")
        );
    }

    #[test]
    fn test_splice_string_key_and_nested_placeholder() {
        let allocator = Allocator::default();
        let mut tree = OutputTree::parse(
            &allocator,
            "const meta = { inner: { 'exports': null } }\nexport default meta",
            false,
        )
        .unwrap();
        tree.splice(normalized(&allocator, Some("() => 1"), ""), &CompileOptions::default())
            .unwrap();

        assert_eq!(
            tree.to_code(),
            normalize_code("const meta = { inner: { 'exports': () => 1 } }\nexport default meta")
        );
    }

    #[test]
    fn test_missing_placeholder_warns() {
        let allocator = Allocator::default();
        let mut tree = OutputTree::parse(&allocator, "export default { name: 'x' }", false).unwrap();
        let warnings = tree
            .splice(normalized(&allocator, Some("{}"), ""), &CompileOptions::default())
            .unwrap();
        assert_eq!(
            warnings,
            vec![CompileWarning::MissingPlaceholder { key: "exports".to_string() }]
        );
    }

    #[test]
    fn test_multiple_placeholders_rejected_before_mutation() {
        let allocator = Allocator::default();
        let code = "export default { exports: null, nested: { exports: null } }";
        let mut tree = OutputTree::parse(&allocator, code, false).unwrap();
        let before = tree.to_code();

        let err = tree
            .splice(normalized(&allocator, Some("{}"), "const a = 1"), &CompileOptions::default())
            .unwrap_err();

        assert!(matches!(err, CompileError::MultiplePlaceholders { count: 2, .. }));
        assert_eq!(tree.to_code(), before);
        assert_eq!(tree.stage(), OutputStage::Pristine);
    }

    #[test]
    fn test_second_splice_is_rejected() {
        let allocator = Allocator::default();
        let mut tree = OutputTree::skeleton(&allocator, "x", &CompileOptions::default()).unwrap();
        tree.splice(normalized(&allocator, Some("{}"), ""), &CompileOptions::default())
            .unwrap();
        let err = tree
            .splice(normalized(&allocator, Some("{}"), ""), &CompileOptions::default())
            .unwrap_err();
        assert_eq!(err.code(), "STAGE_ORDER");
    }

    #[test]
    fn test_unclassified_leaves_placeholder() {
        let allocator = Allocator::default();
        let mut tree = OutputTree::parse(&allocator, "export default { exports: null }", false).unwrap();
        tree.splice(normalized(&allocator, None, "console.log(1)"), &CompileOptions::default())
            .unwrap();
        assert_eq!(
            tree.to_code(),
            normalize_code("console.log(1)\nexport default { exports: null }")
        );
    }

    #[test]
    fn test_methods_and_computed_keys_are_not_placeholders() {
        let allocator = Allocator::default();
        let tree = OutputTree::parse(
            &allocator,
            "export default { exports() {}, ['exports']: null, get exports() { return 1 } }",
            false,
        )
        .unwrap();
        assert_eq!(tree.count_placeholders("exports"), 0);
    }
}
