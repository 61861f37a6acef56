use oxc_allocator::Allocator;

use crate::classify::AuthoringStyle;
use crate::error::{BoxError, CompileError};
use crate::interface::InterfaceKind;
use crate::options::CompileOptions;
use crate::output::{OutputStage, OutputTree};
use crate::pipeline::{compile_component, compile_components, merge_script, ComponentSource};
use crate::position_map::{OffsetMapping, PositionMap};
use crate::script::ScriptSection;
use crate::translate::{Dialect, TranslateOptions, TranslationResult, TranslatorRegistry};

fn normalize(code: &str) -> String {
    let allocator = Allocator::default();
    OutputTree::parse(&allocator, code, true).unwrap().to_code()
}

fn compile(source: &str) -> crate::pipeline::CompileOutput {
    compile_component(source, &CompileOptions::new("my-tag.riot"), &TranslatorRegistry::new()).unwrap()
}

/// Registers a translator that inserts `prelude` in front of the script.
fn prelude_registry(prelude: &'static str) -> TranslatorRegistry {
    let mut registry = TranslatorRegistry::new();
    registry.register(
        "prelude",
        move |source: &str, _: &TranslateOptions<'_>| -> Result<TranslationResult, BoxError> {
            let map = PositionMap::new(vec![OffsetMapping {
                generated: prelude.len() as u32,
                original: 0,
            }]);
            Ok(TranslationResult::new(format!("{}{}", prelude, source)).with_position_map(map))
        },
    );
    registry
}

// ═══════════════════════════════════════════════════════════════════════════════
// MODERN
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_modern_export_replaces_placeholder() {
    let output = compile(
        r#"<my-tag>
  <p>{ state.message }</p>
  <script>
    import { helper } from './helper'
    const local = 1
    export default { state: { message: 'hi' } }
  </script>
</my-tag>"#,
    );

    assert_eq!(output.style, Some(AuthoringStyle::Modern));
    assert_eq!(output.dialect.as_deref(), Some("javascript"));
    assert!(output.warnings.is_empty());
    assert_eq!(
        output.code,
        normalize(
            r#"import { helper } from './helper'
const local = 1
export default {
  css: null,
  exports: { state: { message: 'hi' } },
  template: null,
  name: "my-tag"
}"#
        )
    );
}

#[test]
fn test_modern_function_export() {
    let output = compile("<my-tag><script>export default function MyTag() { return {} }</script></my-tag>");
    assert_eq!(
        output.code,
        normalize(
            r#"export default {
  css: null,
  exports: function MyTag() { return {} },
  template: null,
  name: "my-tag"
}"#
        )
    );
}

#[test]
fn test_export_list_default_replaces_placeholder() {
    let output = compile("<my-tag><script>const c = { a: 1 }\nexport { c as default }</script></my-tag>");

    assert_eq!(output.style, Some(AuthoringStyle::Modern));
    assert_eq!(
        output.code,
        normalize(
            r#"const c = { a: 1 }
export default {
  css: null,
  exports: c,
  template: null,
  name: "my-tag"
}"#
        )
    );
}

#[test]
fn test_default_reexport_is_an_error() {
    let err = compile_component(
        "<my-tag><script>export { default } from './logic'</script></my-tag>",
        &CompileOptions::default(),
        &TranslatorRegistry::new(),
    )
    .unwrap_err();
    assert_eq!(err.code(), "DEFAULT_REEXPORT");
}

#[test]
fn test_custom_placeholder_key() {
    let options = CompileOptions {
        placeholder_key: "logic".to_string(),
        ..Default::default()
    };
    let output = compile_component(
        "<my-tag><script>export default { a: 1 }</script></my-tag>",
        &options,
        &TranslatorRegistry::new(),
    )
    .unwrap();

    assert!(output.code.contains("logic"));
    assert!(!output.code.contains("exports"));
}

// ═══════════════════════════════════════════════════════════════════════════════
// LEGACY
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_legacy_script_becomes_function() {
    let output = compile(
        r#"<my-tag>
  <script>
    import { helper } from './helper'
    this.state = { count: 0 }
    export const shared = 1
    this.increment = () => { this.state.count++ }
    function local() { return this }
  </script>
</my-tag>"#,
    );

    assert_eq!(output.style, Some(AuthoringStyle::Legacy));
    assert_eq!(
        output.code,
        normalize(
            r#"import { helper } from './helper'
export const shared = 1
export default {
  css: null,
  exports: function exports(__component__ = this) {
    __component__.state = { count: 0 };
    __component__.increment = () => { __component__.state.count++ };
    function local() { return this }
    return __component__;
  },
  template: null,
  name: "my-tag"
}"#
        )
    );
}

#[test]
fn test_unclassified_script_is_hoisted() {
    let output = compile("<my-tag><script>const a = 1</script></my-tag>");

    assert_eq!(output.style, Some(AuthoringStyle::Unclassified));
    assert_eq!(
        output.code,
        normalize(
            r#"const a = 1
export default {
  css: null,
  exports: null,
  template: null,
  name: "my-tag"
}"#
        )
    );
}

// ═══════════════════════════════════════════════════════════════════════════════
// ERRORS
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_conflict_leaves_output_untouched() {
    let source = "<my-tag><script>this.a = 1\nexport default {}</script></my-tag>";
    let start = source.find("this.a").unwrap();
    let end = source.find("</script>").unwrap();
    let section = ScriptSection::new(&source[start..end], start as u32);

    let allocator = Allocator::default();
    let options = CompileOptions::default();
    let mut output = OutputTree::skeleton(&allocator, "my-tag", &options).unwrap();
    let before = output.to_code();

    let err = merge_script(&allocator, &mut output, &section, source, &options, &TranslatorRegistry::new())
        .unwrap_err();

    assert!(matches!(err, CompileError::DialectConflict { .. }));
    assert!(err.to_string().contains("cannot mix an explicit default export"));
    assert_eq!(err.location().unwrap().offset, start as u32);
    assert_eq!(output.to_code(), before);
    assert_eq!(output.stage(), OutputStage::Pristine);
}

#[test]
fn test_unsupported_dialect() {
    let err = compile_component(
        r#"<my-tag><script type="coffee">a = 1</script></my-tag>"#,
        &CompileOptions::default(),
        &TranslatorRegistry::new(),
    )
    .unwrap_err();
    assert_eq!(err.code(), "UNSUPPORTED_DIALECT");
}

#[test]
fn test_markup_outside_root() {
    let source = "<my-tag><p>hi</p></my-tag>\n<div>stray</div>";

    let err = compile_component(source, &CompileOptions::default(), &TranslatorRegistry::new()).unwrap_err();
    assert!(matches!(err, CompileError::MarkupOutsideRoot { ref root } if root == "my-tag"));

    let options = CompileOptions {
        check_markup_outside_root: false,
        ..Default::default()
    };
    let output = compile_component(source, &options, &TranslatorRegistry::new()).unwrap();
    assert_eq!(output.name, "my-tag");
}

#[test]
fn test_text_outside_root_is_accepted() {
    let output = compile("<!-- license -->\n<my-tag></my-tag>\ntrailing text");
    assert_eq!(output.name, "my-tag");
}

// ═══════════════════════════════════════════════════════════════════════════════
// POSITIONS
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_translated_conflict_location_points_into_component() {
    let registry = prelude_registry("void 0;\n");
    let source = "<my-tag>\n  <script type=\"prelude\">\n    export default {}\n    this.a = 1\n  </script>\n</my-tag>";

    let err = compile_component(source, &CompileOptions::default(), &registry).unwrap_err();

    let location = err.location().unwrap();
    assert_eq!(location.offset, source.find("this.a").unwrap() as u32);
    assert_eq!((location.line, location.column), (4, 5));
}

#[test]
fn test_untranslated_parse_error_location() {
    let source = "<my-tag>\n<script>\nconst a = 1\nconst = 2\n</script>\n</my-tag>";
    let err = compile_component(source, &CompileOptions::new("my-tag.riot"), &TranslatorRegistry::new())
        .unwrap_err();

    assert_eq!(err.code(), "PARSE_ERROR");
    assert_eq!(err.location().unwrap().line, 4);
}

#[test]
fn test_registered_translator_compiles() {
    let registry = prelude_registry("void 0;\n");
    let output = compile_component(
        r#"<my-tag><script type="prelude">export default { a: 1 }</script></my-tag>"#,
        &CompileOptions::default(),
        &registry,
    )
    .unwrap();

    assert_eq!(output.dialect.as_deref(), Some("prelude"));
    assert_eq!(output.style, Some(AuthoringStyle::Modern));
    assert!(output.code.starts_with("void 0;"));
}

// ═══════════════════════════════════════════════════════════════════════════════
// INTERFACE
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_typescript_interface_is_bound() {
    let output = compile(
        r#"<my-tag>
  <script lang="ts">
    import { RiotComponent } from 'riot'
    export type MyTag = RiotComponent<{ name: string }>
    export default { state: { a: 1 } }
  </script>
</my-tag>"#,
    );

    let interface = output.component_interface.unwrap();
    assert_eq!(interface.name, "MyTag");
    assert_eq!(interface.kind, InterfaceKind::TypeAlias);
    assert_eq!(
        output.code,
        normalize(
            r#"import { RiotComponent, RiotComponentWrapper } from 'riot'
export type MyTag = RiotComponent<{ name: string }>
export default {
  css: null,
  exports: { state: { a: 1 } },
  template: null,
  name: "my-tag"
} as RiotComponentWrapper<MyTag>"#
        )
    );
}

#[test]
fn test_non_ascii_interface_name_is_bound() {
    let output = compile(
        "<my-tag><script lang=\"ts\">import { RiotComponent } from 'riot'\n\
         export type Компонент = RiotComponent\n\
         export default { a: 1 }</script></my-tag>",
    );

    assert_eq!(output.component_interface.unwrap().name, "Компонент");
    assert_eq!(
        output.code,
        normalize(
            r#"import { RiotComponent, RiotComponentWrapper } from 'riot'
export type Компонент = RiotComponent
export default {
  css: null,
  exports: { a: 1 },
  template: null,
  name: "my-tag"
} as RiotComponentWrapper<Компонент>"#
        )
    );
}

#[test]
fn test_failed_binding_leaves_output_untouched() {
    let source = "import x from 'x'\nexport type MyTag = RiotComponent\nexport default { a: x }";
    let section = ScriptSection::new(source, 0).with_dialect(Dialect::TypeScript);
    let options = CompileOptions {
        component_wrapper: "Not A Wrapper".to_string(),
        ..Default::default()
    };

    let allocator = Allocator::default();
    let mut output = OutputTree::skeleton(&allocator, "my-tag", &options).unwrap();
    let before = output.to_code();

    let err = merge_script(&allocator, &mut output, &section, source, &options, &TranslatorRegistry::new())
        .unwrap_err();

    assert_eq!(err.code(), "INVALID_OPTIONS");
    assert_eq!(output.stage(), OutputStage::Pristine);
    assert_eq!(output.to_code(), before);
}

#[test]
fn test_javascript_skips_interface_detection() {
    let allocator = Allocator::default();
    let options = CompileOptions::default();
    let code = "export default {}";
    let section = ScriptSection::new(code, 0).with_dialect(Dialect::JavaScript);
    let mut output = OutputTree::skeleton(&allocator, "a", &options).unwrap();

    let outcome = merge_script(&allocator, &mut output, &section, code, &options, &TranslatorRegistry::new())
        .unwrap();

    assert!(outcome.component_interface.is_none());
    assert_eq!(output.stage(), OutputStage::ScriptMerged);
}

#[test]
fn test_typescript_without_interface_is_not_bound() {
    let output = compile("<my-tag><script lang=\"ts\">export default { a: 1 as number }</script></my-tag>");
    assert!(output.component_interface.is_none());
    assert!(!output.code.contains("RiotComponentWrapper"));
}

// ═══════════════════════════════════════════════════════════════════════════════
// DETERMINISM
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_compile_is_deterministic() {
    let source = "<my-tag><script>this.a = 1\nthis.b = () => this.a</script></my-tag>";
    assert_eq!(compile(source), compile(source));
}

#[test]
fn test_parallel_compile_keeps_order() {
    let inputs = vec![
        ComponentSource::new("<a-tag><script>export default { a: 1 }</script></a-tag>", CompileOptions::new("a")),
        ComponentSource::new("<b-tag></b-tag><i>x</i>", CompileOptions::new("b")),
        ComponentSource::new("<c-tag><script>this.c = 1</script></c-tag>", CompileOptions::new("c")),
    ];

    let results = compile_components(&inputs, &TranslatorRegistry::new());

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].as_ref().unwrap().name, "a-tag");
    assert_eq!(results[1].as_ref().unwrap_err().code(), "MARKUP_OUTSIDE_ROOT");
    assert_eq!(results[2].as_ref().unwrap().style, Some(AuthoringStyle::Legacy));

    for (input, result) in inputs.iter().zip(&results) {
        let sequential = compile_component(&input.source, &input.options, &TranslatorRegistry::new());
        assert_eq!(sequential.is_ok(), result.is_ok());
        if let (Ok(a), Ok(b)) = (sequential, result) {
            assert_eq!(&a, b);
        }
    }
}
