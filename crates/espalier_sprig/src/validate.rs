//! Structural validation of a component source file.
//!
//! Validation never mutates anything and never stops at the first
//! problem. File-level checks always run; once a component function fails
//! one of its own checks, the remaining checks for that function are
//! skipped so one root cause does not fan out into a diagnostic storm.

use espalier_trellis::{DiagnosticSink, FxHashMap};
use oxc_ast::ast::{
    Argument, CallExpression, Expression, ImportDeclarationSpecifier, Program, Statement,
    VariableDeclarationKind,
};
use oxc_span::GetSpan;

use crate::discover::{template_tags, DiscoveredComponent};
use crate::macros::{resolve_macro_callee, MacroKind, REACTIVITY_APIS, STYLE_LANGS};
use crate::walk::{walk_expression, walk_statement};

/// Run the full validation battery over a parsed file.
///
/// Running twice on the same tree produces the same ordered diagnostic
/// list; nothing here depends on map iteration order.
pub fn validate<'a>(
    source: &str,
    program: &'a Program<'a>,
    components: &[DiscoveredComponent<'a>],
    runtime_module: &str,
    sink: &mut DiagnosticSink,
) {
    let aliases = runtime_import_aliases(program, runtime_module);

    check_top_level_statements(program, components, sink);
    check_top_level_reactivity(program, &aliases, sink);

    for component in components {
        validate_component(source, component, sink);
    }
}

/// Local name -> imported name for specifiers coming from the runtime
/// module, so the reactivity denylist catches aliased imports.
fn runtime_import_aliases<'a>(
    program: &'a Program<'a>,
    runtime_module: &str,
) -> FxHashMap<String, String> {
    let mut aliases: FxHashMap<String, String> = FxHashMap::default();
    for stmt in program.body.iter() {
        let Statement::ImportDeclaration(import) = stmt else {
            continue;
        };
        if import.source.value.as_str() != runtime_module {
            continue;
        }
        let Some(specifiers) = &import.specifiers else {
            continue;
        };
        for specifier in specifiers.iter() {
            if let ImportDeclarationSpecifier::ImportSpecifier(spec) = specifier {
                aliases.insert(
                    spec.local.name.to_string(),
                    spec.imported.name().to_string(),
                );
            }
        }
    }
    aliases
}

fn is_component_stmt(components: &[DiscoveredComponent<'_>], start: usize) -> bool {
    components.iter().any(|c| c.stmt_start == start)
}

/// Rule 1: the top level carries imports, exports and declarations only.
fn check_top_level_statements<'a>(
    program: &'a Program<'a>,
    components: &[DiscoveredComponent<'a>],
    sink: &mut DiagnosticSink,
) {
    for stmt in program.body.iter() {
        let allowed = matches!(
            stmt,
            Statement::ImportDeclaration(_)
                | Statement::ExportNamedDeclaration(_)
                | Statement::ExportDefaultDeclaration(_)
                | Statement::ExportAllDeclaration(_)
                | Statement::VariableDeclaration(_)
                | Statement::FunctionDeclaration(_)
                | Statement::ClassDeclaration(_)
                | Statement::TSTypeAliasDeclaration(_)
                | Statement::TSInterfaceDeclaration(_)
                | Statement::TSEnumDeclaration(_)
                | Statement::TSModuleDeclaration(_)
                | Statement::EmptyStatement(_)
        );
        if !allowed {
            let span = stmt.span();
            if !is_component_stmt(components, span.start as usize) {
                sink.error(
                    "only imports, exports and declarations are allowed at the top level of a component file",
                    span.start as usize,
                    span.end as usize,
                );
            }
        }
    }
}

/// Rule 2: reactive-runtime constructors may not run at the file top
/// level. Walking with `enter_functions = false` keeps component bodies
/// (and any other function bodies) out of scope here.
fn check_top_level_reactivity<'a>(
    program: &'a Program<'a>,
    aliases: &FxHashMap<String, String>,
    sink: &mut DiagnosticSink,
) {
    for stmt in program.body.iter() {
        let stmt = match stmt {
            Statement::ExportNamedDeclaration(export) => match &export.declaration {
                Some(decl) => {
                    check_declaration_reactivity(decl, aliases, sink);
                    continue;
                }
                None => continue,
            },
            other => other,
        };
        walk_statement(stmt, false, &mut |expr| {
            report_reactivity_call(expr, aliases, sink);
        });
    }
}

fn check_declaration_reactivity<'a>(
    decl: &'a oxc_ast::ast::Declaration<'a>,
    aliases: &FxHashMap<String, String>,
    sink: &mut DiagnosticSink,
) {
    if let oxc_ast::ast::Declaration::VariableDeclaration(var_decl) = decl {
        for declarator in var_decl.declarations.iter() {
            if let Some(init) = &declarator.init {
                walk_expression(init, false, &mut |expr| {
                    report_reactivity_call(expr, aliases, sink);
                });
            }
        }
    }
}

fn report_reactivity_call(
    expr: &Expression<'_>,
    aliases: &FxHashMap<String, String>,
    sink: &mut DiagnosticSink,
) {
    if let Expression::CallExpression(call) = expr {
        if let Expression::Identifier(callee) = &call.callee {
            let name = callee.name.as_str();
            let resolved = aliases.get(name).map(String::as_str).unwrap_or(name);
            if REACTIVITY_APIS.contains(resolved) {
                sink.error(
                    format!(
                        "`{name}()` may not be called at the top level, move it into a component function"
                    ),
                    call.span.start as usize,
                    call.span.end as usize,
                );
            }
        }
    }
}

/// Rules 3 through 6, per component function. Returns early on the first
/// failing rule for this function.
fn validate_component<'a>(
    source: &str,
    component: &DiscoveredComponent<'a>,
    sink: &mut DiagnosticSink,
) {
    let name = component.name;
    let Some(body) = component.node.body() else {
        return;
    };

    // Expression-bodied arrows have no block to host the setup preamble.
    if let crate::discover::ComponentFnNode::Arrow(arrow) = &component.node {
        if arrow.expression {
            let span = arrow.span;
            sink.push(
                espalier_trellis::Diagnostic::error(
                    format!("component function `{name}` must have a block body"),
                    span.start as usize,
                    span.end as usize,
                )
                .with_component(name),
            );
            return;
        }
    }

    // Rule 3: exactly one template tag, no interpolation.
    let tags = template_tags(body);
    if tags.len() > 1 {
        let second = tags[1];
        sink.push(
            espalier_trellis::Diagnostic::error(
                format!("component function `{name}` declares more than one template"),
                second.start,
                second.end,
            )
            .with_component(name),
        );
        return;
    }
    if tags[0].has_interpolation {
        sink.push(
            espalier_trellis::Diagnostic::error(
                "template literals may not contain `${}` interpolation, use template bindings instead",
                tags[0].start,
                tags[0].end,
            )
            .with_component(name),
        );
        return;
    }

    // Rule 4: non-repeatable macros appear at most once.
    let calls = collect_macro_calls(body);
    if check_macro_repeats(name, &calls, sink) {
        return;
    }

    // Rule 5: expose/options/style argument shapes.
    if check_macro_arguments(name, &calls, sink) {
        return;
    }

    // Rule 6: prop declarations.
    check_prop_declarations(source, name, component, body, &calls, sink);
}

struct MacroCall<'a> {
    kind: MacroKind,
    method: Option<&'a str>,
    call: &'a CallExpression<'a>,
    /// The call is the initializer of a `const` declarator
    in_const_declarator: bool,
}

fn collect_macro_calls<'a>(body: &'a oxc_ast::ast::FunctionBody<'a>) -> Vec<MacroCall<'a>> {
    let mut const_init_starts: Vec<u32> = Vec::new();
    for stmt in body.statements.iter() {
        if let Statement::VariableDeclaration(decl) = stmt {
            if decl.kind == VariableDeclarationKind::Const {
                for declarator in decl.declarations.iter() {
                    if let Some(Expression::CallExpression(call)) = &declarator.init {
                        const_init_starts.push(call.span.start);
                    }
                }
            }
        }
    }

    let mut calls = Vec::new();
    for stmt in body.statements.iter() {
        walk_statement(stmt, true, &mut |expr| {
            if let Expression::CallExpression(call) = expr {
                if let Some(callee) = resolve_macro_callee(call) {
                    calls.push(MacroCall {
                        kind: callee.kind,
                        method: callee.method,
                        call,
                        in_const_declarator: const_init_starts.contains(&call.span.start),
                    });
                }
            }
        });
    }
    calls
}

fn check_macro_repeats(name: &str, calls: &[MacroCall<'_>], sink: &mut DiagnosticSink) -> bool {
    let mut failed = false;
    let mut seen: Vec<MacroKind> = Vec::new();
    for mc in calls {
        if mc.kind.is_repeatable() {
            continue;
        }
        if seen.contains(&mc.kind) {
            sink.push(
                espalier_trellis::Diagnostic::error(
                    format!("`{}` may only be called once per component function", mc.kind.name()),
                    mc.call.span.start as usize,
                    mc.call.span.end as usize,
                )
                .with_component(name),
            );
            failed = true;
        } else {
            seen.push(mc.kind);
        }
    }
    failed
}

fn check_macro_arguments(name: &str, calls: &[MacroCall<'_>], sink: &mut DiagnosticSink) -> bool {
    let mut failed = false;
    for mc in calls {
        match mc.kind {
            MacroKind::DefineExpose | MacroKind::DefineOptions => {
                let ok = mc.call.arguments.len() == 1
                    && matches!(
                        mc.call.arguments[0],
                        Argument::ObjectExpression(_)
                    );
                if !ok {
                    sink.push(
                        espalier_trellis::Diagnostic::error(
                            format!(
                                "`{}` takes exactly one object literal argument",
                                mc.kind.name()
                            ),
                            mc.call.span.start as usize,
                            mc.call.span.end as usize,
                        )
                        .with_component(name),
                    );
                    failed = true;
                }
            }
            MacroKind::DefineStyle => {
                if let Some(message) = style_argument_problem(mc.call) {
                    sink.push(
                        espalier_trellis::Diagnostic::error(
                            message,
                            mc.call.span.start as usize,
                            mc.call.span.end as usize,
                        )
                        .with_component(name),
                    );
                    failed = true;
                }
            }
            _ => {}
        }
    }
    failed
}

fn style_argument_problem(call: &CallExpression<'_>) -> Option<String> {
    if call.arguments.len() != 1 {
        return Some("`defineStyle` takes exactly one style-source argument".to_string());
    }
    let Some(arg) = call.arguments[0].as_expression() else {
        return Some("`defineStyle` takes exactly one style-source argument".to_string());
    };
    match arg {
        Expression::StringLiteral(_) => None,
        Expression::TemplateLiteral(template) => {
            if template.expressions.is_empty() {
                None
            } else {
                Some("style source may not contain `${}` interpolation".to_string())
            }
        }
        Expression::TaggedTemplateExpression(tagged) => {
            let Expression::Identifier(tag) = &tagged.tag else {
                return Some("unknown style language tag".to_string());
            };
            if !STYLE_LANGS.contains(tag.name.as_str()) {
                return Some(format!("unknown style language `{}`", tag.name));
            }
            if !tagged.quasi.expressions.is_empty() {
                return Some("style source may not contain `${}` interpolation".to_string());
            }
            None
        }
        _ => Some("`defineStyle` takes exactly one string-like argument".to_string()),
    }
}

/// Rule 6. Props come from either the formal parameter's type literal or
/// `defineProp` macro calls, each in a `const` declarator carrying a type
/// argument unless a default makes the type inferable.
fn check_prop_declarations<'a>(
    source: &str,
    name: &str,
    component: &DiscoveredComponent<'a>,
    _body: &'a oxc_ast::ast::FunctionBody<'a>,
    calls: &[MacroCall<'a>],
    sink: &mut DiagnosticSink,
) {
    if let Some(func) = component.node.function() {
        if let Some(param) = func.params.items.first() {
            let is_plain_identifier = matches!(
                param.pattern,
                oxc_ast::ast::BindingPattern::BindingIdentifier(_)
            );
            if !is_plain_identifier {
                let span = param.span();
                sink.push(
                    espalier_trellis::Diagnostic::error(
                        "the props parameter must be a plain identifier, destructure inside the body instead",
                        span.start as usize,
                        span.end as usize,
                    )
                    .with_component(name),
                );
                return;
            }
            match &param.type_annotation {
                Some(annotation) => {
                    let ty_span = annotation.type_annotation.span();
                    let text = source[ty_span.start as usize..ty_span.end as usize].trim();
                    if !(text.starts_with('{') && text.ends_with('}')) {
                        sink.push(
                            espalier_trellis::Diagnostic::error(
                                "the props parameter type must be a single object-literal type",
                                ty_span.start as usize,
                                ty_span.end as usize,
                            )
                            .with_component(name),
                        );
                        return;
                    }
                }
                None => {
                    let span = param.span();
                    sink.push(
                        espalier_trellis::Diagnostic::error(
                            "the props parameter needs an object-literal type annotation",
                            span.start as usize,
                            span.end as usize,
                        )
                        .with_component(name),
                    );
                    return;
                }
            }
        }
    }

    for mc in calls {
        if mc.kind != MacroKind::DefineProp {
            continue;
        }
        if !mc.in_const_declarator {
            sink.push(
                espalier_trellis::Diagnostic::error(
                    "`defineProp` must initialize a `const` declaration",
                    mc.call.span.start as usize,
                    mc.call.span.end as usize,
                )
                .with_component(name),
            );
            continue;
        }
        let has_default = mc.method == Some("withDefault");
        if !has_default && mc.call.type_arguments.is_none() {
            sink.push(
                espalier_trellis::Diagnostic::error(
                    "`defineProp` needs a type argument unless a default value is given",
                    mc.call.span.start as usize,
                    mc.call.span.end as usize,
                )
                .with_component(name),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discover::find_component_functions;
    use espalier_trellis::Severity;
    use oxc_allocator::Allocator;
    use oxc_parser::Parser;
    use oxc_span::SourceType;

    fn run(source: &str) -> Vec<espalier_trellis::Diagnostic> {
        let allocator = Allocator::default();
        let ret = Parser::new(&allocator, source, SourceType::ts()).parse();
        assert!(!ret.panicked);
        let components = find_component_functions(&ret.program);
        let mut sink = DiagnosticSink::new();
        validate(source, &ret.program, &components, "espalier", &mut sink);
        sink.into_inner()
    }

    #[test]
    fn test_clean_file_passes() {
        let diags = run(
            r#"
import { ref } from 'espalier'

export function Counter(props: { initial: number }) {
  const count = ref(props.initial)
  return template`<button>{{ count }}</button>`
}
"#,
        );
        assert!(diags.is_empty(), "{diags:?}");
    }

    #[test]
    fn test_top_level_expression_rejected() {
        let diags = run("console.log('boot')\nfunction A() { return template`<div/>` }");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].severity, Severity::Error);
        assert!(diags[0].message.contains("top level"));
    }

    #[test]
    fn test_top_level_reactivity_rejected() {
        let diags = run("const shared = ref(0)\nfunction A() { return template`<div/>` }");
        assert_eq!(diags.len(), 1);
        assert!(diags[0].message.contains("`ref()`"));
    }

    #[test]
    fn test_aliased_reactivity_rejected() {
        let diags = run(
            "import { ref as myRef } from 'espalier'\nconst shared = myRef(0)\nfunction A() { return template`<div/>` }",
        );
        assert_eq!(diags.len(), 1);
        assert!(diags[0].message.contains("`myRef()`"));
    }

    #[test]
    fn test_double_template_reported_at_second() {
        let source = "function A() { template`<i/>`; return template`<b/>` }";
        let diags = run(source);
        assert_eq!(diags.len(), 1);
        assert_eq!(&source[diags[0].start..diags[0].end], "template`<b/>`");
        assert_eq!(diags[0].component.as_deref(), Some("A"));
    }

    #[test]
    fn test_expression_bodied_arrow_rejected() {
        let diags = run("const A = () => template`<div/>`");
        assert_eq!(diags.len(), 1);
        assert!(diags[0].message.contains("block body"));
    }

    #[test]
    fn test_template_interpolation_rejected() {
        let diags = run("function A() { return template`<p>${msg}</p>` }");
        assert_eq!(diags.len(), 1);
        assert!(diags[0].message.contains("interpolation"));
    }

    #[test]
    fn test_repeated_style_macro() {
        let diags = run(
            "function A() { defineStyle(`a{}`); defineStyle(`b{}`); return template`<div/>` }",
        );
        assert_eq!(diags.len(), 1);
        assert!(diags[0].message.contains("once per component"));
    }

    #[test]
    fn test_expose_requires_object_literal() {
        let diags = run("function A() { defineExpose(42); return template`<div/>` }");
        assert_eq!(diags.len(), 1);
        assert!(diags[0].message.contains("object literal"));
    }

    #[test]
    fn test_style_language_tags() {
        let ok = run("function A() { defineStyle(scss`.a { color: red }`); return template`<div/>` }");
        assert!(ok.is_empty(), "{ok:?}");

        let bad = run("function A() { defineStyle(coffee`.a {}`); return template`<div/>` }");
        assert_eq!(bad.len(), 1);
        assert!(bad[0].message.contains("unknown style language"));
    }

    #[test]
    fn test_style_interpolation_rejected() {
        let diags =
            run("function A() { defineStyle(css`.a { color: ${c} }`); return template`<div/>` }");
        assert_eq!(diags.len(), 1);
        assert!(diags[0].message.contains("interpolation"));
    }

    #[test]
    fn test_define_prop_needs_const() {
        let diags = run("function A() { defineProp<string>(); return template`<div/>` }");
        assert_eq!(diags.len(), 1);
        assert!(diags[0].message.contains("const"));
    }

    #[test]
    fn test_define_prop_needs_type_argument() {
        let diags = run("function A() { const x = defineProp(); return template`<div/>` }");
        assert_eq!(diags.len(), 1);
        assert!(diags[0].message.contains("type argument"));

        let ok = run(
            "function A() { const x = defineProp.withDefault(1); return template`<div/>` }",
        );
        assert!(ok.is_empty(), "{ok:?}");
    }

    #[test]
    fn test_props_parameter_shape() {
        let destructured =
            run("function A({ msg }: { msg: string }) { return template`<div/>` }");
        assert_eq!(destructured.len(), 1);
        assert!(destructured[0].message.contains("plain identifier"));

        let untyped = run("function A(props) { return template`<div/>` }");
        assert_eq!(untyped.len(), 1);
        assert!(untyped[0].message.contains("type annotation"));

        let wrong_type = run("function A(props: string) { return template`<div/>` }");
        assert_eq!(wrong_type.len(), 1);
        assert!(wrong_type[0].message.contains("object-literal type"));
    }

    #[test]
    fn test_failing_function_skips_later_checks() {
        // The doubled template aborts this function's battery, so the
        // repeated defineStyle below it goes unreported.
        let diags = run(
            "function A() { template`<i/>`; defineStyle(`a{}`); defineStyle(`b{}`); return template`<b/>` }",
        );
        assert_eq!(diags.len(), 1);
        assert!(diags[0].message.contains("more than one template"));
    }

    #[test]
    fn test_revalidation_is_idempotent() {
        let source = "const x = ref(0)\nfunction A() { template`<i/>`; return template`<b/>` }";
        let first = run(source);
        let second = run(source);
        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.message, b.message);
            assert_eq!(a.start, b.start);
        }
    }
}
