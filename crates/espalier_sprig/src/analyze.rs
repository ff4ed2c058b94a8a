//! Binding classification and macro metadata extraction.
//!
//! One pass per component function, in declaration order. Classification
//! is decided per declarator through a fixed rule ladder; macro calls are
//! routed to one extraction routine per macro family in the same sweep.
//! A second pass over the finished contexts emits cross-reference
//! warnings for macro payloads that capture hoisted literal constants.

use espalier_trellis::{CompactString, DiagnosticSink, FxHashMap, SmallVec};
use oxc_ast::ast::{
    Argument, BindingPattern, CallExpression, Declaration, Expression, ObjectPattern, Program,
    PropertyKey, Statement, VariableDeclarationKind,
};
use oxc_span::{GetSpan, Span};

use crate::context::{
    contains_identifier, AwaitSite, ComponentContext, CssVarBinding, DestructuredProp,
    FileContext, ModelMeta, PropMeta, StatementInfo, StatementRole, StyleLang, StyleMeta,
};
use crate::css_vars::scan_css_var_bindings;
use crate::discover::{template_tags, DiscoveredComponent};
use crate::macros::{
    resolve_macro_callee, MacroKind, CELL_CONSTRUCTORS, REACTIVE_OBJECT_CONSTRUCTORS,
};
use crate::types::BindingType;
use crate::walk::walk_statement;
use crate::{is_component_source, is_valid_identifier};

/// Options steering the analysis pass.
#[derive(Debug, Clone)]
pub struct AnalyzeOptions {
    /// Compiling under a hot-reload-capable dev server
    pub hot_reload: bool,
    /// Module specifier of the reactive runtime
    pub runtime_module: String,
}

impl Default for AnalyzeOptions {
    fn default() -> Self {
        Self {
            hot_reload: false,
            runtime_module: "espalier".to_string(),
        }
    }
}

#[inline]
fn text<'s>(source: &'s str, span: Span) -> &'s str {
    &source[span.start as usize..span.end as usize]
}

/// Analyze a parsed file into a [`FileContext`].
pub fn analyze<'a>(
    file_id: &str,
    source: &str,
    program: &'a Program<'a>,
    components: &[DiscoveredComponent<'a>],
    options: &AnalyzeOptions,
    sink: &mut DiagnosticSink,
) -> FileContext {
    let mut file = FileContext::new(file_id, source);
    file.hot_reload = options.hot_reload;

    let aliases = analyze_imports(program, &options.runtime_module, &mut file);
    file.top_level_literals = collect_top_level_names(program);

    for (index, discovered) in components.iter().enumerate() {
        let component = analyze_component(
            file_id,
            source,
            discovered,
            index as u32,
            &file,
            &aliases,
            &options.runtime_module,
            sink,
        );
        file.components.push(component);
    }

    emit_hoist_capture_warnings(&file, sink);

    file
}

/// Local import name -> imported name, for specifiers coming from the
/// reactive runtime module. Built once and consulted wherever the rule
/// ladder needs "whatever alias the user imported this constructor as".
fn analyze_imports<'a>(
    program: &'a Program<'a>,
    runtime_module: &str,
    file: &mut FileContext,
) -> FxHashMap<String, String> {
    let mut aliases: FxHashMap<String, String> = FxHashMap::default();

    for stmt in program.body.iter() {
        let Statement::ImportDeclaration(import) = stmt else {
            continue;
        };
        let module = import.source.value.as_str();
        let decl_is_type = import.import_kind.is_type();
        let Some(specifiers) = &import.specifiers else {
            continue;
        };
        for specifier in specifiers.iter() {
            use oxc_ast::ast::ImportDeclarationSpecifier::*;
            let (local, is_type, is_default, is_namespace) = match specifier {
                ImportSpecifier(spec) => {
                    let local = spec.local.name.as_str();
                    if module == runtime_module {
                        aliases.insert(local.to_string(), spec.imported.name().to_string());
                    }
                    (local, decl_is_type || spec.import_kind.is_type(), false, false)
                }
                ImportDefaultSpecifier(spec) => {
                    (spec.local.name.as_str(), decl_is_type, true, false)
                }
                ImportNamespaceSpecifier(spec) => {
                    (spec.local.name.as_str(), decl_is_type, false, true)
                }
            };
            file.imports.insert(
                local.to_string(),
                crate::context::ImportMeta::new(module, is_type, is_default, is_namespace),
            );
        }
    }

    aliases
}

/// Every name declared at the file top level. These become literal-const
/// bindings inside each component, so the template compiler treats them
/// as stable identifiers needing no unwrap.
fn collect_top_level_names<'a>(program: &'a Program<'a>) -> Vec<CompactString> {
    let mut names = Vec::new();
    for stmt in program.body.iter() {
        match stmt {
            Statement::VariableDeclaration(decl) => collect_declared_names(decl, &mut names),
            Statement::FunctionDeclaration(func) => {
                if let Some(id) = &func.id {
                    names.push(CompactString::from(id.name.as_str()));
                }
            }
            Statement::ClassDeclaration(class) => {
                if let Some(id) = &class.id {
                    names.push(CompactString::from(id.name.as_str()));
                }
            }
            Statement::TSEnumDeclaration(decl) => {
                names.push(CompactString::from(decl.id.name.as_str()));
            }
            Statement::ExportNamedDeclaration(export) => match &export.declaration {
                Some(Declaration::VariableDeclaration(decl)) => {
                    collect_declared_names(decl, &mut names)
                }
                Some(Declaration::FunctionDeclaration(func)) => {
                    if let Some(id) = &func.id {
                        names.push(CompactString::from(id.name.as_str()));
                    }
                }
                Some(Declaration::ClassDeclaration(class)) => {
                    if let Some(id) = &class.id {
                        names.push(CompactString::from(id.name.as_str()));
                    }
                }
                _ => {}
            },
            _ => {}
        }
    }
    names
}

fn collect_declared_names(
    decl: &oxc_ast::ast::VariableDeclaration<'_>,
    names: &mut Vec<CompactString>,
) {
    for declarator in decl.declarations.iter() {
        collect_pattern_names(&declarator.id, names);
    }
}

/// Collect every name bound by a binding pattern, recursively.
pub fn collect_pattern_names(kind: &BindingPattern<'_>, names: &mut Vec<CompactString>) {
    match kind {
        BindingPattern::BindingIdentifier(id) => {
            names.push(CompactString::from(id.name.as_str()));
        }
        BindingPattern::ObjectPattern(obj) => {
            for prop in obj.properties.iter() {
                collect_pattern_names(&prop.value, names);
            }
            if let Some(rest) = &obj.rest {
                collect_pattern_names(&rest.argument, names);
            }
        }
        BindingPattern::ArrayPattern(arr) => {
            for elem in arr.elements.iter().flatten() {
                collect_pattern_names(elem, names);
            }
            if let Some(rest) = &arr.rest {
                collect_pattern_names(&rest.argument, names);
            }
        }
        BindingPattern::AssignmentPattern(assign) => {
            collect_pattern_names(&assign.left, names);
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn analyze_component<'a>(
    file_id: &str,
    source: &str,
    discovered: &DiscoveredComponent<'a>,
    index: u32,
    file: &FileContext,
    aliases: &FxHashMap<String, String>,
    runtime_module: &str,
    sink: &mut DiagnosticSink,
) -> ComponentContext {
    let mut ctx = ComponentContext::new(file_id, discovered.name);
    ctx.is_exported = discovered.is_exported;
    ctx.is_default_export = discovered.is_default_export;
    ctx.is_async = discovered.node.is_async();
    ctx.fn_start = discovered.stmt_start;
    ctx.fn_end = discovered.stmt_end;

    // Imports and top-level declarations are visible everywhere; locals
    // processed afterwards shadow them by plain map insertion.
    for (local, meta) in &file.imports {
        if meta.is_type {
            continue;
        }
        let ty = if meta.is_namespace
            || meta.source == runtime_module
            || (meta.is_default && is_component_source(&meta.source))
        {
            BindingType::SetupConst
        } else {
            // External mutability unknown; downstream readers unwrap
            // defensively.
            BindingType::SetupMaybeRef
        };
        ctx.bindings.insert(local.clone(), ty);
    }
    for name in &file.top_level_literals {
        ctx.bindings
            .insert(name.to_string(), BindingType::LiteralConst);
    }

    let Some(body) = discovered.node.body() else {
        return ctx;
    };
    ctx.body_start = body.span.start as usize;
    ctx.body_end = body.span.end as usize;

    let tags = template_tags(body);
    if let Some(tag) = tags.first() {
        ctx.template_span = Some((tag.start, tag.end));
        ctx.template = source[tag.content_start..tag.content_end].to_string();
    }
    let template_stmt_index = tags.first().map(|t| t.stmt_index);

    // Formal-parameter props.
    if let Some(param) = discovered.node.params().items.first() {
        if let BindingPattern::BindingIdentifier(id) = &param.pattern {
            ctx.props_alias = Some(CompactString::from(id.name.as_str()));
            ctx.bindings
                .insert(id.name.to_string(), BindingType::SetupReactiveConst);
            if let Some(annotation) = &param.type_annotation {
                let type_text = text(source, annotation.type_annotation.span());
                for (name, info) in extract_prop_types_from_type(type_text) {
                    let mut prop = PropMeta::named(name);
                    prop.is_required = !info.optional;
                    prop.is_bool = info.ts_type.as_deref() == Some("boolean");
                    prop.is_maybe_bool = info
                        .ts_type
                        .as_deref()
                        .is_some_and(|t| t.contains("boolean"));
                    prop.type_text = info.ts_type;
                    ctx.bindings
                        .insert(prop.name.to_string(), BindingType::Props);
                    ctx.props.push(prop);
                }
            }
        }
    }

    let classifier = Classifier { source, aliases };

    for (stmt_index, stmt) in body.statements.iter().enumerate() {
        let span = stmt.span();
        let mut info = StatementInfo {
            start: span.start as usize,
            end: span.end as usize,
            role: StatementRole::Plain,
            hoistable: false,
            awaits: SmallVec::new(),
        };

        if Some(stmt_index) == template_stmt_index {
            info.role = StatementRole::TemplateReturn;
            ctx.statements.push(info);
            continue;
        }

        collect_awaits(stmt, &mut info);

        match stmt {
            Statement::VariableDeclaration(decl) => {
                let is_const = decl.kind == VariableDeclarationKind::Const;

                if let Some(pattern) = props_destructure(decl, &ctx) {
                    info.role = StatementRole::PropsDestructure;
                    extract_props_destructure(source, pattern, &mut ctx);
                    ctx.statements.push(info);
                    continue;
                }

                let mut any_macro = false;
                for declarator in decl.declarations.iter() {
                    if let Some(Expression::CallExpression(call)) = &declarator.init {
                        if let Some(callee) = resolve_macro_callee(call) {
                            any_macro = true;
                            extract_declarator_macro(
                                source, &mut ctx, index, declarator, call, callee.kind,
                                callee.method, sink,
                            );
                            continue;
                        }
                    }
                    classifier.classify_declarator(is_const, declarator, &mut ctx);
                }
                if any_macro {
                    info.role = StatementRole::MacroCall;
                } else if is_const
                    && info.awaits.is_empty()
                    && statement_is_all_static(decl, &classifier)
                {
                    info.hoistable = true;
                    for declarator in decl.declarations.iter() {
                        if let BindingPattern::BindingIdentifier(id) = &declarator.id {
                            ctx.bindings
                                .insert(id.name.to_string(), BindingType::LiteralConst);
                        }
                    }
                }
            }
            Statement::ExpressionStatement(expr_stmt) => {
                if let Expression::CallExpression(call) = &expr_stmt.expression {
                    if let Some(callee) = resolve_macro_callee(call) {
                        info.role = StatementRole::MacroCall;
                        extract_statement_macro(
                            source, &mut ctx, index, call, callee.kind, callee.method, sink,
                        );
                    }
                }
            }
            Statement::FunctionDeclaration(func) => {
                if let Some(id) = &func.id {
                    ctx.bindings
                        .insert(id.name.to_string(), BindingType::SetupConst);
                }
            }
            Statement::ClassDeclaration(class) => {
                if let Some(id) = &class.id {
                    ctx.bindings
                        .insert(id.name.to_string(), BindingType::SetupConst);
                }
            }
            Statement::TSEnumDeclaration(decl) => {
                ctx.bindings
                    .insert(decl.id.name.to_string(), BindingType::SetupConst);
            }
            _ => {}
        }

        ctx.statements.push(info);
    }

    log::debug!(
        "analyzed component `{}`: {} bindings, {} props, {} styles",
        ctx.name,
        ctx.bindings.len(),
        ctx.props.len(),
        ctx.styles.len()
    );

    ctx
}

struct Classifier<'s> {
    source: &'s str,
    aliases: &'s FxHashMap<String, String>,
}

impl Classifier<'_> {
    /// Resolve a callee name through the import alias table; an
    /// unaliased name stands for itself.
    fn resolve<'n>(&'n self, name: &'n str) -> &'n str {
        self.aliases.get(name).map(String::as_str).unwrap_or(name)
    }

    fn callee_resolves_to(&self, expr: &Expression<'_>, table: &espalier_trellis::PhfSet<&'static str>) -> bool {
        if let Expression::CallExpression(call) = expr {
            if let Expression::Identifier(callee) = &call.callee {
                return table.contains(self.resolve(callee.name.as_str()));
            }
        }
        false
    }

    /// Statically evaluable: a literal, or a pure combination of
    /// literals through unary/binary/ternary/sequence/template operators.
    fn is_static(&self, expr: &Expression<'_>) -> bool {
        match expr {
            Expression::BooleanLiteral(_)
            | Expression::NumericLiteral(_)
            | Expression::StringLiteral(_)
            | Expression::BigIntLiteral(_)
            | Expression::NullLiteral(_) => true,
            Expression::TemplateLiteral(template) => {
                template.expressions.iter().all(|e| self.is_static(e))
            }
            Expression::UnaryExpression(unary) => self.is_static(&unary.argument),
            Expression::BinaryExpression(bin) => {
                self.is_static(&bin.left) && self.is_static(&bin.right)
            }
            Expression::LogicalExpression(logical) => {
                self.is_static(&logical.left) && self.is_static(&logical.right)
            }
            Expression::ConditionalExpression(cond) => {
                self.is_static(&cond.test)
                    && self.is_static(&cond.consequent)
                    && self.is_static(&cond.alternate)
            }
            Expression::SequenceExpression(seq) => {
                seq.expressions.iter().all(|e| self.is_static(e))
            }
            Expression::ParenthesizedExpression(paren) => self.is_static(&paren.expression),
            _ => false,
        }
    }

    /// Initializers that can never evaluate to a reactive cell.
    fn never_reactive(&self, expr: &Expression<'_>) -> bool {
        match expr {
            Expression::ArrayExpression(_)
            | Expression::ObjectExpression(_)
            | Expression::FunctionExpression(_)
            | Expression::ArrowFunctionExpression(_)
            | Expression::ClassExpression(_)
            | Expression::UnaryExpression(_)
            | Expression::BinaryExpression(_)
            | Expression::UpdateExpression(_)
            | Expression::TemplateLiteral(_) => true,
            expr if expr.is_literal() => true,
            expr => self.callee_resolves_to(expr, &REACTIVE_OBJECT_CONSTRUCTORS),
        }
    }

    fn classify_declarator(
        &self,
        is_const: bool,
        declarator: &oxc_ast::ast::VariableDeclarator<'_>,
        ctx: &mut ComponentContext,
    ) {
        match &declarator.id {
            BindingPattern::BindingIdentifier(id) => {
                let ty = self.classify_init(is_const, declarator.init.as_ref());
                ctx.bindings.insert(id.name.to_string(), ty);
            }
            pattern => {
                // Destructured names share one defensive rule: const
                // pieces may hold anything, let pieces are mutable.
                let mut names = Vec::new();
                collect_pattern_names(pattern, &mut names);
                let ty = if is_const {
                    BindingType::SetupMaybeRef
                } else {
                    BindingType::SetupLet
                };
                for name in names {
                    ctx.bindings.insert(name.to_string(), ty);
                }
            }
        }
    }

    fn classify_init(&self, is_const: bool, init: Option<&Expression<'_>>) -> BindingType {
        let Some(init) = init else {
            return if is_const {
                BindingType::SetupMaybeRef
            } else {
                BindingType::SetupLet
            };
        };
        if self.callee_resolves_to(init, &REACTIVE_OBJECT_CONSTRUCTORS) {
            return if is_const {
                BindingType::SetupReactiveConst
            } else {
                BindingType::SetupLet
            };
        }
        if !is_const {
            return BindingType::SetupLet;
        }
        if self.never_reactive(init) {
            return BindingType::SetupConst;
        }
        if self.callee_resolves_to(init, &CELL_CONSTRUCTORS) {
            return BindingType::SetupRef;
        }
        BindingType::SetupMaybeRef
    }
}

/// A `const` statement hoists to module scope when every declarator is a
/// plain name with a statically evaluable initializer. Such names are
/// literal constants.
fn statement_is_all_static(
    decl: &oxc_ast::ast::VariableDeclaration<'_>,
    classifier: &Classifier<'_>,
) -> bool {
    let all_static = !decl.declarations.is_empty()
        && decl.declarations.iter().all(|d| {
            matches!(d.id, BindingPattern::BindingIdentifier(_))
                && d.init.as_ref().is_some_and(|init| classifier.is_static(init))
        });
    all_static
}

fn collect_awaits<'a>(stmt: &'a Statement<'a>, info: &mut StatementInfo) {
    // The whole-statement `await expr;` form discards the value; every
    // other position needs it kept.
    let discard_span = match stmt {
        Statement::ExpressionStatement(expr_stmt) => match &expr_stmt.expression {
            Expression::AwaitExpression(await_expr) => Some(await_expr.span),
            _ => None,
        },
        _ => None,
    };

    walk_statement(stmt, false, &mut |expr| {
        if let Expression::AwaitExpression(await_expr) = expr {
            let arg_span = await_expr.argument.span();
            info.awaits.push(AwaitSite {
                start: await_expr.span.start as usize,
                end: await_expr.span.end as usize,
                arg_start: arg_span.start as usize,
                arg_end: arg_span.end as usize,
                needs_value: Some(await_expr.span) != discard_span,
            });
        }
    });
}

/// Recognize `const { ... } = propsAlias`.
fn props_destructure<'a>(
    decl: &'a oxc_ast::ast::VariableDeclaration<'a>,
    ctx: &ComponentContext,
) -> Option<&'a ObjectPattern<'a>> {
    let props_alias = ctx.props_alias.as_ref()?;
    if decl.kind != VariableDeclarationKind::Const || decl.declarations.len() != 1 {
        return None;
    }
    let declarator = &decl.declarations[0];
    let BindingPattern::ObjectPattern(pattern) = &declarator.id else {
        return None;
    };
    match &declarator.init {
        Some(Expression::Identifier(id)) if id.name.as_str() == props_alias.as_str() => {
            Some(pattern)
        }
        _ => None,
    }
}

fn extract_props_destructure(source: &str, pattern: &ObjectPattern<'_>, ctx: &mut ComponentContext) {
    for prop in pattern.properties.iter() {
        let Some(key) = resolve_object_key(&prop.key) else {
            continue;
        };
        let (local, default) = match &prop.value {
            BindingPattern::BindingIdentifier(id) => (id.name.to_string(), None),
            BindingPattern::AssignmentPattern(assign) => {
                let BindingPattern::BindingIdentifier(id) = &assign.left else {
                    continue;
                };
                (
                    id.name.to_string(),
                    Some(text(source, assign.right.span()).to_string()),
                )
            }
            _ => continue,
        };
        let ty = if local == key {
            BindingType::Props
        } else {
            BindingType::PropsAliased
        };
        ctx.bindings.insert(local.clone(), ty);
        ctx.destructured_props.insert(
            local.clone(),
            DestructuredProp {
                key: key.into(),
                local: local.into(),
                default,
            },
        );
    }
    if let Some(rest) = &pattern.rest {
        if let BindingPattern::BindingIdentifier(id) = &rest.argument {
            ctx.props_rest_id = Some(CompactString::from(id.name.as_str()));
            ctx.bindings
                .insert(id.name.to_string(), BindingType::SetupReactiveConst);
        }
    }
}

fn resolve_object_key(key: &PropertyKey<'_>) -> Option<String> {
    match key {
        PropertyKey::StaticIdentifier(id) => Some(id.name.to_string()),
        PropertyKey::StringLiteral(lit) => Some(lit.value.to_string()),
        PropertyKey::NumericLiteral(lit) => Some(lit.value.to_string()),
        _ => None,
    }
}

/// Macros that bind their result: defineProp, defineModel, defineEmits,
/// defineSlots.
#[allow(clippy::too_many_arguments)]
fn extract_declarator_macro(
    source: &str,
    ctx: &mut ComponentContext,
    _component_index: u32,
    declarator: &oxc_ast::ast::VariableDeclarator<'_>,
    call: &CallExpression<'_>,
    kind: MacroKind,
    method: Option<&str>,
    sink: &mut DiagnosticSink,
) {
    let BindingPattern::BindingIdentifier(id) = &declarator.id else {
        sink.push(
            espalier_trellis::Diagnostic::error(
                format!("`{}` must bind a plain identifier", kind.name()),
                call.span.start as usize,
                call.span.end as usize,
            )
            .with_component(ctx.name.as_str()),
        );
        return;
    };
    let local = id.name.as_str();

    match kind {
        MacroKind::DefineProp => {
            let mut prop = PropMeta::named(local);
            prop.is_from_macro = true;
            prop.type_text = type_argument_text(source, call).map(str::to_string);
            prop.is_bool = prop.type_text.as_deref() == Some("boolean");
            prop.is_maybe_bool = prop
                .type_text
                .as_deref()
                .is_some_and(|t| t.contains("boolean"));
            match method {
                Some("optional") => prop.is_required = false,
                Some("withDefault") => {
                    prop.is_required = false;
                    prop.default = argument_text(source, call, 0).map(str::to_string);
                    prop.validator = argument_text(source, call, 1).map(str::to_string);
                }
                _ => {}
            }
            if method != Some("withDefault") {
                prop.validator = argument_text(source, call, 0).map(str::to_string);
            }
            ctx.bindings.insert(local.to_string(), BindingType::SetupRef);
            ctx.props.push(prop);
        }
        MacroKind::DefineModel => {
            let mut name = CompactString::from("modelValue");
            let mut options = None;
            for argument in call.arguments.iter() {
                match argument {
                    Argument::StringLiteral(lit) => name = CompactString::from(lit.value.as_str()),
                    Argument::ObjectExpression(obj) => {
                        options = Some(text(source, obj.span).to_string());
                    }
                    _ => {}
                }
            }
            ctx.bindings.insert(local.to_string(), BindingType::SetupRef);
            ctx.models.push(ModelMeta {
                name,
                local: CompactString::from(local),
                options,
            });
        }
        MacroKind::DefineEmits => {
            ctx.emits_alias = Some(CompactString::from(local));
            ctx.bindings
                .insert(local.to_string(), BindingType::SetupConst);
            if let Some(type_text) = type_argument_text(source, call) {
                for name in extract_emit_names_from_type(type_text) {
                    ctx.emits.push(name.into());
                }
            } else if let Some(Argument::ArrayExpression(arr)) = call.arguments.first() {
                for elem in arr.elements.iter() {
                    if let Some(Expression::StringLiteral(lit)) = elem.as_expression() {
                        ctx.emits.push(CompactString::from(lit.value.as_str()));
                    }
                }
            }
        }
        MacroKind::DefineSlots => {
            ctx.slots_alias = Some(CompactString::from(local));
            ctx.bindings
                .insert(local.to_string(), BindingType::SetupConst);
            if let Some(type_text) = type_argument_text(source, call) {
                for (name, _) in extract_prop_types_from_type(type_text) {
                    ctx.slots.push(name.into());
                }
            }
        }
        // Statement-position macros reached through a declarator still
        // take effect; the declared name is a plain const.
        other => {
            ctx.bindings
                .insert(local.to_string(), BindingType::SetupConst);
            extract_statement_macro(source, ctx, _component_index, call, other, method, sink);
        }
    }
}

/// Macros used in statement position: defineStyle, defineExpose,
/// defineOptions, defineCustomElement.
fn extract_statement_macro(
    source: &str,
    ctx: &mut ComponentContext,
    component_index: u32,
    call: &CallExpression<'_>,
    kind: MacroKind,
    method: Option<&str>,
    _sink: &mut DiagnosticSink,
) {
    match kind {
        MacroKind::DefineStyle => {
            let Some(arg) = call.arguments.first().and_then(|a| a.as_expression()) else {
                return;
            };
            let (lang, content_span) = match arg {
                Expression::StringLiteral(lit) => {
                    (StyleLang::Css, Span::new(lit.span.start + 1, lit.span.end - 1))
                }
                Expression::TemplateLiteral(template) => (
                    StyleLang::Css,
                    Span::new(template.span.start + 1, template.span.end - 1),
                ),
                Expression::TaggedTemplateExpression(tagged) => {
                    let lang = match &tagged.tag {
                        Expression::Identifier(tag) => {
                            StyleLang::from_tag(tag.name.as_str()).unwrap_or(StyleLang::Css)
                        }
                        _ => StyleLang::Css,
                    };
                    (
                        lang,
                        Span::new(tagged.quasi.span.start + 1, tagged.quasi.span.end - 1),
                    )
                }
                _ => return,
            };
            let content = text(source, content_span);
            for binding in scan_css_var_bindings(content) {
                if !ctx
                    .css_var_bindings
                    .iter()
                    .any(|b: &CssVarBinding| b.expression == binding.expression)
                {
                    ctx.css_var_bindings.push(binding);
                }
            }
            ctx.styles.push(StyleMeta {
                lang,
                source: content.to_string(),
                start: content_span.start as usize,
                end: content_span.end as usize,
                scoped: method == Some("scoped"),
                component: component_index,
            });
        }
        MacroKind::DefineExpose => {
            if let Some(Argument::ObjectExpression(obj)) = call.arguments.first() {
                ctx.expose_span = Some((obj.span.start as usize, obj.span.end as usize));
            }
        }
        MacroKind::DefineOptions => {
            if let Some(Argument::ObjectExpression(obj)) = call.arguments.first() {
                ctx.options_span = Some((obj.span.start as usize, obj.span.end as usize));
            }
        }
        MacroKind::DefineCustomElement => {
            ctx.is_custom_element = true;
        }
        _ => {}
    }
}

/// Inner text of the call's type-argument list, angle brackets stripped.
fn type_argument_text<'s>(source: &'s str, call: &CallExpression<'_>) -> Option<&'s str> {
    let tp = call.type_arguments.as_ref()?;
    let raw = text(source, tp.span);
    Some(
        raw.trim()
            .trim_start_matches('<')
            .trim_end_matches('>')
            .trim(),
    )
}

fn argument_text<'s>(source: &'s str, call: &CallExpression<'_>, index: usize) -> Option<&'s str> {
    let arg = call.arguments.get(index)?.as_expression()?;
    Some(text(source, arg.span()))
}

/// Literal constants hoist to module scope, so macro payload closures
/// that run inside `setup` cannot reach them. Warn on each capture.
fn emit_hoist_capture_warnings(file: &FileContext, sink: &mut DiagnosticSink) {
    for component in &file.components {
        let hoisted: Vec<&str> = component
            .bindings
            .iter()
            .filter(|(name, ty)| {
                **ty == BindingType::LiteralConst
                    && !file.top_level_literals.iter().any(|n| n == *name)
            })
            .map(|(name, _)| name.as_str())
            .collect();
        if hoisted.is_empty() {
            continue;
        }

        let mut payloads: Vec<(&str, usize, usize)> = Vec::new();
        if let Some((start, end)) = component.expose_span {
            payloads.push((&file.source[start..end], start, end));
        }
        if let Some((start, end)) = component.options_span {
            payloads.push((&file.source[start..end], start, end));
        }
        for prop in &component.props {
            if let Some(validator) = &prop.validator {
                payloads.push((validator, component.fn_start, component.fn_start));
            }
        }

        let mut sorted = hoisted;
        sorted.sort_unstable();
        for name in sorted {
            for (payload, start, end) in &payloads {
                if contains_identifier(payload, name) {
                    sink.push(
                        espalier_trellis::Diagnostic::warning(
                            format!(
                                "`{name}` is hoisted out of setup and will not be reachable from this argument"
                            ),
                            *start,
                            *end,
                        )
                        .with_component(component.name.as_str()),
                    );
                }
            }
        }
    }
}

/// Prop type information derived from a type-literal segment.
#[derive(Debug, Clone)]
pub struct PropTypeInfo {
    /// JavaScript constructor name (String, Number, Boolean, ...)
    pub js_type: String,
    /// Original TypeScript type text
    pub ts_type: Option<String>,
    pub optional: bool,
}

/// Extract prop names and types from an object-literal type's text.
/// Returns a Vec to preserve declaration order.
pub fn extract_prop_types_from_type(type_args: &str) -> Vec<(String, PropTypeInfo)> {
    let mut props = Vec::new();

    let content = type_args.trim();
    let content = if content.starts_with('{') && content.ends_with('}') {
        &content[1..content.len() - 1]
    } else {
        content
    };

    // Split on commas/semicolons/newlines outside nested brackets.
    let mut depth = 0;
    let mut current = String::new();

    for c in content.chars() {
        match c {
            '{' | '<' | '(' | '[' => {
                depth += 1;
                current.push(c);
            }
            '}' | '>' | ')' | ']' => {
                depth -= 1;
                current.push(c);
            }
            ',' | ';' | '\n' if depth == 0 => {
                extract_prop_type_info(&current, &mut props);
                current.clear();
            }
            _ => current.push(c),
        }
    }
    extract_prop_type_info(&current, &mut props);

    props
}

fn extract_prop_type_info(segment: &str, props: &mut Vec<(String, PropTypeInfo)>) {
    let trimmed = segment.trim();
    if trimmed.is_empty() {
        return;
    }

    let Some(colon_pos) = trimmed.find(':') else {
        return;
    };
    let name_part = &trimmed[..colon_pos];
    let type_part = &trimmed[colon_pos + 1..];

    let optional = name_part.trim().ends_with('?');
    let name = name_part
        .trim()
        .trim_end_matches('?')
        .trim()
        .trim_matches(|c| c == '"' || c == '\'');

    if name.is_empty() || (!is_valid_identifier(name) && !name.contains('-')) {
        return;
    }
    if props.iter().any(|(n, _)| n == name) {
        return;
    }

    let ts_type = type_part.trim().to_string();
    let js_type = ts_type_to_js_type(&ts_type);
    props.push((
        name.to_string(),
        PropTypeInfo {
            js_type,
            ts_type: Some(ts_type),
            optional,
        },
    ));
}

/// Map a TypeScript type's text to the runtime constructor used in the
/// generated props schema.
pub fn ts_type_to_js_type(ts_type: &str) -> String {
    let ts_type = ts_type.trim();

    if (ts_type.starts_with('"') && ts_type.ends_with('"'))
        || (ts_type.starts_with('\'') && ts_type.ends_with('\''))
    {
        return "String".to_string();
    }
    if ts_type.parse::<f64>().is_ok() {
        return "Number".to_string();
    }
    if ts_type == "true" || ts_type == "false" {
        return "Boolean".to_string();
    }

    // Union types take the first non-nullish member.
    if ts_type.contains('|') {
        for part in ts_type.split('|') {
            let part = part.trim();
            if part != "undefined" && part != "null" && !part.is_empty() {
                return ts_type_to_js_type(part);
            }
        }
    }

    match ts_type.to_lowercase().as_str() {
        "string" => "String".to_string(),
        "number" => "Number".to_string(),
        "boolean" => "Boolean".to_string(),
        "object" => "Object".to_string(),
        "function" => "Function".to_string(),
        "symbol" => "Symbol".to_string(),
        _ => {
            if ts_type.ends_with("[]") || ts_type.starts_with("Array<") {
                "Array".to_string()
            } else if ts_type.starts_with('{') || ts_type.contains(':') {
                "Object".to_string()
            } else if ts_type.starts_with('(') && ts_type.contains("=>") {
                "Function".to_string()
            } else {
                let type_name = ts_type.split('<').next().unwrap_or(ts_type).trim();
                match type_name {
                    "Date" | "RegExp" | "Error" | "Map" | "Set" | "WeakMap" | "WeakSet"
                    | "Promise" | "ArrayBuffer" | "Blob" | "File" | "URL" => {
                        type_name.to_string()
                    }
                    // Interfaces and generic parameters do not exist at
                    // runtime.
                    _ => "null".to_string(),
                }
            }
        }
    }
}

/// Pull quoted event names out of an emits type's text.
pub fn extract_emit_names_from_type(type_args: &str) -> Vec<String> {
    let mut emits = Vec::new();

    let mut in_string = false;
    let mut quote_char = ' ';
    let mut current = String::new();

    for c in type_args.chars() {
        if !in_string && (c == '\'' || c == '"') {
            in_string = true;
            quote_char = c;
            current.clear();
        } else if in_string && c == quote_char {
            in_string = false;
            if !current.is_empty() && !emits.contains(&current) {
                emits.push(current.clone());
            }
        } else if in_string {
            current.push(c);
        }
    }

    emits
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discover::find_component_functions;
    use oxc_allocator::Allocator;
    use oxc_parser::Parser;
    use oxc_span::SourceType;

    fn run(source: &str) -> (FileContext, Vec<espalier_trellis::Diagnostic>) {
        let allocator = Allocator::default();
        let ret = Parser::new(&allocator, source, SourceType::ts()).parse();
        assert!(!ret.panicked);
        let components = find_component_functions(&ret.program);
        let mut sink = DiagnosticSink::new();
        let file = analyze(
            "src/App.esp.ts",
            source,
            &ret.program,
            &components,
            &AnalyzeOptions::default(),
            &mut sink,
        );
        (file, sink.into_inner())
    }

    fn binding(file: &FileContext, component: &str, name: &str) -> BindingType {
        file.component_by_name(component)
            .unwrap()
            .bindings
            .get(name)
            .copied()
            .unwrap_or_else(|| panic!("no binding `{name}` in `{component}`"))
    }

    #[test]
    fn test_classification_ladder() {
        let source = r#"
import { ref, reactive, computed } from 'espalier'

function A() {
  const n = 1 + 2
  const cell = ref(0)
  const derived = computed(() => cell.value * 2)
  const state = reactive({ on: false })
  const plain = { a: 1 }
  const fetched = loadSomething()
  let mutable = 3
  return template`<div/>`
}
"#;
        let (file, _) = run(source);
        assert_eq!(binding(&file, "A", "n"), BindingType::LiteralConst);
        assert_eq!(binding(&file, "A", "cell"), BindingType::SetupRef);
        assert_eq!(binding(&file, "A", "derived"), BindingType::SetupRef);
        assert_eq!(binding(&file, "A", "state"), BindingType::SetupReactiveConst);
        assert_eq!(binding(&file, "A", "plain"), BindingType::SetupConst);
        assert_eq!(binding(&file, "A", "fetched"), BindingType::SetupMaybeRef);
        assert_eq!(binding(&file, "A", "mutable"), BindingType::SetupLet);
    }

    #[test]
    fn test_literal_propagation_through_operators() {
        let source = r#"
function A() {
  const x = 1 + 2
  const y = true ? 'a' : 'b'
  const z = `v${1}`
  return template`<div/>`
}
"#;
        let (file, _) = run(source);
        assert_eq!(binding(&file, "A", "x"), BindingType::LiteralConst);
        assert_eq!(binding(&file, "A", "y"), BindingType::LiteralConst);
        assert_eq!(binding(&file, "A", "z"), BindingType::LiteralConst);
        let a = file.component_by_name("A").unwrap();
        assert!(a.statements[0].hoistable);
    }

    #[test]
    fn test_mixed_static_statement_not_hoistable() {
        let source = "function A() { const a = 1, b = load(); return template`<div/>` }";
        let (file, _) = run(source);
        assert_eq!(binding(&file, "A", "a"), BindingType::SetupConst);
        assert_eq!(binding(&file, "A", "b"), BindingType::SetupMaybeRef);
        assert!(!file.component_by_name("A").unwrap().statements[0].hoistable);
    }

    #[test]
    fn test_aliased_reactive_import() {
        let source = r#"
import { reactive as rx, ref as r } from 'espalier'

function A() {
  const state = rx({})
  const cell = r(0)
  return template`<div/>`
}
"#;
        let (file, _) = run(source);
        assert_eq!(binding(&file, "A", "state"), BindingType::SetupReactiveConst);
        assert_eq!(binding(&file, "A", "cell"), BindingType::SetupRef);
    }

    #[test]
    fn test_import_classification() {
        let source = r#"
import { ref } from 'espalier'
import * as utils from './utils'
import Badge from './Badge.esp.ts'
import { helper } from './helpers'

function A() { return template`<div/>` }
"#;
        let (file, _) = run(source);
        assert_eq!(binding(&file, "A", "ref"), BindingType::SetupConst);
        assert_eq!(binding(&file, "A", "utils"), BindingType::SetupConst);
        assert_eq!(binding(&file, "A", "Badge"), BindingType::SetupConst);
        assert_eq!(binding(&file, "A", "helper"), BindingType::SetupMaybeRef);
    }

    #[test]
    fn test_top_level_hoist_into_every_component() {
        let source = r#"
const LIMIT = 10

function A() { return template`<div/>` }
function B() { return template`<div/>` }
"#;
        let (file, _) = run(source);
        assert_eq!(binding(&file, "A", "LIMIT"), BindingType::LiteralConst);
        assert_eq!(binding(&file, "B", "LIMIT"), BindingType::LiteralConst);
        // Sibling components are stable identifiers too.
        assert_eq!(binding(&file, "A", "B"), BindingType::LiteralConst);
    }

    #[test]
    fn test_macro_prop_extraction() {
        let source = r#"
function A() {
  const title = defineProp<string>()
  const subtitle = defineProp.optional<string>()
  const count = defineProp.withDefault(0, (v) => v >= 0)
  return template`<div/>`
}
"#;
        let (file, _) = run(source);
        let a = file.component_by_name("A").unwrap();
        assert_eq!(a.props.len(), 3);

        assert_eq!(a.props[0].name, "title");
        assert!(a.props[0].is_required);
        assert!(a.props[0].is_from_macro);
        assert_eq!(a.props[0].type_text.as_deref(), Some("string"));

        assert!(!a.props[1].is_required);

        assert_eq!(a.props[2].default.as_deref(), Some("0"));
        assert_eq!(a.props[2].validator.as_deref(), Some("(v) => v >= 0"));

        assert_eq!(binding(&file, "A", "title"), BindingType::SetupRef);
        assert_eq!(binding(&file, "A", "count"), BindingType::SetupRef);
        assert_eq!(a.statements[0].role, StatementRole::MacroCall);
    }

    #[test]
    fn test_formal_parameter_props() {
        let source = r#"
function A(props: { msg: string; times?: number }) {
  return template`<div/>`
}
"#;
        let (file, _) = run(source);
        let a = file.component_by_name("A").unwrap();
        assert_eq!(a.props_alias.as_deref(), Some("props"));
        assert_eq!(a.props.len(), 2);
        assert_eq!(a.props[0].name, "msg");
        assert!(a.props[0].is_required);
        assert!(!a.props[0].is_from_macro);
        assert_eq!(a.props[1].name, "times");
        assert!(!a.props[1].is_required);
        assert_eq!(binding(&file, "A", "msg"), BindingType::Props);
        assert_eq!(binding(&file, "A", "props"), BindingType::SetupReactiveConst);
    }

    #[test]
    fn test_emits_slots_models() {
        let source = r#"
function A() {
  const emit = defineEmits<{ (e: 'save'): void; (e: 'cancel'): void }>()
  const slots = defineSlots<{ header: void; default: void }>()
  const value = defineModel('value', { required: true })
  return template`<div/>`
}
"#;
        let (file, _) = run(source);
        let a = file.component_by_name("A").unwrap();
        assert_eq!(a.emits_alias.as_deref(), Some("emit"));
        assert_eq!(a.emits, vec!["save", "cancel"]);
        assert_eq!(a.slots_alias.as_deref(), Some("slots"));
        assert_eq!(a.slots, vec!["header", "default"]);
        assert_eq!(a.models.len(), 1);
        assert_eq!(a.models[0].name, "value");
        assert_eq!(a.models[0].local, "value");
        assert!(a.models[0].options.as_deref().unwrap().contains("required"));
    }

    #[test]
    fn test_style_extraction_with_css_vars() {
        let source = r#"
function A() {
  const accent = ref('red')
  defineStyle.scoped(scss`.a { color: v-bind(accent) }`)
  return template`<div/>`
}
"#;
        let (file, _) = run(source);
        let a = file.component_by_name("A").unwrap();
        assert_eq!(a.styles.len(), 1);
        assert_eq!(a.styles[0].lang, StyleLang::Scss);
        assert!(a.styles[0].scoped);
        assert_eq!(a.styles[0].source, ".a { color: v-bind(accent) }");
        assert_eq!(a.css_var_bindings.len(), 1);
        assert_eq!(a.css_var_bindings[0].expression, "accent");
    }

    #[test]
    fn test_props_destructure() {
        let source = r#"
function A(props: { a: string; b: string; c: string }) {
  const { a, b: renamed, ...rest } = props
  return template`<div/>`
}
"#;
        let (file, _) = run(source);
        let a = file.component_by_name("A").unwrap();
        assert_eq!(a.statements[0].role, StatementRole::PropsDestructure);
        assert_eq!(binding(&file, "A", "a"), BindingType::Props);
        assert_eq!(binding(&file, "A", "renamed"), BindingType::PropsAliased);
        assert_eq!(a.props_rest_id.as_deref(), Some("rest"));
        let meta = a.binding_metadata();
        assert_eq!(meta.props_aliases.get("renamed").map(String::as_str), Some("b"));
    }

    #[test]
    fn test_await_sites() {
        let source = r#"
async function A() {
  const data = await load()
  await warmCache()
  return template`<div/>`
}
"#;
        let (file, _) = run(source);
        let a = file.component_by_name("A").unwrap();
        assert!(a.is_async);
        assert_eq!(a.statements[0].awaits.len(), 1);
        assert!(a.statements[0].awaits[0].needs_value);
        assert_eq!(a.statements[1].awaits.len(), 1);
        assert!(!a.statements[1].awaits[0].needs_value);
    }

    #[test]
    fn test_hoist_capture_warning() {
        let source = r#"
function A() {
  const limit = 10
  defineExpose({ check: () => limit })
  return template`<div/>`
}
"#;
        let (_, diags) = run(source);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].severity, espalier_trellis::Severity::Warning);
        assert!(diags[0].message.contains("`limit`"));
    }

    #[test]
    fn test_classification_totality() {
        let source = r#"
import { ref } from 'espalier'

function A(props: { msg: string }) {
  const a = ref(0)
  let b = 1
  const { msg } = props
  const title = defineProp.withDefault('hi')
  function helper() {}
  return template`<div/>`
}
"#;
        let (file, _) = run(source);
        let a = file.component_by_name("A").unwrap();
        for name in ["a", "b", "msg", "title", "helper", "props", "ref"] {
            assert!(a.bindings.contains_key(name), "`{name}` unclassified");
        }
    }

    #[test]
    fn test_prop_type_mapping() {
        assert_eq!(ts_type_to_js_type("string"), "String");
        assert_eq!(ts_type_to_js_type("number | undefined"), "Number");
        assert_eq!(ts_type_to_js_type("'a' | 'b'"), "String");
        assert_eq!(ts_type_to_js_type("string[]"), "Array");
        assert_eq!(ts_type_to_js_type("{ x: number }"), "Object");
        assert_eq!(ts_type_to_js_type("() => void"), "Function");
        assert_eq!(ts_type_to_js_type("Date"), "Date");
        assert_eq!(ts_type_to_js_type("MyInterface"), "null");
    }

    #[test]
    fn test_template_capture() {
        let source = "function A() { return template`<p>{{ x }}</p>` }";
        let (file, _) = run(source);
        let a = file.component_by_name("A").unwrap();
        assert_eq!(a.template, "<p>{{ x }}</p>");
        assert!(a.template_span.is_some());
    }
}
