//! Position-preserving source transformation.
//!
//! Everything here is an offset-addressed edit against the original
//! buffer. Statements the runtime must not see are deleted, awaited
//! expressions are rewrapped in the async-context helper, destructured
//! prop reads become property accesses, and each component body is
//! enclosed in a `setup` function inside the runtime factory call. The
//! analyzer has already guaranteed shape, so a missing field here is a
//! defect and panics rather than degrading into corrupt output.

use espalier_sprig::analyze::{collect_pattern_names, ts_type_to_js_type};
use espalier_sprig::discover::DiscoveredComponent;
use espalier_sprig::{
    BindingType, ComponentContext, DestructuredProp, FileContext, StatementRole,
};
use espalier_trellis::{
    CompactString, Diagnostic, DiagnosticSink, FxHashMap, FxHashSet, MapSegment, SourceEditor,
};
use oxc_ast::ast::{
    ArrayExpressionElement, AssignmentTarget, BindingPattern, Expression, ForStatementInit,
    ForStatementLeft, FunctionBody, ObjectPropertyKind, PropertyKey, SimpleAssignmentTarget,
    Statement,
};
use oxc_span::GetSpan;

use crate::hmr::HmrPatch;
use crate::style_order::{render_style_imports, resolve_style_order};
use crate::template::TemplateCompiler;

/// Options steering code generation.
#[derive(Debug, Clone)]
pub struct TransformOptions {
    /// Development build: keep hot-reload metadata
    pub dev: bool,
    /// Emit hot-reload records and the self-accepting handler
    pub hmr: bool,
    /// Inline the compiled render expression into setup's return
    pub inline: bool,
    /// Module specifier of the reactive runtime
    pub runtime_module: String,
    /// Diff against the previous build of the same file; drives the
    /// exported hot-reload flags. `None` on a first build.
    pub hmr_patch: Option<HmrPatch>,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            dev: false,
            hmr: false,
            inline: false,
            runtime_module: "espalier".to_string(),
            hmr_patch: None,
        }
    }
}

/// Transformed text plus the output-to-original mapping table.
#[derive(Debug)]
pub struct TransformResult {
    pub code: String,
    pub map: Vec<MapSegment>,
}

/// Merged import accumulator, keyed by source module. Threaded through
/// the transform explicitly so one file's compile stays reentrant.
#[derive(Debug, Default)]
struct ImportMap {
    modules: Vec<(String, Vec<(String, String)>)>,
}

impl ImportMap {
    fn add(&mut self, module: &str, imported: &str, local: &str) {
        let entry = match self.modules.iter_mut().find(|(m, _)| m == module) {
            Some(entry) => entry,
            None => {
                self.modules.push((module.to_string(), Vec::new()));
                self.modules.last_mut().expect("just pushed")
            }
        };
        if !entry.1.iter().any(|(_, l)| l == local) {
            entry.1.push((imported.to_string(), local.to_string()));
        }
    }

    fn helper(&mut self, runtime_module: &str, name: &str) -> String {
        let local = format!("_{name}");
        self.add(runtime_module, name, &local);
        local
    }

    fn render(&self) -> String {
        let mut out = String::new();
        for (module, specs) in &self.modules {
            out.push_str("import { ");
            for (i, (imported, local)) in specs.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                if imported == local {
                    out.push_str(imported);
                } else {
                    out.push_str(&format!("{imported} as {local}"));
                }
            }
            out.push_str(&format!(" }} from '{module}';\n"));
        }
        out
    }
}

/// Transform an analyzed file into runtime component code.
pub fn transform_file<'a>(
    components: &[DiscoveredComponent<'a>],
    file: &FileContext,
    options: &TransformOptions,
    template_compiler: &dyn TemplateCompiler,
    sink: &mut DiagnosticSink,
) -> TransformResult {
    assert_eq!(
        components.len(),
        file.components.len(),
        "analysis and discovery disagree on component count"
    );

    let mut editor = SourceEditor::new(file.source.clone());
    let mut imports = ImportMap::default();
    let mut hoisted: Vec<String> = Vec::new();
    let mut hmr_records = String::new();

    for (discovered, ctx) in components.iter().zip(file.components.iter()) {
        transform_component(
            discovered,
            ctx,
            file,
            options,
            template_compiler,
            &mut editor,
            &mut imports,
            &mut hoisted,
            sink,
        );

        if options.dev && options.hmr {
            hmr_records.push_str(&format!(
                "typeof __ESP_HMR__ !== 'undefined' && __ESP_HMR__.record('{}', {});\n",
                ctx.scope_id, ctx.name
            ));
        }
    }

    // One prepended block: merged helper imports, child-first style
    // imports, then hoisted literal constants.
    let style_order = resolve_style_order(file, sink);
    let style_imports = render_style_imports(file, style_order.as_deref());

    let mut preamble = imports.render();
    preamble.push_str(&style_imports);
    for stmt in &hoisted {
        preamble.push_str(stmt);
        preamble.push('\n');
    }
    if !preamble.is_empty() {
        editor.prepend(preamble);
    }

    if options.dev && options.hmr {
        editor.append(format!(
            "\n{}{}",
            hmr_records,
            hmr_handler(options.hmr_patch.as_ref())
        ));
    }

    let (code, map) = editor.commit();
    log::debug!("transformed `{}`: {} bytes -> {} bytes", file.file_id, file.source.len(), code.len());
    TransformResult { code, map }
}

/// The self-accepting handler plus the exported change flags the dev
/// server's accept callback reads off the fresh module.
fn hmr_handler(patch: Option<&HmrPatch>) -> String {
    let render_only = patch.map(|p| p.render_only).unwrap_or(false);
    let changed = patch
        .and_then(|p| p.changed_component.as_deref())
        .unwrap_or("");
    let mut out = format!(
        "export let __hmrRenderOnly = {render_only};\nexport let __hmrChanged = '{changed}';\n"
    );
    out.push_str(concat!(
        "if (import.meta.hot) {\n",
        "  import.meta.hot.accept((mod) => {\n",
        "    if (!mod) { import.meta.hot.invalidate(); return }\n",
        "    if (mod.__hmrRenderOnly && mod.__hmrChanged) {\n",
        "      __ESP_HMR__.rerender(mod.__hmrChanged);\n",
        "    } else {\n",
        "      import.meta.hot.invalidate();\n",
        "    }\n",
        "  });\n",
        "}\n",
    ));
    out
}

#[allow(clippy::too_many_arguments)]
fn transform_component<'a>(
    discovered: &DiscoveredComponent<'a>,
    ctx: &ComponentContext,
    file: &FileContext,
    options: &TransformOptions,
    template_compiler: &dyn TemplateCompiler,
    editor: &mut SourceEditor,
    imports: &mut ImportMap,
    hoisted: &mut Vec<String>,
    sink: &mut DiagnosticSink,
) {
    let source = file.source.as_str();
    let body = discovered
        .node
        .body()
        .expect("validated component has a body");
    let runtime = options.runtime_module.as_str();
    let has_awaits = ctx.statements.iter().any(|s| !s.awaits.is_empty());

    // Statement-level edits: deletions, hoists, async rewraps.
    for info in &ctx.statements {
        match info.role {
            StatementRole::MacroCall
            | StatementRole::PropsDestructure
            | StatementRole::TemplateReturn => {
                editor.remove(info.start, info.end);
                continue;
            }
            StatementRole::Plain => {}
        }
        if info.hoistable {
            hoisted.push(source[info.start..info.end].to_string());
            editor.remove(info.start, info.end);
            continue;
        }
        for site in &info.awaits {
            let helper = imports.helper(runtime, "withAsyncContext");
            let prefix = format!("(([__temp, __restore] = {helper}(() => ");
            let suffix = if site.needs_value {
                ")), __temp = await __temp, __restore(), __temp)"
            } else {
                ")), await __temp, __restore())"
            };
            editor.overwrite(site.start, site.arg_start, prefix);
            editor.insert(site.end, suffix);
        }
    }

    rewrite_destructured_reads(body, ctx, editor, sink);

    // Synthetic preamble, fixed order, inserted just after the body's
    // opening brace.
    let mut pre = String::new();
    if has_awaits {
        pre.push_str("\nlet __temp, __restore;");
    }
    if !ctx.css_var_bindings.is_empty() {
        let helper = imports.helper(runtime, "useCssVars");
        pre.push_str(&format!("\n{helper}(_ctx => ({{"));
        for (i, binding) in ctx.css_var_bindings.iter().enumerate() {
            if i > 0 {
                pre.push(',');
            }
            pre.push_str(&format!(" \"{}\": ({})", binding.id, binding.expression));
        }
        pre.push_str(" }));");
    }
    if let Some(alias) = &ctx.slots_alias {
        let helper = imports.helper(runtime, "useSlots");
        pre.push_str(&format!("\nconst {alias} = {helper}();"));
    }
    if let Some(alias) = &ctx.emits_alias {
        pre.push_str(&format!("\nconst {alias} = __emit;"));
    }
    for model in &ctx.models {
        let helper = imports.helper(runtime, "useModel");
        match &model.options {
            Some(opts) => pre.push_str(&format!(
                "\nconst {} = {helper}(__props, '{}', {opts});",
                model.local, model.name
            )),
            None => pre.push_str(&format!(
                "\nconst {} = {helper}(__props, '{}');",
                model.local, model.name
            )),
        }
    }
    for name in ctx.macro_prop_names() {
        let helper = imports.helper(runtime, "toRef");
        pre.push_str(&format!("\nconst {name} = {helper}(__props, '{name}');"));
    }
    let defaults = collect_defaults(ctx);
    if let Some(alias) = &ctx.props_alias {
        if defaults.is_empty() {
            pre.push_str(&format!("\nconst {alias} = __props;"));
        } else {
            let helper = imports.helper(runtime, "useDefaults");
            pre.push_str(&format!("\nconst {alias} = {helper}(__props, {{"));
            for (i, (key, value)) in defaults.iter().enumerate() {
                if i > 0 {
                    pre.push(',');
                }
                pre.push_str(&format!(" {}: {value}", quote_key(key)));
            }
            pre.push_str(" });");
        }
    }
    if let Some(rest) = &ctx.props_rest_id {
        let helper = imports.helper(runtime, "createPropsRestProxy");
        let kept: Vec<String> = ctx
            .destructured_props
            .values()
            .map(|d| format!("'{}'", d.key))
            .collect();
        let mut kept = kept;
        kept.sort_unstable();
        pre.push_str(&format!(
            "\nconst {rest} = {helper}(__props, [{}]);",
            kept.join(", ")
        ));
    }
    if !pre.is_empty() {
        editor.insert(ctx.body_start + 1, pre);
    }

    // Trailing epilogue: expose, then the setup return.
    let mut post = String::new();
    match ctx.expose_span {
        Some((start, end)) => {
            post.push_str(&format!("\n__expose({});", &source[start..end]));
        }
        None => post.push_str("\n__expose();"),
    }
    if options.inline {
        let rendered = match template_compiler.compile(
            &ctx.template,
            &ctx.scope_id,
            &ctx.binding_metadata(),
        ) {
            Ok(compiled) => {
                for (specifier, module) in &compiled.imports {
                    imports.add(module, specifier, specifier);
                }
                compiled.code
            }
            Err(err) => {
                let anchor = ctx
                    .template_span
                    .map(|(start, _)| start + "template`".len() + err.offset)
                    .unwrap_or(ctx.fn_start);
                sink.push(
                    Diagnostic::error(err.message, anchor, anchor)
                        .with_component(ctx.name.as_str()),
                );
                "() => null".to_string()
            }
        };
        post.push_str(&format!("\nreturn {rendered};"));
    } else {
        post.push_str(&format!("\nreturn {};", returned_bindings(ctx)));
    }
    editor.insert(ctx.body_end - 1, post);

    // Enclose the body in the runtime factory.
    let define_component = imports.helper(runtime, "defineComponent");
    let header = factory_header(ctx, file, &define_component);
    editor.overwrite(ctx.fn_start, ctx.body_start + 1, header);
    editor.overwrite(ctx.body_end, ctx.fn_end, factory_footer(ctx, options));
}

fn collect_defaults(ctx: &ComponentContext) -> Vec<(String, String)> {
    let mut defaults: Vec<(String, String)> = ctx
        .props
        .iter()
        .filter_map(|p| {
            p.default
                .as_ref()
                .map(|d| (p.name.to_string(), d.clone()))
        })
        .collect();
    let mut destructured: Vec<&DestructuredProp> = ctx.destructured_props.values().collect();
    destructured.sort_by(|a, b| a.key.cmp(&b.key));
    for d in destructured {
        if let Some(default) = &d.default {
            defaults.push((d.key.to_string(), default.clone()));
        }
    }
    defaults
}

fn quote_key(key: &str) -> String {
    if espalier_sprig::is_valid_identifier(key) {
        key.to_string()
    } else {
        format!("'{key}'")
    }
}

/// The replacement for everything from the declaration start through the
/// body's opening brace.
fn factory_header(ctx: &ComponentContext, file: &FileContext, define_component: &str) -> String {
    let mut header = String::new();

    if ctx.is_default_export {
        header.push_str(&format!("export default {define_component}({{\n"));
    } else if ctx.is_exported {
        header.push_str(&format!(
            "export const {} = {define_component}({{\n",
            ctx.name
        ));
    } else {
        header.push_str(&format!("const {} = {define_component}({{\n", ctx.name));
    }

    match ctx.options_span {
        Some((start, end)) => {
            header.push_str(&format!("  ...{},\n", &file.source[start..end]));
        }
        None => header.push_str(&format!("  __name: '{}',\n", ctx.name)),
    }

    if !ctx.props.is_empty() || !ctx.models.is_empty() {
        header.push_str("  props: {");
        let mut first = true;
        for prop in &ctx.props {
            if !first {
                header.push(',');
            }
            first = false;
            let js_type = prop
                .type_text
                .as_deref()
                .map(ts_type_to_js_type)
                .unwrap_or_else(|| "null".to_string());
            header.push_str(&format!(
                " {}: {{ type: {js_type}, required: {}",
                quote_key(&prop.name),
                prop.is_required
            ));
            // Defaults applied through the defaults helper are not
            // repeated in the schema.
            if ctx.props_alias.is_none() {
                if let Some(default) = &prop.default {
                    header.push_str(&format!(", default: {default}"));
                }
            }
            if let Some(validator) = &prop.validator {
                header.push_str(&format!(", validator: {validator}"));
            }
            header.push_str(" }");
        }
        for model in &ctx.models {
            if !first {
                header.push(',');
            }
            first = false;
            match &model.options {
                Some(opts) => {
                    header.push_str(&format!(" {}: {opts}", quote_key(&model.name)));
                }
                None => header.push_str(&format!(" {}: {{}}", quote_key(&model.name))),
            }
        }
        header.push_str(" },\n");
    }

    let mut emits: Vec<String> = ctx.emits.iter().map(|e| e.to_string()).collect();
    for model in &ctx.models {
        emits.push(format!("update:{}", model.name));
    }
    if !emits.is_empty() {
        header.push_str("  emits: [");
        for (i, emit) in emits.iter().enumerate() {
            if i > 0 {
                header.push_str(", ");
            }
            header.push_str(&format!("'{emit}'"));
        }
        header.push_str("],\n");
    }

    if ctx.is_custom_element && !ctx.styles.is_empty() {
        header.push_str("  styles: [");
        for (i, style) in ctx.styles.iter().enumerate() {
            if i > 0 {
                header.push_str(", ");
            }
            header.push_str(
                &serde_json::to_string(&style.source).expect("style text serializes"),
            );
        }
        header.push_str("],\n");
    }

    let async_kw = if ctx.is_async { "async " } else { "" };
    header.push_str(&format!(
        "  {async_kw}setup(__props, {{ expose: __expose, emit: __emit }}) {{"
    ));
    header
}

/// The replacement for everything after the body's closing brace (which
/// becomes setup's closing brace) through the end of the declaration.
fn factory_footer(ctx: &ComponentContext, options: &TransformOptions) -> String {
    let mut footer = String::new();
    if ctx.styles.iter().any(|s| s.scoped) {
        footer.push_str(&format!(",\n  __scopeId: '{}'", ctx.scope_id));
    }
    if options.dev && options.hmr {
        footer.push_str(&format!(",\n  __hmrId: '{}'", ctx.scope_id));
    }
    footer.push_str("\n});");
    footer
}

/// The separated-mode return object: every reachable binding by name,
/// with getter/setter pairs for mutable names so the external render
/// function tracks writes.
fn returned_bindings(ctx: &ComponentContext) -> String {
    let mut names: Vec<(&str, BindingType)> = ctx
        .bindings
        .iter()
        .filter(|(name, ty)| {
            !matches!(
                ty,
                BindingType::LiteralConst | BindingType::Props | BindingType::PropsAliased
            ) && Some(name.as_str()) != ctx.props_alias.as_deref()
        })
        .map(|(name, ty)| (name.as_str(), *ty))
        .collect();
    names.sort_unstable_by_key(|(name, _)| *name);

    let mut out = String::from("{");
    for (i, (name, ty)) in names.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        if *ty == BindingType::SetupLet {
            out.push_str(&format!(
                " get {name}() {{ return {name} }}, set {name}(v) {{ {name} = v }}"
            ));
        } else {
            out.push_str(&format!(" {name}"));
        }
    }
    out.push_str(" }");
    out
}

/// Rewrite reads of destructured prop names into property accesses on
/// the props alias. Writes are a hard error. Scope tracking follows the
/// source statement by statement; a shadowing declaration suppresses
/// rewrites for the inner region.
fn rewrite_destructured_reads(
    body: &FunctionBody<'_>,
    ctx: &ComponentContext,
    editor: &mut SourceEditor,
    sink: &mut DiagnosticSink,
) {
    if ctx.destructured_props.is_empty() && ctx.props_rest_id.is_none() {
        return;
    }
    let Some(alias) = ctx.props_alias.as_deref() else {
        return;
    };

    let skip_starts: FxHashSet<usize> = ctx
        .statements
        .iter()
        .filter(|info| info.role != StatementRole::Plain)
        .map(|info| info.start)
        .collect();

    let mut rewriter = PropRewriter {
        alias,
        props: &ctx.destructured_props,
        component: ctx.name.as_str(),
        scopes: vec![FxHashSet::default()],
        edits: Vec::new(),
        errors: Vec::new(),
    };

    for stmt in body.statements.iter() {
        if skip_starts.contains(&(stmt.span().start as usize)) {
            continue;
        }
        rewriter.walk_stmt(stmt);
    }

    for (start, end, text) in rewriter.edits {
        if start == end {
            editor.insert(start, text);
        } else {
            editor.overwrite(start, end, text);
        }
    }
    for diagnostic in rewriter.errors {
        sink.push(diagnostic);
    }
}

struct PropRewriter<'a> {
    alias: &'a str,
    props: &'a FxHashMap<String, DestructuredProp>,
    component: &'a str,
    scopes: Vec<FxHashSet<String>>,
    edits: Vec<(usize, usize, String)>,
    errors: Vec<Diagnostic>,
}

impl<'a> PropRewriter<'a> {
    fn declare(&mut self, name: &str) {
        self.scopes
            .last_mut()
            .expect("scope stack is never empty")
            .insert(name.to_string());
    }

    fn declare_pattern(&mut self, kind: &BindingPattern<'_>) {
        let mut names: Vec<CompactString> = Vec::new();
        collect_pattern_names(kind, &mut names);
        for name in names {
            self.declare(&name);
        }
    }

    fn is_shadowed(&self, name: &str) -> bool {
        self.scopes.iter().any(|scope| scope.contains(name))
    }

    fn access_exp(&self, key: &str) -> String {
        if espalier_sprig::is_valid_identifier(key) {
            format!("{}.{key}", self.alias)
        } else {
            format!("{}['{key}']", self.alias)
        }
    }

    fn try_rewrite(&mut self, name: &str, start: usize, end: usize) {
        if self.is_shadowed(name) {
            return;
        }
        if let Some(prop) = self.props.get(name) {
            let access = self.access_exp(&prop.key);
            self.edits.push((start, end, access));
        }
    }

    fn report_write(&mut self, name: &str, start: usize, end: usize) {
        if self.is_shadowed(name) || !self.props.contains_key(name) {
            return;
        }
        self.errors.push(
            Diagnostic::error(
                format!("props are read-only, cannot write to destructured prop `{name}`"),
                start,
                end,
            )
            .with_component(self.component),
        );
    }

    fn walk_stmt(&mut self, stmt: &Statement<'_>) {
        match stmt {
            Statement::VariableDeclaration(decl) => {
                for declarator in decl.declarations.iter() {
                    if let Some(init) = &declarator.init {
                        self.walk_expr(init);
                    }
                    // Defaults in the pattern are expressions too.
                    self.walk_pattern_defaults(&declarator.id);
                    self.declare_pattern(&declarator.id);
                }
            }
            Statement::ExpressionStatement(expr_stmt) => self.walk_expr(&expr_stmt.expression),
            Statement::ReturnStatement(ret) => {
                if let Some(arg) = &ret.argument {
                    self.walk_expr(arg);
                }
            }
            Statement::IfStatement(if_stmt) => {
                self.walk_expr(&if_stmt.test);
                self.walk_stmt(&if_stmt.consequent);
                if let Some(alt) = &if_stmt.alternate {
                    self.walk_stmt(alt);
                }
            }
            Statement::BlockStatement(block) => {
                self.scopes.push(FxHashSet::default());
                for inner in block.body.iter() {
                    self.walk_stmt(inner);
                }
                self.scopes.pop();
            }
            Statement::FunctionDeclaration(func) => {
                if let Some(id) = &func.id {
                    self.declare(id.name.as_str());
                }
                self.scopes.push(FxHashSet::default());
                for param in func.params.items.iter() {
                    self.declare_pattern(&param.pattern);
                }
                if let Some(body) = &func.body {
                    for inner in body.statements.iter() {
                        self.walk_stmt(inner);
                    }
                }
                self.scopes.pop();
            }
            Statement::ForStatement(for_stmt) => {
                self.scopes.push(FxHashSet::default());
                if let Some(init) = &for_stmt.init {
                    match init {
                        ForStatementInit::VariableDeclaration(decl) => {
                            for declarator in decl.declarations.iter() {
                                if let Some(init_expr) = &declarator.init {
                                    self.walk_expr(init_expr);
                                }
                                self.declare_pattern(&declarator.id);
                            }
                        }
                        _ => {
                            if let Some(expr) = init.as_expression() {
                                self.walk_expr(expr);
                            }
                        }
                    }
                }
                if let Some(test) = &for_stmt.test {
                    self.walk_expr(test);
                }
                if let Some(update) = &for_stmt.update {
                    self.walk_expr(update);
                }
                self.walk_stmt(&for_stmt.body);
                self.scopes.pop();
            }
            Statement::ForInStatement(for_in) => {
                self.scopes.push(FxHashSet::default());
                self.declare_for_left(&for_in.left);
                self.walk_expr(&for_in.right);
                self.walk_stmt(&for_in.body);
                self.scopes.pop();
            }
            Statement::ForOfStatement(for_of) => {
                self.scopes.push(FxHashSet::default());
                self.declare_for_left(&for_of.left);
                self.walk_expr(&for_of.right);
                self.walk_stmt(&for_of.body);
                self.scopes.pop();
            }
            Statement::WhileStatement(while_stmt) => {
                self.walk_expr(&while_stmt.test);
                self.walk_stmt(&while_stmt.body);
            }
            Statement::DoWhileStatement(do_while) => {
                self.walk_stmt(&do_while.body);
                self.walk_expr(&do_while.test);
            }
            Statement::SwitchStatement(switch) => {
                self.walk_expr(&switch.discriminant);
                self.scopes.push(FxHashSet::default());
                for case in switch.cases.iter() {
                    if let Some(test) = &case.test {
                        self.walk_expr(test);
                    }
                    for inner in case.consequent.iter() {
                        self.walk_stmt(inner);
                    }
                }
                self.scopes.pop();
            }
            Statement::TryStatement(try_stmt) => {
                self.scopes.push(FxHashSet::default());
                for inner in try_stmt.block.body.iter() {
                    self.walk_stmt(inner);
                }
                self.scopes.pop();
                if let Some(handler) = &try_stmt.handler {
                    self.scopes.push(FxHashSet::default());
                    if let Some(param) = &handler.param {
                        self.declare_pattern(&param.pattern);
                    }
                    for inner in handler.body.body.iter() {
                        self.walk_stmt(inner);
                    }
                    self.scopes.pop();
                }
                if let Some(finalizer) = &try_stmt.finalizer {
                    self.scopes.push(FxHashSet::default());
                    for inner in finalizer.body.iter() {
                        self.walk_stmt(inner);
                    }
                    self.scopes.pop();
                }
            }
            Statement::ThrowStatement(throw) => self.walk_expr(&throw.argument),
            Statement::LabeledStatement(labeled) => self.walk_stmt(&labeled.body),
            _ => {}
        }
    }

    fn declare_for_left(&mut self, left: &ForStatementLeft<'_>) {
        if let ForStatementLeft::VariableDeclaration(decl) = left {
            for declarator in decl.declarations.iter() {
                self.declare_pattern(&declarator.id);
            }
        }
    }

    fn walk_pattern_defaults(&mut self, kind: &BindingPattern<'_>) {
        match kind {
            BindingPattern::AssignmentPattern(assign) => {
                self.walk_expr(&assign.right);
                self.walk_pattern_defaults(&assign.left);
            }
            BindingPattern::ObjectPattern(obj) => {
                for prop in obj.properties.iter() {
                    self.walk_pattern_defaults(&prop.value);
                }
            }
            BindingPattern::ArrayPattern(arr) => {
                for elem in arr.elements.iter().flatten() {
                    self.walk_pattern_defaults(elem);
                }
            }
            BindingPattern::BindingIdentifier(_) => {}
        }
    }

    fn walk_expr(&mut self, expr: &Expression<'_>) {
        match expr {
            Expression::Identifier(id) => {
                let span = id.span;
                self.try_rewrite(id.name.as_str(), span.start as usize, span.end as usize);
            }
            Expression::AssignmentExpression(assign) => {
                match &assign.left {
                    AssignmentTarget::AssignmentTargetIdentifier(id) => {
                        self.report_write(
                            id.name.as_str(),
                            assign.span.start as usize,
                            assign.span.end as usize,
                        );
                    }
                    AssignmentTarget::ComputedMemberExpression(member) => {
                        self.walk_expr(&member.object);
                        self.walk_expr(&member.expression);
                    }
                    AssignmentTarget::StaticMemberExpression(member) => {
                        self.walk_expr(&member.object);
                    }
                    _ => {}
                }
                self.walk_expr(&assign.right);
            }
            Expression::UpdateExpression(update) => {
                if let SimpleAssignmentTarget::AssignmentTargetIdentifier(id) = &update.argument {
                    self.report_write(
                        id.name.as_str(),
                        update.span.start as usize,
                        update.span.end as usize,
                    );
                }
            }
            Expression::ObjectExpression(obj) => {
                for prop in obj.properties.iter() {
                    match prop {
                        ObjectPropertyKind::ObjectProperty(p) => {
                            if p.shorthand {
                                // `{ foo }` expands to `{ foo: props.foo }`.
                                if let PropertyKey::StaticIdentifier(id) = &p.key {
                                    let name = id.name.as_str();
                                    if !self.is_shadowed(name) {
                                        if let Some(dp) = self.props.get(name) {
                                            let access = self.access_exp(&dp.key);
                                            self.edits.push((
                                                p.span.end as usize,
                                                p.span.end as usize,
                                                format!(": {access}"),
                                            ));
                                        }
                                    }
                                }
                            } else {
                                if p.computed {
                                    if let Some(key_expr) = p.key.as_expression() {
                                        self.walk_expr(key_expr);
                                    }
                                }
                                self.walk_expr(&p.value);
                            }
                        }
                        ObjectPropertyKind::SpreadProperty(spread) => {
                            self.walk_expr(&spread.argument);
                        }
                    }
                }
            }
            Expression::CallExpression(call) => {
                self.walk_expr(&call.callee);
                for arg in call.arguments.iter() {
                    if let Some(arg_expr) = arg.as_expression() {
                        self.walk_expr(arg_expr);
                    }
                }
            }
            Expression::NewExpression(new_expr) => {
                self.walk_expr(&new_expr.callee);
                for arg in new_expr.arguments.iter() {
                    if let Some(arg_expr) = arg.as_expression() {
                        self.walk_expr(arg_expr);
                    }
                }
            }
            Expression::ArrowFunctionExpression(arrow) => {
                self.scopes.push(FxHashSet::default());
                for param in arrow.params.items.iter() {
                    self.declare_pattern(&param.pattern);
                }
                for inner in arrow.body.statements.iter() {
                    self.walk_stmt(inner);
                }
                self.scopes.pop();
            }
            Expression::FunctionExpression(func) => {
                self.scopes.push(FxHashSet::default());
                if let Some(id) = &func.id {
                    self.declare(id.name.as_str());
                }
                for param in func.params.items.iter() {
                    self.declare_pattern(&param.pattern);
                }
                if let Some(body) = &func.body {
                    for inner in body.statements.iter() {
                        self.walk_stmt(inner);
                    }
                }
                self.scopes.pop();
            }
            Expression::StaticMemberExpression(member) => self.walk_expr(&member.object),
            Expression::ComputedMemberExpression(member) => {
                self.walk_expr(&member.object);
                self.walk_expr(&member.expression);
            }
            Expression::BinaryExpression(bin) => {
                self.walk_expr(&bin.left);
                self.walk_expr(&bin.right);
            }
            Expression::LogicalExpression(logical) => {
                self.walk_expr(&logical.left);
                self.walk_expr(&logical.right);
            }
            Expression::UnaryExpression(unary) => self.walk_expr(&unary.argument),
            Expression::AwaitExpression(await_expr) => self.walk_expr(&await_expr.argument),
            Expression::ConditionalExpression(cond) => {
                self.walk_expr(&cond.test);
                self.walk_expr(&cond.consequent);
                self.walk_expr(&cond.alternate);
            }
            Expression::SequenceExpression(seq) => {
                for inner in seq.expressions.iter() {
                    self.walk_expr(inner);
                }
            }
            Expression::ParenthesizedExpression(paren) => self.walk_expr(&paren.expression),
            Expression::TemplateLiteral(template) => {
                for inner in template.expressions.iter() {
                    self.walk_expr(inner);
                }
            }
            Expression::TaggedTemplateExpression(tagged) => {
                self.walk_expr(&tagged.tag);
                for inner in tagged.quasi.expressions.iter() {
                    self.walk_expr(inner);
                }
            }
            Expression::ArrayExpression(arr) => {
                for elem in arr.elements.iter() {
                    match elem {
                        ArrayExpressionElement::SpreadElement(spread) => {
                            self.walk_expr(&spread.argument);
                        }
                        ArrayExpressionElement::Elision(_) => {}
                        _ => {
                            if let Some(elem_expr) = elem.as_expression() {
                                self.walk_expr(elem_expr);
                            }
                        }
                    }
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::NoopTemplateCompiler;
    use espalier_sprig::analyze::{analyze, AnalyzeOptions};
    use espalier_sprig::discover::find_component_functions;
    use espalier_trellis::{Diagnostic, DiagnosticSink};
    use oxc_allocator::Allocator;
    use oxc_parser::Parser;
    use oxc_span::SourceType;

    fn transformed_with(source: &str, options: TransformOptions) -> (String, Vec<Diagnostic>) {
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
        let result = transform_file(&components, &file, &options, &NoopTemplateCompiler, &mut sink);
        (result.code, sink.into_inner())
    }

    fn transformed(source: &str) -> String {
        let (code, diagnostics) = transformed_with(source, TransformOptions::default());
        let errors: Vec<&Diagnostic> = diagnostics
            .iter()
            .filter(|d| d.severity == espalier_trellis::Severity::Error)
            .collect();
        assert!(errors.is_empty(), "unexpected errors: {errors:?}");
        code
    }

    #[test]
    fn test_exported_function_becomes_factory_call() {
        let code = transformed(
            "export function Counter() {\n  const count = ref(0)\n  return template`<p>{{ count }}</p>`\n}",
        );
        assert!(code.contains("export const Counter = _defineComponent({"));
        assert!(code.contains("__name: 'Counter'"));
        assert!(code.contains("setup(__props, { expose: __expose, emit: __emit })"));
        assert!(code.contains("import { defineComponent as _defineComponent } from 'espalier';"));
        assert!(!code.contains("template`"));
    }

    #[test]
    fn test_default_export_is_preserved() {
        let code = transformed("export default function App() { return template`<div/>` }");
        assert!(code.contains("export default _defineComponent({"));
        assert!(code.contains("__name: 'App'"));
    }

    #[test]
    fn test_setup_returns_bindings_with_accessors_for_lets() {
        let code = transformed(
            "function A() {\n  let count = 0\n  const msg = greet()\n  return template`<p/>` \n}",
        );
        assert!(code.contains("get count() { return count }"));
        assert!(code.contains("set count(v) { count = v }"));
        assert!(code.contains(" msg"));
        assert!(code.contains("__expose();"));
    }

    #[test]
    fn test_formal_param_props_build_a_schema() {
        let code = transformed(
            "function Badge(props: { msg: string, count?: number }) {\n  return template`<p>{{ props.msg }}</p>`\n}",
        );
        assert!(code.contains("props: {"));
        assert!(code.contains("msg: { type: String, required: true }"));
        assert!(code.contains("count: { type: Number, required: false }"));
        assert!(code.contains("const props = __props;"));
    }

    #[test]
    fn test_destructured_props_are_rewritten_to_accesses() {
        let code = transformed(
            "function A(props: { msg: string }) {\n  const { msg } = props\n  console.log(msg)\n  return template`<p/>`\n}",
        );
        assert!(!code.contains("const { msg } = props"));
        assert!(code.contains("console.log(props.msg)"));
    }

    #[test]
    fn test_shadowed_destructured_name_is_left_alone() {
        let code = transformed(
            "function A(props: { msg: string }) {\n  const { msg } = props\n  function inner(msg) { return msg }\n  return template`<p/>`\n}",
        );
        assert!(code.contains("function inner(msg) { return msg }"));
    }

    #[test]
    fn test_writing_a_destructured_prop_is_an_error() {
        let (_, diagnostics) = transformed_with(
            "function A(props: { msg: string }) {\n  const { msg } = props\n  msg = 'nope'\n  return template`<p/>`\n}",
            TransformOptions::default(),
        );
        assert!(diagnostics
            .iter()
            .any(|d| d.message.contains("read-only") && d.message.contains("msg")));
    }

    #[test]
    fn test_destructure_default_goes_through_defaults_helper() {
        let code = transformed(
            "function A(props: { msg?: string }) {\n  const { msg = 'hi' } = props\n  return template`<p>{{ msg }}</p>`\n}",
        );
        assert!(code.contains("_useDefaults(__props, { msg: 'hi' })"));
        assert!(code.contains("useDefaults as _useDefaults"));
    }

    #[test]
    fn test_await_is_wrapped_in_async_context() {
        let code = transformed(
            "async function A() {\n  const data = await load()\n  return template`<p>{{ data }}</p>`\n}",
        );
        assert!(code.contains("let __temp, __restore;"));
        assert!(code.contains("(([__temp, __restore] = _withAsyncContext(() => load()"));
        assert!(code.contains("__temp = await __temp, __restore(), __temp)"));
        assert!(code.contains("async setup(__props"));
    }

    #[test]
    fn test_discarded_await_keeps_no_value() {
        let code =
            transformed("async function A() {\n  await warmUp()\n  return template`<p/>`\n}");
        assert!(code.contains(")), await __temp, __restore())"));
        assert!(!code.contains("__temp = await __temp"));
    }

    #[test]
    fn test_literal_consts_hoist_to_module_scope() {
        let code = transformed(
            "function A() {\n  const LIMIT = 10\n  return template`<p>{{ LIMIT }}</p>`\n}",
        );
        let factory_at = code.find("= _defineComponent({").expect("factory present");
        let hoisted_at = code.find("const LIMIT = 10").expect("hoisted const present");
        assert!(hoisted_at < factory_at);
    }

    #[test]
    fn test_model_emits_update_event_and_prop() {
        let code = transformed(
            "function A() {\n  const value = defineModel()\n  return template`<p/>`\n}",
        );
        assert!(code.contains("modelValue: {}"));
        assert!(code.contains("'update:modelValue'"));
        assert!(code.contains("const value = _useModel(__props, 'modelValue');"));
    }

    #[test]
    fn test_scoped_style_adds_scope_id_and_import() {
        let code = transformed(
            "function A() {\n  defineStyle.scoped(`.a { color: red }`)\n  return template`<p class=\"a\"/>`\n}",
        );
        assert!(code.contains("__scopeId: 'esp-"));
        assert!(code.contains("?esp&scope=esp-"));
        assert!(code.contains("scoped=true"));
        assert!(!code.contains("defineStyle"));
    }

    #[test]
    fn test_css_vars_preamble() {
        let code = transformed(
            "function A() {\n  const c = ref('red')\n  defineStyle(`.a { color: v-bind(c) }`)\n  return template`<p/>`\n}",
        );
        assert!(code.contains("_useCssVars(_ctx => ({"));
        assert!(code.contains(": (c)"));
    }

    #[test]
    fn test_expose_payload_is_forwarded() {
        let code = transformed(
            "function A() {\n  const count = ref(0)\n  defineExpose({ count })\n  return template`<p/>`\n}",
        );
        assert!(code.contains("__expose({ count });"));
    }

    #[test]
    fn test_dev_hmr_emits_records_and_handler() {
        let options = TransformOptions {
            dev: true,
            hmr: true,
            ..TransformOptions::default()
        };
        let (code, _) =
            transformed_with("function A() { return template`<p/>` }", options);
        assert!(code.contains("__ESP_HMR__.record('"));
        assert!(code.contains("__hmrId: '"));
        assert!(code.contains("import.meta.hot.accept"));
        assert!(code.contains("export let __hmrRenderOnly = false;"));
        assert!(code.contains("export let __hmrChanged = '';"));
    }

    #[test]
    fn test_hmr_patch_sets_exported_flags() {
        let options = TransformOptions {
            dev: true,
            hmr: true,
            hmr_patch: Some(crate::hmr::HmrPatch {
                render_only: true,
                changed_component: Some("A".into()),
                change_kind: crate::hmr::HmrChangeKind::None,
            }),
            ..TransformOptions::default()
        };
        let (code, _) =
            transformed_with("function A() { return template`<p/>` }", options);
        assert!(code.contains("export let __hmrRenderOnly = true;"));
        assert!(code.contains("export let __hmrChanged = 'A';"));
    }

    #[test]
    fn test_inline_mode_returns_render_code() {
        let options = TransformOptions {
            inline: true,
            ..TransformOptions::default()
        };
        let (code, _) =
            transformed_with("function A() { return template`<p/>` }", options);
        assert!(code.contains("return () => null;"));
    }

    #[test]
    fn test_sibling_components_transform_independently() {
        let code = transformed(
            "function A() { return template`<B />` }\nfunction B() { return template`<i/>` }",
        );
        assert!(code.contains("const A = _defineComponent({"));
        assert!(code.contains("const B = _defineComponent({"));
        // Helper import is merged, not repeated.
        assert_eq!(code.matches("import { defineComponent").count(), 1);
    }
}
