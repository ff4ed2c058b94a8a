//! The compile driver: parse, discover, validate, analyze, transform.
//!
//! One call takes component-function source text and produces runtime
//! module code plus the analysis context the caller can retain for
//! hot-reload diffing. Validation failures abort before transformation,
//! transform-stage errors abort before emitting code; analysis warnings
//! ride along in the result.

use espalier_sprig::analyze::{analyze, AnalyzeOptions};
use espalier_sprig::discover::find_component_functions;
use espalier_sprig::{validate, FileContext};
use espalier_trellis::{Diagnostic, DiagnosticSink, MapSegment};
use oxc_allocator::Allocator;
use oxc_parser::Parser;
use oxc_span::SourceType;
use thiserror::Error;

use crate::hmr::diff;
use crate::template::TemplateCompiler;
use crate::transform::{transform_file, TransformOptions};

/// Options for one compile invocation.
#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Module identifier of the file, used for scope ids and style imports
    pub file_id: String,
    /// Development build
    pub dev: bool,
    /// Emit hot-reload records and the self-accepting handler
    pub hmr: bool,
    /// Inline compiled templates into setup's return
    pub inline: bool,
    /// Module specifier of the reactive runtime
    pub runtime_module: String,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            file_id: "anonymous.esp.ts".to_string(),
            dev: false,
            hmr: false,
            inline: false,
            runtime_module: "espalier".to_string(),
        }
    }
}

/// A successful compile.
#[derive(Debug)]
pub struct CompileResult {
    pub code: String,
    pub map: Vec<MapSegment>,
    /// Warnings (and transform-stage errors) collected along the way
    pub diagnostics: Vec<Diagnostic>,
    /// Retained analysis, the "previous" side of the next hot-reload diff
    pub file: FileContext,
}

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("parse error in `{file_id}`: {message}")]
    Parse { file_id: String, message: String },

    #[error("validation failed in `{file_id}`: {}", join_messages(.diagnostics))]
    Validation {
        file_id: String,
        diagnostics: Vec<Diagnostic>,
    },

    #[error("transform failed in `{file_id}`: {}", join_messages(.diagnostics))]
    Transform {
        file_id: String,
        diagnostics: Vec<Diagnostic>,
    },
}

fn join_messages(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .map(|d| d.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Compile one component-function source file.
///
/// `previous` is the retained analysis from the last successful compile of
/// the same file. When present under a dev+hmr build, the emitted hot-reload
/// handler carries the diff against it, so the client knows whether a
/// re-render suffices or a full module reload is needed.
pub fn compile(
    source: &str,
    options: &CompileOptions,
    template_compiler: &dyn TemplateCompiler,
    previous: Option<&FileContext>,
) -> Result<CompileResult, CompileError> {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, source, SourceType::ts()).parse();
    if ret.panicked || !ret.errors.is_empty() {
        let message = ret
            .errors
            .first()
            .map(|e| e.to_string())
            .unwrap_or_else(|| "parser could not recover".to_string());
        return Err(CompileError::Parse {
            file_id: options.file_id.clone(),
            message,
        });
    }

    let components = find_component_functions(&ret.program);
    log::debug!(
        "`{}`: {} component function(s) discovered",
        options.file_id,
        components.len()
    );

    let mut sink = DiagnosticSink::new();
    validate(
        source,
        &ret.program,
        &components,
        &options.runtime_module,
        &mut sink,
    );
    if sink.has_errors() {
        return Err(CompileError::Validation {
            file_id: options.file_id.clone(),
            diagnostics: sink.into_inner(),
        });
    }

    let analyze_options = AnalyzeOptions {
        hot_reload: options.dev && options.hmr,
        runtime_module: options.runtime_module.clone(),
    };
    let file = analyze(
        &options.file_id,
        source,
        &ret.program,
        &components,
        &analyze_options,
        &mut sink,
    );

    let hmr_patch = if options.dev && options.hmr {
        previous.map(|prev| diff(prev, &file))
    } else {
        None
    };

    let transform_options = TransformOptions {
        dev: options.dev,
        hmr: options.hmr,
        inline: options.inline,
        runtime_module: options.runtime_module.clone(),
        hmr_patch,
    };
    let result = transform_file(&components, &file, &transform_options, template_compiler, &mut sink);
    if sink.has_errors() {
        return Err(CompileError::Transform {
            file_id: options.file_id.clone(),
            diagnostics: sink.into_inner(),
        });
    }

    Ok(CompileResult {
        code: result.code,
        map: result.map,
        diagnostics: sink.into_inner(),
        file,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hmr::{diff, HmrChangeKind};
    use crate::template::NoopTemplateCompiler;

    fn compiled(source: &str) -> CompileResult {
        compile(source, &CompileOptions::default(), &NoopTemplateCompiler, None)
            .expect("source compiles")
    }

    #[test]
    fn test_full_pipeline() {
        let result = compiled(
            r#"
import { ref } from 'espalier'

export function Counter(props: { start: number }) {
  const count = ref(props.start)
  const double = () => count.value * 2
  defineStyle.scoped(`.c { color: v-bind(count) }`)
  return template`<p class="c">{{ count }} / {{ double() }}</p>`
}
"#,
        );
        assert!(result.code.contains("export const Counter = _defineComponent({"));
        assert!(result.code.contains("start: { type: Number, required: true }"));
        assert!(result.code.contains("_useCssVars"));
        assert!(result.code.contains("__scopeId"));
        assert_eq!(result.file.components.len(), 1);
    }

    #[test]
    fn test_parse_error_is_reported() {
        let err = compile(
            "function A( { return template`<p/>` }",
            &CompileOptions::default(),
            &NoopTemplateCompiler,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, CompileError::Parse { .. }));
    }

    #[test]
    fn test_validation_error_aborts_before_transform() {
        let err = compile(
            "const live = ref(0)\nfunction A() { return template`<p/>` }",
            &CompileOptions::default(),
            &NoopTemplateCompiler,
            None,
        )
        .unwrap_err();
        match err {
            CompileError::Validation { diagnostics, .. } => {
                assert!(!diagnostics.is_empty());
            }
            other => panic!("expected validation error, got {other}"),
        }
    }

    #[test]
    fn test_retained_file_feeds_hot_reload_diff() {
        let prev = compiled("function A() { const x = ref(1)\n  return template`<p>a</p>` }");
        let next = compiled("function A() { const x = ref(1)\n  return template`<p>b</p>` }");
        let patch = diff(&prev.file, &next.file);
        assert!(patch.render_only);
        assert_eq!(patch.change_kind, HmrChangeKind::None);
    }

    #[test]
    fn test_destructured_prop_write_fails_compile() {
        let err = compile(
            "function A(props: { msg: string }) {\n  const { msg } = props\n  msg = 'nope'\n  return template`<p/>`\n}",
            &CompileOptions::default(),
            &NoopTemplateCompiler,
            None,
        )
        .unwrap_err();
        match err {
            CompileError::Transform { diagnostics, .. } => {
                assert!(diagnostics.iter().any(|d| d.message.contains("read-only")));
            }
            other => panic!("expected transform error, got {other}"),
        }
    }

    #[test]
    fn test_hmr_flags_reflect_previous_diff() {
        let options = CompileOptions {
            dev: true,
            hmr: true,
            ..CompileOptions::default()
        };
        let prev = compile(
            "function A() { return template`<p>a</p>` }",
            &options,
            &NoopTemplateCompiler,
            None,
        )
        .expect("first build compiles");
        let next = compile(
            "function A() { return template`<p>b</p>` }",
            &options,
            &NoopTemplateCompiler,
            Some(&prev.file),
        )
        .expect("rebuild compiles");
        assert!(prev.code.contains("export let __hmrRenderOnly = false;"));
        assert!(next.code.contains("export let __hmrRenderOnly = true;"));
        assert!(next.code.contains("export let __hmrChanged = 'A';"));
    }

    #[test]
    fn test_empty_file_compiles_to_itself() {
        let result = compiled("export const helper = (n: number) => n + 1\n");
        assert!(result.code.contains("export const helper"));
        assert!(result.file.components.is_empty());
    }
}
