//! # Espalier
//!
//! A compiler that turns component functions into reactive component
//! objects through position-preserving source rewriting.
//!
//! A component function is an ordinary TypeScript function whose body ends
//! in a `` template`...` `` tagged literal and is configured by the
//! `define*` macro family (`defineProp`, `defineEmits`, `defineSlots`,
//! `defineModel`, `defineStyle`, `defineExpose`, `defineOptions`,
//! `defineCustomElement`). The compiler validates the file, classifies
//! every binding, resolves style ordering across sibling components,
//! rewrites the source in place, and can diff two successive analyses for
//! hot reload.
//!
//! ## Name Origin
//!
//! An **espalier** is a plant trained flat against a frame: the shape is
//! imposed without cutting the plant apart. The compiler treats source the
//! same way, rewriting by offset edits instead of reprinting an AST.
//!
//! ## Crates
//!
//! - [`trellis`] - hashing, diagnostics, offset-addressed source editing
//! - [`sprig`] - component discovery, validation, binding analysis
//! - [`arbor`] - transformation, style ordering, hot-reload diffing
//!
//! ## Quick start
//!
//! ```no_run
//! use espalier::{compile, CompileOptions, NoopTemplateCompiler};
//!
//! let source = r#"
//! export function Counter() {
//!   const count = ref(0)
//!   return template`<button @click="count++">{{ count }}</button>`
//! }
//! "#;
//!
//! let options = CompileOptions {
//!     file_id: "src/Counter.esp.ts".to_string(),
//!     ..CompileOptions::default()
//! };
//! let result = compile(source, &options, &NoopTemplateCompiler, None).unwrap();
//! println!("{}", result.code);
//! ```

/// Hashing, diagnostics, offset-addressed source editing.
pub use espalier_trellis as trellis;

/// Component discovery, validation, binding analysis.
pub use espalier_sprig as sprig;

/// Transformation, style ordering, hot-reload diffing.
pub use espalier_arbor as arbor;

pub use espalier_arbor::{
    compile, diff, CompileError, CompileOptions, CompileResult, CompiledTemplate, HmrChangeKind,
    HmrPatch, NoopTemplateCompiler, TemplateCompiler, TemplateError, TransformOptions,
};
pub use espalier_sprig::{BindingMetadata, BindingType, ComponentContext, FileContext};
pub use espalier_trellis::{Diagnostic, DiagnosticSink, Severity};
