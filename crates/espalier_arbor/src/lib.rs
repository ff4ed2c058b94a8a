//! # espalier_arbor
//!
//! Arbor - the transformation layer and compile driver for Espalier.
//!
//! ## Name Origin
//!
//! An **arbor** is the frame a trained plant actually grows on. This crate
//! is the frame the analyzed component functions are bent around: it takes
//! the semantic picture built by `espalier_sprig` and reshapes the original
//! source, byte range by byte range, into runtime component objects.
//!
//! ## Purpose
//!
//! - **Style order resolution**: topological child-first ordering of
//!   style-import emission across same-file components
//! - **Transformation**: macro stripping, async-context wrapping,
//!   destructured-prop rewriting, setup preamble/epilogue assembly, and
//!   the runtime factory wrap, all as offset-addressed edits
//! - **HMR diffing**: classify the difference between two successive
//!   analyses of one file as render-only, style-only, or module reload
//! - **Compile driver**: parse, validate, analyze, transform in one call
//!
//! ## Architecture
//!
//! ```text
//! espalier_sprig (Analyze)
//!       ↓
//! espalier_arbor (Transform)   ← this crate
//!       ↓
//! transformed source + map
//! ```

pub mod compile;
pub mod hmr;
pub mod style_order;
pub mod template;
pub mod transform;

pub use compile::{compile, CompileError, CompileOptions, CompileResult};
pub use hmr::{diff, HmrChangeKind, HmrPatch};
pub use style_order::{render_style_imports, resolve_style_order};
pub use template::{CompiledTemplate, NoopTemplateCompiler, TemplateCompiler, TemplateError};
pub use transform::{transform_file, TransformOptions, TransformResult};
