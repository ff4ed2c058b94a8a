//! # espalier_sprig
//!
//! Sprig - the semantic analysis layer for Espalier.
//!
//! ## Name Origin
//!
//! A **sprig** is the small shoot a gardener reads to judge how the whole
//! plant will grow. This crate reads each component function the same way:
//! from a handful of declarations and macro calls it derives everything the
//! transformer needs to know about the component's eventual runtime shape.
//!
//! ## Purpose
//!
//! - **Component discovery**: locate component functions (functions ending
//!   in a `template`-tagged literal) in a parsed file
//! - **Validation**: structural checks on macro usage and top-level code
//! - **Binding classification**: assign every declared identifier one of
//!   the fixed binding types that drive template-side unwrapping
//! - **Macro metadata extraction**: props, emits, slots, models, styles,
//!   expose/options payloads, custom-element flag
//! - **CSS variable bindings**: `v-bind(expr)` discovery in style sources
//!
//! ## Architecture
//!
//! ```text
//! oxc_parser (Parse)
//!       ↓
//! espalier_sprig (Analyze)   ← this crate
//!       ↓
//! espalier_arbor (Transform)
//! ```

pub mod analyze;
pub mod context;
pub mod css_vars;
pub mod discover;
pub mod macros;
pub mod types;
pub mod validate;
pub mod walk;

pub use analyze::{analyze, AnalyzeOptions};
pub use context::{
    AwaitSite, ComponentContext, CssVarBinding, DestructuredProp, FileContext, ImportMeta,
    ModelMeta, PropMeta, StatementInfo, StatementRole, StyleLang, StyleMeta,
};
pub use types::{BindingMetadata, BindingType};
pub use validate::validate;

/// Whether a module path refers to a component source file.
#[inline]
pub fn is_component_source(path: &str) -> bool {
    path.ends_with(".esp.ts") || path.ends_with(".esp")
}

/// Check if a string is a valid JavaScript identifier.
pub fn is_valid_identifier(s: &str) -> bool {
    if s.is_empty() {
        return false;
    }
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_component_source() {
        assert!(is_component_source("./Counter.esp.ts"));
        assert!(is_component_source("../widgets/Badge.esp"));
        assert!(!is_component_source("lodash"));
        assert!(!is_component_source("./helpers.ts"));
    }

    #[test]
    fn test_is_valid_identifier() {
        assert!(is_valid_identifier("msg"));
        assert!(is_valid_identifier("_private"));
        assert!(is_valid_identifier("$ref"));
        assert!(!is_valid_identifier("data-x"));
        assert!(!is_valid_identifier("1abc"));
        assert!(!is_valid_identifier(""));
    }
}
