//! Compiler macro registry and reactivity API tables.
//!
//! Macros are ordinary-looking call expressions that configure a component
//! function and are always erased from the generated runtime body.

use espalier_trellis::phf_set;
use oxc_ast::ast::{CallExpression, Expression};

/// Built-in compiler macros
pub static BUILTIN_MACROS: &[&str] = &[
    "defineProp",
    "defineEmits",
    "defineSlots",
    "defineModel",
    "defineStyle",
    "defineExpose",
    "defineOptions",
    "defineCustomElement",
];

/// Check if a name is a built-in compiler macro
#[inline]
pub fn is_builtin_macro(name: &str) -> bool {
    BUILTIN_MACROS.contains(&name)
}

/// Reactive-runtime constructors/hooks that may not be called at the file
/// top level (outside any component function).
pub static REACTIVITY_APIS: espalier_trellis::PhfSet<&'static str> = phf_set! {
    "ref",
    "shallowRef",
    "customRef",
    "toRef",
    "toRefs",
    "reactive",
    "shallowReactive",
    "computed",
    "watch",
    "watchEffect",
    "useSlots",
    "useModel",
};

/// Constructors whose result is definitely a reactive cell.
pub static CELL_CONSTRUCTORS: espalier_trellis::PhfSet<&'static str> = phf_set! {
    "ref",
    "computed",
    "shallowRef",
    "customRef",
    "toRef",
};

/// Constructors producing a reactive object (not a cell).
pub static REACTIVE_OBJECT_CONSTRUCTORS: espalier_trellis::PhfSet<&'static str> = phf_set! {
    "reactive",
    "shallowReactive",
};

/// Style language tags accepted by `defineStyle`.
pub static STYLE_LANGS: espalier_trellis::PhfSet<&'static str> = phf_set! {
    "css",
    "scss",
    "sass",
    "less",
    "stylus",
    "postcss",
};

/// Kind of macro
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MacroKind {
    DefineProp = 0,
    DefineEmits = 1,
    DefineSlots = 2,
    DefineModel = 3,
    DefineStyle = 4,
    DefineExpose = 5,
    DefineOptions = 6,
    DefineCustomElement = 7,
}

impl MacroKind {
    #[inline]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "defineProp" => Some(Self::DefineProp),
            "defineEmits" => Some(Self::DefineEmits),
            "defineSlots" => Some(Self::DefineSlots),
            "defineModel" => Some(Self::DefineModel),
            "defineStyle" => Some(Self::DefineStyle),
            "defineExpose" => Some(Self::DefineExpose),
            "defineOptions" => Some(Self::DefineOptions),
            "defineCustomElement" => Some(Self::DefineCustomElement),
            _ => None,
        }
    }

    #[inline]
    pub fn name(self) -> &'static str {
        match self {
            Self::DefineProp => "defineProp",
            Self::DefineEmits => "defineEmits",
            Self::DefineSlots => "defineSlots",
            Self::DefineModel => "defineModel",
            Self::DefineStyle => "defineStyle",
            Self::DefineExpose => "defineExpose",
            Self::DefineOptions => "defineOptions",
            Self::DefineCustomElement => "defineCustomElement",
        }
    }

    /// Per-prop and per-model macros repeat; the rest are once per
    /// component function.
    #[inline]
    pub fn is_repeatable(self) -> bool {
        matches!(self, Self::DefineProp | Self::DefineModel)
    }
}

/// A resolved macro callee: the macro kind plus the member sub-method it
/// was invoked through, if any (`defineProp.withDefault`,
/// `defineStyle.scoped`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MacroCallee<'a> {
    pub kind: MacroKind,
    pub method: Option<&'a str>,
}

/// Resolve a call expression's callee to a macro, handling both the plain
/// form (`defineEmits(...)`) and the member form (`defineStyle.scoped(...)`).
pub fn resolve_macro_callee<'a>(call: &'a CallExpression<'a>) -> Option<MacroCallee<'a>> {
    match &call.callee {
        Expression::Identifier(id) => MacroKind::from_name(id.name.as_str())
            .map(|kind| MacroCallee { kind, method: None }),
        callee if callee.is_member_expression() => {
            let member = callee.as_member_expression()?;
            let Expression::Identifier(object) = member.object() else {
                return None;
            };
            let kind = MacroKind::from_name(object.name.as_str())?;
            let method = member.static_property_name()?;
            Some(MacroCallee {
                kind,
                method: Some(method),
            })
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name() {
        assert_eq!(MacroKind::from_name("defineProp"), Some(MacroKind::DefineProp));
        assert_eq!(MacroKind::from_name("defineStyle"), Some(MacroKind::DefineStyle));
        assert_eq!(MacroKind::from_name("ref"), None);
        assert!(is_builtin_macro("defineEmits"));
        assert!(!is_builtin_macro("useSlots"));
    }

    #[test]
    fn test_repeatability() {
        assert!(MacroKind::DefineProp.is_repeatable());
        assert!(MacroKind::DefineModel.is_repeatable());
        assert!(!MacroKind::DefineStyle.is_repeatable());
        assert!(!MacroKind::DefineExpose.is_repeatable());
        assert!(!MacroKind::DefineEmits.is_repeatable());
    }

    #[test]
    fn test_reactivity_tables() {
        assert!(REACTIVITY_APIS.contains("ref"));
        assert!(CELL_CONSTRUCTORS.contains("computed"));
        assert!(!CELL_CONSTRUCTORS.contains("reactive"));
        assert!(REACTIVE_OBJECT_CONSTRUCTORS.contains("reactive"));
        assert!(STYLE_LANGS.contains("scss"));
        assert!(!STYLE_LANGS.contains("coffeescript"));
    }
}
