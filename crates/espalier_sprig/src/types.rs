//! Binding classification types.

use espalier_trellis::FxHashMap;
use serde::{Deserialize, Serialize};

/// Binding type for an identifier declared inside a component function.
///
/// Governs how the template-reference compiler must read the identifier:
/// plain, `.value`, or through a defensive unwrap helper.
///
/// `#[repr(u8)]` keeps the variants at a single byte; these sit in large
/// per-component maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[repr(u8)]
pub enum BindingType {
    /// Variable declared with let/var in the component body
    SetupLet = 0,
    /// Const binding that may or may not be a reactive cell at runtime
    SetupMaybeRef = 1,
    /// Const binding that is definitely a reactive cell
    SetupRef = 2,
    /// Reactive-object binding (reactive(), shallowReactive())
    SetupReactiveConst = 3,
    /// Const binding that can never be a reactive cell
    SetupConst = 4,
    /// Binding backed by a declared prop
    Props = 5,
    /// Prop destructured under a different local name
    PropsAliased = 6,
    /// Statically evaluable constant, hoisted out of setup
    LiteralConst = 7,
}

impl BindingType {
    /// Whether template reads of this binding need a defensive unwrap.
    #[inline]
    pub fn needs_unwrap(self) -> bool {
        matches!(self, BindingType::SetupMaybeRef | BindingType::SetupLet)
    }

    /// Whether template reads resolve through `.value`.
    #[inline]
    pub fn is_ref(self) -> bool {
        matches!(self, BindingType::SetupRef)
    }
}

/// Serializable per-component binding view, consumed by the external
/// template compiler and IDE layers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BindingMetadata {
    /// Identifier name -> binding type
    pub bindings: FxHashMap<String, BindingType>,

    /// Props destructured under an alias (local name -> prop key)
    pub props_aliases: FxHashMap<String, String>,
}

impl BindingMetadata {
    pub fn add(&mut self, name: impl Into<String>, binding_type: BindingType) {
        self.bindings.insert(name.into(), binding_type);
    }

    pub fn get(&self, name: &str) -> Option<BindingType> {
        self.bindings.get(name).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_needs_unwrap() {
        assert!(BindingType::SetupMaybeRef.needs_unwrap());
        assert!(BindingType::SetupLet.needs_unwrap());
        assert!(!BindingType::SetupRef.needs_unwrap());
        assert!(!BindingType::LiteralConst.needs_unwrap());
    }

    #[test]
    fn test_metadata_roundtrip() {
        let mut meta = BindingMetadata::default();
        meta.add("count", BindingType::SetupRef);
        let json = serde_json::to_string(&meta).unwrap();
        assert!(json.contains("setup-ref"));
        let back: BindingMetadata = serde_json::from_str(&json).unwrap();
        assert_eq!(back.get("count"), Some(BindingType::SetupRef));
    }
}
