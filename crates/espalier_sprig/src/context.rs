//! Per-file and per-component analysis contexts.
//!
//! A `FileContext` is built once per compile invocation, mutated through
//! the pipeline stages, and either discarded with the result or retained
//! by the caller as the "previous" side of a hot-reload diff. Style metas
//! back-reference their owning component by index, not by pointer.

use espalier_trellis::{hash::scope_id, CompactString, FxHashMap, SmallVec};
use once_cell::unsync::OnceCell;

use crate::types::{BindingMetadata, BindingType};

/// Style language tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum StyleLang {
    Css = 0,
    Scss = 1,
    Sass = 2,
    Less = 3,
    Stylus = 4,
    Postcss = 5,
}

impl StyleLang {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "css" => Some(Self::Css),
            "scss" => Some(Self::Scss),
            "sass" => Some(Self::Sass),
            "less" => Some(Self::Less),
            "stylus" => Some(Self::Stylus),
            "postcss" => Some(Self::Postcss),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Css => "css",
            Self::Scss => "scss",
            Self::Sass => "sass",
            Self::Less => "less",
            Self::Stylus => "stylus",
            Self::Postcss => "postcss",
        }
    }
}

/// One style block declared through `defineStyle`.
#[derive(Debug, Clone)]
pub struct StyleMeta {
    pub lang: StyleLang,
    /// Raw style source text
    pub source: String,
    /// Byte range of the style source in the original file
    pub start: usize,
    pub end: usize,
    pub scoped: bool,
    /// Index of the owning component in `FileContext::components`
    pub component: u32,
}

/// Metadata for one imported local name.
#[derive(Debug)]
pub struct ImportMeta {
    pub source: String,
    pub is_type: bool,
    pub is_default: bool,
    pub is_namespace: bool,
    used_in_template: OnceCell<bool>,
}

impl ImportMeta {
    pub fn new(source: impl Into<String>, is_type: bool, is_default: bool, is_namespace: bool) -> Self {
        Self {
            source: source.into(),
            is_type,
            is_default,
            is_namespace,
            used_in_template: OnceCell::new(),
        }
    }

    /// Whether this import's local name appears in any template in the
    /// file. Computed lazily on first query.
    pub fn is_used_in_template(&self, local: &str, templates: &[&str]) -> bool {
        *self.used_in_template.get_or_init(|| {
            templates
                .iter()
                .any(|t| contains_identifier(t, local))
        })
    }
}

pub(crate) fn contains_identifier(haystack: &str, name: &str) -> bool {
    let bytes = haystack.as_bytes();
    let mut search_from = 0;
    while let Some(pos) = haystack[search_from..].find(name) {
        let start = search_from + pos;
        let end = start + name.len();
        let before_ok = start == 0 || !is_ident_byte(bytes[start - 1]);
        let after_ok = end >= bytes.len() || !is_ident_byte(bytes[end]);
        if before_ok && after_ok {
            return true;
        }
        search_from = start + 1;
    }
    false
}

#[inline]
fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$' || b == b'-'
}

/// One declared prop.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropMeta {
    pub name: CompactString,
    /// Declared through a `defineProp` macro call rather than inferred from
    /// the formal-parameter type literal
    pub is_from_macro: bool,
    pub is_required: bool,
    /// Type is exactly boolean
    pub is_bool: bool,
    /// Type mentions boolean among others (union)
    pub is_maybe_bool: bool,
    /// Default value source text
    #[serde(default)]
    pub default: Option<String>,
    /// Validator function source text
    #[serde(default)]
    pub validator: Option<String>,
    /// Raw type-annotation text
    #[serde(default)]
    pub type_text: Option<String>,
    /// Prop key is not a plain identifier and must be quoted in the schema
    pub name_need_quoted: bool,
}

impl PropMeta {
    pub fn named(name: impl Into<CompactString>) -> Self {
        let name = name.into();
        let name_need_quoted = !crate::is_valid_identifier(&name);
        Self {
            name,
            is_from_macro: false,
            is_required: true,
            is_bool: false,
            is_maybe_bool: false,
            default: None,
            validator: None,
            type_text: None,
            name_need_quoted,
        }
    }
}

/// One `defineModel` declaration.
#[derive(Debug, Clone)]
pub struct ModelMeta {
    /// Model name (defaults to "modelValue")
    pub name: CompactString,
    /// Local binding name
    pub local: CompactString,
    /// Options object source text, if given
    pub options: Option<String>,
}

/// One `v-bind(expr)` occurrence in style source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CssVarBinding {
    /// Short hash id, used as the emitted CSS custom-property name
    pub id: CompactString,
    /// The bound expression text
    pub expression: CompactString,
}

/// One name destructured out of the props alias.
#[derive(Debug, Clone)]
pub struct DestructuredProp {
    /// Prop key on the props object
    pub key: CompactString,
    /// Local binding name
    pub local: CompactString,
    /// Default value source text
    pub default: Option<String>,
}

/// A top-level `await` inside a component-body statement.
#[derive(Debug, Clone, Copy)]
pub struct AwaitSite {
    /// Span of the whole `await expr` expression
    pub start: usize,
    pub end: usize,
    /// Span of the awaited operand
    pub arg_start: usize,
    pub arg_end: usize,
    /// Whether the surrounding statement consumes the awaited value
    pub needs_value: bool,
}

/// What a body statement is, from the transformer's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementRole {
    /// Ordinary statement, stays in the setup body
    Plain,
    /// Macro-call statement, deleted from the body
    MacroCall,
    /// Destructuring declaration reading from the props alias, deleted
    /// and replaced by rewritten property accesses
    PropsDestructure,
    /// The final template-returning statement, deleted from the body
    TemplateReturn,
}

/// Per-statement record, in textual order.
#[derive(Debug, Clone)]
pub struct StatementInfo {
    pub start: usize,
    pub end: usize,
    pub role: StatementRole,
    /// Fully-literal const declaration that can be hoisted to module scope
    pub hoistable: bool,
    pub awaits: SmallVec<[AwaitSite; 1]>,
}

/// Analysis result for one component function.
#[derive(Debug)]
pub struct ComponentContext {
    pub name: CompactString,
    pub is_exported: bool,
    pub is_default_export: bool,
    pub is_async: bool,
    /// Stable hash of (file id, name); style scoping and HMR identity
    pub scope_id: String,

    /// Byte range of the whole declaration statement (including `export`)
    pub fn_start: usize,
    pub fn_end: usize,
    /// Byte range of the function body, braces included
    pub body_start: usize,
    pub body_end: usize,

    /// Byte range of the `template\`...\`` tagged expression
    pub template_span: Option<(usize, usize)>,
    /// Raw template text (between the backticks)
    pub template: String,

    pub props_alias: Option<CompactString>,
    pub emits_alias: Option<CompactString>,
    pub slots_alias: Option<CompactString>,

    pub bindings: FxHashMap<String, BindingType>,
    /// Declaration-ordered props
    pub props: Vec<PropMeta>,
    pub emits: Vec<CompactString>,
    pub slots: Vec<CompactString>,
    pub models: Vec<ModelMeta>,

    /// Byte range of the expose payload object literal
    pub expose_span: Option<(usize, usize)>,
    /// Byte range of the options payload object literal
    pub options_span: Option<(usize, usize)>,

    pub styles: Vec<StyleMeta>,
    pub css_var_bindings: Vec<CssVarBinding>,

    /// Local name -> destructured prop record
    pub destructured_props: FxHashMap<String, DestructuredProp>,
    /// Trailing rest binding of the props destructuring, if any
    pub props_rest_id: Option<CompactString>,

    pub is_custom_element: bool,

    /// All body statements, in textual order
    pub statements: Vec<StatementInfo>,
}

impl ComponentContext {
    pub fn new(file_id: &str, name: impl Into<CompactString>) -> Self {
        let name = name.into();
        let scope_id = scope_id(file_id, &name);
        Self {
            name,
            is_exported: false,
            is_default_export: false,
            is_async: false,
            scope_id,
            fn_start: 0,
            fn_end: 0,
            body_start: 0,
            body_end: 0,
            template_span: None,
            template: String::new(),
            props_alias: None,
            emits_alias: None,
            slots_alias: None,
            bindings: FxHashMap::default(),
            props: Vec::new(),
            emits: Vec::new(),
            slots: Vec::new(),
            models: Vec::new(),
            expose_span: None,
            options_span: None,
            styles: Vec::new(),
            css_var_bindings: Vec::new(),
            destructured_props: FxHashMap::default(),
            props_rest_id: None,
            is_custom_element: false,
            statements: Vec::new(),
        }
    }

    /// Serializable binding view for external consumers.
    pub fn binding_metadata(&self) -> BindingMetadata {
        let mut meta = BindingMetadata::default();
        for (name, ty) in &self.bindings {
            meta.add(name.clone(), *ty);
        }
        for dp in self.destructured_props.values() {
            if dp.local != dp.key {
                meta.props_aliases
                    .insert(dp.local.to_string(), dp.key.to_string());
            }
        }
        meta
    }

    /// Names of all macro-declared props, in declaration order.
    pub fn macro_prop_names(&self) -> Vec<&str> {
        self.props
            .iter()
            .filter(|p| p.is_from_macro)
            .map(|p| p.name.as_str())
            .collect()
    }

}

/// Analysis result for one source file.
#[derive(Debug)]
pub struct FileContext {
    pub file_id: String,
    pub source: String,
    pub components: Vec<ComponentContext>,
    /// Imported local name -> metadata
    pub imports: FxHashMap<String, ImportMeta>,
    /// Names declared at the file top level, hoisted into every
    /// component's bindings as literal constants
    pub top_level_literals: Vec<CompactString>,
    /// Source used CRLF line endings
    pub original_crlf: bool,
    /// Compiling under a hot-reload-capable dev server
    pub hot_reload: bool,
}

impl FileContext {
    pub fn new(file_id: impl Into<String>, source: impl Into<String>) -> Self {
        let source = source.into();
        let original_crlf = espalier_trellis::has_crlf(&source);
        Self {
            file_id: file_id.into(),
            source,
            components: Vec::new(),
            imports: FxHashMap::default(),
            top_level_literals: Vec::new(),
            original_crlf,
            hot_reload: false,
        }
    }

    /// Ordered component names.
    pub fn component_names(&self) -> Vec<&str> {
        self.components.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn component_by_name(&self, name: &str) -> Option<&ComponentContext> {
        self.components.iter().find(|c| c.name == name)
    }

    /// Style metas grouped by owning scope id, in declaration order.
    pub fn styles_by_scope(&self) -> FxHashMap<&str, Vec<&StyleMeta>> {
        let mut map: FxHashMap<&str, Vec<&StyleMeta>> = FxHashMap::default();
        for component in &self.components {
            for style in &component.styles {
                map.entry(component.scope_id.as_str()).or_default().push(style);
            }
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_id_stability() {
        let a = ComponentContext::new("src/App.esp.ts", "Counter");
        let b = ComponentContext::new("src/App.esp.ts", "Counter");
        assert_eq!(a.scope_id, b.scope_id);
    }

    #[test]
    fn test_import_template_usage_is_lazy_and_cached() {
        let meta = ImportMeta::new("./Badge.esp.ts", false, true, false);
        let templates = ["<div><Badge /></div>"];
        assert!(meta.is_used_in_template("Badge", &templates));
        // Cached: a different template list does not change the answer.
        assert!(meta.is_used_in_template("Badge", &[]));
    }

    #[test]
    fn test_contains_identifier_word_boundaries() {
        assert!(contains_identifier("<Badge/>", "Badge"));
        assert!(!contains_identifier("<BadgeList/>", "Badge"));
        assert!(!contains_identifier("<my-badge/>", "badge"));
    }

    #[test]
    fn test_style_lang() {
        assert_eq!(StyleLang::from_tag("scss"), Some(StyleLang::Scss));
        assert_eq!(StyleLang::from_tag("styl"), None);
        assert_eq!(StyleLang::Less.as_str(), "less");
    }

    #[test]
    fn test_prop_meta_quoting() {
        assert!(!PropMeta::named("msg").name_need_quoted);
        assert!(PropMeta::named("data-x").name_need_quoted);
    }

    #[test]
    fn test_styles_grouped_by_scope() {
        let mut file = FileContext::new("src/App.esp.ts", "");
        let mut a = ComponentContext::new("src/App.esp.ts", "A");
        a.styles.push(StyleMeta {
            lang: StyleLang::Css,
            source: ".a {}".to_string(),
            start: 0,
            end: 5,
            scoped: true,
            component: 0,
        });
        let scope = a.scope_id.clone();
        file.components.push(a);
        file.components.push(ComponentContext::new("src/App.esp.ts", "B"));

        let grouped = file.styles_by_scope();
        assert_eq!(grouped.len(), 1);
        assert_eq!(grouped[scope.as_str()].len(), 1);
    }
}
