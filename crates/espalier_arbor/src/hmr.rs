//! Hot-reload patch classification.
//!
//! A pure comparison of two successive analyses of the same file. The
//! dev server uses the result to pick the cheapest viable reload: patch
//! only the render output, re-inject styles, or tear the module down.

use compact_str::CompactString;
use espalier_sprig::{ComponentContext, FileContext};
use espalier_trellis::normalize_line_endings;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HmrChangeKind {
    None,
    Style,
    Module,
}

/// What a recompile changed, from the dev server's point of view.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HmrPatch {
    /// The running instance survives and only re-renders
    pub render_only: bool,
    /// The component the change belongs to, when attributable to one
    pub changed_component: Option<CompactString>,
    pub change_kind: HmrChangeKind,
}

impl HmrPatch {
    fn unchanged() -> Self {
        Self {
            render_only: false,
            changed_component: None,
            change_kind: HmrChangeKind::None,
        }
    }

    fn module_reload() -> Self {
        Self {
            render_only: false,
            changed_component: None,
            change_kind: HmrChangeKind::Module,
        }
    }

    pub fn is_unchanged(&self) -> bool {
        !self.render_only
            && self.changed_component.is_none()
            && self.change_kind == HmrChangeKind::None
    }
}

/// Classify the difference between two analyses of the same file.
pub fn diff(prev: &FileContext, next: &FileContext) -> HmrPatch {
    // A changed component list invalidates every identity in the file.
    if prev.component_names() != next.component_names() {
        return HmrPatch::module_reload();
    }

    for (a, b) in prev.components.iter().zip(next.components.iter()) {
        if script_text(prev, a) != script_text(next, b) {
            return HmrPatch {
                render_only: false,
                changed_component: Some(a.name.clone()),
                change_kind: HmrChangeKind::Module,
            };
        }

        let template_changed =
            normalize_line_endings(&a.template) != normalize_line_endings(&b.template);
        let styles_changed = style_texts(a) != style_texts(b);

        if template_changed {
            return HmrPatch {
                render_only: true,
                changed_component: Some(a.name.clone()),
                change_kind: HmrChangeKind::None,
            };
        }

        if styles_changed {
            // New variable bindings need setup to run again; a pure rule
            // edit does not.
            if css_var_names(a) == css_var_names(b) {
                return HmrPatch {
                    render_only: true,
                    changed_component: Some(a.name.clone()),
                    change_kind: HmrChangeKind::Style,
                };
            }
            return HmrPatch {
                render_only: false,
                changed_component: Some(a.name.clone()),
                change_kind: HmrChangeKind::Module,
            };
        }
    }

    HmrPatch::unchanged()
}

/// The component's body text with the template substring and every style
/// block removed, line endings normalized.
fn script_text(file: &FileContext, component: &ComponentContext) -> String {
    let body = &file.source[component.body_start..component.body_end];
    let base = component.body_start;

    // Ranges to cut, relative to the body slice.
    let mut cuts: Vec<(usize, usize)> = Vec::new();
    if let Some((start, end)) = component.template_span {
        cuts.push((start - base, end - base));
    }
    for style in &component.styles {
        cuts.push((style.start - base, style.end - base));
    }
    cuts.sort_unstable();

    let mut out = String::with_capacity(body.len());
    let mut cursor = 0;
    for (start, end) in cuts {
        out.push_str(&body[cursor..start]);
        cursor = end;
    }
    out.push_str(&body[cursor..]);

    normalize_line_endings(&out).into_owned()
}

fn style_texts(component: &ComponentContext) -> Vec<(String, bool)> {
    component
        .styles
        .iter()
        .map(|s| (normalize_line_endings(&s.source).into_owned(), s.scoped))
        .collect()
}

fn css_var_names(component: &ComponentContext) -> Vec<&str> {
    let mut names: Vec<&str> = component
        .css_var_bindings
        .iter()
        .map(|b| b.expression.as_str())
        .collect();
    names.sort_unstable();
    names
}
