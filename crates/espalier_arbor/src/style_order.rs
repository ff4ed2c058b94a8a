//! Style-import ordering across same-file components.
//!
//! When component A renders component B, B's style rules must land before
//! A's in source order so descendant styles win under source-order
//! specificity. The reference graph comes from template tag usage; a
//! cycle yields no ordering and callers fall back to declaration order.

use espalier_sprig::FileContext;
use espalier_trellis::DiagnosticSink;

/// Resolve a child-first ordering of component indices.
///
/// Returns `None` when the reference graph contains a cycle. The cycle is
/// reported as a warning; declaration order remains a usable fallback.
pub fn resolve_style_order(file: &FileContext, sink: &mut DiagnosticSink) -> Option<Vec<usize>> {
    let count = file.components.len();

    // children[a] holds the same-file components a's template renders.
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); count];
    for (a, component) in file.components.iter().enumerate() {
        for (b, other) in file.components.iter().enumerate() {
            if a != b && references_tag(&component.template, &other.name) {
                children[a].push(b);
            }
        }
    }

    // Three-color depth-first traversal with an explicit stack. White is
    // unvisited, gray is in progress, black is done; meeting gray again
    // is a cycle.
    const WHITE: u8 = 0;
    const GRAY: u8 = 1;
    const BLACK: u8 = 2;

    let mut color = vec![WHITE; count];
    let mut order: Vec<usize> = Vec::with_capacity(count);

    for root in 0..count {
        if color[root] != WHITE {
            continue;
        }
        let mut stack: Vec<(usize, usize)> = vec![(root, 0)];
        color[root] = GRAY;

        while let Some((node, child_pos)) = stack.last_mut() {
            if let Some(&child) = children[*node].get(*child_pos) {
                *child_pos += 1;
                match color[child] {
                    WHITE => {
                        color[child] = GRAY;
                        stack.push((child, 0));
                    }
                    GRAY => {
                        let a = &file.components[*node];
                        let b = &file.components[child];
                        sink.warning(
                            format!(
                                "style ordering fell back to declaration order: `{}` and `{}` reference each other",
                                a.name, b.name
                            ),
                            b.fn_start,
                            b.fn_start,
                        );
                        return None;
                    }
                    _ => {}
                }
            } else {
                let (node, _) = stack.pop().expect("stack is non-empty");
                color[node] = BLACK;
                order.push(node);
            }
        }
    }

    Some(order)
}

/// Render the per-component style import lines, child-first.
///
/// Each style block is addressed by (scope id, language, scoped flag,
/// index); the surrounding build tool resolves these back to the style
/// source and runs the preprocessor. Custom elements carry their styles
/// on the component object and get no import lines.
pub fn render_style_imports(file: &FileContext, order: Option<&[usize]>) -> String {
    let declaration_order: Vec<usize> = (0..file.components.len()).collect();
    let indices = order.unwrap_or(&declaration_order);

    let mut out = String::new();
    for &index in indices {
        let component = &file.components[index];
        if component.is_custom_element {
            continue;
        }
        for (style_index, style) in component.styles.iter().enumerate() {
            out.push_str(&format!(
                "import '{}?esp&scope={}&lang={}&scoped={}&index={}';\n",
                file.file_id,
                component.scope_id,
                style.lang.as_str(),
                style.scoped,
                style_index,
            ));
        }
    }
    out
}

/// Whether a template uses `name` as a tag.
fn references_tag(template: &str, name: &str) -> bool {
    let bytes = template.as_bytes();
    let mut search_from = 0;
    while let Some(pos) = template[search_from..].find(name) {
        let start = search_from + pos;
        let end = start + name.len();
        let opens_tag = start > 0 && bytes[start - 1] == b'<';
        let closes_cleanly = end >= bytes.len()
            || !(bytes[end].is_ascii_alphanumeric() || bytes[end] == b'_' || bytes[end] == b'-');
        if opens_tag && closes_cleanly {
            return true;
        }
        search_from = start + 1;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use espalier_sprig::analyze::{analyze, AnalyzeOptions};
    use espalier_sprig::discover::find_component_functions;
    use oxc_allocator::Allocator;
    use oxc_parser::Parser;
    use oxc_span::SourceType;

    fn analyzed(source: &str) -> FileContext {
        let allocator = Allocator::default();
        let ret = Parser::new(&allocator, source, SourceType::ts()).parse();
        assert!(!ret.panicked);
        let components = find_component_functions(&ret.program);
        let mut sink = DiagnosticSink::new();
        analyze(
            "src/App.esp.ts",
            source,
            &ret.program,
            &components,
            &AnalyzeOptions::default(),
            &mut sink,
        )
    }

    #[test]
    fn test_chain_orders_child_first() {
        let file = analyzed(
            r#"
function A() {
  defineStyle(`.a {}`)
  return template`<div><B /></div>`
}
function B() {
  defineStyle(`.b {}`)
  return template`<div><C /></div>`
}
function C() {
  defineStyle(`.c {}`)
  return template`<span/>`
}
"#,
        );
        let mut sink = DiagnosticSink::new();
        let order = resolve_style_order(&file, &mut sink).unwrap();
        let names: Vec<&str> = order.iter().map(|&i| file.components[i].name.as_str()).collect();
        assert_eq!(names, vec!["C", "B", "A"]);
        assert!(sink.is_empty());
    }

    #[test]
    fn test_cycle_returns_none_with_warning() {
        let file = analyzed(
            r#"
function A() { return template`<B />` }
function B() { return template`<A />` }
"#,
        );
        let mut sink = DiagnosticSink::new();
        assert!(resolve_style_order(&file, &mut sink).is_none());
        assert_eq!(sink.len(), 1);
        assert!(!sink.has_errors());
    }

    #[test]
    fn test_unreferenced_components_keep_a_total_order() {
        let file = analyzed(
            r#"
function A() { return template`<div/>` }
function B() { return template`<div/>` }
"#,
        );
        let mut sink = DiagnosticSink::new();
        let order = resolve_style_order(&file, &mut sink).unwrap();
        assert_eq!(order.len(), 2);
    }

    #[test]
    fn test_tag_match_requires_word_boundary() {
        assert!(references_tag("<Badge />", "Badge"));
        assert!(references_tag("<Badge/>", "Badge"));
        assert!(!references_tag("<BadgeList />", "Badge"));
        assert!(!references_tag("Badge", "Badge"));
    }

    #[test]
    fn test_custom_element_styles_are_not_imported() {
        let file = analyzed(
            r#"
function Widget() {
  defineCustomElement()
  defineStyle(`.w {}`)
  return template`<div/>`
}
function Plain() {
  defineStyle(`.p {}`)
  return template`<div/>`
}
"#,
        );
        let mut sink = DiagnosticSink::new();
        let order = resolve_style_order(&file, &mut sink);
        let imports = render_style_imports(&file, order.as_deref());
        assert_eq!(imports.matches('\n').count(), 1);
        assert!(imports.contains(&format!("scope={}", file.components[1].scope_id)));
        assert!(!imports.contains(&format!("scope={}", file.components[0].scope_id)));
    }

    #[test]
    fn test_import_rendering() {
        let file = analyzed(
            r#"
function A() {
  defineStyle.scoped(scss`.a {}`)
  return template`<div/>`
}
"#,
        );
        let mut sink = DiagnosticSink::new();
        let order = resolve_style_order(&file, &mut sink);
        let imports = render_style_imports(&file, order.as_deref());
        assert_eq!(imports.matches('\n').count(), 1);
        assert!(imports.contains("lang=scss"));
        assert!(imports.contains("scoped=true"));
        assert!(imports.contains("index=0"));
        assert!(imports.contains(&format!("scope={}", file.components[0].scope_id)));
    }
}
