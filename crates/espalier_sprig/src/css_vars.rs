//! CSS variable-binding discovery.
//!
//! Style sources may read component state through `v-bind(expr)`. Each
//! distinct expression becomes a CSS custom property whose name is a
//! short hash of the binding-function name plus the expression text, so
//! the same expression resolves to the same property in every block.

use espalier_trellis::hash::short_hash;

use crate::context::CssVarBinding;

const BIND_FN: &str = "v-bind";

/// Scan style source for `v-bind(expr)` occurrences, skipping comments
/// and string literals. Duplicate expressions collapse to one binding,
/// first occurrence wins the ordering.
pub fn scan_css_var_bindings(css: &str) -> Vec<CssVarBinding> {
    let bytes = css.as_bytes();
    let mut bindings: Vec<CssVarBinding> = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i += 2;
                while i + 1 < bytes.len() && !(bytes[i] == b'*' && bytes[i + 1] == b'/') {
                    i += 1;
                }
                i = (i + 2).min(bytes.len());
            }
            quote @ (b'"' | b'\'') => {
                i += 1;
                while i < bytes.len() && bytes[i] != quote {
                    if bytes[i] == b'\\' {
                        i += 1;
                    }
                    i += 1;
                }
                i += 1;
            }
            b'v' if css[i..].starts_with("v-bind(") => {
                let expr_start = i + BIND_FN.len() + 1;
                match read_bound_expression(css, expr_start) {
                    Some((expression, next)) => {
                        if !bindings.iter().any(|b| b.expression == expression) {
                            let id = short_hash(&format!("{BIND_FN}{expression}"));
                            bindings.push(CssVarBinding {
                                id: id.into(),
                                expression: expression.into(),
                            });
                        }
                        i = next;
                    }
                    None => i = expr_start,
                }
            }
            _ => i += 1,
        }
    }

    bindings
}

/// Read the expression between the parens, starting just after the `(`.
/// A quoted expression may itself contain parens; an unquoted one ends at
/// the first `)`. Returns the trimmed expression and the index past the
/// closing paren.
fn read_bound_expression(css: &str, start: usize) -> Option<(String, usize)> {
    let bytes = css.as_bytes();
    let mut i = start;
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }

    if let Some(&quote @ (b'"' | b'\'')) = bytes.get(i) {
        let inner_start = i + 1;
        let mut j = inner_start;
        while j < bytes.len() && bytes[j] != quote {
            if bytes[j] == b'\\' {
                j += 1;
            }
            j += 1;
        }
        if j >= bytes.len() {
            return None;
        }
        let close = css[j + 1..].find(')')? + j + 1;
        return Some((css[inner_start..j].trim().to_string(), close + 1));
    }

    let close = css[i..].find(')')? + i;
    let expr = css[i..close].trim();
    if expr.is_empty() {
        return None;
    }
    Some((expr.to_string(), close + 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_scan() {
        let css = ".a { color: v-bind(color); width: v-bind('size.width'); }";
        let bindings = scan_css_var_bindings(css);
        assert_eq!(bindings.len(), 2);
        assert_eq!(bindings[0].expression, "color");
        assert_eq!(bindings[1].expression, "size.width");
    }

    #[test]
    fn test_duplicates_collapse() {
        let css = ".a { color: v-bind(c) } .b { border-color: v-bind(c) }";
        let bindings = scan_css_var_bindings(css);
        assert_eq!(bindings.len(), 1);
    }

    #[test]
    fn test_id_is_stable_and_expression_keyed() {
        let first = scan_css_var_bindings(".a { color: v-bind(c) }");
        let second = scan_css_var_bindings(".b { margin: v-bind(c) }");
        assert_eq!(first[0].id, second[0].id);

        let other = scan_css_var_bindings(".a { color: v-bind(d) }");
        assert_ne!(first[0].id, other[0].id);
    }

    #[test]
    fn test_comments_and_strings_skipped() {
        let css = r#"
/* color: v-bind(dead) */
.a { content: "v-bind(alsoDead)"; color: v-bind(live) }
"#;
        let bindings = scan_css_var_bindings(css);
        assert_eq!(bindings.len(), 1);
        assert_eq!(bindings[0].expression, "live");
    }

    #[test]
    fn test_quoted_expression_with_parens() {
        let css = ".a { width: v-bind('clamp(min, val, max)') }";
        let bindings = scan_css_var_bindings(css);
        assert_eq!(bindings.len(), 1);
        assert_eq!(bindings[0].expression, "clamp(min, val, max)");
    }

    #[test]
    fn test_empty_parens_ignored() {
        assert!(scan_css_var_bindings(".a { color: v-bind() }").is_empty());
    }
}
