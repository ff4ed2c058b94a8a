//! # espalier_trellis
//!
//! Trellis - the supporting framework for the Espalier compiler.
//!
//! ## Name Origin
//!
//! An **espalier** is a frame on which plants are trained to grow; the
//! *trellis* is the lattice everything else leans on. This crate holds the
//! foundational pieces every other Espalier crate leans on:
//!
//! - **Hashing**: xxh3-based content hashing for scope ids and hot-reload
//!   change detection
//! - **Diagnostics**: the severity/message/byte-range diagnostic type and
//!   the sink that collects them across pipeline stages
//! - **Source editing**: offset-addressed insert/remove/overwrite edits
//!   over an original buffer, committed into final text plus a mapping
//!   table

pub mod diagnostics;
pub mod edit;
pub mod hash;

pub use diagnostics::{Diagnostic, DiagnosticSink, Severity};
pub use edit::{MapSegment, SourceEditor};

// Re-export compact_str::CompactString for convenience
pub use compact_str::CompactString;

// Re-export smallvec for stack-optimized collections
pub use smallvec::{smallvec, SmallVec};

// Re-export rustc-hash for fast hash maps/sets
pub use rustc_hash::{FxHashMap, FxHashSet};

// Re-export phf for compile-time perfect hash functions
pub use phf::{phf_map, phf_set, Map as PhfMap, Set as PhfSet};

/// Normalize CRLF (and stray CR) line endings to LF.
///
/// HMR comparison must never classify a file-system-induced line-ending
/// change as a real edit.
pub fn normalize_line_endings(source: &str) -> std::borrow::Cow<'_, str> {
    if !source.contains('\r') {
        return std::borrow::Cow::Borrowed(source);
    }
    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\r' {
            if chars.peek() == Some(&'\n') {
                continue;
            }
            out.push('\n');
        } else {
            out.push(c);
        }
    }
    std::borrow::Cow::Owned(out)
}

/// Whether the source uses CRLF line endings anywhere.
#[inline]
pub fn has_crlf(source: &str) -> bool {
    source.contains("\r\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_line_endings() {
        assert_eq!(normalize_line_endings("a\r\nb"), "a\nb");
        assert_eq!(normalize_line_endings("a\rb"), "a\nb");
        assert_eq!(normalize_line_endings("a\nb"), "a\nb");
    }

    #[test]
    fn test_normalize_borrows_when_clean() {
        let s = "no carriage returns here";
        assert!(matches!(
            normalize_line_endings(s),
            std::borrow::Cow::Borrowed(_)
        ));
    }

    #[test]
    fn test_has_crlf() {
        assert!(has_crlf("a\r\nb"));
        assert!(!has_crlf("a\nb"));
    }
}
