//! Offset-addressed source editing.
//!
//! The transformer never re-serializes a syntax tree; it records
//! insert/remove/overwrite operations keyed by byte offsets into the
//! original buffer and commits them all at once. Commit produces the final
//! text plus a mapping table from output ranges back to original offsets.
//!
//! Overlapping range edits are a programming-contract violation: an earlier
//! pipeline stage handed us inconsistent spans, and emitting text for them
//! would corrupt the output, so commit panics instead.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone)]
struct Edit {
    start: usize,
    end: usize,
    text: String,
    seq: usize,
}

/// One segment of the output-to-original mapping.
///
/// Untouched segments copy `src_len` bytes starting at `src_start`.
/// Synthetic segments (inserted or overwritten text) have `src_len == 0`;
/// their `src_start` is the original offset they were anchored at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapSegment {
    pub out_start: usize,
    pub out_len: usize,
    pub src_start: usize,
    pub src_len: usize,
}

impl MapSegment {
    #[inline]
    pub fn is_synthetic(&self) -> bool {
        self.src_len == 0
    }
}

/// A position-preserving editor over one original source buffer.
#[derive(Debug)]
pub struct SourceEditor {
    original: String,
    edits: Vec<Edit>,
}

impl SourceEditor {
    pub fn new(original: impl Into<String>) -> Self {
        Self {
            original: original.into(),
            edits: Vec::new(),
        }
    }

    #[inline]
    pub fn original(&self) -> &str {
        &self.original
    }

    /// Insert text at a byte offset. Inserts at the same offset keep their
    /// call order in the output.
    pub fn insert(&mut self, offset: usize, text: impl Into<String>) {
        assert!(
            offset <= self.original.len(),
            "insert offset {} out of bounds (len {})",
            offset,
            self.original.len()
        );
        let seq = self.edits.len();
        self.edits.push(Edit {
            start: offset,
            end: offset,
            text: text.into(),
            seq,
        });
    }

    /// Remove the original bytes in `start..end`.
    pub fn remove(&mut self, start: usize, end: usize) {
        self.overwrite(start, end, String::new());
    }

    /// Replace the original bytes in `start..end` with new text.
    pub fn overwrite(&mut self, start: usize, end: usize, text: impl Into<String>) {
        assert!(
            start <= end && end <= self.original.len(),
            "overwrite range {}..{} out of bounds (len {})",
            start,
            end,
            self.original.len()
        );
        let seq = self.edits.len();
        self.edits.push(Edit {
            start,
            end,
            text: text.into(),
            seq,
        });
    }

    /// Insert text before the whole buffer.
    pub fn prepend(&mut self, text: impl Into<String>) {
        self.insert(0, text);
    }

    /// Insert text after the whole buffer.
    pub fn append(&mut self, text: impl Into<String>) {
        let len = self.original.len();
        self.insert(len, text);
    }

    /// Whether any edits have been recorded.
    pub fn is_dirty(&self) -> bool {
        !self.edits.is_empty()
    }

    /// Apply all recorded edits, producing the final text and the mapping
    /// table. Panics on overlapping range edits.
    pub fn commit(mut self) -> (String, Vec<MapSegment>) {
        // Inserts sort before range edits at the same offset so a preamble
        // inserted at a statement's start survives deletion of the statement.
        self.edits
            .sort_by(|a, b| (a.start, a.end, a.seq).cmp(&(b.start, b.end, b.seq)));

        let mut out = String::with_capacity(self.original.len() + 256);
        let mut map: Vec<MapSegment> = Vec::with_capacity(self.edits.len() * 2 + 1);
        let mut cursor = 0usize;

        for edit in &self.edits {
            if edit.start < cursor {
                panic!(
                    "overlapping edits: range {}..{} begins before committed offset {}",
                    edit.start, edit.end, cursor
                );
            }
            if edit.start > cursor {
                let slice = &self.original[cursor..edit.start];
                map.push(MapSegment {
                    out_start: out.len(),
                    out_len: slice.len(),
                    src_start: cursor,
                    src_len: slice.len(),
                });
                out.push_str(slice);
            }
            if !edit.text.is_empty() {
                map.push(MapSegment {
                    out_start: out.len(),
                    out_len: edit.text.len(),
                    src_start: edit.start,
                    src_len: 0,
                });
                out.push_str(&edit.text);
            }
            cursor = edit.end;
        }

        if cursor < self.original.len() {
            let slice = &self.original[cursor..];
            map.push(MapSegment {
                out_start: out.len(),
                out_len: slice.len(),
                src_start: cursor,
                src_len: slice.len(),
            });
            out.push_str(slice);
        }

        (out, map)
    }
}

/// Map an output byte offset back to its original offset, if it falls in an
/// untouched region.
pub fn map_back(map: &[MapSegment], out_offset: usize) -> Option<usize> {
    for segment in map {
        if out_offset >= segment.out_start && out_offset < segment.out_start + segment.out_len {
            if segment.is_synthetic() {
                return None;
            }
            return Some(segment.src_start + (out_offset - segment.out_start));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_remove() {
        let mut editor = SourceEditor::new("const a = 1\nconst b = 2\n");
        editor.remove(0, 12);
        editor.append("done\n");
        let (out, _) = editor.commit();
        assert_eq!(out, "const b = 2\ndone\n");
    }

    #[test]
    fn test_overwrite() {
        let mut editor = SourceEditor::new("let count = 0");
        editor.overwrite(4, 9, "__props.count");
        let (out, _) = editor.commit();
        assert_eq!(out, "let __props.count = 0");
    }

    #[test]
    fn test_inserts_keep_call_order_at_same_offset() {
        let mut editor = SourceEditor::new("body");
        editor.insert(0, "a");
        editor.insert(0, "b");
        let (out, _) = editor.commit();
        assert_eq!(out, "abbody");
    }

    #[test]
    fn test_insert_at_removed_range_start_survives() {
        let mut editor = SourceEditor::new("XXXkeep");
        editor.insert(0, "pre;");
        editor.remove(0, 3);
        let (out, _) = editor.commit();
        assert_eq!(out, "pre;keep");
    }

    #[test]
    #[should_panic(expected = "overlapping edits")]
    fn test_overlapping_edits_panic() {
        let mut editor = SourceEditor::new("0123456789");
        editor.remove(2, 6);
        editor.overwrite(4, 8, "x");
        let _ = editor.commit();
    }

    #[test]
    fn test_map_untouched_regions_round_trip() {
        let source = "const a = 1; const b = 2; const c = 3;";
        let mut editor = SourceEditor::new(source);
        editor.remove(13, 26);
        editor.prepend("// header\n");
        let (out, map) = editor.commit();

        // Every untouched output byte maps back to the identical original byte.
        for (out_offset, _) in out.char_indices() {
            if let Some(src_offset) = map_back(&map, out_offset) {
                assert_eq!(out.as_bytes()[out_offset], source.as_bytes()[src_offset]);
            }
        }
        // The prepended header is synthetic.
        assert_eq!(map_back(&map, 0), None);
        // "const a" survives at its shifted position.
        let shifted = out.find("const a").unwrap();
        assert_eq!(map_back(&map, shifted), Some(0));
    }
}
