//! Fast hashing utilities using xxHash3.
//!
//! Provides high-performance hashing for scope-id derivation and
//! hot-reload change detection.

use xxhash_rust::xxh3::xxh3_64;

/// Compute a 64-bit hash of the given bytes using xxHash3.
#[inline]
pub fn hash_bytes(data: &[u8]) -> u64 {
    xxh3_64(data)
}

/// Compute a 64-bit hash of the given string using xxHash3.
#[inline]
pub fn hash_str(data: &str) -> u64 {
    xxh3_64(data.as_bytes())
}

/// Convert a hash to a hex string (16 characters).
#[inline]
pub fn hash_to_hex(hash: u64) -> String {
    format!("{:016x}", hash)
}

/// Short 8-character hex hash of a string.
#[inline]
pub fn short_hash(content: &str) -> String {
    format!("{:08x}", hash_str(content) as u32)
}

/// Stable scope id for a component: `esp-` + 8 hex chars of
/// xxh3(file id + component name).
///
/// Must stay stable for a given (file id, name) pair across recompiles;
/// style scoping and hot-reload identity both key off it.
pub fn scope_id(file_id: &str, component_name: &str) -> String {
    let mut input = String::with_capacity(file_id.len() + component_name.len() + 1);
    input.push_str(file_id);
    input.push(':');
    input.push_str(component_name);
    let mut out = String::with_capacity(12);
    out.push_str("esp-");
    out.push_str(&short_hash(&input));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_consistency() {
        let content = "Hello, World!";
        assert_eq!(hash_str(content), hash_str(content));
        assert_eq!(hash_str(content), hash_bytes(content.as_bytes()));
        assert_eq!(hash_to_hex(hash_str(content)).len(), 16);
    }

    #[test]
    fn test_hash_difference() {
        assert_ne!(hash_str("Hello"), hash_str("World"));
    }

    #[test]
    fn test_scope_id_stable() {
        let a = scope_id("src/App.esp.ts", "Counter");
        let b = scope_id("src/App.esp.ts", "Counter");
        assert_eq!(a, b);
        assert!(a.starts_with("esp-"));
        assert_eq!(a.len(), 4 + 8);
    }

    #[test]
    fn test_scope_id_varies_by_name() {
        let a = scope_id("src/App.esp.ts", "Counter");
        let b = scope_id("src/App.esp.ts", "Display");
        assert_ne!(a, b);
    }
}
