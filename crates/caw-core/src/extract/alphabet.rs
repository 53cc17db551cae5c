//! Base58 alphabet and the canonical address shape.

/// Character class (regex syntax) for the Base58 alphabet: no `0`, `I`, `O`, `l`.
pub const BASE58_CLASS: &str = "[1-9A-HJ-NP-Za-km-z]";

/// Shortest run of Base58 characters that counts as an address fragment.
pub const MIN_FRAGMENT_LEN: usize = 8;

pub const MIN_ADDRESS_LEN: usize = 32;
pub const MAX_ADDRESS_LEN: usize = 44;

pub fn is_base58_char(c: char) -> bool {
    matches!(c, '1'..='9' | 'A'..='H' | 'J'..='N' | 'P'..='Z' | 'a'..='k' | 'm'..='z')
}

/// True iff `s` is entirely Base58 and 32..=44 characters long.
///
/// Base58 is ASCII-only, so byte length equals character length once the
/// alphabet check passes.
pub fn is_canonical_address(s: &str) -> bool {
    (MIN_ADDRESS_LEN..=MAX_ADDRESS_LEN).contains(&s.len()) && s.chars().all(is_base58_char)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn excludes_confusable_characters() {
        for c in ['0', 'I', 'O', 'l'] {
            assert!(!is_base58_char(c), "{c} must not be Base58");
        }
        for c in ['1', '9', 'A', 'H', 'J', 'N', 'P', 'Z', 'a', 'k', 'm', 'z', 'o'] {
            assert!(is_base58_char(c), "{c} must be Base58");
        }
        assert!(!is_base58_char('-'));
        assert!(!is_base58_char('é'));
    }

    #[test]
    fn canonical_shape_bounds() {
        assert!(!is_canonical_address(&"a".repeat(31)));
        assert!(is_canonical_address(&"a".repeat(32)));
        assert!(is_canonical_address(&"a".repeat(44)));
        assert!(!is_canonical_address(&"a".repeat(45)));
        assert!(!is_canonical_address(&format!("{}0", "a".repeat(35))));
        assert!(!is_canonical_address(""));
    }
}
