use std::{collections::HashSet, sync::OnceLock};

use regex::Regex;

use super::alphabet::{BASE58_CLASS, MIN_FRAGMENT_LEN};

/// A maximal run of Base58 characters found in a message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Fragment {
    pub text: String,
    /// Byte offset of the first character in the scanned text.
    pub position: usize,
}

impl Fragment {
    /// Byte offset just past the last character.
    pub fn end(&self) -> usize {
        self.position + self.text.len()
    }
}

fn fragment_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!("{BASE58_CLASS}{{{MIN_FRAGMENT_LEN},}}")).expect("valid regex")
    })
}

/// Scan `text` for Base58 runs of at least [`MIN_FRAGMENT_LEN`] characters.
///
/// Fragments come back in order of appearance; a run whose text repeats an
/// earlier fragment is dropped, so the first occurrence keeps its position.
pub fn scan_fragments(text: &str) -> Vec<Fragment> {
    let mut seen = HashSet::new();
    fragment_re()
        .find_iter(text)
        .filter(|m| seen.insert(m.as_str()))
        .map(|m| Fragment {
            text: m.as_str().to_string(),
            position: m.start(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_has_no_fragments() {
        assert!(scan_fragments("").is_empty());
        assert!(scan_fragments("   \n\t").is_empty());
    }

    #[test]
    fn seven_characters_is_too_short() {
        assert!(scan_fragments("abcdefg").is_empty());
        let frags = scan_fragments("abcdefgh");
        assert_eq!(frags.len(), 1);
        assert_eq!(frags[0].text, "abcdefgh");
    }

    #[test]
    fn runs_are_maximal_and_positioned() {
        // `0` and `l` are outside the alphabet and break runs.
        let text = "xx 9WzDXwBbmkg8 0 TbNMqUxvQRAy lZzDsGYdLVL";
        let frags = scan_fragments(text);
        let texts: Vec<&str> = frags.iter().map(|f| f.text.as_str()).collect();
        assert_eq!(texts, vec!["9WzDXwBbmkg8", "TbNMqUxvQRAy", "ZzDsGYdLVL"]);
        for f in &frags {
            assert_eq!(&text[f.position..f.end()], f.text);
        }
    }

    #[test]
    fn duplicates_keep_first_position() {
        let text = "abcdefgh then abcdefgh again";
        let frags = scan_fragments(text);
        let abc: Vec<&Fragment> = frags.iter().filter(|f| f.text == "abcdefgh").collect();
        assert_eq!(abc.len(), 1);
        assert_eq!(abc[0].position, 0);
    }

    #[test]
    fn positions_are_byte_offsets_after_multibyte_text() {
        let text = "🚀🚀 abcdefghjk";
        let frags = scan_fragments(text);
        assert_eq!(frags.len(), 1);
        assert_eq!(frags[0].position, text.find('a').unwrap());
    }
}
