use std::collections::HashSet;

use super::scanner::Fragment;

/// Suffix that marks a fragment as the tail of a launch-platform address.
pub const ENDING_SUFFIX: &str = "pump";

/// Tokens that, when they follow a fragment closely, mark it as the tail.
pub const ENDING_MARKERS: [&str; 3] = ["pumpfun", "pump.fun", "pump"];

/// How many characters after a fragment are searched for a marker.
pub const MARKER_WINDOW_CHARS: usize = 20;

/// Texts of the fragments classified as the final piece of a split address.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EndingSet(HashSet<String>);

impl EndingSet {
    pub fn contains(&self, fragment: &Fragment) -> bool {
        self.0.contains(&fragment.text)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Flag the fragments that look like the last piece of a split address.
///
/// Both checks are case-insensitive: the fragment ends with `pump`, or the
/// [`MARKER_WINDOW_CHARS`] characters right after it contain a marker token.
pub fn classify_endings(fragments: &[Fragment], text: &str) -> EndingSet {
    let mut endings = HashSet::new();
    for frag in fragments {
        if is_ending(frag, text) {
            endings.insert(frag.text.clone());
        }
    }
    EndingSet(endings)
}

fn is_ending(frag: &Fragment, text: &str) -> bool {
    if frag.text.to_lowercase().ends_with(ENDING_SUFFIX) {
        return true;
    }

    let after = text
        .get(frag.end()..)
        .unwrap_or_default()
        .chars()
        .take(MARKER_WINDOW_CHARS)
        .collect::<String>()
        .to_lowercase();
    ENDING_MARKERS.iter().any(|m| after.contains(m))
}
