//! Contract-address extraction engine.
//!
//! Pure and synchronous: no I/O, no shared mutable state. The host strips URLs
//! before calling [`extract`] and owns every notion of "already reported".
//!
//! Detection runs in three tiers:
//! - standard: intact, word-bounded Base58 runs of canonical length
//! - obfuscated: runs broken up by `-`, `_`, `.` or whitespace
//! - split: 2 or 3 disjoint fragments joined back together, only attempted when
//!   the first two tiers found nothing

use std::{collections::HashSet, fmt};

use serde::{Deserialize, Serialize};

pub mod alphabet;
pub mod markers;
pub mod matcher;
pub mod scanner;
pub mod split;

pub use alphabet::is_canonical_address;
pub use scanner::{scan_fragments, Fragment};
pub use split::OrderingDecision;

/// How an address was recovered from the message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectionKind {
    Standard,
    Obfuscated,
    Split,
}

impl DetectionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Obfuscated => "obfuscated",
            Self::Split => "split",
        }
    }
}

impl fmt::Display for DetectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recovered address.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Detection {
    /// Canonical, separator-free address.
    pub address: String,
    /// Matched text (obfuscated) or the joined fragments (split).
    pub evidence: String,
    pub kind: DetectionKind,
}

/// Recover every contract address in `text`.
///
/// Results are unique by address; the first detection of an address wins.
/// Never fails: text with nothing address-like yields an empty list.
pub fn extract(text: &str) -> Vec<Detection> {
    let mut results = matcher::match_standard(text);
    let obfuscated = matcher::match_obfuscated(text, &results);
    results.extend(obfuscated);

    if results.is_empty() {
        let fragments = scanner::scan_fragments(text);
        let endings = markers::classify_endings(&fragments, text);
        results.extend(split::reconstruct_split(&fragments, &endings));
    }

    let mut seen = HashSet::new();
    results.retain(|d| seen.insert(d.address.clone()));
    results
}
