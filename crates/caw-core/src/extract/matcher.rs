use std::sync::OnceLock;

use regex::Regex;

use super::{
    alphabet::{is_canonical_address, BASE58_CLASS, MAX_ADDRESS_LEN, MIN_ADDRESS_LEN},
    Detection, DetectionKind,
};

/// Characters a sender may wedge between address pieces.
const SEPARATOR_CLASS: &str = r"[-_.\s]";

fn standard_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(
            r"\b{BASE58_CLASS}{{{MIN_ADDRESS_LEN},{MAX_ADDRESS_LEN}}}\b"
        ))
        .expect("valid regex")
    })
}

fn obfuscated_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let piece = format!("{BASE58_CLASS}{{8,}}");
        let sep = format!("{SEPARATOR_CLASS}{{1,2}}");
        Regex::new(&format!("{piece}{sep}{piece}(?:{sep}{piece})*")).expect("valid regex")
    })
}

fn separator_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(SEPARATOR_CLASS).expect("valid regex"))
}

/// Intact addresses: word-bounded Base58 runs of canonical length.
///
/// Evidence is the address itself. Repeats of the same address are kept here;
/// the orchestrator collapses them.
pub fn match_standard(text: &str) -> Vec<Detection> {
    standard_re()
        .find_iter(text)
        .map(|m| Detection {
            address: m.as_str().to_string(),
            evidence: m.as_str().to_string(),
            kind: DetectionKind::Standard,
        })
        .collect()
}

/// Addresses broken up by separators (`-`, `_`, `.`, whitespace).
///
/// Each match has its separators removed; the result is kept only when it has
/// the canonical shape and is not already in `known`.
pub fn match_obfuscated(text: &str, known: &[Detection]) -> Vec<Detection> {
    let mut out: Vec<Detection> = Vec::new();
    for m in obfuscated_re().find_iter(text) {
        let cleaned = strip_separators(m.as_str());
        if !is_canonical_address(&cleaned) {
            continue;
        }
        if known.iter().chain(out.iter()).any(|d| d.address == cleaned) {
            continue;
        }
        out.push(Detection {
            address: cleaned,
            evidence: m.as_str().to_string(),
            kind: DetectionKind::Obfuscated,
        });
    }
    out
}

pub fn strip_separators(s: &str) -> String {
    separator_re().replace_all(s, "").into_owned()
}
