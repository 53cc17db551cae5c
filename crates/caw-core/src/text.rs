//! Host-side text hygiene applied before extraction.

use std::sync::OnceLock;

use regex::Regex;

fn url_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"https?://\S+").expect("valid regex"))
}

/// Remove `http(s)://` links so addresses inside URLs are never reported.
pub fn strip_urls(text: &str) -> String {
    url_re().replace_all(text, "").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removes_links_and_keeps_the_rest() {
        let text = "see https://dexscreener.com/solana/9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM now";
        assert_eq!(strip_urls(text), "see  now");
    }

    #[test]
    fn leaves_plain_text_alone() {
        assert_eq!(strip_urls("no links here"), "no links here");
        assert_eq!(strip_urls("http:/broken"), "http:/broken");
    }
}
