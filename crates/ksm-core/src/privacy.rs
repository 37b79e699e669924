//! Redaction of `<private>` spans before content leaves the machine.

use std::sync::OnceLock;

use regex::Regex;

const REDACTED: &str = "[REDACTED]";

fn private_span() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?is)<private>.*?</private>").expect("private span pattern is valid")
    })
}

/// Replace every `<private>...</private>` span with a redaction marker.
pub fn strip_private_content(text: &str) -> String {
    private_span().replace_all(text, REDACTED).into_owned()
}

/// True when nothing but private spans and whitespace remains.
pub fn is_fully_private(text: &str) -> bool {
    private_span().replace_all(text, "").trim().is_empty()
}
