//! UK postcode recognition in free text.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

/// Some letters followed by a digit anywhere on the first line: an outward code or more.
static OUTWARD_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^.*[A-Z]{1,2}[0-9]").expect("outward pattern is valid"));

static FULL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)[A-Z]{1,2}[0-9][A-Z0-9]? [0-9][ABD-HJLNP-UW-Z]{2}")
        .expect("full postcode pattern is valid")
});

const INWARD_LEN: usize = 3;

/// Look for a UK postcode in `text`.
///
/// Returns `(false, text)` when nothing postcode-like is present. When a full postcode
/// is found it is returned compacted and uppercased (`"SW1A1AA"`). When only a partial
/// code is present the flag is still set but the original text comes back unchanged.
pub fn postcode_finder(text: &str) -> (bool, String) {
    if !OUTWARD_PATTERN.is_match(text) {
        return (false, text.to_owned());
    }
    match FULL_PATTERN.find(text) {
        Some(found) => {
            let postcode = compact(found.as_str());
            debug!(text, postcode, "Found postcode in text");
            (true, postcode)
        }
        None => (true, text.to_owned()),
    }
}

fn compact(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase()
}

/// Canonical `"OUTWARD INWARD"` form of a postcode, e.g. `"so167qf"` to `"SO16 7QF"`.
///
/// The inward code is always the last three characters. Anything too short or too long
/// to be a postcode gives `None`.
pub fn format_postcode(raw: &str) -> Option<String> {
    let compacted = compact(raw);
    if !(5..=7).contains(&compacted.len()) || !compacted.is_ascii() {
        return None;
    }
    let (outward, inward) = compacted.split_at(compacted.len() - INWARD_LEN);
    Some(format!("{outward} {inward}"))
}
