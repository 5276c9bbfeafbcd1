// ABOUTME: Citation key normalization for the metadata map
// ABOUTME: Canonicalizes UUID keys to braced form while preserving hex digit casing

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // A UUID with optional surrounding braces, quotes, or whitespace. The hex
    // digits are captured as received so their casing survives normalization.
    static ref UUID_KEY: Regex = Regex::new(
        r#"(?i)^["'\s]*\{?([0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12})\}?["'\s]*$"#
    )
    .unwrap();
}

/// Returns true if the token is a UUID, with or without braces.
pub fn is_uuid_key(raw: &str) -> bool {
    UUID_KEY.is_match(raw)
}

/// Normalize a citation key to canonical braced-UUID form (`{ABCD...}`).
///
/// Metadata map keys arrive with inconsistent bracket conventions; the map is
/// always stored keyed by the braced form. Returns `None` when the input is
/// not a UUID at all.
pub fn normalize_citation_key(raw: &str) -> Option<String> {
    UUID_KEY
        .captures(raw)
        .map(|caps| format!("{{{}}}", &caps[1]))
}

/// The un-braced form of a UUID key, used as the fallback lookup direction.
pub fn unbraced_citation_key(raw: &str) -> Option<String> {
    UUID_KEY.captures(raw).map(|caps| caps[1].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const BARE: &str = "ABCDEF12-3456-7890-ABCD-EF1234567890";

    #[test]
    fn test_normalize_adds_braces() {
        assert_eq!(
            normalize_citation_key(BARE),
            Some(format!("{{{}}}", BARE))
        );
    }

    #[test]
    fn test_normalize_keeps_existing_braces() {
        let braced = format!("{{{}}}", BARE);
        assert_eq!(normalize_citation_key(&braced), Some(braced));
    }

    #[test]
    fn test_normalize_strips_quotes_and_whitespace() {
        let quoted = format!("\" {{{}}} \"", BARE);
        assert_eq!(
            normalize_citation_key(&quoted),
            Some(format!("{{{}}}", BARE))
        );
    }

    #[test]
    fn test_hex_casing_is_preserved() {
        let lower = BARE.to_lowercase();
        assert_eq!(
            normalize_citation_key(&lower),
            Some(format!("{{{}}}", lower))
        );
    }

    #[test]
    fn test_unbraced_form() {
        let braced = format!("{{{}}}", BARE);
        assert_eq!(unbraced_citation_key(&braced), Some(BARE.to_string()));
    }

    #[test]
    fn test_non_uuid_keys_pass_through() {
        assert_eq!(normalize_citation_key("ML21049A274"), None);
        assert_eq!(normalize_citation_key("3"), None);
        assert!(!is_uuid_key("Some Document Title"));
    }
}
