//! Text normalization for duplicate detection and search-result matching.
//!
//! CRITICAL: the deduplicator, the quality upgrader and the local sync all
//! compare keys produced here. Changing a pattern changes which favorites are
//! considered the same song, so run the tests after any edit.

use any_ascii::any_ascii;
use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

// ============================================================================
// REGEX PATTERNS
// ============================================================================

/// Parenthesized `(...)` and bracketed `[...]` annotation spans.
pub static BRACKETED_SPAN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\([^)]*\)|\[[^\]]*\]").unwrap());

/// Edition/era markers, bare years and ordinals, matched as whole words.
pub static NOISE_WORDS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?i)\b(?:",
        r"digital\s+remaster|remaster(?:ed)?",
        r"|anniversary|deluxe|bonus",
        r"|album\s+version|single\s+version|radio\s+edit",
        r"|original|explicit|clean|live|acoustic|mono|stereo",
        r"|revisited|expanded|special\s+edition",
        r"|(?:19|20)\d{2}",  // years like 1999, 2011
        r"|\d+(?:st|nd|rd|th)", // 25th, 1st
        r")\b",
    ))
    .unwrap()
});

/// Anything that is not a lowercase ASCII letter, digit or whitespace.
pub static NON_ALPHANUMERIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9\s]").unwrap());

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

/// Check if a character is a Unicode combining mark (diacritical mark).
pub fn is_combining_mark(c: char) -> bool {
    matches!(c as u32, 0x0300..=0x036F | 0x1AB0..=0x1AFF | 0x1DC0..=0x1DFF | 0xFE20..=0xFE2F)
}

/// Fold Unicode text to lowercase ASCII: NFKD decomposition, combining marks
/// removed, then transliteration of whatever is still non-ASCII.
/// e.g. "Beyoncé" → "beyonce", "Motörhead" → "motorhead"
pub fn fold_to_ascii(s: &str) -> String {
    let stripped: String = s
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .collect();
    any_ascii(&stripped).to_lowercase()
}

/// Every remaining non-alphanumeric character becomes a space.
fn strip_symbols(s: &str) -> String {
    NON_ALPHANUMERIC.replace_all(s, " ").into_owned()
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ============================================================================
// NORMALIZATION FUNCTIONS
// ============================================================================

/// Canonical comparison key for a title or artist name.
///
/// Lower-cases, drops bracketed annotations, removes the noise vocabulary
/// (remaster/edition/era markers, years, ordinals), strips symbols and
/// collapses whitespace. Noise and symbol stripping repeat until the text
/// stops changing, so `normalize(normalize(x)) == normalize(x)`.
pub fn normalize(text: &str) -> String {
    let folded = fold_to_ascii(text);
    let mut current = BRACKETED_SPAN.replace_all(&folded, " ").into_owned();
    loop {
        let denoised = NOISE_WORDS.replace_all(&current, " ");
        let next = collapse_whitespace(&strip_symbols(&denoised));
        if next == current {
            return next;
        }
        current = next;
    }
}

/// Looser key for local file names: folding, bracket and symbol stripping,
/// but no noise vocabulary. Used for containment matching, not grouping.
pub fn normalize_loose(text: &str) -> String {
    let folded = fold_to_ascii(text);
    let unbracketed = BRACKETED_SPAN.replace_all(&folded, " ");
    collapse_whitespace(&strip_symbols(&unbracketed))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_basic() {
        assert_eq!(normalize("Hotel California (Remastered 2013)"), "hotel california");
        assert_eq!(normalize("hotel california"), "hotel california");
        assert_eq!(normalize("  Hotel   CALIFORNIA!! "), "hotel california");
    }

    #[test]
    fn test_normalize_noise_vocabulary() {
        assert_eq!(normalize("Song - Remastered 2011"), "song");
        assert_eq!(normalize("Song - 2001 Digital Remaster"), "song");
        assert_eq!(normalize("Song - 25th Anniversary Edition"), "song edition");
        assert_eq!(normalize("Song - Single Version"), "song");
        assert_eq!(normalize("Song (Live at Wembley)"), "song");
        assert_eq!(normalize("Song [Mono]"), "song");
        assert_eq!(normalize("Song - Special Edition"), "song");
        assert_eq!(normalize("Song - Radio Edit"), "song");
    }

    #[test]
    fn test_noise_words_are_whole_words_only() {
        // "olive" contains "live", "cleaner" contains "clean"
        assert_eq!(normalize("Olive Tree"), "olive tree");
        assert_eq!(normalize("Cleaner"), "cleaner");
        // Only 19xx/20xx are years
        assert_eq!(normalize("1812 Overture"), "1812 overture");
    }

    #[test]
    fn test_normalize_idempotent() {
        let samples = [
            "Hotel California (Remastered 2013)",
            "x_2013",
            "Album Single Version Version",
            "Don't Stop Me Now - 2011 Mix",
            "Beyoncé – Halo [Live]",
            "Rock & Roll (1st take)",
            "кино",
            "",
        ];
        for s in samples {
            let once = normalize(s);
            assert_eq!(normalize(&once), once, "not idempotent for {:?}", s);
        }
    }

    #[test]
    fn test_normalize_exposed_noise_is_stripped() {
        // Symbol stripping turns "_2013" into a bare year on the second pass
        assert_eq!(normalize("x_2013"), "x");
        // Removing "single version" exposes "album version"
        assert_eq!(normalize("Album Single Version Version"), "");
    }

    #[test]
    fn test_normalize_folding_and_punctuation() {
        assert_eq!(normalize("Beyoncé"), normalize("Beyonce"));
        assert_eq!(normalize("Don’t Stop"), "don t stop");
        assert_eq!(normalize("Don't Stop"), normalize("Don’t Stop"));
        assert_eq!(normalize("Simon & Garfunkel"), "simon garfunkel");
        assert_eq!(normalize("Rock & Roll"), normalize("Rock Roll"));
    }

    #[test]
    fn test_fold_to_ascii() {
        assert_eq!(fold_to_ascii("Björk"), "bjork");
        assert_eq!(fold_to_ascii("Motörhead"), "motorhead");
        assert_eq!(fold_to_ascii("Beyoncé"), "beyonce");
    }

    #[test]
    fn test_normalize_loose_keeps_noise_words() {
        assert_eq!(normalize_loose("Song (Remastered)"), "song");
        assert_eq!(normalize_loose("Live Forever"), "live forever");
        assert_eq!(normalize_loose("Oasis - Live Forever [2014]"), "oasis live forever");
    }
}
