//! Canonical comparison forms for playlist titles and cloud-library tags.
//! Used on both sides of the reconciliation, so playlist tracks and owned
//! entries always pass through exactly the same rules.
//!
//! CRITICAL: Any change here shifts which VIP tracks count as owned.
//! Run the reconcile tests after changes.

use once_cell::sync::Lazy;
use regex::Regex;

// ============================================================================
// REGEX PATTERNS
// ============================================================================

/// Bracketed annotations, removed together with their contents (applied in order).
/// Each family is a single non-recursive pass: "a (b (c) d)" loses "(b (c)" only.
pub static BRACKET_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        // ASCII parentheses: "Song (Live)"
        Regex::new(r"\([^)]*\)").unwrap(),
        // ASCII square brackets: "Song [Remastered]"
        Regex::new(r"\[[^\]]*\]").unwrap(),
        // Full-width parentheses: "歌曲（伴奏）"
        Regex::new(r"（[^）]*）").unwrap(),
        // Lenticular brackets: "【官方】歌曲"
        Regex::new(r"【[^】]*】").unwrap(),
    ]
});

/// Version/performance markers stripped from titles wherever they occur.
/// Substring match, not word match: "Deliver" loses its "live" too.
pub static VERSION_MARKERS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(live|remix|cover|翻唱|现场|版|纯音乐|伴奏|纯音版|完整版|片段|片段版|混音|混音版)")
        .unwrap()
});

/// Anything that is not a letter, number, underscore, whitespace or a CJK
/// unified ideograph. Spelled out instead of `\w`, which also keeps combining
/// marks, variation selectors and joiners ("❤\u{FE0F}", "a\u{200D}b").
pub static NON_WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\p{L}\p{N}_\s\x{4E00}-\x{9FFF}]").unwrap());

// ============================================================================
// NORMALIZATION FUNCTIONS
// ============================================================================

/// Which rule set to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameKind {
    /// Song titles: brackets, version markers and punctuation are removed.
    Title,
    /// Artist names: brackets and punctuation only.
    Artist,
}

/// One pass of the rules. Not idempotent on its own: stripping punctuation
/// can expose a marker ("li-ve" becomes "live").
fn normalize_once(raw: &str, kind: NameKind) -> String {
    let mut result = raw.to_string();

    for pattern in BRACKET_PATTERNS.iter() {
        result = pattern.replace_all(&result, "").to_string();
    }

    if kind == NameKind::Title {
        result = VERSION_MARKERS.replace_all(&result, "").to_string();
    }

    result = NON_WORD.replace_all(&result, "").to_string();

    // split_whitespace also trims both ends
    result
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Normalize a raw title or artist string into its canonical form.
///
/// The rules are re-applied until the output stops changing, which makes the
/// result a fixed point: `normalize(&normalize(x, k), k) == normalize(x, k)`.
/// Every pass after the first only removes characters, so this terminates.
pub fn normalize(raw: &str, kind: NameKind) -> String {
    let mut current = normalize_once(raw, kind);
    loop {
        let next = normalize_once(&current, kind);
        if next == current {
            return current;
        }
        current = next;
    }
}

/// Normalize a song title for matching.
pub fn normalize_title(title: &str) -> String {
    normalize(title, NameKind::Title)
}

/// Normalize an artist name (or a comma-joined artist list) for matching.
pub fn normalize_artist(artist: &str) -> String {
    normalize(artist, NameKind::Artist)
}

// ============================================================================
// TESTS
// ============================================================================
