//! Similarity scoring used as the fuzzy fallback of the reconciliation.
//!
//! Inputs are compared as given; callers normalize first.

use strsim::levenshtein;

// ============================================================================
// Score Thresholds
// ============================================================================

/// Artist pairs scoring strictly above this count as the same artist.
pub const FUZZY_ARTIST_THRESHOLD: f64 = 0.7;

// ============================================================================
// String Similarity
// ============================================================================

/// Edit-distance similarity between two strings (0.0 to 1.0).
///
/// `1 - levenshtein(a, b) / max(len(a), len(b))`, with lengths counted in
/// chars. Two empty strings are identical (1.0); exactly one empty string
/// scores 0.0 regardless of the other's length.
pub fn similarity(a: &str, b: &str) -> f64 {
    match (a.is_empty(), b.is_empty()) {
        (true, true) => return 1.0,
        (true, false) | (false, true) => return 0.0,
        (false, false) => {}
    }

    let max_len = a.chars().count().max(b.chars().count());
    1.0 - levenshtein(a, b) as f64 / max_len as f64
}

// ============================================================================
// Artist Matching
// ============================================================================

/// Fuzzy artist predicate for title-only matches.
///
/// Two normalized artist strings match when one contains the other
/// ("john smith" in "john smith jr") or their similarity exceeds
/// [`FUZZY_ARTIST_THRESHOLD`]. An empty side never matches: it would be a
/// substring of every artist.
pub fn artists_match(candidate: &str, owned: &str) -> bool {
    if candidate.is_empty() || owned.is_empty() {
        return false;
    }
    candidate.contains(owned)
        || owned.contains(candidate)
        || similarity(candidate, owned) > FUZZY_ARTIST_THRESHOLD
}
