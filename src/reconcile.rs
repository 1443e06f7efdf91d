//! Reconciliation of VIP candidates against the cloud library.
//!
//! Matching runs in tiers, first hit wins:
//! 1. service track id
//! 2. exact normalized title + any exact normalized artist
//! 3. exact normalized title + fuzzy artist (substring or similarity)
//!
//! Candidates that no tier recognises are kept as still missing.

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::models::{
    MatchOutcome, MatchTier, NameArtistIndex, NameOnlyIndex, OwnedEntry, Reconciliation,
    ReconcileStats, Track,
};
use crate::normalize::{normalize_artist, normalize_title};
use crate::scoring::artists_match;

// ============================================================================
// Owned Library Index
// ============================================================================

/// Lookup structures over the owned library, borrowed for one reconciliation.
#[derive(Debug, Default)]
pub struct OwnedIndex<'a> {
    pub by_id: FxHashMap<u64, &'a OwnedEntry>,
    pub by_name_artist: NameArtistIndex<'a>,
    pub by_name_only: NameOnlyIndex<'a>,
}

impl<'a> OwnedIndex<'a> {
    /// Index every owned entry. Later entries with the same id replace earlier
    /// ones in `by_id`; name keys keep all entries in insertion order.
    pub fn build(owned: &'a [OwnedEntry]) -> Self {
        let mut index = OwnedIndex::default();

        for entry in owned {
            if let Some(id) = entry.id {
                index.by_id.insert(id, entry);
            }

            let (title, artist) = entry.key_fields();
            let title_norm = normalize_title(title);
            if title_norm.is_empty() {
                continue;
            }
            let artist_norm = normalize_artist(artist);

            // Fuzzy pass compares against the catalog artist whenever there is
            // one, even if the catalog title was missing
            let fuzzy_artist = if entry.matched_artist.is_empty() {
                normalize_artist(&entry.artist)
            } else {
                normalize_artist(&entry.matched_artist)
            };

            index
                .by_name_artist
                .entry((title_norm.clone(), artist_norm))
                .or_default()
                .push(entry);
            index
                .by_name_only
                .entry(title_norm)
                .or_default()
                .push((entry, fuzzy_artist));
        }

        index
    }

    /// Tier 1: identifier lookup.
    fn match_id(&self, candidate: &Track) -> Option<&'a OwnedEntry> {
        candidate.id.and_then(|id| self.by_id.get(&id).copied())
    }

    /// Tier 2: exact (title, artist) for any credited artist.
    fn match_name_artist(&self, title_norm: &str, artists_norm: &[String]) -> Option<&'a OwnedEntry> {
        artists_norm.iter().find_map(|artist| {
            self.by_name_artist
                .get(&(title_norm.to_string(), artist.clone()))
                .and_then(|entries| entries.first().copied())
        })
    }

    /// Tier 3: same title, fuzzy artist. Candidate artists are the outer loop.
    fn match_fuzzy_artist(&self, title_norm: &str, artists_norm: &[String]) -> Option<&'a OwnedEntry> {
        let owned = self.by_name_only.get(title_norm)?;
        artists_norm.iter().find_map(|artist| {
            owned
                .iter()
                .find(|(_, owned_artist)| artists_match(artist, owned_artist))
                .map(|(entry, _)| *entry)
        })
    }

    /// Run one candidate through the tiers in order.
    pub fn find_match(&self, candidate: &Track) -> MatchOutcome<'a> {
        if let Some(owned) = self.match_id(candidate) {
            return MatchOutcome::Matched { tier: MatchTier::Id, owned };
        }

        let title_norm = normalize_title(&candidate.title);
        if title_norm.is_empty() {
            return MatchOutcome::Unmatched;
        }
        let artists_norm: Vec<String> = candidate
            .artists
            .iter()
            .map(|a| normalize_artist(a))
            .filter(|a| !a.is_empty())
            .collect();

        self.match_name_artist(&title_norm, &artists_norm)
            .map(|owned| MatchOutcome::Matched { tier: MatchTier::NameArtist, owned })
            .or_else(|| {
                self.match_fuzzy_artist(&title_norm, &artists_norm)
                    .map(|owned| MatchOutcome::Matched { tier: MatchTier::FuzzyArtist, owned })
            })
            .unwrap_or(MatchOutcome::Unmatched)
    }
}

// ============================================================================
// Reconciliation
// ============================================================================

/// Split `candidates` into tracks still missing from `owned` and tracks
/// already owned. Both outputs keep candidate order; inputs are untouched.
pub fn reconcile(candidates: &[Track], owned: &[OwnedEntry]) -> Reconciliation {
    let index = OwnedIndex::build(owned);
    let mut result = Reconciliation {
        stats: ReconcileStats {
            candidates: candidates.len(),
            owned_entries: owned.len(),
            ..Default::default()
        },
        ..Default::default()
    };

    for candidate in candidates {
        let outcome = index.find_match(candidate);
        result.stats.record(outcome.tier());

        match outcome {
            MatchOutcome::Matched { tier, owned } => {
                debug!(
                    tier = %tier,
                    candidate = %candidate,
                    owned = %owned,
                    id = ?candidate.id,
                    "already in cloud library"
                );
                result.matched.push(candidate.clone());
            }
            MatchOutcome::Unmatched => {
                debug!(candidate = %candidate, id = ?candidate.id, "not in cloud library");
                result.kept.push(candidate.clone());
            }
        }
    }

    result
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn track(id: Option<u64>, title: &str, artists: &[&str]) -> Track {
        Track {
            id,
            title: title.to_string(),
            artists: artists.iter().map(|a| a.to_string()).collect(),
            ..Default::default()
        }
    }

    fn owned(id: Option<u64>, title: &str, artist: &str) -> OwnedEntry {
        OwnedEntry {
            id,
            title: title.to_string(),
            artist: artist.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_index_skips_empty_titles_but_keeps_ids() {
        let library = vec![owned(Some(9), "(Live)", "X")];
        let index = OwnedIndex::build(&library);
        assert!(index.by_id.contains_key(&9));
        assert!(index.by_name_artist.is_empty());
        assert!(index.by_name_only.is_empty());
    }

    #[test]
    fn test_index_keeps_colliding_entries_in_order() {
        let library = vec![
            owned(None, "Song C", "Alpha"),
            owned(None, "song c!", "alpha"),
            owned(None, "Song C", "Beta"),
        ];
        let index = OwnedIndex::build(&library);
        let key = ("song c".to_string(), "alpha".to_string());
        let hits = &index.by_name_artist[&key];
        assert_eq!(hits.len(), 2);
        assert!(std::ptr::eq(hits[0], &library[0]));
        assert!(std::ptr::eq(hits[1], &library[1]));
        assert_eq!(index.by_name_only["song c"].len(), 3);
    }

    #[test]
    fn test_index_uses_catalog_artist_for_fuzzy_pass() {
        let library = vec![OwnedEntry {
            title: "Song B".into(),
            artist: "unknown".into(),
            matched_artist: "John Smith".into(),
            ..Default::default()
        }];
        let index = OwnedIndex::build(&library);
        // Key falls back to raw fields: matched_title is empty
        assert!(index
            .by_name_artist
            .contains_key(&("song b".to_string(), "unknown".to_string())));
        assert_eq!(index.by_name_only["song b"][0].1, "john smith");
    }

    #[test]
    fn test_id_tier_wins_regardless_of_names() {
        let library = vec![owned(Some(5), "Something Else", "Nobody")];
        let index = OwnedIndex::build(&library);
        let outcome = index.find_match(&track(Some(5), "Song A (Live)", &["X"]));
        assert_eq!(outcome.tier(), Some(MatchTier::Id));
    }

    #[test]
    fn test_name_artist_tier_any_artist() {
        let library = vec![owned(None, "Duet", "Second")];
        let index = OwnedIndex::build(&library);
        let outcome = index.find_match(&track(None, "Duet", &["First", "Second"]));
        assert_eq!(outcome.tier(), Some(MatchTier::NameArtist));
    }

    #[test]
    fn test_exact_tier_preferred_over_fuzzy() {
        let library = vec![owned(None, "Song", "Alphabet"), owned(None, "Song", "Alpha")];
        let index = OwnedIndex::build(&library);
        match index.find_match(&track(None, "Song", &["Alpha"])) {
            MatchOutcome::Matched { tier, owned } => {
                assert_eq!(tier, MatchTier::NameArtist);
                assert_eq!(owned.artist, "Alpha");
            }
            MatchOutcome::Unmatched => panic!("expected a match"),
        }
    }

    #[test]
    fn test_fuzzy_tier_reports_entry_that_matched() {
        let library = vec![owned(None, "Song C", "Beta"), owned(None, "Song C", "Alpha")];
        let index = OwnedIndex::build(&library);
        match index.find_match(&track(None, "Song C", &["alph"])) {
            MatchOutcome::Matched { tier, owned } => {
                assert_eq!(tier, MatchTier::FuzzyArtist);
                assert_eq!(owned.artist, "Alpha");
            }
            MatchOutcome::Unmatched => panic!("expected a match"),
        }
    }

    #[test]
    fn test_fuzzy_tier_candidate_artists_outer_loop() {
        // "alph" would hit the first entry, but "zeta" is tried first and
        // scans every entry for the title before "alph" gets a turn
        let library = vec![owned(None, "Song D", "alphabet"), owned(None, "Song D", "Zeta Band")];
        let index = OwnedIndex::build(&library);
        match index.find_match(&track(None, "Song D", &["zeta", "alph"])) {
            MatchOutcome::Matched { tier, owned } => {
                assert_eq!(tier, MatchTier::FuzzyArtist);
                assert_eq!(owned.artist, "Zeta Band");
            }
            MatchOutcome::Unmatched => panic!("expected a match"),
        }
    }

    #[test]
    fn test_fuzzy_tier_second_artist_qualifies() {
        let library = vec![owned(None, "Song E", "alpha")];
        let index = OwnedIndex::build(&library);
        match index.find_match(&track(None, "Song E", &["nobody", "alph"])) {
            MatchOutcome::Matched { tier, owned } => {
                assert_eq!(tier, MatchTier::FuzzyArtist);
                assert_eq!(owned.artist, "alpha");
            }
            MatchOutcome::Unmatched => panic!("expected a match"),
        }
    }

    #[test]
    fn test_untagged_upload_not_matched_by_title_alone() {
        // Empty owned artist: same title is not enough for any name tier
        let library = vec![owned(None, "Song F", "")];
        let candidates = vec![track(None, "Song F", &["X"])];
        let result = reconcile(&candidates, &library);
        assert_eq!(result.kept, candidates);
        assert_eq!(result.stats.total_matched(), 0);
    }

    #[test]
    fn test_emoji_decorated_title_matches_plain_title() {
        let library = vec![owned(None, "Song", "X")];
        let candidates = vec![track(None, "Song \u{2764}\u{FE0F}", &["X"])];
        let result = reconcile(&candidates, &library);
        assert_eq!(result.matched, candidates);
        assert_eq!(result.stats.name_artist_matches, 1);
    }

    #[test]
    fn test_empty_artist_list_only_id_tier() {
        let library = vec![owned(None, "Song", "Someone"), owned(Some(3), "Other", "Other")];
        let index = OwnedIndex::build(&library);
        assert_eq!(index.find_match(&track(None, "Song", &[])), MatchOutcome::Unmatched);
        assert_eq!(index.find_match(&track(Some(3), "Song", &[])).tier(), Some(MatchTier::Id));
    }

    #[test]
    fn test_empty_title_never_matches_by_name() {
        let library = vec![owned(None, "", "X")];
        let index = OwnedIndex::build(&library);
        assert_eq!(index.find_match(&track(None, "", &["X"])), MatchOutcome::Unmatched);
    }

    #[test]
    fn test_reconcile_does_not_touch_inputs() {
        let candidates = vec![track(Some(1), "A", &["x"]), track(None, "B", &["y"])];
        let library = vec![owned(Some(1), "A", "x")];
        let before = (candidates.clone(), library.clone());
        let result = reconcile(&candidates, &library);
        assert_eq!((candidates, library), before);
        assert_eq!(result.matched.len(), 1);
        assert_eq!(result.kept.len(), 1);
        assert_eq!(result.stats.id_matches, 1);
        assert_eq!(result.stats.kept, 1);
    }
}
