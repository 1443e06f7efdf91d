//! Core data models for VIP reconciliation.
//!
//! This module contains the playlist and cloud-library records, the
//! owned-library index aliases, and the match outcome and statistics types.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Type Aliases
// ============================================================================

/// Index mapping (title_norm, artist_norm) to every owned entry with that key,
/// in insertion order.
pub type NameArtistIndex<'a> = FxHashMap<(String, String), Vec<&'a OwnedEntry>>;

/// Title-only index for the fuzzy artist pass. Each entry carries the
/// normalized artist string used for fuzzy comparison.
pub type NameOnlyIndex<'a> = FxHashMap<String, Vec<(&'a OwnedEntry, String)>>;

/// Pricing lookup from the song URL endpoint: track id -> fee code.
pub type SongPricing = FxHashMap<u64, i64>;

// ============================================================================
// Playlist Models
// ============================================================================

/// Fee code the service uses for subscription-only playback.
pub const FEE_SUBSCRIPTION: i64 = 1;

/// Playlist track as fetched from the song detail endpoint.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Track {
    /// Service track id; `None` when upstream sent nothing or 0
    pub id: Option<u64>,
    pub title: String,
    /// Credited artists, in credited order
    pub artists: Vec<String>,
    /// Fee code on the song itself
    #[serde(default)]
    pub fee: Option<i64>,
    /// Fee code from the privilege record
    #[serde(default)]
    pub privilege_fee: Option<i64>,
    /// Subscription-tier label for display; set by `vip::tag_vip_tracks`
    #[serde(default)]
    pub vip_label: Option<String>,
}

impl Track {
    /// Artists joined for display: "A, B".
    pub fn artists_display(&self) -> String {
        self.artists.join(", ")
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.title, self.artists_display())
    }
}

// ============================================================================
// Cloud Library Models
// ============================================================================

/// Entry of the user's cloud library.
///
/// `matched_title` / `matched_artist` hold the catalog metadata the service
/// resolved for the upload; both are empty when it resolved nothing.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OwnedEntry {
    pub id: Option<u64>,
    pub title: String,
    pub artist: String,
    #[serde(default)]
    pub matched_title: String,
    #[serde(default)]
    pub matched_artist: String,
    /// File size in bytes
    #[serde(default)]
    pub file_size: u64,
    /// Upload time, epoch milliseconds
    #[serde(default)]
    pub added_at: i64,
}

impl OwnedEntry {
    /// Title and artist used as the lookup key: the catalog pair when both
    /// halves are present, the raw tags otherwise.
    pub fn key_fields(&self) -> (&str, &str) {
        if !self.matched_title.is_empty() && !self.matched_artist.is_empty() {
            (&self.matched_title, &self.matched_artist)
        } else {
            (&self.title, &self.artist)
        }
    }

    /// Title for display, preferring the catalog title.
    pub fn display_title(&self) -> &str {
        if self.matched_title.is_empty() {
            &self.title
        } else {
            &self.matched_title
        }
    }

    /// Artist for display, preferring the catalog artist.
    pub fn display_artist(&self) -> &str {
        if self.matched_artist.is_empty() {
            &self.artist
        } else {
            &self.matched_artist
        }
    }
}

impl fmt::Display for OwnedEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.display_title(), self.display_artist())
    }
}

// ============================================================================
// Matching Models
// ============================================================================

/// Matching strategy that recognised a candidate, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchTier {
    /// Same service track id
    Id,
    /// Exact normalized title plus one exact normalized artist
    NameArtist,
    /// Exact normalized title, artist by substring or similarity
    FuzzyArtist,
}

impl fmt::Display for MatchTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MatchTier::Id => "id",
            MatchTier::NameArtist => "name+artist",
            MatchTier::FuzzyArtist => "fuzzy artist",
        };
        f.write_str(s)
    }
}

/// Result of probing one candidate against the owned library.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MatchOutcome<'a> {
    Matched { tier: MatchTier, owned: &'a OwnedEntry },
    Unmatched,
}

impl MatchOutcome<'_> {
    pub fn tier(&self) -> Option<MatchTier> {
        match self {
            MatchOutcome::Matched { tier, .. } => Some(*tier),
            MatchOutcome::Unmatched => None,
        }
    }
}

// ============================================================================
// Statistics (Instrumentation)
// ============================================================================

/// Per-tier counts for one reconciliation run.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconcileStats {
    pub candidates: usize,
    pub owned_entries: usize,
    pub id_matches: usize,
    pub name_artist_matches: usize,
    pub fuzzy_artist_matches: usize,
    pub kept: usize,
}

impl ReconcileStats {
    pub fn record(&mut self, tier: Option<MatchTier>) {
        match tier {
            Some(MatchTier::Id) => self.id_matches += 1,
            Some(MatchTier::NameArtist) => self.name_artist_matches += 1,
            Some(MatchTier::FuzzyArtist) => self.fuzzy_artist_matches += 1,
            None => self.kept += 1,
        }
    }

    pub fn total_matched(&self) -> usize {
        self.id_matches + self.name_artist_matches + self.fuzzy_artist_matches
    }

    /// Log stats at info level as a single JSON field
    pub fn log_phase(&self, phase: &str) {
        if let Ok(json) = serde_json::to_string(self) {
            tracing::info!(phase, stats = %json, "reconcile stats");
        }
    }
}

/// Partition of the VIP candidates.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Reconciliation {
    /// Candidates with no owned copy, in candidate order
    pub kept: Vec<Track>,
    /// Candidates already in the cloud library, in candidate order
    pub matched: Vec<Track>,
    pub stats: ReconcileStats,
}
