//! Wire types and the service seam for the music API.
//!
//! `MusicApi` is what the fetch pipelines talk to; `client::WeapiClient`
//! is the HTTP implementation and tests substitute an in-memory one.

use serde::Deserialize;
use thiserror::Error;

use crate::models::{OwnedEntry, Track};

/// Success code inside every weapi response body.
pub const CODE_OK: i64 = 200;

// ============================================================================
// Errors
// ============================================================================

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("http error: {0}")]
    Http(String),
    #[error("{endpoint} returned code {code}")]
    Status { endpoint: &'static str, code: i64 },
    #[error("decode error: {0}")]
    Decode(String),
    #[error("crypto error: {0}")]
    Crypto(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        ApiError::Http(e.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        ApiError::Decode(e.to_string())
    }
}

// ============================================================================
// Service Seam
// ============================================================================

/// Raw endpoint access. One call per HTTP request; paging and batching live
/// in `fetch`.
pub trait MusicApi {
    fn playlist_detail(&self, playlist_id: &str) -> Result<PlaylistDetail, ApiError>;
    fn song_details(&self, ids: &[u64]) -> Result<SongDetailBatch, ApiError>;
    fn song_urls(&self, ids: &[u64]) -> Result<Vec<SongUrl>, ApiError>;
    fn cloud_page(&self, limit: usize, offset: usize) -> Result<Vec<CloudItem>, ApiError>;
}

// ============================================================================
// Response Envelopes
// ============================================================================

/// Every weapi body carries a numeric code next to its payload.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub code: i64,
    #[serde(flatten)]
    pub body: T,
}

impl<T> Envelope<T> {
    pub fn into_body(self, endpoint: &'static str) -> Result<T, ApiError> {
        if self.code == CODE_OK {
            Ok(self.body)
        } else {
            Err(ApiError::Status { endpoint, code: self.code })
        }
    }
}

// ============================================================================
// Playlist Detail
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct PlaylistDetailBody {
    #[serde(default)]
    pub playlist: Option<PlaylistDetail>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistDetail {
    #[serde(default)]
    pub name: String,
    /// First page of full track objects; only ids are used
    #[serde(default)]
    pub tracks: Vec<IdRef>,
    /// Complete id list, present on long playlists
    #[serde(default)]
    pub track_ids: Option<Vec<IdRef>>,
    #[serde(default)]
    pub track_count: usize,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct IdRef {
    pub id: u64,
}

// ============================================================================
// Song Detail
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SongDetailBatch {
    #[serde(default)]
    pub songs: Vec<SongDetail>,
    /// Parallel privilege records keyed by song id
    #[serde(default)]
    pub privileges: Vec<Privilege>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SongDetail {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub ar: Vec<Option<ArtistRef>>,
    #[serde(default)]
    pub fee: Option<i64>,
    /// Inline privilege record; some responses embed it in the song
    #[serde(default)]
    pub privilege: Option<Privilege>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArtistRef {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Privilege {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub fee: Option<i64>,
}

impl SongDetail {
    /// Credited artist names, skipping null entries and null names.
    pub fn artist_names(&self) -> Vec<String> {
        self.ar
            .iter()
            .flatten()
            .filter_map(|a| a.name.clone())
            .collect()
    }

    /// Convert to a playlist track. `privilege_fee` is the fee from the
    /// parallel privilege list; an inline privilege record takes precedence.
    pub fn into_track(self, privilege_fee: Option<i64>) -> Track {
        let artists = self.artist_names();
        Track {
            id: (self.id != 0).then_some(self.id),
            title: self.name.unwrap_or_default(),
            artists,
            fee: self.fee,
            privilege_fee: self.privilege.and_then(|p| p.fee).or(privilege_fee),
            vip_label: None,
        }
    }
}

// ============================================================================
// Song URL (pricing)
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SongUrlBody {
    #[serde(default)]
    pub data: Vec<SongUrl>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SongUrl {
    pub id: u64,
    #[serde(default)]
    pub fee: Option<i64>,
}

// ============================================================================
// Cloud Library
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CloudBody {
    #[serde(default)]
    pub data: Vec<CloudItem>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudItem {
    /// Catalog song the upload was matched to, 0 or absent when unmatched
    #[serde(default)]
    pub song_id: Option<u64>,
    #[serde(default)]
    pub song_name: Option<String>,
    #[serde(default)]
    pub artist: Option<String>,
    #[serde(default)]
    pub file_size: u64,
    #[serde(default)]
    pub add_time: i64,
}

impl CloudItem {
    pub fn matched_song_id(&self) -> Option<u64> {
        self.song_id.filter(|&id| id != 0)
    }

    /// Convert to an owned entry, attaching catalog metadata when known.
    pub fn into_owned_entry(self, matched: Option<&SongDetail>) -> OwnedEntry {
        let (matched_title, matched_artist) = matched
            .map(|song| (song.name.clone().unwrap_or_default(), song.artist_names().join(", ")))
            .unwrap_or_default();
        OwnedEntry {
            id: self.matched_song_id(),
            title: self.song_name.unwrap_or_default(),
            artist: self.artist.unwrap_or_default(),
            matched_title,
            matched_artist,
            file_size: self.file_size,
            added_at: self.add_time,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_status() {
        let ok: Envelope<SongUrlBody> =
            serde_json::from_str(r#"{"code":200,"data":[{"id":7,"fee":1}]}"#).unwrap();
        let body = ok.into_body("song_urls").unwrap();
        assert_eq!(body.data[0].fee, Some(1));

        let denied: Envelope<SongUrlBody> = serde_json::from_str(r#"{"code":301}"#).unwrap();
        let err = denied.into_body("song_urls").unwrap_err();
        assert!(matches!(err, ApiError::Status { code: 301, .. }));
        assert_eq!(err.to_string(), "song_urls returned code 301");
    }

    #[test]
    fn test_playlist_detail_parse() {
        let body: Envelope<PlaylistDetailBody> = serde_json::from_str(
            r#"{"code":200,"playlist":{"name":"Mix","tracks":[{"id":1,"name":"x"}],
                "trackIds":[{"id":1},{"id":2}],"trackCount":2}}"#,
        )
        .unwrap();
        let detail = body.into_body("playlist").unwrap().playlist.unwrap();
        assert_eq!(detail.name, "Mix");
        assert_eq!(detail.tracks.len(), 1);
        assert_eq!(detail.track_ids.unwrap().len(), 2);
        assert_eq!(detail.track_count, 2);
    }

    #[test]
    fn test_song_detail_into_track() {
        let song: SongDetail = serde_json::from_str(
            r#"{"id":42,"name":"晴天","ar":[{"name":"周杰伦"},null,{"name":null}],"fee":8,
                "privilege":{"id":42,"fee":1}}"#,
        )
        .unwrap();
        let track = song.into_track(Some(0));
        assert_eq!(track.id, Some(42));
        assert_eq!(track.artists, vec!["周杰伦".to_string()]);
        assert_eq!(track.fee, Some(8));
        assert_eq!(track.privilege_fee, Some(1));
    }

    #[test]
    fn test_zero_id_becomes_none() {
        let song = SongDetail { id: 0, ..Default::default() };
        assert_eq!(song.into_track(None).id, None);
    }

    #[test]
    fn test_cloud_item_into_owned_entry() {
        let item: CloudItem = serde_json::from_str(
            r#"{"songId":5,"songName":"song a.mp3","artist":"x","fileSize":1048576,"addTime":1700000000000}"#,
        )
        .unwrap();
        let detail = SongDetail {
            id: 5,
            name: Some("Song A".into()),
            ar: vec![Some(ArtistRef { name: Some("X".into()) }), Some(ArtistRef { name: Some("Y".into()) })],
            ..Default::default()
        };
        let entry = item.into_owned_entry(Some(&detail));
        assert_eq!(entry.id, Some(5));
        assert_eq!(entry.title, "song a.mp3");
        assert_eq!(entry.matched_title, "Song A");
        assert_eq!(entry.matched_artist, "X, Y");
        assert_eq!(entry.file_size, 1_048_576);
    }

    #[test]
    fn test_unmatched_cloud_item() {
        let item: CloudItem = serde_json::from_str(r#"{"songId":0,"songName":"demo"}"#).unwrap();
        assert_eq!(item.matched_song_id(), None);
        let entry = item.into_owned_entry(None);
        assert_eq!(entry.id, None);
        assert!(entry.matched_title.is_empty());
        assert!(entry.artist.is_empty());
    }
}
