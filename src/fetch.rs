//! Fetch pipelines: raw endpoint pages in, `Track` / `OwnedEntry` out.

use rustc_hash::FxHashMap;
use tracing::{info, warn};

use crate::api::{ApiError, CloudItem, MusicApi, SongDetail};
use crate::models::{OwnedEntry, SongPricing, Track};
use crate::progress::{create_spinner, finish, step};

/// Ids per song detail / song URL request.
pub const ID_BATCH_SIZE: usize = 1000;

/// Entries per cloud library page.
pub const CLOUD_PAGE_SIZE: usize = 1000;

// ============================================================================
// Playlist
// ============================================================================

/// Playlist name and every track id, in playlist order.
///
/// The detail endpoint returns at most one page of full tracks; longer
/// playlists carry the complete list in `trackIds`.
pub fn playlist_track_ids<A: MusicApi + ?Sized>(
    api: &A,
    playlist_id: &str,
) -> Result<(String, Vec<u64>), ApiError> {
    let detail = api.playlist_detail(playlist_id)?;
    let ids: Vec<u64> = match detail.track_ids {
        Some(all) if detail.track_count > detail.tracks.len() => {
            info!(
                track_count = detail.track_count,
                returned = detail.tracks.len(),
                "playlist truncated, using full id list"
            );
            all.iter().map(|t| t.id).collect()
        }
        _ => detail.tracks.iter().map(|t| t.id).collect(),
    };
    Ok((detail.name, ids))
}

/// Song details for `ids`, batched, converted to tracks in response order.
pub fn fetch_tracks<A: MusicApi + ?Sized>(api: &A, ids: &[u64]) -> Result<Vec<Track>, ApiError> {
    let pb = create_spinner("Fetching song details");
    let mut tracks = Vec::with_capacity(ids.len());

    for (i, batch) in ids.chunks(ID_BATCH_SIZE).enumerate() {
        step(&pb, format!("Fetching song details: batch {}", i + 1));
        let response = api.song_details(batch)?;
        let privileges: FxHashMap<u64, i64> = response
            .privileges
            .iter()
            .filter_map(|p| Some((p.id?, p.fee?)))
            .collect();
        tracks.extend(
            response
                .songs
                .into_iter()
                .map(|song| {
                    let privilege_fee = privileges.get(&song.id).copied();
                    song.into_track(privilege_fee)
                }),
        );
    }

    if tracks.len() < ids.len() {
        warn!(requested = ids.len(), returned = tracks.len(), "some songs had no details");
    }
    finish(&pb, format!("Fetched {} song details", tracks.len()));
    Ok(tracks)
}

/// Fee codes from the song URL endpoint, batched.
pub fn fetch_pricing<A: MusicApi + ?Sized>(api: &A, ids: &[u64]) -> Result<SongPricing, ApiError> {
    let pb = create_spinner("Checking song pricing");
    let mut pricing = SongPricing::default();

    for batch in ids.chunks(ID_BATCH_SIZE) {
        for url in api.song_urls(batch)? {
            if let Some(fee) = url.fee {
                pricing.insert(url.id, fee);
            }
        }
        step(&pb, format!("Checking song pricing: {} priced", pricing.len()));
    }

    finish(&pb, format!("Priced {} songs", pricing.len()));
    Ok(pricing)
}

// ============================================================================
// Cloud Library
// ============================================================================

/// Every cloud library item. Pages until a short or empty page.
pub fn fetch_cloud_items<A: MusicApi + ?Sized>(api: &A) -> Result<Vec<CloudItem>, ApiError> {
    let pb = create_spinner("Fetching cloud library");
    let mut items = Vec::new();
    let mut offset = 0;

    loop {
        let page = api.cloud_page(CLOUD_PAGE_SIZE, offset)?;
        let page_len = page.len();
        items.extend(page);
        step(&pb, format!("Fetching cloud library: {} entries", items.len()));
        if page_len < CLOUD_PAGE_SIZE {
            break;
        }
        offset += CLOUD_PAGE_SIZE;
    }

    finish(&pb, format!("Fetched {} cloud entries", items.len()));
    Ok(items)
}

/// Cloud library as owned entries, with catalog title/artist attached for
/// uploads the service matched to a catalog song.
pub fn fetch_owned_entries<A: MusicApi + ?Sized>(api: &A) -> Result<Vec<OwnedEntry>, ApiError> {
    let items = fetch_cloud_items(api)?;

    let matched_ids: Vec<u64> = items.iter().filter_map(CloudItem::matched_song_id).collect();
    let mut details: FxHashMap<u64, SongDetail> = FxHashMap::default();
    for batch in matched_ids.chunks(ID_BATCH_SIZE) {
        details.extend(api.song_details(batch)?.songs.into_iter().map(|s| (s.id, s)));
    }
    info!(
        cloud_entries = items.len(),
        catalog_matched = details.len(),
        "resolved catalog metadata"
    );

    Ok(items
        .into_iter()
        .map(|item| {
            let matched = item.matched_song_id().and_then(|id| details.get(&id));
            item.into_owned_entry(matched)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ArtistRef, IdRef, PlaylistDetail, Privilege, SongDetailBatch, SongUrl};
    use std::cell::RefCell;

    /// In-memory service: a catalog of songs, a cloud library and call logs.
    #[derive(Default)]
    struct FakeApi {
        playlist: PlaylistDetail,
        songs: Vec<SongDetail>,
        privileges: Vec<Privilege>,
        fees: Vec<(u64, i64)>,
        cloud: Vec<CloudItem>,
        detail_calls: RefCell<Vec<usize>>,
        cloud_offsets: RefCell<Vec<usize>>,
    }

    impl MusicApi for FakeApi {
        fn playlist_detail(&self, _playlist_id: &str) -> Result<PlaylistDetail, ApiError> {
            Ok(self.playlist.clone())
        }

        fn song_details(&self, ids: &[u64]) -> Result<SongDetailBatch, ApiError> {
            self.detail_calls.borrow_mut().push(ids.len());
            Ok(SongDetailBatch {
                songs: self.songs.iter().filter(|s| ids.contains(&s.id)).cloned().collect(),
                privileges: self.privileges.clone(),
            })
        }

        fn song_urls(&self, ids: &[u64]) -> Result<Vec<SongUrl>, ApiError> {
            Ok(self
                .fees
                .iter()
                .filter(|(id, _)| ids.contains(id))
                .map(|&(id, fee)| SongUrl { id, fee: Some(fee) })
                .collect())
        }

        fn cloud_page(&self, limit: usize, offset: usize) -> Result<Vec<CloudItem>, ApiError> {
            self.cloud_offsets.borrow_mut().push(offset);
            Ok(self.cloud.iter().skip(offset).take(limit).cloned().collect())
        }
    }

    fn song(id: u64, name: &str, artist: &str) -> SongDetail {
        SongDetail {
            id,
            name: Some(name.to_string()),
            ar: vec![Some(ArtistRef { name: Some(artist.to_string()) })],
            ..Default::default()
        }
    }

    #[test]
    fn test_playlist_ids_from_tracks() {
        let api = FakeApi {
            playlist: PlaylistDetail {
                name: "Mix".into(),
                tracks: vec![IdRef { id: 1 }, IdRef { id: 2 }],
                track_ids: Some(vec![IdRef { id: 1 }, IdRef { id: 2 }]),
                track_count: 2,
            },
            ..Default::default()
        };
        assert_eq!(playlist_track_ids(&api, "9").unwrap(), ("Mix".to_string(), vec![1, 2]));
    }

    #[test]
    fn test_playlist_ids_fall_back_to_track_ids() {
        let api = FakeApi {
            playlist: PlaylistDetail {
                name: "Long".into(),
                tracks: vec![IdRef { id: 1 }],
                track_ids: Some((1..=3).map(|id| IdRef { id }).collect()),
                track_count: 3,
            },
            ..Default::default()
        };
        assert_eq!(playlist_track_ids(&api, "9").unwrap().1, vec![1, 2, 3]);
    }

    #[test]
    fn test_fetch_tracks_batches_and_attaches_privileges() {
        let ids: Vec<u64> = (1..=2500).collect();
        let api = FakeApi {
            songs: ids.iter().map(|&id| song(id, "t", "a")).collect(),
            privileges: vec![Privilege { id: Some(7), fee: Some(1) }],
            ..Default::default()
        };
        let tracks = fetch_tracks(&api, &ids).unwrap();
        assert_eq!(tracks.len(), 2500);
        assert_eq!(*api.detail_calls.borrow(), vec![1000, 1000, 500]);
        assert_eq!(tracks[6].privilege_fee, Some(1));
        assert_eq!(tracks[0].privilege_fee, None);
    }

    #[test]
    fn test_fetch_pricing() {
        let api = FakeApi {
            fees: vec![(1, 1), (2, 0)],
            ..Default::default()
        };
        let pricing = fetch_pricing(&api, &[1, 2, 3]).unwrap();
        assert_eq!(pricing.get(&1), Some(&1));
        assert_eq!(pricing.get(&2), Some(&0));
        assert_eq!(pricing.get(&3), None);
    }

    #[test]
    fn test_empty_id_list_makes_no_requests() {
        let api = FakeApi {
            fees: vec![(1, 1)],
            ..Default::default()
        };
        assert!(fetch_tracks(&api, &[]).unwrap().is_empty());
        assert!(fetch_pricing(&api, &[]).unwrap().is_empty());
        assert!(api.detail_calls.borrow().is_empty());
    }

    #[test]
    fn test_cloud_paging_stops_on_short_page() {
        let api = FakeApi {
            cloud: (0..2300)
                .map(|i| CloudItem { song_name: Some(format!("s{i}")), ..Default::default() })
                .collect(),
            ..Default::default()
        };
        let items = fetch_cloud_items(&api).unwrap();
        assert_eq!(items.len(), 2300);
        assert_eq!(*api.cloud_offsets.borrow(), vec![0, 1000, 2000]);
    }

    #[test]
    fn test_cloud_paging_exact_multiple_reads_empty_page() {
        let api = FakeApi {
            cloud: (0..1000).map(|_| CloudItem::default()).collect(),
            ..Default::default()
        };
        assert_eq!(fetch_cloud_items(&api).unwrap().len(), 1000);
        assert_eq!(*api.cloud_offsets.borrow(), vec![0, 1000]);
    }

    #[test]
    fn test_owned_entries_resolve_catalog_metadata() {
        let api = FakeApi {
            songs: vec![song(5, "Song A", "X")],
            cloud: vec![
                CloudItem {
                    song_id: Some(5),
                    song_name: Some("song_a_final.mp3".into()),
                    artist: Some("unknown".into()),
                    ..Default::default()
                },
                CloudItem {
                    song_id: Some(0),
                    song_name: Some("demo".into()),
                    ..Default::default()
                },
            ],
            ..Default::default()
        };
        let owned = fetch_owned_entries(&api).unwrap();
        assert_eq!(owned.len(), 2);
        assert_eq!(owned[0].id, Some(5));
        assert_eq!(owned[0].matched_title, "Song A");
        assert_eq!(owned[0].matched_artist, "X");
        assert_eq!(owned[1].id, None);
        assert!(owned[1].matched_title.is_empty());
        assert_eq!(*api.detail_calls.borrow(), vec![1]);
    }
}
