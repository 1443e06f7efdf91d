//! Subscription-tier detection for playlist tracks.
//!
//! A track counts as VIP when any of three fee signals says so: the song's
//! own fee, its privilege record, or the pricing returned by the song URL
//! endpoint. Upstream responses are not always consistent, so all three are
//! consulted.

use crate::models::{SongPricing, Track, FEE_SUBSCRIPTION};

/// Label attached to subscription-only tracks in reports.
pub const VIP_LABEL: &str = "Members only";

/// True when any fee signal marks the track as subscription-only.
pub fn requires_subscription(track: &Track, pricing: &SongPricing) -> bool {
    track.fee == Some(FEE_SUBSCRIPTION)
        || track.privilege_fee == Some(FEE_SUBSCRIPTION)
        || track
            .id
            .and_then(|id| pricing.get(&id))
            .is_some_and(|&fee| fee == FEE_SUBSCRIPTION)
}

/// Subscription-only tracks from `tracks`, in order, each labelled with
/// [`VIP_LABEL`]. The input tracks are left as they are.
pub fn tag_vip_tracks(tracks: &[Track], pricing: &SongPricing) -> Vec<Track> {
    tracks
        .iter()
        .filter(|t| requires_subscription(t, pricing))
        .map(|t| Track {
            vip_label: Some(VIP_LABEL.to_string()),
            ..t.clone()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(id: u64, fee: Option<i64>, privilege_fee: Option<i64>) -> Track {
        Track {
            id: Some(id),
            title: format!("song {id}"),
            artists: vec!["a".into()],
            fee,
            privilege_fee,
            vip_label: None,
        }
    }

    #[test]
    fn test_each_signal_is_sufficient() {
        let mut pricing = SongPricing::default();
        pricing.insert(3, FEE_SUBSCRIPTION);

        assert!(requires_subscription(&track(1, Some(1), None), &pricing));
        assert!(requires_subscription(&track(2, Some(0), Some(1)), &pricing));
        assert!(requires_subscription(&track(3, Some(8), Some(0)), &pricing));
        assert!(!requires_subscription(&track(4, Some(8), Some(0)), &pricing));
    }

    #[test]
    fn test_other_fee_codes_are_not_vip() {
        let pricing = SongPricing::default();
        // 4 = album purchase, 8 = free at low bitrate
        assert!(!requires_subscription(&track(1, Some(4), Some(4)), &pricing));
        assert!(!requires_subscription(&track(2, Some(8), None), &pricing));
    }

    #[test]
    fn test_tag_vip_tracks_filters_and_labels_in_order() {
        let tracks = vec![
            track(1, Some(1), None),
            track(2, Some(0), None),
            track(3, None, Some(1)),
        ];
        let tagged = tag_vip_tracks(&tracks, &SongPricing::default());
        assert_eq!(tagged.iter().map(|t| t.id).collect::<Vec<_>>(), vec![Some(1), Some(3)]);
        assert!(tagged.iter().all(|t| t.vip_label.as_deref() == Some(VIP_LABEL)));
        assert!(tracks.iter().all(|t| t.vip_label.is_none()));
    }

    #[test]
    fn test_pricing_ignored_without_id() {
        let mut pricing = SongPricing::default();
        pricing.insert(0, FEE_SUBSCRIPTION);
        let t = Track { id: None, ..track(0, None, None) };
        assert!(!requires_subscription(&t, &pricing));
    }
}
