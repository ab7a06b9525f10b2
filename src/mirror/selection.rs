//! Choosing which remote assets should be present locally this cycle.

use std::collections::HashSet;

use rand::seq::IndexedRandom;
use rand::Rng;

use crate::immich::RemoteAsset;

/// Merge album listings into one list of images, de-duplicated by id.
///
/// First occurrence wins, so listing order is preserved.
pub fn merge_listings<I>(listings: I) -> Vec<RemoteAsset>
where
    I: IntoIterator<Item = Vec<RemoteAsset>>,
{
    let mut seen = HashSet::new();
    let mut merged = Vec::new();

    for asset in listings.into_iter().flatten() {
        if !asset.is_image() {
            continue;
        }
        if seen.insert(asset.id.clone()) {
            merged.push(asset);
        }
    }

    merged
}

/// Pick the assets to mirror.
///
/// With `favorites_first`, every favorite is selected ahead of the rest.
/// With `random_select > 0`, only that many of the remaining assets are
/// sampled; otherwise all of them are taken in listing order.
pub fn select<R>(
    assets: Vec<RemoteAsset>,
    favorites_first: bool,
    random_select: usize,
    rng: &mut R,
) -> Vec<RemoteAsset>
where
    R: Rng + ?Sized,
{
    let (mut selection, others): (Vec<_>, Vec<_>) = if favorites_first {
        assets.into_iter().partition(|a| a.is_favorite)
    } else {
        (Vec::new(), assets)
    };

    if random_select > 0 && others.len() > random_select {
        tracing::info!(
            "Randomly selecting {} out of {} assets",
            random_select,
            others.len()
        );
        selection.extend(others.choose_multiple(rng, random_select).cloned());
    } else {
        selection.extend(others);
    }

    selection
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::immich::AssetKind;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn ids(assets: &[RemoteAsset]) -> Vec<&str> {
        assets.iter().map(|a| a.id.as_str()).collect()
    }

    #[test]
    fn test_merge_dedupes_across_albums() {
        let album_a = vec![RemoteAsset::new("1", "a.jpg"), RemoteAsset::new("2", "b.jpg")];
        let album_b = vec![RemoteAsset::new("2", "b.jpg"), RemoteAsset::new("3", "c.jpg")];
        let merged = merge_listings(vec![album_a, album_b]);
        assert_eq!(ids(&merged), vec!["1", "2", "3"]);
    }

    #[test]
    fn test_merge_drops_videos() {
        let mut video = RemoteAsset::new("v", "clip.mp4");
        video.kind = AssetKind::Video;
        let merged = merge_listings(vec![vec![video, RemoteAsset::new("1", "a.jpg")]]);
        assert_eq!(ids(&merged), vec!["1"]);
    }

    #[test]
    fn test_select_all_keeps_order() {
        let mut rng = StdRng::seed_from_u64(7);
        let assets = vec![
            RemoteAsset::new("1", "a.jpg"),
            RemoteAsset::new("2", "b.jpg").favorite(),
            RemoteAsset::new("3", "c.jpg"),
        ];
        let selected = select(assets.clone(), false, 0, &mut rng);
        assert_eq!(ids(&selected), vec!["1", "2", "3"]);

        let selected = select(assets, true, 0, &mut rng);
        assert_eq!(ids(&selected), vec!["2", "1", "3"]);
    }

    #[test]
    fn test_random_select_samples_non_favorites() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut assets: Vec<RemoteAsset> = (0..20)
            .map(|i| RemoteAsset::new(i.to_string(), "p.jpg"))
            .collect();
        assets.push(RemoteAsset::new("fav", "f.jpg").favorite());

        let selected = select(assets, true, 5, &mut rng);
        assert_eq!(selected.len(), 6);
        assert_eq!(selected[0].id, "fav");

        let unique: HashSet<&str> = selected.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(unique.len(), 6);
    }

    #[test]
    fn test_random_select_larger_than_pool_takes_all() {
        let mut rng = StdRng::seed_from_u64(1);
        let assets = vec![RemoteAsset::new("1", "a.jpg"), RemoteAsset::new("2", "b.jpg")];
        let selected = select(assets, false, 10, &mut rng);
        assert_eq!(ids(&selected), vec!["1", "2"]);
    }
}
