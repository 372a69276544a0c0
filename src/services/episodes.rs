//! Deduplication and ordering of an anime's episode collection.
//!
//! Two sources feed the collection: the cheap feed endpoints yield stub
//! episodes one at a time, while a detail fetch yields the authoritative list.
//! Stubs are merged by id, detail lists replace wholesale.

use crate::models::Episode;

/// Appends a stub unless an episode with the same id is already present.
///
/// The first-seen episode wins; later duplicates are dropped. Only the stub's
/// own fields are kept, never its anime back-reference.
pub fn merge_stub(episodes: &mut Vec<Episode>, stub: &Episode) -> bool {
    if episodes.iter().any(|e| e.id == stub.id) {
        return false;
    }

    episodes.push(Episode {
        id: stub.id,
        slug: stub.slug.clone(),
        anime: None,
        episode: stub.episode.clone(),
        watches: None,
        created_at: stub.created_at,
    });
    true
}

/// Merges every stub in order, returning how many were new.
pub fn merge_stubs<'a>(
    episodes: &mut Vec<Episode>,
    stubs: impl IntoIterator<Item = &'a Episode>,
) -> usize {
    stubs
        .into_iter()
        .filter(|stub| merge_stub(episodes, stub))
        .count()
}

/// Orders episodes newest first (descending id).
///
/// Each episode is inserted before the first already-placed episode with a
/// smaller id, or appended when there is none. Reordering a sorted list
/// returns it unchanged.
#[must_use]
pub fn reorder(episodes: Vec<Episode>) -> Vec<Episode> {
    let mut ordered: Vec<Episode> = Vec::with_capacity(episodes.len());

    for episode in episodes {
        match ordered.iter().position(|placed| placed.id < episode.id) {
            Some(index) => ordered.insert(index, episode),
            None => ordered.push(episode),
        }
    }

    ordered
}

/// Swaps in an authoritative list from a detail fetch.
///
/// Nothing from the previous collection survives, watches resolved earlier
/// included. An empty list leaves the collection as it was.
pub fn replace(episodes: &mut Vec<Episode>, fetched: &[Episode]) -> bool {
    if fetched.is_empty() {
        return false;
    }

    *episodes = fetched.iter().map(Episode::detached).collect();
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AnimeId, EpisodeId};
    use crate::models::{AnimeRef, Watch};
    use std::collections::HashSet;

    fn stub(id: i64, label: &str) -> Episode {
        Episode {
            id: EpisodeId::new(id),
            slug: format!("x-episode-{label}"),
            anime: Some(AnimeRef {
                id: AnimeId::new(5),
                title: "X".to_string(),
                slug: "x".to_string(),
                cover_url: "c".to_string(),
            }),
            episode: label.to_string(),
            watches: None,
            created_at: None,
        }
    }

    fn ids(episodes: &[Episode]) -> Vec<i64> {
        episodes.iter().map(|e| e.id.value()).collect()
    }

    #[test]
    fn merge_stub_skips_duplicates_and_keeps_first_seen() {
        let mut episodes = Vec::new();
        let stubs = [
            stub(3, "3"),
            stub(1, "1"),
            stub(3, "3 (reupload)"),
            stub(2, "2"),
            stub(1, "1 again"),
        ];

        let added = merge_stubs(&mut episodes, &stubs);

        assert_eq!(added, 3);
        assert_eq!(ids(&episodes), vec![3, 1, 2]);

        let unique: HashSet<_> = episodes.iter().map(|e| e.id).collect();
        assert_eq!(unique.len(), episodes.len());

        assert_eq!(episodes[0].episode, "3");
        assert_eq!(episodes[1].episode, "1");
    }

    #[test]
    fn merge_stub_drops_back_reference() {
        let mut episodes = Vec::new();
        assert!(merge_stub(&mut episodes, &stub(9, "9")));
        assert!(episodes[0].anime.is_none());
    }

    #[test]
    fn merge_stub_does_not_touch_existing_watches() {
        let mut existing = stub(4, "4").detached();
        existing.watches = Some(vec![Watch {
            id: 1,
            source: "A".to_string(),
            stream_url: "https://a.test/4".to_string(),
        }]);
        let mut episodes = vec![existing];

        assert!(!merge_stub(&mut episodes, &stub(4, "4")));
        assert!(episodes[0].has_watches());
    }

    #[test]
    fn reorder_sorts_descending() {
        let episodes = vec![stub(2, "2"), stub(10, "10"), stub(1, "1"), stub(7, "7")];
        assert_eq!(ids(&reorder(episodes)), vec![10, 7, 2, 1]);
    }

    #[test]
    fn reorder_is_idempotent() {
        let once = reorder(vec![stub(5, "5"), stub(8, "8"), stub(6, "6")]);
        let twice = reorder(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn reorder_empty() {
        assert!(reorder(Vec::new()).is_empty());
    }

    #[test]
    fn replace_discards_previously_resolved_watches() {
        let mut seven = stub(7, "7").detached();
        seven.watches = Some(vec![Watch {
            id: 1,
            source: "Mirror".to_string(),
            stream_url: "https://m.test/7".to_string(),
        }]);
        let mut episodes = vec![seven, stub(6, "6").detached()];

        let fetched = vec![stub(8, "8"), stub(7, "7"), stub(6, "6")];
        assert!(replace(&mut episodes, &fetched));

        assert_eq!(ids(&episodes), vec![8, 7, 6]);
        let seven = episodes.iter().find(|e| e.id == EpisodeId::new(7)).unwrap();
        assert!(seven.watches.is_none());
        assert!(episodes.iter().all(|e| e.anime.is_none()));
    }

    #[test]
    fn replace_with_empty_list_keeps_collection() {
        let mut episodes = vec![stub(1, "1").detached()];
        assert!(!replace(&mut episodes, &[]));
        assert_eq!(ids(&episodes), vec![1]);
    }
}
