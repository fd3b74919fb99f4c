//! Merges a fresh scrape into a stored catalog document.
//!
//! Everything here is pure: callers fetch, this module decides what changed,
//! and the store writes the resulting [`AnimePatch`].

use crate::models::anime::{AnimeDocument, AnimePatch};
use crate::models::episode::{EpisodeLinks, EpisodeListing, EpisodeRecord, KwikLink};
use std::collections::HashMap;

/// Freshly scraped state for one catalog entry.
#[derive(Debug, Clone)]
pub struct ScrapedAnime {
    /// Provider metadata mapped onto a document, related entries already enriched.
    pub metadata: AnimeDocument,
    /// `None` when the episode listing was not refreshed.
    pub episodes: Option<EpisodeListing>,
}

#[derive(Debug, Clone)]
pub struct Reconciliation {
    pub updated: AnimeDocument,
    /// Fields to write. Empty for an unchanged document and for a new one.
    pub patch: AnimePatch,
    /// True when there was no stored document and `updated` must be inserted.
    pub created: bool,
}

fn changed<T: PartialEq + Clone>(current: &T, fresh: &T) -> Option<T> {
    (current != fresh).then(|| fresh.clone())
}

fn changed_unordered(current: &[String], fresh: &[String]) -> Option<Vec<String>> {
    let mut a = current.to_vec();
    let mut b = fresh.to_vec();
    a.sort();
    b.sort();
    (a != b).then(|| fresh.to_vec())
}

fn count(len: usize) -> i64 {
    i64::try_from(len).unwrap_or(i64::MAX)
}

#[must_use]
pub fn reconcile(existing: Option<&AnimeDocument>, fresh: ScrapedAnime) -> Reconciliation {
    let Some(existing) = existing else {
        let mut doc = fresh.metadata;
        match fresh.episodes {
            Some(EpisodeListing::Live { total }) => {
                doc.use_api = true;
                doc.episodes = Vec::new();
                doc.current_episode_count = i64::from(total);
            }
            Some(EpisodeListing::Stored(episodes)) => {
                doc.current_episode_count = count(episodes.len());
                doc.episodes = episodes;
                doc.use_api = false;
            }
            None => {}
        }
        return Reconciliation {
            updated: doc,
            patch: AnimePatch::default(),
            created: true,
        };
    };

    let meta = &fresh.metadata;
    let mut patch = AnimePatch {
        title: changed(&existing.title, &meta.title),
        synopsis: changed(&existing.synopsis, &meta.synopsis),
        status: changed(&existing.status, &meta.status),
        episode_count: changed(&existing.episode_count, &meta.episode_count),
        start_date: changed(&existing.start_date, &meta.start_date),
        end_date: changed(&existing.end_date, &meta.end_date),
        score: changed(&existing.score, &meta.score),
        rating: changed(&existing.rating, &meta.rating),
        genres: changed_unordered(&existing.genres, &meta.genres),
        studios: changed_unordered(&existing.studios, &meta.studios),
        alternative_titles: changed(&existing.alternative_titles, &meta.alternative_titles),
        recommendations: changed(&existing.recommendations, &meta.recommendations),
        related_anime: changed(&existing.related_anime, &meta.related_anime),
        ..Default::default()
    };

    match fresh.episodes {
        Some(EpisodeListing::Live { total }) => {
            patch.use_api = changed(&existing.use_api, &true);
            patch.episodes = (!existing.episodes.is_empty()).then(Vec::new);
            patch.current_episode_count =
                changed(&existing.current_episode_count, &i64::from(total));
        }
        Some(EpisodeListing::Stored(episodes)) => {
            let merged = merge_episodes(&existing.episodes, episodes);
            patch.use_api = changed(&existing.use_api, &false);
            patch.current_episode_count =
                changed(&existing.current_episode_count, &count(merged.len()));
            patch.episodes = changed(&existing.episodes, &merged);
        }
        None => {}
    }

    let mut updated = existing.clone();
    patch.apply(&mut updated);

    Reconciliation {
        updated,
        patch,
        created: false,
    }
}

/// Merges a fresh listing into stored episodes, in the fresh listing's order.
///
/// Episodes are matched on their session, falling back to the ordinal. An
/// unchanged episode is kept verbatim. A changed one takes the fresh scalar
/// fields while keeping every direct URL already resolved for a link with
/// the same URL.
#[must_use]
pub fn merge_episodes(stored: &[EpisodeRecord], fresh: Vec<EpisodeRecord>) -> Vec<EpisodeRecord> {
    let by_session: HashMap<&str, &EpisodeRecord> =
        stored.iter().map(|e| (e.session.as_str(), e)).collect();
    let by_ordinal: HashMap<u64, &EpisodeRecord> =
        stored.iter().map(|e| (e.episode.to_bits(), e)).collect();

    fresh
        .into_iter()
        .map(|new_ep| {
            let old = by_session
                .get(new_ep.session.as_str())
                .or_else(|| by_ordinal.get(&new_ep.episode.to_bits()))
                .copied();
            match old {
                Some(old) => merge_episode(old, new_ep),
                None => new_ep,
            }
        })
        .collect()
}

fn merge_episode(old: &EpisodeRecord, new_ep: EpisodeRecord) -> EpisodeRecord {
    let scalars_unchanged = old.duration == new_ep.duration
        && old.session == new_ep.session
        && old.snapshot == new_ep.snapshot;

    if scalars_unchanged {
        if old.links.is_empty() && !new_ep.links.is_empty() {
            return EpisodeRecord {
                links: new_ep.links,
                ..old.clone()
            };
        }
        return old.clone();
    }

    let links = if new_ep.links.is_empty() {
        old.links.clone()
    } else {
        EpisodeLinks {
            kwik: preserve_direct_urls(&old.links.kwik, new_ep.links.kwik),
            pahe: new_ep.links.pahe,
        }
    };

    EpisodeRecord {
        episode: new_ep.episode,
        duration: new_ep.duration,
        session: new_ep.session,
        snapshot: new_ep.snapshot,
        links,
    }
}

fn preserve_direct_urls(old: &[KwikLink], fresh: Vec<KwikLink>) -> Vec<KwikLink> {
    fresh
        .into_iter()
        .map(|mut link| {
            if let Some(resolved) = old
                .iter()
                .find(|o| o.url == link.url && o.has_direct_url())
            {
                link.direct_url.clone_from(&resolved.direct_url);
            }
            link
        })
        .collect()
}
