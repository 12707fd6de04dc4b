use costar_core::{ActorRecord, CandidateCard, MovieId};
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

#[allow(clippy::expect_used)]
fn non_letters() -> &'static Regex {
    static NON_LETTERS: OnceLock<Regex> = OnceLock::new();
    NON_LETTERS.get_or_init(|| Regex::new(r"[^a-zа-яё]").expect("literal pattern compiles"))
}

/// Lowercased, trimmed, with everything but Latin and Cyrillic letters removed.
pub fn normalize_name(name: &str) -> String {
    non_letters()
        .replace_all(&name.trim().to_lowercase(), "")
        .into_owned()
}

/// Which search results to put in front of the user.
///
/// A result whose native or English name matches the query (after
/// [`normalize_name`]) and that has a photo is presented alone. Otherwise
/// every result that has a name and a photo is presented, in catalog order.
/// An empty return means nothing presentable was found.
pub fn select_candidates(query: &str, actors: &[ActorRecord]) -> Vec<CandidateCard> {
    let presentable = actors
        .iter()
        .filter(|a| !a.photo_url.is_empty())
        .filter(|a| !a.name.is_empty() || !a.en_name.is_empty());

    let wanted = normalize_name(query);
    if !wanted.is_empty() {
        let exact = presentable.clone().find(|a| {
            normalize_name(&a.name) == wanted || normalize_name(&a.en_name) == wanted
        });
        if let Some(actor) = exact {
            return vec![actor.to_card()];
        }
    }

    presentable.map(ActorRecord::to_card).collect()
}

/// Movies present in both lists, in the order of `first`, each at most once.
pub fn common_movie_ids(first: &[MovieId], second: &[MovieId]) -> Vec<MovieId> {
    let second: HashSet<MovieId> = second.iter().copied().collect();
    let mut seen = HashSet::new();
    first
        .iter()
        .copied()
        .filter(|id| second.contains(id) && seen.insert(*id))
        .collect()
}
