use std::cmp::Reverse;
use std::collections::HashMap;

use crate::domain::entities::{ArticleId, Candidate};

/// Stage-2 popularity re-rank.
///
/// Each candidate scores the number of candidates sharing its article. The
/// `final_count` best scores win; ties keep their Stage-1 order. Several
/// chunks of one article may be returned together.
pub fn rerank_by_popularity(candidates: &[Candidate], final_count: usize) -> Vec<Candidate> {
    let mut scores: HashMap<ArticleId, usize> = HashMap::new();
    for candidate in candidates {
        *scores.entry(candidate.article_id).or_default() += 1;
    }

    let mut ranked: Vec<&Candidate> = candidates.iter().collect();
    // sort_by_key is stable
    ranked.sort_by_key(|c| Reverse(scores[&c.article_id]));

    ranked.into_iter().take(final_count).cloned().collect()
}
