//! Fuzzy string matching used for slot-filling
//!
//! Name matching follows a fixed precedence: exact (case-insensitive), then
//! substring containment in either direction, then a similarity ratio at or
//! above a configured threshold. The first candidate satisfying the highest
//! tier wins.

/// Similarity ratio in `[0, 1]` between two strings (case-insensitive)
pub fn similarity(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(&a.to_lowercase(), &b.to_lowercase())
}

/// How a candidate matched the query
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchTier {
    Exact,
    Contains,
    Similar,
}

/// Classify how `candidate` matches `query`, if at all
pub fn match_tier(query: &str, candidate: &str, threshold: f64) -> Option<MatchTier> {
    let q = query.trim().to_lowercase();
    let c = candidate.trim().to_lowercase();
    if q.is_empty() || c.is_empty() {
        return None;
    }

    if q == c {
        Some(MatchTier::Exact)
    } else if c.contains(&q) || q.contains(&c) {
        Some(MatchTier::Contains)
    } else if similarity(&q, &c) >= threshold {
        Some(MatchTier::Similar)
    } else {
        None
    }
}

/// Return the index of the best candidate: lowest tier wins, earliest on ties
pub fn best_match<'a, I>(query: &str, candidates: I, threshold: f64) -> Option<usize>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut best: Option<(MatchTier, usize)> = None;

    for (idx, candidate) in candidates.into_iter().enumerate() {
        if let Some(tier) = match_tier(query, candidate, threshold) {
            match best {
                Some((best_tier, _)) if best_tier <= tier => {}
                _ => best = Some((tier, idx)),
            }
            if tier == MatchTier::Exact {
                break;
            }
        }
    }

    best.map(|(_, idx)| idx)
}
