use std::collections::BTreeSet;

pub const MIN_QUERY_CHARS: usize = 2;
pub const MAX_SUGGESTIONS: usize = 10;

/// Skills containing `query` (case-insensitive), prefix matches first, then alphabetical.
pub fn suggest_skills<'a, I>(skill_lists: I, query: &str) -> Vec<String>
where
    I: IntoIterator<Item = &'a Vec<String>>,
{
    let query = query.trim();
    if query.chars().count() < MIN_QUERY_CHARS {
        return Vec::new();
    }
    let query_lower = query.to_lowercase();

    let unique: BTreeSet<&str> = skill_lists
        .into_iter()
        .flatten()
        .map(String::as_str)
        .filter(|s| !s.is_empty())
        .collect();

    let mut matching: Vec<&str> = unique
        .into_iter()
        .filter(|s| s.to_lowercase().contains(&query_lower))
        .collect();

    matching.sort_by_cached_key(|s| {
        let lower = s.to_lowercase();
        (!lower.starts_with(&query_lower), lower)
    });

    matching
        .into_iter()
        .take(MAX_SUGGESTIONS)
        .map(String::from)
        .collect()
}
