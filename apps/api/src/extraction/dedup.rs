use std::collections::{HashMap, HashSet};

/// Similarity above which two lines count as the same line.
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.85;

/// Incremental near-duplicate filter over a stream of lines.
///
/// Lines are trimmed and compared case-insensitively with
/// [`similarity_ratio`]. The first occurrence wins. Exact repeats are caught
/// by a hash lookup, and pairs whose length or character-count bounds already
/// rule out a match never reach the full comparison.
pub struct LineDeduper {
    threshold: f64,
    seen: HashSet<String>,
    kept: Vec<Vec<char>>,
}

impl LineDeduper {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            seen: HashSet::new(),
            kept: Vec::new(),
        }
    }

    /// Returns the trimmed line if it is neither blank nor a near-duplicate of
    /// a line admitted earlier.
    pub fn admit<'l>(&mut self, line: &'l str) -> Option<&'l str> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        let lower = line.to_lowercase();
        if self.seen.contains(&lower) {
            return None;
        }

        let chars: Vec<char> = lower.chars().collect();
        let is_duplicate = self.kept.iter().any(|existing| {
            real_quick_ratio(&chars, existing) >= self.threshold
                && quick_ratio(&chars, existing) >= self.threshold
                && similarity_ratio(&chars, existing) >= self.threshold
        });
        if is_duplicate {
            return None;
        }

        self.seen.insert(lower);
        self.kept.push(chars);
        Some(line)
    }
}

/// Upper bound on [`similarity_ratio`] from the lengths alone.
fn real_quick_ratio(a: &[char], b: &[char]) -> f64 {
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * a.len().min(b.len()) as f64 / total as f64
}

/// Upper bound on [`similarity_ratio`] from shared character counts, ignoring order.
fn quick_ratio(a: &[char], b: &[char]) -> f64 {
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    let mut available: HashMap<char, usize> = HashMap::new();
    for &c in b {
        *available.entry(c).or_insert(0) += 1;
    }
    let mut shared = 0;
    for c in a {
        if let Some(n) = available.get_mut(c) {
            if *n > 0 {
                *n -= 1;
                shared += 1;
            }
        }
    }
    2.0 * shared as f64 / total as f64
}

/// Ratcliff/Obershelp similarity: `2 * matched / (len(a) + len(b))`.
///
/// Matched characters are found by taking the longest common block, then
/// recursing on the unmatched pieces to its left and right.
pub fn similarity_ratio(a: &[char], b: &[char]) -> f64 {
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * matching_chars(a, b) as f64 / total as f64
}

fn matching_chars(a: &[char], b: &[char]) -> usize {
    let (start_a, start_b, len) = longest_common_block(a, b);
    if len == 0 {
        return 0;
    }
    len + matching_chars(&a[..start_a], &b[..start_b])
        + matching_chars(&a[start_a + len..], &b[start_b + len..])
}

/// Longest common substring, earliest in `a` then earliest in `b` on ties.
fn longest_common_block(a: &[char], b: &[char]) -> (usize, usize, usize) {
    let mut best = (0, 0, 0);
    // run[j + 1] = length of the common run ending at a[i], b[j]
    let mut prev = vec![0usize; b.len() + 1];
    let mut run = vec![0usize; b.len() + 1];

    for i in 0..a.len() {
        for j in 0..b.len() {
            run[j + 1] = if a[i] == b[j] { prev[j] + 1 } else { 0 };
            let len = run[j + 1];
            if len > best.2 {
                best = (i + 1 - len, j + 1 - len, len);
            }
        }
        std::mem::swap(&mut prev, &mut run);
    }

    best
}
