//! Block-ratio string similarity (Ratcliff/Obershelp).
//!
//! The score is `2 * M / (|a| + |b|)` where `M` is the total length of the
//! matching blocks found by taking the longest common substring and
//! recursing on the unmatched pieces to its left and right. Lengths count
//! Unicode scalar values, so CJK product names weigh one per character.

/// Similarity of `a` and `b` in `[0.0, 1.0]`.
///
/// Two empty strings are identical (1.0). The longest-block search breaks
/// ties toward the earliest position, which makes the raw decomposition
/// order-dependent; inputs are therefore put in a canonical order first so
/// `similarity(a, b) == similarity(b, a)` always holds.
pub fn similarity(a: &str, b: &str) -> f64 {
    let (a, b) = if a <= b { (a, b) } else { (b, a) };
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * matching_characters(&a, &b) as f64 / total as f64
}

/// Total length of all matching blocks between `a` and `b`.
fn matching_characters(a: &[char], b: &[char]) -> usize {
    let mut matched = 0;
    let mut pending = vec![(0, a.len(), 0, b.len())];

    while let Some((alo, ahi, blo, bhi)) = pending.pop() {
        let (i, j, k) = longest_block(a, b, alo, ahi, blo, bhi);
        if k == 0 {
            continue;
        }
        matched += k;
        if alo < i && blo < j {
            pending.push((alo, i, blo, j));
        }
        if i + k < ahi && j + k < bhi {
            pending.push((i + k, ahi, j + k, bhi));
        }
    }

    matched
}

/// Longest common block of `a[alo..ahi]` and `b[blo..bhi]` as
/// `(start_a, start_b, len)`. Earliest in `a`, then in `b`, on ties.
fn longest_block(
    a: &[char],
    b: &[char],
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let mut best = (alo, blo, 0);
    let width = bhi - blo;
    // run[j + 1] = length of the common run ending at a[i], b[blo + j]
    let mut prev = vec![0usize; width + 1];
    let mut curr = vec![0usize; width + 1];

    for i in alo..ahi {
        for j in blo..bhi {
            let slot = j - blo + 1;
            curr[slot] = if a[i] == b[j] { prev[slot - 1] + 1 } else { 0 };
            let k = curr[slot];
            if k > best.2 {
                best = (i + 1 - k, j + 1 - k, k);
            }
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn identical_and_empty() {
        assert_eq!(similarity("", ""), 1.0);
        assert_eq!(similarity("aspirin", "aspirin"), 1.0);
        assert_eq!(similarity("", "x"), 0.0);
        assert_eq!(similarity("x", ""), 0.0);
        assert_eq!(similarity("abc", "xyz"), 0.0);
    }

    #[test]
    fn known_ratios() {
        // 6 shared characters out of 6 + 7
        assert!(close(similarity("aspirn", "aspirin"), 12.0 / 13.0));
        // "0mg" then "5"
        assert!(close(similarity("500mg", "250mg"), 0.8));
        assert!(close(similarity("acme", "beta corp"), 4.0 / 13.0));
        assert!(close(similarity("acme", "bayer"), 4.0 / 9.0));
    }

    #[test]
    fn concatenated_fields_are_order_independent() {
        let forward = similarity("aspirn500mgacme", "aspirin250mgbeta corp");
        let backward = similarity("aspirin250mgbeta corp", "aspirn500mgacme");
        assert_eq!(forward, backward);
        assert!(close(forward, 22.0 / 36.0));
    }

    #[test]
    fn counts_characters_not_bytes() {
        // 阿司匹林 vs 阿司匹林肠溶片: 4 shared of 4 + 7
        assert!(close(similarity("阿司匹林", "阿司匹林肠溶片"), 8.0 / 11.0));
    }

    #[test]
    fn recursion_picks_up_both_sides() {
        // longest block "bcd", then "a" on the left and "e" on the right
        assert!(close(similarity("abcde", "axbcdye"), 10.0 / 12.0));
    }
}
