//! Sequence-matching similarity for counterparty labels.
//!
//! Ratcliff/Obershelp: find the longest common block, recurse on the pieces to
//! its left and right, and score `2 * matched / (len_a + len_b)`.

/// Case-insensitive similarity ratio in [0, 1]. Two empty strings score 1.0.
pub fn ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.to_lowercase().chars().collect();
    let b: Vec<char> = b.to_lowercase().chars().collect();

    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }

    2.0 * matching_chars(&a, &b) as f64 / total as f64
}

/// Total size of the matching blocks between `a` and `b`.
fn matching_chars(a: &[char], b: &[char]) -> usize {
    let mut matched = 0;
    let mut pending = vec![(0, a.len(), 0, b.len())];

    while let Some((alo, ahi, blo, bhi)) = pending.pop() {
        let (i, j, size) = longest_match(a, b, alo, ahi, blo, bhi);
        if size == 0 {
            continue;
        }
        matched += size;
        if alo < i && blo < j {
            pending.push((alo, i, blo, j));
        }
        if i + size < ahi && j + size < bhi {
            pending.push((i + size, ahi, j + size, bhi));
        }
    }

    matched
}

/// Longest common block of `a[alo..ahi]` and `b[blo..bhi]`.
///
/// Ties resolve to the block starting earliest in `a`, then earliest in `b`.
fn longest_match(
    a: &[char],
    b: &[char],
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let (mut best_i, mut best_j, mut best_size) = (alo, blo, 0);
    // run[j] = length of the common run ending at a[i - 1], b[j - 1]
    let mut prev = vec![0usize; bhi - blo + 1];

    for i in alo..ahi {
        let mut cur = vec![0usize; bhi - blo + 1];
        for j in blo..bhi {
            if a[i] != b[j] {
                continue;
            }
            let k = prev[j - blo] + 1;
            cur[j - blo + 1] = k;
            if k > best_size {
                best_i = i + 1 - k;
                best_j = j + 1 - k;
                best_size = k;
            }
        }
        prev = cur;
    }

    (best_i, best_j, best_size)
}
