//! Common-substring primitives used by the bisection and half-match hinge.
//!
//! Everything here operates on `&[char]` (Unicode scalars), not bytes, so
//! that an index is always a valid split point.

/// Length of the longest common prefix of `a` and `b`.
pub fn common_prefix(a: &[char], b: &[char]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

/// Length of the longest common suffix of `a` and `b`.
pub fn common_suffix(a: &[char], b: &[char]) -> usize {
    a.iter().rev().zip(b.iter().rev()).take_while(|(x, y)| x == y).count()
}

/// Length of the longest suffix of `a` that is also a prefix of `b`.
///
/// Used to detect two edits that were split apart by chance in the middle of
/// what was really one contiguous insertion/deletion.
pub fn common_overlap(a: &[char], b: &[char]) -> usize {
    let text_len = a.len().min(b.len());
    if text_len == 0 {
        return 0;
    }
    // only the last `text_len` characters of `a` can possibly be a prefix of `b`
    let a = &a[a.len() - text_len..];
    (1..=text_len)
        .rev()
        .find(|&len| a[a.len() - len..] == b[..len])
        .unwrap_or(0)
}

/// A hinge substring shared by `a` and `b`, long enough to recurse on.
pub struct HalfMatch {
    pub a_prefix: Vec<char>,
    pub a_suffix: Vec<char>,
    pub b_prefix: Vec<char>,
    pub b_suffix: Vec<char>,
    pub mid: Vec<char>,
}

/// Finds a substring of length >= `ceil(max(|a|, |b|)/2)` common to `a` and
/// `b`, splitting both into a `(prefix, suffix)` pair around it.
///
/// Returns `None` when the shorter input has fewer than 4 characters, or no
/// long-enough common substring exists.
pub fn half_match(a: &[char], b: &[char]) -> Option<HalfMatch> {
    let (long, short, swapped) = if a.len() >= b.len() { (a, b, false) } else { (b, a, true) };
    if long.len() < 4 || short.len() * 2 < long.len() {
        return None;
    }

    // Try a hinge around the 1/4 and 3/4 marks of `long`; the classic
    // technique from the original algorithm.
    let hm1 = half_match_i(long, short, (long.len() + 3) / 4);
    let hm2 = half_match_i(long, short, (long.len() + 1) / 2);

    let best = match (hm1, hm2) {
        (None, None) => return None,
        (Some(h), None) | (None, Some(h)) => h,
        (Some(h1), Some(h2)) => {
            if h2.mid.len() >= h1.mid.len() {
                h2
            } else {
                h1
            }
        }
    };

    Some(if swapped {
        HalfMatch {
            a_prefix: best.b_prefix,
            a_suffix: best.b_suffix,
            b_prefix: best.a_prefix,
            b_suffix: best.a_suffix,
            mid: best.mid,
        }
    } else {
        best
    })
}

/// Looks for the longest substring of `long` starting at/around `seed` that
/// also occurs in `short`, of length at least `long.len()/4`.
fn half_match_i(long: &[char], short: &[char], seed: usize) -> Option<HalfMatch> {
    let seed_len = long.len() / 4;
    let seed_slice = &long[seed..(seed + seed_len).min(long.len())];
    if seed_slice.is_empty() {
        return None;
    }

    let mut best_mid: &[char] = &[];
    let mut best_long_start = 0;
    let mut best_short_start = 0;

    let mut start = 0;
    while let Some(found) = find_subslice(&short[start..], seed_slice) {
        let short_start = start + found;
        let prefix_len = common_prefix(&long[seed..], &short[short_start..]);
        let suffix_len = common_suffix(&long[..seed], &short[..short_start]);
        if best_mid.len() < suffix_len + prefix_len {
            best_long_start = seed - suffix_len;
            best_short_start = short_start - suffix_len;
            best_mid = &long[best_long_start..best_long_start + suffix_len + prefix_len];
        }
        start = short_start + 1;
        if start >= short.len() {
            break;
        }
    }

    if best_mid.len() * 2 < long.len() {
        return None;
    }

    Some(HalfMatch {
        a_prefix: long[..best_long_start].to_vec(),
        a_suffix: long[best_long_start + best_mid.len()..].to_vec(),
        b_prefix: short[..best_short_start].to_vec(),
        b_suffix: short[best_short_start + best_mid.len()..].to_vec(),
        mid: best_mid.to_vec(),
    })
}

fn find_subslice(haystack: &[char], needle: &[char]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cs(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    #[test]
    fn prefix_suffix() {
        assert_eq!(common_prefix(&cs("abc"), &cs("abx")), 2);
        assert_eq!(common_prefix(&cs(""), &cs("abx")), 0);
        assert_eq!(common_suffix(&cs("abc"), &cs("xbc")), 2);
    }

    #[test]
    fn overlap_boundaries() {
        assert_eq!(common_overlap(&cs(""), &cs("x")), 0);
        let x = cs("abcdef");
        assert_eq!(common_overlap(&x, &cs("def")), 3);
        assert_eq!(common_overlap(&cs("abc"), &cs("abcd")), 0);
    }

    #[test]
    fn half_match_too_short() {
        assert!(half_match(&cs("abc"), &cs("xyz1234")).is_none());
    }

    #[test]
    fn half_match_finds_hinge() {
        let a = cs("1234567890123456789012345678901234567890123456789012345678901234567890");
        let b = cs("abc56789z");
        let hm = half_match(&a, &b).expect("expected a half match");
        assert_eq!(hm.mid, cs("56789"));
    }
}
