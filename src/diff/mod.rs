//! The diff engine: a Myers-style shortest edit script with a line-mode
//! pre-pass for large inputs, a wall-clock timeout, and a half-match hinge
//! used to shrink the problem before bisection.

use std::time::{Duration, Instant};

pub mod cleanup;
pub mod delta;
mod bisect;
mod linemode;
pub(crate) mod primitives;

use crate::error::{Error, Result};
use crate::settings::Settings;

/// Which side of an edit a [`Diff`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    /// Present in `text1`, absent from `text2`.
    Delete,
    /// Absent from `text1`, present in `text2`.
    Insert,
    /// Present, unchanged, in both texts.
    Equal,
}

/// One entry of an edit script: an operation tagged with the text it
/// applies to.
///
/// Walking a script and concatenating every non-[`Insert`](Op::Insert)
/// `text` yields `text1`; concatenating every non-[`Delete`](Op::Delete)
/// `text` yields `text2` (see [`text1`] / [`text2`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diff {
    /// Which side of the edit this entry belongs to.
    pub op: Op,
    /// The text affected by `op`.
    pub text: String,
}

impl Diff {
    /// Builds an [`Op::Delete`] entry.
    pub fn delete(text: impl Into<String>) -> Self {
        Diff { op: Op::Delete, text: text.into() }
    }

    /// Builds an [`Op::Insert`] entry.
    pub fn insert(text: impl Into<String>) -> Self {
        Diff { op: Op::Insert, text: text.into() }
    }

    /// Builds an [`Op::Equal`] entry.
    pub fn equal(text: impl Into<String>) -> Self {
        Diff { op: Op::Equal, text: text.into() }
    }

    fn from_chars(op: Op, text: &[char]) -> Self {
        Diff { op, text: text.iter().collect() }
    }
}

/// Computes an edit script that transforms `text1` into `text2`.
///
/// `checklines` enables the line-mode pre-pass (§4.2 step 5) for inputs that
/// look line-oriented and exceed 100 characters on both sides; pass `false`
/// when diffing something that isn't naturally line-structured (e.g. when
/// recursing on a bisection split).
///
/// Returns [`Error::InvalidInput`] if either argument is absent — `&str`
/// cannot itself be null, so this is only reachable through the `Option`
/// parameters, which exist to give that upstream contract a home.
pub fn diff_main(
    text1: Option<&str>,
    text2: Option<&str>,
    checklines: bool,
    settings: &Settings,
) -> Result<Vec<Diff>> {
    let text1 = text1.ok_or(Error::InvalidInput("text1 is required"))?;
    let text2 = text2.ok_or(Error::InvalidInput("text2 is required"))?;

    let deadline = if settings.diff_timeout.is_zero() {
        None
    } else {
        Some(Instant::now() + settings.diff_timeout)
    };

    let a: Vec<char> = text1.chars().collect();
    let b: Vec<char> = text2.chars().collect();
    Ok(diff_compute_outer(&a, &b, checklines, deadline, settings))
}

/// Entry point used by recursive calls, which already operate on `&[char]`
/// and carry a concrete deadline (or none, if timeouts are disabled).
fn diff_main_chars(
    text1: &[char],
    text2: &[char],
    checklines: bool,
    deadline: Option<Instant>,
    settings: &Settings,
) -> Vec<Diff> {
    diff_compute_outer(text1, text2, checklines, deadline, settings)
}

fn diff_compute_outer(
    text1: &[char],
    text2: &[char],
    checklines: bool,
    deadline: Option<Instant>,
    settings: &Settings,
) -> Vec<Diff> {
    if text1 == text2 {
        return if text1.is_empty() { Vec::new() } else { vec![Diff::from_chars(Op::Equal, text1)] };
    }

    let prefix_len = primitives::common_prefix(text1, text2);
    let (prefix, t1) = text1.split_at(prefix_len);
    let (_, t2) = text2.split_at(prefix_len);

    let suffix_len = primitives::common_suffix(t1, t2);
    let (t1, suffix) = t1.split_at(t1.len() - suffix_len);
    let (t2, _) = t2.split_at(t2.len() - suffix_len);

    let mut diffs = Vec::new();
    if !prefix.is_empty() {
        diffs.push(Diff::from_chars(Op::Equal, prefix));
    }
    diffs.extend(diff_compute(t1, t2, checklines, deadline, settings));
    if !suffix.is_empty() {
        diffs.push(Diff::from_chars(Op::Equal, suffix));
    }
    cleanup::cleanup_merge(&mut diffs);
    diffs
}

/// `spec.md` §4.2 steps 2-6, run on inputs that already have no common
/// prefix/suffix.
fn diff_compute(
    text1: &[char],
    text2: &[char],
    checklines: bool,
    deadline: Option<Instant>,
    settings: &Settings,
) -> Vec<Diff> {
    if text1.is_empty() {
        return vec![Diff::from_chars(Op::Insert, text2)];
    }
    if text2.is_empty() {
        return vec![Diff::from_chars(Op::Delete, text1)];
    }

    let (long, short, long_is_text1) =
        if text1.len() >= text2.len() { (text1, text2, true) } else { (text2, text1, false) };

    if let Some(pos) = find_subslice(long, short) {
        // the shorter text is wholly contained in the longer one
        let op = if long_is_text1 { Op::Delete } else { Op::Insert };
        let mut diffs = vec![Diff::from_chars(op, &long[..pos])];
        diffs.push(Diff::from_chars(Op::Equal, short));
        diffs.push(Diff::from_chars(op, &long[pos + short.len()..]));
        return diffs;
    }

    if short.len() == 1 {
        // a single character can't be a half-match hinge and can't usefully
        // be split further; fall straight through to the bisection.
        return bisect::diff_bisect(text1, text2, deadline, settings);
    }

    // A zero timeout means the caller wants an optimal diff at any cost;
    // half-match can shrink the problem at the expense of a non-minimal
    // result, so it's skipped in that single-shot mode.
    if !settings.diff_timeout.is_zero() {
        if let Some(hm) = primitives::half_match(text1, text2) {
            let diffs_a = diff_main_chars(&hm.a_prefix, &hm.b_prefix, checklines, deadline, settings);
            let diffs_b = diff_main_chars(&hm.a_suffix, &hm.b_suffix, checklines, deadline, settings);
            let mut diffs = diffs_a;
            diffs.push(Diff::from_chars(Op::Equal, &hm.mid));
            diffs.extend(diffs_b);
            return diffs;
        }
    }

    if checklines && text1.len() > 100 && text2.len() > 100 {
        return linemode::diff_line_mode(text1, text2, deadline, settings);
    }

    bisect::diff_bisect(text1, text2, deadline, settings)
}

fn find_subslice(haystack: &[char], needle: &[char]) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    if needle.len() > haystack.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

pub(crate) fn deadline_passed(deadline: Option<Instant>) -> bool {
    deadline.is_some_and(|d| Instant::now() >= d)
}

pub(crate) fn recurse(
    text1: &[char],
    text2: &[char],
    deadline: Option<Instant>,
    settings: &Settings,
) -> Vec<Diff> {
    diff_main_chars(text1, text2, false, deadline, settings)
}

/// Total text covered by `diffs` on the `text1` side.
pub fn text1(diffs: &[Diff]) -> String {
    diffs
        .iter()
        .filter(|d| d.op != Op::Insert)
        .map(|d| d.text.as_str())
        .collect()
}

/// Total text covered by `diffs` on the `text2` side.
pub fn text2(diffs: &[Diff]) -> String {
    diffs
        .iter()
        .filter(|d| d.op != Op::Delete)
        .map(|d| d.text.as_str())
        .collect()
}

/// Used only by tests and by callers who want to force a specific deadline
/// independent of [`Settings::diff_timeout`].
#[cfg(test)]
pub(crate) fn diff_main_with_deadline(
    text1: &str,
    text2: &str,
    checklines: bool,
    timeout: Duration,
    settings: &Settings,
) -> Vec<Diff> {
    let deadline = if timeout.is_zero() { None } else { Some(Instant::now() + timeout) };
    let a: Vec<char> = text1.chars().collect();
    let b: Vec<char> = text2.chars().collect();
    diff_compute_outer(&a, &b, checklines, deadline, settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diff(a: &str, b: &str) -> Vec<Diff> {
        diff_main(Some(a), Some(b), true, &Settings::default()).unwrap()
    }

    #[test]
    fn rejects_missing_input() {
        let err = diff_main(None, Some("x"), true, &Settings::default()).unwrap_err();
        assert_eq!(err, Error::InvalidInput("text1 is required"));
    }

    #[test]
    fn s1_simple_insertion() {
        // spec.md S1
        let diffs = diff("abc", "ab123c");
        assert_eq!(
            diffs,
            vec![Diff::equal("ab"), Diff::insert("123"), Diff::equal("c")]
        );
    }

    #[test]
    fn reconstructs_both_texts() {
        let cases = [
            ("", ""),
            ("abc", "abc"),
            ("abc", ""),
            ("", "abc"),
            ("The quick brown fox jumps over the lazy dog.", "That quick brown fox jumped over a lazy dog."),
            ("1234567890123456789012345678901234567890", "abcdefghijklmnopqrstuvwxyz"),
        ];
        for (a, b) in cases {
            let diffs = diff(a, b);
            assert_eq!(text1(&diffs), a);
            assert_eq!(text2(&diffs), b);
        }
    }

    #[test]
    fn zero_timeout_disables_half_match() {
        // spec.md §4.1: half-match is disabled in single-shot mode
        // (Diff_Timeout == 0), so this must reach bisection instead and
        // still reconstruct both texts correctly.
        let settings = Settings { diff_timeout: Duration::ZERO, ..Settings::default() };
        let a = "the quick brown fox jumped over the lazy dog and ran away quickly";
        let b = "a quick brown fox jumped over a lazy dog and ran off quickly";
        let diffs = diff_main(Some(a), Some(b), true, &settings).unwrap();
        assert_eq!(text1(&diffs), a);
        assert_eq!(text2(&diffs), b);
    }

    #[test]
    fn timeout_degrades_to_trivial_diff() {
        let a = "abcdefghij".repeat(2000);
        let b = "jihgfedcba".repeat(2000);
        let start = Instant::now();
        let diffs =
            diff_main_with_deadline(&a, &b, true, Duration::from_millis(100), &Settings::default());
        let elapsed = start.elapsed();
        assert!(elapsed < Duration::from_millis(500), "diff ran for {elapsed:?}");
        assert_eq!(text1(&diffs), a);
        assert_eq!(text2(&diffs), b);
    }
}
