//! Line-mode pre-pass: hash each unique line to a single synthetic
//! codepoint, diff the resulting pseudo-text with the ordinary algorithm,
//! then rehydrate and re-diff each adjacent delete+insert run at full
//! resolution.
//!
//! This is the same trick the teacher crate's [`Interner`](crate::diff)
//! uses to turn a line-oriented comparison into a token comparison, applied
//! here to a single `diff_main` call instead of to every call.

use std::collections::HashMap;
use std::time::Instant;

use super::{cleanup, recurse, Diff, Op};
use crate::settings::Settings;

/// First codepoint handed out for a hashed line. Values below this are
/// reserved for the padding sentinels (`U+0001..U+0004`) used elsewhere in
/// the library, so a hashed line can never collide with one.
const FIRST_LINE_CODE: u32 = 0x10;

pub fn diff_line_mode(
    text1: &[char],
    text2: &[char],
    deadline: Option<Instant>,
    settings: &Settings,
) -> Vec<Diff> {
    let mut lines: Vec<String> = Vec::new();
    let mut index: HashMap<String, char> = HashMap::with_hasher(ahash::RandomState::new());

    let hashed1 = lines_to_chars(text1, &mut lines, &mut index);
    let hashed2 = lines_to_chars(text2, &mut lines, &mut index);

    let mut diffs = recurse(&hashed1, &hashed2, deadline, settings);
    chars_to_lines(&mut diffs, &lines);
    cleanup::cleanup_merge(&mut diffs);
    fine_grained_pass(&mut diffs, deadline, settings);
    diffs
}

/// Splits `text` into lines (keeping the trailing newline with each line,
/// so a changed line terminator is itself detected as a change) and maps
/// each distinct line to a single `char`, appending new lines to `lines` /
/// `index` as they're first seen.
fn lines_to_chars(
    text: &[char],
    lines: &mut Vec<String>,
    index: &mut HashMap<String, char>,
) -> Vec<char> {
    let mut out = Vec::new();
    let mut start = 0;
    while start < text.len() {
        let end = text[start..].iter().position(|&c| c == '\n').map_or(text.len(), |p| start + p + 1);
        let line: String = text[start..end].iter().collect();
        let code = *index.entry(line.clone()).or_insert_with(|| {
            lines.push(line);
            code_for_index(lines.len() - 1)
        });
        out.push(code);
        start = end;
    }
    out
}

/// Maps a dense sequential line index to a `char`, skipping the UTF-16
/// surrogate range so every index is representable without collision; this
/// is how line-mode supports well beyond 256 distinct lines.
fn code_for_index(idx: usize) -> char {
    let mut v = FIRST_LINE_CODE + idx as u32;
    if v >= 0xD800 {
        v += 0x0800; // skip the surrogate range U+D800..=U+DFFF
    }
    char::from_u32(v).expect("line-mode hash exhausted the codepoint space")
}

/// Replaces each hashed pseudo-character back with the line(s) it stands
/// for.
fn chars_to_lines(diffs: &mut [Diff], lines: &[String]) {
    for diff in diffs {
        let mut text = String::new();
        for c in diff.text.chars() {
            let idx = line_index(c);
            text.push_str(&lines[idx]);
        }
        diff.text = text;
    }
}

fn line_index(c: char) -> usize {
    let mut v = c as u32;
    if v >= 0xE000 {
        v -= 0x0800;
    }
    (v - FIRST_LINE_CODE) as usize
}

/// After rehydration, every adjacent `Delete` + `Insert` pair (a run of
/// lines that the line-level diff decided differ, in either order) is
/// re-diffed at character granularity so within-line changes are visible,
/// exactly as a human reading the diff would expect.
fn fine_grained_pass(diffs: &mut Vec<Diff>, deadline: Option<Instant>, settings: &Settings) {
    let mut out = Vec::with_capacity(diffs.len());
    let mut i = 0;
    while i < diffs.len() {
        let pair = i + 1 < diffs.len()
            && ((diffs[i].op == Op::Delete && diffs[i + 1].op == Op::Insert)
                || (diffs[i].op == Op::Insert && diffs[i + 1].op == Op::Delete));
        if pair {
            let (del, ins) = if diffs[i].op == Op::Delete { (i, i + 1) } else { (i + 1, i) };
            let a: Vec<char> = diffs[del].text.chars().collect();
            let b: Vec<char> = diffs[ins].text.chars().collect();
            out.extend(recurse(&a, &b, deadline, settings));
            i += 2;
        } else {
            out.push(diffs[i].clone());
            i += 1;
        }
    }
    *diffs = out;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::{text1 as reconstruct1, text2 as reconstruct2};

    fn cs(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    #[test]
    fn line_mode_reconstructs_both_texts() {
        let a: String = (0..10).map(|i| format!("line {i}\n")).collect();
        let mut b = a.clone();
        b.push_str("an extra line\n");
        let a_chars = cs(&a);
        let b_chars = cs(&b);
        let diffs = diff_line_mode(&a_chars, &b_chars, None, &Settings::default());
        assert_eq!(reconstruct1(&diffs), a);
        assert_eq!(reconstruct2(&diffs), b);
    }

    #[test]
    fn fine_grained_pass_handles_either_delete_insert_order() {
        let mut diffs = vec![Diff::insert("foo"), Diff::delete("bar")];
        fine_grained_pass(&mut diffs, None, &Settings::default());
        assert_eq!(reconstruct1(&diffs), "bar");
        assert_eq!(reconstruct2(&diffs), "foo");
    }

    #[test]
    fn supports_well_over_256_distinct_lines() {
        // spec.md §4.2: line hashing must support >= 256 distinct lines,
        // which exercises the surrogate-range skip in `code_for_index`.
        let a: String = (0..600).map(|i| format!("line {i}\n")).collect();
        let mut b_lines: Vec<String> = (0..600).map(|i| format!("line {i}\n")).collect();
        b_lines[300] = "a changed line\n".to_string();
        let b: String = b_lines.concat();

        let a_chars = cs(&a);
        let b_chars = cs(&b);
        let diffs = diff_line_mode(&a_chars, &b_chars, None, &Settings::default());
        assert_eq!(reconstruct1(&diffs), a);
        assert_eq!(reconstruct2(&diffs), b);
        assert!(diffs.iter().any(|d| d.op != Op::Equal));
    }

    #[test]
    fn code_for_index_skips_surrogate_range() {
        for idx in 0..700 {
            let c = code_for_index(idx);
            assert!(
                !(0xD800..=0xDFFF).contains(&(c as u32)),
                "codepoint for index {idx} landed in the surrogate range"
            );
            assert_eq!(line_index(c), idx);
        }
    }
}
