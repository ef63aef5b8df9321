//! The patch hunk type and its textual serialization.
//!
//! A [`Patch`] is a context-bearing hunk (classic unified-diff shape) whose
//! body is an edit script rather than a flat line list, so it can be applied
//! fuzzily against text that has drifted since the patch was made.

mod ops;

pub use ops::{patch_add_padding, patch_apply, patch_make, patch_split_max, PatchInput};

use crate::diff::{Diff, Op};
use crate::error::{Error, Result};

/// One hunk of a patch: a location in each text plus the edit script that
/// covers it, including surrounding context lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Patch {
    /// Offset of this hunk's first affected character in the source text.
    pub start1: usize,
    /// Offset of this hunk's first affected character in the target text.
    pub start2: usize,
    /// Number of characters this hunk spans in the source text.
    pub length1: usize,
    /// Number of characters this hunk spans in the target text.
    pub length2: usize,
    /// The context-bearing edit script for this hunk.
    pub diffs: Vec<Diff>,
}

impl Patch {
    pub(crate) fn new(start1: usize, start2: usize) -> Self {
        Patch { start1, start2, length1: 0, length2: 0, diffs: Vec::new() }
    }
}

/// Serializes `patches` to the classic unified-diff-flavored text format:
/// one `@@ -start1,length1 +start2,length2 @@` header per hunk followed by
/// its diff lines (` ` for equal, `-` for delete, `+` for insert), with
/// 1-based, inclusive-range header numbers as `diff`/`patch` tooling
/// expects.
pub fn patch_to_text(patches: &[Patch]) -> String {
    use crate::diff::delta::encode_payload;

    let mut out = String::new();
    for patch in patches {
        out.push_str(&hunk_header(patch));
        for diff in &patch.diffs {
            let tag = match diff.op {
                Op::Equal => ' ',
                Op::Delete => '-',
                Op::Insert => '+',
            };
            out.push(tag);
            out.push_str(&encode_payload(&diff.text));
            out.push('\n');
        }
    }
    out
}

fn hunk_header(patch: &Patch) -> String {
    let coords1 = header_coords(patch.start1, patch.length1);
    let coords2 = header_coords(patch.start2, patch.length2);
    format!("@@ -{coords1} +{coords2} @@\n")
}

fn header_coords(start: usize, length: usize) -> String {
    match length {
        0 => format!("{start},0"),
        1 => format!("{}", start + 1),
        n => format!("{},{n}", start + 1),
    }
}

/// Parses the text format produced by [`patch_to_text`].
///
/// Returns [`Error::Parse`] for a malformed header or body line.
pub fn patch_from_text(text: &str) -> Result<Vec<Patch>> {
    if text.is_empty() {
        return Ok(Vec::new());
    }

    let mut patches = Vec::new();
    let mut lines = text.lines().peekable();

    while let Some(line) = lines.next() {
        let (start1, length1, start2, length2) = parse_header(line)?;
        let mut patch = Patch { start1, start2, length1, length2, diffs: Vec::new() };

        while let Some(&next) = lines.peek() {
            if next.starts_with("@@") {
                break;
            }
            lines.next();
            if next.is_empty() {
                continue;
            }
            let (tag, rest) = next.split_at(1);
            let decoded = crate::diff::delta::decode_payload(rest)?;
            let diff = match tag {
                " " => Diff::equal(decoded),
                "-" => Diff::delete(decoded),
                "+" => Diff::insert(decoded),
                _ => return Err(Error::Parse(format!("unrecognized patch line {next:?}"))),
            };
            patch.diffs.push(diff);
        }
        patches.push(patch);
    }

    Ok(patches)
}

fn parse_header(line: &str) -> Result<(usize, usize, usize, usize)> {
    let body = line
        .strip_prefix("@@ -")
        .and_then(|s| s.strip_suffix(" @@"))
        .ok_or_else(|| Error::Parse(format!("malformed hunk header {line:?}")))?;
    let (left, right) = body
        .split_once(" +")
        .ok_or_else(|| Error::Parse(format!("malformed hunk header {line:?}")))?;
    let (start1, length1) = parse_coords(left, line)?;
    let (start2, length2) = parse_coords(right, line)?;
    Ok((start1, length1, start2, length2))
}

fn parse_coords(coords: &str, line: &str) -> Result<(usize, usize)> {
    let malformed = || Error::Parse(format!("malformed hunk header {line:?}"));
    match coords.split_once(',') {
        Some((start, len)) => {
            let start: usize = start.parse().map_err(|_| malformed())?;
            let len: usize = len.parse().map_err(|_| malformed())?;
            Ok((start.saturating_sub(if len == 0 { 0 } else { 1 }), len))
        }
        None => {
            let start: usize = coords.parse().map_err(|_| malformed())?;
            Ok((start.saturating_sub(1), 1))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_formats_match_unified_diff_conventions() {
        let mut patch = Patch::new(0, 0);
        patch.length1 = 3;
        patch.length2 = 3;
        assert_eq!(hunk_header(&patch), "@@ -1,3 +1,3 @@\n");

        let mut empty = Patch::new(5, 5);
        empty.length1 = 0;
        empty.length2 = 0;
        assert_eq!(hunk_header(&empty), "@@ -5,0 +5,0 @@\n");
    }

    #[test]
    fn text_round_trips() {
        let mut patch = Patch::new(0, 0);
        patch.length1 = 3;
        patch.length2 = 4;
        patch.diffs = vec![Diff::equal("ab"), Diff::insert("1"), Diff::equal("c")];

        let text = patch_to_text(std::slice::from_ref(&patch));
        let parsed = patch_from_text(&text).unwrap();
        assert_eq!(parsed, vec![patch]);
    }

    #[test]
    fn rejects_malformed_header() {
        assert!(patch_from_text("not a header\n").is_err());
    }

    #[test]
    fn embedded_newline_stays_on_one_visible_line_and_round_trips() {
        let mut patch = Patch::new(0, 0);
        patch.length1 = 5;
        patch.length2 = 6;
        patch.diffs = vec![Diff::equal("a\nb"), Diff::insert("x\ny")];

        let text = patch_to_text(std::slice::from_ref(&patch));
        assert_eq!(text.lines().count(), 3, "header + one line per diff, not one per embedded newline");

        let parsed = patch_from_text(&text).unwrap();
        assert_eq!(parsed, vec![patch]);
    }
}
