//! The compact "delta" wire format: a tab-separated sequence of `=n`
//! (equality of length `n`), `-n` (deletion of length `n`) and `+text`
//! (insertion of percent-encoded `text`) tokens.
//!
//! Only the insert payload is percent-encoded; equalities and deletions
//! carry no text of their own in the wire form; since characters above the
//! ASCII range are bytes-as-written by [`utf8_percent_encode`] this format
//! is stable across platforms, unlike one built on a language's native
//! string-escaping.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};

use super::{Diff, Op};
use crate::error::{Error, Result};

/// Bytes a delta/patch payload percent-encodes. This is the complement of
/// `encodeURI`'s unreserved set (`A-Z a-z 0-9 ; , / ? : @ & = + $ - _ . ! ~
/// * ' ( ) #`): controls, space, and the handful of punctuation bytes that
/// would otherwise be ambiguous in a tab/newline-delimited wire format
/// (`"`, `%`, and the bracket/brace/backslash/caret/backtick family).
const DELTA_ESCAPE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// Percent-encodes `text` for embedding in a delta or patch-text payload.
///
/// Space round-trips as a literal `' '` rather than `%20`, matching
/// `diff-match-patch`'s own readability trick of encoding with a strict set
/// and then unescaping just that one sequence back to a literal space;
/// decoding accepts either form (see [`decode_payload`]).
pub(crate) fn encode_payload(text: &str) -> String {
    utf8_percent_encode(text, DELTA_ESCAPE).to_string().replace("%20", " ")
}

/// Reverses [`encode_payload`], used by both the delta and patch-text
/// parsers.
///
/// Returns [`Error::Parse`] if `payload` contains a `%` not followed by two
/// hex digits, or a percent-escape sequence that doesn't decode to valid
/// UTF-8. `percent_decode_str` alone is lenient about malformed escapes (it
/// passes a bare `%` through unchanged), so malformed input is rejected
/// explicitly before decoding.
pub(crate) fn decode_payload(payload: &str) -> Result<String> {
    validate_percent_escapes(payload)?;
    percent_decode_str(payload)
        .decode_utf8()
        .map(|s| s.into_owned())
        .map_err(|_| Error::Parse(format!("invalid UTF-8 in percent-encoded payload {payload:?}")))
}

fn validate_percent_escapes(s: &str) -> Result<()> {
    let bytes = s.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let has_two_hex =
                i + 3 <= bytes.len() && bytes[i + 1].is_ascii_hexdigit() && bytes[i + 2].is_ascii_hexdigit();
            if !has_two_hex {
                return Err(Error::Parse(format!("invalid percent-escape in {s:?}")));
            }
            i += 3;
        } else {
            i += 1;
        }
    }
    Ok(())
}

/// Serializes `diffs` to the tab-separated delta format.
///
/// Only the lengths of equalities and deletions are recorded, so this
/// together with `text1` is enough to reconstruct `diffs` via
/// [`from_delta`]; the delta alone never reveals deleted text.
pub fn to_delta(diffs: &[Diff]) -> String {
    let mut tokens = Vec::with_capacity(diffs.len());
    for diff in diffs {
        let len = diff.text.chars().count();
        match diff.op {
            Op::Equal => tokens.push(format!("={len}")),
            Op::Delete => tokens.push(format!("-{len}")),
            Op::Insert => {
                tokens.push(format!("+{}", encode_payload(&diff.text)));
            }
        }
    }
    tokens.join("\t")
}

/// Reconstructs an edit script from `text1` and a delta produced by
/// [`to_delta`] against it.
///
/// Returns [`Error::LengthMismatch`] if the delta's equality/deletion
/// lengths don't add up to exactly `text1`'s length, and [`Error::Parse`]
/// for a malformed token or an invalid percent-escape.
pub fn from_delta(text1: &str, delta: &str) -> Result<Vec<Diff>> {
    let source: Vec<char> = text1.chars().collect();
    let mut pos = 0usize;
    let mut diffs = Vec::new();

    for token in delta.split('\t').filter(|t| !t.is_empty()) {
        let (tag, rest) = token.split_at(1);
        match tag {
            "+" => {
                diffs.push(Diff::insert(decode_payload(rest)?));
            }
            "=" | "-" => {
                let len: usize = rest
                    .parse()
                    .map_err(|_| Error::Parse(format!("invalid length in {token:?}")))?;
                let end = pos + len;
                if end > source.len() {
                    return Err(Error::LengthMismatch { consumed: end, expected: source.len() });
                }
                let text: String = source[pos..end].iter().collect();
                diffs.push(if tag == "=" { Diff::equal(text) } else { Diff::delete(text) });
                pos = end;
            }
            _ => return Err(Error::Parse(format!("unrecognized delta token {token:?}"))),
        }
    }

    if pos != source.len() {
        return Err(Error::LengthMismatch { consumed: pos, expected: source.len() });
    }
    Ok(diffs)
}

/// Maps a character offset into `text1` (`loc`) to the corresponding offset
/// into `text2`, walking `diffs` and accounting for the length change each
/// edit contributes.
pub fn x_index(diffs: &[Diff], loc: usize) -> usize {
    let mut chars1 = 0usize;
    let mut chars2 = 0usize;
    let mut last_chars1 = 0usize;
    let mut last_chars2 = 0usize;
    let mut straddling_delete = false;

    for diff in diffs {
        let len = diff.text.chars().count();
        if diff.op != Op::Insert {
            chars1 += len;
        }
        if diff.op != Op::Delete {
            chars2 += len;
        }
        if chars1 > loc {
            straddling_delete = diff.op == Op::Delete;
            break;
        }
        last_chars1 = chars1;
        last_chars2 = chars2;
    }

    if straddling_delete {
        return last_chars2;
    }
    last_chars2 + loc.saturating_sub(last_chars1)
}

/// Counts the number of edit characters (inserted + deleted) in `diffs`,
/// the same quantity `diff-match-patch` calls the Levenshtein distance
/// between `text1` and `text2`.
pub fn levenshtein(diffs: &[Diff]) -> usize {
    let mut distance = 0;
    let mut insertions = 0;
    let mut deletions = 0;
    for diff in diffs {
        let len = diff.text.chars().count();
        match diff.op {
            Op::Insert => insertions += len,
            Op::Delete => deletions += len,
            Op::Equal => {
                distance += insertions.max(deletions);
                insertions = 0;
                deletions = 0;
            }
        }
    }
    distance + insertions.max(deletions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delta_round_trips() {
        // spec.md S1
        let diffs = vec![Diff::equal("ab"), Diff::insert("123"), Diff::equal("c")];
        let delta = to_delta(&diffs);
        assert_eq!(delta, "=2\t+123\t=1");
        assert_eq!(from_delta("abc", &delta).unwrap(), diffs);
    }

    #[test]
    fn s2_delta_leaves_spaces_and_punctuation_literal() {
        // spec.md S2: literal space in an insert payload is not percent-encoded.
        let diffs = vec![
            Diff::equal("jump"),
            Diff::delete("s"),
            Diff::insert("ed"),
            Diff::equal(" over "),
            Diff::delete("the"),
            Diff::insert("a"),
            Diff::equal(" lazy"),
            Diff::insert("old dog"),
        ];
        let delta = to_delta(&diffs);
        assert_eq!(delta, "=4\t-1\t+ed\t=6\t-3\t+a\t=5\t+old dog");
    }

    #[test]
    fn delta_percent_encodes_reserved_bytes() {
        let diffs = vec![Diff::insert("100%\tfun \u{1}time")];
        let delta = to_delta(&diffs);
        assert!(delta.contains("%09"));
        assert!(delta.contains("%25"), "literal '%' must itself be escaped: {delta}");
        assert_eq!(from_delta("", &delta).unwrap(), diffs);
    }

    #[test]
    fn delta_rejects_invalid_percent_escape() {
        assert!(from_delta("", "+100%zz").is_err());
        assert!(from_delta("", "+100%").is_err());
        assert!(from_delta("", "+100%2").is_err());
    }

    #[test]
    fn delta_rejects_length_mismatch() {
        let err = from_delta("abc", "=4").unwrap_err();
        assert_eq!(err, Error::LengthMismatch { consumed: 4, expected: 3 });
    }

    #[test]
    fn delta_rejects_malformed_token() {
        assert!(from_delta("abc", "?2").is_err());
    }

    #[test]
    fn x_index_tracks_length_changes() {
        let diffs = vec![Diff::delete("a"), Diff::insert("1234"), Diff::equal("xyz")];
        assert_eq!(x_index(&diffs, 0), 0);
        assert_eq!(x_index(&diffs, 1), 4);
        assert_eq!(x_index(&diffs, 3), 6);
    }

    #[test]
    fn levenshtein_counts_max_of_insert_delete_per_run() {
        let diffs = vec![Diff::delete("xx"), Diff::insert("y"), Diff::equal("z")];
        assert_eq!(levenshtein(&diffs), 2);
    }
}
