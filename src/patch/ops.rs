//! Building, splitting, padding and applying patches.

use std::time::Instant;

use super::Patch;
use crate::diff::cleanup::cleanup_semantic_lossless;
use crate::diff::{self, delta, recurse, Diff, Op};
use crate::matcher::match_main;
use crate::settings::Settings;

const PADDING: [char; 4] = ['\u{1}', '\u{2}', '\u{3}', '\u{4}'];

/// The three ways a caller may hand work to [`patch_make`], mirroring the
/// overloaded `patch_make(a, opt_b, opt_c)` entry point this is distilled
/// from: from two texts, from an already-computed diff, or from a source
/// text plus a diff computed against some other text.
pub enum PatchInput<'a> {
    /// Compute the diff and patch it in one step.
    Texts {
        /// The source text.
        text1: &'a str,
        /// The target text.
        text2: &'a str,
    },
    /// Patch an already-computed edit script; `text1` is recovered from it.
    Diffs(&'a [Diff]),
    /// An edit script paired with the source text it was computed against,
    /// for callers that already have both on hand.
    TextAndDiffs {
        /// The source text the diff was computed against.
        text1: &'a str,
        /// The edit script.
        diffs: &'a [Diff],
    },
}

/// Builds a list of patches from `input`, computing whichever pieces
/// (`text1`, `diffs`) the chosen [`PatchInput`] variant doesn't already
/// supply.
pub fn patch_make(input: PatchInput<'_>, settings: &Settings) -> crate::error::Result<Vec<Patch>> {
    let (text1, diffs): (String, Vec<Diff>) = match input {
        PatchInput::Texts { text1, text2 } => {
            let diffs = diff::diff_main(Some(text1), Some(text2), true, settings)?;
            (text1.to_owned(), diffs)
        }
        PatchInput::Diffs(diffs) => (diff::text1(diffs), diffs.to_vec()),
        PatchInput::TextAndDiffs { text1, diffs } => (text1.to_owned(), diffs.to_vec()),
    };

    if diffs.is_empty() {
        return Ok(Vec::new());
    }

    let text1: Vec<char> = text1.chars().collect();
    let mut patches = Vec::new();
    let mut patch = Patch::new(0, 0);
    let mut char_count1 = 0usize;
    let mut char_count2 = 0usize;
    let mut prepatch_text = text1.clone();
    let mut postpatch_text = text1.clone();

    for (i, diff) in diffs.iter().enumerate() {
        let diff_chars: Vec<char> = diff.text.chars().collect();

        if patch.diffs.is_empty() && diff.op != Op::Equal {
            patch.start1 = char_count1;
            patch.start2 = char_count2;
        }

        match diff.op {
            Op::Insert => {
                patch.length2 += diff_chars.len();
                splice(&mut postpatch_text, char_count2, 0, &diff_chars);
                patch.diffs.push(diff.clone());
            }
            Op::Delete => {
                patch.length1 += diff_chars.len();
                splice(&mut postpatch_text, char_count2, diff_chars.len(), &[]);
                patch.diffs.push(diff.clone());
            }
            Op::Equal => {
                let margin2 = 2 * settings.patch_margin;
                if diff_chars.len() <= margin2 && !patch.diffs.is_empty() && i + 1 != diffs.len() {
                    patch.length1 += diff_chars.len();
                    patch.length2 += diff_chars.len();
                    patch.diffs.push(diff.clone());
                } else if diff_chars.len() >= margin2 && !patch.diffs.is_empty() {
                    add_context(&mut patch, &prepatch_text, settings);
                    patches.push(std::mem::replace(&mut patch, Patch::new(0, 0)));
                    prepatch_text = postpatch_text.clone();
                    char_count1 = char_count2;
                }
            }
        }

        if diff.op != Op::Insert {
            char_count1 += diff_chars.len();
        }
        if diff.op != Op::Delete {
            char_count2 += diff_chars.len();
        }
    }

    if !patch.diffs.is_empty() {
        add_context(&mut patch, &prepatch_text, settings);
        patches.push(patch);
    }

    Ok(patches)
}

fn splice(v: &mut Vec<char>, at: usize, remove: usize, insert: &[char]) {
    v.splice(at..at + remove, insert.iter().copied());
}

/// Grows `patch`'s context (recorded as leading/trailing `Equal` diffs)
/// until the region it covers is unique within `text`, so applying it
/// against drifted text has a unique anchor to latch onto.
fn add_context(patch: &mut Patch, text: &[char], settings: &Settings) {
    if text.is_empty() {
        return;
    }

    let mut padding = 0usize;
    let margin = settings.patch_margin;
    let max_pattern = settings.match_max_bits as usize;

    fn slice_at(patch: &Patch, text_len: usize, pad: usize) -> (usize, usize) {
        let start = patch.start2.saturating_sub(pad);
        let end = (patch.start2 + patch.length1 + pad).min(text_len);
        (start, end)
    }

    let (mut s, mut e) = slice_at(patch, text.len(), 0);
    while count_occurrences(text, &text[s..e]) > 1 && e - s < max_pattern.saturating_sub(2 * margin) {
        padding += margin;
        let (ns, ne) = slice_at(patch, text.len(), padding);
        s = ns;
        e = ne;
    }
    padding += margin;

    let (prefix_start, _) = slice_at(patch, text.len(), padding);
    let prefix = &text[prefix_start..patch.start2];
    if !prefix.is_empty() {
        patch.diffs.insert(0, Diff::equal(prefix.iter().collect::<String>()));
    }

    let suffix_end = (patch.start2 + patch.length1 + padding).min(text.len());
    let suffix = &text[(patch.start2 + patch.length1).min(text.len())..suffix_end];
    if !suffix.is_empty() {
        patch.diffs.push(Diff::equal(suffix.iter().collect::<String>()));
    }

    patch.start1 -= prefix.len();
    patch.start2 -= prefix.len();
    patch.length1 += prefix.len() + suffix.len();
    patch.length2 += prefix.len() + suffix.len();
}

fn count_occurrences(haystack: &[char], needle: &[char]) -> usize {
    if needle.is_empty() || needle.len() > haystack.len() {
        return 0;
    }
    haystack.windows(needle.len()).filter(|w| *w == needle).count()
}

/// Splits any patch whose `length1` exceeds `settings.match_max_bits` into
/// several smaller ones, since the bitap matcher [`patch_apply`] relies on
/// can't anchor a pattern longer than that.
pub fn patch_split_max(patches: &mut Vec<Patch>, settings: &Settings) {
    let patch_size = settings.match_max_bits as usize;
    let margin = settings.patch_margin;

    let mut i = 0;
    while i < patches.len() {
        if patches[i].length1 <= patch_size {
            i += 1;
            continue;
        }
        let big = patches.remove(i);
        let mut start1 = big.start1;
        let mut start2 = big.start2;
        let mut precontext: Vec<char> = Vec::new();
        let mut remaining: std::collections::VecDeque<Diff> = big.diffs.into_iter().collect();
        let mut insert_at = i;

        while !remaining.is_empty() {
            let mut patch = Patch::new(start1.saturating_sub(precontext.len()), start2.saturating_sub(precontext.len()));
            let mut empty = true;

            if !precontext.is_empty() {
                patch.length1 = precontext.len();
                patch.length2 = precontext.len();
                patch.diffs.push(Diff::equal(precontext.iter().collect::<String>()));
            }

            while !remaining.is_empty() && patch.length1 < patch_size.saturating_sub(margin) {
                let op = remaining[0].op;
                let text_len = remaining[0].text.chars().count();

                if op == Op::Insert {
                    let d = remaining.pop_front().unwrap();
                    patch.length2 += text_len;
                    start2 += text_len;
                    patch.diffs.push(d);
                    empty = false;
                } else if op == Op::Delete
                    && patch.diffs.len() == 1
                    && patch.diffs[0].op == Op::Equal
                    && text_len > 2 * patch_size
                {
                    let d = remaining.pop_front().unwrap();
                    patch.length1 += text_len;
                    start1 += text_len;
                    empty = false;
                    patch.diffs.push(d);
                } else {
                    let take = text_len.min(patch_size.saturating_sub(patch.length1).saturating_sub(margin)).max(1);
                    let chars: Vec<char> = remaining[0].text.chars().collect();
                    let (head, tail) = chars.split_at(take.min(chars.len()));
                    let head_text: String = head.iter().collect();

                    patch.length1 += head.len();
                    start1 += head.len();
                    if op == Op::Equal {
                        patch.length2 += head.len();
                        start2 += head.len();
                    } else {
                        empty = false;
                    }
                    patch.diffs.push(Diff { op, text: head_text });

                    if tail.is_empty() {
                        remaining.pop_front();
                    } else {
                        remaining[0].text = tail.iter().collect();
                    }
                }
            }

            precontext = diff::text2(patch.diffs.as_slice()).chars().collect();
            let keep = precontext.len().saturating_sub(margin);
            precontext = precontext[keep..].to_vec();

            let remaining_vec: Vec<Diff> = remaining.iter().cloned().collect();
            let postcontext_full = diff::text1(&remaining_vec);
            let postcontext: String = postcontext_full.chars().take(margin).collect();
            if !postcontext.is_empty() {
                let n = postcontext.chars().count();
                patch.length1 += n;
                patch.length2 += n;
                if let Some(last) = patch.diffs.last_mut() {
                    if last.op == Op::Equal {
                        last.text.push_str(&postcontext);
                    } else {
                        patch.diffs.push(Diff::equal(postcontext));
                    }
                } else {
                    patch.diffs.push(Diff::equal(postcontext));
                }
            }

            if !empty {
                patches.insert(insert_at, patch);
                insert_at += 1;
            }
        }
        i = insert_at;
    }
}

/// Prepends/appends a sentinel run of non-printable characters to every
/// patch's edge context so [`patch_apply`] has something to match against
/// even at the very start/end of the target text, and returns that
/// sentinel (the caller wraps the target text in it before applying).
pub fn patch_add_padding(patches: &mut [Patch], settings: &Settings) -> String {
    let padding_len = settings.patch_margin;
    let null_padding: String = PADDING.iter().cycle().take(padding_len).collect();
    let null_padding_chars: Vec<char> = null_padding.chars().collect();

    for patch in patches.iter_mut() {
        patch.start1 += padding_len;
        patch.start2 += padding_len;
    }

    if let Some(first) = patches.first_mut() {
        if first.diffs.is_empty() || first.diffs[0].op != Op::Equal {
            first.diffs.insert(0, Diff::equal(null_padding.clone()));
            first.start1 -= padding_len;
            first.start2 -= padding_len;
            first.length1 += padding_len;
            first.length2 += padding_len;
        } else {
            let existing_len = first.diffs[0].text.chars().count();
            if padding_len > existing_len {
                let extra = padding_len - existing_len;
                let grown: String = null_padding_chars[existing_len..]
                    .iter()
                    .chain(first.diffs[0].text.chars().collect::<Vec<_>>().iter())
                    .collect();
                first.diffs[0].text = grown;
                first.start1 -= extra;
                first.start2 -= extra;
                first.length1 += extra;
                first.length2 += extra;
            }
        }
    }

    if let Some(last) = patches.last_mut() {
        let needs_new = last.diffs.is_empty() || last.diffs.last().unwrap().op != Op::Equal;
        if needs_new {
            last.diffs.push(Diff::equal(null_padding.clone()));
            last.length1 += padding_len;
            last.length2 += padding_len;
        } else {
            let last_diff = last.diffs.last_mut().unwrap();
            let existing_len = last_diff.text.chars().count();
            if padding_len > existing_len {
                let extra = padding_len - existing_len;
                last_diff.text.push_str(&null_padding_chars[..extra].iter().collect::<String>());
                last.length1 += extra;
                last.length2 += extra;
            }
        }
    }

    null_padding
}

/// Applies `patches` to `text`, returning the patched text and one success
/// flag per patch.
///
/// Each hunk is located with the fuzzy matcher against its recorded
/// position (tracking cumulative drift from prior hunks), so a patch can
/// succeed even if earlier edits shifted its target; a hunk whose
/// reconstructed context diverges from `text` by more than
/// `settings.patch_delete_threshold` is rejected rather than guessed at.
pub fn patch_apply(patches: &[Patch], text: &str, settings: &Settings) -> (String, Vec<bool>) {
    if patches.is_empty() {
        return (text.to_owned(), Vec::new());
    }

    let mut patches: Vec<Patch> = patches.to_vec();
    let null_padding = patch_add_padding(&mut patches, settings);
    patch_split_max(&mut patches, settings);

    let mut text: Vec<char> = null_padding.chars().chain(text.chars()).chain(null_padding.chars()).collect();

    let mut delta_shift: isize = 0;
    let mut results = Vec::with_capacity(patches.len());
    let max_bits = settings.match_max_bits as usize;
    let deadline = if settings.diff_timeout.is_zero() { None } else { Some(Instant::now() + settings.diff_timeout) };

    for patch in &patches {
        let expected_loc = (patch.start2 as isize + delta_shift).max(0) as usize;
        let pattern: Vec<char> = diff::text1(&patch.diffs).chars().collect();

        let (start_loc, end_loc) = if pattern.len() > max_bits {
            let head: String = pattern[..max_bits].iter().collect();
            let start = match_main(&text.iter().collect::<String>(), &head, expected_loc, settings);
            match start {
                Some(s) => {
                    let tail: String = pattern[pattern.len() - max_bits..].iter().collect();
                    let end = match_main(
                        &text.iter().collect::<String>(),
                        &tail,
                        expected_loc + pattern.len() - max_bits,
                        settings,
                    );
                    match end {
                        Some(e) if e >= s => (Some(s), Some(e)),
                        _ => (None, None),
                    }
                }
                None => (None, None),
            }
        } else {
            (match_main(&text.iter().collect::<String>(), &pattern.iter().collect::<String>(), expected_loc, settings), None)
        };

        let Some(start_loc) = start_loc else {
            results.push(false);
            delta_shift -= patch.length2 as isize - patch.length1 as isize;
            continue;
        };

        delta_shift = start_loc as isize - expected_loc as isize;

        let found_end = match end_loc {
            Some(e) => (e + max_bits).min(text.len()),
            None => (start_loc + pattern.len()).min(text.len()),
        };
        let found: Vec<char> = text[start_loc..found_end].to_vec();

        if found == pattern {
            let replacement: Vec<char> = diff::text2(&patch.diffs).chars().collect();
            splice(&mut text, start_loc, pattern.len(), &replacement);
            results.push(true);
        } else {
            let local_diffs = recurse(&pattern, &found, deadline, settings);
            let too_noisy = pattern.len() > max_bits
                && delta::levenshtein(&local_diffs) as f32 / pattern.len() as f32 > settings.patch_delete_threshold;
            if too_noisy {
                results.push(false);
                continue;
            }

            let mut local_diffs = local_diffs;
            cleanup_semantic_lossless(&mut local_diffs);

            let mut index1 = 0usize;
            for modification in &patch.diffs {
                if modification.op != Op::Equal {
                    let index2 = delta::x_index(&local_diffs, index1);
                    let mod_len = modification.text.chars().count();
                    match modification.op {
                        Op::Insert => {
                            let ins: Vec<char> = modification.text.chars().collect();
                            splice(&mut text, start_loc + index2, 0, &ins);
                        }
                        Op::Delete => {
                            let index2_end = delta::x_index(&local_diffs, index1 + mod_len);
                            let from = start_loc + index2;
                            let to = start_loc + index2_end;
                            splice(&mut text, from, to - from, &[]);
                        }
                        Op::Equal => unreachable!(),
                    }
                }
                if modification.op != Op::Delete {
                    index1 += modification.text.chars().count();
                }
            }
            results.push(true);
        }
    }

    let pad_len = null_padding.chars().count();
    let result: String = text[pad_len..text.len() - pad_len].iter().collect();
    (result, results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch::{patch_from_text, patch_to_text};

    #[test]
    fn s6_add_padding_percent_encodes_sentinels() {
        // spec.md S6: the padding sentinels (U+0001..U+0004) are control
        // characters, so the shared percent-encoding convention escapes
        // them like any other control byte.
        let settings = Settings::default();
        let mut patches = patch_make(PatchInput::Texts { text1: "", text2: "test" }, &settings).unwrap();
        patch_add_padding(&mut patches, &settings);
        let text = patch_to_text(&patches);
        assert_eq!(text, "@@ -1,8 +1,12 @@\n %01%02%03%04\n+test\n %01%02%03%04\n");
    }

    #[test]
    fn make_and_apply_round_trip() {
        // spec.md S4
        let settings = Settings::default();
        let patches = patch_make(
            PatchInput::Texts { text1: "The quick brown fox jumps over the lazy dog.", text2: "The quick brown fox jumped over a lazy dog." },
            &settings,
        )
        .unwrap();
        let (patched, results) = patch_apply(&patches, "The quick brown fox jumps over the lazy dog.", &settings);
        assert!(results.iter().all(|&ok| ok));
        assert_eq!(patched, "The quick brown fox jumped over a lazy dog.");
    }

    #[test]
    fn apply_tolerates_drifted_context() {
        // spec.md S5
        let settings = Settings::default();
        let patches = patch_make(
            PatchInput::Texts { text1: "The quick brown fox jumps over the lazy dog.", text2: "The quick brown fox jumped over a lazy dog." },
            &settings,
        )
        .unwrap();
        let drifted = "Some preamble.\n\nThe quick brown fox jumps over the lazy dog.\n\nSome epilogue.";
        let (patched, results) = patch_apply(&patches, drifted, &settings);
        assert!(results.iter().all(|&ok| ok));
        assert!(patched.contains("jumped over a lazy dog"));
    }

    #[test]
    fn split_max_breaks_up_oversized_patches() {
        let settings = Settings { match_max_bits: 8, ..Settings::default() };
        let text1 = "a".repeat(40);
        let text2 = format!("{}{}", "a".repeat(20), "bXXXXXXXXXXXXXXXXXXXXb");
        let mut patches = patch_make(PatchInput::Texts { text1: &text1, text2: &text2 }, &settings).unwrap();
        patch_split_max(&mut patches, &settings);
        assert!(patches.iter().all(|p| p.length1 <= settings.match_max_bits as usize + 2 * settings.patch_margin));
    }

    #[test]
    fn text_format_round_trips_through_apply() {
        let settings = Settings::default();
        let patches = patch_make(PatchInput::Texts { text1: "abc", text2: "abxc" }, &settings).unwrap();
        let text = patch_to_text(&patches);
        let parsed = patch_from_text(&text).unwrap();
        let (patched, _) = patch_apply(&parsed, "abc", &settings);
        assert_eq!(patched, "abxc");
    }
}
