//! Post-processing passes applied to a raw edit script.
//!
//! All four passes mutate the script in place. Each preserves the
//! invariant that concatenating the non-insert text yields `text1` and the
//! non-delete text yields `text2` — only `cleanup_semantic_lossless`
//! reshuffles where an `Equal`/edit boundary sits; none of them ever drop
//! characters.

use super::{Diff, Op};
use crate::diff::primitives::{common_overlap, common_prefix, common_suffix};

/// Coalesces runs of same-op edits, factors common affixes out of adjacent
/// delete/insert runs into the surrounding equalities, and shifts a single
/// edit across a flanking equality when doing so lets the equality vanish.
/// Runs until a full pass makes no further change.
pub fn cleanup_merge(diffs: &mut Vec<Diff>) {
    loop {
        let coalesced = coalesce_pass(diffs);
        let shifted = shift_edit_across_equality_pass(diffs);
        if !coalesced && !shifted {
            break;
        }
    }
    diffs.retain(|d| !d.text.is_empty());
}

fn coalesce_pass(diffs: &mut Vec<Diff>) -> bool {
    let mut changed = false;
    let mut out: Vec<Diff> = Vec::with_capacity(diffs.len());
    let mut i = 0;
    while i < diffs.len() {
        if diffs[i].op == Op::Equal {
            if let Some(last) = out.last_mut() {
                if last.op == Op::Equal {
                    last.text.push_str(&diffs[i].text);
                    changed = true;
                    i += 1;
                    continue;
                }
            }
            out.push(diffs[i].clone());
            i += 1;
            continue;
        }

        let start = i;
        let mut delete_text = String::new();
        let mut insert_text = String::new();
        while i < diffs.len() && diffs[i].op != Op::Equal {
            match diffs[i].op {
                Op::Delete => delete_text.push_str(&diffs[i].text),
                Op::Insert => insert_text.push_str(&diffs[i].text),
                Op::Equal => unreachable!(),
            }
            i += 1;
        }
        if i - start > 1 {
            changed = true;
        }

        let mut delete_chars: Vec<char> = delete_text.chars().collect();
        let mut insert_chars: Vec<char> = insert_text.chars().collect();
        if !delete_chars.is_empty() && !insert_chars.is_empty() {
            let prefix_len = common_prefix(&delete_chars, &insert_chars);
            if prefix_len > 0 {
                let prefix: String = delete_chars[..prefix_len].iter().collect();
                match out.last_mut() {
                    Some(last) if last.op == Op::Equal => last.text.push_str(&prefix),
                    _ => out.push(Diff::equal(prefix)),
                }
                delete_chars.drain(..prefix_len);
                insert_chars.drain(..prefix_len);
                changed = true;
            }
            let suffix_len = common_suffix(&delete_chars, &insert_chars);
            if suffix_len > 0 {
                let suffix: String =
                    delete_chars[delete_chars.len() - suffix_len..].iter().collect();
                delete_chars.truncate(delete_chars.len() - suffix_len);
                insert_chars.truncate(insert_chars.len() - suffix_len);
                if i < diffs.len() {
                    diffs[i].text = format!("{suffix}{}", diffs[i].text);
                } else {
                    out.push(Diff::equal(suffix));
                }
                changed = true;
            }
        }

        if !delete_chars.is_empty() {
            out.push(Diff::delete(delete_chars.into_iter().collect::<String>()));
        }
        if !insert_chars.is_empty() {
            out.push(Diff::insert(insert_chars.into_iter().collect::<String>()));
        }
    }
    *diffs = out;
    changed
}

/// A single edit flanked by two equalities can sometimes be slid over one
/// of them entirely, eliminating it — e.g. `A<ins>BA</ins>C` becomes
/// `<ins>AB</ins>AC`.
fn shift_edit_across_equality_pass(diffs: &mut Vec<Diff>) -> bool {
    let mut changed = false;
    let mut i = 1;
    while i + 1 < diffs.len() {
        if diffs[i - 1].op == Op::Equal && diffs[i + 1].op == Op::Equal {
            let prev_len = diffs[i - 1].text.chars().count();
            let edit: Vec<char> = diffs[i].text.chars().collect();
            if edit.len() >= prev_len
                && edit[edit.len() - prev_len..]
                    .iter()
                    .collect::<String>()
                    == diffs[i - 1].text
            {
                let moved = diffs[i - 1].text.clone();
                let remainder: String = edit[..edit.len() - prev_len].iter().collect();
                diffs[i].text = format!("{moved}{remainder}");
                diffs[i + 1].text = format!("{moved}{}", diffs[i + 1].text);
                diffs.remove(i - 1);
                changed = true;
                continue;
            }
            let next_len = diffs[i + 1].text.chars().count();
            if edit.len() >= next_len
                && edit[..next_len].iter().collect::<String>() == diffs[i + 1].text
            {
                let moved = diffs[i + 1].text.clone();
                let remainder: String = edit[next_len..].iter().collect();
                diffs[i - 1].text.push_str(&moved);
                diffs[i].text = format!("{remainder}{moved}");
                diffs.remove(i + 1);
                changed = true;
                continue;
            }
        }
        i += 1;
    }
    changed
}

/// Removes equalities that are semantically useless — smaller than the
/// edits flanking them on both sides — and splits out any overlap between
/// an adjacent delete/insert pair as a new equality.
pub fn cleanup_semantic(diffs: &mut Vec<Diff>) {
    let mut changed = false;
    let mut equalities: Vec<usize> = Vec::new();
    let mut last_equality: Option<String> = None;
    let (mut ins1, mut del1, mut ins2, mut del2) = (0usize, 0usize, 0usize, 0usize);
    let mut pointer = 0isize;

    while (pointer as usize) < diffs.len() {
        let idx = pointer as usize;
        if diffs[idx].op == Op::Equal {
            equalities.push(idx);
            ins1 = ins2;
            del1 = del2;
            ins2 = 0;
            del2 = 0;
            last_equality = Some(diffs[idx].text.clone());
        } else {
            if diffs[idx].op == Op::Insert {
                ins2 += diffs[idx].text.chars().count();
            } else {
                del2 += diffs[idx].text.chars().count();
            }
            if let Some(eq) = &last_equality {
                let eq_len = eq.chars().count();
                if eq_len <= ins1.max(del1) && eq_len <= ins2.max(del2) {
                    let at = *equalities.last().unwrap();
                    diffs.insert(at, Diff::delete(eq.clone()));
                    diffs[at + 1].op = Op::Insert;
                    equalities.pop();
                    equalities.pop();
                    pointer = equalities.last().map_or(-1, |&p| p as isize);
                    ins1 = 0;
                    del1 = 0;
                    ins2 = 0;
                    del2 = 0;
                    last_equality = None;
                    changed = true;
                }
            }
        }
        pointer += 1;
    }

    if changed {
        cleanup_merge(diffs);
    }

    split_overlaps(diffs);
}

fn split_overlaps(diffs: &mut Vec<Diff>) {
    let mut i = 1;
    while i < diffs.len() {
        if diffs[i - 1].op == Op::Delete && diffs[i].op == Op::Insert {
            let deletion: Vec<char> = diffs[i - 1].text.chars().collect();
            let insertion: Vec<char> = diffs[i].text.chars().collect();
            let overlap1 = common_overlap(&deletion, &insertion);
            let overlap2 = common_overlap(&insertion, &deletion);
            if overlap1 >= overlap2 {
                if overlap1 * 2 >= deletion.len() || overlap1 * 2 >= insertion.len() {
                    let eq: String = insertion[..overlap1].iter().collect();
                    diffs[i - 1].text = deletion[..deletion.len() - overlap1].iter().collect();
                    diffs[i].text = insertion[overlap1..].iter().collect();
                    diffs.insert(i, Diff::equal(eq));
                    i += 1;
                }
            } else if overlap2 * 2 >= deletion.len() || overlap2 * 2 >= insertion.len() {
                let eq: String = deletion[..overlap2].iter().collect();
                diffs[i - 1] = Diff::insert(insertion[..insertion.len() - overlap2].iter().collect::<String>());
                diffs[i] = Diff::delete(deletion[overlap2..].iter().collect::<String>());
                diffs.insert(i, Diff::equal(eq));
                i += 1;
            }
        }
        i += 1;
    }
}

/// Slides an equality flanked by two edits to the position that best aligns
/// the edit boundary to a linguistic seam (word, sentence or paragraph
/// break). Never changes the text covered on either side — only where the
/// boundary between an equality and its neighbor falls.
pub fn cleanup_semantic_lossless(diffs: &mut Vec<Diff>) {
    let mut i = 1;
    while i + 1 < diffs.len() {
        if diffs[i - 1].op == Op::Equal && diffs[i + 1].op == Op::Equal {
            let mut equality1: Vec<char> = diffs[i - 1].text.chars().collect();
            let mut edit: Vec<char> = diffs[i].text.chars().collect();
            let mut equality2: Vec<char> = diffs[i + 1].text.chars().collect();

            let common = common_suffix(&equality1, &edit);
            if common > 0 {
                let moved: Vec<char> = edit[edit.len() - common..].to_vec();
                equality1.truncate(equality1.len() - common);
                edit = [moved.clone(), edit[..edit.len() - common].to_vec()].concat();
                equality2 = [moved, equality2].concat();
            }

            let mut best = (equality1.clone(), edit.clone(), equality2.clone());
            let mut best_score = semantic_score(&best.0, &best.1) + semantic_score(&best.1, &best.2);

            while !edit.is_empty() && !equality2.is_empty() && edit[0] == equality2[0] {
                equality1.push(edit[0]);
                edit.remove(0);
                edit.push(equality2[0]);
                equality2.remove(0);
                let score = semantic_score(&equality1, &edit) + semantic_score(&edit, &equality2);
                if score >= best_score {
                    best_score = score;
                    best = (equality1.clone(), edit.clone(), equality2.clone());
                }
            }

            let (b_eq1, b_edit, b_eq2) = best;
            if b_eq1 != diffs[i - 1].text.chars().collect::<Vec<_>>() {
                if b_eq1.is_empty() {
                    diffs.remove(i - 1);
                    i -= 1;
                } else {
                    diffs[i - 1].text = b_eq1.into_iter().collect();
                }
                diffs[i].text = b_edit.into_iter().collect();
                if b_eq2.is_empty() {
                    diffs.remove(i + 1);
                } else {
                    diffs[i + 1].text = b_eq2.into_iter().collect();
                }
            }
        }
        i += 1;
    }
}

fn is_non_alphanumeric(c: char) -> bool {
    !c.is_alphanumeric()
}

fn is_linebreak(c: char) -> bool {
    c == '\n' || c == '\r'
}

fn ends_with_blank_line(s: &[char]) -> bool {
    // mirrors /\n\r?\n\z/ or /\r\n\r?\n\z/: a blank line right at the end
    let n = s.len();
    if n >= 2 && s[n - 1] == '\n' && s[n - 2] == '\n' {
        return true;
    }
    n >= 3 && s[n - 1] == '\n' && s[n - 2] == '\r' && s[n - 3] == '\n'
}

fn starts_with_blank_line(s: &[char]) -> bool {
    // mirrors /^\r?\n\r?\n/: a blank line right at the start
    if s.len() >= 2 && s[0] == '\n' && s[1] == '\n' {
        return true;
    }
    s.len() >= 3 && s[0] == '\r' && s[1] == '\n' && (s[2] == '\n')
        || s.len() >= 4 && s[0] == '\r' && s[1] == '\n' && s[2] == '\r' && s[3] == '\n'
}

/// Scores how good a linguistic seam the boundary between `one` (ending)
/// and `two` (starting) makes, from 0 (worst, mid-word) to 6 (best, the
/// edge of the document).
fn semantic_score(one: &[char], two: &[char]) -> i32 {
    if one.is_empty() || two.is_empty() {
        return 6;
    }
    let char1 = *one.last().unwrap();
    let char2 = *two.first().unwrap();
    let non_alnum1 = is_non_alphanumeric(char1);
    let non_alnum2 = is_non_alphanumeric(char2);
    let whitespace1 = non_alnum1 && char1.is_whitespace();
    let whitespace2 = non_alnum2 && char2.is_whitespace();
    let linebreak1 = whitespace1 && is_linebreak(char1);
    let linebreak2 = whitespace2 && is_linebreak(char2);
    let blank1 = linebreak1 && ends_with_blank_line(one);
    let blank2 = linebreak2 && starts_with_blank_line(two);

    if blank1 || blank2 {
        5
    } else if linebreak1 || linebreak2 {
        4
    } else if non_alnum1 && !whitespace1 && whitespace2 {
        3
    } else if whitespace1 || whitespace2 {
        2
    } else if non_alnum1 || non_alnum2 {
        1
    } else {
        0
    }
}

/// Like [`cleanup_semantic`] but measures cost in edit operations
/// (`edit_cost` per insert/delete) rather than in semantic weight: an
/// equality short enough that merging the edits flanking it would save
/// operations is removed. Re-runs [`cleanup_merge`] at the end.
pub fn cleanup_efficiency(diffs: &mut Vec<Diff>, edit_cost: i32) {
    let mut changed = false;
    let mut equalities: Vec<usize> = Vec::new();
    let mut last_equality: Option<String> = None;
    let (mut pre_ins, mut pre_del, mut post_ins, mut post_del) = (false, false, false, false);
    let mut pointer = 0isize;

    while (pointer as usize) < diffs.len() {
        let idx = pointer as usize;
        if diffs[idx].op == Op::Equal {
            let eq_len = diffs[idx].text.chars().count() as i32;
            if eq_len < edit_cost && (post_ins || post_del) {
                equalities.push(idx);
                pre_ins = post_ins;
                pre_del = post_del;
                last_equality = Some(diffs[idx].text.clone());
            } else {
                equalities.clear();
                last_equality = None;
            }
            post_ins = false;
            post_del = false;
        } else {
            if diffs[idx].op == Op::Delete {
                post_del = true;
            } else {
                post_ins = true;
            }

            let eligible = last_equality.as_ref().is_some_and(|eq| {
                let four_edit = pre_ins && pre_del && post_ins && post_del;
                let three_edit = eq.chars().count() as i32 * 2 < edit_cost
                    && [pre_ins, pre_del, post_ins, post_del].iter().filter(|b| **b).count() == 3;
                four_edit || three_edit
            });

            if eligible {
                let eq = last_equality.clone().unwrap();
                let at = *equalities.last().unwrap();
                diffs.insert(at, Diff::delete(eq));
                diffs[at + 1].op = Op::Insert;
                equalities.pop();
                last_equality = None;
                if pre_ins && pre_del {
                    post_ins = true;
                    post_del = true;
                    equalities.clear();
                } else {
                    equalities.pop();
                    last_equality = equalities.last().map(|&p| diffs[p].text.clone());
                    post_ins = false;
                    post_del = false;
                }
                changed = true;
            }
        }
        pointer += 1;
    }

    if changed {
        cleanup_merge(diffs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(op: Op, s: &str) -> Diff {
        Diff { op, text: s.to_string() }
    }

    #[test]
    fn merge_coalesces_and_factors_affixes() {
        let mut diffs = vec![d(Op::Equal, "a"), d(Op::Delete, "b"), d(Op::Insert, "bc")];
        cleanup_merge(&mut diffs);
        assert_eq!(diffs, vec![d(Op::Equal, "ab"), d(Op::Insert, "c")]);
    }

    #[test]
    fn merge_no_change_is_idempotent() {
        let mut diffs = vec![d(Op::Equal, "a"), d(Op::Delete, "b"), d(Op::Equal, "c")];
        let before = diffs.clone();
        cleanup_merge(&mut diffs);
        assert_eq!(diffs, before);
    }

    #[test]
    fn semantic_drops_trivial_equality() {
        let mut diffs = vec![
            d(Op::Delete, "abc"),
            d(Op::Equal, "1"),
            d(Op::Delete, "def"),
            d(Op::Insert, "1234567890"),
        ];
        cleanup_semantic(&mut diffs);
        assert_eq!(
            diffs,
            vec![d(Op::Delete, "abcdef"), d(Op::Insert, "1234567890")]
        );
    }

    #[test]
    fn lossless_is_length_preserving() {
        let mut diffs = vec![
            d(Op::Equal, "The c"),
            d(Op::Insert, "ow and the c"),
            d(Op::Equal, "at."),
        ];
        let text1_before = super::super::text1(&diffs);
        let text2_before = super::super::text2(&diffs);
        cleanup_semantic_lossless(&mut diffs);
        assert_eq!(super::super::text1(&diffs), text1_before);
        assert_eq!(super::super::text2(&diffs), text2_before);
    }

    #[test]
    fn efficiency_merges_around_short_equality() {
        let mut diffs = vec![
            d(Op::Delete, "ab"),
            d(Op::Insert, "12"),
            d(Op::Equal, "wxyz"),
            d(Op::Delete, "cd"),
            d(Op::Insert, "34"),
        ];
        cleanup_efficiency(&mut diffs, 4);
        assert_eq!(
            diffs,
            vec![d(Op::Delete, "abwxyzcd"), d(Op::Insert, "12wxyz34")]
        );
    }
}
