use std::time::Duration;

/// Tunable knobs shared by the diff, match and patch engines.
///
/// The upstream library this crate's behavior is modeled on keeps these as
/// a single process-wide mutable record. That pattern doesn't fit a
/// multi-threaded, aliasing-checked language well, so here `Settings` is an
/// explicit, `Copy` value threaded through every public call instead of a
/// global: callers who want process-wide defaults can hold one behind an
/// `Arc` (or just a `static` built from [`Settings::default`]) and pass it
/// by reference everywhere.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Settings {
    /// Wall-clock budget for [`diff_main`](crate::diff::diff_main). A diff that
    /// exceeds this deadline degrades to a trivial `{Delete, Insert}` script
    /// instead of continuing to search. `Duration::ZERO` disables the timeout.
    pub diff_timeout: Duration,
    /// Cost, in edit operations, attributed to a single insertion or deletion
    /// during [`cleanup_efficiency`](crate::diff::cleanup::cleanup_efficiency).
    pub diff_edit_cost: i32,
    /// Total input length at or below which the bisection falls back to a
    /// single-ended forward search instead of the dual-ended one.
    pub diff_dual_threshold: usize,
    /// Highest score (0 = perfect, 1 = worst) the Bitap matcher will accept
    /// as a match.
    pub match_threshold: f32,
    /// How far (in characters) a match may drift from the expected location
    /// before the distance penalty dominates the score.
    pub match_distance: i32,
    /// Longest pattern the Bitap matcher can search for; bounded by the
    /// bitmask word width.
    pub match_max_bits: u32,
    /// Characters of unchanged context kept on each side of a patch hunk.
    pub patch_margin: usize,
    /// Fraction of a relocated hunk's length that may differ (by Levenshtein
    /// distance) from its recorded `text1` before the hunk is abandoned in
    /// favor of a literal splice.
    pub patch_delete_threshold: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            diff_timeout: Duration::from_millis(1000),
            diff_edit_cost: 4,
            diff_dual_threshold: 32,
            match_threshold: 0.5,
            match_distance: 1000,
            match_max_bits: 32,
            patch_margin: 4,
            patch_delete_threshold: 0.5,
        }
    }
}
