#![deny(missing_docs)]
//! `dmp` is a diff, fuzzy match and patch library for plain text.
//!
//! It computes a human-friendly, minimal-ish edit script between two
//! strings (Myers' `O(ND)` algorithm with a line-mode pre-pass for large
//! inputs and a wall-clock timeout so a diff never makes your application
//! appear to freeze), can locate an approximate match for a pattern inside
//! noisy text (a Bitap fuzzy search), and can build, serialize and
//! fuzzily re-apply patches built from either of those.
//!
//! # API overview
//!
//! ## Diffing
//!
//! [`diff_main`] computes an edit script — a [`Vec<Diff>`](Diff) — between
//! two strings:
//!
//! ```
//! # use dmp::{diff_main, Settings, Diff};
//! let diffs = diff_main(Some("abc"), Some("ab123c"), true, &Settings::default()).unwrap();
//! assert_eq!(diffs, vec![Diff::equal("ab"), Diff::insert("123"), Diff::equal("c")]);
//! ```
//!
//! An edit script is rough by construction; [`diff::cleanup::cleanup_semantic`]
//! and [`diff::cleanup::cleanup_efficiency`] reshape it to be easier for a
//! human to read, at the cost of it no longer being minimal. [`diff::text1`]
//! / [`diff::text2`] recover the original inputs from a script, and
//! [`diff::delta::to_delta`] / [`diff::delta::from_delta`] serialize one
//! compactly relative to `text1`.
//!
//! ## Fuzzy matching
//!
//! [`match_main`] finds the best approximate location of `pattern` in
//! `text`, near an expected offset, tolerant of the edits recorded in
//! [`Settings::match_distance`] / [`Settings::match_threshold`]:
//!
//! ```
//! # use dmp::{match_main, Settings};
//! let loc = match_main("I am the very model of a modern major general", "the very model", 10, &Settings::default());
//! assert_eq!(loc, Some(5));
//! ```
//!
//! ## Patching
//!
//! [`patch::patch_make`] builds a list of context-bearing [`patch::Patch`]
//! hunks from two texts (or a precomputed diff), [`patch::patch_to_text`] /
//! [`patch::patch_from_text`] serialize them, and [`patch::patch_apply`]
//! re-applies them against a (possibly drifted) text, fuzzily relocating
//! each hunk if the surrounding context has moved:
//!
//! ```
//! # use dmp::{Settings};
//! # use dmp::patch::{patch_make, patch_apply, PatchInput};
//! let settings = Settings::default();
//! let patches = patch_make(
//!     PatchInput::Texts { text1: "The quick brown fox jumps over the lazy dog.", text2: "The quick brown fox jumped over a lazy dog." },
//!     &settings,
//! ).unwrap();
//! let (patched, results) = patch_apply(&patches, "The quick brown fox jumps over the lazy dog.", &settings);
//! assert!(results.iter().all(|&ok| ok));
//! assert_eq!(patched, "The quick brown fox jumped over a lazy dog.");
//! ```

pub mod diff;
mod error;
pub mod matcher;
pub mod patch;
mod settings;

pub use diff::{diff_main, Diff, Op};
pub use error::{Error, Result};
pub use matcher::match_main;
pub use settings::Settings;
