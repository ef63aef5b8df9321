use thiserror::Error;

/// Failures surfaced by this crate's fallible entry points.
///
/// Two failure kinds named by the library's contract are deliberately
/// **not** variants here: a hunk that [`patch_apply`](crate::patch::patch_apply)
/// cannot relocate is reported per-hunk in the boolean vector it returns, and
/// a diff that runs past its deadline degrades locally to a trivial
/// delete+insert script. Neither condition is an error.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum Error {
    /// A delta token, patch header, or percent-escape could not be parsed.
    #[error("malformed input: {0}")]
    Parse(String),
    /// `from_delta` did not consume exactly `text1`'s length.
    #[error("delta consumed {consumed} of {expected} characters from text1")]
    LengthMismatch { consumed: usize, expected: usize },
    /// A required text argument was absent.
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
}

/// Convenience alias for this crate's `Result`.
pub type Result<T> = std::result::Result<T, Error>;
