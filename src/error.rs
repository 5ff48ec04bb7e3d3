//! Error types for the post-processing passes.
//!
//! The taxonomy is deliberately small: a pass either aborts because its
//! configuration is unusable, or because a line it must read does not parse.
//! Precondition skips and the idempotency short-circuit are normal no-op
//! outcomes, not errors (see `passes::Outcome`).

use thiserror::Error;

/// A parameter that is present on a line but whose token does not parse as a
/// number. Absence of a parameter is `Ok(None)` from the accessor, never an
/// error.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("parameter '{letter}' has unparsable value '{raw}'")]
pub struct ValueError {
    /// The parameter letter that was requested.
    pub letter: char,
    /// The raw token that failed to parse.
    pub raw: String,
}

/// Errors that abort a single pass.
///
/// A failing pass leaves the buffer untouched; the pipeline keeps running
/// subsequent passes.
#[derive(Debug, Error)]
pub enum PassError {
    /// A required setting is absent or outside its valid domain.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A line that must carry a numeric parameter does not parse. Whole-pass
    /// failure is preferred over leaving a half-written block.
    #[error("malformed input at block {block}, line {line}: {source}")]
    MalformedInput {
        block: usize,
        line: usize,
        #[source]
        source: ValueError,
    },
}

impl PassError {
    /// Attach a buffer position to an accessor failure.
    pub fn malformed(block: usize, line: usize, source: ValueError) -> Self {
        Self::MalformedInput {
            block,
            line,
            source,
        }
    }
}
