//! VVC decoder core error types.
//!
//! The five abstract kinds mirror the failure semantics in the design: a
//! bitstream-level defect is never the same thing as a host resource
//! failure, and callers branch on the distinction (see [`ErrorConcealment`]
//! in [`crate::config`]).

use thiserror::Error;

/// Result type for VVC decoding operations.
pub type Result<T> = std::result::Result<T, VvcError>;

/// VVC decoder core errors.
#[derive(Error, Debug)]
pub enum VvcError {
    /// Syntax element out of legal range, merge list underrun, palette size
    /// overflow, transform size exceeding `max_tb_size`, IBC BV crossing a
    /// CTB row, and similar violations of the bitstream grammar.
    #[error("invalid bitstream: {0}")]
    InvalidBitstream(String),

    /// Valid syntax that this core does not implement (e.g. a profile
    /// extension outside the covered subset).
    #[error("unsupported feature: {0}")]
    UnsupportedFeature(String),

    /// A reference picture list entry points at a POC not present in the
    /// DPB and `allow_missing_ref` was not set.
    #[error("missing reference picture: poc {poc}")]
    MissingReference {
        /// POC that could not be resolved.
        poc: i64,
    },

    /// Sample or coefficient buffer allocation failed.
    #[error("out of memory: {0}")]
    OutOfMemory(String),

    /// An internal invariant was violated; this indicates a bug in the
    /// core itself, not a malformed bitstream.
    #[error("internal invariant violated: {0}")]
    Internal(String),
}

impl VvcError {
    /// True for errors that a slice driver may conceal and continue past,
    /// as opposed to [`VvcError::OutOfMemory`] / [`VvcError::Internal`]
    /// which must abort per §7.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            VvcError::InvalidBitstream(_)
                | VvcError::UnsupportedFeature(_)
                | VvcError::MissingReference { .. }
        )
    }
}
