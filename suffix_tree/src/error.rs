use thiserror::Error;

/// Failure modes of [`crate::GeneralizedSuffixTree::put`].
///
/// `Search` never fails: an absent substring is represented by an empty
/// result set, not an error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GstError {
    /// The id passed to `put` is smaller than the highest id accepted so
    /// far. The tree is left unchanged.
    #[error("id {attempted} is out of order; highest accepted id so far is {highest}")]
    OutOfOrderId { attempted: u64, highest: u64 },

    /// An internal consistency check failed during construction. This
    /// indicates a bug in the tree, not a caller error, and is not
    /// recoverable.
    #[error("suffix tree invariant violated: {0}")]
    InvariantViolation(String),
}
