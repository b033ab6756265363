//! Quorum arithmetic.
//!
//! A candidate needs strictly more than two thirds of the ready
//! participants: `3 * votes > 2 * ready`, i.e. `votes > floor(2n/3)`.

/// Whether `votes` out of `ready` participants form a quorum.
pub fn has_quorum(votes: usize, ready: usize) -> bool {
    ready > 0 && 3 * votes > 2 * ready
}

/// Smallest vote count that forms a quorum of `ready` participants.
pub fn quorum_size(ready: usize) -> usize {
    2 * ready / 3 + 1
}
