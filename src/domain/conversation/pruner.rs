//! Memory pruner - keeps the history inside the context budget.
//!
//! Pruning only looks at the aggregate token counter the caller supplies;
//! it knows nothing about the cost of individual messages.

/// Smallest tail a pruned history keeps.
pub const MIN_RETAINED_MESSAGES: usize = 2;

/// True once usage exceeds half the budget.
pub fn exceeds_threshold(current_tokens: u64, max_tokens: u64) -> bool {
    // current > 0.5 * max, kept in integers
    u128::from(current_tokens) * 2 > u128::from(max_tokens)
}

/// Tail length retained when pruning a history of `len` messages:
/// `max(2, round(0.2 * len))`.
pub fn retained_len(len: usize) -> usize {
    // len / 5 never has a .5 fraction, so adding 2 before dividing rounds to nearest
    MIN_RETAINED_MESSAGES.max((len + 2) / 5)
}

/// Keeps only the newest messages when over budget, otherwise returns the
/// history untouched.
pub fn prune<T>(history: Vec<T>, current_tokens: u64, max_tokens: u64) -> Vec<T> {
    if !exceeds_threshold(current_tokens, max_tokens) {
        return history;
    }
    let keep = retained_len(history.len());
    if history.len() <= keep {
        return history;
    }
    let skip = history.len() - keep;
    history.into_iter().skip(skip).collect()
}
