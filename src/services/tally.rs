//! Vote arithmetic. Counts always come from the recorded votes; nothing here
//! is stored.

/// Sum of the per-option counts.
pub fn total(counts: impl IntoIterator<Item = i64>) -> i64 {
    counts.into_iter().sum()
}

/// Share of `total` held by `votes`, as a whole percent rounded half up.
///
/// Integer arithmetic keeps exact halves (1 of 8 votes = 12.5%) from being
/// misrounded by float representation. Returns 0 when nobody has voted.
pub fn percentage(votes: i64, total: i64) -> i64 {
    if total <= 0 {
        return 0;
    }
    (votes * 200 + total) / (total * 2)
}

/// Whole-number mean, rounded half up, 0 for an empty set.
pub fn average(sum: i64, count: i64) -> i64 {
    percentage(sum, count * 100)
}
