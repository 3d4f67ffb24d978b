/// Advances a round-robin cursor over a pool of length `len`, resetting to
/// `0` if the previous cursor fell out of bounds (the pool shrank since the
/// last pick, e.g. an eviction). Returns `(index_to_use, next_cursor)`.
/// Callers must check `len == 0` themselves — an empty pool has no index.
pub fn next_index(len: usize, cursor: usize) -> (usize, usize) {
    debug_assert!(len > 0, "next_index called on an empty pool");
    let index = if cursor < len { cursor } else { 0 };
    (index, (index + 1) % len)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycles_through_pool() {
        let (i0, c1) = next_index(3, 0);
        let (i1, c2) = next_index(3, c1);
        let (i2, c3) = next_index(3, c2);
        assert_eq!([i0, i1, i2], [0, 1, 2]);
        assert_eq!(c3, 0);
    }

    #[test]
    fn resets_when_cursor_out_of_bounds_after_shrink() {
        let (index, next) = next_index(2, 5);
        assert_eq!(index, 0);
        assert_eq!(next, 1);
    }
}
