use crate::RandomSource;

/// Picks one element uniformly at random. An empty pool yields `None`.
pub fn draw<'a, T, R: RandomSource>(pool: &'a [T], rng: &mut R) -> Option<&'a T> {
    if pool.is_empty() {
        return None;
    }
    pool.get(rng.pick_index(pool.len()))
}
