use rand::{rngs::StdRng, seq::SliceRandom, Rng, RngCore, SeedableRng};
use std::collections::VecDeque;

/// Source of randomness for draws and reel construction.
pub trait RandomSource {
    /// Uniform index in `0..len`. `len` is never zero.
    fn pick_index(&mut self, len: usize) -> usize;

    fn shuffle<T>(&mut self, items: &mut [T])
    where
        Self: Sized;
}

#[derive(Debug, Clone)]
pub struct RngState {
    seed: u64,
    rng: StdRng,
}

impl RngState {
    pub fn from_seed(seed: u64) -> Self {
        Self {
            seed,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self::from_seed(rand::thread_rng().next_u64())
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl RandomSource for RngState {
    fn pick_index(&mut self, len: usize) -> usize {
        self.rng.gen_range(0..len)
    }

    fn shuffle<T>(&mut self, items: &mut [T]) {
        items.shuffle(&mut self.rng);
    }
}

/// Replays a fixed list of picks, then falls back to a seeded generator.
/// Shuffles are left in place so reel layouts stay predictable.
#[derive(Debug, Clone)]
pub struct ScriptedRandom {
    picks: VecDeque<usize>,
    fallback: RngState,
}

impl ScriptedRandom {
    pub fn new(picks: impl IntoIterator<Item = usize>) -> Self {
        Self {
            picks: picks.into_iter().collect(),
            fallback: RngState::from_seed(0),
        }
    }

    pub fn remaining(&self) -> usize {
        self.picks.len()
    }
}

impl RandomSource for ScriptedRandom {
    fn pick_index(&mut self, len: usize) -> usize {
        match self.picks.pop_front() {
            Some(idx) => idx.min(len - 1),
            None => self.fallback.pick_index(len),
        }
    }

    fn shuffle<T>(&mut self, _items: &mut [T]) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_state_is_reproducible() {
        let mut a = RngState::from_seed(7);
        let mut b = RngState::from_seed(7);
        let picks_a: Vec<_> = (0..16).map(|_| a.pick_index(10)).collect();
        let picks_b: Vec<_> = (0..16).map(|_| b.pick_index(10)).collect();
        assert_eq!(picks_a, picks_b);
        assert!(picks_a.iter().all(|idx| *idx < 10));
    }

    #[test]
    fn scripted_picks_clamp_then_fall_back() {
        let mut rng = ScriptedRandom::new([1, 9]);
        assert_eq!(rng.pick_index(3), 1);
        assert_eq!(rng.pick_index(3), 2);
        assert_eq!(rng.remaining(), 0);
        assert!(rng.pick_index(3) < 3);
    }
}
