//! Seeded deterministic randomness for game sessions.
//!
//! Every draw of randomness in a game flows through a [`GameRng`] seeded
//! from the room's `(code, creation time)` seed. Replaying the same seed
//! and command sequence reproduces the exact same states.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

/// A deterministic PRNG for one round of one game.
pub struct GameRng(StdRng);

impl GameRng {
    pub fn from_seed(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }

    /// Derives a per-round rng so each round reshuffles differently but
    /// reproducibly.
    pub fn for_round(seed: u64, round: u32) -> Self {
        Self::from_seed(seed ^ ((round as u64) << 32 | round as u64))
    }

    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        items.shuffle(&mut self.0);
    }
}
