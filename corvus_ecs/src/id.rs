use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{Error, Result};
use crate::Uid;

/// How many candidates a pool draws before giving up on finding an unused id.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 16;

/// Source of random, non-zero 64-bit identifiers.
///
/// Every pool owns one. Uniqueness is checked by the pool through `next_unused`, which keeps drawing until the
/// candidate is absent from the pool's key map.
#[derive(Debug, Clone)]
pub struct UidGenerator {
    rng: StdRng,
    max_attempts: u32,
}

impl Default for UidGenerator {
    fn default() -> Self {
        UidGenerator::from_entropy()
    }
}

impl UidGenerator {
    pub fn from_entropy() -> Self {
        UidGenerator {
            rng: StdRng::from_entropy(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// A deterministic generator, mostly useful in tests.
    pub fn seeded(seed: u64) -> Self {
        UidGenerator {
            rng: StdRng::seed_from_u64(seed),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Draws the next non-zero id without any uniqueness check.
    pub fn next_id(&mut self) -> Uid {
        loop {
            let id: Uid = self.rng.gen();
            if id != 0 {
                break id;
            }
        }
    }

    /// Draws ids until `taken` rejects none of them, or fails with `IdCollision`.
    pub fn next_unused<F>(&mut self, pool: &'static str, taken: F) -> Result<Uid>
    where
        F: Fn(Uid) -> bool,
    {
        for attempt in 0..self.max_attempts {
            let id = self.next_id();
            if !taken(id) {
                return Ok(id);
            }
            log::debug!("id collision in pool `{}` (attempt {}), drawing again", pool, attempt + 1);
        }

        Err(Error::IdCollision {
            pool,
            attempts: self.max_attempts,
        })
    }
}
