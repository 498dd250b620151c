use std::io::Read;

use serde::{Deserialize, Serialize};

use corvus_ecs::id::DEFAULT_MAX_ATTEMPTS;
use corvus_ecs::pool::DEFAULT_GROWTH;
use corvus_ecs::{Error, Result, UidGenerator};

/// Tuning knobs for a `Scene` and its pools.
///
/// Every field has a default, so a config file only needs to name what it changes:
///
/// ```json
/// { "component_growth": 256, "seed": 42 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Number of slots the entity pool grows by when it runs out of room
    pub entity_growth: usize,
    /// Same for every component pool
    pub component_growth: usize,
    /// How many times a pool draws a fresh id before giving up on a collision
    pub max_id_attempts: u32,
    /// Seed for the id generators. `None` draws from the OS
    pub seed: Option<u64>,
}

impl Default for SceneConfig {
    fn default() -> Self {
        SceneConfig {
            entity_growth: DEFAULT_GROWTH,
            component_growth: DEFAULT_GROWTH,
            max_id_attempts: DEFAULT_MAX_ATTEMPTS,
            seed: None,
        }
    }
}

impl SceneConfig {
    pub fn from_json(s: &str) -> Result<Self> {
        let config: SceneConfig = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let config: SceneConfig = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.entity_growth == 0 {
            return Err(Error::Config("entity_growth must be at least 1".to_string()));
        }
        if self.component_growth == 0 {
            return Err(Error::Config("component_growth must be at least 1".to_string()));
        }
        if self.max_id_attempts == 0 {
            return Err(Error::Config("max_id_attempts must be at least 1".to_string()));
        }
        Ok(())
    }

    /// An id generator for one pool. Seeded configs give every pool its own stream, told apart by `salt`.
    pub(crate) fn generator(&self, salt: u64) -> UidGenerator {
        let ids = match self.seed {
            Some(seed) => UidGenerator::seeded(seed.wrapping_add(salt.wrapping_mul(0x9E37_79B9_7F4A_7C15))),
            None => UidGenerator::from_entropy(),
        };
        ids.with_max_attempts(self.max_id_attempts)
    }
}
