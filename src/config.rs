// Copyright 2024 Saptak Santra
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! World configuration

use serde::{Deserialize, Serialize};

use crate::component::MAX_COMPONENT_SIZE;
use crate::entity::Entity;
use crate::error::{EcsError, Result};

/// Default per-chunk byte budget
pub const DEFAULT_CHUNK_BYTES: usize = 16 * 1024;

/// Storage and frame settings, fixed for the lifetime of a world
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Byte budget of one chunk; sets how many rows each chunk holds
    pub chunk_bytes: usize,
    /// Emptied chunks kept per archetype for reuse
    pub max_pooled_chunks: usize,
    /// Archetype table capacity reserved up front
    pub initial_archetype_capacity: usize,
    /// Seconds per frame used by `World::update`
    pub default_delta: f32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            chunk_bytes: DEFAULT_CHUNK_BYTES,
            max_pooled_chunks: 4,
            initial_archetype_capacity: 64,
            default_delta: 1.0 / 60.0,
        }
    }
}

impl WorldConfig {
    /// Parse a config from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: WorldConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Smallest accepted chunk budget: one maximum-size component plus its id
    pub fn min_chunk_bytes() -> usize {
        MAX_COMPONENT_SIZE + std::mem::size_of::<Entity>()
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_bytes < Self::min_chunk_bytes() {
            return Err(EcsError::InvalidConfig(format!(
                "chunk_bytes {} is below the minimum of {}",
                self.chunk_bytes,
                Self::min_chunk_bytes()
            )));
        }
        if !self.default_delta.is_finite() || self.default_delta <= 0.0 {
            return Err(EcsError::InvalidConfig(format!(
                "default_delta must be positive and finite, got {}",
                self.default_delta
            )));
        }
        Ok(())
    }
}
