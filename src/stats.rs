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

//! World statistics snapshot

use serde::Serialize;

use crate::archetype::Archetype;
use crate::component::ComponentRegistry;
use crate::error::Result;
use crate::world::World;

/// Point-in-time summary of a world's storage
#[derive(Clone, Debug, Default, Serialize)]
pub struct WorldStats {
    pub entity_count: usize,
    pub archetype_count: usize,
    pub chunk_count: usize,
    pub pooled_chunks: usize,
    pub pending_commands: usize,
    pub system_count: usize,
    pub frame_count: u64,
    pub archetypes: Vec<ArchetypeStats>,
}

/// Per-archetype storage summary
#[derive(Clone, Debug, Serialize)]
pub struct ArchetypeStats {
    pub id: usize,
    pub components: Vec<&'static str>,
    pub entity_count: usize,
    pub chunk_count: usize,
    pub chunk_capacity: usize,
    pub pooled_chunks: usize,
}

impl ArchetypeStats {
    pub fn collect(archetype: &Archetype) -> Self {
        Self {
            id: archetype.id().index(),
            components: archetype
                .signature()
                .iter()
                .filter_map(ComponentRegistry::name_of)
                .collect(),
            entity_count: archetype.entity_count(),
            chunk_count: archetype.chunk_count(),
            chunk_capacity: archetype.chunk_capacity(),
            pooled_chunks: archetype.pooled_chunk_count(),
        }
    }
}

impl WorldStats {
    pub fn collect(world: &World) -> Self {
        let archetypes: Vec<ArchetypeStats> = world
            .all_archetypes()
            .iter()
            .map(ArchetypeStats::collect)
            .collect();

        Self {
            entity_count: world.entity_count(),
            archetype_count: archetypes.len(),
            chunk_count: archetypes.iter().map(|a| a.chunk_count).sum(),
            pooled_chunks: archetypes.iter().map(|a| a.pooled_chunks).sum(),
            pending_commands: world.pending_command_count(),
            system_count: world.system_count(),
            frame_count: world.time().frame_count(),
            archetypes,
        }
    }

    /// Pretty-printed JSON dump
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
