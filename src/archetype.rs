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

//! Archetype storage
//!
//! An archetype owns every entity with one exact component signature,
//! spread over fixed-capacity chunks. Removal is archetype-wide
//! swap-remove, so all chunks but the last are always full.

use smallvec::SmallVec;

use crate::chunk::{Chunk, ChunkMut};
use crate::component::{
    Component, ComponentId, ComponentInfo, ComponentRegistry, ComponentValues, Signature,
    SIGNATURE_INLINE,
};
use crate::entity::Entity;

/// Stable archetype identifier (index into the World's archetype table)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ArchetypeId(u32);

impl ArchetypeId {
    pub(crate) fn new(index: usize) -> Self {
        Self(index as u32)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Entity capacity of a chunk for the given per-row component sizes
pub fn chunk_capacity_for(chunk_bytes: usize, columns: &[ComponentInfo]) -> usize {
    let row_bytes =
        std::mem::size_of::<Entity>() + columns.iter().map(|info| info.size).sum::<usize>();
    (chunk_bytes / row_bytes).max(1)
}

/// Chunked storage for one component signature
pub struct Archetype {
    id: ArchetypeId,
    signature: Signature,
    columns: SmallVec<[ComponentInfo; SIGNATURE_INLINE]>,
    chunk_capacity: usize,
    chunks: Vec<Chunk>,
    chunk_pool: Vec<Chunk>,
    max_pooled_chunks: usize,
}

impl Archetype {
    /// Create an empty archetype. No chunk is allocated until the first insert.
    pub fn new(
        id: ArchetypeId,
        signature: Signature,
        chunk_bytes: usize,
        max_pooled_chunks: usize,
    ) -> Self {
        let columns: SmallVec<[ComponentInfo; SIGNATURE_INLINE]> =
            signature.iter().filter_map(ComponentRegistry::info).collect();
        debug_assert_eq!(columns.len(), signature.len(), "signature holds unregistered ids");

        let chunk_capacity = chunk_capacity_for(chunk_bytes, &columns);
        Self {
            id,
            signature,
            columns,
            chunk_capacity,
            chunks: Vec::new(),
            chunk_pool: Vec::new(),
            max_pooled_chunks,
        }
    }

    pub fn id(&self) -> ArchetypeId {
        self.id
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Column layout, one entry per signature component
    pub fn columns(&self) -> &[ComponentInfo] {
        &self.columns
    }

    pub fn has_component<T: Component>(&self) -> bool {
        ComponentRegistry::id_of::<T>().is_some_and(|id| self.signature.contains(id))
    }

    pub fn component_column_index<T: Component>(&self) -> Option<usize> {
        self.column_index(ComponentRegistry::id_of::<T>()?)
    }

    pub fn column_index(&self, component: ComponentId) -> Option<usize> {
        self.signature.position(component)
    }

    /// Rows per chunk
    pub fn chunk_capacity(&self) -> usize {
        self.chunk_capacity
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn chunk(&self, index: usize) -> Option<&Chunk> {
        self.chunks.get(index)
    }

    pub fn chunk_mut(&mut self, index: usize) -> Option<&mut Chunk> {
        self.chunks.get_mut(index)
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub(crate) fn chunks_mut(&mut self) -> &mut [Chunk] {
        &mut self.chunks
    }

    pub fn entity_count(&self) -> usize {
        self.chunks.iter().map(Chunk::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Emptied chunks held for reuse
    pub fn pooled_chunk_count(&self) -> usize {
        self.chunk_pool.len()
    }

    /// Append an entity row
    ///
    /// Components missing from `values` (or carried with the wrong size)
    /// take their registered default. Returns `(chunk_index, row)`.
    pub fn insert(&mut self, entity: Entity, values: &ComponentValues) -> (usize, usize) {
        if self.chunks.last().map_or(true, Chunk::is_full) {
            self.open_chunk();
        }
        let chunk_index = self.chunks.len() - 1;

        let row: SmallVec<[&[u8]; SIGNATURE_INLINE]> = self
            .columns
            .iter()
            .map(|info| {
                values
                    .get_raw(info.id)
                    .filter(|bytes| bytes.len() == info.size)
                    .unwrap_or_else(|| info.default_bytes())
            })
            .collect();

        match self.chunks[chunk_index].push_row(entity, &row) {
            Ok(row) => (chunk_index, row),
            Err(_) => unreachable!("open chunk has spare capacity"),
        }
    }

    /// Remove a row by moving the archetype's last row into it
    ///
    /// Returns the entity that now occupies `(chunk_index, row)`, if any.
    /// A last chunk left empty goes back to the pool.
    pub fn remove(&mut self, chunk_index: usize, row: usize) -> Option<Entity> {
        let last = self.chunks.len().checked_sub(1)?;
        let in_range = chunk_index <= last && row < self.chunks[chunk_index].len();
        if !in_range {
            debug_assert!(in_range, "row ({chunk_index}, {row}) out of range");
            return None;
        }

        let moved = if chunk_index == last {
            self.chunks[last].swap_remove_row(row)
        } else {
            let (head, tail) = self.chunks.split_at_mut(last);
            tail[0].take_last_row_into(&mut head[chunk_index], row)
        };

        if self.chunks[last].is_empty() {
            if let Some(chunk) = self.chunks.pop() {
                self.release_chunk(chunk);
            }
        }
        moved
    }

    /// Copy out one row as a value bag
    pub fn read_row(&self, chunk_index: usize, row: usize) -> Option<ComponentValues> {
        let chunk = self.chunks.get(chunk_index)?;
        let mut values = ComponentValues::new();
        for (column, info) in self.columns.iter().enumerate() {
            values.set_raw(info.id, chunk.row_bytes(column, row)?);
        }
        Some(values)
    }

    /// Drop every row and chunk
    pub(crate) fn clear(&mut self) {
        self.chunks.clear();
        self.chunk_pool.clear();
    }

    fn open_chunk(&mut self) {
        let chunk = self
            .chunk_pool
            .pop()
            .unwrap_or_else(|| Chunk::new(self.chunk_capacity, &self.columns));
        self.chunks.push(chunk);
    }

    fn release_chunk(&mut self, mut chunk: Chunk) {
        if self.chunk_pool.len() < self.max_pooled_chunks {
            chunk.clear();
            self.chunk_pool.push(chunk);
        }
    }
}

impl std::fmt::Debug for Archetype {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Archetype")
            .field("id", &self.id)
            .field("signature", &self.signature)
            .field("entities", &self.entity_count())
            .field("chunks", &self.chunks.len())
            .finish()
    }
}

/// Non-structural mutable view of an archetype
///
/// Component data can be rewritten through it, rows cannot be added or
/// removed, so the World's location index stays valid.
pub struct ArchetypeMut<'a> {
    archetype: &'a mut Archetype,
}

impl<'a> ArchetypeMut<'a> {
    pub(crate) fn new(archetype: &'a mut Archetype) -> Self {
        Self { archetype }
    }

    pub fn id(&self) -> ArchetypeId {
        self.archetype.id
    }

    pub fn signature(&self) -> &Signature {
        &self.archetype.signature
    }

    pub fn column_index(&self, component: ComponentId) -> Option<usize> {
        self.archetype.column_index(component)
    }

    pub fn component_column_index<T: Component>(&self) -> Option<usize> {
        self.archetype.component_column_index::<T>()
    }

    pub fn chunk_count(&self) -> usize {
        self.archetype.chunk_count()
    }

    pub fn entity_count(&self) -> usize {
        self.archetype.entity_count()
    }

    pub fn chunk(&self, index: usize) -> Option<&Chunk> {
        self.archetype.chunk(index)
    }

    pub fn chunk_mut(&mut self, index: usize) -> Option<ChunkMut<'_>> {
        self.archetype.chunk_mut(index).map(ChunkMut::new)
    }

    pub fn chunks_mut(&mut self) -> impl Iterator<Item = ChunkMut<'_>> {
        self.archetype.chunks_mut().iter_mut().map(ChunkMut::new)
    }
}
