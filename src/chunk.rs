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

//! Fixed-capacity columnar chunk
//!
//! A chunk stores up to `capacity` entities of one archetype: an entity-id
//! column plus one byte arena per component. Rows `[0, len)` are live in
//! every column at the same positions; rows past `len` are never exposed.
//!
//! Column arenas are built from 16-byte aligned blocks, so a typed view is a
//! checked `bytemuck` cast of the live byte range rather than a raw pointer
//! reinterpretation.

use std::any::TypeId;

use bytemuck::{Pod, Zeroable};
use smallvec::SmallVec;

use crate::component::{
    Component, ComponentId, ComponentInfo, ComponentRegistry, MAX_COMPONENT_ALIGN, SIGNATURE_INLINE,
};
use crate::entity::Entity;

/// Alignment unit of a column arena
#[derive(Clone, Copy)]
#[repr(C, align(16))]
struct Block([u8; MAX_COMPONENT_ALIGN]);

// SAFETY: `Block` is a plain byte array whose size equals its alignment, so it
// has no padding and every bit pattern (including all zeroes) is valid.
unsafe impl Zeroable for Block {}
unsafe impl Pod for Block {}

/// Returned by [`Chunk::push_row`] when every row is in use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkFull;

/// Type-erased component column
struct Column {
    component: ComponentId,
    type_id: TypeId,
    item_size: usize,
    data: Vec<Block>,
}

impl Column {
    fn new(info: &ComponentInfo, capacity: usize) -> Self {
        let blocks = (info.size * capacity).div_ceil(MAX_COMPONENT_ALIGN);
        Self {
            component: info.id,
            type_id: info.type_id,
            item_size: info.size,
            data: vec![Block::zeroed(); blocks],
        }
    }

    fn bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.data)
    }

    fn bytes_mut(&mut self) -> &mut [u8] {
        bytemuck::cast_slice_mut(&mut self.data)
    }

    fn row(&self, row: usize) -> &[u8] {
        let start = row * self.item_size;
        &self.bytes()[start..start + self.item_size]
    }

    fn write_row(&mut self, row: usize, src: &[u8]) {
        debug_assert_eq!(src.len(), self.item_size, "row bytes do not match column size");
        let start = row * self.item_size;
        let size = self.item_size;
        self.bytes_mut()[start..start + size].copy_from_slice(src);
    }

    fn copy_row(&mut self, from: usize, to: usize) {
        let size = self.item_size;
        self.bytes_mut()
            .copy_within(from * size..(from + 1) * size, to * size);
    }

    fn typed<T: Component>(&self, len: usize) -> &[T] {
        debug_assert_eq!(
            self.type_id,
            TypeId::of::<T>(),
            "column does not store {}",
            std::any::type_name::<T>()
        );
        bytemuck::cast_slice(&self.bytes()[..len * self.item_size])
    }

    fn typed_mut<T: Component>(&mut self, len: usize) -> &mut [T] {
        debug_assert_eq!(
            self.type_id,
            TypeId::of::<T>(),
            "column does not store {}",
            std::any::type_name::<T>()
        );
        let size = self.item_size;
        bytemuck::cast_slice_mut(&mut self.bytes_mut()[..len * size])
    }
}

/// Columnar block of one archetype's entities
pub struct Chunk {
    entities: Vec<Entity>,
    columns: SmallVec<[Column; SIGNATURE_INLINE]>,
    capacity: usize,
}

impl Chunk {
    /// Allocate a chunk for `capacity` rows of the given column layout
    pub fn new(capacity: usize, layout: &[ComponentInfo]) -> Self {
        let capacity = capacity.max(1);
        Self {
            entities: Vec::with_capacity(capacity),
            columns: layout
                .iter()
                .map(|info| Column::new(info, capacity))
                .collect(),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of live rows
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.entities.len() == self.capacity
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Component stored in a column
    pub fn column_component(&self, column: usize) -> Option<ComponentId> {
        self.columns.get(column).map(|col| col.component)
    }

    /// Column storing a component, if any
    pub fn column_of(&self, component: ComponentId) -> Option<usize> {
        self.columns.iter().position(|col| col.component == component)
    }

    pub fn entity_id(&self, row: usize) -> Option<Entity> {
        self.entities.get(row).copied()
    }

    /// Entity ids of the live rows
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// Typed view over the live rows of a column
    ///
    /// The column index must come from the owning archetype; a wrong index
    /// or type is a programmer error.
    pub fn component_slice<T: Component>(&self, column: usize) -> &[T] {
        debug_assert!(column < self.columns.len(), "column {column} out of range");
        self.columns[column].typed(self.entities.len())
    }

    /// Mutable typed view over the live rows of a column
    pub fn component_slice_mut<T: Component>(&mut self, column: usize) -> &mut [T] {
        debug_assert!(column < self.columns.len(), "column {column} out of range");
        let len = self.entities.len();
        self.columns[column].typed_mut(len)
    }

    /// Raw bytes of one live cell
    pub fn row_bytes(&self, column: usize, row: usize) -> Option<&[u8]> {
        if row >= self.len() {
            return None;
        }
        self.columns.get(column).map(|col| col.row(row))
    }

    /// Overwrite one live cell. Returns false for an out-of-range cell or a
    /// size mismatch.
    pub fn write_row_bytes(&mut self, column: usize, row: usize, bytes: &[u8]) -> bool {
        if row >= self.len() {
            return false;
        }
        match self.columns.get_mut(column) {
            Some(col) if col.item_size == bytes.len() => {
                col.write_row(row, bytes);
                true
            }
            _ => false,
        }
    }

    /// Append a row, one byte slice per column in column order
    pub fn push_row(&mut self, entity: Entity, row: &[&[u8]]) -> Result<usize, ChunkFull> {
        if self.is_full() {
            return Err(ChunkFull);
        }
        debug_assert_eq!(row.len(), self.columns.len(), "row does not cover every column");

        let index = self.entities.len();
        for (column, bytes) in self.columns.iter_mut().zip(row) {
            column.write_row(index, bytes);
        }
        self.entities.push(entity);
        Ok(index)
    }

    /// Remove `row` by moving the last live row into it
    ///
    /// Returns the entity that now occupies `row`, if any, so the caller can
    /// fix up its location.
    pub fn swap_remove_row(&mut self, row: usize) -> Option<Entity> {
        let len = self.entities.len();
        if row >= len {
            debug_assert!(row < len, "row {row} out of range (len {len})");
            return None;
        }

        let last = len - 1;
        if row != last {
            for column in &mut self.columns {
                column.copy_row(last, row);
            }
        }
        self.entities.swap_remove(row);
        self.entities.get(row).copied()
    }

    /// Move this chunk's last row over `dst_row` of `dst`
    ///
    /// Both chunks must belong to the same archetype. Returns the moved
    /// entity.
    pub fn take_last_row_into(&mut self, dst: &mut Chunk, dst_row: usize) -> Option<Entity> {
        let last = self.entities.len().checked_sub(1)?;
        if dst_row >= dst.len() {
            return None;
        }
        debug_assert_eq!(self.columns.len(), dst.columns.len(), "chunk layouts differ");

        for (src, dst_col) in self.columns.iter().zip(dst.columns.iter_mut()) {
            dst_col.write_row(dst_row, src.row(last));
        }
        let moved = self.entities.pop()?;
        dst.entities[dst_row] = moved;
        Some(moved)
    }

    /// Drop every row, keeping the allocation
    pub fn clear(&mut self) {
        self.entities.clear();
    }

    /// Split the chunk into per-column borrows for query fetches
    pub fn column_borrows(&mut self) -> ColumnBorrows<'_> {
        ColumnBorrows {
            len: self.entities.len(),
            entities: &self.entities,
            slots: self.columns.iter_mut().map(ColumnSlot::Free).collect(),
        }
    }
}

impl std::fmt::Debug for Chunk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chunk")
            .field("len", &self.len())
            .field("capacity", &self.capacity)
            .field("columns", &self.columns.len())
            .finish()
    }
}

enum ColumnSlot<'a> {
    Free(&'a mut Column),
    Shared(&'a Column),
    Taken,
}

/// Disjoint column borrows of one chunk
///
/// Each column can be handed out once mutably or any number of times
/// shared, which is what lets a query fetch `(&mut A, &B)` from the same
/// chunk without aliasing.
pub struct ColumnBorrows<'a> {
    len: usize,
    entities: &'a [Entity],
    slots: SmallVec<[ColumnSlot<'a>; SIGNATURE_INLINE]>,
}

impl<'a> ColumnBorrows<'a> {
    /// Number of live rows
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn entities(&self) -> &'a [Entity] {
        self.entities
    }

    /// Shared typed view of a column, or `None` if it was borrowed mutably
    pub fn slice<T: Component>(&mut self, column: usize) -> Option<&'a [T]> {
        let slot = self.slots.get_mut(column)?;
        let shared: &'a Column = match std::mem::replace(slot, ColumnSlot::Taken) {
            ColumnSlot::Free(col) => col,
            ColumnSlot::Shared(col) => col,
            ColumnSlot::Taken => return None,
        };
        *slot = ColumnSlot::Shared(shared);
        Some(shared.typed(self.len))
    }

    /// Mutable typed view of a column, or `None` if it was already borrowed
    pub fn slice_mut<T: Component>(&mut self, column: usize) -> Option<&'a mut [T]> {
        let slot = self.slots.get_mut(column)?;
        match std::mem::replace(slot, ColumnSlot::Taken) {
            ColumnSlot::Free(col) => Some(col.typed_mut(self.len)),
            other => {
                *slot = other;
                None
            }
        }
    }
}

/// Non-structural mutable view of a chunk
///
/// Exposes component data but not row insertion or removal, so it can be
/// handed to systems without risking the world's location index.
pub struct ChunkMut<'a> {
    chunk: &'a mut Chunk,
}

impl<'a> ChunkMut<'a> {
    pub(crate) fn new(chunk: &'a mut Chunk) -> Self {
        Self { chunk }
    }

    pub fn len(&self) -> usize {
        self.chunk.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunk.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.chunk.capacity()
    }

    pub fn entities(&self) -> &[Entity] {
        self.chunk.entities()
    }

    pub fn entity_id(&self, row: usize) -> Option<Entity> {
        self.chunk.entity_id(row)
    }

    pub fn component_column_index<T: Component>(&self) -> Option<usize> {
        self.chunk.column_of(ComponentRegistry::id_of::<T>()?)
    }

    pub fn component_slice<T: Component>(&self, column: usize) -> &[T] {
        self.chunk.component_slice(column)
    }

    pub fn component_slice_mut<T: Component>(&mut self, column: usize) -> &mut [T] {
        self.chunk.component_slice_mut(column)
    }

    /// Borrow several columns at once
    pub fn columns(&mut self) -> ColumnBorrows<'_> {
        self.chunk.column_borrows()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
    #[repr(C)]
    struct Pos {
        x: f32,
        y: f32,
    }

    #[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
    #[repr(C)]
    struct Tag(u8);

    fn layout() -> Vec<ComponentInfo> {
        let pos = ComponentRegistry::register::<Pos>();
        let tag = ComponentRegistry::register::<Tag>();
        let mut ids = [pos, tag];
        ids.sort();
        ids.iter()
            .map(|&id| ComponentRegistry::info(id).unwrap())
            .collect()
    }

    fn pos_column(layout: &[ComponentInfo]) -> usize {
        let pos = ComponentRegistry::register::<Pos>();
        layout.iter().position(|info| info.id == pos).unwrap()
    }

    fn push(chunk: &mut Chunk, layout: &[ComponentInfo], entity: u64, x: f32) -> Result<usize, ChunkFull> {
        let pos = Pos { x, y: -x };
        let tag = Tag(entity as u8);
        let pos_id = ComponentRegistry::register::<Pos>();
        let row: Vec<&[u8]> = layout
            .iter()
            .map(|info| {
                if info.id == pos_id {
                    bytemuck::bytes_of(&pos)
                } else {
                    bytemuck::bytes_of(&tag)
                }
            })
            .collect();
        chunk.push_row(Entity::from_raw(entity), &row)
    }

    #[test]
    fn test_push_until_full() {
        let layout = layout();
        let mut chunk = Chunk::new(2, &layout);
        assert_eq!(push(&mut chunk, &layout, 1, 1.0), Ok(0));
        assert_eq!(push(&mut chunk, &layout, 2, 2.0), Ok(1));
        assert_eq!(push(&mut chunk, &layout, 3, 3.0), Err(ChunkFull));
        assert!(chunk.is_full());
        assert_eq!(chunk.len(), 2);
    }

    #[test]
    fn test_swap_remove_moves_last_row() {
        let layout = layout();
        let col = pos_column(&layout);
        let mut chunk = Chunk::new(4, &layout);
        for i in 1..=3 {
            push(&mut chunk, &layout, i, i as f32).unwrap();
        }

        let moved = chunk.swap_remove_row(0);
        assert_eq!(moved, Some(Entity::from_raw(3)));
        assert_eq!(chunk.len(), 2);
        assert_eq!(chunk.component_slice::<Pos>(col)[0], Pos { x: 3.0, y: -3.0 });
        assert_eq!(chunk.entities(), &[Entity::from_raw(3), Entity::from_raw(2)]);

        // Removing the last row moves nothing
        assert_eq!(chunk.swap_remove_row(1), None);
        assert_eq!(chunk.len(), 1);
    }

    #[test]
    fn test_slices_cover_live_rows_only() {
        let layout = layout();
        let col = pos_column(&layout);
        let mut chunk = Chunk::new(8, &layout);
        push(&mut chunk, &layout, 1, 5.0).unwrap();

        assert_eq!(chunk.component_slice::<Pos>(col).len(), 1);
        chunk.component_slice_mut::<Pos>(col)[0].x = 7.0;
        assert_eq!(chunk.component_slice::<Pos>(col)[0].x, 7.0);
    }

    #[test]
    fn test_take_last_row_into_other_chunk() {
        let layout = layout();
        let col = pos_column(&layout);
        let mut first = Chunk::new(2, &layout);
        let mut second = Chunk::new(2, &layout);
        push(&mut first, &layout, 1, 1.0).unwrap();
        push(&mut first, &layout, 2, 2.0).unwrap();
        push(&mut second, &layout, 3, 3.0).unwrap();

        let moved = second.take_last_row_into(&mut first, 0);
        assert_eq!(moved, Some(Entity::from_raw(3)));
        assert!(second.is_empty());
        assert_eq!(first.entity_id(0), Some(Entity::from_raw(3)));
        assert_eq!(first.component_slice::<Pos>(col)[0].x, 3.0);
    }

    #[test]
    fn test_column_borrows_reject_aliasing() {
        let layout = layout();
        let col = pos_column(&layout);
        let mut chunk = Chunk::new(2, &layout);
        push(&mut chunk, &layout, 1, 1.0).unwrap();

        let mut borrows = chunk.column_borrows();
        assert!(borrows.slice::<Pos>(col).is_some());
        assert!(borrows.slice::<Pos>(col).is_some());
        assert!(borrows.slice_mut::<Pos>(col).is_none());
        assert_eq!(borrows.entities(), &[Entity::from_raw(1)]);
    }
}
