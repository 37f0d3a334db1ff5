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

//! Entity identifiers and location metadata.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::archetype::ArchetypeId;

/// Opaque 64-bit entity handle.
///
/// Ids are allocated monotonically and never reused, so a stale handle can
/// only ever resolve to "not found", never to a different entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Entity(u64);

impl Entity {
    /// Build a handle from a raw id (tests and external bookkeeping).
    pub const fn from_raw(id: u64) -> Self {
        Self(id)
    }

    /// Raw 64-bit id
    pub const fn id(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({})", self.0)
    }
}

/// Entity location: archetype, chunk and row inside that chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityLocation {
    pub archetype: ArchetypeId,
    pub chunk: usize,
    pub row: usize,
}

/// Opaque handle owned by the external sync layer (e.g. a scene object id).
///
/// The core never interprets it; it is only handed back through the
/// destruction callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExternalRef(pub u64);

/// Monotonic id source shared between a world and its command buffers.
///
/// It also hands out command sequence numbers, so commands recorded into
/// different buffers of one world can be merged back into recording order.
#[derive(Debug, Clone)]
pub struct EntityAllocator {
    next: Arc<AtomicU64>,
    sequence: Arc<AtomicU64>,
}

impl EntityAllocator {
    pub fn new() -> Self {
        // Id 0 is never handed out
        Self {
            next: Arc::new(AtomicU64::new(1)),
            sequence: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Reserve the next id
    pub fn allocate(&self) -> Entity {
        Entity(self.next.fetch_add(1, Ordering::Relaxed))
    }

    /// Number of ids handed out so far
    pub fn allocated(&self) -> u64 {
        self.next.load(Ordering::Relaxed) - 1
    }

    /// True if `entity` was handed out by this allocator
    pub fn issued(&self, entity: Entity) -> bool {
        entity.0 >= 1 && entity.0 <= self.allocated()
    }

    /// Next command sequence number
    pub(crate) fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::Relaxed)
    }

    /// True when both allocators hand out ids from the same counter
    pub fn shares_counter(&self, other: &EntityAllocator) -> bool {
        Arc::ptr_eq(&self.next, &other.next)
    }
}

impl Default for EntityAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_monotonic_and_shared() {
        let alloc = EntityAllocator::new();
        let clone = alloc.clone();

        let a = alloc.allocate();
        let b = clone.allocate();
        let c = alloc.allocate();

        assert!(a < b && b < c);
        assert_eq!(alloc.allocated(), 3);
        assert!(alloc.shares_counter(&clone));
        assert!(!alloc.shares_counter(&EntityAllocator::new()));
    }

    #[test]
    fn test_first_id_is_not_zero() {
        assert_eq!(EntityAllocator::new().allocate().id(), 1);
    }

    #[test]
    fn test_issued_covers_handed_out_ids_only() {
        let alloc = EntityAllocator::new();
        assert!(!alloc.issued(Entity::from_raw(1)));
        let entity = alloc.allocate();
        assert!(alloc.issued(entity));
        assert!(!alloc.issued(Entity::from_raw(0)));
        assert!(!alloc.issued(Entity::from_raw(2)));
    }

    #[test]
    fn test_sequence_is_shared_between_clones() {
        let alloc = EntityAllocator::new();
        let clone = alloc.clone();
        assert_eq!(alloc.next_sequence(), 0);
        assert_eq!(clone.next_sequence(), 1);
        assert_eq!(alloc.next_sequence(), 2);
    }
}
