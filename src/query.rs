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

//! Query system with archetype filtering
//!
//! A [`Query`] holds a required and an excluded component set plus a cache
//! of matching archetypes. The cache is refreshed lazily: only archetypes
//! created since the last refresh are tested, and a disposed (or different)
//! world triggers one full rescan.
//!
//! Iteration is typed through [`QueryFetch`]: `&T`, `&mut T`, [`Entity`] and
//! tuples of up to eight of them.

use smallvec::SmallVec;

#[cfg(feature = "profiling")]
use tracing::info_span;

use crate::archetype::{Archetype, ArchetypeId};
use crate::chunk::{ChunkMut, ColumnBorrows};
use crate::component::{Component, ComponentId, ComponentRegistry, Signature, SIGNATURE_INLINE};
use crate::entity::Entity;
use crate::world::{World, WorldKey};

/// Component reads and writes of one fetch
#[derive(Debug, Clone, Default)]
pub struct FetchAccess {
    pub reads: SmallVec<[ComponentId; SIGNATURE_INLINE]>,
    pub writes: SmallVec<[ComponentId; SIGNATURE_INLINE]>,
}

impl FetchAccess {
    pub fn read(&mut self, id: ComponentId) {
        self.reads.push(id);
    }

    pub fn write(&mut self, id: ComponentId) {
        self.writes.push(id);
    }

    /// First component that is written and also read or written elsewhere
    pub fn conflict(&self) -> Option<ComponentId> {
        self.writes.iter().enumerate().find_map(|(i, write)| {
            let written_twice = self.writes[i + 1..].contains(write);
            (written_twice || self.reads.contains(write)).then_some(*write)
        })
    }
}

/// Typed per-row access into matching chunks
///
/// `columns` resolves column indices once per archetype; `fetch_chunk`
/// borrows the columns of one chunk; `next` walks its rows in order.
pub trait QueryFetch {
    /// The type of data returned per row
    type Item<'w>;
    /// Row cursor over one chunk
    type Chunk<'w>;
    /// Column indices resolved for one archetype
    type Columns: Copy;

    /// Add the components every matching archetype must have
    fn required(signature: &mut Signature);

    fn access(access: &mut FetchAccess);

    fn columns(archetype: &Archetype) -> Option<Self::Columns>;

    fn fetch_chunk<'w>(
        columns: Self::Columns,
        borrows: &mut ColumnBorrows<'w>,
    ) -> Option<Self::Chunk<'w>>;

    fn next<'w>(chunk: &mut Self::Chunk<'w>) -> Option<Self::Item<'w>>;
}

impl<T: Component> QueryFetch for &T {
    type Item<'w> = &'w T;
    type Chunk<'w> = std::slice::Iter<'w, T>;
    type Columns = usize;

    fn required(signature: &mut Signature) {
        signature.insert(ComponentRegistry::register::<T>());
    }

    fn access(access: &mut FetchAccess) {
        access.read(ComponentRegistry::register::<T>());
    }

    fn columns(archetype: &Archetype) -> Option<usize> {
        archetype.component_column_index::<T>()
    }

    fn fetch_chunk<'w>(column: usize, borrows: &mut ColumnBorrows<'w>) -> Option<Self::Chunk<'w>> {
        borrows.slice::<T>(column).map(|slice| slice.iter())
    }

    fn next<'w>(chunk: &mut Self::Chunk<'w>) -> Option<&'w T> {
        chunk.next()
    }
}

impl<T: Component> QueryFetch for &mut T {
    type Item<'w> = &'w mut T;
    type Chunk<'w> = std::slice::IterMut<'w, T>;
    type Columns = usize;

    fn required(signature: &mut Signature) {
        signature.insert(ComponentRegistry::register::<T>());
    }

    fn access(access: &mut FetchAccess) {
        access.write(ComponentRegistry::register::<T>());
    }

    fn columns(archetype: &Archetype) -> Option<usize> {
        archetype.component_column_index::<T>()
    }

    fn fetch_chunk<'w>(column: usize, borrows: &mut ColumnBorrows<'w>) -> Option<Self::Chunk<'w>> {
        borrows.slice_mut::<T>(column).map(|slice| slice.iter_mut())
    }

    fn next<'w>(chunk: &mut Self::Chunk<'w>) -> Option<&'w mut T> {
        chunk.next()
    }
}

/// Entity ids, matches every archetype
impl QueryFetch for Entity {
    type Item<'w> = Entity;
    type Chunk<'w> = std::slice::Iter<'w, Entity>;
    type Columns = ();

    fn required(_signature: &mut Signature) {}

    fn access(_access: &mut FetchAccess) {}

    fn columns(_archetype: &Archetype) -> Option<()> {
        Some(())
    }

    fn fetch_chunk<'w>(_: (), borrows: &mut ColumnBorrows<'w>) -> Option<Self::Chunk<'w>> {
        Some(borrows.entities().iter())
    }

    fn next<'w>(chunk: &mut Self::Chunk<'w>) -> Option<Self::Item<'w>> {
        chunk.next().copied()
    }
}

// Tuple QueryFetch implementations
macro_rules! impl_query_fetch {
    ($($T:ident),*) => {
        #[allow(non_snake_case)]
        impl<$($T: QueryFetch),*> QueryFetch for ($($T,)*) {
            type Item<'w> = ($($T::Item<'w>,)*);
            type Chunk<'w> = ($($T::Chunk<'w>,)*);
            type Columns = ($($T::Columns,)*);

            fn required(signature: &mut Signature) {
                $($T::required(signature);)*
            }

            fn access(access: &mut FetchAccess) {
                $($T::access(access);)*
            }

            fn columns(archetype: &Archetype) -> Option<Self::Columns> {
                Some(($($T::columns(archetype)?,)*))
            }

            fn fetch_chunk<'w>(
                columns: Self::Columns,
                borrows: &mut ColumnBorrows<'w>,
            ) -> Option<Self::Chunk<'w>> {
                let ($($T,)*) = columns;
                Some(($($T::fetch_chunk($T, borrows)?,)*))
            }

            fn next<'w>(chunk: &mut Self::Chunk<'w>) -> Option<Self::Item<'w>> {
                let ($($T,)*) = chunk;
                Some(($($T::next($T)?,)*))
            }
        }
    };
}

impl_query_fetch!(A);
impl_query_fetch!(A, B);
impl_query_fetch!(A, B, C);
impl_query_fetch!(A, B, C, D);
impl_query_fetch!(A, B, C, D, E);
impl_query_fetch!(A, B, C, D, E, F);
impl_query_fetch!(A, B, C, D, E, F, G);
impl_query_fetch!(A, B, C, D, E, F, G, H);

/// Builder for [`Query`]
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    required: Signature,
    excluded: Signature,
}

impl QueryBuilder {
    /// Require component `T`
    pub fn with<T: Component>(mut self) -> Self {
        self.required.insert(ComponentRegistry::register::<T>());
        self
    }

    /// Exclude archetypes that have component `T`
    pub fn without<T: Component>(mut self) -> Self {
        self.excluded.insert(ComponentRegistry::register::<T>());
        self
    }

    /// Require every component a fetch reads or writes
    pub fn fetch<F: QueryFetch>(mut self) -> Self {
        F::required(&mut self.required);
        self
    }

    pub fn build(self) -> Query {
        Query {
            required: self.required,
            excluded: self.excluded,
            matched: Vec::new(),
            seen_archetypes: 0,
            world_key: None,
        }
    }
}

/// Cached archetype query
///
/// Hold one per system and reuse it across frames; refreshing only tests
/// archetypes created since the previous call.
#[derive(Debug, Clone)]
pub struct Query {
    required: Signature,
    excluded: Signature,
    matched: Vec<ArchetypeId>,
    /// Archetypes of the keyed world already tested
    seen_archetypes: usize,
    world_key: Option<WorldKey>,
}

impl Query {
    pub fn builder() -> QueryBuilder {
        QueryBuilder::default()
    }

    /// Query requiring exactly the components `F` fetches
    pub fn of<F: QueryFetch>() -> Self {
        Self::builder().fetch::<F>().build()
    }

    pub fn required(&self) -> &Signature {
        &self.required
    }

    pub fn excluded(&self) -> &Signature {
        &self.excluded
    }

    pub fn matches(&self, archetype: &Archetype) -> bool {
        let signature = archetype.signature();
        signature.contains_all(&self.required) && !signature.intersects(&self.excluded)
    }

    /// True if the next access will rescan some archetypes
    pub fn is_stale(&self, world: &World) -> bool {
        self.world_key != Some(world.cache_key()) || self.seen_archetypes != world.archetype_count()
    }

    /// Matching archetypes in creation order
    pub fn matching_archetypes(&mut self, world: &World) -> &[ArchetypeId] {
        self.refresh(world);
        &self.matched
    }

    fn refresh(&mut self, world: &World) {
        let key = world.cache_key();
        if self.world_key != Some(key) {
            self.matched.clear();
            self.seen_archetypes = 0;
            self.world_key = Some(key);
        }

        let archetypes = world.all_archetypes();
        if self.seen_archetypes >= archetypes.len() {
            return;
        }

        #[cfg(feature = "profiling")]
        let span = info_span!(
            "query.refresh",
            from = self.seen_archetypes,
            archetype_count = archetypes.len()
        );
        #[cfg(feature = "profiling")]
        let _span_guard = span.enter();

        for archetype in &archetypes[self.seen_archetypes..] {
            if self.matches(archetype) {
                self.matched.push(archetype.id());
            }
        }
        self.seen_archetypes = archetypes.len();
    }

    /// Number of entities in matching archetypes
    pub fn count(&mut self, world: &World) -> usize {
        self.refresh(world);
        self.matched
            .iter()
            .filter_map(|&id| world.archetype(id))
            .map(Archetype::entity_count)
            .sum()
    }

    /// Call `f` for every matching row
    ///
    /// Archetypes that lack a component `F` fetches are skipped.
    ///
    /// # Panics
    /// Panics if `F` writes a component it also reads or writes elsewhere,
    /// e.g. `(&mut A, &A)`.
    pub fn for_each<'w, F, C>(&mut self, world: &'w mut World, mut f: C)
    where
        F: QueryFetch,
        C: FnMut(F::Item<'w>),
    {
        let mut access = FetchAccess::default();
        F::access(&mut access);
        if let Some(component) = access.conflict() {
            panic!(
                "query fetch {} aliases mutable access to {}",
                std::any::type_name::<F>(),
                ComponentRegistry::name_of(component).unwrap_or("<unregistered>")
            );
        }

        self.each_matching(world, |archetype| {
            let Some(columns) = F::columns(archetype) else {
                return;
            };
            for chunk in archetype.chunks_mut() {
                let mut borrows = chunk.column_borrows();
                let Some(mut rows) = F::fetch_chunk(columns, &mut borrows) else {
                    continue;
                };
                while let Some(item) = F::next(&mut rows) {
                    f(item);
                }
            }
        });
    }

    /// Call `f` once per non-empty chunk of every matching archetype
    pub fn for_each_chunk<C>(&mut self, world: &mut World, mut f: C)
    where
        C: FnMut(ChunkMut<'_>),
    {
        self.each_matching(world, |archetype| {
            for chunk in archetype.chunks_mut() {
                f(ChunkMut::new(chunk));
            }
        });
    }

    /// Visit matching archetypes in ascending id order with disjoint borrows
    fn each_matching<'w, V>(&mut self, world: &'w mut World, mut visit: V)
    where
        V: FnMut(&'w mut Archetype),
    {
        self.refresh(world);

        let mut remaining: &'w mut [Archetype] = world.archetypes_mut();
        let mut offset = 0;
        for id in &self.matched {
            let index = id.index();
            if index < offset {
                continue;
            }
            let tail = std::mem::take(&mut remaining).split_at_mut(index - offset).1;
            let Some((archetype, rest)) = tail.split_first_mut() else {
                break;
            };
            remaining = rest;
            offset = index + 1;
            visit(archetype);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytemuck::{Pod, Zeroable};

    #[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
    #[repr(C)]
    struct A(u32);

    #[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
    #[repr(C)]
    struct B(u32);

    #[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
    #[repr(C)]
    struct C(u32);

    #[test]
    fn test_query_state_creation() {
        let world = World::new();
        let mut query = Query::of::<&A>();
        // There are no archetypes containing A yet
        assert!(query.matching_archetypes(&world).is_empty());
    }

    #[test]
    fn test_incremental_update() {
        let mut world = World::new();
        let mut query = Query::of::<&A>();
        assert_eq!(query.count(&world), 0);

        world.spawn((A(10),));
        assert!(query.is_stale(&world));
        assert_eq!(query.count(&world), 1);
        assert!(!query.is_stale(&world));

        world.spawn((A(11), B(1)));
        world.spawn((B(2),));
        assert_eq!(query.matching_archetypes(&world).len(), 2);
        assert_eq!(query.count(&world), 2);
    }

    #[test]
    fn test_query_filters() {
        let mut world = World::new();

        world.spawn((A(1), B(1)));
        world.spawn((A(2),));
        world.spawn((B(3),));

        // Query: A with B
        let mut query = Query::builder().with::<A>().with::<B>().build();
        assert_eq!(query.count(&world), 1);

        // Query: A without B
        let mut query = Query::builder().with::<A>().without::<B>().build();
        assert_eq!(query.count(&world), 1);
    }

    #[test]
    fn test_for_each_mutates_rows() {
        let mut world = World::new();
        let first = world.spawn((A(1), B(10)));
        let second = world.spawn((A(2),));

        let mut query = Query::of::<(&mut A, &B)>();
        query.for_each::<(&mut A, &B), _>(&mut world, |(a, b)| a.0 += b.0);

        assert_eq!(world.get_component::<A>(first), Some(&A(11)));
        assert_eq!(world.get_component::<A>(second), Some(&A(2)));
    }

    #[test]
    fn test_for_each_yields_entities() {
        let mut world = World::new();
        let spawned: Vec<Entity> = (0..5).map(|i| world.spawn((A(i),))).collect();
        world.spawn((B(0),));

        let mut seen = Vec::new();
        Query::of::<(Entity, &A)>().for_each::<(Entity, &A), _>(&mut world, |(entity, a)| {
            seen.push((entity, a.0));
        });

        assert_eq!(seen.len(), 5);
        for (entity, value) in seen {
            assert_eq!(world.get_component::<A>(entity), Some(&A(value)));
            assert!(spawned.contains(&entity));
        }
    }

    #[test]
    #[should_panic(expected = "aliases mutable access")]
    fn test_conflicting_access_panics() {
        let mut world = World::new();
        world.spawn((A(1),));
        Query::of::<&A>().for_each::<(&mut A, &A), _>(&mut world, |_| {});
    }

    #[test]
    fn test_rescan_after_dispose() {
        let mut world = World::new();
        world.spawn((A(1), C(1)));
        let mut query = Query::of::<&A>();
        assert_eq!(query.matching_archetypes(&world).len(), 1);

        world.dispose();
        assert!(query.is_stale(&world));
        assert!(query.matching_archetypes(&world).is_empty());

        world.spawn((A(2),));
        assert_eq!(query.count(&world), 1);
    }

    #[test]
    fn test_for_each_chunk() {
        let mut world = World::new();
        for i in 0..3 {
            world.spawn((C(i),));
        }

        let mut total = 0;
        Query::of::<&C>().for_each_chunk(&mut world, |mut chunk| {
            let column = chunk.component_column_index::<C>().unwrap();
            for c in chunk.component_slice_mut::<C>(column) {
                c.0 *= 2;
                total += c.0;
            }
        });
        assert_eq!(total, 6);
    }
}
