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

//! World: central entity and archetype storage

use std::sync::atomic::{AtomicU64, Ordering};

use ahash::AHashMap;
use tracing::{debug, trace, warn};

#[cfg(feature = "profiling")]
use tracing::info_span;

use crate::archetype::{Archetype, ArchetypeId, ArchetypeMut};
use crate::command::{Command, CommandBuffer};
use crate::component::{
    Bundle, Component, ComponentId, ComponentRegistry, ComponentValues, Signature,
};
use crate::config::WorldConfig;
use crate::entity::{Entity, EntityAllocator, EntityLocation, ExternalRef};
use crate::error::{EcsError, Result};
use crate::query::{Query, QueryFetch};
use crate::schedule::Scheduler;
use crate::stats::{ArchetypeStats, WorldStats};
use crate::system::{BoxedSystem, System, SystemId};
use crate::time::Time;

/// Called for every destroyed entity while its row is still readable
pub type EntityDestroyedCallback = Box<dyn FnMut(&World, Entity, Option<ExternalRef>) + Send>;

/// Called once for every newly created archetype
pub type ArchetypeCreatedCallback = Box<dyn FnMut(&Archetype) + Send>;

static NEXT_WORLD_ID: AtomicU64 = AtomicU64::new(1);

/// Identifies one world and one storage lifetime of it; changes on dispose
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct WorldKey {
    world: u64,
    epoch: u64,
}

/// Outcome of one [`World::flush_deferred`] call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    pub created: usize,
    pub destroyed: usize,
    pub modified: usize,
    pub custom: usize,
    /// Commands that targeted missing entities or components
    pub skipped: usize,
}

impl FlushReport {
    pub fn applied(&self) -> usize {
        self.created + self.destroyed + self.modified + self.custom
    }
}

/// Central ECS world
///
/// Owns the archetypes, the entity location index, the pending command
/// queue and the system scheduler.
pub struct World {
    id: u64,
    epoch: u64,
    config: WorldConfig,

    allocator: EntityAllocator,

    /// Current location of every live entity
    locations: AHashMap<Entity, EntityLocation>,

    external_refs: AHashMap<Entity, ExternalRef>,

    /// All archetypes, indexed by `ArchetypeId`
    archetypes: Vec<Archetype>,

    /// Maps component signatures to archetypes
    archetype_index: AHashMap<Signature, ArchetypeId>,

    /// Cache for archetype transitions when adding/removing components
    transitions: AHashMap<(ArchetypeId, ComponentId, bool), ArchetypeId>,

    /// Bumped on every archetype creation, never reset
    archetype_generation: u64,

    pending: CommandBuffer,
    flushing: bool,
    dispose_requested: bool,

    on_entity_destroyed: Option<EntityDestroyedCallback>,
    on_archetype_created: Option<ArchetypeCreatedCallback>,

    scheduler: Scheduler,
    next_system_id: u32,
    system_count: usize,
    updating: bool,
    time: Time,
}

impl World {
    /// Create a new, empty world with the default config
    pub fn new() -> Self {
        Self::build(WorldConfig::default())
    }

    /// Create a world with a validated config
    pub fn with_config(config: WorldConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: WorldConfig) -> Self {
        let allocator = EntityAllocator::new();
        Self {
            id: NEXT_WORLD_ID.fetch_add(1, Ordering::Relaxed),
            epoch: 0,
            locations: AHashMap::new(),
            external_refs: AHashMap::new(),
            archetypes: Vec::with_capacity(config.initial_archetype_capacity),
            archetype_index: AHashMap::with_capacity(config.initial_archetype_capacity),
            transitions: AHashMap::with_capacity(config.initial_archetype_capacity * 2),
            archetype_generation: 0,
            pending: CommandBuffer::new(allocator.clone()),
            allocator,
            flushing: false,
            dispose_requested: false,
            on_entity_destroyed: None,
            on_archetype_created: None,
            scheduler: Scheduler::new(),
            next_system_id: 0,
            system_count: 0,
            updating: false,
            time: Time::new(),
            config,
        }
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    pub(crate) fn cache_key(&self) -> WorldKey {
        WorldKey {
            world: self.id,
            epoch: self.epoch,
        }
    }

    // ---------------------------------------------------------------------
    // Entity creation
    // ---------------------------------------------------------------------

    /// Create an entity whose components all take their default value
    ///
    /// While a flush is running the creation is queued for the next flush;
    /// the returned id becomes alive then.
    pub fn create_entity(&mut self, signature: &Signature) -> Entity {
        if self.flushing {
            let mut values = ComponentValues::new();
            for info in signature.iter().filter_map(ComponentRegistry::info) {
                values.set_raw(info.id, info.default_bytes());
            }
            return self.pending.create(values);
        }
        let entity = self.allocator.allocate();
        self.insert_entity(entity, signature, &ComponentValues::new());
        entity
    }

    /// Create an entity from a value bag; its archetype is the bag's signature
    pub fn create_entity_with(&mut self, values: ComponentValues) -> Entity {
        if self.flushing {
            return self.pending.create(values);
        }
        let entity = self.allocator.allocate();
        self.insert_entity(entity, &values.signature(), &values);
        entity
    }

    /// Spawn entity with components
    pub fn spawn<B: Bundle>(&mut self, bundle: B) -> Entity {
        self.create_entity_with(ComponentValues::from_bundle(bundle))
    }

    fn insert_entity(&mut self, entity: Entity, signature: &Signature, values: &ComponentValues) {
        #[cfg(feature = "profiling")]
        let span = info_span!(
            "world.spawn",
            components = signature.len(),
            archetype_count = self.archetypes.len()
        );
        #[cfg(feature = "profiling")]
        let _span_guard = span.enter();

        let archetype_id = self.get_or_create_archetype(signature);
        let (chunk, row) = self.archetypes[archetype_id.index()].insert(entity, values);
        self.locations.insert(
            entity,
            EntityLocation {
                archetype: archetype_id,
                chunk,
                row,
            },
        );
    }

    // ---------------------------------------------------------------------
    // Component access
    // ---------------------------------------------------------------------

    /// Check if an entity is alive
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.locations.contains_key(&entity)
    }

    pub fn entity_location(&self, entity: Entity) -> Option<EntityLocation> {
        self.locations.get(&entity).copied()
    }

    pub fn get_component<T: Component>(&self, entity: Entity) -> Option<&T> {
        let location = self.locations.get(&entity)?;
        let archetype = self.archetypes.get(location.archetype.index())?;
        let column = archetype.component_column_index::<T>()?;
        archetype
            .chunk(location.chunk)?
            .component_slice::<T>(column)
            .get(location.row)
    }

    pub fn get_component_mut<T: Component>(&mut self, entity: Entity) -> Option<&mut T> {
        let location = *self.locations.get(&entity)?;
        let archetype = self.archetypes.get_mut(location.archetype.index())?;
        let column = archetype.component_column_index::<T>()?;
        archetype
            .chunk_mut(location.chunk)?
            .component_slice_mut::<T>(column)
            .get_mut(location.row)
    }

    pub fn has_component<T: Component>(&self, entity: Entity) -> bool {
        self.locations
            .get(&entity)
            .and_then(|location| self.archetypes.get(location.archetype.index()))
            .is_some_and(Archetype::has_component::<T>)
    }

    /// Overwrite a component in place
    ///
    /// Returns false (and logs) when the entity is gone or its archetype
    /// does not store `T`; no structural change is made.
    pub fn set_component<T: Component>(&mut self, entity: Entity, value: T) -> bool {
        if let Some(slot) = self.get_component_mut::<T>(entity) {
            *slot = value;
            return true;
        }
        warn!(
            entity = %entity,
            component = std::any::type_name::<T>(),
            alive = self.is_alive(entity),
            "set_component ignored: component not present"
        );
        false
    }

    pub fn set_external_ref(&mut self, entity: Entity, external: ExternalRef) -> bool {
        if !self.is_alive(entity) {
            return false;
        }
        self.external_refs.insert(entity, external);
        true
    }

    pub fn external_ref(&self, entity: Entity) -> Option<ExternalRef> {
        self.external_refs.get(&entity).copied()
    }

    // ---------------------------------------------------------------------
    // Archetype transitions
    // ---------------------------------------------------------------------

    /// Add a component to an entity
    ///
    /// Overwrites in place if the entity already has `T`, otherwise moves the
    /// entity to the archetype with `T` added. During a flush the change is
    /// queued for the next flush instead.
    pub fn add_component<T: Component>(&mut self, entity: Entity, component: T) -> Result<()> {
        if self.flushing {
            self.pending.add_component(entity, component);
            return Ok(());
        }
        self.add_values(entity, &ComponentValues::new().with(component))
    }

    /// Remove a component from an entity, moving it to the narrower archetype
    ///
    /// Queued for the next flush when called during a flush.
    pub fn remove_component<T: Component>(&mut self, entity: Entity) -> Result<()> {
        if self.flushing {
            self.pending.remove_component::<T>(entity);
            return Ok(());
        }
        let location = self.location_of(entity)?;
        let component = ComponentRegistry::id_of::<T>()
            .filter(|&id| {
                self.archetypes[location.archetype.index()]
                    .signature()
                    .contains(id)
            })
            .ok_or(EcsError::ComponentNotFound {
                entity,
                component: std::any::type_name::<T>(),
            })?;
        self.remove_component_id(entity, component)
    }

    fn location_of(&self, entity: Entity) -> Result<EntityLocation> {
        self.entity_location(entity)
            .ok_or(EcsError::EntityNotFound(entity))
    }

    pub(crate) fn add_values(&mut self, entity: Entity, values: &ComponentValues) -> Result<()> {
        let location = self.location_of(entity)?;
        let source = location.archetype;

        let mut target = source;
        for component in values.signature().iter() {
            target = self.transition(target, component, true);
        }

        if target == source {
            self.write_in_place(location, values);
            return Ok(());
        }

        let mut row = self.archetypes[source.index()]
            .read_row(location.chunk, location.row)
            .ok_or(EcsError::EntityNotFound(entity))?;
        for component in values.signature().iter() {
            if let Some(bytes) = values.get_raw(component) {
                row.set_raw(component, bytes);
            }
        }
        self.relocate(entity, location, target, &row);
        Ok(())
    }

    pub(crate) fn remove_component_id(&mut self, entity: Entity, component: ComponentId) -> Result<()> {
        let location = self.location_of(entity)?;
        let source = location.archetype;
        if !self.archetypes[source.index()].signature().contains(component) {
            return Err(EcsError::ComponentNotFound {
                entity,
                component: ComponentRegistry::name_of(component).unwrap_or("<unregistered>"),
            });
        }

        let target = self.transition(source, component, false);
        let mut row = self.archetypes[source.index()]
            .read_row(location.chunk, location.row)
            .ok_or(EcsError::EntityNotFound(entity))?;
        row.remove(component);
        self.relocate(entity, location, target, &row);
        Ok(())
    }

    /// Archetype reached from `from` by adding or removing one component
    fn transition(&mut self, from: ArchetypeId, component: ComponentId, add: bool) -> ArchetypeId {
        if let Some(&to) = self.transitions.get(&(from, component, add)) {
            return to;
        }

        let mut signature = self.archetypes[from.index()].signature().clone();
        if add {
            signature.insert(component);
        } else {
            signature.remove(component);
        }
        let to = self.get_or_create_archetype(&signature);
        self.transitions.insert((from, component, add), to);
        to
    }

    /// Insert the entity into `target` first, then drop its old row
    fn relocate(
        &mut self,
        entity: Entity,
        old: EntityLocation,
        target: ArchetypeId,
        values: &ComponentValues,
    ) {
        let (chunk, row) = self.archetypes[target.index()].insert(entity, values);
        self.remove_row(old);
        self.locations.insert(
            entity,
            EntityLocation {
                archetype: target,
                chunk,
                row,
            },
        );
    }

    /// Remove a row and repoint the entity that was moved into it
    fn remove_row(&mut self, location: EntityLocation) {
        let archetype = &mut self.archetypes[location.archetype.index()];
        if let Some(moved) = archetype.remove(location.chunk, location.row) {
            if let Some(moved_location) = self.locations.get_mut(&moved) {
                moved_location.chunk = location.chunk;
                moved_location.row = location.row;
            }
        }
    }

    fn write_in_place(&mut self, location: EntityLocation, values: &ComponentValues) -> usize {
        let archetype = &mut self.archetypes[location.archetype.index()];
        let mut written = 0;
        for component in values.signature().iter() {
            let (Some(column), Some(bytes)) = (archetype.column_index(component), values.get_raw(component)) else {
                continue;
            };
            if let Some(chunk) = archetype.chunk_mut(location.chunk) {
                if chunk.write_row_bytes(column, location.row, bytes) {
                    written += 1;
                }
            }
        }
        written
    }

    // ---------------------------------------------------------------------
    // Deferred commands
    // ---------------------------------------------------------------------

    /// Queue an entity for destruction at the next flush
    ///
    /// The entity stays fully readable until then. Queuing it twice is
    /// harmless: the second destroy is skipped.
    pub fn destroy_entity_deferred(&mut self, entity: Entity) {
        self.pending.destroy(entity);
    }

    /// Detached command buffer that allocates ids from this world
    pub fn command_buffer(&self) -> CommandBuffer {
        CommandBuffer::new(self.allocator.clone())
    }

    /// Append a command buffer to the pending queue
    ///
    /// A buffer created by another world is dropped and reported: its
    /// entity ids come from a different counter and would collide with ours.
    pub fn submit(&mut self, mut buffer: CommandBuffer) -> Result<()> {
        if !buffer.allocator().shares_counter(&self.allocator) {
            warn!(
                commands = buffer.len(),
                "rejected command buffer created by another world"
            );
            return Err(EcsError::CommandError(format!(
                "command buffer with {} commands belongs to another world",
                buffer.len()
            )));
        }
        self.pending.append(&mut buffer);
        Ok(())
    }

    pub fn pending_command_count(&self) -> usize {
        self.pending.len()
    }

    /// Apply every pending command in recorded order
    ///
    /// A failing custom command does not stop the flush; the first error is
    /// returned once every command has been applied. Commands recorded while
    /// flushing are left for the next flush.
    pub fn flush_deferred(&mut self) -> Result<FlushReport> {
        if self.flushing {
            return Err(EcsError::ReentrantFlush);
        }

        let commands = self.pending.take_commands();
        let mut report = FlushReport::default();
        if commands.is_empty() {
            return Ok(report);
        }

        #[cfg(feature = "profiling")]
        let span = info_span!("world.flush_deferred", queued = commands.len());
        #[cfg(feature = "profiling")]
        let _span_guard = span.enter();

        self.flushing = true;
        let mut first_error = None;
        for command in commands {
            if let Err(err) = self.apply_command(command, &mut report) {
                warn!(error = %err, "deferred command failed");
                first_error.get_or_insert(err);
            }
        }
        self.flushing = false;

        debug!(
            created = report.created,
            destroyed = report.destroyed,
            modified = report.modified,
            custom = report.custom,
            skipped = report.skipped,
            "flushed deferred commands"
        );

        match first_error {
            Some(err) => Err(err),
            None => Ok(report),
        }
    }

    fn apply_command(&mut self, command: Command, report: &mut FlushReport) -> Result<()> {
        trace!(?command, "applying command");
        match command {
            Command::Create { entity, values } => {
                if !self.allocator.issued(entity) {
                    return Err(EcsError::CommandError(format!(
                        "{entity} was not allocated by this world"
                    )));
                }
                if self.is_alive(entity) {
                    report.skipped += 1;
                } else {
                    self.insert_entity(entity, &values.signature(), &values);
                    report.created += 1;
                }
            }
            Command::Destroy(entity) => {
                if self.despawn_now(entity) {
                    report.destroyed += 1;
                } else {
                    report.skipped += 1;
                }
            }
            Command::AddComponent { entity, values } => {
                match self.add_values(entity, &values) {
                    Ok(()) => report.modified += 1,
                    Err(err) => {
                        warn!(entity = %entity, error = %err, "add_component command skipped");
                        report.skipped += 1;
                    }
                }
            }
            Command::RemoveComponent { entity, component } => {
                match self.remove_component_id(entity, component) {
                    Ok(()) => report.modified += 1,
                    Err(err) => {
                        warn!(entity = %entity, error = %err, "remove_component command skipped");
                        report.skipped += 1;
                    }
                }
            }
            Command::SetComponent { entity, values } => {
                let written = self
                    .entity_location(entity)
                    .map(|location| self.write_in_place(location, &values));
                if written == Some(values.len()) {
                    report.modified += 1;
                } else {
                    warn!(
                        entity = %entity,
                        alive = written.is_some(),
                        "set_component command skipped: component not present"
                    );
                    report.skipped += 1;
                }
            }
            Command::Custom(f) => {
                report.custom += 1;
                f(self)?;
            }
        }
        Ok(())
    }

    /// Destroy an entity immediately, firing the destroy callback first
    ///
    /// Returns false if the entity was already gone.
    pub(crate) fn despawn_now(&mut self, entity: Entity) -> bool {
        if !self.is_alive(entity) {
            trace!(entity = %entity, "destroy skipped: entity already gone");
            return false;
        }

        let external = self.external_ref(entity);
        if let Some(mut callback) = self.on_entity_destroyed.take() {
            callback(&*self, entity, external);
            self.on_entity_destroyed = Some(callback);
        }

        let Some(location) = self.locations.remove(&entity) else {
            return false;
        };
        self.external_refs.remove(&entity);
        self.remove_row(location);
        true
    }

    // ---------------------------------------------------------------------
    // Observability hooks
    // ---------------------------------------------------------------------

    pub fn set_on_entity_destroyed<F>(&mut self, callback: F)
    where
        F: FnMut(&World, Entity, Option<ExternalRef>) + Send + 'static,
    {
        self.on_entity_destroyed = Some(Box::new(callback));
    }

    pub fn set_on_archetype_created<F>(&mut self, callback: F)
    where
        F: FnMut(&Archetype) + Send + 'static,
    {
        self.on_archetype_created = Some(Box::new(callback));
    }

    // ---------------------------------------------------------------------
    // Archetypes
    // ---------------------------------------------------------------------

    /// Get or create the archetype for a signature
    fn get_or_create_archetype(&mut self, signature: &Signature) -> ArchetypeId {
        if let Some(&id) = self.archetype_index.get(signature) {
            return id;
        }

        let id = ArchetypeId::new(self.archetypes.len());
        let archetype = Archetype::new(
            id,
            signature.clone(),
            self.config.chunk_bytes,
            self.config.max_pooled_chunks,
        );
        debug!(
            archetype = id.index(),
            components = signature.len(),
            chunk_capacity = archetype.chunk_capacity(),
            "created archetype"
        );

        self.archetypes.push(archetype);
        self.archetype_index.insert(signature.clone(), id);
        self.archetype_generation += 1;

        if let Some(callback) = self.on_archetype_created.as_mut() {
            callback(&self.archetypes[id.index()]);
        }
        id
    }

    pub fn all_archetypes(&self) -> &[Archetype] {
        &self.archetypes
    }

    pub(crate) fn archetypes_mut(&mut self) -> &mut [Archetype] {
        &mut self.archetypes
    }

    pub fn archetype(&self, id: ArchetypeId) -> Option<&Archetype> {
        self.archetypes.get(id.index())
    }

    /// Raw mutable access to one archetype's component data
    pub fn archetype_mut(&mut self, id: ArchetypeId) -> Option<ArchetypeMut<'_>> {
        self.archetypes.get_mut(id.index()).map(ArchetypeMut::new)
    }

    /// Archetype with exactly this signature, if it exists
    pub fn find_archetype(&self, signature: &Signature) -> Option<ArchetypeId> {
        self.archetype_index.get(signature).copied()
    }

    pub fn archetype_count(&self) -> usize {
        self.archetypes.len()
    }

    /// Increases every time an archetype is created
    pub fn archetype_generation(&self) -> u64 {
        self.archetype_generation
    }

    pub fn entity_count(&self) -> usize {
        self.locations.len()
    }

    /// Query for `F` with its archetype cache already filled from this world
    pub fn query<F: QueryFetch>(&self) -> Query {
        let mut query = Query::of::<F>();
        query.matching_archetypes(self);
        query
    }

    pub fn stats(&self) -> WorldStats {
        WorldStats::collect(self)
    }

    /// Storage summary of one archetype
    pub fn archetype_stats(&self, id: ArchetypeId) -> Result<ArchetypeStats> {
        self.archetype(id)
            .map(ArchetypeStats::collect)
            .ok_or(EcsError::ArchetypeNotFound(id))
    }

    // ---------------------------------------------------------------------
    // Systems and frames
    // ---------------------------------------------------------------------

    /// Register a system; its `on_create` runs immediately
    ///
    /// Systems added during an update run from the next frame.
    pub fn add_system<S: System + 'static>(&mut self, system: S) -> SystemId {
        self.add_boxed_system(Box::new(system))
    }

    pub fn add_boxed_system(&mut self, mut system: BoxedSystem) -> SystemId {
        let id = SystemId(self.next_system_id);
        self.next_system_id += 1;

        system.on_create(self);
        debug!(system = system.name(), phase = system.phase().name(), "added system");
        self.scheduler.add_system(id, system);
        self.system_count += 1;
        id
    }

    pub fn system_count(&self) -> usize {
        self.system_count
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn time(&self) -> &Time {
        &self.time
    }

    pub fn time_mut(&mut self) -> &mut Time {
        &mut self.time
    }

    /// Run one frame using the configured default delta
    pub fn update(&mut self) -> Result<()> {
        self.update_with_delta(self.config.default_delta)
    }

    /// Run one frame: every phase in order, flushing commands after each
    pub fn update_with_delta(&mut self, delta: f32) -> Result<()> {
        if self.updating {
            warn!("nested World::update ignored");
            return Ok(());
        }

        self.time.advance(delta);
        self.updating = true;
        let mut scheduler = std::mem::take(&mut self.scheduler);
        let result = scheduler.run_frame(self);
        let added = std::mem::replace(&mut self.scheduler, scheduler);
        self.scheduler.absorb(added);
        self.updating = false;

        if std::mem::take(&mut self.dispose_requested) {
            self.dispose();
        }
        result
    }

    /// Release everything the world holds
    ///
    /// Systems get `on_destroy`, then every live entity is reported to the
    /// destroy callback. Pending commands are discarded. Calling it again
    /// on an empty world does nothing. Called from a system, disposal runs
    /// once the current frame has finished.
    pub fn dispose(&mut self) {
        if self.updating {
            debug!("dispose requested during update, deferred to end of frame");
            self.dispose_requested = true;
            return;
        }

        let has_state = !self.locations.is_empty()
            || !self.archetypes.is_empty()
            || self.system_count > 0
            || !self.pending.is_empty();
        if !has_state {
            return;
        }

        let mut scheduler = std::mem::take(&mut self.scheduler);
        scheduler.destroy_all(self);
        self.scheduler = Scheduler::new();
        self.system_count = 0;

        if let Some(mut callback) = self.on_entity_destroyed.take() {
            let live: Vec<Entity> = self
                .archetypes
                .iter()
                .flat_map(|archetype| archetype.chunks())
                .flat_map(|chunk| chunk.entities().iter().copied())
                .collect();
            for entity in live {
                let external = self.external_ref(entity);
                callback(&*self, entity, external);
            }
            self.on_entity_destroyed = Some(callback);
        }

        let released = self.locations.len();
        for archetype in &mut self.archetypes {
            archetype.clear();
        }
        self.archetypes.clear();
        self.archetype_index.clear();
        self.transitions.clear();
        self.locations.clear();
        self.external_refs.clear();
        self.pending.clear();
        self.epoch += 1;

        debug!(entities = released, "world disposed");
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("entities", &self.locations.len())
            .field("archetypes", &self.archetypes.len())
            .field("pending_commands", &self.pending.len())
            .field("systems", &self.system_count)
            .finish()
    }
}
