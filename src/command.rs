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

//! Deferred structural commands
//!
//! Recording a command never touches storage. Every command is stamped with
//! a sequence number from the world's allocator, so buffers merged into the
//! world's queue are applied by [`World::flush_deferred`] in the order they
//! were recorded, whichever buffer recorded them.

use crate::component::{Bundle, Component, ComponentId, ComponentRegistry, ComponentValues};
use crate::entity::{Entity, EntityAllocator};
use crate::error::Result;
use crate::world::World;

/// Type alias for world mutation closures
pub type CommandClosure = Box<dyn FnOnce(&mut World) -> Result<()> + Send>;

/// Deferred world mutation
pub enum Command {
    /// Insert a pre-reserved entity with the given values
    Create {
        entity: Entity,
        values: ComponentValues,
    },

    /// Destroy an entity (skipped if already gone)
    Destroy(Entity),

    /// Add components, moving the entity to a wider archetype
    AddComponent {
        entity: Entity,
        values: ComponentValues,
    },

    /// Remove one component, moving the entity to a narrower archetype
    RemoveComponent {
        entity: Entity,
        component: ComponentId,
    },

    /// Overwrite components in place
    SetComponent {
        entity: Entity,
        values: ComponentValues,
    },

    /// Custom world mutation
    Custom(CommandClosure),
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::Create { entity, values } => f
                .debug_struct("Create")
                .field("entity", entity)
                .field("components", &values.len())
                .finish(),
            Command::Destroy(e) => f.debug_tuple("Destroy").field(e).finish(),
            Command::AddComponent { entity, values } => f
                .debug_struct("AddComponent")
                .field("entity", entity)
                .field("components", &values.len())
                .finish(),
            Command::RemoveComponent { entity, component } => f
                .debug_struct("RemoveComponent")
                .field("entity", entity)
                .field("component", &ComponentRegistry::name_of(*component))
                .finish(),
            Command::SetComponent { entity, values } => f
                .debug_struct("SetComponent")
                .field("entity", entity)
                .field("components", &values.len())
                .finish(),
            Command::Custom(_) => write!(f, "Custom(...)"),
        }
    }
}

/// Command buffer for deferred operations
///
/// Obtained from [`World::command_buffer`]; it shares the world's entity
/// allocator so `create` can hand out the final id immediately.
pub struct CommandBuffer {
    commands: Vec<(u64, Command)>,
    allocator: EntityAllocator,
}

impl CommandBuffer {
    pub(crate) fn new(allocator: EntityAllocator) -> Self {
        Self {
            commands: Vec::new(),
            allocator,
        }
    }

    /// Queue creation of an entity. The returned id is valid once flushed.
    pub fn create(&mut self, values: ComponentValues) -> Entity {
        let entity = self.allocator.allocate();
        self.push(Command::Create { entity, values });
        entity
    }

    /// Queue creation of an entity from a component tuple
    pub fn spawn<B: Bundle>(&mut self, bundle: B) -> Entity {
        self.create(ComponentValues::from_bundle(bundle))
    }

    /// Queue destruction of an entity
    pub fn destroy(&mut self, entity: Entity) {
        self.push(Command::Destroy(entity));
    }

    /// Queue add component command
    pub fn add_component<T: Component>(&mut self, entity: Entity, component: T) {
        self.push(Command::AddComponent {
            entity,
            values: ComponentValues::new().with(component),
        });
    }

    /// Queue remove component command
    pub fn remove_component<T: Component>(&mut self, entity: Entity) {
        self.push(Command::RemoveComponent {
            entity,
            component: ComponentRegistry::register::<T>(),
        });
    }

    /// Queue an in-place overwrite
    pub fn set_component<T: Component>(&mut self, entity: Entity, component: T) {
        self.push(Command::SetComponent {
            entity,
            values: ComponentValues::new().with(component),
        });
    }

    /// Queue a custom world mutation
    pub fn add<F>(&mut self, f: F)
    where
        F: FnOnce(&mut World) -> Result<()> + Send + 'static,
    {
        self.push(Command::Custom(Box::new(f)));
    }

    fn push(&mut self, command: Command) {
        let sequence = self.allocator.next_sequence();
        self.commands.push((sequence, command));
    }

    /// Move every command of `other` into this buffer
    pub fn append(&mut self, other: &mut CommandBuffer) {
        self.commands.append(&mut other.commands);
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Get length
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Clear buffer. Ids reserved by queued creates are not reused.
    pub fn clear(&mut self) {
        self.commands.clear();
    }

    /// Drain the buffer in recording order
    pub(crate) fn take_commands(&mut self) -> Vec<Command> {
        let mut commands = std::mem::take(&mut self.commands);
        commands.sort_by_key(|(sequence, _)| *sequence);
        commands.into_iter().map(|(_, command)| command).collect()
    }

    pub(crate) fn allocator(&self) -> &EntityAllocator {
        &self.allocator
    }
}

impl std::fmt::Debug for CommandBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandBuffer")
            .field("commands", &self.commands)
            .finish()
    }
}
