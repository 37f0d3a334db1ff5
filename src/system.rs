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

//! System trait and phases

use crate::command::CommandBuffer;
use crate::error::Result;
use crate::world::World;

/// Frame phase. Every `Logic` system runs before any `Sync` system, and
/// deferred commands are flushed between the two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Phase {
    Logic,
    Sync,
}

impl Phase {
    /// Run order
    pub const ALL: [Phase; 2] = [Phase::Logic, Phase::Sync];

    pub fn index(self) -> usize {
        match self {
            Phase::Logic => 0,
            Phase::Sync => 1,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Phase::Logic => "logic",
            Phase::Sync => "sync",
        }
    }
}

/// Handle returned by [`World::add_system`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SystemId(pub(crate) u32);

impl SystemId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// System trait
pub trait System: Send {
    /// Get system name
    fn name(&self) -> &'static str;

    fn phase(&self) -> Phase {
        Phase::Logic
    }

    /// Called once when the system is added to a world
    fn on_create(&mut self, _world: &mut World) {}

    /// Run one frame. Structural changes recorded into `commands` are
    /// applied when the phase ends.
    fn on_update(&mut self, world: &mut World, commands: &mut CommandBuffer) -> Result<()>;

    /// Called once when the world is disposed
    fn on_destroy(&mut self, _world: &mut World) {}
}

/// Boxed system
pub type BoxedSystem = Box<dyn System>;

/// System built from a closure
pub struct FnSystem<F> {
    name: &'static str,
    phase: Phase,
    func: F,
}

impl<F> FnSystem<F>
where
    F: FnMut(&mut World, &mut CommandBuffer) -> Result<()> + Send,
{
    pub fn new(name: &'static str, phase: Phase, func: F) -> Self {
        Self { name, phase, func }
    }
}

impl<F> System for FnSystem<F>
where
    F: FnMut(&mut World, &mut CommandBuffer) -> Result<()> + Send,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn phase(&self) -> Phase {
        self.phase
    }

    fn on_update(&mut self, world: &mut World, commands: &mut CommandBuffer) -> Result<()> {
        (self.func)(world, commands)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytemuck::{Pod, Zeroable};

    #[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
    #[repr(C)]
    struct Marker(u32);

    #[derive(Default)]
    struct DummySystem {
        created: bool,
    }

    impl System for DummySystem {
        fn name(&self) -> &'static str {
            "dummy_system"
        }

        fn on_create(&mut self, _world: &mut World) {
            self.created = true;
        }

        fn on_update(&mut self, world: &mut World, commands: &mut CommandBuffer) -> Result<()> {
            // Create and immediately queue destruction to ensure both paths work
            let entity = world.spawn((Marker(42),));
            commands.destroy(entity);
            Ok(())
        }
    }

    #[test]
    fn test_phase_order() {
        assert_eq!(Phase::ALL, [Phase::Logic, Phase::Sync]);
        assert!(Phase::Logic < Phase::Sync);
        assert_eq!(Phase::Sync.index(), 1);
    }

    #[test]
    fn test_system_run_signature() {
        let mut world = World::new();
        let mut system = DummySystem::default();
        system.on_create(&mut world);
        assert!(system.created);
        assert_eq!(system.phase(), Phase::Logic);

        let mut commands = world.command_buffer();
        system.on_update(&mut world, &mut commands).expect("system should run");
        assert_eq!(world.entity_count(), 1);
        assert_eq!(commands.len(), 1);
    }

    #[test]
    fn test_fn_system() {
        let mut system = FnSystem::new("late", Phase::Sync, |world: &mut World, _: &mut CommandBuffer| {
            world.spawn((Marker(1),));
            Ok(())
        });
        assert_eq!(system.name(), "late");
        assert_eq!(system.phase(), Phase::Sync);

        let mut world = World::new();
        let mut commands = world.command_buffer();
        system.on_update(&mut world, &mut commands).unwrap();
        assert_eq!(world.entity_count(), 1);
    }
}
