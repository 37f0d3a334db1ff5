use bytemuck::{Pod, Zeroable};
use chunked_ecs::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
struct Health(i32);

#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
struct Poisoned(i32);

struct PoisonSystem {
    query: Query,
}

impl System for PoisonSystem {
    fn name(&self) -> &'static str {
        "poison"
    }

    fn on_update(&mut self, world: &mut World, commands: &mut CommandBuffer) -> Result<()> {
        self.query
            .for_each::<(Entity, &mut Health, &Poisoned), _>(world, |(entity, health, poison)| {
                health.0 -= poison.0;
                if health.0 <= 0 {
                    commands.destroy(entity);
                }
            });
        Ok(())
    }
}

struct ReaperCount {
    alive: Arc<Mutex<Vec<usize>>>,
}

impl System for ReaperCount {
    fn name(&self) -> &'static str {
        "reaper_count"
    }

    fn phase(&self) -> Phase {
        Phase::Sync
    }

    fn on_update(&mut self, world: &mut World, _commands: &mut CommandBuffer) -> Result<()> {
        self.alive.lock().unwrap().push(world.entity_count());
        Ok(())
    }
}

#[test]
fn logic_commands_are_applied_before_sync() {
    let mut world = World::new();
    world.spawn((Health(2), Poisoned(1)));
    world.spawn((Health(1), Poisoned(1)));
    world.spawn((Health(5),));

    let alive = Arc::new(Mutex::new(Vec::new()));
    world.add_system(ReaperCount {
        alive: Arc::clone(&alive),
    });
    world.add_system(PoisonSystem {
        query: Query::of::<(&Health, &Poisoned)>(),
    });

    world.update().unwrap();
    world.update().unwrap();

    assert_eq!(*alive.lock().unwrap(), vec![2, 1]);
    assert_eq!(world.time().frame_count(), 2);
    assert_eq!(world.pending_command_count(), 0);
}

#[test]
fn dispose_twice_fires_callbacks_once() {
    let mut world = World::new();
    let destroyed = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&destroyed);
    world.set_on_entity_destroyed(move |world, entity, _| {
        assert!(world.is_alive(entity));
        counter.fetch_add(1, Ordering::SeqCst);
    });

    for i in 0..5 {
        world.spawn((Health(i),));
    }
    world.spawn((Health(9), Poisoned(1)));
    world.add_system(PoisonSystem {
        query: Query::of::<(&Health, &Poisoned)>(),
    });

    world.dispose();
    let after_first = (world.entity_count(), world.archetype_count(), world.system_count());
    assert_eq!(destroyed.load(Ordering::SeqCst), 6);

    world.dispose();
    assert_eq!(destroyed.load(Ordering::SeqCst), 6);
    assert_eq!(
        (world.entity_count(), world.archetype_count(), world.system_count()),
        after_first
    );
    assert_eq!(after_first, (0, 0, 0));

    // The world is usable again after disposal
    let entity = world.spawn((Health(1),));
    assert_eq!(world.get_component::<Health>(entity), Some(&Health(1)));
}

#[test]
fn stale_handles_never_panic() {
    let mut world = World::new();
    let entity = world.spawn((Health(3),));
    world.destroy_entity_deferred(entity);
    world.flush_deferred().unwrap();

    assert!(!world.is_alive(entity));
    assert_eq!(world.get_component::<Health>(entity), None);
    assert_eq!(world.get_component_mut::<Health>(entity), None);
    assert!(!world.set_component(entity, Health(1)));
    assert_eq!(world.entity_location(entity), None);
    assert_eq!(world.remove_component::<Health>(entity), Err(EcsError::EntityNotFound(entity)));

    // Destroying again is a skipped command, not an error
    world.destroy_entity_deferred(entity);
    let report = world.flush_deferred().unwrap();
    assert_eq!(report.skipped, 1);
}

#[test]
fn entity_ids_are_never_reused() {
    let mut world = World::new();
    let first = world.spawn((Health(1),));
    world.destroy_entity_deferred(first);
    world.flush_deferred().unwrap();

    let second = world.spawn((Health(2),));
    assert_ne!(first, second);
    assert!(second > first);
}

#[test]
fn config_from_json_drives_chunk_capacity() {
    let config = WorldConfig::from_json(r#"{ "chunk_bytes": 8192, "max_pooled_chunks": 1 }"#).unwrap();
    let mut world = World::with_config(config).unwrap();
    let entity = world.spawn((Health(1), Poisoned(1)));

    let archetype = world.archetype(world.entity_location(entity).unwrap().archetype).unwrap();
    // 8-byte id + two 4-byte components per row
    assert_eq!(archetype.chunk_capacity(), 8192 / 16);
    assert_eq!(world.stats().chunk_count, 1);
}

#[test]
fn create_then_queued_destroy_in_one_system_keeps_order() {
    let mut world = World::new();
    world.add_system(FnSystem::new(
        "spawn_and_reap",
        Phase::Logic,
        |world: &mut World, commands: &mut CommandBuffer| {
            let entity = commands.spawn((Health(1),));
            world.destroy_entity_deferred(entity);
            Ok(())
        },
    ));

    world.update().unwrap();
    assert_eq!(world.entity_count(), 0);
    assert_eq!(world.pending_command_count(), 0);
}

#[test]
fn world_queue_and_phase_buffer_interleave_by_recording_order() {
    let mut world = World::new();
    let target = world.spawn((Health(10),));
    world.add_system(FnSystem::new(
        "interleave",
        Phase::Logic,
        move |world: &mut World, commands: &mut CommandBuffer| {
            commands.set_component(target, Health(20));
            let mut queued = world.command_buffer();
            queued.set_component(target, Health(30));
            world.submit(queued)?;
            commands.add_component(target, Poisoned(1));
            Ok(())
        },
    ));

    world.update().unwrap();
    assert_eq!(world.get_component::<Health>(target), Some(&Health(30)));
    assert_eq!(world.get_component::<Poisoned>(target), Some(&Poisoned(1)));
}

#[test]
fn foreign_command_buffer_is_rejected() {
    let mut world = World::new();
    let other = World::new();

    let mut foreign = other.command_buffer();
    foreign.spawn((Health(1),));
    assert!(matches!(world.submit(foreign), Err(EcsError::CommandError(_))));
    assert_eq!(world.pending_command_count(), 0);

    let report = world.flush_deferred().unwrap();
    assert_eq!(report.applied(), 0);

    let first = world.spawn((Health(2),));
    let second = world.spawn((Health(3),));
    assert_ne!(first, second);
    assert_eq!(world.entity_count(), 2);
    let archetype = world.archetype(world.entity_location(first).unwrap().archetype).unwrap();
    assert_eq!(archetype.entity_count(), 2);
}

struct SelfDisposing {
    destroyed: Arc<AtomicUsize>,
}

impl System for SelfDisposing {
    fn name(&self) -> &'static str {
        "self_disposing"
    }

    fn on_update(&mut self, world: &mut World, _commands: &mut CommandBuffer) -> Result<()> {
        world.dispose();
        assert!(world.entity_count() > 0);
        Ok(())
    }

    fn on_destroy(&mut self, _world: &mut World) {
        self.destroyed.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn dispose_from_system_runs_after_frame() {
    let mut world = World::new();
    let destroyed = Arc::new(AtomicUsize::new(0));
    world.spawn((Health(1),));
    world.add_system(SelfDisposing {
        destroyed: Arc::clone(&destroyed),
    });
    world.add_system(ReaperCount {
        alive: Arc::new(Mutex::new(Vec::new())),
    });

    world.update().unwrap();
    assert_eq!(destroyed.load(Ordering::SeqCst), 1);
    assert_eq!(world.system_count(), 0);
    assert_eq!(world.entity_count(), 0);
    assert_eq!(world.scheduler().system_count(), 0);
}
