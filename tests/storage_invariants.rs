use bytemuck::{Pod, Zeroable};
use chunked_ecs::prelude::*;

#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
struct Wide {
    id: u64,
    payload: [u64; 15],
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
struct Tag(u32);

/// Small deterministic generator so runs are reproducible
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        self.0 >> 33
    }

    fn below(&mut self, n: usize) -> usize {
        (self.next() % n as u64) as usize
    }
}

fn small_chunk_world() -> World {
    let config = WorldConfig {
        chunk_bytes: WorldConfig::min_chunk_bytes(),
        ..Default::default()
    };
    World::with_config(config).unwrap()
}

fn assert_dense(world: &World) {
    for archetype in world.all_archetypes() {
        let count = archetype.chunk_count();
        for (index, chunk) in archetype.chunks().iter().enumerate() {
            assert_eq!(chunk.entities().len(), chunk.len());
            if index + 1 < count {
                assert_eq!(chunk.len(), chunk.capacity(), "chunk {index} of {:?} not full", archetype.id());
            } else {
                assert!(!chunk.is_empty(), "trailing chunk of {:?} is empty", archetype.id());
            }
        }
    }
}

fn assert_locations(world: &World, live: &[(Entity, u64)]) {
    assert_eq!(world.entity_count(), live.len());
    for &(entity, id) in live {
        let location = world.entity_location(entity).unwrap();
        let archetype = world.archetype(location.archetype).unwrap();
        let column = archetype.component_column_index::<Wide>().unwrap();
        let chunk = archetype.chunk(location.chunk).unwrap();

        assert_eq!(chunk.entity_id(location.row), Some(entity));
        let direct = &chunk.component_slice::<Wide>(column)[location.row];
        assert_eq!(world.get_component::<Wide>(entity), Some(direct));
        assert_eq!(direct.id, id);
    }
}

#[test]
fn density_and_locations_hold_under_churn() {
    let mut world = small_chunk_world();
    let mut rng = Lcg(7);
    let mut live: Vec<(Entity, u64)> = Vec::new();
    let mut next_id = 0;

    for step in 0..2_000 {
        let roll = rng.below(10);
        if roll < 6 || live.is_empty() {
            next_id += 1;
            let wide = Wide {
                id: next_id,
                ..Default::default()
            };
            let entity = if rng.below(2) == 0 {
                world.spawn((wide,))
            } else {
                world.spawn((wide, Tag(step)))
            };
            live.push((entity, next_id));
        } else if roll < 8 {
            let (entity, _) = live.swap_remove(rng.below(live.len()));
            world.destroy_entity_deferred(entity);
            world.flush_deferred().unwrap();
        } else {
            let (entity, _) = live[rng.below(live.len())];
            if world.has_component::<Tag>(entity) {
                world.remove_component::<Tag>(entity).unwrap();
            } else {
                world.add_component(entity, Tag(step)).unwrap();
            }
        }

        if step % 50 == 0 {
            assert_dense(&world);
            assert_locations(&world, &live);
        }
    }

    assert_dense(&world);
    assert_locations(&world, &live);
}

#[test]
fn emptied_chunks_are_pooled_and_reused() {
    let mut world = small_chunk_world();
    let first = world.spawn((Wide::default(),));
    let archetype_id = world.entity_location(first).unwrap().archetype;
    let capacity = world.archetype(archetype_id).unwrap().chunk_capacity();

    let mut entities = vec![first];
    for _ in 0..capacity * 3 {
        entities.push(world.spawn((Wide::default(),)));
    }
    assert_eq!(world.archetype(archetype_id).unwrap().chunk_count(), 4);

    for &entity in &entities[..capacity * 2] {
        world.destroy_entity_deferred(entity);
    }
    world.flush_deferred().unwrap();

    let archetype = world.archetype(archetype_id).unwrap();
    assert_eq!(archetype.chunk_count(), 2);
    assert_eq!(archetype.pooled_chunk_count(), 2);
    assert_dense(&world);

    for _ in 0..capacity {
        world.spawn((Wide::default(),));
    }
    assert_eq!(world.archetype(archetype_id).unwrap().pooled_chunk_count(), 1);
}

#[test]
fn archetype_mut_gives_raw_column_access() {
    let mut world = World::new();
    let entities: Vec<Entity> = (0..4).map(|i| world.spawn((Tag(i),))).collect();
    let archetype_id = world.entity_location(entities[0]).unwrap().archetype;

    let mut archetype = world.archetype_mut(archetype_id).unwrap();
    let column = archetype.component_column_index::<Tag>().unwrap();
    for mut chunk in archetype.chunks_mut() {
        for tag in chunk.component_slice_mut::<Tag>(column) {
            tag.0 += 100;
        }
    }

    for (i, &entity) in entities.iter().enumerate() {
        assert_eq!(world.get_component::<Tag>(entity), Some(&Tag(i as u32 + 100)));
    }
}
