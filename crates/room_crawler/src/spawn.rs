//! Timed enemy spawners
//!
//! A spawner produces its initial batch on the first tick, waits for its
//! start time, then produces one enemy per cooldown until it reaches its
//! cap, at which point it deletes itself.

use std::path::Path;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use scene_engine::prelude::*;
use scene_engine::scene::{read_document, Attributes};

use crate::characters::spawn_enemy;
use crate::components::SpawnerComponent;
use crate::error::{GameError, GameResult, SpawnError};

/// Drives every `SpawnerComponent` in the world
pub struct SpawnSystem {
    time: f32,
    rng: StdRng,
}

impl SpawnSystem {
    /// System with a fixed RNG seed, or an entropy-seeded one
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { time: 0.0, rng }
    }

    /// Seconds of game time seen by the system
    pub fn time(&self) -> f32 {
        self.time
    }

    /// Advance every spawner by `tick` seconds. Returns the enemies spawned.
    pub fn update(&mut self, registry: &mut SceneRegistry, tick: f32) -> GameResult<Vec<Entity>> {
        self.time += tick;
        let mut spawned = Vec::new();

        for entity in registry.world().entities_with::<SpawnerComponent>() {
            if !registry.world().is_alive(entity) {
                continue;
            }
            let Some(mut spawner) = registry.world().get_component::<SpawnerComponent>(entity).cloned() else {
                continue;
            };

            let result = self.step(registry, entity, &mut spawner, tick, &mut spawned);
            if let Some(component) = registry.world_mut().get_component_mut::<SpawnerComponent>(entity) {
                *component = spawner;
            }
            result?;
        }
        Ok(spawned)
    }

    fn step(
        &mut self,
        registry: &mut SceneRegistry,
        entity: Entity,
        spawner: &mut SpawnerComponent,
        tick: f32,
        spawned: &mut Vec<Entity>,
    ) -> GameResult<()> {
        if !spawner.initialized {
            spawner.initialized = true;
            for index in 0..spawner.curr_enemies {
                spawned.push(self.spawn_one(registry, spawner, index)?);
            }
        }

        if self.time < spawner.start_time {
            return Ok(());
        }
        spawner.curr_cooldown -= tick;
        if spawner.curr_cooldown > 0.0 {
            return Ok(());
        }

        if spawner.curr_enemies >= spawner.max_enemies {
            registry.world_mut().delete_entity(entity);
            log::info!("Spawner '{}' finished after {} enemies", spawner.name, spawner.curr_enemies);
            return Ok(());
        }

        spawner.curr_enemies += 1;
        spawned.push(self.spawn_one(registry, spawner, spawner.curr_enemies)?);
        spawner.curr_cooldown = spawner.cooldown;
        Ok(())
    }

    fn spawn_one(&mut self, registry: &mut SceneRegistry, spawner: &SpawnerComponent, index: u32) -> GameResult<Entity> {
        let position = self.random_point(spawner);
        let name = format!("{}({})", spawner.name, index);
        spawn_enemy(registry, position, Vec3::zeros(), &name, &spawner.prefab)
    }

    /// Uniform point in the spawner's area at its height
    pub fn random_point(&mut self, spawner: &SpawnerComponent) -> Vec3 {
        Vec3::new(
            sample(&mut self.rng, spawner.min_x, spawner.max_x),
            spawner.height,
            sample(&mut self.rng, spawner.min_z, spawner.max_z),
        )
    }
}

fn sample(rng: &mut StdRng, low: f32, high: f32) -> f32 {
    if high > low {
        rng.gen_range(low..=high)
    } else {
        low
    }
}

/// Read a spawner file and create one spawner entity per `<Node>`.
///
/// Every entry is checked before any entity is created.
pub fn load_spawners(registry: &mut SceneRegistry, path: &Path) -> GameResult<Vec<Entity>> {
    let root = read_document(path)?;
    let spawner_error = |source: SpawnError| GameError::Spawner {
        path: path.to_path_buf(),
        source,
    };

    let mut spawners = Vec::new();
    for node in root.children_named("Node") {
        let attrs = Attributes::new(node, path);
        let name = attrs.string("Name")?.to_string();
        let prefab = attrs.string("Prefab")?.to_string();
        let kind = attrs.parse_or("Type", "enemy".to_string())?;
        if kind != "enemy" {
            log::warn!("Spawner '{}' has type '{}', spawning enemies anyway", name, kind);
        }

        let area = node.child("Area").ok_or_else(|| SceneError::MissingElement {
            path: path.to_path_buf(),
            element: "Area".to_string(),
        })?;
        let (center, extents) = match (area.child("Position"), area.child("Extents")) {
            (Some(position), Some(extents)) => {
                let position = Attributes::new(position, path);
                let extents = Attributes::new(extents, path);
                (
                    Vec3::new(
                        position.parse_or("x", 0.0)?,
                        position.parse_or("y", 0.0)?,
                        position.parse_or("z", 0.0)?,
                    ),
                    Vec2::new(extents.parse_or("x", 0.0)?, extents.parse_or("z", 0.0)?),
                )
            }
            (None, _) | (_, None) => {
                return Err(SceneError::MissingElement {
                    path: path.to_path_buf(),
                    element: "Position/Extents".to_string(),
                }
                .into())
            }
        };
        if extents.x < 0.0 || extents.y < 0.0 {
            return Err(spawner_error(SpawnError::InvalidArea(name)));
        }

        let properties = node.child("Properties").ok_or_else(|| SceneError::MissingElement {
            path: path.to_path_buf(),
            element: "Properties".to_string(),
        })?;
        let properties = Attributes::new(properties, path);
        let start_time: f32 = properties.parse_or("StartTime", 0.0)?;
        let initial: u32 = properties.parse_or("InitialEnemies", 0)?;
        let max: u32 = properties.parse_or("MaxEnemies", initial)?;
        let cooldown: f32 = properties.parse("Cooldown")?;
        if initial > max {
            return Err(spawner_error(SpawnError::InitialExceedsMax { name, initial, max }));
        }
        if !(cooldown.is_finite() && cooldown > 0.0) {
            return Err(spawner_error(SpawnError::InvalidCooldown(name)));
        }

        spawners.push(
            SpawnerComponent::new(name, prefab, center, extents)
                .with_start_time(start_time)
                .with_cooldown(cooldown)
                .with_counts(initial, max),
        );
    }

    let world = registry.world_mut();
    let entities = spawners
        .into_iter()
        .map(|spawner| {
            let entity = world.create_entity();
            world.add_component(entity, spawner);
            entity
        })
        .collect::<Vec<_>>();
    log::info!("Loaded {} spawners from {}", entities.len(), path.display());
    Ok(entities)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::fixtures;

    fn bat_spawner(initial: u32, max: u32) -> SpawnerComponent {
        SpawnerComponent::new("Bat", "Bat", Vec3::new(0.0, 1.0, 0.0), Vec2::new(5.0, 5.0))
            .with_cooldown(1.0)
            .with_counts(initial, max)
    }

    #[test]
    fn test_spawner_runs_to_its_cap_then_retires() {
        let level = fixtures::level();
        let mut registry = level.registry();
        let spawner = registry.world_mut().create_entity();
        registry.world_mut().add_component(spawner, bat_spawner(1, 3));
        let mut system = SpawnSystem::new(Some(3));

        // Initial batch, cooldown not yet elapsed
        assert_eq!(system.update(&mut registry, 0.5).expect("tick").len(), 1);
        assert!(registry.find_root("Bat(0)").is_some());

        let mut produced = 0;
        for _ in 0..4 {
            produced += system.update(&mut registry, 0.5).expect("tick").len();
        }
        assert_eq!(produced, 2);
        assert!(registry.find_root("Bat(2)").is_some());
        assert!(registry.find_root("Bat(3)").is_some());
        assert!(registry.world().is_alive(spawner));

        assert!(system.update(&mut registry, 0.5).expect("tick").is_empty());
        assert!(system.update(&mut registry, 0.5).expect("tick").is_empty());
        assert!(!registry.world().is_alive(spawner));
        assert_eq!(registry.parents().len(), 3);
    }

    #[test]
    fn test_start_time_gates_spawning() {
        let level = fixtures::level();
        let mut registry = level.registry();
        let spawner = registry.world_mut().create_entity();
        registry
            .world_mut()
            .add_component(spawner, bat_spawner(0, 2).with_start_time(2.0));
        let mut system = SpawnSystem::new(Some(3));

        assert!(system.update(&mut registry, 1.0).expect("tick").is_empty());
        let cooldown = registry.world().get_component::<SpawnerComponent>(spawner).expect("spawner").curr_cooldown;
        assert!((cooldown - 1.0).abs() < f32::EPSILON);

        assert_eq!(system.update(&mut registry, 1.0).expect("tick").len(), 1);
    }

    #[test]
    fn test_random_points_stay_in_the_area() {
        let mut system = SpawnSystem::new(Some(11));
        let spawner = bat_spawner(0, 1);
        for _ in 0..100 {
            let point = system.random_point(&spawner);
            assert!((-5.0..=5.0).contains(&point.x));
            assert!((-5.0..=5.0).contains(&point.z));
            assert!((point.y - 1.0).abs() < f32::EPSILON);
        }
    }

    #[test]
    fn test_same_seed_same_points() {
        let spawner = bat_spawner(0, 1);
        let mut a = SpawnSystem::new(Some(5));
        let mut b = SpawnSystem::new(Some(5));
        assert_eq!(a.random_point(&spawner), b.random_point(&spawner));
    }

    #[test]
    fn test_load_spawners_from_level() {
        let level = fixtures::level();
        let mut registry = level.registry();
        let spawners = load_spawners(&mut registry, &level.path("Config/Enemy_Spawners.xml")).expect("spawners");
        assert_eq!(spawners.len(), 1);
        let spawner = registry.world().get_component::<SpawnerComponent>(spawners[0]).expect("component");
        assert_eq!(spawner.prefab, "Bat");
        assert!(spawner.max_enemies >= spawner.curr_enemies);
    }

    #[test]
    fn test_bad_spawner_creates_nothing() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("spawners.xml");
        std::fs::write(
            &path,
            r#"<Root>
                 <Node Name="Ok" Prefab="Bat"><Area><Position x="0" y="0" z="0"/><Extents x="1" z="1"/></Area>
                   <Properties StartTime="0" InitialEnemies="1" MaxEnemies="2" Cooldown="1"/></Node>
                 <Node Name="Bad" Prefab="Bat"><Area><Position x="0" y="0" z="0"/><Extents x="1" z="1"/></Area>
                   <Properties StartTime="0" InitialEnemies="4" MaxEnemies="2" Cooldown="1"/></Node>
               </Root>"#,
        )
        .expect("write");

        let mut registry = SceneRegistry::new(dir.path(), dir.path());
        let err = load_spawners(&mut registry, &path).expect_err("initial > max");
        assert!(matches!(
            err,
            GameError::Spawner { source: SpawnError::InitialExceedsMax { initial: 4, max: 2, .. }, .. }
        ));
        assert_eq!(registry.world().entities_with::<SpawnerComponent>().len(), 0);
    }
}
