//! Room streaming
//!
//! A level is split into rooms, each its own scene file. The controller
//! watches the player's position, and when they step past the current
//! room's boundary it swaps the room's scene for the neighbor behind that
//! door. The player root survives the swap; everything else is reloaded.
//!
//! Room definitions come from one XML file per level:
//!
//! ```xml
//! <Root first_room="Hall">
//!   <Room name="Hall" camera_type="follow">
//!     <Boundary left="-10" right="10" up="8" down="-8"/>
//!     <Exit name="Cellar" door="r"/>
//!     <Enemy name="Bat" prefab="Bat" item="Heart" alive="true"><Position x="2" y="3"/></Enemy>
//!   </Room>
//! </Root>
//! ```

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use scene_engine::prelude::*;
use scene_engine::scene::{read_document, Attributes, XmlElement};
use serde::{Deserialize, Serialize};

use crate::characters::spawn_enemy_anim;
use crate::components::{CameraFollowComponent, CameraMode};
use crate::config::GameConfig;
use crate::error::{GameError, GameResult, RoomError};

/// A side of a room
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Door {
    /// +x side
    Right,
    /// -x side
    Left,
    /// +z side
    Top,
    /// -z side
    Bottom,
}

impl Door {
    /// Priority order used when the player is past two edges at once
    pub const PRIORITY: [Door; 4] = [Door::Right, Door::Left, Door::Top, Door::Bottom];

    /// Door for a one-letter tag (`r`, `l`, `t`, `b`)
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "r" => Some(Self::Right),
            "l" => Some(Self::Left),
            "t" => Some(Self::Top),
            "b" => Some(Self::Bottom),
            _ => None,
        }
    }

    /// One-letter tag
    pub fn tag(self) -> char {
        match self {
            Self::Right => 'r',
            Self::Left => 'l',
            Self::Top => 't',
            Self::Bottom => 'b',
        }
    }
}

impl fmt::Display for Door {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// How an exit is chosen when the player is past more than one edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BoundaryResolution {
    /// First of right, left, top, bottom
    #[default]
    FixedPriority,
    /// The edge crossed by the greatest distance, priority order on ties
    DeepestCrossing,
}

/// Axis-aligned room extent on the ground plane (x and z)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Boundary {
    /// Minimum x
    pub left: f32,
    /// Maximum x
    pub right: f32,
    /// Maximum z
    pub up: f32,
    /// Minimum z
    pub down: f32,
}

impl Boundary {
    /// How far `position` is past the edge behind `door`; non-positive when inside
    fn overshoot(&self, door: Door, position: &Vec3) -> f32 {
        match door {
            Door::Right => position.x - self.right,
            Door::Left => self.left - position.x,
            Door::Top => position.z - self.up,
            Door::Bottom => self.down - position.z,
        }
    }

    /// The door `position` has left through, if any
    pub fn exit(&self, position: &Vec3, resolution: BoundaryResolution) -> Option<Door> {
        let mut crossed = Door::PRIORITY
            .into_iter()
            .filter(|&door| self.overshoot(door, position) > 0.0);
        match resolution {
            BoundaryResolution::FixedPriority => crossed.next(),
            BoundaryResolution::DeepestCrossing => crossed.fold(None, |best: Option<Door>, door| match best {
                Some(current) if self.overshoot(current, position) >= self.overshoot(door, position) => Some(current),
                _ => Some(door),
            }),
        }
    }

    /// Where a player entering through the door opposite `exited` appears,
    /// `margin` inside the edge. Other coordinates are kept.
    pub fn entry_position(&self, exited: Door, from: Vec3, margin: f32) -> Vec3 {
        let mut position = from;
        match exited {
            Door::Right => position.x = self.left + margin,
            Door::Left => position.x = self.right - margin,
            Door::Top => position.z = self.down + margin,
            Door::Bottom => position.z = self.up - margin,
        }
        position
    }

    /// `position` pulled back inside the boundary
    pub fn clamp(&self, position: Vec3) -> Vec3 {
        Vec3::new(
            position.x.clamp(self.left, self.right),
            position.y,
            position.z.clamp(self.down, self.up),
        )
    }

    fn is_well_formed(&self) -> bool {
        [self.left, self.right, self.up, self.down].iter().all(|v| v.is_finite())
            && self.left < self.right
            && self.down < self.up
    }
}

/// An enemy placed in a room
#[derive(Debug, Clone, PartialEq)]
pub struct EnemyRecord {
    /// Unique name within the room
    pub name: String,
    /// Prefab spawned
    pub prefab: String,
    /// Item dropped on death
    pub item: String,
    /// Dead enemies are not respawned
    pub alive: bool,
    /// Ground position (x, z)
    pub spawn_point: Vec2,
}

/// One room of a level
#[derive(Debug, Clone, PartialEq)]
pub struct Room {
    /// Room name, also the scene file name
    pub name: String,
    /// Walkable extent
    pub boundary: Boundary,
    /// Neighbor behind each door
    pub doors: HashMap<Door, String>,
    /// Camera behavior inside the room
    pub camera_type: CameraMode,
    /// Enemies in file order
    pub enemies: Vec<EnemyRecord>,
}

impl Room {
    /// Enemy record by name
    pub fn enemy(&self, name: &str) -> Option<&EnemyRecord> {
        self.enemies.iter().find(|enemy| enemy.name == name)
    }

    fn enemy_mut(&mut self, name: &str) -> Option<&mut EnemyRecord> {
        self.enemies.iter_mut().find(|enemy| enemy.name == name)
    }
}

/// Every room of a level
#[derive(Debug, Clone, PartialEq)]
pub struct RoomMap {
    first_room: String,
    rooms: HashMap<String, Room>,
}

impl RoomMap {
    /// Read and validate a room file
    pub fn load(path: &Path) -> GameResult<Self> {
        let root = read_document(path)?;
        Self::from_element(&root, path)
    }

    /// Build from a parsed room document; `path` is used in errors
    pub fn from_element(root: &XmlElement, path: &Path) -> GameResult<Self> {
        if root.name != "Root" {
            return Err(SceneError::UnexpectedRoot {
                path: path.to_path_buf(),
                expected: "Root".to_string(),
                found: root.name.clone(),
            }
            .into());
        }
        let room_error = |source: RoomError| GameError::Room {
            path: path.to_path_buf(),
            source,
        };

        let first_room = Attributes::new(root, path).string("first_room")?.to_string();
        let mut rooms = HashMap::new();
        for element in root.children_named("Room") {
            let room = parse_room(element, path)?;
            if rooms.contains_key(&room.name) {
                return Err(room_error(RoomError::DuplicateRoom(room.name)));
            }
            rooms.insert(room.name.clone(), room);
        }

        let map = Self { first_room, rooms };
        map.validate().map_err(room_error)?;
        Ok(map)
    }

    fn validate(&self) -> Result<(), RoomError> {
        if !self.rooms.contains_key(&self.first_room) {
            return Err(RoomError::UnknownFirstRoom(self.first_room.clone()));
        }
        for room in self.rooms.values() {
            for (&door, target) in &room.doors {
                if !self.rooms.contains_key(target) {
                    return Err(RoomError::DanglingDoor {
                        room: room.name.clone(),
                        door: door.tag(),
                        target: target.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Room the level starts in
    pub fn first_room(&self) -> &str {
        &self.first_room
    }

    /// Room by name
    pub fn room(&self, name: &str) -> Option<&Room> {
        self.rooms.get(name)
    }

    /// Number of rooms
    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    /// Whether the map has no rooms
    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}

fn parse_room(element: &XmlElement, path: &Path) -> GameResult<Room> {
    let attrs = Attributes::new(element, path);
    let name = attrs.string("name")?.to_string();
    let room_error = |source: RoomError| GameError::Room {
        path: path.to_path_buf(),
        source,
    };

    let camera_raw = attrs.parse_or("camera_type", CameraMode::default().to_string())?;
    let camera_type = camera_raw.parse::<CameraMode>().map_err(|camera_type| {
        room_error(RoomError::UnknownCameraType {
            room: name.clone(),
            camera_type,
        })
    })?;

    let boundary_element = element.child("Boundary").ok_or_else(|| SceneError::MissingElement {
        path: path.to_path_buf(),
        element: "Boundary".to_string(),
    })?;
    let bounds = Attributes::new(boundary_element, path);
    let boundary = Boundary {
        left: bounds.parse("left")?,
        right: bounds.parse("right")?,
        up: bounds.parse("up")?,
        down: bounds.parse("down")?,
    };
    if !boundary.is_well_formed() {
        return Err(room_error(RoomError::MalformedBoundary(name)));
    }

    let mut doors = HashMap::new();
    for exit in element.children_named("Exit") {
        let exit_attrs = Attributes::new(exit, path);
        let target = exit_attrs.string("name")?;
        let tag = exit_attrs.string("door")?;
        let door = Door::from_tag(tag).ok_or_else(|| {
            room_error(RoomError::InvalidDoor {
                room: name.clone(),
                target: target.to_string(),
                door: tag.to_string(),
            })
        })?;
        doors.insert(door, target.to_string());
    }

    let mut enemies = Vec::new();
    for (index, enemy) in element.children_named("Enemy").enumerate() {
        let enemy_attrs = Attributes::new(enemy, path);
        let base_name = enemy_attrs.parse_or("name", String::new())?;
        let enemy_name = format!("{}{}", base_name, index + 1);
        let prefab = enemy_attrs.parse_or("prefab", String::new())?;
        if prefab.is_empty() {
            return Err(room_error(RoomError::MissingPrefab {
                room: name.clone(),
                enemy: enemy_name,
            }));
        }
        let spawn_point = match enemy.child("Position") {
            Some(position) => {
                let position = Attributes::new(position, path);
                Vec2::new(position.parse_or("x", 0.0)?, position.parse_or("y", 0.0)?)
            }
            None => Vec2::zeros(),
        };
        enemies.push(EnemyRecord {
            name: enemy_name,
            prefab,
            item: enemy_attrs.parse_or("item", String::new())?,
            alive: enemy_attrs.parse_or("alive", true)?,
            spawn_point,
        });
    }

    Ok(Room {
        name,
        boundary,
        doors,
        camera_type,
        enemies,
    })
}

/// Room controller states
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomState {
    /// Not started
    Idle,
    /// The player is in `current`
    InRoom {
        /// Current room name
        current: String,
    },
}

/// Tracks which room the player is in and swaps rooms at the boundaries
#[derive(Debug)]
pub struct RoomController {
    map: RoomMap,
    state: RoomState,
    resolution: BoundaryResolution,
    margin: f32,
    camera_name: String,
    player_name: String,
}

impl RoomController {
    /// Controller over `map` using the room settings from `config`
    pub fn new(map: RoomMap, config: &GameConfig) -> Self {
        Self {
            map,
            state: RoomState::Idle,
            resolution: config.rooms.boundary_resolution,
            margin: config.rooms.margin,
            camera_name: config.rooms.camera_name.clone(),
            player_name: config.player.name.clone(),
        }
    }

    /// Read the room file at `path`
    pub fn load(path: &Path, config: &GameConfig) -> GameResult<Self> {
        let map = RoomMap::load(path)?;
        log::info!("Loaded {} rooms from {}", map.len(), path.display());
        Ok(Self::new(map, config))
    }

    /// Current state
    pub fn state(&self) -> &RoomState {
        &self.state
    }

    /// All rooms
    pub fn map(&self) -> &RoomMap {
        &self.map
    }

    /// The room the player is in
    pub fn current_room(&self) -> Option<&Room> {
        match &self.state {
            RoomState::Idle => None,
            RoomState::InRoom { current } => self.map.room(current),
        }
    }

    /// Enter the first room: clear everything but the player, load the
    /// room's scene, spawn its enemies and hook up the camera.
    ///
    /// Does nothing once a room is active.
    pub fn activate(&mut self, registry: &mut SceneRegistry, player: Entity) -> GameResult<()> {
        if self.state != RoomState::Idle {
            log::warn!("Room controller already active");
            return Ok(());
        }
        let first = self.map.first_room.clone();
        let document = registry.read_scene(&first)?;

        if registry.parents().len() > 1 {
            registry.delete_scene_except_player(&self.player_name);
        }
        registry.append_scene(&document);
        self.state = RoomState::InRoom { current: first.clone() };

        self.spawn_enemies(registry, player)?;
        self.set_camera(registry, player);
        log::info!("Entered first room '{}'", first);
        Ok(())
    }

    /// Check the player's position against the current room and swap rooms
    /// when they have left it. Returns the room entered, if any.
    pub fn process(&mut self, registry: &mut SceneRegistry, player: Entity) -> GameResult<Option<String>> {
        let RoomState::InRoom { current } = &self.state else {
            return Ok(None);
        };
        let room = self
            .map
            .room(current)
            .ok_or_else(|| RoomError::UnknownRoom(current.clone()))?;
        let position = registry
            .world()
            .get_component::<TransformComponent>(player)
            .map(|transform| transform.local.position)
            .ok_or(RoomError::NoPlayer)?;

        let Some(door) = room.boundary.exit(&position, self.resolution) else {
            return Ok(None);
        };
        let Some(destination_name) = room.doors.get(&door) else {
            log::warn!("Room '{}' has no {} door, keeping the player inside", room.name, door);
            registry.teleport(player, room.boundary.clamp(position));
            return Ok(None);
        };
        let destination = self
            .map
            .room(destination_name)
            .ok_or_else(|| RoomError::UnknownRoom(destination_name.clone()))?;
        let entry = destination.boundary.entry_position(door, position, self.margin);
        let destination_name = destination_name.clone();

        let document = registry.read_scene(&destination_name)?;
        registry.teleport(player, entry);
        registry.delete_scene_except_player(&self.player_name);
        registry.append_scene(&document);
        self.state = RoomState::InRoom {
            current: destination_name.clone(),
        };

        self.spawn_enemies(registry, player)?;
        self.set_camera(registry, player);
        log::info!("Player went through the {} door into '{}'", door, destination_name);
        Ok(Some(destination_name))
    }

    /// Spawn the current room's living enemies at the player's height
    pub fn spawn_enemies(&self, registry: &mut SceneRegistry, player: Entity) -> GameResult<Vec<Entity>> {
        let Some(room) = self.current_room() else {
            return Ok(Vec::new());
        };
        let height = registry
            .world()
            .get_component::<TransformComponent>(player)
            .map_or(0.0, |transform| transform.local.position.y);

        room.enemies
            .iter()
            .filter(|enemy| enemy.alive)
            .map(|enemy| {
                let position = Vec3::new(enemy.spawn_point.x, height, enemy.spawn_point.y);
                spawn_enemy_anim(registry, position, Vec3::zeros(), &enemy.name, &enemy.prefab)
            })
            .collect()
    }

    /// Record that an enemy of the current room died at `position`
    pub fn set_enemy_death(&mut self, name: &str, position: Vec3) -> Result<(), RoomError> {
        let RoomState::InRoom { current } = &self.state else {
            return Err(RoomError::UnknownEnemy(name.to_string()));
        };
        let enemy = self
            .map
            .rooms
            .get_mut(current)
            .and_then(|room| room.enemy_mut(name))
            .ok_or_else(|| RoomError::UnknownEnemy(name.to_string()))?;
        enemy.alive = false;
        enemy.spawn_point = Vec2::new(position.x, position.z);
        log::debug!("Enemy '{}' died at {:?}", name, enemy.spawn_point);
        Ok(())
    }

    /// Follow the player with the room's camera. Any previous follow
    /// behavior on the camera is replaced.
    fn set_camera(&self, registry: &mut SceneRegistry, player: Entity) {
        let Some(room) = self.current_room() else {
            return;
        };
        let Some(camera) = registry.find_root(&self.camera_name) else {
            log::warn!("Room '{}' has no '{}' root", room.name, self.camera_name);
            return;
        };
        let follow = CameraFollowComponent {
            target: player,
            camera_type: room.camera_type,
        };
        let world = registry.world_mut();
        world.add_component(camera, follow);
        world.refresh(camera);
    }

    /// Re-enter the room matching `scene` after a scene change, or go idle
    /// when the scene is not one of the level's rooms
    pub fn sync_to_scene(&mut self, registry: &mut SceneRegistry, scene: &str, player: Entity) -> GameResult<()> {
        if self.map.room(scene).is_none() {
            self.state = RoomState::Idle;
            return Ok(());
        }
        self.state = RoomState::InRoom {
            current: scene.to_string(),
        };
        self.spawn_enemies(registry, player)?;
        self.set_camera(registry, player);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const ROOMS: &str = r#"
        <Root first_room="A">
          <Room name="A" camera_type="follow">
            <Boundary left="-10" right="10" up="5" down="-5"/>
            <Exit name="B" door="r"/>
            <Enemy name="Bat" prefab="Bat"><Position x="1" y="2"/></Enemy>
            <Enemy name="Bat" prefab="Bat" alive="false"><Position x="3" y="4"/></Enemy>
          </Room>
          <Room name="B" camera_type="fixed">
            <Boundary left="20" right="40" up="5" down="-5"/>
            <Exit name="A" door="l"/>
          </Room>
        </Root>"#;

    fn parse(text: &str) -> GameResult<RoomMap> {
        let root = XmlElement::parse(text).map_err(|source| SceneError::Xml {
            path: "rooms.xml".into(),
            source,
        })?;
        RoomMap::from_element(&root, Path::new("rooms.xml"))
    }

    fn boundary() -> Boundary {
        Boundary {
            left: -10.0,
            right: 10.0,
            up: 5.0,
            down: -5.0,
        }
    }

    #[test]
    fn test_parse_rooms_and_index_enemy_names() {
        let map = parse(ROOMS).expect("rooms");
        assert_eq!(map.first_room(), "A");
        let a = map.room("A").expect("A");
        assert_eq!(a.doors.get(&Door::Right).map(String::as_str), Some("B"));
        assert_eq!(a.camera_type, CameraMode::Follow);
        let names: Vec<&str> = a.enemies.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["Bat1", "Bat2"]);
        assert!(!a.enemy("Bat2").expect("bat2").alive);
        assert_relative_eq!(a.enemy("Bat1").expect("bat1").spawn_point, Vec2::new(1.0, 2.0));
        assert_eq!(map.room("B").expect("B").camera_type, CameraMode::Fixed);
    }

    #[test]
    fn test_invalid_files_are_rejected_at_load() {
        let cases = [
            (ROOMS.replace("first_room=\"A\"", "first_room=\"Z\""), "first room"),
            (ROOMS.replace("door=\"r\"", "door=\"x\""), "invalid door"),
            (ROOMS.replace("<Exit name=\"A\"", "<Exit name=\"Q\""), "unknown room"),
            (ROOMS.replace("name=\"B\" camera_type", "name=\"A\" camera_type"), "defined twice"),
            (ROOMS.replace("left=\"20\"", "left=\"50\""), "malformed boundary"),
            (ROOMS.replace("camera_type=\"fixed\"", "camera_type=\"orbit\""), "unknown camera"),
            (ROOMS.replacen("prefab=\"Bat\"", "prefab=\"\"", 1), "no prefab"),
        ];
        for (text, expected) in cases {
            let err = parse(&text).expect_err(expected);
            assert!(err.to_string().contains(expected), "{} does not mention {}", err, expected);
        }
    }

    #[test]
    fn test_exit_priority_and_deepest_crossing() {
        let bounds = boundary();
        let corner = Vec3::new(10.5, 0.0, 8.0);
        assert_eq!(bounds.exit(&corner, BoundaryResolution::FixedPriority), Some(Door::Right));
        assert_eq!(bounds.exit(&corner, BoundaryResolution::DeepestCrossing), Some(Door::Top));
        assert_eq!(bounds.exit(&Vec3::new(-11.0, 0.0, 0.0), BoundaryResolution::FixedPriority), Some(Door::Left));
        assert_eq!(bounds.exit(&Vec3::new(0.0, 0.0, -6.0), BoundaryResolution::FixedPriority), Some(Door::Bottom));
        assert_eq!(bounds.exit(&Vec3::new(10.0, 0.0, 5.0), BoundaryResolution::FixedPriority), None);
    }

    #[test]
    fn test_entry_position_is_inside_the_opposite_edge() {
        let b = boundary();
        let from = Vec3::new(10.1, 2.0, 3.0);
        assert_relative_eq!(b.entry_position(Door::Right, from, 1.5), Vec3::new(-8.5, 2.0, 3.0));
        assert_relative_eq!(b.entry_position(Door::Left, from, 1.5), Vec3::new(8.5, 2.0, 3.0));
        assert_relative_eq!(b.entry_position(Door::Top, from, 1.5), Vec3::new(10.1, 2.0, -3.5));
        assert_relative_eq!(b.entry_position(Door::Bottom, from, 1.5), Vec3::new(10.1, 2.0, 3.5));
        assert_relative_eq!(b.clamp(Vec3::new(12.0, 1.0, -9.0)), Vec3::new(10.0, 1.0, -5.0));
    }

    #[test]
    fn test_enemy_death_is_recorded_in_the_current_room() {
        let map = parse(ROOMS).expect("rooms");
        let mut controller = RoomController::new(map, &GameConfig::default());
        assert_eq!(
            controller.set_enemy_death("Bat1", Vec3::zeros()),
            Err(RoomError::UnknownEnemy("Bat1".to_string()))
        );

        controller.state = RoomState::InRoom { current: "A".to_string() };
        controller.set_enemy_death("Bat1", Vec3::new(7.0, 1.0, -2.0)).expect("death");
        let bat = controller.current_room().and_then(|room| room.enemy("Bat1")).expect("bat");
        assert!(!bat.alive);
        assert_relative_eq!(bat.spawn_point, Vec2::new(7.0, -2.0));
        assert!(controller.set_enemy_death("Ghost1", Vec3::zeros()).is_err());
    }

    #[test]
    fn test_process_reports_an_undefined_current_room() {
        let map = parse(ROOMS).expect("rooms");
        let mut controller = RoomController::new(map, &GameConfig::default());
        let mut registry = SceneRegistry::new("scenes", "prefabs");
        let player = registry.create_empty_object("Player");

        controller.state = RoomState::InRoom { current: "Nowhere".to_string() };
        let err = controller.process(&mut registry, player).unwrap_err();
        assert!(matches!(err, GameError::RoomState(RoomError::UnknownRoom(ref name)) if name == "Nowhere"));
        assert!(err.to_string().contains("room 'Nowhere' is not defined"));
    }
}
