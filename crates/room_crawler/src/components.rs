//! Game-specific components

use std::fmt;
use std::str::FromStr;

use scene_engine::ecs::components::NodeComponent;
use scene_engine::prelude::*;

/// Player input marker; the controller system reads input for these
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ControllerComponent {
    /// Input is ignored while disabled
    pub enabled: bool,
}

impl Component for ControllerComponent {}

impl ControllerComponent {
    /// An enabled controller
    pub fn new() -> Self {
        Self { enabled: true }
    }
}

/// Velocity and speeds for characters that walk
#[derive(Debug, Clone, PartialEq)]
pub struct MovementComponent {
    /// Current velocity
    pub velocity: Vec3,

    /// Walk speed in units per second
    pub walk_speed: f32,

    /// Initial jump velocity
    pub jump_speed: f32,
}

impl Component for MovementComponent {}

impl Default for MovementComponent {
    fn default() -> Self {
        Self {
            velocity: Vec3::zeros(),
            walk_speed: 5.0,
            jump_speed: 8.0,
        }
    }
}

/// Cardinal facing of a character
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Facing {
    /// Facing +z
    Up,
    /// Facing -z
    #[default]
    Down,
    /// Facing -x
    Left,
    /// Facing +x
    Right,
}

/// Which way a character is turned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CharacterRotationComponent {
    /// Current facing
    pub facing: Facing,
}

impl Component for CharacterRotationComponent {}

impl CharacterRotationComponent {
    /// Rotation component facing `facing`
    pub fn new(facing: Facing) -> Self {
        Self { facing }
    }
}

/// Enemy behavior state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AiState {
    /// Standing around
    #[default]
    Idle,
    /// Walking toward the player
    Chase,
}

/// Simple enemy brain
#[derive(Debug, Clone, PartialEq)]
pub struct EnemyAiComponent {
    /// Current behavior
    pub state: AiState,

    /// Distance at which the enemy notices the player
    pub aggro_radius: f32,
}

impl Component for EnemyAiComponent {}

impl Default for EnemyAiComponent {
    fn default() -> Self {
        Self {
            state: AiState::Idle,
            aggro_radius: 6.0,
        }
    }
}

/// Combat statistics
#[derive(Debug, Clone, PartialEq)]
pub struct StatsComponent {
    /// Current health
    pub health: i32,

    /// Health cap
    pub max_health: i32,

    /// Damage dealt per hit
    pub attack: i32,

    /// Damage absorbed per hit
    pub defense: i32,

    /// Attacks per second
    pub attack_speed: f32,
}

impl Component for StatsComponent {}

impl StatsComponent {
    /// Stats with full health
    pub fn new(max_health: i32, attack: i32, defense: i32, attack_speed: f32) -> Self {
        Self {
            health: max_health,
            max_health,
            attack,
            defense,
            attack_speed,
        }
    }

    /// Whether health has run out
    pub fn is_dead(&self) -> bool {
        self.health <= 0
    }

    /// Apply a hit, returning the damage actually taken
    pub fn take_hit(&mut self, attack: i32) -> i32 {
        let damage = (attack - self.defense).max(1);
        self.health = (self.health - damage).max(0);
        damage
    }
}

impl Default for StatsComponent {
    fn default() -> Self {
        Self::new(30, 5, 0, 1.0)
    }
}

/// Melee attack timing
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AttackComponent {
    /// Seconds until the next swing is allowed
    pub cooldown: f32,

    /// Whether a swing is in progress
    pub attacking: bool,
}

impl Component for AttackComponent {}

/// Skeletal animation clip selection
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationComponent {
    /// Skeleton/rig the clips belong to
    pub rig: String,

    /// First pose of the clip
    pub start_pose: String,

    /// Last pose of the clip
    pub end_pose: String,

    /// Playback speed multiplier
    pub speed: f32,

    /// Whether the clip loops
    pub looping: bool,
}

impl Component for AnimationComponent {}

impl AnimationComponent {
    /// A looping clip between two poses of `rig`
    pub fn looping(rig: impl Into<String>, start_pose: impl Into<String>, end_pose: impl Into<String>, speed: f32) -> Self {
        Self {
            rig: rig.into(),
            start_pose: start_pose.into(),
            end_pose: end_pose.into(),
            speed,
            looping: true,
        }
    }
}

/// Breadth-first flattening of a node's subtree.
///
/// Skinned characters look up their bones by index into `nodes`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NodeGraphComponent {
    /// Subtree nodes in breadth-first order, the root first
    pub nodes: Vec<Entity>,
}

impl Component for NodeGraphComponent {}

impl NodeGraphComponent {
    /// Flatten the subtree under `root`
    pub fn flatten(world: &World, root: Entity) -> Self {
        let mut nodes = Vec::new();
        let mut queue = std::collections::VecDeque::from([root]);
        while let Some(entity) = queue.pop_front() {
            nodes.push(entity);
            if let Some(node) = world.get_component::<NodeComponent>(entity) {
                queue.extend(node.children.iter().copied());
            }
        }
        Self { nodes }
    }

    /// First node in the graph with the given name
    pub fn find(&self, world: &World, name: &str) -> Option<Entity> {
        self.nodes.iter().copied().find(|&entity| {
            world
                .get_component::<NodeComponent>(entity)
                .is_some_and(|node| node.name == name)
        })
    }
}

/// Sound effect attached to an entity
#[derive(Debug, Clone, PartialEq)]
pub struct AudioComponent {
    /// Clip path relative to the level directory
    pub clip: String,
}

impl Component for AudioComponent {}

impl AudioComponent {
    /// Audio component playing `clip`
    pub fn new(clip: impl Into<String>) -> Self {
        Self { clip: clip.into() }
    }
}

/// What a pickup gives the player
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collectible {
    /// Restores health
    Heart,
    /// Temporary power boost
    Power,
}

/// Something the player can pick up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectibleComponent {
    /// Pickup type
    pub kind: Collectible,
}

impl Component for CollectibleComponent {}

/// Ways the player can interact with an object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interactable {
    /// Opens to reveal an item
    Chest,
    /// Pressed by attacking or stepping on it
    Button,
    /// Triggers when stood on
    StepOn,
}

/// Something the player can interact with
#[derive(Debug, Clone, PartialEq)]
pub struct InteractableComponent {
    /// Interaction type
    pub kind: Interactable,

    /// Reach in world units
    pub distance: f32,

    /// Set once the interaction has fired
    pub used: bool,
}

impl Component for InteractableComponent {}

impl InteractableComponent {
    /// Interactable with the default reach
    pub fn new(kind: Interactable) -> Self {
        Self {
            kind,
            distance: 1.0,
            used: false,
        }
    }
}

/// Level hazards
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environmental {
    /// Falling in respawns the player
    Hole,
}

/// A hazard in the level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvironmentalComponent {
    /// Hazard type
    pub kind: Environmental,
}

impl Component for EnvironmentalComponent {}

/// How a room's camera tracks its target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CameraMode {
    /// Camera stays where the scene put it
    Fixed,
    /// Camera follows on both ground axes
    #[default]
    Follow,
    /// Camera follows along x only
    FollowX,
    /// Camera follows along z only
    FollowZ,
}

impl FromStr for CameraMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fixed" | "static" => Ok(Self::Fixed),
            "follow" => Ok(Self::Follow),
            "follow_x" | "followx" => Ok(Self::FollowX),
            "follow_z" | "followz" => Ok(Self::FollowZ),
            _ => Err(s.to_string()),
        }
    }
}

impl fmt::Display for CameraMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Fixed => "fixed",
            Self::Follow => "follow",
            Self::FollowX => "follow_x",
            Self::FollowZ => "follow_z",
        };
        f.write_str(name)
    }
}

/// Camera behavior slot. A camera carries at most one; installing a new one
/// replaces the old.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CameraFollowComponent {
    /// Entity the camera tracks
    pub target: Entity,

    /// Tracking mode
    pub camera_type: CameraMode,
}

impl Component for CameraFollowComponent {}

/// Time- and cooldown-gated enemy factory
#[derive(Debug, Clone, PartialEq)]
pub struct SpawnerComponent {
    /// Display-name prefix for spawned instances
    pub name: String,

    /// Prefab spawned
    pub prefab: String,

    /// Spawn area bounds on x
    pub min_x: f32,
    /// Spawn area bounds on x
    pub max_x: f32,
    /// Spawn area bounds on z
    pub min_z: f32,
    /// Spawn area bounds on z
    pub max_z: f32,

    /// Height instances are placed at
    pub height: f32,

    /// Seconds of game time before the spawner starts
    pub start_time: f32,

    /// Seconds between spawns
    pub cooldown: f32,

    /// Seconds left until the next spawn
    pub curr_cooldown: f32,

    /// Instances produced so far
    pub curr_enemies: u32,

    /// Spawner retires once this many have been produced
    pub max_enemies: u32,

    /// Whether the initial batch has been produced
    pub initialized: bool,
}

impl Component for SpawnerComponent {}

impl SpawnerComponent {
    /// Spawner over the area centered at `center` with half-size `extents`
    pub fn new(name: impl Into<String>, prefab: impl Into<String>, center: Vec3, extents: Vec2) -> Self {
        Self {
            name: name.into(),
            prefab: prefab.into(),
            min_x: center.x - extents.x,
            max_x: center.x + extents.x,
            min_z: center.z - extents.y,
            max_z: center.z + extents.y,
            height: center.y,
            start_time: 0.0,
            cooldown: 1.0,
            curr_cooldown: 1.0,
            curr_enemies: 0,
            max_enemies: 1,
            initialized: false,
        }
    }

    /// Set the start gate
    pub fn with_start_time(mut self, start_time: f32) -> Self {
        self.start_time = start_time;
        self
    }

    /// Set the cooldown; the first spawn waits one full cooldown
    pub fn with_cooldown(mut self, cooldown: f32) -> Self {
        self.cooldown = cooldown;
        self.curr_cooldown = cooldown;
        self
    }

    /// Set the initial batch size and the total cap
    pub fn with_counts(mut self, initial: u32, max: u32) -> Self {
        self.curr_enemies = initial;
        self.max_enemies = max;
        self
    }
}

/// Which coordinates of the player a scene trigger overrides
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PositionOverride {
    /// Only the component along the trigger's axis
    Axis,
    /// The whole position
    #[default]
    Full,
}

/// World axis selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Axis {
    /// x
    #[default]
    X,
    /// y
    Y,
    /// z
    Z,
}

impl Axis {
    /// Index into a `Vec3`
    pub fn index(self) -> usize {
        match self {
            Self::X => 0,
            Self::Y => 1,
            Self::Z => 2,
        }
    }
}

/// Collision-gated transition to another scene
#[derive(Debug, Clone, PartialEq)]
pub struct SceneTriggerComponent {
    /// Hashed destination scene name
    pub scene_key: u32,

    /// Axis used by `PositionOverride::Axis`
    pub axis: Axis,

    /// Where the player appears in the destination scene
    pub new_position: Vec3,

    /// How `new_position` is applied
    pub override_mode: PositionOverride,
}

impl Component for SceneTriggerComponent {}

impl SceneTriggerComponent {
    /// Trigger moving the player to `new_position` in the scene keyed `scene_key`
    pub fn new(scene_key: u32, new_position: Vec3) -> Self {
        Self {
            scene_key,
            axis: Axis::X,
            new_position,
            override_mode: PositionOverride::Full,
        }
    }

    /// Override only `axis`
    pub fn along(mut self, axis: Axis) -> Self {
        self.axis = axis;
        self.override_mode = PositionOverride::Axis;
        self
    }

    /// Player position after the transition
    pub fn resolve(&self, current: Vec3) -> Vec3 {
        match self.override_mode {
            PositionOverride::Full => self.new_position,
            PositionOverride::Axis => {
                let mut position = current;
                let axis = self.axis.index();
                position[axis] = self.new_position[axis];
                position
            }
        }
    }
}

/// Scene transition marker on the singleton entity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameSceneComponent {
    /// `<Scene Num>` of the scene just installed
    pub level_index: i32,

    /// Set while the player still has to be respawned
    pub scene_changed: bool,
}

impl Component for GameSceneComponent {}

/// Global application state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppState {
    /// Gameplay systems run
    #[default]
    Play,
    /// Gameplay systems are skipped
    Paused,
}

/// State shared between gameplay systems
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GlobalData {
    /// The player root, once spawned
    pub player: Option<Entity>,

    /// Where the player appears after a scene change
    pub player_spawn: Vec3,
}
