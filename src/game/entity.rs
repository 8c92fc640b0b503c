//! Entity Model
//!
//! Every mirrored entity shares a location, a bounding box, a facing and a
//! set of named countdown timers. Kind-specific data lives in `EntityKind`.
//!
//! Timers drive a small state machine:
//! - Idle: every timer stopped, commands accepted
//! - Moving: `Move` armed for `1 / speed`, location interpolated per tick
//! - Turning: `Turn` armed for `TURN_TIME`
//! - Dying: `Death` armed for `DEATH_TIME`, removed from the realm on expiry

use std::collections::BTreeMap;
use std::fmt;
use serde::{Serialize, Deserialize};

use crate::core::geometry::{Rectangle, Vector2};
use crate::core::hash::StateHasher;
use crate::core::timer::CountdownTimer;
use crate::game::direction::Direction;
use crate::game::interaction::{Classification, Interaction, InteractionAction};
use crate::game::realm::RealmId;

// =============================================================================
// CONSTANTS
// =============================================================================

/// Default actor speed in tiles per second.
pub const BASE_SPEED: f64 = 4.0;

/// Seconds a turn blocks further commands.
pub const TURN_TIME: f64 = 0.1;

/// Seconds between attacks.
pub const ATTACK_COOLDOWN: f64 = 0.5;

/// Seconds a dying entity lingers before removal.
pub const DEATH_TIME: f64 = 1.0;

fn default_speed() -> f64 {
    BASE_SPEED
}

// =============================================================================
// ENTITY ID
// =============================================================================

/// Server-assigned entity identifier, unique within a realm.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Named timers an entity may own.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerKind {
    /// Step in progress
    Move,
    /// Turn in progress
    Turn,
    /// Attack cooldown
    Attack,
    /// Death animation
    Death,
}

// =============================================================================
// ITEMS & ACTORS
// =============================================================================

/// An item, identified by its type name (e.g. `"carrot"`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Item type name
    #[serde(rename = "type")]
    pub kind: String,
}

impl Item {
    /// Create an item of the given type.
    pub fn new(kind: impl Into<String>) -> Self {
        Self { kind: kind.into() }
    }
}

/// Worn and wielded items.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Equipment {
    pub head: Option<Item>,
    pub torso: Option<Item>,
    pub legs: Option<Item>,
    pub feet: Option<Item>,
    pub weapon: Option<Item>,
}

/// Data shared by players, NPCs and the avatar.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Actor {
    /// Display name
    pub name: String,
    /// Hit points; the actor dies at zero
    pub health: i32,
    #[serde(default)]
    pub gender: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub hair: String,
    #[serde(default)]
    pub facial: String,
    #[serde(default)]
    pub equipment: Equipment,
    #[serde(default)]
    pub inventory: Vec<Item>,
    /// Set while stepping, cleared on stop
    #[serde(skip)]
    pub moving: bool,
    /// Tiles per second
    #[serde(default = "default_speed")]
    pub speed: f64,
}

impl Actor {
    /// An actor with default appearance and speed.
    pub fn new(name: impl Into<String>, health: i32) -> Self {
        Self {
            name: name.into(),
            health,
            gender: String::new(),
            body: String::new(),
            hair: String::new(),
            facial: String::new(),
            equipment: Equipment::default(),
            inventory: Vec::new(),
            moving: false,
            speed: BASE_SPEED,
        }
    }
}

// =============================================================================
// ENTITY KIND
// =============================================================================

/// Kind-specific entity data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EntityKind {
    Building { door_direction: Direction },
    Drop { item: Item },
    Tree { species: String, growth_stage: u32 },
    Player(Actor),
    Npc { actor: Actor, species: String },
    /// The player this client controls
    Avatar(Actor),
}

/// Fieldless discriminant of `EntityKind`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum EntityType {
    Building = 0,
    Drop = 1,
    Tree = 2,
    Player = 3,
    Npc = 4,
    Avatar = 5,
}

impl EntityKind {
    /// Discriminant of this kind.
    pub fn entity_type(&self) -> EntityType {
        match self {
            EntityKind::Building { .. } => EntityType::Building,
            EntityKind::Drop { .. } => EntityType::Drop,
            EntityKind::Tree { .. } => EntityType::Tree,
            EntityKind::Player(_) => EntityType::Player,
            EntityKind::Npc { .. } => EntityType::Npc,
            EntityKind::Avatar(_) => EntityType::Avatar,
        }
    }
}

// =============================================================================
// ENTITY
// =============================================================================

/// A mirrored entity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub realm_id: RealmId,
    /// Continuous location; integral whenever no step is in progress
    pub location: Vector2,
    /// Bounding box relative to `location`
    pub bbox: Rectangle,
    pub direction: Direction,
    pub kind: EntityKind,
    #[serde(skip)]
    timers: BTreeMap<TimerKind, CountdownTimer>,
    /// Distance left in the current step
    #[serde(skip)]
    step_remaining: f64,
}

impl Entity {
    /// Create an idle entity with a one-tile bounding box.
    pub fn new(id: EntityId, realm_id: RealmId, location: Vector2, kind: EntityKind) -> Self {
        Self {
            id,
            realm_id,
            location,
            bbox: Rectangle::new(0.0, 0.0, 1.0, 1.0),
            direction: Direction::default(),
            kind,
            timers: BTreeMap::new(),
            step_remaining: 0.0,
        }
    }

    /// Replace the bounding box.
    pub fn with_bbox(mut self, bbox: Rectangle) -> Self {
        self.bbox = bbox;
        self
    }

    /// Replace the facing.
    pub fn facing(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    /// Discriminant of this entity's kind.
    #[inline]
    pub fn entity_type(&self) -> EntityType {
        self.kind.entity_type()
    }

    /// World-space bounds.
    #[inline]
    pub fn bounds(&self) -> Rectangle {
        self.bbox.offset(self.location)
    }

    /// Location one step ahead in the facing direction.
    #[inline]
    pub fn target_location(&self) -> Vector2 {
        self.location + self.direction.vector()
    }

    /// Bounds one step ahead in the facing direction.
    #[inline]
    pub fn target_bounds(&self) -> Rectangle {
        self.bbox.offset(self.target_location())
    }

    pub fn actor(&self) -> Option<&Actor> {
        match &self.kind {
            EntityKind::Player(actor) | EntityKind::Avatar(actor) => Some(actor),
            EntityKind::Npc { actor, .. } => Some(actor),
            _ => None,
        }
    }

    pub fn actor_mut(&mut self) -> Option<&mut Actor> {
        match &mut self.kind {
            EntityKind::Player(actor) | EntityKind::Avatar(actor) => Some(actor),
            EntityKind::Npc { actor, .. } => Some(actor),
            _ => None,
        }
    }

    /// Tiles per second. Non-actors, and actors whose speed is not a
    /// positive finite number, use the base speed.
    pub fn speed(&self) -> f64 {
        self.actor()
            .map(|actor| actor.speed)
            .filter(|speed| speed.is_finite() && *speed > 0.0)
            .unwrap_or(BASE_SPEED)
    }

    // =========================================================================
    // Timers
    // =========================================================================

    /// Timer of the given kind, if the entity owns one.
    pub fn timer(&self, kind: TimerKind) -> Option<&CountdownTimer> {
        self.timers.get(&kind)
    }

    /// True if the timer is absent or stopped.
    pub fn is_timer_stopped(&self, kind: TimerKind) -> bool {
        self.timers.get(&kind).map_or(true, |t| t.is_stopped())
    }

    /// True only if every owned timer is stopped. Gates avatar commands.
    pub fn are_all_timers_stopped(&self) -> bool {
        self.timers.values().all(|t| t.is_stopped())
    }

    fn arm(&mut self, kind: TimerKind, duration: f64) {
        self.timers.entry(kind).or_default().reset(duration);
    }

    /// Arm the attack cooldown.
    pub fn begin_attack_cooldown(&mut self) {
        self.arm(TimerKind::Attack, ATTACK_COOLDOWN);
    }

    // =========================================================================
    // Commands
    // =========================================================================

    /// Face `direction`, arming `Turn` if the facing changes.
    ///
    /// Returns false if already facing that way.
    pub fn turn(&mut self, direction: Direction) -> bool {
        if self.direction == direction {
            return false;
        }
        self.direction = direction;
        self.arm(TimerKind::Turn, TURN_TIME);
        true
    }

    /// Start a one-tile step in the facing direction.
    ///
    /// A step still in progress is completed and snapped first.
    pub fn begin_step(&mut self) {
        if self.step_remaining > 0.0 {
            self.location = (self.location + self.direction.vector().scale(self.step_remaining)).round();
        }

        let speed = self.speed();
        self.step_remaining = 1.0;
        self.arm(TimerKind::Move, 1.0 / speed);
        if let Some(actor) = self.actor_mut() {
            actor.moving = true;
        }
    }

    /// Overwrite location and facing from an authoritative update.
    ///
    /// Cancels any step in progress.
    pub fn teleport(&mut self, location: Vector2, direction: Direction) {
        self.location = location;
        self.direction = direction;
        self.step_remaining = 0.0;
        if let Some(timer) = self.timers.get_mut(&TimerKind::Move) {
            timer.stop();
        }
        if let Some(actor) = self.actor_mut() {
            actor.moving = false;
        }
    }

    /// Start dying. Has no effect on an entity already dying.
    pub fn die(&mut self) {
        if self.timers.contains_key(&TimerKind::Death) {
            return;
        }
        self.arm(TimerKind::Death, DEATH_TIME);
    }

    /// True once the death timer has run out.
    pub fn is_expired(&self) -> bool {
        self.timers
            .get(&TimerKind::Death)
            .is_some_and(|t| t.is_stopped())
    }

    /// Advance timers and step interpolation by `dt` seconds.
    pub fn update(&mut self, dt: f64) {
        let stepping = !self.is_timer_stopped(TimerKind::Move);

        if stepping && self.step_remaining > 0.0 {
            let distance = (self.speed() * dt).min(self.step_remaining);
            self.location = self.location + self.direction.vector().scale(distance);
            self.step_remaining -= distance;
        }

        for timer in self.timers.values_mut() {
            timer.update(dt);
        }

        if stepping && self.is_timer_stopped(TimerKind::Move) {
            self.location = self.location.round();
            self.step_remaining = 0.0;
        }
    }

    // =========================================================================
    // Passability & interactions
    // =========================================================================

    /// Whether `probe`, moving from `source` to `target` in `direction`,
    /// may pass through this entity.
    pub fn is_passable_by(
        &self,
        probe: &Entity,
        source: &Rectangle,
        target: &Rectangle,
        direction: Direction,
    ) -> bool {
        match &self.kind {
            EntityKind::Building { door_direction } => {
                self.is_building_passable(*door_direction, source, target, direction)
            }
            EntityKind::Drop { .. } => true,
            EntityKind::Tree { .. } => false,
            EntityKind::Player(_) | EntityKind::Npc { .. } | EntityKind::Avatar(_) => {
                probe.id == self.id
            }
        }
    }

    /// Cell of the building's edge that holds the door.
    pub fn door_cell(&self, door_direction: Direction) -> Rectangle {
        let bounds = self.bounds();
        let mid_x = bounds.left + (bounds.width / 2.0).floor();
        let mid_y = bounds.top + (bounds.height / 2.0).floor();

        let cell = match door_direction {
            Direction::N => Vector2::new(mid_x, bounds.top),
            Direction::S => Vector2::new(mid_x, bounds.bottom() - 1.0),
            Direction::W => Vector2::new(bounds.left, mid_y),
            Direction::E => Vector2::new(bounds.right() - 1.0, mid_y),
        };
        Rectangle::unit_at(cell)
    }

    fn is_building_passable(
        &self,
        door_direction: Direction,
        source: &Rectangle,
        target: &Rectangle,
        direction: Direction,
    ) -> bool {
        let bounds = self.bounds();
        let door = self.door_cell(door_direction);

        if source.intersects(&bounds) {
            // Leaving is only possible through the door
            let doorstep = door.offset(door_direction.vector());
            bounds.contains(target)
                || (direction == door_direction && target.intersects(&doorstep))
        } else if target.intersects(&bounds) {
            direction == door_direction.opposite() && target.intersects(&door)
        } else {
            true
        }
    }

    /// Interactions this entity offers when classified as `classification`.
    pub fn interactions(&self, classification: Classification) -> Vec<Interaction> {
        match (&self.kind, classification) {
            (EntityKind::Drop { .. }, Classification::Intersecting) => vec![Interaction::new(
                "Pick up",
                InteractionAction::PickUp { drop_id: self.id },
            )],
            (EntityKind::Player(_) | EntityKind::Npc { .. }, Classification::Adjacent) => {
                vec![Interaction::new(
                    "Attack",
                    InteractionAction::Attack { actor_id: self.id },
                )]
            }
            _ => Vec::new(),
        }
    }

    /// Feed this entity into a state digest.
    pub fn hash_into(&self, hasher: &mut StateHasher) {
        hasher.update_u64(self.id.0);
        hasher.update_u32(self.realm_id.0);
        hasher.update_vec2(self.location);
        hasher.update_rect(&self.bbox);
        hasher.update_u8(self.direction as u8);
        hasher.update_u8(self.entity_type() as u8);
        if let Some(actor) = self.actor() {
            hasher.update_i32(actor.health);
            hasher.update_u32(actor.inventory.len() as u32);
            hasher.update_bool(actor.moving);
        }
        for (kind, timer) in &self.timers {
            hasher.update_u8(*kind as u8);
            hasher.update_f64(timer.remaining());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(id: u64, x: f64, y: f64) -> Entity {
        Entity::new(
            EntityId(id),
            RealmId(1),
            Vector2::new(x, y),
            EntityKind::Player(Actor::new("p", 10)),
        )
    }

    fn building(door: Direction) -> Entity {
        // 3x3 building covering (10..13, 10..13)
        Entity::new(
            EntityId(100),
            RealmId(1),
            Vector2::new(10.0, 10.0),
            EntityKind::Building { door_direction: door },
        )
        .with_bbox(Rectangle::new(0.0, 0.0, 3.0, 3.0))
    }

    fn probe_step(building: &Entity, from: Vector2, direction: Direction) -> bool {
        let probe = player(1, from.x, from.y);
        let source = probe.bounds();
        let target = source.offset(direction.vector());
        building.is_passable_by(&probe, &source, &target, direction)
    }

    #[test]
    fn test_turn_arms_timer_and_keeps_location() {
        let mut e = player(1, 5.0, 5.0);
        assert!(e.are_all_timers_stopped());

        assert!(e.turn(Direction::E));
        assert_eq!(e.direction, Direction::E);
        assert_eq!(e.location, Vector2::new(5.0, 5.0));
        assert!(!e.is_timer_stopped(TimerKind::Turn));
        assert!(!e.are_all_timers_stopped());

        // Same facing is a no-op
        e.update(TURN_TIME);
        assert!(!e.turn(Direction::E));
        assert!(e.are_all_timers_stopped());
    }

    #[test]
    fn test_step_arms_move_and_keeps_facing() {
        let mut e = player(1, 5.0, 5.0).facing(Direction::N);
        e.begin_step();
        assert_eq!(e.direction, Direction::N);
        let timer = e.timer(TimerKind::Move).unwrap();
        assert!((timer.duration() - 1.0 / BASE_SPEED).abs() < 1e-12);
        assert!(e.actor().unwrap().moving);
    }

    #[test]
    fn test_unusable_speed_falls_back_to_base() {
        for bad in [0.0, -2.0, f64::NAN, f64::INFINITY] {
            let mut e = player(1, 5.0, 5.0).facing(Direction::E);
            e.actor_mut().unwrap().speed = bad;
            assert_eq!(e.speed(), BASE_SPEED);

            e.begin_step();
            for _ in 0..3 {
                e.update(0.1);
            }
            assert_eq!(e.location, Vector2::new(6.0, 5.0));
            assert!(e.are_all_timers_stopped());
        }
    }

    #[test]
    fn test_step_lands_exactly_on_target() {
        let mut e = player(1, 5.0, 5.0).facing(Direction::E);
        e.begin_step();

        for dt in [0.1, 0.05, 0.07, 0.03] {
            e.update(dt);
        }
        assert!(e.are_all_timers_stopped());
        assert_eq!(e.location, Vector2::new(6.0, 5.0));
    }

    #[test]
    fn test_step_interpolates() {
        let mut e = player(1, 0.0, 0.0).facing(Direction::S);
        e.begin_step();
        e.update(0.125);
        assert!((e.location.y - 0.5).abs() < 1e-12);
        assert_eq!(e.location.x, 0.0);
    }

    #[test]
    fn test_step_while_stepping_snaps_first() {
        let mut e = player(1, 0.0, 0.0).facing(Direction::E);
        e.begin_step();
        e.update(0.1);
        e.begin_step();
        assert_eq!(e.location, Vector2::new(1.0, 0.0));

        e.update(1.0);
        assert_eq!(e.location, Vector2::new(2.0, 0.0));
    }

    #[test]
    fn test_teleport_cancels_step() {
        let mut e = player(1, 0.0, 0.0).facing(Direction::E);
        e.begin_step();
        e.update(0.1);
        e.teleport(Vector2::new(40.0, 3.0), Direction::W);
        assert!(e.are_all_timers_stopped());
        assert_eq!(e.location, Vector2::new(40.0, 3.0));
        assert!(!e.actor().unwrap().moving);

        e.update(1.0);
        assert_eq!(e.location, Vector2::new(40.0, 3.0));
    }

    #[test]
    fn test_death_expires() {
        let mut e = player(1, 0.0, 0.0);
        e.die();
        assert!(!e.is_expired());
        e.update(DEATH_TIME / 2.0);
        e.die();
        assert!(!e.is_expired());
        e.update(DEATH_TIME / 2.0);
        assert!(e.is_expired());
    }

    #[test]
    fn test_kind_passability() {
        let probe = player(1, 0.0, 0.0);
        let src = probe.bounds();
        let dst = probe.target_bounds();

        let drop = Entity::new(EntityId(2), RealmId(1), Vector2::new(0.0, 1.0), EntityKind::Drop { item: Item::new("carrot") });
        let tree = Entity::new(
            EntityId(3),
            RealmId(1),
            Vector2::new(0.0, 1.0),
            EntityKind::Tree { species: "oak".into(), growth_stage: 2 },
        );
        let other = player(4, 0.0, 1.0);

        assert!(drop.is_passable_by(&probe, &src, &dst, Direction::S));
        assert!(!tree.is_passable_by(&probe, &src, &dst, Direction::S));
        assert!(!other.is_passable_by(&probe, &src, &dst, Direction::S));
        assert!(probe.is_passable_by(&probe, &src, &dst, Direction::S));
    }

    #[test]
    fn test_building_door_south() {
        let b = building(Direction::S);
        // Door cell (11, 12), doorstep (11, 13)
        assert!(probe_step(&b, Vector2::new(11.0, 13.0), Direction::N));
        assert!(!probe_step(&b, Vector2::new(10.0, 13.0), Direction::N));
        assert!(!probe_step(&b, Vector2::new(11.0, 9.0), Direction::S));
        assert!(probe_step(&b, Vector2::new(11.0, 12.0), Direction::S));
        assert!(!probe_step(&b, Vector2::new(10.0, 12.0), Direction::S));
        assert!(probe_step(&b, Vector2::new(11.0, 11.0), Direction::W));
    }

    #[test]
    fn test_building_door_north() {
        let b = building(Direction::N);
        // Door cell (11, 10), doorstep (11, 9)
        assert!(probe_step(&b, Vector2::new(11.0, 9.0), Direction::S));
        assert!(!probe_step(&b, Vector2::new(11.0, 13.0), Direction::N));
        assert!(probe_step(&b, Vector2::new(11.0, 10.0), Direction::N));
        assert!(!probe_step(&b, Vector2::new(12.0, 10.0), Direction::N));
    }

    #[test]
    fn test_building_door_west() {
        let b = building(Direction::W);
        // Door cell (10, 11), doorstep (9, 11)
        assert!(probe_step(&b, Vector2::new(9.0, 11.0), Direction::E));
        assert!(!probe_step(&b, Vector2::new(9.0, 10.0), Direction::E));
        assert!(probe_step(&b, Vector2::new(10.0, 11.0), Direction::W));
        assert!(!probe_step(&b, Vector2::new(12.0, 11.0), Direction::E));
    }

    #[test]
    fn test_building_door_east() {
        let b = building(Direction::E);
        // Door cell (12, 11), doorstep (13, 11)
        assert!(probe_step(&b, Vector2::new(13.0, 11.0), Direction::W));
        assert!(!probe_step(&b, Vector2::new(13.0, 12.0), Direction::W));
        assert!(probe_step(&b, Vector2::new(12.0, 11.0), Direction::E));
        assert!(!probe_step(&b, Vector2::new(10.0, 11.0), Direction::W));
    }

    #[test]
    fn test_declared_interactions() {
        let drop = Entity::new(EntityId(2), RealmId(1), Vector2::ZERO, EntityKind::Drop { item: Item::new("dagger") });
        assert_eq!(
            drop.interactions(Classification::Intersecting),
            vec![Interaction::new("Pick up", InteractionAction::PickUp { drop_id: EntityId(2) })]
        );
        assert!(drop.interactions(Classification::Adjacent).is_empty());

        let npc = Entity::new(
            EntityId(3),
            RealmId(1),
            Vector2::ZERO,
            EntityKind::Npc { actor: Actor::new("rat", 3), species: "rat".into() },
        );
        assert_eq!(npc.interactions(Classification::Adjacent).len(), 1);
        assert!(npc.interactions(Classification::Intersecting).is_empty());
    }

    #[test]
    fn test_entity_json_defaults() {
        let json = r#"{
            "id": 9, "realm_id": 7,
            "location": {"x": 3.0, "y": 4.0},
            "bbox": {"left": 0.0, "top": 0.0, "width": 1.0, "height": 1.0},
            "direction": "e",
            "kind": {"type": "player", "name": "alice", "health": 20}
        }"#;
        let e: Entity = serde_json::from_str(json).unwrap();
        assert_eq!(e.id, EntityId(9));
        assert_eq!(e.entity_type(), EntityType::Player);
        assert_eq!(e.speed(), BASE_SPEED);
        assert!(e.are_all_timers_stopped());
    }
}
