//! Realm
//!
//! The active realm: loaded regions and mirrored entities, spatial queries
//! over them, and the passability gate used by every move.
//! Uses BTreeMap for deterministic iteration order.

use std::collections::BTreeMap;
use std::fmt;
use serde::{Serialize, Deserialize};
use tracing::debug;

use crate::core::geometry::{Rectangle, Vector2};
use crate::core::hash::{StateHash, compute_state_hash};
use crate::game::direction::Direction;
use crate::game::entity::{Entity, EntityId, EntityKind};
use crate::game::region::{Region, RegionKey, REGION_SIZE, region_ceil, region_floor};

/// Server-assigned realm identifier.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RealmId(pub u32);

impl fmt::Display for RealmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "realm {}", self.0)
    }
}

/// Mirror of one realm.
#[derive(Clone, Debug)]
pub struct Realm {
    pub id: RealmId,
    pub name: String,
    /// Size in tiles
    pub size: Vector2,
    /// Terrain layer names, bottom first
    pub terrain_layers: Vec<String>,
    regions: BTreeMap<RegionKey, Region>,
    entities: BTreeMap<EntityId, Entity>,
}

impl Realm {
    /// Create an empty realm.
    pub fn new(id: RealmId, name: impl Into<String>, size: Vector2, terrain_layers: Vec<String>) -> Self {
        Self {
            id,
            name: name.into(),
            size,
            terrain_layers,
            regions: BTreeMap::new(),
            entities: BTreeMap::new(),
        }
    }

    /// Realm bounds `(0, 0, size.x, size.y)`.
    #[inline]
    pub fn bounds(&self) -> Rectangle {
        Rectangle::new(0.0, 0.0, self.size.x, self.size.y)
    }

    /// Realm bounds with right and bottom rounded up to the region grid.
    pub fn extended_bounds(&self) -> Rectangle {
        Rectangle::from_corners(0.0, 0.0, region_ceil(self.size.x), region_ceil(self.size.y))
    }

    // =========================================================================
    // Regions
    // =========================================================================

    /// Insert a region, returning the one it replaced.
    pub fn add_region(&mut self, region: Region) -> Option<Region> {
        self.regions.insert(region.key, region)
    }

    /// Remove the region at `key`.
    pub fn remove_region(&mut self, key: RegionKey) -> Option<Region> {
        self.regions.remove(&key)
    }

    /// Region whose origin is exactly `key`.
    pub fn region_at(&self, key: RegionKey) -> Option<&Region> {
        self.regions.get(&key)
    }

    /// Region containing `location`.
    pub fn closest_region_to(&self, location: Vector2) -> Option<&Region> {
        self.region_at(RegionKey::containing(location))
    }

    /// Every loaded region in key order.
    pub fn all_regions(&self) -> impl Iterator<Item = &Region> {
        self.regions.values()
    }

    /// Number of loaded regions.
    pub fn region_count(&self) -> usize {
        self.regions.len()
    }

    /// Keys of every region-grid cell intersecting `bounds`, loaded or not.
    pub fn intersecting_region_keys(bounds: &Rectangle) -> Vec<RegionKey> {
        let mut keys = Vec::new();
        let top = region_floor(bounds.top) as i32;
        let bottom = region_ceil(bounds.bottom()) as i32;
        let left = region_floor(bounds.left) as i32;
        let right = region_ceil(bounds.right()) as i32;

        for y in (top..bottom).step_by(REGION_SIZE as usize) {
            for x in (left..right).step_by(REGION_SIZE as usize) {
                keys.push(RegionKey { x, y });
            }
        }
        keys
    }

    // =========================================================================
    // Entities
    // =========================================================================

    /// Insert an entity, returning the one it replaced.
    pub fn add_entity(&mut self, entity: Entity) -> Option<Entity> {
        self.entities.insert(entity.id, entity)
    }

    pub fn remove_entity(&mut self, id: EntityId) -> Option<Entity> {
        self.entities.remove(&id)
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    /// Every entity in id order.
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    /// Remove every non-avatar entity located in the region at `key`.
    pub fn remove_entities_in(&mut self, key: RegionKey) -> Vec<EntityId> {
        let area = key.bounds();
        let evicted: Vec<EntityId> = self
            .entities
            .values()
            .filter(|e| !matches!(e.kind, EntityKind::Avatar(_)) && area.contains_point(e.location))
            .map(|e| e.id)
            .collect();

        for id in &evicted {
            self.entities.remove(id);
        }
        evicted
    }

    /// Advance every entity by `dt` and drop those whose death timer ran out.
    ///
    /// Returns the removed ids.
    pub fn update(&mut self, dt: f64) -> Vec<EntityId> {
        for entity in self.entities.values_mut() {
            entity.update(dt);
        }

        let expired: Vec<EntityId> = self
            .entities
            .values()
            .filter(|e| e.is_expired())
            .map(|e| e.id)
            .collect();

        for id in &expired {
            self.entities.remove(id);
            debug!(entity = %id, "Removed expired entity");
        }
        expired
    }

    // =========================================================================
    // Passability
    // =========================================================================

    /// Whether terrain allows entering `bounds` in `direction`.
    ///
    /// The bounds must lie inside the realm and every region they touch must
    /// be loaded; at least one of those regions must report the terrain
    /// passable.
    pub fn is_terrain_passable_by(&self, bounds: &Rectangle, direction: Direction) -> bool {
        if !self.bounds().contains(bounds) {
            return false;
        }

        let mut any_passable = false;
        for key in Self::intersecting_region_keys(bounds) {
            match self.regions.get(&key) {
                None => return false,
                Some(region) => any_passable |= region.is_terrain_passable_by(bounds, direction),
            }
        }
        any_passable
    }

    /// Whether `probe` may move from `source` into `target` in `direction`.
    ///
    /// Buildings overlapping either the source or the target are consulted so
    /// walls hold from both sides; other occupants only when they overlap the
    /// target.
    pub fn is_bounds_passable_by(
        &self,
        probe: &Entity,
        source: &Rectangle,
        target: &Rectangle,
        direction: Direction,
    ) -> bool {
        if !self.is_terrain_passable_by(target, direction) {
            return false;
        }

        self.entities.values().all(|occupant| {
            let bounds = occupant.bounds();
            let consulted = bounds.intersects(target)
                || (matches!(occupant.kind, EntityKind::Building { .. }) && bounds.intersects(source));
            !consulted || occupant.is_passable_by(probe, source, target, direction)
        })
    }

    /// Whether entity `id` may step one tile in `direction`.
    ///
    /// Unknown entities are never passable.
    pub fn is_passable_by(&self, id: EntityId, direction: Direction) -> bool {
        let Some(probe) = self.entities.get(&id) else {
            return false;
        };
        let source = probe.bounds();
        let target = source.offset(direction.vector());
        self.is_bounds_passable_by(probe, &source, &target, direction)
    }

    /// Deterministic digest of the mirrored state.
    pub fn compute_hash(&self) -> StateHash {
        compute_state_hash(self.id.0, |h| {
            h.update_str(&self.name);
            h.update_vec2(self.size);
            h.update_u32(self.regions.len() as u32);
            for region in self.regions.values() {
                region.hash_into(h);
            }
            h.update_u32(self.entities.len() as u32);
            for entity in self.entities.values() {
                entity.hash_into(h);
            }
        })
    }
}
