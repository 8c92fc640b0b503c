//! Packet Handlers
//!
//! Validate each inbound packet against the replica and apply it. A packet
//! that refers to a stale realm or an unknown entity is rejected without
//! touching any state.

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::core::geometry::Vector2;
use crate::core::grid::{Grid, GridError};
use crate::game::entity::{Actor, Entity, EntityId, EntityKind};
use crate::game::realm::{Realm, RealmId};
use crate::game::region::{Layer, Region, RegionKey, REGION_SIZE};
use crate::game::replica::Replica;
use crate::network::protocol::{Envelope, InboundPacket, LayerPayload};

/// Why a packet was dropped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PacketRejection {
    #[error("no active realm")]
    NoActiveRealm,

    #[error("packet for realm {got} but active realm is {expected}")]
    RealmMismatch { expected: u32, got: u32 },

    #[error("unknown entity {0}")]
    UnknownEntity(EntityId),

    #[error("packet requires an origin entity")]
    MissingOrigin,

    #[error("no avatar assigned")]
    NoAvatar,

    #[error("entity {0} is not an actor")]
    NotAnActor(EntityId),

    #[error("malformed region at {location}: {reason}")]
    MalformedRegion { location: String, reason: String },
}

/// Apply `envelope`, logging and dropping it if rejected.
///
/// Returns true if the packet was applied.
pub fn dispatch(replica: &mut Replica, envelope: Envelope) -> bool {
    let name = envelope.packet.name();
    let origin = envelope.origin;
    match apply(replica, envelope) {
        Ok(()) => true,
        Err(rejection) => {
            warn!(packet = name, origin = ?origin, %rejection, "Dropped packet");
            false
        }
    }
}

/// Validate and apply one packet.
pub fn apply(replica: &mut Replica, envelope: Envelope) -> Result<(), PacketRejection> {
    let Envelope { origin, packet } = envelope;

    if let Some(realm_id) = packet.embedded_realm_id() {
        ensure_realm(replica, realm_id)?;
    }

    match packet {
        InboundPacket::Realm { id, name, size, terrain_layers } => {
            info!(realm = id.0, %name, "Entering realm");
            replica.set_realm(Realm::new(id, name, size, terrain_layers));
            Ok(())
        }

        InboundPacket::Region { location, realm_id, layers, passabilities } => {
            let region = build_region(location, realm_id, layers, passabilities)?;
            debug!(region = %region.key, "Loaded region");
            current_realm(replica)?.add_region(region);
            Ok(())
        }

        InboundPacket::Entity { mut entity } => {
            let avatar_id = replica.avatar_id();
            let realm = current_realm(replica)?;
            if realm.entity(entity.id).is_some() {
                return Ok(());
            }
            if Some(entity.id) == avatar_id {
                promote_to_avatar(&mut entity);
            }
            debug!(entity = %entity.id, kind = ?entity.entity_type(), "Spawned entity");
            realm.add_entity(entity);
            Ok(())
        }

        InboundPacket::Avatar {} => {
            let id = origin.ok_or(PacketRejection::MissingOrigin)?;
            let previous = replica.avatar_id().filter(|&prev| prev != id);
            let realm = current_realm(replica)?;
            match realm.entity(id) {
                None => return Err(PacketRejection::UnknownEntity(id)),
                Some(entity) if entity.actor().is_none() => return Err(PacketRejection::NotAnActor(id)),
                Some(_) => {}
            }
            if let Some(prev) = previous.and_then(|prev| realm.entity_mut(prev)) {
                demote_from_avatar(prev);
                debug!(entity = %prev.id, "Previous avatar demoted");
            }
            if let Some(entity) = realm.entity_mut(id) {
                promote_to_avatar(entity);
            }
            replica.set_avatar(id);
            info!(entity = %id, "Avatar assigned");
            Ok(())
        }

        InboundPacket::Move { direction } => {
            let Some(entity) = remote_entity(replica, origin)? else {
                return Ok(());
            };
            if let Some(direction) = direction {
                entity.direction = direction;
            }
            entity.begin_step();
            Ok(())
        }

        InboundPacket::Turn { direction } => {
            if let Some(entity) = remote_entity(replica, origin)? {
                entity.direction = direction;
            }
            Ok(())
        }

        InboundPacket::StopMove {} => {
            if let Some(actor) = remote_entity(replica, origin)?.and_then(|e| e.actor_mut()) {
                actor.moving = false;
            }
            Ok(())
        }

        InboundPacket::Teleport { location, direction, .. } => {
            let id = origin.ok_or(PacketRejection::MissingOrigin)?;
            let realm = current_realm(replica)?;
            let entity = realm.entity_mut(id).ok_or(PacketRejection::UnknownEntity(id))?;
            entity.teleport(location, direction);
            Ok(())
        }

        InboundPacket::DespawnEntity {} => {
            let id = origin.ok_or(PacketRejection::MissingOrigin)?;
            let realm = current_realm(replica)?;
            realm.remove_entity(id).ok_or(PacketRejection::UnknownEntity(id))?;
            debug!(entity = %id, "Despawned entity");
            Ok(())
        }

        InboundPacket::Inventory { item } => {
            let id = replica.avatar_id().ok_or(PacketRejection::NoAvatar)?;
            let realm = current_realm(replica)?;
            let entity = realm.entity_mut(id).ok_or(PacketRejection::UnknownEntity(id))?;
            let actor = entity.actor_mut().ok_or(PacketRejection::NotAnActor(id))?;
            actor.inventory.push(item);
            Ok(())
        }

        InboundPacket::RegionChange { location, .. } => {
            let id = origin.ok_or(PacketRejection::MissingOrigin)?;
            let avatar_id = replica.avatar_id();
            let cache_bounds = replica.cache_bounds();
            let realm = current_realm(replica)?;
            if realm.entity(id).is_none() {
                return Err(PacketRejection::UnknownEntity(id));
            }
            if Some(id) != avatar_id && !cache_bounds.contains_point(location) {
                realm.remove_entity(id);
                debug!(entity = %id, "Entity left cached area");
            }
            Ok(())
        }

        InboundPacket::Damage { damage } => {
            let id = origin.ok_or(PacketRejection::MissingOrigin)?;
            let realm = current_realm(replica)?;
            let entity = realm.entity_mut(id).ok_or(PacketRejection::UnknownEntity(id))?;
            let actor = entity.actor_mut().ok_or(PacketRejection::NotAnActor(id))?;
            actor.health = actor.health.saturating_sub(damage).max(0);
            if actor.health == 0 {
                entity.die();
                debug!(entity = %id, "Entity died");
            }
            Ok(())
        }
    }
}

// =============================================================================
// HELPERS
// =============================================================================

fn current_realm(replica: &mut Replica) -> Result<&mut Realm, PacketRejection> {
    replica.realm_mut().ok_or(PacketRejection::NoActiveRealm)
}

/// Packets naming a realm must name the active one.
fn ensure_realm(replica: &mut Replica, realm_id: RealmId) -> Result<(), PacketRejection> {
    let realm = current_realm(replica)?;
    if realm.id != realm_id {
        return Err(PacketRejection::RealmMismatch {
            expected: realm.id.0,
            got: realm_id.0,
        });
    }
    Ok(())
}

/// The origin entity, or `None` if it is the avatar (whose state is
/// predicted locally).
fn remote_entity(replica: &mut Replica, origin: Option<EntityId>) -> Result<Option<&mut Entity>, PacketRejection> {
    let id = origin.ok_or(PacketRejection::MissingOrigin)?;
    let avatar_id = replica.avatar_id();
    let realm = current_realm(replica)?;
    let entity = realm.entity_mut(id).ok_or(PacketRejection::UnknownEntity(id))?;
    if Some(id) == avatar_id {
        return Ok(None);
    }
    Ok(Some(entity))
}

fn promote_to_avatar(entity: &mut Entity) {
    if let EntityKind::Player(actor) = &mut entity.kind {
        let actor = std::mem::replace(actor, Actor::new("", 0));
        entity.kind = EntityKind::Avatar(actor);
    }
}

fn demote_from_avatar(entity: &mut Entity) {
    if let EntityKind::Avatar(actor) = &mut entity.kind {
        let actor = std::mem::replace(actor, Actor::new("", 0));
        entity.kind = EntityKind::Player(actor);
    }
}

fn build_region(
    location: Vector2,
    realm_id: RealmId,
    layers: Vec<LayerPayload>,
    passabilities: Vec<Option<u8>>,
) -> Result<Region, PacketRejection> {
    let key = RegionKey::containing(location);
    let malformed = |reason: String| PacketRejection::MalformedRegion {
        location: key.to_string(),
        reason,
    };

    if key.origin() != location {
        return Err(malformed(format!("origin {location} is not region-aligned")));
    }

    let size = REGION_SIZE as usize;
    let grid_error = |e: GridError| malformed(e.to_string());

    let layers = layers
        .into_iter()
        .map(|layer| -> Result<Layer, PacketRejection> {
            Ok(Layer {
                terrain: layer.terrain,
                tiles: Grid::from_vec(size, size, layer.tiles).map_err(grid_error)?,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    let passabilities = Grid::from_vec(size, size, passabilities).map_err(grid_error)?;

    Region::new(key, realm_id, layers, passabilities).map_err(grid_error)
}
