//! Protocol Messages
//!
//! Decoded packets exchanged with the realm server. The transport delivers
//! these already parsed; JSON helpers exist for logging and fixtures.

use serde::{Serialize, Deserialize};

use crate::core::geometry::Vector2;
use crate::game::direction::Direction;
use crate::game::entity::{Entity, EntityId, Item};
use crate::game::realm::RealmId;
use crate::game::region::RegionKey;

// =============================================================================
// SERVER -> CLIENT PACKETS
// =============================================================================

/// Terrain layer payload of a region packet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerPayload {
    /// Terrain type name.
    pub terrain: String,
    /// Row-major tile indices, `REGION_SIZE²` long.
    pub tiles: Vec<u32>,
}

/// Packets sent from server to client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundPacket {
    /// Switch to a new realm, dropping all mirrored state.
    Realm {
        id: RealmId,
        name: String,
        size: Vector2,
        #[serde(default)]
        terrain_layers: Vec<String>,
    },

    /// Terrain and passability for one region.
    Region {
        location: Vector2,
        realm_id: RealmId,
        layers: Vec<LayerPayload>,
        /// Row-major masks, `None` where unconstrained.
        passabilities: Vec<Option<u8>>,
    },

    /// An entity entered view.
    Entity { entity: Entity },

    /// The origin entity is the local avatar.
    Avatar {},

    /// The origin entity began a step.
    Move {
        #[serde(default)]
        direction: Option<Direction>,
    },

    /// The origin entity turned.
    Turn { direction: Direction },

    /// The origin entity stopped walking.
    StopMove {},

    /// Authoritative position for the origin entity.
    Teleport {
        location: Vector2,
        realm_id: RealmId,
        direction: Direction,
    },

    /// The origin entity left view or was destroyed.
    DespawnEntity {},

    /// An item was added to the avatar's inventory.
    Inventory { item: Item },

    /// The origin entity crossed into another region.
    RegionChange {
        location: Vector2,
        realm_id: RealmId,
    },

    /// The origin entity took damage.
    Damage { damage: i32 },
}

impl InboundPacket {
    /// Short name for diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            InboundPacket::Realm { .. } => "realm",
            InboundPacket::Region { .. } => "region",
            InboundPacket::Entity { .. } => "entity",
            InboundPacket::Avatar {} => "avatar",
            InboundPacket::Move { .. } => "move",
            InboundPacket::Turn { .. } => "turn",
            InboundPacket::StopMove {} => "stop_move",
            InboundPacket::Teleport { .. } => "teleport",
            InboundPacket::DespawnEntity {} => "despawn_entity",
            InboundPacket::Inventory { .. } => "inventory",
            InboundPacket::RegionChange { .. } => "region_change",
            InboundPacket::Damage { .. } => "damage",
        }
    }

    /// Realm id carried by the packet itself, if any.
    pub fn embedded_realm_id(&self) -> Option<RealmId> {
        match self {
            InboundPacket::Realm { id, .. } => Some(*id),
            InboundPacket::Region { realm_id, .. }
            | InboundPacket::Teleport { realm_id, .. }
            | InboundPacket::RegionChange { realm_id, .. } => Some(*realm_id),
            InboundPacket::Entity { entity } => Some(entity.realm_id),
            _ => None,
        }
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

/// A packet and the entity it concerns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Entity the packet is about, when any.
    #[serde(default)]
    pub origin: Option<EntityId>,
    /// The packet.
    pub packet: InboundPacket,
}

impl Envelope {
    /// Packet with no origin.
    pub fn new(packet: InboundPacket) -> Self {
        Self { origin: None, packet }
    }

    /// Packet about entity `origin`.
    pub fn from_entity(origin: EntityId, packet: InboundPacket) -> Self {
        Self {
            origin: Some(origin),
            packet,
        }
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

// =============================================================================
// CLIENT -> SERVER INTENTS
// =============================================================================

/// Requests sent from client to server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundIntent {
    /// Start streaming the region at `location`.
    Sight { location: RegionKey },

    /// Stop streaming the region at `location`.
    Unsight { location: RegionKey },

    /// The avatar stepped toward `location`.
    Move { location: Vector2 },

    /// The avatar turned.
    Turn { direction: Direction },

    /// The avatar stopped walking.
    StopMove,

    /// Pick up a drop.
    PickUp { drop_id: EntityId },

    /// Attack the listed actors.
    Attack { actor_ids: Vec<EntityId> },
}

impl OutboundIntent {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}
