//! Replica Logic Module
//!
//! Everything that mirrors and advances the world. No I/O, no clocks: time
//! only enters through the `dt` passed to each tick.
//!
//! ## Module Structure
//!
//! - `direction`: Cardinal directions and passability bits
//! - `region`: Terrain chunks and their passability grids
//! - `entity`: Entity kinds and the per-entity timer state machine
//! - `realm`: Indexed regions and entities, passability composition
//! - `interest`: Viewport-driven sight/unsight
//! - `input`: Per-tick avatar controls
//! - `interaction`: Interactions and prompts
//! - `resolver`: Avatar tick resolution
//! - `replica`: The client's mirror and its outbound queue

pub mod direction;
pub mod region;
pub mod entity;
pub mod realm;
pub mod interest;
pub mod input;
pub mod interaction;
pub mod resolver;
pub mod replica;

// Re-export key types
pub use direction::Direction;
pub use region::{Region, RegionKey, Layer, REGION_SIZE};
pub use entity::{Entity, EntityId, EntityKind, EntityType, Actor, Item, TimerKind};
pub use realm::{Realm, RealmId};
pub use interest::{InterestManager, InterestDelta};
pub use input::AvatarInput;
pub use interaction::{Interaction, InteractionAction, InteractionPrompt, Classification};
pub use resolver::TickOutcome;
pub use replica::{Replica, TickSummary};
