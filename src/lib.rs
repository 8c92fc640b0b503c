//! # Realm Replica
//!
//! Client-side mirror of a server-authoritative 2D tile world.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      REALM REPLICA                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/            - Value primitives                         │
//! │  ├── geometry.rs  - Vectors and rectangles                   │
//! │  ├── grid.rs      - Row-major cell grids                     │
//! │  ├── timer.rs     - Countdown timers                         │
//! │  └── hash.rs      - State digests for desync diagnostics     │
//! │                                                              │
//! │  game/            - Replica logic (no I/O)                   │
//! │  ├── direction.rs - Cardinal directions, passability bits    │
//! │  ├── region.rs    - Terrain chunks and passability           │
//! │  ├── entity.rs    - Entity kinds and timer state machine     │
//! │  ├── realm.rs     - Spatial index and passability gate       │
//! │  ├── interest.rs  - Viewport-driven sight/unsight            │
//! │  ├── input.rs     - Per-tick avatar controls                 │
//! │  ├── interaction.rs - Interactions and prompts             │
//! │  ├── resolver.rs  - Avatar movement and interaction          │
//! │  └── replica.rs   - Active realm, avatar, outbound queue     │
//! │                                                              │
//! │  network/         - Packets and the session loop             │
//! │  ├── protocol.rs  - Inbound packets, outbound intents        │
//! │  ├── handlers.rs  - Packet validation and application        │
//! │  └── session.rs   - Single-task tokio event loop             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Consistency
//!
//! The server owns the world. The replica only predicts the avatar's own
//! moves and evicts regions it stops watching; authoritative packets
//! (teleports, regions) overwrite local state and are never merged.
//! Packets naming a realm other than the active one are dropped.

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod game;
pub mod network;

// Re-export commonly used types
pub use crate::core::geometry::{Rectangle, Vector2, Vector3};
pub use game::{Direction, Entity, EntityId, EntityKind, Realm, RealmId, Region, RegionKey, Replica};
pub use network::{Envelope, InboundPacket, OutboundIntent, ReplicaSession, SessionConfig};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default simulation tick rate (Hz)
pub const TICK_RATE: u32 = 60;
