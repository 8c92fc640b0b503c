//! Core value primitives.
//!
//! Pure types with no knowledge of realms or packets. Every other module
//! builds on these.

pub mod geometry;
pub mod grid;
pub mod timer;
pub mod hash;

// Re-export core types
pub use geometry::{Rectangle, Vector2, Vector3};
pub use grid::{Grid, GridError};
pub use timer::CountdownTimer;
pub use hash::{StateHash, StateHasher, compute_state_hash};
