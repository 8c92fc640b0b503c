//! Network Layer
//!
//! Protocol types, packet validation and the async session loop.
//! Encoding and sockets live with the transport, outside this crate.

pub mod protocol;
pub mod handlers;
pub mod session;

pub use protocol::{Envelope, InboundPacket, OutboundIntent, LayerPayload};
pub use handlers::{PacketRejection, apply, dispatch};
pub use session::{
    ReplicaSession, SessionConfig, SessionCommand, SessionEvent, SessionHandle,
    SessionError, FrameSnapshot,
};
