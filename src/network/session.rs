//! Replica Session
//!
//! Drives a `Replica` from one tokio task. Inbound packets, local commands,
//! simulation ticks and render ticks are all drained by a single
//! `tokio::select!`, so the replica is never touched concurrently.

use std::time::Duration;
use serde::{Serialize, Deserialize};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, instrument};

use crate::core::geometry::{Rectangle, Vector2};
use crate::game::entity::EntityId;
use crate::game::input::AvatarInput;
use crate::game::interaction::InteractionPrompt;
use crate::game::replica::Replica;
use crate::network::handlers::dispatch;
use crate::network::protocol::{Envelope, OutboundIntent};
use crate::TICK_RATE;

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Highest accepted tick or render rate (Hz). Periods are whole microseconds.
pub const MAX_RATE: u32 = 1_000_000;

/// Widest accepted viewport padding, in regions.
pub const MAX_CACHE_MARGIN: u32 = 64;

/// Session configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Simulation ticks per second.
    pub tick_rate: u32,
    /// Render frames per second.
    pub render_rate: u32,
    /// Capacity of each session channel.
    pub channel_capacity: usize,
    /// Regions of padding around the viewport.
    pub cache_margin: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tick_rate: TICK_RATE,
            render_rate: 30,
            channel_capacity: 256,
            cache_margin: 1,
        }
    }
}

impl SessionConfig {
    /// Load from `REPLICA_*` environment variables, falling back to defaults
    /// for anything unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            tick_rate: env_or("REPLICA_TICK_RATE", defaults.tick_rate),
            render_rate: env_or("REPLICA_RENDER_RATE", defaults.render_rate),
            channel_capacity: env_or("REPLICA_CHANNEL_CAPACITY", defaults.channel_capacity),
            cache_margin: env_or("REPLICA_CACHE_MARGIN", defaults.cache_margin),
        }
    }

    /// Parse from a JSON document. Missing fields take their defaults.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    /// Reject rates that would make the tick intervals meaningless.
    pub fn validate(&self) -> Result<(), SessionError> {
        if self.tick_rate == 0 || self.render_rate == 0 {
            return Err(SessionError::InvalidConfig("rates must be positive".into()));
        }
        if self.tick_rate > MAX_RATE || self.render_rate > MAX_RATE {
            return Err(SessionError::InvalidConfig(format!("rates must not exceed {MAX_RATE} Hz")));
        }
        if self.cache_margin > MAX_CACHE_MARGIN {
            return Err(SessionError::InvalidConfig(format!(
                "cache margin must not exceed {MAX_CACHE_MARGIN} regions"
            )));
        }
        if self.channel_capacity == 0 {
            return Err(SessionError::InvalidConfig("channel capacity must be positive".into()));
        }
        Ok(())
    }

    /// Seconds per simulation tick.
    pub fn tick_seconds(&self) -> f64 {
        1.0 / self.tick_rate as f64
    }
}

/// Interval period for a validated rate.
fn period(rate: u32) -> Duration {
    Duration::from_micros(1_000_000 / u64::from(rate.clamp(1, MAX_RATE)))
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

// =============================================================================
// MESSAGES
// =============================================================================

/// Local commands for the session.
#[derive(Debug, Clone)]
pub enum SessionCommand {
    /// Replace the held controls.
    Input(AvatarInput),
    /// The viewport moved or was resized.
    Viewport(Rectangle),
    /// Pick a choice from the pending interaction prompt.
    ChooseInteraction(usize),
    /// Stop the session.
    Shutdown,
}

/// What the renderer needs each frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameSnapshot {
    /// Avatar location, once known.
    pub avatar_location: Option<Vector2>,
    /// Mirrored entity count.
    pub entities: usize,
    /// Loaded region count.
    pub regions: usize,
}

/// Notifications for the UI layer.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Render tick.
    Frame(FrameSnapshot),
    /// Several interactions are on offer.
    Prompt(InteractionPrompt),
    /// The avatar stepped into or onto these entities.
    Contact(Vec<EntityId>),
}

/// Session errors.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Configuration cannot drive a session.
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Nobody is receiving outbound intents.
    #[error("Outbound channel closed")]
    OutboundClosed,

    /// Nobody is receiving session events.
    #[error("Event channel closed")]
    EventsClosed,
}

/// Channel ends held by the code that feeds and observes a session.
pub struct SessionHandle {
    /// Decoded packets from the transport.
    pub inbound: mpsc::Sender<Envelope>,
    /// Local commands.
    pub commands: mpsc::Sender<SessionCommand>,
    /// Intents for the transport to send.
    pub outbound: mpsc::Receiver<OutboundIntent>,
    /// UI notifications.
    pub events: mpsc::Receiver<SessionEvent>,
}

// =============================================================================
// SESSION
// =============================================================================

/// A replica bound to its channels.
pub struct ReplicaSession {
    config: SessionConfig,
    replica: Replica,
    inbound: mpsc::Receiver<Envelope>,
    commands: mpsc::Receiver<SessionCommand>,
    outbound: mpsc::Sender<OutboundIntent>,
    events: mpsc::Sender<SessionEvent>,
    input: AvatarInput,
    ticks: u64,
}

impl ReplicaSession {
    /// Create a session and the handle used to drive it.
    pub fn new(config: SessionConfig) -> Result<(Self, SessionHandle), SessionError> {
        config.validate()?;

        let capacity = config.channel_capacity;
        let (inbound_tx, inbound_rx) = mpsc::channel(capacity);
        let (command_tx, command_rx) = mpsc::channel(capacity);
        let (outbound_tx, outbound_rx) = mpsc::channel(capacity);
        let (event_tx, event_rx) = mpsc::channel(capacity);

        let session = Self {
            replica: Replica::new(config.cache_margin),
            config,
            inbound: inbound_rx,
            commands: command_rx,
            outbound: outbound_tx,
            events: event_tx,
            input: AvatarInput::new(),
            ticks: 0,
        };
        let handle = SessionHandle {
            inbound: inbound_tx,
            commands: command_tx,
            outbound: outbound_rx,
            events: event_rx,
        };
        Ok((session, handle))
    }

    /// Run until shutdown or until the inbound channel closes.
    ///
    /// Returns the replica in its final state.
    #[instrument(skip(self), fields(tick_rate = self.config.tick_rate))]
    pub async fn run(mut self) -> Result<Replica, SessionError> {
        let dt = self.config.tick_seconds();

        let mut sim = interval(period(self.config.tick_rate));
        sim.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut render = interval(period(self.config.render_rate));
        render.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!("Replica session started");

        loop {
            tokio::select! {
                biased;

                packet = self.inbound.recv() => match packet {
                    Some(envelope) => {
                        dispatch(&mut self.replica, envelope);
                        self.flush().await?;
                    }
                    None => {
                        info!("Inbound channel closed");
                        break;
                    }
                },

                command = self.commands.recv() => match command {
                    Some(SessionCommand::Input(input)) => self.input = input,
                    Some(SessionCommand::Viewport(viewport)) => {
                        self.replica.set_viewport(viewport);
                        self.flush().await?;
                    }
                    Some(SessionCommand::ChooseInteraction(index)) => {
                        if !self.replica.choose_interaction(index) {
                            debug!(index, "No interaction to choose");
                        }
                        self.flush().await?;
                    }
                    Some(SessionCommand::Shutdown) | None => {
                        info!("Shutdown requested");
                        break;
                    }
                },

                _ = sim.tick() => {
                    self.simulate(dt)?;
                    self.flush().await?;
                }

                _ = render.tick() => {
                    self.render()?;
                }
            }
        }

        if let Some(hash) = self.replica.compute_hash() {
            info!(ticks = self.ticks, digest = %hex::encode(hash), "Replica session stopped");
        }
        Ok(self.replica)
    }

    fn simulate(&mut self, dt: f64) -> Result<(), SessionError> {
        let summary = self.replica.tick(dt, &self.input);
        self.ticks += 1;

        // Interact is a press, not a hold
        self.input.flags &= !AvatarInput::FLAG_INTERACT;

        for id in &summary.expired {
            debug!(entity = %id, "Entity expired");
        }
        if !summary.contacts.is_empty() {
            debug!(count = summary.contacts.len(), "Avatar contact");
            self.emit(SessionEvent::Contact(summary.contacts))?;
        }
        if let Some(prompt) = summary.prompt {
            self.emit(SessionEvent::Prompt(prompt))?;
        }

        #[cfg(feature = "debug-tracing")]
        if let Some(hash) = self.replica.compute_hash() {
            debug!(tick = self.ticks, digest = %hex::encode(hash), "Replica digest");
        }

        Ok(())
    }

    fn render(&mut self) -> Result<(), SessionError> {
        let snapshot = FrameSnapshot {
            avatar_location: self.replica.avatar().map(|a| a.location),
            entities: self.replica.realm().map_or(0, |r| r.entities().count()),
            regions: self.replica.realm().map_or(0, |r| r.region_count()),
        };
        self.emit(SessionEvent::Frame(snapshot))
    }

    /// Frames and prompts are lossy: a full channel drops the event.
    fn emit(&self, event: SessionEvent) -> Result<(), SessionError> {
        match self.events.try_send(event) {
            Ok(()) | Err(TrySendError::Full(_)) => Ok(()),
            Err(TrySendError::Closed(_)) => Err(SessionError::EventsClosed),
        }
    }

    async fn flush(&mut self) -> Result<(), SessionError> {
        for intent in self.replica.take_intents() {
            self.outbound
                .send(intent)
                .await
                .map_err(|_| SessionError::OutboundClosed)?;
        }
        Ok(())
    }
}
