//! Realm Replica Demo
//!
//! Runs a replica session against a scripted in-process server: the avatar
//! walks east across a small realm while the viewport follows it.

use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use realm_replica::{
    VERSION, TICK_RATE,
    core::geometry::{Rectangle, Vector2},
    game::{
        direction::Direction,
        entity::{Actor, Entity, EntityId, EntityKind, Item},
        input::AvatarInput,
        realm::RealmId,
        region::{RegionKey, REGION_SIZE},
    },
    network::{
        protocol::{Envelope, InboundPacket, LayerPayload, OutboundIntent},
        session::{ReplicaSession, SessionCommand, SessionConfig, SessionEvent},
    },
};

const REALM: RealmId = RealmId(7);
const AVATAR: EntityId = EntityId(1);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Realm Replica v{}", VERSION);
    info!("Default Tick Rate: {} Hz", TICK_RATE);

    let config = SessionConfig::from_env();
    info!(?config, "Session config");

    let (session, handle) = ReplicaSession::new(config)?;
    let session_task = tokio::spawn(session.run());

    let inbound = handle.inbound;
    let commands = handle.commands;
    let mut outbound = handle.outbound;
    let mut events = handle.events;

    // Scripted server: answer sights with open terrain
    let server_inbound = inbound.clone();
    let server_task = tokio::spawn(async move {
        let mut sighted = 0usize;
        while let Some(intent) = outbound.recv().await {
            info!(intent = %intent.to_json().unwrap_or_default(), "Client sent");
            if let OutboundIntent::Sight { location } = intent {
                sighted += 1;
                if server_inbound.send(region_packet(location)).await.is_err() {
                    break;
                }
            }
        }
        sighted
    });

    let ui_task = tokio::spawn(async move {
        let mut frames = 0u64;
        while let Some(event) = events.recv().await {
            match event {
                SessionEvent::Frame(_) => frames += 1,
                SessionEvent::Prompt(prompt) => info!(choices = prompt.len(), "Interaction prompt"),
                SessionEvent::Contact(ids) => info!(?ids, "Avatar contact"),
            }
        }
        frames
    });

    // Realm, avatar and a drop on its path
    inbound
        .send(Envelope::new(InboundPacket::Realm {
            id: REALM,
            name: "Windmill Fields".into(),
            size: Vector2::new(64.0, 32.0),
            terrain_layers: vec!["grass".into()],
        }))
        .await?;

    let avatar = Entity::new(AVATAR, REALM, Vector2::new(2.0, 8.0), EntityKind::Player(Actor::new("Ada", 20)))
        .facing(Direction::E);
    inbound.send(Envelope::new(InboundPacket::Entity { entity: avatar })).await?;
    inbound.send(Envelope::from_entity(AVATAR, InboundPacket::Avatar {})).await?;

    let carrot = Entity::new(EntityId(2), REALM, Vector2::new(6.0, 8.0), EntityKind::Drop { item: Item::new("carrot") });
    inbound.send(Envelope::new(InboundPacket::Entity { entity: carrot })).await?;

    commands.send(SessionCommand::Viewport(Rectangle::new(0.0, 0.0, 16.0, 12.0))).await?;
    tokio::time::sleep(Duration::from_millis(100)).await;

    // Walk east, following with the viewport
    commands.send(SessionCommand::Input(AvatarInput::moving(Direction::E))).await?;
    for step in 1..=4 {
        tokio::time::sleep(Duration::from_millis(250)).await;
        let left = (step * 4) as f64;
        commands.send(SessionCommand::Viewport(Rectangle::new(left, 0.0, 16.0, 12.0))).await?;
    }

    commands.send(SessionCommand::Input(AvatarInput::new())).await?;
    tokio::time::sleep(Duration::from_millis(200)).await;
    commands.send(SessionCommand::Shutdown).await?;

    let replica = session_task.await??;
    drop(inbound);

    match replica.avatar() {
        Some(avatar) => info!(location = %avatar.location, "Avatar final position"),
        None => warn!("Avatar missing at shutdown"),
    }
    if let Some(realm) = replica.realm() {
        info!(regions = realm.region_count(), entities = realm.entities().count(), "Final realm");
    }

    let sighted = server_task.await?;
    let frames = ui_task.await?;
    info!(sighted, frames, "Demo finished");

    Ok(())
}

fn region_packet(location: RegionKey) -> Envelope {
    let cells = (REGION_SIZE * REGION_SIZE) as usize;
    Envelope::new(InboundPacket::Region {
        location: location.origin(),
        realm_id: REALM,
        layers: vec![LayerPayload { terrain: "grass".into(), tiles: vec![0; cells] }],
        passabilities: vec![None; cells],
    })
}
