//! Avatar Tick Resolution
//!
//! Turns one tick of input into local, optimistic avatar actions and the
//! intents that confirm them with the server.
//!
//! Order per tick:
//! 1. Gate: nothing happens while any avatar timer is running
//! 2. Interact (takes priority over movement)
//! 3. Turn toward a newly requested direction
//! 4. Attack or step in the facing direction
//! 5. Stop walking once no direction is held

use tracing::debug;

use crate::core::geometry::Rectangle;
use crate::game::entity::{Entity, EntityId};
use crate::game::input::AvatarInput;
use crate::game::interaction::{Classification, Interaction, InteractionAction, InteractionPrompt};
use crate::game::realm::Realm;
use crate::network::protocol::OutboundIntent;

/// Result of resolving one avatar tick.
#[derive(Debug, Default)]
pub struct TickOutcome {
    /// Intents to send, in emission order
    pub intents: Vec<OutboundIntent>,
    /// Entities touched by a committed step
    pub contacts: Vec<EntityId>,
    /// Set when several interactions compete for the interact key
    pub prompt: Option<InteractionPrompt>,
}

/// Resolve one tick of `input` for the avatar `avatar_id`.
pub fn resolve_avatar(realm: &mut Realm, avatar_id: EntityId, input: &AvatarInput) -> TickOutcome {
    let mut outcome = TickOutcome::default();

    let Some(avatar) = realm.entity(avatar_id) else {
        return outcome;
    };
    if !avatar.are_all_timers_stopped() {
        return outcome;
    }

    // 1. Interact
    if input.interact_pressed() {
        let mut choices = gather_interactions(realm, avatar);
        match choices.len() {
            0 => {}
            1 => {
                let interaction = choices.remove(0);
                outcome.intents.extend(execute_interaction(realm, avatar_id, &interaction));
            }
            _ => outcome.prompt = Some(InteractionPrompt { choices }),
        }
        return outcome;
    }

    // 2. Movement
    match input.direction {
        Some(direction) => {
            if avatar.direction != direction {
                if let Some(avatar) = realm.entity_mut(avatar_id) {
                    avatar.turn(direction);
                }
                outcome.intents.push(OutboundIntent::Turn { direction });
                return outcome;
            }

            let source = avatar.bounds();
            let target = avatar.target_bounds();
            let target_location = avatar.target_location();

            if input.attack_held() {
                let actor_ids: Vec<EntityId> = others_touching(realm, avatar_id, &[target])
                    .filter(|e| e.actor().is_some())
                    .map(|e| e.id)
                    .collect();
                if let Some(avatar) = realm.entity_mut(avatar_id) {
                    avatar.begin_attack_cooldown();
                }
                outcome.intents.push(OutboundIntent::Attack { actor_ids });
                return outcome;
            }

            if realm.is_passable_by(avatar_id, direction) {
                outcome.contacts = others_touching(realm, avatar_id, &[source, target])
                    .map(|e| e.id)
                    .collect();
                for id in &outcome.contacts {
                    debug!(entity = %id, "Contact");
                }

                if let Some(avatar) = realm.entity_mut(avatar_id) {
                    avatar.begin_step();
                }
                outcome.intents.push(OutboundIntent::Move { location: target_location });
            }
        }
        None => {
            if let Some(actor) = realm.entity_mut(avatar_id).and_then(|e| e.actor_mut()) {
                if actor.moving {
                    actor.moving = false;
                    outcome.intents.push(OutboundIntent::StopMove);
                }
            }
        }
    }

    outcome
}

/// Interactions on offer around `avatar`, intersecting entities first.
pub fn gather_interactions(realm: &Realm, avatar: &Entity) -> Vec<Interaction> {
    let bounds = avatar.bounds();
    let forward = avatar.target_bounds();
    let reachable = realm.is_terrain_passable_by(&forward, avatar.direction);

    let mut choices = Vec::new();
    for entity in realm.entities().filter(|e| e.id != avatar.id) {
        if entity.bounds().intersects(&bounds) {
            choices.extend(entity.interactions(Classification::Intersecting));
        }
    }
    if reachable {
        for entity in realm.entities().filter(|e| e.id != avatar.id) {
            if entity.bounds().intersects(&forward) {
                choices.extend(entity.interactions(Classification::Adjacent));
            }
        }
    }
    choices
}

/// Carry out `interaction` for the avatar, returning the intents to send.
pub fn execute_interaction(realm: &mut Realm, avatar_id: EntityId, interaction: &Interaction) -> Vec<OutboundIntent> {
    debug!(title = %interaction.title, "Interaction");
    match &interaction.action {
        InteractionAction::PickUp { drop_id } => vec![OutboundIntent::PickUp { drop_id: *drop_id }],
        InteractionAction::Attack { actor_id } => {
            if let Some(avatar) = realm.entity_mut(avatar_id) {
                avatar.begin_attack_cooldown();
            }
            vec![OutboundIntent::Attack { actor_ids: vec![*actor_id] }]
        }
    }
}

fn others_touching<'a>(
    realm: &'a Realm,
    avatar_id: EntityId,
    areas: &'a [Rectangle],
) -> impl Iterator<Item = &'a Entity> + 'a {
    realm
        .entities()
        .filter(move |e| e.id != avatar_id && areas.iter().any(|a| e.bounds().intersects(a)))
}
