//! Replica
//!
//! Client-side owner of the mirrored world: the active realm, which entity
//! is the avatar, the interest set, and the queue of intents waiting to be
//! sent.

use std::mem;
use tracing::debug;

use crate::core::geometry::{Rectangle, Vector2};
use crate::core::hash::StateHash;
use crate::game::entity::{Entity, EntityId};
use crate::game::input::AvatarInput;
use crate::game::interaction::{Classification, InteractionPrompt};
use crate::game::interest::{InterestManager, cache_bounds_for_viewport};
use crate::game::realm::Realm;
use crate::game::resolver::{execute_interaction, resolve_avatar};
use crate::network::protocol::OutboundIntent;

/// What a simulation tick changed, beyond queued intents.
#[derive(Debug, Default)]
pub struct TickSummary {
    /// Entities removed after their death timer ran out
    pub expired: Vec<EntityId>,
    /// Entities the avatar touched with a step
    pub contacts: Vec<EntityId>,
    /// Interactions waiting for the caller to pick one
    pub prompt: Option<InteractionPrompt>,
}

/// The client's mirror of the world.
#[derive(Debug, Default)]
pub struct Replica {
    realm: Option<Realm>,
    avatar_id: Option<EntityId>,
    interest: InterestManager,
    outbox: Vec<OutboundIntent>,
    prompt: Option<InteractionPrompt>,
    cache_margin: u32,
}

impl Replica {
    /// Create an empty replica. Cache bounds pad the viewport by
    /// `cache_margin` regions.
    pub fn new(cache_margin: u32) -> Self {
        Self {
            cache_margin,
            ..Self::default()
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn realm(&self) -> Option<&Realm> {
        self.realm.as_ref()
    }

    pub fn realm_mut(&mut self) -> Option<&mut Realm> {
        self.realm.as_mut()
    }

    pub fn avatar_id(&self) -> Option<EntityId> {
        self.avatar_id
    }

    /// The avatar entity, if known and present in the active realm.
    pub fn avatar(&self) -> Option<&Entity> {
        let id = self.avatar_id?;
        self.realm.as_ref()?.entity(id)
    }

    /// Current cache bounds.
    pub fn cache_bounds(&self) -> Rectangle {
        self.interest.cache_bounds()
    }

    /// Pending interaction choice, if any.
    pub fn prompt(&self) -> Option<&InteractionPrompt> {
        self.prompt.as_ref()
    }

    /// Digest of the active realm.
    pub fn compute_hash(&self) -> Option<StateHash> {
        self.realm.as_ref().map(Realm::compute_hash)
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    /// Replace the active realm wholesale. The interest set starts over.
    pub fn set_realm(&mut self, realm: Realm) {
        self.realm = Some(realm);
        self.interest.reset();
        self.prompt = None;
    }

    /// Record which entity is the avatar.
    pub fn set_avatar(&mut self, id: EntityId) {
        self.avatar_id = Some(id);
    }

    /// Queue an intent for sending.
    pub fn push_intent(&mut self, intent: OutboundIntent) {
        self.outbox.push(intent);
    }

    /// Take every queued intent.
    pub fn take_intents(&mut self) -> Vec<OutboundIntent> {
        mem::take(&mut self.outbox)
    }

    /// Refit the interest set to a new viewport.
    pub fn set_viewport(&mut self, viewport: Rectangle) {
        let bounds = cache_bounds_for_viewport(&viewport, self.cache_margin);
        self.set_cache_bounds(bounds);
    }

    /// Move the interest set to exactly `bounds`.
    pub fn set_cache_bounds(&mut self, bounds: Rectangle) {
        let Some(realm) = self.realm.as_mut() else {
            return;
        };
        let intents = self.interest.update(realm, bounds);
        self.outbox.extend(intents);
    }

    /// Advance the replica by `dt` seconds with the avatar's `input`.
    pub fn tick(&mut self, dt: f64, input: &AvatarInput) -> TickSummary {
        let mut summary = TickSummary::default();
        let Some(realm) = self.realm.as_mut() else {
            return summary;
        };

        summary.expired = realm.update(dt);

        if let Some(avatar_id) = self.avatar_id {
            let outcome = resolve_avatar(realm, avatar_id, input);
            self.outbox.extend(outcome.intents);
            summary.contacts = outcome.contacts;
            if outcome.prompt.is_some() {
                self.prompt = outcome.prompt.clone();
            }
            summary.prompt = outcome.prompt;
        }
        summary
    }

    // =========================================================================
    // Point interactions
    // =========================================================================

    /// Interactions offered by entities covering `tile`, relative to the
    /// avatar. The result becomes the pending prompt.
    pub fn interactions_at(&mut self, tile: Vector2) -> InteractionPrompt {
        let mut prompt = InteractionPrompt::default();

        if let Some(avatar) = self.avatar() {
            if let Some(realm) = self.realm.as_ref() {
                let clicked = Rectangle::unit_at(tile.floor());
                let own = avatar.bounds();
                let forward = avatar.target_bounds();
                let reachable = realm.is_terrain_passable_by(&forward, avatar.direction);

                for entity in realm.entities().filter(|e| e.id != avatar.id) {
                    let bounds = entity.bounds();
                    if !bounds.intersects(&clicked) {
                        continue;
                    }
                    if bounds.intersects(&own) {
                        prompt.choices.extend(entity.interactions(Classification::Intersecting));
                    } else if reachable && bounds.intersects(&forward) {
                        prompt.choices.extend(entity.interactions(Classification::Adjacent));
                    }
                }
            }
        }

        self.prompt = if prompt.is_empty() { None } else { Some(prompt.clone()) };
        prompt
    }

    /// Execute choice `index` of the pending prompt.
    ///
    /// Returns false if there is no prompt or the index is out of range.
    /// The prompt is cleared either way.
    pub fn choose_interaction(&mut self, index: usize) -> bool {
        let Some(prompt) = self.prompt.take() else {
            return false;
        };
        let Some(interaction) = prompt.get(index) else {
            return false;
        };
        let (Some(realm), Some(avatar_id)) = (self.realm.as_mut(), self.avatar_id) else {
            return false;
        };

        debug!(index, title = %interaction.title, "Chose interaction");
        let intents = execute_interaction(realm, avatar_id, interaction);
        self.outbox.extend(intents);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::direction::Direction;
    use crate::game::entity::{Actor, EntityKind, Item};
    use crate::game::realm::RealmId;
    use crate::game::region::{Region, RegionKey};

    const ME: EntityId = EntityId(1);

    fn replica() -> Replica {
        let mut replica = Replica::new(1);
        let mut realm = Realm::new(RealmId(7), "town", Vector2::new(64.0, 64.0), Vec::new());
        for key in Realm::intersecting_region_keys(&realm.bounds()) {
            realm.add_region(Region::open(key, RealmId(7)));
        }
        realm.add_entity(
            Entity::new(ME, RealmId(7), Vector2::new(5.0, 5.0), EntityKind::Avatar(Actor::new("me", 10)))
                .facing(Direction::E),
        );
        replica.set_realm(realm);
        replica.set_avatar(ME);
        replica
    }

    fn add(replica: &mut Replica, entity: Entity) {
        replica.realm_mut().unwrap().add_entity(entity);
    }

    #[test]
    fn test_tick_queues_intents() {
        let mut r = replica();
        r.tick(0.016, &AvatarInput::moving(Direction::E));
        assert_eq!(r.take_intents(), vec![OutboundIntent::Move { location: Vector2::new(6.0, 5.0) }]);
        assert!(r.take_intents().is_empty());
    }

    #[test]
    fn test_tick_without_realm() {
        let mut r = Replica::new(1);
        let summary = r.tick(0.016, &AvatarInput::moving(Direction::E));
        assert!(summary.expired.is_empty());
        assert!(r.take_intents().is_empty());
    }

    #[test]
    fn test_viewport_sights_padded_cells() {
        let mut r = replica();
        r.set_viewport(Rectangle::new(20.0, 20.0, 8.0, 8.0));
        assert_eq!(r.cache_bounds(), Rectangle::from_corners(0.0, 0.0, 48.0, 48.0));
        let intents = r.take_intents();
        assert_eq!(intents.len(), 9);
        assert!(intents.contains(&OutboundIntent::Sight { location: RegionKey { x: 32, y: 32 } }));
    }

    #[test]
    fn test_prompt_then_choose() {
        let mut r = replica();
        add(&mut r, Entity::new(EntityId(2), RealmId(7), Vector2::new(5.0, 5.0), EntityKind::Drop { item: Item::new("dagger") }));
        add(&mut r, Entity::new(EntityId(3), RealmId(7), Vector2::new(6.0, 5.0), EntityKind::Player(Actor::new("bob", 5))));

        let summary = r.tick(0.016, &AvatarInput::new().with_interact());
        assert_eq!(summary.prompt.as_ref().map(|p| p.len()), Some(2));
        assert!(r.prompt().is_some());

        assert!(r.choose_interaction(1));
        assert_eq!(r.take_intents(), vec![OutboundIntent::Attack { actor_ids: vec![EntityId(3)] }]);
        assert!(r.prompt().is_none());
        assert!(!r.choose_interaction(0));
    }

    #[test]
    fn test_interactions_at_tile() {
        let mut r = replica();
        add(&mut r, Entity::new(EntityId(2), RealmId(7), Vector2::new(5.0, 5.0), EntityKind::Drop { item: Item::new("carrot") }));
        add(&mut r, Entity::new(EntityId(3), RealmId(7), Vector2::new(6.0, 5.0), EntityKind::Npc { actor: Actor::new("rat", 2), species: "rat".into() }));
        add(&mut r, Entity::new(EntityId(4), RealmId(7), Vector2::new(9.0, 9.0), EntityKind::Player(Actor::new("far", 2))));

        let here = r.interactions_at(Vector2::new(5.5, 5.2));
        assert_eq!(here.len(), 1);
        assert_eq!(here.get(0).unwrap().title, "Pick up");

        let ahead = r.interactions_at(Vector2::new(6.0, 5.0));
        assert_eq!(ahead.get(0).unwrap().title, "Attack");

        assert!(r.interactions_at(Vector2::new(9.0, 9.0)).is_empty());
        assert!(r.prompt().is_none());
    }

    #[test]
    fn test_set_realm_resets_interest() {
        let mut r = replica();
        r.set_cache_bounds(Rectangle::from_corners(0.0, 0.0, 32.0, 32.0));
        r.take_intents();

        r.set_realm(Realm::new(RealmId(8), "cave", Vector2::new(32.0, 32.0), Vec::new()));
        assert_eq!(r.cache_bounds(), Rectangle::default());
        assert!(r.avatar().is_none());
        assert_eq!(r.avatar_id(), Some(ME));
    }
}
