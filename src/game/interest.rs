//! Interest Management
//!
//! Keeps the set of streamed regions in step with the viewport. When the
//! cache bounds move, regions that fell out are evicted and released
//! (UNSIGHT) and regions that came in are requested (SIGHT). Terrain only
//! appears once the server answers with a REGION packet.

use std::collections::BTreeSet;
use tracing::debug;

use crate::core::geometry::Rectangle;
use crate::game::realm::Realm;
use crate::game::region::{RegionKey, REGION_SIZE, region_ceil, region_floor};
use crate::network::protocol::OutboundIntent;

/// Region cells gained and lost between two cache bounds.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InterestDelta {
    /// Cells only in the new bounds
    pub sight: Vec<RegionKey>,
    /// Cells only in the old bounds
    pub unsight: Vec<RegionKey>,
}

/// Region-aligned cells covering `bounds`.
pub fn region_keys_covering(bounds: &Rectangle) -> BTreeSet<RegionKey> {
    Realm::intersecting_region_keys(bounds).into_iter().collect()
}

/// Symmetric difference of the cells covering `old` and `new`.
pub fn diff(old: &Rectangle, new: &Rectangle) -> InterestDelta {
    let before = region_keys_covering(old);
    let after = region_keys_covering(new);

    InterestDelta {
        sight: after.difference(&before).copied().collect(),
        unsight: before.difference(&after).copied().collect(),
    }
}

/// Cache bounds for a viewport: padded by `margin` regions on every side and
/// aligned outward to the region grid.
pub fn cache_bounds_for_viewport(viewport: &Rectangle, margin: u32) -> Rectangle {
    let pad = margin as f64 * REGION_SIZE as f64;
    Rectangle::from_corners(
        region_floor(viewport.left - pad),
        region_floor(viewport.top - pad),
        region_ceil(viewport.right() + pad),
        region_ceil(viewport.bottom() + pad),
    )
}

/// Tracks the current cache bounds.
#[derive(Clone, Debug, Default)]
pub struct InterestManager {
    cache_bounds: Rectangle,
}

impl InterestManager {
    /// Start with an empty interest set.
    pub fn new() -> Self {
        Self::default()
    }

    /// The bounds last applied.
    pub fn cache_bounds(&self) -> Rectangle {
        self.cache_bounds
    }

    /// Forget the interest set, e.g. after a realm switch.
    pub fn reset(&mut self) {
        self.cache_bounds = Rectangle::default();
    }

    /// Move the cache to `new_bounds`.
    ///
    /// Evicts regions (and the non-avatar entities standing in them) that
    /// fell out, and returns the intents to send, unsights first.
    pub fn update(&mut self, realm: &mut Realm, new_bounds: Rectangle) -> Vec<OutboundIntent> {
        let delta = diff(&self.cache_bounds, &new_bounds);
        let extended = realm.extended_bounds();
        let in_realm = |key: &RegionKey| extended.contains(&key.bounds());

        let mut intents = Vec::new();

        for key in delta.unsight.into_iter().filter(in_realm) {
            if realm.remove_region(key).is_some() {
                let evicted = realm.remove_entities_in(key);
                debug!(region = %key, entities = evicted.len(), "Evicted region");
            }
            intents.push(OutboundIntent::Unsight { location: key });
        }

        for key in delta.sight.into_iter().filter(in_realm) {
            intents.push(OutboundIntent::Sight { location: key });
        }

        self.cache_bounds = new_bounds;
        intents
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use crate::core::geometry::Vector2;
    use crate::game::entity::{Actor, Entity, EntityId, EntityKind};
    use crate::game::realm::RealmId;
    use crate::game::region::Region;

    fn key(x: i32, y: i32) -> RegionKey {
        RegionKey { x, y }
    }

    #[test]
    fn test_shift_right_one_region() {
        let old = Rectangle::from_corners(0.0, 0.0, 32.0, 32.0);
        let new = Rectangle::from_corners(16.0, 0.0, 48.0, 32.0);
        let delta = diff(&old, &new);

        assert_eq!(delta.unsight, vec![key(0, 0), key(0, 16)]);
        assert_eq!(delta.sight, vec![key(32, 0), key(32, 16)]);
    }

    #[test]
    fn test_update_evicts_and_emits() {
        let mut realm = Realm::new(RealmId(1), "test", Vector2::new(64.0, 32.0), Vec::new());
        let mut interest = InterestManager::new();

        let first = interest.update(&mut realm, Rectangle::from_corners(0.0, 0.0, 32.0, 32.0));
        assert_eq!(first.len(), 4);
        assert!(first.iter().all(|i| matches!(i, OutboundIntent::Sight { .. })));

        for k in [key(0, 0), key(0, 16), key(16, 0), key(16, 16)] {
            realm.add_region(Region::open(k, RealmId(1)));
        }
        realm.add_entity(Entity::new(
            EntityId(5),
            RealmId(1),
            Vector2::new(3.0, 3.0),
            EntityKind::Player(Actor::new("bob", 10)),
        ));

        let second = interest.update(&mut realm, Rectangle::from_corners(16.0, 0.0, 48.0, 32.0));
        assert_eq!(
            second,
            vec![
                OutboundIntent::Unsight { location: key(0, 0) },
                OutboundIntent::Unsight { location: key(0, 16) },
                OutboundIntent::Sight { location: key(32, 0) },
                OutboundIntent::Sight { location: key(32, 16) },
            ]
        );
        assert!(realm.region_at(key(0, 0)).is_none());
        assert!(realm.region_at(key(16, 0)).is_some());
        assert!(realm.entity(EntityId(5)).is_none());
        assert_eq!(interest.cache_bounds(), Rectangle::from_corners(16.0, 0.0, 48.0, 32.0));
    }

    #[test]
    fn test_filtered_to_extended_bounds() {
        // 20x20 realm extends to 32x32
        let mut realm = Realm::new(RealmId(1), "small", Vector2::new(20.0, 20.0), Vec::new());
        let mut interest = InterestManager::new();

        let intents = interest.update(&mut realm, Rectangle::from_corners(-16.0, -16.0, 48.0, 48.0));
        let sighted: Vec<RegionKey> = intents
            .iter()
            .filter_map(|i| match i {
                OutboundIntent::Sight { location } => Some(*location),
                _ => None,
            })
            .collect();
        assert_eq!(sighted, vec![key(0, 0), key(0, 16), key(16, 0), key(16, 16)]);
    }

    #[test]
    fn test_cache_bounds_for_viewport() {
        let viewport = Rectangle::new(20.0, 5.0, 10.0, 8.0);
        assert_eq!(cache_bounds_for_viewport(&viewport, 1), Rectangle::from_corners(0.0, -16.0, 48.0, 32.0));
        assert_eq!(cache_bounds_for_viewport(&viewport, 0), Rectangle::from_corners(16.0, 0.0, 32.0, 16.0));
    }

    #[test]
    fn test_cache_bounds_huge_margin() {
        let bounds = cache_bounds_for_viewport(&Rectangle::new(0.0, 0.0, 10.0, 10.0), 200_000_000);
        assert_eq!(bounds.left, -3_200_000_000.0);
        assert_eq!(bounds.top, -3_200_000_000.0);
        assert_eq!(bounds.right(), 3_200_000_016.0);
    }

    proptest! {
        #[test]
        fn prop_sight_and_unsight_disjoint(
            ax in -64.0f64..64.0, ay in -64.0f64..64.0, aw in 0.0f64..80.0, ah in 0.0f64..80.0,
            bx in -64.0f64..64.0, by in -64.0f64..64.0, bw in 0.0f64..80.0, bh in 0.0f64..80.0,
        ) {
            let delta = diff(&Rectangle::new(ax, ay, aw, ah), &Rectangle::new(bx, by, bw, bh));
            let sight: BTreeSet<RegionKey> = delta.sight.iter().copied().collect();
            prop_assert!(delta.unsight.iter().all(|k| !sight.contains(k)));
        }
    }
}
