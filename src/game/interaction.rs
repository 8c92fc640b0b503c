//! Interactions
//!
//! What the avatar can do with a nearby entity, and the choice surfaced to
//! the caller when more than one thing is possible.

use serde::{Serialize, Deserialize};

use crate::game::entity::EntityId;

/// How an entity relates to the avatar when interactions are gathered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// Overlaps the avatar's own bounds
    Intersecting,
    /// Overlaps the tile in front of the avatar
    Adjacent,
}

/// The effect of executing an interaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InteractionAction {
    /// Pick up a drop
    PickUp { drop_id: EntityId },
    /// Attack an actor
    Attack { actor_id: EntityId },
}

/// A titled interaction offered by an entity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interaction {
    /// Menu title
    pub title: String,
    /// What happens when chosen
    pub action: InteractionAction,
}

impl Interaction {
    /// Create an interaction.
    pub fn new(title: impl Into<String>, action: InteractionAction) -> Self {
        Self {
            title: title.into(),
            action,
        }
    }
}

/// Several interactions are available; the caller picks one.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionPrompt {
    /// Candidates in entity id order
    pub choices: Vec<Interaction>,
}

impl InteractionPrompt {
    /// Number of candidates.
    pub fn len(&self) -> usize {
        self.choices.len()
    }

    /// True if there is nothing to choose.
    pub fn is_empty(&self) -> bool {
        self.choices.is_empty()
    }

    /// Candidate at `index`.
    pub fn get(&self, index: usize) -> Option<&Interaction> {
        self.choices.get(index)
    }
}
