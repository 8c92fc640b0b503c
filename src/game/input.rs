//! Avatar Input
//!
//! Per-tick snapshot of the controls that affect the avatar. Device polling
//! happens elsewhere; the replica only sees this frame.

use serde::{Serialize, Deserialize};
use crate::game::direction::Direction;

/// Controls held during one simulation tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvatarInput {
    /// Requested movement direction, `None` when no arrow is held
    pub direction: Option<Direction>,

    /// Action flags (packed bits):
    /// - Bit 0: Interact pressed this tick
    /// - Bit 1: Attack mode held
    /// - Bit 2-7: Reserved
    pub flags: u8,
}

impl AvatarInput {
    /// Interact flag bit
    pub const FLAG_INTERACT: u8 = 0x01;

    /// Attack mode flag bit
    pub const FLAG_ATTACK: u8 = 0x02;

    /// Nothing held.
    pub const fn new() -> Self {
        Self {
            direction: None,
            flags: 0,
        }
    }

    /// Hold a direction.
    pub const fn moving(direction: Direction) -> Self {
        Self {
            direction: Some(direction),
            flags: 0,
        }
    }

    /// Pick a direction from held arrow keys.
    ///
    /// When several are held, west wins over north, north over east, east
    /// over south.
    pub fn from_arrows(left: bool, up: bool, right: bool, down: bool) -> Self {
        let direction = if left {
            Some(Direction::W)
        } else if up {
            Some(Direction::N)
        } else if right {
            Some(Direction::E)
        } else if down {
            Some(Direction::S)
        } else {
            None
        };
        Self { direction, flags: 0 }
    }

    /// Set the interact flag.
    pub const fn with_interact(mut self) -> Self {
        self.flags |= Self::FLAG_INTERACT;
        self
    }

    /// Set the attack mode flag.
    pub const fn with_attack(mut self) -> Self {
        self.flags |= Self::FLAG_ATTACK;
        self
    }

    /// Check if interact was pressed this tick.
    #[inline]
    pub fn interact_pressed(&self) -> bool {
        self.flags & Self::FLAG_INTERACT != 0
    }

    /// Check if attack mode is held.
    #[inline]
    pub fn attack_held(&self) -> bool {
        self.flags & Self::FLAG_ATTACK != 0
    }

    /// Check if nothing is held.
    #[inline]
    pub fn is_idle(&self) -> bool {
        self.direction.is_none() && self.flags == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arrow_priority() {
        assert_eq!(AvatarInput::from_arrows(true, true, true, true).direction, Some(Direction::W));
        assert_eq!(AvatarInput::from_arrows(false, true, true, true).direction, Some(Direction::N));
        assert_eq!(AvatarInput::from_arrows(false, false, true, true).direction, Some(Direction::E));
        assert_eq!(AvatarInput::from_arrows(false, false, false, true).direction, Some(Direction::S));
        assert!(AvatarInput::from_arrows(false, false, false, false).is_idle());
    }

    #[test]
    fn test_flags() {
        let input = AvatarInput::moving(Direction::E).with_attack();
        assert!(input.attack_held());
        assert!(!input.interact_pressed());
        assert!(!input.is_idle());
        assert!(AvatarInput::new().with_interact().interact_pressed());
    }
}
