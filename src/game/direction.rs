//! Cardinal Directions
//!
//! Facing and movement directions. The discriminant doubles as the bit index
//! in a region's passability mask.

use serde::{Serialize, Deserialize};
use crate::core::geometry::Vector2;

/// One of the four cardinal directions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
#[derive(Default)]
pub enum Direction {
    /// North (-Y)
    N = 0,
    /// West (-X)
    W = 1,
    /// South (+Y)
    #[default]
    S = 2,
    /// East (+X)
    E = 3,
}

impl Direction {
    /// All directions in bit order.
    pub const ALL: [Direction; 4] = [Direction::N, Direction::W, Direction::S, Direction::E];

    /// Unit step for this direction.
    #[inline]
    pub fn vector(self) -> Vector2 {
        match self {
            Direction::N => Vector2::new(0.0, -1.0),
            Direction::W => Vector2::new(-1.0, 0.0),
            Direction::S => Vector2::new(0.0, 1.0),
            Direction::E => Vector2::new(1.0, 0.0),
        }
    }

    /// The opposite direction.
    #[inline]
    pub fn opposite(self) -> Direction {
        match self {
            Direction::N => Direction::S,
            Direction::W => Direction::E,
            Direction::S => Direction::N,
            Direction::E => Direction::W,
        }
    }

    /// Bit for this direction in a passability mask.
    #[inline]
    pub fn bit(self) -> u8 {
        1 << (self as u8)
    }

    /// Get direction from index (0-3).
    pub fn from_index(index: u8) -> Option<Direction> {
        match index {
            0 => Some(Direction::N),
            1 => Some(Direction::W),
            2 => Some(Direction::S),
            3 => Some(Direction::E),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bits_follow_discriminant() {
        assert_eq!(Direction::N.bit(), 0b0001);
        assert_eq!(Direction::W.bit(), 0b0010);
        assert_eq!(Direction::S.bit(), 0b0100);
        assert_eq!(Direction::E.bit(), 0b1000);
    }

    #[test]
    fn test_opposite_cancels_vector() {
        for d in Direction::ALL {
            assert_eq!(d.vector() + d.opposite().vector(), Vector2::ZERO);
            assert_eq!(d.opposite().opposite(), d);
        }
    }

    #[test]
    fn test_from_index() {
        for d in Direction::ALL {
            assert_eq!(Direction::from_index(d as u8), Some(d));
        }
        assert_eq!(Direction::from_index(4), None);
    }
}
