//! Regions
//!
//! Fixed-size square chunks of terrain. A region carries its terrain layers
//! and a per-cell directional passability mask.

use std::fmt;
use serde::{Serialize, Deserialize};

use crate::core::geometry::{Rectangle, Vector2};
use crate::core::grid::{Grid, GridError};
use crate::core::hash::StateHasher;
use crate::game::direction::Direction;
use crate::game::realm::RealmId;

/// Side length of a region in tiles.
pub const REGION_SIZE: i32 = 16;

/// Round down to the region grid.
#[inline]
pub fn region_floor(value: f64) -> f64 {
    let size = REGION_SIZE as f64;
    (value / size).floor() * size
}

/// Round up to the region grid.
#[inline]
pub fn region_ceil(value: f64) -> f64 {
    let size = REGION_SIZE as f64;
    (value / size).ceil() * size
}

// =============================================================================
// REGION KEY
// =============================================================================

/// Floor-aligned origin of a region, in tiles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RegionKey {
    /// Origin X (multiple of `REGION_SIZE`)
    pub x: i32,
    /// Origin Y (multiple of `REGION_SIZE`)
    pub y: i32,
}

impl RegionKey {
    /// Key of the region containing `location`.
    pub fn containing(location: Vector2) -> Self {
        Self {
            x: region_floor(location.x) as i32,
            y: region_floor(location.y) as i32,
        }
    }

    /// Origin as a vector.
    #[inline]
    pub fn origin(self) -> Vector2 {
        Vector2::from_ints(self.x, self.y)
    }

    /// World-space rectangle covered by the region.
    #[inline]
    pub fn bounds(self) -> Rectangle {
        let size = REGION_SIZE as f64;
        Rectangle::new(self.x as f64, self.y as f64, size, size)
    }
}

impl fmt::Display for RegionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

// =============================================================================
// LAYER
// =============================================================================

/// One terrain layer: a terrain type and its tile indices.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    /// Terrain type name
    pub terrain: String,
    /// Tile index per cell
    pub tiles: Grid<u32>,
}

// =============================================================================
// REGION
// =============================================================================

/// A loaded region of the active realm.
#[derive(Clone, Debug, PartialEq)]
pub struct Region {
    /// Addressing key
    pub key: RegionKey,
    /// Owning realm
    pub realm_id: RealmId,
    /// Terrain layers, bottom first
    pub layers: Vec<Layer>,
    /// `None` means unconstrained; otherwise bit `d` allows direction `d`
    passabilities: Grid<Option<u8>>,
}

impl Region {
    /// Build a region, checking every grid is `REGION_SIZE` square.
    pub fn new(
        key: RegionKey,
        realm_id: RealmId,
        layers: Vec<Layer>,
        passabilities: Grid<Option<u8>>,
    ) -> Result<Self, GridError> {
        let size = REGION_SIZE as usize;
        check_square(&passabilities, size)?;
        for layer in &layers {
            check_square(&layer.tiles, size)?;
        }

        Ok(Self {
            key,
            realm_id,
            layers,
            passabilities,
        })
    }

    /// A region with no terrain and no movement constraints.
    pub fn open(key: RegionKey, realm_id: RealmId) -> Self {
        let size = REGION_SIZE as usize;
        Self {
            key,
            realm_id,
            layers: Vec::new(),
            passabilities: Grid::filled(size, size, None),
        }
    }

    /// World-space rectangle covered by this region.
    #[inline]
    pub fn bounds(&self) -> Rectangle {
        self.key.bounds()
    }

    /// Raw passability mask at a local cell.
    pub fn mask_at(&self, x: i64, y: i64) -> Option<u8> {
        self.passabilities.get(x, y).copied().flatten()
    }

    /// Whether a local cell allows movement in `direction`.
    ///
    /// Cells outside the grid are unconstrained.
    pub fn passability_at(&self, x: i64, y: i64, direction: Direction) -> bool {
        match self.mask_at(x, y) {
            None => true,
            Some(mask) => mask & direction.bit() != 0,
        }
    }

    /// Whether every cell of this region covered by `bounds` allows
    /// movement in `direction`.
    pub fn is_terrain_passable_by(&self, bounds: &Rectangle, direction: Direction) -> bool {
        let size = REGION_SIZE as i64;
        let local = bounds.offset(-self.key.origin());

        let left = (local.left.floor() as i64).max(0);
        let top = (local.top.floor() as i64).max(0);
        let right = (local.right().ceil() as i64).min(size);
        let bottom = (local.bottom().ceil() as i64).min(size);

        for y in top..bottom {
            for x in left..right {
                if !self.passability_at(x, y, direction) {
                    return false;
                }
            }
        }
        true
    }

    /// Feed this region into a state digest.
    pub fn hash_into(&self, hasher: &mut StateHasher) {
        hasher.update_i32(self.key.x);
        hasher.update_i32(self.key.y);
        hasher.update_u32(self.realm_id.0);
        hasher.update_u32(self.layers.len() as u32);
        for layer in &self.layers {
            hasher.update_str(&layer.terrain);
            for tile in layer.tiles.cells() {
                hasher.update_u32(*tile);
            }
        }
        for cell in self.passabilities.cells() {
            // 0xFF marks "no entry"; real masks only use the low four bits
            hasher.update_u8(cell.unwrap_or(0xFF));
        }
    }
}

fn check_square<T>(grid: &Grid<T>, size: usize) -> Result<(), GridError> {
    if grid.width() != size || grid.height() != size {
        return Err(GridError::LengthMismatch {
            expected: size * size,
            actual: grid.width() * grid.height(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region_with(cells: &[((i64, i64), u8)]) -> Region {
        let mut region = Region::open(RegionKey { x: 16, y: 0 }, RealmId(1));
        for &((x, y), mask) in cells {
            *region.passabilities.get_mut(x, y).unwrap() = Some(mask);
        }
        region
    }

    #[test]
    fn test_key_floors_negative_coordinates() {
        assert_eq!(RegionKey::containing(Vector2::new(-0.5, 17.0)), RegionKey { x: -16, y: 16 });
        assert_eq!(RegionKey::containing(Vector2::new(15.9, 0.0)), RegionKey { x: 0, y: 0 });
        assert_eq!(RegionKey { x: -16, y: 32 }.to_string(), "-16,32");
    }

    #[test]
    fn test_region_grid_rounding() {
        assert_eq!(region_floor(17.0), 16.0);
        assert_eq!(region_ceil(17.0), 32.0);
        assert_eq!(region_ceil(32.0), 32.0);
        assert_eq!(region_floor(-1.0), -16.0);
    }

    #[test]
    fn test_passability_mask_bits() {
        // Only north and south allowed
        let region = region_with(&[((2, 3), Direction::N.bit() | Direction::S.bit())]);
        assert!(region.passability_at(2, 3, Direction::N));
        assert!(region.passability_at(2, 3, Direction::S));
        assert!(!region.passability_at(2, 3, Direction::W));
        assert!(!region.passability_at(2, 3, Direction::E));

        // No entry and out of grid are unconstrained
        assert!(region.passability_at(0, 0, Direction::E));
        assert!(region.passability_at(99, 0, Direction::E));
    }

    #[test]
    fn test_terrain_passable_checks_every_covered_cell() {
        let region = region_with(&[((5, 5), 0)]);

        // World (21, 5) is local (5, 5)
        assert!(!region.is_terrain_passable_by(&Rectangle::new(21.0, 5.0, 1.0, 1.0), Direction::E));
        assert!(!region.is_terrain_passable_by(&Rectangle::new(20.0, 4.0, 2.0, 2.0), Direction::N));
        assert!(region.is_terrain_passable_by(&Rectangle::new(22.0, 5.0, 1.0, 1.0), Direction::E));

        // Fractional bounds cover both neighbours
        assert!(!region.is_terrain_passable_by(&Rectangle::new(20.5, 5.0, 1.0, 1.0), Direction::E));
    }

    #[test]
    fn test_malformed_grid_rejected() {
        let bad = Grid::filled(4, 4, None);
        let err = Region::new(RegionKey { x: 0, y: 0 }, RealmId(1), Vec::new(), bad).unwrap_err();
        assert_eq!(err, GridError::LengthMismatch { expected: 256, actual: 16 });
    }
}
