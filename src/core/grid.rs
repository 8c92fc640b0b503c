//! Fixed-Size Cell Grid
//!
//! Row-major storage for per-tile region data (terrain tiles, passability).

use serde::{Serialize, Deserialize};
use thiserror::Error;

/// Grid construction errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
    /// Cell vector length does not match `width * height`.
    #[error("expected {expected} cells, got {actual}")]
    LengthMismatch {
        /// Required cell count
        expected: usize,
        /// Supplied cell count
        actual: usize,
    },
}

/// Row-major grid of cells.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Grid<T> {
    width: usize,
    height: usize,
    cells: Vec<T>,
}

impl<T> Grid<T> {
    /// Build a grid from row-major cells.
    pub fn from_vec(width: usize, height: usize, cells: Vec<T>) -> Result<Self, GridError> {
        let expected = width * height;
        if cells.len() != expected {
            return Err(GridError::LengthMismatch {
                expected,
                actual: cells.len(),
            });
        }
        Ok(Self { width, height, cells })
    }

    /// Grid width in cells.
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Grid height in cells.
    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Cell at `(x, y)`, or `None` outside the grid.
    #[inline]
    pub fn get(&self, x: i64, y: i64) -> Option<&T> {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return None;
        }
        self.cells.get(y as usize * self.width + x as usize)
    }

    /// Mutable cell at `(x, y)`, or `None` outside the grid.
    #[inline]
    pub fn get_mut(&mut self, x: i64, y: i64) -> Option<&mut T> {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return None;
        }
        self.cells.get_mut(y as usize * self.width + x as usize)
    }

    /// Cells in row-major order.
    pub fn cells(&self) -> &[T] {
        &self.cells
    }
}

impl<T: Clone> Grid<T> {
    /// Grid with every cell set to `value`.
    pub fn filled(width: usize, height: usize, value: T) -> Self {
        Self {
            width,
            height,
            cells: vec![value; width * height],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_length_checked() {
        let err = Grid::from_vec(2, 2, vec![1, 2, 3]).unwrap_err();
        assert_eq!(err, GridError::LengthMismatch { expected: 4, actual: 3 });
    }

    #[test]
    fn test_grid_row_major() {
        let grid = Grid::from_vec(3, 2, vec![0, 1, 2, 3, 4, 5]).unwrap();
        assert_eq!(grid.get(0, 0), Some(&0));
        assert_eq!(grid.get(2, 0), Some(&2));
        assert_eq!(grid.get(0, 1), Some(&3));
        assert_eq!(grid.get(2, 1), Some(&5));
    }

    #[test]
    fn test_grid_out_of_range() {
        let mut grid = Grid::filled(2, 2, 7u8);
        assert_eq!(grid.get(-1, 0), None);
        assert_eq!(grid.get(2, 0), None);
        assert_eq!(grid.get(0, 2), None);

        *grid.get_mut(1, 1).unwrap() = 9;
        assert_eq!(grid.get(1, 1), Some(&9));
        assert!(grid.get_mut(5, 5).is_none());
    }
}
