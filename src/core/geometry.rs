//! Geometry Primitives
//!
//! Value types shared by every replica component: 2D/3D vectors and
//! axis-aligned rectangles in tile units.

use std::fmt;
use std::ops::{Add, Sub, Neg};
use serde::{Serialize, Deserialize};

// =============================================================================
// VECTOR2
// =============================================================================

/// 2D vector in tile units.
///
/// Locations are continuous: an actor between two tiles has a fractional
/// coordinate until its step completes.
#[derive(Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector2 {
    /// X component (grows east)
    pub x: f64,
    /// Y component (grows south)
    pub y: f64,
}

impl Vector2 {
    /// Zero vector
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    /// Create a new vector.
    #[inline]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Create a vector from integer components.
    #[inline]
    pub fn from_ints(x: i32, y: i32) -> Self {
        Self {
            x: x as f64,
            y: y as f64,
        }
    }

    /// Apply `f` to both components.
    #[inline]
    pub fn map(self, f: impl Fn(f64) -> f64) -> Self {
        Self {
            x: f(self.x),
            y: f(self.y),
        }
    }

    /// Combine with another vector component by component.
    #[inline]
    pub fn elementwise(self, other: Self, f: impl Fn(f64, f64) -> f64) -> Self {
        Self {
            x: f(self.x, other.x),
            y: f(self.y, other.y),
        }
    }

    /// Translate by another vector.
    #[inline]
    pub fn offset(self, other: Self) -> Self {
        Self {
            x: self.x + other.x,
            y: self.y + other.y,
        }
    }

    /// Scale by a scalar.
    #[inline]
    pub fn scale(self, k: f64) -> Self {
        Self {
            x: self.x * k,
            y: self.y * k,
        }
    }

    /// Negate both components.
    #[inline]
    pub fn negate(self) -> Self {
        Self {
            x: -self.x,
            y: -self.y,
        }
    }

    /// Round both components to the nearest integer.
    ///
    /// Halves round away from zero, matching `f64::round`.
    #[inline]
    pub fn round(self) -> Self {
        self.map(f64::round)
    }

    /// Floor both components.
    #[inline]
    pub fn floor(self) -> Self {
        self.map(f64::floor)
    }

    /// True if both components are whole numbers.
    #[inline]
    pub fn is_integral(self) -> bool {
        self.x.fract() == 0.0 && self.y.fract() == 0.0
    }
}

impl Add for Vector2 {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self {
        self.offset(rhs)
    }
}

impl Sub for Vector2 {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: Self) -> Self {
        self.offset(rhs.negate())
    }
}

impl Neg for Vector2 {
    type Output = Self;
    #[inline]
    fn neg(self) -> Self {
        self.negate()
    }
}

impl fmt::Debug for Vector2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Vector2({:.3}, {:.3})", self.x, self.y)
    }
}

impl fmt::Display for Vector2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

// =============================================================================
// VECTOR3
// =============================================================================

/// 3D vector. The third axis is elevation (layer height), not used by
/// passability.
#[derive(Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector3 {
    /// X component
    pub x: f64,
    /// Y component
    pub y: f64,
    /// Z component (elevation)
    pub z: f64,
}

impl Vector3 {
    /// Zero vector
    pub const ZERO: Self = Self { x: 0.0, y: 0.0, z: 0.0 };

    /// Create a new vector.
    #[inline]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Lift a planar vector to the given elevation.
    #[inline]
    pub fn from_planar(v: Vector2, z: f64) -> Self {
        Self { x: v.x, y: v.y, z }
    }

    /// Drop the elevation component.
    #[inline]
    pub fn planar(self) -> Vector2 {
        Vector2::new(self.x, self.y)
    }

    /// Apply `f` to every component.
    #[inline]
    pub fn map(self, f: impl Fn(f64) -> f64) -> Self {
        Self {
            x: f(self.x),
            y: f(self.y),
            z: f(self.z),
        }
    }

    /// Translate by another vector.
    #[inline]
    pub fn offset(self, other: Self) -> Self {
        Self {
            x: self.x + other.x,
            y: self.y + other.y,
            z: self.z + other.z,
        }
    }

    /// Scale by a scalar.
    #[inline]
    pub fn scale(self, k: f64) -> Self {
        self.map(|c| c * k)
    }

    /// Negate every component.
    #[inline]
    pub fn negate(self) -> Self {
        self.map(|c| -c)
    }
}

impl Add for Vector3 {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self {
        self.offset(rhs)
    }
}

impl Neg for Vector3 {
    type Output = Self;
    #[inline]
    fn neg(self) -> Self {
        self.negate()
    }
}

impl fmt::Debug for Vector3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Vector3({:.3}, {:.3}, {:.3})", self.x, self.y, self.z)
    }
}

// =============================================================================
// RECTANGLE
// =============================================================================

/// Axis-aligned rectangle. Right and bottom edges are exclusive.
#[derive(Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "RawRectangle")]
pub struct Rectangle {
    /// Left edge (inclusive)
    pub left: f64,
    /// Top edge (inclusive)
    pub top: f64,
    /// Width, never negative
    pub width: f64,
    /// Height, never negative
    pub height: f64,
}

/// Wire form of a rectangle, checked before it becomes a `Rectangle`.
#[derive(Deserialize)]
struct RawRectangle {
    left: f64,
    top: f64,
    width: f64,
    height: f64,
}

impl TryFrom<RawRectangle> for Rectangle {
    type Error = String;

    fn try_from(raw: RawRectangle) -> Result<Self, Self::Error> {
        if !(raw.left.is_finite() && raw.top.is_finite()) {
            return Err("rectangle origin must be finite".into());
        }
        if !(raw.width.is_finite() && raw.height.is_finite()) || raw.width < 0.0 || raw.height < 0.0 {
            return Err(format!("invalid rectangle extent {}x{}", raw.width, raw.height));
        }
        Ok(Self::new(raw.left, raw.top, raw.width, raw.height))
    }
}

impl Rectangle {
    /// Create a rectangle. Negative extents are clamped to zero.
    #[inline]
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width: width.max(0.0),
            height: height.max(0.0),
        }
    }

    /// Create a rectangle from its top-left and bottom-right corners.
    #[inline]
    pub fn from_corners(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self::new(left, top, right - left, bottom - top)
    }

    /// A one-tile rectangle at `location`.
    #[inline]
    pub fn unit_at(location: Vector2) -> Self {
        Self::new(location.x, location.y, 1.0, 1.0)
    }

    /// Right edge (exclusive).
    #[inline]
    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    /// Bottom edge (exclusive).
    #[inline]
    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    /// Top-left corner.
    #[inline]
    pub fn left_top(&self) -> Vector2 {
        Vector2::new(self.left, self.top)
    }

    /// Width and height as a vector.
    #[inline]
    pub fn size(&self) -> Vector2 {
        Vector2::new(self.width, self.height)
    }

    /// True if the rectangle covers no area.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width == 0.0 || self.height == 0.0
    }

    /// Translate by a vector.
    #[inline]
    pub fn offset(&self, v: Vector2) -> Self {
        Self {
            left: self.left + v.x,
            top: self.top + v.y,
            width: self.width,
            height: self.height,
        }
    }

    /// True if the interiors overlap. Touching edges do not count.
    #[inline]
    pub fn intersects(&self, other: &Rectangle) -> bool {
        self.left < other.right()
            && self.right() > other.left
            && self.top < other.bottom()
            && self.bottom() > other.top
    }

    /// Overlapping region, or `None` if the interiors are disjoint.
    pub fn intersect(&self, other: &Rectangle) -> Option<Rectangle> {
        if !self.intersects(other) {
            return None;
        }

        Some(Rectangle::from_corners(
            self.left.max(other.left),
            self.top.max(other.top),
            self.right().min(other.right()),
            self.bottom().min(other.bottom()),
        ))
    }

    /// True if `other` lies entirely within this rectangle.
    #[inline]
    pub fn contains(&self, other: &Rectangle) -> bool {
        self.left <= other.left
            && self.right() >= other.right()
            && self.top <= other.top
            && self.bottom() >= other.bottom()
    }

    /// True if the point lies within this rectangle (right/bottom exclusive).
    #[inline]
    pub fn contains_point(&self, p: Vector2) -> bool {
        p.x >= self.left && p.x < self.right() && p.y >= self.top && p.y < self.bottom()
    }
}

impl fmt::Debug for Rectangle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Rectangle({}, {}, {}, {})",
            self.left, self.top, self.width, self.height
        )
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec2_ops() {
        let a = Vector2::new(3.0, 4.0);
        let b = Vector2::new(1.0, -2.0);
        assert_eq!(a + b, Vector2::new(4.0, 2.0));
        assert_eq!(a - b, Vector2::new(2.0, 6.0));
        assert_eq!(-a, Vector2::new(-3.0, -4.0));
        assert_eq!(a.scale(0.5), Vector2::new(1.5, 2.0));
        assert_eq!(a.elementwise(b, f64::max), Vector2::new(3.0, 4.0));
    }

    #[test]
    fn test_vec2_round() {
        let v = Vector2::new(2.9999999, -0.0000001);
        let r = v.round();
        assert_eq!(r, Vector2::new(3.0, 0.0));
        assert!(r.is_integral());
        assert!(!v.is_integral());
    }

    #[test]
    fn test_vec3_planar() {
        let v = Vector3::from_planar(Vector2::new(1.0, 2.0), 3.0);
        assert_eq!(v.planar(), Vector2::new(1.0, 2.0));
        assert_eq!((v + Vector3::new(1.0, 1.0, 1.0)).z, 4.0);
        assert_eq!(v.scale(2.0), Vector3::new(2.0, 4.0, 6.0));
    }

    #[test]
    fn test_rect_negative_extent_clamped() {
        let r = Rectangle::from_corners(10.0, 10.0, 5.0, 20.0);
        assert_eq!(r.width, 0.0);
        assert_eq!(r.height, 10.0);
        assert!(r.is_empty());
    }

    #[test]
    fn test_rect_intersection() {
        let a = Rectangle::new(0.0, 0.0, 4.0, 4.0);
        let b = Rectangle::new(2.0, 3.0, 4.0, 4.0);
        assert_eq!(a.intersect(&b), Some(Rectangle::new(2.0, 3.0, 2.0, 1.0)));

        // Touching edges do not intersect
        let c = Rectangle::new(4.0, 0.0, 1.0, 1.0);
        assert!(!a.intersects(&c));
        assert_eq!(a.intersect(&c), None);
    }

    #[test]
    fn test_rect_contains() {
        let outer = Rectangle::new(0.0, 0.0, 16.0, 16.0);
        assert!(outer.contains(&Rectangle::new(15.0, 15.0, 1.0, 1.0)));
        assert!(!outer.contains(&Rectangle::new(15.0, 15.0, 2.0, 1.0)));
        assert!(!outer.contains(&Rectangle::new(-1.0, 0.0, 1.0, 1.0)));
        assert!(outer.contains_point(Vector2::new(0.0, 15.5)));
        assert!(!outer.contains_point(Vector2::new(16.0, 0.0)));
    }

    #[test]
    fn test_rect_offset() {
        let r = Rectangle::new(0.0, 0.0, 1.0, 2.0).offset(Vector2::new(5.0, -1.0));
        assert_eq!(r, Rectangle::new(5.0, -1.0, 1.0, 2.0));
        assert_eq!(r.right(), 6.0);
        assert_eq!(r.bottom(), 1.0);
    }

    #[test]
    fn test_rect_json_rejects_negative_extent() {
        let ok: Rectangle = serde_json::from_str(r#"{"left":1.0,"top":2.0,"width":3.0,"height":0.0}"#).unwrap();
        assert_eq!(ok, Rectangle::new(1.0, 2.0, 3.0, 0.0));

        let negative = serde_json::from_str::<Rectangle>(r#"{"left":0.0,"top":0.0,"width":-3.0,"height":1.0}"#);
        assert!(negative.is_err());
        let negative = serde_json::from_str::<Rectangle>(r#"{"left":0.0,"top":0.0,"width":1.0,"height":-0.5}"#);
        assert!(negative.is_err());
    }
}
