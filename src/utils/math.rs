//! # World-Space Mathematics
//!
//! A small 2D vector type for world positions, directions and movement steps.

use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Mul, Neg, Sub};

/// A point or vector in continuous world space.
///
/// # Examples
///
/// ```
/// use labyrinth::Vec2;
///
/// let a = Vec2::new(0.0, 0.0);
/// let b = Vec2::new(3.0, 4.0);
/// assert_eq!(a.distance(b), 5.0);
/// assert_eq!(a.distance_squared(b), 25.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    /// Creates a new vector.
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn length(self) -> f32 {
        self.length_squared().sqrt()
    }

    pub fn length_squared(self) -> f32 {
        self.x * self.x + self.y * self.y
    }

    /// Euclidean distance to another point.
    pub fn distance(self, other: Vec2) -> f32 {
        (other - self).length()
    }

    /// Squared Euclidean distance. Orders points the same way as [`Vec2::distance`].
    pub fn distance_squared(self, other: Vec2) -> f32 {
        (other - self).length_squared()
    }

    pub fn dot(self, other: Vec2) -> f32 {
        self.x * other.x + self.y * other.y
    }

    /// Unit vector in the same direction, or zero for a zero-length vector.
    pub fn normalized(self) -> Vec2 {
        let len = self.length();
        if len <= f32::EPSILON {
            Vec2::ZERO
        } else {
            Vec2::new(self.x / len, self.y / len)
        }
    }

    /// The vector rotated a quarter turn counter-clockwise.
    pub fn perpendicular(self) -> Vec2 {
        Vec2::new(-self.y, self.x)
    }

    /// Moves from `self` toward `target` by at most `max_delta`, never overshooting.
    ///
    /// # Examples
    ///
    /// ```
    /// use labyrinth::Vec2;
    ///
    /// let start = Vec2::new(0.0, 0.0);
    /// assert_eq!(start.move_towards(Vec2::new(10.0, 0.0), 2.0), Vec2::new(2.0, 0.0));
    /// assert_eq!(start.move_towards(Vec2::new(1.0, 0.0), 2.0), Vec2::new(1.0, 0.0));
    /// ```
    pub fn move_towards(self, target: Vec2, max_delta: f32) -> Vec2 {
        let delta = target - self;
        let dist = delta.length();
        if dist <= max_delta || dist <= f32::EPSILON {
            target
        } else {
            self + delta * (max_delta / dist)
        }
    }

    /// Linear interpolation, with `t` clamped to `[0, 1]`.
    pub fn lerp(self, other: Vec2, t: f32) -> Vec2 {
        let t = t.clamp(0.0, 1.0);
        self + (other - self) * t
    }

    pub fn min(self, other: Vec2) -> Vec2 {
        Vec2::new(self.x.min(other.x), self.y.min(other.y))
    }

    pub fn max(self, other: Vec2) -> Vec2 {
        Vec2::new(self.x.max(other.x), self.y.max(other.y))
    }
}

impl Add for Vec2 {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self::new(self.x + other.x, self.y + other.y)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, other: Self) {
        self.x += other.x;
        self.y += other.y;
    }
}

impl Sub for Vec2 {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self::new(self.x - other.x, self.y - other.y)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Self;

    fn mul(self, scale: f32) -> Self {
        Self::new(self.x * scale, self.y * scale)
    }
}

impl Neg for Vec2 {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.x, -self.y)
    }
}

/// Axis-aligned rectangle in world space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: Vec2,
    pub max: Vec2,
}

impl Bounds {
    /// Creates bounds from two opposite corners in any order.
    pub fn from_corners(a: Vec2, b: Vec2) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    pub fn from_center(center: Vec2, half_extents: Vec2) -> Self {
        Self::from_corners(center - half_extents, center + half_extents)
    }

    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec2 {
        self.max - self.min
    }

    pub fn half_extents(&self) -> Vec2 {
        self.size() * 0.5
    }

    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.min.x && point.x <= self.max.x && point.y >= self.min.y && point.y <= self.max.y
    }

    /// Smallest bounds containing both.
    pub fn union(&self, other: &Bounds) -> Bounds {
        Bounds {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Closest point inside the bounds.
    pub fn clamp(&self, point: Vec2) -> Vec2 {
        Vec2::new(
            point.x.clamp(self.min.x, self.max.x),
            point.y.clamp(self.min.y, self.max.y),
        )
    }
}
