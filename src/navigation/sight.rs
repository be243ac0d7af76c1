//! # Line of Sight
//!
//! Obstruction queries between world points, and the obstacle field that
//! answers them for a generated floor.

use crate::utils::{Bounds, Vec2};
use bitflags::bitflags;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

bitflags! {
    /// Obstacle categories a query can filter on.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ObstacleLayer: u8 {
        const ROCKS = 0x01;
        const WALLS = 0x02;
        const DOORS = 0x04;
        /// Everything that stops movement
        const SOLID = Self::ROCKS.bits() | Self::WALLS.bits();
    }
}

impl Serialize for ObstacleLayer {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.bits().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ObstacleLayer {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bits = u8::deserialize(deserializer)?;
        Ok(ObstacleLayer::from_bits_truncate(bits))
    }
}

/// Obstruction queries against the world.
///
/// Only [`is_blocked`](LineOfSight::is_blocked) is required. Navigation uses
/// [`has_clearance`](LineOfSight::has_clearance) so agents with a body width
/// do not clip corners.
pub trait LineOfSight {
    /// Whether anything on `layers` crosses the segment from `origin` to `target`.
    fn is_blocked(&self, origin: Vec2, target: Vec2, layers: ObstacleLayer) -> bool;

    /// Whether anything on `layers` overlaps the circle.
    fn overlaps(&self, _center: Vec2, _radius: f32, _layers: ObstacleLayer) -> bool {
        false
    }

    fn can_see(&self, origin: Vec2, target: Vec2, layers: ObstacleLayer) -> bool {
        !self.is_blocked(origin, target, layers)
    }

    /// Casts three parallel rays: the centre line plus one on each side,
    /// offset by `half_width` perpendicular to the direction of travel.
    ///
    /// # Examples
    ///
    /// ```
    /// use labyrinth::{LineOfSight, ObstacleField, ObstacleLayer, Vec2};
    ///
    /// let mut field = ObstacleField::new();
    /// field.add_circle(Vec2::new(5.0, 0.6), 0.3, ObstacleLayer::ROCKS);
    ///
    /// let (a, b) = (Vec2::new(0.0, 0.0), Vec2::new(10.0, 0.0));
    /// assert!(field.can_see(a, b, ObstacleLayer::SOLID));
    /// assert!(!field.has_clearance(a, b, 0.5, ObstacleLayer::SOLID));
    /// ```
    fn has_clearance(&self, origin: Vec2, target: Vec2, half_width: f32, layers: ObstacleLayer) -> bool {
        let direction = (target - origin).normalized();
        if half_width <= 0.0 || direction == Vec2::ZERO {
            return self.can_see(origin, target, layers);
        }

        let offset = direction.perpendicular() * half_width;
        [Vec2::ZERO, offset, -offset]
            .iter()
            .all(|&o| !self.is_blocked(origin + o, target + o, layers))
    }
}

/// A world with nothing in it.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenSight;

impl LineOfSight for OpenSight {
    fn is_blocked(&self, _origin: Vec2, _target: Vec2, _layers: ObstacleLayer) -> bool {
        false
    }
}

/// A round obstacle such as a rock.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CircleObstacle {
    pub center: Vec2,
    pub radius: f32,
    pub layer: ObstacleLayer,
}

/// An axis-aligned obstacle such as a wall segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RectObstacle {
    pub bounds: Bounds,
    pub layer: ObstacleLayer,
}

/// Static obstacles of a floor: circles and axis-aligned rectangles.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObstacleField {
    circles: Vec<CircleObstacle>,
    rects: Vec<RectObstacle>,
}

impl ObstacleField {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_circle(&mut self, center: Vec2, radius: f32, layer: ObstacleLayer) {
        self.circles.push(CircleObstacle {
            center,
            radius,
            layer,
        });
    }

    pub fn add_rect(&mut self, bounds: Bounds, layer: ObstacleLayer) {
        self.rects.push(RectObstacle { bounds, layer });
    }

    pub fn circles(&self) -> &[CircleObstacle] {
        &self.circles
    }

    pub fn rects(&self) -> &[RectObstacle] {
        &self.rects
    }

    pub fn len(&self) -> usize {
        self.circles.len() + self.rects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of obstacles on any of `layers`.
    pub fn count(&self, layers: ObstacleLayer) -> usize {
        self.circles.iter().filter(|c| c.layer.intersects(layers)).count()
            + self.rects.iter().filter(|r| r.layer.intersects(layers)).count()
    }

    /// Adds every obstacle of `other`.
    pub fn extend(&mut self, other: &ObstacleField) {
        self.circles.extend_from_slice(&other.circles);
        self.rects.extend_from_slice(&other.rects);
    }
}

impl LineOfSight for ObstacleField {
    fn is_blocked(&self, origin: Vec2, target: Vec2, layers: ObstacleLayer) -> bool {
        self.circles
            .iter()
            .filter(|c| c.layer.intersects(layers))
            .any(|c| segment_hits_circle(origin, target, c.center, c.radius))
            || self
                .rects
                .iter()
                .filter(|r| r.layer.intersects(layers))
                .any(|r| segment_hits_rect(origin, target, &r.bounds))
    }

    fn overlaps(&self, center: Vec2, radius: f32, layers: ObstacleLayer) -> bool {
        let r2 = radius * radius;
        self.circles
            .iter()
            .filter(|c| c.layer.intersects(layers))
            .any(|c| {
                let reach = c.radius + radius;
                c.center.distance_squared(center) < reach * reach
            })
            || self
                .rects
                .iter()
                .filter(|r| r.layer.intersects(layers))
                .any(|r| r.bounds.clamp(center).distance_squared(center) < r2)
    }
}

/// Whether the segment `a`-`b` passes strictly within `radius` of `center`.
pub fn segment_hits_circle(a: Vec2, b: Vec2, center: Vec2, radius: f32) -> bool {
    let ab = b - a;
    let len_sq = ab.length_squared();
    let t = if len_sq <= f32::EPSILON {
        0.0
    } else {
        ((center - a).dot(ab) / len_sq).clamp(0.0, 1.0)
    };
    let closest = a + ab * t;
    closest.distance_squared(center) < radius * radius
}

/// Whether the segment `a`-`b` touches the rectangle. Slab clipping.
pub fn segment_hits_rect(a: Vec2, b: Vec2, rect: &Bounds) -> bool {
    let d = b - a;
    let mut t_enter = 0.0f32;
    let mut t_exit = 1.0f32;

    for (start, delta, lo, hi) in [
        (a.x, d.x, rect.min.x, rect.max.x),
        (a.y, d.y, rect.min.y, rect.max.y),
    ] {
        if delta.abs() <= f32::EPSILON {
            if start < lo || start > hi {
                return false;
            }
            continue;
        }
        let (mut t0, mut t1) = ((lo - start) / delta, (hi - start) / delta);
        if t0 > t1 {
            std::mem::swap(&mut t0, &mut t1);
        }
        t_enter = t_enter.max(t0);
        t_exit = t_exit.min(t1);
        if t_enter > t_exit {
            return false;
        }
    }
    true
}
