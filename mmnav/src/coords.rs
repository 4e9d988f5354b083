//! Caller-frame and model-frame points.
//!
//! Callers speak in world coordinates where `z` is up. The navigation mesh
//! stores positions with `y` up. The two frames differ only by a cyclic
//! permutation of the axes:
//!
//! | Frame | Type | Axis order |
//! |-------|------|------------|
//! | caller | [`WorldPoint`] | `(x, y, z)` |
//! | model | [`NavPoint`] | `(y, z, x)` of the caller point |
//!
//! The frames are separate types, so a point can only move between them through
//! [`WorldPoint::to_nav`] and [`NavPoint::to_world`]. Both are exact.

/// A position in the caller's world frame (`z` up).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WorldPoint {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// A position in the navigation mesh frame (`y` up).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NavPoint(pub [f32; 3]);

impl WorldPoint {
    /// Create a new world point.
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Convert into the navigation mesh frame: `(x, y, z) -> (y, z, x)`.
    ///
    /// # Examples
    ///
    /// ```
    /// use mmnav::WorldPoint;
    ///
    /// let nav = WorldPoint::new(1.0, 2.0, 3.0).to_nav();
    /// assert_eq!(nav.0, [2.0, 3.0, 1.0]);
    /// ```
    pub fn to_nav(self) -> NavPoint {
        NavPoint([self.y, self.z, self.x])
    }
}

impl NavPoint {
    /// Convert into the caller's world frame: `(x, y, z) -> (z, x, y)`.
    ///
    /// # Examples
    ///
    /// ```
    /// use mmnav::{NavPoint, WorldPoint};
    ///
    /// let world = NavPoint([2.0, 3.0, 1.0]).to_world();
    /// assert_eq!(world, WorldPoint::new(1.0, 2.0, 3.0));
    /// ```
    pub fn to_world(self) -> WorldPoint {
        let [x, y, z] = self.0;
        WorldPoint { x: z, y: x, z: y }
    }

    /// Raw components in mesh order.
    pub fn as_array(&self) -> &[f32; 3] {
        &self.0
    }
}

impl From<[f32; 3]> for NavPoint {
    fn from(v: [f32; 3]) -> Self {
        NavPoint(v)
    }
}
