//! # Utilities Module
//!
//! World-space math, room-grid helpers and the seeded random source.

pub mod grid;
pub mod math;
pub mod rng;

pub use grid::*;
pub use math::*;
pub use rng::*;
