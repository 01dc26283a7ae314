//! Core data types for FEM operations.
//!
//! This module defines fundamental types used throughout femkit:
//! - Geometric primitives (points, vectors) for the planar mesh family
//! - Identity types for every persisted entity kind

use nalgebra::Vector2;
use std::fmt;

/// A point in the plane.
pub type Point2 = Vector2<f64>;

/// A planar vector (displacement, force, acceleration).
pub type Vec2 = Vector2<f64>;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u32);

        impl $name {
            /// Entity kind name used in diagnostics.
            pub const KIND: &'static str = $kind;
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u32> for $name {
            fn from(id: u32) -> Self {
                Self(id)
            }
        }
    };
}

entity_id!(
    /// Identity of a node, unique within a mesh.
    NodeId,
    "node"
);
entity_id!(
    /// Identity of a material, unique within a mesh.
    MaterialId,
    "material"
);
entity_id!(
    /// Identity of an element, unique within a mesh.
    ElementId,
    "element"
);
entity_id!(
    /// Identity of a load, unique within a mesh.
    LoadId,
    "load"
);

/// Euclidean distance and direction cosines of the segment `a -> b`.
///
/// Returns `(length, cos, sin)`.
pub fn segment_geometry(a: &Point2, b: &Point2) -> (f64, f64, f64) {
    let d = b - a;
    let length = d.norm();
    if length == 0.0 {
        return (0.0, 0.0, 0.0);
    }
    (length, d.x / length, d.y / length)
}
