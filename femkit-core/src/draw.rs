//! Optional visualization hook.
//!
//! The kernel never draws on its own. A caller that wants a picture of the
//! mesh passes a [`Canvas`] to [`Mesh::draw`](crate::mesh::Mesh::draw) and each
//! element emits its outline through it.

use crate::types::Point2;

/// Drawing surface supplied by the caller.
pub trait Canvas {
    /// Draw a straight segment between two points in model coordinates.
    fn line(&mut self, from: Point2, to: Point2);
}

/// Canvas that records segments, for export or inspection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SegmentList {
    pub segments: Vec<(Point2, Point2)>,
}

impl SegmentList {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Canvas for SegmentList {
    fn line(&mut self, from: Point2, to: Point2) {
        self.segments.push((from, to));
    }
}
