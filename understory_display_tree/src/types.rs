// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Public types for the display tree: node identifiers, flags, transforms, and local content.

use alloc::{string::String, vec::Vec};
use kurbo::{Affine, BezPath, Point, Rect, Shape, Vec2};

use crate::error::TreeError;

/// Identifier for a node in the tree (generational).
///
/// A `NodeId` is a weak handle: holding one never keeps a node alive, and a
/// handle to a destroyed node is detected as stale by every accessor.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct NodeId(pub(crate) u32, pub(crate) u32);

impl NodeId {
    pub(crate) const fn new(idx: u32, generation: u32) -> Self {
        Self(idx, generation)
    }

    pub(crate) const fn idx(self) -> usize {
        self.0 as usize
    }
}

/// Whether a node can own children.
///
/// Fixed when the node is created.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum NodeKind {
    /// A node without children.
    Leaf,
    /// A node that owns an ordered list of children.
    Container,
}

bitflags::bitflags! {
    /// Node flags controlling painting and pointer routing.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct NodeFlags: u8 {
        /// Node is visible. Invisible nodes skip their whole subtree when
        /// rendering and picking.
        const VISIBLE              = 0b0000_0001;
        /// Node participates in pointer routing.
        const INTERACTIVE          = 0b0000_0010;
        /// Descendants of this container are reported as pointer targets.
        /// When cleared, a hit anywhere below resolves to the container itself.
        const INTERACTIVE_CHILDREN = 0b0000_0100;
        /// Node is outside the visible viewport; rendering and picking skip it.
        const OFFSCREEN            = 0b0000_1000;
    }
}

impl Default for NodeFlags {
    fn default() -> Self {
        Self::VISIBLE | Self::INTERACTIVE | Self::INTERACTIVE_CHILDREN
    }
}

/// Decomposed local transform of a node relative to its parent.
///
/// Composed as translate · rotate · skew · scale.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform2D {
    /// Horizontal position in parent space.
    pub x: f64,
    /// Vertical position in parent space.
    pub y: f64,
    /// Horizontal scale factor.
    pub scale_x: f64,
    /// Vertical scale factor.
    pub scale_y: f64,
    /// Rotation in radians.
    pub rotation: f64,
    /// Horizontal skew factor.
    pub skew_x: f64,
    /// Vertical skew factor.
    pub skew_y: f64,
}

impl Default for Transform2D {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform2D {
    /// The identity transform.
    pub const IDENTITY: Self = Self {
        x: 0.0,
        y: 0.0,
        scale_x: 1.0,
        scale_y: 1.0,
        rotation: 0.0,
        skew_x: 0.0,
        skew_y: 0.0,
    };

    /// A pure translation.
    pub const fn from_position(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            ..Self::IDENTITY
        }
    }

    /// Position as a point in parent space.
    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Position as an offset vector in parent space.
    pub fn offset(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    /// Build the affine matrix mapping local space into parent space.
    pub fn to_affine(&self) -> Affine {
        Affine::translate(self.offset())
            * Affine::rotate(self.rotation)
            * Affine::skew(self.skew_x, self.skew_y)
            * Affine::scale_non_uniform(self.scale_x, self.scale_y)
    }
}

/// Painted content carried by a node.
#[derive(Clone, Debug, PartialEq)]
pub struct Content {
    /// Fill bounds in local space. Always normalized.
    pub bounds: Rect,
    /// Optional precise outline used for shape-accurate hit testing.
    pub outline: Option<BezPath>,
    /// Stroke width painted centered on the outline.
    pub stroke_width: f64,
}

impl Content {
    /// Content covering `rect`, normalized so that `x1 >= x0` and `y1 >= y0`.
    pub fn rect(rect: Rect) -> Self {
        Self {
            bounds: rect.abs(),
            outline: None,
            stroke_width: 0.0,
        }
    }

    /// Content of the given size anchored at the local origin.
    ///
    /// Fails with [`TreeError::InvalidArgument`] for negative or non-finite sizes.
    pub fn sized(width: f64, height: f64) -> Result<Self, TreeError> {
        if !width.is_finite() || !height.is_finite() {
            return Err(TreeError::InvalidArgument("content size must be finite"));
        }
        if width < 0.0 || height < 0.0 {
            return Err(TreeError::InvalidArgument(
                "content size must not be negative",
            ));
        }
        Ok(Self::rect(Rect::new(0.0, 0.0, width, height)))
    }

    /// Content described by a path; its bounds are the path's bounding box.
    pub fn path(path: BezPath) -> Self {
        Self {
            bounds: path.bounding_box(),
            outline: Some(path),
            stroke_width: 0.0,
        }
    }

    /// Set the stroke width.
    pub fn with_stroke(mut self, width: f64) -> Self {
        self.stroke_width = width.max(0.0);
        self
    }

    /// Bounds including half the stroke on every side.
    pub fn stroked_bounds(&self) -> Rect {
        let half = self.stroke_width * 0.5;
        self.bounds.inflate(half, half)
    }

    /// Precise containment test in local space.
    ///
    /// Uses the outline when present, otherwise the fill bounds.
    pub fn contains(&self, point: Point) -> bool {
        match &self.outline {
            Some(path) => path.contains(point),
            None => self.bounds.contains(point),
        }
    }
}

/// An opaque effect stage composited around a node's painted output.
///
/// The tree never interprets effects; it forwards them to the [`Surface`](crate::Surface)
/// and uses their spread to grow [`Tree::get_full_bounds`](crate::Tree::get_full_bounds).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Effect {
    /// Backend-defined effect identifier.
    pub id: u32,
    /// Horizontal distance painted beyond the nominal shape.
    pub offset_x: f64,
    /// Vertical distance painted beyond the nominal shape.
    pub offset_y: f64,
}

impl Effect {
    /// Create an effect with the given spread.
    pub const fn new(id: u32, offset_x: f64, offset_y: f64) -> Self {
        Self {
            id,
            offset_x,
            offset_y,
        }
    }
}

/// Local data for a node.
#[derive(Clone, Debug, Default)]
pub struct LocalNode {
    /// Local transform relative to parent space.
    pub transform: Transform2D,
    /// Painted content, if any. Containers paint it beneath their children.
    pub content: Option<Content>,
    /// Visibility and pointer-routing flags.
    pub flags: NodeFlags,
    /// Lookup name; not required to be unique.
    pub name: Option<String>,
    /// Effect stages applied around this node's output.
    pub effects: Vec<Effect>,
}

impl LocalNode {
    /// Per-axis margin the effects paint outside the nominal shape.
    pub fn filter_margin(&self) -> Vec2 {
        self.effects.iter().fold(Vec2::ZERO, |acc, e| {
            Vec2::new(acc.x.max(e.offset_x), acc.y.max(e.offset_y))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn sized_rejects_negative_and_non_finite() {
        assert!(Content::sized(10.0, 5.0).is_ok());
        assert!(matches!(
            Content::sized(-1.0, 5.0),
            Err(TreeError::InvalidArgument(_))
        ));
        assert!(matches!(
            Content::sized(1.0, f64::NAN),
            Err(TreeError::InvalidArgument(_))
        ));
    }

    #[test]
    fn rect_content_is_normalized() {
        let c = Content::rect(Rect::new(10.0, 10.0, 0.0, 0.0));
        assert_eq!(c.bounds, Rect::new(0.0, 0.0, 10.0, 10.0));
    }

    #[test]
    fn stroke_grows_by_half_width() {
        let c = Content::rect(Rect::new(0.0, 0.0, 10.0, 10.0)).with_stroke(4.0);
        assert_eq!(c.stroked_bounds(), Rect::new(-2.0, -2.0, 12.0, 12.0));
    }

    #[test]
    fn outline_refines_containment() {
        let mut tri = BezPath::new();
        tri.move_to((0.0, 0.0));
        tri.line_to((10.0, 0.0));
        tri.line_to((0.0, 10.0));
        tri.close_path();
        let c = Content::path(tri);
        assert_eq!(c.bounds, Rect::new(0.0, 0.0, 10.0, 10.0));
        assert!(c.contains(Point::new(2.0, 2.0)));
        assert!(!c.contains(Point::new(8.0, 8.0)), "outside the diagonal");
    }

    #[test]
    fn filter_margin_takes_per_axis_max() {
        let local = LocalNode {
            effects: vec![Effect::new(1, 4.0, 1.0), Effect::new(2, 2.0, 6.0)],
            ..LocalNode::default()
        };
        assert_eq!(local.filter_margin(), Vec2::new(4.0, 6.0));
        assert_eq!(LocalNode::default().filter_margin(), Vec2::ZERO);
    }

    #[test]
    fn translation_only_transform() {
        let tf = Transform2D::from_position(5.0, 7.0);
        assert_eq!(tf.to_affine() * Point::ORIGIN, Point::new(5.0, 7.0));
    }
}
