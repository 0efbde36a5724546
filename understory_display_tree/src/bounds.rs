// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Derived bounds: fast, stroke-inclusive, and effect-inclusive variants.

use alloc::vec;
use kurbo::{Affine, Rect, Vec2};

use crate::tree::Tree;
use crate::types::{NodeId, Transform2D};
use crate::util::{scale_rect, transform_rect_bbox, union_opt};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Extent {
    /// Fill bounds, children offset by position only.
    Fast,
    /// Like `Fast`, with stroke geometry.
    Stroked,
    /// Like `Fast`, scaled by the node's own scale and grown by its effects.
    Full,
}

impl Tree {
    /// Bounds of `id` and its descendants, expressed in `relative_to`'s space.
    ///
    /// Each child's own bounds are offset by the child's position only; rotation,
    /// scale, and skew of children are ignored. This is a fast approximation used
    /// for layout and pointer pre-checks.
    ///
    /// Returns `None` when nothing below `id` has content, or when either handle
    /// is stale.
    pub fn get_bounds(&self, id: NodeId, relative_to: NodeId) -> Option<Rect> {
        self.extent(id, relative_to, Extent::Fast)
    }

    /// Same traversal as [`Tree::get_bounds`] with stroke geometry included.
    pub fn get_rect(&self, id: NodeId, relative_to: NodeId) -> Option<Rect> {
        self.extent(id, relative_to, Extent::Stroked)
    }

    /// Bounds including the node's own scale and the spread of its effects.
    ///
    /// See [`LocalNode::filter_margin`](crate::LocalNode::filter_margin).
    pub fn get_full_bounds(&self, id: NodeId, relative_to: NodeId) -> Option<Rect> {
        self.extent(id, relative_to, Extent::Full)
    }

    fn extent(&self, id: NodeId, relative_to: NodeId, kind: Extent) -> Option<Rect> {
        let target = self.world_transform(relative_to)?;
        let own = self.node_opt(id)?;
        let rect = self.local_extent(id, kind)?;
        if relative_to == id {
            return Some(rect);
        }
        let own_tf = match kind {
            Extent::Fast | Extent::Stroked => own.world_transform,
            // The full extent already carries the node's own scale.
            Extent::Full => {
                let unscaled = Transform2D {
                    scale_x: 1.0,
                    scale_y: 1.0,
                    ..own.local.transform
                };
                let parent = own
                    .parent
                    .map_or(Affine::IDENTITY, |p| self.node(p).world_transform);
                parent * unscaled.to_affine()
            }
        };
        Some(transform_rect_bbox(target.inverse() * own_tf, rect))
    }

    fn local_extent(&self, root: NodeId, kind: Extent) -> Option<Rect> {
        let mut rect = None;
        // (node, offset into `root`'s space, effect margin of its ancestors)
        let mut stack = vec![(root, Vec2::ZERO, Vec2::ZERO)];
        while let Some((id, offset, inherited)) = stack.pop() {
            let node = self.node(id);
            let margin = match kind {
                Extent::Full => inherited + node.local.filter_margin(),
                Extent::Fast | Extent::Stroked => inherited,
            };
            if let Some(c) = &node.local.content {
                let tf = &node.local.transform;
                let r = match kind {
                    Extent::Fast => c.bounds,
                    Extent::Stroked => c.stroked_bounds(),
                    Extent::Full => scale_rect(c.bounds, tf.scale_x, tf.scale_y),
                };
                rect = union_opt(rect, r.inflate(margin.x, margin.y) + offset);
            }
            for &child in &node.children {
                let child_offset = offset + self.node(child).local.transform.offset();
                stack.push((child, child_offset, margin));
            }
        }
        rect
    }

    /// Stage-space area painted by the subtree rooted at `root`.
    ///
    /// Unlike [`Tree::get_bounds`] this maps every node's stroked content
    /// through its full concatenated transform and grows it by the effect
    /// spread of the node and its ancestors within the subtree.
    pub(crate) fn paint_extent(&self, root: NodeId) -> Option<Rect> {
        let to_stage = self.world_transform(self.stage())?.inverse();
        let mut rect = None;
        let mut stack = vec![(root, Vec2::ZERO)];
        while let Some((id, inherited)) = stack.pop() {
            let node = self.node(id);
            let margin = inherited + node.local.filter_margin();
            if let Some(c) = &node.local.content {
                let r = transform_rect_bbox(to_stage * node.world_transform, c.stroked_bounds());
                rect = union_opt(rect, r.inflate(margin.x, margin.y));
            }
            stack.extend(node.children.iter().map(|&child| (child, margin)));
        }
        rect
    }
}

#[cfg(test)]
mod tests {
    use crate::{Content, Effect, LocalNode, Transform2D, Tree};
    use alloc::vec;
    use kurbo::Rect;

    fn boxed(tree: &mut Tree, x: f64, y: f64, r: Rect) -> crate::NodeId {
        tree.create_node(LocalNode {
            transform: Transform2D::from_position(x, y),
            content: Some(Content::rect(r)),
            ..LocalNode::default()
        })
    }

    #[test]
    fn empty_container_has_no_bounds() {
        let mut tree = Tree::new();
        let c = tree.create_container(LocalNode::default());
        assert_eq!(tree.get_bounds(c, c), None);
        assert_eq!(tree.get_rect(c, c), None);
        assert_eq!(tree.get_full_bounds(c, c), None);
    }

    #[test]
    fn child_is_offset_by_position() {
        let mut tree = Tree::new();
        let c = tree.create_container(LocalNode::default());
        let child = boxed(&mut tree, 5.0, 5.0, Rect::new(0.0, 0.0, 10.0, 10.0));
        tree.add_child(c, child).unwrap();
        assert_eq!(tree.get_bounds(c, c), Some(Rect::new(5.0, 5.0, 15.0, 15.0)));
    }

    #[test]
    fn bounds_union_nested_children() {
        let mut tree = Tree::new();
        let outer = tree.create_container(LocalNode::default());
        let inner = tree.create_container(LocalNode {
            transform: Transform2D::from_position(100.0, 0.0),
            ..LocalNode::default()
        });
        let a = boxed(&mut tree, 0.0, 0.0, Rect::new(0.0, 0.0, 10.0, 10.0));
        let b = boxed(&mut tree, 0.0, 20.0, Rect::new(0.0, 0.0, 5.0, 5.0));
        tree.add_child(inner, b).unwrap();
        tree.add_child(outer, a).unwrap();
        tree.add_child(outer, inner).unwrap();
        assert_eq!(
            tree.get_bounds(outer, outer),
            Some(Rect::new(0.0, 0.0, 105.0, 25.0))
        );
    }

    #[test]
    fn relative_bounds_map_through_transforms() {
        let mut tree = Tree::new();
        let stage = tree.stage();
        let holder = tree.create_container(LocalNode {
            transform: Transform2D {
                scale_x: 2.0,
                scale_y: 2.0,
                ..Transform2D::from_position(10.0, 10.0)
            },
            ..LocalNode::default()
        });
        let a = boxed(&mut tree, 0.0, 0.0, Rect::new(0.0, 0.0, 10.0, 10.0));
        tree.add_child(holder, a).unwrap();
        tree.add_child(stage, holder).unwrap();
        assert_eq!(
            tree.get_bounds(a, stage),
            Some(Rect::new(10.0, 10.0, 30.0, 30.0))
        );
        assert_eq!(
            tree.get_bounds(holder, stage),
            Some(Rect::new(10.0, 10.0, 30.0, 30.0))
        );
    }

    #[test]
    fn rect_includes_stroke() {
        let mut tree = Tree::new();
        let n = tree.create_node(LocalNode {
            content: Some(Content::rect(Rect::new(0.0, 0.0, 10.0, 10.0)).with_stroke(2.0)),
            ..LocalNode::default()
        });
        assert_eq!(tree.get_bounds(n, n), Some(Rect::new(0.0, 0.0, 10.0, 10.0)));
        assert_eq!(tree.get_rect(n, n), Some(Rect::new(-1.0, -1.0, 11.0, 11.0)));
    }

    #[test]
    fn full_bounds_scale_and_inflate() {
        let mut tree = Tree::new();
        let c = tree.create_container(LocalNode {
            transform: Transform2D {
                scale_x: 2.0,
                scale_y: 3.0,
                ..Transform2D::IDENTITY
            },
            content: Some(Content::rect(Rect::new(1.0, 1.0, 5.0, 5.0))),
            effects: vec![Effect::new(7, 4.0, 2.0)],
            ..LocalNode::default()
        });
        let child = boxed(&mut tree, 20.0, 0.0, Rect::new(0.0, 0.0, 1.0, 1.0));
        tree.add_child(c, child).unwrap();

        // Own (2,3,10,15) joined with child (20,0,21,1), then grown by (4,2).
        assert_eq!(
            tree.get_full_bounds(c, c),
            Some(Rect::new(-2.0, -2.0, 25.0, 17.0))
        );
    }

    #[test]
    fn full_bounds_in_stage_space_apply_scale_once() {
        let mut tree = Tree::new();
        let stage = tree.stage();
        let n = tree.create_node(LocalNode {
            transform: Transform2D {
                scale_x: 2.0,
                scale_y: 2.0,
                ..Transform2D::from_position(5.0, 5.0)
            },
            content: Some(Content::rect(Rect::new(0.0, 0.0, 10.0, 10.0))),
            effects: vec![Effect::new(1, 1.0, 1.0)],
            ..LocalNode::default()
        });
        tree.add_child(stage, n).unwrap();

        assert_eq!(
            tree.get_full_bounds(n, n),
            Some(Rect::new(-1.0, -1.0, 21.0, 21.0))
        );
        assert_eq!(
            tree.get_bounds(n, stage),
            Some(Rect::new(5.0, 5.0, 25.0, 25.0))
        );
        assert_eq!(
            tree.get_full_bounds(n, stage),
            Some(Rect::new(4.0, 4.0, 26.0, 26.0))
        );
    }

    #[test]
    fn deep_chain_bounds_do_not_recurse() {
        let mut tree = Tree::new();
        let root = tree.create_container(LocalNode::default());
        let mut tip = root;
        for _ in 0..10_000 {
            let next = tree.create_container(LocalNode {
                transform: Transform2D::from_position(1.0, 0.0),
                ..LocalNode::default()
            });
            tree.add_child(tip, next).unwrap();
            tip = next;
        }
        tree.set_content(tip, Some(Content::rect(Rect::new(0.0, 0.0, 1.0, 1.0))))
            .unwrap();
        assert_eq!(
            tree.get_bounds(root, root),
            Some(Rect::new(10_000.0, 0.0, 10_001.0, 1.0))
        );
    }

    #[test]
    fn stale_handles_have_no_bounds() {
        let mut tree = Tree::new();
        let n = boxed(&mut tree, 0.0, 0.0, Rect::new(0.0, 0.0, 1.0, 1.0));
        tree.destroy(n).unwrap();
        assert_eq!(tree.get_bounds(n, n), None);
        assert_eq!(tree.get_bounds(tree.stage(), n), None);
    }
}
