// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Hit testing and pointer routing.
//!
//! Two families of queries live here:
//!
//! - [`Tree::hit_test_point`] and [`Tree::hit_test_object`] answer geometric
//!   questions about a single node and ignore flags.
//! - [`Tree::pick`] and [`Tree::pick_from`] route a pointer to the front-most
//!   eligible node. The walk is the exact reverse of the render traversal:
//!   children are visited from the highest index down, each container's
//!   children before its own content, and the first hit ends the walk.

use alloc::{vec, vec::Vec};
use kurbo::Point;

use crate::tree::Tree;
use crate::types::{NodeFlags, NodeId, NodeKind};
use crate::util::{contains_rect, transform_rect_bbox};

/// Result of pointer routing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Hit {
    /// The node that receives the pointer.
    pub node: NodeId,
    /// Path from the routing root to `node` (inclusive).
    pub path: Vec<NodeId>,
}

impl Tree {
    /// Test a stage-space point against `id`.
    ///
    /// Without `shape_flag` the point is tested against
    /// [`get_bounds`](Tree::get_bounds) in local space. With `shape_flag` it is
    /// tested against the actual content of `id` and its descendants, using
    /// content outlines where present.
    pub fn hit_test_point(&self, id: NodeId, point: Point, shape_flag: bool) -> bool {
        let Some(local) = self.global_to_local(id, point) else {
            return false;
        };
        if shape_flag {
            self.shape_contains(id, local)
        } else {
            self.get_bounds(id, id).is_some_and(|r| r.contains(local))
        }
    }

    fn shape_contains(&self, root: NodeId, local: Point) -> bool {
        let mut stack = vec![(root, local)];
        while let Some((id, local)) = stack.pop() {
            let node = self.node(id);
            if let Some(content) = &node.local.content
                && content.contains(local)
            {
                return true;
            }
            for &child in &node.children {
                let to_child = self.node(child).local.transform.to_affine().inverse();
                stack.push((child, to_child * local));
            }
        }
        false
    }

    /// Returns true if the rectangle of `a` fully contains the rectangle of `b`.
    ///
    /// Both rectangles come from [`get_rect`](Tree::get_rect) and are compared
    /// in stage space.
    pub fn hit_test_object(&self, a: NodeId, b: NodeId) -> bool {
        match (self.global_rect(a), self.global_rect(b)) {
            (Some(ra), Some(rb)) => contains_rect(ra, rb),
            _ => false,
        }
    }

    fn global_rect(&self, id: NodeId) -> Option<kurbo::Rect> {
        let rect = self.get_rect(id, id)?;
        Some(transform_rect_bbox(self.node(id).world_transform, rect))
    }

    /// Route a stage-space point from the stage to the front-most eligible node.
    ///
    /// Nodes detached from the stage never receive the pointer.
    pub fn pick(&self, point: Point) -> Option<Hit> {
        self.pick_from(self.stage(), point)
    }

    /// Route a point from an arbitrary subtree root.
    ///
    /// `point` is interpreted in the space of the topmost ancestor of `root`.
    /// Nodes that are invisible, off-screen, or not interactive are skipped
    /// together with their subtrees.
    pub fn pick_from(&self, root: NodeId, point: Point) -> Option<Hit> {
        if !self.is_alive(root) {
            return None;
        }
        let mut path = self.pick_path(root, point)?;

        // A container that keeps pointers from its children becomes the target.
        let last = path.len() - 1;
        if let Some(pos) = path[..last].iter().position(|&id| {
            !self
                .node(id)
                .local
                .flags
                .contains(NodeFlags::INTERACTIVE_CHILDREN)
        }) {
            path.truncate(pos + 1);
        }
        let node = *path.last()?;
        Some(Hit { node, path })
    }

    /// Path from `root` to the first node whose content contains `point`,
    /// visiting children from the top of the paint order down and each
    /// container's children before its own content.
    fn pick_path(&self, root: NodeId, point: Point) -> Option<Vec<NodeId>> {
        enum Step {
            Enter(NodeId, usize),
            Content(NodeId, usize),
        }

        let mut path = Vec::new();
        let mut stack = vec![Step::Enter(root, 0)];
        while let Some(step) = stack.pop() {
            match step {
                Step::Enter(id, depth) => {
                    let node = self.node(id);
                    let flags = node.local.flags;
                    if !flags.contains(NodeFlags::VISIBLE | NodeFlags::INTERACTIVE)
                        || flags.contains(NodeFlags::OFFSCREEN)
                    {
                        continue;
                    }
                    path.truncate(depth);
                    path.push(id);
                    stack.push(Step::Content(id, depth));
                    if node.kind == NodeKind::Container {
                        // Pushed ascending so the top-most child pops first.
                        stack.extend(node.children.iter().map(|&c| Step::Enter(c, depth + 1)));
                    }
                }
                Step::Content(id, depth) => {
                    let node = self.node(id);
                    if let Some(content) = &node.local.content
                        && content.contains(node.world_transform.inverse() * point)
                    {
                        path.truncate(depth + 1);
                        return Some(path);
                    }
                }
            }
        }
        None
    }
}
