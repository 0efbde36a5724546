// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Back-to-front render traversal.

use alloc::vec;
use kurbo::{Affine, Vec2};
use smallvec::SmallVec;

use crate::tree::Tree;
use crate::types::{Content, Effect, NodeFlags, NodeId};

/// Rasterization backend driven by [`Tree::render`].
///
/// Calls arrive in paint order. An error aborts the traversal and is
/// returned to the caller unchanged.
pub trait Surface {
    /// Backend failure type.
    type Error;

    /// Paint one node's content.
    fn draw(&mut self, item: &DrawItem<'_>) -> Result<(), Self::Error>;
}

/// A single paint request.
#[derive(Clone, Copy, Debug)]
pub struct DrawItem<'a> {
    /// The node being painted.
    pub node: NodeId,
    /// Local-to-surface transform, including the render offset.
    pub transform: Affine,
    /// The node's content, in local space.
    pub content: &'a Content,
    /// Effect stages to composite around the output, outermost first.
    pub effects: &'a [Effect],
}

/// Per-frame diagnostics, owned by whoever drives the frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Number of [`Surface::draw`] calls that succeeded.
    pub draw_calls: u32,
    /// Number of visible nodes visited.
    pub nodes_visited: u32,
    /// Number of subtrees skipped because their root was invisible or off-screen.
    pub culled_subtrees: u32,
}

impl FrameStats {
    /// Zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset the counters before the next frame.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

type EffectStack = SmallVec<[Effect; 4]>;

impl Tree {
    /// Paint the subtree rooted at `id` in back-to-front order.
    ///
    /// An invisible or off-screen node is skipped together with its subtree and
    /// only counts towards [`FrameStats::culled_subtrees`]. Otherwise the node's
    /// own content is drawn first, then each child in ascending index order.
    /// `effects` is the stack inherited from ancestors; the node's own effects
    /// are appended to it.
    pub fn render<S: Surface + ?Sized>(
        &self,
        id: NodeId,
        surface: &mut S,
        offset: Vec2,
        effects: &[Effect],
        stats: &mut FrameStats,
    ) -> Result<(), S::Error> {
        if !self.is_alive(id) {
            return Ok(());
        }
        let to_surface = Affine::translate(offset);
        let mut stack = EffectStack::new();
        stack.extend_from_slice(effects);

        // (node, effect stack depth inherited from its ancestors)
        let mut pending = vec![(id, stack.len())];
        while let Some((id, depth)) = pending.pop() {
            let node = self.node(id);
            let flags = node.local.flags;
            if !flags.contains(NodeFlags::VISIBLE) || flags.contains(NodeFlags::OFFSCREEN) {
                stats.culled_subtrees += 1;
                continue;
            }
            stats.nodes_visited += 1;

            stack.truncate(depth);
            stack.extend_from_slice(&node.local.effects);

            if let Some(content) = &node.local.content {
                surface.draw(&DrawItem {
                    node: id,
                    transform: to_surface * node.world_transform,
                    content,
                    effects: &stack,
                })?;
                stats.draw_calls += 1;
            }

            // Reversed so that children are painted in ascending order.
            pending.extend(node.children.iter().rev().map(|&child| (child, stack.len())));
        }
        Ok(())
    }

    /// Render the stage at zero offset.
    ///
    /// On success the redraw flag and pending damage are cleared. On failure
    /// they are kept so the next frame repaints.
    pub fn render_frame<S: Surface + ?Sized>(
        &mut self,
        surface: &mut S,
        stats: &mut FrameStats,
    ) -> Result<(), S::Error> {
        self.render(self.stage(), surface, Vec2::ZERO, &[], stats)?;
        self.finish_frame();
        log::trace!(
            "frame rendered: {} draws, {} nodes, {} culled",
            stats.draw_calls,
            stats.nodes_visited,
            stats.culled_subtrees
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{LocalNode, Transform2D};
    use alloc::{vec, vec::Vec};
    use kurbo::{Point, Rect};

    #[derive(Default)]
    struct Recorder {
        drawn: Vec<(NodeId, Affine, Vec<u32>)>,
        fail_on: Option<NodeId>,
    }

    impl Surface for Recorder {
        type Error = NodeId;

        fn draw(&mut self, item: &DrawItem<'_>) -> Result<(), NodeId> {
            if self.fail_on == Some(item.node) {
                return Err(item.node);
            }
            self.drawn.push((
                item.node,
                item.transform,
                item.effects.iter().map(|e| e.id).collect(),
            ));
            Ok(())
        }
    }

    fn boxed(tree: &mut Tree) -> NodeId {
        tree.create_node(LocalNode {
            content: Some(Content::rect(Rect::new(0.0, 0.0, 10.0, 10.0))),
            ..LocalNode::default()
        })
    }

    fn order(rec: &Recorder) -> Vec<NodeId> {
        rec.drawn.iter().map(|d| d.0).collect()
    }

    #[test]
    fn paint_order_is_reverse_of_pick_order() {
        let mut tree = Tree::new();
        let stage = tree.stage();
        let a = boxed(&mut tree);
        let b = boxed(&mut tree);
        let c = boxed(&mut tree);
        for n in [a, b, c] {
            tree.add_child(stage, n).unwrap();
        }

        let mut rec = Recorder::default();
        let mut stats = FrameStats::new();
        tree.render_frame(&mut rec, &mut stats).unwrap();
        assert_eq!(order(&rec), vec![a, b, c]);
        assert_eq!(stats.draw_calls, 3);
        assert_eq!(stats.nodes_visited, 4, "stage plus three leaves");

        // All three overlap; routing must pick the last painted one.
        assert_eq!(tree.pick(Point::new(5.0, 5.0)).map(|h| h.node), Some(c));
    }

    #[test]
    fn hidden_subtree_is_skipped_without_side_effects() {
        let mut tree = Tree::new();
        let stage = tree.stage();
        let group = tree.create_container(LocalNode::default());
        let inside = boxed(&mut tree);
        let outside = boxed(&mut tree);
        tree.add_child(group, inside).unwrap();
        tree.add_child(stage, group).unwrap();
        tree.add_child(stage, outside).unwrap();

        tree.set_flags(group, NodeFlags::INTERACTIVE).unwrap();
        let mut rec = Recorder::default();
        let mut stats = FrameStats::new();
        tree.render_frame(&mut rec, &mut stats).unwrap();
        assert_eq!(order(&rec), vec![outside]);
        assert_eq!(stats.nodes_visited, 2);
        assert_eq!(stats.culled_subtrees, 1);

        tree.set_flags(group, NodeFlags::default() | NodeFlags::OFFSCREEN)
            .unwrap();
        rec.drawn.clear();
        stats.reset();
        tree.render_frame(&mut rec, &mut stats).unwrap();
        assert_eq!(order(&rec), vec![outside]);
        assert_eq!(
            stats,
            FrameStats {
                draw_calls: 1,
                nodes_visited: 2,
                culled_subtrees: 1,
            }
        );
    }

    #[test]
    fn container_content_paints_before_children() {
        let mut tree = Tree::new();
        let stage = tree.stage();
        let panel = tree.create_container(LocalNode {
            content: Some(Content::rect(Rect::new(0.0, 0.0, 50.0, 50.0))),
            ..LocalNode::default()
        });
        let child = boxed(&mut tree);
        tree.add_child(panel, child).unwrap();
        tree.add_child(stage, panel).unwrap();

        let mut rec = Recorder::default();
        tree.render_frame(&mut rec, &mut FrameStats::new()).unwrap();
        assert_eq!(order(&rec), vec![panel, child]);
    }

    #[test]
    fn offset_and_effects_are_forwarded() {
        let mut tree = Tree::new();
        let group = tree.create_container(LocalNode {
            transform: Transform2D::from_position(5.0, 0.0),
            effects: vec![Effect::new(1, 2.0, 2.0)],
            ..LocalNode::default()
        });
        let leaf = tree.create_node(LocalNode {
            content: Some(Content::rect(Rect::new(0.0, 0.0, 1.0, 1.0))),
            effects: vec![Effect::new(2, 0.0, 0.0)],
            ..LocalNode::default()
        });
        tree.add_child(group, leaf).unwrap();

        let mut rec = Recorder::default();
        let mut stats = FrameStats::new();
        tree.render(
            group,
            &mut rec,
            Vec2::new(100.0, 0.0),
            &[Effect::new(9, 0.0, 0.0)],
            &mut stats,
        )
        .unwrap();
        let (node, transform, effects) = &rec.drawn[0];
        assert_eq!(*node, leaf);
        assert_eq!(*transform * Point::ORIGIN, Point::new(105.0, 0.0));
        assert_eq!(effects, &vec![9, 1, 2]);
    }

    #[test]
    fn surface_error_propagates_and_keeps_frame_dirty() {
        let mut tree = Tree::new();
        let stage = tree.stage();
        let a = boxed(&mut tree);
        let b = boxed(&mut tree);
        let c = boxed(&mut tree);
        for n in [a, b, c] {
            tree.add_child(stage, n).unwrap();
        }

        let mut rec = Recorder {
            fail_on: Some(b),
            ..Recorder::default()
        };
        let mut stats = FrameStats::new();
        assert_eq!(tree.render_frame(&mut rec, &mut stats), Err(b));
        assert_eq!(order(&rec), vec![a]);
        assert_eq!(stats.draw_calls, 1);
        assert!(tree.needs_redraw());

        rec.fail_on = None;
        rec.drawn.clear();
        stats.reset();
        tree.render_frame(&mut rec, &mut stats).unwrap();
        assert!(!tree.needs_redraw());
        assert!(tree.take_damage().is_empty());
    }

    #[test]
    fn sibling_effects_do_not_leak() {
        let mut tree = Tree::new();
        let stage = tree.stage();
        let glow = tree.create_container(LocalNode {
            effects: vec![Effect::new(1, 0.0, 0.0)],
            ..LocalNode::default()
        });
        let inner = boxed(&mut tree);
        let plain = boxed(&mut tree);
        tree.add_child(glow, inner).unwrap();
        tree.add_child(stage, glow).unwrap();
        tree.add_child(stage, plain).unwrap();

        let mut rec = Recorder::default();
        tree.render_frame(&mut rec, &mut FrameStats::new()).unwrap();
        assert_eq!(order(&rec), vec![inner, plain]);
        assert_eq!(rec.drawn[0].2, vec![1]);
        assert!(rec.drawn[1].2.is_empty());
    }

    #[test]
    fn deep_chain_renders_without_recursion() {
        let mut tree = Tree::new();
        let mut tip = tree.stage();
        for _ in 0..10_000 {
            let next = tree.create_container(LocalNode::default());
            tree.add_child(tip, next).unwrap();
            tip = next;
        }
        let leaf = boxed(&mut tree);
        tree.add_child(tip, leaf).unwrap();

        let mut rec = Recorder::default();
        let mut stats = FrameStats::new();
        tree.render_frame(&mut rec, &mut stats).unwrap();
        assert_eq!(order(&rec), vec![leaf]);
        assert_eq!(stats.nodes_visited, 10_002);
    }

    #[test]
    fn detached_nodes_are_not_rendered_from_stage() {
        let mut tree = Tree::new();
        let _loose = boxed(&mut tree);
        let mut rec = Recorder::default();
        tree.render_frame(&mut rec, &mut FrameStats::new()).unwrap();
        assert!(rec.drawn.is_empty());
    }
}
