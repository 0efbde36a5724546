// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Core tree implementation: node storage, structural mutation, transform
//! propagation, and the stage-membership cascade.

use alloc::{boxed::Box, string::String, vec, vec::Vec};
use kurbo::{Affine, Point};

use crate::damage::Damage;
use crate::error::TreeError;
use crate::events::{Lifecycle, Listeners};
use crate::types::{Content, Effect, LocalNode, NodeFlags, NodeId, NodeKind, Transform2D};

/// Retained display tree.
///
/// The tree owns every node in an arena and hands out generational
/// [`NodeId`] handles. A stage root is created with the tree; nodes created
/// with [`Tree::create_node`] or [`Tree::create_container`] start detached
/// and become attached once inserted below the stage.
///
/// Unlike a batched scene index, every mutating call re-establishes its
/// invariants before returning: concatenated transforms are recomputed
/// eagerly and stage membership is cascaded through the affected subtree.
///
/// ## Example
///
/// ```rust
/// use kurbo::{Point, Rect};
/// use understory_display_tree::{Content, LocalNode, Transform2D, Tree};
///
/// let mut tree = Tree::new();
/// let panel = tree.create_container(LocalNode::default());
/// let button = tree.create_node(LocalNode {
///     transform: Transform2D::from_position(5.0, 5.0),
///     content: Some(Content::rect(Rect::new(0.0, 0.0, 10.0, 10.0))),
///     ..LocalNode::default()
/// });
///
/// tree.add_child(panel, button).unwrap();
/// tree.add_child(tree.stage(), panel).unwrap();
///
/// assert!(tree.is_on_stage(button));
/// assert_eq!(tree.get_bounds(panel, panel), Some(Rect::new(5.0, 5.0, 15.0, 15.0)));
/// assert_eq!(tree.pick(Point::new(8.0, 8.0)).map(|h| h.node), Some(button));
/// ```
pub struct Tree {
    /// slots
    nodes: Vec<Option<Node>>,
    /// last generation per slot (persists across frees)
    generations: Vec<u32>,
    free_list: Vec<usize>,
    stage: NodeId,
    listeners: Listeners,
    damage: Damage,
    needs_redraw: bool,
}

impl core::fmt::Debug for Tree {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let total = self.nodes.len();
        let alive = self.nodes.iter().filter(|n| n.is_some()).count();
        let free = self.free_list.len();
        f.debug_struct("Tree")
            .field("nodes_total", &total)
            .field("nodes_alive", &alive)
            .field("free_list", &free)
            .field("stage", &self.stage)
            .field("needs_redraw", &self.needs_redraw)
            .finish_non_exhaustive()
    }
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Debug)]
pub(crate) struct Node {
    generation: u32,
    pub(crate) kind: NodeKind,
    pub(crate) parent: Option<NodeId>,
    pub(crate) stage: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) local: LocalNode,
    /// Local transform concatenated with every ancestor's.
    pub(crate) world_transform: Affine,
}

impl Node {
    fn new(generation: u32, kind: NodeKind, local: LocalNode) -> Self {
        let world_transform = local.transform.to_affine();
        Self {
            generation,
            kind,
            parent: None,
            stage: None,
            children: Vec::new(),
            local,
            world_transform,
        }
    }
}

impl Tree {
    /// Create a new tree holding only its stage root.
    pub fn new() -> Self {
        let mut tree = Self {
            nodes: Vec::new(),
            generations: Vec::new(),
            free_list: Vec::new(),
            stage: NodeId::new(0, 0),
            listeners: Listeners::default(),
            damage: Damage::default(),
            needs_redraw: true,
        };
        let stage = tree.alloc(NodeKind::Container, LocalNode::default());
        tree.node_mut(stage).stage = Some(stage);
        tree.stage = stage;
        tree
    }

    /// The stage root of this tree.
    pub fn stage(&self) -> NodeId {
        self.stage
    }

    /// Create a detached leaf node.
    pub fn create_node(&mut self, local: LocalNode) -> NodeId {
        self.alloc(NodeKind::Leaf, local)
    }

    /// Create a detached container node.
    pub fn create_container(&mut self, local: LocalNode) -> NodeId {
        self.alloc(NodeKind::Container, local)
    }

    fn alloc(&mut self, kind: NodeKind, local: LocalNode) -> NodeId {
        let (idx, generation) = if let Some(idx) = self.free_list.pop() {
            let generation = self.generations[idx].saturating_add(1);
            self.generations[idx] = generation;
            self.nodes[idx] = Some(Node::new(generation, kind, local));
            #[allow(
                clippy::cast_possible_truncation,
                reason = "NodeId uses 32-bit indices by design."
            )]
            (idx as u32, generation)
        } else {
            let generation = 1_u32;
            self.nodes.push(Some(Node::new(generation, kind, local)));
            self.generations.push(generation);
            #[allow(
                clippy::cast_possible_truncation,
                reason = "NodeId uses 32-bit indices by design."
            )]
            ((self.nodes.len() - 1) as u32, generation)
        };
        NodeId::new(idx, generation)
    }

    /// Release a node and its whole subtree.
    ///
    /// An attached node is first removed from its parent, with the usual
    /// notifications. Every handle into the subtree becomes stale.
    pub fn destroy(&mut self, id: NodeId) -> Result<(), TreeError> {
        self.check_alive(id)?;
        if id == self.stage {
            return Err(TreeError::InvalidArgument("the stage cannot be destroyed"));
        }
        if let Some(parent) = self.node(id).parent {
            self.remove_child(parent, id)?;
        }
        let mut stack = vec![id];
        while let Some(id) = stack.pop() {
            if let Some(node) = self.nodes[id.idx()].take() {
                stack.extend(node.children);
            }
            self.listeners.clear(id);
            self.free_list.push(id.idx());
        }
        log::trace!("destroyed {id:?}");
        Ok(())
    }

    // --- structure ---

    /// Append `child` to the front of `container`'s paint order.
    ///
    /// Equivalent to [`Tree::add_child_at`] with the current child count.
    pub fn add_child(&mut self, container: NodeId, child: NodeId) -> Result<NodeId, TreeError> {
        let len = self.container(container)?.children.len();
        self.add_child_at(container, child, len)
    }

    /// Insert `child` into `container` at `index`, clamped to `0..=len`.
    ///
    /// - A child already in `container` is moved without a removal notification.
    /// - A child in another container is removed from it first.
    ///
    /// The child's subtree inherits `container`'s stage and has its
    /// transforms recomputed before [`Lifecycle::Added`] fires.
    pub fn add_child_at(
        &mut self,
        container: NodeId,
        child: NodeId,
        index: usize,
    ) -> Result<NodeId, TreeError> {
        self.validate_insert(container, child)?;

        let old_parent = self.node(child).parent;
        match old_parent {
            Some(p) if p == container => {
                let siblings = &mut self.node_mut(container).children;
                if let Some(pos) = siblings.iter().position(|&c| c == child) {
                    siblings.remove(pos);
                }
            }
            Some(p) => {
                self.remove_child(p, child)?;
            }
            None => {}
        }

        let siblings = &mut self.node_mut(container).children;
        let index = index.min(siblings.len());
        siblings.insert(index, child);
        self.node_mut(child).parent = Some(container);
        self.update_transforms(child);

        let stage = self.node(container).stage;
        let changed = self.cascade_stage(child, stage);
        self.touch(child);
        log::trace!("added {child:?} to {container:?} at {index}");

        self.listeners
            .emit(child, Lifecycle::Added { parent: container });
        for id in changed {
            self.listeners.emit(id, Lifecycle::AddedToStage);
        }
        Ok(child)
    }

    /// Remove `child` from `container`.
    ///
    /// Returns `child` unchanged if it is not a direct child.
    pub fn remove_child(&mut self, container: NodeId, child: NodeId) -> Result<NodeId, TreeError> {
        match self.get_child_index(container, child) {
            Some(index) => self.remove_child_at(container, index),
            None => {
                self.container(container)?;
                Ok(child)
            }
        }
    }

    /// Remove the child at `index`.
    ///
    /// The child's parent and stage are cleared, the stage is cleared through
    /// its whole subtree (internal links are left intact), and then
    /// [`Lifecycle::Removed`] fires.
    pub fn remove_child_at(&mut self, container: NodeId, index: usize) -> Result<NodeId, TreeError> {
        let len = self.container(container)?.children.len();
        if index >= len {
            log::debug!("remove_child_at({container:?}, {index}) rejected: {len} children");
            return Err(TreeError::IndexOutOfRange { index, len });
        }
        let child = self.node(container).children[index];
        // Damage is taken while the child still maps into stage space.
        self.touch(child);

        self.node_mut(container).children.remove(index);
        self.node_mut(child).parent = None;
        self.update_transforms(child);
        let changed = self.cascade_stage(child, None);
        log::trace!("removed {child:?} from {container:?} at {index}");

        for id in changed {
            self.listeners.emit(id, Lifecycle::RemovedFromStage);
        }
        self.listeners
            .emit(child, Lifecycle::Removed { parent: container });
        Ok(child)
    }

    /// Remove the inclusive range `start..=start + count - 1`, clamped to the
    /// current children, in descending index order.
    ///
    /// `count = None` removes everything from `start` on. Returns the removed
    /// nodes in removal order.
    pub fn remove_children(
        &mut self,
        container: NodeId,
        start: usize,
        count: Option<usize>,
    ) -> Result<Vec<NodeId>, TreeError> {
        let len = self.container(container)?.children.len();
        if start >= len || count == Some(0) {
            return Ok(Vec::new());
        }
        let end = match count {
            Some(count) => start.saturating_add(count - 1).min(len - 1),
            None => len - 1,
        };
        let mut removed = Vec::with_capacity(end - start + 1);
        for index in (start..=end).rev() {
            removed.push(self.remove_child_at(container, index)?);
        }
        Ok(removed)
    }

    /// Move `child` to `index` by removing and re-inserting it.
    ///
    /// Exactly one [`Lifecycle::Removed`] and one [`Lifecycle::Added`] fire,
    /// even if the index does not change.
    pub fn set_child_index(
        &mut self,
        container: NodeId,
        child: NodeId,
        index: usize,
    ) -> Result<(), TreeError> {
        self.validate_insert(container, child)?;
        self.remove_child(container, child)?;
        self.add_child_at(container, child, index)?;
        Ok(())
    }

    /// Exchange the children at `a` and `b`.
    ///
    /// Only paint order changes; no notifications fire.
    pub fn swap_children_at(&mut self, container: NodeId, a: usize, b: usize) -> Result<(), TreeError> {
        let len = self.container(container)?.children.len();
        if let Some(&index) = [a, b].iter().find(|&&i| i >= len) {
            log::debug!("swap_children_at({container:?}, {a}, {b}) rejected: {len} children");
            return Err(TreeError::IndexOutOfRange { index, len });
        }
        self.node_mut(container).children.swap(a, b);
        self.touch(container);
        Ok(())
    }

    /// Exchange two children of `container`.
    pub fn swap_children(&mut self, container: NodeId, a: NodeId, b: NodeId) -> Result<(), TreeError> {
        self.container(container)?;
        let ia = self
            .get_child_index(container, a)
            .ok_or(TreeError::NotAChild { container, child: a })?;
        let ib = self
            .get_child_index(container, b)
            .ok_or(TreeError::NotAChild { container, child: b })?;
        self.swap_children_at(container, ia, ib)
    }

    /// Index of `child` in `container`, or `None` if it is not a direct child.
    pub fn get_child_index(&self, container: NodeId, child: NodeId) -> Option<usize> {
        self.children_of(container).iter().position(|&c| c == child)
    }

    /// The child at `index`.
    pub fn get_child_at(&self, container: NodeId, index: usize) -> Result<NodeId, TreeError> {
        let children = &self.container(container)?.children;
        children
            .get(index)
            .copied()
            .ok_or(TreeError::IndexOutOfRange {
                index,
                len: children.len(),
            })
    }

    /// First direct child whose name equals `name`.
    pub fn get_child_by_name(&self, container: NodeId, name: &str) -> Option<NodeId> {
        self.children_of(container)
            .iter()
            .copied()
            .find(|&c| self.node(c).local.name.as_deref() == Some(name))
    }

    /// Returns true if `child` is a direct child of `container`.
    pub fn contains(&self, container: NodeId, child: NodeId) -> bool {
        self.get_child_index(container, child).is_some()
    }

    /// Returns true if `node` is anywhere below `container`.
    pub fn contains_nested(&self, container: NodeId, node: NodeId) -> bool {
        if !self.is_alive(container) || !self.is_alive(node) {
            return false;
        }
        let mut current = self.node(node).parent;
        while let Some(p) = current {
            if p == container {
                return true;
            }
            current = self.node(p).parent;
        }
        false
    }

    /// Number of direct children; zero for leaves and stale handles.
    pub fn num_children(&self, container: NodeId) -> usize {
        self.children_of(container).len()
    }

    /// Children in paint order (back to front), or an empty slice.
    pub fn children_of(&self, id: NodeId) -> &[NodeId] {
        match self.node_opt(id) {
            Some(n) => &n.children,
            None => &[],
        }
    }

    // --- node state ---

    /// Returns true if `id` refers to a live node.
    ///
    /// A `NodeId` is considered live if its slot exists and its generation matches
    /// the current generation stored in that slot.
    pub fn is_alive(&self, id: NodeId) -> bool {
        self.node_opt(id).is_some()
    }

    /// Kind of a live node.
    pub fn kind(&self, id: NodeId) -> Option<NodeKind> {
        self.node_opt(id).map(|n| n.kind)
    }

    /// Parent of a live node, or `None` for detached nodes, the stage, and stale ids.
    pub fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        self.node_opt(id).and_then(|n| n.parent)
    }

    /// Stage the node is attached to, if any.
    pub fn stage_of(&self, id: NodeId) -> Option<NodeId> {
        self.node_opt(id).and_then(|n| n.stage)
    }

    /// Returns true if the node is reachable from the stage.
    pub fn is_on_stage(&self, id: NodeId) -> bool {
        self.stage_of(id).is_some()
    }

    /// Local data of a live node.
    pub fn local(&self, id: NodeId) -> Option<&LocalNode> {
        self.node_opt(id).map(|n| &n.local)
    }

    /// Name of a live node.
    pub fn name(&self, id: NodeId) -> Option<&str> {
        self.node_opt(id).and_then(|n| n.local.name.as_deref())
    }

    /// Flags of a live node.
    pub fn flags(&self, id: NodeId) -> Option<NodeFlags> {
        self.node_opt(id).map(|n| n.local.flags)
    }

    /// Local transform of a live node.
    pub fn transform(&self, id: NodeId) -> Option<Transform2D> {
        self.node_opt(id).map(|n| n.local.transform)
    }

    /// Concatenated transform mapping the node's local space to the space of
    /// its topmost ancestor (stage space when attached).
    pub fn world_transform(&self, id: NodeId) -> Option<Affine> {
        self.node_opt(id).map(|n| n.world_transform)
    }

    /// Map a local point of `id` into stage space.
    pub fn local_to_global(&self, id: NodeId, point: Point) -> Option<Point> {
        self.world_transform(id).map(|tf| tf * point)
    }

    /// Map a stage-space point into the local space of `id`.
    pub fn global_to_local(&self, id: NodeId, point: Point) -> Option<Point> {
        self.world_transform(id).map(|tf| tf.inverse() * point)
    }

    /// Update the name.
    ///
    /// Names are not painted, so this marks a redraw without adding damage.
    pub fn set_name(&mut self, id: NodeId, name: Option<String>) -> Result<(), TreeError> {
        self.node_opt_mut(id).ok_or(TreeError::StaleNode(id))?.local.name = name;
        self.needs_redraw = true;
        Ok(())
    }

    /// Update node flags.
    pub fn set_flags(&mut self, id: NodeId, flags: NodeFlags) -> Result<(), TreeError> {
        let n = self.node_opt_mut(id).ok_or(TreeError::StaleNode(id))?;
        if n.local.flags != flags {
            n.local.flags = flags;
            self.touch(id);
        }
        Ok(())
    }

    /// Update painted content.
    pub fn set_content(&mut self, id: NodeId, content: Option<Content>) -> Result<(), TreeError> {
        self.check_alive(id)?;
        self.touch(id);
        self.node_mut(id).local.content = content;
        self.touch(id);
        Ok(())
    }

    /// Replace the effect stages.
    pub fn set_effects(&mut self, id: NodeId, effects: Vec<Effect>) -> Result<(), TreeError> {
        self.check_alive(id)?;
        self.touch(id);
        self.node_mut(id).local.effects = effects;
        self.touch(id);
        Ok(())
    }

    /// Update the local transform and recompute the subtree's concatenated transforms.
    pub fn set_transform(&mut self, id: NodeId, tf: Transform2D) -> Result<(), TreeError> {
        let n = self.node_opt_mut(id).ok_or(TreeError::StaleNode(id))?;
        if n.local.transform == tf {
            return Ok(());
        }
        self.touch(id);
        self.node_mut(id).local.transform = tf;
        self.update_transforms(id);
        self.touch(id);
        Ok(())
    }

    /// Update only the position part of the local transform.
    pub fn set_position(&mut self, id: NodeId, position: Point) -> Result<(), TreeError> {
        let mut tf = self.transform(id).ok_or(TreeError::StaleNode(id))?;
        tf.x = position.x;
        tf.y = position.y;
        self.set_transform(id, tf)
    }

    /// Recompute concatenated transforms for `id` and its subtree, parent before children.
    pub fn update_transforms(&mut self, id: NodeId) {
        let Some(node) = self.node_opt(id) else {
            return;
        };
        let parent_tf = node
            .parent
            .map(|p| self.node(p).world_transform)
            .unwrap_or(Affine::IDENTITY);

        let mut stack = vec![(id, parent_tf)];
        while let Some((id, parent_tf)) = stack.pop() {
            let node = self.node_mut(id);
            node.world_transform = parent_tf * node.local.transform.to_affine();
            // Reversed so that children are visited in ascending order.
            for &child in node.children.iter().rev() {
                stack.push((child, node.world_transform));
            }
        }
    }

    // --- notifications and frame state ---

    /// Register a listener for structural notifications on `id`.
    ///
    /// Listeners run synchronously inside the mutating call and are dropped
    /// when the node is destroyed.
    pub fn add_listener(
        &mut self,
        id: NodeId,
        listener: impl FnMut(NodeId, Lifecycle) + 'static,
    ) -> Result<(), TreeError> {
        self.check_alive(id)?;
        self.listeners.add(id, Box::new(listener));
        Ok(())
    }

    /// Drop every listener registered on `id`.
    pub fn clear_listeners(&mut self, id: NodeId) {
        self.listeners.clear(id);
    }

    /// Returns true if anything changed since the last [`Tree::render_frame`].
    pub fn needs_redraw(&self) -> bool {
        self.needs_redraw
    }

    /// Take the damage accumulated since the last [`Tree::render_frame`].
    pub fn take_damage(&mut self) -> Damage {
        core::mem::take(&mut self.damage)
    }

    pub(crate) fn finish_frame(&mut self) {
        self.needs_redraw = false;
        self.damage = Damage::default();
    }

    // --- internals ---

    pub(crate) fn node_opt(&self, id: NodeId) -> Option<&Node> {
        let n = self.nodes.get(id.idx())?.as_ref()?;
        if n.generation != id.1 {
            return None;
        }
        Some(n)
    }

    fn node_opt_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        let n = self.nodes.get_mut(id.idx())?.as_mut()?;
        if n.generation != id.1 {
            return None;
        }
        Some(n)
    }

    /// Access a live node; panics if `id` is stale.
    pub(crate) fn node(&self, id: NodeId) -> &Node {
        self.nodes[id.idx()].as_ref().expect("dangling NodeId")
    }

    /// Access a live node mutably; panics if `id` is stale.
    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        self.nodes[id.idx()].as_mut().expect("dangling NodeId")
    }

    fn check_alive(&self, id: NodeId) -> Result<(), TreeError> {
        if self.is_alive(id) {
            Ok(())
        } else {
            Err(TreeError::StaleNode(id))
        }
    }

    fn container(&self, id: NodeId) -> Result<&Node, TreeError> {
        let n = self.node_opt(id).ok_or(TreeError::StaleNode(id))?;
        match n.kind {
            NodeKind::Container => Ok(n),
            NodeKind::Leaf => Err(TreeError::NotAContainer(id)),
        }
    }

    fn validate_insert(&self, container: NodeId, child: NodeId) -> Result<(), TreeError> {
        self.container(container)?;
        self.check_alive(child)?;
        if child == self.stage {
            return Err(TreeError::InvalidArgument(
                "the stage cannot be added to a container",
            ));
        }
        if child == container || self.contains_nested(child, container) {
            log::debug!("rejected cyclic insert of {child:?} into {container:?}");
            return Err(TreeError::Cycle { container, child });
        }
        Ok(())
    }

    /// Set `stage` on every node of the subtree rooted at `root`, in pre-order.
    ///
    /// Returns the nodes whose membership flipped.
    fn cascade_stage(&mut self, root: NodeId, stage: Option<NodeId>) -> Vec<NodeId> {
        let mut changed = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let node = self.node_mut(id);
            if node.stage.is_some() != stage.is_some() {
                changed.push(id);
            }
            node.stage = stage;
            stack.extend(node.children.iter().rev().copied());
        }
        changed
    }

    /// Record that `id` needs repainting.
    fn touch(&mut self, id: NodeId) {
        self.needs_redraw = true;
        if self.is_on_stage(id)
            && let Some(r) = self.paint_extent(id)
        {
            self.damage.push(r);
        }
    }
}
