// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_display_tree --heading-base-level=0

//! Understory Display Tree: a Kurbo-native retained display tree.
//!
//! Understory Display Tree is the graph that decides what to draw, where, and in what order,
//! and which node receives a given pointer coordinate.
//!
//! - Represents a hierarchy of leaves and containers with local transforms, content, effects, and flags.
//! - Keeps parent/child links, concatenated transforms, and stage membership consistent after every call.
//! - Routes pointers front-to-back and paints back-to-front over the same child order.
//!
//! ## Model
//!
//! A [`Tree`] owns every node in an arena and hands out generational [`NodeId`] handles.
//! Handles are weak: parent and stage links are plain ids, and a destroyed node's id is
//! detected as stale rather than dangling.
//!
//! Each tree has a stage root. Nodes are created detached, become attached when inserted
//! below the stage, and are released with [`Tree::destroy`]. A container's child order is
//! its paint order: index `0` is painted first, the last child is on top.
//!
//! Every structural call validates its arguments first and then applies fully:
//! - the child's concatenated transform is recomputed for its whole subtree,
//! - stage membership is cascaded through the whole subtree,
//! - [`Lifecycle`] notifications are delivered to listeners before the call returns.
//!
//! ## Not a renderer
//!
//! This crate does not rasterize. [`Tree::render`] walks the tree and hands each node's
//! [`Content`] and effect stack to a [`Surface`] you implement. Effects are opaque
//! [`Effect`] stages; the tree only uses their spread to grow [`Tree::get_full_bounds`].
//!
//! ## API overview
//!
//! - [`Tree`]: node storage, structure, and queries.
//! - [`LocalNode`]: per-node local data (transform, content, flags, name, effects).
//! - [`NodeFlags`]: visibility, interactivity, and off-screen controls.
//! - [`TreeError`]: failures of structural and content operations.
//!
//! Key operations:
//! - [`Tree::add_child`] / [`Tree::add_child_at`] / [`Tree::remove_child`] /
//!   [`Tree::remove_child_at`] / [`Tree::remove_children`]
//! - [`Tree::set_child_index`] / [`Tree::swap_children`] / [`Tree::swap_children_at`]
//! - [`Tree::get_child_at`] / [`Tree::get_child_index`] / [`Tree::get_child_by_name`] /
//!   [`Tree::contains`] / [`Tree::num_children`]
//! - [`Tree::set_transform`] and [`Tree::update_transforms`]
//! - [`Tree::get_bounds`] / [`Tree::get_rect`] / [`Tree::get_full_bounds`]
//! - [`Tree::hit_test_point`] / [`Tree::hit_test_object`] / [`Tree::pick`]
//! - [`Tree::render`] / [`Tree::render_frame`] with a caller-owned [`FrameStats`]
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod bounds;
mod damage;
mod error;
mod events;
mod hit;
mod render;
mod tree;
mod types;
mod util;

pub use damage::Damage;
pub use error::TreeError;
pub use events::Lifecycle;
pub use hit::Hit;
pub use render::{DrawItem, FrameStats, Surface};
pub use tree::Tree;
pub use types::{Content, Effect, LocalNode, NodeFlags, NodeId, NodeKind, Transform2D};
