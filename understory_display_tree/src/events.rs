// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Lifecycle notifications fired synchronously during structural mutation.

use alloc::{boxed::Box, vec::Vec};
use hashbrown::HashMap;

use crate::types::NodeId;

/// A structural change observed by a node.
///
/// Ordering guarantees:
/// - [`Lifecycle::Added`] fires after the node is linked into its new parent
///   and its transforms are updated, and before any [`Lifecycle::AddedToStage`]
///   from the same call.
/// - [`Lifecycle::Removed`] fires after the node is unlinked and every
///   [`Lifecycle::RemovedFromStage`] of its subtree has fired.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lifecycle {
    /// The node was inserted into `parent`.
    Added {
        /// The new parent.
        parent: NodeId,
    },
    /// The node was removed from `parent`.
    Removed {
        /// The former parent.
        parent: NodeId,
    },
    /// The node became reachable from the stage.
    AddedToStage,
    /// The node is no longer reachable from the stage.
    RemovedFromStage,
}

pub(crate) type Listener = Box<dyn FnMut(NodeId, Lifecycle)>;

/// Per-node listener registry.
#[derive(Default)]
pub(crate) struct Listeners {
    map: HashMap<NodeId, Vec<Listener>>,
}

impl core::fmt::Debug for Listeners {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let total: usize = self.map.values().map(Vec::len).sum();
        f.debug_struct("Listeners")
            .field("nodes", &self.map.len())
            .field("listeners", &total)
            .finish_non_exhaustive()
    }
}

impl Listeners {
    pub(crate) fn add(&mut self, id: NodeId, listener: Listener) {
        self.map.entry(id).or_default().push(listener);
    }

    pub(crate) fn clear(&mut self, id: NodeId) {
        self.map.remove(&id);
    }

    pub(crate) fn emit(&mut self, id: NodeId, event: Lifecycle) {
        if let Some(list) = self.map.get_mut(&id) {
            for listener in list.iter_mut() {
                listener(id, event);
            }
        }
    }
}
