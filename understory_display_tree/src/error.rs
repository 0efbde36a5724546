// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Errors returned by structural and content operations.

use crate::types::NodeId;

/// Error returned by fallible tree operations.
///
/// Every structural call validates its arguments before touching the tree,
/// so an `Err` always means nothing was changed.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    /// An index argument is outside `0..len`.
    #[error("index {index} out of range for container with {len} children")]
    IndexOutOfRange {
        /// The rejected index.
        index: usize,
        /// Number of children at the time of the call.
        len: usize,
    },
    /// The node is not a direct child of the container.
    #[error("{child:?} is not a child of {container:?}")]
    NotAChild {
        /// The container that was searched.
        container: NodeId,
        /// The node that was not found.
        child: NodeId,
    },
    /// A container operation was applied to a leaf.
    #[error("{0:?} is not a container")]
    NotAContainer(NodeId),
    /// The handle refers to a destroyed node.
    #[error("{0:?} refers to a destroyed node")]
    StaleNode(NodeId),
    /// Inserting the child would make it its own ancestor.
    #[error("adding {child:?} to {container:?} would create a cycle")]
    Cycle {
        /// The container that was to receive the child.
        container: NodeId,
        /// The node that is the container or one of its ancestors.
        child: NodeId,
    },
    /// An argument is outside its valid domain.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
}
