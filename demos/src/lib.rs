// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Shared helpers for the display tree demos.

use std::convert::Infallible;

use understory_display_tree::{DrawItem, NodeId, Surface};

/// A surface that paints nothing and logs every draw call.
#[derive(Debug, Default)]
pub struct LogSurface {
    /// Nodes drawn since the last [`LogSurface::clear`], in paint order.
    pub drawn: Vec<NodeId>,
}

impl LogSurface {
    /// Forget what was drawn.
    pub fn clear(&mut self) {
        self.drawn.clear();
    }
}

impl Surface for LogSurface {
    type Error = Infallible;

    fn draw(&mut self, item: &DrawItem<'_>) -> Result<(), Infallible> {
        let origin = item.transform * item.content.bounds.origin();
        log::info!(
            "draw {:?} at ({:.1}, {:.1}) with {} effect(s)",
            item.node,
            origin.x,
            origin.y,
            item.effects.len()
        );
        self.drawn.push(item.node);
        Ok(())
    }
}
