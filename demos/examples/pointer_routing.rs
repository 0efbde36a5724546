// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Build a small scene, route a few pointer positions, and render frames.
//!
//! This example shows how to combine:
//! - containers and leaves with local transforms,
//! - lifecycle listeners observing attach/detach,
//! - `pick` for pointer routing and `render_frame` for painting.
//!
//! Run:
//! - `RUST_LOG=info cargo run -p display_tree_demos --example pointer_routing`

use kurbo::Point;
use understory_display_tree::{
    Content, Effect, FrameStats, LocalNode, NodeFlags, Transform2D, Tree, TreeError,
};

use display_tree_demos::LogSurface;

fn main() -> Result<(), TreeError> {
    env_logger::init();

    let mut tree = Tree::new();
    let stage = tree.stage();

    // A toolbar panel with two buttons; the second overlaps the first.
    let toolbar = tree.create_container(LocalNode {
        transform: Transform2D::from_position(20.0, 20.0),
        content: Some(Content::sized(200.0, 40.0)?),
        name: Some("toolbar".into()),
        ..LocalNode::default()
    });
    let open = tree.create_node(LocalNode {
        transform: Transform2D::from_position(5.0, 5.0),
        content: Some(Content::sized(60.0, 30.0)?),
        name: Some("open".into()),
        ..LocalNode::default()
    });
    let save = tree.create_node(LocalNode {
        transform: Transform2D::from_position(50.0, 5.0),
        content: Some(Content::sized(60.0, 30.0)?.with_stroke(2.0)),
        name: Some("save".into()),
        effects: vec![Effect::new(1, 4.0, 4.0)],
        ..LocalNode::default()
    });

    tree.add_listener(toolbar, |id, ev| log::info!("{id:?}: {ev:?}"))?;
    tree.add_child(toolbar, open)?;
    tree.add_child(toolbar, save)?;
    tree.add_child(stage, toolbar)?;

    let name_of = |tree: &Tree, p: Point| {
        tree.pick(p)
            .and_then(|hit| tree.name(hit.node).map(str::to_owned))
            .unwrap_or_else(|| "<nothing>".to_owned())
    };

    for p in [
        Point::new(30.0, 30.0),
        Point::new(80.0, 30.0),
        Point::new(200.0, 50.0),
        Point::new(400.0, 400.0),
    ] {
        println!("pointer at {p:?} -> {}", name_of(&tree, p));
    }

    println!(
        "toolbar bounds {:?}, full bounds {:?}",
        tree.get_bounds(toolbar, stage),
        tree.get_full_bounds(toolbar, toolbar)
    );

    let mut surface = LogSurface::default();
    let mut stats = FrameStats::new();
    tree.render_frame(&mut surface, &mut stats)
        .unwrap_or_else(|never| match never {});
    println!("frame 1: {stats:?}");

    // Bring `open` to the front; the overlap now routes to it.
    tree.set_child_index(toolbar, open, 1)?;
    println!("after reorder -> {}", name_of(&tree, Point::new(80.0, 30.0)));

    // Make the buttons report as the toolbar itself.
    tree.set_flags(toolbar, NodeFlags::VISIBLE | NodeFlags::INTERACTIVE)?;
    println!("without child routing -> {}", name_of(&tree, Point::new(80.0, 30.0)));

    let damage = tree.take_damage();
    println!("damage since frame 1: {:?}", damage.union_rect());

    surface.clear();
    stats.reset();
    tree.render_frame(&mut surface, &mut stats)
        .unwrap_or_else(|never| match never {});
    println!("frame 2: {stats:?}, order {:?}", surface.drawn);

    tree.remove_child(stage, toolbar)?;
    println!("detached: save on stage = {}", tree.is_on_stage(save));
    tree.destroy(toolbar)?;
    assert!(!tree.is_alive(save));
    Ok(())
}
