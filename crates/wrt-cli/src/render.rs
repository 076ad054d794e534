//! Plain-text views of a world and of the world list.

use std::fmt::Write;

use wrt_graph::FrameGraph;
use wrt_store::WorldSummary;

use crate::matrix::format_number;

/// Draw the frame tree with each frame's translation relative to its parent.
///
/// ```text
/// world
/// ├── table  (0, 2, 0)
/// │   └── cup  (1, 0, 0)
/// └── shelf  (3, 0, 1.5)
/// ```
pub fn tree(graph: &FrameGraph, precision: usize) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", graph.root());

    // (frame, indent of its line, last among its siblings)
    let mut stack: Vec<(&str, String, bool)> = Vec::new();
    push_children(graph, graph.root(), "", &mut stack);
    while let Some((frame, indent, last)) = stack.pop() {
        let (branch, next_indent) = if last { ("└── ", "    ") } else { ("├── ", "│   ") };
        let _ = writeln!(out, "{indent}{branch}{frame}  {}", offset(graph, frame, precision));
        push_children(graph, frame, &format!("{indent}{next_indent}"), &mut stack);
    }
    out
}

/// Reversed, so the first child in name order is popped first.
fn push_children<'g>(graph: &'g FrameGraph, parent: &str, indent: &str, stack: &mut Vec<(&'g str, String, bool)>) {
    let children = graph.children(parent);
    let count = children.len();
    for (i, child) in children.into_iter().enumerate().rev() {
        stack.push((child, indent.to_string(), i + 1 == count));
    }
}

fn offset(graph: &FrameGraph, frame: &str, precision: usize) -> String {
    graph
        .frame(frame)
        .map(|node| {
            let t = node.local_pose().translation();
            format!(
                "({}, {}, {})",
                format_number(t.x, precision),
                format_number(t.y, precision),
                format_number(t.z, precision)
            )
        })
        .unwrap_or_default()
}

/// The world list as a pretty-printed JSON array.
pub fn worlds_json(worlds: &[WorldSummary]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(worlds)
}

/// One line per stored world.
pub fn worlds(worlds: &[WorldSummary]) -> String {
    let mut out = String::new();
    for w in worlds {
        let _ = writeln!(
            out,
            "{}  root={}  frames={}  updated={}",
            w.name,
            w.root,
            w.frame_count,
            w.updated_at.to_rfc3339()
        );
    }
    out
}
