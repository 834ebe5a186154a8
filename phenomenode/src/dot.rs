// dot.rs — Graphviz DOT output for phenomenon trees
//
// Transforms a sealed tree into DOT text suitable for rendering with `dot`.
// Leaves become boxes, every composite below the root becomes a cluster,
// external feeds become diamonds and external products triangles.
//
// Preconditions: `root` is sealed.
// Postconditions: returns a DOT string; output order follows tree order and
//   connection order, so equal trees give byte-identical text.
// Failure modes: only those of the underlying model queries.
// Side effects: none.

use std::collections::HashSet;
use std::fmt::Write;

use crate::error::Result;
use crate::id::{NodeId, VarNodeId};
use crate::model::Model;
use crate::preferences::Preferences;

const STREAM_FILL: &str = "#f98f60";

/// Emit the tree under `root` as a Graphviz DOT string.
pub fn emit_dot(model: &Model, root: NodeId, prefs: &Preferences) -> Result<String> {
    let mode = prefs.context_format;
    let mut buf = String::new();
    writeln!(buf, "digraph phenomenode {{").unwrap();
    writeln!(buf, "    rankdir=LR;").unwrap();
    writeln!(
        buf,
        "    graph [bgcolor=\"{}\", fontcolor=\"{}\", fontname=\"Arial\", labeljust=l, labelloc=t];",
        prefs.background_color, prefs.label_color
    )
    .unwrap();
    writeln!(
        buf,
        "    node [shape=box, style=filled, fontname=\"Arial\", fillcolor=\"{}\", fontcolor=\"{}\", color=\"{}\"];",
        prefs.node_color, prefs.node_label_color, prefs.node_periphery_color
    )
    .unwrap();
    writeln!(
        buf,
        "    edge [fontname=\"Arial\", color=\"{}\", fontcolor=\"{}\"];",
        prefs.edge_color, prefs.label_color
    )
    .unwrap();

    if model.node(root)?.is_leaf() {
        write_leaf(&mut buf, model, root, "    ")?;
    } else {
        for &child in model.children(root)? {
            write_subtree(&mut buf, model, child, 1, prefs, "    ")?;
        }
    }

    let connections = model.connections(root)?;
    if !connections.is_empty() {
        writeln!(buf).unwrap();
    }
    let mut declared: HashSet<VarNodeId> = HashSet::new();
    for c in &connections {
        let tooltip = escape(&model.label(c.varnode, mode)?);
        let name = escape(&model.varnode(c.varnode)?.variable().format(mode));
        let v = c.varnode;
        match (c.source, c.sink) {
            (None, Some(sink)) => {
                if declared.insert(v) {
                    writeln!(
                        buf,
                        "    {v} [shape=diamond, width=0.15, height=0.15, label=\"\", fillcolor=\"{STREAM_FILL}\", tooltip=\"{tooltip}\"];"
                    )
                    .unwrap();
                }
                writeln!(buf, "    {v} -> {sink} [arrowhead=none, headlabel=\"{name}\", tooltip=\"{tooltip}\"];").unwrap();
            }
            (Some(source), None) => {
                if declared.insert(v) {
                    writeln!(
                        buf,
                        "    {v} [shape=triangle, orientation=270, width=0.15, height=0.2, label=\"\", fillcolor=\"{STREAM_FILL}\", tooltip=\"{tooltip}\"];"
                    )
                    .unwrap();
                }
                writeln!(buf, "    {source} -> {v} [arrowhead=none, label=\"{name}\", tooltip=\"{tooltip}\"];").unwrap();
            }
            (Some(source), Some(sink)) => {
                let label = if prefs.label_edges { name.as_str() } else { "" };
                writeln!(buf, "    {source} -> {sink} [label=\"{label}\", tooltip=\"{tooltip}\"];").unwrap();
            }
            (None, None) => {}
        }
    }

    writeln!(buf, "}}").unwrap();
    Ok(buf)
}

// ── Helpers ─────────────────────────────────────────────────────────────────

fn write_leaf(buf: &mut String, model: &Model, node: NodeId, indent: &str) -> Result<()> {
    let label = escape(&model.node(node)?.label());
    writeln!(buf, "{indent}{node} [label=\"{label}\"];").unwrap();
    Ok(())
}

/// Leaves as nodes, composites as (nested) clusters.
fn write_subtree(
    buf: &mut String,
    model: &Model,
    node: NodeId,
    depth: usize,
    prefs: &Preferences,
    indent: &str,
) -> Result<()> {
    let n = model.node(node)?;
    if n.is_leaf() {
        return write_leaf(buf, model, node, indent);
    }
    let color = prefs.depth_color(depth);
    writeln!(buf, "{indent}subgraph cluster_{node} {{").unwrap();
    writeln!(buf, "{indent}    label=\"{}\";", escape(&n.label())).unwrap();
    if prefs.fill_cluster {
        writeln!(buf, "{indent}    style=filled; fillcolor=\"{color}\"; color=\"{}\"; penwidth=0.2;", prefs.edge_color).unwrap();
    } else {
        writeln!(buf, "{indent}    style=solid; color=\"{color}\"; penwidth=0.75;").unwrap();
    }
    let inner = format!("{indent}    ");
    for &child in n.children() {
        write_subtree(buf, model, child, depth + 1, prefs, &inner)?;
    }
    writeln!(buf, "{indent}}}").unwrap();
    Ok(())
}

/// Escape a label for use inside a double-quoted DOT string.
fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::Builder;
    use crate::phenomena::{self, Composite, SurgeTank};
    use crate::registry::Registry;

    #[test]
    fn leaf_root_is_drawn_as_node() {
        let mut model = Model::new();
        let mut registry = Registry::with_kinds(phenomena::kind_table().unwrap());
        let a = Builder::new(&mut model, &mut registry)
            .node(SurgeTank)
            .ins(["F"])
            .outs(["P"])
            .build()
            .unwrap();
        let dot = emit_dot(&model, a, &Preferences::default()).unwrap();
        assert!(dot.starts_with("digraph phenomenode {\n"));
        assert!(dot.contains("    n0 [label=\"SurgeTank(0)\"];\n"));
        assert!(dot.contains("v0 [shape=diamond"));
        assert!(dot.contains("v1 [shape=triangle"));
        assert!(dot.trim_end().ends_with('}'));
    }

    #[test]
    fn nested_composites_become_clusters() {
        let mut model = Model::new();
        let mut registry = Registry::with_kinds(phenomena::kind_table().unwrap());
        let root = Builder::new(&mut model, &mut registry)
            .node(Composite)
            .named("plant")
            .scoped(|b| {
                b.node(Composite).scoped(|b| {
                    b.node(SurgeTank).ins(["F"]).build()?;
                    Ok(())
                })?;
                Ok(())
            })
            .unwrap();
        let mut prefs = Preferences::default();
        prefs.fill_cluster = true;
        let dot = emit_dot(&model, root, &prefs).unwrap();
        assert!(dot.contains("subgraph cluster_n1 {"));
        assert!(dot.contains("label=\"Node(0)\";"));
        assert!(dot.contains("style=filled"));
        assert!(!dot.contains("cluster_n0"));
    }

    #[test]
    fn escape_quotes() {
        assert_eq!(escape("a\"b"), "a\\\"b");
    }
}
