//! Optional `--debug-graphml` export for inspecting a build in Gephi/yEd.
//! Not part of the graph file format itself (§6.3) — a side artifact for
//! development, adapted from the teacher's R&D visualization dump.

use std::io::Write;
use std::path::Path;

use qkg_core::graph::{EdgeKind, Graph};

pub fn save_graphml(graph: &Graph, path: &Path) -> std::io::Result<()> {
    let mut file = std::fs::File::create(path)?;

    writeln!(file, "<?xml version=\"1.0\" encoding=\"UTF-8\"?>")?;
    writeln!(file, "<graphml xmlns=\"http://graphml.graphdrawing.org/xmlns\">")?;
    writeln!(file, "  <key id=\"kind\" for=\"node\" attr.name=\"kind\" attr.type=\"string\"/>")?;
    writeln!(file, "  <key id=\"foundational\" for=\"node\" attr.name=\"foundational_score\" attr.type=\"double\"/>")?;
    writeln!(file, "  <key id=\"influence\" for=\"node\" attr.name=\"influence_score\" attr.type=\"double\"/>")?;
    writeln!(file, "  <key id=\"edge_kind\" for=\"edge\" attr.name=\"kind\" attr.type=\"string\"/>")?;
    writeln!(file, "  <graph id=\"G\" edgedefault=\"directed\">")?;

    for idx in graph.node_indices() {
        let node = &graph[idx];
        writeln!(file, "    <node id=\"{}\">", node.id)?;
        writeln!(file, "      <data key=\"kind\">{:?}</data>", node.kind)?;
        if let Some(f) = node.foundational_score {
            writeln!(file, "      <data key=\"foundational\">{f}</data>")?;
        }
        if let Some(i) = node.influence_score {
            writeln!(file, "      <data key=\"influence\">{i}</data>")?;
        }
        writeln!(file, "    </node>")?;
    }

    use petgraph::visit::EdgeRef;
    for edge in graph.edge_references() {
        let kind = match edge.weight().kind {
            EdgeKind::Dependency => "dependency",
            EdgeKind::Knowledge => "knowledge",
        };
        writeln!(
            file,
            "    <edge source=\"{}\" target=\"{}\"><data key=\"edge_kind\">{}</data></edge>",
            graph[edge.source()].id,
            graph[edge.target()].id,
            kind
        )?;
    }

    writeln!(file, "  </graph>")?;
    writeln!(file, "</graphml>")?;
    Ok(())
}
