//! C10: CBOR+zstd streaming codec. Exports the graph's structure and scores
//! (never its content text) as a header record followed by one record per
//! node then one per edge, all zstd-compressed; imports the same stream back
//! into a fresh [`Registry`] (§4.10).

use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::path::Path;

use ciborium::de::from_reader;
use ciborium::ser::into_writer;
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

use crate::graph::{AttrValue, Distribution, EdgeData, EdgeKind, Graph, NodeData, Registry};
use crate::node_id::{KnowledgeAxis, NodeKind};

pub const FORMAT_VERSION: u32 = 2;
pub const DEFAULT_ZSTD_LEVEL: i32 = 9;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CBOR decode error: {0}")]
    Decode(#[from] ciborium::de::Error<std::io::Error>),
    #[error("CBOR encode error: {0}")]
    Encode(#[from] ciborium::ser::Error<std::io::Error>),
    #[error("cannot export an empty graph")]
    EmptyGraph,
    #[error("unknown node kind `{0}`")]
    UnknownNodeKind(String),
    #[error("unknown knowledge axis `{0}`")]
    UnknownAxis(String),
    #[error("node record references unknown node `{0}`")]
    DanglingEdge(String),
}

pub type Result<T> = std::result::Result<T, CodecError>;

#[derive(Debug, Serialize, Deserialize)]
struct GraphInfo {
    directed: bool,
    multi: bool,
    node_count: u32,
    edge_count: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    v: u32,
    format: String,
    created_at: String,
    graph: GraphInfo,
    metadata: BTreeMap<String, JsonValue>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "t")]
enum Record {
    #[serde(rename = "node")]
    Node { id: String, a: BTreeMap<String, JsonValue> },
    #[serde(rename = "edge")]
    Edge {
        u: String,
        v: String,
        a: BTreeMap<String, JsonValue>,
    },
}

fn json_number(v: f64) -> JsonValue {
    serde_json::Number::from_f64(v)
        .map(JsonValue::Number)
        .unwrap_or(JsonValue::Null)
}

fn is_whitelisted_node_key(key: &str) -> bool {
    matches!(
        key,
        "type"
            | "verse_key"
            | "chapter_number"
            | "verse_number"
            | "position"
            | "word_key"
            | "foundational_score"
            | "influence_score"
            | "knowledge_axis"
    ) || key.ends_with("_score")
}

fn node_attrs(node: &NodeData) -> BTreeMap<String, JsonValue> {
    let mut attrs = BTreeMap::new();
    attrs.insert("type".to_string(), JsonValue::String(node.kind.as_str().to_string()));
    if let Some(axis) = node.axis {
        attrs.insert("knowledge_axis".to_string(), JsonValue::String(axis.as_str().to_string()));
    }
    if let Some(f) = node.foundational_score {
        attrs.insert("foundational_score".to_string(), json_number(f));
    }
    if let Some(i) = node.influence_score {
        attrs.insert("influence_score".to_string(), json_number(i));
    }
    for (key, value) in &node.attrs {
        if is_whitelisted_node_key(key) {
            attrs.entry(key.clone()).or_insert_with(|| match value.as_str() {
                Some(s) => JsonValue::String(s.to_string()),
                None => value.as_f64().map(json_number).unwrap_or(JsonValue::Null),
            });
        }
    }
    attrs
}

fn edge_attrs(edge: &EdgeData) -> BTreeMap<String, JsonValue> {
    let mut attrs = BTreeMap::new();
    let label = match edge.kind {
        EdgeKind::Dependency => "dependency",
        EdgeKind::Knowledge => "knowledge",
    };
    attrs.insert("knowledge_type".to_string(), JsonValue::String(label.to_string()));
    match &edge.dist {
        Some(Distribution::Normal { m, s }) => {
            attrs.insert("dist".to_string(), JsonValue::String("normal".to_string()));
            attrs.insert("m".to_string(), json_number(*m));
            attrs.insert("s".to_string(), json_number(*s));
        }
        Some(Distribution::Beta { a, b }) => {
            attrs.insert("dist".to_string(), JsonValue::String("beta".to_string()));
            attrs.insert("a".to_string(), json_number(*a));
            attrs.insert("b".to_string(), json_number(*b));
        }
        Some(Distribution::Constant { weight, .. }) => {
            attrs.insert("dist".to_string(), JsonValue::String("constant".to_string()));
            attrs.insert("weight".to_string(), json_number(*weight));
        }
        Some(Distribution::Auto { relative_weight }) => {
            attrs.insert("dist".to_string(), JsonValue::String("auto".to_string()));
            if let Some(w) = relative_weight {
                attrs.insert("weight".to_string(), json_number(*w));
            }
        }
        None => {}
    }
    attrs
}

/// Reverses `json_number`/plain-string encoding back into an `AttrValue` for
/// the generic (non-score, non-axis) whitelisted keys restored on import.
fn json_to_attr(v: &JsonValue) -> Option<AttrValue> {
    match v {
        JsonValue::String(s) => Some(AttrValue::Str(s.clone())),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(AttrValue::Int(i))
            } else {
                n.as_f64().map(AttrValue::Float)
            }
        }
        JsonValue::Bool(b) => Some(AttrValue::Bool(*b)),
        _ => None,
    }
}

fn parse_node_kind(s: &str) -> Result<NodeKind> {
    Ok(match s {
        "chapter" => NodeKind::Chapter,
        "verse" => NodeKind::Verse,
        "word_instance" => NodeKind::WordInstance,
        "word" => NodeKind::Word,
        "lemma" => NodeKind::Lemma,
        "root" => NodeKind::Root,
        "stem" => NodeKind::Stem,
        "knowledge" => NodeKind::Knowledge,
        other => return Err(CodecError::UnknownNodeKind(other.to_string())),
    })
}

#[derive(Debug, Clone, Default)]
pub struct ExportStats {
    pub nodes_exported: usize,
    pub edges_exported: usize,
}

/// Streams `graph` out as zstd-compressed CBOR. Fails fast on an empty graph
/// so callers never produce a header claiming zero of everything.
pub fn export(graph: &Graph, writer: impl Write, level: i32) -> Result<ExportStats> {
    let node_count = graph.node_count();
    if node_count == 0 {
        return Err(CodecError::EmptyGraph);
    }
    let edge_count = graph.edge_count();

    let mut encoder = zstd::Encoder::new(writer, level)?;

    let header = Header {
        v: FORMAT_VERSION,
        format: "structure_only".to_string(),
        created_at: chrono::Local::now().to_rfc3339(),
        graph: GraphInfo {
            directed: true,
            multi: false,
            node_count: node_count as u32,
            edge_count: edge_count as u32,
        },
        metadata: BTreeMap::new(),
    };
    into_writer(&header, &mut encoder)?;

    for idx in graph.node_indices() {
        let node = &graph[idx];
        into_writer(
            &Record::Node {
                id: node.id.clone(),
                a: node_attrs(node),
            },
            &mut encoder,
        )?;
    }

    for edge in graph.edge_references() {
        into_writer(
            &Record::Edge {
                u: graph[edge.source()].id.clone(),
                v: graph[edge.target()].id.clone(),
                a: edge_attrs(edge.weight()),
            },
            &mut encoder,
        )?;
    }

    encoder.finish()?;
    Ok(ExportStats {
        nodes_exported: node_count,
        edges_exported: edge_count,
    })
}

/// Exports to a file path, deleting the partial file if writing fails
/// partway through.
pub fn export_to_path(graph: &Graph, path: &Path, level: i32) -> Result<ExportStats> {
    let file = std::fs::File::create(path)?;
    match export(graph, file, level) {
        Ok(stats) => Ok(stats),
        Err(err) => {
            let _ = std::fs::remove_file(path);
            Err(err)
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ImportStats {
    pub nodes_imported: usize,
    pub edges_imported: usize,
    pub node_count_mismatch: bool,
    pub edge_count_mismatch: bool,
}

#[derive(Debug, Clone)]
pub struct HeaderInfo {
    pub format_version: u32,
    pub created_at: String,
    pub declared_node_count: u32,
    pub declared_edge_count: u32,
}

pub struct ImportResult {
    pub registry: Registry,
    pub metadata: BTreeMap<String, JsonValue>,
    pub stats: ImportStats,
    pub header: HeaderInfo,
}

/// Reads a header then exactly `node_count` node records and `edge_count`
/// edge records. A short read is logged and reported in `ImportStats`, not
/// treated as fatal, matching §4.10's count-mismatch-is-a-warning rule.
pub fn import(reader: impl Read) -> Result<ImportResult> {
    let mut decoder = zstd::Decoder::new(reader)?;

    let header: Header = from_reader(&mut decoder)?;
    tracing::info!(
        "importing {} nodes, {} edges (format v{})",
        header.graph.node_count,
        header.graph.edge_count,
        header.v
    );
    let header_info = HeaderInfo {
        format_version: header.v,
        created_at: header.created_at.clone(),
        declared_node_count: header.graph.node_count,
        declared_edge_count: header.graph.edge_count,
    };

    let mut registry = Registry::new();
    let mut stats = ImportStats::default();

    for expected in 0..header.graph.node_count {
        let record: Record = match from_reader(&mut decoder) {
            Ok(r) => r,
            Err(err) => {
                tracing::warn!(
                    "node stream ended after {} of {} records: {}",
                    expected,
                    header.graph.node_count,
                    err
                );
                stats.node_count_mismatch = true;
                break;
            }
        };
        let Record::Node { id, a } = record else {
            tracing::warn!("expected a node record, got an edge record; stopping node import");
            stats.node_count_mismatch = true;
            break;
        };
        let kind_str = a.get("type").and_then(JsonValue::as_str).unwrap_or("chapter");
        let kind = parse_node_kind(kind_str)?;
        let idx = registry.get_or_insert(&id, kind);
        if let Some(axis_str) = a.get("knowledge_axis").and_then(JsonValue::as_str) {
            let axis = KnowledgeAxis::from_str(axis_str)
                .map_err(|_| CodecError::UnknownAxis(axis_str.to_string()))?;
            registry.graph[idx].axis = Some(axis);
        }
        if let Some(f) = a.get("foundational_score").and_then(JsonValue::as_f64) {
            registry.graph[idx].foundational_score = Some(f);
        }
        if let Some(i) = a.get("influence_score").and_then(JsonValue::as_f64) {
            registry.graph[idx].influence_score = Some(i);
        }
        for (key, value) in &a {
            if matches!(
                key.as_str(),
                "type" | "knowledge_axis" | "foundational_score" | "influence_score"
            ) {
                continue;
            }
            if let Some(attr) = json_to_attr(value) {
                registry.graph[idx].attrs.insert(key.clone(), attr);
            }
        }
        stats.nodes_imported += 1;
    }
    if stats.nodes_imported as u32 != header.graph.node_count {
        stats.node_count_mismatch = true;
    }

    for expected in 0..header.graph.edge_count {
        let record: Record = match from_reader(&mut decoder) {
            Ok(r) => r,
            Err(err) => {
                tracing::warn!(
                    "edge stream ended after {} of {} records: {}",
                    expected,
                    header.graph.edge_count,
                    err
                );
                stats.edge_count_mismatch = true;
                break;
            }
        };
        let Record::Edge { u, v, a } = record else {
            tracing::warn!("expected an edge record, got a node record; stopping edge import");
            stats.edge_count_mismatch = true;
            break;
        };
        let u_idx = registry.get(&u).ok_or_else(|| CodecError::DanglingEdge(u.clone()))?;
        let v_idx = registry.get(&v).ok_or_else(|| CodecError::DanglingEdge(v.clone()))?;

        let is_knowledge = a.get("knowledge_type").and_then(JsonValue::as_str) == Some("knowledge");
        let dist = if is_knowledge {
            match a.get("dist").and_then(JsonValue::as_str) {
                Some("normal") => Some(Distribution::Normal {
                    m: a.get("m").and_then(JsonValue::as_f64).unwrap_or(0.0),
                    s: a.get("s").and_then(JsonValue::as_f64).unwrap_or(0.1),
                }),
                Some("beta") => Some(Distribution::Beta {
                    a: a.get("a").and_then(JsonValue::as_f64).unwrap_or(1.0),
                    b: a.get("b").and_then(JsonValue::as_f64).unwrap_or(1.0),
                }),
                Some("constant") => Some(Distribution::Constant {
                    weight: a.get("weight").and_then(JsonValue::as_f64).unwrap_or(1.0),
                    probability_like: false,
                }),
                _ => Some(Distribution::Auto {
                    relative_weight: a.get("weight").and_then(JsonValue::as_f64),
                }),
            }
        } else {
            None
        };
        let kind = if is_knowledge { EdgeKind::Knowledge } else { EdgeKind::Dependency };
        registry.graph.add_edge(u_idx, v_idx, EdgeData { kind, dist });
        stats.edges_imported += 1;
    }
    if stats.edges_imported as u32 != header.graph.edge_count {
        stats.edge_count_mismatch = true;
    }

    Ok(ImportResult {
        registry,
        metadata: header.metadata,
        stats,
        header: header_info,
    })
}
