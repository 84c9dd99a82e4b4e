//! The directed knowledge graph: vertex/edge data, the dependency-graph
//! builder (C4), the node manager (C5), the knowledge edge manager (C6),
//! and the knowledge graph builder (C7).

mod builder;
mod dependency;
mod knowledge_edges;
mod node_manager;

pub use builder::{KnowledgeBuildConfig, KnowledgeGraphBuilder};
pub use dependency::{build_dependency_graph, Registry};
pub use knowledge_edges::{KnowledgeEdgeManager, KnowledgeStats};
pub use node_manager::NodeManager;

use std::collections::BTreeMap;

use petgraph::graph::DiGraph;
use thiserror::Error;

use crate::node_id::{KnowledgeAxis, NodeIdError, NodeKind};

pub type Graph = DiGraph<NodeData, EdgeData>;

#[derive(Debug, Error, PartialEq)]
pub enum GraphError {
    #[error("node id error: {0}")]
    NodeId(#[from] NodeIdError),
    #[error("parent node `{0}` does not exist")]
    UnknownParent(String),
    #[error("axis `{axis}` is not legal for node kind `{kind:?}`")]
    IllegalAxis { kind: NodeKind, axis: KnowledgeAxis },
    #[error("duplicate dependency edge from knowledge node `{0}` to its parent")]
    DuplicateDependencyEdge(String),
    #[error("graph is already compiled")]
    AlreadyCompiled,
    #[error("strict compile: target `{0}` has a mix of weighted and unweighted auto edges")]
    InconsistentAutoWeights(String),
    #[error("edge `{0}` -> `{1}` has no resolved distribution descriptor")]
    MissingDistribution(String, String),
    #[error("unknown node `{0}`")]
    UnknownNode(String),
    #[error("graph must be compiled before scoring")]
    NotCompiled,
    #[error("node `{0}` has a score of {1} outside [0, 1]")]
    ScoreOutOfRange(String, f64),
}

pub type Result<T> = std::result::Result<T, GraphError>;

/// A scalar attribute value, used both for the C5 metadata index and for
/// the C10 export whitelist.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl AttrValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttrValue::Float(f) => Some(*f),
            AttrValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttrValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

/// Vertex payload. Knowledge vertices additionally carry `axis` and
/// `parent`; everything else leaves them `None`.
#[derive(Debug, Clone)]
pub struct NodeData {
    pub id: String,
    pub kind: NodeKind,
    pub axis: Option<KnowledgeAxis>,
    pub parent: Option<String>,
    pub attrs: BTreeMap<String, AttrValue>,
    pub foundational_score: Option<f64>,
    pub influence_score: Option<f64>,
}

impl NodeData {
    pub fn new(id: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id: id.into(),
            kind,
            axis: None,
            parent: None,
            attrs: BTreeMap::new(),
            foundational_score: None,
            influence_score: None,
        }
    }

    pub fn knowledge(id: impl Into<String>, axis: KnowledgeAxis, parent: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: NodeKind::Knowledge,
            axis: Some(axis),
            parent: Some(parent.into()),
            attrs: BTreeMap::new(),
            foundational_score: None,
            influence_score: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    Dependency,
    Knowledge,
}

/// A closed sum type over the four edge weight distributions (§9 Design
/// Notes: prefer tagged unions over inheritance here).
#[derive(Debug, Clone, PartialEq)]
pub enum Distribution {
    Normal { m: f64, s: f64 },
    Beta { a: f64, b: f64 },
    Constant { weight: f64, probability_like: bool },
    /// Deferred: resolved to `Normal` by `KnowledgeEdgeManager::compile`.
    Auto { relative_weight: Option<f64> },
}

impl Distribution {
    pub fn auto(relative_weight: f64) -> Self {
        Distribution::Auto {
            relative_weight: Some(relative_weight),
        }
    }

    pub fn auto_unweighted() -> Self {
        Distribution::Auto {
            relative_weight: None,
        }
    }

    pub fn is_auto(&self) -> bool {
        matches!(self, Distribution::Auto { .. })
    }
}

#[derive(Debug, Clone)]
pub struct EdgeData {
    pub kind: EdgeKind,
    pub dist: Option<Distribution>,
}

impl EdgeData {
    pub fn dependency() -> Self {
        Self {
            kind: EdgeKind::Dependency,
            dist: None,
        }
    }

    pub fn knowledge(dist: Distribution) -> Self {
        Self {
            kind: EdgeKind::Knowledge,
            dist: Some(dist),
        }
    }
}

/// Legality of `axis` for a node of kind `kind`, per the table in §3.4.
pub fn axis_legal(kind: NodeKind, axis: KnowledgeAxis) -> bool {
    use KnowledgeAxis::*;
    use NodeKind::*;
    matches!(
        (kind, axis),
        (Chapter, Memorization) | (Chapter, Translation) | (Chapter, Tafsir)
            | (Verse, Memorization) | (Verse, Translation) | (Verse, Tafsir)
            | (Verse, Tajweed) | (Verse, ContextualMemorization)
            | (WordInstance, Memorization) | (WordInstance, Translation)
            | (WordInstance, Tajweed) | (WordInstance, ContextualMemorization)
            | (Word, Translation)
            | (Lemma, Translation)
            | (Root, Meaning)
    )
}
