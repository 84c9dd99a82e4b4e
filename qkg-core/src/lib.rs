pub mod codec;
pub mod graph;
pub mod morphology;
pub mod node_id;
pub mod quran;
pub mod scoring;
pub mod stats;

pub use graph::{
    axis_legal, AttrValue, Distribution, EdgeData, EdgeKind, Graph, GraphError, KnowledgeBuildConfig,
    KnowledgeEdgeManager, KnowledgeGraphBuilder, KnowledgeStats, NodeData, NodeManager, Registry,
};
pub use morphology::{Corpus, MorphologyError, Pos, Segment, SegmentType, Voice};
pub use node_id::{KnowledgeAxis, NodeIdError, NodeKind};
pub use quran::{Chapter, Quran, RevelationPlace, SajdahInfo, SajdahType, Verse, Word};
pub use scoring::{score, ScoringConfig};
