//! C5: type / axis / metadata indices over the graph, plus the adjacency
//! queries C7 needs (`verse_words`, `chapter_verses`, `related`).

use std::collections::{BTreeSet, HashMap};

use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use crate::node_id::{KnowledgeAxis, NodeKind};

use super::{EdgeKind, Graph};

#[derive(Default)]
pub struct NodeManager {
    by_type: HashMap<NodeKind, BTreeSet<NodeIndex>>,
    by_axis: HashMap<KnowledgeAxis, BTreeSet<NodeIndex>>,
    by_metadata: HashMap<String, HashMap<String, BTreeSet<NodeIndex>>>,
}

impl NodeManager {
    /// Scans every node of `graph` once and builds the three indices.
    pub fn build(graph: &Graph) -> Self {
        let mut mgr = NodeManager::default();
        for idx in graph.node_indices() {
            let node = &graph[idx];
            mgr.by_type.entry(node.kind).or_default().insert(idx);
            if let Some(axis) = node.axis {
                mgr.by_axis.entry(axis).or_default().insert(idx);
            }
            for (key, value) in &node.attrs {
                let rendered = match value {
                    super::AttrValue::Str(s) => s.clone(),
                    super::AttrValue::Int(i) => i.to_string(),
                    super::AttrValue::Float(f) => f.to_string(),
                    super::AttrValue::Bool(b) => b.to_string(),
                };
                mgr.by_metadata
                    .entry(key.clone())
                    .or_default()
                    .entry(rendered)
                    .or_default()
                    .insert(idx);
            }
        }
        mgr
    }

    pub fn nodes_by_type(&self, kind: NodeKind) -> impl Iterator<Item = NodeIndex> + '_ {
        self.by_type.get(&kind).into_iter().flatten().copied()
    }

    pub fn nodes_by_axis(&self, axis: KnowledgeAxis) -> impl Iterator<Item = NodeIndex> + '_ {
        self.by_axis.get(&axis).into_iter().flatten().copied()
    }

    /// `value = None` unions across every value recorded for `key`.
    pub fn nodes_by_metadata(&self, key: &str, value: Option<&str>) -> BTreeSet<NodeIndex> {
        let Some(by_value) = self.by_metadata.get(key) else {
            return BTreeSet::new();
        };
        match value {
            Some(v) => by_value.get(v).cloned().unwrap_or_default(),
            None => by_value.values().flatten().copied().collect(),
        }
    }

    /// Successors of `verse_id` restricted to `word_instance`, sorted by
    /// position.
    pub fn verse_words(&self, graph: &Graph, verse_idx: NodeIndex) -> Vec<NodeIndex> {
        let mut words: Vec<(u32, NodeIndex)> = graph
            .edges_directed(verse_idx, Direction::Outgoing)
            .filter(|e| e.weight().kind == EdgeKind::Dependency)
            .map(|e| e.target())
            .filter(|&idx| graph[idx].kind == NodeKind::WordInstance)
            .filter_map(|idx| {
                crate::node_id::parse_word_instance(&graph[idx].id)
                    .ok()
                    .map(|(_, _, pos)| (pos, idx))
            })
            .collect();
        words.sort_by_key(|&(pos, _)| pos);
        words.into_iter().map(|(_, idx)| idx).collect()
    }

    /// Successors of `chapter_id` restricted to `verse`, sorted by verse
    /// number.
    pub fn chapter_verses(&self, graph: &Graph, chapter_idx: NodeIndex) -> Vec<NodeIndex> {
        let mut verses: Vec<(u32, NodeIndex)> = graph
            .edges_directed(chapter_idx, Direction::Outgoing)
            .filter(|e| e.weight().kind == EdgeKind::Dependency)
            .map(|e| e.target())
            .filter(|&idx| graph[idx].kind == NodeKind::Verse)
            .filter_map(|idx| {
                crate::node_id::parse_verse(&graph[idx].id)
                    .ok()
                    .map(|(_, v)| (v, idx))
            })
            .collect();
        verses.sort_by_key(|&(v, _)| v);
        verses.into_iter().map(|(_, idx)| idx).collect()
    }

    /// Filtered successor set of `node_idx`, optionally restricted by node
    /// kind and/or edge kind.
    pub fn related(
        &self,
        graph: &Graph,
        node_idx: NodeIndex,
        successor_kind: Option<NodeKind>,
        edge_kind: Option<EdgeKind>,
    ) -> Vec<NodeIndex> {
        graph
            .edges_directed(node_idx, Direction::Outgoing)
            .filter(|e| edge_kind.map_or(true, |k| e.weight().kind == k))
            .map(|e| e.target())
            .filter(|&idx| successor_kind.map_or(true, |k| graph[idx].kind == k))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{build_dependency_graph, EdgeKind};
    use crate::morphology::Corpus;
    use crate::quran::{Chapter, Quran, RevelationPlace, Verse, Word};

    fn sample_quran() -> Quran {
        let word = |pos: u32, text: &str| Word {
            position: pos,
            text_uthmani: text.into(),
            text_uthmani_simple: None,
            text_imlaei: None,
            transliteration: None,
            char_type_name: Some("word".into()),
        };
        let verse1 = Verse {
            verse_key: "1:1".into(),
            chapter_number: 1,
            verse_number: 1,
            words: vec![word(1, "بِسْمِ"), word(2, "ٱللَّهِ")],
            juz_number: 1,
            hizb_number: 1,
            rub_number: None,
            manzil_number: None,
            ruku_number: None,
            page_number: 1,
            sajdah: None,
        };
        let mut verse2 = verse1.clone();
        verse2.verse_key = "1:2".into();
        verse2.verse_number = 2;
        verse2.words = vec![word(1, "ٱلْحَمْدُ")];
        Quran {
            chapters: vec![Chapter {
                number: 1,
                name_arabic: "الفاتحة".into(),
                name_simple: "Al-Fatihah".into(),
                revelation_place: RevelationPlace::Makkah,
                revelation_order: 5,
                bismillah_pre: true,
                verses: vec![verse1, verse2],
            }],
        }
    }

    #[test]
    fn indices_and_adjacency_queries() {
        let quran = sample_quran();
        let morph = Corpus::parse("h\n".as_bytes()).unwrap();
        let reg = build_dependency_graph(&quran, &morph);
        let mgr = NodeManager::build(&reg.graph);

        assert_eq!(mgr.nodes_by_type(NodeKind::Verse).count(), 2);
        assert_eq!(mgr.nodes_by_type(NodeKind::Chapter).count(), 1);

        let chapter_idx = reg.get(&crate::node_id::chapter(1)).unwrap();
        let verses = mgr.chapter_verses(&reg.graph, chapter_idx);
        assert_eq!(verses.len(), 2);

        let verse1_idx = reg.get(&crate::node_id::verse(1, 1)).unwrap();
        let words = mgr.verse_words(&reg.graph, verse1_idx);
        assert_eq!(words.len(), 2);
    }
}
