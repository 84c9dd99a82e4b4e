//! C4: the dependency graph builder. A single pass over chapters, verses
//! and words that emits only `dependency` edges and accumulates a node
//! registry keyed by stable identifiers (§4.4).

use std::collections::HashMap;

use petgraph::graph::NodeIndex;

use crate::morphology::Corpus;
use crate::node_id::{self, NodeKind};
use crate::quran::Quran;

use super::{AttrValue, EdgeData, EdgeKind, Distribution, Graph, NodeData};
use crate::node_id::KnowledgeAxis;
use petgraph::graph::EdgeIndex;
use petgraph::visit::EdgeRef;

/// Id -> graph index, built alongside the graph. Node/edge registration is
/// idempotent: re-adding an existing id or edge is a no-op.
pub struct Registry {
    pub graph: Graph,
    index: HashMap<String, NodeIndex>,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self {
            graph: Graph::new(),
            index: HashMap::new(),
        }
    }

    pub fn get(&self, id: &str) -> Option<NodeIndex> {
        self.index.get(id).copied()
    }

    pub fn get_or_insert(&mut self, id: &str, kind: NodeKind) -> NodeIndex {
        if let Some(&idx) = self.index.get(id) {
            return idx;
        }
        let idx = self.graph.add_node(NodeData::new(id, kind));
        self.index.insert(id.to_string(), idx);
        idx
    }

    /// Registers the axis sub-node for `parent_id` (and its mandatory
    /// dependency edge back to the parent) if not already present.
    pub(crate) fn get_or_insert_knowledge(&mut self, parent_id: &str, axis: KnowledgeAxis) -> NodeIndex {
        let kid = crate::node_id::knowledge(parent_id, axis);
        if let Some(&idx) = self.index.get(&kid) {
            return idx;
        }
        let idx = self.graph.add_node(NodeData::knowledge(&kid, axis, parent_id));
        self.index.insert(kid, idx);
        let parent_idx = self.get(parent_id).expect("parent must already be registered");
        self.add_dependency_edge(idx, parent_idx);
        idx
    }

    /// Idempotent: a second call with the same (u, v) is a no-op.
    pub fn add_dependency_edge(&mut self, u: NodeIndex, v: NodeIndex) {
        if self.graph.find_edge(u, v).is_none() {
            self.graph.add_edge(u, v, EdgeData::dependency());
        }
    }

    pub(crate) fn find_knowledge_edge(&self, u: NodeIndex, v: NodeIndex) -> Option<EdgeIndex> {
        self.graph
            .edges_connecting(u, v)
            .find(|e| e.weight().kind == EdgeKind::Knowledge)
            .map(|e| e.id())
    }

    /// Adds a knowledge edge `u -> v` with `dist` if one doesn't already
    /// exist; returns `true` if it was newly added.
    pub(crate) fn add_knowledge_edge_raw(&mut self, u: NodeIndex, v: NodeIndex, dist: Distribution) -> bool {
        if self.find_knowledge_edge(u, v).is_some() {
            return false;
        }
        self.graph.add_edge(u, v, EdgeData::knowledge(dist));
        true
    }

    /// Overwrites the distribution of an existing knowledge edge (used by
    /// `compile` to replace `auto` with its resolved `Normal`).
    pub(crate) fn set_knowledge_edge_dist(&mut self, edge: EdgeIndex, dist: Distribution) {
        if let Some(data) = self.graph.edge_weight_mut(edge) {
            data.dist = Some(dist);
        }
    }
}

pub fn build_dependency_graph(quran: &Quran, morphology: &Corpus) -> Registry {
    let mut reg = Registry::new();

    for chapter in &quran.chapters {
        let chapter_id = node_id::chapter(chapter.number);
        let chapter_idx = reg.get_or_insert(&chapter_id, NodeKind::Chapter);
        reg.graph[chapter_idx]
            .attrs
            .insert("chapter_number".to_string(), AttrValue::Int(chapter.number as i64));

        let mut prev_verse_idx: Option<NodeIndex> = None;
        for verse in &chapter.verses {
            let verse_id = node_id::verse(chapter.number, verse.verse_number);
            let verse_idx = reg.get_or_insert(&verse_id, NodeKind::Verse);
            reg.add_dependency_edge(chapter_idx, verse_idx);
            {
                let attrs = &mut reg.graph[verse_idx].attrs;
                attrs.insert("verse_key".to_string(), AttrValue::Str(verse.verse_key.clone()));
                attrs.insert("chapter_number".to_string(), AttrValue::Int(chapter.number as i64));
                attrs.insert("verse_number".to_string(), AttrValue::Int(verse.verse_number as i64));
            }

            if let Some(prev_idx) = prev_verse_idx {
                reg.add_dependency_edge(verse_idx, prev_idx);
            }
            prev_verse_idx = Some(verse_idx);

            let mut prev_word_idx: Option<NodeIndex> = None;
            for word in verse.content_words() {
                let wi_id = node_id::word_instance(chapter.number, verse.verse_number, word.position);
                let wi_idx = reg.get_or_insert(&wi_id, NodeKind::WordInstance);
                reg.add_dependency_edge(verse_idx, wi_idx);
                {
                    let attrs = &mut reg.graph[wi_idx].attrs;
                    attrs.insert("verse_key".to_string(), AttrValue::Str(verse.verse_key.clone()));
                    attrs.insert("chapter_number".to_string(), AttrValue::Int(chapter.number as i64));
                    attrs.insert("verse_number".to_string(), AttrValue::Int(verse.verse_number as i64));
                    attrs.insert("position".to_string(), AttrValue::Int(word.position as i64));
                }

                if let Some(prev_idx) = prev_word_idx {
                    reg.add_dependency_edge(wi_idx, prev_idx);
                }
                prev_word_idx = Some(wi_idx);

                let word_id = node_id::word(&word.text_uthmani);
                let word_idx = reg.get_or_insert(&word_id, NodeKind::Word);
                reg.add_dependency_edge(wi_idx, word_idx);
                reg.graph[wi_idx]
                    .attrs
                    .insert("word_key".to_string(), AttrValue::Str(word_id.clone()));

                for segment in morphology.word_segments(
                    chapter.number as u32,
                    verse.verse_number,
                    word.position,
                ) {
                    if segment.lemma.is_empty() {
                        continue;
                    }
                    let lemma_id = node_id::lemma(&segment.lemma);
                    let lemma_idx = reg.get_or_insert(&lemma_id, NodeKind::Lemma);
                    reg.add_dependency_edge(word_idx, lemma_idx);

                    if !segment.root.is_empty() {
                        let root_id = node_id::root(&segment.root);
                        let root_idx = reg.get_or_insert(&root_id, NodeKind::Root);
                        reg.add_dependency_edge(lemma_idx, root_idx);
                    }
                }
            }
        }
    }

    reg
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quran::{Chapter, RevelationPlace, Verse, Word};

    fn sample_quran() -> Quran {
        let word = |pos: u32, text: &str| Word {
            position: pos,
            text_uthmani: text.into(),
            text_uthmani_simple: None,
            text_imlaei: None,
            transliteration: None,
            char_type_name: Some("word".into()),
        };
        let verse = Verse {
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
        Quran {
            chapters: vec![Chapter {
                number: 1,
                name_arabic: "الفاتحة".into(),
                name_simple: "Al-Fatihah".into(),
                revelation_place: RevelationPlace::Makkah,
                revelation_order: 5,
                bismillah_pre: true,
                verses: vec![verse],
            }],
        }
    }

    #[test]
    fn builds_chapter_verse_word_chain() {
        let quran = sample_quran();
        let morph = Corpus::parse("location\tform\tpos\tfeatures\n".as_bytes()).unwrap();
        let reg = build_dependency_graph(&quran, &morph);

        assert!(reg.get(&node_id::chapter(1)).is_some());
        assert!(reg.get(&node_id::verse(1, 1)).is_some());
        assert!(reg.get(&node_id::word_instance(1, 1, 1)).is_some());
        assert!(reg.get(&node_id::word("بِسْمِ")).is_some());

        let v_idx = reg.get(&node_id::verse(1, 1)).unwrap();
        let c_idx = reg.get(&node_id::chapter(1)).unwrap();
        assert!(reg.graph.find_edge(c_idx, v_idx).is_some());
    }

    #[test]
    fn registration_is_idempotent() {
        let quran = sample_quran();
        let morph = Corpus::parse("location\tform\tpos\tfeatures\n".as_bytes()).unwrap();
        let reg1 = build_dependency_graph(&quran, &morph);
        let reg2 = build_dependency_graph(&quran, &morph);
        assert_eq!(reg1.graph.node_count(), reg2.graph.node_count());
        assert_eq!(reg1.graph.edge_count(), reg2.graph.edge_count());
    }

    #[test]
    fn nodes_carry_reference_attrs() {
        let quran = sample_quran();
        let morph = Corpus::parse("location\tform\tpos\tfeatures\n".as_bytes()).unwrap();
        let reg = build_dependency_graph(&quran, &morph);

        let verse_idx = reg.get(&node_id::verse(1, 1)).unwrap();
        assert_eq!(
            reg.graph[verse_idx].attrs.get("verse_key"),
            Some(&AttrValue::Str("1:1".to_string()))
        );
        assert_eq!(
            reg.graph[verse_idx].attrs.get("chapter_number"),
            Some(&AttrValue::Int(1))
        );

        let wi_idx = reg.get(&node_id::word_instance(1, 1, 2)).unwrap();
        assert_eq!(
            reg.graph[wi_idx].attrs.get("position"),
            Some(&AttrValue::Int(2))
        );
        assert_eq!(
            reg.graph[wi_idx].attrs.get("word_key"),
            Some(&AttrValue::Str(node_id::word("ٱللَّهِ")))
        );
    }
}
