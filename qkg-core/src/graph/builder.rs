//! C7: the knowledge graph builder. Composes the node manager (C5) and
//! the knowledge edge manager (C6) into the five edge-building families of
//! §4.7, each gated behind an independent toggle.

use std::collections::{HashMap, HashSet, VecDeque};

use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use crate::node_id::{self, KnowledgeAxis, NodeKind};
use crate::quran::{Quran, Verse};

use super::dependency::Registry;
use super::knowledge_edges::KnowledgeEdgeManager;
use super::node_manager::NodeManager;
use super::{Distribution, EdgeKind, Result};

/// Independent toggles for the five edge families of §4.7. Memorization,
/// translation, and grammar are the load-bearing families; tajweed and
/// deep understanding stay off until a bundle actually supplies the
/// `has_tajweed`/`has_tafsir` attributes they key on.
#[derive(Debug, Clone, Copy)]
pub struct KnowledgeBuildConfig {
    pub memorization: bool,
    pub tajweed: bool,
    pub translation: bool,
    pub grammar: bool,
    pub deep_understanding: bool,
    pub strict_compile: bool,
}

impl Default for KnowledgeBuildConfig {
    fn default() -> Self {
        Self {
            memorization: true,
            tajweed: false,
            translation: true,
            grammar: true,
            deep_understanding: false,
            strict_compile: false,
        }
    }
}

pub struct KnowledgeGraphBuilder {
    config: KnowledgeBuildConfig,
}

impl KnowledgeGraphBuilder {
    pub fn new(config: KnowledgeBuildConfig) -> Self {
        Self { config }
    }

    pub fn build(&self, reg: &mut Registry, quran: &Quran) -> Result<KnowledgeEdgeManager> {
        let node_mgr = NodeManager::build(&reg.graph);
        let mut kmgr = KnowledgeEdgeManager::new();

        if self.config.memorization {
            tracing::info!("building memorization knowledge edges");
            build_memorization(reg, &mut kmgr, quran)?;
        }
        if self.config.tajweed {
            tracing::info!("building tajweed knowledge edges");
            build_tajweed(reg, &node_mgr, &mut kmgr)?;
        }
        if self.config.translation {
            tracing::info!("building translation knowledge edges");
            build_translation(reg, &mut kmgr, quran)?;
        }
        if self.config.grammar {
            tracing::info!("building grammar knowledge edges");
            build_grammar(reg, &node_mgr, &mut kmgr)?;
        }
        if self.config.deep_understanding {
            tracing::info!("building deep-understanding knowledge edges");
            build_deep_understanding(reg, &node_mgr, &mut kmgr)?;
        }

        kmgr.compile(reg, self.config.strict_compile)?;
        tracing::info!(
            nodes = reg.graph.node_count(),
            edges = reg.graph.edge_count(),
            "knowledge graph compiled"
        );
        Ok(kmgr)
    }
}

fn verse_duplicate_key(verse: &Verse) -> Option<String> {
    let simple: String = verse
        .content_words()
        .filter_map(|w| w.text_uthmani_simple.as_deref())
        .collect::<Vec<_>>()
        .join(" ");
    if simple.is_empty() {
        None
    } else {
        Some(simple)
    }
}

fn build_memorization(reg: &mut Registry, kmgr: &mut KnowledgeEdgeManager, quran: &Quran) -> Result<()> {
    for chapter in &quran.chapters {
        let chapter_mem = node_id::knowledge(&node_id::chapter(chapter.number), KnowledgeAxis::Memorization);
        let mut verse_mem_ids = Vec::with_capacity(chapter.verses.len());

        for verse in &chapter.verses {
            let verse_id = node_id::verse(chapter.number, verse.verse_number);
            let verse_mem = node_id::knowledge(&verse_id, KnowledgeAxis::Memorization);
            verse_mem_ids.push(verse_mem.clone());

            let verse_letters: usize = verse.content_words().map(|w| w.text_uthmani.chars().count()).sum();
            kmgr.add_knowledge_edge(reg, &verse_mem, &chapter_mem, Distribution::auto(verse_letters as f64))?;

            let mut word_mem_ids = Vec::new();
            for word in verse.content_words() {
                let wi_id = node_id::word_instance(chapter.number, verse.verse_number, word.position);
                let wi_mem = node_id::knowledge(&wi_id, KnowledgeAxis::Memorization);
                word_mem_ids.push(wi_mem.clone());

                let letters = word.text_uthmani.chars().count();
                kmgr.add_knowledge_edge(reg, &wi_mem, &verse_mem, Distribution::auto(letters as f64))?;
            }
            kmgr.add_gaussian_window_edges(reg, &word_mem_ids, 3, 0.5, 0.15)?;
        }
        kmgr.add_gaussian_window_edges(reg, &verse_mem_ids, 1, 0.7, 0.1)?;
    }
    Ok(())
}

/// Placeholder family: a no-op unless the bundle actually sets
/// `has_tajweed` on a word instance (see §9 Open Questions).
fn build_tajweed(reg: &mut Registry, node_mgr: &NodeManager, kmgr: &mut KnowledgeEdgeManager) -> Result<()> {
    let candidates: Vec<NodeIndex> = node_mgr.nodes_by_metadata("has_tajweed", None).into_iter().collect();
    for idx in candidates {
        let node = reg.graph[idx].clone();
        if node.kind != NodeKind::WordInstance {
            continue;
        }
        let w_tajweed = node_id::knowledge(&node.id, KnowledgeAxis::Tajweed);
        let w_mem = node_id::knowledge(&node.id, KnowledgeAxis::Memorization);
        kmgr.add_knowledge_edge(reg, &w_tajweed, &w_mem, Distribution::Normal { m: 0.7, s: 0.1 })?;

        let next = reg
            .graph
            .edges_directed(idx, Direction::Incoming)
            .find(|e| e.weight().kind == EdgeKind::Dependency && reg.graph[e.source()].kind == NodeKind::WordInstance)
            .map(|e| e.source());
        if let Some(next_idx) = next {
            let next_id = reg.graph[next_idx].id.clone();
            let next_tajweed = node_id::knowledge(&next_id, KnowledgeAxis::Tajweed);
            kmgr.add_knowledge_edge(reg, &w_tajweed, &next_tajweed, Distribution::Normal { m: 0.3, s: 0.1 })?;
        }
    }
    Ok(())
}

fn build_translation(reg: &mut Registry, kmgr: &mut KnowledgeEdgeManager, quran: &Quran) -> Result<()> {
    let mut duplicate_groups: HashMap<String, Vec<String>> = HashMap::new();

    for chapter in &quran.chapters {
        let chapter_tr = node_id::knowledge(&node_id::chapter(chapter.number), KnowledgeAxis::Translation);

        for verse in &chapter.verses {
            let verse_id = node_id::verse(chapter.number, verse.verse_number);
            let verse_tr = node_id::knowledge(&verse_id, KnowledgeAxis::Translation);
            let verse_mem = node_id::knowledge(&verse_id, KnowledgeAxis::Memorization);

            let words_count = verse.content_words().count();
            kmgr.add_knowledge_edge(reg, &verse_tr, &chapter_tr, Distribution::auto(words_count as f64))?;
            kmgr.add_knowledge_edge(reg, &verse_tr, &verse_mem, Distribution::Normal { m: 0.4, s: 0.15 })?;

            for word in verse.content_words() {
                let wi_id = node_id::word_instance(chapter.number, verse.verse_number, word.position);
                let wi_tr = node_id::knowledge(&wi_id, KnowledgeAxis::Translation);
                let wi_mem = node_id::knowledge(&wi_id, KnowledgeAxis::Memorization);
                let word_type_tr = node_id::knowledge(&node_id::word(&word.text_uthmani), KnowledgeAxis::Translation);

                let letters = word.text_uthmani.chars().count();
                kmgr.add_knowledge_edge(reg, &wi_tr, &verse_tr, Distribution::auto(letters as f64))?;
                kmgr.add_knowledge_edge(reg, &wi_tr, &word_type_tr, Distribution::Normal { m: 0.9, s: 0.1 })?;
                kmgr.add_knowledge_edge(reg, &wi_tr, &wi_mem, Distribution::Normal { m: 0.4, s: 0.15 })?;
            }

            if let Some(key) = verse_duplicate_key(verse) {
                duplicate_groups.entry(key).or_default().push(verse_tr);
            }
        }
    }

    for group in duplicate_groups.values() {
        for i in 0..group.len() {
            for j in (i + 1)..group.len() {
                kmgr.add_bidirectional_knowledge_edge(reg, &group[i], &group[j], Distribution::Normal { m: 0.9, s: 0.1 })?;
            }
        }
    }
    Ok(())
}

fn build_grammar(reg: &mut Registry, node_mgr: &NodeManager, kmgr: &mut KnowledgeEdgeManager) -> Result<()> {
    let word_nodes: Vec<NodeIndex> = node_mgr.nodes_by_type(NodeKind::Word).collect();

    for w_idx in word_nodes {
        let w_id = reg.graph[w_idx].id.clone();
        let w_tr = node_id::knowledge(&w_id, KnowledgeAxis::Translation);

        let lemma_successors: Vec<NodeIndex> = reg
            .graph
            .edges_directed(w_idx, Direction::Outgoing)
            .filter(|e| e.weight().kind == EdgeKind::Dependency)
            .map(|e| e.target())
            .filter(|&idx| reg.graph[idx].kind == NodeKind::Lemma)
            .collect();

        for l_idx in lemma_successors {
            let l_id = reg.graph[l_idx].id.clone();
            let l_tr = node_id::knowledge(&l_id, KnowledgeAxis::Translation);
            let lemma_arabic = node_id::parse_lemma(&l_id)?;
            kmgr.add_bidirectional_knowledge_edge(
                reg,
                &w_tr,
                &l_tr,
                Distribution::auto(lemma_arabic.chars().count() as f64),
            )?;

            let root_successors: Vec<NodeIndex> = reg
                .graph
                .edges_directed(l_idx, Direction::Outgoing)
                .filter(|e| e.weight().kind == EdgeKind::Dependency)
                .map(|e| e.target())
                .filter(|&idx| reg.graph[idx].kind == NodeKind::Root)
                .collect();

            for r_idx in root_successors {
                let r_id = reg.graph[r_idx].id.clone();
                let r_meaning = node_id::knowledge(&r_id, KnowledgeAxis::Meaning);
                kmgr.add_bidirectional_knowledge_edge(reg, &l_tr, &r_meaning, Distribution::Beta { a: 4.0, b: 2.0 })?;
            }
        }
    }
    Ok(())
}

/// Breadth-first traversal of dependency edges, depth <= `max_depth`,
/// returning the first `root` node encountered. Resolves the ambiguity in
/// the source's `get_word_root` (see §9 Open Questions): rather than
/// enumerating all simple paths, we stop at the first match in BFS order.
fn find_root_within(reg: &Registry, start: NodeIndex, max_depth: usize) -> Option<NodeIndex> {
    let mut visited = HashSet::new();
    let mut queue = VecDeque::new();
    queue.push_back((start, 0usize));
    visited.insert(start);

    while let Some((idx, depth)) = queue.pop_front() {
        if idx != start && reg.graph[idx].kind == NodeKind::Root {
            return Some(idx);
        }
        if depth >= max_depth {
            continue;
        }
        for edge in reg.graph.edges_directed(idx, Direction::Outgoing) {
            if edge.weight().kind != EdgeKind::Dependency {
                continue;
            }
            let next = edge.target();
            if visited.insert(next) {
                queue.push_back((next, depth + 1));
            }
        }
    }
    None
}

/// Placeholder family: tafsir edges are a no-op unless the bundle sets
/// `has_tafsir` on a verse (see §9 Open Questions).
fn build_deep_understanding(reg: &mut Registry, node_mgr: &NodeManager, kmgr: &mut KnowledgeEdgeManager) -> Result<()> {
    let tafsir_candidates: Vec<NodeIndex> = node_mgr.nodes_by_metadata("has_tafsir", None).into_iter().collect();
    for idx in tafsir_candidates {
        let node = reg.graph[idx].clone();
        if node.kind != NodeKind::Verse {
            continue;
        }
        let v_tr = node_id::knowledge(&node.id, KnowledgeAxis::Translation);
        let v_tafsir = node_id::knowledge(&node.id, KnowledgeAxis::Tafsir);
        kmgr.add_knowledge_edge(reg, &v_tr, &v_tafsir, Distribution::Normal { m: 0.3, s: 0.1 })?;
    }

    let lemma_nodes: Vec<NodeIndex> = node_mgr.nodes_by_type(NodeKind::Lemma).collect();
    for l_idx in lemma_nodes {
        if let Some(r_idx) = find_root_within(reg, l_idx, 3) {
            let l_id = reg.graph[l_idx].id.clone();
            let r_id = reg.graph[r_idx].id.clone();
            let r_meaning = node_id::knowledge(&r_id, KnowledgeAxis::Meaning);
            let l_tr = node_id::knowledge(&l_id, KnowledgeAxis::Translation);
            kmgr.add_knowledge_edge(reg, &r_meaning, &l_tr, Distribution::Beta { a: 4.0, b: 2.0 })?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::morphology::Corpus;
    use crate::quran::{Chapter, RevelationPlace, Word};

    fn chapter_one() -> Quran {
        let word = |pos: u32, text: &str, simple: &str| crate::quran::Word {
            position: pos,
            text_uthmani: text.into(),
            text_uthmani_simple: Some(simple.into()),
            text_imlaei: None,
            transliteration: None,
            char_type_name: Some("word".into()),
        };
        let verse = |num: u32, words: Vec<Word>| Verse {
            verse_key: format!("1:{}", num),
            chapter_number: 1,
            verse_number: num,
            words,
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
                verses: vec![
                    verse(1, vec![word(1, "بِسْمِ", "بسم"), word(2, "ٱللَّهِ", "الله")]),
                    verse(2, vec![word(1, "ٱلْحَمْدُ", "الحمد")]),
                ],
            }],
        }
    }

    #[test]
    fn full_build_compiles_with_normalized_weights() {
        let quran = chapter_one();
        let morph = Corpus::parse("h\n".as_bytes()).unwrap();
        let mut reg = super::build_dependency_graph(&quran, &morph);

        let builder = KnowledgeGraphBuilder::new(KnowledgeBuildConfig::default());
        let kmgr = builder.build(&mut reg, &quran).unwrap();
        assert!(kmgr.is_compiled());

        let c1_mem = node_id::knowledge(&node_id::chapter(1), KnowledgeAxis::Memorization);
        let c1_idx = reg.get(&c1_mem).unwrap();

        let incoming_sum: f64 = reg
            .graph
            .edges_directed(c1_idx, Direction::Incoming)
            .filter_map(|e| match &e.weight().dist {
                Some(Distribution::Normal { m, .. }) => Some(*m),
                _ => None,
            })
            .sum();
        assert!((incoming_sum - 1.0).abs() < 1e-9);
    }
}
