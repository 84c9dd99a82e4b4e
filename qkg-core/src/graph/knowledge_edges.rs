//! C6: the knowledge edge manager. Owns the pending "auto" edge table and
//! the open/compile lifecycle described in §4.6.

use std::collections::HashMap;

use petgraph::graph::NodeIndex;

use crate::node_id::{self};

use super::dependency::Registry;
use super::{axis_legal, Distribution, GraphError, Result};

#[derive(Debug, Clone, Copy)]
pub struct KnowledgeStats {
    pub is_compiled: bool,
    pub pending_edge_count: usize,
    pub targets_with_pending: usize,
    pub total_nodes: usize,
}

#[derive(Default)]
pub struct KnowledgeEdgeManager {
    /// target -> [(source, relative_weight)], only for edges opened with an
    /// `Auto` distribution.
    pending: HashMap<NodeIndex, Vec<(NodeIndex, Option<f64>)>>,
    compiled: bool,
}

impl KnowledgeEdgeManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_compiled(&self) -> bool {
        self.compiled
    }

    fn ensure_axis_node(&self, reg: &mut Registry, axis_id: &str) -> Result<NodeIndex> {
        if let Some(idx) = reg.get(axis_id) {
            return Ok(idx);
        }
        let (parent_id, axis) = node_id::parse_knowledge(axis_id)?;
        let parent_idx = reg
            .get(&parent_id)
            .ok_or_else(|| GraphError::UnknownParent(parent_id.clone()))?;
        let parent_kind = reg.graph[parent_idx].kind;
        if !axis_legal(parent_kind, axis) {
            return Err(GraphError::IllegalAxis {
                kind: parent_kind,
                axis,
            });
        }
        Ok(reg.get_or_insert_knowledge(&parent_id, axis))
    }

    /// Registers `source_axis_id -> target_axis_id` with `distribution`.
    /// Re-adding the same pair is a silent no-op (idempotent multi-pass
    /// builders rely on this).
    pub fn add_knowledge_edge(
        &mut self,
        reg: &mut Registry,
        source_axis_id: &str,
        target_axis_id: &str,
        distribution: Distribution,
    ) -> Result<()> {
        if self.compiled {
            return Err(GraphError::AlreadyCompiled);
        }

        let u = self.ensure_axis_node(reg, source_axis_id)?;
        let v = self.ensure_axis_node(reg, target_axis_id)?;

        if reg.find_knowledge_edge(u, v).is_some() {
            return Ok(());
        }

        if let Distribution::Auto { relative_weight } = &distribution {
            self.pending.entry(v).or_default().push((u, *relative_weight));
        }
        reg.add_knowledge_edge_raw(u, v, distribution);
        Ok(())
    }

    pub fn add_bidirectional_knowledge_edge(
        &mut self,
        reg: &mut Registry,
        a_axis_id: &str,
        b_axis_id: &str,
        distribution: Distribution,
    ) -> Result<()> {
        self.add_knowledge_edge(reg, a_axis_id, b_axis_id, distribution.clone())?;
        self.add_knowledge_edge(reg, b_axis_id, a_axis_id, distribution)?;
        Ok(())
    }

    /// A triangular-decaying symmetric window over an ordered sequence of
    /// axis node ids: `nodes[i]` links to up to `window_size` neighbors on
    /// each side, weighted by a Gaussian PDF normalized so the adjacent
    /// neighbor's coefficient is 1.
    pub fn add_gaussian_window_edges(
        &mut self,
        reg: &mut Registry,
        nodes: &[String],
        window_size: usize,
        base_weight: f64,
        std_scale: f64,
    ) -> Result<()> {
        if self.compiled {
            return Err(GraphError::AlreadyCompiled);
        }
        if window_size == 0 || nodes.len() < 2 {
            return Ok(());
        }

        let std = window_size as f64 / 3.0;
        let pdf = |x: f64| (-0.5 * (x / std).powi(2)).exp() / (std * (2.0 * std::f64::consts::PI).sqrt());
        let w1 = pdf(1.0);

        let n = nodes.len();
        for i in 0..n {
            for j in 1..=window_size {
                let w_j = if w1 > 0.0 { pdf(j as f64) / w1 } else { 0.0 };
                let dist = Distribution::Normal {
                    m: w_j * base_weight,
                    s: w_j * std_scale,
                };
                if i >= j {
                    self.add_knowledge_edge(reg, &nodes[i], &nodes[i - j], dist.clone())?;
                }
                if i + j < n {
                    self.add_knowledge_edge(reg, &nodes[i], &nodes[i + j], dist)?;
                }
            }
        }
        Ok(())
    }

    /// Resolves every pending `auto` edge to a `Normal`, freezes the
    /// manager, and clears the pending table.
    pub fn compile(&mut self, reg: &mut Registry, strict: bool) -> Result<()> {
        if self.compiled {
            return Err(GraphError::AlreadyCompiled);
        }

        for (&target, edges) in self.pending.iter() {
            let weights: Vec<Option<f64>> = edges.iter().map(|&(_, w)| w).collect();
            let all_none = weights.iter().all(|w| w.is_none());
            let all_some = weights.iter().all(|w| w.is_some());

            let resolved: Vec<f64> = if all_none {
                let n = weights.len() as f64;
                vec![1.0 / n; weights.len()]
            } else if all_some {
                let sum: f64 = weights.iter().map(|w| w.unwrap()).sum();
                weights.iter().map(|w| w.unwrap() / sum).collect()
            } else if strict {
                let target_id = reg.graph[target].id.clone();
                return Err(GraphError::InconsistentAutoWeights(target_id));
            } else {
                let specified: Vec<f64> = weights.iter().filter_map(|w| *w).collect();
                let mean = specified.iter().sum::<f64>() / specified.len() as f64;
                let filled: Vec<f64> = weights.iter().map(|w| w.unwrap_or(mean)).collect();
                let sum: f64 = filled.iter().sum();
                filled.iter().map(|w| w / sum).collect()
            };

            for (&(source, _), &normalized) in edges.iter().zip(resolved.iter()) {
                if let Some(edge) = reg.find_knowledge_edge(source, target) {
                    reg.set_knowledge_edge_dist(
                        edge,
                        Distribution::Normal {
                            m: normalized,
                            s: 0.1,
                        },
                    );
                }
            }
        }

        self.pending.clear();
        self.compiled = true;
        Ok(())
    }

    pub fn stats(&self, reg: &Registry) -> KnowledgeStats {
        KnowledgeStats {
            is_compiled: self.compiled,
            pending_edge_count: self.pending.values().map(|v| v.len()).sum(),
            targets_with_pending: self.pending.len(),
            total_nodes: reg.graph.node_count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::build_dependency_graph;
    use crate::morphology::Corpus;
    use crate::node_id::KnowledgeAxis;
    use crate::quran::{Chapter, Quran, RevelationPlace, Verse, Word};

    fn two_verse_chapter() -> Quran {
        let word = |pos: u32, text: &str| Word {
            position: pos,
            text_uthmani: text.into(),
            text_uthmani_simple: None,
            text_imlaei: None,
            transliteration: None,
            char_type_name: Some("word".into()),
        };
        let v1 = Verse {
            verse_key: "1:1".into(),
            chapter_number: 1,
            verse_number: 1,
            words: vec![word(1, "a")],
            juz_number: 1,
            hizb_number: 1,
            rub_number: None,
            manzil_number: None,
            ruku_number: None,
            page_number: 1,
            sajdah: None,
        };
        let mut v2 = v1.clone();
        v2.verse_key = "1:2".into();
        v2.verse_number = 2;
        Quran {
            chapters: vec![Chapter {
                number: 1,
                name_arabic: "ا".into(),
                name_simple: "a".into(),
                revelation_place: RevelationPlace::Makkah,
                revelation_order: 1,
                bismillah_pre: true,
                verses: vec![v1, v2],
            }],
        }
    }

    #[test]
    fn auto_weights_normalize_to_one() {
        let quran = two_verse_chapter();
        let morph = Corpus::parse("h\n".as_bytes()).unwrap();
        let mut reg = build_dependency_graph(&quran, &morph);
        let mut mgr = KnowledgeEdgeManager::new();

        let c1 = node_id::knowledge(&node_id::chapter(1), KnowledgeAxis::Memorization);
        let v1 = node_id::knowledge(&node_id::verse(1, 1), KnowledgeAxis::Memorization);
        let v2 = node_id::knowledge(&node_id::verse(1, 2), KnowledgeAxis::Memorization);

        mgr.add_knowledge_edge(&mut reg, &v1, &c1, Distribution::auto(2.0)).unwrap();
        mgr.add_knowledge_edge(&mut reg, &v2, &c1, Distribution::auto(3.0)).unwrap();
        mgr.compile(&mut reg, false).unwrap();

        let c1_idx = reg.get(&c1).unwrap();
        let v1_idx = reg.get(&v1).unwrap();
        let v2_idx = reg.get(&v2).unwrap();

        let e1 = reg.find_knowledge_edge(v1_idx, c1_idx).unwrap();
        let e2 = reg.find_knowledge_edge(v2_idx, c1_idx).unwrap();

        let m1 = match &reg.graph[e1].dist {
            Some(Distribution::Normal { m, .. }) => *m,
            _ => panic!("expected resolved normal"),
        };
        let m2 = match &reg.graph[e2].dist {
            Some(Distribution::Normal { m, .. }) => *m,
            _ => panic!("expected resolved normal"),
        };
        assert!((m1 - 0.4).abs() < 1e-9);
        assert!((m2 - 0.6).abs() < 1e-9);
        assert!((m1 + m2 - 1.0).abs() < 1e-9);
    }

    #[test]
    fn illegal_axis_is_rejected_and_creates_no_node() {
        let quran = two_verse_chapter();
        let morph = Corpus::parse("h\n".as_bytes()).unwrap();
        let mut reg = build_dependency_graph(&quran, &morph);
        let mut mgr = KnowledgeEdgeManager::new();

        let chapter_tafsir = node_id::knowledge(&node_id::chapter(1), KnowledgeAxis::Tafsir);
        let bogus_word_tafsir = node_id::knowledge(&node_id::word("foo"), KnowledgeAxis::Tafsir);

        let err = mgr
            .add_knowledge_edge(&mut reg, &bogus_word_tafsir, &chapter_tafsir, Distribution::auto(1.0))
            .unwrap_err();
        assert!(matches!(
            err,
            GraphError::UnknownParent(_) | GraphError::IllegalAxis { .. }
        ));
        assert!(reg.get(&bogus_word_tafsir).is_none());
    }

    #[test]
    fn strict_mode_rejects_mixed_weights() {
        let quran = two_verse_chapter();
        let morph = Corpus::parse("h\n".as_bytes()).unwrap();
        let mut reg = build_dependency_graph(&quran, &morph);
        let mut mgr = KnowledgeEdgeManager::new();

        let c1 = node_id::knowledge(&node_id::chapter(1), KnowledgeAxis::Memorization);
        let v1 = node_id::knowledge(&node_id::verse(1, 1), KnowledgeAxis::Memorization);
        let v2 = node_id::knowledge(&node_id::verse(1, 2), KnowledgeAxis::Memorization);

        mgr.add_knowledge_edge(&mut reg, &v1, &c1, Distribution::auto_unweighted()).unwrap();
        mgr.add_knowledge_edge(&mut reg, &v2, &c1, Distribution::auto(0.7)).unwrap();

        let err = mgr.compile(&mut reg, true).unwrap_err();
        assert!(matches!(err, GraphError::InconsistentAutoWeights(_)));
    }

    #[test]
    fn compile_twice_fails() {
        let quran = two_verse_chapter();
        let morph = Corpus::parse("h\n".as_bytes()).unwrap();
        let mut reg = build_dependency_graph(&quran, &morph);
        let mut mgr = KnowledgeEdgeManager::new();
        mgr.compile(&mut reg, false).unwrap();
        assert!(matches!(mgr.compile(&mut reg, false), Err(GraphError::AlreadyCompiled)));
    }

    #[test]
    fn re_adding_same_edge_is_noop() {
        let quran = two_verse_chapter();
        let morph = Corpus::parse("h\n".as_bytes()).unwrap();
        let mut reg = build_dependency_graph(&quran, &morph);
        let mut mgr = KnowledgeEdgeManager::new();

        let c1 = node_id::knowledge(&node_id::chapter(1), KnowledgeAxis::Memorization);
        let v1 = node_id::knowledge(&node_id::verse(1, 1), KnowledgeAxis::Memorization);

        mgr.add_knowledge_edge(&mut reg, &v1, &c1, Distribution::auto(1.0)).unwrap();
        mgr.add_knowledge_edge(&mut reg, &v1, &c1, Distribution::auto(1.0)).unwrap();

        let stats = mgr.stats(&reg);
        assert_eq!(stats.pending_edge_count, 1);
    }
}
