//! C8: the scoring engine. Expected-weight projection over knowledge-only
//! edges, personalized PageRank in both directions, and log01 normalization
//! to [0, 1] (§4.8).

use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;

use crate::graph::{Distribution, EdgeData, GraphError, KnowledgeEdgeManager, Registry, Result};
use crate::node_id::NodeKind;

#[derive(Debug, Clone, Copy)]
pub struct ScoringConfig {
    pub damping: f64,
    pub max_iter: usize,
    pub tol: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            damping: 0.85,
            max_iter: 50_000,
            tol: 1.0e-10,
        }
    }
}

fn expected_weight(edge: &EdgeData) -> f64 {
    match &edge.dist {
        Some(Distribution::Normal { m, .. }) => m.clamp(0.0, 1.0),
        Some(Distribution::Beta { a, b }) => {
            if a + b > 0.0 {
                a / (a + b)
            } else {
                0.0
            }
        }
        Some(Distribution::Constant { weight, probability_like }) => {
            if *probability_like {
                weight.clamp(0.0, 1.0)
            } else {
                weight.max(0.0)
            }
        }
        Some(Distribution::Auto { relative_weight }) => relative_weight.unwrap_or(1.0).clamp(0.0, 1.0),
        None => 1.0,
    }
}

fn node_prior(kind: NodeKind) -> f64 {
    match kind {
        NodeKind::Root => 3.0,
        NodeKind::Lemma => 2.5,
        NodeKind::Chapter => 2.0,
        NodeKind::Verse => 1.5,
        NodeKind::Word => 1.0,
        NodeKind::WordInstance => 0.5,
        NodeKind::Stem => 1.0,
        NodeKind::Knowledge => 1.0,
    }
}

/// Power-iteration PageRank over an explicit weighted adjacency list.
/// `personalization`/`dangling` default to the uniform distribution when
/// absent, matching the networkx convention this algorithm is modeled on.
fn pagerank(
    out_edges: &[Vec<(usize, f64)>],
    out_weight_sum: &[f64],
    n: usize,
    alpha: f64,
    personalization: Option<&[f64]>,
    dangling: Option<&[f64]>,
    max_iter: usize,
    tol: f64,
) -> Vec<f64> {
    if n == 0 {
        return Vec::new();
    }
    let uniform = vec![1.0 / n as f64; n];
    let personalization = personalization.unwrap_or(&uniform);
    let dangling = dangling.unwrap_or(personalization);

    let mut x = uniform.clone();
    for _ in 0..max_iter {
        let dangling_sum: f64 = (0..n).filter(|&i| out_weight_sum[i] == 0.0).map(|i| x[i]).sum();

        let mut next = vec![0.0; n];
        for u in 0..n {
            if out_weight_sum[u] <= 0.0 {
                continue;
            }
            for &(v, w) in &out_edges[u] {
                next[v] += alpha * x[u] * w / out_weight_sum[u];
            }
        }
        for v in 0..n {
            next[v] += alpha * dangling_sum * dangling[v] + (1.0 - alpha) * personalization[v];
        }

        let err: f64 = (0..n).map(|i| (next[i] - x[i]).abs()).sum();
        x = next;
        if err < n as f64 * tol {
            break;
        }
    }
    x
}

fn median(values: &mut [f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

/// Clip negatives to 0, log-compress around the median of the positive
/// entries, then min-max normalize. An all-zero or non-finite range
/// collapses to an all-zero output rather than dividing by zero.
fn log01_normalize(raw: &[f64]) -> Vec<f64> {
    let clipped: Vec<f64> = raw.iter().map(|&v| v.max(0.0)).collect();

    let mut positive: Vec<f64> = clipped.iter().copied().filter(|&v| v > 0.0).collect();
    let m = median(&mut positive);
    let scale = if m > 0.0 { 1.0 / m } else { 1.0e9 };

    let y: Vec<f64> = clipped.iter().map(|&v| (1.0 + v * scale).ln()).collect();

    let min_y = y.iter().cloned().fold(f64::INFINITY, f64::min);
    let max_y = y.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let ptp = max_y - min_y;

    if !ptp.is_finite() || ptp == 0.0 {
        vec![0.0; raw.len()]
    } else {
        y.iter().map(|&v| (v - min_y) / ptp).collect()
    }
}

/// Scores every vertex of a compiled knowledge graph with a
/// `foundational_score` (forward personalized PageRank) and an
/// `influence_score` (reversed PageRank, personalization disabled per §9's
/// documented asymmetry), both log01-normalized to [0, 1].
pub fn score(reg: &mut Registry, kmgr: &KnowledgeEdgeManager, config: ScoringConfig) -> Result<()> {
    if !kmgr.is_compiled() {
        return Err(GraphError::NotCompiled);
    }

    let n = reg.graph.node_count();
    let mut out_edges: Vec<Vec<(usize, f64)>> = vec![Vec::new(); n];
    let mut out_weight_sum = vec![0.0; n];

    for edge in reg.graph.edge_references() {
        let data = edge.weight();
        let w = expected_weight(data);
        if w <= 0.0 {
            continue;
        }
        let u = edge.source().index();
        let v = edge.target().index();
        out_edges[u].push((v, w));
        out_weight_sum[u] += w;
    }

    let mut priors: Vec<f64> = (0..n)
        .map(|i| {
            let p = node_prior(reg.graph[NodeIndex::new(i)].kind);
            if p.is_finite() && p >= 0.0 {
                p
            } else {
                0.0
            }
        })
        .collect();
    let prior_sum: f64 = priors.iter().sum();
    if prior_sum > 0.0 {
        for p in priors.iter_mut() {
            *p /= prior_sum;
        }
    } else {
        priors = vec![1.0 / n as f64; n];
    }

    let pr_foundational = pagerank(
        &out_edges,
        &out_weight_sum,
        n,
        config.damping,
        Some(&priors),
        Some(&priors),
        config.max_iter,
        config.tol,
    );

    let mut rev_edges: Vec<Vec<(usize, f64)>> = vec![Vec::new(); n];
    let mut rev_weight_sum = vec![0.0; n];
    for u in 0..n {
        for &(v, w) in &out_edges[u] {
            rev_edges[v].push((u, w));
            rev_weight_sum[v] += w;
        }
    }
    let pr_influence = pagerank(
        &rev_edges,
        &rev_weight_sum,
        n,
        config.damping,
        None,
        None,
        config.max_iter,
        config.tol,
    );

    let foundational_norm = log01_normalize(&pr_foundational);
    let influence_norm = log01_normalize(&pr_influence);

    for i in 0..n {
        let idx = NodeIndex::new(i);
        reg.graph[idx].foundational_score = Some(foundational_norm[i]);
        reg.graph[idx].influence_score = Some(influence_norm[i]);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{build_dependency_graph, KnowledgeBuildConfig, KnowledgeGraphBuilder};
    use crate::morphology::Corpus;
    use crate::node_id;
    use crate::quran::{Chapter, Quran, RevelationPlace, Verse, Word};

    fn chapter_one() -> Quran {
        let word = |pos: u32, text: &str| Word {
            position: pos,
            text_uthmani: text.into(),
            text_uthmani_simple: None,
            text_imlaei: None,
            transliteration: None,
            char_type_name: Some("word".into()),
        };
        Quran {
            chapters: vec![Chapter {
                number: 1,
                name_arabic: "ا".into(),
                name_simple: "a".into(),
                revelation_place: RevelationPlace::Makkah,
                revelation_order: 5,
                bismillah_pre: true,
                verses: vec![Verse {
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
                }],
            }],
        }
    }

    #[test]
    fn scores_land_in_unit_range() {
        let quran = chapter_one();
        let morph = Corpus::parse("h\n".as_bytes()).unwrap();
        let mut reg = build_dependency_graph(&quran, &morph);
        let builder = KnowledgeGraphBuilder::new(KnowledgeBuildConfig::default());
        let kmgr = builder.build(&mut reg, &quran).unwrap();

        score(&mut reg, &kmgr, ScoringConfig::default()).unwrap();

        for idx in reg.graph.node_indices() {
            let node = &reg.graph[idx];
            let f = node.foundational_score.unwrap();
            let i = node.influence_score.unwrap();
            assert!((0.0..=1.0).contains(&f), "foundational {} out of range", f);
            assert!((0.0..=1.0).contains(&i), "influence {} out of range", i);
        }

        let chapter_idx = reg.get(&node_id::chapter(1)).unwrap();
        assert!(reg.graph[chapter_idx].foundational_score.unwrap() > 0.0);
    }

    #[test]
    fn scores_reflect_dependency_backbone_and_root_nodes() {
        let quran = chapter_one();
        let tsv = "LOCATION\tFORM\tPOS\tFEATURES\n\
            1:1:1:1\tبِسْمِ\tN\tLEM:اسم|ROOT:سمو\n\
            1:1:2:1\tٱللَّهِ\tPN\tLEM:الله|ROOT:اله\n";
        let morph = Corpus::parse(tsv.as_bytes()).unwrap();
        let mut reg = build_dependency_graph(&quran, &morph);

        let root_count = reg
            .graph
            .node_indices()
            .filter(|&idx| reg.graph[idx].kind == crate::node_id::NodeKind::Root)
            .count();
        assert!(root_count >= 2, "dual LEM|ROOT segments must still produce ROOT nodes");

        let builder = KnowledgeGraphBuilder::new(KnowledgeBuildConfig::default());
        let kmgr = builder.build(&mut reg, &quran).unwrap();
        score(&mut reg, &kmgr, ScoringConfig::default()).unwrap();

        // A word_instance node has no knowledge edges pointing at it except
        // through the dependency chain; if dependency edges didn't
        // participate in the PageRank projection, it would score 0.
        let wi_idx = reg.get(&node_id::word_instance(1, 1, 1)).unwrap();
        assert!(reg.graph[wi_idx].foundational_score.unwrap() > 0.0);

        let root_idx = reg
            .graph
            .node_indices()
            .find(|&idx| reg.graph[idx].kind == crate::node_id::NodeKind::Root)
            .unwrap();
        assert!(reg.graph[root_idx].foundational_score.unwrap() > 0.0);
    }

    #[test]
    fn refuses_to_score_uncompiled_graph() {
        let quran = chapter_one();
        let morph = Corpus::parse("h\n".as_bytes()).unwrap();
        let mut reg = build_dependency_graph(&quran, &morph);
        let kmgr = KnowledgeEdgeManager::new();
        assert!(matches!(
            score(&mut reg, &kmgr, ScoringConfig::default()),
            Err(GraphError::NotCompiled)
        ));
    }
}
