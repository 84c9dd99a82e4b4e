//! C9: statistics and post-build validation. Produces a machine-readable
//! summary record and enforces the checks in §4.9 (fatal ones return an
//! error; soft ones are collected as warnings).

use std::collections::BTreeMap;

use petgraph::visit::EdgeRef;

use crate::graph::{Distribution, EdgeKind, GraphError, Registry, Result};
use crate::node_id::NodeKind;

const TOP_N: usize = 10;
const MIN_WORDS_PER_VERSE: f64 = 15.0;
const MAX_WORDS_PER_VERSE: f64 = 35.0;

#[derive(Debug, Clone, Default)]
pub struct ScoreSummary {
    pub min: f64,
    pub mean: f64,
    pub median: f64,
    pub max: f64,
    pub stddev: f64,
}

impl ScoreSummary {
    fn from_values(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::default();
        }
        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let n = sorted.len();
        let mean = sorted.iter().sum::<f64>() / n as f64;
        let median = if n % 2 == 0 {
            (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
        } else {
            sorted[n / 2]
        };
        let variance = sorted.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n as f64;
        Self {
            min: sorted[0],
            mean,
            median,
            max: sorted[n - 1],
            stddev: variance.sqrt(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DegreeSummary {
    pub min: usize,
    pub mean: f64,
    pub median: f64,
    pub max: usize,
}

impl DegreeSummary {
    fn from_values(values: &[usize]) -> Self {
        if values.is_empty() {
            return Self::default();
        }
        let mut sorted = values.to_vec();
        sorted.sort_unstable();
        let n = sorted.len();
        let mean = sorted.iter().sum::<usize>() as f64 / n as f64;
        let median = if n % 2 == 0 {
            (sorted[n / 2 - 1] + sorted[n / 2]) as f64 / 2.0
        } else {
            sorted[n / 2] as f64
        };
        Self {
            min: sorted[0],
            mean,
            median,
            max: sorted[n - 1],
        }
    }
}

#[derive(Debug, Clone)]
pub struct TopEntry {
    pub id: String,
    pub value: f64,
}

#[derive(Debug, Clone)]
pub struct Statistics {
    pub node_count_by_type: BTreeMap<String, usize>,
    pub edge_count_by_type: BTreeMap<String, usize>,
    pub edge_count_by_axis: BTreeMap<String, usize>,
    pub edge_count_by_distribution: BTreeMap<String, usize>,
    pub foundational: ScoreSummary,
    pub influence: ScoreSummary,
    pub top_by_foundational: Vec<TopEntry>,
    pub top_by_influence: Vec<TopEntry>,
    pub top_by_in_degree: Vec<TopEntry>,
    pub top_by_out_degree: Vec<TopEntry>,
    pub weakly_connected: bool,
    pub component_count: usize,
    pub in_degree: DegreeSummary,
    pub out_degree: DegreeSummary,
    pub warnings: Vec<String>,
}

fn top_n(mut entries: Vec<TopEntry>, n: usize) -> Vec<TopEntry> {
    entries.sort_by(|a, b| b.value.partial_cmp(&a.value).unwrap());
    entries.truncate(n);
    entries
}

/// Builds the statistics record and runs the fatal/soft checks of §4.9.
/// Fatal conditions return an error; soft ones land in `Statistics::warnings`.
pub fn compute(reg: &Registry) -> Result<Statistics> {
    let graph = &reg.graph;
    let mut node_count_by_type: BTreeMap<String, usize> = BTreeMap::new();
    let mut foundational_values = Vec::new();
    let mut influence_values = Vec::new();
    let mut foundational_entries = Vec::new();
    let mut influence_entries = Vec::new();
    let mut in_degree_values = Vec::new();
    let mut out_degree_values = Vec::new();
    let mut in_degree_entries = Vec::new();
    let mut out_degree_entries = Vec::new();

    let mut total_content_words = 0usize;
    let mut total_verses = 0usize;

    for idx in graph.node_indices() {
        let node = &graph[idx];
        *node_count_by_type.entry(node.kind.as_str().to_string()).or_default() += 1;

        if node.kind == NodeKind::Verse {
            total_verses += 1;
        }
        if node.kind == NodeKind::WordInstance {
            total_content_words += 1;
        }

        if let Some(f) = node.foundational_score {
            if !(0.0..=1.0).contains(&f) {
                return Err(GraphError::ScoreOutOfRange(node.id.clone(), f));
            }
            foundational_values.push(f);
            foundational_entries.push(TopEntry { id: node.id.clone(), value: f });
        }
        if let Some(i) = node.influence_score {
            if !(0.0..=1.0).contains(&i) {
                return Err(GraphError::ScoreOutOfRange(node.id.clone(), i));
            }
            influence_values.push(i);
            influence_entries.push(TopEntry { id: node.id.clone(), value: i });
        }

        let in_deg = graph.edges_directed(idx, petgraph::Direction::Incoming).count();
        let out_deg = graph.edges_directed(idx, petgraph::Direction::Outgoing).count();
        in_degree_values.push(in_deg);
        out_degree_values.push(out_deg);
        in_degree_entries.push(TopEntry { id: node.id.clone(), value: in_deg as f64 });
        out_degree_entries.push(TopEntry { id: node.id.clone(), value: out_deg as f64 });
    }

    let mut edge_count_by_type: BTreeMap<String, usize> = BTreeMap::new();
    let mut edge_count_by_axis: BTreeMap<String, usize> = BTreeMap::new();
    let mut edge_count_by_distribution: BTreeMap<String, usize> = BTreeMap::new();

    for edge in graph.edge_references() {
        let data = edge.weight();
        let type_key = match data.kind {
            EdgeKind::Dependency => "dependency",
            EdgeKind::Knowledge => "knowledge",
        };
        *edge_count_by_type.entry(type_key.to_string()).or_default() += 1;

        if data.kind == EdgeKind::Knowledge {
            match &data.dist {
                Some(dist) => {
                    let dist_key = match dist {
                        Distribution::Normal { .. } => "normal",
                        Distribution::Beta { .. } => "beta",
                        Distribution::Constant { .. } => "constant",
                        Distribution::Auto { .. } => "auto",
                    };
                    *edge_count_by_distribution.entry(dist_key.to_string()).or_default() += 1;
                }
                None => {
                    return Err(GraphError::MissingDistribution(
                        graph[edge.source()].id.clone(),
                        graph[edge.target()].id.clone(),
                    ));
                }
            }
            if let Some(axis) = graph[edge.target()].axis {
                *edge_count_by_axis.entry(axis.as_str().to_string()).or_default() += 1;
            }
        }
    }

    let mut warnings = Vec::new();
    if total_verses > 0 {
        let ratio = total_content_words as f64 / total_verses as f64;
        if !(MIN_WORDS_PER_VERSE..=MAX_WORDS_PER_VERSE).contains(&ratio) {
            warnings.push(format!(
                "words-per-verse ratio {:.2} is outside the expected [15, 35] range",
                ratio
            ));
        }
    }

    let component_count = petgraph::algo::connected_components(graph);
    let weakly_connected = component_count <= 1;
    if !weakly_connected {
        warnings.push(format!("graph has {} weakly-connected components", component_count));
    }

    Ok(Statistics {
        node_count_by_type,
        edge_count_by_type,
        edge_count_by_axis,
        edge_count_by_distribution,
        foundational: ScoreSummary::from_values(&foundational_values),
        influence: ScoreSummary::from_values(&influence_values),
        top_by_foundational: top_n(foundational_entries, TOP_N),
        top_by_influence: top_n(influence_entries, TOP_N),
        top_by_in_degree: top_n(in_degree_entries, TOP_N),
        top_by_out_degree: top_n(out_degree_entries, TOP_N),
        weakly_connected,
        component_count,
        in_degree: DegreeSummary::from_values(&in_degree_values),
        out_degree: DegreeSummary::from_values(&out_degree_values),
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{build_dependency_graph, KnowledgeBuildConfig, KnowledgeGraphBuilder};
    use crate::morphology::Corpus;
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
    fn compiled_graph_has_no_missing_distributions() {
        let quran = chapter_one();
        let morph = Corpus::parse("h\n".as_bytes()).unwrap();
        let mut reg = build_dependency_graph(&quran, &morph);
        let builder = KnowledgeGraphBuilder::new(KnowledgeBuildConfig::default());
        builder.build(&mut reg, &quran).unwrap();

        let stats = compute(&reg).unwrap();
        assert!(stats.node_count_by_type.get("chapter").copied().unwrap_or(0) >= 1);
        assert!(stats.edge_count_by_type.get("knowledge").copied().unwrap_or(0) > 0);
    }

    #[test]
    fn flags_short_words_per_verse_ratio() {
        let quran = chapter_one();
        let morph = Corpus::parse("h\n".as_bytes()).unwrap();
        let reg = build_dependency_graph(&quran, &morph);
        let stats = compute(&reg).unwrap();
        assert!(stats.warnings.iter().any(|w| w.contains("words-per-verse")));
    }
}
