//! The morphology corpus: a tab-delimited Quranic morphology dump parsed
//! into segment records keyed by (chapter, verse, word, segment), sliceable
//! along any of the four dimensions.

use std::collections::BTreeMap;
use std::collections::{BTreeSet, HashMap};
use std::io::Read;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MorphologyError {
    #[error("I/O error reading morphology data: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed morphology row: {0}")]
    Csv(#[from] csv::Error),

    #[error("malformed location {0:?}")]
    InvalidLocation(String),

    #[error("unknown POS code {0:?}")]
    UnknownPos(String),
}

pub type Result<T> = std::result::Result<T, MorphologyError>;

/// A (chapter, verse, word, segment) coordinate. All components are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Location {
    pub chapter: u32,
    pub verse: u32,
    pub word: u32,
    pub segment: u32,
}

impl Location {
    pub fn parse(raw: &str) -> Result<Self> {
        let parts: Vec<&str> = raw.split(':').collect();
        if parts.len() != 4 {
            return Err(MorphologyError::InvalidLocation(raw.to_string()));
        }
        let mut nums = [0u32; 4];
        for (i, p) in parts.iter().enumerate() {
            let n: u32 = p
                .parse()
                .map_err(|_| MorphologyError::InvalidLocation(raw.to_string()))?;
            if n < 1 {
                return Err(MorphologyError::InvalidLocation(raw.to_string()));
            }
            nums[i] = n;
        }
        Ok(Location {
            chapter: nums[0],
            verse: nums[1],
            word: nums[2],
            segment: nums[3],
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SegmentType {
    Prefix,
    Suffix,
    Root,
    Lemma,
    Pronoun,
    Inlaid,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pos {
    Noun,
    Verb,
    Adjective,
    Adverb,
    Particle,
    Pronoun,
    Preposition,
    Conjunction,
    Interjection,
    Unknown,
}

impl Pos {
    /// Maps Quranic-corpus-style POS tags onto the closed vocabulary this
    /// model exposes. Several raw corpus sub-tags (e.g. the various
    /// particle classes `NEG`, `SUB`, `ACC`) collapse onto one bucket here;
    /// only tags with no sensible bucket are rejected as malformed input.
    fn from_code(code: &str) -> Result<Self> {
        use Pos::*;
        Ok(match code {
            "N" | "PN" => Noun,
            "V" => Verb,
            "ADJ" => Adjective,
            "ADV" | "T" | "LOC" | "CIRC" => Adverb,
            "PRON" | "DEM" | "REL" => Pronoun,
            "P" => Preposition,
            "CONJ" | "SUB" => Conjunction,
            "INTJ" | "VOC" => Interjection,
            "NEG" | "ACC" | "CAUS" | "COND" | "EXH" | "EXL" | "FUT" | "INC" | "REM" | "RES"
            | "RSLT" | "SUP" | "AMD" | "ANS" | "AVR" | "EQ" | "INTG" | "RSTR" | "RET" | "RSLTN" => {
                Particle
            }
            "UNK" => Unknown,
            other => return Err(MorphologyError::UnknownPos(other.to_string())),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Voice {
    Active,
    Passive,
}

/// The grammatical feature tags attached to a segment: a presence set of
/// bare flags (e.g. `M`, `PASS`) plus a dict of `KEY:VALUE` tokens (e.g.
/// `PERS:3`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GrammaticalFeatures {
    flags: BTreeSet<String>,
    values: BTreeMap<String, String>,
}

impl GrammaticalFeatures {
    pub fn has(&self, flag: &str) -> bool {
        self.flags.contains(flag)
    }

    pub fn value(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|s| s.as_str())
    }

    /// Voice defaults to ACTIVE when the PASS flag is absent.
    pub fn voice(&self) -> Voice {
        if self.has("PASS") {
            Voice::Passive
        } else {
            Voice::Active
        }
    }

    pub fn flags(&self) -> impl Iterator<Item = &str> {
        self.flags.iter().map(|s| s.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub location: Location,
    pub text: String,
    pub segment_type: SegmentType,
    pub pos: Pos,
    pub root: String,
    pub lemma: String,
    pub grammatical_features: GrammaticalFeatures,
}

fn parse_features(raw: &str) -> GrammaticalFeatures {
    let mut features = GrammaticalFeatures::default();
    for token in raw.split('|') {
        if token.is_empty() {
            continue;
        }
        match token.split_once(':') {
            Some((k, v)) => {
                features.values.insert(k.to_string(), v.to_string());
            }
            None => {
                features.flags.insert(token.to_string());
            }
        }
    }
    features
}

/// First-match-wins label only; `root`/`lemma` are read independently off
/// `features` by the caller, since a stem can carry both tags at once.
fn classify(features: &GrammaticalFeatures) -> SegmentType {
    if features.has("PREF") {
        return SegmentType::Prefix;
    }
    if features.has("SUFF") {
        return SegmentType::Suffix;
    }
    if features.value("ROOT").is_some() {
        return SegmentType::Root;
    }
    if features.has("PRON") {
        return SegmentType::Pronoun;
    }
    if features.value("LEM").is_some() {
        return SegmentType::Lemma;
    }
    if features.has("INL") {
        return SegmentType::Inlaid;
    }
    SegmentType::Unknown
}

/// Any of: an exact coordinate, a half-open range, or "all values" for one
/// dimension of a slice query.
#[derive(Debug, Clone)]
pub enum Dim {
    Any,
    Exact(u32),
    Range(std::ops::Range<u32>),
}

impl Dim {
    fn matches(&self, v: u32) -> bool {
        match self {
            Dim::Any => true,
            Dim::Exact(x) => *x == v,
            Dim::Range(r) => r.contains(&v),
        }
    }
}

impl From<u32> for Dim {
    fn from(v: u32) -> Self {
        Dim::Exact(v)
    }
}

impl From<std::ops::Range<u32>> for Dim {
    fn from(r: std::ops::Range<u32>) -> Self {
        Dim::Range(r)
    }
}

/// The parsed, indexed morphology corpus.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    segments: Vec<Segment>,
    /// (chapter, verse, word) -> sorted indices into `segments`, built in a
    /// single O(n) pass so `(ch, v, w, :)` slices are O(segments of word).
    by_word: HashMap<(u32, u32, u32), Vec<usize>>,
}

impl Corpus {
    /// Parse a tab-delimited morphology dump. The first row is a header and
    /// is discarded; each subsequent row is `LOCATION\tFORM\tPOS\tFEATURES`.
    pub fn parse<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(true)
            .flexible(false)
            .from_reader(reader);

        let mut segments = Vec::new();
        let mut by_word: HashMap<(u32, u32, u32), Vec<usize>> = HashMap::new();

        for result in rdr.records() {
            let record = result?;
            if record.len() < 4 {
                continue;
            }
            let location = Location::parse(&record[0])?;
            let text = record[1].to_string();
            let pos = Pos::from_code(&record[2])?;
            let features = parse_features(&record[3]);
            let segment_type = classify(&features);
            // root/lemma are read independently of the segment-type label:
            // a stem can carry both ROOT and LEM tags at once.
            let root = features.value("ROOT").unwrap_or("").to_string();
            let lemma = features.value("LEM").unwrap_or("").to_string();

            let idx = segments.len();
            by_word
                .entry((location.chapter, location.verse, location.word))
                .or_default()
                .push(idx);

            segments.push(Segment {
                location,
                text,
                segment_type,
                pos,
                root,
                lemma,
                grammatical_features: features,
            });
        }

        for indices in by_word.values_mut() {
            indices.sort_by_key(|&i| segments[i].location.segment);
        }

        Ok(Corpus { segments, by_word })
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Exact lookup of a single segment by its full coordinate.
    pub fn get(&self, chapter: u32, verse: u32, word: u32, segment: u32) -> Option<&Segment> {
        self.by_word
            .get(&(chapter, verse, word))?
            .iter()
            .map(|&i| &self.segments[i])
            .find(|s| s.location.segment == segment)
    }

    /// All segments of a given word, in segment order. O(segments of word).
    pub fn word_segments(&self, chapter: u32, verse: u32, word: u32) -> Vec<&Segment> {
        match self.by_word.get(&(chapter, verse, word)) {
            Some(indices) => indices.iter().map(|&i| &self.segments[i]).collect(),
            None => Vec::new(),
        }
    }

    /// General slice over all four dimensions; each may be exact, a range,
    /// or unconstrained. Preserves source order.
    pub fn slice(
        &self,
        chapter: impl Into<Dim>,
        verse: impl Into<Dim>,
        word: impl Into<Dim>,
        segment: impl Into<Dim>,
    ) -> Vec<&Segment> {
        let (chapter, verse, word, segment) =
            (chapter.into(), verse.into(), word.into(), segment.into());
        self.segments
            .iter()
            .filter(|s| {
                chapter.matches(s.location.chapter)
                    && verse.matches(s.location.verse)
                    && word.matches(s.location.word)
                    && segment.matches(s.location.segment)
            })
            .collect()
    }

    /// Iterate all segments in source order.
    pub fn iter(&self) -> impl Iterator<Item = &Segment> {
        self.segments.iter()
    }

    /// Iterate only the ROOT segments.
    pub fn roots(&self) -> impl Iterator<Item = &Segment> {
        self.segments
            .iter()
            .filter(|s| s.segment_type == SegmentType::Root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "LOCATION\tFORM\tPOS\tFEATURES\n\
        1:1:1:1\tبِ\tP\tPREF\n\
        1:1:1:2\tسْمِ\tN\tLEM:اِسْم|ROOT:سمو|M|GEN\n\
        1:1:2:1\tٱللَّهِ\tPN\tLEM:الله|ROOT:اله|GEN\n";

    #[test]
    fn parses_and_classifies() {
        let corpus = Corpus::parse(SAMPLE.as_bytes()).unwrap();
        assert_eq!(corpus.len(), 3);

        let prefix = corpus.get(1, 1, 1, 1).unwrap();
        assert_eq!(prefix.segment_type, SegmentType::Prefix);

        // This segment carries both ROOT and LEM tags; the type label picks
        // Root (ROOT is checked first), but both fields must still be set.
        let dual_seg = corpus.get(1, 1, 1, 2).unwrap();
        assert_eq!(dual_seg.segment_type, SegmentType::Root);
        assert_eq!(dual_seg.root, "سمو");
        assert_eq!(dual_seg.lemma, "اِسْم");
        assert_eq!(dual_seg.grammatical_features.value("LEM"), Some("اِسْم"));
        assert_eq!(dual_seg.grammatical_features.voice(), Voice::Active);
    }

    #[test]
    fn slices_by_word() {
        let corpus = Corpus::parse(SAMPLE.as_bytes()).unwrap();
        let word_segs = corpus.word_segments(1, 1, 1);
        assert_eq!(word_segs.len(), 2);
        assert_eq!(word_segs[0].location.segment, 1);
        assert_eq!(word_segs[1].location.segment, 2);
    }

    #[test]
    fn roots_iterator_filters() {
        // Both non-prefix segments in SAMPLE carry a ROOT tag.
        let corpus = Corpus::parse(SAMPLE.as_bytes()).unwrap();
        assert_eq!(corpus.roots().count(), 2);
    }

    #[test]
    fn rejects_bad_location() {
        assert!(Location::parse("1:1:1").is_err());
        assert!(Location::parse("0:1:1:1").is_err());
    }
}
