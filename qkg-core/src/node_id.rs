use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NodeIdError {
    #[error("invalid node ID format: {0}")]
    InvalidFormat(String),

    #[error("invalid node type prefix: {0}")]
    InvalidPrefix(String),

    #[error("invalid chapter number: {0} (must be 1-114)")]
    InvalidChapter(i64),

    #[error("invalid verse number: {0} (must be >= 1)")]
    InvalidVerse(i64),

    #[error("invalid position: {0} (must be >= 1)")]
    InvalidPosition(i64),

    #[error("invalid knowledge axis: {0}")]
    InvalidAxis(String),

    #[error("malformed node ID: {0}")]
    Malformed(String),
}

pub type Result<T> = std::result::Result<T, NodeIdError>;

/// A named learning dimension attached to a base (non-knowledge) node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KnowledgeAxis {
    Memorization,
    Translation,
    Tafsir,
    Tajweed,
    ContextualMemorization,
    Meaning,
}

impl KnowledgeAxis {
    pub fn as_str(&self) -> &'static str {
        match self {
            KnowledgeAxis::Memorization => "memorization",
            KnowledgeAxis::Translation => "translation",
            KnowledgeAxis::Tafsir => "tafsir",
            KnowledgeAxis::Tajweed => "tajweed",
            KnowledgeAxis::ContextualMemorization => "contextual_memorization",
            KnowledgeAxis::Meaning => "meaning",
        }
    }

    pub fn from_str(s: &str) -> std::result::Result<Self, ()> {
        match s {
            "memorization" => Ok(Self::Memorization),
            "translation" => Ok(Self::Translation),
            "tafsir" => Ok(Self::Tafsir),
            "tajweed" => Ok(Self::Tajweed),
            "contextual_memorization" => Ok(Self::ContextualMemorization),
            "meaning" => Ok(Self::Meaning),
            _ => Err(()),
        }
    }

    pub const ALL: [KnowledgeAxis; 6] = [
        KnowledgeAxis::Memorization,
        KnowledgeAxis::Translation,
        KnowledgeAxis::Tafsir,
        KnowledgeAxis::Tajweed,
        KnowledgeAxis::ContextualMemorization,
        KnowledgeAxis::Meaning,
    ];
}

impl std::fmt::Display for KnowledgeAxis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The kind of entity a node ID refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Chapter,
    Verse,
    WordInstance,
    Word,
    Lemma,
    Root,
    Stem,
    Knowledge,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Chapter => "chapter",
            NodeKind::Verse => "verse",
            NodeKind::WordInstance => "word_instance",
            NodeKind::Word => "word",
            NodeKind::Lemma => "lemma",
            NodeKind::Root => "root",
            NodeKind::Stem => "stem",
            NodeKind::Knowledge => "knowledge",
        }
    }
}

// ============================================================================
// BUILDERS (infallible given valid inputs)
// ============================================================================

pub fn chapter(num: u16) -> String {
    debug_assert!((1..=114).contains(&num), "chapter must be 1-114");
    format!("CHAPTER:{}", num)
}

pub fn verse(chapter: u16, verse: u32) -> String {
    debug_assert!((1..=114).contains(&chapter));
    debug_assert!(verse >= 1);
    format!("VERSE:{}:{}", chapter, verse)
}

pub fn word_instance(chapter: u16, verse: u32, position: u32) -> String {
    debug_assert!((1..=114).contains(&chapter));
    debug_assert!(verse >= 1);
    debug_assert!(position >= 1);
    format!("WORD_INSTANCE:{}:{}:{}", chapter, verse, position)
}

pub fn word(text: &str) -> String {
    format!("WORD:{}", text)
}

pub fn lemma(text: &str) -> String {
    format!("LEMMA:{}", text)
}

pub fn root(text: &str) -> String {
    format!("ROOT:{}", text)
}

pub fn stem(text: &str) -> String {
    format!("STEM:{}", text)
}

/// Build a knowledge sub-node ID: "<parent-id>:<axis>".
pub fn knowledge(parent_id: &str, axis: KnowledgeAxis) -> String {
    format!("{}:{}", parent_id, axis.as_str())
}

// ============================================================================
// PARSERS (fallible)
// ============================================================================

pub fn parse_chapter(id: &str) -> Result<u16> {
    let parts: Vec<&str> = id.split(':').collect();
    if parts.len() != 2 || parts[0] != "CHAPTER" {
        return Err(NodeIdError::InvalidFormat(id.to_string()));
    }
    let num: i64 = parts[1]
        .parse()
        .map_err(|_| NodeIdError::Malformed(id.to_string()))?;
    if !(1..=114).contains(&num) {
        return Err(NodeIdError::InvalidChapter(num));
    }
    Ok(num as u16)
}

pub fn parse_verse(id: &str) -> Result<(u16, u32)> {
    let parts: Vec<&str> = id.split(':').collect();
    if parts.len() != 3 || parts[0] != "VERSE" {
        return Err(NodeIdError::InvalidFormat(id.to_string()));
    }
    let chapter: i64 = parts[1]
        .parse()
        .map_err(|_| NodeIdError::Malformed(id.to_string()))?;
    let verse: i64 = parts[2]
        .parse()
        .map_err(|_| NodeIdError::Malformed(id.to_string()))?;
    if !(1..=114).contains(&chapter) {
        return Err(NodeIdError::InvalidChapter(chapter));
    }
    if verse < 1 {
        return Err(NodeIdError::InvalidVerse(verse));
    }
    Ok((chapter as u16, verse as u32))
}

pub fn parse_word_instance(id: &str) -> Result<(u16, u32, u32)> {
    let parts: Vec<&str> = id.split(':').collect();
    if parts.len() != 4 || parts[0] != "WORD_INSTANCE" {
        return Err(NodeIdError::InvalidFormat(id.to_string()));
    }
    let chapter: i64 = parts[1]
        .parse()
        .map_err(|_| NodeIdError::Malformed(id.to_string()))?;
    let verse: i64 = parts[2]
        .parse()
        .map_err(|_| NodeIdError::Malformed(id.to_string()))?;
    let position: i64 = parts[3]
        .parse()
        .map_err(|_| NodeIdError::Malformed(id.to_string()))?;
    if !(1..=114).contains(&chapter) {
        return Err(NodeIdError::InvalidChapter(chapter));
    }
    if verse < 1 {
        return Err(NodeIdError::InvalidVerse(verse));
    }
    if position < 1 {
        return Err(NodeIdError::InvalidPosition(position));
    }
    Ok((chapter as u16, verse as u32, position as u32))
}

fn parse_text_node(id: &str, prefix: &str) -> Result<String> {
    let (p, rest) = id
        .split_once(':')
        .ok_or_else(|| NodeIdError::InvalidFormat(id.to_string()))?;
    if p != prefix || rest.is_empty() {
        return Err(NodeIdError::InvalidFormat(id.to_string()));
    }
    Ok(rest.to_string())
}

pub fn parse_word(id: &str) -> Result<String> {
    parse_text_node(id, "WORD")
}

pub fn parse_lemma(id: &str) -> Result<String> {
    parse_text_node(id, "LEMMA")
}

pub fn parse_root(id: &str) -> Result<String> {
    parse_text_node(id, "ROOT")
}

pub fn parse_stem(id: &str) -> Result<String> {
    parse_text_node(id, "STEM")
}

/// Parse a knowledge node: "VERSE:1:1:memorization" -> ("VERSE:1:1", Memorization).
pub fn parse_knowledge(id: &str) -> Result<(String, KnowledgeAxis)> {
    let parts: Vec<&str> = id.split(':').collect();
    if parts.len() < 3 {
        return Err(NodeIdError::InvalidFormat(id.to_string()));
    }
    let axis_str = parts.last().unwrap();
    let axis =
        KnowledgeAxis::from_str(axis_str).map_err(|_| NodeIdError::InvalidAxis(axis_str.to_string()))?;
    let base_id = parts[..parts.len() - 1].join(":");
    Ok((base_id, axis))
}

/// Given a word-instance ID, return the verse ID it belongs to.
pub fn verse_of_word_instance(id: &str) -> Result<String> {
    let (chapter, v, _) = parse_word_instance(id)?;
    Ok(verse(chapter, v))
}

/// Given a verse ID, return the chapter ID it belongs to.
pub fn chapter_of_verse(id: &str) -> Result<String> {
    let (chapter, _) = parse_verse(id)?;
    Ok(self::chapter(chapter))
}

/// Detect the node kind from an ID string without fully validating arity.
pub fn node_kind(id: &str) -> Result<NodeKind> {
    let parts: Vec<&str> = id.split(':').collect();
    if parts.is_empty() || parts[0].is_empty() {
        return Err(NodeIdError::InvalidFormat(id.to_string()));
    }

    if parts.len() >= 3 {
        if let Some(last) = parts.last() {
            if KnowledgeAxis::from_str(last).is_ok() {
                return Ok(NodeKind::Knowledge);
            }
        }
    }

    match parts[0] {
        "CHAPTER" => Ok(NodeKind::Chapter),
        "VERSE" => Ok(NodeKind::Verse),
        "WORD_INSTANCE" => Ok(NodeKind::WordInstance),
        "WORD" => Ok(NodeKind::Word),
        "LEMMA" => Ok(NodeKind::Lemma),
        "ROOT" => Ok(NodeKind::Root),
        "STEM" => Ok(NodeKind::Stem),
        other => Err(NodeIdError::InvalidPrefix(other.to_string())),
    }
}

/// Validate a node ID string end-to-end.
pub fn validate(id: &str) -> Result<()> {
    match node_kind(id)? {
        NodeKind::Chapter => parse_chapter(id).map(|_| ()),
        NodeKind::Verse => parse_verse(id).map(|_| ()),
        NodeKind::WordInstance => parse_word_instance(id).map(|_| ()),
        NodeKind::Word => parse_word(id).map(|_| ()),
        NodeKind::Lemma => parse_lemma(id).map(|_| ()),
        NodeKind::Root => parse_root(id).map(|_| ()),
        NodeKind::Stem => parse_stem(id).map(|_| ()),
        NodeKind::Knowledge => parse_knowledge(id).map(|_| ()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_round_trip() {
        assert_eq!(chapter(1), "CHAPTER:1");
        assert_eq!(parse_chapter("CHAPTER:1").unwrap(), 1);
        assert_eq!(verse(2, 255), "VERSE:2:255");
        assert_eq!(parse_verse("VERSE:2:255").unwrap(), (2, 255));
        assert_eq!(word_instance(2, 255, 3), "WORD_INSTANCE:2:255:3");
        assert_eq!(parse_word_instance("WORD_INSTANCE:2:255:3").unwrap(), (2, 255, 3));
        assert_eq!(word("الله"), "WORD:الله");
        assert_eq!(parse_word("WORD:الله").unwrap(), "الله");
    }

    #[test]
    fn knowledge_round_trip() {
        let id = knowledge("VERSE:1:7", KnowledgeAxis::Memorization);
        assert_eq!(id, "VERSE:1:7:memorization");
        let (base, axis) = parse_knowledge(&id).unwrap();
        assert_eq!(base, "VERSE:1:7");
        assert_eq!(axis, KnowledgeAxis::Memorization);
        assert_eq!(node_kind(&id).unwrap(), NodeKind::Knowledge);
    }

    #[test]
    fn rejects_bad_chapter() {
        assert!(matches!(
            parse_chapter("CHAPTER:0"),
            Err(NodeIdError::InvalidChapter(0))
        ));
        assert!(matches!(
            parse_chapter("CHAPTER:115"),
            Err(NodeIdError::InvalidChapter(115))
        ));
        assert!(parse_chapter("VERSE:1:1").is_err());
    }

    #[test]
    fn rejects_wrong_arity() {
        assert!(validate("CHAPTER").is_err());
        assert!(validate("VERSE:1").is_err());
        assert!(validate("WORD_INSTANCE:1:1").is_err());
        assert!(validate("1:1").is_err());
        assert!(validate("VERSE:1:1:unknown_axis").is_err());
    }

    #[test]
    fn extractors() {
        assert_eq!(
            verse_of_word_instance("WORD_INSTANCE:2:255:3").unwrap(),
            "VERSE:2:255"
        );
        assert_eq!(chapter_of_verse("VERSE:2:255").unwrap(), "CHAPTER:2");
    }
}
