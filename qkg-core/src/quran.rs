//! The Quran aggregate: a plain ownership hierarchy over chapters, verses,
//! and words. No I/O lives here — `qkg-gen`'s bundle loader is responsible
//! for materializing one of these from the offline data bundle.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RevelationPlace {
    Makkah,
    Madinah,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SajdahType {
    Recommended,
    Obligatory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SajdahInfo {
    pub sajdah_type: SajdahType,
}

/// A single word within a verse.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Word {
    /// 1-based position within the verse.
    pub position: u32,
    pub text_uthmani: String,
    pub text_uthmani_simple: Option<String>,
    pub text_imlaei: Option<String>,
    pub transliteration: Option<String>,
    /// `"end"` marks a terminator glyph (ayah-end ornament), not a word.
    pub char_type_name: Option<String>,
}

impl Word {
    pub fn is_end_word(&self) -> bool {
        self.char_type_name.as_deref() == Some("end")
    }
}

/// An ayah. Owns its words exclusively.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verse {
    /// `"<chapter>:<verse>"`.
    pub verse_key: String,
    pub chapter_number: u16,
    pub verse_number: u32,
    pub words: Vec<Word>,
    pub juz_number: u8,
    pub hizb_number: u8,
    pub rub_number: Option<u8>,
    pub manzil_number: Option<u8>,
    pub ruku_number: Option<u16>,
    pub page_number: u16,
    pub sajdah: Option<SajdahInfo>,
}

impl Verse {
    /// Non-end words, in position order. Dependency/knowledge graph
    /// builders operate on this view exclusively.
    pub fn content_words(&self) -> impl Iterator<Item = &Word> {
        self.words.iter().filter(|w| !w.is_end_word())
    }

    /// Reconstructs the verse's text by joining word surface forms with a
    /// single space — never inventing whitespace or diacritics not present
    /// in the source.
    pub fn joined_text_uthmani(&self) -> String {
        self.content_words()
            .map(|w| w.text_uthmani.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// A surah. Owns its verses exclusively.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chapter {
    pub number: u16,
    pub name_arabic: String,
    pub name_simple: String,
    pub revelation_place: RevelationPlace,
    pub revelation_order: u16,
    /// True for every chapter except chapter 9, by default.
    pub bismillah_pre: bool,
    pub verses: Vec<Verse>,
}

impl Chapter {
    pub fn default_bismillah_pre(number: u16) -> bool {
        number != 9
    }
}

/// The full Quran. Owns its chapters exclusively; there are no cycles in
/// this hierarchy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Quran {
    pub chapters: Vec<Chapter>,
}

impl Quran {
    pub fn is_complete(&self) -> bool {
        self.chapters.len() == 114
    }

    pub fn chapter(&self, number: u16) -> Option<&Chapter> {
        self.chapters.iter().find(|c| c.number == number)
    }

    pub fn verse(&self, chapter: u16, verse: u32) -> Option<&Verse> {
        self.chapter(chapter)?
            .verses
            .iter()
            .find(|v| v.verse_number == verse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bismillah_default_excludes_chapter_nine() {
        assert!(Chapter::default_bismillah_pre(1));
        assert!(!Chapter::default_bismillah_pre(9));
        assert!(Chapter::default_bismillah_pre(114));
    }

    #[test]
    fn end_word_detection() {
        let end = Word {
            position: 8,
            text_uthmani: "۝".into(),
            text_uthmani_simple: None,
            text_imlaei: None,
            transliteration: None,
            char_type_name: Some("end".into()),
        };
        assert!(end.is_end_word());

        let w = Word {
            position: 1,
            text_uthmani: "بِسْمِ".into(),
            text_uthmani_simple: None,
            text_imlaei: None,
            transliteration: None,
            char_type_name: Some("word".into()),
        };
        assert!(!w.is_end_word());
    }

    #[test]
    fn verse_text_joins_content_words_only() {
        let verse = Verse {
            verse_key: "1:1".into(),
            chapter_number: 1,
            verse_number: 1,
            words: vec![
                Word {
                    position: 1,
                    text_uthmani: "بِسْمِ".into(),
                    text_uthmani_simple: None,
                    text_imlaei: None,
                    transliteration: None,
                    char_type_name: Some("word".into()),
                },
                Word {
                    position: 2,
                    text_uthmani: "ٱللَّهِ".into(),
                    text_uthmani_simple: None,
                    text_imlaei: None,
                    transliteration: None,
                    char_type_name: Some("word".into()),
                },
                Word {
                    position: 3,
                    text_uthmani: "۝".into(),
                    text_uthmani_simple: None,
                    text_imlaei: None,
                    transliteration: None,
                    char_type_name: Some("end".into()),
                },
            ],
            juz_number: 1,
            hizb_number: 1,
            rub_number: None,
            manzil_number: None,
            ruku_number: None,
            page_number: 1,
            sajdah: None,
        };
        assert_eq!(verse.joined_text_uthmani(), "بِسْمِ ٱللَّهِ");
        assert_eq!(verse.content_words().count(), 2);
    }
}
