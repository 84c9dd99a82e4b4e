//! Loads the offline data bundle (§6.1) into a `qkg_core::quran::Quran`.

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use qkg_core::quran::{Chapter, Quran, RevelationPlace, SajdahInfo, SajdahType, Verse, Word};

#[derive(Debug, Error)]
pub enum BundleError {
    #[error("required bundle file missing: {0}")]
    MissingFile(PathBuf),
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

type Result<T> = std::result::Result<T, BundleError>;

fn load_json_required<T: for<'a> Deserialize<'a>>(path: &Path) -> Result<T> {
    let file = File::open(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            BundleError::MissingFile(path.to_path_buf())
        } else {
            BundleError::Io { path: path.to_path_buf(), source }
        }
    })?;
    serde_json::from_reader(BufReader::new(file))
        .map_err(|source| BundleError::Json { path: path.to_path_buf(), source })
}

fn load_json_optional<T: for<'a> Deserialize<'a>>(path: &Path) -> Result<Option<T>> {
    match File::open(path) {
        Ok(file) => serde_json::from_reader(BufReader::new(file))
            .map(Some)
            .map_err(|source| BundleError::Json { path: path.to_path_buf(), source }),
        Err(source) if source.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(BundleError::Io { path: path.to_path_buf(), source }),
    }
}

#[derive(Debug, Deserialize)]
struct SurahInfoJson {
    surah_name: String,
    #[serde(default)]
    name_arabic: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AyahMetaJson {
    surah_number: u16,
    ayah_number: u32,
    verse_key: String,
}

#[derive(Debug, Deserialize)]
struct WordTextJson {
    text: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SajdahEntry {
    Flag(bool),
    Kind(String),
}

/// Reads `<root>/<rel>` relative to the bundle root.
fn bundle_path(root: &Path, rel: &str) -> PathBuf {
    root.join(rel)
}

/// Loads a flat `verse_key -> u32` metadata map, tolerating either a bare
/// number or a `{"<field>": n}` object per entry (the bundle's optional
/// structural files are not uniform about this).
fn load_verse_number_map(path: &Path) -> Result<HashMap<String, u32>> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Entry {
        Number(u32),
        Wrapped(HashMap<String, u32>),
    }

    let raw: Option<HashMap<String, Entry>> = load_json_optional(path)?;
    let Some(raw) = raw else { return Ok(HashMap::new()) };
    let mut out = HashMap::with_capacity(raw.len());
    for (key, entry) in raw {
        let value = match entry {
            Entry::Number(n) => n,
            Entry::Wrapped(map) => match map.values().next() {
                Some(v) => *v,
                None => continue,
            },
        };
        out.insert(key, value);
    }
    Ok(out)
}

fn load_sajdah_map(path: &Path) -> Result<HashMap<String, SajdahType>> {
    let raw: Option<HashMap<String, SajdahEntry>> = load_json_optional(path)?;
    let Some(raw) = raw else { return Ok(HashMap::new()) };
    let mut out = HashMap::with_capacity(raw.len());
    for (key, entry) in raw {
        let kind = match entry {
            SajdahEntry::Flag(true) => SajdahType::Recommended,
            SajdahEntry::Flag(false) => continue,
            SajdahEntry::Kind(s) if s.eq_ignore_ascii_case("obligatory") => SajdahType::Obligatory,
            SajdahEntry::Kind(_) => SajdahType::Recommended,
        };
        out.insert(key, kind);
    }
    Ok(out)
}

/// Word-by-word text table, keyed by `<verse_key>:<position>`.
struct WbwText(HashMap<String, String>);

impl WbwText {
    fn load_required(path: &Path) -> Result<Self> {
        Ok(Self(load_json_required(path)?))
    }

    fn load_optional(path: &Path) -> Result<Self> {
        let map: Option<HashMap<String, WordTextJson>> = load_json_optional(path)?;
        Ok(Self(map.unwrap_or_default().into_iter().map(|(k, v)| (k, v.text)).collect()))
    }

    fn get(&self, verse_key: &str, position: u32) -> Option<&str> {
        self.0.get(&format!("{verse_key}:{position}")).map(String::as_str)
    }
}

/// Loads the full offline bundle at `bundle_root` into a [`Quran`] (§4.3).
pub fn load_quran(bundle_root: &Path) -> Result<Quran> {
    let structural = bundle_root.join("structural-metadata");
    let text = bundle_root.join("text/wbw");
    let transliteration_path =
        bundle_path(bundle_root, "transliterations/english-wbw-transliteration.json");

    let surah_info: HashMap<String, SurahInfoJson> =
        load_json_required(&structural.join("surah-info-en.json"))?;
    let ayah_meta: HashMap<String, AyahMetaJson> =
        load_json_required(&structural.join("quran-metadata-ayah.json"))?;

    let uthmani = WbwText::load_required(&text.join("uthmani.json"))?;
    let uthmani_simple = WbwText::load_optional(&text.join("uthmani-simple.json"))?;
    let imlaei = WbwText::load_optional(&text.join("imlaei.json"))?;
    let transliteration: HashMap<String, String> =
        load_json_optional(&transliteration_path)?.unwrap_or_default();

    let juz = load_verse_number_map(&structural.join("quran-metadata-juz.json"))?;
    let hizb = load_verse_number_map(&structural.join("quran-metadata-hizb.json"))?;
    let rub = load_verse_number_map(&structural.join("quran-metadata-rub.json"))?;
    let manzil = load_verse_number_map(&structural.join("quran-metadata-manzil.json"))?;
    let ruku = load_verse_number_map(&structural.join("quran-metadata-ruku.json"))?;
    let sajdah = load_sajdah_map(&structural.join("quran-metadata-sajda.json"))?;

    // Group verse metadata by chapter, in verse-number order.
    let mut by_chapter: HashMap<u16, Vec<&AyahMetaJson>> = HashMap::new();
    for meta in ayah_meta.values() {
        by_chapter.entry(meta.surah_number).or_default().push(meta);
    }
    for verses in by_chapter.values_mut() {
        verses.sort_by_key(|v| v.ayah_number);
    }

    let mut chapters = Vec::with_capacity(surah_info.len());
    for surah_num in 1u16..=114 {
        let info = match surah_info.get(&surah_num.to_string()) {
            Some(info) => info,
            None => continue,
        };
        let verse_metas = by_chapter.get(&surah_num).cloned().unwrap_or_default();

        let mut verses = Vec::with_capacity(verse_metas.len());
        for meta in &verse_metas {
            let verse_key = &meta.verse_key;

            let mut words = Vec::new();
            let mut position = 1u32;
            loop {
                let Some(text_uthmani) = uthmani.get(verse_key, position) else { break };
                words.push(Word {
                    position,
                    text_uthmani: text_uthmani.to_string(),
                    text_uthmani_simple: uthmani_simple.get(verse_key, position).map(String::from),
                    text_imlaei: imlaei.get(verse_key, position).map(String::from),
                    transliteration: transliteration
                        .get(&format!("{verse_key}:{position}"))
                        .cloned(),
                    char_type_name: None,
                });
                position += 1;
            }

            verses.push(Verse {
                verse_key: verse_key.clone(),
                chapter_number: surah_num,
                verse_number: meta.ayah_number,
                words,
                // Schema CHECKs require juz in [1,30] and hizb in [1,60];
                // fall back to 1 (as the original loader does) rather than
                // an out-of-range 0 when the optional metadata file for a
                // verse is absent.
                juz_number: juz.get(verse_key).copied().unwrap_or(1) as u8,
                hizb_number: hizb.get(verse_key).copied().unwrap_or(1) as u8,
                rub_number: rub.get(verse_key).copied().map(|n| n as u8),
                manzil_number: manzil.get(verse_key).copied().map(|n| n as u8),
                ruku_number: ruku.get(verse_key).copied().map(|n| n as u16),
                // No per-verse page file is named in the bundle layout; the
                // original loader hardcodes this the same way (page data
                // "would need" a source it never had either).
                page_number: 1,
                sajdah: sajdah.get(verse_key).map(|&sajdah_type| SajdahInfo { sajdah_type }),
            });
        }

        chapters.push(Chapter {
            number: surah_num,
            name_arabic: info.name_arabic.clone().unwrap_or_else(|| info.surah_name.clone()),
            name_simple: info.surah_name.clone(),
            revelation_place: RevelationPlace::Makkah,
            revelation_order: surah_num,
            bismillah_pre: Chapter::default_bismillah_pre(surah_num),
            verses,
        });
    }

    Ok(Quran { chapters })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_json(dir: &Path, rel: &str, value: &serde_json::Value) {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, serde_json::to_vec(value).unwrap()).unwrap();
    }

    fn minimal_bundle(dir: &Path) {
        write_json(
            dir,
            "structural-metadata/surah-info-en.json",
            &serde_json::json!({
                "1": {"surah_name": "Al-Fatihah", "name_arabic": "الفاتحة"}
            }),
        );
        write_json(
            dir,
            "structural-metadata/quran-metadata-ayah.json",
            &serde_json::json!({
                "1": {"surah_number": 1, "ayah_number": 1, "verse_key": "1:1"},
                "2": {"surah_number": 1, "ayah_number": 2, "verse_key": "1:2"}
            }),
        );
        write_json(
            dir,
            "text/wbw/uthmani.json",
            &serde_json::json!({
                "1:1:1": {"text": "بِسْمِ"},
                "1:1:2": {"text": "ٱللَّهِ"},
                "1:2:1": {"text": "ٱلْحَمْدُ"}
            }),
        );
        write_json(
            dir,
            "structural-metadata/quran-metadata-juz.json",
            &serde_json::json!({"1:1": 1, "1:2": 1}),
        );
    }

    #[test]
    fn loads_minimal_bundle_into_quran() {
        let dir = tempfile::tempdir().unwrap();
        minimal_bundle(dir.path());

        let quran = load_quran(dir.path()).unwrap();
        assert_eq!(quran.chapters.len(), 1);
        let chapter = &quran.chapters[0];
        assert_eq!(chapter.number, 1);
        assert_eq!(chapter.name_simple, "Al-Fatihah");
        assert!(chapter.bismillah_pre);
        assert_eq!(chapter.verses.len(), 2);
        assert_eq!(chapter.verses[0].words.len(), 2);
        assert_eq!(chapter.verses[0].words[0].text_uthmani, "بِسْمِ");
        assert_eq!(chapter.verses[1].words.len(), 1);
        assert_eq!(chapter.verses[0].juz_number, 1);
        // ruku has no file in this bundle; absence must not be fatal.
        assert_eq!(chapter.verses[0].ruku_number, None);
    }

    #[test]
    fn missing_required_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        // Only the ayah metadata is present; surah-info is missing.
        write_json(
            dir.path(),
            "structural-metadata/quran-metadata-ayah.json",
            &serde_json::json!({}),
        );
        let err = load_quran(dir.path()).unwrap_err();
        assert!(matches!(err, BundleError::MissingFile(_)));
    }
}
