//! C11: the content store builder and indexed read API. Populates the
//! schema of [`crate::schema`] in dependency order and exposes the
//! parameterized query surface §4.11 names. The database holds text,
//! translations, and audio references only — never graph structure or
//! scores, which live exclusively in the C10 export (§9: content/structure
//! separation).

use std::collections::HashMap;
use std::path::Path;

use qkg_core::morphology::Corpus;
use qkg_core::node_id::{self, NodeKind};
use qkg_core::quran::Quran;
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{Result, StorageError};
use crate::schema::create_schema;

/// Builds a fresh content database at `path`, populating chapters, verses,
/// words, lemmas, roots, and morphology segments in that dependency order,
/// then finalizes with `VACUUM; ANALYZE` (§4.11).
pub fn build_content_store(path: &Path, quran: &Quran, morphology: &Corpus) -> Result<()> {
    if path.exists() {
        std::fs::remove_file(path)?;
    }
    let mut conn = Connection::open(path)?;
    create_schema(&conn)?;

    let tx = conn.transaction()?;
    populate_chapters(&tx, quran)?;
    populate_verses(&tx, quran)?;
    populate_words(&tx, quran)?;
    let (lemma_ids, root_ids) = populate_lemmas_and_roots(&tx, morphology)?;
    populate_morphology_segments(&tx, morphology, &lemma_ids, &root_ids)?;
    populate_flexible(&tx, quran)?;
    tx.commit()?;

    conn.execute_batch("VACUUM; ANALYZE;")?;
    tracing::info!("content store built at {:?}", path);
    Ok(())
}

fn populate_chapters(conn: &Connection, quran: &Quran) -> Result<()> {
    let mut stmt = conn.prepare(
        "INSERT INTO chapters
            (node_id, chapter_number, name_arabic, name_simple, revelation_place,
             revelation_order, bismillah_pre, verses_count)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    )?;
    for chapter in &quran.chapters {
        let node_id = node_id::chapter(chapter.number);
        let revelation_place = match chapter.revelation_place {
            qkg_core::quran::RevelationPlace::Makkah => "makkah",
            qkg_core::quran::RevelationPlace::Madinah => "madinah",
        };
        stmt.execute(params![
            node_id,
            chapter.number,
            chapter.name_arabic,
            chapter.name_simple,
            revelation_place,
            chapter.revelation_order,
            chapter.bismillah_pre,
            chapter.verses.len() as i64,
        ])?;
    }
    tracing::debug!(count = quran.chapters.len(), "inserted chapters");
    Ok(())
}

fn populate_verses(conn: &Connection, quran: &Quran) -> Result<()> {
    let mut stmt = conn.prepare(
        "INSERT INTO verses
            (node_id, verse_key, chapter_node_id, verse_number, words_count,
             juz_number, hizb_number, rub_number, manzil_number, ruku_number,
             page_number, sajdah_type, text_uthmani)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
    )?;
    let mut count = 0;
    for chapter in &quran.chapters {
        let chapter_node_id = node_id::chapter(chapter.number);
        for verse in &chapter.verses {
            let node_id = node_id::verse(chapter.number, verse.verse_number);
            let words_count = verse.content_words().count() as i64;
            if words_count == 0 {
                return Err(StorageError::ConstraintViolation(format!(
                    "verse {} has zero content words",
                    verse.verse_key
                )));
            }
            let sajdah_type = verse.sajdah.as_ref().map(|s| match s.sajdah_type {
                qkg_core::quran::SajdahType::Recommended => "recommended",
                qkg_core::quran::SajdahType::Obligatory => "obligatory",
            });
            stmt.execute(params![
                node_id,
                verse.verse_key,
                chapter_node_id,
                verse.verse_number,
                words_count,
                verse.juz_number,
                verse.hizb_number,
                verse.rub_number,
                verse.manzil_number,
                verse.ruku_number,
                verse.page_number,
                sajdah_type,
                verse.joined_text_uthmani(),
            ])?;
            count += 1;
        }
    }
    tracing::debug!(count, "inserted verses");
    Ok(())
}

fn populate_words(conn: &Connection, quran: &Quran) -> Result<()> {
    let mut stmt = conn.prepare(
        "INSERT INTO words (node_id, verse_key, position, text_uthmani, char_type_name)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )?;
    let mut count = 0;
    for chapter in &quran.chapters {
        for verse in &chapter.verses {
            for word in verse.content_words() {
                let node_id = node_id::word_instance(chapter.number, verse.verse_number, word.position);
                stmt.execute(params![
                    node_id,
                    verse.verse_key,
                    word.position,
                    word.text_uthmani,
                    word.char_type_name,
                ])?;
                count += 1;
            }
        }
    }
    tracing::debug!(count, "inserted words");
    Ok(())
}

/// Last stage of the dependency order (§4.11's "optional flexible
/// packages"): whatever alternate text renderings and transliterations the
/// loader already carried on each `Word` get written into `text_variants`
/// and `word_transliterations`. A bundle that never populated these fields
/// leaves the tables empty, which is a valid content store, not an error.
fn populate_flexible(conn: &Connection, quran: &Quran) -> Result<()> {
    let mut variant_stmt = conn.prepare(
        "INSERT INTO text_variants (node_id, variant_kind, text) VALUES (?1, ?2, ?3)",
    )?;
    let mut translit_stmt = conn.prepare(
        "INSERT INTO word_transliterations (word_node_id, transliteration) VALUES (?1, ?2)",
    )?;
    let mut variant_count = 0;
    let mut translit_count = 0;
    for chapter in &quran.chapters {
        for verse in &chapter.verses {
            for word in verse.content_words() {
                let node_id = node_id::word_instance(chapter.number, verse.verse_number, word.position);
                if let Some(simple) = &word.text_uthmani_simple {
                    variant_stmt.execute(params![node_id, "uthmani_simple", simple])?;
                    variant_count += 1;
                }
                if let Some(imlaei) = &word.text_imlaei {
                    variant_stmt.execute(params![node_id, "imlaei", imlaei])?;
                    variant_count += 1;
                }
                if let Some(transliteration) = &word.transliteration {
                    translit_stmt.execute(params![node_id, transliteration])?;
                    translit_count += 1;
                }
            }
        }
    }
    tracing::debug!(variant_count, translit_count, "inserted flexible content");
    Ok(())
}

/// Inserts every distinct lemma/root referenced by a morphology segment and
/// returns the sets of arabic tokens actually inserted, for the morphology
/// segment pass that follows.
fn populate_lemmas_and_roots(
    conn: &Connection,
    morphology: &Corpus,
) -> Result<(std::collections::HashSet<String>, std::collections::HashSet<String>)> {
    let mut lemma_set = std::collections::HashSet::new();
    let mut root_set = std::collections::HashSet::new();
    for segment in morphology.iter() {
        if !segment.lemma.is_empty() {
            lemma_set.insert(segment.lemma.clone());
        }
        if !segment.root.is_empty() {
            root_set.insert(segment.root.clone());
        }
    }

    let mut lemma_stmt = conn.prepare("INSERT INTO lemmas (node_id, text_arabic) VALUES (?1, ?2)")?;
    for lemma in &lemma_set {
        lemma_stmt.execute(params![node_id::lemma(lemma), lemma])?;
    }

    let mut root_stmt = conn.prepare("INSERT INTO roots (node_id, text_arabic) VALUES (?1, ?2)")?;
    for root in &root_set {
        root_stmt.execute(params![node_id::root(root), root])?;
    }

    tracing::debug!(lemmas = lemma_set.len(), roots = root_set.len(), "inserted lemmas and roots");
    Ok((lemma_set, root_set))
}

fn populate_morphology_segments(
    conn: &Connection,
    morphology: &Corpus,
    lemma_ids: &std::collections::HashSet<String>,
    root_ids: &std::collections::HashSet<String>,
) -> Result<()> {
    let mut stmt = conn.prepare(
        "INSERT INTO morphology_segments
            (verse_key, word_position, segment_index, segment_type, pos, text,
             lemma_node_id, root_node_id, stem_node_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, NULL)",
    )?;
    let mut count = 0;
    for segment in morphology.iter() {
        let verse_key = format!("{}:{}", segment.location.chapter, segment.location.verse);
        let segment_type = segment_type_str(segment.segment_type);
        let pos = pos_str(segment.pos);
        let lemma_node_id = (!segment.lemma.is_empty() && lemma_ids.contains(&segment.lemma))
            .then(|| node_id::lemma(&segment.lemma));
        let root_node_id = (!segment.root.is_empty() && root_ids.contains(&segment.root))
            .then(|| node_id::root(&segment.root));
        stmt.execute(params![
            verse_key,
            segment.location.word,
            segment.location.segment,
            segment_type,
            pos,
            segment.text,
            lemma_node_id,
            root_node_id,
        ])?;
        count += 1;
    }
    tracing::debug!(count, "inserted morphology segments");
    Ok(())
}

fn segment_type_str(t: qkg_core::morphology::SegmentType) -> &'static str {
    use qkg_core::morphology::SegmentType::*;
    match t {
        Prefix => "PREFIX",
        Suffix => "SUFFIX",
        Root => "ROOT",
        Lemma => "LEMMA",
        Pronoun => "PRONOUN",
        Inlaid => "INLAID",
        Unknown => "UNKNOWN",
    }
}

fn pos_str(p: qkg_core::morphology::Pos) -> &'static str {
    use qkg_core::morphology::Pos::*;
    match p {
        Noun => "NOUN",
        Verb => "VERB",
        Adjective => "ADJECTIVE",
        Adverb => "ADVERB",
        Particle => "PARTICLE",
        Pronoun => "PRONOUN",
        Preposition => "PREPOSITION",
        Conjunction => "CONJUNCTION",
        Interjection => "INTERJECTION",
        Unknown => "UNKNOWN",
    }
}

// ============================================================================
// Query API
// ============================================================================

#[derive(Debug, Clone)]
pub struct ChapterRecord {
    pub node_id: String,
    pub chapter_number: u16,
    pub name_arabic: String,
    pub name_simple: String,
    pub revelation_place: Option<String>,
    pub revelation_order: Option<u16>,
    pub bismillah_pre: bool,
    pub verses_count: i64,
}

#[derive(Debug, Clone)]
pub struct VerseRecord {
    pub node_id: String,
    pub verse_key: String,
    pub chapter_node_id: String,
    pub verse_number: u32,
    pub words_count: i64,
    pub juz_number: Option<u8>,
    pub hizb_number: Option<u8>,
    pub rub_number: Option<u8>,
    pub manzil_number: Option<u8>,
    pub ruku_number: Option<u16>,
    pub page_number: Option<u16>,
    pub sajdah_type: Option<String>,
    pub text_uthmani: String,
}

#[derive(Debug, Clone)]
pub struct WordRecord {
    pub node_id: String,
    pub verse_key: String,
    pub position: u32,
    pub text_uthmani: String,
    pub char_type_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct WordWithTranslations {
    pub word: WordRecord,
    pub translations: HashMap<String, String>,
    pub transliteration: Option<String>,
}

#[derive(Debug, Clone)]
pub struct MorphologySegmentRecord {
    pub verse_key: String,
    pub word_position: u32,
    pub segment_index: u32,
    pub segment_type: String,
    pub pos: String,
    pub text: String,
    pub lemma_node_id: Option<String>,
    pub root_node_id: Option<String>,
    pub stem_node_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LemmaRecord {
    pub node_id: String,
    pub text_arabic: String,
}

#[derive(Debug, Clone)]
pub struct RootRecord {
    pub node_id: String,
    pub text_arabic: String,
    pub root_type: Option<String>,
}

#[derive(Debug, Clone)]
pub enum ContentRecord {
    Chapter(ChapterRecord),
    Verse(VerseRecord),
    Word(WordRecord),
    Lemma(LemmaRecord),
    Root(RootRecord),
}

fn row_to_chapter(row: &rusqlite::Row) -> rusqlite::Result<ChapterRecord> {
    Ok(ChapterRecord {
        node_id: row.get("node_id")?,
        chapter_number: row.get("chapter_number")?,
        name_arabic: row.get("name_arabic")?,
        name_simple: row.get("name_simple")?,
        revelation_place: row.get("revelation_place")?,
        revelation_order: row.get("revelation_order")?,
        bismillah_pre: row.get("bismillah_pre")?,
        verses_count: row.get("verses_count")?,
    })
}

fn row_to_verse(row: &rusqlite::Row) -> rusqlite::Result<VerseRecord> {
    Ok(VerseRecord {
        node_id: row.get("node_id")?,
        verse_key: row.get("verse_key")?,
        chapter_node_id: row.get("chapter_node_id")?,
        verse_number: row.get("verse_number")?,
        words_count: row.get("words_count")?,
        juz_number: row.get("juz_number")?,
        hizb_number: row.get("hizb_number")?,
        rub_number: row.get("rub_number")?,
        manzil_number: row.get("manzil_number")?,
        ruku_number: row.get("ruku_number")?,
        page_number: row.get("page_number")?,
        sajdah_type: row.get("sajdah_type")?,
        text_uthmani: row.get("text_uthmani")?,
    })
}

fn row_to_word(row: &rusqlite::Row) -> rusqlite::Result<WordRecord> {
    Ok(WordRecord {
        node_id: row.get("node_id")?,
        verse_key: row.get("verse_key")?,
        position: row.get("position")?,
        text_uthmani: row.get("text_uthmani")?,
        char_type_name: row.get("char_type_name")?,
    })
}

fn row_to_lemma(row: &rusqlite::Row) -> rusqlite::Result<LemmaRecord> {
    Ok(LemmaRecord {
        node_id: row.get("node_id")?,
        text_arabic: row.get("text_arabic")?,
    })
}

fn row_to_root(row: &rusqlite::Row) -> rusqlite::Result<RootRecord> {
    Ok(RootRecord {
        node_id: row.get("node_id")?,
        text_arabic: row.get("text_arabic")?,
        root_type: row.get("root_type")?,
    })
}

fn row_to_morphology(row: &rusqlite::Row) -> rusqlite::Result<MorphologySegmentRecord> {
    Ok(MorphologySegmentRecord {
        verse_key: row.get("verse_key")?,
        word_position: row.get("word_position")?,
        segment_index: row.get("segment_index")?,
        segment_type: row.get("segment_type")?,
        pos: row.get("pos")?,
        text: row.get("text")?,
        lemma_node_id: row.get("lemma_node_id")?,
        root_node_id: row.get("root_node_id")?,
        stem_node_id: row.get("stem_node_id")?,
    })
}

/// Read-only query handle over a built content store. All lookups are
/// parameterized and hit an index (§3.5); missing rows return `None`, never
/// an error.
pub struct ContentStore {
    conn: Connection,
}

impl ContentStore {
    /// Opens `path` read-only; `PRAGMA query_only = true` as §5 recommends
    /// for a store shared across query threads.
    pub fn open_readonly(path: &Path) -> Result<Self> {
        let conn = Connection::open_with_flags(path, rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY)?;
        conn.pragma_update(None, "query_only", true)?;
        Ok(Self { conn })
    }

    pub fn get_chapter(&self, node_id: &str) -> Result<Option<ChapterRecord>> {
        self.conn
            .query_row("SELECT * FROM chapters WHERE node_id = ?1", [node_id], row_to_chapter)
            .optional()
            .map_err(Into::into)
    }

    pub fn get_chapter_by_number(&self, n: u16) -> Result<Option<ChapterRecord>> {
        self.conn
            .query_row("SELECT * FROM chapters WHERE chapter_number = ?1", [n], row_to_chapter)
            .optional()
            .map_err(Into::into)
    }

    pub fn get_verse(&self, node_id: &str) -> Result<Option<VerseRecord>> {
        self.conn
            .query_row("SELECT * FROM verses WHERE node_id = ?1", [node_id], row_to_verse)
            .optional()
            .map_err(Into::into)
    }

    pub fn get_verse_by_key(&self, key: &str) -> Result<Option<VerseRecord>> {
        self.conn
            .query_row("SELECT * FROM verses WHERE verse_key = ?1", [key], row_to_verse)
            .optional()
            .map_err(Into::into)
    }

    pub fn get_verses_for_chapter(&self, n: u16) -> Result<Vec<VerseRecord>> {
        let chapter_node_id = node_id::chapter(n);
        let mut stmt = self.conn.prepare(
            "SELECT * FROM verses WHERE chapter_node_id = ?1 ORDER BY verse_number",
        )?;
        let rows = stmt
            .query_map([chapter_node_id], row_to_verse)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn get_word(&self, node_id: &str) -> Result<Option<WordRecord>> {
        self.conn
            .query_row("SELECT * FROM words WHERE node_id = ?1", [node_id], row_to_word)
            .optional()
            .map_err(Into::into)
    }

    pub fn get_words_for_verse(&self, verse_key: &str) -> Result<Vec<WordRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT * FROM words WHERE verse_key = ?1 ORDER BY position",
        )?;
        let rows = stmt
            .query_map([verse_key], row_to_word)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn get_word_with_translations(&self, node_id: &str) -> Result<Option<WordWithTranslations>> {
        let Some(word) = self.get_word(node_id)? else {
            return Ok(None);
        };
        let mut stmt = self.conn.prepare(
            "SELECT language_code, translation FROM word_translations WHERE word_node_id = ?1",
        )?;
        let translations = stmt
            .query_map([node_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<rusqlite::Result<HashMap<_, _>>>()?;
        let transliteration = self
            .conn
            .query_row(
                "SELECT transliteration FROM word_transliterations WHERE word_node_id = ?1",
                [node_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(Some(WordWithTranslations {
            word,
            translations,
            transliteration,
        }))
    }

    pub fn get_morphology_for_word(&self, verse_key: &str, position: u32) -> Result<Vec<MorphologySegmentRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT * FROM morphology_segments WHERE verse_key = ?1 AND word_position = ?2 ORDER BY segment_index",
        )?;
        let rows = stmt
            .query_map(params![verse_key, position], row_to_morphology)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn get_morphology_for_verse(&self, verse_key: &str) -> Result<Vec<MorphologySegmentRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT * FROM morphology_segments WHERE verse_key = ?1 ORDER BY word_position, segment_index",
        )?;
        let rows = stmt
            .query_map([verse_key], row_to_morphology)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn get_lemma(&self, node_id: &str) -> Result<Option<LemmaRecord>> {
        self.conn
            .query_row("SELECT * FROM lemmas WHERE node_id = ?1", [node_id], row_to_lemma)
            .optional()
            .map_err(Into::into)
    }

    pub fn get_lemma_by_arabic(&self, text: &str) -> Result<Option<LemmaRecord>> {
        self.conn
            .query_row("SELECT * FROM lemmas WHERE text_arabic = ?1", [text], row_to_lemma)
            .optional()
            .map_err(Into::into)
    }

    pub fn get_root(&self, node_id: &str) -> Result<Option<RootRecord>> {
        self.conn
            .query_row("SELECT * FROM roots WHERE node_id = ?1", [node_id], row_to_root)
            .optional()
            .map_err(Into::into)
    }

    pub fn get_root_by_arabic(&self, text: &str) -> Result<Option<RootRecord>> {
        self.conn
            .query_row("SELECT * FROM roots WHERE text_arabic = ?1", [text], row_to_root)
            .optional()
            .map_err(Into::into)
    }

    /// Groups `ids` by their node kind and issues one `IN`-query per kind,
    /// rather than one roundtrip per id.
    pub fn get_content_for_nodes(&self, ids: &[String]) -> Result<Vec<ContentRecord>> {
        let mut by_kind: HashMap<NodeKind, Vec<&str>> = HashMap::new();
        for id in ids {
            if let Ok(kind) = node_id::node_kind(id) {
                by_kind.entry(kind).or_default().push(id.as_str());
            }
        }

        let mut out = Vec::new();
        for (kind, kind_ids) in by_kind {
            let placeholders = kind_ids.iter().map(|_| "?").collect::<Vec<_>>().join(",");
            match kind {
                NodeKind::Chapter => {
                    let sql = format!("SELECT * FROM chapters WHERE node_id IN ({})", placeholders);
                    let mut stmt = self.conn.prepare(&sql)?;
                    let rows = stmt.query_map(rusqlite::params_from_iter(kind_ids), row_to_chapter)?;
                    for row in rows {
                        out.push(ContentRecord::Chapter(row?));
                    }
                }
                NodeKind::Verse => {
                    let sql = format!("SELECT * FROM verses WHERE node_id IN ({})", placeholders);
                    let mut stmt = self.conn.prepare(&sql)?;
                    let rows = stmt.query_map(rusqlite::params_from_iter(kind_ids), row_to_verse)?;
                    for row in rows {
                        out.push(ContentRecord::Verse(row?));
                    }
                }
                NodeKind::WordInstance => {
                    let sql = format!("SELECT * FROM words WHERE node_id IN ({})", placeholders);
                    let mut stmt = self.conn.prepare(&sql)?;
                    let rows = stmt.query_map(rusqlite::params_from_iter(kind_ids), row_to_word)?;
                    for row in rows {
                        out.push(ContentRecord::Word(row?));
                    }
                }
                NodeKind::Lemma => {
                    let sql = format!("SELECT * FROM lemmas WHERE node_id IN ({})", placeholders);
                    let mut stmt = self.conn.prepare(&sql)?;
                    let rows = stmt.query_map(rusqlite::params_from_iter(kind_ids), row_to_lemma)?;
                    for row in rows {
                        out.push(ContentRecord::Lemma(row?));
                    }
                }
                NodeKind::Root => {
                    let sql = format!("SELECT * FROM roots WHERE node_id IN ({})", placeholders);
                    let mut stmt = self.conn.prepare(&sql)?;
                    let rows = stmt.query_map(rusqlite::params_from_iter(kind_ids), row_to_root)?;
                    for row in rows {
                        out.push(ContentRecord::Root(row?));
                    }
                }
                NodeKind::Word | NodeKind::Stem | NodeKind::Knowledge => {
                    // Word (type) and stem carry no content rows of their own yet;
                    // knowledge sub-nodes live only in the graph export (C10).
                }
            }
        }
        Ok(out)
    }
}
