//! DDL for the content store (§3.5). Created inside a single transaction
//! with the connection-level pragmas §4.11 requires.

use rusqlite::Connection;

use crate::error::Result;

const SCHEMA_SQL: &str = "
BEGIN;

CREATE TABLE schema_version (
    id      INTEGER PRIMARY KEY CHECK (id = 1),
    version TEXT NOT NULL
);

CREATE TABLE content_packages (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    package_key  TEXT NOT NULL UNIQUE,
    package_type TEXT NOT NULL,
    version      TEXT NOT NULL,
    installed_at INTEGER
);

CREATE TABLE installed_packages (
    package_key  TEXT PRIMARY KEY REFERENCES content_packages(package_key),
    installed_at INTEGER NOT NULL
);

CREATE TABLE chapters (
    node_id          TEXT PRIMARY KEY,
    chapter_number   INTEGER NOT NULL UNIQUE CHECK (chapter_number BETWEEN 1 AND 114),
    name_arabic      TEXT NOT NULL,
    name_simple      TEXT NOT NULL,
    revelation_place TEXT CHECK (revelation_place IN ('makkah', 'madinah') OR revelation_place IS NULL),
    revelation_order INTEGER,
    bismillah_pre    INTEGER NOT NULL,
    verses_count     INTEGER NOT NULL
);

CREATE TABLE verses (
    node_id         TEXT PRIMARY KEY,
    verse_key       TEXT NOT NULL UNIQUE,
    chapter_node_id TEXT NOT NULL REFERENCES chapters(node_id),
    verse_number    INTEGER NOT NULL,
    words_count     INTEGER NOT NULL CHECK (words_count > 0),
    juz_number      INTEGER CHECK (juz_number BETWEEN 1 AND 30 OR juz_number IS NULL),
    hizb_number     INTEGER CHECK (hizb_number BETWEEN 1 AND 60 OR hizb_number IS NULL),
    rub_number      INTEGER,
    manzil_number   INTEGER,
    ruku_number     INTEGER,
    page_number     INTEGER CHECK (page_number BETWEEN 1 AND 604 OR page_number IS NULL),
    sajdah_type     TEXT CHECK (sajdah_type IN ('recommended', 'obligatory') OR sajdah_type IS NULL),
    text_uthmani    TEXT NOT NULL
);

CREATE INDEX idx_verses_chapter ON verses(chapter_node_id);

CREATE TABLE words (
    node_id       TEXT PRIMARY KEY,
    verse_key     TEXT NOT NULL REFERENCES verses(verse_key),
    position      INTEGER NOT NULL,
    text_uthmani  TEXT NOT NULL,
    char_type_name TEXT,
    UNIQUE (verse_key, position)
);

CREATE INDEX idx_words_verse ON words(verse_key);

CREATE TABLE lemmas (
    node_id     TEXT PRIMARY KEY,
    text_arabic TEXT NOT NULL UNIQUE
);

CREATE TABLE roots (
    node_id     TEXT PRIMARY KEY,
    text_arabic TEXT NOT NULL UNIQUE,
    root_type   TEXT CHECK (root_type IN ('triliteral', 'quadriliteral') OR root_type IS NULL)
);

CREATE TABLE stems (
    node_id     TEXT PRIMARY KEY,
    text_arabic TEXT NOT NULL UNIQUE
);

CREATE TABLE morphology_segments (
    id             INTEGER PRIMARY KEY AUTOINCREMENT,
    verse_key      TEXT NOT NULL,
    word_position  INTEGER NOT NULL,
    segment_index  INTEGER NOT NULL,
    segment_type   TEXT NOT NULL,
    pos            TEXT NOT NULL,
    text           TEXT NOT NULL,
    lemma_node_id  TEXT REFERENCES lemmas(node_id),
    root_node_id   TEXT REFERENCES roots(node_id),
    stem_node_id   TEXT REFERENCES stems(node_id),
    UNIQUE (verse_key, word_position, segment_index)
);

CREATE INDEX idx_morphology_word ON morphology_segments(verse_key, word_position);

CREATE TABLE text_variants (
    node_id      TEXT NOT NULL,
    variant_kind TEXT NOT NULL,
    text         TEXT NOT NULL,
    PRIMARY KEY (node_id, variant_kind)
);

CREATE TABLE verse_translations (
    verse_key     TEXT NOT NULL,
    language_code TEXT NOT NULL,
    translation   TEXT NOT NULL,
    PRIMARY KEY (verse_key, language_code)
);

CREATE TABLE word_translations (
    word_node_id  TEXT NOT NULL,
    language_code TEXT NOT NULL,
    translation   TEXT NOT NULL,
    PRIMARY KEY (word_node_id, language_code)
);

CREATE TABLE word_transliterations (
    word_node_id    TEXT PRIMARY KEY,
    transliteration TEXT NOT NULL
);

CREATE TABLE reciters (
    id   INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE
);

CREATE TABLE verse_recitations (
    verse_key  TEXT NOT NULL,
    reciter_id INTEGER NOT NULL REFERENCES reciters(id),
    audio_url  TEXT NOT NULL,
    PRIMARY KEY (verse_key, reciter_id)
);

CREATE TABLE word_audio (
    word_node_id TEXT PRIMARY KEY,
    audio_url    TEXT NOT NULL
);

COMMIT;
";

pub const SCHEMA_VERSION: &str = "1.0.0";

/// Creates the full schema inside a single transaction with the pragmas
/// §4.11 requires. Safe to call once on a freshly created database.
pub fn create_schema(conn: &Connection) -> Result<()> {
    conn.pragma_update(None, "foreign_keys", true)?;
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.execute_batch(SCHEMA_SQL)?;
    conn.execute(
        "INSERT INTO schema_version (id, version) VALUES (1, ?1)",
        [SCHEMA_VERSION],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_all_tables() {
        let conn = Connection::open_in_memory().unwrap();
        create_schema(&conn).unwrap();

        let count: i64 = conn
            .query_row(
                "SELECT version FROM schema_version WHERE id = 1",
                [],
                |row| row.get::<_, String>(0).map(|_| 1),
            )
            .unwrap();
        assert_eq!(count, 1);

        let table_count: i64 = conn
            .query_row(
                "SELECT count(*) FROM sqlite_master WHERE type = 'table'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert!(table_count >= 15);
    }

    #[test]
    fn rejects_out_of_range_chapter_number() {
        let conn = Connection::open_in_memory().unwrap();
        create_schema(&conn).unwrap();
        let result = conn.execute(
            "INSERT INTO chapters (node_id, chapter_number, name_arabic, name_simple, bismillah_pre, verses_count)
             VALUES ('CHAPTER:200', 200, 'x', 'x', 1, 1)",
            [],
        );
        assert!(result.is_err());
    }
}
