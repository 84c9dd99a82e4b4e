//! End-to-end coverage of a full bundle build: morphology + Quran in,
//! a content store file out, then query it back through `ContentStore`.

use qkg_core::morphology::Corpus;
use qkg_core::quran::{Chapter, RevelationPlace, Verse, Word};
use qkg_core::{node_id, quran::Quran};
use qkg_storage::{build_content_store, ContentStore};
use tempfile::tempdir;

fn two_verse_quran() -> Quran {
    let word = |pos: u32, text: &str| Word {
        position: pos,
        text_uthmani: text.into(),
        text_uthmani_simple: None,
        text_imlaei: None,
        transliteration: None,
        char_type_name: Some("word".into()),
    };
    let fatihah_1 = Verse {
        verse_key: "1:1".into(),
        chapter_number: 1,
        verse_number: 1,
        words: vec![word(1, "بِسْمِ"), word(2, "ٱللَّهِ")],
        juz_number: 1,
        hizb_number: 1,
        rub_number: Some(1),
        manzil_number: Some(1),
        ruku_number: Some(1),
        page_number: 1,
        sajdah: None,
    };
    let baqarah_1 = Verse {
        verse_key: "2:1".into(),
        chapter_number: 2,
        verse_number: 1,
        words: vec![word(1, "الم")],
        juz_number: 1,
        hizb_number: 1,
        rub_number: Some(1),
        manzil_number: Some(1),
        ruku_number: Some(1),
        page_number: 2,
        sajdah: None,
    };
    Quran {
        chapters: vec![
            Chapter {
                number: 1,
                name_arabic: "الفاتحة".into(),
                name_simple: "Al-Fatihah".into(),
                revelation_place: RevelationPlace::Makkah,
                revelation_order: 5,
                bismillah_pre: true,
                verses: vec![fatihah_1],
            },
            Chapter {
                number: 2,
                name_arabic: "البقرة".into(),
                name_simple: "Al-Baqarah".into(),
                revelation_place: RevelationPlace::Madinah,
                revelation_order: 87,
                bismillah_pre: true,
                verses: vec![baqarah_1],
            },
        ],
    }
}

fn sample_morphology() -> Corpus {
    let tsv = "LOCATION\tFORM\tTAG\tFEATURES\n\
        1:1:1:1\tبِسْمِ\tN\tSTEM|LEM:اسم\n\
        1:1:2:1\tٱللَّهِ\tPN\tSTEM|ROOT:اله\n";
    Corpus::parse(tsv.as_bytes()).unwrap()
}

#[test]
fn build_content_store_initializes_schema_and_sample_data() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("content.db");
    build_content_store(&db_path, &two_verse_quran(), &sample_morphology()).unwrap();

    let store = ContentStore::open_readonly(&db_path).unwrap();

    let chapter = store.get_chapter_by_number(1).unwrap();
    assert!(chapter.is_some(), "Al-Fatihah should exist after a build");
    assert_eq!(chapter.unwrap().name_simple, "Al-Fatihah");

    assert!(store.get_verse_by_key("9:9").unwrap().is_none());
}

#[test]
fn content_store_crud_round_trip() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("content.db");
    build_content_store(&db_path, &two_verse_quran(), &sample_morphology()).unwrap();

    let store = ContentStore::open_readonly(&db_path).unwrap();

    let verse = store.get_verse_by_key("1:1").unwrap().unwrap();
    assert_eq!(verse.chapter_node_id, node_id::chapter(1));
    assert_eq!(verse.verse_number, 1);
    assert_eq!(verse.words_count, 2);

    let verses = store.get_verses_for_chapter(2).unwrap();
    assert_eq!(verses.len(), 1);
    assert_eq!(verses[0].verse_key, "2:1");

    let words = store.get_words_for_verse("1:1").unwrap();
    assert_eq!(words.len(), 2);
}

#[test]
fn morphology_and_node_id_lookups_resolve_across_the_store() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("content.db");
    build_content_store(&db_path, &two_verse_quran(), &sample_morphology()).unwrap();

    let store = ContentStore::open_readonly(&db_path).unwrap();

    let segments = store.get_morphology_for_verse("1:1").unwrap();
    assert_eq!(segments.len(), 2);

    let lemma = store.get_lemma_by_arabic("اسم").unwrap();
    assert!(lemma.is_some(), "LEM:اسم segment should have produced a lemma row");

    let root = store.get_root_by_arabic("اله").unwrap();
    assert!(root.is_some(), "ROOT:اله segment should have produced a root row");

    let ids = vec![node_id::chapter(1), node_id::verse(1, 1), node_id::verse(2, 1)];
    let records = store.get_content_for_nodes(&ids).unwrap();
    assert_eq!(records.len(), 3);
}
