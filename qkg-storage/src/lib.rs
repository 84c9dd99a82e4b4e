pub mod content;
pub mod error;
pub mod schema;

pub use content::{
    build_content_store, ChapterRecord, ContentRecord, ContentStore, LemmaRecord,
    MorphologySegmentRecord, RootRecord, VerseRecord, WordRecord, WordWithTranslations,
};
pub use error::{Result, StorageError};
pub use schema::{create_schema, SCHEMA_VERSION};
