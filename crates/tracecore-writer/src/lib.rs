//! Two-file binary trace format: append-only `index.atf`/`detail.atf` writers,
//! the `manifest.json` sidecar, and a recovery reader tolerant of a missing
//! or corrupt footer.

mod error;
mod format;
mod manifest;
mod recovery;
mod writer;

pub use error::WriteError;
pub use format::{
    crc32, DetailFileFooter, DetailFileHeader, IndexFileFooter, IndexFileHeader, DETAIL_FOOTER_SIZE,
    DETAIL_HEADER_SIZE, DETAIL_MAGIC, INDEX_FOOTER_SIZE, INDEX_HEADER_SIZE, INDEX_MAGIC,
};
pub use manifest::{DropCounters, Manifest, MarkingPolicyManifest, ModuleEntry};
pub use recovery::{read_index_file, RecoveredIndex};
pub use writer::ThreadTraceWriter;
