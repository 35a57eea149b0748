//! Best-effort reader for `index.atf`/`detail.atf`: tolerates a missing or
//! corrupt footer (the writer crashed before it could finalize) by falling
//! back to scanning whole records directly from the events region.

use crate::error::WriteError;
use crate::format::{IndexFileFooter, IndexFileHeader, INDEX_FOOTER_SIZE, INDEX_HEADER_SIZE};
use std::fs;
use std::path::Path;
use tracecore_ring::IndexRecord;

pub struct RecoveredIndex {
    pub header: IndexFileHeader,
    pub records: Vec<IndexRecord>,
    /// `true` if the footer was present and its checksum validated cleanly.
    pub footer_valid: bool,
}

/// Reads an `index.atf` file, recovering as many whole 32-byte records as
/// the file actually contains even if the footer is missing, truncated, or
/// fails its checksum.
pub fn read_index_file(path: &Path) -> Result<RecoveredIndex, WriteError> {
    let bytes = fs::read(path)?;
    if bytes.len() < INDEX_HEADER_SIZE {
        return Err(WriteError::Truncated {
            file: "index.atf",
            expected: INDEX_HEADER_SIZE,
            found: bytes.len(),
        });
    }
    let header = IndexFileHeader::from_bytes(&bytes[..INDEX_HEADER_SIZE])?;

    let events_region_end = bytes.len().saturating_sub(INDEX_FOOTER_SIZE);
    let has_plausible_footer = bytes.len() >= INDEX_HEADER_SIZE + INDEX_FOOTER_SIZE;

    let events_bytes = if has_plausible_footer {
        &bytes[INDEX_HEADER_SIZE..events_region_end]
    } else {
        &bytes[INDEX_HEADER_SIZE..]
    };

    let whole_records = events_bytes.len() / 32;
    let mut records = Vec::with_capacity(whole_records);
    for i in 0..whole_records {
        let chunk: [u8; 32] = events_bytes[i * 32..(i + 1) * 32].try_into().unwrap();
        records.push(IndexRecord::from_bytes(&chunk));
    }

    let footer_valid = has_plausible_footer
        && IndexFileFooter::from_bytes(&bytes[events_region_end..])
            .map(|footer| {
                footer.checksum == crate::format::crc32(&bytes[INDEX_HEADER_SIZE..events_region_end])
                    && footer.event_count as usize == whole_records
            })
            .unwrap_or(false);

    Ok(RecoveredIndex { header, records, footer_valid })
}
