//! Per-thread append-only trace writer: `Open -> Writing -> Finalizing ->
//! Closed`. One [`ThreadTraceWriter`] owns one thread's `index.atf` and,
//! lazily, its `detail.atf`.

use crate::error::WriteError;
use crate::format::{
    DetailFileFooter, DetailFileHeader, IndexFileFooter, IndexFileHeader, ARCH_CODE,
    DETAIL_HEADER_SIZE, FLAG_HAS_DETAIL, INDEX_HEADER_SIZE,
};
use std::fs::File;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracecore_ring::{DetailSlot, IndexRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriterState {
    Open,
    Writing,
    Finalizing,
    Closed,
}

impl WriterState {
    fn name(self) -> &'static str {
        match self {
            Self::Open => "Open",
            Self::Writing => "Writing",
            Self::Finalizing => "Finalizing",
            Self::Closed => "Closed",
        }
    }
}

struct OpenFile {
    writer: BufWriter<File>,
    checksum: crc32fast::Hasher,
    bytes_written: u64,
}

/// Owns one thread's `index.atf` (always) and `detail.atf` (opened lazily on
/// the first detail record), and the counters their footers need at close.
pub struct ThreadTraceWriter {
    state: WriterState,
    thread_id: u32,
    index_path: PathBuf,
    index_file: OpenFile,
    index_event_count: u32,
    time_start_ns: u64,
    time_end_ns: u64,
    next_index_seq: u64,

    detail_path: PathBuf,
    detail_file: Option<OpenFile>,
    detail_event_count: u64,
    detail_index_seq_start: Option<u64>,
    detail_index_seq_end: u64,
    detail_time_start_ns: u64,
    detail_time_end_ns: u64,

    write_errors: u64,
}

impl ThreadTraceWriter {
    /// Opens `index.atf` in `dir`, writing a placeholder header. The detail
    /// file is created lazily by the first call to [`Self::append_detail`].
    pub fn open(dir: &Path, thread_id: u32) -> Result<Self, WriteError> {
        let index_path = dir.join("index.atf");
        let mut file = File::create(&index_path)?;
        file.write_all(&[0u8; INDEX_HEADER_SIZE])?;
        let mut writer = BufWriter::new(file);
        writer.flush()?;

        Ok(Self {
            state: WriterState::Open,
            thread_id,
            index_path,
            index_file: OpenFile { writer, checksum: crc32fast::Hasher::new(), bytes_written: 0 },
            index_event_count: 0,
            time_start_ns: u64::MAX,
            time_end_ns: 0,
            next_index_seq: 0,
            detail_path: dir.join("detail.atf"),
            detail_file: None,
            detail_event_count: 0,
            detail_index_seq_start: None,
            detail_index_seq_end: 0,
            detail_time_start_ns: u64::MAX,
            detail_time_end_ns: 0,
            write_errors: 0,
        })
    }

    pub fn thread_id(&self) -> u32 {
        self.thread_id
    }

    pub fn write_errors(&self) -> u64 {
        self.write_errors
    }

    fn touch_state_for_write(&mut self) {
        if self.state == WriterState::Open {
            self.state = WriterState::Writing;
        }
    }

    fn track_time(&mut self, ts: u64) {
        self.time_start_ns = self.time_start_ns.min(ts);
        self.time_end_ns = self.time_end_ns.max(ts);
    }

    /// Appends a batch of already-drained index records.
    pub fn append_index(&mut self, records: &[IndexRecord]) -> Result<(), WriteError> {
        if self.state == WriterState::Finalizing || self.state == WriterState::Closed {
            return Err(WriteError::BadState { state: self.state.name(), attempted: "append_index" });
        }
        self.touch_state_for_write();
        for rec in records {
            let bytes = rec.to_bytes();
            if let Err(e) = self.index_file.writer.write_all(&bytes) {
                self.write_errors += 1;
                return Err(e.into());
            }
            self.index_file.checksum.update(&bytes);
            self.index_file.bytes_written += bytes.len() as u64;
            self.index_event_count += 1;
            self.next_index_seq += 1;
            self.track_time(rec.timestamp_ns);
        }
        Ok(())
    }

    fn ensure_detail_file(&mut self) -> Result<&mut OpenFile, WriteError> {
        if self.detail_file.is_none() {
            let mut file = File::create(&self.detail_path)?;
            file.write_all(&[0u8; DETAIL_HEADER_SIZE])?;
            let mut writer = BufWriter::new(file);
            writer.flush()?;
            self.detail_file =
                Some(OpenFile { writer, checksum: crc32fast::Hasher::new(), bytes_written: 0 });
        }
        Ok(self.detail_file.as_mut().unwrap())
    }

    /// Appends a batch of already-drained detail slots.
    pub fn append_detail(&mut self, slots: &[DetailSlot]) -> Result<(), WriteError> {
        if self.state == WriterState::Finalizing || self.state == WriterState::Closed {
            return Err(WriteError::BadState { state: self.state.name(), attempted: "append_detail" });
        }
        self.touch_state_for_write();
        for slot in slots {
            let header_bytes = slot.header.to_bytes();
            let payload = slot.payload();
            let file = self.ensure_detail_file()?;
            if let Err(e) = file.writer.write_all(&header_bytes).and_then(|_| file.writer.write_all(payload))
            {
                self.write_errors += 1;
                return Err(e.into());
            }
            file.checksum.update(&header_bytes);
            file.checksum.update(payload);
            file.bytes_written += (header_bytes.len() + payload.len()) as u64;

            self.detail_event_count += 1;
            self.detail_index_seq_start.get_or_insert(slot.header.index_seq as u64);
            self.detail_index_seq_end = slot.header.index_seq as u64;
            self.detail_time_start_ns = self.detail_time_start_ns.min(slot.header.timestamp_ns);
            self.detail_time_end_ns = self.detail_time_end_ns.max(slot.header.timestamp_ns);
        }
        Ok(())
    }

    /// Finalizes both files: rewrites the real header, appends the footer,
    /// and flushes. Idempotent to call once; a second call returns `BadState`.
    pub fn finalize(&mut self) -> Result<(), WriteError> {
        if self.state == WriterState::Closed {
            return Err(WriteError::BadState { state: self.state.name(), attempted: "finalize" });
        }
        self.state = WriterState::Finalizing;

        let has_detail = self.detail_file.is_some();
        let index_checksum = self.index_file.checksum.clone().finalize();
        let index_footer_offset = INDEX_HEADER_SIZE as u64 + self.index_file.bytes_written;

        let header = IndexFileHeader {
            os: 1,
            arch: ARCH_CODE,
            flags: if has_detail { FLAG_HAS_DETAIL } else { 0 },
            thread_id: self.thread_id,
            clock_type: 1,
            event_count: self.index_event_count,
            footer_offset: index_footer_offset,
            time_start_ns: if self.time_start_ns == u64::MAX { 0 } else { self.time_start_ns },
            time_end_ns: self.time_end_ns,
        };
        let footer = IndexFileFooter {
            checksum: index_checksum,
            event_count: self.index_event_count as u64,
            time_start_ns: header.time_start_ns,
            time_end_ns: header.time_end_ns,
            bytes_written: self.index_file.bytes_written,
        };

        self.index_file.writer.write_all(&footer.to_bytes())?;
        self.index_file.writer.flush()?;
        self.index_file.writer.get_mut().seek(SeekFrom::Start(0))?;
        self.index_file.writer.get_mut().write_all(&header.to_bytes())?;
        self.index_file.writer.get_mut().sync_all()?;

        if let Some(detail) = self.detail_file.as_mut() {
            let checksum = detail.checksum.clone().finalize();
            let header = DetailFileHeader {
                os: 1,
                arch: ARCH_CODE,
                flags: 0,
                thread_id: self.thread_id,
                event_count: self.detail_event_count,
                bytes_length: detail.bytes_written,
                index_seq_start: self.detail_index_seq_start.unwrap_or(0),
                index_seq_end: self.detail_index_seq_end,
            };
            let footer = DetailFileFooter {
                checksum,
                event_count: self.detail_event_count,
                bytes_length: detail.bytes_written,
                time_start_ns: if self.detail_time_start_ns == u64::MAX {
                    0
                } else {
                    self.detail_time_start_ns
                },
                time_end_ns: self.detail_time_end_ns,
            };
            detail.writer.write_all(&footer.to_bytes())?;
            detail.writer.flush()?;
            detail.writer.get_mut().seek(SeekFrom::Start(0))?;
            detail.writer.get_mut().write_all(&header.to_bytes())?;
            detail.writer.get_mut().sync_all()?;
        }

        self.state = WriterState::Closed;
        Ok(())
    }

    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    pub fn detail_path_if_opened(&self) -> Option<&Path> {
        self.detail_file.as_ref().map(|_| self.detail_path.as_path())
    }
}

impl Drop for ThreadTraceWriter {
    fn drop(&mut self) {
        if self.state != WriterState::Closed {
            if let Err(err) = self.finalize() {
                tracing::warn!(thread_id = self.thread_id, %err, "failed to finalize trace writer on drop");
            }
        }
    }
}
