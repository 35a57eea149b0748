use crate::error::ArenaError;
use crate::layout::{ControlHeader, CONTROL_HEADER_SIZE, MAGIC, VERSION};
use memmap2::MmapMut;
use std::fs::OpenOptions;
use std::path::Path;

/// A file-backed region mapped by both the collector (creator) and the
/// agent (opener). All cross-component references inside the arena are
/// byte offsets from [`Arena::base_ptr`]; nothing inside it is ever a raw
/// pointer, because pointers from one process's address space are
/// meaningless in another's.
pub struct Arena {
    mmap: MmapMut,
    size: u64,
}

// SAFETY: the mapping is exclusively accessed through `resolve`/`resolve_mut`,
// which hand out byte ranges governed by the same single-writer discipline
// the ring/registry layers already uphold; the `Arena` itself performs no
// unsynchronized mutation of its own.
unsafe impl Send for Arena {}
unsafe impl Sync for Arena {}

impl Arena {
    /// Creates and initializes a new arena file of `size` bytes, writing the
    /// control header before returning. Only the collector calls this.
    pub fn create(path: impl AsRef<Path>, size: u64) -> Result<Self, ArenaError> {
        if size < CONTROL_HEADER_SIZE as u64 {
            return Err(ArenaError::TooSmall { size, min: CONTROL_HEADER_SIZE as u64 });
        }

        let file = OpenOptions::new().read(true).write(true).create(true).truncate(true).open(path)?;
        file.set_len(size)?;

        // SAFETY: `file` was just created/truncated to `size` bytes and is
        // not concurrently mapped elsewhere in this process.
        let mut mmap = unsafe { MmapMut::map_mut(&file)? };

        let registry_offset = CONTROL_HEADER_SIZE as u64;
        let rings_offset = registry_offset; // registry size is determined by the registry crate; rings follow immediately after in this layout.
        let header = ControlHeader::new(size, registry_offset, rings_offset);
        mmap[..CONTROL_HEADER_SIZE].copy_from_slice(&header.to_bytes());
        mmap.flush()?;

        Ok(Self { mmap, size })
    }

    /// Opens an existing arena file, validating its header against the
    /// expected magic, version, and size. Used by the agent side (or, in
    /// this workspace, by any second handle standing in for it).
    pub fn open(path: impl AsRef<Path>, expected_size: u64) -> Result<Self, ArenaError> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        let actual_len = file.metadata()?.len();
        if actual_len != expected_size {
            return Err(ArenaError::SizeMismatch { declared: expected_size, actual: actual_len });
        }

        // SAFETY: the file exists and is sized `expected_size`; no other
        // mapping of it is made concurrently by this process.
        let mmap = unsafe { MmapMut::map_mut(&file)? };

        if mmap.len() < CONTROL_HEADER_SIZE {
            return Err(ArenaError::TooSmall { size: mmap.len() as u64, min: CONTROL_HEADER_SIZE as u64 });
        }

        let mut buf = [0u8; CONTROL_HEADER_SIZE];
        buf.copy_from_slice(&mmap[..CONTROL_HEADER_SIZE]);
        let header = ControlHeader::from_bytes(&buf);

        if header.magic != MAGIC {
            return Err(ArenaError::MagicMismatch { expected: MAGIC, found: header.magic });
        }
        if header.version != VERSION {
            return Err(ArenaError::VersionMismatch { expected: VERSION, found: header.version });
        }
        if header.arena_size != expected_size {
            return Err(ArenaError::SizeMismatch { declared: header.arena_size, actual: expected_size });
        }

        Ok(Self { mmap, size: actual_len })
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn header(&self) -> ControlHeader {
        let mut buf = [0u8; CONTROL_HEADER_SIZE];
        buf.copy_from_slice(&self.mmap[..CONTROL_HEADER_SIZE]);
        ControlHeader::from_bytes(&buf)
    }

    /// Returns an immutable byte range at `offset..offset+len`, bounds-checked
    /// against the arena's size.
    pub fn resolve(&self, offset: u64, len: usize) -> Result<&[u8], ArenaError> {
        self.check_bounds(offset, len)?;
        let start = offset as usize;
        Ok(&self.mmap[start..start + len])
    }

    /// Returns a mutable byte range at `offset..offset+len`, bounds-checked
    /// against the arena's size.
    pub fn resolve_mut(&mut self, offset: u64, len: usize) -> Result<&mut [u8], ArenaError> {
        self.check_bounds(offset, len)?;
        let start = offset as usize;
        Ok(&mut self.mmap[start..start + len])
    }

    /// Returns the offset of a byte range previously handed out by `resolve`,
    /// given its start pointer. Exists so callers that hold a `&[u8]` slice
    /// can recover the offset to store elsewhere in the arena (never the
    /// pointer itself).
    pub fn offset_of(&self, ptr: *const u8) -> Result<u64, ArenaError> {
        let base = self.mmap.as_ptr();
        let offset = (ptr as usize).wrapping_sub(base as usize);
        if offset as u64 >= self.size {
            return Err(ArenaError::OffsetOutOfBounds { offset: offset as u64, size: self.size });
        }
        Ok(offset as u64)
    }

    fn check_bounds(&self, offset: u64, len: usize) -> Result<(), ArenaError> {
        let end = offset.checked_add(len as u64).ok_or(ArenaError::OffsetOutOfBounds { offset, size: self.size })?;
        if end > self.size {
            return Err(ArenaError::OffsetOutOfBounds { offset, size: self.size });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn create_then_open_sees_the_same_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("arena.bin");

        let created = Arena::create(&path, 4096).unwrap();
        assert_eq!(created.header().magic, MAGIC);
        drop(created);

        let opened = Arena::open(&path, 4096).unwrap();
        assert_eq!(opened.header().version, VERSION);
        assert_eq!(opened.header().arena_size, 4096);
    }

    #[test]
    fn open_rejects_size_mismatch() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("arena.bin");
        Arena::create(&path, 4096).unwrap();

        let err = Arena::open(&path, 8192).unwrap_err();
        assert!(matches!(err, ArenaError::SizeMismatch { .. }));
    }

    #[test]
    fn two_handles_over_the_same_file_observe_the_same_counters() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("arena.bin");
        let mut collector = Arena::create(&path, 4096).unwrap();
        let agent = Arena::open(&path, 4096).unwrap();

        let region_offset = CONTROL_HEADER_SIZE as u64;
        collector.resolve_mut(region_offset, 8).unwrap().copy_from_slice(&42u64.to_le_bytes());

        let seen = agent.resolve(region_offset, 8).unwrap();
        assert_eq!(u64::from_le_bytes(seen.try_into().unwrap()), 42);
    }

    #[test]
    fn resolve_rejects_out_of_bounds_offsets() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("arena.bin");
        let arena = Arena::create(&path, 4096).unwrap();
        assert!(arena.resolve(4090, 16).is_err());
    }
}
