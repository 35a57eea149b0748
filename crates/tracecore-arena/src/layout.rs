/// Arena magic, `b"ATFD"` read as a little-endian `u32`.
pub const MAGIC: u32 = u32::from_le_bytes(*b"ATFD");

/// Arena layout version. Bumped whenever `ControlHeader`'s field order or
/// meaning changes.
pub const VERSION: u32 = 2;

/// Fixed header at offset 0 of every arena mapping. Every other region in
/// the arena (the registry, the per-lane ring storage) is addressed as a
/// byte offset from the arena base, recorded here by the creator before any
/// producer is allowed to attach.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ControlHeader {
    pub magic: u32,
    pub version: u32,
    pub arena_size: u64,
    pub registry_offset: u64,
    pub rings_offset: u64,
    pub flags: u64,
}

pub const CONTROL_HEADER_SIZE: usize = std::mem::size_of::<ControlHeader>();

const _: () = assert!(CONTROL_HEADER_SIZE == 40);

impl ControlHeader {
    pub fn new(arena_size: u64, registry_offset: u64, rings_offset: u64) -> Self {
        Self {
            magic: MAGIC,
            version: VERSION,
            arena_size,
            registry_offset,
            rings_offset,
            flags: 0,
        }
    }

    pub fn to_bytes(&self) -> [u8; CONTROL_HEADER_SIZE] {
        let mut buf = [0u8; CONTROL_HEADER_SIZE];
        buf[0..4].copy_from_slice(&self.magic.to_le_bytes());
        buf[4..8].copy_from_slice(&self.version.to_le_bytes());
        buf[8..16].copy_from_slice(&self.arena_size.to_le_bytes());
        buf[16..24].copy_from_slice(&self.registry_offset.to_le_bytes());
        buf[24..32].copy_from_slice(&self.rings_offset.to_le_bytes());
        buf[32..40].copy_from_slice(&self.flags.to_le_bytes());
        buf
    }

    pub fn from_bytes(buf: &[u8; CONTROL_HEADER_SIZE]) -> Self {
        Self {
            magic: u32::from_le_bytes(buf[0..4].try_into().unwrap()),
            version: u32::from_le_bytes(buf[4..8].try_into().unwrap()),
            arena_size: u64::from_le_bytes(buf[8..16].try_into().unwrap()),
            registry_offset: u64::from_le_bytes(buf[16..24].try_into().unwrap()),
            rings_offset: u64::from_le_bytes(buf[24..32].try_into().unwrap()),
            flags: u64::from_le_bytes(buf[32..40].try_into().unwrap()),
        }
    }
}
