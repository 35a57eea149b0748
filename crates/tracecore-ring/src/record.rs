//! Fixed-layout records carried by rings, and their on-disk counterparts.

/// Upper bound on the shallow stack/register snapshot carried by a detail
/// record. Matches the configuration ceiling (`stack_bytes <= 512`); the
/// in-memory slot is always allocated at this size so the detail ring keeps
/// the "fixed-size record" contract even though `total_length` varies.
pub const MAX_STACK_BYTES: usize = 512;

/// Sentinel stored in [`IndexRecord::detail_seq`] when no detail record is paired.
pub const DETAIL_SEQ_NONE: u32 = u32::MAX;

/// Kind of call-graph event an [`IndexRecord`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum EventKind {
    Call = 1,
    Return = 2,
    Exception = 3,
}

impl EventKind {
    pub fn from_u32(v: u32) -> Option<Self> {
        match v {
            1 => Some(Self::Call),
            2 => Some(Self::Return),
            3 => Some(Self::Exception),
            _ => None,
        }
    }
}

/// Always-captured, always-persisted call/return record. Exactly 32 bytes,
/// matching the on-disk `index.atf` record layout (`§6.2`).
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct IndexRecord {
    pub timestamp_ns: u64,
    /// `module_id << 32 | symbol_index`.
    pub function_id: u64,
    pub thread_id: u32,
    pub event_kind: u32,
    pub call_depth: u32,
    /// Position of the paired [`DetailRecord`] in the thread's detail file,
    /// or [`DETAIL_SEQ_NONE`].
    pub detail_seq: u32,
}

const _: () = assert!(std::mem::size_of::<IndexRecord>() == 32);

impl IndexRecord {
    pub fn to_bytes(&self) -> [u8; 32] {
        let mut buf = [0u8; 32];
        buf[0..8].copy_from_slice(&self.timestamp_ns.to_le_bytes());
        buf[8..16].copy_from_slice(&self.function_id.to_le_bytes());
        buf[16..20].copy_from_slice(&self.thread_id.to_le_bytes());
        buf[20..24].copy_from_slice(&self.event_kind.to_le_bytes());
        buf[24..28].copy_from_slice(&self.call_depth.to_le_bytes());
        buf[28..32].copy_from_slice(&self.detail_seq.to_le_bytes());
        buf
    }

    pub fn from_bytes(buf: &[u8; 32]) -> Self {
        Self {
            timestamp_ns: u64::from_le_bytes(buf[0..8].try_into().unwrap()),
            function_id: u64::from_le_bytes(buf[8..16].try_into().unwrap()),
            thread_id: u32::from_le_bytes(buf[16..20].try_into().unwrap()),
            event_kind: u32::from_le_bytes(buf[20..24].try_into().unwrap()),
            call_depth: u32::from_le_bytes(buf[24..28].try_into().unwrap()),
            detail_seq: u32::from_le_bytes(buf[28..32].try_into().unwrap()),
        }
    }
}

/// Header preceding every detail record's payload on disk and in the ring
/// slot. 24 bytes, matching `§6.3`.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct DetailRecordHeader {
    /// `size_of::<DetailRecordHeader>() + payload_len`.
    pub total_length: u32,
    pub event_type: u16,
    pub flags: u16,
    /// Position of the paired [`IndexRecord`] in the thread's index file.
    pub index_seq: u32,
    pub thread_id: u32,
    pub timestamp_ns: u64,
}

const _: () = assert!(std::mem::size_of::<DetailRecordHeader>() == 24);

impl DetailRecordHeader {
    pub fn to_bytes(&self) -> [u8; 24] {
        let mut buf = [0u8; 24];
        buf[0..4].copy_from_slice(&self.total_length.to_le_bytes());
        buf[4..6].copy_from_slice(&self.event_type.to_le_bytes());
        buf[6..8].copy_from_slice(&self.flags.to_le_bytes());
        buf[8..12].copy_from_slice(&self.index_seq.to_le_bytes());
        buf[12..16].copy_from_slice(&self.thread_id.to_le_bytes());
        buf[16..24].copy_from_slice(&self.timestamp_ns.to_le_bytes());
        buf
    }

    pub fn from_bytes(buf: &[u8; 24]) -> Self {
        Self {
            total_length: u32::from_le_bytes(buf[0..4].try_into().unwrap()),
            event_type: u16::from_le_bytes(buf[4..6].try_into().unwrap()),
            flags: u16::from_le_bytes(buf[6..8].try_into().unwrap()),
            index_seq: u32::from_le_bytes(buf[8..12].try_into().unwrap()),
            thread_id: u32::from_le_bytes(buf[12..16].try_into().unwrap()),
            timestamp_ns: u64::from_le_bytes(buf[16..24].try_into().unwrap()),
        }
    }
}

/// Fixed-size in-memory detail record: a header plus a `MAX_STACK_BYTES`
/// payload buffer, only `payload_len` bytes of which are meaningful. Keeping
/// the slot fixed-size preserves the ring's "no partial records" contract
/// regardless of the configured `stack_bytes` ceiling.
#[derive(Debug, Clone, Copy)]
pub struct DetailSlot {
    pub header: DetailRecordHeader,
    pub payload: [u8; MAX_STACK_BYTES],
    pub payload_len: u16,
}

impl DetailSlot {
    pub fn new(header: DetailRecordHeader, payload: &[u8]) -> Self {
        let mut buf = [0u8; MAX_STACK_BYTES];
        let len = payload.len().min(MAX_STACK_BYTES);
        buf[..len].copy_from_slice(&payload[..len]);
        Self {
            header: DetailRecordHeader {
                total_length: (std::mem::size_of::<DetailRecordHeader>() + len) as u32,
                ..header
            },
            payload: buf,
            payload_len: len as u16,
        }
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload[..self.payload_len as usize]
    }
}

impl Default for DetailSlot {
    fn default() -> Self {
        Self {
            header: DetailRecordHeader {
                total_length: std::mem::size_of::<DetailRecordHeader>() as u32,
                event_type: 0,
                flags: 0,
                index_seq: 0,
                thread_id: 0,
                timestamp_ns: 0,
            },
            payload: [0u8; MAX_STACK_BYTES],
            payload_len: 0,
        }
    }
}
