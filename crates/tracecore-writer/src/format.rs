//! Byte-level layout of `index.atf` and `detail.atf`: fixed-size headers and
//! footers bracketing the variable-length events region. All multi-byte
//! fields are little-endian; checksums are CRC-32/ISO-HDLC (`crc32fast`).

use crate::error::WriteError;

pub const INDEX_HEADER_SIZE: usize = 64;
pub const INDEX_FOOTER_SIZE: usize = 64;
pub const DETAIL_HEADER_SIZE: usize = 64;
pub const DETAIL_FOOTER_SIZE: usize = 64;

pub const INDEX_MAGIC: [u8; 4] = *b"ATI2";
pub const INDEX_FOOTER_MAGIC: [u8; 4] = *b"2ITA";
pub const DETAIL_MAGIC: [u8; 4] = *b"ATD2";
pub const DETAIL_FOOTER_MAGIC: [u8; 4] = *b"2DTA";

pub const ENDIAN_LITTLE: u8 = 0x01;
pub const FORMAT_VERSION: u8 = 1;

#[cfg(target_arch = "x86_64")]
pub const ARCH_CODE: u8 = 1;
#[cfg(target_arch = "aarch64")]
pub const ARCH_CODE: u8 = 2;
#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
pub const ARCH_CODE: u8 = 0;

pub const FLAG_HAS_DETAIL: u32 = 1 << 0;

pub fn crc32(bytes: &[u8]) -> u32 {
    crc32fast::hash(bytes)
}

/// `index.atf` header: written as a placeholder when the file is opened,
/// rewritten in place once the writer finalizes.
#[derive(Debug, Clone, Copy)]
pub struct IndexFileHeader {
    pub os: u8,
    pub arch: u8,
    pub flags: u32,
    pub thread_id: u32,
    pub clock_type: u8,
    pub event_count: u32,
    pub footer_offset: u64,
    pub time_start_ns: u64,
    pub time_end_ns: u64,
}

impl IndexFileHeader {
    pub fn to_bytes(&self) -> [u8; INDEX_HEADER_SIZE] {
        let mut buf = [0u8; INDEX_HEADER_SIZE];
        buf[0..4].copy_from_slice(&INDEX_MAGIC);
        buf[4] = ENDIAN_LITTLE;
        buf[5] = FORMAT_VERSION;
        buf[6] = self.arch;
        buf[7] = self.os;
        buf[8..12].copy_from_slice(&self.flags.to_le_bytes());
        buf[12..16].copy_from_slice(&self.thread_id.to_le_bytes());
        buf[16] = self.clock_type;
        // buf[17..24] reserved
        buf[24..28].copy_from_slice(&32u32.to_le_bytes()); // event_size
        buf[28..32].copy_from_slice(&self.event_count.to_le_bytes());
        buf[32..40].copy_from_slice(&(INDEX_HEADER_SIZE as u64).to_le_bytes()); // events_offset
        buf[40..48].copy_from_slice(&self.footer_offset.to_le_bytes());
        buf[48..56].copy_from_slice(&self.time_start_ns.to_le_bytes());
        buf[56..64].copy_from_slice(&self.time_end_ns.to_le_bytes());
        buf
    }

    pub fn from_bytes(buf: &[u8]) -> Result<Self, WriteError> {
        if buf.len() < INDEX_HEADER_SIZE {
            return Err(WriteError::Truncated {
                file: "index.atf",
                expected: INDEX_HEADER_SIZE,
                found: buf.len(),
            });
        }
        let magic: [u8; 4] = buf[0..4].try_into().unwrap();
        if magic != INDEX_MAGIC {
            return Err(WriteError::BadMagic { file: "index.atf", expected: INDEX_MAGIC, found: magic });
        }
        Ok(Self {
            arch: buf[6],
            os: buf[7],
            flags: u32::from_le_bytes(buf[8..12].try_into().unwrap()),
            thread_id: u32::from_le_bytes(buf[12..16].try_into().unwrap()),
            clock_type: buf[16],
            event_count: u32::from_le_bytes(buf[28..32].try_into().unwrap()),
            footer_offset: u64::from_le_bytes(buf[40..48].try_into().unwrap()),
            time_start_ns: u64::from_le_bytes(buf[48..56].try_into().unwrap()),
            time_end_ns: u64::from_le_bytes(buf[56..64].try_into().unwrap()),
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct IndexFileFooter {
    pub checksum: u32,
    pub event_count: u64,
    pub time_start_ns: u64,
    pub time_end_ns: u64,
    pub bytes_written: u64,
}

impl IndexFileFooter {
    pub fn to_bytes(&self) -> [u8; INDEX_FOOTER_SIZE] {
        let mut buf = [0u8; INDEX_FOOTER_SIZE];
        buf[0..4].copy_from_slice(&INDEX_FOOTER_MAGIC);
        buf[4..8].copy_from_slice(&self.checksum.to_le_bytes());
        buf[8..16].copy_from_slice(&self.event_count.to_le_bytes());
        buf[16..24].copy_from_slice(&self.time_start_ns.to_le_bytes());
        buf[24..32].copy_from_slice(&self.time_end_ns.to_le_bytes());
        buf[32..40].copy_from_slice(&self.bytes_written.to_le_bytes());
        buf
    }

    pub fn from_bytes(buf: &[u8]) -> Result<Self, WriteError> {
        if buf.len() < INDEX_FOOTER_SIZE {
            return Err(WriteError::Truncated {
                file: "index.atf footer",
                expected: INDEX_FOOTER_SIZE,
                found: buf.len(),
            });
        }
        let magic: [u8; 4] = buf[0..4].try_into().unwrap();
        if magic != INDEX_FOOTER_MAGIC {
            return Err(WriteError::BadMagic {
                file: "index.atf footer",
                expected: INDEX_FOOTER_MAGIC,
                found: magic,
            });
        }
        Ok(Self {
            checksum: u32::from_le_bytes(buf[4..8].try_into().unwrap()),
            event_count: u64::from_le_bytes(buf[8..16].try_into().unwrap()),
            time_start_ns: u64::from_le_bytes(buf[16..24].try_into().unwrap()),
            time_end_ns: u64::from_le_bytes(buf[24..32].try_into().unwrap()),
            bytes_written: u64::from_le_bytes(buf[32..40].try_into().unwrap()),
        })
    }
}

/// `detail.atf` header.
#[derive(Debug, Clone, Copy)]
pub struct DetailFileHeader {
    pub os: u8,
    pub arch: u8,
    pub flags: u32,
    pub thread_id: u32,
    pub event_count: u64,
    pub bytes_length: u64,
    pub index_seq_start: u64,
    pub index_seq_end: u64,
}

impl DetailFileHeader {
    pub fn to_bytes(&self) -> [u8; DETAIL_HEADER_SIZE] {
        let mut buf = [0u8; DETAIL_HEADER_SIZE];
        buf[0..4].copy_from_slice(&DETAIL_MAGIC);
        buf[4] = ENDIAN_LITTLE;
        buf[5] = FORMAT_VERSION;
        buf[6] = self.arch;
        buf[7] = self.os;
        buf[8..12].copy_from_slice(&self.flags.to_le_bytes());
        buf[12..16].copy_from_slice(&self.thread_id.to_le_bytes());
        // buf[16..24] reserved
        buf[24..32].copy_from_slice(&(DETAIL_HEADER_SIZE as u64).to_le_bytes()); // events_offset
        buf[32..40].copy_from_slice(&self.event_count.to_le_bytes());
        buf[40..48].copy_from_slice(&self.bytes_length.to_le_bytes());
        buf[48..56].copy_from_slice(&self.index_seq_start.to_le_bytes());
        buf[56..64].copy_from_slice(&self.index_seq_end.to_le_bytes());
        buf
    }

    pub fn from_bytes(buf: &[u8]) -> Result<Self, WriteError> {
        if buf.len() < DETAIL_HEADER_SIZE {
            return Err(WriteError::Truncated {
                file: "detail.atf",
                expected: DETAIL_HEADER_SIZE,
                found: buf.len(),
            });
        }
        let magic: [u8; 4] = buf[0..4].try_into().unwrap();
        if magic != DETAIL_MAGIC {
            return Err(WriteError::BadMagic { file: "detail.atf", expected: DETAIL_MAGIC, found: magic });
        }
        Ok(Self {
            arch: buf[6],
            os: buf[7],
            flags: u32::from_le_bytes(buf[8..12].try_into().unwrap()),
            thread_id: u32::from_le_bytes(buf[12..16].try_into().unwrap()),
            event_count: u64::from_le_bytes(buf[32..40].try_into().unwrap()),
            bytes_length: u64::from_le_bytes(buf[40..48].try_into().unwrap()),
            index_seq_start: u64::from_le_bytes(buf[48..56].try_into().unwrap()),
            index_seq_end: u64::from_le_bytes(buf[56..64].try_into().unwrap()),
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DetailFileFooter {
    pub checksum: u32,
    pub event_count: u64,
    pub bytes_length: u64,
    pub time_start_ns: u64,
    pub time_end_ns: u64,
}

impl DetailFileFooter {
    pub fn to_bytes(&self) -> [u8; DETAIL_FOOTER_SIZE] {
        let mut buf = [0u8; DETAIL_FOOTER_SIZE];
        buf[0..4].copy_from_slice(&DETAIL_FOOTER_MAGIC);
        buf[4..8].copy_from_slice(&self.checksum.to_le_bytes());
        buf[8..16].copy_from_slice(&self.event_count.to_le_bytes());
        buf[16..24].copy_from_slice(&self.bytes_length.to_le_bytes());
        buf[24..32].copy_from_slice(&self.time_start_ns.to_le_bytes());
        buf[32..40].copy_from_slice(&self.time_end_ns.to_le_bytes());
        buf
    }

    pub fn from_bytes(buf: &[u8]) -> Result<Self, WriteError> {
        if buf.len() < DETAIL_FOOTER_SIZE {
            return Err(WriteError::Truncated {
                file: "detail.atf footer",
                expected: DETAIL_FOOTER_SIZE,
                found: buf.len(),
            });
        }
        let magic: [u8; 4] = buf[0..4].try_into().unwrap();
        if magic != DETAIL_FOOTER_MAGIC {
            return Err(WriteError::BadMagic {
                file: "detail.atf footer",
                expected: DETAIL_FOOTER_MAGIC,
                found: magic,
            });
        }
        Ok(Self {
            checksum: u32::from_le_bytes(buf[4..8].try_into().unwrap()),
            event_count: u64::from_le_bytes(buf[8..16].try_into().unwrap()),
            bytes_length: u64::from_le_bytes(buf[16..24].try_into().unwrap()),
            time_start_ns: u64::from_le_bytes(buf[24..32].try_into().unwrap()),
            time_end_ns: u64::from_le_bytes(buf[32..40].try_into().unwrap()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_header_round_trips() {
        let header = IndexFileHeader {
            os: 1,
            arch: ARCH_CODE,
            flags: FLAG_HAS_DETAIL,
            thread_id: 42,
            clock_type: 1,
            event_count: 100,
            footer_offset: 3264,
            time_start_ns: 10,
            time_end_ns: 20,
        };
        let bytes = header.to_bytes();
        assert_eq!(bytes.len(), INDEX_HEADER_SIZE);
        let back = IndexFileHeader::from_bytes(&bytes).unwrap();
        assert_eq!(back.thread_id, 42);
        assert_eq!(back.event_count, 100);
        assert_eq!(back.footer_offset, 3264);
    }

    #[test]
    fn index_footer_round_trips() {
        let footer = IndexFileFooter {
            checksum: 0xdead_beef,
            event_count: 5,
            time_start_ns: 1,
            time_end_ns: 2,
            bytes_written: 160,
        };
        let bytes = footer.to_bytes();
        assert_eq!(bytes.len(), INDEX_FOOTER_SIZE);
        let back = IndexFileFooter::from_bytes(&bytes).unwrap();
        assert_eq!(back.checksum, 0xdead_beef);
        assert_eq!(back.bytes_written, 160);
    }

    #[test]
    fn detail_header_and_footer_round_trip() {
        let header = DetailFileHeader {
            os: 1,
            arch: ARCH_CODE,
            flags: 0,
            thread_id: 7,
            event_count: 3,
            bytes_length: 96,
            index_seq_start: 0,
            index_seq_end: 2,
        };
        let back = DetailFileHeader::from_bytes(&header.to_bytes()).unwrap();
        assert_eq!(back.thread_id, 7);
        assert_eq!(back.index_seq_end, 2);

        let footer = DetailFileFooter {
            checksum: 123,
            event_count: 3,
            bytes_length: 96,
            time_start_ns: 1,
            time_end_ns: 9,
        };
        let back = DetailFileFooter::from_bytes(&footer.to_bytes()).unwrap();
        assert_eq!(back.checksum, 123);
        assert_eq!(back.event_count, 3);
    }

    #[test]
    fn bad_magic_is_rejected() {
        let mut bytes = [0u8; INDEX_HEADER_SIZE];
        bytes[0..4].copy_from_slice(b"XXXX");
        assert!(matches!(IndexFileHeader::from_bytes(&bytes), Err(WriteError::BadMagic { .. })));
    }

    #[test]
    fn crc32_matches_known_vector() {
        // "123456789" is the standard CRC-32/ISO-HDLC check string.
        assert_eq!(crc32(b"123456789"), 0xCBF4_3926);
    }
}
