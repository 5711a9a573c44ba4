//! snapshot: portable, timestamp-annotated table records.
//!
//! Every non-raw stored value is framed as
//!   [ts u64 BE, nanoseconds][payload]
//! and the records below carry the payload and the timestamp split apart.
//! The framing is shared with every peer instance and must stay byte-exact.

use byteorder::{BigEndian, ByteOrder};
use serde::{Deserialize, Serialize};

use crate::consts::HEADER_SIZE;
use crate::engine::flags::is_dup_sort;

/// One table entry with the timestamp header removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Kv {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
    /// 0 only when the table was read in raw mode.
    pub timestamp_nano: u64,
}

/// Contents of one table as seen by a single read transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSnapshot {
    pub name: String,
    /// Engine table flags, needed to re-create an equivalent table on import.
    pub flags: u64,
    /// Entries in the engine's native iteration order.
    pub entries: Vec<Kv>,
}

impl TableSnapshot {
    pub fn with_capacity(name: &str, flags: u64, capacity: usize) -> Self {
        Self {
            name: name.to_string(),
            flags,
            entries: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_dup_sort(&self) -> bool {
        is_dup_sort(self.flags as u32)
    }
}

/// Frame `payload` with a timestamp header, as writers store it.
pub fn encode_value(timestamp_nano: u64, payload: &[u8]) -> Vec<u8> {
    let mut out = vec![0u8; HEADER_SIZE + payload.len()];
    BigEndian::write_u64(&mut out[..HEADER_SIZE], timestamp_nano);
    out[HEADER_SIZE..].copy_from_slice(payload);
    out
}

/// Split a stored value into (timestamp, payload). `None` if it is shorter
/// than the header.
#[inline]
pub fn decode_value(stored: &[u8]) -> Option<(u64, &[u8])> {
    if stored.len() < HEADER_SIZE {
        return None;
    }
    let ts = BigEndian::read_u64(&stored[..HEADER_SIZE]);
    Some((ts, &stored[HEADER_SIZE..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_is_big_endian() {
        let v = encode_value(0x0102030405060708, b"xy");
        assert_eq!(&v[..8], &[1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(&v[8..], b"xy");
    }

    #[test]
    fn decode_exact_header_gives_empty_payload() {
        let v = encode_value(99, b"");
        assert_eq!(decode_value(&v), Some((99, &b""[..])));
    }

    #[test]
    fn decode_short_value_fails() {
        assert_eq!(decode_value(&[0u8; 7]), None);
        assert_eq!(decode_value(&[]), None);
    }

    #[test]
    fn dup_sort_flag_visible() {
        let t = TableSnapshot::with_capacity("t", crate::engine::flags::TABLE_DUP_SORT as u64, 4);
        assert!(t.is_dup_sort());
        assert!(t.is_empty());
        assert!(t.entries.capacity() >= 4);
    }
}
