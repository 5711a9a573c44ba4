//! engine/catalog: decoding of the main database records.
//!
//! Every named table is a key in LMDB's unnamed main database whose value is
//! the table's `MDB_db` record: flags, tree depth, page counts, entry count
//! and root page, in native byte order. Reading the record is the only way to
//! learn a table's persisted flags without touching the C API.

use byteorder::{ByteOrder, NativeEndian};

const WORD: usize = std::mem::size_of::<usize>();

/// Encoded size of one record: pad(u32) flags(u16) depth(u16) then five words.
pub const RECORD_LEN: usize = 8 + 5 * WORD;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRecord {
    pub name: String,
    pub flags: u32,
    pub depth: u32,
    pub branch_pages: u64,
    pub leaf_pages: u64,
    pub overflow_pages: u64,
    /// Entry count as of the last commit.
    pub entries: u64,
}

impl TableRecord {
    /// Decode a main-database entry. Returns None for keys that are not
    /// table names (plain values stored in the main database).
    pub fn decode(key: &[u8], val: &[u8]) -> Option<Self> {
        if val.len() != RECORD_LEN {
            return None;
        }
        let name = std::str::from_utf8(key).ok()?;
        if name.is_empty() {
            return None;
        }
        Some(Self {
            name: name.to_string(),
            flags: NativeEndian::read_u16(&val[4..6]) as u32,
            depth: NativeEndian::read_u16(&val[6..8]) as u32,
            branch_pages: word(val, 0),
            leaf_pages: word(val, 1),
            overflow_pages: word(val, 2),
            entries: word(val, 3),
        })
    }

    pub fn pages(&self) -> u64 {
        self.branch_pages + self.leaf_pages + self.overflow_pages
    }
}

fn word(val: &[u8], idx: usize) -> u64 {
    let at = 8 + idx * WORD;
    if WORD == 8 {
        NativeEndian::read_u64(&val[at..at + 8])
    } else {
        NativeEndian::read_u32(&val[at..at + 4]) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(flags: u16, depth: u16, words: [u64; 5]) -> Vec<u8> {
        let mut out = vec![0u8; RECORD_LEN];
        NativeEndian::write_u16(&mut out[4..6], flags);
        NativeEndian::write_u16(&mut out[6..8], depth);
        for (i, w) in words.iter().enumerate() {
            let at = 8 + i * WORD;
            if WORD == 8 {
                NativeEndian::write_u64(&mut out[at..at + 8], *w);
            } else {
                NativeEndian::write_u32(&mut out[at..at + 4], *w as u32);
            }
        }
        out
    }

    #[test]
    fn decodes_flags_and_counters() {
        let raw = record(0x04, 2, [1, 7, 3, 120, 9]);
        let rec = TableRecord::decode(b"users", &raw).unwrap();
        assert_eq!(rec.name, "users");
        assert_eq!(rec.flags, 0x04);
        assert_eq!(rec.depth, 2);
        assert_eq!(rec.entries, 120);
        assert_eq!(rec.pages(), 11);
    }

    #[test]
    fn plain_values_are_not_tables() {
        assert!(TableRecord::decode(b"users", b"short").is_none());
        assert!(TableRecord::decode(&[0xff, 0xfe], &record(0, 1, [0; 5])).is_none());
        assert!(TableRecord::decode(b"", &record(0, 1, [0; 5])).is_none());
    }
}
