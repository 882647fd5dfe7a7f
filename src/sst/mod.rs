pub mod footer;
pub mod reader;
pub mod writer;


// This package builds, serializes, loads and searches Sorted-String Tables
// (SSTs).
//
// An SST is an immutable table of key/value pairs ordered on keys. Every key
// ends in an 8-byte version suffix (see `encoding`), and an empty value marks
// a tombstone. SSTs are built in a single pass over an already sorted and
// de-duplicated source, usually a merge of memtables or of older SSTs.
//
// Physically, an SST is one flat buffer:
//
//   [0]                    format tag (1 byte)
//   [1..5)                 footer offset (u32 LE)
//   [5..index_offset)      entries: len(key) u32 LE | key | len(value) u32 LE | value
//   [index_offset..footer) index: key zero-padded to max_key_length | entry offset u32 LE
//   [footer..footer+24)    footer: max_key_length | num_entries | num_deletes |
//                          index_offset (u32 LE each) | creation_time (u64 LE)
//
// Every index record has the same width, so a lookup binary searches the
// index in place without decoding anything. All offsets are relative to the
// format byte, which lets several tables sit back-to-back in one buffer.
//
// The footer only exists in the serialized form. A loaded table keeps a view
// of the caller's buffer up to the footer rather than a copy of it.

use bytes::Bytes;

pub use footer::{Footer, FOOTER_LEN};
pub use writer::{build_table, SstWriter};

/// Bytes before the first entry: the format tag and the footer offset.
pub const HEADER_LEN: usize = 5;

/// Opaque tag naming the value encoding of a table. Only the value codecs
/// interpret it; tables store and replay it verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DataFormat(pub u8);

impl DataFormat {
    pub const UNKNOWN: DataFormat = DataFormat(0);
}

impl From<u8> for DataFormat {
    fn from(b: u8) -> Self {
        DataFormat(b)
    }
}

/// An immutable, built or loaded table.
///
/// Cloning is cheap: the underlying buffer is reference counted, and a table
/// may be shared between threads and searched concurrently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SsTable {
    format: DataFormat,
    max_key_length: u32,
    num_entries: u32,
    num_deletes: u32,
    index_offset: u32,
    creation_time: u64,
    data: Bytes,
}

/// Everything a build produces besides the table: the key bounds and the
/// range of versions seen. For an empty table the keys are `None`,
/// `min_version` is `u64::MAX` and `max_version` is 0.
#[derive(Debug, Clone)]
pub struct BuiltTable {
    pub table: SsTable,
    pub smallest_key: Option<Bytes>,
    pub largest_key: Option<Bytes>,
    pub min_version: u64,
    pub max_version: u64,
}

impl SsTable {
    pub fn format(&self) -> DataFormat {
        self.format
    }

    pub fn max_key_length(&self) -> usize {
        self.max_key_length as usize
    }

    pub fn num_entries(&self) -> usize {
        self.num_entries as usize
    }

    pub fn num_deletes(&self) -> usize {
        self.num_deletes as usize
    }

    /// Fraction of entries that are tombstones. NaN for an empty table, so
    /// callers ranking tables for compaction have to check `num_entries`.
    pub fn delete_ratio(&self) -> f64 {
        self.num_deletes as f64 / self.num_entries as f64
    }

    /// Milliseconds since the unix epoch at which the table was built.
    pub fn creation_time(&self) -> u64 {
        self.creation_time
    }

    pub fn index_offset(&self) -> usize {
        self.index_offset as usize
    }

    /// Serialized size, footer included.
    pub fn size_bytes(&self) -> usize {
        self.data.len() + FOOTER_LEN
    }

    /// Header, entries and index, without the footer.
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    fn footer(&self) -> Footer {
        Footer {
            max_key_length: self.max_key_length,
            num_entries: self.num_entries,
            num_deletes: self.num_deletes,
            index_offset: self.index_offset,
            creation_time: self.creation_time,
        }
    }

    fn index_record_len(&self) -> usize {
        self.max_key_length as usize + 4
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{encoding::key_with_version, iter::{Entry, VecIter}};

    fn build(entries: Vec<Entry>) -> BuiltTable {
        build_table(DataFormat(3), 0, 0, VecIter::new(entries)).unwrap()
    }

    #[test]
    fn accessors() {
        let built = build(vec![
            Entry::new(key_with_version(b"a", 5), "v1"),
            Entry::new(key_with_version(b"b", 3), ""),
            Entry::new(key_with_version(b"c", 9), "v3"),
        ]);
        let t = &built.table;
        assert_eq!(t.format(), DataFormat(3));
        assert_eq!(t.num_entries(), 3);
        assert_eq!(t.num_deletes(), 1);
        assert!((t.delete_ratio() - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(t.max_key_length(), 9);
        assert_eq!(t.size_bytes(), t.data().len() + 24);
        assert_eq!(t.data()[0], 3);
        assert!(t.creation_time() > 0);
    }

    #[test]
    fn empty_table_delete_ratio_is_nan() {
        let built = build(vec![]);
        assert_eq!(built.table.num_entries(), 0);
        assert!(built.table.delete_ratio().is_nan());
    }

    #[test]
    fn tables_are_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SsTable>();
    }
}
