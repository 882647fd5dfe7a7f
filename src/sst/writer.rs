use std::{
    ops::Range,
    time::{SystemTime, UNIX_EPOCH},
};

use bytes::{BufMut, Bytes};
use tracing::{debug, warn};

use crate::{
    encoding::{append_with_length_prefix, version_of, write_u32_le_at, VERSION_LEN},
    error::SstError,
    iter::EntryIter,
    options::TableOptions,
};

use super::{BuiltTable, DataFormat, SsTable, HEADER_LEN};

// Upper bound on what the allocation hints may reserve up front.
const MAX_PREALLOC_BYTES: usize = 64 << 20;

// Smallest possible record: two length prefixes and a bare version suffix.
const MIN_RECORD_LEN: usize = 4 + VERSION_LEN + 4;

struct IndexEntry {
    // Where the record starts, i.e. its length prefix.
    offset: u32,
    key_len: u32,
}

/// Builds an [`SsTable`] from a sorted, de-duplicated source.
pub struct SstWriter<I>
where
    I: EntryIter,
{
    format: DataFormat,
    it: I,
    options: TableOptions,
}

impl<I> SstWriter<I>
where
    I: EntryIter,
{
    pub fn new(format: DataFormat, it: I) -> Self {
        SstWriter {
            format,
            it,
            options: TableOptions::default(),
        }
    }

    pub fn with_options(mut self, options: TableOptions) -> Self {
        self.options = options;
        self
    }

    // The hints are clamped to what a table within `max_table_bytes` could
    // ever need, so a careless hint cannot fail the allocation.
    fn capacity_hints(&self) -> (usize, usize) {
        let limit = usize::try_from(self.options.max_table_bytes)
            .unwrap_or(usize::MAX)
            .min(MAX_PREALLOC_BYTES);
        let buffer_hint = self.options.buffer_size_hint.min(limit).max(HEADER_LEN);
        let entry_hint = self
            .options
            .entry_count_hint
            .min(limit / MIN_RECORD_LEN)
            .min(MAX_PREALLOC_BYTES / std::mem::size_of::<IndexEntry>());
        (buffer_hint, entry_hint)
    }

    fn check_size(&self, size: usize) -> Result<(), SstError> {
        let limit = self.options.max_table_bytes.min(u32::MAX as u64);
        if size as u64 > limit {
            return Err(SstError::TooLarge {
                size: size as u64,
                limit,
            });
        }
        Ok(())
    }

    /// Consumes the source and builds the table.
    ///
    /// Fails without producing a table if the source errors (the error is
    /// returned as is), if a key is not strictly greater than its
    /// predecessor or lacks a version suffix, or if the table outgrows
    /// `max_table_bytes`.
    pub fn build(mut self) -> anyhow::Result<BuiltTable> {
        self.options.validate()?;

        let (buffer_hint, entry_hint) = self.capacity_hints();
        let mut buf: Vec<u8> = Vec::with_capacity(buffer_hint);
        let mut index: Vec<IndexEntry> = Vec::with_capacity(entry_hint);

        // The footer offset is filled in once the index has been written.
        buf.put_u8(self.format.0);
        buf.put_u32_le(0);

        let mut max_key_length = 0;
        let mut num_deletes: u32 = 0;
        let mut min_version = u64::MAX;
        let mut max_version = 0;
        let mut smallest: Option<Range<usize>> = None;
        let mut prev: Option<Range<usize>> = None;

        while self.it.is_valid()? {
            let (key, value) = self.it.current();

            if key.len() < VERSION_LEN {
                let err = SstError::KeyTooShort { len: key.len() };
                warn!(%err, "aborting sstable build");
                return Err(err.into());
            }
            if let Some(prev) = &prev {
                if buf[prev.clone()] >= *key {
                    let err = SstError::OutOfOrder {
                        prev: buf[prev.clone()].to_vec(),
                        key: key.to_vec(),
                    };
                    warn!(%err, "aborting sstable build");
                    return Err(err.into());
                }
            }

            let offset = buf.len();
            // Check before appending so a runaway source cannot grow the buffer
            // far past the limit.
            self.check_size(offset + 8 + key.len() + value.len())?;

            append_with_length_prefix(&mut buf, key);
            append_with_length_prefix(&mut buf, value);

            let key_range = offset + 4..offset + 4 + key.len();
            if smallest.is_none() {
                smallest = Some(key_range.clone());
            }
            prev = Some(key_range);

            index.push(IndexEntry {
                offset: offset as u32,
                key_len: key.len() as u32,
            });
            max_key_length = max_key_length.max(key.len());
            if value.is_empty() {
                num_deletes += 1;
            }
            if let Some(version) = version_of(key) {
                min_version = min_version.min(version);
                max_version = max_version.max(version);
            }

            self.it.next()?;
        }

        let index_offset = buf.len();
        let index_len = index.len() * (max_key_length + 4);
        self.check_size(index_offset + index_len)?;
        buf.reserve(index_len);

        for entry in &index {
            let key_start = entry.offset as usize + 4;
            let key_len = entry.key_len as usize;
            buf.extend_from_within(key_start..key_start + key_len);
            buf.resize(buf.len() + (max_key_length - key_len), 0);
            buf.put_u32_le(entry.offset);
        }

        let footer_offset = buf.len();
        write_u32_le_at(&mut buf, 1, footer_offset as u32);

        let data = Bytes::from(buf);
        let table = SsTable {
            format: self.format,
            max_key_length: max_key_length as u32,
            num_entries: index.len() as u32,
            num_deletes,
            index_offset: index_offset as u32,
            creation_time: now_millis(),
            data,
        };

        debug!(
            entries = table.num_entries,
            deletes = table.num_deletes,
            max_key_length = table.max_key_length,
            size = table.size_bytes(),
            "built sstable"
        );

        Ok(BuiltTable {
            smallest_key: smallest.map(|r| table.data.slice(r)),
            largest_key: prev.map(|r| table.data.slice(r)),
            table,
            min_version,
            max_version,
        })
    }
}

/// Builds a table with the given allocation hints and otherwise default
/// options.
pub fn build_table<I: EntryIter>(
    format: DataFormat,
    buffer_size_hint: usize,
    entry_count_hint: usize,
    it: I,
) -> anyhow::Result<BuiltTable> {
    SstWriter::new(format, it)
        .with_options(TableOptions {
            buffer_size_hint,
            entry_count_hint,
            ..TableOptions::default()
        })
        .build()
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
