use bytes::{BufMut, Bytes};
use tracing::{debug, warn};

use crate::{
    encoding::{length_prefixed_range, read_u32_le},
    error::SstError,
};

use super::{DataFormat, Footer, SsTable, FOOTER_LEN, HEADER_LEN};

fn corrupt(msg: String) -> anyhow::Error {
    warn!(%msg, "rejecting sstable buffer");
    SstError::Corrupt(msg).into()
}

fn decode_footer(buf: &[u8]) -> anyhow::Result<Footer> {
    Footer::decode(buf).map_err(|err| match err {
        SstError::Corrupt(msg) => corrupt(msg),
        other => other.into(),
    })
}

impl SsTable {
    /// Returns the serialized table: the data buffer followed by the footer.
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.size_bytes());
        self.write_to(&mut out);
        out
    }

    /// Appends the serialized table to `out`. Tables written one after the
    /// other can be read back with successive [`SsTable::deserialize`] calls.
    pub fn write_to<B: BufMut>(&self, out: &mut B) {
        out.put_slice(&self.data);
        self.footer().write_to(out);
    }

    /// Loads the table that starts at `offset` in `buf` and returns it along
    /// with the offset just past its footer.
    ///
    /// Only the header and footer are parsed and checked against each other.
    /// The table keeps a view of `buf`, not a copy.
    ///
    /// The footer is located through the header's footer offset, not by
    /// looking at the end of `buf`. Bytes after the footer are left for the
    /// caller: they may hold the next table, and the returned offset tells
    /// where they start.
    pub fn deserialize(buf: &Bytes, offset: usize) -> anyhow::Result<(SsTable, usize)> {
        let header_end = offset.saturating_add(HEADER_LEN);
        if header_end > buf.len() {
            return Err(corrupt(format!(
                "buffer of {} bytes too short for header at {}",
                buf.len(),
                offset
            )));
        }
        let format = DataFormat::from(buf[offset]);
        let footer_ptr = read_u32_le(buf, offset + 1)
            .ok_or_else(|| corrupt("truncated footer offset".to_owned()))?
            as usize;
        if footer_ptr < HEADER_LEN {
            return Err(corrupt(format!("footer offset {} overlaps header", footer_ptr)));
        }

        let footer_start = offset + footer_ptr;
        let footer_end = footer_start + FOOTER_LEN;
        if footer_end > buf.len() {
            return Err(corrupt(format!(
                "footer at {} runs past end of buffer ({} bytes)",
                footer_start,
                buf.len()
            )));
        }
        let footer = decode_footer(&buf[footer_start..footer_end])?;

        let index_offset = footer.index_offset as usize;
        if index_offset < HEADER_LEN || index_offset > footer_ptr {
            return Err(corrupt(format!(
                "index offset {} outside table of {} bytes",
                index_offset, footer_ptr
            )));
        }
        if footer.num_deletes > footer.num_entries {
            return Err(corrupt(format!(
                "{} deletes but only {} entries",
                footer.num_deletes, footer.num_entries
            )));
        }
        let index_len = (footer.num_entries as u64) * (footer.max_key_length as u64 + 4);
        if index_len != (footer_ptr - index_offset) as u64 {
            return Err(corrupt(format!(
                "index of {} entries does not fill {} bytes",
                footer.num_entries,
                footer_ptr - index_offset
            )));
        }

        let table = SsTable {
            format,
            max_key_length: footer.max_key_length,
            num_entries: footer.num_entries,
            num_deletes: footer.num_deletes,
            index_offset: footer.index_offset,
            creation_time: footer.creation_time,
            data: buf.slice(offset..footer_start),
        };
        debug!(
            offset,
            entries = table.num_entries,
            size = table.size_bytes(),
            "loaded sstable"
        );
        Ok((table, footer_end))
    }

    fn index_key(&self, i: usize) -> Option<&[u8]> {
        let start = self.index_offset() + i * self.index_record_len();
        self.data.get(start..start + self.max_key_length())
    }

    /// Finds the entry with the smallest key that is `>= key`, returning the
    /// offset of its record within [`SsTable::data`], or `None` if every key
    /// in the table is smaller.
    ///
    /// The match is not checked for equality; read the record with
    /// [`SsTable::read_entry`] to tell an exact hit from a ceiling.
    ///
    /// Index keys are compared in their zero-padded form. A lookup key that
    /// extends a shorter stored key with zero bytes therefore resolves to the
    /// stored key even though it sorts after it. Keys ending in a version
    /// suffix never hit this as long as logical keys do not continue into the
    /// suffix of another key.
    pub fn find_offset(&self, key: &[u8]) -> Option<usize> {
        if self.num_entries == 0 {
            return None;
        }
        let last = self.num_entries() - 1;
        let mut low = 0;
        let mut high = last;
        while low < high {
            let middle = low + (high - low) / 2;
            if self.index_key(middle)? < key {
                low = middle + 1;
            } else {
                high = middle;
            }
        }
        if high == last && self.index_key(high)? < key {
            return None;
        }
        let record_start = self.index_offset() + high * self.index_record_len();
        read_u32_le(&self.data, record_start + self.max_key_length()).map(|o| o as usize)
    }

    /// Decodes the record at `offset`, as returned by
    /// [`SsTable::find_offset`]. The key and value share this table's buffer.
    pub fn read_entry(&self, offset: usize) -> anyhow::Result<(Bytes, Bytes)> {
        let entries = &self.data[..self.index_offset().min(self.data.len())];
        if offset < HEADER_LEN {
            return Err(corrupt(format!("record offset {} inside header", offset)));
        }
        let key = length_prefixed_range(entries, offset)
            .ok_or_else(|| corrupt(format!("truncated key at {}", offset)))?;
        let value = length_prefixed_range(entries, key.end)
            .ok_or_else(|| corrupt(format!("truncated value at {}", key.end)))?;
        Ok((self.data.slice(key), self.data.slice(value)))
    }

    /// Point lookup. `Some` of an empty value is a tombstone.
    pub fn get(&self, key: &[u8]) -> anyhow::Result<Option<Bytes>> {
        let Some(offset) = self.find_offset(key) else {
            return Ok(None);
        };
        let (found, value) = self.read_entry(offset)?;
        if &found[..] != key {
            return Ok(None);
        }
        Ok(Some(value))
    }
}
