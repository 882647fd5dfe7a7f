//! Sorted-string tables for a versioned LSM store.
//!
//! A table is built once from a sorted source ([`SstWriter`]), serialized to a
//! single flat buffer ([`SsTable::serialize`]), and later loaded back from
//! that buffer without copying it ([`SsTable::deserialize`]). Lookups binary
//! search the fixed-width index embedded in the buffer
//! ([`SsTable::find_offset`]).
//!
//! Keys carry an 8-byte version suffix, see [`encoding`].

pub mod encoding;
pub mod error;
pub mod iter;
pub mod options;
pub mod sst;

pub use error::SstError;
pub use iter::{Entry, EntryIter, FallibleIter, VecIter};
pub use options::TableOptions;
pub use sst::{build_table, BuiltTable, DataFormat, SsTable, SstWriter};
