use thiserror::Error;

/// Failures raised by the table codec itself.
///
/// These travel inside `anyhow::Error` like every other error in the crate;
/// use `err.downcast_ref::<SstError>()` to recover the category. Errors
/// produced by an [`EntryIter`](crate::iter::EntryIter) are passed through
/// untouched and will not downcast to this type.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SstError {
    #[error("keys not in order or contains duplicates: {prev:?} >= {key:?}")]
    OutOfOrder { prev: Vec<u8>, key: Vec<u8> },

    #[error("key of {len} bytes is shorter than the 8-byte version suffix")]
    KeyTooShort { len: usize },

    #[error("sstable too big: {size} bytes exceeds limit of {limit}")]
    TooLarge { size: u64, limit: u64 },

    #[error("corrupt sstable: {0}")]
    Corrupt(String),

    #[error("invalid table options: {0}")]
    InvalidOptions(String),
}

impl SstError {
    /// True for errors that mean the caller broke the input contract
    /// (unsorted, duplicated or malformed keys). Retrying cannot help.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            SstError::OutOfOrder { .. } | SstError::KeyTooShort { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::SstError;

    #[test]
    fn classify() {
        assert!(SstError::OutOfOrder {
            prev: b"b".to_vec(),
            key: b"a".to_vec()
        }
        .is_invariant_violation());
        assert!(SstError::KeyTooShort { len: 3 }.is_invariant_violation());
        assert!(!SstError::Corrupt("x".into()).is_invariant_violation());
        assert!(!SstError::TooLarge { size: 10, limit: 5 }.is_invariant_violation());
    }

    #[test]
    fn messages() {
        assert_eq!(
            SstError::KeyTooShort { len: 3 }.to_string(),
            "key of 3 bytes is shorter than the 8-byte version suffix"
        );
        assert_eq!(
            SstError::Corrupt("bad footer".into()).to_string(),
            "corrupt sstable: bad footer"
        );
    }
}
