use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::{error::SstError, sst::HEADER_LEN};

/// Tuning knobs for building tables.
///
/// The hints only size allocations up front. `max_table_bytes` caps the
/// encoded table (header, entries and index, excluding the footer) and can
/// never exceed the 32-bit offset space of the format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableOptions {
    pub buffer_size_hint: usize,
    pub entry_count_hint: usize,
    pub max_table_bytes: u64,
}

impl Default for TableOptions {
    fn default() -> Self {
        TableOptions {
            buffer_size_hint: 64 * 1024,
            entry_count_hint: 1024,
            max_table_bytes: u32::MAX as u64,
        }
    }
}

impl TableOptions {
    pub fn from_json(s: &str) -> anyhow::Result<Self> {
        let opts: TableOptions = serde_json::from_str(s)?;
        opts.validate()?;
        Ok(opts)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path.as_ref())?;
        Self::from_json(contents.as_str())
    }

    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.max_table_bytes > u32::MAX as u64 {
            return Err(SstError::InvalidOptions(format!(
                "max_table_bytes {} exceeds the 32-bit offset range",
                self.max_table_bytes
            ))
            .into());
        }
        if self.max_table_bytes < HEADER_LEN as u64 {
            return Err(SstError::InvalidOptions(format!(
                "max_table_bytes {} cannot hold the {}-byte header",
                self.max_table_bytes, HEADER_LEN
            ))
            .into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::TableOptions;
    use crate::error::SstError;

    #[test]
    fn partial_json_uses_defaults() -> anyhow::Result<()> {
        let opts = TableOptions::from_json(r#"{"entry_count_hint": 10}"#)?;
        assert_eq!(opts.entry_count_hint, 10);
        assert_eq!(opts.buffer_size_hint, TableOptions::default().buffer_size_hint);
        assert_eq!(opts.max_table_bytes, u32::MAX as u64);
        Ok(())
    }

    #[test]
    fn rejects_limits_outside_format() {
        let err = TableOptions::from_json(r#"{"max_table_bytes": 5000000000}"#).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SstError>(),
            Some(SstError::InvalidOptions(_))
        ));

        let err = TableOptions::from_json(r#"{"max_table_bytes": 2}"#).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SstError>(),
            Some(SstError::InvalidOptions(_))
        ));
    }

    #[test]
    fn load_from_file() -> anyhow::Result<()> {
        let opts = TableOptions {
            buffer_size_hint: 128,
            entry_count_hint: 4,
            max_table_bytes: 4096,
        };
        let mut file = tempfile::NamedTempFile::new()?;
        file.write_all(opts.to_json()?.as_bytes())?;
        file.flush()?;

        assert_eq!(TableOptions::load(file.path())?, opts);
        Ok(())
    }

    #[test]
    fn load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(TableOptions::load(dir.path().join("nope.json")).is_err());
    }
}
