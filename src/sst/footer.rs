use bytes::{Buf, BufMut};

use crate::error::SstError;

pub const FOOTER_LEN: usize = 4 + 4 + 4 + 4 + 8;

/// Table metadata, written after the index so that serializing never has to
/// move the entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Footer {
    pub max_key_length: u32,
    pub num_entries: u32,
    pub num_deletes: u32,
    pub index_offset: u32,
    pub creation_time: u64,
}

impl Footer {
    pub fn write_to<B: BufMut>(&self, out: &mut B) {
        out.put_u32_le(self.max_key_length);
        out.put_u32_le(self.num_entries);
        out.put_u32_le(self.num_deletes);
        out.put_u32_le(self.index_offset);
        out.put_u64_le(self.creation_time);
    }

    pub fn decode(mut buf: &[u8]) -> Result<Self, SstError> {
        if buf.len() != FOOTER_LEN {
            return Err(SstError::Corrupt(format!(
                "footer is {} bytes, expected {}",
                buf.len(),
                FOOTER_LEN
            )));
        }
        Ok(Footer {
            max_key_length: buf.get_u32_le(),
            num_entries: buf.get_u32_le(),
            num_deletes: buf.get_u32_le(),
            index_offset: buf.get_u32_le(),
            creation_time: buf.get_u64_le(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{Footer, FOOTER_LEN};
    use crate::error::SstError;

    #[test]
    fn layout() {
        let footer = Footer {
            max_key_length: 1,
            num_entries: 2,
            num_deletes: 3,
            index_offset: 4,
            creation_time: 5,
        };
        let mut buf = Vec::new();
        footer.write_to(&mut buf);
        assert_eq!(FOOTER_LEN, 24);
        assert_eq!(
            buf,
            vec![1, 0, 0, 0, 2, 0, 0, 0, 3, 0, 0, 0, 4, 0, 0, 0, 5, 0, 0, 0, 0, 0, 0, 0]
        );
        assert_eq!(Footer::decode(&buf), Ok(footer));
    }

    #[test]
    fn wrong_length() {
        assert_eq!(
            Footer::decode(&[0; 23]),
            Err(SstError::Corrupt("footer is 23 bytes, expected 24".into()))
        );
    }
}
