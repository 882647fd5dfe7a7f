use bytes::BufMut;

// Every key ends in an 8-byte version suffix holding `u64::MAX - version`
// big-endian, so that for one logical key the newest version sorts first.
pub const VERSION_LEN: usize = 8;

pub fn encode_version(version: u64) -> [u8; VERSION_LEN] {
    (u64::MAX - version).to_be_bytes()
}

/// Appends the version suffix to `key`.
pub fn key_with_version(key: &[u8], version: u64) -> Vec<u8> {
    let mut out = Vec::with_capacity(key.len() + VERSION_LEN);
    out.extend_from_slice(key);
    out.extend_from_slice(&encode_version(version));
    out
}

/// Returns the version carried by the trailing 8 bytes of `key`, or `None`
/// when the key is too short to have a suffix.
pub fn version_of(key: &[u8]) -> Option<u64> {
    split_version(key).map(|(_, v)| v)
}

/// Splits a versioned key into its logical part and its version.
pub fn split_version(key: &[u8]) -> Option<(&[u8], u64)> {
    let split = key.len().checked_sub(VERSION_LEN)?;
    let (logical, suffix) = key.split_at(split);
    let suffix: [u8; VERSION_LEN] = suffix.try_into().ok()?;
    Some((logical, u64::MAX - u64::from_be_bytes(suffix)))
}

pub(crate) fn append_with_length_prefix<B: BufMut>(buf: &mut B, bytes: &[u8]) {
    buf.put_u32_le(bytes.len() as u32);
    buf.put_slice(bytes);
}

pub(crate) fn read_u32_le(buf: &[u8], at: usize) -> Option<u32> {
    let b = buf.get(at..at.checked_add(4)?)?;
    Some(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

pub(crate) fn write_u32_le_at(buf: &mut [u8], at: usize, v: u32) {
    buf[at..at + 4].copy_from_slice(&v.to_le_bytes());
}

/// Reads a `len u32 LE | bytes` field at `at`, returning the byte range of
/// the payload.
pub(crate) fn length_prefixed_range(buf: &[u8], at: usize) -> Option<std::ops::Range<usize>> {
    let len = read_u32_le(buf, at)? as usize;
    let start = at + 4;
    let end = start.checked_add(len)?;
    if end > buf.len() {
        return None;
    }
    Some(start..end)
}

#[test]
fn test_version_ordering() {
    let newer = key_with_version(b"k", 10);
    let older = key_with_version(b"k", 9);
    assert!(newer < older);
    assert!(key_with_version(b"k", 0) < key_with_version(b"l", u64::MAX));
}

#[test]
fn test_version_extraction() {
    for v in [0, 1, 3, 1 << 40, u64::MAX - 1, u64::MAX] {
        let key = key_with_version(b"abc", v);
        assert_eq!(version_of(&key), Some(v));
        assert_eq!(split_version(&key), Some((&b"abc"[..], v)));
    }
    assert_eq!(version_of(b"short"), None);
    assert_eq!(split_version(&encode_version(7)), Some((&b""[..], 7)));
}

#[test]
fn test_length_prefix() {
    let mut buf = Vec::new();
    append_with_length_prefix(&mut buf, b"hello");
    append_with_length_prefix(&mut buf, b"");
    assert_eq!(buf.len(), 4 + 5 + 4);
    assert_eq!(read_u32_le(&buf, 0), Some(5));
    assert_eq!(length_prefixed_range(&buf, 0), Some(4..9));
    assert_eq!(length_prefixed_range(&buf, 9), Some(13..13));
    assert_eq!(length_prefixed_range(&buf, 10), None);

    write_u32_le_at(&mut buf, 0, 100);
    assert_eq!(length_prefixed_range(&buf, 0), None);
}
