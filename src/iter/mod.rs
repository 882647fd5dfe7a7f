/// A key/value pair. An empty value is a tombstone.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Entry {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

impl Entry {
    pub fn new(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Entry {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn is_tombstone(&self) -> bool {
        self.value.is_empty()
    }
}

/// A one-pass, possibly fallible source of entries in ascending key order.
///
/// Sources are typically merge iterators over memtables or pages fetched
/// from remote storage, so both `is_valid` and `next` may block or fail.
pub trait EntryIter {
    /// Returns false once the source is exhausted.
    fn is_valid(&mut self) -> anyhow::Result<bool>;

    // Only meaningful after `is_valid` returned true.
    fn current(&self) -> (&[u8], &[u8]);

    fn next(&mut self) -> anyhow::Result<()>;
}

impl<I: EntryIter + ?Sized> EntryIter for &mut I {
    fn is_valid(&mut self) -> anyhow::Result<bool> {
        (**self).is_valid()
    }

    fn current(&self) -> (&[u8], &[u8]) {
        (**self).current()
    }

    fn next(&mut self) -> anyhow::Result<()> {
        (**self).next()
    }
}

#[derive(Debug, Default)]
pub struct VecIter {
    idx: usize,
    contents: Vec<Entry>,
}

impl VecIter {
    pub fn new(contents: Vec<Entry>) -> Self {
        VecIter { idx: 0, contents }
    }
}

impl EntryIter for VecIter {
    fn is_valid(&mut self) -> anyhow::Result<bool> {
        Ok(self.idx < self.contents.len())
    }

    fn current(&self) -> (&[u8], &[u8]) {
        match self.contents.get(self.idx) {
            Some(e) => (&e.key, &e.value),
            None => (&[], &[]),
        }
    }

    fn next(&mut self) -> anyhow::Result<()> {
        if self.idx < self.contents.len() {
            self.idx += 1;
        }
        Ok(())
    }
}

impl From<Vec<Entry>> for VecIter {
    fn from(contents: Vec<Entry>) -> Self {
        VecIter::new(contents)
    }
}

/// Adapts a std iterator of `Result<Entry>` into an [`EntryIter`]. An `Err`
/// item is surfaced from `is_valid` at the position it occupies.
pub struct FallibleIter<I>
where
    I: Iterator<Item = anyhow::Result<Entry>>,
{
    inner: I,
    current: Option<anyhow::Result<Entry>>,
    started: bool,
}

impl<I> FallibleIter<I>
where
    I: Iterator<Item = anyhow::Result<Entry>>,
{
    pub fn new(inner: I) -> Self {
        FallibleIter {
            inner,
            current: None,
            started: false,
        }
    }

    fn fill(&mut self) {
        if !self.started {
            self.started = true;
            self.current = self.inner.next();
        }
    }
}

impl<I> EntryIter for FallibleIter<I>
where
    I: Iterator<Item = anyhow::Result<Entry>>,
{
    fn is_valid(&mut self) -> anyhow::Result<bool> {
        self.fill();
        match self.current.take() {
            None => Ok(false),
            Some(Err(e)) => Err(e),
            Some(Ok(entry)) => {
                self.current = Some(Ok(entry));
                Ok(true)
            }
        }
    }

    fn current(&self) -> (&[u8], &[u8]) {
        match &self.current {
            Some(Ok(e)) => (&e.key, &e.value),
            _ => (&[], &[]),
        }
    }

    fn next(&mut self) -> anyhow::Result<()> {
        self.fill();
        self.current = self.inner.next();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;

    use super::{Entry, EntryIter, FallibleIter, VecIter};

    fn drain<I: EntryIter>(mut it: I) -> anyhow::Result<Vec<Entry>> {
        let mut out = Vec::new();
        while it.is_valid()? {
            let (k, v) = it.current();
            out.push(Entry::new(k, v));
            it.next()?;
        }
        Ok(out)
    }

    #[test]
    fn vec_iter() -> anyhow::Result<()> {
        let entries = vec![Entry::new("a", "1"), Entry::new("b", "")];
        let got = drain(VecIter::new(entries.clone()))?;
        assert_eq!(got, entries);
        assert!(got[1].is_tombstone());

        let mut empty = VecIter::default();
        assert!(!empty.is_valid()?);
        assert_eq!(empty.current(), (&[][..], &[][..]));
        Ok(())
    }

    #[test]
    fn fallible_iter_surfaces_error_in_place() {
        let items = vec![
            Ok(Entry::new("a", "1")),
            Err(anyhow!("page fetch failed")),
            Ok(Entry::new("c", "3")),
        ];
        let mut it = FallibleIter::new(items.into_iter());
        assert!(it.is_valid().unwrap());
        assert_eq!(it.current().0, b"a");
        it.next().unwrap();
        let err = it.is_valid().unwrap_err();
        assert_eq!(err.to_string(), "page fetch failed");
    }

    #[test]
    fn fallible_iter_ok() -> anyhow::Result<()> {
        let items = vec![Ok(Entry::new("a", "1")), Ok(Entry::new("b", "2"))];
        let got = drain(FallibleIter::new(items.into_iter()))?;
        assert_eq!(got.len(), 2);
        assert_eq!(got[1].key, b"b");
        Ok(())
    }
}
