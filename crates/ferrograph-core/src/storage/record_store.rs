//! Fixed-width record files
//!
//! [`RecordFile`] is the untyped slot file used by the defragmenter;
//! [`RecordStore`] layers a [`Record`] codec on top of it.

use super::{Index, NULL_INDEX, StoreKind};
use crate::{Error, Result};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Bit 0 of the first byte of every record is its in-use flag
pub const IN_USE_FLAG: u8 = 0x01;

/// Whether raw record bytes describe a live record
pub fn raw_in_use(bytes: &[u8]) -> bool {
    bytes.first().is_some_and(|flags| flags & IN_USE_FLAG != 0)
}

/// A file of fixed-size slots addressed by [`Index`]
#[derive(Debug)]
pub struct RecordFile {
    file: File,
    path: PathBuf,
    kind: StoreKind,
    record_size: usize,
}

impl RecordFile {
    /// Open a record file, creating it (with its zeroed header slot) if needed
    pub fn open_or_create<P: AsRef<Path>>(
        path: P,
        record_size: usize,
        kind: StoreKind,
    ) -> Result<Self> {
        if record_size == 0 {
            return Err(Error::storage(format!("{kind} store: record size must be non-zero")));
        }

        let path = path.as_ref().to_path_buf();
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        let len = file.metadata()?.len();
        if len == 0 {
            file.write_all(&vec![0u8; record_size])?;
            debug!("Created {} store at {:?}", kind, path);
        } else if len % record_size as u64 != 0 {
            return Err(Error::corruption(format!(
                "{kind} store {path:?}: length {len} is not a multiple of record size {record_size}"
            )));
        }

        Ok(Self {
            file,
            path,
            kind,
            record_size,
        })
    }

    /// Store kind this file holds
    pub fn kind(&self) -> StoreKind {
        self.kind
    }

    /// Size of one slot in bytes
    pub fn record_size(&self) -> usize {
        self.record_size
    }

    /// Path on disk
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of addressable slots (the header slot is not counted)
    pub fn count(&self) -> Result<Index> {
        let slots = self.file.metadata()?.len() / self.record_size as u64;
        Ok(slots.saturating_sub(1) as Index)
    }

    fn check_index(index: Index) -> Result<()> {
        if index == NULL_INDEX {
            return Err(Error::InvalidIndex { index });
        }
        Ok(())
    }

    fn offset(&self, index: Index) -> u64 {
        index as u64 * self.record_size as u64
    }

    /// Read the bytes of one slot; `None` if the slot lies past the end of the file
    pub fn read_raw(&self, index: Index) -> Result<Option<Vec<u8>>> {
        Self::check_index(index)?;
        if index > self.count()? {
            return Ok(None);
        }

        let mut buf = vec![0u8; self.record_size];
        let mut file = &self.file;
        file.seek(SeekFrom::Start(self.offset(index)))?;
        file.read_exact(&mut buf)?;
        Ok(Some(buf))
    }

    /// Overwrite one slot, extending the file if the slot lies past its end
    pub fn write_raw(&mut self, index: Index, bytes: &[u8]) -> Result<()> {
        Self::check_index(index)?;
        if bytes.len() != self.record_size {
            return Err(Error::storage(format!(
                "{} store: record is {} bytes, slot is {}",
                self.kind,
                bytes.len(),
                self.record_size
            )));
        }

        self.file.seek(SeekFrom::Start(self.offset(index)))?;
        self.file.write_all(bytes)?;
        Ok(())
    }

    /// Zero one slot
    pub fn delete(&mut self, index: Index) -> Result<()> {
        let zeroed = vec![0u8; self.record_size];
        self.write_raw(index, &zeroed)
    }

    /// Drop the last `amount` slots
    pub fn truncate(&mut self, amount: Index) -> Result<()> {
        let count = self.count()?;
        if amount > count {
            return Err(Error::storage(format!(
                "{} store: cannot truncate {} records, only {} exist",
                self.kind, amount, count
            )));
        }

        let new_len = (count - amount + 1) as u64 * self.record_size as u64;
        self.file.set_len(new_len)?;
        debug!("Truncated {} records from {} store", amount, self.kind);
        Ok(())
    }

    /// Flush file contents to disk
    pub fn sync(&self) -> Result<()> {
        self.file.sync_all()?;
        Ok(())
    }
}

/// A record with a fixed binary encoding
pub trait Record: Sized {
    /// Store the record lives in
    const KIND: StoreKind;

    /// Index of the record within its store
    fn index(&self) -> Index;

    /// Whether the record is live
    fn in_use(&self) -> bool;

    /// Encode into `buf`, which is exactly one slot long
    fn encode(&self, buf: &mut [u8]) -> Result<()>;

    /// Decode one slot read from `index`
    fn decode(index: Index, bytes: &[u8]) -> Result<Self>;
}

/// Result of reading one slot
#[derive(Debug, Clone, PartialEq)]
pub enum Slot<R> {
    /// A live record
    Record(R),
    /// Allocated slot holding a deleted (zeroed) record
    Empty,
    /// Slot lies past the end of the file
    EndOfFile,
}

impl<R> Slot<R> {
    /// The live record, if any
    pub fn into_record(self) -> Option<R> {
        match self {
            Slot::Record(record) => Some(record),
            Slot::Empty | Slot::EndOfFile => None,
        }
    }

    /// Whether the slot is past the end of the file
    pub fn is_eof(&self) -> bool {
        matches!(self, Slot::EndOfFile)
    }
}

/// Typed view over a [`RecordFile`]
#[derive(Debug)]
pub struct RecordStore<R: Record> {
    file: RecordFile,
    _record: PhantomData<R>,
}

impl<R: Record> RecordStore<R> {
    /// Open (or create) the store at `path`
    pub fn open<P: AsRef<Path>>(path: P, record_size: usize) -> Result<Self> {
        Self::open_as(path, record_size, R::KIND)
    }

    /// Open a store of `R` records registered under another kind
    /// (name stores hold string blocks)
    pub fn open_as<P: AsRef<Path>>(path: P, record_size: usize, kind: StoreKind) -> Result<Self> {
        Ok(Self {
            file: RecordFile::open_or_create(path, record_size, kind)?,
            _record: PhantomData,
        })
    }

    /// Store kind of the underlying file
    pub fn kind(&self) -> StoreKind {
        self.file.kind()
    }

    /// Read the slot at `index`
    pub fn read(&self, index: Index) -> Result<Slot<R>> {
        match self.file.read_raw(index)? {
            None => Ok(Slot::EndOfFile),
            Some(bytes) if !raw_in_use(&bytes) => Ok(Slot::Empty),
            Some(bytes) => Ok(Slot::Record(R::decode(index, &bytes)?)),
        }
    }

    /// Write `record` at its own index
    pub fn write(&mut self, record: &R) -> Result<()> {
        let mut buf = vec![0u8; self.file.record_size()];
        record.encode(&mut buf)?;
        self.file.write_raw(record.index(), &buf)
    }

    /// Zero the slot at `index`
    pub fn delete(&mut self, index: Index) -> Result<()> {
        self.file.delete(index)
    }

    /// Number of addressable slots
    pub fn count(&self) -> Result<Index> {
        self.file.count()
    }

    /// Drop the last `amount` slots
    pub fn truncate(&mut self, amount: Index) -> Result<()> {
        self.file.truncate(amount)
    }

    /// Slot size in bytes
    pub fn record_size(&self) -> usize {
        self.file.record_size()
    }

    /// Flush to disk
    pub fn sync(&self) -> Result<()> {
        self.file.sync()
    }

    /// Untyped view
    pub fn file(&self) -> &RecordFile {
        &self.file
    }

    /// Mutable untyped view
    pub fn file_mut(&mut self) -> &mut RecordFile {
        &mut self.file
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::records::Node;
    use tempfile::TempDir;

    fn create_test_store() -> (RecordStore<Node>, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = RecordStore::open(dir.path().join("nodes.db"), Node::SIZE).unwrap();
        (store, dir)
    }

    #[test]
    fn test_new_store_has_header_slot() {
        let (store, dir) = create_test_store();
        assert_eq!(store.count().unwrap(), 0);

        let len = std::fs::metadata(dir.path().join("nodes.db")).unwrap().len();
        assert_eq!(len, Node::SIZE as u64);
    }

    #[test]
    fn test_index_zero_is_rejected() {
        let (mut store, _dir) = create_test_store();
        assert!(matches!(store.read(0), Err(Error::InvalidIndex { index: 0 })));
        assert!(matches!(store.delete(0), Err(Error::InvalidIndex { .. })));
        assert!(matches!(
            store.write(&Node::new(0, 0, 0, 0)),
            Err(Error::InvalidIndex { .. })
        ));
    }

    #[test]
    fn test_write_read_node() {
        let (mut store, _dir) = create_test_store();
        let node = Node::new(1, 4, 9, 2);
        store.write(&node).unwrap();

        assert_eq!(store.count().unwrap(), 1);
        assert_eq!(store.read(1).unwrap(), Slot::Record(node));
    }

    #[test]
    fn test_empty_vs_end_of_file() {
        let (mut store, _dir) = create_test_store();
        store.write(&Node::new(1, 0, 0, 1)).unwrap();
        store.write(&Node::new(2, 0, 0, 1)).unwrap();
        store.delete(1).unwrap();

        assert_eq!(store.read(1).unwrap(), Slot::Empty);
        assert!(matches!(store.read(2).unwrap(), Slot::Record(_)));
        assert!(store.read(3).unwrap().is_eof());
    }

    #[test]
    fn test_delete_zeroes_slot() {
        let (mut store, _dir) = create_test_store();
        store.write(&Node::new(1, 7, 7, 7)).unwrap();
        store.delete(1).unwrap();

        let raw = store.file().read_raw(1).unwrap().unwrap();
        assert!(raw.iter().all(|b| *b == 0));
    }

    #[test]
    fn test_write_past_end_extends_file() {
        let (mut store, _dir) = create_test_store();
        store.write(&Node::new(3, 0, 0, 1)).unwrap();

        assert_eq!(store.count().unwrap(), 3);
        assert_eq!(store.read(1).unwrap(), Slot::Empty);
        assert_eq!(store.read(2).unwrap(), Slot::Empty);
    }

    #[test]
    fn test_truncate() {
        let (mut store, _dir) = create_test_store();
        for index in 1..=5 {
            store.write(&Node::new(index, 0, 0, 1)).unwrap();
        }

        store.truncate(2).unwrap();
        assert_eq!(store.count().unwrap(), 3);
        assert!(store.read(4).unwrap().is_eof());

        assert!(matches!(store.truncate(4), Err(Error::Storage(_))));
        store.truncate(3).unwrap();
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_raw_write_size_checked() {
        let (mut store, _dir) = create_test_store();
        assert!(store.file_mut().write_raw(1, &[1, 2, 3]).is_err());
    }

    #[test]
    fn test_persistence() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nodes.db");

        {
            let mut store: RecordStore<Node> = RecordStore::open(&path, Node::SIZE).unwrap();
            store.write(&Node::new(1, 2, 3, 4)).unwrap();
            store.sync().unwrap();
        }

        let store: RecordStore<Node> = RecordStore::open(&path, Node::SIZE).unwrap();
        assert_eq!(store.count().unwrap(), 1);
        assert_eq!(store.read(1).unwrap(), Slot::Record(Node::new(1, 2, 3, 4)));
    }

    #[test]
    fn test_misaligned_file_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nodes.db");
        std::fs::write(&path, [0u8; 20]).unwrap();

        let result: Result<RecordStore<Node>> = RecordStore::open(&path, Node::SIZE);
        assert!(matches!(result, Err(Error::Corruption(_))));
    }
}
