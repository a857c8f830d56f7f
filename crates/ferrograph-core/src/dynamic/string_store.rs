//! String and name chains
//!
//! A value is split into `block_size` byte segments, one block each; an
//! empty value still takes one (empty) block so it has a start index.

use super::chain::{collect_chain, delete_chain, links, resize_chain};
use crate::storage::records::StringBlock;
use crate::storage::{Index, StoreKind, StoreManager};
use crate::{Error, Result};
use std::path::Path;
use tracing::debug;

/// Dynamic store of byte strings
#[derive(Debug)]
pub struct StringStore {
    manager: StoreManager<StringBlock>,
    block_size: usize,
}

impl StringStore {
    /// Open (or create) a string store of `kind` at `path`
    pub fn open<P: AsRef<Path>>(path: P, block_size: usize, kind: StoreKind) -> Result<Self> {
        if block_size == 0 {
            return Err(Error::config(format!("{kind} store: block size must be non-zero")));
        }
        Ok(Self {
            manager: StoreManager::open_as(path, StringBlock::record_size(block_size), kind)?,
            block_size,
        })
    }

    /// Payload bytes per block
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Underlying block store
    pub fn manager(&self) -> &StoreManager<StringBlock> {
        &self.manager
    }

    /// Underlying block store, mutably
    pub fn manager_mut(&mut self) -> &mut StoreManager<StringBlock> {
        &mut self.manager
    }

    fn segments<'a>(&self, bytes: &'a [u8]) -> Vec<&'a [u8]> {
        if bytes.is_empty() {
            vec![bytes]
        } else {
            bytes.chunks(self.block_size).collect()
        }
    }

    fn write_segments(&mut self, indexes: &[Index], segments: &[&[u8]]) -> Result<()> {
        for (position, (&index, segment)) in indexes.iter().zip(segments).enumerate() {
            let (prev, next) = links(indexes, position);
            let block = StringBlock::new(index, prev, next, segment.to_vec());
            self.manager.write_item(&block)?;
        }
        Ok(())
    }

    /// Store `bytes` and return the index of its first block
    pub fn write(&mut self, bytes: &[u8]) -> Result<Index> {
        let segments = self.segments(bytes);
        let indexes = self.manager.get_indexes(segments.len())?;
        self.write_segments(&indexes, &segments)?;
        debug!(
            "Wrote {} bytes to {} store in {} blocks at {}",
            bytes.len(),
            self.manager.kind(),
            indexes.len(),
            indexes[0]
        );
        Ok(indexes[0])
    }

    /// Store a UTF-8 string
    pub fn write_str(&mut self, value: &str) -> Result<Index> {
        self.write(value.as_bytes())
    }

    /// Bytes of the chain starting at `start`; `None` if the chain is broken
    pub fn read(&self, start: Index) -> Result<Option<Vec<u8>>> {
        Ok(collect_chain(&self.manager, start)?
            .map(|blocks| blocks.into_iter().flat_map(|block| block.data).collect()))
    }

    /// UTF-8 string of the chain starting at `start`
    pub fn read_str(&self, start: Index) -> Result<Option<String>> {
        self.read(start)?
            .map(|bytes| {
                String::from_utf8(bytes).map_err(|e| {
                    Error::corruption(format!(
                        "{} chain at {start} is not UTF-8: {e}",
                        self.manager.kind()
                    ))
                })
            })
            .transpose()
    }

    /// Replace the value of the chain starting at `start`, keeping `start`
    pub fn update(&mut self, start: Index, bytes: &[u8]) -> Result<()> {
        let old = collect_chain(&self.manager, start)?.ok_or_else(|| {
            Error::corruption(format!(
                "Cannot update broken {} chain at {start}",
                self.manager.kind()
            ))
        })?;

        let segments = self.segments(bytes);
        let indexes = resize_chain(&mut self.manager, &old, segments.len())?;
        self.write_segments(&indexes, &segments)
    }

    /// Replace the value of the chain starting at `start` with a UTF-8 string
    pub fn update_str(&mut self, start: Index, value: &str) -> Result<()> {
        self.update(start, value.as_bytes())
    }

    /// Free every block of the chain starting at `start`
    ///
    /// `Err(ChainIndex)` if `start` is not a chain head, `Ok(false)` if the
    /// chain is broken.
    pub fn delete(&mut self, start: Index) -> Result<bool> {
        delete_chain(&mut self.manager, start, |_| {})
    }

    /// Start index of the first chain holding exactly `bytes`
    pub fn find(&self, bytes: &[u8]) -> Result<Option<Index>> {
        for block in self.manager.iter()? {
            let block = block?;
            if block.is_head() && self.read(block.index)?.as_deref() == Some(bytes) {
                return Ok(Some(block.index));
            }
        }
        Ok(None)
    }

    /// Flush to disk
    pub fn sync(&self) -> Result<()> {
        self.manager.sync()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const BLOCK: usize = 10;

    fn create_test_store() -> (StringStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = StringStore::open(dir.path().join("strings.db"), BLOCK, StoreKind::String).unwrap();
        (store, dir)
    }

    fn text(len: usize) -> String {
        (0..len).map(|i| (b'a' + (i % 26) as u8) as char).collect()
    }

    #[test]
    fn test_round_trip_lengths() {
        let (mut store, _dir) = create_test_store();
        for len in [0, 1, BLOCK - 1, BLOCK, BLOCK + 1, 3 * BLOCK + 5] {
            let value = text(len);
            let start = store.write_str(&value).unwrap();
            assert_eq!(store.read_str(start).unwrap().as_deref(), Some(value.as_str()));
        }
    }

    #[test]
    fn test_block_count() {
        let (mut store, _dir) = create_test_store();
        store.write_str("").unwrap();
        assert_eq!(store.manager().count().unwrap(), 1);
        store.write_str(&text(25)).unwrap();
        assert_eq!(store.manager().count().unwrap(), 4);
    }

    #[test]
    fn test_trailing_nul_bytes_survive() {
        let (mut store, _dir) = create_test_store();
        let value = b"abc\0\0\0\0\0\0\0\0\0".to_vec();
        let start = store.write(&value).unwrap();
        assert_eq!(store.read(start).unwrap(), Some(value));
    }

    #[test]
    fn test_update_shrinks_in_place() {
        let (mut store, _dir) = create_test_store();
        let start = store.write_str(&text(35)).unwrap();
        let other = store.write_str("tail").unwrap();

        store.update_str(start, "short").unwrap();
        assert_eq!(store.read_str(start).unwrap().as_deref(), Some("short"));
        assert_eq!(store.read_str(other).unwrap().as_deref(), Some("tail"));
        assert_eq!(store.manager().ids().len().unwrap(), 3);
    }

    #[test]
    fn test_update_grows_in_place() {
        let (mut store, _dir) = create_test_store();
        let start = store.write_str("tiny").unwrap();
        let value = text(42);

        store.update_str(start, &value).unwrap();
        assert_eq!(store.read_str(start).unwrap().as_deref(), Some(value.as_str()));
        assert_eq!(store.manager().count().unwrap(), 5);
    }

    #[test]
    fn test_update_reuses_freed_blocks() {
        let (mut store, _dir) = create_test_store();
        let first = store.write_str(&text(20)).unwrap();
        let second = store.write_str("keep").unwrap();
        store.delete(first).unwrap();

        store.update_str(second, &text(30)).unwrap();
        assert_eq!(store.manager().count().unwrap(), 3);
        assert_eq!(store.read_str(second).unwrap(), Some(text(30)));
    }

    #[test]
    fn test_delete_and_recycle() {
        let (mut store, _dir) = create_test_store();
        let first = store.write_str(&text(15)).unwrap();
        store.write_str("anchor").unwrap();

        assert!(store.delete(first).unwrap());
        assert_eq!(store.read(first).unwrap(), None);

        let again = store.write_str(&text(15)).unwrap();
        assert_eq!(store.manager().count().unwrap(), 3);
        assert_eq!(store.read_str(again).unwrap(), Some(text(15)));
    }

    #[test]
    fn test_delete_from_middle_fails() {
        let (mut store, _dir) = create_test_store();
        let start = store.write_str(&text(25)).unwrap();
        assert!(matches!(
            store.delete(start + 1),
            Err(Error::ChainIndex { .. })
        ));
        assert_eq!(store.read_str(start).unwrap(), Some(text(25)));
    }

    #[test]
    fn test_broken_chain() {
        let (mut store, _dir) = create_test_store();
        let start = store.write_str(&text(25)).unwrap();
        store.write_str("anchor").unwrap();
        store.manager_mut().delete_item_at_index(start + 1).unwrap();

        assert_eq!(store.read(start).unwrap(), None);
        assert!(!store.delete(start).unwrap());
        assert!(!store.delete(start).unwrap());
    }

    #[test]
    fn test_read_from_middle_is_none() {
        let (mut store, _dir) = create_test_store();
        let start = store.write_str(&text(25)).unwrap();
        assert_eq!(store.read(start + 1).unwrap(), None);
    }

    #[test]
    fn test_find() {
        let (mut store, _dir) = create_test_store();
        store.write_str("Person").unwrap();
        let long = store.write_str("LongTypeNameSpanningBlocks").unwrap();
        let knows = store.write_str("KNOWS").unwrap();

        assert_eq!(store.find(b"KNOWS").unwrap(), Some(knows));
        assert_eq!(store.find(b"LongTypeNameSpanningBlocks").unwrap(), Some(long));
        assert_eq!(store.find(b"Spanning").unwrap(), None);
    }
}
