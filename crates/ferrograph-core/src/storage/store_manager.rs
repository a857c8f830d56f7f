//! Store manager - a record store bound to its free list
//!
//! Allocation prefers recycled indices and only then extends the file.
//! Indices handed out past the end of the file are not reserved until a
//! record is written there, so each allocation must be written before the
//! next tail allocation on the same store.

use super::id_store::{IdStore, id_store_path};
use super::record_store::{Record, RecordFile, RecordStore, Slot, raw_in_use};
use super::{Index, StoreKind};
use crate::{Error, Result};
use std::path::Path;
use tracing::debug;

/// Record store plus free-list recycler
#[derive(Debug)]
pub struct StoreManager<R: Record> {
    store: RecordStore<R>,
    ids: IdStore,
}

impl<R: Record> StoreManager<R> {
    /// Open the store at `path` and its id store at `<path>.id`
    pub fn open<P: AsRef<Path>>(path: P, record_size: usize) -> Result<Self> {
        Self::open_as(path, record_size, R::KIND)
    }

    /// Open a store of `R` records registered under another kind
    pub fn open_as<P: AsRef<Path>>(path: P, record_size: usize, kind: StoreKind) -> Result<Self> {
        let path = path.as_ref();
        Ok(Self {
            store: RecordStore::open_as(path, record_size, kind)?,
            ids: IdStore::open(id_store_path(path))?,
        })
    }

    /// Build an unpersisted record at `index`, or at a freshly allocated index
    ///
    /// An explicit index is taken off the free list so it cannot be handed
    /// out or truncated while the caller owns it.
    pub fn create_item<F>(&mut self, index: Option<Index>, build: F) -> Result<R>
    where
        F: FnOnce(Index) -> R,
    {
        let index = match index {
            Some(index) => {
                self.claim(index)?;
                index
            }
            None => self.allocate()?,
        };
        Ok(build(index))
    }

    fn claim(&mut self, index: Index) -> Result<()> {
        let mut free = self.ids.get_all_ids()?;
        let before = free.len();
        free.retain(|id| *id != index);
        if free.len() != before {
            self.ids.replace_all_ids(&free)?;
            debug!("Claimed free index {} of {} store", index, self.store.kind());
        }
        Ok(())
    }

    /// Persist a record at its index
    pub fn write_item(&mut self, item: &R) -> Result<()> {
        self.store.write(item)
    }

    /// Live record at `index`
    pub fn get_item(&self, index: Index) -> Result<Option<R>> {
        Ok(self.store.read(index)?.into_record())
    }

    /// Raw slot state at `index`
    pub fn get_slot(&self, index: Index) -> Result<Slot<R>> {
        self.store.read(index)
    }

    /// Delete a record and recycle its index
    pub fn delete_item(&mut self, item: &R) -> Result<()> {
        self.delete_item_at_index(item.index())
    }

    /// Delete the record at `index` and recycle the index
    ///
    /// Deleting the last record of the file truncates it instead, together
    /// with the run of free slots immediately before it.
    pub fn delete_item_at_index(&mut self, index: Index) -> Result<()> {
        let count = self.store.count()?;
        let raw = self.store.file().read_raw(index)?.ok_or_else(|| {
            Error::not_found(format!(
                "{} record {index} lies past the end of the store ({count} records)",
                self.store.kind()
            ))
        })?;
        if !raw_in_use(&raw) {
            debug!("{} record {} already deleted", self.store.kind(), index);
            return Ok(());
        }

        if index == count {
            self.store.truncate(1)?;
            self.truncate_free_tail()
        } else {
            self.store.delete(index)?;
            self.ids.store_id(index)
        }
    }

    /// Remove trailing free slots from the file and from the free list
    ///
    /// The run stops at the first live slot even if its index is still
    /// listed as free.
    fn truncate_free_tail(&mut self) -> Result<()> {
        let mut free = self.ids.get_all_ids()?;
        if free.is_empty() {
            return Ok(());
        }

        let mut end = self.store.count()?;
        let mut amount = 0;
        while end > 0 && free.contains(&end) {
            match self.store.file().read_raw(end)? {
                Some(raw) if !raw_in_use(&raw) => {}
                _ => break,
            }
            amount += 1;
            end -= 1;
        }
        if amount == 0 {
            return Ok(());
        }

        free.retain(|id| *id <= end);
        self.ids.replace_all_ids(&free)?;
        self.store.truncate(amount)?;
        debug!(
            "Truncated {} trailing free records from {} store",
            amount,
            self.store.kind()
        );
        Ok(())
    }

    fn allocate(&mut self) -> Result<Index> {
        let count = self.store.count()?;
        while let Some(index) = self.ids.get_id()? {
            if index <= count {
                return Ok(index);
            }
            debug!("Dropping stale free index {} from {} store", index, self.store.kind());
        }
        Ok(count + 1)
    }

    /// Allocate `amount` indices: recycled ones first (most recently freed
    /// first), then consecutive indices past the end of the file
    pub fn get_indexes(&mut self, amount: usize) -> Result<Vec<Index>> {
        let count = self.store.count()?;
        let mut indexes = Vec::with_capacity(amount);

        while indexes.len() < amount {
            match self.ids.get_id()? {
                Some(index) if index <= count => indexes.push(index),
                Some(index) => {
                    debug!("Dropping stale free index {} from {} store", index, self.store.kind());
                }
                None => break,
            }
        }

        let missing = (amount - indexes.len()) as Index;
        indexes.extend(count + 1..count + 1 + missing);
        Ok(indexes)
    }

    /// Number of addressable slots
    pub fn count(&self) -> Result<Index> {
        self.store.count()
    }

    /// Kind of the managed store
    pub fn kind(&self) -> StoreKind {
        self.store.kind()
    }

    /// Slot size in bytes
    pub fn record_size(&self) -> usize {
        self.store.record_size()
    }

    /// Typed store
    pub fn store(&self) -> &RecordStore<R> {
        &self.store
    }

    /// Free list
    pub fn ids(&self) -> &IdStore {
        &self.ids
    }

    /// Untyped file and free list, borrowed together for defragmentation
    pub fn parts_mut(&mut self) -> (&mut RecordFile, &mut IdStore) {
        (self.store.file_mut(), &mut self.ids)
    }

    /// Iterate over every live record in index order
    pub fn iter(&self) -> Result<StoreIter<'_, R>> {
        Ok(StoreIter {
            manager: self,
            next: 1,
            count: self.count()?,
        })
    }

    /// Flush store and free list to disk
    pub fn sync(&self) -> Result<()> {
        self.store.sync()?;
        self.ids.sync()
    }
}

/// Iterator over the live records of a store
pub struct StoreIter<'a, R: Record> {
    manager: &'a StoreManager<R>,
    next: Index,
    count: Index,
}

impl<R: Record> Iterator for StoreIter<'_, R> {
    type Item = Result<R>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.next <= self.count {
            let index = self.next;
            self.next += 1;
            match self.manager.get_slot(index) {
                Ok(Slot::Record(record)) => return Some(Ok(record)),
                Ok(Slot::Empty) => continue,
                Ok(Slot::EndOfFile) => return None,
                Err(e) => return Some(Err(e)),
            }
        }
        None
    }
}
