//! Array chains
//!
//! Elements are packed back to back, as many per block as fit. String arrays
//! hold one string-store index per element; the strings themselves live in
//! the value string store and are freed along with the array.

use super::chain::{collect_chain, delete_chain, links, resize_chain};
use super::string_store::StringStore;
use crate::storage::records::{ArrayBlock, PropertyType};
use crate::storage::value::ArrayValue;
use crate::storage::{Index, NULL_INDEX, StoreKind, StoreManager};
use crate::{Error, Result};
use std::path::Path;
use tracing::{debug, warn};

/// Dynamic store of typed arrays
#[derive(Debug)]
pub struct ArrayStore {
    manager: StoreManager<ArrayBlock>,
    block_size: usize,
}

/// Elements of one block: count and encoded bytes
struct Segment {
    amount: u32,
    data: Vec<u8>,
}

impl ArrayStore {
    /// Open (or create) the array store at `path`
    pub fn open<P: AsRef<Path>>(path: P, block_size: usize) -> Result<Self> {
        if block_size == 0 || block_size % 8 != 0 {
            return Err(Error::config(format!(
                "Array block size must be a non-zero multiple of 8, got {block_size}"
            )));
        }
        Ok(Self {
            manager: StoreManager::open_as(path, ArrayBlock::record_size(block_size), StoreKind::Array)?,
            block_size,
        })
    }

    /// Payload bytes per block
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Underlying block store
    pub fn manager(&self) -> &StoreManager<ArrayBlock> {
        &self.manager
    }

    /// Underlying block store, mutably
    pub fn manager_mut(&mut self) -> &mut StoreManager<ArrayBlock> {
        &mut self.manager
    }

    /// Encode `value`, writing string elements to `strings`
    fn segments(&self, strings: &mut StringStore, value: &ArrayValue) -> Result<Vec<Segment>> {
        let element_type = value.element_type();
        let width = element_type
            .element_size()
            .ok_or_else(|| Error::type_mismatch("array element type", element_type))?;

        let data = match value {
            ArrayValue::String(items) => {
                let mut data = Vec::with_capacity(items.len() * width);
                for item in items {
                    data.extend_from_slice(&strings.write_str(item)?.to_ne_bytes());
                }
                data
            }
            other => other
                .encode_elements()
                .ok_or_else(|| Error::type_mismatch("primitive array", other.property_type()))?,
        };

        let per_block = ArrayBlock::capacity(self.block_size, element_type) * width;
        if data.is_empty() {
            return Ok(vec![Segment {
                amount: 0,
                data,
            }]);
        }
        Ok(data
            .chunks(per_block)
            .map(|chunk| Segment {
                amount: (chunk.len() / width) as u32,
                data: chunk.to_vec(),
            })
            .collect())
    }

    fn write_segments(
        &mut self,
        indexes: &[Index],
        element_type: PropertyType,
        segments: Vec<Segment>,
    ) -> Result<()> {
        let total_blocks = segments.len() as u32;
        for (position, (&index, segment)) in indexes.iter().zip(segments).enumerate() {
            let (prev, next) = links(indexes, position);
            let block = ArrayBlock {
                index,
                in_use: true,
                element_type,
                prev,
                amount: segment.amount,
                total_blocks,
                next,
                data: segment.data,
            };
            self.manager.write_item(&block)?;
        }
        Ok(())
    }

    /// Store `value` and return the index of its first block
    pub fn write(&mut self, strings: &mut StringStore, value: &ArrayValue) -> Result<Index> {
        let segments = self.segments(strings, value)?;
        let indexes = self.manager.get_indexes(segments.len())?;
        self.write_segments(&indexes, value.element_type(), segments)?;
        debug!(
            "Wrote {} array of {} elements in {} blocks at {}",
            value.property_type(),
            value.len(),
            indexes.len(),
            indexes[0]
        );
        Ok(indexes[0])
    }

    /// Array of the chain starting at `start`; `None` if the chain (or one
    /// of its strings) is broken
    pub fn read(&self, strings: &StringStore, start: Index) -> Result<Option<ArrayValue>> {
        let Some(blocks) = collect_chain(&self.manager, start)? else {
            return Ok(None);
        };
        let element_type = blocks[0].element_type;
        if blocks.iter().any(|block| block.element_type != element_type) {
            warn!("Array chain at {} mixes element types", start);
            return Ok(None);
        }

        let data: Vec<u8> = blocks.into_iter().flat_map(|block| block.data).collect();
        if element_type != PropertyType::String {
            return ArrayValue::decode_elements(element_type, &data).map(Some);
        }

        let mut items = Vec::with_capacity(data.len() / 4);
        for index in string_refs(&data) {
            match strings.read_str(index)? {
                Some(item) => items.push(item),
                None => return Ok(None),
            }
        }
        Ok(Some(ArrayValue::String(items)))
    }

    /// Replace the array at `start`, keeping `start`
    ///
    /// Strings referenced by the old value are freed and the new strings
    /// written fresh.
    pub fn update(
        &mut self,
        strings: &mut StringStore,
        start: Index,
        value: &ArrayValue,
    ) -> Result<()> {
        let old = collect_chain(&self.manager, start)?.ok_or_else(|| {
            Error::corruption(format!("Cannot update broken array chain at {start}"))
        })?;
        for block in &old {
            release_strings(strings, block)?;
        }

        let segments = self.segments(strings, value)?;
        let indexes = resize_chain(&mut self.manager, &old, segments.len())?;
        self.write_segments(&indexes, value.element_type(), segments)
    }

    /// Free every block of the chain starting at `start` and, for string
    /// arrays, every referenced string
    ///
    /// `Err(ChainIndex)` if `start` is not a chain head, `Ok(false)` if the
    /// chain is broken.
    pub fn delete(&mut self, strings: &mut StringStore, start: Index) -> Result<bool> {
        let mut string_data = Vec::new();
        let complete = delete_chain(&mut self.manager, start, |block: &ArrayBlock| {
            if block.element_type == PropertyType::String {
                string_data.extend_from_slice(&block.data);
            }
        })?;

        for index in string_refs(&string_data) {
            strings.delete(index)?;
        }
        Ok(complete)
    }

    /// Start indices of arrays containing every element of `items`
    ///
    /// `limit == 0` returns every match; `element_type` restricts the scan
    /// to arrays of that element type.
    pub fn find_containing(
        &self,
        strings: &StringStore,
        items: &ArrayValue,
        limit: usize,
        element_type: Option<PropertyType>,
    ) -> Result<Vec<Index>> {
        let mut matches = Vec::new();
        for block in self.manager.iter()? {
            let block = block?;
            if !block.is_head() || element_type.is_some_and(|ty| ty != block.element_type) {
                continue;
            }
            if let Some(array) = self.read(strings, block.index)? {
                if array.contains_all(items) {
                    matches.push(block.index);
                    if limit != 0 && matches.len() == limit {
                        break;
                    }
                }
            }
        }
        Ok(matches)
    }

    /// Flush to disk
    pub fn sync(&self) -> Result<()> {
        self.manager.sync()
    }
}

/// String-store indices packed into string array element bytes
pub(crate) fn string_refs(data: &[u8]) -> impl Iterator<Item = Index> + '_ {
    data.chunks_exact(4)
        .map(|chunk| Index::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .filter(|index| *index != NULL_INDEX)
}

fn release_strings(strings: &mut StringStore, block: &ArrayBlock) -> Result<()> {
    if block.element_type != PropertyType::String {
        return Ok(());
    }
    for index in string_refs(&block.data) {
        strings.delete(index)?;
    }
    Ok(())
}
