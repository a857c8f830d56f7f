//! Block chain helpers shared by the string and array stores

use crate::storage::record_store::{Record, Slot};
use crate::storage::records::{ArrayBlock, StringBlock};
use crate::storage::{Index, NULL_INDEX, StoreManager};
use crate::{Error, Result};
use tracing::warn;

/// A block of a doubly-linked dynamic value chain
pub trait ChainBlock: Record + Clone {
    /// Previous block, 0 for a chain head
    fn prev(&self) -> Index;
    /// Next block, 0 for a chain tail
    fn next(&self) -> Index;
    /// Rewire the previous pointer
    fn set_prev(&mut self, prev: Index);
}

impl ChainBlock for StringBlock {
    fn prev(&self) -> Index {
        self.prev
    }

    fn next(&self) -> Index {
        self.next
    }

    fn set_prev(&mut self, prev: Index) {
        self.prev = prev;
    }
}

impl ChainBlock for ArrayBlock {
    fn prev(&self) -> Index {
        self.prev
    }

    fn next(&self) -> Index {
        self.next
    }

    fn set_prev(&mut self, prev: Index) {
        self.prev = prev;
    }
}

/// `(prev, next)` of the block at `position` in a chain laid out over `indexes`
pub(crate) fn links(indexes: &[Index], position: usize) -> (Index, Index) {
    let prev = if position == 0 {
        NULL_INDEX
    } else {
        indexes[position - 1]
    };
    let next = indexes.get(position + 1).copied().unwrap_or(NULL_INDEX);
    (prev, next)
}

/// Every block of the chain starting at `start`
///
/// Returns `None` when `start` is not a chain head, a block is missing or a
/// back pointer disagrees with the walk.
pub(crate) fn collect_chain<B: ChainBlock>(
    manager: &StoreManager<B>,
    start: Index,
) -> Result<Option<Vec<B>>> {
    if start == NULL_INDEX {
        return Err(Error::InvalidIndex { index: start });
    }

    let mut blocks: Vec<B> = Vec::new();
    let mut prev = NULL_INDEX;
    let mut index = start;
    while index != NULL_INDEX {
        match manager.get_slot(index)? {
            Slot::Record(block) if block.prev() == prev => {
                prev = index;
                index = block.next();
                blocks.push(block);
            }
            Slot::Record(block) => {
                warn!(
                    "Broken {} chain at {}: block {} points back to {}, expected {}",
                    manager.kind(),
                    start,
                    index,
                    block.prev(),
                    prev
                );
                return Ok(None);
            }
            Slot::Empty | Slot::EndOfFile => {
                warn!(
                    "Broken {} chain at {}: block {} is missing",
                    manager.kind(),
                    start,
                    index
                );
                return Ok(None);
            }
        }
    }
    Ok(Some(blocks))
}

/// Delete every block of the chain starting at `start`, calling `visit` on
/// each block before it is freed
///
/// Fails with `ChainIndex` if `start` is not a chain head; returns
/// `Ok(false)` if the chain is broken (blocks before the break are freed).
pub(crate) fn delete_chain<B, F>(
    manager: &mut StoreManager<B>,
    start: Index,
    mut visit: F,
) -> Result<bool>
where
    B: ChainBlock,
    F: FnMut(&B),
{
    let mut block = match manager.get_slot(start)? {
        Slot::Record(block) => block,
        Slot::Empty | Slot::EndOfFile => {
            warn!("No {} chain starts at {}", manager.kind(), start);
            return Ok(false);
        }
    };
    if block.prev() != NULL_INDEX {
        return Err(Error::ChainIndex { index: start });
    }

    loop {
        visit(&block);
        let next = block.next();
        manager.delete_item_at_index(block.index())?;
        if next == NULL_INDEX {
            return Ok(true);
        }

        block = match manager.get_slot(next)? {
            Slot::Record(block) => block,
            Slot::Empty | Slot::EndOfFile => {
                warn!(
                    "Broken {} chain at {}: block {} is missing",
                    manager.kind(),
                    start,
                    next
                );
                return Ok(false);
            }
        };
    }
}

/// Block indices for rewriting a chain as `needed` blocks
///
/// Existing blocks are reused front to back. Surplus blocks are detached
/// (their first block loses its `prev`) and deleted; missing blocks are
/// allocated through the store manager.
pub(crate) fn resize_chain<B: ChainBlock>(
    manager: &mut StoreManager<B>,
    old: &[B],
    needed: usize,
) -> Result<Vec<Index>> {
    let mut indexes: Vec<Index> = old.iter().take(needed).map(|block| block.index()).collect();

    if let Some(first_surplus) = old.get(needed) {
        let mut head = first_surplus.clone();
        head.set_prev(NULL_INDEX);
        manager.write_item(&head)?;
        delete_chain(manager, head.index(), |_| {})?;
    } else if needed > old.len() {
        indexes.extend(manager.get_indexes(needed - old.len())?);
    }

    Ok(indexes)
}
