//! Store compaction
//!
//! Live records past the first free slot are moved down into one contiguous
//! run, the file is truncated and every pointer to a moved record is
//! rewritten, both inside the compacted store and in the stores that
//! reference it.

use super::reference_map::{pointer_slots, read_pointer, write_pointer};
use crate::storage::record_store::{RecordFile, raw_in_use};
use crate::storage::{IdStore, Index, StoreKind};
use crate::{Error, Result};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Outcome of one defragmentation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DefragReport {
    /// Records moved to a lower index
    pub moved: usize,
    /// Slots removed from the end of the file
    pub reclaimed: usize,
    /// Pointer fields rewritten across all stores
    pub references_updated: usize,
}

/// Compacts one record file and fixes references into it
pub struct Defragmenter<'a> {
    target: &'a mut RecordFile,
    ids: &'a mut IdStore,
    referrers: Vec<&'a mut RecordFile>,
}

impl<'a> Defragmenter<'a> {
    /// Prepare a defragmentation of `target`, whose free list is `ids`;
    /// `referrers` are the files holding pointers into `target`
    pub fn new(
        target: &'a mut RecordFile,
        ids: &'a mut IdStore,
        referrers: Vec<&'a mut RecordFile>,
    ) -> Self {
        Self {
            target,
            ids,
            referrers,
        }
    }

    /// Run the compaction
    pub fn defragment(mut self) -> Result<DefragReport> {
        let kind = self.target.kind();
        let count = self.target.count()?;

        let mut empty: Vec<Index> = Vec::new();
        for id in self.ids.get_all_ids()? {
            if id == 0 || id > count {
                continue;
            }
            match self.target.read_raw(id)? {
                Some(bytes) if raw_in_use(&bytes) => {
                    warn!("Free list of {} store lists live record {}", kind, id);
                }
                _ => empty.push(id),
            }
        }
        empty.sort_unstable();
        empty.dedup();

        if empty.is_empty() {
            debug!("{} store has no free slots, nothing to defragment", kind);
            return Ok(DefragReport::default());
        }

        let full = non_empty_blocks(&empty, count);
        let (continuous, non_continuous) = non_continuous_ids(&full);
        let swap_table = create_swap_table(&non_continuous, &empty);

        let mut report = DefragReport {
            moved: swap_table.len(),
            reclaimed: empty.len(),
            references_updated: 0,
        };

        // Destinations are always below their sources, so ascending order
        // never overwrites a record that still has to be moved.
        for (&src, &dst) in &swap_table {
            let mut bytes = self.target.read_raw(src)?.ok_or_else(|| {
                Error::corruption(format!("{kind} record {src} vanished during defragmentation"))
            })?;
            report.references_updated += remap(kind, &mut bytes, kind, &swap_table);
            self.target.write_raw(dst, &bytes)?;
        }

        self.target.truncate(empty.len() as Index)?;
        self.ids.clear()?;

        for &index in &continuous {
            let Some(mut bytes) = self.target.read_raw(index)? else {
                continue;
            };
            let updated = remap(kind, &mut bytes, kind, &swap_table);
            if updated > 0 {
                self.target.write_raw(index, &bytes)?;
                report.references_updated += updated;
            }
        }

        if !swap_table.is_empty() {
            for referrer in self.referrers.iter_mut() {
                report.references_updated += fix_references(referrer, kind, &swap_table)?;
            }
        }

        info!(
            "Defragmented {} store: moved {}, reclaimed {}, updated {} references",
            kind, report.moved, report.reclaimed, report.references_updated
        );
        Ok(report)
    }
}

/// Rewrite pointers into `target` held by every live record of `file`
fn fix_references(
    file: &mut RecordFile,
    target: StoreKind,
    swap_table: &BTreeMap<Index, Index>,
) -> Result<usize> {
    let kind = file.kind();
    let mut updated = 0;
    for index in 1..=file.count()? {
        let Some(mut bytes) = file.read_raw(index)? else {
            break;
        };
        let changed = remap(kind, &mut bytes, target, swap_table);
        if changed > 0 {
            file.write_raw(index, &bytes)?;
            updated += changed;
        }
    }
    debug!("Updated {} {} references in {} store", updated, target, kind);
    Ok(updated)
}

/// Rewrite the pointers into `target` held by a `record_kind` record;
/// returns how many fields changed
fn remap(
    record_kind: StoreKind,
    bytes: &mut [u8],
    target: StoreKind,
    swap_table: &BTreeMap<Index, Index>,
) -> usize {
    if !raw_in_use(bytes) {
        return 0;
    }

    let mut changed = 0;
    for (offset, width) in pointer_slots(record_kind, bytes, target) {
        let Some(old) = read_pointer(bytes, offset, width) else {
            continue;
        };
        let Ok(old) = Index::try_from(old) else {
            continue;
        };
        if let Some(&new) = swap_table.get(&old) {
            write_pointer(bytes, offset, width, new);
            changed += 1;
        }
    }
    changed
}

/// Indices in `1..=count` that are not listed as empty
pub fn non_empty_blocks(empty: &[Index], count: Index) -> Vec<Index> {
    (1..=count)
        .filter(|index| empty.binary_search(index).is_err())
        .collect()
}

/// Split sorted full indices into the run `1, 2, .., p` and the rest
pub fn non_continuous_ids(full: &[Index]) -> (Vec<Index>, Vec<Index>) {
    let prefix = full
        .iter()
        .enumerate()
        .take_while(|(position, index)| **index == *position as Index + 1)
        .count();
    (full[..prefix].to_vec(), full[prefix..].to_vec())
}

/// Map each non-continuous full index to consecutive destinations starting
/// at the first empty slot
pub fn create_swap_table(non_continuous: &[Index], empty: &[Index]) -> BTreeMap<Index, Index> {
    let Some(&first_empty) = empty.first() else {
        return BTreeMap::new();
    };
    non_continuous
        .iter()
        .zip(first_empty..)
        .map(|(&src, dst)| (src, dst))
        .collect()
}
