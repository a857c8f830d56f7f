//! Defragmentation - compaction of record stores with pointer fix-up

pub mod defragmenter;
pub mod reference_map;

pub use defragmenter::{DefragReport, Defragmenter};
pub use reference_map::{FieldTarget, FieldWidth, PointerField, pointer_fields, referrers_of};
