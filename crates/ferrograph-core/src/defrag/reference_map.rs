//! Static map of pointer fields per store
//!
//! For every store kind, lists the byte offsets of fields holding record
//! indices and the store those indices point into. Property payloads and
//! string array elements are pointers only for some type tags and are
//! resolved against the record bytes.

use crate::storage::records::PropertyType;
use crate::storage::{Index, StoreKind};

/// Width of a pointer field on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldWidth {
    /// 4-byte index
    U32,
    /// 8-byte property payload
    U64,
}

impl FieldWidth {
    /// Bytes occupied by the field
    pub fn size(self) -> usize {
        match self {
            FieldWidth::U32 => 4,
            FieldWidth::U64 => 8,
        }
    }
}

/// Store a pointer field refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldTarget {
    /// Always a pointer into this store
    Store(StoreKind),
    /// Property payload: string store for `string`, array store for array tags,
    /// a literal otherwise
    PropertyPayload,
    /// String-store indices held as elements of a `string[]` array block
    StringArrayElements,
}

/// One pointer-holding field of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointerField {
    /// Byte offset within the record
    pub offset: usize,
    /// Field width
    pub width: FieldWidth,
    /// What the field points into
    pub target: FieldTarget,
}

const fn index_field(offset: usize, kind: StoreKind) -> PointerField {
    PointerField {
        offset,
        width: FieldWidth::U32,
        target: FieldTarget::Store(kind),
    }
}

const NODE_FIELDS: &[PointerField] = &[
    index_field(1, StoreKind::Relationship),
    index_field(5, StoreKind::Property),
    index_field(9, StoreKind::Type),
];

const RELATIONSHIP_FIELDS: &[PointerField] = &[
    index_field(1, StoreKind::Node),
    index_field(5, StoreKind::Node),
    index_field(9, StoreKind::Type),
    index_field(13, StoreKind::Relationship),
    index_field(17, StoreKind::Relationship),
    index_field(21, StoreKind::Relationship),
    index_field(25, StoreKind::Relationship),
    index_field(29, StoreKind::Property),
];

const PROPERTY_FIELDS: &[PointerField] = &[
    index_field(5, StoreKind::SchemaName),
    index_field(9, StoreKind::Property),
    index_field(13, StoreKind::Property),
    PointerField {
        offset: 17,
        width: FieldWidth::U64,
        target: FieldTarget::PropertyPayload,
    },
];

const TYPE_FIELDS: &[PointerField] = &[
    index_field(1, StoreKind::TypeName),
    index_field(5, StoreKind::TypeSchema),
];

const TYPE_SCHEMA_FIELDS: &[PointerField] = &[
    index_field(1, StoreKind::SchemaName),
    index_field(9, StoreKind::TypeSchema),
];

const TYPE_NAME_FIELDS: &[PointerField] = &[
    index_field(1, StoreKind::TypeName),
    index_field(9, StoreKind::TypeName),
];

const SCHEMA_NAME_FIELDS: &[PointerField] = &[
    index_field(1, StoreKind::SchemaName),
    index_field(9, StoreKind::SchemaName),
];

const STRING_FIELDS: &[PointerField] = &[
    index_field(1, StoreKind::String),
    index_field(9, StoreKind::String),
];

const ARRAY_FIELDS: &[PointerField] = &[
    index_field(2, StoreKind::Array),
    index_field(14, StoreKind::Array),
    PointerField {
        offset: 18,
        width: FieldWidth::U32,
        target: FieldTarget::StringArrayElements,
    },
];

/// Property type tag offset within a property record
const PROPERTY_TYPE_OFFSET: usize = 1;
/// Element type offset within an array block
const ARRAY_ELEMENT_TYPE_OFFSET: usize = 1;
/// Element count offset within an array block
const ARRAY_AMOUNT_OFFSET: usize = 6;

/// Pointer fields of records in `kind`
pub fn pointer_fields(kind: StoreKind) -> &'static [PointerField] {
    match kind {
        StoreKind::Node => NODE_FIELDS,
        StoreKind::Relationship => RELATIONSHIP_FIELDS,
        StoreKind::Property => PROPERTY_FIELDS,
        StoreKind::Type => TYPE_FIELDS,
        StoreKind::TypeSchema => TYPE_SCHEMA_FIELDS,
        StoreKind::TypeName => TYPE_NAME_FIELDS,
        StoreKind::SchemaName => SCHEMA_NAME_FIELDS,
        StoreKind::String => STRING_FIELDS,
        StoreKind::Array => ARRAY_FIELDS,
    }
}

impl FieldTarget {
    /// Stores this field may point into
    fn may_target(self, kind: StoreKind) -> bool {
        match self {
            FieldTarget::Store(target) => target == kind,
            FieldTarget::PropertyPayload => matches!(kind, StoreKind::String | StoreKind::Array),
            FieldTarget::StringArrayElements => kind == StoreKind::String,
        }
    }
}

/// Other stores holding pointers into `kind`
pub fn referrers_of(kind: StoreKind) -> Vec<StoreKind> {
    StoreKind::ALL
        .into_iter()
        .filter(|other| *other != kind)
        .filter(|other| {
            pointer_fields(*other)
                .iter()
                .any(|field| field.target.may_target(kind))
        })
        .collect()
}

/// Byte positions in a `record_kind` record that hold pointers into `target`
pub fn pointer_slots(
    record_kind: StoreKind,
    bytes: &[u8],
    target: StoreKind,
) -> Vec<(usize, FieldWidth)> {
    let mut slots = Vec::new();
    for field in pointer_fields(record_kind) {
        match field.target {
            FieldTarget::Store(kind) if kind == target => slots.push((field.offset, field.width)),
            FieldTarget::Store(_) => {}
            FieldTarget::PropertyPayload => {
                let Some(tag) = read_pointer(bytes, PROPERTY_TYPE_OFFSET, FieldWidth::U32) else {
                    continue;
                };
                let Ok(property_type) = PropertyType::from_tag(tag as u32) else {
                    continue;
                };
                let points_here = match target {
                    StoreKind::String => property_type.is_string(),
                    StoreKind::Array => property_type.is_array(),
                    _ => false,
                };
                if points_here {
                    slots.push((field.offset, field.width));
                }
            }
            FieldTarget::StringArrayElements => {
                if target != StoreKind::String
                    || bytes.get(ARRAY_ELEMENT_TYPE_OFFSET).copied()
                        != Some(PropertyType::String.tag() as u8)
                {
                    continue;
                }
                let amount =
                    read_pointer(bytes, ARRAY_AMOUNT_OFFSET, FieldWidth::U32).unwrap_or(0) as usize;
                for element in 0..amount {
                    let offset = field.offset + element * FieldWidth::U32.size();
                    if offset + FieldWidth::U32.size() <= bytes.len() {
                        slots.push((offset, FieldWidth::U32));
                    }
                }
            }
        }
    }
    slots
}

/// Read a pointer field; `None` if it lies outside `bytes`
pub fn read_pointer(bytes: &[u8], offset: usize, width: FieldWidth) -> Option<u64> {
    let raw = bytes.get(offset..offset + width.size())?;
    Some(match width {
        FieldWidth::U32 => u32::from_ne_bytes([raw[0], raw[1], raw[2], raw[3]]) as u64,
        FieldWidth::U64 => {
            let mut buf = [0u8; 8];
            buf.copy_from_slice(raw);
            u64::from_ne_bytes(buf)
        }
    })
}

/// Overwrite a pointer field with `index`
pub fn write_pointer(bytes: &mut [u8], offset: usize, width: FieldWidth, index: Index) {
    match width {
        FieldWidth::U32 => bytes[offset..offset + 4].copy_from_slice(&index.to_ne_bytes()),
        FieldWidth::U64 => bytes[offset..offset + 8].copy_from_slice(&(index as u64).to_ne_bytes()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::record_store::Record;
    use crate::storage::records::{ArrayBlock, Payload, Property};

    #[test]
    fn test_referrers() {
        assert_eq!(
            referrers_of(StoreKind::Property),
            vec![StoreKind::Node, StoreKind::Relationship]
        );
        assert_eq!(
            referrers_of(StoreKind::String),
            vec![StoreKind::Property, StoreKind::Array]
        );
        assert_eq!(
            referrers_of(StoreKind::SchemaName),
            vec![StoreKind::Property, StoreKind::TypeSchema]
        );
        assert_eq!(
            referrers_of(StoreKind::Type),
            vec![StoreKind::Node, StoreKind::Relationship]
        );
        assert_eq!(referrers_of(StoreKind::Array), vec![StoreKind::Property]);
        assert!(referrers_of(StoreKind::Node).contains(&StoreKind::Relationship));
    }

    #[test]
    fn test_property_payload_depends_on_tag() {
        let mut buf = [0u8; Property::SIZE];
        Property::new(1, PropertyType::String, 2, Payload::StringRef(7))
            .encode(&mut buf)
            .unwrap();
        assert_eq!(
            pointer_slots(StoreKind::Property, &buf, StoreKind::String),
            vec![(17, FieldWidth::U64)]
        );
        assert!(pointer_slots(StoreKind::Property, &buf, StoreKind::Array).is_empty());

        Property::new(1, PropertyType::Int, 2, Payload::Inline(7))
            .encode(&mut buf)
            .unwrap();
        assert!(pointer_slots(StoreKind::Property, &buf, StoreKind::String).is_empty());
        assert_eq!(
            pointer_slots(StoreKind::Property, &buf, StoreKind::SchemaName),
            vec![(5, FieldWidth::U32)]
        );
    }

    #[test]
    fn test_string_array_elements() {
        let block = ArrayBlock {
            index: 1,
            in_use: true,
            element_type: PropertyType::String,
            prev: 0,
            amount: 2,
            total_blocks: 1,
            next: 0,
            data: [5u32, 9].iter().flat_map(|v| v.to_ne_bytes()).collect(),
        };
        let mut buf = vec![0u8; ArrayBlock::record_size(16)];
        block.encode(&mut buf).unwrap();

        let slots = pointer_slots(StoreKind::Array, &buf, StoreKind::String);
        assert_eq!(slots, vec![(18, FieldWidth::U32), (22, FieldWidth::U32)]);
        assert_eq!(read_pointer(&buf, 22, FieldWidth::U32), Some(9));
        assert_eq!(
            pointer_slots(StoreKind::Array, &buf, StoreKind::Array),
            vec![(2, FieldWidth::U32), (14, FieldWidth::U32)]
        );
    }

    #[test]
    fn test_int_array_elements_are_literals() {
        let block = ArrayBlock {
            index: 1,
            in_use: true,
            element_type: PropertyType::Int,
            prev: 0,
            amount: 2,
            total_blocks: 1,
            next: 0,
            data: [5i32, 9].iter().flat_map(|v| v.to_ne_bytes()).collect(),
        };
        let mut buf = vec![0u8; ArrayBlock::record_size(16)];
        block.encode(&mut buf).unwrap();
        assert!(pointer_slots(StoreKind::Array, &buf, StoreKind::String).is_empty());
    }

    #[test]
    fn test_pointer_round_trip() {
        let mut buf = [0u8; 25];
        write_pointer(&mut buf, 17, FieldWidth::U64, 42);
        assert_eq!(read_pointer(&buf, 17, FieldWidth::U64), Some(42));
        write_pointer(&mut buf, 5, FieldWidth::U32, 3);
        assert_eq!(read_pointer(&buf, 5, FieldWidth::U32), Some(3));
        assert_eq!(read_pointer(&buf, 22, FieldWidth::U64), None);
    }
}
