//! Property records and property type tags

use super::{in_use_flags, read_layout, write_layout};
use crate::storage::record_store::{IN_USE_FLAG, Record};
use crate::storage::{Index, NULL_INDEX, StoreKind};
use crate::{Error, Result};
use bytemuck::{Pod, Zeroable};
use std::fmt;
use std::str::FromStr;

/// Offset between a primitive/string tag and its array tag
const ARRAY_TAG_OFFSET: u32 = 8;

/// Property value types; the numeric tags are part of the file format
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyType {
    /// No type
    Undefined = 0,
    /// 32-bit signed integer
    Int = 1,
    /// 64-bit signed integer
    Long = 2,
    /// Boolean
    Bool = 3,
    /// 16-bit signed integer
    Short = 4,
    /// Unicode scalar value
    Char = 5,
    /// 32-bit float
    Float = 6,
    /// 64-bit float
    Double = 7,
    /// UTF-8 string in the string store
    String = 8,
    /// Array of `Int`
    IntArray = 9,
    /// Array of `Long`
    LongArray = 10,
    /// Array of `Bool`
    BoolArray = 11,
    /// Array of `Short`
    ShortArray = 12,
    /// Array of `Char`
    CharArray = 13,
    /// Array of `Float`
    FloatArray = 14,
    /// Array of `Double`
    DoubleArray = 15,
    /// Array of `String`
    StringArray = 16,
}

impl PropertyType {
    /// Numeric tag
    pub fn tag(self) -> u32 {
        self as u32
    }

    /// Type for a numeric tag
    pub fn from_tag(tag: u32) -> Result<Self> {
        Ok(match tag {
            0 => PropertyType::Undefined,
            1 => PropertyType::Int,
            2 => PropertyType::Long,
            3 => PropertyType::Bool,
            4 => PropertyType::Short,
            5 => PropertyType::Char,
            6 => PropertyType::Float,
            7 => PropertyType::Double,
            8 => PropertyType::String,
            9 => PropertyType::IntArray,
            10 => PropertyType::LongArray,
            11 => PropertyType::BoolArray,
            12 => PropertyType::ShortArray,
            13 => PropertyType::CharArray,
            14 => PropertyType::FloatArray,
            15 => PropertyType::DoubleArray,
            16 => PropertyType::StringArray,
            other => return Err(Error::corruption(format!("Unknown property type tag {other}"))),
        })
    }

    /// Stored inline in the property payload
    pub fn is_primitive(self) -> bool {
        (PropertyType::Int.tag()..=PropertyType::Double.tag()).contains(&self.tag())
    }

    /// Stored in the string store
    pub fn is_string(self) -> bool {
        self == PropertyType::String
    }

    /// Stored in the array store
    pub fn is_array(self) -> bool {
        self.tag() >= PropertyType::IntArray.tag()
    }

    /// Element type of an array type
    pub fn base_type(self) -> Option<Self> {
        if self.is_array() {
            Self::from_tag(self.tag() - ARRAY_TAG_OFFSET).ok()
        } else {
            None
        }
    }

    /// Array type holding elements of this type
    pub fn array_type(self) -> Option<Self> {
        if self.is_primitive() || self.is_string() {
            Self::from_tag(self.tag() + ARRAY_TAG_OFFSET).ok()
        } else {
            None
        }
    }

    /// Bytes one element of this type takes inside an array block
    pub fn element_size(self) -> Option<usize> {
        match self {
            PropertyType::Bool => Some(1),
            PropertyType::Short => Some(2),
            PropertyType::Int
            | PropertyType::Float
            | PropertyType::Char
            | PropertyType::String => Some(4),
            PropertyType::Long | PropertyType::Double => Some(8),
            _ => None,
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PropertyType::Undefined => "undefined",
            PropertyType::Int => "int",
            PropertyType::Long => "long",
            PropertyType::Bool => "bool",
            PropertyType::Short => "short",
            PropertyType::Char => "char",
            PropertyType::Float => "float",
            PropertyType::Double => "double",
            PropertyType::String => "string",
            PropertyType::IntArray => "int[]",
            PropertyType::LongArray => "long[]",
            PropertyType::BoolArray => "bool[]",
            PropertyType::ShortArray => "short[]",
            PropertyType::CharArray => "char[]",
            PropertyType::FloatArray => "float[]",
            PropertyType::DoubleArray => "double[]",
            PropertyType::StringArray => "string[]",
        };
        f.write_str(name)
    }
}

impl FromStr for PropertyType {
    type Err = Error;

    /// Accepts `int`, `int[]` and `intArray` spellings
    fn from_str(s: &str) -> Result<Self> {
        let (base, is_array) = if let Some(base) = s.strip_suffix("[]") {
            (base, true)
        } else if let Some(base) = s.strip_suffix("Array") {
            (base, true)
        } else {
            (s, false)
        };

        let base_type = match base {
            "int" => PropertyType::Int,
            "long" => PropertyType::Long,
            "bool" | "boolean" => PropertyType::Bool,
            "short" => PropertyType::Short,
            "char" => PropertyType::Char,
            "float" => PropertyType::Float,
            "double" => PropertyType::Double,
            "string" => PropertyType::String,
            _ => return Err(Error::storage(format!("Unknown property type '{s}'"))),
        };

        if is_array {
            base_type
                .array_type()
                .ok_or_else(|| Error::storage(format!("Unknown property type '{s}'")))
        } else {
            Ok(base_type)
        }
    }
}

/// Property payload: either the value itself or a pointer into a dynamic store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Payload {
    /// Primitive value bits
    Inline(u64),
    /// Head block of a string chain
    StringRef(Index),
    /// Head block of an array chain
    ArrayRef(Index),
}

impl Payload {
    /// Interpret raw payload bits according to the property type
    pub fn from_raw(property_type: PropertyType, raw: u64) -> Result<Self> {
        if property_type.is_string() || property_type.is_array() {
            let index = Index::try_from(raw).map_err(|_| {
                Error::corruption(format!("{property_type} payload {raw} is not a record index"))
            })?;
            Ok(if property_type.is_string() {
                Payload::StringRef(index)
            } else {
                Payload::ArrayRef(index)
            })
        } else {
            Ok(Payload::Inline(raw))
        }
    }

    /// Raw payload bits
    pub fn raw(self) -> u64 {
        match self {
            Payload::Inline(bits) => bits,
            Payload::StringRef(index) | Payload::ArrayRef(index) => index as u64,
        }
    }

    /// Dynamic store pointer, if any
    pub fn dynamic_ref(self) -> Option<Index> {
        match self {
            Payload::Inline(_) => None,
            Payload::StringRef(index) | Payload::ArrayRef(index) => Some(index),
        }
    }

    fn matches(self, property_type: PropertyType) -> bool {
        match self {
            Payload::Inline(_) => !property_type.is_string() && !property_type.is_array(),
            Payload::StringRef(_) => property_type.is_string(),
            Payload::ArrayRef(_) => property_type.is_array(),
        }
    }
}

#[repr(C, packed)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct PropertyLayout {
    flags: u8,
    type_tag: u32,
    name_ref: u32,
    prev: u32,
    next: u32,
    payload: u64,
}

/// Property record (25 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Property {
    /// Index in the property store
    pub index: Index,
    /// Live flag
    pub in_use: bool,
    /// Value type
    pub property_type: PropertyType,
    /// Name block in the schema name store
    pub name_ref: Index,
    /// Previous property of the owner
    pub prev: Index,
    /// Next property of the owner
    pub next: Index,
    /// Value or dynamic store pointer
    pub payload: Payload,
}

impl Property {
    /// Encoded size in bytes
    pub const SIZE: usize = std::mem::size_of::<PropertyLayout>();

    /// Live, unlinked property
    pub fn new(index: Index, property_type: PropertyType, name_ref: Index, payload: Payload) -> Self {
        Self {
            index,
            in_use: true,
            property_type,
            name_ref,
            prev: NULL_INDEX,
            next: NULL_INDEX,
            payload,
        }
    }
}

impl Record for Property {
    const KIND: StoreKind = StoreKind::Property;

    fn index(&self) -> Index {
        self.index
    }

    fn in_use(&self) -> bool {
        self.in_use
    }

    fn encode(&self, buf: &mut [u8]) -> Result<()> {
        if !self.payload.matches(self.property_type) {
            return Err(Error::type_mismatch(
                self.property_type,
                format!("{:?}", self.payload),
            ));
        }

        let layout = PropertyLayout {
            flags: in_use_flags(self.in_use),
            type_tag: self.property_type.tag(),
            name_ref: self.name_ref,
            prev: self.prev,
            next: self.next,
            payload: self.payload.raw(),
        };
        write_layout(Self::KIND, &layout, buf)
    }

    fn decode(index: Index, bytes: &[u8]) -> Result<Self> {
        let layout: PropertyLayout = read_layout(Self::KIND, bytes)?;
        let property_type = PropertyType::from_tag(layout.type_tag)?;
        Ok(Self {
            index,
            in_use: layout.flags & IN_USE_FLAG != 0,
            property_type,
            name_ref: layout.name_ref,
            prev: layout.prev,
            next: layout.next,
            payload: Payload::from_raw(property_type, layout.payload)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_record_size() {
        assert_eq!(Property::SIZE, 25);
    }

    #[test]
    fn test_type_classification() {
        assert!(PropertyType::Double.is_primitive());
        assert!(!PropertyType::String.is_primitive());
        assert!(PropertyType::String.is_string());
        assert!(PropertyType::StringArray.is_array());
        assert!(!PropertyType::Undefined.is_primitive());
        assert!(!PropertyType::Undefined.is_array());

        assert_eq!(PropertyType::CharArray.base_type(), Some(PropertyType::Char));
        assert_eq!(PropertyType::String.array_type(), Some(PropertyType::StringArray));
        assert_eq!(PropertyType::IntArray.array_type(), None);
        assert_eq!(PropertyType::Int.base_type(), None);
    }

    #[test]
    fn test_tags_are_stable() {
        assert_eq!(PropertyType::Int.tag(), 1);
        assert_eq!(PropertyType::String.tag(), 8);
        assert_eq!(PropertyType::StringArray.tag(), 16);
        assert!(PropertyType::from_tag(17).is_err());
    }

    #[test]
    fn test_parse_type_names() {
        assert_eq!("int".parse::<PropertyType>().unwrap(), PropertyType::Int);
        assert_eq!("int[]".parse::<PropertyType>().unwrap(), PropertyType::IntArray);
        assert_eq!("intArray".parse::<PropertyType>().unwrap(), PropertyType::IntArray);
        assert_eq!(
            "string[]".parse::<PropertyType>().unwrap(),
            PropertyType::StringArray
        );
        assert!("integer".parse::<PropertyType>().is_err());
        assert!("[]".parse::<PropertyType>().is_err());

        for tag in 1..=16 {
            let ty = PropertyType::from_tag(tag).unwrap();
            assert_eq!(ty.to_string().parse::<PropertyType>().unwrap(), ty);
        }
    }

    #[test]
    fn test_payload_offsets() {
        let mut prop = Property::new(2, PropertyType::Long, 3, Payload::Inline((-5i64) as u64));
        prop.prev = 1;
        prop.next = 4;

        let mut buf = [0u8; Property::SIZE];
        prop.encode(&mut buf).unwrap();
        assert_eq!(&buf[1..5], &PropertyType::Long.tag().to_ne_bytes());
        assert_eq!(&buf[5..9], &3u32.to_ne_bytes());
        assert_eq!(&buf[9..13], &1u32.to_ne_bytes());
        assert_eq!(&buf[13..17], &4u32.to_ne_bytes());
        assert_eq!(&buf[17..25], &(-5i64).to_ne_bytes());
        assert_eq!(Property::decode(2, &buf).unwrap(), prop);
    }

    #[test]
    fn test_payload_must_match_type() {
        let prop = Property::new(1, PropertyType::String, 1, Payload::Inline(3));
        let mut buf = [0u8; Property::SIZE];
        assert!(matches!(
            prop.encode(&mut buf),
            Err(Error::TypeMismatch { .. })
        ));

        let prop = Property::new(1, PropertyType::String, 1, Payload::StringRef(3));
        prop.encode(&mut buf).unwrap();
        assert_eq!(
            Property::decode(1, &buf).unwrap().payload,
            Payload::StringRef(3)
        );
    }
}
