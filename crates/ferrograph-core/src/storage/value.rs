//! Typed property values
//!
//! Primitive values are packed into the 8-byte property payload; strings and
//! arrays live in the dynamic stores and are referenced by index.

use super::records::PropertyType;
use crate::{Error, Result};
use std::fmt;

/// A property value together with its type
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    /// 32-bit signed integer
    Int(i32),
    /// 64-bit signed integer
    Long(i64),
    /// Boolean
    Bool(bool),
    /// 16-bit signed integer
    Short(i16),
    /// Unicode scalar value
    Char(char),
    /// 32-bit float
    Float(f32),
    /// 64-bit float
    Double(f64),
    /// UTF-8 string
    String(String),
    /// Homogeneous array
    Array(ArrayValue),
}

impl PropertyValue {
    /// Type tag of this value
    pub fn property_type(&self) -> PropertyType {
        match self {
            PropertyValue::Int(_) => PropertyType::Int,
            PropertyValue::Long(_) => PropertyType::Long,
            PropertyValue::Bool(_) => PropertyType::Bool,
            PropertyValue::Short(_) => PropertyType::Short,
            PropertyValue::Char(_) => PropertyType::Char,
            PropertyValue::Float(_) => PropertyType::Float,
            PropertyValue::Double(_) => PropertyType::Double,
            PropertyValue::String(_) => PropertyType::String,
            PropertyValue::Array(array) => array.property_type(),
        }
    }

    /// Inline payload bits of a primitive value
    pub fn to_inline(&self) -> Option<u64> {
        Some(match self {
            PropertyValue::Int(v) => *v as i64 as u64,
            PropertyValue::Long(v) => *v as u64,
            PropertyValue::Bool(v) => *v as u64,
            PropertyValue::Short(v) => *v as i64 as u64,
            PropertyValue::Char(v) => *v as u64,
            PropertyValue::Float(v) => (*v as f64).to_bits(),
            PropertyValue::Double(v) => v.to_bits(),
            PropertyValue::String(_) | PropertyValue::Array(_) => return None,
        })
    }

    /// Zero value of a declared type: 0, false, '\0', "" or an empty array
    pub fn default_for(property_type: PropertyType) -> Result<Self> {
        Ok(match property_type {
            PropertyType::Int => PropertyValue::Int(0),
            PropertyType::Long => PropertyValue::Long(0),
            PropertyType::Bool => PropertyValue::Bool(false),
            PropertyType::Short => PropertyValue::Short(0),
            PropertyType::Char => PropertyValue::Char('\0'),
            PropertyType::Float => PropertyValue::Float(0.0),
            PropertyType::Double => PropertyValue::Double(0.0),
            PropertyType::String => PropertyValue::String(String::new()),
            PropertyType::Undefined => {
                return Err(Error::type_mismatch("a defined property type", property_type));
            }
            array => {
                let element_type = array
                    .base_type()
                    .ok_or_else(|| Error::type_mismatch("array type", array))?;
                PropertyValue::Array(ArrayValue::empty(element_type)?)
            }
        })
    }

    /// Decode inline payload bits of a primitive type
    pub fn from_inline(property_type: PropertyType, bits: u64) -> Result<Self> {
        Ok(match property_type {
            PropertyType::Int => PropertyValue::Int(bits as i64 as i32),
            PropertyType::Long => PropertyValue::Long(bits as i64),
            PropertyType::Bool => PropertyValue::Bool(bits != 0),
            PropertyType::Short => PropertyValue::Short(bits as i64 as i16),
            PropertyType::Char => PropertyValue::Char(
                u32::try_from(bits)
                    .ok()
                    .and_then(char::from_u32)
                    .ok_or_else(|| Error::corruption(format!("Invalid char payload {bits:#x}")))?,
            ),
            PropertyType::Float => PropertyValue::Float(f64::from_bits(bits) as f32),
            PropertyType::Double => PropertyValue::Double(f64::from_bits(bits)),
            other => {
                return Err(Error::type_mismatch("primitive type", other));
            }
        })
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Int(v) => write!(f, "{v}"),
            PropertyValue::Long(v) => write!(f, "{v}"),
            PropertyValue::Bool(v) => write!(f, "{v}"),
            PropertyValue::Short(v) => write!(f, "{v}"),
            PropertyValue::Char(v) => write!(f, "'{v}'"),
            PropertyValue::Float(v) => write!(f, "{v}"),
            PropertyValue::Double(v) => write!(f, "{v}"),
            PropertyValue::String(v) => write!(f, "{v:?}"),
            PropertyValue::Array(v) => write!(f, "{v}"),
        }
    }
}

/// Array property value, one variant per element type
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayValue {
    /// `int[]`
    Int(Vec<i32>),
    /// `long[]`
    Long(Vec<i64>),
    /// `bool[]`
    Bool(Vec<bool>),
    /// `short[]`
    Short(Vec<i16>),
    /// `char[]`
    Char(Vec<char>),
    /// `float[]`
    Float(Vec<f32>),
    /// `double[]`
    Double(Vec<f64>),
    /// `string[]`
    String(Vec<String>),
}

impl ArrayValue {
    /// Element type
    pub fn element_type(&self) -> PropertyType {
        match self {
            ArrayValue::Int(_) => PropertyType::Int,
            ArrayValue::Long(_) => PropertyType::Long,
            ArrayValue::Bool(_) => PropertyType::Bool,
            ArrayValue::Short(_) => PropertyType::Short,
            ArrayValue::Char(_) => PropertyType::Char,
            ArrayValue::Float(_) => PropertyType::Float,
            ArrayValue::Double(_) => PropertyType::Double,
            ArrayValue::String(_) => PropertyType::String,
        }
    }

    /// Array type tag
    pub fn property_type(&self) -> PropertyType {
        match self {
            ArrayValue::Int(_) => PropertyType::IntArray,
            ArrayValue::Long(_) => PropertyType::LongArray,
            ArrayValue::Bool(_) => PropertyType::BoolArray,
            ArrayValue::Short(_) => PropertyType::ShortArray,
            ArrayValue::Char(_) => PropertyType::CharArray,
            ArrayValue::Float(_) => PropertyType::FloatArray,
            ArrayValue::Double(_) => PropertyType::DoubleArray,
            ArrayValue::String(_) => PropertyType::StringArray,
        }
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        match self {
            ArrayValue::Int(v) => v.len(),
            ArrayValue::Long(v) => v.len(),
            ArrayValue::Bool(v) => v.len(),
            ArrayValue::Short(v) => v.len(),
            ArrayValue::Char(v) => v.len(),
            ArrayValue::Float(v) => v.len(),
            ArrayValue::Double(v) => v.len(),
            ArrayValue::String(v) => v.len(),
        }
    }

    /// Whether the array has no elements
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Empty array of the given element type
    pub fn empty(element_type: PropertyType) -> Result<Self> {
        Ok(match element_type {
            PropertyType::Int => ArrayValue::Int(Vec::new()),
            PropertyType::Long => ArrayValue::Long(Vec::new()),
            PropertyType::Bool => ArrayValue::Bool(Vec::new()),
            PropertyType::Short => ArrayValue::Short(Vec::new()),
            PropertyType::Char => ArrayValue::Char(Vec::new()),
            PropertyType::Float => ArrayValue::Float(Vec::new()),
            PropertyType::Double => ArrayValue::Double(Vec::new()),
            PropertyType::String => ArrayValue::String(Vec::new()),
            other => return Err(Error::type_mismatch("array element type", other)),
        })
    }

    /// Encoded elements of a non-string array, native byte order
    ///
    /// String arrays are stored as string-store indices and are encoded by
    /// the array store itself.
    pub fn encode_elements(&self) -> Option<Vec<u8>> {
        Some(match self {
            ArrayValue::Int(v) => v.iter().flat_map(|x| x.to_ne_bytes()).collect(),
            ArrayValue::Long(v) => v.iter().flat_map(|x| x.to_ne_bytes()).collect(),
            ArrayValue::Bool(v) => v.iter().map(|x| *x as u8).collect(),
            ArrayValue::Short(v) => v.iter().flat_map(|x| x.to_ne_bytes()).collect(),
            ArrayValue::Char(v) => v.iter().flat_map(|x| (*x as u32).to_ne_bytes()).collect(),
            ArrayValue::Float(v) => v.iter().flat_map(|x| x.to_ne_bytes()).collect(),
            ArrayValue::Double(v) => v.iter().flat_map(|x| x.to_ne_bytes()).collect(),
            ArrayValue::String(_) => return None,
        })
    }

    /// Decode elements of a non-string array
    pub fn decode_elements(element_type: PropertyType, bytes: &[u8]) -> Result<Self> {
        fn chunks<const N: usize>(bytes: &[u8]) -> impl Iterator<Item = [u8; N]> + '_ {
            bytes.chunks_exact(N).map(|chunk| {
                let mut raw = [0u8; N];
                raw.copy_from_slice(chunk);
                raw
            })
        }

        Ok(match element_type {
            PropertyType::Int => ArrayValue::Int(chunks::<4>(bytes).map(i32::from_ne_bytes).collect()),
            PropertyType::Long => {
                ArrayValue::Long(chunks::<8>(bytes).map(i64::from_ne_bytes).collect())
            }
            PropertyType::Bool => ArrayValue::Bool(bytes.iter().map(|b| *b != 0).collect()),
            PropertyType::Short => {
                ArrayValue::Short(chunks::<2>(bytes).map(i16::from_ne_bytes).collect())
            }
            PropertyType::Char => ArrayValue::Char(
                chunks::<4>(bytes)
                    .map(|raw| {
                        let code = u32::from_ne_bytes(raw);
                        char::from_u32(code)
                            .ok_or_else(|| Error::corruption(format!("Invalid char element {code:#x}")))
                    })
                    .collect::<Result<_>>()?,
            ),
            PropertyType::Float => {
                ArrayValue::Float(chunks::<4>(bytes).map(f32::from_ne_bytes).collect())
            }
            PropertyType::Double => {
                ArrayValue::Double(chunks::<8>(bytes).map(f64::from_ne_bytes).collect())
            }
            other => return Err(Error::type_mismatch("primitive element type", other)),
        })
    }

    /// Whether every element of `items` occurs in this array
    ///
    /// Arrays of different element types never contain each other's items.
    pub fn contains_all(&self, items: &ArrayValue) -> bool {
        fn all_in<T: PartialEq>(haystack: &[T], needles: &[T]) -> bool {
            needles.iter().all(|needle| haystack.contains(needle))
        }

        match (self, items) {
            (ArrayValue::Int(a), ArrayValue::Int(b)) => all_in(a, b),
            (ArrayValue::Long(a), ArrayValue::Long(b)) => all_in(a, b),
            (ArrayValue::Bool(a), ArrayValue::Bool(b)) => all_in(a, b),
            (ArrayValue::Short(a), ArrayValue::Short(b)) => all_in(a, b),
            (ArrayValue::Char(a), ArrayValue::Char(b)) => all_in(a, b),
            (ArrayValue::Float(a), ArrayValue::Float(b)) => all_in(a, b),
            (ArrayValue::Double(a), ArrayValue::Double(b)) => all_in(a, b),
            (ArrayValue::String(a), ArrayValue::String(b)) => all_in(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for ArrayValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArrayValue::Int(v) => write!(f, "{v:?}"),
            ArrayValue::Long(v) => write!(f, "{v:?}"),
            ArrayValue::Bool(v) => write!(f, "{v:?}"),
            ArrayValue::Short(v) => write!(f, "{v:?}"),
            ArrayValue::Char(v) => write!(f, "{v:?}"),
            ArrayValue::Float(v) => write!(f, "{v:?}"),
            ArrayValue::Double(v) => write!(f, "{v:?}"),
            ArrayValue::String(v) => write!(f, "{v:?}"),
        }
    }
}
