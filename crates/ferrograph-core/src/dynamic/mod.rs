//! Dynamic value store - strings and arrays stored as block chains
//!
//! Values too large for the 8-byte property payload are written to one of
//! two block stores; the property keeps only the index of the first block.
//! Every chain is doubly linked (`prev`/`next`) and its head has `prev == 0`.

pub mod array_store;
pub mod chain;
pub mod string_store;

pub use array_store::ArrayStore;
pub use chain::ChainBlock;
pub use string_store::StringStore;

use crate::storage::records::{Payload, PropertyType};
use crate::storage::value::PropertyValue;
use crate::{Error, Result};

/// String and array stores holding property values
#[derive(Debug)]
pub struct ValueStore {
    /// String values and string array elements
    pub strings: StringStore,
    /// Array values
    pub arrays: ArrayStore,
}

impl ValueStore {
    /// Group an opened string and array store
    pub fn new(strings: StringStore, arrays: ArrayStore) -> Self {
        Self { strings, arrays }
    }

    /// Property payload for `value`, writing it to a dynamic store if needed
    pub fn write_value(&mut self, value: &PropertyValue) -> Result<Payload> {
        match value {
            PropertyValue::String(text) => Ok(Payload::StringRef(self.strings.write_str(text)?)),
            PropertyValue::Array(array) => {
                Ok(Payload::ArrayRef(self.arrays.write(&mut self.strings, array)?))
            }
            primitive => primitive
                .to_inline()
                .map(Payload::Inline)
                .ok_or_else(|| Error::type_mismatch("primitive value", primitive.property_type())),
        }
    }

    /// Value of a property payload; `None` if its dynamic chain is broken
    pub fn read_value(
        &self,
        property_type: PropertyType,
        payload: Payload,
    ) -> Result<Option<PropertyValue>> {
        match payload {
            Payload::Inline(bits) => PropertyValue::from_inline(property_type, bits).map(Some),
            Payload::StringRef(start) => {
                Ok(self.strings.read_str(start)?.map(PropertyValue::String))
            }
            Payload::ArrayRef(start) => {
                let Some(array) = self.arrays.read(&self.strings, start)? else {
                    return Ok(None);
                };
                if array.property_type() != property_type {
                    return Err(Error::type_mismatch(property_type, array.property_type()));
                }
                Ok(Some(PropertyValue::Array(array)))
            }
        }
    }

    /// Payload holding `value` in place of `old`
    ///
    /// Dynamic values are rewritten in place so the payload index is kept.
    pub fn update_value(&mut self, old: Payload, value: &PropertyValue) -> Result<Payload> {
        match (old, value) {
            (Payload::StringRef(start), PropertyValue::String(text)) => {
                self.strings.update_str(start, text)?;
                Ok(old)
            }
            (Payload::ArrayRef(start), PropertyValue::Array(array)) => {
                self.arrays.update(&mut self.strings, start, array)?;
                Ok(old)
            }
            (Payload::Inline(_), _) => self.write_value(value),
            (old, value) => Err(Error::type_mismatch(
                format!("{old:?}"),
                value.property_type(),
            )),
        }
    }

    /// Free the dynamic chain behind a payload; inline payloads are a no-op
    pub fn delete_value(&mut self, payload: Payload) -> Result<bool> {
        match payload {
            Payload::Inline(_) => Ok(true),
            Payload::StringRef(start) => self.strings.delete(start),
            Payload::ArrayRef(start) => self.arrays.delete(&mut self.strings, start),
        }
    }

    /// Flush both stores to disk
    pub fn sync(&self) -> Result<()> {
        self.strings.sync()?;
        self.arrays.sync()
    }
}
