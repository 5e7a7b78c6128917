use indexmap::IndexMap;

use crate::value::Value;

/// A record: an id plus an order-preserving key/value map.
///
/// Insertion order is kept (not just incidental `IndexMap` behavior but
/// relied upon) because re-encoding a record onto the wire should put its
/// fields back in the order they were last written, so round-tripping a
/// line through `codec::decode_line`/`codec::encode_line` is stable.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    pub id: String,
    pub fields: IndexMap<String, Value>,
}

impl Record {
    pub fn new(id: impl Into<String>) -> Self {
        Record {
            id: id.into(),
            fields: IndexMap::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Merges `payload` into this record, last-write-wins per key.
    pub fn merge(&mut self, payload: impl IntoIterator<Item = (String, Value)>) {
        for (key, value) in payload {
            self.fields.insert(key, value);
        }
    }
}
