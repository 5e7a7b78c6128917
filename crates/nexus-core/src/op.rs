use indexmap::IndexMap;

use crate::value::Value;

/// One-character operation code. `Move` is reserved by the wire format but
/// not implemented: encountering it on read is a parse error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpCode {
    Meta,
    New,
    Update,
    Delete,
    Increment,
    Decrement,
}

impl OpCode {
    pub fn as_char(self) -> char {
        match self {
            OpCode::Meta => '*',
            OpCode::New => 'N',
            OpCode::Update => 'U',
            OpCode::Delete => 'X',
            OpCode::Increment => 'I',
            OpCode::Decrement => 'D',
        }
    }

    pub fn from_char(c: char) -> Option<OpCode> {
        match c {
            '*' => Some(OpCode::Meta),
            'N' => Some(OpCode::New),
            'U' => Some(OpCode::Update),
            'X' => Some(OpCode::Delete),
            'I' => Some(OpCode::Increment),
            'D' => Some(OpCode::Decrement),
            _ => None,
        }
    }
}

/// The payload carried by an operation line. `Meta` holds the raw
/// `key=value` text as written, since meta lines are opaque and merely
/// preserved, not interpreted, by the replay engine.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Meta(String),
    Fields(IndexMap<String, Value>),
    Keys(Vec<String>),
}

/// One parsed operation: `(op, ts, recordId, payload)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub op: OpCode,
    pub ts: u64,
    pub record_id: String,
    pub payload: Payload,
}

impl Operation {
    /// Ordering timestamp for the merge reader: meta lines always sort as 0
    /// regardless of what they carry on disk (SPEC_FULL.md §3).
    pub fn merge_ts(&self) -> u64 {
        match self.op {
            OpCode::Meta => 0,
            _ => self.ts,
        }
    }
}
