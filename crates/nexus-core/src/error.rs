use thiserror::Error;

/// Every fallible operation in the engine returns this. `EndOfRecords` is
/// deliberately not a variant here: it is a normal control signal, carried
/// as `Ok(None)` from `LogFile::parse_next_record`, not an error (see
/// SPEC_FULL.md §4.9/§7).
#[derive(Debug, Error)]
pub enum NexusError {
    #[error("tokenize error at byte {offset}: {snippet}")]
    Tokenize { offset: usize, snippet: String },

    #[error("parse error{}: {description}", .line.map(|l| format!(" on line {l}")).unwrap_or_default())]
    Parse {
        description: String,
        line: Option<usize>,
    },

    #[error("cannot encode value of type {kind} for key {key:?}")]
    Encode { key: String, kind: &'static str },

    #[error("cannot {op} non-numeric value for key {key:?} in record {record_id:?}")]
    Replay {
        op: &'static str,
        record_id: String,
        key: String,
    },

    #[error("filter error: cannot compare non-numeric value {value:?} for key {key:?}")]
    Filter { key: String, value: String },

    #[error("{}", lookup_message(record_id, key))]
    Lookup {
        record_id: String,
        key: Option<String>,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn lookup_message(record_id: &str, key: &Option<String>) -> String {
    match key {
        Some(key) => format!("record {record_id:?} has no key {key:?}"),
        None => format!("no such record {record_id:?}"),
    }
}
