//! The facade applications embed: a database directory of `.nexus` logs,
//! one of which this process owns for writes (SPEC_FULL.md §4.6).

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use indexmap::IndexMap;

use crate::device;
use crate::error::NexusError;
use crate::filter::Filter;
use crate::logfile::{LogFile, Mode};
use crate::merge::{self, Table};
use crate::op::{OpCode, Operation, Payload};
use crate::value::Value;

/// An open database directory. Holds the materialized record table from
/// the most recent [`Database::read_all`]; writers append directly to disk
/// and do not update this table (SPEC_FULL.md §9 — deliberately retained).
pub struct Database {
    dir: PathBuf,
    device_id: String,
    table: Table,
}

impl Database {
    /// Opens (creating if absent) the database directory at `path`, using
    /// this host's derived device id as the write owner.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, NexusError> {
        Self::open_as(path, device::device_id())
    }

    /// As [`Database::open`], but with an explicit device id override —
    /// for tests and multi-device simulation on one host (SPEC_FULL.md
    /// §4.11).
    pub fn open_as(path: impl AsRef<Path>, device_id: impl Into<String>) -> Result<Self, NexusError> {
        let dir = path.as_ref().to_path_buf();
        if !dir.exists() {
            fs::create_dir_all(&dir)?;
        }
        Ok(Database {
            dir,
            device_id: device_id.into(),
            table: Table::new(),
        })
    }

    fn write_path(&self) -> PathBuf {
        self.dir.join(format!("{}.nexus", self.device_id))
    }

    /// Every `*.nexus` file in the directory, with the write-owned file
    /// always included even if it doesn't exist on disk yet (it is simply
    /// skipped when absent).
    fn read_paths(&self) -> Result<Vec<PathBuf>, NexusError> {
        let mut paths = vec![self.write_path()];
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("nexus") && path != paths[0] {
                paths.push(path);
            }
        }
        Ok(paths)
    }

    /// Re-reads every log file and replaces the materialized table.
    pub fn read_all(&mut self) -> Result<(), NexusError> {
        let mut files = Vec::new();
        for path in self.read_paths()? {
            if path.exists() {
                files.push(LogFile::reopen_for_read(&path)?);
            }
        }
        self.table = merge::replay_all(files)?;
        Ok(())
    }

    /// Looks up a record (or a single field within it) in the currently
    /// materialized table. Returns `None` without an error if `read_all`
    /// hasn't been called yet, matching the original's behavior.
    pub fn get(&self, record_id: &str, key: Option<&str>) -> Option<Value> {
        let record = self.table.get(record_id)?;
        match key {
            Some(key) => record.get(key).cloned(),
            None => None,
        }
    }

    /// Returns the whole materialized record, fields in insertion order.
    pub fn get_record(&self, record_id: &str) -> Option<&crate::record::Record> {
        self.table.get(record_id)
    }

    /// Like [`Database::get`] with a specific key, but surfaces a missing
    /// record or key as [`NexusError::Lookup`] for call sites that want an
    /// error rather than `None` (SPEC_FULL.md §4.9).
    pub fn get_field(&self, record_id: &str, key: &str) -> Result<Value, NexusError> {
        self.get(record_id, Some(key)).ok_or_else(|| NexusError::Lookup {
            record_id: record_id.to_string(),
            key: Some(key.to_string()),
        })
    }

    /// Like [`Database::get_record`], but surfaces a missing record as
    /// [`NexusError::Lookup`].
    pub fn get_record_checked(&self, record_id: &str) -> Result<&crate::record::Record, NexusError> {
        self.get_record(record_id).ok_or_else(|| NexusError::Lookup {
            record_id: record_id.to_string(),
            key: None,
        })
    }

    /// All record ids currently materialized (re-read callers should call
    /// `read_all` first).
    pub fn get_record_ids(&self) -> Vec<String> {
        self.table.keys().cloned().collect()
    }

    fn append(&self, op: OpCode, record_id: &str, payload: Payload) -> Result<(), NexusError> {
        let mut log = LogFile::open(self.write_path(), Mode::Append, &self.device_id)?;
        log.write_operation(&Operation {
            op,
            ts: now_millis(),
            record_id: record_id.to_string(),
            payload,
        })?;
        log.flush()
    }

    pub fn set(&self, record_id: &str, fields: IndexMap<String, Value>) -> Result<(), NexusError> {
        self.append(OpCode::New, record_id, Payload::Fields(fields))
    }

    pub fn inc(&self, record_id: &str, fields: IndexMap<String, Value>) -> Result<(), NexusError> {
        self.append(OpCode::Increment, record_id, Payload::Fields(fields))
    }

    pub fn dec(&self, record_id: &str, fields: IndexMap<String, Value>) -> Result<(), NexusError> {
        self.append(OpCode::Decrement, record_id, Payload::Fields(fields))
    }

    pub fn delete(&self, record_id: &str, keys: Vec<String>) -> Result<(), NexusError> {
        self.append(OpCode::Delete, record_id, Payload::Keys(keys))
    }

    /// Record ids starting with `prefix` whose fields satisfy every filter,
    /// each paired with the requested field values (or left empty when
    /// `fields` is empty, meaning "just the id").
    pub fn find(
        &self,
        prefix: &str,
        filters: &[Filter],
        fields: &[String],
    ) -> Result<Vec<(String, Vec<String>)>, NexusError> {
        let mut rows = Vec::new();
        for (record_id, record) in &self.table {
            if !record_id.starts_with(prefix) {
                continue;
            }
            let mut matched = true;
            for filter in filters {
                if !filter.matches(record)? {
                    matched = false;
                    break;
                }
            }
            if !matched {
                continue;
            }
            let values = fields
                .iter()
                .map(|f| record.get(f).map(Value::as_str).unwrap_or_default())
                .collect();
            rows.push((record_id.clone(), values));
        }
        Ok(rows)
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn fields(pairs: &[(&str, Value)]) -> IndexMap<String, Value> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn set_then_inc_then_read_all_reflects_both() {
        let dir = tempdir().unwrap();
        let db = Database::open_as(dir.path(), "dev1").unwrap();
        db.set("42", fields(&[("x", Value::Int(42))])).unwrap();
        db.inc("42", fields(&[("x", Value::Int(1))])).unwrap();

        let mut db = db;
        db.read_all().unwrap();
        assert_eq!(db.get("42", Some("x")), Some(Value::Int(43)));
    }

    #[test]
    fn get_before_read_all_returns_none() {
        let dir = tempdir().unwrap();
        let db = Database::open_as(dir.path(), "dev1").unwrap();
        db.set("42", fields(&[("x", Value::Int(42))])).unwrap();
        assert_eq!(db.get("42", Some("x")), None);
    }

    #[test]
    fn find_filters_by_prefix_and_predicate() {
        let dir = tempdir().unwrap();
        let mut db = Database::open_as(dir.path(), "dev1").unwrap();
        db.set("alpha-1", fields(&[("status", Value::String("up".into()))])).unwrap();
        db.set("alpha-2", fields(&[("status", Value::String("down".into()))])).unwrap();
        db.set("beta-1", fields(&[("status", Value::String("up".into()))])).unwrap();
        db.read_all().unwrap();

        let filter = Filter::parse(r#"status="up""#).unwrap();
        let rows = db.find("alpha-", &[filter], &["status".to_string()]).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].0, "alpha-1");
    }
}
