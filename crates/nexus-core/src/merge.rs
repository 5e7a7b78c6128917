//! N-way timestamp-ordered merge replay across every log file in a
//! database directory (SPEC_FULL.md §4.4/§4.5).

use indexmap::IndexMap;

use crate::error::NexusError;
use crate::logfile::LogFile;
use crate::op::{OpCode, Operation, Payload};
use crate::record::Record;
use crate::value::Value;

/// The materialized record table: record id → record.
pub type Table = IndexMap<String, Record>;

/// Applies one operation to `table`, per the effect table in SPEC_FULL.md
/// §4.4.
pub fn apply_operation(table: &mut Table, op: &Operation) -> Result<(), NexusError> {
    match op.op {
        OpCode::Meta => {}
        OpCode::New | OpCode::Update => {
            if let Payload::Fields(fields) = &op.payload {
                table
                    .entry(op.record_id.clone())
                    .or_insert_with(|| Record::new(op.record_id.clone()))
                    .merge(fields.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
        }
        OpCode::Increment | OpCode::Decrement => {
            if let Payload::Fields(fields) = &op.payload {
                let increment = op.op == OpCode::Increment;
                let op_name = if increment { "increment" } else { "decrement" };
                let record = table
                    .entry(op.record_id.clone())
                    .or_insert_with(|| Record::new(op.record_id.clone()));
                for (key, delta) in fields {
                    let current = record.get(key).cloned();
                    let updated = apply_delta(current.as_ref(), delta, increment).ok_or_else(|| NexusError::Replay {
                        op: op_name,
                        record_id: op.record_id.clone(),
                        key: key.clone(),
                    })?;
                    record.fields.insert(key.clone(), updated);
                }
            }
        }
        OpCode::Delete => match &op.payload {
            Payload::Keys(keys) if keys.is_empty() => {
                log::trace!("record {} dropped by empty-key delete", op.record_id);
                table.shift_remove(&op.record_id);
            }
            Payload::Keys(keys) => {
                if let Some(record) = table.get_mut(&op.record_id) {
                    for key in keys {
                        log::trace!("field {key:?} dropped by delete on record {}", op.record_id);
                        record.fields.shift_remove(key);
                    }
                }
            }
            Payload::Fields(_) | Payload::Meta(_) => {}
        },
    }
    Ok(())
}

/// Applies one `inc`/`dec` delta to a field's current value (`None` if the
/// field or record didn't exist yet). When both the current value (if any)
/// and the delta are integers, the add/subtract runs on the `i64` path via
/// `checked_add`/`checked_sub`, returning `None` on overflow rather than
/// silently wrapping or losing precision (SPEC_FULL.md §7); otherwise the
/// arithmetic runs in `f64`, `None` on a non-numeric operand.
fn apply_delta(current: Option<&Value>, delta: &Value, increment: bool) -> Option<Value> {
    if matches!(current, None | Some(Value::Int(_))) {
        if let Value::Int(delta) = delta {
            let base = match current {
                Some(Value::Int(v)) => *v,
                _ => 0,
            };
            let result = if increment { base.checked_add(*delta) } else { base.checked_sub(*delta) };
            return result.map(Value::Int);
        }
    }
    let base = match current {
        Some(v) => v.as_f64()?,
        None => 0.0,
    };
    let delta = delta.as_f64()?;
    Some(Value::Float(if increment { base + delta } else { base - delta }))
}

/// Replays every log file in `files` into a single record table, merging by
/// timestamp. Files are read one operation at a time and advanced in
/// lockstep: at each step the file whose next operation has the smallest
/// `merge_ts` is applied, with ties broken by `files` order (SPEC_FULL.md
/// §4.5). A single file's parse failure aborts only that file's
/// contribution, matching the original program's per-file read loop.
pub fn replay_all(mut files: Vec<LogFile>) -> Result<Table, NexusError> {
    let mut table = Table::new();
    let mut pending: Vec<Option<Operation>> = Vec::with_capacity(files.len());
    for file in &mut files {
        pending.push(next_or_drop(file));
    }

    loop {
        let ready: Vec<(usize, u64)> = pending
            .iter()
            .enumerate()
            .filter_map(|(i, op)| op.as_ref().map(|o| (i, o.merge_ts())))
            .collect();
        let Some(&(winner, winner_ts)) = ready.iter().min_by_key(|&&(i, ts)| (ts, i)) else {
            break;
        };
        let tied: Vec<usize> = ready.iter().filter(|&&(i, ts)| ts == winner_ts && i != winner).map(|&(i, _)| i).collect();
        if !tied.is_empty() {
            log::trace!(
                "merge tie at ts {winner_ts}: file {winner} wins over {tied:?} by file order"
            );
        }
        let op = pending[winner].take().expect("winner always has a pending op");
        apply_operation(&mut table, &op)?;
        pending[winner] = next_or_drop(&mut files[winner]);
    }

    Ok(table)
}

fn next_or_drop(file: &mut LogFile) -> Option<Operation> {
    match file.parse_next_record() {
        Ok(op) => op,
        Err(err) => {
            log::debug!("dropping remainder of {}: {err}", file.path().display());
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logfile::Mode;
    use crate::op::{OpCode, Payload};
    use tempfile::tempdir;

    type TestOp<'a> = (u64, &'a str, &'a [(&'a str, Value)]);

    fn write_ops(path: &std::path::Path, ops: &[TestOp]) {
        let mut log = LogFile::open(path, Mode::Append, "writer").unwrap();
        for (ts, id, fields) in ops {
            let mut payload = IndexMap::new();
            for (k, v) in fields.iter() {
                payload.insert(k.to_string(), v.clone());
            }
            log.write_operation(&Operation {
                op: OpCode::New,
                ts: *ts,
                record_id: id.to_string(),
                payload: Payload::Fields(payload),
            })
            .unwrap();
        }
        log.flush().unwrap();
    }

    #[test]
    fn merges_two_files_by_timestamp() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.nexus");
        let b = dir.path().join("b.nexus");
        write_ops(
            &a,
            &[
                (100, "1", &[("foo", Value::String("Hello, World!".into()))]),
                (200, "1", &[("foo", Value::String("Hey, World!".into()))]),
            ],
        );
        write_ops(&b, &[(150, "1", &[("foo", Value::String("Goodbye, World!".into()))])]);

        let files = vec![
            LogFile::reopen_for_read(&a).unwrap(),
            LogFile::reopen_for_read(&b).unwrap(),
        ];
        let table = replay_all(files).unwrap();
        assert_eq!(
            table.get("1").unwrap().get("foo"),
            Some(&Value::String("Hey, World!".into()))
        );
    }

    #[test]
    fn increment_then_decrement_nets_out() {
        let mut table = Table::new();
        let mut payload = IndexMap::new();
        payload.insert("x".to_string(), Value::Int(42));
        payload.insert("z".to_string(), Value::Int(10));
        apply_operation(
            &mut table,
            &Operation { op: OpCode::New, ts: 0, record_id: "42".into(), payload: Payload::Fields(payload) },
        )
        .unwrap();

        let mut inc = IndexMap::new();
        inc.insert("x".to_string(), Value::Int(1));
        apply_operation(
            &mut table,
            &Operation { op: OpCode::Increment, ts: 1, record_id: "42".into(), payload: Payload::Fields(inc) },
        )
        .unwrap();
        assert_eq!(table.get("42").unwrap().get("x"), Some(&Value::Int(43)));

        apply_operation(
            &mut table,
            &Operation { op: OpCode::Delete, ts: 2, record_id: "42".into(), payload: Payload::Keys(vec!["x".into()]) },
        )
        .unwrap();
        assert!(table.get("42").unwrap().get("x").is_none());
        assert_eq!(table.get("42").unwrap().get("z"), Some(&Value::Int(10)));
    }

    #[test]
    fn increment_past_i64_max_is_a_replay_error_not_a_float() {
        let mut table = Table::new();
        let mut payload = IndexMap::new();
        payload.insert("x".to_string(), Value::Int(i64::MAX));
        apply_operation(
            &mut table,
            &Operation { op: OpCode::New, ts: 0, record_id: "42".into(), payload: Payload::Fields(payload) },
        )
        .unwrap();

        let mut inc = IndexMap::new();
        inc.insert("x".to_string(), Value::Int(1));
        let err = apply_operation(
            &mut table,
            &Operation { op: OpCode::Increment, ts: 1, record_id: "42".into(), payload: Payload::Fields(inc) },
        )
        .unwrap_err();
        assert!(matches!(err, NexusError::Replay { .. }));
        // the field is untouched, not silently widened to a float
        assert_eq!(table.get("42").unwrap().get("x"), Some(&Value::Int(i64::MAX)));
    }

    #[test]
    fn increment_of_a_float_field_stays_a_float() {
        let mut table = Table::new();
        let mut payload = IndexMap::new();
        payload.insert("x".to_string(), Value::Float(1.5));
        apply_operation(
            &mut table,
            &Operation { op: OpCode::New, ts: 0, record_id: "42".into(), payload: Payload::Fields(payload) },
        )
        .unwrap();

        let mut inc = IndexMap::new();
        inc.insert("x".to_string(), Value::Int(1));
        apply_operation(
            &mut table,
            &Operation { op: OpCode::Increment, ts: 1, record_id: "42".into(), payload: Payload::Fields(inc) },
        )
        .unwrap();
        assert_eq!(table.get("42").unwrap().get("x"), Some(&Value::Float(2.5)));
    }

    #[test]
    fn delete_with_empty_key_list_removes_whole_record() {
        let mut table = Table::new();
        table.insert("42".to_string(), Record::new("42"));
        apply_operation(
            &mut table,
            &Operation { op: OpCode::Delete, ts: 0, record_id: "42".into(), payload: Payload::Keys(vec![]) },
        )
        .unwrap();
        assert!(table.get("42").is_none());
    }
}
