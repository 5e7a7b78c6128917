//! One append-only `.nexus` text log: writes a header on creation, appends
//! operation lines, and streams operations back in file order
//! (SPEC_FULL.md §4.3).

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::codec::{decode_line, encode_line};
use crate::device;
use crate::error::NexusError;
use crate::op::{OpCode, Operation, Payload};

const HEADER_KEYS: &[(&str, Option<&str>)] = &[
    ("format", Some("nexus")),
    ("encoding", Some("utf8")),
    ("version", Some("0")),
    ("revision", Some("0")),
    ("device", None),
    ("fileid", None),
];

/// How a [`LogFile`] was opened. `Append` creates the file (and writes its
/// header) if it doesn't already exist; `Read` never creates or mutates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Read,
    Append,
}

/// A single log file, either being written to (by its owning device) or
/// replayed from (by any reader, including the owner's own `read_all`).
pub struct LogFile {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
    reader: Option<BufReader<File>>,
    line_no: usize,
}

impl LogFile {
    /// Opens `path` in `mode`. In `Append` mode, creates the file and
    /// writes its meta header first if it doesn't yet exist.
    pub fn open(path: impl AsRef<Path>, mode: Mode, device_id: &str) -> Result<Self, NexusError> {
        let path = path.as_ref().to_path_buf();
        match mode {
            Mode::Read => {
                let file = File::open(&path)?;
                log::trace!("opened log file {} for read", path.display());
                Ok(LogFile {
                    path,
                    writer: None,
                    reader: Some(BufReader::new(file)),
                    line_no: 0,
                })
            }
            Mode::Append => {
                let is_new = !path.exists();
                let file = OpenOptions::new().create(true).append(true).open(&path)?;
                let mut writer = BufWriter::new(file);
                log::trace!("opened log file {} for append", path.display());
                if is_new {
                    log::debug!("creating log file {} for device {device_id}", path.display());
                    write_header(&mut writer, device_id)?;
                    writer.flush()?;
                    log::debug!("wrote meta header for {}", path.display());
                }
                Ok(LogFile {
                    path,
                    writer: Some(writer),
                    reader: None,
                    line_no: 0,
                })
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one encoded operation line. Requires the file to have been
    /// opened in [`Mode::Append`].
    pub fn write_operation(&mut self, op: &Operation) -> Result<(), NexusError> {
        let writer = self
            .writer
            .as_mut()
            .expect("write_operation called on a read-only LogFile");
        let line = encode_line(op)?;
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), NexusError> {
        if let Some(writer) = self.writer.as_mut() {
            writer.flush()?;
        }
        Ok(())
    }

    /// Opens a fresh reader over this file's path, for callers that need to
    /// replay a file they are also appending to (e.g. the device's own
    /// `read_all`). Mirrors the original program's open-per-pass design
    /// (SPEC_FULL.md §9).
    pub fn reopen_for_read(path: impl AsRef<Path>) -> Result<Self, NexusError> {
        Self::open(path, Mode::Read, "")
    }

    /// Reads the next operation, or `Ok(None)` at end of file. End of file
    /// is a normal control signal, not an error (SPEC_FULL.md §4.9).
    pub fn parse_next_record(&mut self) -> Result<Option<Operation>, NexusError> {
        let reader = self
            .reader
            .as_mut()
            .expect("parse_next_record called on a write-only LogFile");
        let mut raw = String::new();
        let bytes_read = reader.read_line(&mut raw)?;
        if bytes_read == 0 {
            return Ok(None);
        }
        self.line_no += 1;
        let line = raw.strip_suffix('\n').unwrap_or(&raw);
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.is_empty() {
            return self.parse_next_record();
        }
        let op = decode_line(line, self.line_no).map_err(|e| match e {
            NexusError::Parse { description, line } => NexusError::Parse {
                description: format!("{} ({})", description, self.path.display()),
                line,
            },
            other => other,
        })?;
        Ok(Some(op))
    }
}

fn write_header(writer: &mut BufWriter<File>, device_id: &str) -> Result<(), NexusError> {
    let file_id = device::new_file_id();
    for (key, value) in HEADER_KEYS {
        let value = value.unwrap_or_else(|| match *key {
            "device" => device_id,
            "fileid" => file_id.as_str(),
            _ => unreachable!(),
        });
        let op = Operation {
            op: OpCode::Meta,
            ts: 0,
            record_id: String::new(),
            payload: Payload::Meta(format!("{key}={value}")),
        };
        let line = encode_line(&op)?;
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn creates_header_on_first_open_and_reuses_it_on_second() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dev.nexus");

        {
            let mut log = LogFile::open(&path, Mode::Append, "abc123def456").unwrap();
            log.flush().unwrap();
        }
        {
            let mut log = LogFile::open(&path, Mode::Append, "abc123def456").unwrap();
            log.flush().unwrap();
        }

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 6, "header must be written exactly once: {lines:?}");
        assert_eq!(lines[0], "* format=nexus");
        assert_eq!(lines[4], "* device=abc123def456");
    }

    #[test]
    fn writes_and_replays_one_record() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dev.nexus");

        let mut fields = indexmap::IndexMap::new();
        fields.insert("foo".to_string(), crate::value::Value::String("Hello, World!".to_string()));
        let op = Operation {
            op: OpCode::New,
            ts: 0,
            record_id: "1".to_string(),
            payload: Payload::Fields(fields),
        };
        {
            let mut log = LogFile::open(&path, Mode::Append, "dev1").unwrap();
            log.write_operation(&op).unwrap();
            log.flush().unwrap();
        }

        let mut reader = LogFile::reopen_for_read(&path).unwrap();
        let mut last = None;
        while let Some(read_op) = reader.parse_next_record().unwrap() {
            last = Some(read_op);
        }
        assert_eq!(last, Some(op));
    }
}
