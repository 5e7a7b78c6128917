//! Line-level encode/decode for a single [`Operation`](crate::op::Operation).
//!
//! Reimplemented atop [`crate::token`] and [`crate::value`] instead of the
//! original program's ad hoc regexes (`R_KEY`, `_matchNext`'s two
//! alternating patterns), but the accepted shapes are unchanged.

use indexmap::IndexMap;

use crate::error::NexusError;
use crate::op::{OpCode, Operation, Payload};
use crate::token::{Token, TokenKind, Tokenizer};
use crate::value::Value;

/// Encodes one operation as a line of text, without a trailing `\n`.
///
/// Returns [`NexusError::Encode`] if a `Fields` payload carries a
/// [`Value::Float`]: the wire format has no float literal on the write
/// side (SPEC_FULL.md §4.2) — floats can only be produced by parsing a
/// `N.M` numeric token on read.
pub fn encode_line(op: &Operation) -> Result<String, NexusError> {
    // Meta lines carry no record id or meaningful timestamp; the writer
    // always emits the canonical `* key=value` form (no legacy `<ts>`
    // segment), though both forms are accepted on read (SPEC_FULL.md §4.2).
    if let Payload::Meta(raw) = &op.payload {
        return Ok(format!("* {raw}"));
    }

    let mut out = String::new();
    out.push(op.op.as_char());
    out.push(' ');
    out.push_str(&op.ts.to_string());
    out.push(' ');
    out.push_str(&op.record_id);

    match &op.payload {
        Payload::Meta(_) => unreachable!("handled above"),
        Payload::Keys(keys) => {
            for key in keys {
                out.push(' ');
                out.push_str(key);
            }
        }
        Payload::Fields(fields) => {
            for (key, value) in fields {
                out.push(' ');
                out.push_str(key);
                out.push('=');
                out.push_str(&encode_value(key, value)?);
            }
        }
    }
    Ok(out)
}

fn encode_value(key: &str, value: &Value) -> Result<String, NexusError> {
    match value {
        Value::Int(v) => Ok(v.to_string()),
        Value::String(s) => Ok(quote_string(s)),
        Value::Float(_) => Err(NexusError::Encode {
            key: key.to_owned(),
            kind: "float",
        }),
    }
}

fn quote_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for ch in s.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\r' => out.push_str("\\r"),
            '\n' => out.push_str("\\n"),
            other => out.push(other),
        }
    }
    out.push('"');
    out
}

/// Decodes one logical line (no trailing `\n`) into an [`Operation`].
///
/// `line_no` is carried only for error messages.
pub fn decode_line(line: &str, line_no: usize) -> Result<Operation, NexusError> {
    if let Some(rest) = line.strip_prefix('*') {
        return decode_meta(rest, line_no);
    }

    let mut tokenizer = Tokenizer::new(line);
    let op_tok = tokenizer.read_token(&[TokenKind::Key, TokenKind::Id], true)?;
    let op = OpCode::from_char(op_tok.raw.chars().next().unwrap_or('\0')).ok_or_else(|| {
        NexusError::Parse {
            description: format!("unrecognized operation code {:?}", op_tok.raw),
            line: Some(line_no),
        }
    })?;
    if op_tok.raw.len() != 1 {
        return Err(NexusError::Parse {
            description: format!("unrecognized operation code {:?}", op_tok.raw),
            line: Some(line_no),
        });
    }

    let ts_tok = tokenizer.read_token(&[TokenKind::Number], true)?;
    let ts: u64 = ts_tok.raw.parse().map_err(|_| NexusError::Parse {
        description: format!("invalid timestamp {:?}", ts_tok.raw),
        line: Some(line_no),
    })?;

    let id_tok = tokenizer.read_token(&[TokenKind::Key, TokenKind::Id], true)?;
    let record_id = id_tok.raw.to_string();

    let payload = if op == OpCode::Delete {
        Payload::Keys(read_keys(&mut tokenizer, line_no)?)
    } else {
        Payload::Fields(read_fields(&mut tokenizer, line_no)?)
    };

    Ok(Operation {
        op,
        ts,
        record_id,
        payload,
    })
}

fn decode_meta(rest: &str, _line_no: usize) -> Result<Operation, NexusError> {
    let rest = rest.trim_start();
    // Legacy header lines carry a throwaway `<ts> ` prefix before the
    // `key=value` body (e.g. `* 0 format=nexus`); new-style meta lines omit
    // it. Both are accepted (SPEC_FULL.md §4.2).
    let body = match rest.split_once(' ') {
        Some((maybe_ts, tail)) if maybe_ts.chars().all(|c| c.is_ascii_digit()) && !maybe_ts.is_empty() => {
            tail
        }
        _ => rest,
    };
    Ok(Operation {
        op: OpCode::Meta,
        ts: 0,
        record_id: String::new(),
        payload: Payload::Meta(body.trim_end().to_string()),
    })
}

fn read_keys(tokenizer: &mut Tokenizer<'_>, line_no: usize) -> Result<Vec<String>, NexusError> {
    let mut keys = Vec::new();
    loop {
        let tok = tokenizer.read_token(&[TokenKind::Key, TokenKind::Id, TokenKind::LineEnd], true)?;
        if tok.kind == TokenKind::LineEnd {
            break;
        }
        keys.push(tok.raw.to_string());
        let _ = line_no;
    }
    Ok(keys)
}

fn read_fields(
    tokenizer: &mut Tokenizer<'_>,
    line_no: usize,
) -> Result<IndexMap<String, Value>, NexusError> {
    let mut fields = IndexMap::new();
    loop {
        let key_tok = tokenizer.read_token(&[TokenKind::Key, TokenKind::Id, TokenKind::LineEnd], true)?;
        if key_tok.kind == TokenKind::LineEnd {
            break;
        }
        let key = key_tok.raw.to_string();

        tokenizer.read_token(&[TokenKind::OpEq], true).map_err(|_| NexusError::Parse {
            description: format!("expected '=' after key {key:?}"),
            line: Some(line_no),
        })?;

        let value_tok = tokenizer.read_token(&[TokenKind::String, TokenKind::Number], true)?;
        let value = decode_value(&value_tok)?;
        fields.insert(key, value);

        // A trailing LineEnd right after a value closes the line; consumed
        // on the next loop iteration's key-or-LineEnd read.
    }
    Ok(fields)
}

fn decode_value(tok: &Token) -> Result<Value, NexusError> {
    match tok.kind {
        TokenKind::String => Ok(Value::String(tok.unescape())),
        TokenKind::Number => Ok(crate::value::narrow_number_literal(&tok.raw)),
        _ => unreachable!("read_fields only requests String or Number"),
    }
}
