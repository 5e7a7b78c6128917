//! Compiles and evaluates `find` predicate arguments (SPEC_FULL.md §4.7).

use crate::error::NexusError;
use crate::record::Record;
use crate::token::{TokenKind, Tokenizer};
use crate::value::Value;

const EVAL_TOKENS: &[TokenKind] = &[
    TokenKind::Key,
    TokenKind::OpEq,
    TokenKind::OpNe,
    TokenKind::OpLt,
    TokenKind::OpGt,
    TokenKind::OpPre,
    TokenKind::OpPost,
    TokenKind::OpIn,
    TokenKind::String,
    TokenKind::Number,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Gt,
    Substring,
    StartsWith,
    EndsWith,
}

/// Either a bare field-presence check (`find 42 status`) or a `KEY OP
/// LITERAL` comparison (`find 42 status=active`).
#[derive(Debug, Clone)]
pub enum Filter {
    HasField(String),
    Compare {
        key: String,
        op: CompareOp,
        literal: Value,
    },
}

impl Filter {
    /// Compiles one `find` argument, which `clap` hands over as a single
    /// un-split string independent of shell word-splitting (SPEC_FULL.md §9).
    pub fn parse(arg: &str) -> Result<Filter, NexusError> {
        let mut tokenizer = Tokenizer::new(arg);
        let key_tok = tokenizer.read_token(&[TokenKind::Key], true)?;
        let key = key_tok.raw.to_string();

        if tokenizer.at_end() {
            return Ok(Filter::HasField(key));
        }

        let op_tok = tokenizer.read_token(EVAL_TOKENS, true)?;
        let op = match op_tok.kind {
            TokenKind::OpEq => CompareOp::Eq,
            TokenKind::OpNe => CompareOp::Ne,
            TokenKind::OpLt => CompareOp::Lt,
            TokenKind::OpGt => CompareOp::Gt,
            TokenKind::OpIn => CompareOp::Substring,
            TokenKind::OpPre => CompareOp::StartsWith,
            TokenKind::OpPost => CompareOp::EndsWith,
            _ => {
                return Err(NexusError::Parse {
                    description: format!("expected a comparison operator in filter {arg:?}"),
                    line: None,
                })
            }
        };

        let literal_tok = tokenizer.read_token(&[TokenKind::String, TokenKind::Number], true)?;
        let literal = if literal_tok.kind == TokenKind::String {
            Value::String(literal_tok.unescape())
        } else {
            crate::value::narrow_number_literal(&literal_tok.raw)
        };

        Ok(Filter::Compare { key, op, literal })
    }

    /// Evaluates this filter against `record`. Missing keys compare as the
    /// empty string for textual operators; numeric operators against a
    /// missing or non-numeric value are a [`NexusError::Filter`].
    pub fn matches(&self, record: &Record) -> Result<bool, NexusError> {
        match self {
            Filter::HasField(key) => Ok(record.get(key).is_some()),
            Filter::Compare { key, op, literal } => {
                let value = record.get(key);
                match op {
                    CompareOp::Eq => Ok(value_as_str(value) == literal.as_str()),
                    CompareOp::Ne => Ok(value_as_str(value) != literal.as_str()),
                    CompareOp::Substring => Ok(value_as_str(value).contains(&literal.as_str())),
                    CompareOp::StartsWith => Ok(value_as_str(value).starts_with(&literal.as_str())),
                    CompareOp::EndsWith => Ok(value_as_str(value).ends_with(&literal.as_str())),
                    CompareOp::Lt | CompareOp::Gt => {
                        let lhs = value.and_then(Value::as_f64).ok_or_else(|| NexusError::Filter {
                            key: key.clone(),
                            value: value.map(Value::as_str).unwrap_or_default(),
                        })?;
                        let rhs = literal.as_f64().ok_or_else(|| NexusError::Filter {
                            key: key.clone(),
                            value: literal.as_str(),
                        })?;
                        Ok(match op {
                            CompareOp::Lt => lhs < rhs,
                            CompareOp::Gt => lhs > rhs,
                            _ => unreachable!(),
                        })
                    }
                }
            }
        }
    }
}

fn value_as_str(value: Option<&Value>) -> String {
    value.map(Value::as_str).unwrap_or_default()
}
