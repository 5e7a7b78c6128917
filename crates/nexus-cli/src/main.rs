use std::process::ExitCode;

use clap::Parser as _;
use indexmap::IndexMap;
use nexus_core::token::{TokenKind, Tokenizer};
use nexus_core::{Database, Filter, Value};

mod commands;
mod logger;

use commands::{Cli, Commands};

fn main() -> ExitCode {
    let _ = logger::init();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), String> {
    let db = match &cli.device {
        Some(device) => Database::open_as(&cli.path, device.clone()),
        None => Database::open(&cli.path),
    }
    .map_err(|e| e.to_string())?;

    match cli.command {
        Commands::Create => Ok(()),
        Commands::Get(args) => run_get(db, &args),
        Commands::Set(args) => run_write(&db, &args, Database::set),
        Commands::Inc(args) => run_write(&db, &args, Database::inc),
        Commands::Dec(args) => run_write(&db, &args, Database::dec),
        Commands::Delete(args) => run_delete(&db, &args),
        Commands::Find(args) => run_find(db, &args),
    }
}

fn run_write(
    db: &Database,
    args: &commands::FieldsArgs,
    write: impl Fn(&Database, &str, IndexMap<String, Value>) -> Result<(), nexus_core::NexusError>,
) -> Result<(), String> {
    let fields = parse_fields(&args.fields).map_err(|e| e.to_string())?;
    write(db, &args.record_id, fields).map_err(|e| e.to_string())
}

fn run_delete(db: &Database, args: &commands::DeleteArgs) -> Result<(), String> {
    db.delete(&args.record_id, args.keys.clone())
        .map_err(|e| e.to_string())
}

fn run_get(mut db: Database, args: &commands::GetArgs) -> Result<(), String> {
    db.read_all().map_err(|e| e.to_string())?;
    match &args.key {
        Some(key) => {
            let value = db.get_field(&args.record_id, key).map_err(|e| e.to_string())?;
            println!("{value}");
        }
        None => {
            let record = db.get_record_checked(&args.record_id).map_err(|e| e.to_string())?;
            for (key, value) in &record.fields {
                println!("{key} = {value}");
            }
        }
    }
    Ok(())
}

fn run_find(mut db: Database, args: &commands::FindArgs) -> Result<(), String> {
    db.read_all().map_err(|e| e.to_string())?;

    let mut filters = Vec::new();
    let mut fields = Vec::new();
    for arg in &args.args {
        if is_bare_field(arg) {
            fields.push(arg.clone());
        } else {
            filters.push(Filter::parse(arg).map_err(|e| e.to_string())?);
        }
    }

    let rows = db.find(&args.prefix, &filters, &fields).map_err(|e| e.to_string())?;
    for (record_id, values) in rows {
        if values.is_empty() {
            println!("{record_id}");
        } else {
            println!("{record_id}\t{}", values.join("\t"));
        }
    }
    Ok(())
}

/// A `find` argument with no comparison operator names the field to print,
/// the same as the original program's loose `pairs` list; an argument that
/// does carry one compiles to a [`Filter`] instead (SPEC_FULL.md §4.7 is an
/// addition on top of that original behavior, not a replacement for it).
fn is_bare_field(arg: &str) -> bool {
    let mut tokenizer = Tokenizer::new(arg);
    let Ok(_) = tokenizer.read_token(&[TokenKind::Key], true) else {
        return false;
    };
    tokenizer.at_end()
}

fn parse_fields(pairs: &[String]) -> Result<IndexMap<String, Value>, nexus_core::NexusError> {
    let mut fields = IndexMap::new();
    for pair in pairs {
        let mut tokenizer = Tokenizer::new(pair);
        let key_tok = tokenizer.read_token(&[TokenKind::Key], true)?;
        tokenizer.read_token(&[TokenKind::OpEq], true)?;
        let value_tok = tokenizer.read_token(&[TokenKind::String, TokenKind::Number], true)?;
        let value = if value_tok.kind == TokenKind::String {
            Value::String(value_tok.unescape())
        } else {
            nexus_core::value::narrow_number_literal(&value_tok.raw)
        };
        fields.insert(key_tok.raw.to_string(), value);
    }
    Ok(fields)
}
