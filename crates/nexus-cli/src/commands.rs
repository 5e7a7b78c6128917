use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "nexus")]
#[command(about = "Read and write a Nexus append-only record store", long_about = None, version = env!("CARGO_PKG_VERSION"))]
pub(crate) struct Cli {
    /// Path to the database directory.
    pub path: String,
    #[command(subcommand)]
    pub command: Commands,
    /// Override the derived device id (for tests and multi-device
    /// simulation on one host).
    #[arg(long, global = true)]
    pub device: Option<String>,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Commands {
    #[command(about = "Create the database directory if it doesn't already exist")]
    Create,
    #[command(about = "Print a record, or a single field of it")]
    Get(GetArgs),
    #[command(about = "Create or update a record's fields")]
    Set(FieldsArgs),
    #[command(about = "Increment numeric fields on a record")]
    Inc(FieldsArgs),
    #[command(about = "Decrement numeric fields on a record")]
    Dec(FieldsArgs),
    #[command(about = "Delete a record, or specific fields on it")]
    Delete(DeleteArgs),
    #[command(about = "Search for records by id prefix and field filters")]
    Find(FindArgs),
}

#[derive(Debug, Parser)]
pub(crate) struct GetArgs {
    pub record_id: String,
    /// Field to read. Omit to print every field.
    pub key: Option<String>,
}

#[derive(Debug, Parser)]
pub(crate) struct FieldsArgs {
    pub record_id: String,
    /// `key=value` pairs to apply.
    pub fields: Vec<String>,
}

#[derive(Debug, Parser)]
pub(crate) struct DeleteArgs {
    pub record_id: String,
    /// Bare keys to remove. Omit to delete the whole record.
    pub keys: Vec<String>,
}

#[derive(Debug, Parser)]
pub(crate) struct FindArgs {
    pub prefix: String,
    /// Bare field names to print, or `KEY OP LITERAL` filter expressions
    /// (e.g. `status=up`, `age>18`).
    pub args: Vec<String>,
}
