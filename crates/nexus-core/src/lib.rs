pub mod codec;
pub mod db;
pub mod device;
pub mod error;
pub mod filter;
pub mod logfile;
pub mod merge;
pub mod op;
pub mod record;
pub mod token;
pub mod value;

pub use db::Database;
pub use error::NexusError;
pub use filter::Filter;
pub use op::{OpCode, Operation, Payload};
pub use record::Record;
pub use value::Value;
