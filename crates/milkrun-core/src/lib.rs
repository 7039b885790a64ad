pub mod db;
pub mod error;
pub mod json_path;
pub mod normalize;
pub mod record;
pub mod schema;
pub mod store;

pub use error::{IngestError, Result};
pub use normalize::normalize;
pub use record::NormalizedRecord;
pub use store::{AppendReceipt, EventStore, MemoryEventStore, PgEventStore};
