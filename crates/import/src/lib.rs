//! Import reconciler: turns externally-sourced bill records into ledger
//! expenses and replaces the local expense log with them.

pub mod error;
pub mod extract;
pub mod reconcile;
pub mod record;
pub mod source;

pub use error::{ImportError, RecordError};
pub use extract::extract_records;
pub use reconcile::{ImportOutcome, SkippedRecord, import_from, import_text, reconcile};
pub use record::{BillRecord, normalize_record};
pub use source::{BillSource, SourceError};
