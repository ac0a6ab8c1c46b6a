//! Ledger operation log: events, envelopes and an append-only in-memory store.

pub mod envelope;
pub mod event;
pub mod log;

pub use envelope::EventEnvelope;
pub use event::Event;
pub use log::{EventLogError, InMemoryEventLog};
