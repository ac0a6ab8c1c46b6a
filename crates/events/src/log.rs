use std::collections::HashMap;
use std::sync::RwLock;

use thiserror::Error;
use uuid::Uuid;

use tripsplit_core::{ExpectedVersion, LedgerId};

use crate::{Event, EventEnvelope};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EventLogError {
    /// The stream moved on since the caller read it.
    #[error("concurrency conflict: {0}")]
    Concurrency(String),

    #[error("event log lock poisoned")]
    Poisoned,
}

/// In-memory append-only operation log, one stream per ledger.
///
/// Appends are atomic per batch: either every event of the batch is stored
/// with consecutive sequence numbers or nothing is.
#[derive(Debug)]
pub struct InMemoryEventLog<E> {
    streams: RwLock<HashMap<LedgerId, Vec<EventEnvelope<E>>>>,
}

impl<E> Default for InMemoryEventLog<E> {
    fn default() -> Self {
        Self {
            streams: RwLock::new(HashMap::new()),
        }
    }
}

impl<E: Event> InMemoryEventLog<E> {
    pub fn new() -> Self {
        Self::default()
    }

    fn current_version(stream: &[EventEnvelope<E>]) -> u64 {
        stream.last().map(|e| e.sequence_number()).unwrap_or(0)
    }

    /// Append a batch of events to a ledger stream.
    pub fn append(
        &self,
        ledger_id: LedgerId,
        events: Vec<E>,
        expected_version: ExpectedVersion,
    ) -> Result<Vec<EventEnvelope<E>>, EventLogError> {
        let mut streams = self.streams.write().map_err(|_| EventLogError::Poisoned)?;

        let stream = streams.entry(ledger_id).or_default();
        let current = Self::current_version(stream);

        if !expected_version.matches(current) {
            return Err(EventLogError::Concurrency(format!(
                "expected {expected_version:?}, found {current}"
            )));
        }

        let mut committed = Vec::with_capacity(events.len());
        for (offset, event) in events.into_iter().enumerate() {
            tracing::debug!(
                ledger_id = %ledger_id,
                event_type = event.event_type(),
                "appending ledger event"
            );
            let envelope =
                EventEnvelope::new(Uuid::now_v7(), ledger_id, current + 1 + offset as u64, event);
            stream.push(envelope.clone());
            committed.push(envelope);
        }

        Ok(committed)
    }

    /// Load a full ledger stream (a single consistent read).
    pub fn load(&self, ledger_id: LedgerId) -> Result<Vec<EventEnvelope<E>>, EventLogError> {
        let streams = self.streams.read().map_err(|_| EventLogError::Poisoned)?;
        Ok(streams.get(&ledger_id).cloned().unwrap_or_default())
    }

    /// Current version of a ledger stream (0 when empty).
    pub fn version(&self, ledger_id: LedgerId) -> Result<u64, EventLogError> {
        let streams = self.streams.read().map_err(|_| EventLogError::Poisoned)?;
        Ok(streams
            .get(&ledger_id)
            .map(|s| Self::current_version(s))
            .unwrap_or(0))
    }
}
