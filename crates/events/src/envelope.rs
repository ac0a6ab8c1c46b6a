use serde::{Deserialize, Serialize};
use uuid::Uuid;

use tripsplit_core::LedgerId;

/// Envelope for an event, carrying stream metadata.
///
/// This is the unit appended to a ledger's operation log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope<E> {
    event_id: Uuid,
    ledger_id: LedgerId,

    /// Monotonically increasing position in the ledger stream, starting at 1.
    sequence_number: u64,

    payload: E,
}

impl<E> EventEnvelope<E> {
    pub fn new(event_id: Uuid, ledger_id: LedgerId, sequence_number: u64, payload: E) -> Self {
        Self {
            event_id,
            ledger_id,
            sequence_number,
            payload,
        }
    }

    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn ledger_id(&self) -> LedgerId {
        self.ledger_id
    }

    pub fn sequence_number(&self) -> u64 {
        self.sequence_number
    }

    pub fn payload(&self) -> &E {
        &self.payload
    }

    pub fn into_payload(self) -> E {
        self.payload
    }
}
