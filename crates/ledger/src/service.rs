//! Command execution over the ledger operation log.
//!
//! ```text
//! Command
//!   ↓
//! 1. Load the ledger stream (one consistent read)
//!   ↓
//! 2. Rehydrate the snapshot
//!   ↓
//! 3. Handle command (pure decision logic, produces events)
//!   ↓
//! 4. Append events with an exact expected version
//! ```
//!
//! A writer that read an older version loses the race with `Conflict` and must
//! reload; partially-updated views are never observed.

use thiserror::Error;

use tripsplit_core::{Aggregate, AggregateRoot, DomainError, ExpectedVersion, LedgerId};
use tripsplit_events::{EventEnvelope, EventLogError, InMemoryEventLog};

use crate::snapshot::{LedgerCommand, LedgerEvent, LedgerSnapshot};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Log(#[from] EventLogError),
}

/// Serializes ledger mutations through an append-only log.
#[derive(Debug, Default)]
pub struct LedgerService {
    log: InMemoryEventLog<LedgerEvent>,
}

impl LedgerService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current snapshot of a ledger (empty if it has no history yet).
    pub fn load(&self, ledger_id: LedgerId) -> Result<LedgerSnapshot, ServiceError> {
        let stream = self.log.load(ledger_id)?;
        Ok(LedgerSnapshot::rehydrate(
            ledger_id,
            stream.iter().map(EventEnvelope::payload),
        ))
    }

    /// Full event history of a ledger.
    pub fn history(&self, ledger_id: LedgerId) -> Result<Vec<EventEnvelope<LedgerEvent>>, ServiceError> {
        Ok(self.log.load(ledger_id)?)
    }

    /// Execute against the latest version.
    pub fn dispatch(
        &self,
        ledger_id: LedgerId,
        command: &LedgerCommand,
    ) -> Result<LedgerSnapshot, ServiceError> {
        self.dispatch_expecting(ledger_id, command, ExpectedVersion::Any)
    }

    /// Execute only if the ledger is still at `expected`.
    ///
    /// Callers holding a snapshot pass `ExpectedVersion::Exact(snapshot.version())`
    /// so that a decision taken on a stale view is rejected.
    pub fn dispatch_expecting(
        &self,
        ledger_id: LedgerId,
        command: &LedgerCommand,
        expected: ExpectedVersion,
    ) -> Result<LedgerSnapshot, ServiceError> {
        let mut snapshot = self.load(ledger_id)?;
        expected.check(snapshot.version())?;

        let events = snapshot.handle(command)?;
        let committed = self.log.append(
            ledger_id,
            events,
            ExpectedVersion::Exact(snapshot.version()),
        )?;

        for envelope in &committed {
            snapshot.apply(envelope.payload());
        }

        tracing::info!(
            ledger_id = %ledger_id,
            events = committed.len(),
            version = snapshot.version(),
            "ledger command applied"
        );

        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use tripsplit_core::{Money, Participant};

    use crate::expense::NewExpense;
    use crate::snapshot::{AddExpense, AddParticipant, RemoveParticipant};

    fn test_time() -> DateTime<Utc> {
        DateTime::<Utc>::UNIX_EPOCH
    }

    fn add(ledger_id: LedgerId, name: &str) -> LedgerCommand {
        LedgerCommand::AddParticipant(AddParticipant {
            ledger_id,
            name: name.to_string(),
            occurred_at: test_time(),
        })
    }

    #[test]
    fn dispatch_persists_and_reload_sees_the_same_state() {
        let service = LedgerService::new();
        let ledger_id = LedgerId::new();

        service.dispatch(ledger_id, &add(ledger_id, "A")).unwrap();
        let after = service
            .dispatch(
                ledger_id,
                &LedgerCommand::AddExpense(AddExpense {
                    ledger_id,
                    expense: NewExpense::new(
                        "Lunch",
                        Money::from_cents(2000),
                        "A",
                        ["A", "B"],
                        test_time(),
                    ),
                    occurred_at: test_time(),
                }),
            )
            .unwrap();

        let reloaded = service.load(ledger_id).unwrap();
        assert_eq!(reloaded, after);
        assert_eq!(reloaded.version(), 3);
        assert_eq!(service.history(ledger_id).unwrap().len(), 3);
    }

    #[test]
    fn stale_expected_version_is_a_conflict() {
        let service = LedgerService::new();
        let ledger_id = LedgerId::new();
        let first = service.dispatch(ledger_id, &add(ledger_id, "A")).unwrap();
        service.dispatch(ledger_id, &add(ledger_id, "B")).unwrap();

        let err = service
            .dispatch_expecting(
                ledger_id,
                &add(ledger_id, "C"),
                ExpectedVersion::Exact(first.version()),
            )
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::Conflict(_))));
        assert_eq!(service.load(ledger_id).unwrap().participants().len(), 2);
    }

    #[test]
    fn rejected_command_appends_nothing() {
        let service = LedgerService::new();
        let ledger_id = LedgerId::new();
        service.dispatch(ledger_id, &add(ledger_id, "A")).unwrap();

        let err = service
            .dispatch(
                ledger_id,
                &LedgerCommand::RemoveParticipant(RemoveParticipant {
                    ledger_id,
                    name: "Z".to_string(),
                    occurred_at: test_time(),
                }),
            )
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::NotFound(_))));

        let snapshot = service.load(ledger_id).unwrap();
        assert_eq!(snapshot.version(), 1);
        assert!(snapshot.participants().contains(&Participant::new("A").unwrap()));
    }
}
