use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use tripsplit_core::Participant;
use tripsplit_ledger::{Expense, LedgerSnapshot};

use crate::error::{ImportError, RecordError};
use crate::extract::extract_records;
use crate::record::{BillRecord, normalize_record};
use crate::source::BillSource;

/// A record left out of an import, by its position in the payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRecord {
    pub index: usize,
    #[serde(serialize_with = "serialize_reason")]
    pub reason: RecordError,
}

fn serialize_reason<S: serde::Serializer>(reason: &RecordError, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(reason)
}

#[derive(Debug, Clone)]
pub struct ImportOutcome {
    /// Ledger after the import.
    pub snapshot: LedgerSnapshot,
    pub imported: usize,
    pub skipped: Vec<SkippedRecord>,
    /// Names that were not in the participant set before the import.
    pub new_participants: Vec<Participant>,
}

/// Replace the snapshot's expense log with the given bill records.
///
/// Each record is normalized independently; those that fail are reported in
/// `skipped` and the rest replace the expense list wholesale (no merge).
/// Every payer and sharer of an imported expense joins the participant set.
/// When no record survives the snapshot is left untouched and
/// `NothingToImport` is returned.
pub fn reconcile(
    snapshot: &LedgerSnapshot,
    records: Vec<Value>,
    now: DateTime<Utc>,
) -> Result<ImportOutcome, ImportError> {
    let mut expenses: Vec<Expense> = Vec::with_capacity(records.len());
    let mut skipped = Vec::new();

    for (index, value) in records.into_iter().enumerate() {
        match BillRecord::from_value(value).and_then(|record| normalize_record(&record, now)) {
            Ok(expense) => expenses.push(expense),
            Err(reason) => {
                tracing::warn!(index, reason = %reason, "bill record skipped");
                skipped.push(SkippedRecord { index, reason });
            }
        }
    }

    if expenses.is_empty() {
        return Err(ImportError::NothingToImport {
            skipped: skipped.len(),
        });
    }

    let imported = expenses.len();
    let next = snapshot.replace_expenses(expenses)?;
    let new_participants: Vec<Participant> = next
        .participants()
        .iter()
        .filter(|p| !snapshot.participants().contains(p))
        .cloned()
        .collect();

    tracing::info!(
        ledger_id = %next.id_typed(),
        imported,
        skipped = skipped.len(),
        new_participants = new_participants.len(),
        "bills imported"
    );

    Ok(ImportOutcome {
        snapshot: next,
        imported,
        skipped,
        new_participants,
    })
}

/// Extract records from a raw payload and reconcile them.
pub fn import_text(
    snapshot: &LedgerSnapshot,
    text: &str,
    now: DateTime<Utc>,
) -> Result<ImportOutcome, ImportError> {
    let records = extract_records(text)?;
    reconcile(snapshot, records, now)
}

/// Fetch from a bill source and reconcile.
pub fn import_from(
    snapshot: &LedgerSnapshot,
    source: &impl BillSource,
    now: DateTime<Utc>,
) -> Result<ImportOutcome, ImportError> {
    tracing::debug!(source = %source.name(), "fetching bills");
    let payload = source.fetch()?;
    import_text(snapshot, &payload, now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;
    use tripsplit_core::{LedgerId, Money};
    use tripsplit_ledger::NewExpense;

    use crate::source::SourceError;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap()
    }

    fn names(participants: &[Participant]) -> Vec<&str> {
        participants.iter().map(Participant::name).collect()
    }

    fn ledger_with(names: &[&str]) -> LedgerSnapshot {
        names
            .iter()
            .try_fold(LedgerSnapshot::empty(LedgerId::new()), |s, n| s.add_participant(n))
            .unwrap()
    }

    struct StaticSource(Result<&'static str, &'static str>);

    impl BillSource for StaticSource {
        fn name(&self) -> String {
            "static".to_string()
        }

        fn fetch(&self) -> Result<String, SourceError> {
            self.0
                .map(str::to_string)
                .map_err(|reason| SourceError::new(self.name(), reason))
        }
    }

    #[test]
    fn encoded_participants_are_imported_as_sharers() {
        let before = LedgerSnapshot::empty(LedgerId::new());
        let outcome = reconcile(
            &before,
            vec![json!({
                "id": 1,
                "topic": "Snacks",
                "amount": 10,
                "payer": "A",
                "participants": "[\"A\",\"B\"]"
            })],
            now(),
        )
        .unwrap();

        let expense = &outcome.snapshot.expenses()[0];
        assert_eq!(names(expense.shared_by()), vec!["A", "B"]);
        assert_eq!(names(&outcome.new_participants), vec!["A", "B"]);
        assert_eq!(outcome.imported, 1);
    }

    #[test]
    fn import_replaces_rather_than_merges() {
        let before = ledger_with(&["Old"])
            .add_expense(NewExpense::new(
                "Local",
                Money::from_cents(500),
                "Old",
                ["Old"],
                now(),
            ))
            .unwrap();

        let outcome = reconcile(
            &before,
            vec![json!({"id": "r1", "amount": 4, "payer": "New", "participants": ["New", "Old"]})],
            now(),
        )
        .unwrap();

        let ids: Vec<&str> = outcome
            .snapshot
            .expenses()
            .iter()
            .map(|e| e.id().as_str())
            .collect();
        assert_eq!(ids, vec!["r1"]);
        assert_eq!(names(outcome.snapshot.participants().as_slice()), vec!["Old", "New"]);
        assert_eq!(names(&outcome.new_participants), vec!["New"]);
    }

    #[test]
    fn bad_records_are_skipped_with_their_index() {
        let before = LedgerSnapshot::empty(LedgerId::new());
        let outcome = reconcile(
            &before,
            vec![
                json!({"topic": "no id"}),
                json!({"id": 2, "payer": "A", "participants": ["A"]}),
                json!("garbage"),
            ],
            now(),
        )
        .unwrap();

        assert_eq!(outcome.imported, 1);
        let skipped: Vec<usize> = outcome.skipped.iter().map(|s| s.index).collect();
        assert_eq!(skipped, vec![0, 2]);
        assert_eq!(outcome.skipped[0].reason, RecordError::MissingId);
    }

    #[test]
    fn empty_payload_leaves_the_ledger_alone() {
        let before = ledger_with(&["A"]);
        let err = reconcile(&before, Vec::new(), now()).unwrap_err();
        assert!(matches!(err, ImportError::NothingToImport { skipped: 0 }));

        let err = reconcile(&before, vec![json!({"topic": "x"})], now()).unwrap_err();
        assert!(matches!(err, ImportError::NothingToImport { skipped: 1 }));
    }

    #[test]
    fn blank_names_do_not_join_the_participant_set() {
        let before = LedgerSnapshot::empty(LedgerId::new());
        let outcome = reconcile(
            &before,
            vec![json!({"id": 1, "amount": 5, "participants": ["A", " "]})],
            now(),
        )
        .unwrap();
        assert_eq!(names(outcome.snapshot.participants().as_slice()), vec!["A"]);
    }

    #[test]
    fn import_from_source_reports_source_failure() {
        let before = LedgerSnapshot::empty(LedgerId::new());

        let ok = import_from(
            &before,
            &StaticSource(Ok(r#"{"success": true, "data": [{"id": 1, "payer": "A"}]}"#)),
            now(),
        )
        .unwrap();
        assert_eq!(ok.imported, 1);

        let err = import_from(&before, &StaticSource(Err("timeout")), now()).unwrap_err();
        assert!(matches!(err, ImportError::Source(_)));
        assert!(err.to_string().contains("timeout"));
    }

    #[test]
    fn skipped_records_serialize_with_readable_reasons() {
        let skipped = SkippedRecord {
            index: 4,
            reason: RecordError::MissingId,
        };
        assert_eq!(
            serde_json::to_value(&skipped).unwrap(),
            json!({"index": 4, "reason": "record has no id"})
        );
    }
}
