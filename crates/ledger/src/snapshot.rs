use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tripsplit_core::{
    Aggregate, AggregateRoot, DomainError, DomainResult, ExpenseId, LedgerId, Participant,
    ParticipantSet,
};
use tripsplit_events::Event;

use crate::expense::{Expense, NewExpense};

/// Immutable view of a ledger: the participant set and the expense log.
///
/// Mutating operations take `&self` and return a new snapshot. Balances and
/// settlements are never stored here; callers recompute them from a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    id: LedgerId,
    participants: ParticipantSet,
    expenses: Vec<Expense>,
    version: u64,
}

impl LedgerSnapshot {
    /// Empty ledger (also the starting point for rehydration).
    pub fn empty(id: LedgerId) -> Self {
        Self {
            id,
            participants: ParticipantSet::new(),
            expenses: Vec::new(),
            version: 0,
        }
    }

    /// Rebuild from an event history.
    pub fn rehydrate<'a>(id: LedgerId, events: impl IntoIterator<Item = &'a LedgerEvent>) -> Self {
        let mut snapshot = Self::empty(id);
        for event in events {
            snapshot.apply(event);
        }
        snapshot
    }

    pub fn id_typed(&self) -> LedgerId {
        self.id
    }

    pub fn participants(&self) -> &ParticipantSet {
        &self.participants
    }

    pub fn expenses(&self) -> &[Expense] {
        &self.expenses
    }

    pub fn expense(&self, id: &ExpenseId) -> Option<&Expense> {
        self.expenses.iter().find(|e| e.id() == id)
    }

    /// Handle a command and fold its events into a new snapshot.
    pub fn execute(&self, command: &LedgerCommand) -> DomainResult<Self> {
        let events = self.handle(command)?;
        let mut next = self.clone();
        for event in &events {
            next.apply(event);
        }
        Ok(next)
    }

    pub fn add_participant(&self, name: &str) -> DomainResult<Self> {
        self.execute(&LedgerCommand::AddParticipant(AddParticipant {
            ledger_id: self.id,
            name: name.to_string(),
            occurred_at: Utc::now(),
        }))
    }

    pub fn remove_participant(&self, name: &str) -> DomainResult<Self> {
        self.execute(&LedgerCommand::RemoveParticipant(RemoveParticipant {
            ledger_id: self.id,
            name: name.to_string(),
            occurred_at: Utc::now(),
        }))
    }

    pub fn add_expense(&self, expense: NewExpense) -> DomainResult<Self> {
        self.execute(&LedgerCommand::AddExpense(AddExpense {
            ledger_id: self.id,
            expense,
            occurred_at: Utc::now(),
        }))
    }

    pub fn remove_expense(&self, expense_id: &ExpenseId) -> DomainResult<Self> {
        self.execute(&LedgerCommand::RemoveExpense(RemoveExpense {
            ledger_id: self.id,
            expense_id: expense_id.clone(),
            occurred_at: Utc::now(),
        }))
    }

    /// Wholesale replace of the expense log; participants referenced by the new
    /// expenses are added to the set.
    pub fn replace_expenses(&self, expenses: Vec<Expense>) -> DomainResult<Self> {
        self.execute(&LedgerCommand::ReplaceExpenses(ReplaceExpenses {
            ledger_id: self.id,
            expenses,
            occurred_at: Utc::now(),
        }))
    }
}

impl AggregateRoot for LedgerSnapshot {
    type Id = LedgerId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: AddParticipant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddParticipant {
    pub ledger_id: LedgerId,
    pub name: String,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RemoveParticipant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveParticipant {
    pub ledger_id: LedgerId,
    pub name: String,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AddExpense.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddExpense {
    pub ledger_id: LedgerId,
    pub expense: NewExpense,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RemoveExpense.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveExpense {
    pub ledger_id: LedgerId,
    pub expense_id: ExpenseId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ReplaceExpenses (import).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplaceExpenses {
    pub ledger_id: LedgerId,
    pub expenses: Vec<Expense>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerCommand {
    AddParticipant(AddParticipant),
    RemoveParticipant(RemoveParticipant),
    AddExpense(AddExpense),
    RemoveExpense(RemoveExpense),
    ReplaceExpenses(ReplaceExpenses),
}

/// Event: ParticipantAdded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantAdded {
    pub ledger_id: LedgerId,
    pub participant: Participant,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ParticipantRemoved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantRemoved {
    pub ledger_id: LedgerId,
    pub participant: Participant,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ExpenseAdded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseAdded {
    pub ledger_id: LedgerId,
    pub expense: Expense,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ExpenseRemoved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseRemoved {
    pub ledger_id: LedgerId,
    pub expense_id: ExpenseId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ExpensesReplaced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpensesReplaced {
    pub ledger_id: LedgerId,
    pub expenses: Vec<Expense>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEvent {
    ParticipantAdded(ParticipantAdded),
    ParticipantRemoved(ParticipantRemoved),
    ExpenseAdded(ExpenseAdded),
    ExpenseRemoved(ExpenseRemoved),
    ExpensesReplaced(ExpensesReplaced),
}

impl Event for LedgerEvent {
    fn event_type(&self) -> &'static str {
        match self {
            LedgerEvent::ParticipantAdded(_) => "ledger.participant.added",
            LedgerEvent::ParticipantRemoved(_) => "ledger.participant.removed",
            LedgerEvent::ExpenseAdded(_) => "ledger.expense.added",
            LedgerEvent::ExpenseRemoved(_) => "ledger.expense.removed",
            LedgerEvent::ExpensesReplaced(_) => "ledger.expenses.replaced",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            LedgerEvent::ParticipantAdded(e) => e.occurred_at,
            LedgerEvent::ParticipantRemoved(e) => e.occurred_at,
            LedgerEvent::ExpenseAdded(e) => e.occurred_at,
            LedgerEvent::ExpenseRemoved(e) => e.occurred_at,
            LedgerEvent::ExpensesReplaced(e) => e.occurred_at,
        }
    }
}

impl Aggregate for LedgerSnapshot {
    type Command = LedgerCommand;
    type Event = LedgerEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            LedgerEvent::ParticipantAdded(e) => {
                self.participants.insert(e.participant.clone());
            }
            LedgerEvent::ParticipantRemoved(e) => {
                self.participants.remove(&e.participant);
            }
            LedgerEvent::ExpenseAdded(e) => {
                self.expenses.push(e.expense.clone());
            }
            LedgerEvent::ExpenseRemoved(e) => {
                self.expenses.retain(|x| x.id() != &e.expense_id);
            }
            LedgerEvent::ExpensesReplaced(e) => {
                self.expenses = e.expenses.clone();
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            LedgerCommand::AddParticipant(cmd) => self.handle_add_participant(cmd),
            LedgerCommand::RemoveParticipant(cmd) => self.handle_remove_participant(cmd),
            LedgerCommand::AddExpense(cmd) => self.handle_add_expense(cmd),
            LedgerCommand::RemoveExpense(cmd) => self.handle_remove_expense(cmd),
            LedgerCommand::ReplaceExpenses(cmd) => self.handle_replace_expenses(cmd),
        }
    }
}

impl LedgerSnapshot {
    fn ensure_ledger_id(&self, ledger_id: LedgerId) -> Result<(), DomainError> {
        if self.id != ledger_id {
            return Err(DomainError::invariant("ledger_id mismatch"));
        }
        Ok(())
    }

    /// `ParticipantAdded` events for every non-blank name not yet registered,
    /// in first-reference order.
    fn register_missing<'a>(
        &self,
        ledger_id: LedgerId,
        names: impl IntoIterator<Item = &'a Participant>,
        occurred_at: DateTime<Utc>,
    ) -> Vec<LedgerEvent> {
        let mut seen = ParticipantSet::new();
        for participant in names {
            if participant.is_blank() || self.participants.contains(participant) {
                continue;
            }
            seen.insert(participant.clone());
        }
        seen.iter()
            .map(|participant| {
                LedgerEvent::ParticipantAdded(ParticipantAdded {
                    ledger_id,
                    participant: participant.clone(),
                    occurred_at,
                })
            })
            .collect()
    }

    fn handle_add_participant(&self, cmd: &AddParticipant) -> DomainResult<Vec<LedgerEvent>> {
        self.ensure_ledger_id(cmd.ledger_id)?;

        let participant = Participant::new(&cmd.name)?;
        if self.participants.contains(&participant) {
            return Err(DomainError::conflict(format!(
                "participant {participant} already exists"
            )));
        }

        Ok(vec![LedgerEvent::ParticipantAdded(ParticipantAdded {
            ledger_id: cmd.ledger_id,
            participant,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_remove_participant(&self, cmd: &RemoveParticipant) -> DomainResult<Vec<LedgerEvent>> {
        self.ensure_ledger_id(cmd.ledger_id)?;

        let participant = Participant::new(&cmd.name)?;
        if !self.participants.contains(&participant) {
            return Err(DomainError::not_found(format!("participant {participant}")));
        }

        let referencing = self
            .expenses
            .iter()
            .filter(|e| e.involves(&participant))
            .count();
        if referencing > 0 {
            return Err(DomainError::invariant(format!(
                "cannot remove {participant}: referenced by {referencing} expense(s); delete those expenses first"
            )));
        }

        Ok(vec![LedgerEvent::ParticipantRemoved(ParticipantRemoved {
            ledger_id: cmd.ledger_id,
            participant,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_add_expense(&self, cmd: &AddExpense) -> DomainResult<Vec<LedgerEvent>> {
        self.ensure_ledger_id(cmd.ledger_id)?;

        let expense = cmd.expense.clone().validate()?;
        if self.expense(expense.id()).is_some() {
            return Err(DomainError::conflict(format!(
                "expense {} already exists",
                expense.id()
            )));
        }

        let mut events = self.register_missing(cmd.ledger_id, expense.referenced(), cmd.occurred_at);
        events.push(LedgerEvent::ExpenseAdded(ExpenseAdded {
            ledger_id: cmd.ledger_id,
            expense,
            occurred_at: cmd.occurred_at,
        }));
        Ok(events)
    }

    fn handle_remove_expense(&self, cmd: &RemoveExpense) -> DomainResult<Vec<LedgerEvent>> {
        self.ensure_ledger_id(cmd.ledger_id)?;

        if self.expense(&cmd.expense_id).is_none() {
            return Err(DomainError::not_found(format!("expense {}", cmd.expense_id)));
        }

        Ok(vec![LedgerEvent::ExpenseRemoved(ExpenseRemoved {
            ledger_id: cmd.ledger_id,
            expense_id: cmd.expense_id.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_replace_expenses(&self, cmd: &ReplaceExpenses) -> DomainResult<Vec<LedgerEvent>> {
        self.ensure_ledger_id(cmd.ledger_id)?;

        let mut events = self.register_missing(
            cmd.ledger_id,
            cmd.expenses.iter().flat_map(|e| e.referenced()),
            cmd.occurred_at,
        );
        events.push(LedgerEvent::ExpensesReplaced(ExpensesReplaced {
            ledger_id: cmd.ledger_id,
            expenses: cmd.expenses.clone(),
            occurred_at: cmd.occurred_at,
        }));
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tripsplit_core::Money;

    fn test_time() -> DateTime<Utc> {
        DateTime::<Utc>::UNIX_EPOCH
    }

    fn with_participants(names: &[&str]) -> LedgerSnapshot {
        names
            .iter()
            .try_fold(LedgerSnapshot::empty(LedgerId::new()), |s, n| {
                s.add_participant(n)
            })
            .unwrap()
    }

    fn expense(amount: i64, payer: &str, shared_by: &[&str]) -> NewExpense {
        NewExpense::new(
            "Taxi",
            Money::from_cents(amount),
            payer,
            shared_by.iter().copied(),
            test_time(),
        )
    }

    fn names(snapshot: &LedgerSnapshot) -> Vec<&str> {
        snapshot.participants().iter().map(Participant::name).collect()
    }

    #[test]
    fn add_participant_trims_and_rejects_duplicates() {
        let snapshot = with_participants(&[" A ", "B"]);
        assert_eq!(names(&snapshot), vec!["A", "B"]);

        let err = snapshot.add_participant("A").unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
        assert!(matches!(
            snapshot.add_participant("  "),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn mutations_leave_the_original_snapshot_untouched() {
        let before = with_participants(&["A", "B"]);
        let after = before.add_expense(expense(5000, "A", &["A", "B"])).unwrap();

        assert!(before.expenses().is_empty());
        assert_eq!(after.expenses().len(), 1);
        assert!(after.version() > before.version());
    }

    #[test]
    fn removing_a_referenced_participant_is_rejected() {
        let snapshot = with_participants(&["A", "B", "C"])
            .add_expense(expense(9000, "A", &["A", "B"]))
            .unwrap();

        let err = snapshot.remove_participant("B").unwrap_err();
        match err {
            DomainError::InvariantViolation(msg) if msg.contains("referenced") => {}
            other => panic!("expected invariant violation, got {other:?}"),
        }

        let payer_err = snapshot.remove_participant("A").unwrap_err();
        assert!(matches!(payer_err, DomainError::InvariantViolation(_)));

        assert_eq!(names(&snapshot), vec!["A", "B", "C"]);
        assert_eq!(snapshot.expenses().len(), 1);
    }

    #[test]
    fn unreferenced_participant_can_be_removed() {
        let snapshot = with_participants(&["A", "B", "C"])
            .add_expense(expense(9000, "A", &["A", "B"]))
            .unwrap()
            .remove_participant("C")
            .unwrap();
        assert_eq!(names(&snapshot), vec!["A", "B"]);

        assert!(matches!(
            snapshot.remove_participant("Z"),
            Err(DomainError::NotFound(_))
        ));
    }

    #[test]
    fn removing_the_expense_unblocks_participant_removal() {
        let input = expense(9000, "A", &["A", "B"]);
        let id = input.id.clone();
        let snapshot = with_participants(&["A", "B"])
            .add_expense(input)
            .unwrap()
            .remove_expense(&id)
            .unwrap()
            .remove_participant("B")
            .unwrap();

        assert!(snapshot.expenses().is_empty());
        assert_eq!(names(&snapshot), vec!["A"]);
    }

    #[test]
    fn add_expense_registers_unknown_participants_in_reference_order() {
        let snapshot = with_participants(&["A"])
            .add_expense(expense(3000, "C", &["A", "B", "C"]))
            .unwrap();
        assert_eq!(names(&snapshot), vec!["A", "C", "B"]);
    }

    #[test]
    fn duplicate_expense_id_is_a_conflict() {
        let input = expense(100, "A", &["A"]);
        let snapshot = with_participants(&["A"]).add_expense(input.clone()).unwrap();
        assert!(matches!(
            snapshot.add_expense(input),
            Err(DomainError::Conflict(_))
        ));
    }

    #[test]
    fn invalid_expense_is_rejected_without_state_change() {
        let snapshot = with_participants(&["A", "B"]);
        let err = snapshot.add_expense(expense(100, "A", &[])).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert!(snapshot.expenses().is_empty());
    }

    #[test]
    fn removing_unknown_expense_is_not_found() {
        let snapshot = with_participants(&["A"]);
        let missing = ExpenseId::parse("nope").unwrap();
        assert!(matches!(
            snapshot.remove_expense(&missing),
            Err(DomainError::NotFound(_))
        ));
    }

    #[test]
    fn replace_expenses_swaps_the_log_and_unions_participants() {
        let local = expense(100, "A", &["A"]);
        let snapshot = with_participants(&["A", "Z"]).add_expense(local).unwrap();

        let imported = Expense::from_import(
            ExpenseId::parse("1").unwrap(),
            "Hotel".to_string(),
            Money::from_cents(9000),
            Participant::lenient("B"),
            vec![Participant::lenient("A"), Participant::lenient("C")],
            test_time(),
        );
        let replaced = snapshot.replace_expenses(vec![imported.clone()]).unwrap();

        assert_eq!(replaced.expenses(), &[imported]);
        assert_eq!(names(&replaced), vec!["A", "Z", "B", "C"]);
    }

    #[test]
    fn command_for_another_ledger_is_rejected() {
        let snapshot = with_participants(&[]);
        let cmd = LedgerCommand::AddParticipant(AddParticipant {
            ledger_id: LedgerId::new(),
            name: "A".to_string(),
            occurred_at: test_time(),
        });
        assert!(matches!(
            snapshot.handle(&cmd),
            Err(DomainError::InvariantViolation(_))
        ));
    }

    #[test]
    fn rehydration_matches_direct_execution() {
        let ledger_id = LedgerId::new();
        let base = LedgerSnapshot::empty(ledger_id);
        let commands = vec![
            LedgerCommand::AddParticipant(AddParticipant {
                ledger_id,
                name: "A".to_string(),
                occurred_at: test_time(),
            }),
            LedgerCommand::AddExpense(AddExpense {
                ledger_id,
                expense: expense(1200, "A", &["A", "B"]),
                occurred_at: test_time(),
            }),
        ];

        let mut history = Vec::new();
        let mut current = base;
        for cmd in &commands {
            let events = current.handle(cmd).unwrap();
            for e in &events {
                current.apply(e);
            }
            history.extend(events);
        }

        let rebuilt = LedgerSnapshot::rehydrate(ledger_id, &history);
        assert_eq!(rebuilt, current);
        assert_eq!(rebuilt.version(), history.len() as u64);
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: a participant referenced by any expense can never be removed,
        /// and a rejected removal leaves the snapshot equal to its input.
        #[test]
        fn referenced_participants_are_never_removed(
            payer in 0usize..4,
            sharers in prop::collection::vec(0usize..4, 1..4),
            target in 0usize..4,
        ) {
            let pool = ["A", "B", "C", "D"];
            let snapshot = with_participants(&pool);
            let shared: Vec<&str> = sharers.iter().map(|i| pool[*i]).collect();
            let snapshot = snapshot
                .add_expense(expense(1000, pool[payer], &shared))
                .unwrap();

            let referenced = payer == target || sharers.contains(&target);
            match snapshot.remove_participant(pool[target]) {
                Ok(next) => {
                    prop_assert!(!referenced);
                    prop_assert_eq!(next.participants().len(), pool.len() - 1);
                }
                Err(_) => prop_assert!(referenced),
            }
            prop_assert_eq!(snapshot.participants().len(), pool.len());
        }
    }
}
