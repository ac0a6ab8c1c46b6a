//! Wire shape of a bill record and its normalization into an [`Expense`].

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use tripsplit_core::{ExpenseId, Money, Participant};
use tripsplit_ledger::Expense;

use crate::error::RecordError;

/// Id as sent by the bill API: usually a number, sometimes a string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawId {
    Number(serde_json::Number),
    Text(String),
    Other(Value),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawAmount {
    Number(f64),
    Text(String),
    Other(Value),
}

/// Participants arrive either decoded or as a JSON-encoded string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawParticipants {
    List(Vec<String>),
    Encoded(String),
    Other(Value),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawText {
    Text(String),
    Other(Value),
}

impl RawText {
    fn into_string(self) -> String {
        match self {
            RawText::Text(s) => s,
            RawText::Other(Value::Null) => String::new(),
            RawText::Other(Value::Number(n)) => n.to_string(),
            RawText::Other(_) => String::new(),
        }
    }
}

/// One bill as received from the external source. Every field is optional.
///
/// Field names follow the bill API (`topic`, `participants`, `created_at`);
/// the ledger's own names (`description`, `shared_by`/`sharedBy`, `date`) are
/// accepted too so that exported expenses can be imported back.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BillRecord {
    #[serde(default)]
    pub id: Option<RawId>,
    #[serde(default, alias = "description")]
    pub topic: Option<RawText>,
    #[serde(default)]
    pub amount: Option<RawAmount>,
    #[serde(default)]
    pub payer: Option<RawText>,
    #[serde(default, alias = "shared_by", alias = "sharedBy")]
    pub participants: Option<RawParticipants>,
    #[serde(default, alias = "date")]
    pub created_at: Option<RawText>,
    /// Informational only; amounts are never converted.
    #[serde(default)]
    pub currency: Option<RawText>,
    #[serde(default)]
    pub note: Option<RawText>,
}

impl BillRecord {
    /// Decode one loosely-typed JSON value.
    pub fn from_value(value: Value) -> Result<Self, RecordError> {
        if !value.is_object() {
            return Err(RecordError::Malformed(type_name(&value).to_string()));
        }
        serde_json::from_value(value).map_err(|e| RecordError::Malformed(e.to_string()))
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn normalize_id(raw: Option<&RawId>) -> Result<ExpenseId, RecordError> {
    let token = match raw {
        None | Some(RawId::Other(Value::Null)) => return Err(RecordError::MissingId),
        Some(RawId::Number(n)) => n.to_string(),
        Some(RawId::Text(s)) => s.clone(),
        Some(RawId::Other(_)) => return Err(RecordError::InvalidId),
    };
    ExpenseId::parse(token).map_err(|_| RecordError::MissingId)
}

/// Non-numeric or missing amounts become zero. Numbers beyond
/// [`Money::MAX_AMOUNT`] reject the record.
fn normalize_amount(raw: Option<&RawAmount>) -> Result<Money, RecordError> {
    let amount = match raw {
        Some(RawAmount::Number(n)) => Money::from_major(*n),
        Some(RawAmount::Text(s)) => match s.parse::<Money>() {
            Ok(amount) => Some(amount),
            Err(_) => match s.trim().parse::<f64>() {
                Ok(value) if value.is_finite() => Money::from_major(value),
                _ => return Ok(Money::ZERO),
            },
        },
        Some(RawAmount::Other(_)) | None => return Ok(Money::ZERO),
    };

    match amount {
        Some(amount) if amount.is_within_limit() => Ok(amount),
        _ => Err(RecordError::AmountOutOfRange),
    }
}

/// Sharers from a list or a JSON-encoded list; anything else is empty.
fn normalize_participants(raw: Option<&RawParticipants>) -> Vec<Participant> {
    let names: Vec<String> = match raw {
        Some(RawParticipants::List(names)) => names.clone(),
        Some(RawParticipants::Encoded(encoded)) => {
            match serde_json::from_str::<Vec<String>>(encoded) {
                Ok(names) => names,
                Err(e) => {
                    tracing::warn!(error = %e, "participants string is not a JSON array of names");
                    Vec::new()
                }
            }
        }
        Some(RawParticipants::Other(_)) | None => Vec::new(),
    };
    names.iter().map(Participant::lenient).collect()
}

/// RFC 3339, or a naive ISO timestamp (taken as UTC) as produced by the bill API.
fn normalize_date(
    raw: Option<&RawText>,
    now: DateTime<Utc>,
) -> Result<DateTime<Utc>, RecordError> {
    let text = match raw {
        Some(RawText::Text(s)) if !s.trim().is_empty() => s.trim(),
        _ => return Ok(now),
    };

    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Ok(parsed.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(naive.and_utc());
        }
    }
    Err(RecordError::InvalidDate(text.to_string()))
}

/// Normalize a bill record into an expense.
///
/// Missing fields take defaults (empty description/payer, zero amount, no
/// sharers, `now` as date). Only a missing or unusable id, a timestamp that
/// is present but unreadable, or an out-of-range amount rejects the record. The result is not validated
/// further: the balance calculator tolerates what this produces.
pub fn normalize_record(record: &BillRecord, now: DateTime<Utc>) -> Result<Expense, RecordError> {
    let id = normalize_id(record.id.as_ref())?;
    let date = normalize_date(record.created_at.as_ref(), now)?;
    let amount = normalize_amount(record.amount.as_ref())?;

    let description = record
        .topic
        .clone()
        .map(RawText::into_string)
        .unwrap_or_default();
    let payer = record
        .payer
        .clone()
        .map(RawText::into_string)
        .unwrap_or_default();

    Ok(Expense::from_import(
        id,
        description,
        amount,
        Participant::lenient(payer),
        normalize_participants(record.participants.as_ref()),
        date,
    ))
}
