use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Server-assigned identity of a closed period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SnapshotId(pub i64);

impl fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Close request as received; every field is optional so validation can name what is
/// missing instead of failing on the first absent key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewSnapshot {
    #[serde(default)]
    pub branch_key: Option<String>,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub period_year: Option<i32>,
    #[serde(default)]
    pub period_month: Option<u32>,
    #[serde(default)]
    pub payload: Option<Value>,
    #[serde(default)]
    pub meta: Option<Value>,
}

impl NewSnapshot {
    pub fn validate(self) -> Result<ValidatedSnapshot, SnapshotError> {
        let present = |value: &Option<String>| {
            value
                .as_deref()
                .map(|text| !text.trim().is_empty())
                .unwrap_or(false)
        };

        let mut missing = Vec::new();
        if !present(&self.branch_key) {
            missing.push("branch_key");
        }
        if !present(&self.branch) {
            missing.push("branch");
        }
        if self.period_year.is_none() {
            missing.push("period_year");
        }
        if self.period_month.is_none() {
            missing.push("period_month");
        }
        if matches!(self.payload, None | Some(Value::Null)) {
            missing.push("payload");
        }

        match self {
            NewSnapshot {
                branch_key: Some(branch_key),
                branch: Some(branch),
                period_year: Some(period_year),
                period_month: Some(period_month),
                payload: Some(payload),
                meta,
            } if missing.is_empty() => {
                if !(1..=12).contains(&period_month) {
                    return Err(SnapshotError::InvalidField {
                        field: "period_month",
                        reason: format!("{period_month} is not a month between 1 and 12"),
                    });
                }

                Ok(ValidatedSnapshot {
                    branch_key: branch_key.trim().to_string(),
                    branch: branch.trim().to_string(),
                    period_year,
                    period_month,
                    payload,
                    meta: meta.filter(|value| !value.is_null()),
                })
            }
            _ => Err(SnapshotError::Validation { missing }),
        }
    }
}

/// Close request that passed validation and is ready to append.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedSnapshot {
    pub branch_key: String,
    pub branch: String,
    pub period_year: i32,
    pub period_month: u32,
    pub payload: Value,
    pub meta: Option<Value>,
}

impl ValidatedSnapshot {
    pub fn into_record(self, id: SnapshotId, closed_at: DateTime<Utc>) -> PeriodSnapshot {
        PeriodSnapshot {
            id,
            branch_key: self.branch_key,
            branch: self.branch,
            period_year: self.period_year,
            period_month: self.period_month,
            payload: self.payload,
            meta: self.meta,
            closed_at,
        }
    }
}

/// Durable record of a closed period. Never mutated after insertion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodSnapshot {
    pub id: SnapshotId,
    pub branch_key: String,
    pub branch: String,
    pub period_year: i32,
    pub period_month: u32,
    pub payload: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
    pub closed_at: DateTime<Utc>,
}

impl PeriodSnapshot {
    pub fn summary(&self) -> SnapshotSummary {
        SnapshotSummary {
            id: self.id,
            period_year: self.period_year,
            period_month: self.period_month,
            closed_at: self.closed_at,
        }
    }

    pub fn matches_period(&self, year: i32, month: u32) -> bool {
        self.period_year == year && self.period_month == month
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotSummary {
    pub id: SnapshotId,
    pub period_year: i32,
    pub period_month: u32,
    pub closed_at: DateTime<Utc>,
}

/// Diagnostics reported by the persistence layer, kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PersistenceFailure {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl PersistenceFailure {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
            detail: None,
            hint: None,
        }
    }
}

impl fmt::Display for PersistenceFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(code) = &self.code {
            write!(f, " (code {code})")?;
        }
        if let Some(detail) = &self.detail {
            write!(f, "; detail: {detail}")?;
        }
        if let Some(hint) = &self.hint {
            write!(f, "; hint: {hint}")?;
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("missing required field(s): {}", missing.join(", "))]
    Validation { missing: Vec<&'static str> },
    #[error("invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },
    #[error("snapshot store failure: {0}")]
    Persistence(PersistenceFailure),
}

impl From<sqlx::Error> for SnapshotError {
    fn from(err: sqlx::Error) -> Self {
        let failure = match &err {
            sqlx::Error::Database(db) => PersistenceFailure {
                message: db.message().to_string(),
                code: db.code().map(|code| code.into_owned()),
                detail: db.constraint().map(|name| format!("constraint {name}")),
                hint: db.table().map(|table| format!("table {table}")),
            },
            other => PersistenceFailure::message(other.to_string()),
        };
        SnapshotError::Persistence(failure)
    }
}
