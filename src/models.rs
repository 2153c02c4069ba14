use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::FinError;

/// Largest amount a single record may carry. Keeps per-user sums finite.
pub const MAX_AMOUNT: f64 = 1_000_000_000_000.0;

/// The two kinds of entry a user can record or upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Income,
    Expense,
}

impl RecordKind {
    pub fn key(&self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }

    pub fn table(&self) -> &'static str {
        match self {
            Self::Income => "incomes",
            Self::Expense => "expenses",
        }
    }

    /// Columns an uploaded row must carry, in schema order.
    pub fn required_columns(&self) -> &'static [&'static str] {
        match self {
            Self::Income => &["amount", "source"],
            Self::Expense => &["amount", "category", "description"],
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for RecordKind {
    type Err = FinError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "income" | "incomes" => Ok(Self::Income),
            "expense" | "expenses" => Ok(Self::Expense),
            other => Err(FinError::InvalidInput(format!("unknown record kind: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: String,
    pub username: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Income {
    pub id: i64,
    pub user_id: i64,
    pub amount: f64,
    pub source: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Expense {
    pub id: i64,
    pub user_id: i64,
    pub amount: f64,
    pub category: String,
    pub description: String,
    pub created_at: String,
}

/// A validated entry that has not been written yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum NewRecord {
    Income {
        user_id: i64,
        amount: f64,
        source: String,
    },
    Expense {
        user_id: i64,
        amount: f64,
        category: String,
        description: String,
    },
}

impl NewRecord {
    pub fn kind(&self) -> RecordKind {
        match self {
            Self::Income { .. } => RecordKind::Income,
            Self::Expense { .. } => RecordKind::Expense,
        }
    }
}

/// One parsed spreadsheet row: lower-cased column name to cell text.
/// `None` marks an empty cell.
pub type SheetRow = BTreeMap<String, Option<String>>;

/// A deferred bulk upload.
#[derive(Debug, Clone, Serialize)]
pub struct TrackingJob {
    pub tracking_code: String,
    pub user_id: i64,
    pub record_kind: RecordKind,
    pub ready_time: DateTime<Utc>,
    pub issue_count: i64,
    pub issues: Vec<String>,
    pub completed_at: Option<DateTime<Utc>>,
}
