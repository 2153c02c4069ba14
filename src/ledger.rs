use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use serde::{Deserialize, Serialize};

use crate::error::{FinError, Result};
use crate::models::{Expense, Income, NewRecord, RecordKind, MAX_AMOUNT};

fn check_amount(amount: f64) -> Result<()> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(FinError::InvalidInput("Amount cannot be negative".to_string()));
    }
    if amount > MAX_AMOUNT {
        return Err(FinError::InvalidInput(format!("Amount cannot exceed {MAX_AMOUNT:.0}")));
    }
    Ok(())
}

fn not_found(kind: RecordKind) -> FinError {
    match kind {
        RecordKind::Income => FinError::NotFound("Income".to_string()),
        RecordKind::Expense => FinError::NotFound("Expense".to_string()),
    }
}

// ---------------------------------------------------------------------------
// Inserts
// ---------------------------------------------------------------------------

/// Write one validated record. Callers that insert batches wrap this in a
/// transaction.
pub fn insert_record(conn: &Connection, record: &NewRecord) -> Result<i64> {
    match record {
        NewRecord::Income {
            user_id,
            amount,
            source,
        } => {
            check_amount(*amount)?;
            conn.prepare_cached("INSERT INTO incomes (user_id, amount, source) VALUES (?1, ?2, ?3)")?
                .execute(rusqlite::params![user_id, amount, source])?;
        }
        NewRecord::Expense {
            user_id,
            amount,
            category,
            description,
        } => {
            check_amount(*amount)?;
            conn.prepare_cached(
                "INSERT INTO expenses (user_id, amount, category, description) VALUES (?1, ?2, ?3, ?4)",
            )?
            .execute(rusqlite::params![user_id, amount, category, description])?;
        }
    }
    Ok(conn.last_insert_rowid())
}

pub fn add_income(conn: &Connection, user_id: i64, amount: f64, source: &str) -> Result<i64> {
    insert_record(
        conn,
        &NewRecord::Income {
            user_id,
            amount,
            source: source.to_string(),
        },
    )
}

pub fn add_expense(
    conn: &Connection,
    user_id: i64,
    amount: f64,
    category: &str,
    description: &str,
) -> Result<i64> {
    insert_record(
        conn,
        &NewRecord::Expense {
            user_id,
            amount,
            category: category.to_string(),
            description: description.to_string(),
        },
    )
}

// ---------------------------------------------------------------------------
// Owner-scoped updates and deletes
// ---------------------------------------------------------------------------

pub fn update_income(conn: &Connection, user_id: i64, id: i64, amount: f64, source: &str) -> Result<()> {
    check_amount(amount)?;
    let changed = conn.execute(
        "UPDATE incomes SET amount = ?1, source = ?2 WHERE id = ?3 AND user_id = ?4",
        rusqlite::params![amount, source, id, user_id],
    )?;
    if changed == 0 {
        return Err(not_found(RecordKind::Income));
    }
    Ok(())
}

pub fn update_expense(
    conn: &Connection,
    user_id: i64,
    id: i64,
    amount: f64,
    category: &str,
    description: &str,
) -> Result<()> {
    check_amount(amount)?;
    let changed = conn.execute(
        "UPDATE expenses SET amount = ?1, category = ?2, description = ?3 WHERE id = ?4 AND user_id = ?5",
        rusqlite::params![amount, category, description, id, user_id],
    )?;
    if changed == 0 {
        return Err(not_found(RecordKind::Expense));
    }
    Ok(())
}

pub fn delete_record(conn: &Connection, kind: RecordKind, user_id: i64, id: i64) -> Result<()> {
    let sql = format!("DELETE FROM {} WHERE id = ?1 AND user_id = ?2", kind.table());
    let changed = conn.execute(&sql, rusqlite::params![id, user_id])?;
    if changed == 0 {
        return Err(not_found(kind));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Listing and search
// ---------------------------------------------------------------------------

/// Optional search criteria. `text` matches the income source or the expense
/// category as a substring; `date` is `YYYY-MM-DD` of creation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchFilter {
    pub min_amount: Option<f64>,
    pub max_amount: Option<f64>,
    pub text: Option<String>,
    pub date: Option<String>,
}

fn filter_clause(filter: &SearchFilter, text_column: &str) -> Result<(String, Vec<Value>)> {
    let mut clause = String::new();
    let mut params = Vec::new();

    if let Some(text) = filter.text.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        clause.push_str(&format!(" AND {text_column} LIKE ?"));
        params.push(Value::Text(format!("%{text}%")));
    }
    if let Some(date) = filter.date.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
        chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map_err(|_| FinError::InvalidInput(format!("invalid date '{date}', expected YYYY-MM-DD")))?;
        clause.push_str(" AND date(created_at) = ?");
        params.push(Value::Text(date.to_string()));
    }
    if let (Some(min), Some(max)) = (filter.min_amount, filter.max_amount) {
        if min > max {
            return Err(FinError::InvalidInput(
                "minimum amount is greater than maximum amount".to_string(),
            ));
        }
    }
    if let Some(min) = filter.min_amount {
        clause.push_str(" AND amount >= ?");
        params.push(Value::Real(min));
    }
    if let Some(max) = filter.max_amount {
        clause.push_str(" AND amount <= ?");
        params.push(Value::Real(max));
    }
    Ok((clause, params))
}

pub fn list_incomes(conn: &Connection, user_id: i64, filter: &SearchFilter) -> Result<Vec<Income>> {
    let (clause, mut params) = filter_clause(filter, "source")?;
    params.insert(0, Value::Integer(user_id));
    let sql = format!(
        "SELECT id, user_id, amount, source, created_at FROM incomes WHERE user_id = ?{clause} ORDER BY id"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(params), |row| {
        Ok(Income {
            id: row.get(0)?,
            user_id: row.get(1)?,
            amount: row.get(2)?,
            source: row.get(3)?,
            created_at: row.get(4)?,
        })
    })?;
    Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
}

pub fn list_expenses(conn: &Connection, user_id: i64, filter: &SearchFilter) -> Result<Vec<Expense>> {
    let (clause, mut params) = filter_clause(filter, "category")?;
    params.insert(0, Value::Integer(user_id));
    let sql = format!(
        "SELECT id, user_id, amount, category, description, created_at FROM expenses \
         WHERE user_id = ?{clause} ORDER BY id"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(params), |row| {
        Ok(Expense {
            id: row.get(0)?,
            user_id: row.get(1)?,
            amount: row.get(2)?,
            category: row.get(3)?,
            description: row.get(4)?,
            created_at: row.get(5)?,
        })
    })?;
    Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub income_count: i64,
    pub expense_count: i64,
    pub total_income: f64,
    pub total_expenses: f64,
    pub balance: f64,
}

pub fn summary(conn: &Connection, user_id: i64) -> Result<Summary> {
    let (income_count, total_income): (i64, f64) = conn.query_row(
        "SELECT count(*), COALESCE(SUM(amount), 0.0) FROM incomes WHERE user_id = ?1",
        [user_id],
        |r| Ok((r.get(0)?, r.get(1)?)),
    )?;
    let (expense_count, total_expenses): (i64, f64) = conn.query_row(
        "SELECT count(*), COALESCE(SUM(amount), 0.0) FROM expenses WHERE user_id = ?1",
        [user_id],
        |r| Ok((r.get(0)?, r.get(1)?)),
    )?;
    Ok(Summary {
        income_count,
        expense_count,
        total_income,
        total_expenses,
        balance: total_income - total_expenses,
    })
}
