use std::path::{Path, PathBuf};

use rusqlite::Connection;

use crate::error::Result;
use crate::ledger::{list_expenses, list_incomes, SearchFilter};

pub struct ExportPaths {
    pub incomes: PathBuf,
    pub expenses: PathBuf,
}

/// Write a user's incomes and expenses as two CSV files under `dir`.
pub fn export_user(conn: &Connection, user_id: i64, dir: &Path) -> Result<ExportPaths> {
    std::fs::create_dir_all(dir)?;
    let all = SearchFilter::default();

    let incomes = dir.join(format!("financial_summary_user_{user_id}_incomes.csv"));
    let mut wtr = csv::Writer::from_path(&incomes)?;
    wtr.write_record(["id", "amount", "source", "created_at"])?;
    for income in list_incomes(conn, user_id, &all)? {
        wtr.write_record([
            income.id.to_string(),
            format!("{:.2}", income.amount),
            income.source,
            income.created_at,
        ])?;
    }
    wtr.flush()?;

    let expenses = dir.join(format!("financial_summary_user_{user_id}_expenses.csv"));
    let mut wtr = csv::Writer::from_path(&expenses)?;
    wtr.write_record(["id", "amount", "category", "description", "created_at"])?;
    for expense in list_expenses(conn, user_id, &all)? {
        wtr.write_record([
            expense.id.to_string(),
            format!("{:.2}", expense.amount),
            expense.category,
            expense.description,
            expense.created_at,
        ])?;
    }
    wtr.flush()?;

    Ok(ExportPaths { incomes, expenses })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::{add_user, test_db};
    use crate::ledger::{add_expense, add_income};
    use crate::models::{RecordKind, SheetRow};
    use crate::sheet::read_file;
    use crate::validator::{validate_row, RowOutcome};

    #[test]
    fn test_export_writes_both_files() {
        let (dir, conn) = test_db();
        let uid = add_user(&conn, "alice1");
        add_income(&conn, uid, 1200.0, "Salary").unwrap();
        add_expense(&conn, uid, 9.99, "Software", "Editor, yearly").unwrap();

        let paths = export_user(&conn, uid, &dir.path().join("exports")).unwrap();
        let incomes = std::fs::read_to_string(&paths.incomes).unwrap();
        assert!(incomes.starts_with("id,amount,source,created_at\n"));
        assert!(incomes.contains(",1200.00,Salary,"));
        let expenses = std::fs::read_to_string(&paths.expenses).unwrap();
        assert!(expenses.contains("\"Editor, yearly\""));
    }

    #[test]
    fn test_exported_expenses_can_be_uploaded_again() {
        let (dir, conn) = test_db();
        let uid = add_user(&conn, "alice1");
        add_expense(&conn, uid, 30.0, "Food", "Groceries").unwrap();
        let paths = export_user(&conn, uid, dir.path()).unwrap();

        let rows: Vec<SheetRow> = read_file(&paths.expenses).unwrap();
        assert_eq!(rows.len(), 1);
        assert!(matches!(validate_row(&rows[0], RecordKind::Expense, uid), RowOutcome::Valid(_)));
    }
}
