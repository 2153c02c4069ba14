use comfy_table::{Cell, CellAlignment, Table};

use crate::cli::session::signed_in;
use crate::error::Result;
use crate::fmt::money;
use crate::ledger::{self, SearchFilter};
use crate::models::{Expense, Income, RecordKind};
use crate::settings::load_settings;

// ---------------------------------------------------------------------------
// Incomes
// ---------------------------------------------------------------------------

pub fn add_income(amount: f64, source: &str) -> Result<()> {
    let (conn, user) = signed_in(&load_settings())?;
    let id = ledger::add_income(&conn, user.id, amount, source)?;
    println!("Added income #{id}: {} from {source}", money(amount));
    Ok(())
}

pub fn update_income(id: i64, amount: f64, source: &str) -> Result<()> {
    let (conn, user) = signed_in(&load_settings())?;
    ledger::update_income(&conn, user.id, id, amount, source)?;
    println!("Updated income #{id}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Expenses
// ---------------------------------------------------------------------------

pub fn add_expense(amount: f64, category: &str, description: &str) -> Result<()> {
    let (conn, user) = signed_in(&load_settings())?;
    let id = ledger::add_expense(&conn, user.id, amount, category, description)?;
    println!("Added expense #{id}: {} for {category}", money(amount));
    Ok(())
}

pub fn update_expense(id: i64, amount: f64, category: &str, description: &str) -> Result<()> {
    let (conn, user) = signed_in(&load_settings())?;
    ledger::update_expense(&conn, user.id, id, amount, category, description)?;
    println!("Updated expense #{id}");
    Ok(())
}

pub fn delete(kind: RecordKind, id: i64) -> Result<()> {
    let (conn, user) = signed_in(&load_settings())?;
    ledger::delete_record(&conn, kind, user.id, id)?;
    println!("Deleted {kind} #{id}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Listing and search
// ---------------------------------------------------------------------------

fn income_table(rows: &[Income]) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["ID", "Amount", "Source", "Created"]);
    for r in rows {
        table.add_row(vec![
            Cell::new(r.id),
            Cell::new(money(r.amount)).set_alignment(CellAlignment::Right),
            Cell::new(&r.source),
            Cell::new(&r.created_at),
        ]);
    }
    table
}

fn expense_table(rows: &[Expense]) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["ID", "Amount", "Category", "Description", "Created"]);
    for r in rows {
        table.add_row(vec![
            Cell::new(r.id),
            Cell::new(money(r.amount)).set_alignment(CellAlignment::Right),
            Cell::new(&r.category),
            Cell::new(&r.description),
            Cell::new(&r.created_at),
        ]);
    }
    table
}

pub fn list(kind: RecordKind, filter: &SearchFilter) -> Result<()> {
    let (conn, user) = signed_in(&load_settings())?;
    match kind {
        RecordKind::Income => {
            let rows = ledger::list_incomes(&conn, user.id, filter)?;
            if rows.is_empty() {
                println!("No incomes found.");
            } else {
                println!("Incomes\n{}", income_table(&rows));
            }
        }
        RecordKind::Expense => {
            let rows = ledger::list_expenses(&conn, user.id, filter)?;
            if rows.is_empty() {
                println!("No expenses found.");
            } else {
                println!("Expenses\n{}", expense_table(&rows));
            }
        }
    }
    Ok(())
}
