use colored::Colorize;
use comfy_table::{Cell, CellAlignment, Table};

use crate::cli::session::signed_in;
use crate::error::Result;
use crate::fmt::money;
use crate::ledger::summary;
use crate::settings::load_settings;

pub fn run() -> Result<()> {
    let (conn, user) = signed_in(&load_settings())?;
    let s = summary(&conn, user.id)?;

    let mut table = Table::new();
    table.set_header(vec!["", "Entries", "Total"]);
    table.add_row(vec![
        Cell::new("Income".green().bold()),
        Cell::new(s.income_count).set_alignment(CellAlignment::Right),
        Cell::new(money(s.total_income)).set_alignment(CellAlignment::Right),
    ]);
    table.add_row(vec![
        Cell::new("Expenses".red().bold()),
        Cell::new(s.expense_count).set_alignment(CellAlignment::Right),
        Cell::new(money(s.total_expenses)).set_alignment(CellAlignment::Right),
    ]);
    let balance = if s.balance >= 0.0 {
        money(s.balance).green().to_string()
    } else {
        money(s.balance).red().to_string()
    };
    table.add_row(vec![
        Cell::new("Balance".bold()),
        Cell::new(""),
        Cell::new(balance).set_alignment(CellAlignment::Right),
    ]);
    println!("Financial summary for {}\n{table}", user.username.bold());
    Ok(())
}
