//! Classification of a single uploaded row against a record kind's schema.

use crate::models::{NewRecord, RecordKind, SheetRow, MAX_AMOUNT};

#[derive(Debug, Clone, PartialEq)]
pub enum RowOutcome {
    /// Every cell is blank.
    Empty,
    /// Some cells are filled but these required columns are not.
    Malformed(Vec<&'static str>),
    Valid(NewRecord),
}

/// A per-row problem found during ingestion. Never fatal to the upload.
#[derive(Debug, Clone, PartialEq)]
pub enum RowIssue {
    Empty { row: usize },
    MissingColumns { row: usize, kind: RecordKind },
}

impl RowIssue {
    pub fn describe(&self) -> String {
        match self {
            Self::Empty { row } => format!("Row {row} is empty"),
            Self::MissingColumns { row, kind } => format!("Row {row} is missing {kind} columns"),
        }
    }
}

/// Parse a money amount, tolerating `$` and thousands separators.
/// Negative, non-finite, oversized or unparsable amounts yield `None`.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let s = raw.replace([',', '"', '$'], "");
    let value: f64 = s.trim().parse().ok()?;
    (value.is_finite() && (0.0..=MAX_AMOUNT).contains(&value)).then_some(value)
}

fn field<'a>(row: &'a SheetRow, column: &str) -> Option<&'a str> {
    row.get(column)
        .and_then(|v| v.as_deref())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

pub fn validate_row(row: &SheetRow, kind: RecordKind, user_id: i64) -> RowOutcome {
    if row.values().all(|v| v.as_deref().map_or(true, |s| s.trim().is_empty())) {
        return RowOutcome::Empty;
    }

    let amount = field(row, "amount").and_then(parse_amount);
    let missing: Vec<&'static str> = kind
        .required_columns()
        .iter()
        .copied()
        .filter(|col| match *col {
            "amount" => amount.is_none(),
            other => field(row, other).is_none(),
        })
        .collect();

    match (amount, missing.is_empty()) {
        (Some(amount), true) => RowOutcome::Valid(build_record(row, kind, user_id, amount)),
        _ => RowOutcome::Malformed(missing),
    }
}

fn build_record(row: &SheetRow, kind: RecordKind, user_id: i64, amount: f64) -> NewRecord {
    let text = |col: &str| field(row, col).unwrap_or_default().to_string();
    match kind {
        RecordKind::Income => NewRecord::Income {
            user_id,
            amount,
            source: text("source"),
        },
        RecordKind::Expense => NewRecord::Expense {
            user_id,
            amount,
            category: text("category"),
            description: text("description"),
        },
    }
}

/// Valid candidates and issues from one upload, both in upload order.
#[derive(Debug, Default)]
pub struct Scan {
    pub valid: Vec<(usize, NewRecord)>,
    pub issues: Vec<RowIssue>,
}

impl Scan {
    pub fn issue_texts(&self) -> Vec<String> {
        self.issues.iter().map(RowIssue::describe).collect()
    }
}

pub fn scan_rows(rows: &[SheetRow], kind: RecordKind, user_id: i64) -> Scan {
    let mut scan = Scan::default();
    for (idx, row) in rows.iter().enumerate() {
        let row_number = idx + 1;
        match validate_row(row, kind, user_id) {
            RowOutcome::Empty => scan.issues.push(RowIssue::Empty { row: row_number }),
            RowOutcome::Malformed(_) => scan.issues.push(RowIssue::MissingColumns {
                row: row_number,
                kind,
            }),
            RowOutcome::Valid(record) => scan.valid.push((row_number, record)),
        }
    }
    scan
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[(&str, Option<&str>)]) -> SheetRow {
        cells
            .iter()
            .map(|(k, v)| (k.to_string(), v.map(str::to_string)))
            .collect()
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("1,234.56"), Some(1234.56));
        assert_eq!(parse_amount("$50"), Some(50.0));
        assert_eq!(parse_amount("0"), Some(0.0));
        assert_eq!(parse_amount("-5"), None);
        assert_eq!(parse_amount("NaN"), None);
        assert_eq!(parse_amount("twelve"), None);
        assert_eq!(parse_amount("1e15"), None);
        assert_eq!(parse_amount("1e308"), None);
    }

    #[test]
    fn test_empty_row() {
        let r = row(&[("amount", None), ("source", Some("   "))]);
        assert_eq!(validate_row(&r, RecordKind::Income, 1), RowOutcome::Empty);
        assert_eq!(validate_row(&SheetRow::new(), RecordKind::Income, 1), RowOutcome::Empty);
    }

    #[test]
    fn test_malformed_lists_missing_columns_in_schema_order() {
        let r = row(&[("amount", Some("10")), ("category", None), ("description", None)]);
        assert_eq!(
            validate_row(&r, RecordKind::Expense, 1),
            RowOutcome::Malformed(vec!["category", "description"])
        );
    }

    #[test]
    fn test_bad_amount_counts_as_missing() {
        let r = row(&[("amount", Some("-3")), ("source", Some("Refund"))]);
        assert_eq!(
            validate_row(&r, RecordKind::Income, 1),
            RowOutcome::Malformed(vec!["amount"])
        );
    }

    #[test]
    fn test_oversized_amount_counts_as_missing() {
        let r = row(&[("amount", Some("170000000000000000000")), ("source", Some("Lottery"))]);
        assert_eq!(
            validate_row(&r, RecordKind::Income, 1),
            RowOutcome::Malformed(vec!["amount"])
        );
    }

    #[test]
    fn test_valid_row_attaches_owner() {
        let r = row(&[
            ("amount", Some("12.50")),
            ("category", Some("Food")),
            ("description", Some("Lunch")),
            ("notes", None),
        ]);
        assert_eq!(
            validate_row(&r, RecordKind::Expense, 42),
            RowOutcome::Valid(NewRecord::Expense {
                user_id: 42,
                amount: 12.5,
                category: "Food".to_string(),
                description: "Lunch".to_string(),
            })
        );
    }

    #[test]
    fn test_columns_of_the_other_kind_do_not_count() {
        let r = row(&[("amount", Some("5")), ("category", Some("Food"))]);
        assert_eq!(
            validate_row(&r, RecordKind::Income, 1),
            RowOutcome::Malformed(vec!["source"])
        );
    }

    #[test]
    fn test_scan_rows_numbers_from_one() {
        let rows = vec![
            row(&[("amount", Some("1")), ("source", Some("a"))]),
            row(&[("amount", None), ("source", None)]),
            row(&[("amount", None), ("source", Some("c"))]),
        ];
        let scan = scan_rows(&rows, RecordKind::Income, 9);
        assert_eq!(scan.valid.len(), 1);
        assert_eq!(scan.valid[0].0, 1);
        assert_eq!(
            scan.issue_texts(),
            vec!["Row 2 is empty", "Row 3 is missing income columns"]
        );
    }
}
