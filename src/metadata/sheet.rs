use std::collections::BTreeSet;

use anyhow::Result;
use tracing::info;

use crate::error::SheetError;
use crate::metadata::MetadataReport;

/// Minimal spreadsheet access: read and overwrite a rectangular range given
/// in `Sheet!A2:A` notation.
pub trait SheetClient {
    fn read_range(&self, spreadsheet_id: &str, range: &str) -> Result<Vec<Vec<String>>>;
    fn write_range(&self, spreadsheet_id: &str, range: &str, values: Vec<Vec<String>>) -> Result<()>;
}

/// Where the submission ids live and where problems are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetTarget {
    pub spreadsheet_id: String,
    pub sheet_id: String,
    pub id_column: String,
    pub problem_column: String,
}

impl SheetTarget {
    pub fn new(spreadsheet_id: impl Into<String>) -> Self {
        Self {
            spreadsheet_id: spreadsheet_id.into(),
            sheet_id: "Sheet1".to_string(),
            id_column: "A".to_string(),
            problem_column: "E".to_string(),
        }
    }

    pub fn id_range(&self) -> String {
        column_range(&self.sheet_id, &self.id_column)
    }

    pub fn problem_range(&self) -> String {
        column_range(&self.sheet_id, &self.problem_column)
    }
}

/// A whole column below the header row.
fn column_range(sheet: &str, column: &str) -> String {
    format!("{sheet}!{column}2:{column}")
}

/// One cell per data row, in sheet order; submissions without problems get an
/// empty cell.
pub fn problem_cells(report: &MetadataReport) -> Vec<String> {
    let mut cells = vec![String::new(); report.sheet_rows.len()];
    for (id, kinds) in &report.problems {
        let Some(row) = report.sheet_rows.get(id) else {
            continue;
        };
        let Some(cell) = row.checked_sub(2).and_then(|i| cells.get_mut(i)) else {
            continue;
        };
        *cell = kinds
            .iter()
            .map(|(kind, texts)| format!("{kind}:\n{}", texts.join("\n")))
            .collect::<Vec<_>>()
            .join("\n");
    }
    cells
}

/// Writes the problem column after checking that the sheet lists exactly the
/// submissions that were checked.
pub fn post_problems(client: &dyn SheetClient, target: &SheetTarget, report: &MetadataReport) -> Result<()> {
    let rows = client.read_range(&target.spreadsheet_id, &target.id_range())?;
    let mut sheet_ids = BTreeSet::new();
    for value in rows.into_iter().filter_map(|row| row.into_iter().next()) {
        let id = value
            .trim()
            .parse::<u64>()
            .map_err(|_| SheetError::InvalidId { value: value.clone() })?;
        sheet_ids.insert(id);
    }

    let checked: BTreeSet<u64> = report.sheet_rows.keys().copied().collect();
    if sheet_ids != checked {
        return Err(SheetError::IdMismatch {
            sheet_only: sheet_ids.difference(&checked).copied().collect(),
            submissions_only: checked.difference(&sheet_ids).copied().collect(),
        }
        .into());
    }

    let values = problem_cells(report).into_iter().map(|cell| vec![cell]).collect();
    client.write_range(&target.spreadsheet_id, &target.problem_range(), values)?;
    info!(rows = checked.len(), range = %target.problem_range(), "posted metadata problems");
    Ok(())
}
