//! Table layout: per-column width buckets and row-boundary chunking.
//!
//! The remote service caps both the total width of a table and the number
//! of cells a single table block may contain, so wide content gets a
//! flexible share of the leftover width and long tables are emitted as
//! several sibling table blocks.

use crate::models::StyledTextRun;

/// Hard ceiling on `rows * cols` for one table block.
pub const MAX_CELLS_PER_TABLE: usize = 20;
/// Total width budget for one table, in layout units.
pub const MAX_TABLE_WIDTH: u32 = 820;
/// Base width of a column whose content exceeds every fixed bucket.
const FLEXIBLE_WIDTH: u32 = 130;

/// A table row: one runs-vector per cell.
pub type TableRow = Vec<Vec<StyledTextRun>>;

/// Accumulates cells row by row while the walker consumes table events.
#[derive(Debug, Default)]
pub struct TableBuilder {
    cols: usize,
    rows: Vec<TableRow>,
    current_row: TableRow,
}

impl TableBuilder {
    pub fn new(cols: usize) -> Self {
        Self {
            cols,
            rows: Vec::new(),
            current_row: Vec::new(),
        }
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn push_cell(&mut self, runs: Vec<StyledTextRun>) {
        self.current_row.push(runs);
    }

    pub fn finish_row(&mut self) {
        let mut row = std::mem::take(&mut self.current_row);
        // Ragged sources still produce rectangular tables.
        row.resize(self.cols, Vec::new());
        self.rows.push(row);
    }

    pub fn into_rows(self) -> Vec<TableRow> {
        self.rows
    }
}

/// Fixed width bucket for a column by its longest rendered text, or `None`
/// when the column is flexible.
fn bucket_width(max_chars: usize) -> Option<u32> {
    match max_chars {
        0..=2 => Some(50),
        3..=4 => Some(80),
        5 => Some(100),
        6 => Some(120),
        _ => None,
    }
}

/// Compute per-column widths: short columns take their bucket width,
/// flexible columns split the leftover up to [`MAX_TABLE_WIDTH`] evenly,
/// never dropping below the flexible base width.
pub fn column_widths(rows: &[TableRow], cols: usize) -> Vec<u32> {
    let mut max_chars = vec![0usize; cols];
    for row in rows {
        for (col, runs) in row.iter().enumerate().take(cols) {
            let chars: usize = runs.iter().map(|run| run.text.chars().count()).sum();
            max_chars[col] = max_chars[col].max(chars);
        }
    }

    let buckets: Vec<Option<u32>> = max_chars.iter().map(|&chars| bucket_width(chars)).collect();
    let fixed_sum: u32 = buckets.iter().flatten().sum();
    let flexible_count = buckets.iter().filter(|bucket| bucket.is_none()).count() as u32;

    let flexible_width = if flexible_count > 0 {
        let leftover = MAX_TABLE_WIDTH.saturating_sub(fixed_sum);
        (leftover / flexible_count).max(FLEXIBLE_WIDTH)
    } else {
        FLEXIBLE_WIDTH
    };

    buckets
        .into_iter()
        .map(|bucket| bucket.unwrap_or(flexible_width))
        .collect()
}

/// Rows per chunk so that no chunk exceeds the per-table cell ceiling.
pub fn max_rows_per_chunk(cols: usize) -> usize {
    (MAX_CELLS_PER_TABLE / cols.max(1)).max(1)
}
