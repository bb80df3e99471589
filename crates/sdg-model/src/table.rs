//! Column-ordered string tables.
//!
//! `RawTable` is the shape of an SDMX CSV response before normalization:
//! named columns, string cells, no typing. The fetcher produces one per
//! winning dataflow (pages concatenated); the normalizer consumes it.

/// A raw tabular payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Append a row, padding or truncating to the column count.
    pub fn push_row(&mut self, mut row: Vec<String>) {
        row.resize(self.columns.len(), String::new());
        self.rows.push(row);
    }

    pub fn rows(&self) -> impl Iterator<Item = &[String]> {
        self.rows.iter().map(Vec::as_slice)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn cell(&self, row: usize, column: &str) -> Option<&str> {
        let idx = self.column_index(column)?;
        self.rows.get(row)?.get(idx).map(String::as_str)
    }

    /// Rename a column in place. Returns false when `from` is absent or
    /// `to` already exists (renames never clobber an existing column).
    pub fn rename_column(&mut self, from: &str, to: &str) -> bool {
        if self.has_column(to) {
            return false;
        }
        match self.column_index(from) {
            Some(idx) => {
                self.columns[idx] = to.to_string();
                true
            }
            None => false,
        }
    }

    /// Keep only rows for which `keep` returns true.
    pub fn retain_rows<F>(&mut self, mut keep: F)
    where
        F: FnMut(&RowView<'_>) -> bool,
    {
        let columns = std::mem::take(&mut self.columns);
        self.rows.retain(|row| {
            keep(&RowView {
                columns: &columns,
                cells: row,
            })
        });
        self.columns = columns;
    }

    /// True if every cell of `column` is empty (or the column is absent).
    pub fn column_is_blank(&self, column: &str) -> bool {
        match self.column_index(column) {
            Some(idx) => self
                .rows
                .iter()
                .all(|row| row.get(idx).is_none_or(|c| c.trim().is_empty())),
            None => true,
        }
    }

    /// Distinct non-empty values of `column`, in first-seen order.
    pub fn distinct_values(&self, column: &str) -> Vec<String> {
        let Some(idx) = self.column_index(column) else {
            return Vec::new();
        };
        let mut seen = Vec::new();
        for row in &self.rows {
            if let Some(cell) = row.get(idx)
                && !cell.is_empty()
                && !seen.iter().any(|s| s == cell)
            {
                seen.push(cell.clone());
            }
        }
        seen
    }

    /// Append all rows of `other`, matching columns by name. Columns of
    /// `other` not present here are added (earlier rows get empty cells).
    pub fn extend_from(&mut self, other: RawTable) {
        if self.columns.is_empty() {
            *self = other;
            return;
        }
        if self.columns == other.columns {
            self.rows.extend(other.rows);
            return;
        }

        for col in &other.columns {
            if !self.has_column(col) {
                self.columns.push(col.clone());
                for row in &mut self.rows {
                    row.push(String::new());
                }
            }
        }
        let mapping: Vec<usize> = other
            .columns
            .iter()
            .map(|c| self.column_index(c).unwrap_or(usize::MAX))
            .collect();
        for row in other.rows {
            let mut aligned = vec![String::new(); self.columns.len()];
            for (src_idx, cell) in row.into_iter().enumerate() {
                if let Some(&dst) = mapping.get(src_idx)
                    && dst != usize::MAX
                {
                    aligned[dst] = cell;
                }
            }
            self.rows.push(aligned);
        }
    }
}

/// Borrowed view of one row, for predicate callbacks.
pub struct RowView<'a> {
    columns: &'a [String],
    cells: &'a [String],
}

impl RowView<'_> {
    pub fn get(&self, column: &str) -> Option<&str> {
        let idx = self.columns.iter().position(|c| c == column)?;
        self.cells.get(idx).map(String::as_str)
    }
}
