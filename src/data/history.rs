//! Historical dataset: one row per date, one column per currency ever seen
//!
//! Rows live in a `BTreeMap` keyed by date, which gives uniqueness and
//! ascending order for free. Columns are slots in each row's `Vec<Value>`,
//! addressed through an explicit code -> slot index. Adding a column appends
//! a `Missing` slot to every existing row, so every row always has exactly
//! `columns.len()` cells.

use crate::currency::CurrencyCode;
use crate::types::{RateDate, Value};
use hashbrown::HashMap;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoricalDataset {
    /// Columns in order of first appearance
    columns: Vec<CurrencyCode>,
    /// Currency -> slot in each row
    index: HashMap<CurrencyCode, usize>,
    rows: BTreeMap<RateDate, Vec<Value>>,
}

impl HistoricalDataset {
    /// Empty dataset: zero rows, only the date column
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with a fixed set of leading columns
    pub fn with_columns<I: IntoIterator<Item = CurrencyCode>>(columns: I) -> Self {
        let mut dataset = Self::new();
        for column in columns {
            dataset.ensure_column(column);
        }
        dataset
    }

    pub fn columns(&self) -> &[CurrencyCode] {
        &self.columns
    }

    pub fn has_column(&self, currency: CurrencyCode) -> bool {
        self.index.contains_key(&currency)
    }

    pub fn column_index(&self, currency: CurrencyCode) -> Option<usize> {
        self.index.get(&currency).copied()
    }

    /// Add a column if it does not exist yet, back-filling `Missing`.
    /// Returns the slot and whether the column was created.
    pub fn ensure_column(&mut self, currency: CurrencyCode) -> (usize, bool) {
        if let Some(&slot) = self.index.get(&currency) {
            return (slot, false);
        }
        let slot = self.columns.len();
        self.columns.push(currency);
        self.index.insert(currency, slot);
        for cells in self.rows.values_mut() {
            cells.push(Value::Missing);
        }
        (slot, true)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn contains_date(&self, date: RateDate) -> bool {
        self.rows.contains_key(&date)
    }

    pub fn first_date(&self) -> Option<RateDate> {
        self.rows.keys().next().copied()
    }

    pub fn last_date(&self) -> Option<RateDate> {
        self.rows.keys().next_back().copied()
    }

    /// Dates in ascending order
    pub fn dates(&self) -> impl Iterator<Item = RateDate> + '_ {
        self.rows.keys().copied()
    }

    /// Rows in ascending date order; cells follow [`columns`](Self::columns)
    pub fn rows(&self) -> impl Iterator<Item = (RateDate, &[Value])> + '_ {
        self.rows.iter().map(|(date, cells)| (*date, cells.as_slice()))
    }

    pub fn row(&self, date: RateDate) -> Option<&[Value]> {
        self.rows.get(&date).map(|cells| cells.as_slice())
    }

    /// Cell lookup; unknown dates or columns read as `Missing`
    pub fn get(&self, date: RateDate, currency: CurrencyCode) -> Value {
        match (self.rows.get(&date), self.index.get(&currency)) {
            (Some(cells), Some(&slot)) => cells[slot],
            _ => Value::Missing,
        }
    }

    /// Whole column in date order, or `None` if the currency was never seen
    pub fn column(&self, currency: CurrencyCode) -> Option<Vec<(RateDate, Value)>> {
        let slot = self.column_index(currency)?;
        Some(
            self.rows
                .iter()
                .map(|(date, cells)| (*date, cells[slot]))
                .collect(),
        )
    }

    /// Mutable row for `date`, creating an all-missing row if absent.
    /// Returns the cells and whether the row was created.
    pub(crate) fn row_mut_or_insert(&mut self, date: RateDate) -> (&mut Vec<Value>, bool) {
        let width = self.columns.len();
        let mut created = false;
        let cells = self.rows.entry(date).or_insert_with(|| {
            created = true;
            vec![Value::Missing; width]
        });
        (cells, created)
    }

    /// Set one cell, growing the schema and inserting the row as needed
    pub fn set(&mut self, date: RateDate, currency: CurrencyCode, value: Value) {
        let (slot, _) = self.ensure_column(currency);
        let (cells, _) = self.row_mut_or_insert(date);
        cells[slot] = value;
    }

    /// Count of present cells per column, in column order
    pub fn coverage(&self) -> Vec<(CurrencyCode, usize)> {
        self.columns
            .iter()
            .enumerate()
            .map(|(slot, code)| {
                let present = self
                    .rows
                    .values()
                    .filter(|cells| !cells[slot].is_missing())
                    .count();
                (*code, present)
            })
            .collect()
    }
}
