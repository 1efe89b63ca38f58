use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::doe::{OutputColumns, Scenario};
use crate::error::{DoeError, Result};

/// Stable identifier of a table row, usually the scenario's position in the
/// batch it was sampled in. Survives row selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScenarioId(pub usize);

impl fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Rectangular table of scenarios × numeric feature columns, stored row-major.
/// Missing cells are NaN.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    ids: Vec<ScenarioId>,
    columns: Vec<String>,
    values: Vec<f64>,
}

impl FeatureTable {
    /// An empty table with the given columns.
    pub fn new(columns: Vec<String>) -> Result<Self> {
        let mut seen = HashMap::new();
        for (j, name) in columns.iter().enumerate() {
            if seen.insert(name.as_str(), j).is_some() {
                return Err(DoeError::DuplicateColumn { name: name.clone() });
            }
        }
        Ok(Self { ids: Vec::new(), columns, values: Vec::new() })
    }

    /// Build from rows; ids are the row positions.
    pub fn from_rows(columns: Vec<String>, rows: &[Vec<f64>]) -> Result<Self> {
        let mut table = Self::new(columns)?;
        for (i, row) in rows.iter().enumerate() {
            table.push_row(ScenarioId(i), row)?;
        }
        Ok(table)
    }

    pub fn push_row(&mut self, id: ScenarioId, row: &[f64]) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(DoeError::RaggedRow {
                row: self.ids.len(),
                len: row.len(),
                expected: self.columns.len(),
            });
        }
        self.ids.push(id);
        self.values.extend_from_slice(row);
        Ok(())
    }

    /// Flatten scenario records into `<Entity>_<Property>` columns, preceded
    /// by any scalar analysis outputs under their bare key (`Uz`).
    /// Columns appear in first-seen order across the batch; a scenario that
    /// lacks a column gets NaN there. Row ids are batch positions.
    pub fn from_scenarios(scenarios: &[Scenario]) -> Self {
        Self::from_scenarios_with(scenarios, OutputColumns::default())
    }

    /// As `from_scenarios`, choosing how outputs are named or leaving them out.
    /// An output whose name matches an entity column does not overwrite it.
    pub fn from_scenarios_with(scenarios: &[Scenario], outputs: OutputColumns) -> Self {
        let flat: Vec<Vec<(String, f64)>> = scenarios
            .iter()
            .map(|s| {
                let entities = s.flatten();
                let mut row: Vec<(String, f64)> = s
                    .output_values(outputs)
                    .into_iter()
                    .filter(|(name, _)| !entities.iter().any(|(n, _)| n == name))
                    .collect();
                row.extend(entities);
                row
            })
            .collect();
        let mut columns: Vec<String> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        for row in &flat {
            for (name, _) in row {
                if !index.contains_key(name) {
                    index.insert(name.clone(), columns.len());
                    columns.push(name.clone());
                }
            }
        }

        let width = columns.len();
        let mut values = vec![f64::NAN; width * flat.len()];
        for (i, row) in flat.iter().enumerate() {
            for (name, value) in row {
                values[i * width + index[name]] = *value;
            }
        }
        Self { ids: (0..flat.len()).map(ScenarioId).collect(), columns, values }
    }

    /// Append a column, e.g. a simulated output aligned with the rows.
    pub fn with_column(mut self, name: &str, column: &[f64]) -> Result<Self> {
        if self.column_index(name).is_some() {
            return Err(DoeError::DuplicateColumn { name: name.to_string() });
        }
        if column.len() != self.n_rows() {
            return Err(DoeError::ColumnLength {
                name: name.to_string(),
                len: column.len(),
                expected: self.n_rows(),
            });
        }
        let width = self.n_cols();
        let mut values = Vec::with_capacity(self.values.len() + column.len());
        for (i, extra) in column.iter().enumerate() {
            values.extend_from_slice(&self.values[i * width..(i + 1) * width]);
            values.push(*extra);
        }
        self.values = values;
        self.columns.push(name.to_string());
        Ok(self)
    }

    /// Replace the row ids, e.g. when the rows are a subset of a larger batch.
    pub fn with_ids(mut self, ids: Vec<ScenarioId>) -> Result<Self> {
        if ids.len() != self.n_rows() {
            return Err(DoeError::ColumnLength {
                name: "ids".to_string(),
                len: ids.len(),
                expected: self.n_rows(),
            });
        }
        self.ids = ids;
        Ok(self)
    }

    pub fn n_rows(&self) -> usize {
        self.ids.len()
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn ids(&self) -> &[ScenarioId] {
        &self.ids
    }

    pub fn id(&self, row: usize) -> ScenarioId {
        self.ids[row]
    }

    pub fn row(&self, i: usize) -> &[f64] {
        let width = self.n_cols();
        &self.values[i * width..(i + 1) * width]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        (0..self.n_rows()).map(move |i| self.row(i))
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn value(&self, row: usize, column: &str) -> Option<f64> {
        self.column_index(column).map(|j| self.row(row)[j])
    }

    pub fn column_values(&self, j: usize) -> impl Iterator<Item = f64> + '_ {
        self.rows().map(move |row| row[j])
    }

    /// Resolve a column selection to indices. `None` selects every column
    /// in table order.
    pub fn select_columns(&self, names: Option<&[String]>) -> Result<Vec<usize>> {
        match names {
            None => Ok((0..self.n_cols()).collect()),
            Some(names) => names
                .iter()
                .map(|name| {
                    self.column_index(name)
                        .ok_or_else(|| DoeError::UnknownColumn { name: name.clone() })
                })
                .collect(),
        }
    }

    /// Restrict to the given row positions (in the order given), keeping ids.
    pub fn select_rows(&self, positions: &[usize]) -> Self {
        let mut values = Vec::with_capacity(positions.len() * self.n_cols());
        for &i in positions {
            values.extend_from_slice(self.row(i));
        }
        Self {
            ids: positions.iter().map(|&i| self.ids[i]).collect(),
            columns: self.columns.clone(),
            values,
        }
    }
}
