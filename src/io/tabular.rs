use std::{collections::HashSet, io::BufRead};

use ndarray::{Array2, ArrayView1};
use tracing::debug;

use crate::core::{combination_index, BNError, BNResult, BayesNet, BayesNetBuilder};

/// A table of observations: named columns of level indices
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    columns: Vec<String>,
    data: Array2<usize>,
}

impl Dataset {
    /// Creates a dataset from column names and an array of shape (rows, columns)
    pub fn new(columns: Vec<String>, data: Array2<usize>) -> BNResult<Self> {
        if columns.len() != data.ncols() {
            return Err(BNError::Parse {
                line: 0,
                reason: format!(
                    "{} column names for {} columns",
                    columns.len(),
                    data.ncols()
                ),
            });
        }
        let mut seen = HashSet::new();
        if let Some(duplicate) = columns.iter().find(|name| !seen.insert(name.as_str())) {
            return Err(BNError::DuplicateNode(duplicate.clone()));
        }
        Ok(Dataset { columns, data })
    }

    /// Reads a comma separated table with a header row. Cells are non-negative
    /// integers, rows with an empty cell are dropped
    pub fn from_csv(reader: impl BufRead) -> BNResult<Self> {
        let mut columns: Option<Vec<String>> = None;
        let mut cells = Vec::new();
        let mut rows_number = 0;
        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split(',').map(str::trim).collect();
            if columns.is_none() {
                columns = Some(fields.iter().map(|x| x.to_string()).collect());
                continue;
            }
            let width = columns.as_ref().map_or(0, |header| header.len());
            if fields.len() != width {
                return Err(BNError::Parse {
                    line: index + 1,
                    reason: format!("{} cells, expected {}", fields.len(), width),
                });
            }
            if fields.iter().any(|x| x.is_empty()) {
                debug!(line = index + 1, "row with a missing cell dropped");
                continue;
            }
            for field in fields {
                let level = field.parse::<usize>().map_err(|err| BNError::Parse {
                    line: index + 1,
                    reason: format!("'{field}' is not a level index: {err}"),
                })?;
                cells.push(level);
            }
            rows_number += 1;
        }
        let columns = columns.unwrap_or_default();
        let data = Array2::from_shape_vec((rows_number, columns.len()), cells).map_err(|err| {
            BNError::Parse {
                line: 0,
                reason: err.to_string(),
            }
        })?;
        Dataset::new(columns, data)
    }

    #[inline]
    pub fn from_csv_str(text: &str) -> BNResult<Self> {
        Dataset::from_csv(text.as_bytes())
    }

    #[inline]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[inline]
    pub fn rows_number(&self) -> usize {
        self.data.nrows()
    }

    #[inline]
    pub fn column(&self, name: &str) -> Option<ArrayView1<'_, usize>> {
        self.columns
            .iter()
            .position(|x| x == name)
            .map(|pos| self.data.column(pos))
    }

    /// Number of levels of a column, the largest observed level plus one
    #[inline]
    pub fn cardinality(&self, name: &str) -> Option<usize> {
        self.column(name)
            .map(|col| col.iter().copied().max().map_or(1, |max| max + 1))
    }

    /// Relative frequencies of the child's levels for every combination
    /// of parents' levels. Combinations that never occur get an all-zero row
    pub fn frequency_table(&self, child: &str, parents: &[&str]) -> BNResult<Array2<f64>> {
        let unknown = |name: &str| BNError::UnknownNode(name.to_owned());
        let child_column = self.column(child).ok_or_else(|| unknown(child))?;
        let cardinality = self.cardinality(child).ok_or_else(|| unknown(child))?;
        let parent_columns = parents
            .iter()
            .map(|p| self.column(p).ok_or_else(|| unknown(*p)))
            .collect::<BNResult<Vec<_>>>()?;
        let parent_cardinalities = parents
            .iter()
            .map(|p| self.cardinality(p).ok_or_else(|| unknown(*p)))
            .collect::<BNResult<Vec<_>>>()?;
        let combinations_number: usize = parent_cardinalities.iter().product();
        let mut counts = Array2::<f64>::zeros((combinations_number, cardinality));
        let mut combination = vec![0; parents.len()];
        for row in 0..self.rows_number() {
            for (level, column) in combination.iter_mut().zip(&parent_columns) {
                *level = column[row];
            }
            if let Some(index) = combination_index(&parent_cardinalities, &combination) {
                counts[[index, child_column[row]]] += 1f64;
            }
        }
        for mut row in counts.rows_mut() {
            let total = row.sum();
            if total > 0f64 {
                row /= total;
            }
        }
        Ok(counts)
    }
}

/// Builds a network from observations. Every column becomes a node with
/// as many levels as observed. Every interaction (child, parents) gets a CPT of
/// relative frequencies, columns that are not a child of any interaction get a
/// prior of relative frequencies.
///
/// # Example
///
/// ```
/// use bnrs::io::{network_from_dataset, Dataset};
///
/// let data = Dataset::from_csv_str("rain,wet\n0,0\n0,0\n1,1\n1,0\n").unwrap();
/// let net = network_from_dataset(&data, &[("wet", vec!["rain"])]).unwrap();
/// let wet = net.node_by_name("wet").unwrap();
/// assert_eq!(wet.cpt().unwrap().row(&[1]).unwrap()[0], 0.5);
/// ```
pub fn network_from_dataset(
    data: &Dataset,
    interactions: &[(&str, Vec<&str>)],
) -> BNResult<BayesNet> {
    let mut bnb = BayesNetBuilder::new();
    for name in data.columns() {
        let cardinality = data
            .cardinality(name)
            .ok_or_else(|| BNError::UnknownNode(name.clone()))?;
        bnb.add_node(name.as_str(), cardinality)?;
    }
    let mut children = HashSet::new();
    for (child, parents) in interactions {
        let table = data.frequency_table(child, parents)?;
        bnb.add_cpt_table(child, parents, table)?;
        children.insert(*child);
    }
    for name in data.columns() {
        if !children.contains(name.as_str()) {
            let table = data.frequency_table(name, &[])?;
            bnb.add_cpt_table(name, &[], table)?;
        }
    }
    debug!(
        nodes = data.columns().len(),
        rows = data.rows_number(),
        "network estimated from a dataset"
    );
    Ok(bnb.build())
}
