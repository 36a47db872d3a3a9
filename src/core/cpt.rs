use ndarray::{Array1, Array2, ArrayView1, Axis};
use thiserror::Error;

/// Maximal deviation of a CPT row sum from one
const ROW_SUM_TOLERANCE: f64 = 1e-6;

// ------------------------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Error)]
/// Reasons a conditional probability table is rejected
pub enum CptError {
    #[error("table has shape {found:?}, expected {expected:?}")]
    Shape {
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("row for combination {combination:?} has {found} entries, expected {expected}")]
    RowLength {
        combination: Vec<usize>,
        expected: usize,
        found: usize,
    },

    #[error("combination {0:?} does not match the parents' levels")]
    OutOfRangeCombination(Vec<usize>),

    #[error("combination {0:?} is given twice")]
    DuplicateCombination(Vec<usize>),

    #[error("combination {0:?} is missing")]
    MissingCombination(Vec<usize>),

    #[error("row for combination {0:?} contains a negative or non-finite entry")]
    InvalidEntry(Vec<usize>),

    #[error("row for combination {combination:?} sums to {sum}, expected 1 or an all-zero row")]
    NotADistribution { combination: Vec<usize>, sum: f64 },
}

// ------------------------------------------------------------------------------------------

/// A conditional probability table.
///
/// A dense table with one row per combination of parents' levels and one column
/// per level of the node itself. Rows are ordered like nested loops over the parents
/// in their declaration order, the last parent varies fastest. A row is either
/// a probability distribution or the all-zero row marking a combination that
/// has no supporting data.
#[derive(Debug, Clone, PartialEq)]
pub struct Cpt {
    parent_cardinalities: Vec<usize>,
    strides: Vec<usize>,
    table: Array2<f64>,
}

impl Cpt {
    /// Creates a table from a dense array
    ///
    /// # Arguments
    ///
    /// * `cardinality` - A number of levels of the node
    /// * `parent_cardinalities` - Numbers of levels of the parents in the parents' order
    /// * `table` - An array of shape (product of `parent_cardinalities`, `cardinality`)
    ///
    /// # Example
    ///
    /// ```
    /// use bnrs::core::Cpt;
    /// use ndarray::array;
    ///
    /// let cpt = Cpt::new(2, vec![2], array![[0.9, 0.1], [0.2, 0.8]]).unwrap();
    /// assert_eq!(cpt.row(&[1]).unwrap(), array![0.2, 0.8]);
    /// ```
    pub fn new(
        cardinality: usize,
        parent_cardinalities: Vec<usize>,
        table: Array2<f64>,
    ) -> Result<Self, CptError> {
        let strides = strides(&parent_cardinalities);
        let combinations_number: usize = parent_cardinalities.iter().product();
        if table.dim() != (combinations_number, cardinality) {
            return Err(CptError::Shape {
                expected: (combinations_number, cardinality),
                found: table.dim(),
            });
        }
        let cpt = Cpt {
            parent_cardinalities,
            strides,
            table,
        };
        cpt.validate_rows()?;
        Ok(cpt)
    }

    /// Creates a table of a node without parents
    ///
    /// # Example
    ///
    /// ```
    /// use bnrs::core::Cpt;
    ///
    /// let cpt = Cpt::prior(vec![0.3, 0.7]).unwrap();
    /// assert_eq!(cpt.combinations_number(), 1);
    /// ```
    pub fn prior(probabilities: Vec<f64>) -> Result<Self, CptError> {
        let cardinality = probabilities.len();
        let table = Array1::from_vec(probabilities).insert_axis(Axis(0));
        Cpt::new(cardinality, Vec::new(), table)
    }

    /// Creates a table from (combination, row) pairs. Every combination of
    /// parents' levels must be given exactly once
    ///
    /// # Example
    ///
    /// ```
    /// use bnrs::core::Cpt;
    ///
    /// let cpt = Cpt::from_entries(
    ///     2,
    ///     vec![2],
    ///     vec![(vec![1], vec![0.2, 0.8]), (vec![0], vec![0.9, 0.1])],
    /// ).unwrap();
    /// assert_eq!(cpt.row(&[0]).unwrap()[0], 0.9);
    /// ```
    pub fn from_entries(
        cardinality: usize,
        parent_cardinalities: Vec<usize>,
        entries: impl IntoIterator<Item = (Vec<usize>, Vec<f64>)>,
    ) -> Result<Self, CptError> {
        let strides = strides(&parent_cardinalities);
        let combinations_number: usize = parent_cardinalities.iter().product();
        let mut table = Array2::<f64>::zeros((combinations_number, cardinality));
        let mut filled = vec![false; combinations_number];
        for (combination, row) in entries {
            let index = row_index(&parent_cardinalities, &strides, &combination)
                .ok_or_else(|| CptError::OutOfRangeCombination(combination.clone()))?;
            if filled[index] {
                return Err(CptError::DuplicateCombination(combination));
            }
            if row.len() != cardinality {
                return Err(CptError::RowLength {
                    combination,
                    expected: cardinality,
                    found: row.len(),
                });
            }
            filled[index] = true;
            for (dst, src) in table.row_mut(index).iter_mut().zip(row) {
                *dst = src;
            }
        }
        let cpt = Cpt {
            parent_cardinalities,
            strides,
            table,
        };
        if let Some(missing) = filled.iter().position(|x| !x) {
            return Err(CptError::MissingCombination(cpt.combination(missing)));
        }
        cpt.validate_rows()?;
        Ok(cpt)
    }

    /// Number of levels of the node
    #[inline]
    pub fn cardinality(&self) -> usize {
        self.table.ncols()
    }

    /// Numbers of levels of the parents in the parents' order
    #[inline]
    pub fn parent_cardinalities(&self) -> &[usize] {
        &self.parent_cardinalities
    }

    /// Number of combinations of parents' levels (number of rows)
    #[inline]
    pub fn combinations_number(&self) -> usize {
        self.table.nrows()
    }

    /// The dense table
    #[inline]
    pub fn table(&self) -> &Array2<f64> {
        &self.table
    }

    /// Returns the row of a combination of parents' levels
    #[inline]
    pub fn row(&self, combination: &[usize]) -> Option<ArrayView1<'_, f64>> {
        row_index(&self.parent_cardinalities, &self.strides, combination)
            .map(|index| self.table.row(index))
    }

    /// Returns the combination of parents' levels of a row
    pub fn combination(&self, row: usize) -> Vec<usize> {
        (0..self.parent_cardinalities.len())
            .map(|pos| self.level(row, pos))
            .collect()
    }

    /// Returns the level taken by the `parent_position`-th parent in a row
    #[inline(always)]
    pub fn level(&self, row: usize, parent_position: usize) -> usize {
        (row / self.strides[parent_position]) % self.parent_cardinalities[parent_position]
    }

    /// Iterates over (combination, row) pairs in the table's order
    pub fn entries(&self) -> impl Iterator<Item = (Vec<usize>, ArrayView1<'_, f64>)> + '_ {
        self.table
            .rows()
            .into_iter()
            .enumerate()
            .map(|(index, row)| (self.combination(index), row))
    }

    fn validate_rows(&self) -> Result<(), CptError> {
        for (index, row) in self.table.rows().into_iter().enumerate() {
            if row.iter().any(|x| !x.is_finite() || *x < 0f64) {
                return Err(CptError::InvalidEntry(self.combination(index)));
            }
            let sum = row.sum();
            if sum != 0f64 && (sum - 1f64).abs() > ROW_SUM_TOLERANCE {
                return Err(CptError::NotADistribution {
                    combination: self.combination(index),
                    sum,
                });
            }
        }
        Ok(())
    }
}

// ------------------------------------------------------------------------------------------

#[inline]
fn strides(cardinalities: &[usize]) -> Vec<usize> {
    let mut strides = vec![1; cardinalities.len()];
    for i in (0..cardinalities.len().saturating_sub(1)).rev() {
        strides[i] = strides[i + 1] * cardinalities[i + 1];
    }
    strides
}

#[inline]
pub(crate) fn row_index(
    cardinalities: &[usize],
    strides: &[usize],
    combination: &[usize],
) -> Option<usize> {
    if combination.len() != cardinalities.len() {
        return None;
    }
    let mut index = 0;
    for ((level, card), stride) in combination.iter().zip(cardinalities).zip(strides) {
        if level >= card {
            return None;
        }
        index += level * stride;
    }
    Some(index)
}

/// Row index of a combination in a table over parents with the given cardinalities
#[inline]
pub(crate) fn combination_index(cardinalities: &[usize], combination: &[usize]) -> Option<usize> {
    row_index(cardinalities, &strides(cardinalities), combination)
}
