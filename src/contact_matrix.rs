use serde_derive::{Deserialize, Serialize};

use crate::agent::StrataId;
use crate::error::SimError;

/// Expected contact rate between every ordered pair of strata.
///
/// Row `i` holds the rates seen by a susceptible agent of strata `i`; column `j`
/// is the strata of the infected neighbor. The matrix may be asymmetric and is
/// immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<f64>>", into = "Vec<Vec<f64>>")]
pub struct ContactMatrix {
    size: usize,
    rates: Vec<f64>,
}

impl ContactMatrix {
    /// Builds a matrix from its rows.
    ///
    /// # Errors
    ///
    /// `SimError::ConfigurationError` if the rows do not form a square matrix or
    /// any rate is negative or not finite.
    pub fn new(rows: Vec<Vec<f64>>) -> Result<Self, SimError> {
        let size = rows.len();
        let mut rates = Vec::with_capacity(size * size);
        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != size {
                return Err(SimError::ConfigurationError(format!(
                    "contact matrix row {i} has {} entries, expected {size}",
                    row.len()
                )));
            }
            rates.extend(row);
        }
        let matrix = ContactMatrix { size, rates };
        matrix.validate()?;
        Ok(matrix)
    }

    /// A matrix with the same rate for every pair. The rate is checked by
    /// [`ContactMatrix::validate`].
    #[must_use]
    pub fn uniform(size: usize, rate: f64) -> Self {
        ContactMatrix {
            size,
            rates: vec![rate; size * size],
        }
    }

    /// Checks that every rate is finite and non-negative.
    ///
    /// # Errors
    ///
    /// `SimError::ConfigurationError` naming the first offending entry.
    pub fn validate(&self) -> Result<(), SimError> {
        for (index, rate) in self.rates.iter().enumerate() {
            if !rate.is_finite() || *rate < 0.0 {
                return Err(SimError::ConfigurationError(format!(
                    "contact rate [{}][{}] = {rate} must be finite and non-negative",
                    index / self.size,
                    index % self.size
                )));
            }
        }
        Ok(())
    }

    /// Number of strata the matrix covers.
    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    /// The contact rate a susceptible of strata `susceptible` has with an infected
    /// neighbor of strata `infected`.
    ///
    /// # Panics
    ///
    /// Panics if either strata is out of range; parameters are validated against
    /// the strata count before any lookup happens.
    #[must_use]
    pub fn rate(&self, susceptible: StrataId, infected: StrataId) -> f64 {
        assert!(
            susceptible.0 < self.size && infected.0 < self.size,
            "strata out of range for a {0}x{0} contact matrix",
            self.size
        );
        self.rates[susceptible.0 * self.size + infected.0]
    }

    #[must_use]
    pub fn rows(&self) -> Vec<Vec<f64>> {
        if self.size == 0 {
            return Vec::new();
        }
        self.rates.chunks(self.size).map(<[f64]>::to_vec).collect()
    }
}

impl<const N: usize> From<[[f64; N]; N]> for ContactMatrix {
    fn from(rows: [[f64; N]; N]) -> Self {
        ContactMatrix {
            size: N,
            rates: rows.iter().flatten().copied().collect(),
        }
    }
}

impl TryFrom<Vec<Vec<f64>>> for ContactMatrix {
    type Error = SimError;

    fn try_from(rows: Vec<Vec<f64>>) -> Result<Self, Self::Error> {
        ContactMatrix::new(rows)
    }
}

impl From<ContactMatrix> for Vec<Vec<f64>> {
    fn from(matrix: ContactMatrix) -> Self {
        matrix.rows()
    }
}
