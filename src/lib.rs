//! Kappa tree - a dynamic sampling tree for kinetic Monte Carlo
//!
//! Every atom carries four non-negative jump rates ("kappa"). The tree draws
//! an `(atom, jump)` pair with probability proportional to its rate from a
//! caller-supplied uniform number, and supports bulk appends, in-place rate
//! updates and removal of the drawn atom, all in O(log n).
//!
//! The data structure lives in [`core`]. With the `python` feature enabled
//! the crate also builds a `PyO3` extension module exposing it as `Tree`.

#![allow(clippy::redundant_pub_crate)]

pub mod core;

pub use crate::core::{SamplingTree, Selection, TreeConfig, TreeError};

#[cfg(feature = "python")]
mod python {
    use pyo3::exceptions::{PyIndexError, PyRuntimeError, PyValueError};
    use pyo3::prelude::*;

    use crate::core::{SamplingTree, TreeError};

    impl From<TreeError> for PyErr {
        fn from(err: TreeError) -> Self {
            let message = err.to_string();
            match err {
                TreeError::DimensionMismatch { .. }
                | TreeError::NegativeWeight { .. }
                | TreeError::NonFiniteWeight { .. }
                | TreeError::TotalOverflow { .. }
                | TreeError::InvalidDraw(_) => PyValueError::new_err(message),
                TreeError::EmptyTree => PyIndexError::new_err(message),
                TreeError::InvalidState
                | TreeError::StaleSelection { .. }
                | TreeError::InvariantViolation(_) => {
                    PyRuntimeError::new_err(message)
                }
            }
        }
    }

    /// Sampling tree over atoms with four jump rates each.
    ///
    /// Call `choose_event` with a uniform number in [0, 1), read the result
    /// with `get_index` / `get_jump_id`, then act on it with `update_kappa`
    /// or `remove`.
    #[pyclass(name = "Tree")]
    pub struct PyTree {
        inner: SamplingTree<i64>,
    }

    #[pymethods]
    impl PyTree {
        #[new]
        fn new() -> Self {
            Self {
                inner: SamplingTree::new(),
            }
        }

        fn __len__(&self) -> usize {
            self.inner.len()
        }

        /// Append atoms: `kappa` is a sequence of length-4 rows, `ids` the
        /// matching caller ids.
        ///
        /// # Errors
        ///
        /// Raises `ValueError` on shape mismatches or negative rates.
        #[allow(clippy::needless_pass_by_value)]
        fn append(&mut self, kappa: Vec<Vec<f64>>, ids: Vec<i64>) -> PyResult<()> {
            Ok(self.inner.append(&kappa, ids)?)
        }

        /// Draw an event for the uniform number `xi`.
        ///
        /// # Errors
        ///
        /// Raises `IndexError` if the tree holds no weight.
        fn choose_event(&mut self, xi: f64) -> PyResult<()> {
            self.inner.choose_event(xi)?;
            Ok(())
        }

        fn get_index(&self) -> PyResult<i64> {
            Ok(*self.inner.get_index()?)
        }

        fn get_jump_id(&self) -> PyResult<usize> {
            Ok(self.inner.get_jump_id()?)
        }

        #[allow(clippy::needless_pass_by_value)]
        fn update_kappa(&mut self, kappa: Vec<f64>) -> PyResult<()> {
            Ok(self.inner.update_kappa(&kappa)?)
        }

        fn remove(&mut self) -> PyResult<()> {
            self.inner.remove()?;
            Ok(())
        }

        fn get_kappa(&self) -> f64 {
            self.inner.get_kappa()
        }
    }

    /// Python module definition
    #[pymodule]
    fn kappa_tree(m: &Bound<'_, PyModule>) -> PyResult<()> {
        m.add_class::<PyTree>()?;
        Ok(())
    }

}
