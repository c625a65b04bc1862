//! Conversions between numpy arrays and the engine's input types.

use numpy::{PyArray1, PyReadonlyArray1, PyReadonlyArray2};
use pyo3::prelude::*;

use crate::core::returns::ReturnMatrix;
use crate::core::statistics::ReturnStatistics;
use crate::core::types::Annualization;

/// Convert numpy array to Vec<f64>.
pub fn numpy_to_vec_f64(arr: PyReadonlyArray1<f64>) -> Vec<f64> {
    arr.as_array().iter().copied().collect()
}

/// Convert a T×N numpy matrix into row vectors.
pub fn numpy_to_rows_f64(arr: PyReadonlyArray2<f64>) -> Vec<Vec<f64>> {
    arr.as_array().rows().into_iter().map(|row| row.to_vec()).collect()
}

/// Convert Vec<f64> to numpy array.
pub fn vec_to_numpy_f64<'py>(py: Python<'py>, vec: Vec<f64>) -> &'py PyArray1<f64> {
    PyArray1::from_vec(py, vec)
}

/// Clean a T×N return matrix and compute its statistics.
///
/// `periods_per_year` switches from sample-size scaling to calendar
/// annualization.
pub fn statistics_from_numpy(
    returns: PyReadonlyArray2<f64>,
    periods_per_year: Option<f64>,
) -> PyResult<ReturnStatistics> {
    let matrix = ReturnMatrix::from_rows(numpy_to_rows_f64(returns))?;
    let annualization =
        periods_per_year.map_or(Annualization::SampleSize, Annualization::PeriodsPerYear);
    Ok(ReturnStatistics::from_returns_with(&matrix, annualization)?)
}
