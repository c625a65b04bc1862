//! Aligned per-asset return matrix.

use super::error::{FrontierError, Result};
use super::types::ReturnKind;

/// T x N matrix of periodic returns: one row per period, one column per asset.
///
/// Rows holding any non-finite value are treated as missing and dropped on
/// construction, so every stored row is complete.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnMatrix {
    rows: Vec<Vec<f64>>,
    n_assets: usize,
    dropped_rows: usize,
}

impl ReturnMatrix {
    /// Build from period rows. Every row must have the same width (N >= 2).
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self> {
        let n_assets = rows.first().map(|r| r.len()).unwrap_or(0);
        if n_assets < 2 {
            return Err(FrontierError::insufficient_data("return matrix assets", 2, n_assets));
        }
        if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != n_assets) {
            return Err(FrontierError::length_mismatch(
                &format!("return row {i}"),
                n_assets,
                row.len(),
            ));
        }

        let total = rows.len();
        let rows: Vec<Vec<f64>> = rows
            .into_iter()
            .filter(|row| row.iter().all(|v| v.is_finite()))
            .collect();
        let dropped_rows = total - rows.len();

        if rows.len() < 2 {
            return Err(FrontierError::insufficient_data(
                "complete return periods",
                2,
                rows.len(),
            ));
        }

        Ok(Self {
            rows,
            n_assets,
            dropped_rows,
        })
    }

    /// Build from per-asset columns of equal length.
    pub fn from_columns(columns: &[Vec<f64>]) -> Result<Self> {
        let n_periods = columns.first().map(|c| c.len()).unwrap_or(0);
        if let Some((j, col)) = columns.iter().enumerate().find(|(_, c)| c.len() != n_periods) {
            return Err(FrontierError::length_mismatch(
                &format!("return column {j}"),
                n_periods,
                col.len(),
            ));
        }

        let rows = (0..n_periods)
            .map(|t| columns.iter().map(|col| col[t]).collect())
            .collect();
        Self::from_rows(rows)
    }

    /// Derive returns from a (T + 1) x N matrix of prices.
    ///
    /// A return is missing when either price is missing or non-positive;
    /// such periods are dropped like any other incomplete row.
    pub fn from_prices(prices: &[Vec<f64>], kind: ReturnKind) -> Result<Self> {
        let rows = prices
            .windows(2)
            .map(|pair| {
                let (prev, curr) = (&pair[0], &pair[1]);
                if prev.len() != curr.len() {
                    return Err(FrontierError::length_mismatch(
                        "price row",
                        prev.len(),
                        curr.len(),
                    ));
                }
                Ok(prev
                    .iter()
                    .zip(curr)
                    .map(|(&p0, &p1)| periodic_return(p0, p1, kind))
                    .collect())
            })
            .collect::<Result<Vec<Vec<f64>>>>()?;
        Self::from_rows(rows)
    }

    /// Number of complete periods (T).
    #[inline]
    pub fn n_periods(&self) -> usize {
        self.rows.len()
    }

    /// Number of assets (N).
    #[inline]
    pub fn n_assets(&self) -> usize {
        self.n_assets
    }

    /// Rows discarded because of missing values.
    #[inline]
    pub fn dropped_rows(&self) -> usize {
        self.dropped_rows
    }

    /// Period rows.
    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    /// Returns of a single asset across all periods.
    pub fn column(&self, asset: usize) -> Option<Vec<f64>> {
        if asset >= self.n_assets {
            return None;
        }
        Some(self.rows.iter().map(|row| row[asset]).collect())
    }
}

fn periodic_return(prev: f64, curr: f64, kind: ReturnKind) -> f64 {
    if !(prev.is_finite() && curr.is_finite()) || prev <= 0.0 || curr <= 0.0 {
        return f64::NAN;
    }
    match kind {
        ReturnKind::Simple => curr / prev - 1.0,
        ReturnKind::Log => (curr / prev).ln(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drops_incomplete_rows() {
        let rows = vec![
            vec![0.01, 0.02],
            vec![f64::NAN, 0.01],
            vec![-0.01, 0.00],
            vec![0.02, f64::INFINITY],
            vec![0.00, 0.03],
        ];
        let matrix = ReturnMatrix::from_rows(rows).unwrap();
        assert_eq!(matrix.n_periods(), 3);
        assert_eq!(matrix.n_assets(), 2);
        assert_eq!(matrix.dropped_rows(), 2);
        assert_eq!(matrix.column(1).unwrap(), vec![0.02, 0.00, 0.03]);
        assert!(matrix.column(2).is_none());
    }

    #[test]
    fn test_rejects_short_or_ragged_input() {
        assert!(ReturnMatrix::from_rows(vec![vec![0.01, 0.02]]).is_err());
        assert!(ReturnMatrix::from_rows(vec![vec![0.01], vec![0.02]]).is_err());
        assert!(ReturnMatrix::from_rows(vec![vec![0.01, 0.02], vec![0.02]]).is_err());
        // Only one complete row survives cleaning.
        assert!(ReturnMatrix::from_rows(vec![vec![0.01, 0.02], vec![f64::NAN, 0.02]]).is_err());
        assert!(ReturnMatrix::from_rows(Vec::new()).is_err());
    }

    #[test]
    fn test_from_columns() {
        let matrix =
            ReturnMatrix::from_columns(&[vec![0.1, 0.2, 0.3], vec![0.0, -0.1, 0.1]]).unwrap();
        assert_eq!(matrix.rows()[1], vec![0.2, -0.1]);
        assert!(ReturnMatrix::from_columns(&[vec![0.1, 0.2], vec![0.0]]).is_err());
    }

    #[test]
    fn test_from_prices() {
        let prices = vec![
            vec![100.0, 50.0],
            vec![110.0, 50.0],
            vec![99.0, 0.0],
            vec![99.0, 55.0],
            vec![108.9, 60.5],
        ];

        let simple = ReturnMatrix::from_prices(&prices, ReturnKind::Simple).unwrap();
        // Periods touching the zero price are dropped.
        assert_eq!(simple.n_periods(), 2);
        assert_eq!(simple.dropped_rows(), 2);
        assert!((simple.rows()[0][0] - 0.1).abs() < 1e-12);
        assert!((simple.rows()[1][1] - 0.1).abs() < 1e-12);

        let log = ReturnMatrix::from_prices(&prices, ReturnKind::Log).unwrap();
        assert!((log.rows()[0][0] - 1.1_f64.ln()).abs() < 1e-12);
    }
}
