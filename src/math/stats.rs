//! Statistics
//!
//! Small numeric helpers shared by the outlier filter and the correlation engine.

use log::trace;
use nalgebra::DVector;

/// `mean_and_std` function.
///
/// Calculates mean and population standard deviation.
///
/// # Arguments
/// - `data`: A slice of sample values.
///
/// # Returns
/// `None` for an empty slice, otherwise `(mean, std)`.
pub fn mean_and_std(data: &[f64]) -> Option<(f64, f64)> {
    if data.is_empty() {
        return None;
    }
    let values = DVector::from_row_slice(data);
    // nalgebra's variance divides by n
    let variance = values.variance();
    trace!("mean/std over {} values, variance {}", data.len(), variance);
    Some((values.mean(), variance.sqrt()))
}

/// `pearson` function.
///
/// Calculates Pearson's correlation coefficient of two equally long series.
///
/// # Returns
/// `None` if the series differ in length, are empty, or either has zero variance.
pub fn pearson(a: &[f64], b: &[f64]) -> Option<f64> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }
    let mut a = DVector::from_row_slice(a);
    let mut b = DVector::from_row_slice(b);
    a.add_scalar_mut(-a.mean());
    b.add_scalar_mut(-b.mean());

    let denominator = a.norm() * b.norm();
    if denominator == 0.0 || !denominator.is_finite() {
        return None;
    }
    let r = a.dot(&b) / denominator;
    trace!("pearson r = {}", r);
    Some(r.clamp(-1.0, 1.0))
}
