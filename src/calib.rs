//! Offline sensor calibration: ordinary least-squares linear fit.
//!
//! Probes drift; periodically a technician records pairs of raw sensor
//! output against a trusted reference measurement and fits
//! `value = slope * raw + intercept` to re-derive the conversion. The fit is
//! a one-shot computation with no state, exposed to the `calibrate` binary.

// ---

/// The sample set cannot produce a line.
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum CalibError {
    /// Fewer than two samples.
    #[error("need at least 2 calibration points, got {0}")]
    TooFewPoints(usize),

    /// All raw values identical; the slope is undefined.
    #[error("raw values are all identical, cannot fit a line")]
    DegenerateInput,
}

/// Fit `(slope, intercept)` minimizing squared error over `(raw, true)`
/// pairs.
pub fn linear_fit(points: &[(f64, f64)]) -> Result<(f64, f64), CalibError> {
    // ---
    if points.len() < 2 {
        return Err(CalibError::TooFewPoints(points.len()));
    }

    let n = points.len() as f64;
    let mean_x = points.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = points.iter().map(|(_, y)| y).sum::<f64>() / n;

    let mut covariance = 0.0;
    let mut variance = 0.0;
    for (x, y) in points {
        covariance += (x - mean_x) * (y - mean_y);
        variance += (x - mean_x) * (x - mean_x);
    }

    if variance == 0.0 {
        return Err(CalibError::DegenerateInput);
    }

    let slope = covariance / variance;
    let intercept = mean_y - slope * mean_x;
    Ok((slope, intercept))
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{a} != {b}");
    }

    #[test]
    fn exact_line_is_recovered() {
        // ---
        // value = 2*raw + 1
        let points = [(0.0, 1.0), (1.0, 3.0), (2.0, 5.0), (3.0, 7.0)];
        let (slope, intercept) = linear_fit(&points).unwrap();

        assert_close(slope, 2.0);
        assert_close(intercept, 1.0);
    }

    #[test]
    fn noisy_points_fit_by_least_squares() {
        // ---
        let points = [(1.0, 2.1), (2.0, 3.9), (3.0, 6.2), (4.0, 7.8)];
        let (slope, intercept) = linear_fit(&points).unwrap();

        // Hand-computed OLS solution for these points.
        assert_close(slope, 1.94);
        assert_close(intercept, 0.15);
    }

    #[test]
    fn two_points_define_the_line() {
        // ---
        let (slope, intercept) = linear_fit(&[(10.0, 100.0), (20.0, 300.0)]).unwrap();

        assert_close(slope, 20.0);
        assert_close(intercept, -100.0);
    }

    #[test]
    fn too_few_points_is_an_error() {
        // ---
        assert_eq!(linear_fit(&[]), Err(CalibError::TooFewPoints(0)));
        assert_eq!(linear_fit(&[(1.0, 2.0)]), Err(CalibError::TooFewPoints(1)));
    }

    #[test]
    fn constant_raw_values_are_degenerate() {
        // ---
        let points = [(5.0, 1.0), (5.0, 2.0), (5.0, 3.0)];
        assert_eq!(linear_fit(&points), Err(CalibError::DegenerateInput));
    }
}
