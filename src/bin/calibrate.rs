//! Offline calibration utility.
//!
//! Reads a CSV of calibration samples with `raw` and `true` columns and
//! prints the least-squares linear fit:
//!
//! ```text
//! calibrate samples.csv
//! Calibration: value = 0.004883*raw + 0.120000
//! ```

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use aquamon::calib::linear_fit;

// ---

#[derive(Debug, Deserialize)]
struct Sample {
    raw: f64,
    #[serde(rename = "true")]
    reference: f64,
}

fn main() -> Result<()> {
    // ---
    let Some(path) = std::env::args().nth(1) else {
        bail!("usage: calibrate <samples.csv>");
    };

    let mut reader = csv::Reader::from_path(&path)
        .with_context(|| format!("failed to open calibration file '{path}'"))?;

    let mut points = Vec::new();
    for record in reader.deserialize() {
        let sample: Sample = record.context("invalid calibration row")?;
        points.push((sample.raw, sample.reference));
    }

    let (slope, intercept) =
        linear_fit(&points).context("calibration fit failed")?;

    println!("Calibration: value = {slope:.6}*raw + {intercept:.6}");
    Ok(())
}
