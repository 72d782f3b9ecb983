/**
Refinement of a rectilinear (distance, frequency) grid.

Values are resampled with a tensor-product natural cubic spline: first along
the frequency axis of every q-point, then along the distance axis of every
refined frequency. Repeated distances mark the joint of two band paths; the
distance axis is split there and the inserted points between the repeated
pair are linear blends of the two samples.
*/
use itertools_num::linspace;
use ndarray::{s, Array1, Array2, ArrayView1, Axis};

use crate::error::InterpolationError;

use self::spline::NaturalSpline;

pub mod spline;

/// Smallest number of finite samples a grid must hold.
pub const MIN_SAMPLES: usize = 4;

/**
Refine the grid by inserting `n - 1` evenly spaced points between every
adjacent pair on both axes. `n == 1` returns the input unchanged, whatever its
shape.
# Returns:
  * refined distances and frequencies, each of length `(len - 1) * n + 1`,
  with the original coordinates at stride `n`
  * refined values, `[distance, frequency]`, the original samples kept exactly
# Errors:
  * `InvalidRefinement` when `n == 0`
  * `DegenerateAxis` for fewer than 2 points, a decreasing axis, non-finite
  coordinates or repeated frequencies
  * `ShapeMismatch` when `values` is not `(distances.len(), frequencies.len())`
  * `TooFewSamples` when the grid holds fewer than `MIN_SAMPLES` finite values
*/
pub fn interpolate(
    distances: &Array1<f64>,
    frequencies: &Array1<f64>,
    values: &Array2<f64>,
    n: usize,
) -> Result<(Array1<f64>, Array1<f64>, Array2<f64>), InterpolationError> {
    if n == 0 {
        return Err(InterpolationError::InvalidRefinement(n));
    }
    if n == 1 {
        return Ok((distances.clone(), frequencies.clone(), values.clone()));
    }
    check_axis("distance", distances.view(), true)?;
    check_axis("frequency", frequencies.view(), false)?;
    let expected = (distances.len(), frequencies.len());
    if values.dim() != expected {
        return Err(InterpolationError::ShapeMismatch {
            expected,
            found: values.dim(),
        });
    }
    let finite = values.iter().filter(|v| v.is_finite()).count();
    if finite < MIN_SAMPLES {
        return Err(InterpolationError::TooFewSamples(finite));
    }

    let fine_frequencies = refine_axis(frequencies, n);
    let mut along_frequency = Array2::<f64>::zeros((distances.len(), fine_frequencies.len()));
    along_frequency
        .axis_iter_mut(Axis(0))
        .zip(values.axis_iter(Axis(0)))
        .for_each(|(mut fine, coarse)| fine.assign(&resample(frequencies.view(), coarse, n)));

    let fine_distances = refine_axis(distances, n);
    let mut fine_values = Array2::<f64>::zeros((fine_distances.len(), fine_frequencies.len()));
    fine_values
        .axis_iter_mut(Axis(1))
        .zip(along_frequency.axis_iter(Axis(1)))
        .for_each(|(mut fine, coarse)| fine.assign(&resample(distances.view(), coarse, n)));

    Ok((fine_distances, fine_frequencies, fine_values))
}

/// `n - 1` evenly spaced points inserted strictly between every adjacent pair.
pub fn refine_axis(axis: &Array1<f64>, n: usize) -> Array1<f64> {
    if axis.len() < 2 || n <= 1 {
        return axis.clone();
    }
    let mut refined = Vec::with_capacity((axis.len() - 1) * n + 1);
    axis.windows(2).into_iter().for_each(|pair| {
        refined.push(pair[0]);
        refined.extend(linspace(pair[0], pair[1], n + 1).skip(1).take(n - 1));
    });
    refined.push(axis[axis.len() - 1]);
    Array1::from(refined)
}

fn check_axis(
    axis: &'static str,
    coords: ArrayView1<f64>,
    allow_repeats: bool,
) -> Result<(), InterpolationError> {
    let degenerate = |reason: String| Err(InterpolationError::DegenerateAxis { axis, reason });
    if coords.len() < 2 {
        return degenerate(format!("{} point(s)", coords.len()));
    }
    if let Some(i) = coords.iter().position(|x| !x.is_finite()) {
        return degenerate(format!("non-finite coordinate at {}", i));
    }
    let bad_step = coords.windows(2).into_iter().position(|pair| {
        if allow_repeats {
            pair[1] < pair[0]
        } else {
            pair[1] <= pair[0]
        }
    });
    match bad_step {
        Some(i) => degenerate(format!("not increasing at {}", i + 1)),
        None => Ok(()),
    }
}

/**
Resample `ys` given on the non-decreasing `xs` onto the refined axis. Each
strictly increasing run of `xs` gets its own spline.
*/
fn resample(xs: ArrayView1<f64>, ys: ArrayView1<f64>, n: usize) -> Array1<f64> {
    let len = xs.len();
    let mut out = Vec::with_capacity((len - 1) * n + 1);
    let mut start = 0;
    while start < len - 1 {
        let mut end = start;
        while end + 1 < len && xs[end + 1] > xs[end] {
            end += 1;
        }
        if end == start {
            // repeated coordinate
            let (y0, y1) = (ys[start], ys[start + 1]);
            out.extend((0..n).map(|k| y0 + (y1 - y0) * k as f64 / n as f64));
            start += 1;
            continue;
        }
        let spline = NaturalSpline::new(xs.slice(s![start..=end]), ys.slice(s![start..=end]));
        for i in start..end {
            out.push(ys[i]);
            out.extend(
                linspace(xs[i], xs[i + 1], n + 1)
                    .skip(1)
                    .take(n - 1)
                    .map(|x| spline.evaluate(x)),
            );
        }
        start = end;
    }
    out.push(ys[len - 1]);
    Array1::from(out)
}
