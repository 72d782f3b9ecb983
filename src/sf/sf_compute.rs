use std::collections::BTreeSet;

use log::debug;
use ndarray::{s, Array1, Array4, ArrayView4, Axis};
use num_complex::Complex64;

use crate::{
    error::MalformedDataError,
    selection::{
        index::{resolve_element_pair_indices, resolve_selected_slots},
        ElementPair, SelectionCriterion, SelectionMode,
    },
    store::DataPoint,
};

/**
Check that `point` carries the array the criterion reduces. Run over every
point before any reduction starts. Irrep modes only need the array on points
whose point group the criterion maps.
*/
pub fn check_required_arrays(
    point: &DataPoint,
    criterion: &SelectionCriterion,
) -> Result<(), MalformedDataError> {
    let missing = |name: &str| Err(MalformedDataError::MissingField(point.field_path(name)));
    let mapped = criterion.irreps_for(point.pointgroup_symbol()).is_some();
    match criterion.mode() {
        SelectionMode::Total => {
            if point.total_sf().is_none()
                && point.partial_sf_s().is_none()
                && point.partial_sf_e().is_none()
                && point.partial_sf_e2().is_none()
            {
                return missing("total_sf");
            }
        }
        SelectionMode::ByIrrep if mapped && point.partial_sf_s().is_none() => {
            return missing("partial_sf_s")
        }
        SelectionMode::ByElementPair if point.partial_sf_e().is_none() => {
            return missing("partial_sf_e")
        }
        SelectionMode::ByIrrepAndElementPair if mapped && point.partial_sf_s_e().is_none() => {
            return missing("partial_sf_s_e")
        }
        _ => {}
    }
    Ok(())
}

/**
Reduce one point with the mode the criterion implies.
# Errors:
  * `MalformedDataError` when the point's arrays disagree with its labels or
  lack the array the mode reduces
*/
pub fn reduce_point(
    point: &DataPoint,
    criterion: &SelectionCriterion,
) -> Result<Array1<f64>, MalformedDataError> {
    point.validate()?;
    let mode = criterion.mode();
    let irrep_mode = matches!(
        mode,
        SelectionMode::ByIrrep | SelectionMode::ByIrrepAndElementPair
    );
    if irrep_mode && criterion.irreps_for(point.pointgroup_symbol()).is_none() {
        debug!(
            "Point group `{}` of {} not selected",
            point.pointgroup_symbol(),
            point.field_path("")
        );
        return Ok(Array1::zeros(point.num_freqs()));
    }
    match mode {
        SelectionMode::Total => total_curve(point),
        SelectionMode::ByIrrep => {
            let slots = resolve_selected_slots(point, criterion);
            irrep_curve(point, &slots)
        }
        SelectionMode::ByElementPair => {
            let partial_sf_e = point
                .partial_sf_e()
                .ok_or_else(|| MalformedDataError::MissingField(point.field_path("partial_sf_e")))?;
            Ok(element_pair_curve(
                point,
                partial_sf_e.view(),
                criterion.element_pairs(),
            ))
        }
        SelectionMode::ByIrrepAndElementPair => {
            let slots = resolve_selected_slots(point, criterion);
            let restricted = restrict_to_slots(point, &slots)?;
            Ok(element_pair_curve(
                point,
                restricted.view(),
                criterion.element_pairs(),
            ))
        }
    }
}

/**
The stored `total_sf`, or the first available partial array summed over every
auxiliary axis: `partial_sf_s` (valid slots only), then the real part of
`partial_sf_e`, then `partial_sf_e2`.
*/
pub(crate) fn total_curve(point: &DataPoint) -> Result<Array1<f64>, MalformedDataError> {
    if let Some(total) = point.total_sf() {
        return Ok(total.clone());
    }
    if let Some(partial) = point.partial_sf_s() {
        return Ok(partial
            .slice(s![.., ..point.num_irreps()])
            .sum_axis(Axis(1)));
    }
    if let Some(partial) = point.partial_sf_e() {
        let summed = partial
            .sum_axis(Axis(3))
            .sum_axis(Axis(2))
            .sum_axis(Axis(1));
        return Ok(discard_imaginary(point, summed));
    }
    if let Some(partial) = point.partial_sf_e2() {
        return Ok(partial.sum_axis(Axis(2)).sum_axis(Axis(1)));
    }
    Err(MalformedDataError::MissingField(
        point.field_path("total_sf"),
    ))
}

/// Sum of `partial_sf_s[:, slot]` over `slots`; zeros when `slots` is empty.
pub(crate) fn irrep_curve(
    point: &DataPoint,
    slots: &BTreeSet<usize>,
) -> Result<Array1<f64>, MalformedDataError> {
    let partial = point
        .partial_sf_s()
        .ok_or_else(|| MalformedDataError::MissingField(point.field_path("partial_sf_s")))?;
    let mut acc = Array1::<f64>::zeros(point.num_freqs());
    if slots.is_empty() {
        debug!(
            "No selected irreps at {} (point group `{}`)",
            point.field_path(""),
            point.pointgroup_symbol()
        );
    }
    slots
        .iter()
        .for_each(|&slot| acc += &partial.index_axis(Axis(1), slot));
    Ok(acc)
}

/**
Complex cross term of the element pair `(i1, i2)`, summed over the sub axis.
The mirrored term `(i2, i1)` is added for off-diagonal pairs.
*/
pub(crate) fn pair_cross_term(
    partial: ArrayView4<Complex64>,
    i1: usize,
    i2: usize,
) -> Array1<Complex64> {
    let mut acc = partial.slice(s![.., i1, .., i2]).sum_axis(Axis(1));
    if i1 != i2 {
        acc += &partial.slice(s![.., i2, .., i1]).sum_axis(Axis(1));
    }
    acc
}

/**
Sum of the cross terms of every pair, real part kept. Pairs naming an element
absent at this point contribute nothing.
# Arguments:
  * `partial`: [freq, element, sub, element] array of the point
*/
pub(crate) fn element_pair_curve(
    point: &DataPoint,
    partial: ArrayView4<Complex64>,
    pairs: &[ElementPair],
) -> Array1<f64> {
    let mut acc = Array1::<Complex64>::zeros(point.num_freqs());
    for pair in pairs.iter() {
        match resolve_element_pair_indices(point, pair.first(), pair.second()) {
            Ok((i1, i2)) => acc += &pair_cross_term(partial, i1, i2),
            Err(e) => debug!("Pair {} skipped: {}", pair, e),
        }
    }
    discard_imaginary(point, acc)
}

/// `partial_sf_s_e` summed over `slots`, leaving a [freq, element, sub, element] array.
pub(crate) fn restrict_to_slots(
    point: &DataPoint,
    slots: &BTreeSet<usize>,
) -> Result<Array4<Complex64>, MalformedDataError> {
    let partial = point
        .partial_sf_s_e()
        .ok_or_else(|| MalformedDataError::MissingField(point.field_path("partial_sf_s_e")))?;
    let (nf, _, ne1, nsub, ne2) = partial.dim();
    let mut acc = Array4::<Complex64>::zeros((nf, ne1, nsub, ne2));
    slots
        .iter()
        .for_each(|&slot| acc += &partial.index_axis(Axis(1), slot));
    Ok(acc)
}

/// Real part of a complex curve. The imaginary residue is not validated.
fn discard_imaginary(point: &DataPoint, curve: Array1<Complex64>) -> Array1<f64> {
    let residue = curve.iter().map(|c| c.im.abs()).fold(0.0, f64::max);
    if residue > 0.0 {
        debug!(
            "Discarded imaginary residue up to {:e} at {}",
            residue,
            point.field_path("")
        );
    }
    curve.mapv(|c| c.re)
}
