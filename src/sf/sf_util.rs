use ndarray::{Array1, Axis};

use crate::{
    error::MalformedDataError,
    selection::index::{element_column_indices, ColumnLayout, IrrepLabel},
    store::DataPoint,
};

use super::{sf_compute::pair_cross_term, Decomposition, ReducedCurve};

/// Weight below which an irrep is treated as absent from a point.
pub const NONZERO_IRREP_PREC: f64 = 1e-6;

/// Fail when `point` lacks the array a per-point decomposition reads.
pub fn check_decomposition_arrays(
    point: &DataPoint,
    decomposition: &Decomposition,
) -> Result<(), MalformedDataError> {
    let name = match decomposition {
        Decomposition::Selection => return Ok(()),
        Decomposition::Irreps => ("partial_sf_s", point.partial_sf_s().is_some()),
        Decomposition::ElementPairs => ("partial_sf_e", point.partial_sf_e().is_some()),
        Decomposition::ElementsE2 => ("partial_sf_e2", point.partial_sf_e2().is_some()),
        Decomposition::AtomColumns { .. } => {
            ("partial_sf_columns", point.partial_sf_columns().is_some())
        }
    };
    match name {
        (_, true) => Ok(()),
        (field, false) => Err(MalformedDataError::MissingField(point.field_path(field))),
    }
}

/**
One curve per valid irrep slot whose summed weight exceeds
`NONZERO_IRREP_PREC`, labelled like `E$_{2}$`.
*/
pub fn irrep_curves(point: &DataPoint) -> Result<Vec<ReducedCurve>, MalformedDataError> {
    let partial = point
        .partial_sf_s()
        .ok_or_else(|| MalformedDataError::MissingField(point.field_path("partial_sf_s")))?;
    let curves = point
        .ir_labels()
        .iter()
        .enumerate()
        .map(|(slot, label)| (label, partial.index_axis(Axis(1), slot)))
        .filter(|(_, column)| column.sum() > NONZERO_IRREP_PREC)
        .map(|(label, column)| {
            let label = IrrepLabel::parse(label).map_or_else(|| label.clone(), |l| l.to_tex());
            ReducedCurve::new(&label, column.to_owned())
        })
        .collect();
    Ok(curves)
}

/**
One curve per unordered element pair `i1 <= i2`, the off-diagonal pairs
carrying both cross terms.
*/
pub fn element_pair_curves(point: &DataPoint) -> Result<Vec<ReducedCurve>, MalformedDataError> {
    let partial = point
        .partial_sf_e()
        .ok_or_else(|| MalformedDataError::MissingField(point.field_path("partial_sf_e")))?;
    let elements = point.elements();
    let mut curves = vec![];
    for (i1, e1) in elements.iter().enumerate() {
        for (i2, e2) in elements.iter().enumerate().skip(i1) {
            let values = pair_cross_term(partial.view(), i1, i2).mapv(|c| c.re);
            curves.push(ReducedCurve::new(&format!("{}–{}", e1, e2), values));
        }
    }
    Ok(curves)
}

/// Per-element curves of `partial_sf_e2`, summed over the cross-index axis.
pub fn element_curves_e2(point: &DataPoint) -> Result<Vec<ReducedCurve>, MalformedDataError> {
    let partial = point
        .partial_sf_e2()
        .ok_or_else(|| MalformedDataError::MissingField(point.field_path("partial_sf_e2")))?;
    let summed = partial.sum_axis(Axis(1));
    Ok(point
        .elements()
        .iter()
        .zip(summed.axis_iter(Axis(1)))
        .map(|(element, column)| ReducedCurve::new(element, column.to_owned()))
        .collect())
}

/**
Per-element curves of the per-atom projection columns.
# Arguments:
  * `symbols`: chemical symbol of every atom in cell order
  * `layout`: declared layout of the columns
# Errors:
  * `MalformedDataError` when the point records a primitive-cell atom count
  other than `symbols.len()`, or the columns do not fit the layout
*/
pub fn atom_column_curves(
    point: &DataPoint,
    symbols: &[String],
    layout: ColumnLayout,
) -> Result<Vec<ReducedCurve>, MalformedDataError> {
    let columns = point
        .partial_sf_columns()
        .ok_or_else(|| MalformedDataError::MissingField(point.field_path("partial_sf_columns")))?;
    if let Some(natoms) = point.natoms_primitive() {
        if natoms != symbols.len() {
            return Err(MalformedDataError::Shape {
                path: point.field_path("natoms_primitive"),
                reason: format!("{} atoms, structure lists {}", natoms, symbols.len()),
            });
        }
    }
    let groups = element_column_indices(symbols, layout, columns.ncols())?;
    Ok(groups
        .into_iter()
        .map(|(element, indices)| {
            let mut acc = Array1::<f64>::zeros(point.num_freqs());
            indices
                .iter()
                .for_each(|&i| acc += &columns.index_axis(Axis(1), i));
            ReducedCurve::new(&element, acc)
        })
        .collect())
}
