/**
Resolution of symbolic selections (irrep labels, element symbols, per-atom
projection columns) into array indices. Irrep and element orderings are local
to each data point, so every lookup takes the point it applies to.
*/
use std::collections::BTreeSet;

use serde::Deserialize;

use super::SelectionCriterion;
use crate::{
    error::{MalformedDataError, UnknownElementError},
    store::DataPoint,
};

/// Irreducible-representation label of the form `<letter>[<digits>]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IrrepLabel {
    raw: String,
    multiplicity: usize,
}

impl IrrepLabel {
    /// `None` for empty labels or labels that do not start with a letter.
    pub fn parse(label: &str) -> Option<Self> {
        let label = label.trim();
        let mut chars = label.chars();
        if !chars.next()?.is_alphabetic() {
            return None;
        }
        let tail = chars.as_str();
        let multiplicity = if !tail.is_empty() && tail.chars().all(|c| c.is_ascii_digit()) {
            tail.parse::<usize>().ok().filter(|&m| m > 0).unwrap_or(1)
        } else {
            1
        };
        Some(Self {
            raw: label.to_string(),
            multiplicity,
        })
    }

    pub fn as_str(&self) -> &str {
        self.raw.as_ref()
    }

    /// Number of physical modes one stored slot of this irrep stands for.
    pub fn multiplicity(&self) -> usize {
        self.multiplicity
    }

    /// `E2` -> `E$_{2}$`, single-letter labels unchanged.
    pub fn to_tex(&self) -> String {
        let mut chars = self.raw.chars();
        match chars.next() {
            Some(first) if !chars.as_str().is_empty() => {
                format!("{}$_{{{}}}$", first, chars.as_str())
            }
            _ => self.raw.clone(),
        }
    }
}

/// Every valid slot of `point` labelled `label`. Each stored slot appears once.
pub fn resolve_irrep_indices(point: &DataPoint, label: &str) -> BTreeSet<usize> {
    point
        .ir_labels()
        .iter()
        .enumerate()
        .filter(|(_, l)| l.as_str() == label)
        .map(|(i, _)| i)
        .collect()
}

/**
Union of the slots of every label the criterion selects for the point's
point group. Empty when the point group has no entry in the criterion.
*/
pub fn resolve_selected_slots(
    point: &DataPoint,
    criterion: &SelectionCriterion,
) -> BTreeSet<usize> {
    criterion
        .irreps_for(point.pointgroup_symbol())
        .map(|labels| {
            labels
                .iter()
                .flat_map(|label| resolve_irrep_indices(point, label))
                .collect::<BTreeSet<usize>>()
        })
        .unwrap_or_default()
}

/**
Per-mode slot indices: slot `i` repeated `multiplicity(label_i)` times, in
slot order. Used when reconstructing per-mode quantities from stored slots.
*/
pub fn expand_degenerate_slots(point: &DataPoint) -> Vec<usize> {
    point
        .ir_labels()
        .iter()
        .enumerate()
        .flat_map(|(i, label)| {
            let multiplicity = IrrepLabel::parse(label).map_or(1, |l| l.multiplicity());
            std::iter::repeat(i).take(multiplicity)
        })
        .collect()
}

/**
Positions of `e1` and `e2` in the point's own element list.
# Errors:
  * `UnknownElementError` when either symbol is absent at this point. Callers
  treat this as "no contribution".
*/
pub fn resolve_element_pair_indices(
    point: &DataPoint,
    e1: &str,
    e2: &str,
) -> Result<(usize, usize), UnknownElementError> {
    let find = |symbol: &str| {
        point
            .elements()
            .iter()
            .position(|e| e == symbol)
            .ok_or_else(|| UnknownElementError {
                symbol: symbol.to_string(),
                point: format!("{}/{}", point.path_index(), point.point_index()),
            })
    };
    Ok((find(e1)?, find(e2)?))
}

/**
Layout of per-atom projection columns. The version is part of the name so
that a file's layout is declared, never guessed from its column count.
*/
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum ColumnLayout {
    /// One column per atom.
    #[serde(rename = "v1-per-atom")]
    V1PerAtom,
    /// Legacy files: three Cartesian columns per atom.
    #[serde(rename = "v0-per-atom-cartesian")]
    V0PerAtomCartesian,
}

impl ColumnLayout {
    pub fn version(&self) -> u32 {
        match self {
            ColumnLayout::V1PerAtom => 1,
            ColumnLayout::V0PerAtomCartesian => 0,
        }
    }

    pub fn columns_per_atom(&self) -> usize {
        match self {
            ColumnLayout::V1PerAtom => 1,
            ColumnLayout::V0PerAtomCartesian => 3,
        }
    }
}

/**
Group projection columns by element, elements in order of first appearance.
# Arguments:
  * `symbols`: chemical symbol of every atom, in cell order
  * `layout`: declared column layout
  * `num_columns`: number of projection columns actually present
# Errors:
  * `MalformedDataError::Shape` when the column count disagrees with the layout.
*/
pub fn element_column_indices(
    symbols: &[String],
    layout: ColumnLayout,
    num_columns: usize,
) -> Result<Vec<(String, Vec<usize>)>, MalformedDataError> {
    let per_atom = layout.columns_per_atom();
    if symbols.len() * per_atom != num_columns {
        return Err(MalformedDataError::Shape {
            path: "partial_sf_columns".to_string(),
            reason: format!(
                "{} columns, layout v{} expects {} for {} atoms",
                num_columns,
                layout.version(),
                symbols.len() * per_atom,
                symbols.len()
            ),
        });
    }
    let mut groups: Vec<(String, Vec<usize>)> = vec![];
    symbols.iter().enumerate().for_each(|(atom, symbol)| {
        let columns = (0..per_atom).map(|k| atom * per_atom + k);
        match groups.iter_mut().find(|(s, _)| s == symbol) {
            Some((_, indices)) => indices.extend(columns),
            None => groups.push((symbol.clone(), columns.collect())),
        }
    });
    Ok(groups)
}
