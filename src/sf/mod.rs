use log::{debug, info, warn};
use ndarray::{Array1, Array2, Axis};
use rayon::prelude::*;
use serde::Deserialize;

use crate::{
    error::{InterpolationError, MalformedDataError, SfError},
    interp::interpolate,
    render::{CurveConsumer, RenderConfig},
    selection::{ColumnLayout, SelectionCriterion, SelectionMode},
    store::{DataPoint, DataPointStore},
    THZ_TO_MEV,
};

pub mod sf_compute;
pub mod sf_util;

use self::{
    sf_compute::{check_required_arrays, reduce_point, total_curve},
    sf_util::{
        atom_column_curves, check_decomposition_arrays, element_curves_e2, element_pair_curves,
        irrep_curves,
    },
};

/// One curve aligned to a frequency grid.
#[derive(Debug, Clone, PartialEq)]
pub struct ReducedCurve {
    label: String,
    values: Array1<f64>,
}

impl ReducedCurve {
    pub fn new(label: &str, values: Array1<f64>) -> Self {
        Self {
            label: label.to_string(),
            values,
        }
    }

    pub fn label(&self) -> &str {
        self.label.as_ref()
    }

    pub fn values(&self) -> &Array1<f64> {
        &self.values
    }
}

/**
Reduced curves of every q-point stacked into a 2-D field.
# Fields:
  * distances: normalized distance of each q-point
  * frequencies: shared frequency grid in the requested unit
  * values: `[q-point, frequency]`
*/
#[derive(Debug, Clone, PartialEq)]
pub struct SfField {
    label: String,
    distances: Array1<f64>,
    frequencies: Array1<f64>,
    values: Array2<f64>,
}

impl SfField {
    pub fn new(
        label: &str,
        distances: Array1<f64>,
        frequencies: Array1<f64>,
        values: Array2<f64>,
    ) -> Self {
        Self {
            label: label.to_string(),
            distances,
            frequencies,
            values,
        }
    }

    /// Field on the grid refined `n` times along both axes.
    pub fn refine(&self, n: usize) -> Result<Self, InterpolationError> {
        let (distances, frequencies, values) =
            interpolate(&self.distances, &self.frequencies, &self.values, n)?;
        Ok(Self::new(&self.label, distances, frequencies, values))
    }

    pub fn label(&self) -> &str {
        self.label.as_ref()
    }

    pub fn distances(&self) -> &Array1<f64> {
        &self.distances
    }

    pub fn frequencies(&self) -> &Array1<f64> {
        &self.frequencies
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }
}

/// Curves of one q-point for line plots.
#[derive(Debug, Clone, PartialEq)]
pub struct PointCurves {
    index: usize,
    frequencies: Array1<f64>,
    curves: Vec<ReducedCurve>,
}

impl PointCurves {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn frequencies(&self) -> &Array1<f64> {
        &self.frequencies
    }

    pub fn curves(&self) -> &[ReducedCurve] {
        self.curves.as_ref()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum FrequencyUnit {
    #[default]
    THz,
    #[serde(rename = "meV")]
    MeV,
}

impl FrequencyUnit {
    /// Factor applied to frequencies stored in THz.
    pub fn scale(&self) -> f64 {
        match self {
            FrequencyUnit::THz => 1.0,
            FrequencyUnit::MeV => THZ_TO_MEV,
        }
    }

    pub fn symbol(&self) -> &str {
        match self {
            FrequencyUnit::THz => "THz",
            FrequencyUnit::MeV => "meV",
        }
    }
}

/// Curve families drawn next to the total for every q-point.
#[derive(Debug, Clone, PartialEq)]
pub enum Decomposition {
    /// The curve of the selection criterion.
    Selection,
    /// Irreps with non-zero weight.
    Irreps,
    /// Every unordered element pair of `partial_sf_e`.
    ElementPairs,
    /// Element curves of `partial_sf_e2`.
    ElementsE2,
    /// Per-atom projection columns grouped by element.
    AtomColumns {
        layout: ColumnLayout,
        symbols: Vec<String>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum GridShape {
    /// One 2-D field along the band path, optionally refined `ninterp` times.
    Band { ninterp: Option<usize> },
    /// Per-q-point curve families.
    Points { decomposition: Decomposition },
}

/// What a run of the engine produces.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    grid: GridShape,
    unit: FrequencyUnit,
    criterion: SelectionCriterion,
}

impl EngineConfig {
    pub fn new(grid: GridShape, unit: FrequencyUnit, criterion: SelectionCriterion) -> Self {
        Self {
            grid,
            unit,
            criterion,
        }
    }

    pub fn grid(&self) -> &GridShape {
        &self.grid
    }

    pub fn unit(&self) -> FrequencyUnit {
        self.unit
    }

    pub fn criterion(&self) -> &SelectionCriterion {
        &self.criterion
    }

    pub fn mode(&self) -> SelectionMode {
        self.criterion.mode()
    }
}

/// Reductions over a loaded store. Curves are recomputed on every call.
pub struct AggregationEngine<'a> {
    store: &'a DataPointStore,
}

impl<'a> AggregationEngine<'a> {
    pub fn new(store: &'a DataPointStore) -> Self {
        Self { store }
    }

    /**
    One reduced curve per data point, in store order.
    # Errors:
      * `InvalidSelectionError` for a structurally wrong criterion
      * `MalformedDataError` when a point lacks the array the mode reduces
      Both are raised before any reduction runs.
    */
    pub fn aggregate(
        &self,
        criterion: &SelectionCriterion,
    ) -> Result<Vec<ReducedCurve>, SfError> {
        criterion.validate()?;
        let mode = criterion.mode();
        self.store
            .points()
            .iter()
            .try_for_each(|point| check_required_arrays(point, criterion))?;
        debug!("Aggregating {} points in {:?} mode", self.store.count(), mode);
        let label = criterion.label();
        let curves = self
            .store
            .points()
            .par_iter()
            .map(|point| reduce_point(point, criterion).map(|v| ReducedCurve::new(&label, v)))
            .collect::<Result<Vec<ReducedCurve>, MalformedDataError>>()?;
        Ok(curves)
    }

    /// Curves of `aggregate` stacked into a `[q-point, frequency]` field.
    pub fn aggregate_field(
        &self,
        criterion: &SelectionCriterion,
        unit: FrequencyUnit,
    ) -> Result<SfField, SfError> {
        let curves = self.aggregate(criterion)?;
        let num_freqs = self.store.frequencies().len();
        let mut values = Array2::<f64>::zeros((curves.len(), num_freqs));
        for ((mut row, curve), point) in values
            .axis_iter_mut(Axis(0))
            .zip(curves.iter())
            .zip(self.store.points())
        {
            if curve.values().len() != num_freqs {
                return Err(MalformedDataError::Ragged {
                    path: point.field_path("frequencies"),
                    expected: num_freqs,
                    found: curve.values().len(),
                }
                .into());
            }
            row.assign(curve.values());
        }
        Ok(SfField::new(
            &criterion.label(),
            self.store.distances(),
            self.store.frequencies() * unit.scale(),
            values,
        ))
    }

    /**
    Total curve of every point followed by the curves of `decomposition`.
    Frequencies are each point's own grid in the requested unit.
    */
    pub fn point_curves(
        &self,
        decomposition: &Decomposition,
        criterion: &SelectionCriterion,
        unit: FrequencyUnit,
    ) -> Result<Vec<PointCurves>, SfError> {
        criterion.validate()?;
        let total = SelectionCriterion::new();
        for point in self.store.points() {
            check_required_arrays(point, &total)?;
            match decomposition {
                Decomposition::Selection => check_required_arrays(point, criterion)?,
                _ => check_decomposition_arrays(point, decomposition)?,
            }
        }
        let curves = self
            .store
            .points()
            .par_iter()
            .enumerate()
            .map(|(index, point)| -> Result<PointCurves, MalformedDataError> {
                let mut curves = vec![ReducedCurve::new("Total", total_curve(point)?)];
                curves.extend(decompose(point, decomposition, criterion)?);
                Ok(PointCurves {
                    index,
                    frequencies: point.frequencies() * unit.scale(),
                    curves,
                })
            })
            .collect::<Result<Vec<PointCurves>, MalformedDataError>>()?;
        Ok(curves)
    }

    /**
    Compute what `config` asks for and hand it to `consumer`, with the
    frequency unit of `config` recorded in the render settings.
    A band field whose refinement fails is skipped with a warning.
    */
    pub fn run<C: CurveConsumer>(
        &self,
        config: &EngineConfig,
        render: &RenderConfig,
        consumer: &mut C,
    ) -> Result<(), SfError> {
        let render = &render.clone().with_frequency_unit(config.unit());
        match config.grid() {
            GridShape::Band { ninterp } => {
                let field = self.aggregate_field(config.criterion(), config.unit())?;
                let field = match ninterp {
                    Some(n) => match field.refine(*n) {
                        Ok(refined) => refined,
                        Err(e) => {
                            warn!("Skipping panel `{}`: {}", field.label(), e);
                            return Ok(());
                        }
                    },
                    None => field,
                };
                info!(
                    "Field `{}` on a {}x{} grid",
                    field.label(),
                    field.distances().len(),
                    field.frequencies().len()
                );
                consumer.consume_field(&field, render)
            }
            GridShape::Points { decomposition } => {
                let points =
                    self.point_curves(decomposition, config.criterion(), config.unit())?;
                info!("Curves of {} points", points.len());
                points.iter().try_for_each(|p| {
                    consumer.consume_point_curves(p.index(), p.frequencies(), p.curves(), render)
                })
            }
        }
    }
}

fn decompose(
    point: &DataPoint,
    decomposition: &Decomposition,
    criterion: &SelectionCriterion,
) -> Result<Vec<ReducedCurve>, MalformedDataError> {
    match decomposition {
        Decomposition::Selection => match criterion.mode() {
            SelectionMode::Total => Ok(vec![]),
            _ => Ok(vec![ReducedCurve::new(
                &criterion.label(),
                reduce_point(point, criterion)?,
            )]),
        },
        Decomposition::Irreps => irrep_curves(point),
        Decomposition::ElementPairs => element_pair_curves(point),
        Decomposition::ElementsE2 => element_curves_e2(point),
        Decomposition::AtomColumns { layout, symbols } => {
            atom_column_curves(point, symbols, *layout)
        }
    }
}
