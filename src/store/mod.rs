/// Immutable collection of per-q-point spectral data.
use log::{debug, info};
use ndarray::{s, Array1, Ix1};
use ndarray_stats::QuantileExt;
use serde::Deserialize;

use crate::{error::MalformedDataError, parser::sf_table::SfTable};

pub mod data_point;
pub mod source;

pub use data_point::DataPoint;
pub use source::{Field, HierarchicalSource, MemorySource};

const SHARED_FREQUENCIES: &str = "frequencies";

/// What the columns past `total` of a spectral-function table hold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnRole {
    /// Per-atom projection columns, read with a `ColumnLayout`.
    #[default]
    AtomColumns,
    /// One column per irrep slot, NaN past the point's irrep count.
    IrrepSlots,
}

#[derive(Debug, Clone)]
pub struct DataPointStore {
    points: Vec<DataPoint>,
    frequencies: Array1<f64>,
}

impl DataPointStore {
    /**
    Parse every `<path>/<point>/` group of a hierarchical source.
    # Errors:
      * `MalformedDataError` naming the offending field path when a point lacks
      its distance, has no frequency bins, or carries ill-shaped arrays.
    */
    pub fn load<S: HierarchicalSource>(source: &S) -> Result<Self, MalformedDataError> {
        let shared = match source.field(SHARED_FREQUENCIES) {
            Some(field) => Some(field.to_real_array::<Ix1>(SHARED_FREQUENCIES)?),
            None => None,
        };
        let keys = source.point_keys();
        debug!("Found {} data points in source", keys.len());
        let points = keys
            .into_iter()
            .map(|(ipath, ip)| DataPoint::from_source(source, ipath, ip, shared.as_ref()))
            .collect::<Result<Vec<DataPoint>, MalformedDataError>>()?;
        let store = Self::assemble(points, shared)?;
        info!(
            "Loaded {} data points on {} paths ({} frequency bins)",
            store.count(),
            store.num_paths(),
            store.frequencies().len()
        );
        Ok(store)
    }

    /// Build a store from points constructed in code; every point is validated.
    pub fn from_points(points: Vec<DataPoint>) -> Result<Self, MalformedDataError> {
        for point in points.iter() {
            point.validate()?;
        }
        Self::assemble(points, None)
    }

    /**
    Build points from the whitespace spectral-function table
    (`distance frequency total [columns...]`, rows grouped by q-point).
    Columns past the third become each point's `partial_sf_columns` or
    `partial_sf_s`, as `role` declares.
    */
    pub fn from_sf_table(
        table: &SfTable,
        num_paths: usize,
        points_per_path: usize,
        role: ColumnRole,
    ) -> Result<Self, MalformedDataError> {
        let num_qpoints = num_paths * points_per_path;
        let num_rows = table.num_rows();
        if num_qpoints == 0 || num_rows % num_qpoints != 0 {
            return Err(MalformedDataError::Shape {
                path: "spectral function table".to_string(),
                reason: format!(
                    "{} rows cannot be split into {} q-points",
                    num_rows, num_qpoints
                ),
            });
        }
        let num_freqs = num_rows / num_qpoints;
        let columns = table.columns();
        let points: Vec<DataPoint> = (0..num_qpoints)
            .map(|iq| {
                let rows = s![.., iq * num_freqs..(iq + 1) * num_freqs];
                let block = columns.slice(rows);
                let mut point = DataPoint::new(
                    iq / points_per_path,
                    iq % points_per_path,
                    block[[0, 0]],
                    block.row(1).to_owned(),
                )
                .with_total_sf(block.row(2).to_owned());
                if block.nrows() > 3 {
                    let partial = block.slice(s![3.., ..]).t().to_owned();
                    point = match role {
                        ColumnRole::AtomColumns => point.with_partial_sf_columns(partial),
                        ColumnRole::IrrepSlots => point.with_partial_sf_s(partial),
                    };
                }
                point
            })
            .collect();
        Self::from_points(points)
    }

    /**
    Copy the point group and irrep labels of every point of `symmetry` onto the
    point at the same position. Tables carry no symmetry data of their own.
    # Errors:
      * `MalformedDataError` when the point counts differ or the labels do not
      fit the point's arrays
    */
    pub fn with_symmetry_of(self, symmetry: &DataPointStore) -> Result<Self, MalformedDataError> {
        if symmetry.count() != self.count() {
            return Err(MalformedDataError::Shape {
                path: "symmetry store".to_string(),
                reason: format!(
                    "{} points for {} q-points",
                    symmetry.count(),
                    self.count()
                ),
            });
        }
        let points = self
            .points
            .into_iter()
            .zip(symmetry.points())
            .map(|(point, source)| point.with_symmetry_of(source))
            .collect();
        Self::from_points(points)
    }

    fn assemble(
        points: Vec<DataPoint>,
        shared: Option<Array1<f64>>,
    ) -> Result<Self, MalformedDataError> {
        let first = points
            .first()
            .ok_or_else(|| MalformedDataError::MissingField("0/0/distance".to_string()))?;
        let frequencies = shared.unwrap_or_else(|| first.frequencies().clone());
        if frequencies.is_empty() {
            return Err(MalformedDataError::EmptyFrequencies(
                SHARED_FREQUENCIES.to_string(),
            ));
        }
        Ok(Self {
            points,
            frequencies,
        })
    }

    pub fn get(&self, i: usize) -> Option<&DataPoint> {
        self.points.get(i)
    }

    pub fn count(&self) -> usize {
        self.points.len()
    }

    pub fn points(&self) -> &[DataPoint] {
        self.points.as_ref()
    }

    /// Shared frequency grid.
    pub fn frequencies(&self) -> &Array1<f64> {
        &self.frequencies
    }

    pub fn num_paths(&self) -> usize {
        self.points
            .iter()
            .map(|p| p.path_index())
            .max()
            .map_or(0, |m| m + 1)
    }

    /**
    Distances of all points normalized by the final path distance, so they run
    from 0 to 1. NaN entries are skipped when looking for the maximum; a
    non-positive maximum leaves the distances untouched.
    */
    pub fn distances(&self) -> Array1<f64> {
        let raw: Array1<f64> = self.points.iter().map(|p| p.distance()).collect();
        let max = *raw.max_skipnan();
        if max > 0.0 {
            raw / max
        } else {
            raw
        }
    }

    /// Normalized start of the band path followed by the end of every path.
    pub fn path_ticks(&self) -> Vec<f64> {
        let distances = self.distances();
        let mut ticks: Vec<f64> = distances.iter().take(1).copied().collect();
        self.points
            .iter()
            .zip(distances.iter())
            .enumerate()
            .filter(|(i, (point, _))| {
                self.points
                    .get(i + 1)
                    .map_or(true, |next| next.path_index() != point.path_index())
            })
            .for_each(|(_, (_, &d))| ticks.push(d));
        ticks
    }
}

#[cfg(test)]
mod test {
    use super::{ColumnRole, DataPointStore, Field, MemorySource};
    use crate::{error::MalformedDataError, parser::sf_table::SfTable};

    fn two_path_source() -> MemorySource {
        let mut source = MemorySource::new();
        source.insert("frequencies", Field::Vector(vec![0.0, 1.0]));
        for (key, d) in [("0/0", 0.0), ("0/1", 1.0), ("1/0", 1.0), ("1/1", 4.0)] {
            source.insert(format!("{}/distance", key), Field::Number(d));
            source.insert(format!("{}/total_sf", key), Field::Vector(vec![d, 2.0 * d]));
        }
        source
    }

    #[test]
    fn test_load_and_normalize() {
        let store = DataPointStore::load(&two_path_source()).unwrap();
        assert_eq!(store.count(), 4);
        assert_eq!(store.num_paths(), 2);
        assert_eq!(store.frequencies().to_vec(), vec![0.0, 1.0]);
        assert_eq!(store.distances().to_vec(), vec![0.0, 0.25, 0.25, 1.0]);
        assert_eq!(store.path_ticks(), vec![0.0, 0.25, 1.0]);
        assert_eq!(store.get(3).unwrap().total_sf().unwrap()[1], 8.0);
    }

    #[test]
    fn test_missing_distance() {
        let mut source = two_path_source();
        source.insert("2/0/total_sf", Field::Vector(vec![0.0, 0.0]));
        match DataPointStore::load(&source) {
            Err(MalformedDataError::MissingField(path)) => assert_eq!(path, "2/0/distance"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_zero_frequency_bins() {
        let mut source = MemorySource::new();
        source.insert("0/0/distance", Field::Number(0.0));
        source.insert("0/0/frequencies", Field::Vector(vec![]));
        assert!(matches!(
            DataPointStore::load(&source),
            Err(MalformedDataError::EmptyFrequencies(_))
        ));
    }

    #[test]
    fn test_from_sf_table() {
        let table = SfTable::parse(
            "0.0 0.0 1.0 0.5 0.5\n\
             0.0 1.0 2.0 1.0 1.0\n\
             2.0 0.0 3.0 1.5 1.5\n\
             2.0 1.0 4.0 2.0 2.0\n",
        )
        .unwrap();
        let store = DataPointStore::from_sf_table(&table, 1, 2, ColumnRole::AtomColumns).unwrap();
        assert_eq!(store.count(), 2);
        assert_eq!(store.distances().to_vec(), vec![0.0, 1.0]);
        let second = store.get(1).unwrap();
        assert_eq!(second.total_sf().unwrap().to_vec(), vec![3.0, 4.0]);
        assert_eq!(second.partial_sf_columns().unwrap().dim(), (2, 2));
        assert!(DataPointStore::from_sf_table(&table, 3, 1, ColumnRole::AtomColumns).is_err());
    }

    #[test]
    fn test_irrep_table_takes_symmetry() {
        let table = SfTable::parse(
            "0.0 0.0 3.0 1.0 2.0
             0.0 1.0 3.0 1.0 2.0
             1.0 0.0 2.0 2.0 nan
             1.0 1.0 2.0 2.0 nan
",
        )
        .unwrap();
        let store = DataPointStore::from_sf_table(&table, 1, 2, ColumnRole::IrrepSlots).unwrap();
        assert_eq!(store.get(1).unwrap().partial_sf_s().unwrap().dim(), (2, 2));
        assert!(store.get(1).unwrap().partial_sf_columns().is_none());

        let mut symmetry = MemorySource::new();
        symmetry.insert("frequencies", Field::Vector(vec![0.0, 1.0]));
        symmetry.insert("0/0/distance", Field::Number(0.0));
        symmetry.insert("0/0/pointgroup_symbol", Field::Text("mm2".to_string()));
        symmetry.insert(
            "0/0/ir_labels",
            Field::TextList(vec!["A1".to_string(), "B2".to_string()]),
        );
        symmetry.insert("0/1/distance", Field::Number(1.0));
        symmetry.insert("0/1/pointgroup_symbol", Field::Text("4mm".to_string()));
        symmetry.insert("0/1/ir_labels", Field::TextList(vec!["E".to_string()]));
        let symmetry = DataPointStore::load(&symmetry).unwrap();

        let store = store.with_symmetry_of(&symmetry).unwrap();
        let second = store.get(1).unwrap();
        assert_eq!(second.pointgroup_symbol(), "4mm");
        assert_eq!(second.num_irreps(), 1);
        assert_eq!(second.ir_labels(), &["E".to_string()]);

        let single = DataPointStore::from_points(vec![symmetry.get(0).unwrap().clone()]).unwrap();
        assert!(matches!(
            store.with_symmetry_of(&single),
            Err(MalformedDataError::Shape { .. })
        ));
    }
}
