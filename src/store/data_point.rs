use ndarray::{Array1, Array2, Array3, Array4, Array5, Ix1, Ix2, Ix3, Ix4, Ix5};
use num_complex::Complex64;

use super::source::HierarchicalSource;
use crate::error::MalformedDataError;

/**
Spectral data at one q-point of the band path.
# Arrays (leading axis = frequency bins, for every array):
  * `total_sf`: [freq]
  * `partial_sf_s`: [freq, irrep slot], slots past `num_irreps` may be NaN padding
  * `partial_sf_e`: [freq, element, sub, element]
  * `partial_sf_s_e`: [freq, irrep slot, element, sub, element]
  * `partial_sf_e2`: [freq, cross index, element]
  * `partial_sf_columns`: [freq, column], per-atom projection columns
*/
#[derive(Debug, Clone)]
pub struct DataPoint {
    path_index: usize,
    point_index: usize,
    distance: f64,
    frequencies: Array1<f64>,
    pointgroup_symbol: String,
    num_irreps: usize,
    ir_labels: Vec<String>,
    elements: Vec<String>,
    natoms_primitive: Option<usize>,
    total_sf: Option<Array1<f64>>,
    partial_sf_s: Option<Array2<f64>>,
    partial_sf_e: Option<Array4<Complex64>>,
    partial_sf_s_e: Option<Array5<Complex64>>,
    partial_sf_e2: Option<Array3<f64>>,
    partial_sf_columns: Option<Array2<f64>>,
}

impl DataPoint {
    pub fn new(
        path_index: usize,
        point_index: usize,
        distance: f64,
        frequencies: Array1<f64>,
    ) -> Self {
        Self {
            path_index,
            point_index,
            distance,
            frequencies,
            pointgroup_symbol: String::new(),
            num_irreps: 0,
            ir_labels: vec![],
            elements: vec![],
            natoms_primitive: None,
            total_sf: None,
            partial_sf_s: None,
            partial_sf_e: None,
            partial_sf_s_e: None,
            partial_sf_e2: None,
            partial_sf_columns: None,
        }
    }

    /// `num_irreps` defaults to the number of labels.
    pub fn with_symmetry(mut self, pointgroup_symbol: &str, ir_labels: &[&str]) -> Self {
        self.pointgroup_symbol = pointgroup_symbol.to_string();
        self.ir_labels = ir_labels.iter().map(|s| s.to_string()).collect();
        self.num_irreps = ir_labels.len();
        self
    }

    /// Point group, irrep labels and irrep count of `other`.
    pub fn with_symmetry_of(mut self, other: &DataPoint) -> Self {
        self.pointgroup_symbol = other.pointgroup_symbol.clone();
        self.ir_labels = other.ir_labels.clone();
        self.num_irreps = other.num_irreps;
        self
    }

    pub fn with_num_irreps(mut self, num_irreps: usize) -> Self {
        self.num_irreps = num_irreps;
        self
    }

    pub fn with_elements(mut self, elements: &[&str]) -> Self {
        self.elements = elements.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_natoms_primitive(mut self, natoms_primitive: usize) -> Self {
        self.natoms_primitive = Some(natoms_primitive);
        self
    }

    pub fn with_total_sf(mut self, total_sf: Array1<f64>) -> Self {
        self.total_sf = Some(total_sf);
        self
    }

    pub fn with_partial_sf_s(mut self, partial_sf_s: Array2<f64>) -> Self {
        self.partial_sf_s = Some(partial_sf_s);
        self
    }

    pub fn with_partial_sf_e(mut self, partial_sf_e: Array4<Complex64>) -> Self {
        self.partial_sf_e = Some(partial_sf_e);
        self
    }

    pub fn with_partial_sf_s_e(mut self, partial_sf_s_e: Array5<Complex64>) -> Self {
        self.partial_sf_s_e = Some(partial_sf_s_e);
        self
    }

    pub fn with_partial_sf_e2(mut self, partial_sf_e2: Array3<f64>) -> Self {
        self.partial_sf_e2 = Some(partial_sf_e2);
        self
    }

    pub fn with_partial_sf_columns(mut self, partial_sf_columns: Array2<f64>) -> Self {
        self.partial_sf_columns = Some(partial_sf_columns);
        self
    }

    /**
    Read the point `<path_index>/<point_index>/` from a hierarchical source.
    # Arguments:
      * `shared_frequencies`: store-level grid used when the point has none of its own.
    */
    pub fn from_source<S: HierarchicalSource>(
        source: &S,
        path_index: usize,
        point_index: usize,
        shared_frequencies: Option<&Array1<f64>>,
    ) -> Result<Self, MalformedDataError> {
        let group = format!("{}/{}/", path_index, point_index);
        let key = |name: &str| format!("{}{}", group, name);

        let distance_key = key("distance");
        let distance = source
            .field(&distance_key)
            .ok_or_else(|| MalformedDataError::MissingField(distance_key.clone()))?
            .to_f64(&distance_key)?;

        let freq_key = key("frequencies");
        let frequencies = match (source.field(&freq_key), shared_frequencies) {
            (Some(field), _) => field.to_real_array::<Ix1>(&freq_key)?,
            (None, Some(shared)) => shared.clone(),
            (None, None) => return Err(MalformedDataError::MissingField(freq_key)),
        };

        let mut point = Self::new(path_index, point_index, distance, frequencies);

        let pg_key = key("pointgroup_symbol");
        if let Some(field) = source.field(&pg_key) {
            point.pointgroup_symbol = field.to_text(&pg_key)?;
        }
        let labels_key = key("ir_labels");
        if let Some(field) = source.field(&labels_key) {
            point.ir_labels = field.to_text_list(&labels_key)?;
        }
        let num_irreps_key = key("num_irreps");
        point.num_irreps = match source.field(&num_irreps_key) {
            Some(field) => field.to_usize(&num_irreps_key)?,
            None => point.ir_labels.iter().filter(|l| !l.is_empty()).count(),
        };
        let elements_key = key("elements");
        if let Some(field) = source.field(&elements_key) {
            point.elements = field.to_text_list(&elements_key)?;
        }
        let natoms_key = key("natoms_primitive");
        if let Some(field) = source.field(&natoms_key) {
            point.natoms_primitive = Some(field.to_usize(&natoms_key)?);
        }

        let total_key = key("total_sf");
        if let Some(field) = source.field(&total_key) {
            point.total_sf = Some(field.to_real_array::<Ix1>(&total_key)?);
        }
        let sf_s_key = key("partial_sf_s");
        if let Some(field) = source.field(&sf_s_key) {
            point.partial_sf_s = Some(field.to_real_array::<Ix2>(&sf_s_key)?);
        }
        let sf_e_key = key("partial_sf_e");
        if let Some(field) = source.field(&sf_e_key) {
            point.partial_sf_e = Some(field.to_complex_array::<Ix4>(&sf_e_key)?);
        }
        let sf_s_e_key = key("partial_sf_s_e");
        if let Some(field) = source.field(&sf_s_e_key) {
            point.partial_sf_s_e = Some(field.to_complex_array::<Ix5>(&sf_s_e_key)?);
        }
        let sf_e2_key = key("partial_sf_e2");
        if let Some(field) = source.field(&sf_e2_key) {
            point.partial_sf_e2 = Some(field.to_real_array::<Ix3>(&sf_e2_key)?);
        }
        let columns_key = key("partial_sf_columns");
        if let Some(field) = source.field(&columns_key) {
            point.partial_sf_columns = Some(field.to_real_array::<Ix2>(&columns_key)?);
        }

        point.validate()?;
        Ok(point)
    }

    /// Store path of one of this point's fields, used in error messages.
    pub fn field_path(&self, name: &str) -> String {
        format!("{}/{}/{}", self.path_index, self.point_index, name)
    }

    /**
    Check that every array agrees with the frequency-bin count and with the
    point's irrep and element counts.
    */
    pub fn validate(&self) -> Result<(), MalformedDataError> {
        let num_freqs = self.num_freqs();
        if num_freqs == 0 {
            return Err(MalformedDataError::EmptyFrequencies(
                self.field_path("frequencies"),
            ));
        }
        if self.ir_labels.len() < self.num_irreps {
            return Err(self.shape_error(
                "ir_labels",
                format!("{} labels for {} irreps", self.ir_labels.len(), self.num_irreps),
            ));
        }
        let num_elements = self.elements.len();

        let mut leading_axes: Vec<(&str, usize)> = vec![];
        if let Some(a) = &self.total_sf {
            leading_axes.push(("total_sf", a.len()));
        }
        if let Some(a) = &self.partial_sf_s {
            leading_axes.push(("partial_sf_s", a.nrows()));
            if a.ncols() < self.num_irreps {
                return Err(self.shape_error(
                    "partial_sf_s",
                    format!("{} slots for {} irreps", a.ncols(), self.num_irreps),
                ));
            }
        }
        if let Some(a) = &self.partial_sf_e {
            let (n, e1, _, e2) = a.dim();
            leading_axes.push(("partial_sf_e", n));
            if e1 != num_elements || e2 != num_elements {
                return Err(self.shape_error(
                    "partial_sf_e",
                    format!("element axes ({}, {}) for {} elements", e1, e2, num_elements),
                ));
            }
        }
        if let Some(a) = &self.partial_sf_s_e {
            let (n, slots, e1, _, e2) = a.dim();
            leading_axes.push(("partial_sf_s_e", n));
            if slots < self.num_irreps || e1 != num_elements || e2 != num_elements {
                return Err(self.shape_error(
                    "partial_sf_s_e",
                    format!(
                        "shape {:?} for {} irreps and {} elements",
                        a.shape(),
                        self.num_irreps,
                        num_elements
                    ),
                ));
            }
        }
        if let Some(a) = &self.partial_sf_e2 {
            let (n, _, e) = a.dim();
            leading_axes.push(("partial_sf_e2", n));
            if e != num_elements {
                return Err(self.shape_error(
                    "partial_sf_e2",
                    format!("element axis {} for {} elements", e, num_elements),
                ));
            }
        }
        if let Some(a) = &self.partial_sf_columns {
            leading_axes.push(("partial_sf_columns", a.nrows()));
        }

        match leading_axes.into_iter().find(|(_, n)| *n != num_freqs) {
            Some((name, found)) => Err(MalformedDataError::Ragged {
                path: self.field_path(name),
                expected: num_freqs,
                found,
            }),
            None => Ok(()),
        }
    }

    fn shape_error(&self, name: &str, reason: String) -> MalformedDataError {
        MalformedDataError::Shape {
            path: self.field_path(name),
            reason,
        }
    }

    pub fn num_freqs(&self) -> usize {
        self.frequencies.len()
    }

    pub fn path_index(&self) -> usize {
        self.path_index
    }

    pub fn point_index(&self) -> usize {
        self.point_index
    }

    pub fn distance(&self) -> f64 {
        self.distance
    }

    pub fn frequencies(&self) -> &Array1<f64> {
        &self.frequencies
    }

    pub fn pointgroup_symbol(&self) -> &str {
        self.pointgroup_symbol.as_ref()
    }

    pub fn num_irreps(&self) -> usize {
        self.num_irreps
    }

    /// Labels of the valid slots, padding past `num_irreps` excluded.
    pub fn ir_labels(&self) -> &[String] {
        &self.ir_labels[..self.num_irreps.min(self.ir_labels.len())]
    }

    pub fn elements(&self) -> &[String] {
        self.elements.as_ref()
    }

    pub fn natoms_primitive(&self) -> Option<usize> {
        self.natoms_primitive
    }

    pub fn total_sf(&self) -> Option<&Array1<f64>> {
        self.total_sf.as_ref()
    }

    pub fn partial_sf_s(&self) -> Option<&Array2<f64>> {
        self.partial_sf_s.as_ref()
    }

    pub fn partial_sf_e(&self) -> Option<&Array4<Complex64>> {
        self.partial_sf_e.as_ref()
    }

    pub fn partial_sf_s_e(&self) -> Option<&Array5<Complex64>> {
        self.partial_sf_s_e.as_ref()
    }

    pub fn partial_sf_e2(&self) -> Option<&Array3<f64>> {
        self.partial_sf_e2.as_ref()
    }

    pub fn partial_sf_columns(&self) -> Option<&Array2<f64>> {
        self.partial_sf_columns.as_ref()
    }
}
