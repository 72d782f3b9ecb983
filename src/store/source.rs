/**
Hierarchical input stores keyed by `"<path>/<point>/<field>"`.
Store-level fields (the shared `frequencies` grid) carry no prefix.
*/
use std::{
    collections::{BTreeMap, BTreeSet},
    fs,
    path::Path,
};

use ndarray::{Array, ArrayD, Dimension, IxDyn};
use num_complex::Complex64;
use serde::{Deserialize, Deserializer};

use crate::error::{MalformedDataError, SfError};

pub trait HierarchicalSource {
    /// Every `(path_index, point_index)` present, in ascending order.
    fn point_keys(&self) -> Vec<(usize, usize)>;
    fn field(&self, path: &str) -> Option<&Field>;
}

/// One named entry of the store. JSON `null` inside numeric data reads as NaN.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Field {
    Number(f64),
    Text(String),
    Vector(#[serde(deserialize_with = "nullable_f64s")] Vec<f64>),
    TextList(Vec<String>),
    Array {
        shape: Vec<usize>,
        #[serde(deserialize_with = "nullable_f64s")]
        data: Vec<f64>,
    },
    ComplexArray {
        shape: Vec<usize>,
        #[serde(deserialize_with = "nullable_f64s")]
        re: Vec<f64>,
        #[serde(deserialize_with = "nullable_f64s")]
        im: Vec<f64>,
    },
}

fn nullable_f64s<'de, D>(deserializer: D) -> Result<Vec<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let values: Vec<Option<f64>> = Vec::deserialize(deserializer)?;
    Ok(values.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
}

impl Field {
    fn wrong_kind(path: &str, expected: &'static str) -> MalformedDataError {
        MalformedDataError::WrongKind {
            path: path.to_string(),
            expected,
        }
    }

    fn shape_error(path: &str, reason: impl ToString) -> MalformedDataError {
        MalformedDataError::Shape {
            path: path.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn to_f64(&self, path: &str) -> Result<f64, MalformedDataError> {
        match self {
            Field::Number(x) => Ok(*x),
            Field::Vector(v) if v.len() == 1 => Ok(v[0]),
            _ => Err(Self::wrong_kind(path, "a number")),
        }
    }

    pub fn to_usize(&self, path: &str) -> Result<usize, MalformedDataError> {
        let x = self.to_f64(path)?;
        if x >= 0.0 && x.fract() == 0.0 && x.is_finite() {
            Ok(x as usize)
        } else {
            Err(Self::wrong_kind(path, "a non-negative integer"))
        }
    }

    pub fn to_text(&self, path: &str) -> Result<String, MalformedDataError> {
        match self {
            Field::Text(s) => Ok(s.trim().to_string()),
            _ => Err(Self::wrong_kind(path, "a string")),
        }
    }

    pub fn to_text_list(&self, path: &str) -> Result<Vec<String>, MalformedDataError> {
        match self {
            Field::TextList(list) => Ok(list.iter().map(|s| s.trim().to_string()).collect()),
            Field::Vector(v) if v.is_empty() => Ok(vec![]),
            _ => Err(Self::wrong_kind(path, "a list of strings")),
        }
    }

    pub fn to_real_array<D: Dimension>(
        &self,
        path: &str,
    ) -> Result<Array<f64, D>, MalformedDataError> {
        let array = match self {
            Field::Vector(v) => ArrayD::from_shape_vec(IxDyn(&[v.len()]), v.clone()),
            Field::Array { shape, data } => ArrayD::from_shape_vec(IxDyn(shape), data.clone()),
            _ => return Err(Self::wrong_kind(path, "a real array")),
        }
        .map_err(|e| Self::shape_error(path, e))?;
        array
            .into_dimensionality::<D>()
            .map_err(|e| Self::shape_error(path, e))
    }

    pub fn to_complex_array<D: Dimension>(
        &self,
        path: &str,
    ) -> Result<Array<Complex64, D>, MalformedDataError> {
        let (shape, re, im) = match self {
            Field::ComplexArray { shape, re, im } => (shape, re, im),
            _ => return Err(Self::wrong_kind(path, "a complex array")),
        };
        if re.len() != im.len() {
            return Err(Self::shape_error(
                path,
                format!("{} real parts but {} imaginary parts", re.len(), im.len()),
            ));
        }
        let data: Vec<Complex64> = re
            .iter()
            .zip(im.iter())
            .map(|(&r, &i)| Complex64::new(r, i))
            .collect();
        ArrayD::from_shape_vec(IxDyn(shape), data)
            .map_err(|e| Self::shape_error(path, e))?
            .into_dimensionality::<D>()
            .map_err(|e| Self::shape_error(path, e))
    }
}

/// In-memory store; also the deserialized form of a JSON store file.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(transparent)]
pub struct MemorySource {
    fields: BTreeMap<String, Field>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, field: Field) -> &mut Self {
        self.fields.insert(path.into(), field);
        self
    }

    pub fn from_json_str(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn read_json<P: AsRef<Path>>(json_path: P) -> Result<Self, SfError> {
        let path = json_path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| SfError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&text).map_err(|source| SfError::Json {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn num_fields(&self) -> usize {
        self.fields.len()
    }
}

impl HierarchicalSource for MemorySource {
    fn point_keys(&self) -> Vec<(usize, usize)> {
        self.fields
            .keys()
            .filter_map(|key| {
                let mut parts = key.split('/');
                let path = parts.next()?.parse::<usize>().ok()?;
                let point = parts.next()?.parse::<usize>().ok()?;
                parts.next().map(|_| (path, point))
            })
            .collect::<BTreeSet<(usize, usize)>>()
            .into_iter()
            .collect()
    }

    fn field(&self, path: &str) -> Option<&Field> {
        self.fields.get(path)
    }
}

#[cfg(test)]
mod test {
    use ndarray::{Ix2, Ix4};

    use super::{Field, HierarchicalSource, MemorySource};

    #[test]
    fn test_json_fields() {
        let source = MemorySource::from_json_str(
            r#"{
                "frequencies": [-1.0, 0.0, 1.0],
                "0/0/distance": 0.0,
                "0/0/pointgroup_symbol": "mm2",
                "0/0/ir_labels": ["A1", "B2"],
                "0/0/partial_sf_s": {"shape": [3, 2], "data": [1, 2, 3, 4, 5, null]},
                "0/1/distance": 0.5,
                "1/0/distance": 0.5,
                "0/0/partial_sf_e": {"shape": [1, 1, 1, 1], "re": [2.0], "im": [0.5]}
            }"#,
        )
        .unwrap();
        assert_eq!(source.point_keys(), vec![(0, 0), (0, 1), (1, 0)]);
        assert_eq!(
            source.field("0/0/pointgroup_symbol"),
            Some(&Field::Text("mm2".to_string()))
        );
        let sf_s = source
            .field("0/0/partial_sf_s")
            .unwrap()
            .to_real_array::<Ix2>("0/0/partial_sf_s")
            .unwrap();
        assert_eq!(sf_s.dim(), (3, 2));
        assert!(sf_s[[2, 1]].is_nan());
        let sf_e = source
            .field("0/0/partial_sf_e")
            .unwrap()
            .to_complex_array::<Ix4>("0/0/partial_sf_e")
            .unwrap();
        assert_eq!(sf_e[[0, 0, 0, 0]].im, 0.5);
    }

    #[test]
    fn test_field_kind_errors() {
        let labels = Field::TextList(vec!["A1".into()]);
        assert!(labels.to_f64("x").is_err());
        assert!(Field::Number(2.5).to_usize("x").is_err());
        assert_eq!(Field::Number(3.0).to_usize("x").unwrap(), 3);
        let bad = Field::Array {
            shape: vec![2, 2],
            data: vec![1.0, 2.0, 3.0],
        };
        assert!(bad.to_real_array::<Ix2>("x").is_err());
    }
}
