/**
Whitespace-separated spectral-function table, one row per
(q-point, frequency) sample:

```text
# distance  frequency  total  [partial ...]
0.000000    -2.500000  0.0012  0.0004  0.0008
...
```
*/
use std::{fs, path::Path};

use ndarray::Array2;
use nom::{
    character::complete::space0,
    multi::many1,
    sequence::{preceded, tuple},
    IResult,
};

use super::general::{float, line_tail};
use crate::error::SfError;

#[derive(Debug, Clone)]
pub struct SfTable {
    /// dimension = (num_columns, num_rows)
    columns: Array2<f64>,
}

impl SfTable {
    pub fn new(columns: Array2<f64>) -> Self {
        Self { columns }
    }

    pub fn read<P: AsRef<Path>>(table_path: P) -> Result<Self, SfError> {
        let path = table_path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| SfError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&text).map_err(|reason| SfError::Text {
            path: path.display().to_string(),
            reason,
        })
    }

    pub fn parse(text: &str) -> Result<Self, String> {
        let mut rows: Vec<Vec<f64>> = vec![];
        for (line_no, line) in text.lines().enumerate() {
            if line.trim().is_empty() || line.trim_start().starts_with('#') {
                continue;
            }
            let (left, row) =
                row(line).map_err(|e| format!("line {}: {}", line_no + 1, e))?;
            if !left.is_empty() {
                return Err(format!("line {}: unexpected text `{}`", line_no + 1, left));
            }
            if let Some(first) = rows.first() {
                if first.len() != row.len() {
                    return Err(format!(
                        "line {}: {} columns, expected {}",
                        line_no + 1,
                        row.len(),
                        first.len()
                    ));
                }
            }
            rows.push(row);
        }
        let num_rows = rows.len();
        let num_columns = rows.first().map_or(0, |r| r.len());
        if num_columns < 3 {
            return Err(format!(
                "need at least distance, frequency and total columns, found {}",
                num_columns
            ));
        }
        let flat: Vec<f64> = rows.into_iter().flatten().collect();
        let columns = Array2::from_shape_vec((num_rows, num_columns), flat)
            .map_err(|e| e.to_string())?
            .reversed_axes();
        Ok(Self::new(columns))
    }

    pub fn num_columns(&self) -> usize {
        self.columns.nrows()
    }

    pub fn num_rows(&self) -> usize {
        self.columns.ncols()
    }

    pub fn columns(&self) -> &Array2<f64> {
        &self.columns
    }
}

fn row(line: &str) -> IResult<&str, Vec<f64>> {
    let (i, (values, _)) = tuple((many1(preceded(space0, float)), line_tail))(line)?;
    Ok((i, values))
}
