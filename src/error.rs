/**
Error taxonomy of the crate.

* `MalformedDataError` - missing or ill-shaped input fields, fatal for a load.
* `InvalidSelectionError` - structurally wrong selection criterion, fatal for
  the aggregation call.
* `UnknownElementError` - element absent at a data point, recovered by the
  caller as a zero contribution.
* `InterpolationError` - grid refinement failure, recovered per panel.
*/
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MalformedDataError {
    #[error("missing required field `{0}`")]
    MissingField(String),
    #[error("field `{0}` has zero frequency bins")]
    EmptyFrequencies(String),
    #[error("field `{path}`: expected {expected}")]
    WrongKind { path: String, expected: &'static str },
    #[error("field `{path}` has {found} frequency bins, expected {expected}")]
    Ragged {
        path: String,
        expected: usize,
        found: usize,
    },
    #[error("field `{path}`: {reason}")]
    Shape { path: String, reason: String },
}

#[derive(Debug, Error, PartialEq)]
pub enum InvalidSelectionError {
    #[error("irrep selection must be a table of point group -> list of labels")]
    IrrepsNotATable,
    #[error("irreps for point group `{0}` must be a list of strings")]
    IrrepLabelsNotAList(String),
    #[error("invalid irrep label `{label}` for point group `{point_group}`")]
    BadIrrepLabel { point_group: String, label: String },
    #[error("empty point group symbol in irrep selection")]
    EmptyPointGroup,
    #[error("element pairs must be a list of [element, element] lists")]
    PairsNotAList,
    #[error("element pair #{0} must hold exactly two element symbols")]
    BadPair(usize),
}

#[derive(Debug, Error, PartialEq)]
#[error("element `{symbol}` is not present at point {point}")]
pub struct UnknownElementError {
    pub symbol: String,
    /// `<path>/<point>` of the data point.
    pub point: String,
}

#[derive(Debug, Error, PartialEq)]
pub enum InterpolationError {
    #[error("refinement factor must be >= 1, got {0}")]
    InvalidRefinement(usize),
    #[error("{axis} axis is degenerate: {reason}")]
    DegenerateAxis { axis: &'static str, reason: String },
    #[error("at least 4 samples are needed, got {0}")]
    TooFewSamples(usize),
    #[error("values have shape {found:?}, axes imply {expected:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        found: (usize, usize),
    },
}

/// Top-level error type returned by loaders, the engine and tasks.
#[derive(Debug, Error)]
pub enum SfError {
    #[error(transparent)]
    Malformed(#[from] MalformedDataError),
    #[error(transparent)]
    Selection(#[from] InvalidSelectionError),
    #[error(transparent)]
    Interpolation(#[from] InterpolationError),
    #[error("failed to read `{path}`")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write output")]
    Write(#[from] std::io::Error),
    #[error("failed to parse JSON store `{path}`")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to parse config")]
    Toml(#[from] toml::de::Error),
    #[error("failed to parse `{path}`: {reason}")]
    Text { path: String, reason: String },
}
