pub mod config;
pub mod error;
pub mod interp;
pub mod parser;
pub mod render;
pub mod selection;
pub mod sf;
pub mod store;
#[cfg(test)]
mod test;

pub use error::{
    InterpolationError, InvalidSelectionError, MalformedDataError, SfError, UnknownElementError,
};
pub use render::{CurveConsumer, RenderConfig, TableWriter};
pub use selection::{SelectionCriterion, SelectionMode};
pub use sf::{AggregationEngine, EngineConfig, ReducedCurve, SfField};
pub use store::{DataPoint, DataPointStore};

/// 1 THz in meV.
pub const THZ_TO_MEV: f64 = 4.135667662;
