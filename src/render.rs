/**
Hand-off of computed curves to whatever draws them. Drawing itself lives
outside the crate; `TableWriter` dumps curves as whitespace tables.
*/
use std::io::Write;

use ndarray::Array1;
use serde::Deserialize;

use crate::{
    error::SfError,
    sf::{FrequencyUnit, ReducedCurve, SfField},
};

/// Receiver of engine output.
pub trait CurveConsumer {
    fn consume_field(&mut self, field: &SfField, render: &RenderConfig) -> Result<(), SfError>;
    fn consume_point_curves(
        &mut self,
        index: usize,
        frequencies: &Array1<f64>,
        curves: &[ReducedCurve],
        render: &RenderConfig,
    ) -> Result<(), SfError>;
}

/**
Presentation settings passed explicitly to a consumer.
# Fields:
  * f_min, f_max, d_freq: frequency axis range and tick step
  * sf_min, sf_max, d_sf: spectral-function range and tick step
  * band_labels: labels of the band-path ends, with `path_ticks` their positions
  * frequency_unit: unit of the frequencies handed over, set by the engine
*/
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct RenderConfig {
    f_min: f64,
    f_max: f64,
    d_freq: f64,
    sf_min: f64,
    sf_max: f64,
    d_sf: f64,
    figure_type: String,
    figsize: (f64, f64),
    colormap: String,
    linewidth: f64,
    band_labels: Option<Vec<String>>,
    path_ticks: Option<Vec<f64>>,
    #[serde(skip)]
    frequency_unit: FrequencyUnit,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            f_min: -2.5,
            f_max: 10.0,
            d_freq: 2.5,
            sf_min: 0.0,
            sf_max: 2.0,
            d_sf: 0.5,
            figure_type: "pdf".to_string(),
            figsize: (5.0, 3.5),
            colormap: "red".to_string(),
            linewidth: 1.0,
            band_labels: None,
            path_ticks: None,
            frequency_unit: FrequencyUnit::THz,
        }
    }
}

impl RenderConfig {
    pub fn with_band_path(
        mut self,
        band_labels: Option<Vec<String>>,
        path_ticks: Vec<f64>,
    ) -> Self {
        if band_labels.is_some() {
            self.band_labels = band_labels;
        }
        self.path_ticks = Some(path_ticks);
        self
    }

    pub fn with_frequency_unit(mut self, frequency_unit: FrequencyUnit) -> Self {
        self.frequency_unit = frequency_unit;
        self
    }

    pub fn frequency_unit(&self) -> FrequencyUnit {
        self.frequency_unit
    }

    pub fn frequency_range(&self) -> (f64, f64) {
        (self.f_min, self.f_max)
    }

    pub fn d_freq(&self) -> f64 {
        self.d_freq
    }

    pub fn sf_range(&self) -> (f64, f64) {
        (self.sf_min, self.sf_max)
    }

    pub fn d_sf(&self) -> f64 {
        self.d_sf
    }

    pub fn figure_type(&self) -> &str {
        self.figure_type.as_ref()
    }

    pub fn figsize(&self) -> (f64, f64) {
        self.figsize
    }

    pub fn colormap(&self) -> &str {
        self.colormap.as_ref()
    }

    pub fn linewidth(&self) -> f64 {
        self.linewidth
    }

    pub fn band_labels(&self) -> Option<&[String]> {
        self.band_labels.as_deref()
    }

    pub fn path_ticks(&self) -> Option<&[f64]> {
        self.path_ticks.as_deref()
    }
}

/**
Writes fields as `distance frequency value` rows, one blank line between
q-points, and per-point curves as `frequency total c1 c2 ...` blocks. Header
comments carry the band path and the render settings for a plotting script.
*/
pub struct TableWriter<W: Write> {
    writer: W,
}

impl<W: Write> TableWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_band_path(&mut self, render: &RenderConfig) -> Result<(), SfError> {
        if let Some(ticks) = render.path_ticks() {
            let ticks: Vec<String> = ticks.iter().map(|t| format!("{:.8}", t)).collect();
            writeln!(self.writer, "# path_ticks: {}", ticks.join(" "))?;
        }
        if let Some(labels) = render.band_labels() {
            writeln!(self.writer, "# band_labels: {}", labels.join(" "))?;
        }
        Ok(())
    }

    fn write_settings(&mut self, render: &RenderConfig) -> Result<(), SfError> {
        let (f_min, f_max) = render.frequency_range();
        let (sf_min, sf_max) = render.sf_range();
        let (width, height) = render.figsize();
        writeln!(
            self.writer,
            "# frequency ({}): {} to {} by {}",
            render.frequency_unit().symbol(),
            f_min,
            f_max,
            render.d_freq()
        )?;
        writeln!(
            self.writer,
            "# sf: {} to {} by {}",
            sf_min,
            sf_max,
            render.d_sf()
        )?;
        writeln!(
            self.writer,
            "# figure: {} {}x{}, colormap {}, linewidth {}",
            render.figure_type(),
            width,
            height,
            render.colormap(),
            render.linewidth()
        )?;
        Ok(())
    }
}

impl<W: Write> CurveConsumer for TableWriter<W> {
    fn consume_field(&mut self, field: &SfField, render: &RenderConfig) -> Result<(), SfError> {
        writeln!(self.writer, "# {}", field.label())?;
        self.write_band_path(render)?;
        self.write_settings(render)?;
        for (d, row) in field.distances().iter().zip(field.values().outer_iter()) {
            for (f, v) in field.frequencies().iter().zip(row.iter()) {
                writeln!(self.writer, "{:12.8} {:12.6} {:16.8e}", d, f, v)?;
            }
            writeln!(self.writer)?;
        }
        self.writer.flush()?;
        Ok(())
    }

    fn consume_point_curves(
        &mut self,
        index: usize,
        frequencies: &Array1<f64>,
        curves: &[ReducedCurve],
        render: &RenderConfig,
    ) -> Result<(), SfError> {
        let labels: Vec<&str> = curves.iter().map(|c| c.label()).collect();
        writeln!(self.writer, "# point {}", index)?;
        writeln!(
            self.writer,
            "# frequency[{}] {}",
            render.frequency_unit().symbol(),
            labels.join(" ")
        )?;
        for (i, f) in frequencies.iter().enumerate() {
            write!(self.writer, "{:12.6}", f)?;
            for curve in curves.iter() {
                write!(self.writer, " {:16.8e}", curve.values()[i])?;
            }
            writeln!(self.writer)?;
        }
        writeln!(self.writer)?;
        Ok(())
    }
}
