/**
Define and control Structs for deserialization of the config.toml
*/
use std::{fs, path::Path};

use log::info;
use serde::Deserialize;

use crate::{
    error::SfError,
    render::{CurveConsumer, RenderConfig},
    sf::{AggregationEngine, EngineConfig},
    store::DataPointStore,
};

use self::sf_config::{BandSfTask, DataSource, PointsSfTask};
pub mod sf_config;

/**
Config file struct for deserialization
# Field:
* title: String,
* tasks: Task - Struct of Task
* render: RenderConfig - presentation settings handed to consumers
*/
#[derive(Deserialize, Debug)]
pub struct Config {
    title: String,
    tasks: Task,
    #[serde(default)]
    render: RenderConfig,
}

impl Config {
    pub fn read<P: AsRef<Path>>(config_path: P) -> Result<Self, SfError> {
        let path = config_path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| SfError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(toml::from_str(&text)?)
    }

    pub fn title(&self) -> &str {
        self.title.as_ref()
    }

    pub fn tasks(&self) -> &Task {
        &self.tasks
    }

    pub fn render(&self) -> &RenderConfig {
        &self.render
    }
}

/**
Task of run.
# Field:
* band_sf: Option<BandSfTask> - spectral-function field along the band path
* points_sf: Option<PointsSfTask> - curve families at every q-point
*/
#[derive(Deserialize, Debug)]
pub struct Task {
    band_sf: Option<BandSfTask>,
    points_sf: Option<PointsSfTask>,
}

impl Task {
    pub fn band_sf(&self) -> Option<&BandSfTask> {
        self.band_sf.as_ref()
    }

    pub fn points_sf(&self) -> Option<&PointsSfTask> {
        self.points_sf.as_ref()
    }
}

/// A configured engine run over one data source.
pub trait TaskProcess {
    fn source(&self) -> &DataSource;
    fn output(&self) -> &str;
    fn engine_config(&self) -> Result<EngineConfig, SfError>;

    /// Presentation settings for this task, derived from the global ones.
    fn render_config(
        &self,
        render: &RenderConfig,
        _store: &DataPointStore,
    ) -> Result<RenderConfig, SfError> {
        Ok(render.clone())
    }

    fn task_execute<C: CurveConsumer>(
        &self,
        render: &RenderConfig,
        consumer: &mut C,
    ) -> Result<(), SfError> {
        let engine_config = self.engine_config()?;
        let store = self.source().load()?;
        let render = self.render_config(render, &store)?;
        info!(
            "Running {:?} selection on `{}`",
            engine_config.mode(),
            self.source().data_file()
        );
        AggregationEngine::new(&store).run(&engine_config, &render, consumer)
    }
}

#[cfg(test)]
#[test]
fn test_toml() {
    use crate::{
        selection::{ColumnLayout, SelectionMode},
        sf::{FrequencyUnit, GridShape},
    };

    let config: Config = toml::from_str(
        r#"title = "phsf-rust config"

[tasks]
[tasks.band_sf]
data_file = "./band.json"
band_conf = "./band.conf"
unit = "meV"
ninterp = 4
output = "band_sf.dat"
[tasks.band_sf.selection]
irreps = { mm2 = ["B2", "A1"] }
element_pairs = [["Cu", "Au"]]

[tasks.points_sf]
data_file = "./sf_atoms.dat"
format = "table"
npath = 1
nqp = 11
output = "points_sf.dat"
decomposition = "atoms"
poscar = "./POSCAR"
layout = "v0-per-atom-cartesian"

[render]
f_max = 8.0
"#,
    )
    .unwrap();
    assert_eq!(config.title(), "phsf-rust config");
    assert_eq!(config.render().frequency_range(), (-2.5, 8.0));
    let band = config.tasks().band_sf().unwrap();
    let engine_config = band.engine_config().unwrap();
    assert_eq!(engine_config.unit(), FrequencyUnit::MeV);
    assert_eq!(engine_config.mode(), SelectionMode::ByIrrepAndElementPair);
    assert_eq!(engine_config.grid(), &GridShape::Band { ninterp: Some(4) });
    let points = config.tasks().points_sf().unwrap();
    assert_eq!(points.layout(), ColumnLayout::V0PerAtomCartesian);
    assert_eq!(points.source().points_per_path(), Some(11));
}
