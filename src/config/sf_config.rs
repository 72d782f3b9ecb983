/// Structs for spectral-function tasks in .toml
use log::{debug, warn};
use serde::Deserialize;

use super::TaskProcess;
use crate::{
    error::SfError,
    parser::{band_conf::read_band_labels, poscar::read_poscar_symbols, sf_table::SfTable},
    render::RenderConfig,
    selection::{ColumnLayout, SelectionCriterion},
    sf::{Decomposition, EngineConfig, FrequencyUnit, GridShape},
    store::{ColumnRole, DataPointStore, MemorySource},
};

#[derive(Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DataFormat {
    /// Hierarchical `p/q/field` JSON store.
    #[default]
    Json,
    /// Whitespace table `distance frequency total [columns...]`.
    Table,
}

/**
Where the spectral data comes from.
# Field:
* data_file: String - path of the store or table
* format: DataFormat - defaults to json
* npath, nqp: Option<usize> - band paths and q-points per path, tables only
* columns: ColumnRole - what the table columns past `total` hold
* symmetry_file: Option<String> - JSON store whose point groups and irrep
  labels are given to the table points
*/
#[derive(Deserialize, Debug, Clone)]
pub struct DataSource {
    data_file: String,
    #[serde(default)]
    format: DataFormat,
    npath: Option<usize>,
    nqp: Option<usize>,
    #[serde(default)]
    columns: ColumnRole,
    symmetry_file: Option<String>,
}

impl DataSource {
    pub fn data_file(&self) -> &str {
        self.data_file.as_ref()
    }

    pub fn format(&self) -> DataFormat {
        self.format
    }

    pub fn num_paths(&self) -> Option<usize> {
        self.npath
    }

    pub fn points_per_path(&self) -> Option<usize> {
        self.nqp
    }

    pub fn columns(&self) -> ColumnRole {
        self.columns
    }

    pub fn symmetry_file(&self) -> Option<&str> {
        self.symmetry_file.as_deref()
    }

    pub fn load(&self) -> Result<DataPointStore, SfError> {
        match self.format {
            DataFormat::Json => {
                let source = MemorySource::read_json(&self.data_file)?;
                debug!("Read {} fields from {}", source.num_fields(), self.data_file);
                Ok(DataPointStore::load(&source)?)
            }
            DataFormat::Table => {
                let (npath, nqp) = self.npath.zip(self.nqp).ok_or_else(|| SfError::Text {
                    path: self.data_file.clone(),
                    reason: "`npath` and `nqp` are required for table input".to_string(),
                })?;
                let table = SfTable::read(&self.data_file)?;
                let store = DataPointStore::from_sf_table(&table, npath, nqp, self.columns)?;
                match self.symmetry_file() {
                    Some(path) => {
                        let symmetry = DataPointStore::load(&MemorySource::read_json(path)?)?;
                        debug!("Point groups of {} points from {}", symmetry.count(), path);
                        Ok(store.with_symmetry_of(&symmetry)?)
                    }
                    None => {
                        if self.columns == ColumnRole::IrrepSlots {
                            warn!(
                                "{} has irrep columns but no `symmetry_file`",
                                self.data_file
                            );
                        }
                        Ok(store)
                    }
                }
            }
        }
    }
}

/**
Raw selection as written in the config. The inner values are checked by
`SelectionCriterion::from_toml`, so wrong nesting is reported as a selection
error instead of a config parse error.
*/
#[derive(Deserialize, Debug, Clone, Default)]
pub struct SelectionConfig {
    irreps: Option<toml::Value>,
    element_pairs: Option<toml::Value>,
}

impl SelectionConfig {
    pub fn criterion(&self) -> Result<SelectionCriterion, SfError> {
        Ok(SelectionCriterion::from_toml(
            self.irreps.as_ref(),
            self.element_pairs.as_ref(),
        )?)
    }
}

/**
Configs of a band spectral-function task.
# Field:
* source: DataSource - flattened into the task table
* band_conf: Option<String> - phonopy band.conf with BAND_LABELS
* unit: FrequencyUnit - "THz" or "meV"
* ninterp: Option<usize> - grid refinement factor
* output: String - table written by the binary
* selection: Option<SelectionConfig>
*/
#[derive(Deserialize, Debug)]
pub struct BandSfTask {
    #[serde(flatten)]
    source: DataSource,
    band_conf: Option<String>,
    #[serde(default)]
    unit: FrequencyUnit,
    ninterp: Option<usize>,
    output: String,
    selection: Option<SelectionConfig>,
}

impl BandSfTask {
    pub fn band_conf(&self) -> Option<&str> {
        self.band_conf.as_deref()
    }

    pub fn ninterp(&self) -> Option<usize> {
        self.ninterp
    }
}

impl TaskProcess for BandSfTask {
    fn source(&self) -> &DataSource {
        &self.source
    }

    fn output(&self) -> &str {
        self.output.as_ref()
    }

    fn engine_config(&self) -> Result<EngineConfig, SfError> {
        Ok(EngineConfig::new(
            GridShape::Band {
                ninterp: self.ninterp,
            },
            self.unit,
            criterion_of(self.selection.as_ref())?,
        ))
    }

    fn render_config(
        &self,
        render: &RenderConfig,
        store: &DataPointStore,
    ) -> Result<RenderConfig, SfError> {
        let labels = match self.band_conf() {
            Some(path) => read_band_labels(path)?,
            None => None,
        };
        Ok(render.clone().with_band_path(labels, store.path_ticks()))
    }
}

#[derive(Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DecompositionKind {
    #[default]
    Selection,
    Irreps,
    ElementPairs,
    ElementsE2,
    Atoms,
}

/**
Configs of a per-q-point spectral-function task.
# Field:
* source: DataSource - flattened into the task table
* unit: FrequencyUnit
* output: String
* selection: Option<SelectionConfig> - used by the `selection` decomposition
* decomposition: DecompositionKind - curves drawn next to the total
* poscar: Option<String> - species of the per-atom columns, `atoms` only
* layout: Option<ColumnLayout> - per-atom column layout, v1 by default
*/
#[derive(Deserialize, Debug)]
pub struct PointsSfTask {
    #[serde(flatten)]
    source: DataSource,
    #[serde(default)]
    unit: FrequencyUnit,
    output: String,
    selection: Option<SelectionConfig>,
    #[serde(default)]
    decomposition: DecompositionKind,
    poscar: Option<String>,
    layout: Option<ColumnLayout>,
}

impl PointsSfTask {
    pub fn decomposition(&self) -> DecompositionKind {
        self.decomposition
    }

    pub fn layout(&self) -> ColumnLayout {
        self.layout.unwrap_or(ColumnLayout::V1PerAtom)
    }

    fn build_decomposition(&self) -> Result<Decomposition, SfError> {
        let decomposition = match self.decomposition {
            DecompositionKind::Selection => Decomposition::Selection,
            DecompositionKind::Irreps => Decomposition::Irreps,
            DecompositionKind::ElementPairs => Decomposition::ElementPairs,
            DecompositionKind::ElementsE2 => Decomposition::ElementsE2,
            DecompositionKind::Atoms => {
                let poscar = self.poscar.as_deref().ok_or_else(|| SfError::Text {
                    path: self.source.data_file().to_string(),
                    reason: "`poscar` is required for the atoms decomposition".to_string(),
                })?;
                Decomposition::AtomColumns {
                    layout: self.layout(),
                    symbols: read_poscar_symbols(poscar)?,
                }
            }
        };
        Ok(decomposition)
    }
}

impl TaskProcess for PointsSfTask {
    fn source(&self) -> &DataSource {
        &self.source
    }

    fn output(&self) -> &str {
        self.output.as_ref()
    }

    fn engine_config(&self) -> Result<EngineConfig, SfError> {
        Ok(EngineConfig::new(
            GridShape::Points {
                decomposition: self.build_decomposition()?,
            },
            self.unit,
            criterion_of(self.selection.as_ref())?,
        ))
    }
}

fn criterion_of(selection: Option<&SelectionConfig>) -> Result<SelectionCriterion, SfError> {
    match selection {
        Some(selection) => selection.criterion(),
        None => Ok(SelectionCriterion::new()),
    }
}
