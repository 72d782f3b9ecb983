/// User selection criteria: irreps per point group and element pairs.
use std::{collections::BTreeMap, fmt};

use toml::Value;

use crate::error::InvalidSelectionError;

pub mod index;

pub use index::{ColumnLayout, IrrepLabel};

/// An ordered pair of element symbols.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementPair {
    first: String,
    second: String,
}

impl ElementPair {
    pub fn new(first: &str, second: &str) -> Self {
        Self {
            first: first.to_string(),
            second: second.to_string(),
        }
    }

    pub fn first(&self) -> &str {
        self.first.as_ref()
    }

    pub fn second(&self) -> &str {
        self.second.as_ref()
    }

    /// Same two elements, in either order.
    pub fn same_elements(&self, other: &ElementPair) -> bool {
        (self.first == other.first && self.second == other.second)
            || (self.first == other.second && self.second == other.first)
    }
}

impl fmt::Display for ElementPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}–{}", self.first, self.second)
    }
}

/// Reduction performed by the engine, decided by which criteria are non-empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionMode {
    Total,
    ByIrrep,
    ByElementPair,
    ByIrrepAndElementPair,
}

/**
Selection criterion.
# Fields:
  * irreps: point-group symbol -> irrep labels to include
  * element_pairs: element pairs to include
When both are non-empty only contributions of a selected irrep AND a selected
element pair are counted. Repeated labels and repeated pairs count once.
*/
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionCriterion {
    irreps: BTreeMap<String, Vec<String>>,
    element_pairs: Vec<ElementPair>,
}

impl SelectionCriterion {
    /// Empty criterion: the total spectral function.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_irreps(mut self, pointgroup_symbol: &str, labels: &[&str]) -> Self {
        self.irreps
            .entry(pointgroup_symbol.to_string())
            .or_default()
            .extend(labels.iter().map(|l| l.to_string()));
        self
    }

    /// A pair already selected, in either order, is not added again.
    pub fn with_element_pair(mut self, e1: &str, e2: &str) -> Self {
        let pair = ElementPair::new(e1, e2);
        if !self.element_pairs.iter().any(|p| p.same_elements(&pair)) {
            self.element_pairs.push(pair);
        }
        self
    }

    /**
    Build a criterion from raw TOML values, checking the nesting before anything
    else happens.
    # Arguments:
      * irreps: expected `{ point_group = ["label", ...], ... }`
      * element_pairs: expected `[["e1", "e2"], ...]`
    */
    pub fn from_toml(
        irreps: Option<&Value>,
        element_pairs: Option<&Value>,
    ) -> Result<Self, InvalidSelectionError> {
        let mut criterion = Self::new();
        if let Some(value) = irreps {
            let table = value
                .as_table()
                .ok_or(InvalidSelectionError::IrrepsNotATable)?;
            for (pointgroup, labels) in table.iter() {
                let labels = labels
                    .as_array()
                    .ok_or_else(|| InvalidSelectionError::IrrepLabelsNotAList(pointgroup.clone()))?;
                let labels = labels
                    .iter()
                    .map(|l| l.as_str())
                    .collect::<Option<Vec<&str>>>()
                    .ok_or_else(|| InvalidSelectionError::IrrepLabelsNotAList(pointgroup.clone()))?;
                criterion = criterion.with_irreps(pointgroup, &labels);
            }
        }
        if let Some(value) = element_pairs {
            let pairs = value.as_array().ok_or(InvalidSelectionError::PairsNotAList)?;
            for (i, pair) in pairs.iter().enumerate() {
                let symbols = pair
                    .as_array()
                    .and_then(|p| p.iter().map(|s| s.as_str()).collect::<Option<Vec<&str>>>())
                    .ok_or(InvalidSelectionError::BadPair(i))?;
                match symbols.as_slice() {
                    [e1, e2] => criterion = criterion.with_element_pair(e1, e2),
                    _ => return Err(InvalidSelectionError::BadPair(i)),
                }
            }
        }
        criterion.validate()?;
        Ok(criterion)
    }

    /// Structural check, run by the engine before any array work.
    pub fn validate(&self) -> Result<(), InvalidSelectionError> {
        for (pointgroup, labels) in self.irreps.iter() {
            if pointgroup.trim().is_empty() {
                return Err(InvalidSelectionError::EmptyPointGroup);
            }
            if let Some(bad) = labels.iter().find(|l| IrrepLabel::parse(l).is_none()) {
                return Err(InvalidSelectionError::BadIrrepLabel {
                    point_group: pointgroup.clone(),
                    label: bad.clone(),
                });
            }
        }
        match self
            .element_pairs
            .iter()
            .position(|p| p.first().trim().is_empty() || p.second().trim().is_empty())
        {
            Some(i) => Err(InvalidSelectionError::BadPair(i)),
            None => Ok(()),
        }
    }

    pub fn mode(&self) -> SelectionMode {
        match (self.irreps.is_empty(), self.element_pairs.is_empty()) {
            (true, true) => SelectionMode::Total,
            (false, true) => SelectionMode::ByIrrep,
            (true, false) => SelectionMode::ByElementPair,
            (false, false) => SelectionMode::ByIrrepAndElementPair,
        }
    }

    /// Labels selected for a point group, `None` when it has no entry.
    pub fn irreps_for(&self, pointgroup_symbol: &str) -> Option<&[String]> {
        self.irreps.get(pointgroup_symbol).map(|l| l.as_slice())
    }

    pub fn irreps(&self) -> &BTreeMap<String, Vec<String>> {
        &self.irreps
    }

    pub fn element_pairs(&self) -> &[ElementPair] {
        self.element_pairs.as_ref()
    }

    /// Display label of the reduced curve.
    pub fn label(&self) -> String {
        let irreps = || {
            let mut labels: Vec<&str> = self
                .irreps
                .values()
                .flatten()
                .map(|l| l.as_str())
                .collect();
            labels.sort_unstable();
            labels.dedup();
            labels.join(", ")
        };
        let pairs = || {
            self.element_pairs
                .iter()
                .map(|p| p.to_string())
                .collect::<Vec<String>>()
                .join(", ")
        };
        match self.mode() {
            SelectionMode::Total => "Total".to_string(),
            SelectionMode::ByIrrep => irreps(),
            SelectionMode::ByElementPair => pairs(),
            SelectionMode::ByIrrepAndElementPair => format!("{} × {}", irreps(), pairs()),
        }
    }
}

#[cfg(test)]
mod test {
    use super::{SelectionCriterion, SelectionMode};
    use crate::error::InvalidSelectionError;

    fn selection_value(text: &str) -> toml::Value {
        toml::from_str(text).unwrap()
    }

    #[test]
    fn test_from_toml() {
        let value = selection_value(
            r#"
irreps = { mm2 = ["B2", "A1"], "4/mmm" = ["Eg"] }
element_pairs = [["Cu", "Au"], ["Cu", "Cu"]]
"#,
        );
        let criterion =
            SelectionCriterion::from_toml(value.get("irreps"), value.get("element_pairs")).unwrap();
        assert_eq!(criterion.mode(), SelectionMode::ByIrrepAndElementPair);
        assert_eq!(criterion.irreps_for("mm2").unwrap(), &["B2", "A1"]);
        assert!(criterion.irreps_for("m-3m").is_none());
        assert_eq!(criterion.element_pairs().len(), 2);
        assert_eq!(criterion.label(), "A1, B2, Eg × Cu–Au, Cu–Cu");
    }

    #[test]
    fn test_wrong_nesting() {
        let value = selection_value(r#"irreps = ["B2"]"#);
        assert_eq!(
            SelectionCriterion::from_toml(value.get("irreps"), None),
            Err(InvalidSelectionError::IrrepsNotATable)
        );
        let value = selection_value(r#"irreps = { mm2 = "B2" }"#);
        assert_eq!(
            SelectionCriterion::from_toml(value.get("irreps"), None),
            Err(InvalidSelectionError::IrrepLabelsNotAList("mm2".to_string()))
        );
        let value = selection_value(r#"element_pairs = [["Cu", "Au"], ["Cu"]]"#);
        assert_eq!(
            SelectionCriterion::from_toml(None, value.get("element_pairs")),
            Err(InvalidSelectionError::BadPair(1))
        );
        let value = selection_value(r#"element_pairs = ["Cu", "Au"]"#);
        assert_eq!(
            SelectionCriterion::from_toml(None, value.get("element_pairs")),
            Err(InvalidSelectionError::BadPair(0))
        );
    }

    #[test]
    fn test_validate_labels_and_modes() {
        let bad = SelectionCriterion::new().with_irreps("mm2", &["1A"]);
        assert!(matches!(
            bad.validate(),
            Err(InvalidSelectionError::BadIrrepLabel { .. })
        ));
        let empty_symbol = SelectionCriterion::new().with_element_pair("Cu", " ");
        assert_eq!(empty_symbol.validate(), Err(InvalidSelectionError::BadPair(0)));
        assert_eq!(SelectionCriterion::new().mode(), SelectionMode::Total);
        assert_eq!(SelectionCriterion::new().label(), "Total");
        let by_pair = SelectionCriterion::new().with_element_pair("Cu", "Au");
        assert_eq!(by_pair.mode(), SelectionMode::ByElementPair);
    }

    #[test]
    fn test_repeated_pairs_count_once() {
        let value =
            selection_value(r#"element_pairs = [["Cu", "Au"], ["Au", "Cu"], ["Cu", "Au"]]"#);
        let criterion = SelectionCriterion::from_toml(None, value.get("element_pairs")).unwrap();
        assert_eq!(criterion.element_pairs().len(), 1);
        assert_eq!(criterion.label(), "Cu–Au");
        let diagonal = SelectionCriterion::new()
            .with_element_pair("Cu", "Cu")
            .with_element_pair("Cu", "Cu");
        assert_eq!(diagonal.element_pairs().len(), 1);
    }
}
