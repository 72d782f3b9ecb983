use ndarray::{arr1, Array1, Array2, Array4, Axis};
use num_complex::Complex64;

use crate::{
    interp::interpolate,
    render::{RenderConfig, TableWriter},
    selection::SelectionCriterion,
    sf::{AggregationEngine, EngineConfig, FrequencyUnit, GridShape},
    store::{ColumnRole, DataPoint, DataPointStore, MemorySource},
};

const ELEMENTS: [&str; 3] = ["Cu", "Au", "Ag"];
const LABELS: [&str; 4] = ["A1", "B2", "B2", "E2"];

/// Point whose partial arrays all add up to its `total_sf`.
fn synthetic_point(ip: usize) -> DataPoint {
    let (nf, ne, nsub) = (5, ELEMENTS.len(), 2);
    let mut partial_sf_e = Array4::<Complex64>::zeros((nf, ne, nsub, ne));
    partial_sf_e.indexed_iter_mut().for_each(|((f, i, s, j), v)| {
        let re = 0.1 * (1 + f + ip) as f64 * (1 + i + j + s) as f64;
        let im = if i == j { 0.0 } else { 0.01 * (i as f64 - j as f64) };
        *v = Complex64::new(re, im);
    });
    let partial_sf_s = Array2::from_shape_fn((nf, LABELS.len()), |(f, slot)| {
        0.25 * (1 + slot) as f64 + 0.05 * (f + ip) as f64
    });
    let total_sf: Array1<f64> = partial_sf_e
        .map(|c| c.re)
        .sum_axis(Axis(3))
        .sum_axis(Axis(2))
        .sum_axis(Axis(1));
    // rescale the irrep slots so that they add up to the same total
    let scale = &total_sf / &partial_sf_s.sum_axis(Axis(1));
    let partial_sf_s = &partial_sf_s * &scale.insert_axis(Axis(1));
    DataPoint::new(0, ip, ip as f64, Array1::linspace(0.0, 8.0, nf))
        .with_symmetry(if ip % 2 == 0 { "mm2" } else { "4mm" }, &LABELS)
        .with_elements(&ELEMENTS)
        .with_total_sf(total_sf)
        .with_partial_sf_s(partial_sf_s)
        .with_partial_sf_e(partial_sf_e)
}

fn synthetic_store() -> DataPointStore {
    DataPointStore::from_points((0..6).map(synthetic_point).collect()).unwrap()
}

fn assert_close(a: &Array1<f64>, b: &Array1<f64>, tol: f64) {
    assert_eq!(a.len(), b.len());
    a.iter()
        .zip(b.iter())
        .for_each(|(x, y)| assert!((x - y).abs() < tol, "{} != {}", x, y));
}

#[test]
fn test_completeness_law() {
    let store = synthetic_store();
    let engine = AggregationEngine::new(&store);
    let totals = engine.aggregate(&SelectionCriterion::new()).unwrap();
    for (point, total) in store.points().iter().zip(totals.iter()) {
        assert_eq!(Some(total.values()), point.total_sf());
        let mut by_labels = Array1::<f64>::zeros(point.num_freqs());
        for label in ["A1", "B2", "E2"] {
            let criterion =
                SelectionCriterion::new().with_irreps(point.pointgroup_symbol(), &[label]);
            let curves = engine.aggregate(&criterion).unwrap();
            by_labels += curves[point.point_index()].values();
        }
        assert_close(&by_labels, total.values(), 1e-9);
    }
}

#[test]
fn test_symmetry_law() {
    let store = synthetic_store();
    let engine = AggregationEngine::new(&store);
    for (i, e1) in ELEMENTS.iter().enumerate() {
        for e2 in ELEMENTS.iter().skip(i + 1) {
            let forward = engine
                .aggregate(&SelectionCriterion::new().with_element_pair(e1, e2))
                .unwrap();
            let backward = engine
                .aggregate(&SelectionCriterion::new().with_element_pair(e2, e1))
                .unwrap();
            forward
                .iter()
                .zip(backward.iter())
                .for_each(|(f, b)| assert_close(f.values(), b.values(), 1e-12));
        }
    }
}

#[test]
fn test_partition_law() {
    let store = synthetic_store();
    let engine = AggregationEngine::new(&store);
    let mut all_pairs = SelectionCriterion::new();
    for (i, e1) in ELEMENTS.iter().enumerate() {
        for e2 in ELEMENTS.iter().skip(i) {
            all_pairs = all_pairs.with_element_pair(e1, e2);
        }
    }
    let partitioned = engine.aggregate(&all_pairs).unwrap();
    let totals = engine.aggregate(&SelectionCriterion::new()).unwrap();
    partitioned
        .iter()
        .zip(totals.iter())
        .for_each(|(p, t)| assert_close(p.values(), t.values(), 1e-6));
}

#[test]
fn test_degradation_law() {
    let store = synthetic_store();
    let engine = AggregationEngine::new(&store);
    let criterion = SelectionCriterion::new().with_irreps("m-3m", &["T1u"]);
    let field = engine.aggregate_field(&criterion, FrequencyUnit::THz).unwrap();
    assert_eq!(field.values().dim(), (6, 5));
    assert!(field.values().iter().all(|&v| v == 0.0));
    let unknown_pair = SelectionCriterion::new().with_element_pair("Cu", "Pt");
    let curves = engine.aggregate(&unknown_pair).unwrap();
    assert!(curves.iter().all(|c| c.values().iter().all(|&v| v == 0.0)));
}

#[test]
fn test_point_group_ragged_irreps() {
    let store = synthetic_store();
    let engine = AggregationEngine::new(&store);
    // only even points are mm2
    let criterion = SelectionCriterion::new().with_irreps("mm2", &["B2"]);
    let curves = engine.aggregate(&criterion).unwrap();
    let b2 = |ip: usize| {
        let s = store.get(ip).unwrap().partial_sf_s().unwrap();
        &s.column(1) + &s.column(2)
    };
    assert_close(curves[0].values(), &b2(0), 1e-12);
    assert!(curves[1].values().iter().all(|&v| v == 0.0));
    assert_close(curves[4].values(), &b2(4), 1e-12);
}

#[test]
fn test_interpolated_field_keeps_samples() {
    let store = synthetic_store();
    let engine = AggregationEngine::new(&store);
    let field = engine
        .aggregate_field(&SelectionCriterion::new(), FrequencyUnit::THz)
        .unwrap();
    let (d, f, v) = interpolate(field.distances(), field.frequencies(), field.values(), 1).unwrap();
    assert_eq!((&d, &f, &v), (field.distances(), field.frequencies(), field.values()));
    let refined = field.refine(4).unwrap();
    assert_eq!(refined.distances().len(), 5 * 4 + 1);
    assert_eq!(refined.frequencies().len(), 4 * 4 + 1);
    for i in 0..6 {
        for j in 0..5 {
            assert_eq!(refined.values()[[i * 4, j * 4]], field.values()[[i, j]]);
        }
    }
}

#[test]
fn test_scenarios_from_json_store() {
    let source = MemorySource::from_json_str(
        r#"{
            "frequencies": [0.0],
            "0/0/distance": 0.0,
            "0/0/pointgroup_symbol": "mm2",
            "0/0/ir_labels": ["A1", "B2", "B2"],
            "0/0/partial_sf_s": {"shape": [1, 3], "data": [1, 2, 3]},
            "0/1/distance": 1.0,
            "0/1/elements": ["Cu", "Au"],
            "0/1/partial_sf_e": {
                "shape": [1, 2, 1, 2],
                "re": [2, 1, 1, 3],
                "im": [0, 0, 0, 0]
            }
        }"#,
    )
    .unwrap();
    let store = DataPointStore::load(&source).unwrap();
    let mm2 = store.get(0).unwrap();
    let criterion = SelectionCriterion::new().with_irreps("mm2", &["B2"]);
    assert_eq!(
        crate::sf::sf_compute::reduce_point(mm2, &criterion).unwrap(),
        arr1(&[5.0])
    );
    let cu_au = store.get(1).unwrap();
    let pair = SelectionCriterion::new().with_element_pair("Cu", "Au");
    assert_eq!(
        crate::sf::sf_compute::reduce_point(cu_au, &pair).unwrap(),
        arr1(&[2.0])
    );
    let diagonal = SelectionCriterion::new().with_element_pair("Cu", "Cu");
    assert_eq!(
        crate::sf::sf_compute::reduce_point(cu_au, &diagonal).unwrap(),
        arr1(&[2.0])
    );
}

#[test]
fn test_engine_run_writes_table() {
    let store = synthetic_store();
    let engine = AggregationEngine::new(&store);
    let config = EngineConfig::new(
        GridShape::Band { ninterp: Some(2) },
        FrequencyUnit::MeV,
        SelectionCriterion::new().with_irreps("mm2", &["A1"]),
    );
    let mut writer = TableWriter::new(Vec::new());
    engine
        .run(&config, &RenderConfig::default(), &mut writer)
        .unwrap();
    let text = String::from_utf8(writer.into_inner()).unwrap();
    let rows = text
        .lines()
        .filter(|l| !l.starts_with('#') && !l.is_empty())
        .count();
    assert_eq!(rows, 11 * 9);
    assert!(text.lines().any(|l| l.starts_with("# frequency (meV)")));
}

#[test]
fn test_failed_refinement_skips_panel() {
    let single = DataPointStore::from_points(vec![synthetic_point(0)]).unwrap();
    let engine = AggregationEngine::new(&single);
    let config = EngineConfig::new(
        GridShape::Band { ninterp: Some(3) },
        FrequencyUnit::THz,
        SelectionCriterion::new(),
    );
    let mut writer = TableWriter::new(Vec::new());
    assert!(engine
        .run(&config, &RenderConfig::default(), &mut writer)
        .is_ok());
    assert!(writer.into_inner().is_empty());
}

#[test]
fn test_single_point_band_without_refinement() {
    let single = DataPointStore::from_points(vec![synthetic_point(0)]).unwrap();
    let engine = AggregationEngine::new(&single);
    let config = EngineConfig::new(
        GridShape::Band { ninterp: Some(1) },
        FrequencyUnit::THz,
        SelectionCriterion::new(),
    );
    let mut writer = TableWriter::new(Vec::new());
    engine
        .run(&config, &RenderConfig::default(), &mut writer)
        .unwrap();
    let text = String::from_utf8(writer.into_inner()).unwrap();
    let rows = text
        .lines()
        .filter(|l| !l.starts_with('#') && !l.is_empty())
        .count();
    assert_eq!(rows, 5);
}

#[test]
fn test_irrep_table_band_field() {
    use crate::parser::sf_table::SfTable;

    // distance frequency total A1 B2 B2
    let table = SfTable::parse(
        "# distance frequency total irreps\n\
         0.0 0.0 6.0 1.0 2.0 3.0\n\
         0.0 1.0 3.0 1.0 1.0 1.0\n\
         0.5 0.0 2.0 2.0 nan nan\n\
         0.5 1.0 4.0 4.0 nan nan\n\
         1.0 0.0 6.0 2.0 2.0 2.0\n\
         1.0 1.0 0.0 0.0 0.0 0.0\n",
    )
    .unwrap();
    let symmetry = MemorySource::from_json_str(
        r#"{
            "frequencies": [0.0, 1.0],
            "0/0/distance": 0.0,
            "0/0/pointgroup_symbol": "mm2",
            "0/0/ir_labels": ["A1", "B2", "B2"],
            "0/1/distance": 0.5,
            "0/1/pointgroup_symbol": "m-3m",
            "0/1/ir_labels": ["T1u"],
            "0/2/distance": 1.0,
            "0/2/pointgroup_symbol": "mm2",
            "0/2/ir_labels": ["A1", "B2", "B2"]
        }"#,
    )
    .unwrap();
    let store = DataPointStore::from_sf_table(&table, 1, 3, ColumnRole::IrrepSlots)
        .unwrap()
        .with_symmetry_of(&DataPointStore::load(&symmetry).unwrap())
        .unwrap();
    let engine = AggregationEngine::new(&store);
    let criterion = SelectionCriterion::new().with_irreps("mm2", &["B2"]);
    let field = engine.aggregate_field(&criterion, FrequencyUnit::THz).unwrap();
    assert_eq!(field.values().row(0).to_vec(), vec![5.0, 2.0]);
    assert_eq!(field.values().row(1).to_vec(), vec![0.0, 0.0]);
    assert_eq!(field.values().row(2).to_vec(), vec![4.0, 0.0]);
    let totals = engine
        .aggregate_field(&SelectionCriterion::new(), FrequencyUnit::THz)
        .unwrap();
    assert_eq!(totals.values().row(1).to_vec(), vec![2.0, 4.0]);
}

#[test]
fn test_legacy_table_to_atom_curves() {
    use crate::{parser::sf_table::SfTable, selection::ColumnLayout, sf::Decomposition};

    let table = SfTable::parse(
        "# distance frequency total Cu(x y z) Au(x y z)\n\
         0.0 0.0 6.0 1.0 1.0 1.0 1.0 1.0 1.0\n\
         0.0 1.0 12.0 2.0 2.0 2.0 2.0 2.0 2.0\n\
         0.5 0.0 3.0 0.5 0.5 0.5 0.5 0.5 0.5\n\
         0.5 1.0 0.0 0.0 0.0 0.0 0.0 0.0 0.0\n",
    )
    .unwrap();
    let store = DataPointStore::from_sf_table(&table, 1, 2, ColumnRole::AtomColumns).unwrap();
    let engine = AggregationEngine::new(&store);
    let symbols = vec!["Cu".to_string(), "Au".to_string()];
    let points = engine
        .point_curves(
            &Decomposition::AtomColumns {
                layout: ColumnLayout::V0PerAtomCartesian,
                symbols,
            },
            &SelectionCriterion::new(),
            FrequencyUnit::THz,
        )
        .unwrap();
    let first = points[0].curves();
    assert_eq!(first[0].label(), "Total");
    assert_eq!(first[1].values(), &arr1(&[3.0, 6.0]));
    assert_eq!(first[2].values(), &arr1(&[3.0, 6.0]));
    assert_eq!(points[1].curves()[0].values(), &arr1(&[3.0, 0.0]));
}
