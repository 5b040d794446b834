use std::collections::BTreeMap;
use std::path::PathBuf;

use rusty_eem::data::loader::load_dataset;
use rusty_eem::data::writer::{save_json, save_parquet};
use rusty_eem::{Eem, EemDataset, MetadataValue};

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("rusty_eem_{}_{name}", std::process::id()))
}

fn sample_dataset() -> EemDataset {
    let mut m1 = BTreeMap::new();
    m1.insert("sample".to_string(), MetadataValue::String("A".into()));
    m1.insert("dilution".to_string(), MetadataValue::Float(1.5));
    m1.insert("replicate".to_string(), MetadataValue::Integer(1));
    m1.insert("blank".to_string(), MetadataValue::Bool(false));

    let mut m2 = BTreeMap::new();
    m2.insert("sample".to_string(), MetadataValue::String("B".into()));
    m2.insert("dilution".to_string(), MetadataValue::Float(3.0));
    m2.insert("replicate".to_string(), MetadataValue::Integer(2));
    m2.insert("blank".to_string(), MetadataValue::Bool(true));

    EemDataset::from_eems(vec![
        Eem::new(
            vec![300.0, 310.0, 320.0],
            vec![250.0, 260.0],
            vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
            m1,
        )
        .unwrap(),
        Eem::new(
            vec![300.0, 310.0, 320.0],
            vec![250.0, 260.0],
            vec![0.5, 0.4, 0.3, 0.2, 0.1, 0.0],
            m2,
        )
        .unwrap(),
    ])
}

fn assert_matches_sample(loaded: &EemDataset) {
    assert_eq!(loaded.len(), 2);
    assert_eq!(
        loaded.column_names,
        vec!["blank", "dilution", "replicate", "sample"]
    );

    let first = &loaded.eems[0];
    assert_eq!(first.emission(), &[300.0, 310.0, 320.0]);
    assert_eq!(first.excitation(), &[250.0, 260.0]);
    assert_eq!(first.intensities(), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    assert_eq!(
        first.metadata.get("sample"),
        Some(&MetadataValue::String("A".into()))
    );
    assert_eq!(
        first.metadata.get("dilution"),
        Some(&MetadataValue::Float(1.5))
    );
    assert_eq!(
        first.metadata.get("replicate"),
        Some(&MetadataValue::Integer(1))
    );

    let second = &loaded.eems[1];
    assert_eq!(second.metadata.get("blank"), Some(&MetadataValue::Bool(true)));
    assert_eq!(second.value(2, 1), 0.0);
}

#[test]
fn parquet_round_trip_preserves_grids_and_metadata() {
    let path = temp_path("roundtrip.parquet");
    save_parquet(&sample_dataset(), &path).unwrap();
    let loaded = load_dataset(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_matches_sample(&loaded);
}

#[test]
fn json_round_trip_preserves_grids_and_metadata() {
    let path = temp_path("roundtrip.json");
    save_json(&sample_dataset(), &path).unwrap();
    let loaded = load_dataset(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_matches_sample(&loaded);
}

#[test]
fn parquet_widens_mixed_numeric_metadata() {
    let mut m1 = BTreeMap::new();
    m1.insert("dose".to_string(), MetadataValue::Integer(1));
    let mut m2 = BTreeMap::new();
    m2.insert("dose".to_string(), MetadataValue::Float(2.5));
    let ds = EemDataset::from_eems(vec![
        Eem::new(vec![300.0, 310.0], vec![250.0], vec![0.0; 2], m1).unwrap(),
        Eem::new(vec![300.0, 310.0], vec![250.0], vec![0.0; 2], m2).unwrap(),
    ]);

    let path = temp_path("mixed.parquet");
    save_parquet(&ds, &path).unwrap();
    let loaded = load_dataset(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(
        loaded.eems[0].metadata.get("dose"),
        Some(&MetadataValue::Float(1.0))
    );
    assert_eq!(
        loaded.eems[1].metadata.get("dose"),
        Some(&MetadataValue::Float(2.5))
    );
}

#[test]
fn json_round_trip_keeps_nan_cells() {
    let mut metadata = BTreeMap::new();
    metadata.insert("sample".to_string(), MetadataValue::String("A".into()));
    let ds = EemDataset::from_eems(vec![Eem::new(
        vec![300.0, 310.0],
        vec![250.0],
        vec![1.0, f64::NAN],
        metadata,
    )
    .unwrap()]);

    let path = temp_path("nan.json");
    save_json(&ds, &path).unwrap();
    let loaded = load_dataset(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(loaded.eems[0].value(0, 0), 1.0);
    assert!(loaded.eems[0].value(1, 0).is_nan());
}

#[test]
fn unknown_extension_is_rejected() {
    let err = load_dataset(&temp_path("dataset.xlsx")).unwrap_err();
    assert!(format!("{err}").contains("Unsupported file extension"));
}
