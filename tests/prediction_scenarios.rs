// Prediction Scenarios
//
// Purpose: End-to-end checks against the shipped reference data in data/
// Run with: cargo test --test prediction_scenarios

use approx::assert_relative_eq;
use chrono::NaiveDate;
use mini_agronomist::agronomy::{field_report, FieldConditions};
use mini_agronomist::prediction::{RangeFit, RiskBand, YieldQuery};
use mini_agronomist::{HistoryStore, PredictionForm, ReferenceData, YieldPredictor};
use std::path::PathBuf;
use std::sync::Arc;

fn data_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data")
}

fn predictor() -> YieldPredictor {
    let reference = ReferenceData::load(&data_dir()).expect("shipped reference data loads");
    YieldPredictor::new(Arc::new(reference))
}

#[test]
fn test_shipped_data_has_no_warnings() {
    let reference = ReferenceData::load(&data_dir()).unwrap();
    assert!(reference.warnings().is_empty(), "{:?}", reference.warnings());
    assert!(reference.rules().len() > 10);
    assert!(reference.crop_profile("Maize").is_some());
    assert!(reference.region_profile("sahel").is_some());
}

#[test]
fn test_maize_loam_within_window() {
    let p = predictor().predict("loam", "maize", 75.0).unwrap();
    assert_eq!(p.region, "east_africa");
    assert_relative_eq!(p.yield_estimate, 3.5);
    assert_relative_eq!(p.risk_level, 0.2);
    assert_eq!(p.risk_band, RiskBand::Good);
}

#[test]
fn test_maize_loam_too_dry() {
    let p = predictor().predict("loam", "maize", 40.0).unwrap();
    assert_relative_eq!(p.yield_estimate, 3.0);
    assert_relative_eq!(p.risk_level, 0.7);
    assert_eq!(p.rain_fit, RangeFit::Below);
    assert_eq!(p.risk_band, RiskBand::Poor);
}

#[test]
fn test_maize_loam_too_wet() {
    let p = predictor().predict("loam", "maize", 120.0).unwrap();
    assert_relative_eq!(p.yield_estimate, 3.7, epsilon = 1e-9);
    assert_relative_eq!(p.risk_level, 0.5);
    assert_eq!(p.risk_band, RiskBand::Moderate);
}

#[test]
fn test_window_edges_are_inclusive() {
    let predictor = predictor();
    for rainfall in [60.0, 90.0] {
        let p = predictor.predict("loam", "maize", rainfall).unwrap();
        assert_relative_eq!(p.risk_level, 0.2);
    }
}

#[test]
fn test_missing_rule_is_none() {
    assert!(predictor().predict("sand", "wheat", 30.0).is_none());
    assert!(predictor().predict_in(Some("sahel"), "loam", "maize", 75.0).is_none());
}

#[test]
fn test_region_selects_rule() {
    let p = predictor()
        .predict_in(Some("South_Asia"), "LOAM", "Maize", 75.0)
        .unwrap();
    assert_eq!(p.region, "south_asia");
    assert_relative_eq!(p.yield_estimate, 4.25);
}

#[test]
fn test_batch_keeps_order() {
    let queries = vec![
        YieldQuery { region: None, crop: "maize".into(), soil: "loam".into(), rainfall: 75.0 },
        YieldQuery { region: None, crop: "wheat".into(), soil: "sand".into(), rainfall: 30.0 },
        YieldQuery { region: Some("sahel".into()), crop: "millet".into(), soil: "sand".into(), rainfall: 10.0 },
    ];
    let results = predictor().predict_batch(&queries);
    assert!(results[0].is_some());
    assert!(results[1].is_none());
    assert_relative_eq!(results[2].as_ref().unwrap().yield_estimate, 0.6);
}

#[test]
fn test_form_to_history_flow() {
    let today = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
    let form = PredictionForm {
        region: None,
        soil: Some("loam".into()),
        crop: Some("maize".into()),
        rainfall: Some(600.0),
        planting_date: Some("2025-03-15".into()),
    };
    let validation = form.validate(today);
    assert!(!validation.is_blocked());
    assert_eq!(validation.warnings().count(), 1);

    let input = validation.input.unwrap();
    let prediction = predictor()
        .predict_in(input.region.as_deref(), &input.soil, &input.crop, input.rainfall)
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let mut store = HistoryStore::open(dir.path(), 5 * 1024 * 1024).unwrap();
    let saved = store.record_prediction(&prediction, Some(input.planting_date));
    assert!(saved.is_saved());
    let record = saved.record;
    assert_eq!(record.planting_date, Some(input.planting_date));
    assert_relative_eq!(record.yield_estimate, 3.7, epsilon = 1e-9);
}

#[test]
fn test_comprehensive_report_from_shipped_data() {
    let conditions = FieldConditions {
        crop: "sorghum".into(),
        region: "sahel".into(),
        soil_type: "sand".into(),
        temperature_min: 24.0,
        temperature_max: 38.0,
        rainfall: 35.0,
        soil_ph: 6.5,
        planting_date: NaiveDate::from_ymd_opt(2025, 7, 1),
    };
    let report = field_report(&predictor(), &conditions).unwrap();

    assert_relative_eq!(report.gdd, 21.0);
    assert_relative_eq!(report.estimated_et, 31.0 * 0.15, epsilon = 1e-9);
    let prediction = report.prediction.unwrap();
    assert_relative_eq!(prediction.yield_estimate, 1.15, epsilon = 1e-9);
    assert!(report.crop_fit.unwrap().soil_ph.is_within());
    assert!(report.region_climate.unwrap().tier.is_water_limited());
}
