use std::collections::HashMap;

use rainfall_forecast::{
    summarize, ForecastEngine, ForecastError, ForecastRecord, ForecastRequest, ForecastSink,
    HistoricalSource, ModelConfig, MonthlyNormals, RiskTier,
};

struct TableSource {
    rows: HashMap<(String, String), MonthlyNormals>,
}

impl TableSource {
    fn with_idukki() -> Self {
        let monthly = [
            14.0, 20.0, 44.0, 121.0, 204.0, 650.0, 821.0, 546.0, 298.0, 332.0, 181.0, 43.0,
        ];
        let annual: f64 = monthly.iter().sum();
        let mut rows = HashMap::new();
        rows.insert(
            ("Kerala".to_string(), "Idukki".to_string()),
            MonthlyNormals { monthly, annual },
        );
        TableSource { rows }
    }
}

impl HistoricalSource for TableSource {
    fn monthly_normals(&self, state: &str, district: &str) -> Option<MonthlyNormals> {
        self.rows
            .get(&(state.to_string(), district.to_string()))
            .cloned()
    }
}

#[derive(Default)]
struct MemorySink {
    records: Vec<ForecastRecord>,
    failing: bool,
}

impl ForecastSink for MemorySink {
    fn store(&mut self, record: &ForecastRecord) -> Option<String> {
        if self.failing {
            return None;
        }
        self.records.push(record.clone());
        Some(format!("fc-{}", self.records.len()))
    }
}

fn tiny_engine(sink: MemorySink) -> ForecastEngine<TableSource, MemorySink> {
    ForecastEngine::new(TableSource::with_idukki(), sink).with_model_config(ModelConfig {
        hidden_sizes: vec![6, 4],
        dense_size: 4,
        dropout_rate: 0.2,
        seed: Some(7),
    })
}

fn request(months: usize, epochs: usize) -> ForecastRequest {
    ForecastRequest {
        username: "asha".to_string(),
        state: "Kerala".to_string(),
        district: "Idukki".to_string(),
        forecast_year: 2027,
        forecast_months: months,
        epochs,
    }
}

#[test]
fn test_end_to_end_report() {
    let mut engine = tiny_engine(MemorySink::default());
    let report = engine.generate(&request(12, 2)).unwrap();

    assert_eq!(report.horizon.len(), 12);
    assert!(report.horizon.values().iter().all(|v| v.is_finite()));

    assert_eq!(report.rows.len(), 12);
    assert_eq!(report.rows[0].label, "Jan");
    assert_eq!(report.rows[11].label, "Dec");
    for (row, &mm) in report.rows.iter().zip(report.horizon.values().iter()) {
        assert_eq!(row.rainfall_mm, mm);
        let (_, _, tier_label, color, icon) = row.presentation();
        assert_eq!(tier_label, row.tier.label());
        assert!(color.starts_with('#'));
        assert!(!icon.is_empty());
    }

    assert_eq!(report.summary, summarize(&report.horizon));
    let months = report.summary.high_risk_months
        + report.summary.medium_risk_months
        + report.summary.low_risk_months;
    assert_eq!(months, 12);

    let band = &report.band;
    assert_eq!(band.lower.len(), 12);
    for ((lo, hi), &mm) in band
        .lower
        .iter()
        .zip(band.upper.iter())
        .zip(report.horizon.values().iter())
    {
        assert!((lo - mm * 0.85).abs() < 1e-9);
        assert!((hi - mm * 1.15).abs() < 1e-9);
    }

    assert_eq!(report.forecast_id.as_deref(), Some("fc-1"));
    let record = &engine.sink().records[0];
    assert_eq!(record.username, "asha");
    assert_eq!(record.forecast_year, 2027);
    assert_eq!(record.forecast_data, report.horizon.values());
    assert_eq!(record.metadata, report.summary);
}

#[test]
fn test_unknown_district() {
    let mut engine = tiny_engine(MemorySink::default());
    let mut req = request(12, 2);
    req.district = "Atlantis".to_string();

    match engine.generate(&req) {
        Err(ForecastError::UnknownDistrict { state, district }) => {
            assert_eq!(state, "Kerala");
            assert_eq!(district, "Atlantis");
        }
        other => panic!("expected unknown district, got {:?}", other.map(|r| r.forecast_id)),
    }
}

#[test]
fn test_cache_reuses_trained_pair() {
    let mut engine = tiny_engine(MemorySink::default());

    let first = engine.generate(&request(6, 2)).unwrap();
    assert_eq!(engine.cache().len(), 1);

    // Same district and epoch count: the cached model/scaler pair is reused,
    // so the projection repeats exactly.
    let second = engine.generate(&request(6, 2)).unwrap();
    assert_eq!(engine.cache().len(), 1);
    assert_eq!(first.horizon, second.horizon);

    // A different epoch count trains a distinct entry.
    engine.generate(&request(6, 3)).unwrap();
    assert_eq!(engine.cache().len(), 2);
}

#[test]
fn test_sink_failure_leaves_forecast_usable() {
    let mut engine = tiny_engine(MemorySink {
        failing: true,
        ..MemorySink::default()
    });

    let report = engine.generate(&request(12, 2)).unwrap();
    assert!(report.forecast_id.is_none());
    assert_eq!(report.horizon.len(), 12);
}

#[test]
fn test_longer_horizons_cycle_labels() {
    let mut engine = tiny_engine(MemorySink::default());
    let report = engine.generate(&request(18, 2)).unwrap();

    assert_eq!(report.horizon.len(), 18);
    assert_eq!(report.rows[12].label, "Jan");
    assert_eq!(report.rows[17].label, "Jun");
}

#[test]
fn test_daily_outlook_from_annual_normal() {
    let source = TableSource::with_idukki();
    let normals = source.monthly_normals("Kerala", "Idukki").unwrap();

    let outlook = rainfall_forecast::daily_outlook(normals.annual, 7, &mut rand::thread_rng());
    assert_eq!(outlook.len(), 7);
    let base = normals.annual / 365.0;
    assert!(outlook.iter().all(|&v| (0.0..base * 1.5).contains(&v)));
}

#[test]
fn test_risk_tiers_match_rainfall_scale() {
    let mut engine = tiny_engine(MemorySink::default());
    let report = engine.generate(&request(12, 2)).unwrap();

    for row in &report.rows {
        if row.rainfall_mm > 300.0 {
            assert_eq!(row.tier, RiskTier::VeryHigh);
        } else if row.rainfall_mm <= 160.0 {
            assert_eq!(row.tier, RiskTier::Low);
        }
    }
}
