mod common;

use chrono::{Datelike, TimeZone, Timelike, Utc};
use proptest::prelude::*;

use aqi_predictor::data::features::{engineer, feature_names, HISTORY};
use aqi_predictor::error::FeatureError;

use common::{observation, observations};

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[test]
fn history_rows_are_consumed() {
    let obs = observations(10, false);
    let rows = engineer(&obs).unwrap();
    assert_eq!(rows.len(), 10 - HISTORY);
    assert_eq!(rows[0].timestamp, obs[HISTORY].timestamp);
    assert_eq!(rows.last().unwrap().timestamp, obs[9].timestamp);
}

#[test]
fn columns_follow_canonical_order() {
    let rows = engineer(&observations(8, false)).unwrap();
    for row in &rows {
        assert_eq!(row.features.names(), feature_names(false).as_slice());
    }

    let rows = engineer(&observations(8, true)).unwrap();
    for row in &rows {
        assert_eq!(row.features.names(), feature_names(true).as_slice());
        assert_eq!(row.features.get("temperature"), Some(28.5));
    }
}

#[test]
fn lags_rolling_windows_and_ratios() {
    let obs = observations(12, false);
    let rows = engineer(&obs).unwrap();
    // row 3 corresponds to observation 9
    let row = &rows[3];
    let current = &obs[9];
    let f = &row.features;

    assert_eq!(f.get("aqi_lag_1"), obs[8].aqi);
    assert_eq!(f.get("aqi_lag_3"), obs[6].aqi);
    assert_eq!(f.get("aqi_lag_6"), obs[3].aqi);
    assert_eq!(f.get("pm2_5_lag_1"), Some(obs[8].pollutants.pm2_5));
    assert_eq!(f.get("pm10_lag_6"), Some(obs[3].pollutants.pm10));

    // pm2_5 rises by one per hour: mean of (17, 18, 19) is 18, sample std is 1
    assert!(close(f.get("pm2_5_rolling_mean_3").unwrap(), 18.0));
    assert!(close(f.get("pm2_5_rolling_std_3").unwrap(), 1.0));
    // constant series has zero spread
    assert!(close(f.get("so2_rolling_std_3").unwrap(), 0.0));

    let p = &current.pollutants;
    assert!(close(f.get("pm_ratio").unwrap(), p.pm2_5 / (p.pm10 + 1e-5)));
    assert!(close(f.get("no2_to_o3_ratio").unwrap(), p.no2 / (p.o3 + 1e-5)));
    assert_eq!(row.aqi, current.aqi);
}

#[test]
fn time_features_for_a_weekend_afternoon() {
    // 2024-01-06 is a Saturday
    let mut obs = observations(7, false);
    let saturday = Utc.with_ymd_and_hms(2024, 1, 6, 13, 0, 0).unwrap();
    obs[6].timestamp = saturday;

    let rows = engineer(&obs).unwrap();
    let f = &rows[0].features;
    assert_eq!(f.get("hour"), Some(f64::from(saturday.hour())));
    assert_eq!(f.get("day"), Some(6.0));
    assert_eq!(f.get("month"), Some(f64::from(saturday.month())));
    assert_eq!(f.get("dayofweek"), Some(5.0));
    assert_eq!(f.get("is_weekend"), Some(1.0));
    let angle = 2.0 * std::f64::consts::PI * 13.0 / 24.0;
    assert!(close(f.get("hour_sin").unwrap(), angle.sin()));
    assert!(close(f.get("hour_cos").unwrap(), angle.cos()));
}

#[test]
fn too_little_history_is_rejected() {
    let err = engineer(&observations(HISTORY, false)).unwrap_err();
    assert_eq!(
        err,
        FeatureError::InsufficientHistory {
            needed: HISTORY + 1,
            got: HISTORY
        }
    );
}

#[test]
fn missing_lagged_aqi_is_rejected() {
    let mut obs = observations(8, false);
    obs[2].aqi = None;
    assert!(matches!(
        engineer(&obs),
        Err(FeatureError::MissingHistory { .. })
    ));
}

#[test]
fn target_may_be_absent_on_the_newest_row() {
    let mut obs = observations(8, false);
    obs[7].aqi = None;
    let rows = engineer(&obs).unwrap();
    assert_eq!(rows.last().unwrap().aqi, None);
}

#[test]
fn mixed_weather_is_rejected() {
    let mut obs = observations(8, true);
    obs[4].weather = None;
    assert!(matches!(
        engineer(&obs),
        Err(FeatureError::InconsistentWeather { .. })
    ));
}

#[test]
fn non_finite_readings_are_rejected() {
    let mut obs = observations(8, false);
    obs[5] = observation(5, f64::NAN, Some(2.0), false);
    match engineer(&obs) {
        Err(FeatureError::NonFinite { field, .. }) => assert_eq!(field, "pm2_5"),
        other => panic!("expected NonFinite, got {other:?}"),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn input_order_does_not_matter(
        n in (HISTORY + 1)..24usize,
        rotation in 0..24usize,
        pm in proptest::collection::vec(0.0..500.0f64, 24),
    ) {
        let obs: Vec<_> = (0..n)
            .map(|h| observation(h as i64, pm[h], Some(1.0 + (h % 5) as f64), false))
            .collect();
        let mut shuffled = obs.clone();
        shuffled.rotate_left(rotation % n);
        shuffled.reverse();

        let expected = engineer(&obs).unwrap();
        prop_assert_eq!(engineer(&shuffled).unwrap(), expected.clone());
        prop_assert_eq!(engineer(&obs).unwrap(), expected);
    }

    #[test]
    fn every_engineered_value_is_finite(
        pm in proptest::collection::vec(0.0..1000.0f64, HISTORY + 1..20),
    ) {
        let obs: Vec<_> = pm
            .iter()
            .enumerate()
            .map(|(h, v)| observation(h as i64, *v, Some(3.0), true))
            .collect();
        for row in engineer(&obs).unwrap() {
            prop_assert!(row.features.values().iter().all(|v| v.is_finite()));
        }
    }
}
