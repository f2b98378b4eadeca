//! Look-ahead contamination tests.
//!
//! Anything computed at bar t must be reproducible from bars[..=t]. Each test
//! runs a computation on a truncated series and on the full series and checks
//! that the overlapping part agrees.

use chrono::{Duration, NaiveDate};
use zonelab_core::data::{resample, BucketLabel};
use zonelab_core::domain::Bar;
use zonelab_core::engine::HtfContext;
use zonelab_core::indicators::{Adx, Atr, Indicator};
use zonelab_core::trend::TrendAnalyzer;
use zonelab_core::zones::{DetectorParams, ZoneDetector, ZoneShape};

fn wave_bars(n: usize) -> Vec<Bar> {
    let base = NaiveDate::from_ymd_opt(2024, 2, 5)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    let mut prev = 100.0;
    (0..n)
        .map(|i| {
            let x = i as f64;
            // quiet stretches broken by sharp legs
            let leg = if i % 40 >= 30 { 2.5 * (x * 0.3).cos().signum() } else { 0.0 };
            let close = prev + 0.2 * (x * 0.7).sin() + leg;
            let bar = Bar::new(
                base + Duration::minutes(5 * i as i64),
                prev,
                prev.max(close) + 0.15,
                prev.min(close) - 0.15,
                close,
            )
            .with_volume(800.0 + (x * 1.3).sin().abs() * 400.0);
            prev = close;
            bar
        })
        .collect()
}

fn same(a: f64, b: f64) -> bool {
    (a.is_nan() && b.is_nan()) || a == b
}

#[test]
fn atr_and_adx_are_causal() {
    let bars = wave_bars(300);
    let indicators: Vec<Box<dyn Indicator>> = vec![Box::new(Atr::new(14)), Box::new(Adx::new(14))];
    for cut in [40, 150, 299] {
        for ind in &indicators {
            let full = ind.compute(&bars);
            let truncated = ind.compute(&bars[..cut]);
            for i in 0..cut {
                assert!(same(full[i], truncated[i]), "{} differs at {i} (cut {cut})", ind.name());
            }
        }
    }
}

#[test]
fn trend_series_is_causal() {
    let bars = wave_bars(300);
    let analyzer = TrendAnalyzer::default();
    let full = analyzer.analyze_series(&bars);
    for cut in [60, 200] {
        let truncated = analyzer.analyze_series(&bars[..cut]);
        assert_eq!(&full[..cut], &truncated[..]);
        assert_eq!(analyzer.analyze(&bars[..cut]), full[cut - 1]);
    }
}

#[test]
fn confirmed_zones_do_not_depend_on_later_bars() {
    let bars = wave_bars(400);
    let detector = ZoneDetector::new(
        ZoneShape::default(),
        DetectorParams {
            lookback: 20,
            ..DetectorParams::default()
        },
    )
    .unwrap();
    let full = detector.detect(&bars);
    assert!(!full.is_empty(), "series should produce zones");

    for cut in [260, 300, 399] {
        let truncated = detector.detect(&bars[..=cut]);
        for z in full.iter().filter(|z| z.available_from <= cut) {
            let twin = truncated
                .iter()
                .find(|t| t.creation_index == z.creation_index)
                .unwrap_or_else(|| panic!("zone at {} missing at cut {cut}", z.creation_index));
            assert_eq!(twin.kind, z.kind);
            assert_eq!(twin.top, z.top);
            assert_eq!(twin.bottom, z.bottom);
            assert_eq!(twin.strength, z.strength);
            assert_eq!(twin.available_from, z.available_from);
        }
    }
}

#[test]
fn end_labeled_htf_bars_are_complete_when_visible() {
    let bars = wave_bars(300);
    let htf = resample(&bars, 60, BucketLabel::End).unwrap();
    let ctx = HtfContext::new(&TrendAnalyzer::default(), &htf);

    for bar in &bars {
        if let Some(idx) = ctx.index_at(bar.timestamp) {
            // the visible hourly bar closed no later than this bar opened
            assert!(htf[idx].timestamp <= bar.timestamp);
            let last_input = htf[idx].timestamp - Duration::minutes(5);
            assert!(last_input < bar.timestamp);
        }
    }
}
