//! Look-ahead contamination tests for range, bands, and signals.
//!
//! Invariant: no value at bar t may depend on price data from bar t+1 or later.
//!
//! Method: compute on a truncated series (bars 0..100) and on the full series
//! (bars 0..200), and also on the full series with bars after the cut
//! mutated. Values at indices before the cut must be identical in all runs.

use chrono::{Duration, TimeZone, Utc};
use supertrend_core::domain::{Bar, Signal};
use supertrend_core::indicators::{RangeSmoothing, Supertrend};
use supertrend_core::signals::generate_signals;

/// Generate N bars of synthetic OHLCV data with realistic variation.
fn make_test_bars(n: usize) -> Vec<Bar> {
    let base = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
    let mut bars = Vec::with_capacity(n);
    let mut price = 100.0;

    for i in 0..n {
        // Deterministic pseudo-random walk using a simple LCG
        let seed = (i as u64).wrapping_mul(6364136223846793005).wrapping_add(1);
        let change = ((seed % 200) as f64 - 100.0) * 0.05; // -5.0 to +5.0
        price += change;
        price = price.max(10.0);

        let open = price - 0.5;
        let close = price + 0.3;
        let high = open.max(close) + 2.0;
        let low = open.min(close) - 2.0;

        bars.push(Bar {
            timestamp: base + Duration::days(i as i64),
            open,
            high,
            low,
            close,
            volume: 1000.0 + i as f64 * 100.0,
            is_closed: true,
        });
    }
    bars
}

fn run(st: &Supertrend, bars: &[Bar]) -> (Vec<Option<f64>>, Vec<Option<(bool, f64, f64)>>, Vec<Signal>) {
    let out = st.compute(bars).unwrap();
    let range = out.range.values().to_vec();
    let states = out
        .bands
        .states()
        .iter()
        .map(|s| s.map(|s| (s.trend.is_up(), s.upper_band, s.lower_band)))
        .collect();
    let signals = generate_signals(&out.bands);
    (range, states, signals)
}

fn assert_no_lookahead(st: &Supertrend, full: &[Bar], cut: usize) {
    let (tr_range, tr_states, tr_signals) = run(st, &full[..cut]);
    let (f_range, f_states, f_signals) = run(st, full);

    assert_eq!(tr_range.len(), cut);
    assert_eq!(f_range.len(), full.len());
    assert_eq!(tr_range[..], f_range[..cut], "range leaked future data");
    assert_eq!(tr_states[..], f_states[..cut], "band states leaked future data");
    assert_eq!(tr_signals[..], f_signals[..cut], "signals leaked future data");
}

#[test]
fn lookahead_simple_smoothing() {
    let bars = make_test_bars(200);
    for period in [1, 5, 10, 14] {
        let st = Supertrend::new(period, 3.0, RangeSmoothing::Simple).unwrap();
        assert_no_lookahead(&st, &bars, 100);
    }
}

#[test]
fn lookahead_exponential_smoothing() {
    let bars = make_test_bars(200);
    for period in [1, 5, 10, 14] {
        let st = Supertrend::new(period, 2.0, RangeSmoothing::Exponential).unwrap();
        assert_no_lookahead(&st, &bars, 100);
    }
}

#[test]
fn mutating_future_bars_does_not_change_past() {
    let bars = make_test_bars(200);
    let st = Supertrend::new(10, 3.0, RangeSmoothing::Simple).unwrap();
    let (range, states, signals) = run(&st, &bars);

    let mut mutated = bars.clone();
    for bar in mutated.iter_mut().skip(120) {
        bar.close *= 0.5;
        bar.low *= 0.5;
        bar.open *= 0.5;
        bar.high *= 1.5;
    }
    let (m_range, m_states, m_signals) = run(&st, &mutated);

    assert_eq!(range[..120], m_range[..120]);
    assert_eq!(states[..120], m_states[..120]);
    assert_eq!(signals[..120], m_signals[..120]);
    assert_ne!(states[120..], m_states[120..]);
}
