//! Supertrend direction flip detection.
//!
//! - Buy: trend Down at i-1, Up at i
//! - Sell: trend Up at i-1, Down at i
//!
//! Bar 0, warm-up bars, and the seed bar never emit: there is no meaningful
//! previous state to compare against.

use crate::domain::{Bar, Signal, Trend};
use crate::indicators::BandSeries;

/// One signal per bar, aligned with the band series.
pub fn generate_signals(bands: &BandSeries) -> Vec<Signal> {
    let states = bands.states();
    let mut signals = vec![Signal::None; states.len()];
    let first = match bands.seed_index() {
        Some(seed) => seed + 1,
        None => return signals,
    };

    for i in first..states.len() {
        signals[i] = match (states[i - 1], states[i]) {
            (Some(prev), Some(cur)) => match (prev.trend, cur.trend) {
                (Trend::Down, Trend::Up) => Signal::Buy,
                (Trend::Up, Trend::Down) => Signal::Sell,
                _ => Signal::None,
            },
            _ => Signal::None,
        };
    }
    signals
}

/// The signal on the most recent finalized bar.
///
/// A trailing bar that is still forming is skipped; its close is not final,
/// so a flip computed from it may disappear by the end of the period.
pub fn latest_actionable(bars: &[Bar], signals: &[Signal]) -> Option<(usize, Signal)> {
    let n = bars.len().min(signals.len());
    let last_closed = (0..n).rev().find(|&i| bars[i].is_closed)?;
    Some((last_closed, signals[last_closed]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{make_bars, make_ohlc_bars, RangeSmoothing, Supertrend};

    fn signals_for(data: &[(f64, f64, f64, f64)], period: usize, multiplier: f64) -> Vec<Signal> {
        let bars = make_ohlc_bars(data);
        let out = Supertrend::new(period, multiplier, RangeSmoothing::Simple)
            .unwrap()
            .compute(&bars)
            .unwrap();
        generate_signals(&out.bands)
    }

    #[test]
    fn first_bar_never_signals() {
        let sigs = signals_for(&[(100.0, 101.0, 99.0, 100.0), (90.0, 91.0, 89.0, 90.0)], 1, 1.0);
        assert_eq!(sigs[0], Signal::None);
    }

    #[test]
    fn sell_then_buy_on_reversal() {
        // high = close + 1, low = close - 1, period 1, multiplier 1
        let closes = [100.0, 102.0, 101.0, 105.0, 98.0, 90.0, 85.0, 95.0, 110.0];
        let data: Vec<_> = closes.iter().map(|&c| (c, c + 1.0, c - 1.0, c)).collect();
        let sigs = signals_for(&data, 1, 1.0);
        assert_eq!(sigs[4], Signal::Sell);
        let first_buy = sigs.iter().position(|s| *s == Signal::Buy).unwrap();
        assert!(first_buy > 4);
        // At most one transition signal per bar and they alternate.
        let flips: Vec<Signal> = sigs.iter().copied().filter(|s| !s.is_none()).collect();
        for pair in flips.windows(2) {
            assert_ne!(pair[0], pair[1]);
        }
    }

    #[test]
    fn empty_bands_yield_no_signals() {
        let bars = make_bars(&[100.0, 101.0]);
        let out = Supertrend::new(5, 3.0, RangeSmoothing::Simple)
            .unwrap()
            .compute(&bars)
            .unwrap();
        assert_eq!(generate_signals(&out.bands), vec![Signal::None; 2]);
    }

    #[test]
    fn latest_actionable_skips_forming_bar() {
        let mut bars = make_bars(&[100.0, 101.0, 102.0]);
        bars[2].is_closed = false;
        let signals = vec![Signal::None, Signal::Buy, Signal::Sell];
        assert_eq!(latest_actionable(&bars, &signals), Some((1, Signal::Buy)));
    }

    #[test]
    fn latest_actionable_uses_last_closed_bar() {
        let bars = make_bars(&[100.0, 101.0, 102.0]);
        let signals = vec![Signal::None, Signal::Buy, Signal::Sell];
        assert_eq!(latest_actionable(&bars, &signals), Some((2, Signal::Sell)));
        assert_eq!(latest_actionable(&[], &[]), None);
    }
}
