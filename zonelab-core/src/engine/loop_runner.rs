//! Bar-by-bar simulation loop.
//!
//! Per simulated bar, strictly in order:
//! 1. Reset the daily entry counter on a date change
//! 2. Resolve higher-timeframe trend context (skip the bar if not ready)
//! 3. Update open trades: stop-loss, then far target, then near target
//! 4. If under the daily and concurrent limits, open at most one retest trade
//! 5. Append the equity point (realized + unrealized)
//! 6. Track peak equity and drawdown
//!
//! Trades still open after the last bar are closed at its close.

use crate::data::validate_series;
use crate::domain::{Bar, Trade};
use crate::error::SimulationError;
use crate::indicators::{value_at, Atr, Indicator};
use crate::time_filter::PeriodicClassifier;
use crate::trend::TrendAnalyzer;
use crate::zones::ZoneDetector;

use super::config::BacktestConfig;
use super::entry::{find_retest, trade_setup};
use super::htf::HtfContext;
use super::state::{EngineState, RunResult};

/// Run one simulation over lower-timeframe `bars` with trend context from
/// `htf_bars`.
///
/// An empty `bars` series is a valid run with no trades. A malformed or
/// non-increasing series is a `DataError`; invalid settings are a
/// `ParameterError`.
pub fn run_backtest(
    bars: &[Bar],
    htf_bars: &[Bar],
    config: &BacktestConfig,
) -> Result<RunResult, SimulationError> {
    config.validate()?;
    let detector = ZoneDetector::new(config.zone_shape(), config.detector)?;
    let analyzer = TrendAnalyzer::new(config.trend)?;
    let classifier = PeriodicClassifier::new(config.time_windows)?;

    if bars.is_empty() {
        return Ok(RunResult {
            starting_capital: config.initial_capital,
            ending_capital: config.initial_capital,
            ..RunResult::default()
        });
    }
    validate_series(bars)?;
    if !htf_bars.is_empty() {
        validate_series(htf_bars)?;
    }

    // ─── Precompute ───
    let zones = detector.detect(bars);
    let candidates: Vec<usize> = zones
        .iter()
        .enumerate()
        .filter(|(_, z)| !config.enable_time_filter || classifier.in_window(z.created_at))
        .map(|(i, _)| i)
        .collect();
    let atr = Atr::new(config.detector.atr_period).compute(bars);
    let htf = HtfContext::new(&analyzer, htf_bars);
    let policy = config.exit_policy();

    tracing::debug!(
        zones = zones.len(),
        eligible = candidates.len(),
        htf_bars = htf.len(),
        "simulation starting"
    );

    let mut state = EngineState::new(config.initial_capital);
    let mut equity_curve = Vec::with_capacity(bars.len().saturating_sub(config.warmup_bars));

    for (i, bar) in bars.iter().enumerate().skip(config.warmup_bars) {
        // ─── 1. Day roll ───
        state.roll_date(bar.date());

        // ─── 2. Trend context ───
        let Some(trend) = htf.resolve(bar.timestamp, config.min_htf_history) else {
            continue;
        };

        // ─── 3. Exits ───
        state.update_open_trades(bar, i, &policy);

        // ─── 4. Entries ───
        if state.trades_today < config.max_trades_per_day
            && state.open_trades.len() < config.max_open_trades
        {
            if let Some(atr_value) = value_at(&atr, i) {
                if let Some((zone, direction)) =
                    find_retest(&zones, &candidates, bar, i, &trend, config)
                {
                    let setup = trade_setup(zone, direction, atr_value, config);
                    let id = state.next_trade_id();
                    let mut trade =
                        Trade::open(id, zone.id, setup, bar.timestamp, i, config.risk_fraction);
                    trade.formed_in_window = classifier.in_window(zone.created_at);
                    trade.htf_trend = Some(trend);
                    state.open_trade(trade);
                }
            }
        }

        // ─── 5-6. Equity and drawdown ───
        equity_curve.push(state.mark(bar));
    }

    // ─── End of data ───
    let last_index = bars.len() - 1;
    if !state.open_trades.is_empty() {
        tracing::debug!(open = state.open_trades.len(), "closing trades at end of data");
        state.close_all(&bars[last_index], last_index);
    }

    Ok(RunResult {
        eligible_zones: candidates.len(),
        zones,
        bars: bars.len(),
        bars_processed: equity_curve.len(),
        equity_curve,
        first_timestamp: Some(bars[0].timestamp),
        last_timestamp: Some(bars[last_index].timestamp),
        starting_capital: config.initial_capital,
        ending_capital: state.capital,
        max_drawdown_pct: state.max_drawdown_pct,
        trades: state.closed_trades,
    })
}
