//! The single-pass simulation loop.
//!
//! Per candle `t`:
//!
//! 1. Classify the regime.
//! 2. In a position: count the bar, raise the running high, then ask the
//!    strategy for an exit before falling back to the static exit plan.
//! 3. On the last candle, liquidate whatever is still open (`ForcedEnd`).
//! 4. Flat, not exited this candle, past warmup and not on the last candle:
//!    evaluate an entry sized by Kelly × signal fraction.
//! 5. Record one equity point.

use super::state::{EngineConfig, EngineState, RunResult};
use super::strategy::Strategy;
use crate::domain::{Candle, ExitReason};
use crate::strategy::{CandleContext, ExitSignal};

/// Run `strategy` over `candles`.
///
/// Deterministic and single-threaded. An empty slice yields an empty result.
pub fn run<S: Strategy + ?Sized>(
    candles: &[Candle],
    strategy: &mut S,
    config: &EngineConfig,
) -> RunResult {
    let exec = &config.execution;
    let n = candles.len();
    let mut state = EngineState::new(exec.initial_capital);

    for (t, candle) in candles.iter().enumerate() {
        let regime = strategy.classify_regime(candles, t);
        state.regimes.push(regime);
        let ctx = CandleContext::new(candles, t, regime);
        let last = t + 1 == n;
        let mut exited = false;

        // ── Exits ──
        if let Some(pos) = state.position.as_mut() {
            pos.tick_bar();
            pos.update_high(candle.close);
        }
        let exit = state.position.as_ref().and_then(|pos| {
            strategy
                .check_exit(pos, &ctx)
                .or_else(|| pos.exit_plan.check(pos, candle).map(ExitSignal::full))
        });
        if let Some(signal) = exit {
            state.close(t, candle, signal.fraction, signal.reason, regime, exec);
            exited = true;
        }

        if last {
            if state.position.is_some() {
                tracing::info!(index = t, "end of data, liquidating open position");
                state.close(t, candle, 1.0, ExitReason::ForcedEnd, regime, exec);
            }
        } else if state.position.is_none() && !exited && t >= config.warmup {
            // ── Entries ──
            if let Some((kind, signal)) = strategy.check_entry(&ctx) {
                let kelly = strategy.size_position(&state.trades, regime);
                let fraction = (kelly * signal.fraction).clamp(0.0, 1.0);
                let budget = state.cash * fraction;
                if budget < exec.min_order_amount || budget <= 0.0 {
                    tracing::info!(
                        index = t,
                        budget,
                        min_order_amount = exec.min_order_amount,
                        "entry skipped: budget below minimum order"
                    );
                    state.skipped_entries += 1;
                } else {
                    let plan = |price: f64| strategy.plan_exit(price, candle, regime);
                    state.open(t, candle, budget, regime, kind, plan, exec);
                }
            }
        }

        state.mark(candle.timestamp, candle.close);
    }

    RunResult::from_state(state, exec.initial_capital)
}
