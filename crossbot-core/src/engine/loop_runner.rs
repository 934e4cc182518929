//! Bar-by-bar event loop.
//!
//! Per bar:
//! 1. Validate: complete indicator fields, strictly increasing timestamp
//! 2. Mark-to-market: append an equity point
//! 3. Exit check when long: stop-loss, then take-profit, then strategy exit
//! 4. Entry check when flat: strategy entry, lot rounding, affordability
//!
//! Bar 0 has no predecessor for the crossover test and only records equity.

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};

use super::error::EngineError;
use super::state::{EngineConfig, RunResult, SignalCounts};
use crate::domain::{
    Account, AccountState, EnrichedBar, EquityPoint, ExitReason, Position, TradeEvent,
    TradeRecord, TradeSide,
};
use crate::strategy::sizing::entry_outlay;
use crate::strategy::{SignalAction, Strategy};

/// Single-instrument, long-only backtest engine.
///
/// The engine owns its account for the duration of a run. Every call to
/// [`BacktestEngine::run`] starts from a fresh account funded with the
/// configured initial balance, so one engine can be reused across datasets.
#[derive(Debug, Clone)]
pub struct BacktestEngine {
    config: EngineConfig,
    account: Account,
}

/// Mutable per-run bookkeeping, kept apart from the account so the loop body
/// reads as state transitions on `account`.
#[derive(Debug, Default)]
struct RunLog {
    equity_curve: Vec<EquityPoint>,
    trades: Vec<TradeRecord>,
    events: Vec<TradeEvent>,
    signals: SignalCounts,
}

impl BacktestEngine {
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self {
            account: Account::new(config.initial_balance),
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Account as left by the most recent run.
    pub fn account(&self) -> &Account {
        &self.account
    }

    pub fn run(
        &mut self,
        bars: &[EnrichedBar],
        strategy: &dyn Strategy,
    ) -> Result<RunResult, EngineError> {
        self.run_with_cancel(bars, strategy, None)
    }

    /// Run the loop, checking `cancel` once per bar.
    pub fn run_with_cancel(
        &mut self,
        bars: &[EnrichedBar],
        strategy: &dyn Strategy,
        cancel: Option<&AtomicBool>,
    ) -> Result<RunResult, EngineError> {
        self.account = Account::new(self.config.initial_balance);
        let mut log = RunLog {
            equity_curve: Vec::with_capacity(bars.len()),
            ..RunLog::default()
        };

        tracing::debug!(
            strategy = strategy.name(),
            bars = bars.len(),
            initial_balance = self.config.initial_balance,
            fee_rate = self.config.fee_rate,
            "starting run"
        );

        for (i, bar) in bars.iter().enumerate() {
            if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
                tracing::info!(bar_index = i, "run cancelled");
                return Err(EngineError::Cancelled { bar_index: i });
            }

            validate_bar(bars, i)?;

            let price = bar.close();
            log.equity_curve.push(EquityPoint {
                timestamp: bar.timestamp(),
                equity: self.account.equity(price),
            });

            if i == 0 {
                continue;
            }
            let previous = &bars[i - 1];

            if self.account.is_long() {
                self.check_exit(bar, previous, strategy, &mut log);
            } else {
                self.check_entry(bar, previous, strategy, &mut log);
            }
        }

        if self.config.liquidate_at_end {
            if let Some(last) = bars.last() {
                if self.account.is_long() {
                    self.close_position(
                        last.timestamp(),
                        last.close(),
                        ExitReason::EndOfData,
                        &mut log,
                    );
                    if let Some(point) = log.equity_curve.last_mut() {
                        point.equity = self.account.cash;
                    }
                }
            }
        }

        let final_equity = log
            .equity_curve
            .last()
            .map_or(self.config.initial_balance, |p| p.equity);

        let result = RunResult {
            equity_curve: log.equity_curve,
            trades: log.trades,
            events: log.events,
            initial_balance: self.config.initial_balance,
            final_cash: self.account.cash,
            final_equity,
            open_position: self.account.position().cloned(),
            bars_processed: bars.len(),
            signals: log.signals,
        };

        tracing::info!(
            strategy = strategy.name(),
            bars = result.bars_processed,
            trades = result.trades.len(),
            rejected_entries = result.signals.rejected_entries,
            final_cash = result.final_cash,
            final_equity = result.final_equity,
            "run complete"
        );

        Ok(result)
    }

    fn check_exit(
        &mut self,
        bar: &EnrichedBar,
        previous: &EnrichedBar,
        strategy: &dyn Strategy,
        log: &mut RunLog,
    ) {
        let price = bar.close();
        let Some(pos) = self.account.position() else {
            return;
        };

        let reason = if price <= pos.stop_loss {
            log.signals.hard_exits += 1;
            Some(ExitReason::StopLoss)
        } else if price >= pos.take_profit {
            log.signals.hard_exits += 1;
            Some(ExitReason::TakeProfit)
        } else {
            let signal = strategy.signal(bar, previous, self.account.cash, self.config.fee_rate);
            match signal.action {
                SignalAction::Exit => {
                    log.signals.exit += 1;
                    Some(ExitReason::Signal(signal.reason.into_owned()))
                }
                SignalAction::Enter => {
                    log.signals.enter += 1;
                    None
                }
                SignalAction::Hold => None,
            }
        };

        if let Some(reason) = reason {
            self.close_position(bar.timestamp(), price, reason, log);
        }
    }

    fn check_entry(
        &mut self,
        bar: &EnrichedBar,
        previous: &EnrichedBar,
        strategy: &dyn Strategy,
        log: &mut RunLog,
    ) {
        let signal = strategy.signal(bar, previous, self.account.cash, self.config.fee_rate);
        match signal.action {
            SignalAction::Enter => log.signals.enter += 1,
            SignalAction::Exit => {
                log.signals.exit += 1;
                return;
            }
            SignalAction::Hold => return,
        }

        let price = bar.close();
        let size = self.config.round_size(signal.size);
        let outlay = entry_outlay(size, price, self.config.fee_rate);
        if size.is_nan() || size <= 0.0 || self.account.cash < outlay {
            log.signals.rejected_entries += 1;
            tracing::debug!(
                timestamp = %bar.timestamp(),
                proposed = signal.size,
                size,
                outlay,
                cash = self.account.cash,
                "entry rejected"
            );
            return;
        }

        self.account.cash -= outlay;
        self.account.state = AccountState::Long(Position {
            entry_time: bar.timestamp(),
            entry_price: price,
            stop_loss: signal.stop_loss,
            take_profit: signal.take_profit,
            size,
        });
        log.events.push(TradeEvent {
            timestamp: bar.timestamp(),
            price,
            side: TradeSide::Buy,
            reason: signal.reason.to_string(),
        });
        tracing::debug!(
            timestamp = %bar.timestamp(),
            price,
            size,
            stop_loss = signal.stop_loss,
            take_profit = signal.take_profit,
            cash = self.account.cash,
            "entered long"
        );
    }

    fn close_position(
        &mut self,
        timestamp: DateTime<Utc>,
        price: f64,
        reason: ExitReason,
        log: &mut RunLog,
    ) {
        let Some(pos) = self.account.take_position() else {
            return;
        };

        let fee_rate = self.config.fee_rate;
        let revenue = pos.size * price;
        let fee = revenue * fee_rate;
        let proceeds = revenue - fee;
        self.account.cash += proceeds;
        let pnl = proceeds - pos.entry_price * pos.size * (1.0 + fee_rate);

        log.events.push(TradeEvent {
            timestamp,
            price,
            side: TradeSide::Sell,
            reason: reason.to_string(),
        });
        tracing::debug!(
            timestamp = %timestamp,
            price,
            size = pos.size,
            pnl,
            reason = %reason,
            cash = self.account.cash,
            "exited long"
        );
        log.trades.push(TradeRecord {
            entry_time: pos.entry_time,
            exit_time: timestamp,
            entry_price: pos.entry_price,
            exit_price: price,
            size: pos.size,
            pnl,
            exit_reason: reason,
        });
    }
}

fn validate_bar(bars: &[EnrichedBar], i: usize) -> Result<(), EngineError> {
    let bar = &bars[i];
    if !bar.is_complete() {
        return Err(EngineError::IncompleteBar { bar_index: i });
    }
    if i > 0 && bar.timestamp() <= bars[i - 1].timestamp() {
        return Err(EngineError::NonMonotonic {
            bar_index: i,
            timestamp: bar.timestamp().to_rfc3339(),
        });
    }
    Ok(())
}
