use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

use super::position::{
    close_pnl, settlement_exit_price, settlement_pnl, Position, PositionSpec, PositionStatus,
    PositionWithPnl,
};
use crate::error::OptionScanError;
use crate::types::Money;
use crate::OptionScanResult;

// ---------------------------------------------------------------------------
// Collaborator interface
// ---------------------------------------------------------------------------

/// Settlement price lookup, supplied by the market-data collaborator. A
/// failure here surfaces as `UpstreamUnavailable` for the one position being
/// settled; it never aborts a sweep.
pub trait ClosingPriceSource {
    /// Closing price of the underlying on (or on the first session after)
    /// the given date.
    fn closing_price(&self, symbol: &str, on_or_after: NaiveDate) -> OptionScanResult<Money>;
}

// ---------------------------------------------------------------------------
// Sweep / summary records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpiredPosition {
    pub id: String,
    pub strategy_name: String,
    pub expiration: NaiveDate,
    pub closing_price: Money,
    pub exit_price: Money,
    pub realized_pnl: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepFailure {
    pub id: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpirationSweep {
    pub expired_count: usize,
    pub expired: Vec<ExpiredPosition>,
    /// Positions whose settlement failed this sweep; they stay open and are
    /// retried by the next sweep.
    pub failures: Vec<SweepFailure>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioSummary {
    pub total_positions: usize,
    pub open_positions: usize,
    pub closed_positions: usize,
    pub expired_positions: usize,
    pub total_unrealized_pnl: Money,
    pub total_realized_pnl: Money,
    pub positions: Vec<PositionWithPnl>,
}

/// Filter for [`PositionLedger::list`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PositionFilter {
    pub symbol: Option<String>,
    pub status: Option<PositionStatus>,
}

// ---------------------------------------------------------------------------
// The ledger
// ---------------------------------------------------------------------------

/// Owns the mutable position collection. Constructed explicitly and passed
/// to whatever needs it; there is no global instance.
///
/// Mutations are serialized through the positions lock, and every terminal
/// transition re-checks `status == open` inside the write critical section,
/// so a losing concurrent writer observes `AlreadyClosed` instead of
/// overwriting a settled position.
#[derive(Debug, Default)]
pub struct PositionLedger {
    positions: RwLock<HashMap<String, Position>>,
    /// Held for the duration of an expiration sweep so sweeps never overlap.
    sweep_guard: Mutex<()>,
}

impl PositionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Position>> {
        self.positions.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Position>> {
        self.positions.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Open a new position from a caller-supplied spec. The core validates
    /// shape only; semantic consistency of the legs is the caller's concern.
    pub fn create(&self, spec: PositionSpec) -> OptionScanResult<Position> {
        validate_spec(&spec)?;

        let position = Position {
            id: Uuid::new_v4().to_string(),
            symbol: spec.symbol,
            strategy_type: spec.strategy_type,
            strategy_name: spec.strategy_name,
            expiration: spec.expiration,
            legs: spec.legs,
            entry_price: spec.entry_price,
            quantity: spec.quantity,
            notes: spec.notes,
            status: PositionStatus::Open,
            opened_at: Utc::now(),
            closed_at: None,
            exit_price: None,
            realized_pnl: None,
        };

        self.write().insert(position.id.clone(), position.clone());
        Ok(position)
    }

    pub fn get(&self, id: &str) -> OptionScanResult<Position> {
        self.read()
            .get(id)
            .cloned()
            .ok_or_else(|| OptionScanError::NotFound { id: id.to_string() })
    }

    /// All positions matching the filter, oldest first, open ones annotated
    /// with the unrealized-P&L placeholder.
    pub fn list(&self, filter: &PositionFilter) -> Vec<PositionWithPnl> {
        let guard = self.read();
        let mut positions: Vec<Position> = guard
            .values()
            .filter(|p| {
                filter.symbol.as_ref().map_or(true, |s| &p.symbol == s)
                    && filter.status.map_or(true, |s| p.status == s)
            })
            .cloned()
            .collect();
        drop(guard);

        positions.sort_by(|a, b| a.opened_at.cmp(&b.opened_at).then(a.id.cmp(&b.id)));
        positions.into_iter().map(PositionWithPnl::from).collect()
    }

    /// Manually close an open position at the given per-contract exit price.
    pub fn close(&self, id: &str, exit_price: Money) -> OptionScanResult<Position> {
        let mut guard = self.write();
        let position = guard
            .get_mut(id)
            .ok_or_else(|| OptionScanError::NotFound { id: id.to_string() })?;

        if position.status != PositionStatus::Open {
            return Err(OptionScanError::AlreadyClosed {
                id: id.to_string(),
                status: position.status.as_str().to_string(),
            });
        }

        let realized = close_pnl(
            position.strategy_type,
            position.entry_price,
            exit_price,
            position.quantity,
        );

        position.status = PositionStatus::Closed;
        position.closed_at = Some(Utc::now());
        position.exit_price = Some(exit_price);
        position.realized_pnl = Some(realized.round_dp(2));
        Ok(position.clone())
    }

    /// Delete a position outright.
    pub fn remove(&self, id: &str) -> OptionScanResult<Position> {
        self.write()
            .remove(id)
            .ok_or_else(|| OptionScanError::NotFound { id: id.to_string() })
    }

    /// Settle every open position whose expiration has passed. Each position
    /// is processed independently: a failed closing-price lookup is reported
    /// and the rest of the batch continues. Sweeps never run concurrently
    /// with each other.
    pub fn expire_due(
        &self,
        today: NaiveDate,
        source: &dyn ClosingPriceSource,
    ) -> ExpirationSweep {
        let _sweep = self.sweep_guard.lock().unwrap_or_else(|e| e.into_inner());

        let due: Vec<(String, String, NaiveDate)> = self
            .read()
            .values()
            .filter(|p| p.status == PositionStatus::Open && p.expiration < today)
            .map(|p| (p.id.clone(), p.symbol.clone(), p.expiration))
            .collect();

        let mut expired = Vec::new();
        let mut failures = Vec::new();

        for (id, symbol, expiration) in due {
            // External lookup happens outside the write lock
            let closing_price = match source.closing_price(&symbol, expiration) {
                Ok(price) => price,
                Err(e) => {
                    failures.push(SweepFailure {
                        id,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            let mut guard = self.write();
            let Some(position) = guard.get_mut(&id) else { continue };
            // Check-and-set: a concurrent close may have won the race
            if position.status != PositionStatus::Open {
                continue;
            }

            let exit_price = settlement_exit_price(&position.legs, closing_price);
            let realized = settlement_pnl(position.entry_price, exit_price, position.quantity);

            position.status = PositionStatus::Expired;
            position.closed_at = Some(Utc::now());
            position.exit_price = Some(exit_price.round_dp(2));
            position.realized_pnl = Some(realized.round_dp(2));

            expired.push(ExpiredPosition {
                id,
                strategy_name: position.strategy_name.clone(),
                expiration,
                closing_price,
                exit_price: exit_price.round_dp(2),
                realized_pnl: realized.round_dp(2),
            });
        }

        ExpirationSweep {
            expired_count: expired.len(),
            expired,
            failures,
        }
    }

    /// Portfolio roll-up: counts by status plus realized/unrealized totals.
    pub fn summary(&self) -> PortfolioSummary {
        let positions = self.list(&PositionFilter::default());

        let mut open = 0;
        let mut closed = 0;
        let mut expired = 0;
        let mut total_unrealized = Decimal::ZERO;
        let mut total_realized = Decimal::ZERO;

        for p in &positions {
            match p.position.status {
                PositionStatus::Open => {
                    open += 1;
                    total_unrealized += p.unrealized_pnl.unwrap_or(Decimal::ZERO);
                }
                PositionStatus::Closed => {
                    closed += 1;
                    total_realized += p.position.realized_pnl.unwrap_or(Decimal::ZERO);
                }
                PositionStatus::Expired => {
                    expired += 1;
                    total_realized += p.position.realized_pnl.unwrap_or(Decimal::ZERO);
                }
            }
        }

        PortfolioSummary {
            total_positions: positions.len(),
            open_positions: open,
            closed_positions: closed,
            expired_positions: expired,
            total_unrealized_pnl: total_unrealized.round_dp(2),
            total_realized_pnl: total_realized.round_dp(2),
            positions,
        }
    }
}

fn validate_spec(spec: &PositionSpec) -> OptionScanResult<()> {
    if spec.symbol.trim().is_empty() {
        return Err(OptionScanError::InvalidInput {
            field: "symbol".into(),
            reason: "must not be empty".into(),
        });
    }
    if spec.legs.is_empty() {
        return Err(OptionScanError::InvalidInput {
            field: "legs".into(),
            reason: "position must have at least one leg".into(),
        });
    }
    if spec.quantity == 0 {
        return Err(OptionScanError::InvalidInput {
            field: "quantity".into(),
            reason: "must be at least 1".into(),
        });
    }
    for (i, leg) in spec.legs.iter().enumerate() {
        if leg.strike <= Decimal::ZERO {
            return Err(OptionScanError::InvalidInput {
                field: format!("legs[{i}].strike"),
                reason: "must be positive".into(),
            });
        }
        if leg.price < Decimal::ZERO {
            return Err(OptionScanError::InvalidInput {
                field: format!("legs[{i}].price"),
                reason: "must not be negative".into(),
            });
        }
        if leg.quantity == 0 {
            return Err(OptionScanError::InvalidInput {
                field: format!("legs[{i}].quantity"),
                reason: "must be at least 1".into(),
            });
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
