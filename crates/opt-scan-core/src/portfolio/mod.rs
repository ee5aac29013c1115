//! Paper-trading portfolio: position lifecycle, deterministic settlement.

mod ledger;
mod position;

pub use ledger::{
    ClosingPriceSource, ExpirationSweep, ExpiredPosition, PortfolioSummary, PositionFilter,
    PositionLedger, SweepFailure,
};
pub use position::{
    close_pnl, intrinsic_value, settlement_exit_price, settlement_pnl, LegAction, Position,
    PositionLeg, PositionSpec, PositionStatus, PositionWithPnl, StrategyType,
};
