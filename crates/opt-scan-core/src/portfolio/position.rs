use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::types::{Money, OptionClass};

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Strategy family a position was entered under. The credit/debit split is a
/// fixed lookup: it decides the sign convention for realized P&L.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyType {
    BullPut,
    BearCall,
    IronCondor,
    IronButterfly,
    Straddle,
    Strangle,
    CalendarSpread,
    Custom,
}

impl StrategyType {
    /// Credit-received families: premium collected at entry.
    pub fn is_credit(&self) -> bool {
        matches!(
            self,
            StrategyType::BullPut
                | StrategyType::BearCall
                | StrategyType::IronCondor
                | StrategyType::IronButterfly
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LegAction {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionStatus {
    Open,
    Closed,
    Expired,
}

impl PositionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PositionStatus::Open => "open",
            PositionStatus::Closed => "closed",
            PositionStatus::Expired => "expired",
        }
    }
}

// ---------------------------------------------------------------------------
// Position model
// ---------------------------------------------------------------------------

/// One leg of a multi-leg position. Immutable after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionLeg {
    pub option_type: OptionClass,
    pub action: LegAction,
    pub strike: Money,
    pub price: Money,
    #[serde(default = "default_leg_quantity")]
    pub quantity: u32,
}

fn default_leg_quantity() -> u32 {
    1
}

/// Caller-supplied description of a position to open.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionSpec {
    pub symbol: String,
    pub strategy_type: StrategyType,
    /// Display name like "Bull Put 6400/6395".
    pub strategy_name: String,
    pub expiration: NaiveDate,
    pub legs: Vec<PositionLeg>,
    /// Signed per-contract net price: positive = credit received,
    /// negative = debit paid.
    pub entry_price: Money,
    #[serde(default = "default_leg_quantity")]
    pub quantity: u32,
    #[serde(default)]
    pub notes: Option<String>,
}

/// A tracked paper position. Status moves open -> closed | expired, both
/// terminal; the exit fields stay unset until a terminal transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub id: String,
    pub symbol: String,
    pub strategy_type: StrategyType,
    pub strategy_name: String,
    pub expiration: NaiveDate,
    pub legs: Vec<PositionLeg>,
    pub entry_price: Money,
    pub quantity: u32,
    pub notes: Option<String>,
    pub status: PositionStatus,
    pub opened_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub exit_price: Option<Money>,
    pub realized_pnl: Option<Money>,
}

impl Position {
    /// Entry notional in dollars: per-contract price × contracts × multiplier.
    pub fn entry_value(&self) -> Money {
        self.entry_price * Decimal::from(self.quantity) * dec!(100)
    }
}

/// A position annotated with the coarse open-position P&L placeholder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionWithPnl {
    #[serde(flatten)]
    pub position: Position,
    pub unrealized_pnl: Option<Money>,
    pub pnl_percent: Option<Decimal>,
}

impl From<Position> for PositionWithPnl {
    fn from(position: Position) -> Self {
        let (unrealized_pnl, pnl_percent) = match position.status {
            PositionStatus::Open => {
                let entry_value = position.entry_value();
                // Deliberately coarse placeholder, not a pricing model:
                // credit structures carry half their entry notional, debit
                // structures carry zero until closed
                let unrealized = if position.strategy_type.is_credit() {
                    entry_value * dec!(0.5)
                } else {
                    Decimal::ZERO
                };
                let pct = if entry_value != Decimal::ZERO {
                    Some((unrealized / entry_value.abs() * dec!(100)).round_dp(2))
                } else {
                    None
                };
                (Some(unrealized.round_dp(2)), pct)
            }
            _ => (None, None),
        };
        PositionWithPnl {
            position,
            unrealized_pnl,
            pnl_percent,
        }
    }
}

// ---------------------------------------------------------------------------
// Settlement math
// ---------------------------------------------------------------------------

/// In-the-money value of an option at a given underlying price.
pub fn intrinsic_value(class: OptionClass, strike: Money, underlying: Money) -> Money {
    match class {
        OptionClass::Call => (underlying - strike).max(Decimal::ZERO),
        OptionClass::Put => (strike - underlying).max(Decimal::ZERO),
    }
}

/// Synthetic per-contract exit price of a position settled at expiration:
/// sold legs owe their intrinsic value back, bought legs collect it.
pub fn settlement_exit_price(legs: &[PositionLeg], closing_price: Money) -> Money {
    let mut exit_price = Decimal::ZERO;
    for leg in legs {
        let intrinsic = intrinsic_value(leg.option_type, leg.strike, closing_price);
        match leg.action {
            LegAction::Sell => exit_price += intrinsic,
            LegAction::Buy => exit_price -= intrinsic,
        }
    }
    exit_price
}

/// Realized P&L for a manual close: direction comes from the fixed
/// strategy classification.
pub fn close_pnl(
    strategy_type: StrategyType,
    entry_price: Money,
    exit_price: Money,
    quantity: u32,
) -> Money {
    let per_contract = if strategy_type.is_credit() {
        entry_price - exit_price
    } else {
        exit_price - entry_price
    };
    per_contract * Decimal::from(quantity) * dec!(100)
}

/// Realized P&L at expiration. The synthetic exit price already carries its
/// sign (bought legs subtract), so entry minus exit settles credit and debit
/// positions alike.
pub fn settlement_pnl(entry_price: Money, exit_price: Money, quantity: u32) -> Money {
    (entry_price - exit_price) * Decimal::from(quantity) * dec!(100)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn leg(class: OptionClass, action: LegAction, strike: Decimal) -> PositionLeg {
        PositionLeg {
            option_type: class,
            action,
            strike,
            price: dec!(2),
            quantity: 1,
        }
    }

    // -----------------------------------------------------------------------
    // Intrinsic value
    // -----------------------------------------------------------------------

    #[test]
    fn test_intrinsic_value() {
        assert_eq!(intrinsic_value(OptionClass::Call, dec!(100), dec!(110)), dec!(10));
        assert_eq!(intrinsic_value(OptionClass::Call, dec!(100), dec!(90)), dec!(0));
        assert_eq!(intrinsic_value(OptionClass::Put, dec!(100), dec!(95)), dec!(5));
        assert_eq!(intrinsic_value(OptionClass::Put, dec!(100), dec!(105)), dec!(0));
    }

    // -----------------------------------------------------------------------
    // Settlement exit price
    // -----------------------------------------------------------------------

    #[test]
    fn test_settlement_short_put() {
        // Short put 100, close 95: the position owes 5 back
        let legs = vec![leg(OptionClass::Put, LegAction::Sell, dec!(100))];
        assert_eq!(settlement_exit_price(&legs, dec!(95)), dec!(5));
    }

    #[test]
    fn test_settlement_long_call() {
        // Long call 100, close 110: the position collects 10
        let legs = vec![leg(OptionClass::Call, LegAction::Buy, dec!(100))];
        assert_eq!(settlement_exit_price(&legs, dec!(110)), dec!(-10));
    }

    #[test]
    fn test_settlement_spread_nets_legs() {
        // Bull put 100/95, close 92: short owes 8, long collects 3
        let legs = vec![
            leg(OptionClass::Put, LegAction::Sell, dec!(100)),
            leg(OptionClass::Put, LegAction::Buy, dec!(95)),
        ];
        assert_eq!(settlement_exit_price(&legs, dec!(92)), dec!(5));
    }

    #[test]
    fn test_settlement_all_otm_is_zero() {
        let legs = vec![
            leg(OptionClass::Put, LegAction::Sell, dec!(100)),
            leg(OptionClass::Call, LegAction::Sell, dec!(120)),
        ];
        assert_eq!(settlement_exit_price(&legs, dec!(110)), dec!(0));
    }

    // -----------------------------------------------------------------------
    // P&L formulas
    // -----------------------------------------------------------------------

    #[test]
    fn test_close_pnl_credit_strategy() {
        // Sold for 2.00, bought back at 0.50: +150 per contract
        assert_eq!(
            close_pnl(StrategyType::BullPut, dec!(2), dec!(0.5), 1),
            dec!(150)
        );
    }

    #[test]
    fn test_close_pnl_debit_strategy() {
        // Paid 10, sold at 15, 2 contracts: +1000
        assert_eq!(
            close_pnl(StrategyType::Straddle, dec!(10), dec!(15), 2),
            dec!(1000)
        );
    }

    #[test]
    fn test_settlement_pnl_short_put_example() {
        // Short put 100, entry 2 credit, quantity 1, close 95:
        // intrinsic 5, exit 5, pnl (2 - 5) * 100 = -300
        let legs = vec![leg(OptionClass::Put, LegAction::Sell, dec!(100))];
        let exit = settlement_exit_price(&legs, dec!(95));
        assert_eq!(exit, dec!(5));
        assert_eq!(settlement_pnl(dec!(2), exit, 1), dec!(-300));
    }

    #[test]
    fn test_settlement_pnl_debit_position() {
        // Long straddle 100, paid 10 (entry -10), close 120: call leg
        // collects 20 so exit is -20, pnl (-10 - -20) * 100 = +1000
        let legs = vec![
            leg(OptionClass::Call, LegAction::Buy, dec!(100)),
            leg(OptionClass::Put, LegAction::Buy, dec!(100)),
        ];
        let exit = settlement_exit_price(&legs, dec!(120));
        assert_eq!(exit, dec!(-20));
        assert_eq!(settlement_pnl(dec!(-10), exit, 1), dec!(1000));
    }

    // -----------------------------------------------------------------------
    // Classification and placeholders
    // -----------------------------------------------------------------------

    #[test]
    fn test_credit_classification() {
        assert!(StrategyType::BullPut.is_credit());
        assert!(StrategyType::BearCall.is_credit());
        assert!(StrategyType::IronCondor.is_credit());
        assert!(StrategyType::IronButterfly.is_credit());
        assert!(!StrategyType::Straddle.is_credit());
        assert!(!StrategyType::Strangle.is_credit());
        assert!(!StrategyType::CalendarSpread.is_credit());
        assert!(!StrategyType::Custom.is_credit());
    }

    #[test]
    fn test_unrealized_placeholder_credit_half_notional() {
        let position = Position {
            id: "p1".into(),
            symbol: "^SPX".into(),
            strategy_type: StrategyType::IronCondor,
            strategy_name: "Iron Condor 6400/6395 6450/6455".into(),
            expiration: NaiveDate::from_ymd_opt(2025, 9, 19).unwrap(),
            legs: vec![],
            entry_price: dec!(3.10),
            quantity: 2,
            notes: None,
            status: PositionStatus::Open,
            opened_at: Utc::now(),
            closed_at: None,
            exit_price: None,
            realized_pnl: None,
        };
        let with_pnl = PositionWithPnl::from(position);
        // entry notional 3.10 * 2 * 100 = 620; placeholder is half of it
        assert_eq!(with_pnl.unrealized_pnl, Some(dec!(310.00)));
        assert_eq!(with_pnl.pnl_percent, Some(dec!(50.00)));
    }

    #[test]
    fn test_unrealized_placeholder_debit_zero() {
        let position = Position {
            id: "p2".into(),
            symbol: "^SPX".into(),
            strategy_type: StrategyType::Strangle,
            strategy_name: "Strangle 6450/6375".into(),
            expiration: NaiveDate::from_ymd_opt(2025, 9, 19).unwrap(),
            legs: vec![],
            entry_price: dec!(-25),
            quantity: 1,
            notes: None,
            status: PositionStatus::Open,
            opened_at: Utc::now(),
            closed_at: None,
            exit_price: None,
            realized_pnl: None,
        };
        let with_pnl = PositionWithPnl::from(position);
        assert_eq!(with_pnl.unrealized_pnl, Some(dec!(0)));
        assert_eq!(with_pnl.pnl_percent, Some(dec!(0)));
    }

    #[test]
    fn test_closed_position_has_no_unrealized() {
        let position = Position {
            id: "p3".into(),
            symbol: "^SPX".into(),
            strategy_type: StrategyType::BullPut,
            strategy_name: "Bull Put 6400/6395".into(),
            expiration: NaiveDate::from_ymd_opt(2025, 9, 19).unwrap(),
            legs: vec![],
            entry_price: dec!(1.50),
            quantity: 1,
            notes: None,
            status: PositionStatus::Closed,
            opened_at: Utc::now(),
            closed_at: Some(Utc::now()),
            exit_price: Some(dec!(0.25)),
            realized_pnl: Some(dec!(125)),
        };
        let with_pnl = PositionWithPnl::from(position);
        assert_eq!(with_pnl.unrealized_pnl, None);
        assert_eq!(with_pnl.pnl_percent, None);
    }
}
