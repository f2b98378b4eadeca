//! Domain types for ZoneLab.

pub mod bar;
pub mod equity;
pub mod trade;
pub mod trend;
pub mod zone;

pub use bar::Bar;
pub use equity::EquityPoint;
pub use trade::{Direction, ExitPolicy, Trade, TradeEvent, TradeId, TradeSetup, TradeStatus};
pub use trend::{Regime, TrendDirection, TrendState};
pub use zone::{Freshness, Zone, ZoneId, ZoneKind};
