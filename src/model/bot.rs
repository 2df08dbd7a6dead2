use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BotStatus {
    Active,
    Paused,
    Stopped,
}

impl fmt::Display for BotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BotStatus::Active => write!(f, "active"),
            BotStatus::Paused => write!(f, "paused"),
            BotStatus::Stopped => write!(f, "stopped"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotAction {
    Start,
    Pause,
    Stop,
}

impl BotAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            BotAction::Start => "start",
            BotAction::Pause => "pause",
            BotAction::Stop => "stop",
        }
    }
}

impl BotStatus {
    /// Transition table for the bot lifecycle. `None` means the action is not
    /// allowed from this state.
    pub fn apply(self, action: BotAction) -> Option<BotStatus> {
        match (self, action) {
            (BotStatus::Stopped | BotStatus::Paused, BotAction::Start) => Some(BotStatus::Active),
            (BotStatus::Active, BotAction::Pause) => Some(BotStatus::Paused),
            (_, BotAction::Stop) => Some(BotStatus::Stopped),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradingBot {
    pub id: String,
    pub name: String,
    pub strategy: String,
    pub status: BotStatus,
    pub profit_24h: Decimal,
    pub profit_total: Decimal,
    pub trades_24h: u32,
    pub trades_total: u32,
    /// Percentage in `[0, 100]`.
    pub win_rate: f64,
    pub max_drawdown: f64,
    pub created_at: DateTime<Utc>,
    pub last_trade_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub parameters: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BotConfig {
    pub name: String,
    pub strategy: String,
    #[serde(default)]
    pub parameters: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeSide {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeStatus {
    Completed,
    Pending,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trade {
    pub id: String,
    pub bot_id: String,
    pub pair: String,
    pub side: TradeSide,
    pub amount: Decimal,
    pub price: Decimal,
    pub profit: Decimal,
    pub timestamp: DateTime<Utc>,
    pub status: TradeStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatsPeriod {
    Day,
    Week,
    Month,
}

impl StatsPeriod {
    pub fn multiplier(&self) -> u32 {
        match self {
            StatsPeriod::Day => 1,
            StatsPeriod::Week => 7,
            StatsPeriod::Month => 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedBotStats {
    pub total_profit: Decimal,
    pub total_trades: u32,
    pub average_win_rate: f64,
    pub active_bots: usize,
    pub total_bots: usize,
    pub profitability_rate: f64,
}

pub const TRADE_PAIRS: [&str; 4] = ["BTC/USDC", "ETH/USDC", "SOL/USDC", "AVAX/USDC"];

fn at(month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, month, day, hour, minute, 0)
        .single()
        .unwrap_or_default()
}

pub fn initial_bots() -> Vec<TradingBot> {
    #[allow(clippy::too_many_arguments)]
    fn bot(
        id: &str,
        name: &str,
        strategy: &str,
        status: BotStatus,
        profit_24h: Decimal,
        profit_total: Decimal,
        trades: (u32, u32),
        win_rate: f64,
        max_drawdown: f64,
        created_at: DateTime<Utc>,
        last_trade_at: DateTime<Utc>,
    ) -> TradingBot {
        TradingBot {
            id: id.to_string(),
            name: name.to_string(),
            strategy: strategy.to_string(),
            status,
            profit_24h,
            profit_total,
            trades_24h: trades.0,
            trades_total: trades.1,
            win_rate,
            max_drawdown,
            created_at,
            last_trade_at: Some(last_trade_at),
            parameters: HashMap::new(),
        }
    }

    vec![
        bot("bot_001", "Arbitrage Alpha", "Cross-exchange arbitrage with automated execution",
            BotStatus::Active, dec!(284.52), dec!(12847.30), (23, 1847), 73.2, 5.8,
            at(1, 15, 0, 0), at(3, 20, 14, 30)),
        bot("bot_002", "DCA Strategy Bot", "Dollar-cost averaging with market timing optimization",
            BotStatus::Active, dec!(192.18), dec!(8934.67), (8, 892), 68.4, 3.2,
            at(1, 20, 0, 0), at(3, 20, 16, 45)),
        bot("bot_003", "Momentum Trader", "Trend-following with technical indicator signals",
            BotStatus::Paused, dec!(-43.20), dec!(5621.89), (12, 634), 45.8, 12.4,
            at(2, 1, 0, 0), at(3, 19, 22, 15)),
        bot("bot_004", "Mean Reversion Bot", "Statistical arbitrage using price mean reversion",
            BotStatus::Active, dec!(342.67), dec!(15923.44), (31, 2156), 81.3, 4.6,
            at(1, 10, 0, 0), at(3, 20, 17, 20)),
    ]
}

pub fn initial_trades() -> Vec<Trade> {
    let trade = |id: &str, bot_id: &str, pair: &str, side, amount: Decimal, price: Decimal, profit: Decimal, timestamp, status| Trade {
        id: id.to_string(),
        bot_id: bot_id.to_string(),
        pair: pair.to_string(),
        side,
        amount,
        price,
        profit,
        timestamp,
        status,
    };

    vec![
        trade("trade_005", "bot_001", "BTC/USDC", TradeSide::Buy, dec!(0.1), dec!(51150), Decimal::ZERO, at(3, 20, 17, 30), TradeStatus::Pending),
        trade("trade_001", "bot_001", "BTC/USDC", TradeSide::Buy, dec!(0.25), dec!(51200), dec!(45.30), at(3, 20, 14, 30), TradeStatus::Completed),
        trade("trade_002", "bot_004", "ETH/USDC", TradeSide::Sell, dec!(2.5), dec!(3100), dec!(78.20), at(3, 20, 14, 25), TradeStatus::Completed),
        trade("trade_003", "bot_002", "SOL/USDC", TradeSide::Buy, dec!(50), dec!(95.40), dec!(12.80), at(3, 20, 14, 20), TradeStatus::Completed),
        trade("trade_004", "bot_003", "AVAX/USDC", TradeSide::Sell, dec!(15), dec!(32.10), dec!(-8.50), at(3, 20, 14, 15), TradeStatus::Completed),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_machine_transitions() {
        assert_eq!(BotStatus::Stopped.apply(BotAction::Start), Some(BotStatus::Active));
        assert_eq!(BotStatus::Paused.apply(BotAction::Start), Some(BotStatus::Active));
        assert_eq!(BotStatus::Active.apply(BotAction::Pause), Some(BotStatus::Paused));
        assert_eq!(BotStatus::Active.apply(BotAction::Start), None);
        assert_eq!(BotStatus::Stopped.apply(BotAction::Pause), None);
        assert_eq!(BotStatus::Paused.apply(BotAction::Pause), None);
    }

    #[test]
    fn test_stop_allowed_from_every_state() {
        for status in [BotStatus::Active, BotStatus::Paused, BotStatus::Stopped] {
            assert_eq!(status.apply(BotAction::Stop), Some(BotStatus::Stopped));
        }
    }
}
